use std::sync::Arc;

use anyhow::Context;
use appkit_bootstrap::{ConfigProvider, ConfigProviderExt};
use axum::Router;
use tracing::{debug, info, warn};

use crate::config::ExampleAppConfig;
use crate::content::{ContentBackend, ContentfulClient};
use crate::domain::localizer::Localizer;
use crate::domain::service::ExampleAppService;

/// Main module struct for the example app
pub struct ExampleAppModule {
    // Keep the service behind ArcSwap for cheap read-mostly access.
    service: arc_swap::ArcSwapOption<ExampleAppService>,
}

impl Default for ExampleAppModule {
    fn default() -> Self {
        Self {
            service: arc_swap::ArcSwapOption::from(None),
        }
    }
}

impl Clone for ExampleAppModule {
    fn clone(&self) -> Self {
        Self {
            service: arc_swap::ArcSwapOption::new(self.service.load_full()),
        }
    }
}

impl ExampleAppModule {
    pub const NAME: &'static str = "example_app";

    /// Load the module section and wire the service against the live content API.
    pub fn init(&self, config: &dyn ConfigProvider) -> anyhow::Result<()> {
        info!("Initializing {} module", Self::NAME);

        let cfg: ExampleAppConfig = config.module_config(Self::NAME)?;
        debug!(
            space_id = %cfg.contentful.space_id,
            preview = cfg.contentful.use_preview_api,
            delivery_base_url = %cfg.contentful.delivery_base_url,
            "Loaded {} config",
            Self::NAME
        );

        let client = ContentfulClient::new(&cfg.contentful).context("building content API client")?;
        self.init_with_backend(cfg, Arc::new(client))
    }

    /// Wire the service against any content backend.
    pub fn init_with_backend(
        &self,
        cfg: ExampleAppConfig,
        backend: Arc<dyn ContentBackend>,
    ) -> anyhow::Result<()> {
        let localization = &cfg.localization;
        if localization.supported_locales.is_empty() {
            anyhow::bail!("localization.supported_locales must not be empty");
        }
        if !localization
            .supported_locales
            .iter()
            .any(|l| l.eq_ignore_ascii_case(&localization.default_locale))
        {
            anyhow::bail!(
                "default locale '{}' is not one of the supported locales {:?}",
                localization.default_locale,
                localization.supported_locales
            );
        }

        let localizer = Localizer::embedded().context("loading embedded translations")?;
        for code in &localization.supported_locales {
            if !localizer.has_locale(code) {
                warn!(locale = %code, "No translations for supported locale; keys will be shown");
            }
        }

        if cfg.contentful.space_id.is_empty() {
            warn!("No default space configured; pages need credentials from settings or a deep link");
        }

        let service = Arc::new(ExampleAppService::new(&cfg, backend, localizer));
        self.service.store(Some(service));

        info!("ExampleAppService initialized successfully");
        Ok(())
    }

    pub fn service(&self) -> anyhow::Result<Arc<ExampleAppService>> {
        self.service
            .load_full()
            .ok_or_else(|| anyhow::anyhow!("Service not initialized"))
    }

    /// Application router with the request pipeline, health and OpenAPI routes.
    pub fn router(&self) -> anyhow::Result<Router> {
        info!("Registering {} REST routes", Self::NAME);
        let router = crate::api::rest::routes::build_router(self.service()?);
        info!("{} REST routes registered successfully", Self::NAME);
        Ok(router)
    }
}
