use crate::config::AppConfig;
use serde::de::DeserializeOwned;
use std::sync::Arc;

/// Errors raised while turning a module's raw config value into its typed form.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid configuration for module '{module}': {source}")]
    Invalid {
        module: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Configuration provider trait for modules
pub trait ConfigProvider: Send + Sync {
    /// Get the raw configuration for a specific module
    fn get_module_config(&self, module_name: &str) -> Option<&serde_json::Value>;
}

/// Typed access on top of [`ConfigProvider`].
pub trait ConfigProviderExt: ConfigProvider {
    /// Deserialize the module's section; a missing section yields `T::default()`.
    fn module_config<T>(&self, module_name: &str) -> Result<T, ConfigError>
    where
        T: DeserializeOwned + Default,
    {
        match self.get_module_config(module_name) {
            Some(raw) => {
                serde_json::from_value(raw.clone()).map_err(|source| ConfigError::Invalid {
                    module: module_name.to_string(),
                    source,
                })
            }
            None => Ok(T::default()),
        }
    }
}

impl<P: ConfigProvider + ?Sized> ConfigProviderExt for P {}

/// [`ConfigProvider`] backed by the loaded [`AppConfig`].
pub struct AppConfigProvider(Arc<AppConfig>);

impl AppConfigProvider {
    pub fn new(config: AppConfig) -> Self {
        Self(Arc::new(config))
    }

    pub fn inner(&self) -> &AppConfig {
        &self.0
    }
}

impl ConfigProvider for AppConfigProvider {
    fn get_module_config(&self, module_name: &str) -> Option<&serde_json::Value> {
        self.0.modules.get(module_name)
    }
}
