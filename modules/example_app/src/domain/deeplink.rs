//! Credential and API switching through query parameters.

use std::sync::Arc;

use tracing::{info, warn};

use crate::domain::options::{Api, OptionsStore};
use crate::domain::session::{Session, SessionKey};
use crate::domain::validation::{CredentialValidator, FieldError, SelectedOptions};

/// Deep-link parameters present in a request query. The first occurrence of
/// a repeated parameter wins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeepLinkParams {
    pub space_id: Option<String>,
    pub delivery_token: Option<String>,
    pub preview_token: Option<String>,
    pub api: Option<String>,
    pub editorial_features: Option<String>,
}

impl DeepLinkParams {
    pub fn from_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut params = Self::default();
        for (key, value) in pairs {
            let slot = match key.as_str() {
                "space_id" => &mut params.space_id,
                "delivery_token" => &mut params.delivery_token,
                "preview_token" => &mut params.preview_token,
                "api" => &mut params.api,
                "editorial_features" => &mut params.editorial_features,
                _ => continue,
            };
            slot.get_or_insert(value);
        }
        params
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    fn credentials(&self) -> Option<(&str, &str, &str)> {
        Some((
            self.space_id.as_deref()?,
            self.delivery_token.as_deref()?,
            self.preview_token.as_deref()?,
        ))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeepLinkOutcome {
    Continue,
    /// Supplied credentials failed validation; errors are stashed in the session.
    InvalidCredentials(Vec<FieldError>),
}

/// Applies deep-link parameters to session-scoped configuration.
pub struct DeepLinkResolver {
    options: OptionsStore,
    validator: Arc<CredentialValidator>,
}

impl DeepLinkResolver {
    pub fn new(options: OptionsStore, validator: Arc<CredentialValidator>) -> Self {
        Self { options, validator }
    }

    /// `locale` is used for validation messages.
    pub async fn apply(
        &self,
        params: &DeepLinkParams,
        session: &Session,
        locale: &str,
    ) -> DeepLinkOutcome {
        let current = self.options.get_effective_options(session);

        if let Some((space_id, delivery_token, preview_token)) = params.credentials() {
            let use_preview = params
                .api
                .as_deref()
                .map(Api::from_param)
                .is_some_and(Api::is_preview);
            let candidate = current
                .with_credentials(space_id, delivery_token, preview_token)
                .with_preview(use_preview);

            let errors = self.validator.validate(&candidate, locale).await;
            if !errors.is_empty() {
                warn!(
                    space_id,
                    errors = errors.len(),
                    "Deep-link credentials rejected"
                );
                let attempted =
                    SelectedOptions::from_options(&candidate, session.editorial_features_enabled());
                stash(session, SessionKey::SettingsErrors, &errors);
                stash(session, SessionKey::SettingsErrorsOptions, &attempted);
                return DeepLinkOutcome::InvalidCredentials(errors);
            }

            info!(space_id, preview = use_preview, "Deep-link credentials applied");
            self.options.set_override(session, &candidate);
        } else if let Some(api) = params.api.as_deref() {
            let api = Api::from_param(api);
            self.options
                .set_override(session, &current.with_preview(api.is_preview()));
        }

        if let Some(flag) = params.editorial_features.as_deref() {
            session.set_editorial_features(flag.eq_ignore_ascii_case("enabled"));
        }

        DeepLinkOutcome::Continue
    }
}

fn stash<T: serde::Serialize>(session: &Session, key: SessionKey, value: &T) {
    if let Err(e) = session.set_json(key, value) {
        warn!(key = key.as_str(), error = %e, "Failed to stash settings state");
    }
}
