use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::content::{ContentBackend, ContentError};
use crate::domain::localizer::Localizer;
use crate::domain::options::EffectiveOptions;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum CredentialField {
    SpaceId,
    DeliveryToken,
    PreviewToken,
}

/// Validation failure attached to one credential field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct FieldError {
    pub key: CredentialField,
    pub message: String,
}

/// Values submitted through the settings form or a deep link.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(default)]
pub struct SelectedOptions {
    pub space_id: String,
    pub delivery_token: String,
    pub preview_token: String,
    pub use_preview: bool,
    pub editorial_features: bool,
}

impl SelectedOptions {
    pub fn from_options(options: &EffectiveOptions, editorial_features: bool) -> Self {
        Self {
            space_id: options.space_id.clone(),
            delivery_token: options.delivery_token.clone(),
            preview_token: options.preview_token.clone(),
            use_preview: options.use_preview,
            editorial_features,
        }
    }
}

/// Checks a credential triple against the content backend.
pub struct CredentialValidator {
    backend: Arc<dyn ContentBackend>,
    localizer: Arc<Localizer>,
}

impl CredentialValidator {
    pub fn new(backend: Arc<dyn ContentBackend>, localizer: Arc<Localizer>) -> Self {
        Self { backend, localizer }
    }

    /// Validate the credentials in `candidate`. Client settings for the
    /// verification calls come from `candidate` too. Messages use `locale`.
    pub async fn validate(&self, candidate: &EffectiveOptions, locale: &str) -> Vec<FieldError> {
        let required = [
            (CredentialField::SpaceId, &candidate.space_id),
            (CredentialField::DeliveryToken, &candidate.delivery_token),
            (CredentialField::PreviewToken, &candidate.preview_token),
        ];
        let missing: Vec<FieldError> = required
            .iter()
            .filter(|(_, value)| value.trim().is_empty())
            .map(|(key, _)| FieldError {
                key: *key,
                message: self.localizer.get(locale, "fieldIsRequiredLabel"),
            })
            .collect();
        if !missing.is_empty() {
            return missing;
        }

        let mut errors = Vec::new();
        for use_preview in [false, true] {
            let options = candidate.with_preview(use_preview);
            if let Err(e) = self.backend.get_space(&options).await {
                debug!(preview = use_preview, error = %e, "Credential check failed");
                let error = self.field_error(&e, use_preview, locale);
                if !errors.contains(&error) {
                    errors.push(error);
                }
            }
        }
        errors
    }

    fn field_error(&self, error: &ContentError, preview: bool, locale: &str) -> FieldError {
        let (token_field, invalid_key) = if preview {
            (CredentialField::PreviewToken, "previewKeyInvalidLabel")
        } else {
            (CredentialField::DeliveryToken, "deliveryKeyInvalidLabel")
        };

        match error.status() {
            Some(401) => FieldError {
                key: token_field,
                message: self.localizer.get(locale, invalid_key),
            },
            Some(404) => FieldError {
                key: CredentialField::SpaceId,
                message: self.localizer.get(locale, "spaceOrTokenInvalid"),
            },
            _ => FieldError {
                key: token_field,
                message: format!(
                    "{}: {}",
                    self.localizer.get(locale, "somethingWentWrongLabel"),
                    error.detail()
                ),
            },
        }
    }
}
