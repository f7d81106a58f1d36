use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::config::ContentfulConfig;
use crate::domain::session::{Session, SessionKey};

/// Credentials and client settings in effect for a request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EffectiveOptions {
    pub space_id: String,
    pub delivery_token: String,
    pub preview_token: String,
    pub use_preview: bool,
    pub rate_limit_retries: u32,
    pub resolve_selectively: bool,
    pub management_token: String,
}

impl EffectiveOptions {
    /// Same options with only the preview flag changed.
    pub fn with_preview(&self, use_preview: bool) -> Self {
        Self {
            use_preview,
            ..self.clone()
        }
    }

    /// Same options with new credentials; preview flag and client settings kept.
    pub fn with_credentials(&self, space_id: &str, delivery_token: &str, preview_token: &str) -> Self {
        Self {
            space_id: space_id.to_string(),
            delivery_token: delivery_token.to_string(),
            preview_token: preview_token.to_string(),
            ..self.clone()
        }
    }

    /// Token for the API selected by `use_preview`.
    pub fn access_token(&self) -> &str {
        if self.use_preview {
            &self.preview_token
        } else {
            &self.delivery_token
        }
    }

    pub fn api(&self) -> Api {
        if self.use_preview {
            Api::Cpa
        } else {
            Api::Cda
        }
    }

    fn same_credentials(&self, other: &Self) -> bool {
        self.space_id == other.space_id
            && self.use_preview == other.use_preview
            && self.delivery_token == other.delivery_token
            && self.preview_token == other.preview_token
    }
}

impl From<&ContentfulConfig> for EffectiveOptions {
    fn from(cfg: &ContentfulConfig) -> Self {
        Self {
            space_id: cfg.space_id.clone(),
            delivery_token: cfg.delivery_api_key.clone(),
            preview_token: cfg.preview_api_key.clone(),
            use_preview: cfg.use_preview_api,
            rate_limit_retries: cfg.max_number_of_rate_limit_retries,
            resolve_selectively: cfg.resolve_entries_selectively,
            management_token: cfg.management_api_key.clone(),
        }
    }
}

/// Content API flavour: delivery (published) or preview (drafts included).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Api {
    Cda,
    Cpa,
}

impl Api {
    /// `cpa` selects preview; every other value selects delivery.
    pub fn from_param(value: &str) -> Self {
        if value == "cpa" {
            Api::Cpa
        } else {
            Api::Cda
        }
    }

    pub fn is_preview(self) -> bool {
        matches!(self, Api::Cpa)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Api::Cda => "cda",
            Api::Cpa => "cpa",
        }
    }
}

/// Resolves the options for a request: a per-session override wins over the
/// process-wide defaults.
#[derive(Clone)]
pub struct OptionsStore {
    defaults: Arc<EffectiveOptions>,
}

impl OptionsStore {
    pub fn new(defaults: EffectiveOptions) -> Self {
        Self {
            defaults: Arc::new(defaults),
        }
    }

    pub fn defaults(&self) -> &EffectiveOptions {
        &self.defaults
    }

    fn session_override(&self, session: &Session) -> Option<EffectiveOptions> {
        session.get_json(SessionKey::ContentfulOptions)
    }

    pub fn get_effective_options(&self, session: &Session) -> EffectiveOptions {
        self.session_override(session)
            .unwrap_or_else(|| self.defaults.as_ref().clone())
    }

    /// True iff an override exists and differs from the defaults in space,
    /// preview flag or either token.
    pub fn is_using_custom_credentials(&self, session: &Session) -> bool {
        self.session_override(session)
            .is_some_and(|o| !o.same_credentials(&self.defaults))
    }

    pub fn set_override(&self, session: &Session, options: &EffectiveOptions) {
        if let Err(e) = session.set_json(SessionKey::ContentfulOptions, options) {
            warn!(error = %e, "Failed to store options override");
        }
    }

    pub fn clear_override(&self, session: &Session) {
        session.remove(SessionKey::ContentfulOptions);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::session::SessionStore;
    use std::time::Duration;

    fn defaults() -> EffectiveOptions {
        EffectiveOptions {
            space_id: "space".into(),
            delivery_token: "cda-token".into(),
            preview_token: "cpa-token".into(),
            use_preview: false,
            rate_limit_retries: 2,
            resolve_selectively: true,
            management_token: "cma".into(),
        }
    }

    fn session() -> Session {
        SessionStore::new(Duration::from_secs(60)).load_or_create(None)
    }

    #[test]
    fn defaults_apply_without_override() {
        let store = OptionsStore::new(defaults());
        let session = session();

        assert_eq!(store.get_effective_options(&session), defaults());
        assert!(!store.is_using_custom_credentials(&session));
    }

    #[test]
    fn override_supersedes_defaults_entirely() {
        let store = OptionsStore::new(defaults());
        let session = session();
        let custom = EffectiveOptions {
            space_id: "other".into(),
            rate_limit_retries: 0,
            ..Default::default()
        };

        store.set_override(&session, &custom);

        assert_eq!(store.get_effective_options(&session), custom);
        assert!(store.is_using_custom_credentials(&session));
    }

    #[test]
    fn override_round_trips_every_field() {
        let store = OptionsStore::new(defaults());
        let session = session();
        let custom = EffectiveOptions {
            space_id: "other-space".into(),
            delivery_token: "other-cda".into(),
            preview_token: "other-cpa".into(),
            use_preview: true,
            rate_limit_retries: 5,
            resolve_selectively: false,
            management_token: "other-cma".into(),
        };

        store.set_override(&session, &custom);

        assert_eq!(store.get_effective_options(&session), custom);
        let stored = session.get(SessionKey::ContentfulOptions).unwrap();
        let decoded: EffectiveOptions = serde_json::from_str(&stored).unwrap();
        assert_eq!(decoded, custom);
    }

    #[test]
    fn override_equal_in_credentials_is_not_custom() {
        let store = OptionsStore::new(defaults());
        let session = session();
        let same = EffectiveOptions {
            rate_limit_retries: 9,
            management_token: "changed".into(),
            ..defaults()
        };

        store.set_override(&session, &same);

        assert!(!store.is_using_custom_credentials(&session));
    }

    #[test]
    fn preview_switch_counts_as_custom() {
        let store = OptionsStore::new(defaults());
        let session = session();

        store.set_override(&session, &defaults().with_preview(true));

        assert!(store.is_using_custom_credentials(&session));
        assert_eq!(store.get_effective_options(&session).api(), Api::Cpa);
    }

    #[test]
    fn malformed_override_is_treated_as_absent() {
        let store = OptionsStore::new(defaults());
        let session = session();
        session.set(SessionKey::ContentfulOptions, "{\"spaceId\":");

        assert_eq!(store.get_effective_options(&session), defaults());
        assert!(!store.is_using_custom_credentials(&session));
    }

    #[test]
    fn clear_override_restores_defaults() {
        let store = OptionsStore::new(defaults());
        let session = session();
        store.set_override(&session, &defaults().with_preview(true));

        store.clear_override(&session);

        assert_eq!(store.get_effective_options(&session), defaults());
    }

    #[test]
    fn api_param_only_cpa_selects_preview() {
        assert_eq!(Api::from_param("cpa"), Api::Cpa);
        assert_eq!(Api::from_param("cda"), Api::Cda);
        assert_eq!(Api::from_param("CPA"), Api::Cda);
        assert_eq!(Api::from_param(""), Api::Cda);
    }
}
