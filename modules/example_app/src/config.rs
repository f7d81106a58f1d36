use serde::{Deserialize, Serialize};

/// Configuration for the example_app module
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExampleAppConfig {
    #[serde(default)]
    pub contentful: ContentfulConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub localization: LocalizationConfig,
}

/// Default credentials and endpoints for the content backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ContentfulConfig {
    #[serde(default)]
    pub space_id: String,
    #[serde(default)]
    pub delivery_api_key: String,
    #[serde(default)]
    pub preview_api_key: String,
    #[serde(default)]
    pub use_preview_api: bool,
    #[serde(default)]
    pub max_number_of_rate_limit_retries: u32,
    #[serde(default)]
    pub resolve_entries_selectively: bool,
    #[serde(default)]
    pub management_api_key: String,
    #[serde(default = "default_delivery_base_url")]
    pub delivery_base_url: String,
    #[serde(default = "default_preview_base_url")]
    pub preview_base_url: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for ContentfulConfig {
    fn default() -> Self {
        Self {
            space_id: String::new(),
            delivery_api_key: String::new(),
            preview_api_key: String::new(),
            use_preview_api: false,
            max_number_of_rate_limit_retries: 0,
            resolve_entries_selectively: false,
            management_api_key: String::new(),
            delivery_base_url: default_delivery_base_url(),
            preview_base_url: default_preview_base_url(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SessionConfig {
    #[serde(default = "default_cookie_name")]
    pub cookie_name: String,
    /// Sessions idle for longer than this are discarded on next access.
    #[serde(default = "default_idle_timeout_secs")]
    pub idle_timeout_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookie_name: default_cookie_name(),
            idle_timeout_secs: default_idle_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LocalizationConfig {
    /// Locales with static translations; the first match wins when codes differ only by case.
    #[serde(default = "default_supported_locales")]
    pub supported_locales: Vec<String>,
    #[serde(default = "default_locale")]
    pub default_locale: String,
}

impl Default for LocalizationConfig {
    fn default() -> Self {
        Self {
            supported_locales: default_supported_locales(),
            default_locale: default_locale(),
        }
    }
}

fn default_delivery_base_url() -> String {
    "https://cdn.contentful.com".to_string()
}

fn default_preview_base_url() -> String {
    "https://preview.contentful.com".to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_cookie_name() -> String {
    "example_app.session".to_string()
}

fn default_idle_timeout_secs() -> u64 {
    2 * 24 * 60 * 60
}

fn default_supported_locales() -> Vec<String> {
    vec!["en-US".to_string(), "de-DE".to_string()]
}

fn default_locale() -> String {
    "en-US".to_string()
}
