//! Request locale resolution.
//!
//! A priority-ordered chain of [`CultureProvider`]s is asked in turn; the
//! first one that yields a [`LocaleSelection`] wins, otherwise the default
//! locale applies.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::content::ContentBackend;
use crate::domain::options::EffectiveOptions;
use crate::domain::session::{Session, SessionKey};

/// Locales with static translations, matched case-insensitively.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupportedLocales {
    codes: Vec<String>,
}

impl SupportedLocales {
    pub fn new<I, S>(codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            codes: codes.into_iter().map(Into::into).collect(),
        }
    }

    /// Canonical spelling of `code` if it is supported.
    pub fn canonical(&self, code: &str) -> Option<&str> {
        self.codes
            .iter()
            .find(|c| c.eq_ignore_ascii_case(code))
            .map(String::as_str)
    }

    pub fn contains(&self, code: &str) -> bool {
        self.canonical(code).is_some()
    }

    pub fn codes(&self) -> &[String] {
        &self.codes
    }
}

impl Default for SupportedLocales {
    fn default() -> Self {
        Self::new(["en-US", "de-DE"])
    }
}

/// Outcome of locale resolution for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocaleSelection {
    /// Code the visitor asked for; may be a backend locale without static translations.
    pub requested: Option<String>,
    /// Supported locale used for static strings.
    pub effective: String,
    /// Set when `effective` was reached through the fallback chain.
    pub fallback: Option<String>,
}

impl LocaleSelection {
    pub fn effective(code: impl Into<String>) -> Self {
        Self {
            requested: None,
            effective: code.into(),
            fallback: None,
        }
    }

    /// Locale to request content in.
    pub fn content_locale(&self) -> &str {
        self.requested.as_deref().unwrap_or(&self.effective)
    }
}

/// Inputs available to culture providers.
pub struct LocaleContext<'a> {
    pub query_locale: Option<&'a str>,
    pub session: &'a Session,
    pub options: &'a EffectiveOptions,
}

#[async_trait]
pub trait CultureProvider: Send + Sync {
    fn name(&self) -> &'static str;

    async fn provide(&self, ctx: &LocaleContext<'_>) -> Option<LocaleSelection>;
}

/// Handles an explicit `locale` query parameter by checking it against the
/// locales the backend defines and walking their fallback chain.
pub struct QueryLocaleProvider {
    backend: Arc<dyn ContentBackend>,
    supported: SupportedLocales,
}

impl QueryLocaleProvider {
    pub fn new(backend: Arc<dyn ContentBackend>, supported: SupportedLocales) -> Self {
        Self { backend, supported }
    }
}

#[async_trait]
impl CultureProvider for QueryLocaleProvider {
    fn name(&self) -> &'static str {
        "query"
    }

    async fn provide(&self, ctx: &LocaleContext<'_>) -> Option<LocaleSelection> {
        let code = ctx.query_locale?;
        ctx.session.remove(SessionKey::FallbackLocale);

        let space = match self.backend.get_space(ctx.options).await {
            Ok(space) => space,
            Err(e) => {
                warn!(locale = code, error = %e, "Could not load backend locales");
                return None;
            }
        };

        let Some(locale) = space.locale(code) else {
            debug!(locale = code, "Locale unknown to backend");
            return None;
        };

        if let Some(canonical) = self.supported.canonical(code) {
            ctx.session.set(SessionKey::Locale, code);
            return Some(LocaleSelection {
                requested: Some(code.to_string()),
                effective: canonical.to_string(),
                fallback: None,
            });
        }

        let mut seen: HashSet<&str> = HashSet::from([code]);
        let mut next = locale.fallback_code.as_deref();
        while let Some(candidate) = next {
            if !seen.insert(candidate) {
                debug!(locale = code, "Fallback chain loops");
                return None;
            }
            if let Some(canonical) = self.supported.canonical(candidate) {
                ctx.session.set(SessionKey::Locale, code);
                ctx.session.set(SessionKey::FallbackLocale, canonical);
                return Some(LocaleSelection {
                    requested: Some(code.to_string()),
                    effective: canonical.to_string(),
                    fallback: Some(canonical.to_string()),
                });
            }
            next = space
                .locale(candidate)
                .and_then(|l| l.fallback_code.as_deref());
        }

        debug!(locale = code, "No supported locale in fallback chain");
        None
    }
}

/// The raw `locale` query parameter, when it names a supported locale.
pub struct QueryStringProvider {
    supported: SupportedLocales,
}

impl QueryStringProvider {
    pub fn new(supported: SupportedLocales) -> Self {
        Self { supported }
    }
}

#[async_trait]
impl CultureProvider for QueryStringProvider {
    fn name(&self) -> &'static str {
        "query-string"
    }

    async fn provide(&self, ctx: &LocaleContext<'_>) -> Option<LocaleSelection> {
        let code = ctx.query_locale?;
        let canonical = self.supported.canonical(code)?;
        Some(LocaleSelection {
            requested: Some(canonical.to_string()),
            effective: canonical.to_string(),
            fallback: None,
        })
    }
}

/// Locale remembered in the session; a stored fallback wins over the stored locale.
pub struct SessionLocaleProvider {
    supported: SupportedLocales,
}

impl SessionLocaleProvider {
    pub fn new(supported: SupportedLocales) -> Self {
        Self { supported }
    }

    pub fn remembered(&self, session: &Session) -> Option<LocaleSelection> {
        let requested = session.get(SessionKey::Locale).filter(|s| !s.is_empty());

        if let Some(fallback) = session.get(SessionKey::FallbackLocale) {
            if let Some(canonical) = self.supported.canonical(&fallback) {
                return Some(LocaleSelection {
                    requested,
                    effective: canonical.to_string(),
                    fallback: Some(canonical.to_string()),
                });
            }
        }

        let code = requested?;
        let canonical = self.supported.canonical(&code)?.to_string();
        Some(LocaleSelection {
            requested: Some(code),
            effective: canonical,
            fallback: None,
        })
    }
}

#[async_trait]
impl CultureProvider for SessionLocaleProvider {
    fn name(&self) -> &'static str {
        "session"
    }

    async fn provide(&self, ctx: &LocaleContext<'_>) -> Option<LocaleSelection> {
        self.remembered(ctx.session)
    }
}

/// Runs the provider chain.
pub struct LocaleResolver {
    providers: Vec<Box<dyn CultureProvider>>,
    session_provider: SessionLocaleProvider,
    default_locale: String,
}

impl LocaleResolver {
    /// Standard chain: query (backend checked), query string, session memory.
    pub fn new(
        backend: Arc<dyn ContentBackend>,
        supported: SupportedLocales,
        default_locale: impl Into<String>,
    ) -> Self {
        let providers: Vec<Box<dyn CultureProvider>> = vec![
            Box::new(QueryLocaleProvider::new(backend, supported.clone())),
            Box::new(QueryStringProvider::new(supported.clone())),
            Box::new(SessionLocaleProvider::new(supported.clone())),
        ];
        Self {
            providers,
            session_provider: SessionLocaleProvider::new(supported),
            default_locale: default_locale.into(),
        }
    }

    pub fn default_locale(&self) -> &str {
        &self.default_locale
    }

    pub async fn resolve(&self, ctx: &LocaleContext<'_>) -> LocaleSelection {
        for provider in &self.providers {
            if let Some(selection) = provider.provide(ctx).await {
                debug!(
                    provider = provider.name(),
                    locale = %selection.effective,
                    "Resolved request locale"
                );
                return selection;
            }
        }
        LocaleSelection::effective(self.default_locale.clone())
    }

    /// Effective locale remembered in the session, else the default. Does not
    /// consult the query or the backend.
    pub fn remembered_locale(&self, session: &Session) -> String {
        self.session_provider
            .remembered(session)
            .map(|s| s.effective)
            .unwrap_or_else(|| self.default_locale.clone())
    }
}
