use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, info, instrument};

use crate::config::ExampleAppConfig;
use crate::content::{
    Category, ContentBackend, ContentError, Course, EntryQuery, Layout, Lesson, Locale, Space,
    SystemProperties,
};
use crate::domain::deeplink::DeepLinkResolver;
use crate::domain::entry_state::{entry_state, EntryState};
use crate::domain::error::DomainError;
use crate::domain::locale::{LocaleResolver, LocaleSelection, SupportedLocales};
use crate::domain::localizer::Localizer;
use crate::domain::options::{Api, EffectiveOptions, OptionsStore};
use crate::domain::session::{Session, SessionKey, SessionStore};
use crate::domain::validation::{CredentialValidator, FieldError, SelectedOptions};

const HOME_LAYOUT_INCLUDE: u32 = 4;
const COURSE_INCLUDE: u32 = 5;

/// Categories and courses for the catalogue pages.
#[derive(Debug, Clone)]
pub struct Catalogue {
    pub categories: Vec<Category>,
    /// Newest first; filtered when a category was requested.
    pub courses: Vec<Course>,
    pub category: Option<Category>,
}

#[derive(Debug, Clone)]
pub struct LessonPage {
    pub course: Course,
    pub lesson: Lesson,
    pub next_lesson_slug: Option<String>,
}

/// Stashed result of a rejected credential change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettingsErrors {
    pub errors: Vec<FieldError>,
    pub attempted: SelectedOptions,
}

/// Backend locales and the one matching the request.
#[derive(Debug, Clone)]
pub struct LocaleOverview {
    pub locales: Vec<Locale>,
    pub selected: Option<Locale>,
}

/// Application service shared by the middleware pipeline and page handlers.
pub struct ExampleAppService {
    backend: Arc<dyn ContentBackend>,
    options: OptionsStore,
    sessions: SessionStore,
    localizer: Arc<Localizer>,
    locales: LocaleResolver,
    validator: Arc<CredentialValidator>,
    deeplinks: DeepLinkResolver,
    session_cookie: String,
}

impl ExampleAppService {
    pub fn new(cfg: &ExampleAppConfig, backend: Arc<dyn ContentBackend>, localizer: Localizer) -> Self {
        let localizer = Arc::new(localizer);
        let options = OptionsStore::new(EffectiveOptions::from(&cfg.contentful));
        let validator = Arc::new(CredentialValidator::new(backend.clone(), localizer.clone()));
        let supported = SupportedLocales::new(cfg.localization.supported_locales.iter().cloned());
        let locales = LocaleResolver::new(
            backend.clone(),
            supported,
            cfg.localization.default_locale.clone(),
        );

        Self {
            deeplinks: DeepLinkResolver::new(options.clone(), validator.clone()),
            sessions: SessionStore::new(Duration::from_secs(cfg.session.idle_timeout_secs)),
            session_cookie: cfg.session.cookie_name.clone(),
            backend,
            options,
            localizer,
            locales,
            validator,
        }
    }

    pub fn options(&self) -> &OptionsStore {
        &self.options
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    pub fn localizer(&self) -> &Localizer {
        &self.localizer
    }

    pub fn locales(&self) -> &LocaleResolver {
        &self.locales
    }

    pub fn deeplinks(&self) -> &DeepLinkResolver {
        &self.deeplinks
    }

    pub fn session_cookie(&self) -> &str {
        &self.session_cookie
    }

    fn not_found(&self, locale: &LocaleSelection, key: &str) -> DomainError {
        DomainError::not_found(self.localizer.get(&locale.effective, key))
    }

    async fn entries<T: DeserializeOwned>(
        &self,
        options: &EffectiveOptions,
        query: &EntryQuery,
    ) -> Result<Vec<T>, DomainError> {
        let items = self.backend.get_entries(options, query).await?;
        items
            .into_iter()
            .map(|item: Value| serde_json::from_value(item).map_err(ContentError::from))
            .collect::<Result<Vec<T>, ContentError>>()
            .map_err(DomainError::from)
    }

    #[instrument(name = "example_app.service.home_layout", skip_all, fields(locale = %locale.content_locale()))]
    pub async fn home_layout(
        &self,
        options: &EffectiveOptions,
        locale: &LocaleSelection,
    ) -> Result<Layout, DomainError> {
        let query = EntryQuery::new()
            .content_type("layout")
            .field_equals("slug", "home")
            .include(HOME_LAYOUT_INCLUDE)
            .locale(locale.content_locale());

        self.entries::<Layout>(options, &query)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| self.not_found(locale, "errorMessage404Route"))
    }

    /// All categories and courses, optionally narrowed to one category slug.
    #[instrument(name = "example_app.service.catalogue", skip_all, fields(category = ?category))]
    pub async fn catalogue(
        &self,
        options: &EffectiveOptions,
        locale: &LocaleSelection,
        category: Option<&str>,
    ) -> Result<Catalogue, DomainError> {
        let categories: Vec<Category> = self
            .entries(
                options,
                &EntryQuery::new()
                    .content_type("category")
                    .include(COURSE_INCLUDE)
                    .locale(locale.content_locale()),
            )
            .await?;
        let mut courses: Vec<Course> = self
            .entries(
                options,
                &EntryQuery::new()
                    .content_type("course")
                    .include(COURSE_INCLUDE)
                    .locale(locale.content_locale())
                    .order("-sys.createdAt"),
            )
            .await?;

        let category = match category {
            Some(slug) => {
                let slug = slug.to_lowercase();
                let found = categories
                    .iter()
                    .find(|c| c.slug == slug)
                    .cloned()
                    .ok_or_else(|| self.not_found(locale, "errorMessage404Category"))?;
                courses.retain(|c| c.in_category(&slug));
                Some(found)
            }
            None => None,
        };

        debug!(courses = courses.len(), categories = categories.len(), "Loaded catalogue");
        Ok(Catalogue {
            categories,
            courses,
            category,
        })
    }

    #[instrument(name = "example_app.service.course", skip_all, fields(slug = %slug))]
    pub async fn course(
        &self,
        options: &EffectiveOptions,
        locale: &LocaleSelection,
        slug: &str,
    ) -> Result<Course, DomainError> {
        let query = EntryQuery::new()
            .content_type("course")
            .field_equals("slug", slug.to_lowercase())
            .include(COURSE_INCLUDE)
            .locale(locale.content_locale());

        self.entries::<Course>(options, &query)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| self.not_found(locale, "errorMessage404Course"))
    }

    pub async fn lesson(
        &self,
        options: &EffectiveOptions,
        locale: &LocaleSelection,
        course_slug: &str,
        lesson_slug: &str,
    ) -> Result<LessonPage, DomainError> {
        let course = self.course(options, locale, course_slug).await?;
        let lesson = course
            .lesson(lesson_slug)
            .cloned()
            .ok_or_else(|| self.not_found(locale, "errorMessage404Lesson"))?;
        let next_lesson_slug = course.next_lesson_slug(&lesson).map(str::to_string);

        Ok(LessonPage {
            course,
            lesson,
            next_lesson_slug,
        })
    }

    pub async fn space(&self, options: &EffectiveOptions) -> Result<Space, DomainError> {
        Ok(self.backend.get_space(options).await?)
    }

    pub async fn entry_state(
        &self,
        options: &EffectiveOptions,
        preview: &[SystemProperties],
    ) -> EntryState {
        entry_state(self.backend.as_ref(), options, preview).await
    }

    /// Backend locales; the selection is the content locale when the backend
    /// knows it, else the backend default.
    pub async fn locale_overview(
        &self,
        options: &EffectiveOptions,
        locale: &LocaleSelection,
    ) -> Result<LocaleOverview, DomainError> {
        let space = self.space(options).await?;
        let selected = space
            .locale(locale.content_locale())
            .or_else(|| space.default_locale())
            .cloned();
        Ok(LocaleOverview {
            locales: space.locales,
            selected,
        })
    }

    /// Errors stashed by a rejected deep link; cleared once read.
    pub fn take_settings_errors(&self, session: &Session) -> Option<SettingsErrors> {
        let errors: Vec<FieldError> = session.take_json(SessionKey::SettingsErrors)?;
        let attempted = session
            .take_json(SessionKey::SettingsErrorsOptions)
            .unwrap_or_default();
        Some(SettingsErrors { errors, attempted })
    }

    /// Validate and store submitted credentials. The current preview flag is kept.
    #[instrument(name = "example_app.service.save_settings", skip_all, fields(space_id = %submitted.space_id))]
    pub async fn save_settings(
        &self,
        session: &Session,
        submitted: &SelectedOptions,
        locale: &str,
    ) -> Result<(), DomainError> {
        let current = self.options.get_effective_options(session);
        let candidate = current.with_credentials(
            &submitted.space_id,
            &submitted.delivery_token,
            &submitted.preview_token,
        );

        let errors = self.validator.validate(&candidate, locale).await;
        if !errors.is_empty() {
            return Err(DomainError::validation(errors));
        }

        session.set_editorial_features(submitted.editorial_features);
        self.options.set_override(session, &candidate);
        info!("Stored credential override");
        Ok(())
    }

    pub fn reset_credentials(&self, session: &Session) {
        self.options.clear_override(session);
        info!("Cleared credential override");
    }

    pub fn switch_api(&self, session: &Session, api: Api) {
        let current = self.options.get_effective_options(session);
        self.options
            .set_override(session, &current.with_preview(api.is_preview()));
    }
}
