use std::sync::Arc;

use axum::extract::{Extension, Form, FromRequestParts, Path};
use axum::http::header::{LOCATION, SET_COOKIE};
use axum::http::request::Parts;
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use tracing::{debug, info};

use crate::api::rest::dto::{
    CourseDto, CoursesDto, HomeDto, LessonDto, LocalesDto, PageContextDto, PageDto, SettingsDto,
    SettingsForm, SwitchApiForm,
};
use crate::api::rest::error::Problem;
use crate::content::SystemProperties;
use crate::domain::breadcrumbs::{slug_label, Breadcrumbs};
use crate::domain::entry_state::EntryState;
use crate::domain::locale::LocaleSelection;
use crate::domain::options::{Api, EffectiveOptions};
use crate::domain::service::ExampleAppService;
use crate::domain::session::Session;
use crate::domain::validation::SelectedOptions;
use crate::domain::visited::VisitedSet;

type PageResult<T> = Result<Json<PageDto<T>>, Problem>;

/// Everything the request pipeline attached for a page handler.
pub struct PageRequest {
    pub svc: Arc<ExampleAppService>,
    pub session: Session,
    pub locale: LocaleSelection,
    pub crumbs: Breadcrumbs,
    pub options: EffectiveOptions,
}

impl<S: Send + Sync> FromRequestParts<S> for PageRequest {
    type Rejection = Problem;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let ext = &parts.extensions;
        let svc = ext
            .get::<Arc<ExampleAppService>>()
            .cloned()
            .ok_or_else(|| missing_extension("service"))?;
        let session = ext
            .get::<Session>()
            .cloned()
            .ok_or_else(|| missing_extension("session"))?;
        let locale = ext
            .get::<LocaleSelection>()
            .cloned()
            .ok_or_else(|| missing_extension("locale"))?;
        let crumbs = ext
            .get::<Breadcrumbs>()
            .cloned()
            .ok_or_else(|| missing_extension("breadcrumbs"))?;
        let options = svc.options().get_effective_options(&session);

        Ok(Self {
            svc,
            session,
            locale,
            crumbs,
            options,
        })
    }
}

fn missing_extension(what: &str) -> Problem {
    Problem::new(
        500,
        "Internal Error",
        format!("request pipeline did not provide {what}"),
    )
}

impl PageRequest {
    fn editorial(&self) -> bool {
        self.session.editorial_features_enabled()
    }

    fn label(&self, key: &str) -> String {
        self.svc.localizer().get(&self.locale.effective, key)
    }

    fn page<T>(&self, title: Option<&str>, data: T) -> PageDto<T> {
        PageDto {
            context: PageContextDto {
                locale: self.locale.effective.clone(),
                content_locale: self.locale.content_locale().to_string(),
                breadcrumbs: self.crumbs.snapshot(),
                editorial_features: self.editorial(),
                api: self.options.api(),
                title: self
                    .svc
                    .localizer()
                    .page_title(&self.locale.effective, title),
            },
            data,
        }
    }

    async fn entry_state(&self, sys: &[SystemProperties]) -> Option<EntryState> {
        if !self.editorial() {
            return None;
        }
        Some(self.svc.entry_state(&self.options, sys).await)
    }
}

fn found(location: &str) -> Response {
    match HeaderValue::from_str(location) {
        Ok(value) => (StatusCode::FOUND, [(LOCATION, value)]).into_response(),
        Err(_) => (StatusCode::FOUND, [(LOCATION, HeaderValue::from_static("/"))]).into_response(),
    }
}

/// Mark `id` visited and build the refreshed cookie.
fn visit(headers: &HeaderMap, id: &str) -> Result<(VisitedSet, HeaderValue), Problem> {
    let mut visited = VisitedSet::from_headers(headers);
    visited.add(id);
    let cookie = visited
        .to_set_cookie(Utc::now())
        .map_err(|e| Problem::new(500, "Internal Error", e.to_string()))?;
    Ok((visited, cookie))
}

/// Only local absolute paths are accepted as redirect targets.
fn safe_local_path(candidate: Option<&str>) -> &str {
    match candidate {
        Some(p) if p.starts_with('/') && !p.starts_with("//") && !p.starts_with("/\\") => p,
        _ => "/",
    }
}

/// `target` with its `api` query pair replaced by `api`; other pairs and any
/// fragment are kept.
fn with_api_param(target: &str, api: Api) -> String {
    let (target, fragment) = match target.split_once('#') {
        Some((t, f)) => (t, Some(f)),
        None => (target, None),
    };
    let (path, query) = target.split_once('?').unwrap_or((target, ""));

    let mut serializer = url::form_urlencoded::Serializer::new(String::new());
    for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
        if key != "api" {
            serializer.append_pair(&key, &value);
        }
    }
    serializer.append_pair("api", api.as_str());

    let mut location = format!("{path}?{}", serializer.finish());
    if let Some(fragment) = fragment {
        location.push('#');
        location.push_str(fragment);
    }
    location
}

#[tracing::instrument(name = "example_app.home", skip_all)]
pub async fn home(page: PageRequest) -> PageResult<HomeDto> {
    let layout = page.svc.home_layout(&page.options, &page.locale).await?;
    let entry_state = page.entry_state(&layout.system_properties()).await;
    let title = layout.title.clone();

    Ok(Json(page.page(Some(&title), HomeDto { layout, entry_state })))
}

#[tracing::instrument(name = "example_app.courses", skip_all)]
pub async fn courses(page: PageRequest) -> PageResult<CoursesDto> {
    let catalogue = page.svc.catalogue(&page.options, &page.locale, None).await?;
    let title = page.label("allCoursesLabel");

    Ok(Json(page.page(
        Some(&title),
        CoursesDto {
            categories: catalogue.categories,
            courses: catalogue.courses,
            category: None,
        },
    )))
}

#[tracing::instrument(name = "example_app.courses_by_category", skip(page))]
pub async fn courses_by_category(
    page: PageRequest,
    Path(category): Path<String>,
) -> PageResult<CoursesDto> {
    let catalogue = page
        .svc
        .catalogue(&page.options, &page.locale, Some(&category))
        .await?;

    let title = match &catalogue.category {
        Some(c) => {
            page.crumbs.replace_label_for_slug(&slug_label(&category), &c.title);
            c.title.clone()
        }
        None => page.label("allCoursesLabel"),
    };

    Ok(Json(page.page(
        Some(&title),
        CoursesDto {
            categories: catalogue.categories,
            courses: catalogue.courses,
            category: catalogue.category,
        },
    )))
}

#[tracing::instrument(name = "example_app.course", skip(page, headers))]
pub async fn course(
    page: PageRequest,
    Path(slug): Path<String>,
    headers: HeaderMap,
) -> Result<Response, Problem> {
    let course = page.svc.course(&page.options, &page.locale, &slug).await?;
    page.crumbs.replace_label_for_slug(&slug_label(&slug), &course.title);

    let (visited, cookie) = visit(&headers, &course.sys.id)?;
    let entry_state = page.entry_state(std::slice::from_ref(&course.sys)).await;
    let title = course.title.clone();

    let body = page.page(
        Some(&title),
        CourseDto {
            course,
            visited: visited.ids().to_vec(),
            entry_state,
        },
    );
    Ok(([(SET_COOKIE, cookie)], Json(body)).into_response())
}

/// The lessons collection has no page of its own.
#[tracing::instrument(name = "example_app.lessons", skip_all)]
pub async fn lessons(Path(slug): Path<String>) -> Response {
    found(&format!("/courses/{}", urlencoding::encode(&slug)))
}

#[tracing::instrument(name = "example_app.lesson", skip(page, headers))]
pub async fn lesson(
    page: PageRequest,
    Path((slug, lesson_slug)): Path<(String, String)>,
    headers: HeaderMap,
) -> Result<Response, Problem> {
    let lesson_page = page
        .svc
        .lesson(&page.options, &page.locale, &slug, &lesson_slug)
        .await?;
    page.crumbs
        .replace_label_for_slug(&slug_label(&slug), &lesson_page.course.title);
    page.crumbs
        .replace_label_for_slug(&slug_label(&lesson_slug), &lesson_page.lesson.title);

    let (visited, cookie) = visit(&headers, &lesson_page.lesson.sys.id)?;
    let entry_state = page.entry_state(&lesson_page.lesson.system_properties()).await;
    let title = lesson_page.lesson.title.clone();

    let body = page.page(
        Some(&title),
        LessonDto {
            course: lesson_page.course,
            lesson: lesson_page.lesson,
            next_lesson_slug: lesson_page.next_lesson_slug,
            visited: visited.ids().to_vec(),
            entry_state,
        },
    );
    Ok(([(SET_COOKIE, cookie)], Json(body)).into_response())
}

#[tracing::instrument(name = "example_app.settings", skip_all)]
pub async fn settings(page: PageRequest) -> PageResult<SettingsDto> {
    let title = page.label("settingsLabel");
    let is_custom = page.svc.options().is_using_custom_credentials(&page.session);

    let data = match page.svc.take_settings_errors(&page.session) {
        Some(stashed) => SettingsDto {
            options: stashed.attempted,
            space_name: None,
            is_using_custom_credentials: is_custom,
            invalid: true,
            errors: stashed.errors,
        },
        None => {
            let space_name = match page.svc.space(&page.options).await {
                Ok(space) => Some(space.name),
                Err(e) => {
                    debug!(error = %e, "Space name unavailable for settings page");
                    None
                }
            };
            SettingsDto {
                options: SelectedOptions::from_options(&page.options, page.editorial()),
                space_name,
                is_using_custom_credentials: is_custom,
                invalid: false,
                errors: Vec::new(),
            }
        }
    };

    Ok(Json(page.page(Some(&title), data)))
}

#[tracing::instrument(name = "example_app.save_settings", skip_all)]
pub async fn save_settings(
    page: PageRequest,
    Form(form): Form<SettingsForm>,
) -> Result<Response, Problem> {
    let submitted = form.into_selected();
    page.svc
        .save_settings(&page.session, &submitted, &page.locale.effective)
        .await?;
    Ok(found("/settings"))
}

#[tracing::instrument(name = "example_app.reset_credentials", skip_all)]
pub async fn reset_credentials(
    Extension(svc): Extension<Arc<ExampleAppService>>,
    Extension(session): Extension<Session>,
) -> Response {
    svc.reset_credentials(&session);
    found("/settings")
}

#[tracing::instrument(name = "example_app.switch_api", skip(svc, session))]
pub async fn switch_api(
    Extension(svc): Extension<Arc<ExampleAppService>>,
    Extension(session): Extension<Session>,
    Form(form): Form<SwitchApiForm>,
) -> Response {
    let api = Api::from_param(&form.api);
    svc.switch_api(&session, api);

    let target = safe_local_path(form.prev_page.as_deref());
    info!(api = api.as_str(), "Switched content API");
    found(&with_api_param(target, api))
}

#[tracing::instrument(name = "example_app.locales", skip_all)]
pub async fn locales(page: PageRequest) -> PageResult<LocalesDto> {
    let overview = page.svc.locale_overview(&page.options, &page.locale).await?;
    let title = page.label("localesLabel");

    Ok(Json(page.page(
        Some(&title),
        LocalesDto {
            locales: overview.locales,
            selected: overview.selected,
        },
    )))
}

pub async fn healthz() -> &'static str {
    "ok"
}
