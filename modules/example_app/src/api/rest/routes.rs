use std::sync::Arc;

use axum::http::header::CACHE_CONTROL;
use axum::routing::get;
use axum::{Extension, Json, Router};

use crate::api::middleware::apply_pipeline;
use crate::api::rest::dto::{
    CourseDto, CoursesDto, HomeDto, LessonDto, LocalesDto, SettingsDto, SettingsForm,
    SwitchApiForm,
};
use crate::api::rest::handlers;
use crate::api::rest::openapi::{ApiDocs, Operation};
use crate::domain::service::ExampleAppService;

const TAG_PAGES: &str = "Pages";
const TAG_SETTINGS: &str = "Settings";

/// Page routes, wrapped in the request pipeline.
pub fn register_routes(
    mut router: Router,
    docs: &mut ApiDocs,
    service: Arc<ExampleAppService>,
) -> Router {
    // GET / - home layout
    router = Operation::get("/")
        .operation_id("example_app.home")
        .summary("Home page layout")
        .tag(TAG_PAGES)
        .pipeline_params()
        .page_response::<HomeDto>(docs, "Home layout")
        .problem_response(docs, 404, "No home layout")
        .problem_response(docs, 502, "Content backend error")
        .redirect_response("Deep-link credentials rejected")
        .register(router, docs, handlers::home);

    // GET /courses - all courses
    router = Operation::get("/courses")
        .operation_id("example_app.courses")
        .summary("All categories and courses, newest course first")
        .tag(TAG_PAGES)
        .pipeline_params()
        .page_response::<CoursesDto>(docs, "Course catalogue")
        .problem_response(docs, 502, "Content backend error")
        .register(router, docs, handlers::courses);

    // GET /courses/categories/{category} - courses of one category
    router = Operation::get("/courses/categories/{category}")
        .operation_id("example_app.courses_by_category")
        .summary("Courses narrowed to one category")
        .tag(TAG_PAGES)
        .path_param("category", "Category slug, matched lowercased")
        .pipeline_params()
        .page_response::<CoursesDto>(docs, "Course catalogue for the category")
        .problem_response(docs, 404, "Unknown category")
        .problem_response(docs, 502, "Content backend error")
        .register(router, docs, handlers::courses_by_category);

    // GET /courses/{slug} - one course
    router = Operation::get("/courses/{slug}")
        .operation_id("example_app.course")
        .summary("Course by slug; marks it visited")
        .tag(TAG_PAGES)
        .path_param("slug", "Course slug")
        .pipeline_params()
        .page_response::<CourseDto>(docs, "Course")
        .problem_response(docs, 404, "Unknown course")
        .problem_response(docs, 502, "Content backend error")
        .register(router, docs, handlers::course);

    // GET /courses/{slug}/lessons - redirect to the course
    router = Operation::get("/courses/{slug}/lessons")
        .operation_id("example_app.lessons")
        .summary("Redirects to the course page")
        .tag(TAG_PAGES)
        .path_param("slug", "Course slug")
        .redirect_response("Course page")
        .register(router, docs, handlers::lessons);

    // GET /courses/{slug}/lessons/{lesson_slug} - one lesson
    router = Operation::get("/courses/{slug}/lessons/{lesson_slug}")
        .operation_id("example_app.lesson")
        .summary("Lesson of a course; marks it visited")
        .tag(TAG_PAGES)
        .path_param("slug", "Course slug")
        .path_param("lesson_slug", "Lesson slug")
        .pipeline_params()
        .page_response::<LessonDto>(docs, "Lesson with its course")
        .problem_response(docs, 404, "Unknown course or lesson")
        .problem_response(docs, 502, "Content backend error")
        .register(router, docs, handlers::lesson);

    // GET /settings - current credentials or stashed validation errors
    router = Operation::get("/settings")
        .operation_id("example_app.settings")
        .summary("Current credentials, or the errors of a rejected change")
        .tag(TAG_SETTINGS)
        .pipeline_params()
        .page_response::<SettingsDto>(docs, "Settings")
        .register(router, docs, handlers::settings);

    // POST /settings - store credentials
    router = Operation::post("/settings")
        .operation_id("example_app.save_settings")
        .summary("Validate and store credentials for this session")
        .tag(TAG_SETTINGS)
        .form_request::<SettingsForm>(docs)
        .redirect_response("Stored; back to the settings page")
        .problem_response(docs, 422, "Invalid credentials")
        .register(router, docs, handlers::save_settings);

    // POST /settings/reset-credentials
    router = Operation::post("/settings/reset-credentials")
        .operation_id("example_app.reset_credentials")
        .summary("Drop the session credential override")
        .tag(TAG_SETTINGS)
        .redirect_response("Back to the settings page")
        .register(router, docs, handlers::reset_credentials);

    // POST /settings/switch-api
    router = Operation::post("/settings/switch-api")
        .operation_id("example_app.switch_api")
        .summary("Switch between delivery and preview API")
        .tag(TAG_SETTINGS)
        .form_request::<SwitchApiForm>(docs)
        .redirect_response("Back to the previous page")
        .register(router, docs, handlers::switch_api);

    // GET /locales
    router = Operation::get("/locales")
        .operation_id("example_app.locales")
        .summary("Locales defined by the content backend")
        .tag(TAG_PAGES)
        .pipeline_params()
        .page_response::<LocalesDto>(docs, "Locales and the selected one")
        .problem_response(docs, 502, "Content backend error")
        .register(router, docs, handlers::locales);

    apply_pipeline(router, service.clone()).layer(Extension(service))
}

/// Full application router: pipeline-wrapped pages plus health and OpenAPI.
pub fn build_router(service: Arc<ExampleAppService>) -> Router {
    let mut docs = ApiDocs::new();
    let pages = register_routes(Router::new(), &mut docs, service);

    let health = Operation::get("/healthz")
        .operation_id("example_app.healthz")
        .summary("Liveness probe")
        .text_response("Service is up")
        .register(Router::new(), &mut docs, handlers::healthz);

    let openapi = Arc::new(docs.build());
    let docs_route = Router::new().route(
        "/openapi.json",
        get(move || {
            let openapi = openapi.clone();
            async move { ([(CACHE_CONTROL, "no-store")], Json(openapi.as_ref().clone())) }
        }),
    );

    pages.merge(health).merge(docs_route)
}
