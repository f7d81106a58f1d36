//! End-to-end tests of the router against a mocked content API.

use appkit_bootstrap::{AppConfig, AppConfigProvider};
use axum::body::Body;
use axum::http::header::{CACHE_CONTROL, CONTENT_TYPE, COOKIE, LOCATION, SET_COOKIE};
use axum::http::{Request, StatusCode};
use axum::response::Response;
use axum::Router;
use example_app::ExampleAppModule;
use httpmock::prelude::*;
use serde_json::{json, Value};
use tower::ServiceExt;

fn router_for(server: &MockServer) -> Router {
    let mut config = AppConfig::default();
    config.modules.insert(
        "example_app".to_string(),
        json!({
            "contentful": {
                "space_id": "space1",
                "delivery_api_key": "cda-token",
                "preview_api_key": "cpa-token",
                "delivery_base_url": server.base_url(),
                "preview_base_url": format!("{}/preview", server.base_url()),
                "request_timeout_secs": 5
            }
        }),
    );

    let module = ExampleAppModule::default();
    module.init(&AppConfigProvider::new(config)).unwrap();
    module.router().unwrap()
}

fn link(id: &str) -> Value {
    json!({ "sys": { "type": "Link", "linkType": "Entry", "id": id } })
}

fn content_type(id: &str) -> Value {
    json!({ "sys": { "type": "Link", "linkType": "ContentType", "id": id } })
}

fn course_collection() -> Value {
    json!({
        "items": [{
            "sys": { "id": "course-1", "contentType": content_type("course"), "updatedAt": "2024-03-01T10:00:00Z" },
            "fields": {
                "title": "Hello Contentful",
                "slug": "hello-contentful",
                "lessons": [link("lesson-1"), link("lesson-2")]
            }
        }],
        "includes": {
            "Entry": [
                {
                    "sys": { "id": "lesson-1", "contentType": content_type("lesson") },
                    "fields": { "title": "First Steps", "slug": "first-steps", "modules": [] }
                },
                {
                    "sys": { "id": "lesson-2", "contentType": content_type("lesson") },
                    "fields": { "title": "Next Steps", "slug": "next-steps", "modules": [] }
                }
            ]
        }
    })
}

async fn mock_space(server: &MockServer) {
    server
        .mock_async(|when, then| {
            when.method(GET).path("/spaces/space1");
            then.status(200).json_body(json!({
                "name": "Demo Space",
                "locales": [
                    { "code": "en-US", "name": "English", "default": true },
                    { "code": "de-DE", "name": "German" },
                    { "code": "de-CH", "name": "Swiss German", "fallbackCode": "de-DE" }
                ]
            }));
        })
        .await;
}

async fn get(router: &Router, uri: &str, cookie: Option<&str>) -> Response {
    let mut req = Request::builder().uri(uri);
    if let Some(cookie) = cookie {
        req = req.header(COOKIE, cookie);
    }
    router
        .clone()
        .oneshot(req.body(Body::empty()).unwrap())
        .await
        .unwrap()
}

async fn post_form(router: &Router, uri: &str, body: &str, cookie: Option<&str>) -> Response {
    let mut req = Request::builder()
        .method("POST")
        .uri(uri)
        .header(CONTENT_TYPE, "application/x-www-form-urlencoded");
    if let Some(cookie) = cookie {
        req = req.header(COOKIE, cookie);
    }
    router
        .clone()
        .oneshot(req.body(Body::from(body.to_string())).unwrap())
        .await
        .unwrap()
}

async fn json_body(res: Response) -> Value {
    let bytes = axum::body::to_bytes(res.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// `name=value` of the first `Set-Cookie` whose name starts with `prefix`.
fn cookie_pair(res: &Response, prefix: &str) -> Option<String> {
    res.headers()
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .filter(|v| v.starts_with(prefix))
        .map(|v| v.split(';').next().unwrap_or_default().to_string())
        .next()
}

#[tokio::test]
async fn home_page_is_wrapped_in_page_context() {
    let server = MockServer::start_async().await;
    let layout = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/spaces/space1/entries")
                .query_param("content_type", "layout")
                .query_param("fields.slug", "home")
                .query_param("include", "4")
                .query_param("locale", "en-US")
                .header("authorization", "Bearer cda-token");
            then.status(200).json_body(json!({
                "items": [{
                    "sys": { "id": "home", "contentType": content_type("layout") },
                    "fields": { "title": "Welcome", "slug": "home", "contentModules": [] }
                }]
            }));
        })
        .await;
    let router = router_for(&server);

    let res = get(&router, "/", None).await;

    assert_eq!(res.status(), StatusCode::OK);
    assert!(cookie_pair(&res, "example_app.session=").is_some());
    let body = json_body(res).await;
    layout.assert_async().await;
    assert_eq!(body["context"]["title"], "Welcome — The Example App");
    assert_eq!(body["context"]["api"], "cda");
    assert_eq!(body["context"]["locale"], "en-US");
    assert_eq!(body["context"]["breadcrumbs"], json!([{ "label": "Home", "path": "/" }]));
    assert_eq!(body["data"]["layout"]["title"], "Welcome");
}

#[tokio::test]
async fn course_page_relabels_breadcrumb_and_tracks_visits() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/spaces/space1/entries")
                .query_param("content_type", "course")
                .query_param("fields.slug", "hello-contentful");
            then.status(200).json_body(course_collection());
        })
        .await;
    let router = router_for(&server);

    let res = get(
        &router,
        "/courses/hello-contentful/lessons/first-steps",
        Some("ContentfulVisitedLessons=course-1"),
    )
    .await;

    assert_eq!(res.status(), StatusCode::OK);
    let visited = cookie_pair(&res, "ContentfulVisitedLessons=").unwrap();
    assert_eq!(visited, "ContentfulVisitedLessons=course-1%3Blesson-1");

    let body = json_body(res).await;
    let labels: Vec<&str> = body["context"]["breadcrumbs"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["label"].as_str().unwrap())
        .collect();
    assert_eq!(
        labels,
        vec!["Home", "Courses", "Hello Contentful", "Lessons", "First Steps"]
    );
    assert_eq!(body["data"]["next_lesson_slug"], "next-steps");
    assert_eq!(body["data"]["visited"], json!(["course-1", "lesson-1"]));
    assert!(body["data"].get("entry_state").is_none());
}

#[tokio::test]
async fn unknown_course_is_problem_and_lessons_index_redirects() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/spaces/space1/entries");
            then.status(200).json_body(json!({ "items": [] }));
        })
        .await;
    let router = router_for(&server);

    let res = get(&router, "/courses/missing", None).await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    assert_eq!(res.headers()[CONTENT_TYPE], "application/problem+json");
    let problem = json_body(res).await;
    assert_eq!(
        problem["detail"],
        "The course you are looking for could not be found."
    );

    let res = get(&router, "/courses/missing/lessons", None).await;
    assert_eq!(res.status(), StatusCode::FOUND);
    assert_eq!(res.headers()[LOCATION], "/courses/missing");
}

#[tokio::test]
async fn fallback_locale_is_remembered_across_requests() {
    let server = MockServer::start_async().await;
    mock_space(&server).await;
    let swiss = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/spaces/space1/entries")
                .query_param("locale", "de-CH");
            then.status(200).json_body(json!({ "items": [] }));
        })
        .await;
    let router = router_for(&server);

    let res = get(&router, "/courses?locale=de-CH", None).await;
    assert_eq!(res.status(), StatusCode::OK);
    let session = cookie_pair(&res, "example_app.session=").unwrap();
    let body = json_body(res).await;
    assert_eq!(body["context"]["locale"], "de-DE");
    assert_eq!(body["context"]["content_locale"], "de-CH");
    assert_eq!(body["context"]["breadcrumbs"][1]["label"], "Kurse");

    let later = json_body(get(&router, "/courses", Some(&session)).await).await;
    assert_eq!(later["context"]["locale"], "de-DE");
    assert_eq!(later["context"]["content_locale"], "de-CH");

    // two catalogue queries per request
    swiss.assert_hits_async(4).await;
}

#[tokio::test]
async fn rejected_deep_link_is_shown_once_on_settings() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/spaces/bad-space");
            then.status(404)
                .json_body(json!({ "message": "The resource could not be found." }));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/preview/spaces/bad-space");
            then.status(404)
                .json_body(json!({ "message": "The resource could not be found." }));
        })
        .await;
    mock_space(&server).await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/preview/spaces/space1");
            then.status(200).json_body(json!({ "name": "Demo Space", "locales": [] }));
        })
        .await;
    let router = router_for(&server);

    let res = get(
        &router,
        "/courses?space_id=bad-space&delivery_token=d&preview_token=p",
        None,
    )
    .await;
    assert_eq!(res.status(), StatusCode::FOUND);
    assert_eq!(res.headers()[LOCATION], "/settings");
    assert_eq!(res.headers()[CACHE_CONTROL], "no-cache, no-store");
    let session = cookie_pair(&res, "example_app.session=").unwrap();

    let first = json_body(get(&router, "/settings", Some(&session)).await).await;
    assert_eq!(first["data"]["invalid"], true);
    assert_eq!(first["data"]["options"]["space_id"], "bad-space");
    assert_eq!(first["data"]["errors"][0]["key"], "space_id");
    assert_eq!(first["context"]["title"], "Settings — The Example App");

    let second = json_body(get(&router, "/settings", Some(&session)).await).await;
    assert_eq!(second["data"]["invalid"], false);
    assert_eq!(second["data"]["options"]["space_id"], "space1");
    assert_eq!(second["data"]["space_name"], "Demo Space");
    assert_eq!(second["data"]["is_using_custom_credentials"], false);
}

#[tokio::test]
async fn settings_form_validates_then_stores_override() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/spaces/space2")
                .header("authorization", "Bearer wrong");
            then.status(401).json_body(json!({ "message": "invalid token" }));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/spaces/space2")
                .header("authorization", "Bearer d2");
            then.status(200).json_body(json!({ "name": "Second", "locales": [] }));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/preview/spaces/space2");
            then.status(200).json_body(json!({ "name": "Second", "locales": [] }));
        })
        .await;
    let router = router_for(&server);

    let res = post_form(
        &router,
        "/settings",
        "space_id=space2&delivery_token=wrong&preview_token=p2",
        None,
    )
    .await;
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let session = cookie_pair(&res, "example_app.session=").unwrap();
    let problem = json_body(res).await;
    assert_eq!(problem["errors"][0]["key"], "delivery_token");
    assert_eq!(problem["errors"][0]["message"], "Your Delivery API key is invalid.");

    let res = post_form(
        &router,
        "/settings",
        "space_id=space2&delivery_token=d2&preview_token=p2&editorial_features=on",
        Some(&session),
    )
    .await;
    assert_eq!(res.status(), StatusCode::FOUND);
    assert_eq!(res.headers()[LOCATION], "/settings");

    let settings = json_body(get(&router, "/settings", Some(&session)).await).await;
    assert_eq!(settings["data"]["options"]["space_id"], "space2");
    assert_eq!(settings["data"]["is_using_custom_credentials"], true);
    assert_eq!(settings["context"]["editorial_features"], true);

    let res = post_form(&router, "/settings/reset-credentials", "", Some(&session)).await;
    assert_eq!(res.status(), StatusCode::FOUND);
}

#[tokio::test]
async fn switch_api_redirects_back_and_uses_preview() {
    let server = MockServer::start_async().await;
    let preview = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/preview/spaces/space1/entries")
                .header("authorization", "Bearer cpa-token");
            then.status(200).json_body(json!({ "items": [] }));
        })
        .await;
    let router = router_for(&server);

    let res = post_form(
        &router,
        "/settings/switch-api",
        "api=cpa&prev_page=%2Fcourses",
        None,
    )
    .await;
    assert_eq!(res.status(), StatusCode::FOUND);
    assert_eq!(res.headers()[LOCATION], "/courses?api=cpa");
    let session = cookie_pair(&res, "example_app.session=").unwrap();

    let res = post_form(
        &router,
        "/settings/switch-api",
        "api=cpa&prev_page=https%3A%2F%2Fevil.example",
        Some(&session),
    )
    .await;
    assert_eq!(res.headers()[LOCATION], "/?api=cpa");

    let body = json_body(get(&router, "/courses", Some(&session)).await).await;
    assert_eq!(body["context"]["api"], "cpa");
    preview.assert_hits_async(2).await;
}

#[tokio::test]
async fn switch_api_survives_stale_api_in_previous_page() {
    let server = MockServer::start_async().await;
    let preview = server
        .mock_async(|when, then| {
            when.method(GET).path("/preview/spaces/space1/entries");
            then.status(200).json_body(json!({ "items": [] }));
        })
        .await;
    let router = router_for(&server);

    let res = post_form(
        &router,
        "/settings/switch-api",
        "api=cpa&prev_page=%2Fcourses%3Fapi%3Dcda",
        None,
    )
    .await;
    assert_eq!(res.status(), StatusCode::FOUND);
    let location = res.headers()[LOCATION].to_str().unwrap().to_string();
    assert_eq!(location, "/courses?api=cpa");
    let session = cookie_pair(&res, "example_app.session=").unwrap();

    let body = json_body(get(&router, &location, Some(&session)).await).await;
    assert_eq!(body["context"]["api"], "cpa");
    preview.assert_hits_async(2).await;
}

#[tokio::test]
async fn openapi_and_health_bypass_pipeline() {
    let server = MockServer::start_async().await;
    let router = router_for(&server);

    let res = get(&router, "/healthz", None).await;
    assert_eq!(res.status(), StatusCode::OK);
    assert!(res.headers().get(SET_COOKIE).is_none());

    let res = get(&router, "/openapi.json", None).await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.headers()[CACHE_CONTROL], "no-store");
    let doc = json_body(res).await;
    assert!(doc["paths"]["/courses/{slug}/lessons/{lesson_slug}"]["get"].is_object());
    assert!(doc["paths"]["/settings"]["post"].is_object());
    assert!(doc["paths"]["/healthz"]["get"].is_object());
    assert!(doc["components"]["schemas"]["Problem"].is_object());
}
