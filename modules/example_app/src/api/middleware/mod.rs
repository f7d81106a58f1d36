//! Request-entry pipeline: session, deep links, locale, breadcrumbs.
//!
//! Each stage is a plain async function over `(service, request, next)` and
//! communicates through request extensions.

use std::sync::Arc;

use axum::extract::Request;
use axum::http::header::{CACHE_CONTROL, LOCATION, PRAGMA};
use axum::http::{StatusCode, Uri};
use axum::middleware::{from_fn, Next};
use axum::response::{IntoResponse, Response};
use axum::Router;

use crate::domain::service::ExampleAppService;

pub mod breadcrumbs;
pub mod deeplink;
pub mod locale;
pub mod session;

/// Decoded query pairs in request order.
pub(crate) fn query_pairs(uri: &Uri) -> Vec<(String, String)> {
    uri.query()
        .map(|q| url::form_urlencoded::parse(q.as_bytes()).into_owned().collect())
        .unwrap_or_default()
}

/// First value of the named query parameter.
pub(crate) fn query_param(uri: &Uri, name: &str) -> Option<String> {
    query_pairs(uri)
        .into_iter()
        .find(|(k, _)| k == name)
        .map(|(_, v)| v)
}

/// `302 Found` that must not be cached.
pub(crate) fn no_cache_redirect(location: &str) -> Response {
    (
        StatusCode::FOUND,
        [
            (LOCATION, location),
            (CACHE_CONTROL, "no-cache, no-store"),
            (PRAGMA, "no-cache"),
        ],
    )
        .into_response()
}

/// Wrap `router` in the pipeline. The session stage runs first and
/// breadcrumbs last.
pub fn apply_pipeline(router: Router, svc: Arc<ExampleAppService>) -> Router {
    // Layers added later wrap the earlier ones, so add innermost first.
    let s = svc.clone();
    let router = router.layer(from_fn(move |req: Request, next: Next| {
        let s = s.clone();
        breadcrumbs::breadcrumbs_middleware(s, req, next)
    }));

    let s = svc.clone();
    let router = router.layer(from_fn(move |req: Request, next: Next| {
        let s = s.clone();
        locale::locale_middleware(s, req, next)
    }));

    let s = svc.clone();
    let router = router.layer(from_fn(move |req: Request, next: Next| {
        let s = s.clone();
        deeplink::deeplink_middleware(s, req, next)
    }));

    router.layer(from_fn(move |req: Request, next: Next| {
        let s = svc.clone();
        session::session_middleware(s, req, next)
    }))
}
