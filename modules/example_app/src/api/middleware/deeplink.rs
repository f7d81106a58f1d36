use std::sync::Arc;

use axum::extract::Request;
use axum::middleware::Next;
use axum::response::Response;
use tracing::warn;

use super::{no_cache_redirect, query_pairs};
use crate::domain::deeplink::{DeepLinkOutcome, DeepLinkParams};
use crate::domain::service::ExampleAppService;
use crate::domain::session::Session;

/// Apply credential / API / editorial deep-link parameters. Rejected
/// credentials short-circuit with a redirect to the settings page.
pub async fn deeplink_middleware(svc: Arc<ExampleAppService>, req: Request, next: Next) -> Response {
    let params = DeepLinkParams::from_pairs(query_pairs(req.uri()));
    if params.is_empty() {
        return next.run(req).await;
    }

    let Some(session) = req.extensions().get::<Session>().cloned() else {
        warn!("Deep-link parameters ignored: no session on request");
        return next.run(req).await;
    };

    let locale = svc.locales().remembered_locale(&session);
    match svc.deeplinks().apply(&params, &session, &locale).await {
        DeepLinkOutcome::Continue => next.run(req).await,
        DeepLinkOutcome::InvalidCredentials(_) => no_cache_redirect("/settings"),
    }
}
