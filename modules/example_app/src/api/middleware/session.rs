use std::sync::Arc;

use axum::extract::Request;
use axum::http::header::SET_COOKIE;
use axum::http::HeaderValue;
use axum::middleware::Next;
use axum::response::Response;
use tracing::warn;

use crate::domain::service::ExampleAppService;
use crate::domain::visited::cookie_value;

/// Load or create the visitor's session and expose it as a request extension.
/// A cookie is issued only for newly created sessions.
pub async fn session_middleware(
    svc: Arc<ExampleAppService>,
    mut req: Request,
    next: Next,
) -> Response {
    let cookie = cookie_value(req.headers(), svc.session_cookie());
    let session = svc.sessions().load_or_create(cookie.as_deref());
    req.extensions_mut().insert(session.clone());

    let mut res = next.run(req).await;

    if session.is_new() {
        let cookie = format!(
            "{}={}; Path=/; HttpOnly; SameSite=Lax",
            svc.session_cookie(),
            session.id()
        );
        match HeaderValue::from_str(&cookie) {
            Ok(value) => {
                res.headers_mut().append(SET_COOKIE, value);
            }
            Err(e) => warn!(error = %e, "Session cookie name is not a valid header value"),
        }
    }
    res
}
