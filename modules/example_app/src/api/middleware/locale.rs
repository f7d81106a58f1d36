use std::sync::Arc;

use axum::extract::Request;
use axum::middleware::Next;
use axum::response::Response;

use super::query_param;
use crate::domain::locale::{LocaleContext, LocaleSelection};
use crate::domain::service::ExampleAppService;
use crate::domain::session::Session;

/// Resolve the request locale and expose it as a [`LocaleSelection`] extension.
pub async fn locale_middleware(svc: Arc<ExampleAppService>, mut req: Request, next: Next) -> Response {
    let selection = match req.extensions().get::<Session>() {
        Some(session) => {
            let query_locale = query_param(req.uri(), "locale");
            let options = svc.options().get_effective_options(session);
            svc.locales()
                .resolve(&LocaleContext {
                    query_locale: query_locale.as_deref(),
                    session,
                    options: &options,
                })
                .await
        }
        None => LocaleSelection::effective(svc.locales().default_locale()),
    };

    req.extensions_mut().insert(selection);
    next.run(req).await
}
