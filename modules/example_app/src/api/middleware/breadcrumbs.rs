use std::sync::Arc;

use axum::extract::Request;
use axum::middleware::Next;
use axum::response::Response;

use crate::domain::breadcrumbs::Breadcrumbs;
use crate::domain::locale::LocaleSelection;
use crate::domain::service::ExampleAppService;

pub async fn breadcrumbs_middleware(
    svc: Arc<ExampleAppService>,
    mut req: Request,
    next: Next,
) -> Response {
    let locale = req
        .extensions()
        .get::<LocaleSelection>()
        .map(|l| l.effective.clone())
        .unwrap_or_else(|| svc.locales().default_locale().to_string());

    let crumbs = Breadcrumbs::build(req.uri().path(), svc.localizer(), &locale);
    req.extensions_mut().insert(crumbs);
    next.run(req).await
}
