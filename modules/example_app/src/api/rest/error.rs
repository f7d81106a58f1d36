use axum::http::header::CONTENT_TYPE;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::content::ContentError;
use crate::domain::error::DomainError;
use crate::domain::validation::FieldError;

pub const APPLICATION_PROBLEM_JSON: &str = "application/problem+json";

/// RFC 9457 problem details.
#[derive(Debug, Clone, PartialEq, Serialize, utoipa::ToSchema)]
pub struct Problem {
    #[serde(rename = "type")]
    pub type_url: String,
    pub title: String,
    pub status: u16,
    pub detail: String,
    /// Per-field validation failures.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<FieldError>,
}

impl Problem {
    pub fn new(status: u16, title: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            type_url: "about:blank".to_string(),
            title: title.into(),
            status,
            detail: detail.into(),
            errors: Vec::new(),
        }
    }

    pub fn with_errors(mut self, errors: Vec<FieldError>) -> Self {
        self.errors = errors;
        self
    }
}

impl IntoResponse for Problem {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, [(CONTENT_TYPE, APPLICATION_PROBLEM_JSON)], Json(self)).into_response()
    }
}

/// Convert domain errors to HTTP Problem responses
pub fn domain_error_to_problem(err: DomainError) -> Problem {
    match err {
        DomainError::NotFound { message } => Problem::new(404, "Not Found", message),

        DomainError::Content(e) => {
            tracing::warn!(error = %e, "Content backend request failed");
            let detail = match &e {
                ContentError::Api { status, message } => format!("{status}: {message}"),
                other => other.detail().to_string(),
            };
            Problem::new(502, "Content Backend Error", detail)
        }

        DomainError::Validation { errors } => {
            Problem::new(422, "Validation Failed", "One or more fields are invalid")
                .with_errors(errors)
        }

        DomainError::Internal { message } => Problem::new(500, "Internal Error", message),
    }
}

impl From<DomainError> for Problem {
    fn from(e: DomainError) -> Self {
        domain_error_to_problem(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::validation::CredentialField;

    #[test]
    fn maps_domain_errors_to_status() {
        assert_eq!(Problem::from(DomainError::not_found("gone")).status, 404);
        assert_eq!(
            Problem::from(DomainError::Content(ContentError::transport("down"))).status,
            502
        );
        assert_eq!(Problem::from(DomainError::internal("bug")).status, 500);

        let problem = Problem::from(DomainError::validation(vec![FieldError {
            key: CredentialField::SpaceId,
            message: "required".into(),
        }]));
        assert_eq!(problem.status, 422);
        assert_eq!(problem.errors.len(), 1);
    }

    #[test]
    fn response_uses_problem_content_type() {
        let res = Problem::new(404, "Not Found", "missing").into_response();
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
        assert_eq!(res.headers()[CONTENT_TYPE], APPLICATION_PROBLEM_JSON);
    }
}
