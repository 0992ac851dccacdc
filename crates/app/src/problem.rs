use std::collections::BTreeMap;

use axum::{
    http::{header, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use metrics::counter;
use serde::Serialize;
use todo_backend_core::{RepositoryError, ServiceError};
use tracing::error;

const UNEXPECTED_DETAIL: &str = "An unexpected error occurred. Please try again later.";

#[derive(Debug, Serialize)]
struct ProblemDetails {
    #[serde(rename = "type")]
    problem_type: &'static str,
    title: &'static str,
    status: u16,
    detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    instance: Option<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    errors: BTreeMap<&'static str, Vec<String>>,
}

/// RFC 7807 style error response.
pub struct ProblemResponse {
    status: StatusCode,
    body: ProblemDetails,
}

impl ProblemResponse {
    pub fn new<S: Into<String>>(status: StatusCode, problem_type: &'static str, detail: S) -> Self {
        Self {
            status,
            body: ProblemDetails {
                problem_type,
                title: status.canonical_reason().unwrap_or("error"),
                status: status.as_u16(),
                detail: detail.into(),
                instance: None,
                errors: BTreeMap::new(),
            },
        }
    }

    pub fn with_title(mut self, title: &'static str) -> Self {
        self.body.title = title;
        self
    }

    pub fn with_instance<S: Into<String>>(mut self, instance: S) -> Self {
        self.body.instance = Some(instance.into());
        self
    }

    /// Attaches a validation message to the named request field.
    pub fn with_field_error<S: Into<String>>(mut self, field: &'static str, message: S) -> Self {
        self.body
            .errors
            .entry(field)
            .or_default()
            .push(message.into());
        self
    }
}

impl IntoResponse for ProblemResponse {
    fn into_response(self) -> Response {
        counter!("http_problem_responses_total", "status" => self.status.as_u16().to_string())
            .increment(1);

        let mut response = Json(self.body).into_response();
        *response.status_mut() = self.status;
        response.headers_mut().insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/problem+json"),
        );
        response
    }
}

/// Maps a service failure to the HTTP problem returned to the client.
///
/// This is the only place that knows which status code belongs to which
/// error kind. Unexpected failures are logged here with full detail and
/// answered with a generic message.
pub fn from_service_error(err: ServiceError, method: &Method, path: &str) -> ProblemResponse {
    let problem = match err {
        ServiceError::Validation(err) => {
            ProblemResponse::new(StatusCode::BAD_REQUEST, "validation_error", err.to_string())
                .with_field_error(err.field(), err.to_string())
        }
        ServiceError::InvalidState(err) => {
            ProblemResponse::new(StatusCode::BAD_REQUEST, "invalid_state", err.to_string())
                .with_title("Invalid Operation")
        }
        ServiceError::NotFound(id) => ProblemResponse::new(
            StatusCode::NOT_FOUND,
            "not_found",
            format!("Todo with ID {id} not found."),
        ),
        ServiceError::Repository(err) => {
            log_unexpected(&err, method, path);
            ProblemResponse::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                UNEXPECTED_DETAIL,
            )
        }
    };
    problem.with_instance(path)
}

fn log_unexpected(err: &RepositoryError, method: &Method, path: &str) {
    error!(
        stage = "api",
        %method,
        path,
        error = %err,
        source = ?std::error::Error::source(err),
        "unhandled error while processing request"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;
    use serde_json::Value;
    use todo_backend_core::{TodoId, TransitionError, ValidationError};

    async fn render(problem: ProblemResponse) -> (StatusCode, String, Value) {
        let response = problem.into_response();
        let status = response.status();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default()
            .to_string();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("body should read")
            .to_bytes();
        let body = serde_json::from_slice(&bytes).expect("json body");
        (status, content_type, body)
    }

    #[tokio::test]
    async fn validation_error_carries_field_detail() {
        let problem = from_service_error(
            ServiceError::Validation(ValidationError::EmptyDescription),
            &Method::POST,
            "/todos",
        );
        let (status, content_type, body) = render(problem).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(content_type, "application/problem+json");
        assert_eq!(body["status"], 400);
        assert_eq!(body["title"], "Bad Request");
        assert_eq!(body["instance"], "/todos");
        assert_eq!(
            body["errors"]["description"][0],
            "Description cannot be empty or whitespace."
        );
    }

    #[tokio::test]
    async fn invalid_state_maps_to_bad_request() {
        let problem = from_service_error(
            ServiceError::InvalidState(TransitionError::AlreadyCompleted),
            &Method::PATCH,
            "/todos/1",
        );
        let (status, _, body) = render(problem).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["title"], "Invalid Operation");
        assert_eq!(body["detail"], "Cannot complete a completed todo.");
        assert!(body.get("errors").is_none());
    }

    #[tokio::test]
    async fn not_found_maps_to_404() {
        let problem =
            from_service_error(ServiceError::NotFound(TodoId::new(5)), &Method::GET, "/todos/5");
        let (status, _, body) = render(problem).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["detail"], "Todo with ID 5 not found.");
        assert_eq!(body["instance"], "/todos/5");
    }

    #[tokio::test]
    async fn repository_failure_hides_detail() {
        let err = RepositoryError::Backend("disk I/O error".into());
        let problem = from_service_error(ServiceError::Repository(err), &Method::GET, "/todos");
        let (status, _, body) = render(problem).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["title"], "Internal Server Error");
        assert_eq!(body["detail"], UNEXPECTED_DETAIL);
        assert!(!body.to_string().contains("disk"));
    }
}
