// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// HTTP rendering of `IdCheckError`.
//
// Handlers return `Result<_, HttpError>`; the status comes from the
// severity assigned by `humanize_error`, and the body is always `{error}`.

use axum::extract::multipart::MultipartRejection;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{FromRequest, Request};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use idcheck_core::error::IdCheckError;
use idcheck_core::human_errors::{Severity, humanize_error};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

/// Wrapper so that the core error type can implement axum's `IntoResponse`.
#[derive(Debug)]
pub struct HttpError(pub IdCheckError);

impl From<IdCheckError> for HttpError {
    fn from(err: IdCheckError) -> Self {
        HttpError(err)
    }
}

impl From<JsonRejection> for HttpError {
    fn from(rejection: JsonRejection) -> Self {
        HttpError(IdCheckError::InvalidInput(format!(
            "Invalid request body: {}",
            rejection.body_text()
        )))
    }
}

impl From<MultipartRejection> for HttpError {
    fn from(rejection: MultipartRejection) -> Self {
        HttpError(IdCheckError::InvalidInput(format!(
            "Invalid upload: {}",
            rejection.body_text()
        )))
    }
}

impl From<QueryRejection> for HttpError {
    fn from(rejection: QueryRejection) -> Self {
        HttpError(IdCheckError::InvalidInput(format!(
            "Invalid query: {}",
            rejection.body_text()
        )))
    }
}

fn status_for(severity: Severity) -> StatusCode {
    match severity {
        Severity::Rejected => StatusCode::BAD_REQUEST,
        Severity::NotFound => StatusCode::NOT_FOUND,
        Severity::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let human = humanize_error(&self.0);
        match human.severity {
            Severity::Rejected | Severity::NotFound => {
                tracing::debug!(error = %self.0, "Request refused")
            }
            Severity::Internal => tracing::error!(error = %self.0, "Request failed"),
        }
        (
            status_for(human.severity),
            Json(ErrorResponse::new(human.message)),
        )
            .into_response()
    }
}

/// JSON body extractor whose rejection renders as `400 {error}` instead of
/// axum's plain-text default.
#[derive(Debug, Clone, Copy)]
pub struct ValidatedJson<T>(pub T);

impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
{
    type Rejection = HttpError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(inner) = Json::<T>::from_request(req, state)
            .await
            .map_err(HttpError::from)?;
        Ok(ValidatedJson(inner))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn render(err: IdCheckError) -> (StatusCode, ErrorResponse) {
        let response = HttpError(err).into_response();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn duplicate_is_bad_request() {
        let (status, body) = render(IdCheckError::DuplicateRegistration("a@x.in".into())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.error, "Email already registered");
    }

    #[tokio::test]
    async fn unsupported_type_is_bad_request() {
        let (status, body) = render(IdCheckError::UnsupportedFormat("image/gif".into())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.error, "Only PDF, JPG, or PNG files are allowed.");
    }

    #[tokio::test]
    async fn unknown_user_is_not_found() {
        let (status, body) = render(IdCheckError::NotRegistered("a@x.in".into())).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body.error, "User not found");
    }

    #[tokio::test]
    async fn storage_fault_is_internal_and_opaque() {
        let (status, body) = render(IdCheckError::Database("disk I/O error".into())).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!body.error.contains("disk"));
    }
}
