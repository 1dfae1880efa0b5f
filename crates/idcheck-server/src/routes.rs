// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// HTTP routes.
//
//   POST /api/register                 multipart `email` + `document`
//   POST /api/verify-aadhar-photo      {email, photo_base64}
//   POST /api/check-user-exists        {email}
//   GET  /api/get-aadhar-photo-base64  ?email=
//   POST /api/send-otp                 {email}
//   POST /api/verify-otp               {email, otp}
//   GET  /health

use axum::extract::multipart::{MultipartError, MultipartRejection};
use axum::extract::rejection::QueryRejection;
use axum::extract::{DefaultBodyLimit, Multipart, Query, State};
use axum::http::{HeaderValue, Method, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use idcheck_core::config::AppConfig;
use idcheck_core::error::IdCheckError;
use idcheck_core::human_errors::{humanize_match, humanize_rejection};
use idcheck_core::types::AcceptanceResult;
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, instrument, warn};

use crate::error::{ErrorResponse, HttpError, ValidatedJson};
use crate::otp::OtpCheck;
use crate::state::AppState;

const REGISTERED_MESSAGE: &str = "Aadhaar verified and registered successfully!";

/// Multipart framing on top of the document itself.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

pub fn router(state: AppState, config: &AppConfig) -> Router {
    let body_limit = config.max_upload_bytes + MULTIPART_OVERHEAD;

    let api = Router::new()
        .route("/register", post(register))
        .route("/verify-aadhar-photo", post(verify_photo))
        .route("/check-user-exists", post(check_user_exists))
        .route("/get-aadhar-photo-base64", get(get_photo_base64))
        .route("/send-otp", post(send_otp))
        .route("/verify-otp", post(verify_otp));

    Router::new()
        .nest("/api", api)
        .route("/health", get(health))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(body_limit))
        .layer(cors_layer(&config.cors_allowed_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let methods = [Method::GET, Method::POST, Method::OPTIONS];
    if origins.iter().any(|o| o == "*") {
        warn!("CORS configured to allow all origins");
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(methods)
            .allow_headers(Any);
    }
    let parsed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(%origin, "ignoring unparseable CORS origin");
                None
            }
        })
        .collect();
    CorsLayer::new()
        .allow_origin(parsed)
        .allow_methods(methods)
        .allow_headers([header::CONTENT_TYPE])
        .allow_credentials(true)
}

// -- Registration ------------------------------------------------------------

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

#[instrument(skip_all)]
async fn register(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Response, HttpError> {
    let mut multipart = multipart?;
    let mut email = None;
    let mut document = None;

    while let Some(field) = multipart.next_field().await.map_err(invalid_upload)? {
        let name = field.name().map(str::to_owned);
        match name.as_deref() {
            Some("email") => email = Some(field.text().await.map_err(invalid_upload)?),
            Some("document") => {
                let mime = field.content_type().unwrap_or_default().to_owned();
                let bytes = field.bytes().await.map_err(invalid_upload)?;
                document = Some((mime, bytes.to_vec()));
            }
            _ => {}
        }
    }

    let (Some(email), Some((mime, bytes))) = (email, document) else {
        return Err(IdCheckError::InvalidInput("email and document are required".into()).into());
    };

    match state.registration.register(&email, bytes, &mime).await? {
        AcceptanceResult::Accepted => Ok(Json(MessageResponse {
            message: REGISTERED_MESSAGE.into(),
        })
        .into_response()),
        AcceptanceResult::Rejected(reason) => Ok((
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::new(humanize_rejection(&reason))),
        )
            .into_response()),
    }
}

fn invalid_upload(err: MultipartError) -> HttpError {
    HttpError(IdCheckError::InvalidInput(format!("Invalid upload: {}", err.body_text())))
}

// -- Face verification -------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct VerifyPhotoRequest {
    pub email: String,
    pub photo_base64: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct VerifyPhotoResponse {
    pub result: String,
    pub message: String,
}

#[instrument(skip_all)]
async fn verify_photo(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<VerifyPhotoRequest>,
) -> Result<Json<VerifyPhotoResponse>, HttpError> {
    let outcome = state
        .verification
        .verify(&request.email, &request.photo_base64)
        .await?;
    let result = if outcome.is_match() { "success" } else { "fail" };
    Ok(Json(VerifyPhotoResponse {
        result: result.into(),
        message: humanize_match(&outcome).into(),
    }))
}

// -- Lookups -----------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct EmailRequest {
    pub email: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserExistsResponse {
    pub user_exists: bool,
}

async fn check_user_exists(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<EmailRequest>,
) -> Result<Json<UserExistsResponse>, HttpError> {
    Ok(Json(UserExistsResponse {
        user_exists: state.registration.is_registered(&request.email).await?,
    }))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PhotoResponse {
    pub photo_base64: String,
}

async fn get_photo_base64(
    State(state): State<AppState>,
    query: Result<Query<EmailRequest>, QueryRejection>,
) -> Result<Json<PhotoResponse>, HttpError> {
    let Query(request) = query?;
    let document = state.verification.load_document(&request.email).await?;
    Ok(Json(PhotoResponse {
        photo_base64: STANDARD.encode(document),
    }))
}

// -- One-time passcodes ------------------------------------------------------

#[derive(Debug, Serialize, Deserialize)]
pub struct OtpResponse {
    pub success: bool,
    pub message: String,
}

fn otp_response(status: StatusCode, success: bool, message: &str) -> (StatusCode, Json<OtpResponse>) {
    (
        status,
        Json(OtpResponse {
            success,
            message: message.into(),
        }),
    )
}

/// Issue a passcode and mail it in the background; the response does not
/// wait for the relay.
#[instrument(skip_all)]
async fn send_otp(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<EmailRequest>,
) -> (StatusCode, Json<OtpResponse>) {
    let email = request.email.trim().to_owned();
    if email.is_empty() {
        return otp_response(StatusCode::BAD_REQUEST, false, "Email required");
    }

    let code = state.otp.issue(&email);
    let ttl = state.otp.ttl();
    let mailer = state.mailer.clone();
    tokio::spawn(async move {
        if let Err(err) = mailer.send_passcode(&email, &code, ttl).await {
            error!(%err, recipient = %email, "failed to deliver passcode");
        }
    });

    otp_response(StatusCode::OK, true, "OTP generation initiated.")
}

#[derive(Debug, Deserialize)]
pub struct VerifyOtpRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub otp: String,
}

async fn verify_otp(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<VerifyOtpRequest>,
) -> (StatusCode, Json<OtpResponse>) {
    let email = request.email.trim();
    if email.is_empty() || request.otp.trim().is_empty() {
        return otp_response(StatusCode::BAD_REQUEST, false, "Email and OTP required");
    }

    match state.otp.verify(email, &request.otp) {
        OtpCheck::Verified => {
            info!("passcode verified");
            otp_response(StatusCode::OK, true, "OTP verified successfully!")
        }
        OtpCheck::NotIssued => {
            otp_response(StatusCode::BAD_REQUEST, false, "No OTP found for this email.")
        }
        OtpCheck::Rejected => {
            otp_response(StatusCode::BAD_REQUEST, false, "Invalid or expired OTP")
        }
    }
}

// -- Health ------------------------------------------------------------------

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}
