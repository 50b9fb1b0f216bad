//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use slot_fill::FillError;
use slot_store::StoreError;

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Resource not found.
    NotFound(String),
    /// Bad request from the client.
    BadRequest(String),
    /// The resource is in a state that forbids the request.
    Conflict(String),
    /// Engine error.
    Fill(FillError),
    /// Storage error outside the engine.
    Store(StoreError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            ApiError::Fill(err) => fill_error_to_response(err),
            ApiError::Store(err) => store_error_to_response(err),
        };

        let body = serde_json::json!({ "error": message });
        (status, axum::Json(body)).into_response()
    }
}

fn fill_error_to_response(err: FillError) -> (StatusCode, String) {
    match err {
        FillError::InvalidDiscount { .. }
        | FillError::InvalidResponseWindow { .. }
        | FillError::NoCandidates
        | FillError::Domain(_) => (StatusCode::BAD_REQUEST, err.to_string()),
        FillError::Store(store_err) => store_error_to_response(store_err),
        FillError::InvalidConfig(_)
        | FillError::Booking(_)
        | FillError::BookingTimeout(_)
        | FillError::Notification(_) => {
            tracing::error!(error = %err, "engine failure");
            (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
        }
    }
}

fn store_error_to_response(err: StoreError) -> (StatusCode, String) {
    match &err {
        StoreError::DuplicateEntry(_) | StoreError::DuplicateOffer(_) => {
            (StatusCode::CONFLICT, err.to_string())
        }
        StoreError::OfferNotFound(_) => (StatusCode::NOT_FOUND, err.to_string()),
        StoreError::Unavailable(_) => {
            tracing::error!(error = %err, "store unavailable");
            (StatusCode::SERVICE_UNAVAILABLE, err.to_string())
        }
        StoreError::Database(_) | StoreError::Migration(_) | StoreError::Corrupt(_) => {
            tracing::error!(error = %err, "store failure");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal storage error".to_string(),
            )
        }
    }
}

impl From<FillError> for ApiError {
    fn from(err: FillError) -> Self {
        ApiError::Fill(err)
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        ApiError::Store(err)
    }
}
