//! Administrative slot-fill endpoint.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use chrono::{DateTime, Duration, Utc};
use common::ServiceId;
use domain::Slot;
use serde::Deserialize;
use slot_fill::FillOutcome;
use slot_store::SlotStore;

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct FillSlotRequest {
    pub service_id: ServiceId,
    pub start: DateTime<Utc>,
    #[serde(default)]
    pub discount_percent: u8,
    pub response_window_minutes: i64,
}

/// POST /slots/fill: offer a newly open slot to matching waitlist entries.
///
/// Answers 201 with the offer when one was opened, 200 otherwise.
#[tracing::instrument(skip(state, req), fields(service_id = %req.service_id, start = %req.start))]
pub async fn fill<S: SlotStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<FillSlotRequest>,
) -> Result<(StatusCode, Json<FillOutcome>), ApiError> {
    let window = Duration::try_minutes(req.response_window_minutes).ok_or_else(|| {
        ApiError::BadRequest("response_window_minutes out of range".to_string())
    })?;

    let outcome = state
        .engine
        .fill_slot(
            Slot::new(req.service_id, req.start),
            req.discount_percent,
            window,
        )
        .await?;

    let status = match outcome {
        FillOutcome::Offered(_) => StatusCode::CREATED,
        FillOutcome::NoMatch | FillOutcome::NoEligibleCandidates => StatusCode::OK,
    };
    Ok((status, Json(outcome)))
}
