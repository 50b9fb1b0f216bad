//! Waitlist intake and administrative cancellation.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use chrono::NaiveDate;
use common::{CustomerId, PetId, ServiceId, WaitlistEntryId};
use domain::{TimePreference, WaitlistEntry, WaitlistStatus};
use serde::Deserialize;
use slot_store::{SlotStore, WaitlistStore, WaitlistStoreExt};

use super::parse_id;
use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateEntryRequest {
    pub customer_id: Option<CustomerId>,
    pub pet_id: PetId,
    pub service_id: ServiceId,
    pub requested_date: NaiveDate,
    #[serde(default)]
    pub time_preference: TimePreference,
    #[serde(default)]
    pub priority: i32,
    pub note: Option<String>,
    /// Registers the customer's number for offers and replies.
    pub phone: Option<String>,
    pub name: Option<String>,
}

/// POST /waitlist: add a customer request to the waitlist.
#[tracing::instrument(skip(state, req), fields(service_id = %req.service_id))]
pub async fn create<S: SlotStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<CreateEntryRequest>,
) -> Result<(StatusCode, Json<WaitlistEntry>), ApiError> {
    let customer_id = req.customer_id.unwrap_or_default();

    if let Some(ref phone) = req.phone {
        state
            .directory
            .add_customer(customer_id, phone, req.name.as_deref())
            .ok_or_else(|| ApiError::BadRequest(format!("Unusable phone number {phone:?}")))?;
    }

    let mut entry = WaitlistEntry::new(
        customer_id,
        req.pet_id,
        req.service_id,
        req.requested_date,
        state.engine.now(),
    )
    .with_priority(req.priority)
    .with_time_preference(req.time_preference);
    if let Some(note) = req.note {
        entry = entry.with_note(note);
    }

    state.engine.store().insert_entry(entry.clone()).await?;
    tracing::info!(entry_id = %entry.id, "waitlist entry created");
    Ok((StatusCode::CREATED, Json(entry)))
}

/// GET /waitlist/:id: load a waitlist entry.
#[tracing::instrument(skip(state))]
pub async fn get<S: SlotStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<WaitlistEntry>, ApiError> {
    let entry_id: WaitlistEntryId = parse_id("waitlist entry", &id)?;
    let entry = state
        .engine
        .store()
        .get_entry(entry_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Waitlist entry {id} not found")))?;
    Ok(Json(entry))
}

/// POST /waitlist/:id/cancel: withdraw an entry.
///
/// Booked entries cannot be cancelled here and answer 409.
#[tracing::instrument(skip(state))]
pub async fn cancel<S: SlotStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<WaitlistEntry>, ApiError> {
    let entry_id: WaitlistEntryId = parse_id("waitlist entry", &id)?;
    let entry = state
        .engine
        .store()
        .cancel_entry(entry_id, state.engine.now())
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Waitlist entry {id} not found")))?;

    if entry.status != WaitlistStatus::Cancelled {
        return Err(ApiError::Conflict(format!(
            "Waitlist entry {id} is {} and cannot be cancelled",
            entry.status
        )));
    }
    Ok(Json(entry))
}
