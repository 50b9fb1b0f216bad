//! Offer inspection and manual sweep endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use common::OfferId;
use domain::SlotOffer;
use serde::Serialize;
use slot_store::{AcceptanceRecord, OfferStore, SlotStore};

use super::parse_id;
use crate::error::ApiError;
use crate::state::AppState;

#[derive(Serialize)]
pub struct SweepResponse {
    pub expired: usize,
}

/// GET /offers/:id: load an offer.
#[tracing::instrument(skip(state))]
pub async fn get<S: SlotStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<SlotOffer>, ApiError> {
    let offer_id: OfferId = parse_id("offer", &id)?;
    let offer = state
        .engine
        .store()
        .get_offer(offer_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Offer {id} not found")))?;
    Ok(Json(offer))
}

/// GET /offers/:id/acceptances: the acceptance audit log of an offer.
#[tracing::instrument(skip(state))]
pub async fn acceptances<S: SlotStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<Vec<AcceptanceRecord>>, ApiError> {
    let offer_id: OfferId = parse_id("offer", &id)?;
    let store = state.engine.store();
    if store.get_offer(offer_id).await?.is_none() {
        return Err(ApiError::NotFound(format!("Offer {id} not found")));
    }
    Ok(Json(store.acceptances_for_offer(offer_id).await?))
}

/// POST /sweep: expire lapsed offers now instead of waiting for the timer.
#[tracing::instrument(skip(state))]
pub async fn sweep<S: SlotStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<SweepResponse>, ApiError> {
    let expired = state.engine.sweep_now().await?;
    Ok(Json(SweepResponse { expired }))
}
