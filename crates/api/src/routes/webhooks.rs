//! Inbound message webhook.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use serde::Deserialize;
use slot_fill::{InboundMessage, InboundOutcome};
use slot_store::SlotStore;

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct InboundRequest {
    pub from: String,
    pub body: String,
}

/// POST /webhooks/inbound: a customer replied on the messaging channel.
///
/// Every handled message answers 200, including replies that match nothing,
/// so the channel provider does not redeliver them.
#[tracing::instrument(skip(state, req))]
pub async fn inbound<S: SlotStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<InboundRequest>,
) -> Result<Json<InboundOutcome>, ApiError> {
    let message = InboundMessage {
        from: req.from,
        body: req.body,
        received_at: state.engine.now(),
    };
    let outcome = state.engine.handle_inbound(message).await?;
    Ok(Json(outcome))
}
