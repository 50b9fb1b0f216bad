//! Offer Orchestrator: opens an offer and dispatches it to its candidates.

use std::collections::HashMap;

use chrono::Duration;
use domain::{OfferDraft, Slot, SlotOffer, WaitlistEntry};
use serde::Serialize;
use slot_store::SlotStore;

use crate::collaborators::Collaborators;
use crate::config::FillConfig;
use crate::error::{FillError, Result};
use crate::services::{Notice, OutboundMessage};

/// Result of an attempt to fill a slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "offer", rename_all = "snake_case")]
pub enum FillOutcome {
    /// An offer is live.
    Offered(SlotOffer),
    /// No waitlist entry matched the slot.
    NoMatch,
    /// Candidates matched, but none was still active when the offer opened.
    NoEligibleCandidates,
}

impl FillOutcome {
    pub fn offer(&self) -> Option<&SlotOffer> {
        match self {
            FillOutcome::Offered(offer) => Some(offer),
            _ => None,
        }
    }
}

/// Creates offers and sends the "slot available" messages.
pub struct OfferOrchestrator<S> {
    store: S,
    collaborators: Collaborators,
}

impl<S: SlotStore> OfferOrchestrator<S> {
    pub fn new(store: S, collaborators: Collaborators) -> Self {
        Self {
            store,
            collaborators,
        }
    }

    /// Opens an offer of `slot` to `candidates`, in the given order.
    ///
    /// Candidates that stopped being active since matching are dropped. The
    /// response window starts now, regardless of delivery. Individual
    /// delivery failures are logged and never undo the offer.
    #[tracing::instrument(
        skip(self, candidates, config),
        fields(service_id = %slot.service_id, start = %slot.start, candidates = candidates.len())
    )]
    pub async fn create_offer(
        &self,
        config: &FillConfig,
        slot: Slot,
        candidates: &[WaitlistEntry],
        discount_percent: u8,
        response_window: Duration,
    ) -> Result<FillOutcome> {
        if candidates.is_empty() {
            return Err(FillError::NoCandidates);
        }
        let discount = config.check_discount(discount_percent)?;
        config.check_response_window(response_window)?;

        let draft = OfferDraft::new(
            slot,
            candidates.iter().map(|c| c.id).collect(),
            discount,
            response_window,
            self.collaborators.clock.now(),
        );

        let Some(offer) = self.store.open_offer(draft).await? else {
            tracing::info!("no eligible candidates remain");
            metrics::counter!("waitlist_offer_no_match_total", "reason" => "candidates_gone")
                .increment(1);
            return Ok(FillOutcome::NoEligibleCandidates);
        };

        metrics::counter!("waitlist_offers_created_total").increment(1);
        tracing::info!(
            offer_id = %offer.id,
            survivors = offer.candidates.len(),
            expires_at = %offer.expires_at,
            "offer opened"
        );

        self.dispatch(&offer, candidates).await;
        Ok(FillOutcome::Offered(offer))
    }

    async fn dispatch(&self, offer: &SlotOffer, candidates: &[WaitlistEntry]) {
        let by_id: HashMap<_, _> = candidates.iter().map(|c| (c.id, c)).collect();
        let service_name = match self
            .collaborators
            .directory
            .service_name(offer.slot.service_id)
            .await
        {
            Ok(Some(name)) => name,
            Ok(None) => offer.slot.service_id.to_string(),
            Err(e) => {
                tracing::warn!(offer_id = %offer.id, error = %e, "service name lookup failed");
                offer.slot.service_id.to_string()
            }
        };

        for entry_id in &offer.candidates {
            let Some(entry) = by_id.get(entry_id) else {
                continue;
            };

            let contact = match self.collaborators.directory.contact_for(entry.customer_id).await
            {
                Ok(Some(contact)) => contact,
                Ok(None) => {
                    tracing::warn!(offer_id = %offer.id, entry_id = %entry_id, "no contact on file");
                    metrics::counter!("waitlist_dispatch_failures_total").increment(1);
                    continue;
                }
                Err(e) => {
                    tracing::warn!(offer_id = %offer.id, entry_id = %entry_id, error = %e, "contact lookup failed");
                    metrics::counter!("waitlist_dispatch_failures_total").increment(1);
                    continue;
                }
            };

            let message = OutboundMessage {
                to: contact.phone,
                offer_id: offer.id,
                entry_id: Some(*entry_id),
                notice: Notice::OfferAvailable {
                    service_name: service_name.clone(),
                    start: offer.slot.start,
                    discount: offer.discount,
                    expires_at: offer.expires_at,
                },
            };
            if let Err(e) = self.collaborators.notifier.send(message).await {
                tracing::warn!(offer_id = %offer.id, entry_id = %entry_id, error = %e, "offer dispatch failed");
                metrics::counter!("waitlist_dispatch_failures_total").increment(1);
            }
        }
    }
}
