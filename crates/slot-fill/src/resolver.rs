//! Response Resolver: turns one acceptance into at most one booking.
//!
//! Every write to the offer goes through the store's compare-and-set
//! transition. Concurrent resolves for the same offer race on that single
//! conditional update; the store decides the winner and everyone else is
//! told the slot is gone.

use std::time::{Duration, Instant};

use common::{AppointmentId, OfferId, WaitlistEntryId};
use domain::{OfferStatus, Resolution, SlotOffer, WaitlistEntry, WaitlistStatus};
use slot_store::{OfferTransition, RELEASABLE, SlotStore, WaitlistStoreExt};

use crate::collaborators::Collaborators;
use crate::error::{FillError, Result};
use crate::services::{AppointmentRequest, Notice, OutboundMessage};

/// Claims offers on behalf of candidates and books the winner.
#[derive(Clone)]
pub struct ResponseResolver<S> {
    store: S,
    collaborators: Collaborators,
    booking_timeout: Duration,
}

impl<S: SlotStore + Clone + 'static> ResponseResolver<S> {
    pub fn new(store: S, collaborators: Collaborators, booking_timeout: Duration) -> Self {
        Self {
            store,
            collaborators,
            booking_timeout,
        }
    }

    /// Resolves `claimant`'s acceptance of `offer_id`.
    ///
    /// Safe under any number of concurrent calls for the same offer: at most
    /// one returns [`Resolution::Booked`]. Storage failures are returned as
    /// errors since the claim state is then unknown.
    #[tracing::instrument(skip(self), fields(offer_id = %offer_id, claimant = %claimant))]
    pub async fn resolve(&self, offer_id: OfferId, claimant: WaitlistEntryId) -> Result<Resolution> {
        let started = Instant::now();
        let resolution = self.resolve_inner(offer_id, claimant).await?;

        metrics::counter!("waitlist_resolutions_total", "outcome" => resolution.as_str())
            .increment(1);
        metrics::histogram!("waitlist_resolve_duration_seconds")
            .record(started.elapsed().as_secs_f64());
        Ok(resolution)
    }

    async fn resolve_inner(
        &self,
        offer_id: OfferId,
        claimant: WaitlistEntryId,
    ) -> Result<Resolution> {
        let Some(offer) = self.store.get_offer(offer_id).await? else {
            tracing::debug!("offer not found");
            return Ok(Resolution::NotFound);
        };
        if !offer.has_candidate(claimant) {
            tracing::debug!("claimant is not a candidate");
            return Ok(Resolution::NotFound);
        }
        if offer.is_claimed_by(claimant) {
            return Ok(Resolution::AlreadyBooked {
                appointment_id: offer.appointment_id,
            });
        }

        let Some(entry) = self.store.get_entry(claimant).await? else {
            return Ok(Resolution::NotFound);
        };
        if entry.status.is_terminal() {
            tracing::debug!(status = %entry.status, "claimant entry is closed");
            return Ok(Resolution::NotFound);
        }

        let now = self.collaborators.clock.now();
        if !self
            .store
            .try_transition(offer_id, OfferTransition::claim(claimant, now))
            .await?
        {
            return self.classify_lost_claim(offer_id, claimant).await;
        }
        tracing::debug!("claim won");

        let request = AppointmentRequest {
            offer_id,
            entry_id: claimant,
            customer_id: entry.customer_id,
            pet_id: entry.pet_id,
            service_id: offer.slot.service_id,
            start: offer.slot.start,
            discount: offer.discount,
        };

        match self.book(request).await {
            Ok(appointment_id) => self.finish_booking(&offer, &entry, appointment_id).await,
            Err(e) => {
                tracing::warn!(offer_id = %offer_id, error = %e, "booking failed after claim; rolling back");
                self.roll_back(&offer, claimant).await?;
                Ok(Resolution::SlotUnavailable)
            }
        }
    }

    async fn book(&self, request: AppointmentRequest) -> Result<AppointmentId> {
        match tokio::time::timeout(
            self.booking_timeout,
            self.collaborators.booking.create_appointment(request),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(FillError::BookingTimeout(self.booking_timeout)),
        }
    }

    /// Explains why the conditional claim did not apply.
    async fn classify_lost_claim(
        &self,
        offer_id: OfferId,
        claimant: WaitlistEntryId,
    ) -> Result<Resolution> {
        let now = self.collaborators.clock.now();
        let Some(current) = self.store.get_offer(offer_id).await? else {
            return Ok(Resolution::NotFound);
        };

        let resolution = if current.is_claimed_by(claimant) {
            Resolution::AlreadyBooked {
                appointment_id: current.appointment_id,
            }
        } else if current.status == OfferStatus::Expired
            || (current.status == OfferStatus::Pending && current.has_lapsed_at(now))
        {
            // Remembered until the sweeper releases the entry.
            self.store
                .transition_entry(
                    claimant,
                    &[WaitlistStatus::Notified],
                    WaitlistStatus::ExpiredOffer,
                    now,
                )
                .await?;
            Resolution::Expired
        } else {
            Resolution::AlreadyClaimed
        };

        tracing::info!(outcome = %resolution, "claim lost");
        Ok(resolution)
    }

    /// Undoes a claim whose booking failed so the slot can be contended again.
    async fn roll_back(&self, offer: &SlotOffer, claimant: WaitlistEntryId) -> Result<()> {
        metrics::counter!("waitlist_booking_rollbacks_total").increment(1);
        let now = self.collaborators.clock.now();

        if self
            .store
            .try_transition(offer.id, OfferTransition::reopen(claimant, now))
            .await?
        {
            tracing::info!(offer_id = %offer.id, "offer reopened");
            return Ok(());
        }

        if self
            .store
            .try_transition(offer.id, OfferTransition::void(claimant, now))
            .await?
        {
            let released = self
                .store
                .transition_entries(&offer.candidates, RELEASABLE, WaitlistStatus::Active, now)
                .await?;
            tracing::info!(offer_id = %offer.id, released = released.len(), "offer voided past deadline");
            notify_released(&self.store, &self.collaborators, offer.id, &released).await;
            return Ok(());
        }

        tracing::error!(offer_id = %offer.id, "claim changed underneath rollback");
        Ok(())
    }

    async fn finish_booking(
        &self,
        offer: &SlotOffer,
        winner: &WaitlistEntry,
        appointment_id: AppointmentId,
    ) -> Result<Resolution> {
        let now = self.collaborators.clock.now();
        self.store
            .attach_appointment(offer.id, appointment_id.clone())
            .await?;

        if !self
            .store
            .transition_entry(
                winner.id,
                &[WaitlistStatus::Notified, WaitlistStatus::ExpiredOffer],
                WaitlistStatus::Booked,
                now,
            )
            .await?
        {
            tracing::warn!(offer_id = %offer.id, entry_id = %winner.id, "winner entry changed before booking was recorded");
        }

        let losers = offer.other_candidates(winner.id);
        let released = self
            .store
            .transition_entries(&losers, RELEASABLE, WaitlistStatus::Active, now)
            .await?;

        tracing::info!(
            offer_id = %offer.id,
            appointment_id = %appointment_id,
            released = released.len(),
            "slot booked"
        );

        self.spawn_fill_notices(offer, winner, appointment_id.clone(), released);
        Ok(Resolution::Booked { appointment_id })
    }

    /// Sends the winner's confirmation and the losers' "slot filled" notices
    /// off the request path.
    fn spawn_fill_notices(
        &self,
        offer: &SlotOffer,
        winner: &WaitlistEntry,
        appointment_id: AppointmentId,
        released: Vec<WaitlistEntryId>,
    ) {
        let store = self.store.clone();
        let collaborators = self.collaborators.clone();
        let offer_id = offer.id;
        let slot = offer.slot;
        let winner = winner.clone();

        tokio::spawn(async move {
            let service_name = collaborators
                .directory
                .service_name(slot.service_id)
                .await
                .ok()
                .flatten()
                .unwrap_or_else(|| slot.service_id.to_string());

            let confirmation = Notice::BookingConfirmed {
                service_name,
                start: slot.start,
                appointment_id,
            };
            notify_entry(&collaborators, offer_id, &winner, confirmation).await;

            for entry_id in released {
                match store.get_entry(entry_id).await {
                    Ok(Some(entry)) => {
                        notify_entry(&collaborators, offer_id, &entry, Notice::SlotFilled).await;
                    }
                    Ok(None) => {}
                    Err(e) => {
                        tracing::warn!(offer_id = %offer_id, entry_id = %entry_id, error = %e, "could not load released entry");
                    }
                }
            }
        });
    }
}

/// Sends `notice` to the customer behind `entry`, logging any failure.
pub(crate) async fn notify_entry(
    collaborators: &Collaborators,
    offer_id: OfferId,
    entry: &WaitlistEntry,
    notice: Notice,
) {
    let kind = notice.kind();
    let contact = match collaborators.directory.contact_for(entry.customer_id).await {
        Ok(Some(contact)) => contact,
        Ok(None) => {
            tracing::warn!(offer_id = %offer_id, entry_id = %entry.id, kind, "no contact on file");
            metrics::counter!("waitlist_dispatch_failures_total").increment(1);
            return;
        }
        Err(e) => {
            tracing::warn!(offer_id = %offer_id, entry_id = %entry.id, kind, error = %e, "contact lookup failed");
            metrics::counter!("waitlist_dispatch_failures_total").increment(1);
            return;
        }
    };

    let message = OutboundMessage {
        to: contact.phone,
        offer_id,
        entry_id: Some(entry.id),
        notice,
    };
    if let Err(e) = collaborators.notifier.send(message).await {
        tracing::warn!(offer_id = %offer_id, entry_id = %entry.id, kind, error = %e, "notice dispatch failed");
        metrics::counter!("waitlist_dispatch_failures_total").increment(1);
    }
}

/// Tells every released candidate the slot is gone.
pub(crate) async fn notify_released<S: SlotStore>(
    store: &S,
    collaborators: &Collaborators,
    offer_id: OfferId,
    released: &[WaitlistEntryId],
) {
    for entry_id in released {
        match store.get_entry(*entry_id).await {
            Ok(Some(entry)) => {
                notify_entry(collaborators, offer_id, &entry, Notice::SlotFilled).await;
            }
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(offer_id = %offer_id, entry_id = %entry_id, error = %e, "could not load released entry");
            }
        }
    }
}
