use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{AppointmentId, OfferId, WaitlistEntryId};
use domain::{OfferDraft, Resolution, SlotOffer, WaitlistEntry, WaitlistStatus};
use serde::{Deserialize, Serialize};

use crate::{OfferTransition, Result, WaitlistQuery};

/// One processed acceptance message, kept for audit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcceptanceRecord {
    pub offer_id: OfferId,
    pub entry_id: WaitlistEntryId,
    /// Normalized sender identity the message arrived from.
    pub sender: String,
    pub resolution: Resolution,
    pub received_at: DateTime<Utc>,
}

/// Persisted queue of waitlist entries.
///
/// Entry status is only ever changed through conditional transitions: an
/// entry moves only if its stored status is one of the expected ones.
#[async_trait]
pub trait WaitlistStore: Send + Sync {
    /// Inserts a new entry.
    ///
    /// Fails with `DuplicateEntry` if the id is taken.
    async fn insert_entry(&self, entry: WaitlistEntry) -> Result<()>;

    /// Retrieves an entry by id.
    async fn get_entry(&self, id: WaitlistEntryId) -> Result<Option<WaitlistEntry>>;

    /// Retrieves entries matching a query, ordered by priority descending then
    /// creation time ascending.
    async fn query_entries(&self, query: WaitlistQuery) -> Result<Vec<WaitlistEntry>>;

    /// Moves every entry in `ids` whose current status is one of `from` to
    /// `to`.
    ///
    /// Returns the ids that actually moved; entries in any other status are
    /// left untouched.
    async fn transition_entries(
        &self,
        ids: &[WaitlistEntryId],
        from: &[WaitlistStatus],
        to: WaitlistStatus,
        now: DateTime<Utc>,
    ) -> Result<Vec<WaitlistEntryId>>;
}

/// Persisted slot offers and the acceptance audit log.
#[async_trait]
pub trait OfferStore: Send + Sync {
    /// Retrieves an offer by id.
    async fn get_offer(&self, id: OfferId) -> Result<Option<SlotOffer>>;

    /// Applies `transition` to the offer if, and only if, the stored row
    /// still satisfies its preconditions.
    ///
    /// The check and the write are one atomic step. Returns `false` when the
    /// preconditions did not hold (including when the offer does not exist).
    async fn try_transition(&self, id: OfferId, transition: OfferTransition) -> Result<bool>;

    /// Records the appointment created for a claimed offer.
    async fn attach_appointment(&self, id: OfferId, appointment_id: AppointmentId) -> Result<()>;

    /// Returns `pending` offers whose expiration timestamp is at or before
    /// `now`, oldest deadline first.
    async fn lapsed_offers(&self, now: DateTime<Utc>) -> Result<Vec<SlotOffer>>;

    /// Returns `pending` and `claimed` offers listing any of `entry_ids` as a
    /// candidate. Pending offers come first, each group soonest deadline
    /// first.
    async fn unexpired_offers_for_candidates(
        &self,
        entry_ids: &[WaitlistEntryId],
    ) -> Result<Vec<SlotOffer>>;

    /// Appends to the acceptance audit log.
    async fn record_acceptance(&self, record: AcceptanceRecord) -> Result<()>;

    /// Returns the audit log for one offer in arrival order.
    async fn acceptances_for_offer(&self, id: OfferId) -> Result<Vec<AcceptanceRecord>>;
}

/// A store owning both waitlist entries and offers, able to change both in
/// one unit.
#[async_trait]
pub trait SlotStore: WaitlistStore + OfferStore {
    /// Opens an offer from `draft`.
    ///
    /// Atomically moves each drafted candidate that is still `Active` to
    /// `Notified` and inserts a `pending` offer listing only those survivors,
    /// in draft order. Returns `None`, and changes nothing, when no candidate
    /// survived.
    async fn open_offer(&self, draft: OfferDraft) -> Result<Option<SlotOffer>>;
}

/// Extension trait providing convenience methods for waitlist stores.
#[async_trait]
pub trait WaitlistStoreExt: WaitlistStore {
    /// Moves a single entry; returns whether it moved.
    async fn transition_entry(
        &self,
        id: WaitlistEntryId,
        from: &[WaitlistStatus],
        to: WaitlistStatus,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        Ok(!self.transition_entries(&[id], from, to, now).await?.is_empty())
    }

    /// Cancels an entry unless it already reached a terminal status.
    ///
    /// Returns the entry as stored afterwards, or `None` if it does not exist.
    async fn cancel_entry(
        &self,
        id: WaitlistEntryId,
        now: DateTime<Utc>,
    ) -> Result<Option<WaitlistEntry>> {
        self.transition_entries(&[id], CANCELLABLE, WaitlistStatus::Cancelled, now)
            .await?;
        self.get_entry(id).await
    }
}

// Blanket implementation for all WaitlistStore implementations
impl<T: WaitlistStore + ?Sized> WaitlistStoreExt for T {}

/// Statuses an administrator may cancel from.
pub const CANCELLABLE: &[WaitlistStatus] = &[
    WaitlistStatus::Active,
    WaitlistStatus::Notified,
    WaitlistStatus::ExpiredOffer,
];

/// Statuses released back to `Active` when an offer ends without them.
pub const RELEASABLE: &[WaitlistStatus] = &[WaitlistStatus::Notified, WaitlistStatus::ExpiredOffer];
