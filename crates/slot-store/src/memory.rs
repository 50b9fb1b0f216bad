use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{AppointmentId, OfferId, WaitlistEntryId};
use domain::{OfferDraft, OfferStatus, SlotOffer, WaitlistEntry, WaitlistStatus};
use tokio::sync::RwLock;

use crate::{
    OfferTransition, Result, StoreError, WaitlistQuery,
    store::{AcceptanceRecord, OfferStore, SlotStore, WaitlistStore},
};

#[derive(Default)]
struct Inner {
    entries: HashMap<WaitlistEntryId, WaitlistEntry>,
    offers: HashMap<OfferId, SlotOffer>,
    acceptances: Vec<AcceptanceRecord>,
}

/// In-memory slot store implementation for testing.
///
/// Entries, offers and the audit log share one lock, so every trait method
/// (including the cross-collection [`SlotStore::open_offer`]) is atomic.
#[derive(Clone, Default)]
pub struct InMemorySlotStore {
    inner: Arc<RwLock<Inner>>,
    unavailable: Arc<AtomicBool>,
}

impl InMemorySlotStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent call fail with [`StoreError::Unavailable`].
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Returns the total number of offers stored.
    pub async fn offer_count(&self) -> usize {
        self.inner.read().await.offers.len()
    }

    /// Clears all entries, offers and acceptances.
    pub async fn clear(&self) {
        *self.inner.write().await = Inner::default();
    }

    fn check_available(&self) -> Result<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("in-memory store disabled".to_string()));
        }
        Ok(())
    }
}

fn move_entries(
    entries: &mut HashMap<WaitlistEntryId, WaitlistEntry>,
    ids: &[WaitlistEntryId],
    from: &[WaitlistStatus],
    to: WaitlistStatus,
    now: DateTime<Utc>,
) -> Vec<WaitlistEntryId> {
    let mut moved = Vec::new();
    for id in ids {
        if let Some(entry) = entries.get_mut(id)
            && from.contains(&entry.status)
        {
            entry.status = to;
            entry.updated_at = now;
            moved.push(*id);
        }
    }
    moved
}

#[async_trait]
impl WaitlistStore for InMemorySlotStore {
    async fn insert_entry(&self, entry: WaitlistEntry) -> Result<()> {
        self.check_available()?;
        let mut inner = self.inner.write().await;
        if inner.entries.contains_key(&entry.id) {
            return Err(StoreError::DuplicateEntry(entry.id));
        }
        inner.entries.insert(entry.id, entry);
        Ok(())
    }

    async fn get_entry(&self, id: WaitlistEntryId) -> Result<Option<WaitlistEntry>> {
        self.check_available()?;
        Ok(self.inner.read().await.entries.get(&id).cloned())
    }

    async fn query_entries(&self, query: WaitlistQuery) -> Result<Vec<WaitlistEntry>> {
        self.check_available()?;
        let inner = self.inner.read().await;
        let mut entries: Vec<_> = inner
            .entries
            .values()
            .filter(|e| query.matches(e))
            .cloned()
            .collect();

        entries.sort_by(|a, b| {
            b.priority
                .cmp(&a.priority)
                .then(a.created_at.cmp(&b.created_at))
                .then(a.id.cmp(&b.id))
        });

        if let Some(limit) = query.limit {
            entries.truncate(limit);
        }
        Ok(entries)
    }

    async fn transition_entries(
        &self,
        ids: &[WaitlistEntryId],
        from: &[WaitlistStatus],
        to: WaitlistStatus,
        now: DateTime<Utc>,
    ) -> Result<Vec<WaitlistEntryId>> {
        self.check_available()?;
        let mut inner = self.inner.write().await;
        Ok(move_entries(&mut inner.entries, ids, from, to, now))
    }
}

#[async_trait]
impl OfferStore for InMemorySlotStore {
    async fn get_offer(&self, id: OfferId) -> Result<Option<SlotOffer>> {
        self.check_available()?;
        Ok(self.inner.read().await.offers.get(&id).cloned())
    }

    async fn try_transition(&self, id: OfferId, transition: OfferTransition) -> Result<bool> {
        self.check_available()?;
        let mut inner = self.inner.write().await;
        match inner.offers.get_mut(&id) {
            Some(offer) if transition.permits(offer) => {
                transition.apply(offer);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn attach_appointment(&self, id: OfferId, appointment_id: AppointmentId) -> Result<()> {
        self.check_available()?;
        let mut inner = self.inner.write().await;
        let offer = inner
            .offers
            .get_mut(&id)
            .ok_or(StoreError::OfferNotFound(id))?;
        offer.appointment_id = Some(appointment_id);
        Ok(())
    }

    async fn lapsed_offers(&self, now: DateTime<Utc>) -> Result<Vec<SlotOffer>> {
        self.check_available()?;
        let inner = self.inner.read().await;
        let mut offers: Vec<_> = inner
            .offers
            .values()
            .filter(|o| o.status == OfferStatus::Pending && o.has_lapsed_at(now))
            .cloned()
            .collect();
        offers.sort_by(|a, b| a.expires_at.cmp(&b.expires_at).then(a.id.cmp(&b.id)));
        Ok(offers)
    }

    async fn unexpired_offers_for_candidates(
        &self,
        entry_ids: &[WaitlistEntryId],
    ) -> Result<Vec<SlotOffer>> {
        self.check_available()?;
        let inner = self.inner.read().await;
        let mut offers: Vec<_> = inner
            .offers
            .values()
            .filter(|o| {
                o.status != OfferStatus::Expired
                    && o.candidates.iter().any(|c| entry_ids.contains(c))
            })
            .cloned()
            .collect();
        offers.sort_by_key(|o| (o.status != OfferStatus::Pending, o.expires_at, o.id));
        Ok(offers)
    }

    async fn record_acceptance(&self, record: AcceptanceRecord) -> Result<()> {
        self.check_available()?;
        self.inner.write().await.acceptances.push(record);
        Ok(())
    }

    async fn acceptances_for_offer(&self, id: OfferId) -> Result<Vec<AcceptanceRecord>> {
        self.check_available()?;
        let inner = self.inner.read().await;
        Ok(inner
            .acceptances
            .iter()
            .filter(|r| r.offer_id == id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl SlotStore for InMemorySlotStore {
    async fn open_offer(&self, draft: OfferDraft) -> Result<Option<SlotOffer>> {
        self.check_available()?;
        let mut inner = self.inner.write().await;
        if inner.offers.contains_key(&draft.id) {
            return Err(StoreError::DuplicateOffer(draft.id));
        }

        let survivors = move_entries(
            &mut inner.entries,
            &draft.candidates,
            &[WaitlistStatus::Active],
            WaitlistStatus::Notified,
            draft.created_at,
        );
        if survivors.is_empty() {
            return Ok(None);
        }

        let offer = draft.into_offer(survivors);
        inner.offers.insert(offer.id, offer.clone());
        Ok(Some(offer))
    }
}
