//! Slot Matcher: finds the waitlist entries an open slot should be offered to.

use domain::{MatchCriteria, Slot, WaitlistEntry, rank_candidates};
use slot_store::{WaitlistQuery, WaitlistStore};

use crate::error::Result;

/// Read-only candidate search for an open slot.
#[derive(Debug, Clone)]
pub struct SlotMatcher<S> {
    store: S,
    criteria: MatchCriteria,
}

impl<S: WaitlistStore> SlotMatcher<S> {
    pub fn new(store: S, criteria: MatchCriteria) -> Self {
        Self { store, criteria }
    }

    pub fn criteria(&self) -> &MatchCriteria {
        &self.criteria
    }

    /// Returns the ranked candidates for `slot`, best first.
    ///
    /// An empty list means no match; it is not an error.
    #[tracing::instrument(skip(self), fields(service_id = %slot.service_id, start = %slot.start))]
    pub async fn find_candidates(&self, slot: &Slot) -> Result<Vec<WaitlistEntry>> {
        let (from, to) = self.criteria.date_window(slot);
        let mut query = WaitlistQuery::matchable(slot.service_id, from, to);
        // Preference filtering happens after the query, so the store cannot cap.
        if !self.criteria.honor_time_preference {
            query = query.limit(self.criteria.max_candidates);
        }

        let entries = self.store.query_entries(query).await?;
        let ranked = rank_candidates(entries, slot, &self.criteria);
        tracing::debug!(candidates = ranked.len(), "candidates found");
        Ok(ranked)
    }
}
