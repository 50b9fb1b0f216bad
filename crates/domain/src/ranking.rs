//! Candidate filtering and ranking for an open slot.

use chrono::{Duration, NaiveDate};

use crate::offer::Slot;
use crate::waitlist::WaitlistEntry;

/// Filter and cap applied when matching waitlist entries to a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchCriteria {
    /// Maximum distance in days between requested date and slot date.
    pub max_date_skew_days: i64,
    /// Only the top N entries become offer candidates.
    pub max_candidates: usize,
    /// Also require the entry's time-of-day preference to accept the slot.
    pub honor_time_preference: bool,
}

impl Default for MatchCriteria {
    fn default() -> Self {
        Self {
            max_date_skew_days: 3,
            max_candidates: 10,
            honor_time_preference: false,
        }
    }
}

impl MatchCriteria {
    /// Inclusive requested-date window for `slot`.
    ///
    /// Bounds that fall outside the calendar are clamped to
    /// `NaiveDate::MIN`/`NaiveDate::MAX`.
    pub fn date_window(&self, slot: &Slot) -> (NaiveDate, NaiveDate) {
        let date = slot.date();
        let Some(skew) = Duration::try_days(self.max_date_skew_days) else {
            return (NaiveDate::MIN, NaiveDate::MAX);
        };
        (
            date.checked_sub_signed(skew).unwrap_or(NaiveDate::MIN),
            date.checked_add_signed(skew).unwrap_or(NaiveDate::MAX),
        )
    }

    /// Returns true if `entry` may be offered `slot`.
    pub fn admits(&self, entry: &WaitlistEntry, slot: &Slot) -> bool {
        entry.status.is_matchable()
            && entry.service_id == slot.service_id
            && entry.days_from(slot.date()) <= self.max_date_skew_days
            && (!self.honor_time_preference || entry.time_preference.accepts(slot.start))
    }
}

/// Filters, orders and caps `entries` for `slot`.
///
/// Order: priority descending, then created_at ascending (longest waiting
/// first), then id so equal rows rank deterministically.
pub fn rank_candidates(
    entries: impl IntoIterator<Item = WaitlistEntry>,
    slot: &Slot,
    criteria: &MatchCriteria,
) -> Vec<WaitlistEntry> {
    let mut ranked: Vec<WaitlistEntry> = entries
        .into_iter()
        .filter(|entry| criteria.admits(entry, slot))
        .collect();

    ranked.sort_by(|a, b| {
        b.priority
            .cmp(&a.priority)
            .then(a.created_at.cmp(&b.created_at))
            .then(a.id.cmp(&b.id))
    });
    ranked.truncate(criteria.max_candidates);
    ranked
}
