//! Slot offer record and the draft it is opened from.

use chrono::{DateTime, Duration, Utc};
use common::{AppointmentId, OfferId, WaitlistEntryId};
use serde::{Deserialize, Serialize};

use super::{Discount, OfferStatus, Slot};

/// An offer about to be opened.
///
/// The store moves every candidate that is still `Active` to `Notified` and
/// persists the offer with only those survivors, in draft order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OfferDraft {
    pub id: OfferId,
    pub slot: Slot,
    pub candidates: Vec<WaitlistEntryId>,
    pub discount: Discount,
    pub response_window: Duration,
    pub created_at: DateTime<Utc>,
}

impl OfferDraft {
    pub fn new(
        slot: Slot,
        candidates: Vec<WaitlistEntryId>,
        discount: Discount,
        response_window: Duration,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: OfferId::new(),
            slot,
            candidates,
            discount,
            response_window,
            created_at,
        }
    }

    /// The window starts at creation, not at delivery.
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.created_at + self.response_window
    }

    /// Builds the pending offer for the candidates that survived.
    pub fn into_offer(self, survivors: Vec<WaitlistEntryId>) -> SlotOffer {
        let expires_at = self.expires_at();
        SlotOffer {
            id: self.id,
            slot: self.slot,
            candidates: survivors,
            discount: self.discount,
            response_window: self.response_window,
            created_at: self.created_at,
            expires_at,
            status: OfferStatus::Pending,
            claimant: None,
            claimed_at: None,
            appointment_id: None,
        }
    }
}

/// A time-boxed proposal of one slot to a ranked set of waitlist candidates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotOffer {
    pub id: OfferId,
    pub slot: Slot,
    /// Ranked candidate entries, best first.
    pub candidates: Vec<WaitlistEntryId>,
    pub discount: Discount,
    #[serde(with = "duration_secs", rename = "response_window_secs")]
    pub response_window: Duration,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub status: OfferStatus,
    pub claimant: Option<WaitlistEntryId>,
    pub claimed_at: Option<DateTime<Utc>>,
    pub appointment_id: Option<AppointmentId>,
}

impl SlotOffer {
    /// Returns true if the offer can still be claimed at `now`.
    pub fn is_live_at(&self, now: DateTime<Utc>) -> bool {
        self.status.is_claimable() && now < self.expires_at
    }

    /// Returns true if the deadline has passed at `now`.
    pub fn has_lapsed_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    pub fn has_candidate(&self, entry_id: WaitlistEntryId) -> bool {
        self.candidates.contains(&entry_id)
    }

    /// Returns true if `entry_id` holds the claim.
    pub fn is_claimed_by(&self, entry_id: WaitlistEntryId) -> bool {
        self.status == OfferStatus::Claimed && self.claimant == Some(entry_id)
    }

    /// Every candidate except `winner`, in rank order.
    pub fn other_candidates(&self, winner: WaitlistEntryId) -> Vec<WaitlistEntryId> {
        self.candidates
            .iter()
            .copied()
            .filter(|id| *id != winner)
            .collect()
    }
}

mod duration_secs {
    use chrono::Duration;
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i64(duration.num_seconds())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = i64::deserialize(deserializer)?;
        Duration::try_seconds(secs).ok_or_else(|| D::Error::custom("response window out of range"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use common::ServiceId;

    fn created() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 10, 8, 0, 0).unwrap()
    }

    fn draft(candidates: Vec<WaitlistEntryId>) -> OfferDraft {
        OfferDraft::new(
            Slot::new(ServiceId::new(), created() + Duration::days(1)),
            candidates,
            Discount::new(10).unwrap(),
            Duration::hours(2),
            created(),
        )
    }

    #[test]
    fn test_expiration_is_creation_plus_window() {
        let d = draft(vec![WaitlistEntryId::new()]);
        assert_eq!(d.expires_at(), created() + Duration::hours(2));
    }

    #[test]
    fn test_into_offer_keeps_survivors_only() {
        let a = WaitlistEntryId::new();
        let b = WaitlistEntryId::new();
        let offer = draft(vec![a, b]).into_offer(vec![b]);
        assert_eq!(offer.candidates, vec![b]);
        assert_eq!(offer.status, OfferStatus::Pending);
        assert!(offer.claimant.is_none());
    }

    #[test]
    fn test_liveness_boundary() {
        let offer = draft(vec![WaitlistEntryId::new()]).into_offer(vec![WaitlistEntryId::new()]);
        let deadline = offer.expires_at;
        assert!(offer.is_live_at(deadline - Duration::seconds(1)));
        assert!(!offer.is_live_at(deadline));
        assert!(offer.has_lapsed_at(deadline));
    }

    #[test]
    fn test_claimed_offer_is_not_live() {
        let a = WaitlistEntryId::new();
        let mut offer = draft(vec![a]).into_offer(vec![a]);
        offer.status = OfferStatus::Claimed;
        offer.claimant = Some(a);
        assert!(!offer.is_live_at(created()));
        assert!(offer.is_claimed_by(a));
        assert!(!offer.is_claimed_by(WaitlistEntryId::new()));
    }

    #[test]
    fn test_other_candidates_preserves_rank() {
        let (a, b, c) = (WaitlistEntryId::new(), WaitlistEntryId::new(), WaitlistEntryId::new());
        let offer = draft(vec![a, b, c]).into_offer(vec![a, b, c]);
        assert_eq!(offer.other_candidates(b), vec![a, c]);
    }

    #[test]
    fn test_response_window_serializes_as_seconds() {
        let a = WaitlistEntryId::new();
        let offer = draft(vec![a]).into_offer(vec![a]);
        let json = serde_json::to_value(&offer).unwrap();
        assert_eq!(json["response_window_secs"], 7200);
        let back: SlotOffer = serde_json::from_value(json).unwrap();
        assert_eq!(back.response_window, Duration::hours(2));
    }
}
