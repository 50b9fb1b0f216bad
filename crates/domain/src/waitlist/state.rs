//! Waitlist entry state machine.

use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// The lifecycle status of a waitlist entry.
///
/// State transitions:
/// ```text
/// Active ──► Notified ──┬──► Booked
///   ▲           │       ├──► ExpiredOffer ──┐
///   │           │       │                   │
///   └───────────┴───────┴───────────────────┘   (offer filled / expired)
///
/// Active | Notified | ExpiredOffer ──► Cancelled
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum WaitlistStatus {
    /// Waiting for a slot; the only status eligible for matching.
    #[default]
    Active,

    /// Included in a live offer.
    Notified,

    /// Took the slot (terminal state).
    Booked,

    /// Replied to an offer after its deadline; reverts to `Active` once the
    /// offer is swept.
    ExpiredOffer,

    /// Withdrawn by an administrator (terminal state).
    Cancelled,
}

impl WaitlistStatus {
    /// Returns true if the entry may be matched to an open slot.
    pub fn is_matchable(&self) -> bool {
        matches!(self, WaitlistStatus::Active)
    }

    /// Returns true if the entry is waiting on an outstanding offer.
    pub fn is_awaiting_offer(&self) -> bool {
        matches!(self, WaitlistStatus::Notified | WaitlistStatus::ExpiredOffer)
    }

    /// Returns true if an administrator may still cancel the entry.
    pub fn can_cancel(&self) -> bool {
        !self.is_terminal()
    }

    /// Returns true if this is a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, WaitlistStatus::Booked | WaitlistStatus::Cancelled)
    }

    /// Returns true if moving from `self` to `next` is a legal transition.
    pub fn can_transition_to(&self, next: WaitlistStatus) -> bool {
        use WaitlistStatus::*;
        matches!(
            (self, next),
            (Active, Notified)
                | (Notified, Booked)
                | (Notified, Active)
                | (Notified, ExpiredOffer)
                | (ExpiredOffer, Active)
                | (Active | Notified | ExpiredOffer, Cancelled)
        )
    }

    /// Returns the status name as stored and serialized.
    pub fn as_str(&self) -> &'static str {
        match self {
            WaitlistStatus::Active => "active",
            WaitlistStatus::Notified => "notified",
            WaitlistStatus::Booked => "booked",
            WaitlistStatus::ExpiredOffer => "expired_offer",
            WaitlistStatus::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for WaitlistStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for WaitlistStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(WaitlistStatus::Active),
            "notified" => Ok(WaitlistStatus::Notified),
            "booked" => Ok(WaitlistStatus::Booked),
            "expired_offer" => Ok(WaitlistStatus::ExpiredOffer),
            "cancelled" => Ok(WaitlistStatus::Cancelled),
            other => Err(DomainError::UnknownStatus {
                kind: "waitlist",
                value: other.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use WaitlistStatus::*;

    const ALL: [WaitlistStatus; 5] = [Active, Notified, Booked, ExpiredOffer, Cancelled];

    #[test]
    fn test_default_is_active() {
        assert_eq!(WaitlistStatus::default(), Active);
    }

    #[test]
    fn test_only_active_is_matchable() {
        for status in ALL {
            assert_eq!(status.is_matchable(), status == Active, "{status}");
        }
    }

    #[test]
    fn test_terminal_states() {
        assert!(!Active.is_terminal());
        assert!(!Notified.is_terminal());
        assert!(!ExpiredOffer.is_terminal());
        assert!(Booked.is_terminal());
        assert!(Cancelled.is_terminal());
    }

    #[test]
    fn test_terminal_states_have_no_exits() {
        for from in [Booked, Cancelled] {
            for to in ALL {
                assert!(!from.can_transition_to(to), "{from} -> {to}");
            }
        }
    }

    #[test]
    fn test_offer_lifecycle_transitions() {
        assert!(Active.can_transition_to(Notified));
        assert!(Notified.can_transition_to(Booked));
        assert!(Notified.can_transition_to(Active));
        assert!(Notified.can_transition_to(ExpiredOffer));
        assert!(ExpiredOffer.can_transition_to(Active));

        assert!(!Active.can_transition_to(Booked));
        assert!(!ExpiredOffer.can_transition_to(Booked));
        assert!(!ExpiredOffer.can_transition_to(Notified));
    }

    #[test]
    fn test_cancellation_from_non_terminal() {
        assert!(Active.can_transition_to(Cancelled));
        assert!(Notified.can_transition_to(Cancelled));
        assert!(ExpiredOffer.can_transition_to(Cancelled));
        assert!(!Booked.can_cancel());
    }

    #[test]
    fn test_string_roundtrip() {
        for status in ALL {
            assert_eq!(status.as_str().parse::<WaitlistStatus>().unwrap(), status);
        }
        assert!("waiting".parse::<WaitlistStatus>().is_err());
    }

    #[test]
    fn test_serialization_matches_storage_names() {
        let json = serde_json::to_string(&ExpiredOffer).unwrap();
        assert_eq!(json, "\"expired_offer\"");
    }
}
