//! Slot offer state machine.

use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// The lifecycle status of a slot offer.
///
/// State transitions:
/// ```text
/// Pending ──┬──► Claimed
///           └──► Expired
///
/// Claimed ──► Pending | Expired   (booking failed after the claim)
/// ```
///
/// `Claimed` and `Expired` are terminal for every writer except the booking
/// rollback, which reopens a claim whose appointment could not be created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OfferStatus {
    /// Broadcast to candidates and waiting for the first acceptance.
    #[default]
    Pending,

    /// One candidate won the slot.
    Claimed,

    /// The response window passed without a successful claim.
    Expired,
}

impl OfferStatus {
    /// Returns true if a candidate may still claim the offer.
    pub fn is_claimable(&self) -> bool {
        matches!(self, OfferStatus::Pending)
    }

    /// Returns true if this is a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, OfferStatus::Claimed | OfferStatus::Expired)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OfferStatus::Pending => "pending",
            OfferStatus::Claimed => "claimed",
            OfferStatus::Expired => "expired",
        }
    }
}

impl std::fmt::Display for OfferStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for OfferStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(OfferStatus::Pending),
            "claimed" => Ok(OfferStatus::Claimed),
            "expired" => Ok(OfferStatus::Expired),
            other => Err(DomainError::UnknownStatus {
                kind: "offer",
                value: other.to_string(),
            }),
        }
    }
}
