//! Outcome of an acceptance attempt.

use common::AppointmentId;
use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// What happened when a candidate tried to accept an offer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Resolution {
    /// This acceptance won the slot and the appointment was created.
    Booked { appointment_id: AppointmentId },

    /// The same claimant already won this offer; nothing new was booked.
    AlreadyBooked { appointment_id: Option<AppointmentId> },

    /// Another candidate won the slot first.
    AlreadyClaimed,

    /// The response window had passed.
    Expired,

    /// The claim succeeded but the appointment could not be created; the
    /// claim was rolled back.
    SlotUnavailable,

    /// No pending offer correlates to this claimant.
    NotFound,
}

impl Resolution {
    /// Returns true if the respondent should be told the slot is gone.
    ///
    /// Respondents are not told whether a faster claimant or the deadline
    /// took it.
    pub fn is_slot_gone(&self) -> bool {
        matches!(
            self,
            Resolution::AlreadyClaimed | Resolution::Expired | Resolution::SlotUnavailable
        )
    }

    /// Returns the appointment this resolution refers to, if any.
    pub fn appointment_id(&self) -> Option<&AppointmentId> {
        match self {
            Resolution::Booked { appointment_id } => Some(appointment_id),
            Resolution::AlreadyBooked { appointment_id } => appointment_id.as_ref(),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Resolution::Booked { .. } => "booked",
            Resolution::AlreadyBooked { .. } => "already_booked",
            Resolution::AlreadyClaimed => "already_claimed",
            Resolution::Expired => "expired",
            Resolution::SlotUnavailable => "slot_unavailable",
            Resolution::NotFound => "not_found",
        }
    }

    /// Rebuilds a resolution from its stored outcome name and appointment id.
    pub fn from_parts(
        outcome: &str,
        appointment_id: Option<AppointmentId>,
    ) -> Result<Self, DomainError> {
        match (outcome, appointment_id) {
            ("booked", Some(appointment_id)) => Ok(Resolution::Booked { appointment_id }),
            ("already_booked", appointment_id) => Ok(Resolution::AlreadyBooked { appointment_id }),
            ("already_claimed", _) => Ok(Resolution::AlreadyClaimed),
            ("expired", _) => Ok(Resolution::Expired),
            ("slot_unavailable", _) => Ok(Resolution::SlotUnavailable),
            ("not_found", _) => Ok(Resolution::NotFound),
            (other, _) => Err(DomainError::UnknownStatus {
                kind: "resolution",
                value: other.to_string(),
            }),
        }
    }
}

impl std::fmt::Display for Resolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
