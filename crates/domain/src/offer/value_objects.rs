//! Value objects for slot offers.

use chrono::{DateTime, NaiveDate, Utc};
use common::ServiceId;
use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// A specific service + start-time unit of appointment capacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Slot {
    pub service_id: ServiceId,
    pub start: DateTime<Utc>,
}

impl Slot {
    pub fn new(service_id: ServiceId, start: DateTime<Utc>) -> Self {
        Self { service_id, start }
    }

    /// Calendar date the slot falls on.
    pub fn date(&self) -> NaiveDate {
        self.start.date_naive()
    }
}

/// A discount expressed as a whole percentage (0..=100).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Discount(u8);

impl Discount {
    pub const MAX_PERCENT: u8 = 100;

    /// Creates a discount, rejecting percentages above 100.
    pub fn new(percent: u8) -> Result<Self, DomainError> {
        if percent > Self::MAX_PERCENT {
            return Err(DomainError::InvalidDiscount { percent });
        }
        Ok(Self(percent))
    }

    /// No discount.
    pub fn none() -> Self {
        Self(0)
    }

    pub fn percent(&self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for Discount {
    type Error = DomainError;

    fn try_from(percent: u8) -> Result<Self, Self::Error> {
        Self::new(percent)
    }
}

impl From<Discount> for u8 {
    fn from(discount: Discount) -> Self {
        discount.0
    }
}

impl std::fmt::Display for Discount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}%", self.0)
    }
}
