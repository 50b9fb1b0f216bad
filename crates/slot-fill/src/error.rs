//! Slot-filling error types.

use std::time::Duration;

use domain::DomainError;
use slot_store::StoreError;
use thiserror::Error;

/// Errors that can occur while filling a slot.
///
/// Losing a race or finding no candidates is not an error; those outcomes are
/// reported as values. Everything here is a failure the caller must see.
#[derive(Debug, Error)]
pub enum FillError {
    /// Discount outside the configured bounds.
    #[error("Discount {percent}% outside allowed range {min}%..={max}%")]
    InvalidDiscount { percent: u8, min: u8, max: u8 },

    /// Response window outside the configured bounds.
    #[error("Response window of {minutes} minutes outside allowed range {min}..={max} minutes")]
    InvalidResponseWindow { minutes: i64, min: i64, max: i64 },

    /// An offer was requested with an empty candidate list.
    #[error("No candidates supplied for offer")]
    NoCandidates,

    /// The engine configuration is inconsistent.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The booking service refused or failed to create the appointment.
    #[error("Booking service error: {0}")]
    Booking(String),

    /// The booking service did not answer in time.
    #[error("Booking service timed out after {0:?}")]
    BookingTimeout(Duration),

    /// The notification gateway could not deliver a message.
    #[error("Notification gateway error: {0}")]
    Notification(String),

    /// Domain error.
    #[error("Domain error: {0}")]
    Domain(#[from] DomainError),

    /// Slot store error.
    #[error("Slot store error: {0}")]
    Store(#[from] StoreError),
}

/// Convenience type alias for slot-filling results.
pub type Result<T> = std::result::Result<T, FillError>;
