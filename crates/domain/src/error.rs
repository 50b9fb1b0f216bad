//! Domain error types.

use thiserror::Error;

/// Errors raised while constructing or parsing domain values.
#[derive(Debug, Error)]
pub enum DomainError {
    /// Discount percentage outside 0..=100.
    #[error("Invalid discount: {percent}% (must be between 0 and 100)")]
    InvalidDiscount { percent: u8 },

    /// A stored or submitted status name is not recognised.
    #[error("Unknown {kind} status: {value}")]
    UnknownStatus { kind: &'static str, value: String },
}
