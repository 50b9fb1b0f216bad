use common::{OfferId, WaitlistEntryId};
use domain::DomainError;
use thiserror::Error;

/// Errors that can occur when interacting with the slot store.
///
/// A failed compare-and-set is not an error: transitions report it as
/// `Ok(false)`. Everything here means the store could not give a definite
/// answer and the caller must not assume any state change happened.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A waitlist entry with this id already exists.
    #[error("Duplicate waitlist entry: {0}")]
    DuplicateEntry(WaitlistEntryId),

    /// An offer with this id already exists.
    #[error("Duplicate offer: {0}")]
    DuplicateOffer(OfferId),

    /// The offer referenced by a write does not exist.
    #[error("Offer not found: {0}")]
    OfferNotFound(OfferId),

    /// The store is not reachable.
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A stored value could not be mapped back to the domain model.
    #[error("Corrupt row: {0}")]
    Corrupt(#[from] DomainError),
}

/// Result type for slot store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
