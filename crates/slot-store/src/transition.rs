//! Compare-and-set transitions for slot offers.
//!
//! Every write to an offer's status goes through [`OfferTransition`]: the
//! store applies it only if the stored row still matches the expected status,
//! claimant and deadline condition, in a single atomic step. Of N concurrent
//! transitions from the same status, exactly one can succeed.

use chrono::{DateTime, Utc};
use common::WaitlistEntryId;
use domain::{OfferStatus, SlotOffer};

/// How a transition treats the claimant columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimantUpdate {
    /// Leave claimant and claim time as stored.
    Keep,
    /// Record `entry_id` as claimant, claimed at `at`.
    Set {
        entry_id: WaitlistEntryId,
        at: DateTime<Utc>,
    },
    /// Remove the claimant and claim time.
    Clear,
}

/// Deadline condition evaluated against the stored expiration timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeadlineGuard {
    Any,
    /// `expires_at > now`
    LiveAt(DateTime<Utc>),
    /// `expires_at <= now`
    LapsedAt(DateTime<Utc>),
}

impl DeadlineGuard {
    pub fn permits(&self, expires_at: DateTime<Utc>) -> bool {
        match self {
            DeadlineGuard::Any => true,
            DeadlineGuard::LiveAt(now) => expires_at > *now,
            DeadlineGuard::LapsedAt(now) => expires_at <= *now,
        }
    }
}

/// A conditional status change for one offer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OfferTransition {
    pub from: OfferStatus,
    pub to: OfferStatus,
    /// When set, the stored claimant must equal this entry.
    pub expected_claimant: Option<WaitlistEntryId>,
    pub claimant: ClaimantUpdate,
    pub guard: DeadlineGuard,
}

impl OfferTransition {
    /// `pending → claimed` for `entry_id`, only before the deadline.
    pub fn claim(entry_id: WaitlistEntryId, now: DateTime<Utc>) -> Self {
        Self {
            from: OfferStatus::Pending,
            to: OfferStatus::Claimed,
            expected_claimant: None,
            claimant: ClaimantUpdate::Set { entry_id, at: now },
            guard: DeadlineGuard::LiveAt(now),
        }
    }

    /// `claimed → pending`, reopening `entry_id`'s claim while the offer is
    /// still within its window.
    pub fn reopen(entry_id: WaitlistEntryId, now: DateTime<Utc>) -> Self {
        Self {
            from: OfferStatus::Claimed,
            to: OfferStatus::Pending,
            expected_claimant: Some(entry_id),
            claimant: ClaimantUpdate::Clear,
            guard: DeadlineGuard::LiveAt(now),
        }
    }

    /// `claimed → expired`, voiding `entry_id`'s claim once the window has
    /// passed.
    pub fn void(entry_id: WaitlistEntryId, now: DateTime<Utc>) -> Self {
        Self {
            from: OfferStatus::Claimed,
            to: OfferStatus::Expired,
            expected_claimant: Some(entry_id),
            claimant: ClaimantUpdate::Clear,
            guard: DeadlineGuard::LapsedAt(now),
        }
    }

    /// `pending → expired` once the window has passed.
    pub fn expire(now: DateTime<Utc>) -> Self {
        Self {
            from: OfferStatus::Pending,
            to: OfferStatus::Expired,
            expected_claimant: None,
            claimant: ClaimantUpdate::Keep,
            guard: DeadlineGuard::LapsedAt(now),
        }
    }

    /// Returns true if `offer` satisfies every precondition.
    pub fn permits(&self, offer: &SlotOffer) -> bool {
        offer.status == self.from
            && self
                .expected_claimant
                .is_none_or(|expected| offer.claimant == Some(expected))
            && self.guard.permits(offer.expires_at)
    }

    /// Writes the new status and claimant fields into `offer`.
    ///
    /// Callers must check [`permits`](Self::permits) under the same lock.
    pub fn apply(&self, offer: &mut SlotOffer) {
        offer.status = self.to;
        match self.claimant {
            ClaimantUpdate::Keep => {}
            ClaimantUpdate::Set { entry_id, at } => {
                offer.claimant = Some(entry_id);
                offer.claimed_at = Some(at);
            }
            ClaimantUpdate::Clear => {
                offer.claimant = None;
                offer.claimed_at = None;
            }
        }
    }
}
