//! Expiration Sweeper: closes offers whose response window has passed.

use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use domain::WaitlistStatus;
use slot_store::{OfferTransition, RELEASABLE, SlotStore};
use tokio_util::sync::CancellationToken;

use crate::collaborators::Collaborators;
use crate::error::Result;
use crate::resolver::notify_released;

/// Expires lapsed offers and returns their candidates to the waitlist.
#[derive(Clone)]
pub struct ExpirationSweeper<S> {
    store: S,
    collaborators: Collaborators,
}

impl<S: SlotStore> ExpirationSweeper<S> {
    pub fn new(store: S, collaborators: Collaborators) -> Self {
        Self {
            store,
            collaborators,
        }
    }

    /// Expires every pending offer whose deadline is at or before `now`.
    ///
    /// Returns the number of offers this call expired. Running it again with
    /// the same `now` expires nothing, and offers claimed in the meantime are
    /// left alone. Released candidates are told the offer closed; delivery
    /// failures are logged only.
    #[tracing::instrument(skip(self))]
    pub async fn sweep(&self, now: DateTime<Utc>) -> Result<usize> {
        let started = Instant::now();
        let lapsed = self.store.lapsed_offers(now).await?;
        let mut expired = 0;

        for offer in lapsed {
            if !self
                .store
                .try_transition(offer.id, OfferTransition::expire(now))
                .await?
            {
                tracing::debug!(offer_id = %offer.id, "offer changed before it could expire");
                continue;
            }
            expired += 1;

            let released = self
                .store
                .transition_entries(&offer.candidates, RELEASABLE, WaitlistStatus::Active, now)
                .await?;
            tracing::info!(
                offer_id = %offer.id,
                released = released.len(),
                "offer expired"
            );
            notify_released(&self.store, &self.collaborators, offer.id, &released).await;
        }

        metrics::counter!("waitlist_offers_expired_total").increment(expired as u64);
        metrics::histogram!("waitlist_sweep_duration_seconds")
            .record(started.elapsed().as_secs_f64());
        Ok(expired)
    }
}

/// Runs the sweeper on a fixed interval until cancelled.
pub struct SweepRunner<S> {
    sweeper: ExpirationSweeper<S>,
    interval: Duration,
}

impl<S: SlotStore> SweepRunner<S> {
    pub fn new(sweeper: ExpirationSweeper<S>, interval: Duration) -> Self {
        Self { sweeper, interval }
    }

    /// Sweeps once per tick at the collaborators' clock time. A failed sweep
    /// is logged and retried on the next tick.
    pub async fn run(self, cancel: CancellationToken) {
        let mut interval = tokio::time::interval(self.interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        tracing::info!(interval_secs = self.interval.as_secs(), "expiration sweeper started");

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    let now = self.sweeper.collaborators.clock.now();
                    match self.sweeper.sweep(now).await {
                        Ok(0) => {}
                        Ok(expired) => tracing::debug!(expired, "sweep finished"),
                        Err(e) => tracing::warn!(error = %e, "sweep failed"),
                    }
                }
                _ = cancel.cancelled() => {
                    tracing::info!("expiration sweeper shutting down");
                    break;
                }
            }
        }
    }
}
