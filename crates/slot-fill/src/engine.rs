//! The assembled engine.

use chrono::{DateTime, Duration, Utc};
use common::{OfferId, WaitlistEntryId};
use domain::{Resolution, Slot};
use slot_store::SlotStore;

use crate::collaborators::Collaborators;
use crate::config::FillConfig;
use crate::error::Result;
use crate::inbound::{InboundHandler, InboundMessage, InboundOutcome};
use crate::matcher::SlotMatcher;
use crate::orchestrator::{FillOutcome, OfferOrchestrator};
use crate::resolver::ResponseResolver;
use crate::sweeper::{ExpirationSweeper, SweepRunner};

/// Matcher, orchestrator, resolver, sweeper and inbound handler wired to
/// one store.
pub struct SlotFillEngine<S> {
    config: FillConfig,
    store: S,
    collaborators: Collaborators,
    matcher: SlotMatcher<S>,
    orchestrator: OfferOrchestrator<S>,
    resolver: ResponseResolver<S>,
    sweeper: ExpirationSweeper<S>,
    inbound: InboundHandler<S>,
}

impl<S: SlotStore + Clone + 'static> SlotFillEngine<S> {
    /// Builds the engine, rejecting an inconsistent configuration.
    pub fn new(store: S, collaborators: Collaborators, config: FillConfig) -> Result<Self> {
        config.validate()?;

        let resolver =
            ResponseResolver::new(store.clone(), collaborators.clone(), config.booking_timeout);
        let inbound = InboundHandler::new(
            store.clone(),
            resolver.clone(),
            collaborators.clone(),
            config.reply_matcher(),
            config.default_country_code.clone(),
        );

        Ok(Self {
            matcher: SlotMatcher::new(store.clone(), config.match_criteria()),
            orchestrator: OfferOrchestrator::new(store.clone(), collaborators.clone()),
            sweeper: ExpirationSweeper::new(store.clone(), collaborators.clone()),
            resolver,
            inbound,
            store,
            collaborators,
            config,
        })
    }

    pub fn config(&self) -> &FillConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Current time on the engine's clock.
    pub fn now(&self) -> DateTime<Utc> {
        self.collaborators.clock.now()
    }

    /// Finds candidates for a newly open slot and offers it to them.
    #[tracing::instrument(skip(self), fields(service_id = %slot.service_id, start = %slot.start))]
    pub async fn fill_slot(
        &self,
        slot: Slot,
        discount_percent: u8,
        response_window: Duration,
    ) -> Result<FillOutcome> {
        self.config.check_discount(discount_percent)?;
        self.config.check_response_window(response_window)?;

        let candidates = self.matcher.find_candidates(&slot).await?;
        if candidates.is_empty() {
            tracing::info!("no waitlist match");
            metrics::counter!("waitlist_offer_no_match_total", "reason" => "no_candidates")
                .increment(1);
            return Ok(FillOutcome::NoMatch);
        }

        self.orchestrator
            .create_offer(
                &self.config,
                slot,
                &candidates,
                discount_percent,
                response_window,
            )
            .await
    }

    /// Resolves an acceptance already correlated to an offer and entry.
    pub async fn resolve(&self, offer_id: OfferId, claimant: WaitlistEntryId) -> Result<Resolution> {
        self.resolver.resolve(offer_id, claimant).await
    }

    pub async fn handle_inbound(&self, message: InboundMessage) -> Result<InboundOutcome> {
        self.inbound.handle(message).await
    }

    /// Runs one expiration sweep at `now`.
    pub async fn sweep(&self, now: DateTime<Utc>) -> Result<usize> {
        self.sweeper.sweep(now).await
    }

    /// Runs one expiration sweep at the engine clock's current time.
    pub async fn sweep_now(&self) -> Result<usize> {
        self.sweeper.sweep(self.now()).await
    }

    /// Builds the background sweep loop at the configured interval.
    pub fn sweep_runner(&self) -> SweepRunner<S> {
        SweepRunner::new(self.sweeper.clone(), self.config.sweep_interval)
    }
}
