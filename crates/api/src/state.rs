//! Shared application state.

use std::sync::Arc;

use domain::{Clock, SystemClock};
use slot_fill::{
    Collaborators, FillConfig, InMemoryBookingService, InMemoryDirectory,
    InMemoryNotificationGateway, SlotFillEngine,
};
use slot_store::SlotStore;

/// Shared application state accessible from all handlers.
pub struct AppState<S> {
    pub engine: SlotFillEngine<S>,
    /// Contact book fed by waitlist intake. Held in memory only and empty
    /// after a restart, whatever the store.
    pub directory: InMemoryDirectory,
}

impl<S: SlotStore + Clone + 'static> AppState<S> {
    /// Builds the state over `store` with in-memory collaborators.
    pub fn new(
        store: S,
        config: FillConfig,
        clock: Arc<dyn Clock>,
    ) -> slot_fill::Result<Self> {
        let directory = InMemoryDirectory::new(config.default_country_code.clone());
        let collaborators = Collaborators::new(
            Arc::new(InMemoryBookingService::new()),
            Arc::new(InMemoryNotificationGateway::new()),
            Arc::new(directory.clone()),
            clock,
        );
        let engine = SlotFillEngine::new(store, collaborators, config)?;
        Ok(Self { engine, directory })
    }

    /// Builds the state on the system clock.
    pub fn with_system_clock(store: S, config: FillConfig) -> slot_fill::Result<Self> {
        Self::new(store, config, Arc::new(SystemClock))
    }
}
