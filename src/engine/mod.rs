mod availability;
mod conflict;
mod error;
mod mutations;
mod queries;

pub use error::EngineError;

use std::sync::Arc;

use tokio::sync::Mutex;

use crate::model::*;
use crate::store::ReservationStore;

/// Source of "now" for authorization and recurrence horizons.
pub type Clock = Arc<dyn Fn() -> Ms + Send + Sync>;

/// Scheduling core over a [`ReservationStore`].
///
/// Stateless apart from the write gate: every operation reads what it needs
/// from the store, and the store is the only shared resource.
pub struct Engine<S> {
    store: S,
    clock: Clock,
    /// Serializes check-then-write so two writers sharing this engine cannot
    /// both pass an availability check for the same slot.
    write_gate: Mutex<()>,
}

impl<S: ReservationStore> Engine<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            clock: Arc::new(now_ms),
            write_gate: Mutex::new(()),
        }
    }

    pub fn with_clock(mut self, clock: impl Fn() -> Ms + Send + Sync + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub(super) fn now(&self) -> Ms {
        (self.clock)()
    }
}
