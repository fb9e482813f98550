pub mod config;
pub mod engine;
pub mod limits;
pub mod model;
pub mod observability;
pub mod policy;
pub mod recurrence;
pub mod store;
pub mod wal;

pub use engine::{Engine, EngineError};
pub use store::{InMemoryStore, ReservationStore, StoreError};
