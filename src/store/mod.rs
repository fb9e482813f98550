//! Persistence contract consumed by the engine.
//!
//! Every method is one round trip and one transaction: batch reads see a
//! single consistent state, batch writes apply every row or none.

mod memory;

pub use memory::InMemoryStore;

use async_trait::async_trait;
use ulid::Ulid;

use crate::model::*;

#[derive(Debug)]
pub enum StoreError {
    /// A row addressed by id does not exist.
    MissingRow(Ulid),
    /// A create would reuse an existing id.
    DuplicateId(Ulid),
    Io(String),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::MissingRow(id) => write!(f, "no row with id {id}"),
            StoreError::DuplicateId(id) => write!(f, "duplicate id {id}"),
            StoreError::Io(e) => write!(f, "I/O error: {e}"),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<std::io::Error> for StoreError {
    fn from(e: std::io::Error) -> Self {
        StoreError::Io(e.to_string())
    }
}

#[async_trait]
pub trait ReservationStore: Send + Sync {
    /// For each proposal, the number of active reservations other than
    /// `excluded_reservation` that overlap its span on a shared court.
    /// All counts come from one consistent read; results follow input order.
    async fn count_active_overlapping(&self, proposals: &[TimeProposal]) -> Result<Vec<u64>, StoreError>;

    /// Insert one row. `created_at`/`updated_at` are stamped by the store.
    async fn create_one(&self, reservation: Reservation) -> Result<Reservation, StoreError>;

    /// Insert all rows atomically, returning how many were written.
    async fn create_many(&self, reservations: Vec<Reservation>) -> Result<usize, StoreError>;

    /// Rows that exist among `ids`, in the order requested. Missing ids are skipped.
    async fn find_many_by_id(&self, ids: &[Ulid]) -> Result<Vec<Reservation>, StoreError>;

    /// Replace each row by its own id, atomically. `created_at` is kept and
    /// `updated_at` stamped by the store.
    async fn update_many(&self, reservations: Vec<Reservation>) -> Result<Vec<Reservation>, StoreError>;

    /// Every member of a series, active or not, ordered by start.
    async fn find_by_recurring_id(&self, recurring_id: Ulid) -> Result<Vec<Reservation>, StoreError>;

    /// Rows with `from <= start <= to`, active or not, ordered by start.
    async fn find_starting_between(&self, from: Ms, to: Ms) -> Result<Vec<Reservation>, StoreError>;
}

#[async_trait]
impl<T: ReservationStore + ?Sized> ReservationStore for std::sync::Arc<T> {
    async fn count_active_overlapping(&self, proposals: &[TimeProposal]) -> Result<Vec<u64>, StoreError> {
        (**self).count_active_overlapping(proposals).await
    }

    async fn create_one(&self, reservation: Reservation) -> Result<Reservation, StoreError> {
        (**self).create_one(reservation).await
    }

    async fn create_many(&self, reservations: Vec<Reservation>) -> Result<usize, StoreError> {
        (**self).create_many(reservations).await
    }

    async fn find_many_by_id(&self, ids: &[Ulid]) -> Result<Vec<Reservation>, StoreError> {
        (**self).find_many_by_id(ids).await
    }

    async fn update_many(&self, reservations: Vec<Reservation>) -> Result<Vec<Reservation>, StoreError> {
        (**self).update_many(reservations).await
    }

    async fn find_by_recurring_id(&self, recurring_id: Ulid) -> Result<Vec<Reservation>, StoreError> {
        (**self).find_by_recurring_id(recurring_id).await
    }

    async fn find_starting_between(&self, from: Ms, to: Ms) -> Result<Vec<Reservation>, StoreError> {
        (**self).find_starting_between(from, to).await
    }
}
