use ulid::Ulid;

use crate::model::*;
use crate::policy::can_access;
use crate::store::ReservationStore;

use super::conflict::validate_span;
use super::{Engine, EngineError};

impl<S: ReservationStore> Engine<S> {
    pub async fn get_reservation(&self, id: Ulid, customer: &Customer) -> Result<Reservation, EngineError> {
        let reservation = self
            .store
            .find_many_by_id(&[id])
            .await?
            .into_iter()
            .next()
            .ok_or(EngineError::ReservationNotFound(id))?;
        if !can_access(customer, &reservation) {
            return Err(EngineError::ReservationNotAuthorized(id));
        }
        Ok(reservation)
    }

    /// Calendar view of reservations starting in `[from, to)`.
    ///
    /// Admins get everything starting in `[from, to]`, cancelled rows included.
    /// Customers get active rows that are their own or have not ended yet, so
    /// occupied slots stay visible without exposing other people's history.
    pub async fn get_reservations(
        &self,
        from: Ms,
        to: Ms,
        customer: &Customer,
    ) -> Result<Vec<Reservation>, EngineError> {
        validate_span(&Span { start: from, end: to })?;
        let rows = self.store.find_starting_between(from, to).await?;
        if customer.is_admin() {
            return Ok(rows);
        }
        let now = self.now();
        Ok(rows
            .into_iter()
            .filter(|r| r.span.start < to && r.is_active)
            .filter(|r| r.customer_id == customer.id || r.span.end >= now)
            .collect())
    }

    /// Active members of a series, optionally only those not yet started.
    /// Denied unless the customer may access every one of them.
    pub async fn get_recurring_reservations(
        &self,
        recurring_id: Ulid,
        future_only: bool,
        customer: &Customer,
    ) -> Result<Vec<Reservation>, EngineError> {
        let now = self.now();
        let rows: Vec<Reservation> = self
            .store
            .find_by_recurring_id(recurring_id)
            .await?
            .into_iter()
            .filter(|r| r.is_active && (!future_only || r.span.start >= now))
            .collect();
        if let Some(denied) = rows.iter().find(|r| !can_access(customer, r)) {
            return Err(EngineError::ReservationNotAuthorized(denied.id));
        }
        Ok(rows)
    }
}
