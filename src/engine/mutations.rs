use std::time::Instant;

use tracing::info;
use ulid::Ulid;

use crate::limits::*;
use crate::model::*;
use crate::observability::*;
use crate::policy::can_modify;
use crate::store::ReservationStore;

use super::conflict::{
    find_batch_overlap, validate_instant, validate_locations, validate_name, validate_proposal, validate_span,
};
use super::{Engine, EngineError};

const OUT_OF_RANGE: EngineError = EngineError::InvalidProposal("timestamp out of range");

/// Offset from `current` to the requested value; zero when nothing was requested.
fn delta(requested: Option<Ms>, current: Ms) -> Result<Ms, EngineError> {
    match requested {
        Some(t) => t.checked_sub(current).ok_or(OUT_OF_RANGE),
        None => Ok(0),
    }
}

impl<S: ReservationStore> Engine<S> {
    /// Book one slot for `customer`. Nothing is written if the slot is taken.
    pub async fn create_reservation(
        &self,
        new: NewReservation,
        customer: &Customer,
    ) -> Result<Reservation, EngineError> {
        let started = Instant::now();
        let result = self.try_create_reservation(new, customer).await;
        record_operation("create_reservation", started, &result);
        result
    }

    /// Book every date of a recurrence under one fresh `recurring_id`.
    /// All-or-nothing: one taken date rejects the whole series.
    pub async fn create_recurring_reservation(
        &self,
        new: NewRecurringReservation,
        customer: &Customer,
    ) -> Result<CreatedSeries, EngineError> {
        let started = Instant::now();
        let result = self.try_create_recurring(new, customer).await;
        record_operation("create_recurring_reservation", started, &result);
        result
    }

    /// Apply `update.patch` to the reference reservation and every
    /// connected one, moving them together by the reference's time delta.
    /// Returns the updated reference.
    pub async fn update_reservation(
        &self,
        update: UpdateReservation,
        customer: &Customer,
    ) -> Result<Reservation, EngineError> {
        let started = Instant::now();
        let result = self.try_update_reservation(update, customer).await;
        record_operation("update_reservation", started, &result);
        result
    }

    async fn try_create_reservation(
        &self,
        new: NewReservation,
        customer: &Customer,
    ) -> Result<Reservation, EngineError> {
        validate_name(&new.name)?;
        let proposal = new.proposal();
        validate_proposal(&proposal)?;

        let _gate = self.write_gate.lock().await;
        let availability = self.availability_batch(&[proposal]).await?;
        if !availability.iter().all(|a| a.is_available) {
            info!("rejected reservation for customer {}: time not available", customer.id);
            return Err(EngineError::TimeNotAvailable);
        }

        let reservation = Reservation {
            id: Ulid::new(),
            recurring_id: None,
            name: new.name,
            is_active: true,
            customer_id: customer.id,
            span: new.span,
            locations: new.locations,
            created_at: 0,
            updated_at: 0,
        };
        let created = self.store.create_one(reservation).await?;
        metrics::counter!(RESERVATIONS_CREATED_TOTAL).increment(1);
        info!(
            "created reservation {} [{}, {}) for customer {}",
            created.id, created.span.start, created.span.end, created.customer_id
        );
        Ok(created)
    }

    async fn try_create_recurring(
        &self,
        new: NewRecurringReservation,
        customer: &Customer,
    ) -> Result<CreatedSeries, EngineError> {
        validate_name(&new.name)?;
        let query = new.query;

        let _gate = self.write_gate.lock().await;
        let availability = self.recurring_availability(&query).await?;
        if !availability.unavailable_times.is_empty() {
            metrics::counter!(SERIES_REJECTED_TOTAL).increment(1);
            info!(
                "rejected series for customer {}: {} of {} dates taken",
                customer.id,
                availability.unavailable_times.len(),
                availability.unavailable_times.len() + availability.available_times.len()
            );
            return Err(EngineError::TimeNotAvailable);
        }
        if availability.available_times.is_empty() {
            return Err(EngineError::InvalidProposal("recurrence produced no dates"));
        }
        if availability.available_times.len() > MAX_BATCH_SIZE {
            return Err(EngineError::LimitExceeded("series too large"));
        }

        let duration = query.span.duration_ms();
        let proposals: Vec<TimeProposal> = availability
            .available_times
            .iter()
            .map(|&start| TimeProposal::new(Span { start, end: start + duration }, query.locations))
            .collect();
        // Dates are only checked against the store, so an included date can
        // still collide with a generated one.
        if find_batch_overlap(&proposals).is_some() {
            metrics::counter!(SERIES_REJECTED_TOTAL).increment(1);
            info!("rejected series for customer {}: dates overlap each other", customer.id);
            return Err(EngineError::TimeNotAvailable);
        }

        let recurring_id = Ulid::new();
        let reservations: Vec<Reservation> = proposals
            .into_iter()
            .map(|p| Reservation {
                id: Ulid::new(),
                recurring_id: Some(recurring_id),
                name: new.name.clone(),
                is_active: true,
                customer_id: customer.id,
                span: p.span,
                locations: p.locations,
                created_at: 0,
                updated_at: 0,
            })
            .collect();
        let count = self.store.create_many(reservations).await?;
        metrics::counter!(RESERVATIONS_CREATED_TOTAL).increment(count as u64);
        metrics::counter!(SERIES_CREATED_TOTAL).increment(1);
        info!("created series {recurring_id} with {count} reservations for customer {}", customer.id);
        Ok(CreatedSeries { recurring_id, count })
    }

    async fn try_update_reservation(
        &self,
        update: UpdateReservation,
        customer: &Customer,
    ) -> Result<Reservation, EngineError> {
        let UpdateReservation { id, patch, connected_updates } = update;
        if connected_updates.len() >= MAX_BATCH_SIZE {
            return Err(EngineError::LimitExceeded("too many connected updates"));
        }
        if let Some(name) = &patch.name {
            validate_name(name)?;
        }
        if let Some(locations) = &patch.locations {
            validate_locations(locations)?;
        }
        for t in [patch.start, patch.end].into_iter().flatten() {
            validate_instant(t)?;
        }

        let mut ids = Vec::with_capacity(connected_updates.len() + 1);
        ids.push(id);
        for connected in connected_updates {
            if !ids.contains(&connected) {
                ids.push(connected);
            }
        }

        let _gate = self.write_gate.lock().await;
        let loaded = self.store.find_many_by_id(&ids).await?;
        if let Some(missing) = ids.iter().find(|wanted| !loaded.iter().any(|r| r.id == **wanted)) {
            return Err(EngineError::ReservationNotFound(*missing));
        }

        let now = self.now();
        if let Some(denied) = loaded.iter().find(|r| !can_modify(customer, r, now)) {
            info!("customer {} may not modify reservation {}", customer.id, denied.id);
            return Err(EngineError::ReservationNotAuthorized(denied.id));
        }

        // Deltas come from the reference only; every row moves by the same amount.
        let reference = loaded
            .iter()
            .find(|r| r.id == id)
            .ok_or(EngineError::ReservationNotFound(id))?;
        let start_delta = delta(patch.start, reference.span.start)?;
        let end_delta = delta(patch.end, reference.span.end)?;

        let mut to_save = Vec::with_capacity(loaded.len());
        for mut row in loaded {
            row.span = row
                .span
                .shifted(start_delta, end_delta)
                .ok_or(OUT_OF_RANGE)?;
            if let Some(name) = &patch.name {
                row.name = name.clone();
            }
            if let Some(is_active) = patch.is_active {
                row.is_active = is_active;
            }
            if let Some(locations) = patch.locations {
                row.locations = locations;
            }
            validate_span(&row.span)?;
            to_save.push(row);
        }

        if patch.touches_availability() {
            let proposals: Vec<TimeProposal> = to_save.iter().map(Reservation::as_proposal).collect();
            let availability = self.availability_batch(&proposals).await?;
            if let Some(taken) = availability.iter().find(|a| !a.is_available) {
                info!(
                    "rejected update of {id}: reservation {:?} conflicts after the change",
                    taken.proposal.excluded_reservation
                );
                return Err(EngineError::TimeNotAvailable);
            }
        }

        let saved = self.store.update_many(to_save).await?;
        metrics::counter!(RESERVATIONS_UPDATED_TOTAL).increment(saved.len() as u64);
        info!("updated reservation {id} and {} connected", saved.len().saturating_sub(1));
        saved
            .into_iter()
            .find(|r| r.id == id)
            .ok_or(EngineError::ReservationNotFound(id))
    }
}
