use std::time::Instant;

use tracing::debug;

use crate::limits::*;
use crate::model::*;
use crate::observability::{record_operation, AVAILABILITY_BATCH_SIZE};
use crate::recurrence::candidate_proposals;
use crate::store::ReservationStore;

use super::conflict::{validate_instant, validate_proposal};
use super::{Engine, EngineError};

impl<S: ReservationStore> Engine<S> {
    /// Availability of each proposal against persisted reservations.
    ///
    /// Proposals are evaluated together in one consistent read but never
    /// against each other. Nothing is locked: a concurrent write may land
    /// right after this returns. Results follow input order.
    pub async fn check_availability(
        &self,
        proposals: &[TimeProposal],
    ) -> Result<Vec<ProposalAvailability>, EngineError> {
        let started = Instant::now();
        let result = self.availability_batch(proposals).await;
        record_operation("check_availability", started, &result);
        result
    }

    /// Expand `query` into candidate dates and split them by availability,
    /// all against one snapshot of the store.
    pub async fn check_recurring_availability(
        &self,
        query: &RecurringQuery,
    ) -> Result<RecurringAvailability, EngineError> {
        let started = Instant::now();
        let result = self.recurring_availability(query).await;
        record_operation("check_recurring_availability", started, &result);
        result
    }

    pub(super) async fn availability_batch(
        &self,
        proposals: &[TimeProposal],
    ) -> Result<Vec<ProposalAvailability>, EngineError> {
        if proposals.len() > MAX_PROPOSALS {
            return Err(EngineError::LimitExceeded("too many proposals"));
        }
        for proposal in proposals {
            validate_proposal(proposal)?;
        }
        if proposals.is_empty() {
            return Ok(Vec::new());
        }

        metrics::histogram!(AVAILABILITY_BATCH_SIZE).record(proposals.len() as f64);
        let counts = self.store.count_active_overlapping(proposals).await?;
        if counts.len() != proposals.len() {
            return Err(EngineError::StoreError(format!(
                "count batch returned {} results for {} proposals",
                counts.len(),
                proposals.len()
            )));
        }

        Ok(proposals
            .iter()
            .zip(counts)
            .map(|(proposal, count)| ProposalAvailability {
                proposal: *proposal,
                is_available: count == 0,
            })
            .collect())
    }

    pub(super) async fn recurring_availability(
        &self,
        query: &RecurringQuery,
    ) -> Result<RecurringAvailability, EngineError> {
        validate_proposal(&TimeProposal::new(query.span, query.locations))?;
        if query.included_dates.len() > MAX_INCLUDED_DATES {
            return Err(EngineError::LimitExceeded("too many included dates"));
        }
        for &date in &query.included_dates {
            validate_instant(date)?;
        }

        let proposals = candidate_proposals(query, self.now());
        debug!(
            "recurrence {:?}/{:?} expanded to {} candidates",
            query.recurrence,
            query.time_period,
            proposals.len()
        );
        let results = self.availability_batch(&proposals).await?;

        let mut split = RecurringAvailability::default();
        for result in results {
            if result.is_available {
                split.available_times.push(result.proposal.span.start);
            } else {
                split.unavailable_times.push(result.proposal.span.start);
            }
        }
        Ok(split)
    }
}
