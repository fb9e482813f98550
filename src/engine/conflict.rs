//! Boundary checks run before any store access.
//!
//! Upstream validation already enforces these; a failure here means the
//! caller skipped it, and we refuse rather than persist a malformed row.

use crate::limits::*;
use crate::model::*;

use super::EngineError;

pub(crate) fn validate_instant(t: Ms) -> Result<(), EngineError> {
    if !(MIN_VALID_TIMESTAMP_MS..=MAX_VALID_TIMESTAMP_MS).contains(&t) {
        return Err(EngineError::InvalidProposal("timestamp out of range"));
    }
    Ok(())
}

pub(crate) fn validate_span(span: &Span) -> Result<(), EngineError> {
    validate_instant(span.start)?;
    validate_instant(span.end)?;
    if span.start >= span.end {
        return Err(EngineError::InvalidProposal("start must be before end"));
    }
    Ok(())
}

pub(crate) fn validate_locations(locations: &Locations) -> Result<(), EngineError> {
    if locations.is_empty() {
        return Err(EngineError::InvalidProposal("no location selected"));
    }
    Ok(())
}

pub(crate) fn validate_proposal(proposal: &TimeProposal) -> Result<(), EngineError> {
    validate_span(&proposal.span)?;
    validate_locations(&proposal.locations)
}

pub(crate) fn validate_name(name: &str) -> Result<(), EngineError> {
    if name.trim().is_empty() {
        return Err(EngineError::InvalidProposal("name is empty"));
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(EngineError::LimitExceeded("name too long"));
    }
    Ok(())
}

/// First pair of proposals in one batch that would double-book a court.
pub(crate) fn find_batch_overlap(proposals: &[TimeProposal]) -> Option<(usize, usize)> {
    for i in 0..proposals.len() {
        for j in (i + 1)..proposals.len() {
            let (a, b) = (&proposals[i], &proposals[j]);
            if a.span.overlaps(&b.span) && a.locations.intersects(&b.locations) {
                return Some((i, j));
            }
        }
    }
    None
}
