use ulid::Ulid;

use crate::store::StoreError;

#[derive(Debug)]
pub enum EngineError {
    /// A proposed or re-validated slot conflicts with an active reservation.
    TimeNotAvailable,
    ReservationNotFound(Ulid),
    ReservationNotAuthorized(Ulid),
    /// Input broke an invariant the caller was expected to enforce.
    InvalidProposal(&'static str),
    LimitExceeded(&'static str),
    StoreError(String),
}

impl EngineError {
    /// Stable code surfaced to API clients.
    pub fn code(&self) -> &'static str {
        match self {
            EngineError::TimeNotAvailable => "TIME_NOT_AVAILABLE",
            EngineError::ReservationNotFound(_) => "RESERVATION_NOT_FOUND",
            EngineError::ReservationNotAuthorized(_) => "RESERVATION_NOT_AUTHORIZED",
            EngineError::InvalidProposal(_) => "INVALID_PROPOSAL",
            EngineError::LimitExceeded(_) => "LIMIT_EXCEEDED",
            EngineError::StoreError(_) => "STORE_ERROR",
        }
    }
}

impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineError::TimeNotAvailable => write!(f, "the selected time is not available"),
            EngineError::ReservationNotFound(id) => write!(f, "reservation not found: {id}"),
            EngineError::ReservationNotAuthorized(id) => {
                write!(f, "not authorized to access reservation: {id}")
            }
            EngineError::InvalidProposal(msg) => write!(f, "invalid proposal: {msg}"),
            EngineError::LimitExceeded(msg) => write!(f, "limit exceeded: {msg}"),
            EngineError::StoreError(e) => write!(f, "store error: {e}"),
        }
    }
}

impl std::error::Error for EngineError {}

impl From<StoreError> for EngineError {
    fn from(e: StoreError) -> Self {
        EngineError::StoreError(e.to_string())
    }
}
