use crate::model::Ms;

/// Rows written by one atomic batch (a series insert or a linked update).
pub const MAX_BATCH_SIZE: usize = 1_000;

/// Proposals evaluated by one availability call.
pub const MAX_PROPOSALS: usize = 1_000;

/// Dates a recurrence may generate before the horizon stops it.
pub const MAX_RECURRENCE_DATES: usize = 400;

/// Extra dates appended to a recurrence by the caller.
pub const MAX_INCLUDED_DATES: usize = 100;

pub const MAX_NAME_LEN: usize = 40;

/// 1970-01-01T00:00:00Z
pub const MIN_VALID_TIMESTAMP_MS: Ms = 0;

/// 9999-12-31T23:59:59.999Z
pub const MAX_VALID_TIMESTAMP_MS: Ms = 253_402_300_799_999;
