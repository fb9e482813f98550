use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Unix milliseconds. The only time type.
pub type Ms = i64;

pub const MINUTE_MS: Ms = 60_000;
pub const HOUR_MS: Ms = 60 * MINUTE_MS;
pub const DAY_MS: Ms = 24 * HOUR_MS;

pub fn now_ms() -> Ms {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as Ms)
        .unwrap_or(0)
}

/// Half-open interval `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub start: Ms,
    pub end: Ms,
}

impl Span {
    pub fn new(start: Ms, end: Ms) -> Self {
        debug_assert!(start < end, "Span start must be before end");
        Self { start, end }
    }

    pub fn duration_ms(&self) -> Ms {
        self.end - self.start
    }

    pub fn overlaps(&self, other: &Span) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// Move each boundary independently. `None` on overflow; the result is
    /// otherwise not validated.
    pub fn shifted(&self, start_delta: Ms, end_delta: Ms) -> Option<Span> {
        Some(Span {
            start: self.start.checked_add(start_delta)?,
            end: self.end.checked_add(end_delta)?,
        })
    }
}

/// A bookable court.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Location {
    Badminton,
    TableTennis,
}

impl Location {
    pub const ALL: [Location; 2] = [Location::Badminton, Location::TableTennis];
}

/// Set of courts a reservation occupies for its whole interval.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Locations {
    pub badminton: bool,
    pub table_tennis: bool,
}

impl Locations {
    pub const BADMINTON: Locations = Locations { badminton: true, table_tennis: false };
    pub const TABLE_TENNIS: Locations = Locations { badminton: false, table_tennis: true };
    pub const BOTH: Locations = Locations { badminton: true, table_tennis: true };

    pub fn is_empty(&self) -> bool {
        !self.badminton && !self.table_tennis
    }

    pub fn contains(&self, location: Location) -> bool {
        match location {
            Location::Badminton => self.badminton,
            Location::TableTennis => self.table_tennis,
        }
    }

    /// Any shared court counts, even if the other flag differs.
    pub fn intersects(&self, other: &Locations) -> bool {
        (self.badminton && other.badminton) || (self.table_tennis && other.table_tennis)
    }

    pub fn iter(&self) -> impl Iterator<Item = Location> + '_ {
        Location::ALL.into_iter().filter(move |l| self.contains(*l))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CustomerRole {
    Customer,
    Admin,
}

/// The authenticated caller. Issued and resolved outside this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Customer {
    pub id: Ulid,
    pub role: CustomerRole,
}

impl Customer {
    pub fn customer(id: Ulid) -> Self {
        Self { id, role: CustomerRole::Customer }
    }

    pub fn admin(id: Ulid) -> Self {
        Self { id, role: CustomerRole::Admin }
    }

    pub fn is_admin(&self) -> bool {
        self.role == CustomerRole::Admin
    }
}

/// A persisted booking of one or both courts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reservation {
    pub id: Ulid,
    /// Shared by every member of a series created in one call.
    pub recurring_id: Option<Ulid>,
    pub name: String,
    /// `false` marks a cancelled reservation. It no longer blocks anything.
    pub is_active: bool,
    pub customer_id: Ulid,
    pub span: Span,
    pub locations: Locations,
    /// Set by the store.
    pub created_at: Ms,
    /// Set by the store.
    pub updated_at: Ms,
}

impl Reservation {
    /// Half-open overlap on at least one shared court, against an active
    /// reservation the proposal does not exclude.
    pub fn conflicts_with(&self, proposal: &TimeProposal) -> bool {
        self.is_active
            && proposal.excluded_reservation != Some(self.id)
            && self.span.overlaps(&proposal.span)
            && self.locations.intersects(&proposal.locations)
    }

    /// Proposal describing this reservation's own slot, ignoring itself.
    pub fn as_proposal(&self) -> TimeProposal {
        TimeProposal {
            span: self.span,
            locations: self.locations,
            excluded_reservation: Some(self.id),
        }
    }
}

/// Candidate slot checked for availability. Never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeProposal {
    pub span: Span,
    pub locations: Locations,
    /// Lets a reservation be re-validated without conflicting with itself.
    pub excluded_reservation: Option<Ulid>,
}

impl TimeProposal {
    pub fn new(span: Span, locations: Locations) -> Self {
        Self { span, locations, excluded_reservation: None }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProposalAvailability {
    pub proposal: TimeProposal,
    pub is_available: bool,
}

/// Candidate start times split by availability, each in generation order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecurringAvailability {
    pub available_times: Vec<Ms>,
    pub unavailable_times: Vec<Ms>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Recurrence {
    #[default]
    Weekly,
    Monthly,
}

/// How far a recurrence is expanded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimePeriod {
    /// Through December 31 of the current year.
    CurrentYear,
    /// Six calendar months from now.
    #[default]
    HalfYear,
}

/// Reference slot plus recurrence rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecurringQuery {
    pub span: Span,
    pub locations: Locations,
    pub recurrence: Recurrence,
    pub time_period: TimePeriod,
    /// Appended verbatim after the generated dates.
    pub included_dates: Vec<Ms>,
    /// Removed on exact millisecond match.
    pub excluded_dates: Vec<Ms>,
}

impl RecurringQuery {
    pub fn new(span: Span, locations: Locations, recurrence: Recurrence, time_period: TimePeriod) -> Self {
        Self {
            span,
            locations,
            recurrence,
            time_period,
            included_dates: Vec::new(),
            excluded_dates: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewReservation {
    pub name: String,
    pub span: Span,
    pub locations: Locations,
}

impl NewReservation {
    pub fn proposal(&self) -> TimeProposal {
        TimeProposal::new(self.span, self.locations)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRecurringReservation {
    pub name: String,
    pub query: RecurringQuery,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CreatedSeries {
    pub recurring_id: Ulid,
    pub count: usize,
}

/// Fields to change. `None` leaves the field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReservationPatch {
    pub name: Option<String>,
    pub start: Option<Ms>,
    pub end: Option<Ms>,
    pub is_active: Option<bool>,
    pub locations: Option<Locations>,
}

impl ReservationPatch {
    /// Whether applying this patch can introduce a conflict.
    pub fn touches_availability(&self) -> bool {
        self.start.is_some() || self.end.is_some() || self.locations.is_some() || self.is_active.is_some()
    }
}

/// Update of one reference reservation, propagated to `connected_updates`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateReservation {
    pub id: Ulid,
    pub patch: ReservationPatch,
    pub connected_updates: Vec<Ulid>,
}

/// An indexed slot on one court.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interval {
    pub id: Ulid,
    pub span: Span,
}

/// Intervals booked on one court, sorted by `span.start`.
#[derive(Debug, Clone, Default)]
pub struct LocationIndex {
    pub intervals: Vec<Interval>,
}

impl LocationIndex {
    /// Insert interval maintaining sort order by span.start.
    pub fn insert(&mut self, interval: Interval) {
        let pos = self
            .intervals
            .binary_search_by_key(&interval.span.start, |i| i.span.start)
            .unwrap_or_else(|e| e);
        self.intervals.insert(pos, interval);
    }

    pub fn remove(&mut self, id: Ulid) -> Option<Interval> {
        let pos = self.intervals.iter().position(|i| i.id == id)?;
        Some(self.intervals.remove(pos))
    }

    /// Return only intervals whose span overlaps the query window.
    /// Uses binary search to skip intervals starting at or after `query.end`.
    pub fn overlapping(&self, query: &Span) -> impl Iterator<Item = &Interval> {
        let right_bound = self
            .intervals
            .partition_point(|i| i.span.start < query.end);
        self.intervals[..right_bound]
            .iter()
            .filter(move |i| i.span.end > query.start)
    }
}

/// One atomic write batch. This is the WAL record format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event {
    ReservationsCreated { reservations: Vec<Reservation> },
    ReservationsUpdated { reservations: Vec<Reservation> },
}

impl Event {
    pub fn reservations(&self) -> &[Reservation] {
        match self {
            Event::ReservationsCreated { reservations } | Event::ReservationsUpdated { reservations } => {
                reservations
            }
        }
    }
}
