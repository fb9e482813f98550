//! Expansion of a recurrence rule into candidate start times.
//!
//! Everything here is calendar arithmetic in UTC. Dates are produced eagerly;
//! the horizon bounds the output to roughly a year of weekly slots.

use chrono::{DateTime, Datelike, Months, NaiveDate, TimeZone, Utc};

use crate::limits::MAX_RECURRENCE_DATES;
use crate::model::*;

/// Last instant covered by `period`, measured from `now`.
pub fn horizon_end(period: TimePeriod, now: Ms) -> Option<Ms> {
    let now = DateTime::<Utc>::from_timestamp_millis(now)?;
    let end = match period {
        TimePeriod::CurrentYear => {
            let last_day = NaiveDate::from_ymd_opt(now.year(), 12, 31)?;
            Utc.from_utc_datetime(&last_day.and_hms_milli_opt(23, 59, 59, 999)?)
        }
        TimePeriod::HalfYear => now.checked_add_months(Months::new(6))?,
    };
    Some(end.timestamp_millis())
}

/// Start times from `start` up to the horizon, inclusive, in ascending order.
///
/// Weekly steps are exactly seven days. Monthly steps keep the reference
/// day-of-month, clamped to the last day of shorter months; each date is
/// computed from the reference so a clamp never drifts later months.
pub fn recurring_dates(start: Ms, recurrence: Recurrence, period: TimePeriod, now: Ms) -> Vec<Ms> {
    let Some(horizon) = horizon_end(period, now) else {
        return Vec::new();
    };
    let mut dates = Vec::new();
    match recurrence {
        Recurrence::Weekly => {
            let mut t = start;
            while t <= horizon && dates.len() < MAX_RECURRENCE_DATES {
                dates.push(t);
                t += 7 * DAY_MS;
            }
        }
        Recurrence::Monthly => {
            let Some(reference) = DateTime::<Utc>::from_timestamp_millis(start) else {
                return dates;
            };
            for step in 0..MAX_RECURRENCE_DATES as u32 {
                let Some(next) = reference.checked_add_months(Months::new(step)) else {
                    break;
                };
                let t = next.timestamp_millis();
                if t > horizon {
                    break;
                }
                dates.push(t);
            }
        }
    }
    dates
}

/// Generated dates, then `included_dates` appended verbatim, then every
/// exact match of an `excluded_dates` entry removed.
pub fn candidate_starts(query: &RecurringQuery, now: Ms) -> Vec<Ms> {
    let mut dates = recurring_dates(query.span.start, query.recurrence, query.time_period, now);
    dates.extend_from_slice(&query.included_dates);
    dates.retain(|d| !query.excluded_dates.contains(d));
    dates
}

/// One proposal per candidate, each with the reference duration and courts.
/// An end past `Ms::MAX` saturates, leaving it for span validation to reject.
pub fn candidate_proposals(query: &RecurringQuery, now: Ms) -> Vec<TimeProposal> {
    let duration = query.span.duration_ms();
    candidate_starts(query, now)
        .into_iter()
        .map(|start| TimeProposal::new(Span { start, end: start.saturating_add(duration) }, query.locations))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> Ms {
        Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap().timestamp_millis()
    }

    fn query(recurrence: Recurrence, period: TimePeriod) -> RecurringQuery {
        RecurringQuery::new(
            Span::new(at(2021, 5, 4, 12, 0), at(2021, 5, 4, 14, 0)),
            Locations::TABLE_TENNIS,
            recurrence,
            period,
        )
    }

    fn now() -> Ms {
        at(2021, 5, 3, 10, 0)
    }

    #[test]
    fn current_year_horizon_is_last_millisecond_of_december() {
        let end = horizon_end(TimePeriod::CurrentYear, now()).unwrap();
        assert_eq!(end, at(2022, 1, 1, 0, 0) - 1);
    }

    #[test]
    fn half_year_horizon_is_six_months_from_now() {
        let end = horizon_end(TimePeriod::HalfYear, now()).unwrap();
        assert_eq!(end, at(2021, 11, 3, 10, 0));
    }

    #[test]
    fn weekly_current_year() {
        let dates = recurring_dates(at(2021, 5, 4, 12, 0), Recurrence::Weekly, TimePeriod::CurrentYear, now());
        assert_eq!(dates.len(), 35);
        assert_eq!(dates[0], at(2021, 5, 4, 12, 0));
        assert_eq!(*dates.last().unwrap(), at(2021, 12, 28, 12, 0));
        for pair in dates.windows(2) {
            assert_eq!(pair[1] - pair[0], 7 * DAY_MS);
        }
    }

    #[test]
    fn weekly_half_year() {
        let dates = recurring_dates(at(2021, 5, 4, 12, 0), Recurrence::Weekly, TimePeriod::HalfYear, now());
        assert_eq!(dates.len(), 27);
        assert_eq!(*dates.last().unwrap(), at(2021, 11, 2, 12, 0));
    }

    #[test]
    fn monthly_current_year() {
        let dates = recurring_dates(at(2021, 5, 4, 12, 0), Recurrence::Monthly, TimePeriod::CurrentYear, now());
        assert_eq!(dates.len(), 8);
        assert_eq!(dates[1], at(2021, 6, 4, 12, 0));
        assert_eq!(dates[7], at(2021, 12, 4, 12, 0));
    }

    #[test]
    fn monthly_half_year_drops_dates_past_horizon() {
        // Nov 4 12:00 lies after the Nov 3 10:00 horizon.
        let dates = recurring_dates(at(2021, 5, 4, 12, 0), Recurrence::Monthly, TimePeriod::HalfYear, now());
        assert_eq!(dates.len(), 6);
        assert_eq!(*dates.last().unwrap(), at(2021, 10, 4, 12, 0));
    }

    #[test]
    fn monthly_clamps_short_months_without_drift() {
        let dates = recurring_dates(
            at(2021, 1, 31, 18, 30),
            Recurrence::Monthly,
            TimePeriod::CurrentYear,
            at(2021, 1, 10, 8, 0),
        );
        assert_eq!(dates[1], at(2021, 2, 28, 18, 30));
        assert_eq!(dates[2], at(2021, 3, 31, 18, 30));
        assert_eq!(dates[3], at(2021, 4, 30, 18, 30));
        assert_eq!(dates.len(), 12);
    }

    #[test]
    fn start_after_horizon_yields_nothing() {
        let dates = recurring_dates(at(2022, 3, 1, 9, 0), Recurrence::Weekly, TimePeriod::CurrentYear, now());
        assert!(dates.is_empty());
    }

    #[test]
    fn included_dates_are_appended_in_order() {
        let mut q = query(Recurrence::Monthly, TimePeriod::HalfYear);
        let extra = at(2021, 5, 20, 9, 15);
        q.included_dates = vec![extra];
        let dates = candidate_starts(&q, now());
        assert_eq!(dates.len(), 7);
        assert_eq!(*dates.last().unwrap(), extra);
    }

    #[test]
    fn excluded_dates_need_exact_millisecond_match() {
        let mut q = query(Recurrence::Weekly, TimePeriod::CurrentYear);
        q.excluded_dates = vec![
            at(2021, 5, 11, 12, 0),
            // Same day, different time: not removed.
            at(2021, 5, 18, 0, 0),
        ];
        let dates = candidate_starts(&q, now());
        assert_eq!(dates.len(), 34);
        assert!(!dates.contains(&at(2021, 5, 11, 12, 0)));
        assert!(dates.contains(&at(2021, 5, 18, 12, 0)));
    }

    #[test]
    fn excluded_dates_also_filter_included_dates() {
        let mut q = query(Recurrence::Monthly, TimePeriod::HalfYear);
        let extra = at(2021, 5, 20, 9, 15);
        q.included_dates = vec![extra];
        q.excluded_dates = vec![extra];
        assert_eq!(candidate_starts(&q, now()).len(), 6);
    }

    #[test]
    fn extreme_included_date_saturates_instead_of_wrapping() {
        let mut q = query(Recurrence::Weekly, TimePeriod::HalfYear);
        q.included_dates = vec![Ms::MAX - 10];
        let last = *candidate_proposals(&q, now()).last().unwrap();
        assert_eq!(last.span.start, Ms::MAX - 10);
        assert_eq!(last.span.end, Ms::MAX);
    }

    #[test]
    fn proposals_keep_reference_duration_and_courts() {
        let q = query(Recurrence::Weekly, TimePeriod::HalfYear);
        let proposals = candidate_proposals(&q, now());
        assert_eq!(proposals.len(), 27);
        for p in &proposals {
            assert_eq!(p.span.duration_ms(), 2 * HOUR_MS);
            assert_eq!(p.locations, Locations::TABLE_TENNIS);
            assert!(p.excluded_reservation.is_none());
        }
    }
}
