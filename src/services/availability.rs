use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime};
use rusqlite::Connection;

use crate::db::queries;
use crate::models::schedule::weekday_name;
use crate::models::timefmt;

/// Why a requested slot cannot be booked. Each variant renders a distinct
/// human-readable reason; the lifecycle manager forwards it verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlotRejection {
    DateInPast,
    TimeInPast,
    DayOff,
    OutsideWorkingHours { start: NaiveTime, end: NaiveTime },
    LunchBreak { start: NaiveTime, end: NaiveTime },
    SlotTaken,
}

impl std::fmt::Display for SlotRejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SlotRejection::DateInPast => {
                write!(f, "cannot book a past date; please pick today or later")
            }
            SlotRejection::TimeInPast => {
                write!(f, "that time has already passed; please pick a future time")
            }
            SlotRejection::DayOff => {
                write!(f, "the barber does not work on this day")
            }
            SlotRejection::OutsideWorkingHours { start, end } => {
                write!(
                    f,
                    "the time must fall within working hours {} - {}",
                    timefmt::fmt_hhmm(*start),
                    timefmt::fmt_hhmm(*end)
                )
            }
            SlotRejection::LunchBreak { start, end } => {
                write!(
                    f,
                    "that time falls within the lunch break ({} - {})",
                    timefmt::fmt_hhmm(*start),
                    timefmt::fmt_hhmm(*end)
                )
            }
            SlotRejection::SlotTaken => {
                write!(f, "that time slot is already booked; please pick another time")
            }
        }
    }
}

/// Decides whether [start, end) on `date` is bookable for a barber.
///
/// Checks run in order and stop at the first failure: past date, past time
/// (same-day only), working day, working-hours bounds, lunch window, conflicts
/// with active bookings. `Ok(None)` means the slot is free. Intervals are
/// half-open, so a booking may start exactly where another ends.
///
/// `now` is supplied by the caller so decisions are reproducible; the
/// lifecycle manager passes the current local time.
pub fn check_availability(
    conn: &Connection,
    barber_id: &str,
    date: NaiveDate,
    start: NaiveTime,
    end: NaiveTime,
    exclude_booking_id: Option<&str>,
    now: NaiveDateTime,
) -> anyhow::Result<Option<SlotRejection>> {
    if date < now.date() {
        return Ok(Some(SlotRejection::DateInPast));
    }
    if date == now.date() && date.and_time(start) <= now {
        return Ok(Some(SlotRejection::TimeInPast));
    }

    let schedule = match queries::schedule_for_day(conn, barber_id, weekday_name(date.weekday()))? {
        Some(entry) if entry.is_working => entry,
        _ => return Ok(Some(SlotRejection::DayOff)),
    };

    if start < schedule.start_time || end > schedule.end_time {
        return Ok(Some(SlotRejection::OutsideWorkingHours {
            start: schedule.start_time,
            end: schedule.end_time,
        }));
    }

    if let Some((lunch_start, lunch_end)) = schedule.lunch_window() {
        if start < lunch_end && end > lunch_start {
            return Ok(Some(SlotRejection::LunchBreak {
                start: lunch_start,
                end: lunch_end,
            }));
        }
    }

    let existing = queries::active_bookings_for_day(conn, barber_id, date, exclude_booking_id)?;
    for booking in &existing {
        if booking.start_time < end && start < booking.end_time {
            return Ok(Some(SlotRejection::SlotTaken));
        }
    }

    Ok(None)
}
