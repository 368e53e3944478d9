use std::collections::{BTreeSet, HashMap};

use chrono::{Datelike, Duration, Local, NaiveDate, NaiveTime};
use rusqlite::Connection;
use serde::Serialize;

use crate::db::queries;
use crate::errors::AppError;
use crate::models::schedule::weekday_name;
use crate::models::timefmt;

/// Calendar display granularity. Conflict detection works on continuous
/// intervals; this grid exists only for rendering.
pub const SLOT_STEP_MINUTES: u32 = 20;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TimeSlotView {
    pub time: String,
    pub available: bool,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct BookedRange {
    pub start: String,
    pub end: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DaySchedule {
    pub date: NaiveDate,
    pub day_of_week: String,
    pub is_off: bool,
    pub slots: Vec<TimeSlotView>,
    pub booked: Vec<String>,
    pub booked_ranges: Vec<BookedRange>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub lunch_start: Option<String>,
    pub lunch_end: Option<String>,
}

/// Projects a barber's week (Monday through Sunday) into a per-day slot grid.
/// Read-only: derived entirely from the schedule and booking stores.
pub fn get_week_schedule(
    conn: &Connection,
    barber_id: &str,
    week_start: Option<NaiveDate>,
) -> Result<Vec<DaySchedule>, AppError> {
    queries::get_barber(conn, barber_id)?
        .ok_or_else(|| AppError::NotFound("barber not found".to_string()))?;

    let start = week_start.unwrap_or_else(|| monday_of(Local::now().date_naive()));
    let end = start + Duration::days(6);

    let entries: HashMap<String, _> = queries::week_entries(conn, barber_id)?
        .into_iter()
        .map(|e| (e.day.clone(), e))
        .collect();
    let bookings = queries::bookings_in_date_range(conn, barber_id, start, end)?;

    let mut week = Vec::with_capacity(7);
    for offset in 0..7 {
        let date = start + Duration::days(offset);
        let day_name = weekday_name(date.weekday());
        let entry = entries.get(day_name);

        let day_bookings: Vec<_> = bookings.iter().filter(|b| b.date == date).collect();

        let mut booked_labels: BTreeSet<NaiveTime> = BTreeSet::new();
        let mut booked_ranges = Vec::with_capacity(day_bookings.len());
        for booking in &day_bookings {
            booked_ranges.push(BookedRange {
                start: timefmt::fmt_hhmm(booking.start_time),
                end: timefmt::fmt_hhmm(booking.end_time),
            });
            booked_labels.extend(slot_labels(booking.start_time, booking.end_time, None));
        }

        let slots = match entry {
            Some(e) if e.is_working => slot_labels(e.start_time, e.end_time, e.lunch_window())
                .into_iter()
                .map(|time| TimeSlotView {
                    available: !booked_labels.contains(&time),
                    time: timefmt::fmt_hhmm(time),
                })
                .collect(),
            _ => vec![],
        };

        week.push(DaySchedule {
            date,
            day_of_week: day_name.to_string(),
            is_off: !entry.map(|e| e.is_working).unwrap_or(false),
            slots,
            booked: booked_labels.iter().copied().map(timefmt::fmt_hhmm).collect(),
            booked_ranges,
            start_time: entry.map(|e| timefmt::fmt_hhmm(e.start_time)),
            end_time: entry.map(|e| timefmt::fmt_hhmm(e.end_time)),
            lunch_start: entry.and_then(|e| e.lunch_start).map(timefmt::fmt_hhmm),
            lunch_end: entry.and_then(|e| e.lunch_end).map(timefmt::fmt_hhmm),
        });
    }

    Ok(week)
}

pub fn monday_of(date: NaiveDate) -> NaiveDate {
    date - Duration::days(i64::from(date.weekday().num_days_from_monday()))
}

/// 20-minute labels from `start` to `end` inclusive; the exact end boundary is
/// always present even when unaligned, so an expanded booking covers its full
/// duration. Labels inside the lunch window are skipped.
fn slot_labels(
    start: NaiveTime,
    end: NaiveTime,
    lunch: Option<(NaiveTime, NaiveTime)>,
) -> Vec<NaiveTime> {
    let mut labels = vec![];
    let mut current = start;
    loop {
        if current > end {
            break;
        }
        let in_lunch = lunch
            .map(|(lunch_start, lunch_end)| current >= lunch_start && current < lunch_end)
            .unwrap_or(false);
        if !in_lunch {
            labels.push(current);
        }
        let (next, wrapped) =
            current.overflowing_add_signed(Duration::minutes(i64::from(SLOT_STEP_MINUTES)));
        if wrapped != 0 {
            break;
        }
        current = next;
    }

    if !labels.contains(&end) {
        labels.push(end);
        labels.sort();
    }
    labels
}
