use std::collections::HashSet;

use chrono::NaiveTime;
use rusqlite::Connection;
use serde::Deserialize;

use crate::db::queries;
use crate::errors::AppError;
use crate::models::schedule::parse_day;
use crate::models::{timefmt, ScheduleEntry};

/// One day of a schedule update payload. Times arrive as "HH:MM" strings and
/// are validated here before anything touches the store.
#[derive(Debug, Clone, Deserialize)]
pub struct ScheduleDayInput {
    pub day: String,
    pub start_time: String,
    pub end_time: String,
    pub lunch_start: Option<String>,
    pub lunch_end: Option<String>,
    pub is_working: bool,
}

/// Replaces a barber's weekly schedule wholesale: existing rows are deleted
/// and the new set inserted in one transaction. Entries are never merged
/// field-by-field.
pub fn replace_schedule(
    conn: &mut Connection,
    barber_id: &str,
    days: &[ScheduleDayInput],
) -> Result<Vec<ScheduleEntry>, AppError> {
    let tx = conn.transaction()?;

    queries::get_barber(&tx, barber_id)?
        .ok_or_else(|| AppError::NotFound("barber not found".to_string()))?;

    let mut seen = HashSet::new();
    let mut entries = Vec::with_capacity(days.len());
    for day in days {
        let entry = validate_day(barber_id, day)?;
        if !seen.insert(entry.day.clone()) {
            return Err(AppError::Validation(format!(
                "duplicate schedule entry for {}",
                entry.day
            )));
        }
        entries.push(entry);
    }

    queries::delete_schedule(&tx, barber_id)?;
    for entry in &entries {
        queries::insert_schedule_entry(&tx, entry)?;
    }
    tx.commit()?;

    tracing::info!(barber_id, days = entries.len(), "weekly schedule replaced");
    Ok(entries)
}

fn validate_day(barber_id: &str, input: &ScheduleDayInput) -> Result<ScheduleEntry, AppError> {
    if parse_day(&input.day).is_none() {
        return Err(AppError::Validation(format!(
            "unknown day name: {}",
            input.day
        )));
    }

    let start_time = parse_time(&input.start_time)?;
    let end_time = parse_time(&input.end_time)?;
    if start_time >= end_time {
        return Err(AppError::Validation(format!(
            "start time must come before end time on {}",
            input.day
        )));
    }

    let (lunch_start, lunch_end) = match (&input.lunch_start, &input.lunch_end) {
        (None, None) => (None, None),
        (Some(start), Some(end)) => {
            let lunch_start = parse_time(start)?;
            let lunch_end = parse_time(end)?;
            if lunch_start >= lunch_end {
                return Err(AppError::Validation(format!(
                    "lunch start must come before lunch end on {}",
                    input.day
                )));
            }
            if lunch_start < start_time || lunch_end > end_time {
                return Err(AppError::Validation(format!(
                    "lunch window must lie within working hours on {}",
                    input.day
                )));
            }
            (Some(lunch_start), Some(lunch_end))
        }
        _ => {
            return Err(AppError::Validation(format!(
                "lunch window needs both a start and an end on {}",
                input.day
            )));
        }
    };

    Ok(ScheduleEntry {
        barber_id: barber_id.to_string(),
        day: input.day.clone(),
        start_time,
        end_time,
        lunch_start,
        lunch_end,
        is_working: input.is_working,
    })
}

fn parse_time(s: &str) -> Result<NaiveTime, AppError> {
    timefmt::parse_hhmm(s)
        .ok_or_else(|| AppError::Validation(format!("invalid HH:MM time: {s}")))
}
