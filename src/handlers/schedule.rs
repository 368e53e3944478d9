use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;

use crate::errors::AppError;
use crate::models::{timefmt, ScheduleEntry};
use crate::services::schedule::{self, ScheduleDayInput};
use crate::services::week_schedule::{self, DaySchedule};
use crate::state::AppState;

// GET /api/barbers/:id/schedule
#[derive(Deserialize)]
pub struct WeekQuery {
    pub week_start: Option<String>,
}

pub async fn get_week_schedule(
    State(state): State<Arc<AppState>>,
    Path(barber_id): Path<String>,
    Query(query): Query<WeekQuery>,
) -> Result<Json<Vec<DaySchedule>>, AppError> {
    let week_start = query
        .week_start
        .as_deref()
        .map(|s| {
            timefmt::parse_date(s).ok_or_else(|| {
                AppError::Validation(format!("invalid week_start (expected YYYY-MM-DD): {s}"))
            })
        })
        .transpose()?;

    let db = state.db.lock().unwrap();
    let week = week_schedule::get_week_schedule(&db, &barber_id, week_start)?;
    Ok(Json(week))
}

// PUT /api/barbers/:id/schedule
pub async fn replace_schedule(
    State(state): State<Arc<AppState>>,
    Path(barber_id): Path<String>,
    Json(days): Json<Vec<ScheduleDayInput>>,
) -> Result<Json<Vec<ScheduleEntry>>, AppError> {
    let mut db = state.db.lock().unwrap();
    let entries = schedule::replace_schedule(&mut db, &barber_id, &days)?;
    Ok(Json(entries))
}
