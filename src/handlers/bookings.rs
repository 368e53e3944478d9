use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{NaiveDate, NaiveTime};
use serde::Deserialize;

use crate::errors::AppError;
use crate::models::{timefmt, BookingStatus};
use crate::services::booking::{self, BookingDetails, BookingPage, NewBooking};
use crate::services::notify::{notify, BookingEvent, BookingEventKind};
use crate::state::AppState;

// POST /api/bookings
#[derive(Deserialize)]
pub struct CreateBookingRequest {
    pub client_id: String,
    pub barber_id: String,
    pub service_id: String,
    pub date: String,
    pub start_time: String,
    pub notes: Option<String>,
}

pub async fn create_booking(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateBookingRequest>,
) -> Result<(StatusCode, Json<BookingDetails>), AppError> {
    let date = parse_date(&req.date)?;
    let start_time = parse_time(&req.start_time)?;
    let new_booking = NewBooking {
        barber_id: req.barber_id,
        service_id: req.service_id,
        date,
        start_time,
        notes: req.notes,
    };

    let details = {
        let mut db = state.db.lock().unwrap();
        booking::create_booking(&mut db, &req.client_id, new_booking)?
    };

    notify(
        state.notifier.as_ref(),
        BookingEvent::new(BookingEventKind::Created, &details),
    )
    .await;

    Ok((StatusCode::CREATED, Json(details)))
}

// PATCH /api/bookings/:id/status
#[derive(Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
}

pub async fn update_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<UpdateStatusRequest>,
) -> Result<Json<BookingDetails>, AppError> {
    let status = parse_status(&req.status)?;

    let details = {
        let mut db = state.db.lock().unwrap();
        booking::update_booking_status(&mut db, &id, status)?
    };

    notify(
        state.notifier.as_ref(),
        BookingEvent::new(BookingEventKind::StatusChanged, &details),
    )
    .await;

    Ok(Json(details))
}

// POST /api/bookings/:id/cancel
pub async fn cancel_booking(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<BookingDetails>, AppError> {
    let details = {
        let mut db = state.db.lock().unwrap();
        booking::cancel_booking(&mut db, &id)?
    };

    notify(
        state.notifier.as_ref(),
        BookingEvent::new(BookingEventKind::StatusChanged, &details),
    )
    .await;

    Ok(Json(details))
}

// POST /api/bookings/:id/reschedule
#[derive(Deserialize)]
pub struct RescheduleRequest {
    pub new_date: String,
    pub new_start_time: String,
    pub reason: Option<String>,
}

pub async fn reschedule_booking(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<RescheduleRequest>,
) -> Result<Json<BookingDetails>, AppError> {
    let new_date = parse_date(&req.new_date)?;
    let new_start = parse_time(&req.new_start_time)?;

    let details = {
        let mut db = state.db.lock().unwrap();
        booking::reschedule_booking(&mut db, &id, new_date, new_start, req.reason.as_deref())?
    };

    notify(
        state.notifier.as_ref(),
        BookingEvent::new(BookingEventKind::Rescheduled, &details),
    )
    .await;

    Ok(Json(details))
}

// POST /api/bookings/bulk-status
#[derive(Deserialize)]
pub struct BulkStatusRequest {
    pub booking_ids: Vec<String>,
    pub status: String,
    pub reason: Option<String>,
}

pub async fn bulk_update_status(
    State(state): State<Arc<AppState>>,
    Json(req): Json<BulkStatusRequest>,
) -> Result<Json<Vec<BookingDetails>>, AppError> {
    let status = parse_status(&req.status)?;

    let updated = {
        let mut db = state.db.lock().unwrap();
        booking::bulk_update_booking_status(
            &mut db,
            &req.booking_ids,
            status,
            req.reason.as_deref(),
        )?
    };

    for details in &updated {
        notify(
            state.notifier.as_ref(),
            BookingEvent::new(BookingEventKind::StatusChanged, details),
        )
        .await;
    }

    Ok(Json(updated))
}

// GET /api/bookings
#[derive(Deserialize)]
pub struct ListBookingsQuery {
    pub client_id: Option<String>,
    pub barber_id: Option<String>,
    pub status: Option<String>,
    pub date: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

pub async fn list_bookings(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListBookingsQuery>,
) -> Result<Json<BookingPage>, AppError> {
    let status = query.status.as_deref().map(parse_status).transpose()?;
    let date = query.date.as_deref().map(parse_date).transpose()?;
    let page = query.page.unwrap_or(1);
    let limit = query.limit.unwrap_or(10);

    let db = state.db.lock().unwrap();
    let result = match (&query.client_id, &query.barber_id) {
        (Some(client_id), None) => {
            booking::list_client_bookings(&db, client_id, status, date, page, limit)?
        }
        (None, Some(barber_id)) => {
            booking::list_barber_bookings(&db, barber_id, status, date, page, limit)?
        }
        _ => {
            return Err(AppError::Validation(
                "provide exactly one of client_id or barber_id".to_string(),
            ))
        }
    };

    Ok(Json(result))
}

fn parse_date(s: &str) -> Result<NaiveDate, AppError> {
    timefmt::parse_date(s)
        .ok_or_else(|| AppError::Validation(format!("invalid date (expected YYYY-MM-DD): {s}")))
}

fn parse_time(s: &str) -> Result<NaiveTime, AppError> {
    timefmt::parse_hhmm(s)
        .ok_or_else(|| AppError::Validation(format!("invalid time (expected HH:MM): {s}")))
}

fn parse_status(s: &str) -> Result<BookingStatus, AppError> {
    BookingStatus::parse(s)
        .ok_or_else(|| AppError::Validation(format!("unknown booking status: {s}")))
}
