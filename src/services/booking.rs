use chrono::{Local, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::queries;
use crate::errors::AppError;
use crate::models::{Booking, BookingStatus};
use crate::services::availability;

#[derive(Debug, Clone, Deserialize)]
pub struct NewBooking {
    pub barber_id: String,
    pub service_id: String,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub notes: Option<String>,
}

/// A booking enriched with barber/service display data for callers. The
/// client profile lives with the auth collaborator, so only its id appears.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct BookingDetails {
    pub booking: Booking,
    pub barber_name: String,
    pub service_name: String,
    pub service_duration_minutes: i64,
    pub service_price_cents: i64,
}

/// Creates a booking for a client. The availability check and the insert run
/// inside one transaction on the locked connection, so two racing requests
/// for overlapping slots cannot both commit.
pub fn create_booking(
    conn: &mut Connection,
    client_id: &str,
    req: NewBooking,
) -> Result<BookingDetails, AppError> {
    let tx = conn.transaction()?;

    let barber = queries::get_barber(&tx, &req.barber_id)?
        .ok_or_else(|| AppError::NotFound("barber not found".to_string()))?;
    let service = queries::get_service(&tx, &req.service_id)?
        .ok_or_else(|| AppError::NotFound("service not found".to_string()))?;

    let end_time = end_time_for(req.start_time, service.duration_minutes)?;
    let now = now_local();

    if let Some(rejection) = availability::check_availability(
        &tx,
        &req.barber_id,
        req.date,
        req.start_time,
        end_time,
        None,
        now,
    )? {
        return Err(AppError::Validation(rejection.to_string()));
    }

    let booking = Booking {
        id: Uuid::new_v4().to_string(),
        barber_id: req.barber_id,
        user_id: client_id.to_string(),
        service_id: req.service_id,
        date: req.date,
        start_time: req.start_time,
        end_time,
        status: BookingStatus::Pending,
        notes: req.notes,
        created_at: now,
        updated_at: now,
    };
    queries::insert_booking(&tx, &booking)?;
    tx.commit()?;

    tracing::info!(booking_id = %booking.id, barber_id = %booking.barber_id, "booking created");

    Ok(BookingDetails {
        booking,
        barber_name: barber.display_name,
        service_name: service.name,
        service_duration_minutes: service.duration_minutes,
        service_price_cents: service.price_cents,
    })
}

/// Unconditional status overwrite; any status may replace any other.
pub fn update_booking_status(
    conn: &mut Connection,
    booking_id: &str,
    status: BookingStatus,
) -> Result<BookingDetails, AppError> {
    let tx = conn.transaction()?;

    let booking = queries::get_booking(&tx, booking_id)?
        .ok_or_else(|| AppError::NotFound("booking not found".to_string()))?;

    let now = now_local();
    queries::update_booking_status(&tx, booking_id, status, now)?;

    let details = load_details(
        &tx,
        Booking {
            status,
            updated_at: now,
            ..booking
        },
    )?;
    tx.commit()?;

    tracing::info!(booking_id, status = status.as_str(), "booking status updated");
    Ok(details)
}

pub fn cancel_booking(conn: &mut Connection, booking_id: &str) -> Result<BookingDetails, AppError> {
    update_booking_status(conn, booking_id, BookingStatus::Cancelled)
}

/// Moves a booking to a new date/start. The end time is recomputed from the
/// service duration, and the booking's own interval is excluded from conflict
/// detection so moving within it succeeds.
pub fn reschedule_booking(
    conn: &mut Connection,
    booking_id: &str,
    new_date: NaiveDate,
    new_start: NaiveTime,
    reason: Option<&str>,
) -> Result<BookingDetails, AppError> {
    let tx = conn.transaction()?;

    let booking = queries::get_booking(&tx, booking_id)?
        .ok_or_else(|| AppError::NotFound("booking not found".to_string()))?;

    if booking.status.is_terminal() {
        return Err(AppError::Validation(
            "cannot reschedule a finished or cancelled booking".to_string(),
        ));
    }

    let service = queries::get_service(&tx, &booking.service_id)?
        .ok_or_else(|| AppError::NotFound("service not found".to_string()))?;
    let new_end = end_time_for(new_start, service.duration_minutes)?;
    let now = now_local();

    if let Some(rejection) = availability::check_availability(
        &tx,
        &booking.barber_id,
        new_date,
        new_start,
        new_end,
        Some(booking_id),
        now,
    )? {
        return Err(AppError::Validation(rejection.to_string()));
    }

    let notes = append_audit(booking.notes.as_deref(), "Rescheduled", reason);
    queries::update_booking_times(&tx, booking_id, new_date, new_start, new_end, notes.as_deref(), now)?;

    let details = load_details(
        &tx,
        Booking {
            date: new_date,
            start_time: new_start,
            end_time: new_end,
            notes,
            updated_at: now,
            ..booking
        },
    )?;
    tx.commit()?;

    tracing::info!(booking_id, "booking rescheduled");
    Ok(details)
}

/// All-or-nothing: if any id is unknown, nothing is updated.
pub fn bulk_update_booking_status(
    conn: &mut Connection,
    booking_ids: &[String],
    status: BookingStatus,
    reason: Option<&str>,
) -> Result<Vec<BookingDetails>, AppError> {
    if booking_ids.is_empty() {
        return Err(AppError::Validation(
            "at least one booking id is required".to_string(),
        ));
    }

    let tx = conn.transaction()?;

    let bookings = queries::get_bookings_by_ids(&tx, booking_ids)?;
    if bookings.len() != booking_ids.len() {
        return Err(AppError::NotFound("some bookings were not found".to_string()));
    }

    let now = now_local();
    let mut updated = Vec::with_capacity(bookings.len());
    for booking in bookings {
        let notes = append_audit(booking.notes.as_deref(), "Bulk Update", reason);
        queries::update_booking_status_and_notes(&tx, &booking.id, status, notes.as_deref(), now)?;
        updated.push(load_details(
            &tx,
            Booking {
                status,
                notes,
                updated_at: now,
                ..booking
            },
        )?);
    }
    tx.commit()?;

    tracing::info!(count = updated.len(), status = status.as_str(), "bulk status update");
    Ok(updated)
}

#[derive(Debug, Clone, Serialize)]
pub struct BookingPage {
    pub bookings: Vec<BookingDetails>,
    pub page: i64,
    pub limit: i64,
    pub total: i64,
    pub total_pages: i64,
}

pub fn list_client_bookings(
    conn: &Connection,
    client_id: &str,
    status: Option<BookingStatus>,
    date: Option<NaiveDate>,
    page: i64,
    limit: i64,
) -> Result<BookingPage, AppError> {
    list_page(
        conn,
        queries::BookingFilter {
            user_id: Some(client_id),
            status,
            date,
            ..Default::default()
        },
        page,
        limit,
    )
}

pub fn list_barber_bookings(
    conn: &Connection,
    barber_id: &str,
    status: Option<BookingStatus>,
    date: Option<NaiveDate>,
    page: i64,
    limit: i64,
) -> Result<BookingPage, AppError> {
    list_page(
        conn,
        queries::BookingFilter {
            barber_id: Some(barber_id),
            status,
            date,
            ..Default::default()
        },
        page,
        limit,
    )
}

fn list_page(
    conn: &Connection,
    mut filter: queries::BookingFilter,
    page: i64,
    limit: i64,
) -> Result<BookingPage, AppError> {
    let page = page.max(1);
    let limit = limit.clamp(1, 100);
    filter.limit = limit;
    filter.offset = (page - 1) * limit;

    let (rows, total) = queries::list_bookings(conn, &filter)?;
    let mut bookings = Vec::with_capacity(rows.len());
    for booking in rows {
        bookings.push(load_details(conn, booking)?);
    }

    Ok(BookingPage {
        bookings,
        page,
        limit,
        total,
        total_pages: (total + limit - 1) / limit,
    })
}

fn load_details(conn: &Connection, booking: Booking) -> Result<BookingDetails, AppError> {
    let barber = queries::get_barber(conn, &booking.barber_id)?
        .ok_or_else(|| AppError::NotFound("barber not found".to_string()))?;
    let service = queries::get_service(conn, &booking.service_id)?
        .ok_or_else(|| AppError::NotFound("service not found".to_string()))?;

    Ok(BookingDetails {
        booking,
        barber_name: barber.display_name,
        service_name: service.name,
        service_duration_minutes: service.duration_minutes,
        service_price_cents: service.price_cents,
    })
}

// Timestamps are persisted at second precision; truncate up front so a
// booking compares equal to its stored row.
fn now_local() -> NaiveDateTime {
    let now = Local::now().naive_local();
    now.with_nanosecond(0).unwrap_or(now)
}

fn end_time_for(start: NaiveTime, duration_minutes: i64) -> Result<NaiveTime, AppError> {
    let total = i64::from(start.hour() * 60 + start.minute()) + duration_minutes;
    // Day rollover is out of scope; a service cannot run past midnight.
    if total >= 24 * 60 {
        return Err(AppError::Validation(
            "service duration runs past the end of the day".to_string(),
        ));
    }
    NaiveTime::from_hms_opt((total / 60) as u32, (total % 60) as u32, 0)
        .ok_or_else(|| AppError::Validation("invalid end time".to_string()))
}

fn append_audit(notes: Option<&str>, tag: &str, reason: Option<&str>) -> Option<String> {
    match reason {
        Some(reason) => Some(
            format!("{}\n[{tag}: {reason}]", notes.unwrap_or(""))
                .trim()
                .to_string(),
        ),
        None => notes.map(str::to_string),
    }
}
