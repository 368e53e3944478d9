use anyhow::Context;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rusqlite::{params, Connection};

use crate::models::{timefmt, Barber, Booking, BookingStatus, ScheduleEntry, Service};

const TIMESTAMP: &str = "%Y-%m-%d %H:%M:%S";

// ── Barbers ──

pub fn insert_barber(conn: &Connection, barber: &Barber) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO barbers (id, display_name) VALUES (?1, ?2)",
        params![barber.id, barber.display_name],
    )?;
    Ok(())
}

pub fn get_barber(conn: &Connection, id: &str) -> anyhow::Result<Option<Barber>> {
    let result = conn.query_row(
        "SELECT id, display_name FROM barbers WHERE id = ?1",
        params![id],
        |row| {
            Ok(Barber {
                id: row.get(0)?,
                display_name: row.get(1)?,
            })
        },
    );

    match result {
        Ok(barber) => Ok(Some(barber)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

// ── Services ──

pub fn insert_service(conn: &Connection, service: &Service) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO services (id, barber_id, name, duration_minutes, price_cents)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            service.id,
            service.barber_id,
            service.name,
            service.duration_minutes,
            service.price_cents,
        ],
    )?;
    Ok(())
}

pub fn get_service(conn: &Connection, id: &str) -> anyhow::Result<Option<Service>> {
    let result = conn.query_row(
        "SELECT id, barber_id, name, duration_minutes, price_cents FROM services WHERE id = ?1",
        params![id],
        |row| {
            Ok(Service {
                id: row.get(0)?,
                barber_id: row.get(1)?,
                name: row.get(2)?,
                duration_minutes: row.get(3)?,
                price_cents: row.get(4)?,
            })
        },
    );

    match result {
        Ok(service) => Ok(Some(service)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

// ── Weekly schedules ──

pub fn insert_schedule_entry(conn: &Connection, entry: &ScheduleEntry) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO schedules (barber_id, day, start_time, end_time, lunch_start, lunch_end, is_working)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            entry.barber_id,
            entry.day,
            timefmt::fmt_hhmm(entry.start_time),
            timefmt::fmt_hhmm(entry.end_time),
            entry.lunch_start.map(timefmt::fmt_hhmm),
            entry.lunch_end.map(timefmt::fmt_hhmm),
            entry.is_working as i32,
        ],
    )?;
    Ok(())
}

pub fn delete_schedule(conn: &Connection, barber_id: &str) -> anyhow::Result<usize> {
    let count = conn.execute(
        "DELETE FROM schedules WHERE barber_id = ?1",
        params![barber_id],
    )?;
    Ok(count)
}

pub fn schedule_for_day(
    conn: &Connection,
    barber_id: &str,
    day: &str,
) -> anyhow::Result<Option<ScheduleEntry>> {
    let result = conn.query_row(
        "SELECT barber_id, day, start_time, end_time, lunch_start, lunch_end, is_working
         FROM schedules WHERE barber_id = ?1 AND day = ?2",
        params![barber_id, day],
        |row| Ok(parse_schedule_row(row)),
    );

    match result {
        Ok(entry) => Ok(Some(entry?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn week_entries(conn: &Connection, barber_id: &str) -> anyhow::Result<Vec<ScheduleEntry>> {
    let mut stmt = conn.prepare(
        "SELECT barber_id, day, start_time, end_time, lunch_start, lunch_end, is_working
         FROM schedules WHERE barber_id = ?1",
    )?;

    let rows = stmt.query_map(params![barber_id], |row| Ok(parse_schedule_row(row)))?;

    let mut entries = vec![];
    for row in rows {
        entries.push(row??);
    }
    Ok(entries)
}

fn parse_schedule_row(row: &rusqlite::Row) -> anyhow::Result<ScheduleEntry> {
    let barber_id: String = row.get(0)?;
    let day: String = row.get(1)?;
    let start_str: String = row.get(2)?;
    let end_str: String = row.get(3)?;
    let lunch_start_str: Option<String> = row.get(4)?;
    let lunch_end_str: Option<String> = row.get(5)?;
    let is_working: bool = row.get::<_, i32>(6)? != 0;

    Ok(ScheduleEntry {
        barber_id,
        day,
        start_time: parse_time_col(&start_str)?,
        end_time: parse_time_col(&end_str)?,
        lunch_start: lunch_start_str.as_deref().map(parse_time_col).transpose()?,
        lunch_end: lunch_end_str.as_deref().map(parse_time_col).transpose()?,
        is_working,
    })
}

// ── Bookings ──

pub fn insert_booking(conn: &Connection, booking: &Booking) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO bookings (id, barber_id, user_id, service_id, date, start_time, end_time, status, notes, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        params![
            booking.id,
            booking.barber_id,
            booking.user_id,
            booking.service_id,
            booking.date.format(timefmt::DATE).to_string(),
            timefmt::fmt_hhmm(booking.start_time),
            timefmt::fmt_hhmm(booking.end_time),
            booking.status.as_str(),
            booking.notes,
            booking.created_at.format(TIMESTAMP).to_string(),
            booking.updated_at.format(TIMESTAMP).to_string(),
        ],
    )?;
    Ok(())
}

pub fn get_booking(conn: &Connection, id: &str) -> anyhow::Result<Option<Booking>> {
    let result = conn.query_row(
        &format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = ?1"),
        params![id],
        |row| Ok(parse_booking_row(row)),
    );

    match result {
        Ok(booking) => Ok(Some(booking?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn get_bookings_by_ids(conn: &Connection, ids: &[String]) -> anyhow::Result<Vec<Booking>> {
    if ids.is_empty() {
        return Ok(vec![]);
    }

    let placeholders = vec!["?"; ids.len()].join(",");
    let sql = format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE id IN ({placeholders})");

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(rusqlite::params_from_iter(ids), |row| {
        Ok(parse_booking_row(row))
    })?;

    let mut bookings = vec![];
    for row in rows {
        bookings.push(row??);
    }
    Ok(bookings)
}

/// Active bookings (pending/confirmed/in-progress) for one barber on one
/// calendar day, optionally leaving out the booking being rescheduled.
pub fn active_bookings_for_day(
    conn: &Connection,
    barber_id: &str,
    date: NaiveDate,
    exclude_booking_id: Option<&str>,
) -> anyhow::Result<Vec<Booking>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {BOOKING_COLUMNS} FROM bookings
         WHERE barber_id = ?1 AND date = ?2
           AND status IN ('PENDING', 'CONFIRMED', 'IN_PROGRESS')
           AND (?3 IS NULL OR id != ?3)
         ORDER BY start_time ASC"
    ))?;

    let rows = stmt.query_map(
        params![barber_id, date.format(timefmt::DATE).to_string(), exclude_booking_id],
        |row| Ok(parse_booking_row(row)),
    )?;

    let mut bookings = vec![];
    for row in rows {
        bookings.push(row??);
    }
    Ok(bookings)
}

pub fn bookings_in_date_range(
    conn: &Connection,
    barber_id: &str,
    start: NaiveDate,
    end: NaiveDate,
) -> anyhow::Result<Vec<Booking>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {BOOKING_COLUMNS} FROM bookings
         WHERE barber_id = ?1 AND date >= ?2 AND date <= ?3 AND status != 'CANCELLED'
         ORDER BY date ASC, start_time ASC"
    ))?;

    let rows = stmt.query_map(
        params![
            barber_id,
            start.format(timefmt::DATE).to_string(),
            end.format(timefmt::DATE).to_string(),
        ],
        |row| Ok(parse_booking_row(row)),
    )?;

    let mut bookings = vec![];
    for row in rows {
        bookings.push(row??);
    }
    Ok(bookings)
}

pub fn update_booking_status(
    conn: &Connection,
    id: &str,
    status: BookingStatus,
    now: NaiveDateTime,
) -> anyhow::Result<bool> {
    let count = conn.execute(
        "UPDATE bookings SET status = ?1, updated_at = ?2 WHERE id = ?3",
        params![status.as_str(), now.format(TIMESTAMP).to_string(), id],
    )?;
    Ok(count > 0)
}

pub fn update_booking_status_and_notes(
    conn: &Connection,
    id: &str,
    status: BookingStatus,
    notes: Option<&str>,
    now: NaiveDateTime,
) -> anyhow::Result<bool> {
    let count = conn.execute(
        "UPDATE bookings SET status = ?1, notes = ?2, updated_at = ?3 WHERE id = ?4",
        params![
            status.as_str(),
            notes,
            now.format(TIMESTAMP).to_string(),
            id
        ],
    )?;
    Ok(count > 0)
}

pub fn update_booking_times(
    conn: &Connection,
    id: &str,
    date: NaiveDate,
    start: NaiveTime,
    end: NaiveTime,
    notes: Option<&str>,
    now: NaiveDateTime,
) -> anyhow::Result<bool> {
    let count = conn.execute(
        "UPDATE bookings SET date = ?1, start_time = ?2, end_time = ?3, notes = ?4, updated_at = ?5
         WHERE id = ?6",
        params![
            date.format(timefmt::DATE).to_string(),
            timefmt::fmt_hhmm(start),
            timefmt::fmt_hhmm(end),
            notes,
            now.format(TIMESTAMP).to_string(),
            id
        ],
    )?;
    Ok(count > 0)
}

#[derive(Debug, Default)]
pub struct BookingFilter<'a> {
    pub user_id: Option<&'a str>,
    pub barber_id: Option<&'a str>,
    pub status: Option<BookingStatus>,
    pub date: Option<NaiveDate>,
    pub limit: i64,
    pub offset: i64,
}

pub fn list_bookings(
    conn: &Connection,
    filter: &BookingFilter,
) -> anyhow::Result<(Vec<Booking>, i64)> {
    let mut clauses: Vec<&str> = vec![];
    let mut bound: Vec<Box<dyn rusqlite::types::ToSql>> = vec![];

    if let Some(user_id) = filter.user_id {
        clauses.push("user_id = ?");
        bound.push(Box::new(user_id.to_string()));
    }
    if let Some(barber_id) = filter.barber_id {
        clauses.push("barber_id = ?");
        bound.push(Box::new(barber_id.to_string()));
    }
    if let Some(status) = filter.status {
        clauses.push("status = ?");
        bound.push(Box::new(status.as_str().to_string()));
    }
    if let Some(date) = filter.date {
        clauses.push("date = ?");
        bound.push(Box::new(date.format(timefmt::DATE).to_string()));
    }

    let where_sql = if clauses.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", clauses.join(" AND "))
    };

    let total: i64 = {
        let sql = format!("SELECT COUNT(*) FROM bookings{where_sql}");
        let params_refs: Vec<&dyn rusqlite::types::ToSql> =
            bound.iter().map(|p| p.as_ref()).collect();
        conn.query_row(&sql, params_refs.as_slice(), |row| row.get(0))?
    };

    let sql = format!(
        "SELECT {BOOKING_COLUMNS} FROM bookings{where_sql}
         ORDER BY date DESC, start_time DESC LIMIT ? OFFSET ?"
    );
    bound.push(Box::new(filter.limit));
    bound.push(Box::new(filter.offset));

    let mut stmt = conn.prepare(&sql)?;
    let params_refs: Vec<&dyn rusqlite::types::ToSql> = bound.iter().map(|p| p.as_ref()).collect();
    let rows = stmt.query_map(params_refs.as_slice(), |row| Ok(parse_booking_row(row)))?;

    let mut bookings = vec![];
    for row in rows {
        bookings.push(row??);
    }
    Ok((bookings, total))
}

const BOOKING_COLUMNS: &str =
    "id, barber_id, user_id, service_id, date, start_time, end_time, status, notes, created_at, updated_at";

fn parse_booking_row(row: &rusqlite::Row) -> anyhow::Result<Booking> {
    let id: String = row.get(0)?;
    let barber_id: String = row.get(1)?;
    let user_id: String = row.get(2)?;
    let service_id: String = row.get(3)?;
    let date_str: String = row.get(4)?;
    let start_str: String = row.get(5)?;
    let end_str: String = row.get(6)?;
    let status_str: String = row.get(7)?;
    let notes: Option<String> = row.get(8)?;
    let created_at_str: String = row.get(9)?;
    let updated_at_str: String = row.get(10)?;

    let date = NaiveDate::parse_from_str(&date_str, timefmt::DATE)
        .with_context(|| format!("invalid booking date: {date_str}"))?;
    let status = BookingStatus::parse(&status_str)
        .with_context(|| format!("unknown booking status: {status_str}"))?;
    let created_at = NaiveDateTime::parse_from_str(&created_at_str, TIMESTAMP)
        .with_context(|| format!("invalid created_at timestamp: {created_at_str}"))?;
    let updated_at = NaiveDateTime::parse_from_str(&updated_at_str, TIMESTAMP)
        .with_context(|| format!("invalid updated_at timestamp: {updated_at_str}"))?;

    Ok(Booking {
        id,
        barber_id,
        user_id,
        service_id,
        date,
        start_time: parse_time_col(&start_str)?,
        end_time: parse_time_col(&end_str)?,
        status,
        notes,
        created_at,
        updated_at,
    })
}

fn parse_time_col(s: &str) -> anyhow::Result<NaiveTime> {
    timefmt::parse_hhmm(s).with_context(|| format!("invalid HH:MM column value: {s}"))
}
