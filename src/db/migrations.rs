use anyhow::Context;
use rusqlite::Connection;

// Schema is embedded so fresh files and in-memory test databases share one path.
const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS barbers (
    id TEXT PRIMARY KEY,
    display_name TEXT NOT NULL,
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS services (
    id TEXT PRIMARY KEY,
    barber_id TEXT NOT NULL REFERENCES barbers(id),
    name TEXT NOT NULL,
    duration_minutes INTEGER NOT NULL,
    price_cents INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS schedules (
    barber_id TEXT NOT NULL REFERENCES barbers(id),
    day TEXT NOT NULL,
    start_time TEXT NOT NULL,
    end_time TEXT NOT NULL,
    lunch_start TEXT,
    lunch_end TEXT,
    is_working INTEGER NOT NULL DEFAULT 1,
    PRIMARY KEY (barber_id, day)
);

CREATE TABLE IF NOT EXISTS bookings (
    id TEXT PRIMARY KEY,
    barber_id TEXT NOT NULL REFERENCES barbers(id),
    user_id TEXT NOT NULL,
    service_id TEXT NOT NULL REFERENCES services(id),
    date TEXT NOT NULL,
    start_time TEXT NOT NULL,
    end_time TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'PENDING',
    notes TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_bookings_barber_date ON bookings(barber_id, date);
CREATE INDEX IF NOT EXISTS idx_bookings_user ON bookings(user_id);
";

pub fn run_migrations(conn: &Connection) -> anyhow::Result<()> {
    conn.execute_batch(SCHEMA)
        .context("failed to apply database schema")?;
    Ok(())
}
