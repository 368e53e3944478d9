pub mod availability;
pub mod booking;
pub mod notify;
pub mod schedule;
pub mod week_schedule;
