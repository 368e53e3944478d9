pub mod barber;
pub mod booking;
pub mod schedule;
pub mod service;
pub mod timefmt;

pub use barber::Barber;
pub use booking::{Booking, BookingStatus};
pub use schedule::ScheduleEntry;
pub use service::Service;
