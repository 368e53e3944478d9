pub mod bookings;
pub mod health;
pub mod schedule;

use std::sync::Arc;

use axum::routing::{get, patch, post, put};
use axum::Router;

use crate::state::AppState;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .route("/api/bookings", post(bookings::create_booking))
        .route("/api/bookings", get(bookings::list_bookings))
        .route("/api/bookings/bulk-status", post(bookings::bulk_update_status))
        .route("/api/bookings/:id/status", patch(bookings::update_status))
        .route("/api/bookings/:id/cancel", post(bookings::cancel_booking))
        .route(
            "/api/bookings/:id/reschedule",
            post(bookings::reschedule_booking),
        )
        .route("/api/barbers/:id/schedule", get(schedule::get_week_schedule))
        .route("/api/barbers/:id/schedule", put(schedule::replace_schedule))
        .with_state(state)
}
