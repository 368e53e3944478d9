use async_trait::async_trait;
use serde::Serialize;

use crate::models::BookingStatus;
use crate::services::booking::BookingDetails;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingEventKind {
    Created,
    StatusChanged,
    Rescheduled,
}

/// What downstream dispatchers (SMS, push, statistics) get to see about a
/// booking change.
#[derive(Debug, Clone, Serialize)]
pub struct BookingEvent {
    pub kind: BookingEventKind,
    pub booking_id: String,
    pub barber_id: String,
    pub user_id: String,
    pub status: BookingStatus,
}

impl BookingEvent {
    pub fn new(kind: BookingEventKind, details: &BookingDetails) -> Self {
        Self {
            kind,
            booking_id: details.booking.id.clone(),
            barber_id: details.booking.barber_id.clone(),
            user_id: details.booking.user_id.clone(),
            status: details.booking.status,
        }
    }
}

#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn dispatch(&self, event: &BookingEvent) -> anyhow::Result<()>;
}

/// Default sink: just logs the event.
pub struct LogSink;

#[async_trait]
impl NotificationSink for LogSink {
    async fn dispatch(&self, event: &BookingEvent) -> anyhow::Result<()> {
        tracing::info!(
            kind = ?event.kind,
            booking_id = %event.booking_id,
            status = event.status.as_str(),
            "booking event"
        );
        Ok(())
    }
}

/// Fire-and-forget delivery: a sink failure is logged and never propagates,
/// so the booking operation it follows cannot be rolled back by it.
pub async fn notify(sink: &dyn NotificationSink, event: BookingEvent) {
    if let Err(e) = sink.dispatch(&event).await {
        tracing::error!(
            error = %e,
            booking_id = %event.booking_id,
            "failed to dispatch booking notification"
        );
    }
}
