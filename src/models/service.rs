use serde::{Deserialize, Serialize};

/// A bookable service offered by a barber. Owned by the services collaborator;
/// the scheduling core only reads it, and the duration is immutable.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Service {
    pub id: String,
    pub barber_id: String,
    pub name: String,
    pub duration_minutes: i64,
    pub price_cents: i64,
}
