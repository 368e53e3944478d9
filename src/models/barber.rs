use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Barber {
    pub id: String,
    pub display_name: String,
}
