use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single RFID scan as stored in the `tags` table.
/// `bits` is not a column; it is computed from `binary_value` when the row is read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub id: i64,
    pub bits: i64,
    pub binary_value: String,
    pub hex_value: String,
    pub facility_code: String,
    pub unique_code: String,
    pub proxmark: String,
    pub scanned: DateTime<Utc>,
}

/// The caller-supplied part of a tag. `id`, `scanned` and `bits` are owned by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTag {
    pub binary_value: String,
    pub hex_value: String,
    pub facility_code: String,
    pub unique_code: String,
    pub proxmark: String,
}

impl NewTag {
    pub fn new(
        binary_value: &str,
        hex_value: &str,
        facility_code: &str,
        unique_code: &str,
        proxmark: &str,
    ) -> Self {
        Self {
            binary_value: binary_value.to_string(),
            hex_value: hex_value.to_string(),
            facility_code: facility_code.to_string(),
            unique_code: unique_code.to_string(),
            proxmark: proxmark.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LatestTag {
    pub id: i64,
}
