//! Project-specific utilities live here.

pub mod pagination;

use serde::{Deserialize, Serialize};
use time::{format_description::well_known::Iso8601, OffsetDateTime};
use uuid::Uuid;

/// Response body of every create endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Created {
    pub id: String,
}

/// Fresh random identifier for a new record.
pub fn gen_id() -> String {
    Uuid::new_v4().to_string()
}

/// Current UTC time as an ISO-8601 string.
///
/// Fixed nanosecond width, so timestamps also sort correctly as strings.
pub fn now_iso() -> String {
    OffsetDateTime::now_utc()
        .format(&Iso8601::DEFAULT)
        .unwrap_or_else(|_| OffsetDateTime::UNIX_EPOCH.to_string())
}
