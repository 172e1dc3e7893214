//! Food log records.
//!
//! A food log entry references catalog or user-authored products; the
//! store resolves each reference to a canonical [`FodmapProfile`] when
//! reading, so the engine never sees raw severity scales.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::fodmap::FodmapProfile;

/// Where a logged food item came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "product_id")]
pub enum FoodSource {
    /// A product from the shared catalog.
    Catalog(i64),
    /// A product the user authored themselves.
    UserAuthored(i64),
}

/// One food item within a log entry, with its FODMAP profile resolved.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggedFood {
    pub source: FoodSource,
    pub name: String,
    pub profile: FodmapProfile,
}

/// A food log entry: everything the user logged in one action.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FoodLogEntry {
    pub id: i64,
    pub user_id: i64,
    pub logged_at: DateTime<Utc>,
    pub items: Vec<LoggedFood>,
}
