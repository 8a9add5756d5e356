//! Database models
//!
//! Rows of the three tracked tables, serialized as-is in API responses.

use serde::{Deserialize, Serialize};

/// A tracked load-lock chamber
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Unit {
    pub id: i64,
    /// Instruction number read from the machine label (unique)
    pub identifier: String,
    pub name: String,
    pub status: String,
    /// Name of the most recently added sample
    pub current_sample: Option<String>,
    pub created_at: String,
    pub updated_at: String,
    pub image_path: Option<String>,
    pub notes: Option<String>,
}

/// One recorded status transition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusHistoryEntry {
    pub id: i64,
    pub unit_id: i64,
    /// `None` only for rows written before the unit had a status
    pub old_status: Option<String>,
    pub new_status: String,
    pub changed_at: String,
    pub notes: Option<String>,
}

/// A material sample logged against a unit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub id: i64,
    pub unit_id: i64,
    pub sample_name: String,
    pub material: Option<String>,
    pub created_at: String,
    pub notes: Option<String>,
}
