//! Unit workflow statuses
//!
//! A closed set of six labels. Any status may move to any other; the
//! display metadata (label, color, icon) is purely presentational.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Workflow status of a load-lock unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitStatus {
    Inserted,
    Working,
    Missing,
    Qc,
    Packaging,
    Ready,
}

/// Display metadata attached to a status in API responses
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusInfo {
    pub label: &'static str,
    pub color: &'static str,
    pub icon: &'static str,
}

impl UnitStatus {
    /// Every status, in display order
    pub const ALL: [UnitStatus; 6] = [
        UnitStatus::Inserted,
        UnitStatus::Working,
        UnitStatus::Missing,
        UnitStatus::Qc,
        UnitStatus::Packaging,
        UnitStatus::Ready,
    ];

    /// Status assigned to newly ingested units
    pub const INITIAL: UnitStatus = UnitStatus::Inserted;

    /// Stored/wire label
    pub fn as_str(&self) -> &'static str {
        match self {
            UnitStatus::Inserted => "inserted",
            UnitStatus::Working => "working",
            UnitStatus::Missing => "missing",
            UnitStatus::Qc => "qc",
            UnitStatus::Packaging => "packaging",
            UnitStatus::Ready => "ready",
        }
    }

    pub fn info(&self) -> StatusInfo {
        let (label, color, icon) = match self {
            UnitStatus::Inserted => ("הוכנס", "#0dcaf0", "📥"),
            UnitStatus::Working => ("בעבודה", "#0d6efd", "⚙️"),
            UnitStatus::Missing => ("חוסרים", "#fd7e14", "⚠️"),
            UnitStatus::Qc => ("QC", "#6f42c1", "🔍"),
            UnitStatus::Packaging => ("באריזה", "#0dcaf0", "📦"),
            UnitStatus::Ready => ("מוכן", "#198754", "✅"),
        };
        StatusInfo { label, color, icon }
    }

    /// Metadata for a stored label; `None` when the label is not a known status
    pub fn info_for(label: &str) -> Option<StatusInfo> {
        label.parse::<UnitStatus>().ok().map(|s| s.info())
    }
}

impl fmt::Display for UnitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing a label outside the status set
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown status: {0}")]
pub struct UnknownStatus(pub String);

impl FromStr for UnitStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        UnitStatus::ALL
            .iter()
            .copied()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| UnknownStatus(s.to_string()))
    }
}
