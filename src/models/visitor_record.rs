//! Visitor record model

use chrono::{NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Visitor count sample at a point in time.
///
/// Weekday and hour are derived from `timestamp` on access, so they cannot
/// drift from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisitorRecord {
    timestamp: NaiveDateTime,
    visitor_count: u32,
}

impl VisitorRecord {
    pub fn new(timestamp: NaiveDateTime, visitor_count: u32) -> Self {
        Self {
            timestamp,
            visitor_count,
        }
    }

    pub fn timestamp(&self) -> NaiveDateTime {
        self.timestamp
    }

    pub fn visitor_count(&self) -> u32 {
        self.visitor_count
    }

    /// English weekday name, e.g. `Tuesday`
    pub fn day_of_week(&self) -> String {
        self.timestamp.format("%A").to_string()
    }

    pub fn hour(&self) -> u32 {
        self.timestamp.hour()
    }
}

/// Kind of sample window requested by a trigger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum WindowKind {
    /// A single record at the reference time
    Current,
    /// One record per interval over the preceding hours
    Series,
}

/// Time span the generator synthesizes records for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleWindow {
    Current,
    Series { hours_back: i64 },
}

/// One invocation's worth of work
#[derive(Debug, Clone)]
pub struct ExportJob {
    pub reference: NaiveDateTime,
    pub records: Vec<VisitorRecord>,
    pub filename: String,
}

/// Target filename for an export run at `reference`
pub fn export_filename(reference: NaiveDateTime) -> String {
    format!("visitor_data_{}.csv", reference.format("%Y%m%d_%H%M"))
}
