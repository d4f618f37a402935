//! Data models for the visitor export server

pub mod export;
pub mod visitor_record;

// Re-export commonly used types
pub use export::{DeliveryReport, ExportQuery, ProbeReport};
pub use visitor_record::{ExportJob, SampleWindow, VisitorRecord, WindowKind};
