//! Audit recorder implementations.

pub mod composite;
pub mod json_report;
pub mod memory;

pub use composite::CompositeAuditRecorder;
pub use json_report::JsonReportRecorder;
pub use memory::InMemoryAuditRecorder;
