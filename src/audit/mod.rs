//! Audit trail for configuration changes.
//!
//! Every setting or rule mutation writes exactly one
//! [`AuditRecord`](crate::models::AuditRecord) inside the same transaction as
//! the mutation. If the audit write fails, the mutation is rolled back.

mod logger;
mod sink;

pub use logger::AuditLogger;
pub use sink::{AuditSink, MemoryAuditLog};
