//! Infrastructure implementations for core services

pub mod audit;

pub use audit::{AuditError, AuditSink, JsonlAuditSink, NoopAuditSink};
