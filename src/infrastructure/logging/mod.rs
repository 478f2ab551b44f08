//! Logging infrastructure
//!
//! Structured logging using tracing and tracing-subscriber:
//! - JSON or pretty console output
//! - Rolling JSON log files
//! - Decision audit trail

pub mod audit;
pub mod logger;

pub use audit::{JsonlAuditSink, TracingAuditSink};
pub use logger::LoggerImpl;
