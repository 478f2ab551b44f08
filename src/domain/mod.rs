//! Domain layer for the Tribunal governance pipeline
//!
//! This module contains the immutable value types produced by each pipeline
//! stage and the port traits implemented by external collaborators.

pub mod errors;
pub mod models;
pub mod ports;

// Re-export error types for convenient access
pub use errors::{DomainError, DomainResult, PolicyConfigError, RuleError};
