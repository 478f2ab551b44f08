//! Infrastructure layer module
//!
//! This module contains the adapters around the governance pipeline:
//! - Configuration management
//! - Logging and audit sinks
//! - Critic adapters (HTTP, scripted replay) and the panel registry
//!
//! Infrastructure implementations satisfy the port traits defined in the domain layer.

pub mod config;
pub mod critics;
pub mod logging;
