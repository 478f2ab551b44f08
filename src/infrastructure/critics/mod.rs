//! Critic adapters
//!
//! Implementations of the `Critic` port plus the registry that assembles the
//! static panel from a YAML file.

pub mod http;
pub mod registry;
pub mod scripted;

pub use http::HttpCritic;
pub use registry::{CriticKind, CriticRegistry, CriticSpec, RegistryError};
pub use scripted::{FailureKind, ScriptedCritic, ScriptedFailure, ScriptedStep};
