//! Port trait definitions (Hexagonal Architecture)
//!
//! This module defines the interfaces external collaborators implement:
//! - Critic: opaque judgment sources polled for every case
//! - PrecedentLookup: read-only access to previously decided cases
//! - AuditSink: observability sink for completed decisions
//!
//! These traits keep the governance pipeline independent of how critics,
//! precedent stores and audit trails are actually implemented.

pub mod audit_sink;
pub mod critic;
pub mod null_precedent;
pub mod precedent;

pub use audit_sink::AuditSink;
pub use critic::{Critic, CriticError, CriticEvaluation};
pub use null_precedent::NullPrecedentLookup;
pub use precedent::{PrecedentError, PrecedentLookup};
