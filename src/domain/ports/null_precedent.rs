//! Null precedent lookup.
//!
//! Used when no precedent store is wired in but the pipeline requires a
//! `PrecedentLookup` implementation.

use async_trait::async_trait;

use super::{PrecedentError, PrecedentLookup};
use crate::domain::models::{Case, Precedent};

/// A precedent lookup that never finds anything.
#[derive(Debug, Clone, Default)]
pub struct NullPrecedentLookup;

impl NullPrecedentLookup {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl PrecedentLookup for NullPrecedentLookup {
    async fn lookup(&self, _case: &Case) -> Result<Vec<Precedent>, PrecedentError> {
        Ok(Vec::new())
    }
}
