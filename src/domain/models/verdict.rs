//! Verdicts and critic priorities.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A critic's judgment on a case.
///
/// `DENY` and `ESCALATE` are accepted as input aliases of `BLOCK` and
/// `REVIEW`. Variant order is the map order used in reports
/// (most restrictive first); tie-breaking uses [`Verdict::conservatism`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Verdict {
    #[serde(alias = "DENY", alias = "deny", alias = "block")]
    Block,
    #[serde(alias = "ESCALATE", alias = "escalate", alias = "review")]
    Review,
    #[serde(alias = "allow")]
    Allow,
    #[serde(alias = "abstain")]
    Abstain,
    #[serde(alias = "error")]
    Error,
}

impl Verdict {
    /// Verdicts that participate in scoring, most conservative first.
    pub const SCORED: [Self; 4] = [Self::Block, Self::Review, Self::Allow, Self::Abstain];

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Block => "BLOCK",
            Self::Review => "REVIEW",
            Self::Allow => "ALLOW",
            Self::Abstain => "ABSTAIN",
            Self::Error => "ERROR",
        }
    }

    /// Tie-break rank: higher wins on equal scores.
    ///
    /// `BLOCK > REVIEW > ALLOW > ABSTAIN > ERROR`.
    pub const fn conservatism(&self) -> u8 {
        match self {
            Self::Block => 4,
            Self::Review => 3,
            Self::Allow => 2,
            Self::Abstain => 1,
            Self::Error => 0,
        }
    }

    pub const fn is_error(&self) -> bool {
        matches!(self, Self::Error)
    }

    /// Pick the more conservative of two verdicts.
    pub fn most_conservative(self, other: Self) -> Self {
        if other.conservatism() > self.conservatism() {
            other
        } else {
            self
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Verdict {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ALLOW" => Ok(Self::Allow),
            "BLOCK" | "DENY" => Ok(Self::Block),
            "REVIEW" | "ESCALATE" => Ok(Self::Review),
            "ABSTAIN" => Ok(Self::Abstain),
            "ERROR" => Ok(Self::Error),
            other => Err(format!("unknown verdict: {other}")),
        }
    }
}

/// Whether a critic may bypass weighted aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CriticPriority {
    #[default]
    None,
    Override,
}

impl CriticPriority {
    pub const fn is_override(&self) -> bool {
        matches!(self, Self::Override)
    }
}
