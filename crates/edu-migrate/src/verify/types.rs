//! Type definitions for post-load reconciliation.

use serde::{Deserialize, Serialize};

/// Expected versus actual row count for one collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountCheck {
    /// Document key of the collection.
    pub collection: String,
    /// Count recorded in the migration envelope.
    pub expected: usize,
    /// Count found in the target.
    pub actual: usize,
}

impl CountCheck {
    pub fn matches(&self) -> bool {
        self.expected == self.actual
    }
}

/// Number of resources linked to one skill.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillCoverage {
    pub skill_name: String,
    pub resource_count: usize,
}

/// Result of verifying a target against its envelope.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifyReport {
    /// One entry per collection, in insert order.
    pub counts: Vec<CountCheck>,
    /// Per-skill link counts, most-linked first.
    pub coverage: Vec<SkillCoverage>,
}

impl VerifyReport {
    /// Checks whose counts differ.
    pub fn mismatches(&self) -> impl Iterator<Item = &CountCheck> {
        self.counts.iter().filter(|c| !c.matches())
    }

    /// True when every collection count matches.
    pub fn is_consistent(&self) -> bool {
        self.mismatches().next().is_none()
    }

    /// Skills with no linked resource.
    pub fn uncovered_skills(&self) -> impl Iterator<Item = &SkillCoverage> {
        self.coverage.iter().filter(|c| c.resource_count == 0)
    }
}
