//! Category rules for the Relevance Linker.

use serde::{Deserialize, Serialize};

/// Score for links produced by a category rule.
pub const RULE_SCORE: f64 = 0.9;

/// Score for links produced by the hash pick or the fallback skill.
pub const FALLBACK_SCORE: f64 = 0.7;

/// Skill picked when nothing else matches.
pub const DEFAULT_FALLBACK_SKILL: &str = "ai-enhanced siem";

/// Maps resource categories to skills.
///
/// The rule fires when any of `category_terms` occurs in the lower-cased
/// resource category, and then matches every skill whose lower-cased name
/// contains `skill_pattern`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkRule {
    pub category_terms: Vec<String>,
    pub skill_pattern: String,
}

impl LinkRule {
    pub fn new(terms: &[&str], skill_pattern: &str) -> Self {
        Self {
            category_terms: terms.iter().map(|t| t.to_string()).collect(),
            skill_pattern: skill_pattern.to_string(),
        }
    }

    /// True when any term occurs in `category` (already lower-cased).
    pub fn fires(&self, category: &str) -> bool {
        self.category_terms
            .iter()
            .any(|term| category.contains(term.to_lowercase().as_str()))
    }

    /// True when `skill_name` (already lower-cased) matches the pattern.
    pub fn matches_skill(&self, skill_name: &str) -> bool {
        skill_name.contains(self.skill_pattern.to_lowercase().as_str())
    }
}

/// Rules evaluated in order.
pub fn default_rules() -> Vec<LinkRule> {
    vec![
        LinkRule::new(&["vibe", "coding"], "vibe"),
        LinkRule::new(&["ai", "siem"], "ai-enhanced siem"),
        LinkRule::new(&["ethical", "hacking", "penetration"], "ethical hacking"),
        LinkRule::new(&["prompt", "engineering"], "prompt engineering"),
        LinkRule::new(&["zero", "trust"], "zero trust"),
        LinkRule::new(&["quantum", "cryptography"], "quantum"),
        LinkRule::new(&["cloud", "security", "posture"], "cloud security"),
    ]
}

/// Category terms that route a resource to the cybersecurity subset.
pub fn default_broad_terms() -> Vec<String> {
    ["security", "cyber", "network", "malware", "incident"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

/// Skill-name terms defining the cybersecurity subset.
pub fn default_cyber_skill_terms() -> Vec<String> {
    ["siem", "ethical", "zero trust", "cloud security"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}
