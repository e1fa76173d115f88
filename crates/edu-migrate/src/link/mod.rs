//! Relevance Linker: proposes skill↔resource links for unlinked resources.
//!
//! Planning is a pure function over skills, resources and the pairs already
//! present, so the rule evaluation is testable without a store. [`run`] reads
//! those inputs from a store, inserts the plan and prints the same per-skill
//! coverage table as the Verifier.

pub mod hash;
pub mod rules;

pub use hash::TitleHash;
pub use rules::LinkRule;

use std::collections::HashSet;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn, Instrument};

use crate::config::LinkerConfig;
use crate::core::model::{Resource, ResourceRole, Skill, SkillResourceLink};
use crate::core::schema;
use crate::core::traits::{Statement, Store};
use crate::error::{MigrateError, Result};
use crate::load::defaults;
use crate::orchestrator::RunContext;
use crate::verify::{self, SkillCoverage};

/// Which step of the linker produced a link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// A category rule matched.
    Rule,
    /// Hash pick from the cybersecurity subset.
    HashPick,
    /// The configured fallback skill.
    Fallback,
}

/// A link the linker intends to create.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannedLink {
    pub skill_id: i64,
    pub resource_id: i64,
    pub relevance_score: f64,
    pub role: ResourceRole,
    pub strategy: Strategy,
}

impl PlannedLink {
    fn to_link(&self) -> SkillResourceLink {
        SkillResourceLink {
            id: None,
            skill_id: Some(self.skill_id),
            resource_id: Some(self.resource_id),
            relevance_score: Some(self.relevance_score),
            resource_type_for_skill: Some(self.role.clone()),
            auto_discovered: Some(true),
            discovery_date: Some(Utc::now()),
        }
    }
}

/// Output of [`plan_links`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LinkPlan {
    pub links: Vec<PlannedLink>,
    /// Resources skipped because they already have a link.
    pub already_linked: usize,
    /// Candidate pairs dropped because they already exist or repeat.
    pub skipped_duplicates: usize,
    /// Labels of resources no strategy could place.
    pub unmatched: Vec<String>,
}

/// Outcome of one linker run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LinkReport {
    pub by_rule: usize,
    pub by_hash: usize,
    pub by_fallback: usize,
    /// Links written to the store.
    pub inserted: usize,
    /// Links the store rejected.
    pub failed: usize,
    pub already_linked: usize,
    pub skipped_duplicates: usize,
    pub unmatched: Vec<String>,
    pub coverage: Vec<SkillCoverage>,
}

/// Role a resource plays for its skill.
pub fn resource_role(title: &str) -> ResourceRole {
    if title.to_lowercase().contains("basic") {
        ResourceRole::Foundation
    } else {
        ResourceRole::Practical
    }
}

/// Plan links for every resource that has none yet.
///
/// `existing` holds `(skill_id, resource_id)` pairs already stored. Skills
/// and resources without an id are ignored.
pub fn plan_links(
    skills: &[Skill],
    resources: &[Resource],
    existing: &HashSet<(i64, i64)>,
    config: &LinkerConfig,
) -> LinkPlan {
    let mut skills: Vec<(i64, String)> = skills
        .iter()
        .filter_map(|s| Some((s.id?, s.name.to_lowercase())))
        .collect();
    skills.sort_by_key(|(id, _)| *id);

    let cyber: Vec<i64> = skills
        .iter()
        .filter(|(_, name)| {
            config
                .cyber_skill_terms
                .iter()
                .any(|term| name.contains(term.to_lowercase().as_str()))
        })
        .map(|(id, _)| *id)
        .collect();

    let fallback_label = config.fallback_skill.to_lowercase();
    let fallback = skills
        .iter()
        .find(|(_, name)| name.contains(fallback_label.as_str()))
        .map(|(id, _)| *id);

    let linked: HashSet<i64> = existing.iter().map(|(_, resource)| *resource).collect();
    let mut seen = existing.clone();
    let mut plan = LinkPlan::default();

    for resource in resources {
        let Some(resource_id) = resource.id else {
            continue;
        };
        if linked.contains(&resource_id) {
            plan.already_linked += 1;
            continue;
        }

        let category = resource
            .skill_category
            .as_deref()
            .unwrap_or_default()
            .to_lowercase();

        let mut candidates: Vec<(i64, Strategy)> = config
            .rules
            .iter()
            .filter(|rule| rule.fires(&category))
            .flat_map(|rule| {
                skills
                    .iter()
                    .filter(move |(_, name)| rule.matches_skill(name))
                    .map(|(id, _)| (*id, Strategy::Rule))
            })
            .collect();

        if candidates.is_empty() {
            let broad = config
                .broad_terms
                .iter()
                .any(|term| category.contains(term.to_lowercase().as_str()));

            if broad && !cyber.is_empty() {
                let idx = config.hash.pick(&resource.title, cyber.len());
                candidates.push((cyber[idx], Strategy::HashPick));
            } else if let Some(id) = fallback {
                candidates.push((id, Strategy::Fallback));
            }
        }

        if candidates.is_empty() {
            debug!("No skill for resource {}", resource.label());
            plan.unmatched.push(resource.label());
            continue;
        }

        let role = resource_role(&resource.title);
        for (skill_id, strategy) in candidates {
            if !seen.insert((skill_id, resource_id)) {
                plan.skipped_duplicates += 1;
                continue;
            }
            let relevance_score = match strategy {
                Strategy::Rule => rules::RULE_SCORE,
                Strategy::HashPick | Strategy::Fallback => rules::FALLBACK_SCORE,
            };
            plan.links.push(PlannedLink {
                skill_id,
                resource_id,
                relevance_score,
                role: role.clone(),
                strategy,
            });
        }
    }

    plan
}

/// Link every unlinked resource in `store`.
pub async fn run(store: &dyn Store, config: &LinkerConfig, ctx: &RunContext) -> Result<LinkReport> {
    link_store(store, config).instrument(ctx.span("link")).await
}

async fn link_store(store: &dyn Store, config: &LinkerConfig) -> Result<LinkReport> {
    for def in [&schema::SKILLS, &schema::RESOURCES, &schema::SKILL_RESOURCES] {
        if !store.table_exists(def.name).await? {
            return Err(MigrateError::schema(def.name, "table is missing"));
        }
    }

    let dialect = store.dialect();
    let skills: Vec<Skill> = store
        .query(&dialect.select_all(schema::SKILLS.name), &[])
        .await?
        .iter()
        .map(Skill::from_row)
        .collect();
    let resources: Vec<Resource> = store
        .query(&dialect.select_all(schema::RESOURCES.name), &[])
        .await?
        .iter()
        .map(Resource::from_row)
        .collect();
    let existing: HashSet<(i64, i64)> = store
        .query(&dialect.select_all(schema::SKILL_RESOURCES.name), &[])
        .await?
        .iter()
        .map(SkillResourceLink::from_row)
        .filter_map(|link| Some((link.skill_id?, link.resource_id?)))
        .collect();

    info!(
        "Linking {} resources against {} skills ({} existing links, hash {})",
        resources.len(),
        skills.len(),
        existing.len(),
        config.hash.as_str()
    );

    let plan = plan_links(&skills, &resources, &existing, config);
    let mut report = LinkReport {
        already_linked: plan.already_linked,
        skipped_duplicates: plan.skipped_duplicates,
        unmatched: plan.unmatched.clone(),
        ..Default::default()
    };

    let statements: Vec<Statement> = plan
        .links
        .iter()
        .map(|planned| {
            let link = planned.to_link();
            let fields =
                defaults::link_fields(&link, planned.skill_id, planned.resource_id, Utc::now());
            dialect.insert_returning_id(schema::SKILL_RESOURCES.name, fields)
        })
        .collect();

    let outcomes = if statements.is_empty() {
        Vec::new()
    } else {
        store.insert_batch(&statements).await?
    };

    for (planned, outcome) in plan.links.iter().zip(outcomes) {
        match outcome {
            Ok(_) => {
                report.inserted += 1;
                match planned.strategy {
                    Strategy::Rule => report.by_rule += 1,
                    Strategy::HashPick => report.by_hash += 1,
                    Strategy::Fallback => report.by_fallback += 1,
                }
            }
            Err(message) => {
                report.failed += 1;
                warn!(
                    "Link skill={} resource={} rejected: {}",
                    planned.skill_id, planned.resource_id, message
                );
            }
        }
    }

    for label in &report.unmatched {
        warn!("No skill matched resource {}", label);
    }

    info!(
        "Created {} links ({} by rule, {} by hash, {} fallback); {} duplicates skipped, {} unmatched",
        report.inserted,
        report.by_rule,
        report.by_hash,
        report.by_fallback,
        report.skipped_duplicates,
        report.unmatched.len()
    );

    report.coverage = verify::skill_coverage(store).await?;
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn skill(id: i64, name: &str) -> Skill {
        Skill {
            id: Some(id),
            name: name.into(),
            ..Default::default()
        }
    }

    fn resource(id: i64, title: &str, category: &str) -> Resource {
        Resource {
            id: Some(id),
            title: title.into(),
            url: format!("https://example.com/{}", id),
            skill_category: Some(category.into()),
            ..Default::default()
        }
    }

    fn catalog() -> Vec<Skill> {
        vec![
            skill(1, "AI-Enhanced SIEM"),
            skill(2, "Ethical Hacking and Penetration Testing"),
            skill(3, "Zero Trust Architecture"),
            skill(4, "Cloud Security Posture Management"),
            skill(5, "Quantum-Safe Cryptography"),
            skill(6, "Vibe Coding"),
        ]
    }

    #[test]
    fn test_rule_match_scores_high() {
        let skills = vec![skill(1, "Quantum-Safe Cryptography")];
        let resources = vec![resource(10, "Intro to PQC", "quantum-cryptography")];
        let plan = plan_links(&skills, &resources, &HashSet::new(), &LinkerConfig::default());

        assert_eq!(
            plan.links,
            vec![PlannedLink {
                skill_id: 1,
                resource_id: 10,
                relevance_score: 0.9,
                role: ResourceRole::Practical,
                strategy: Strategy::Rule,
            }]
        );
    }

    #[test]
    fn test_unmatched_category_uses_fallback_skill() {
        let resources = vec![resource(11, "Basic Networking", "unmatched-category")];
        let plan = plan_links(&catalog(), &resources, &HashSet::new(), &LinkerConfig::default());

        assert_eq!(plan.links.len(), 1);
        let link = &plan.links[0];
        assert_eq!(link.skill_id, 1);
        assert_eq!(link.relevance_score, 0.7);
        assert_eq!(link.role, ResourceRole::Foundation);
        assert_eq!(link.strategy, Strategy::Fallback);
    }

    #[test]
    fn test_broad_category_hash_pick_is_deterministic() {
        let resources = vec![resource(12, "Incident Response Playbooks", "incident handling")];
        let config = LinkerConfig::default();

        let first = plan_links(&catalog(), &resources, &HashSet::new(), &config);
        let second = plan_links(&catalog(), &resources, &HashSet::new(), &config);
        assert_eq!(first, second);

        let link = &first.links[0];
        assert_eq!(link.strategy, Strategy::HashPick);
        // Cybersecurity subset by id: 1, 2, 3, 4.
        let subset = [1, 2, 3, 4];
        let expected = subset[config.hash.pick("Incident Response Playbooks", subset.len())];
        assert_eq!(link.skill_id, expected);
    }

    #[test]
    fn test_linked_resources_are_left_alone() {
        let resources = vec![resource(10, "Intro to PQC", "quantum-cryptography")];
        let existing: HashSet<_> = [(6, 10)].into_iter().collect();
        let plan = plan_links(&catalog(), &resources, &existing, &LinkerConfig::default());

        assert!(plan.links.is_empty());
        assert_eq!(plan.already_linked, 1);
    }

    #[test]
    fn test_overlapping_rules_yield_one_link_per_pair() {
        let mut config = LinkerConfig::default();
        config.rules.push(LinkRule::new(&["quantum"], "quantum-safe"));
        let resources = vec![resource(10, "Lattice Basics", "quantum-cryptography")];
        let plan = plan_links(&catalog(), &resources, &HashSet::new(), &config);

        assert_eq!(plan.links.len(), 1);
        assert_eq!(plan.skipped_duplicates, 1);
        assert_eq!(plan.links[0].role, ResourceRole::Foundation);
    }

    #[test]
    fn test_no_fallback_skill_reports_unmatched() {
        let skills = vec![skill(6, "Vibe Coding")];
        let resources = vec![resource(13, "Gardening", "hobbies")];
        let plan = plan_links(&skills, &resources, &HashSet::new(), &LinkerConfig::default());

        assert!(plan.links.is_empty());
        assert_eq!(plan.unmatched.len(), 1);
    }
}
