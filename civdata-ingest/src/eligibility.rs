//! Temporal eligibility checker
//!
//! Decides whether a person holds office at an evaluation instant. Rules run
//! in order and short-circuit on the first failure:
//!
//! 1. term start in the future → term hasn't started
//! 2. term end in the past → term expired
//! 3. next election beyond the horizon year-end → election too far in future
//! 4. last update older than the staleness window → stale data
//! 5. name on the departed-officials list → known departed
//!
//! Missing fields skip their rule. `now` is always a parameter.

use crate::names::normalize_name;
use crate::types::{EligibilityRule, EligibilityVerdict, RosterEntry};
use chrono::{DateTime, NaiveDate, Utc};
use civdata_common::config::EligibilitySection;
use civdata_common::time::{year_end_after, years_before};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// Known-departed officials, matched on normalized name
#[derive(Debug, Clone, Default)]
pub struct DepartedRegistry {
    names: HashSet<String>,
}

impl DepartedRegistry {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            names: names
                .into_iter()
                .map(|n| normalize_name(n.as_ref()))
                .filter(|n| !n.is_empty())
                .collect(),
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(&normalize_name(name))
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Term facts the rules look at
///
/// Roster entries and dataset persons both reduce to this shape.
#[derive(Debug, Clone, Copy)]
pub struct TermFacts<'a> {
    pub name: &'a str,
    pub term_start: Option<NaiveDate>,
    pub term_end: Option<NaiveDate>,
    pub next_election: Option<NaiveDate>,
    pub last_updated: Option<DateTime<Utc>>,
}

impl<'a> From<&'a RosterEntry> for TermFacts<'a> {
    fn from(entry: &'a RosterEntry) -> Self {
        Self {
            name: &entry.name,
            term_start: entry.term_start,
            term_end: entry.term_end,
            next_election: entry.next_election,
            last_updated: entry.last_updated,
        }
    }
}

/// Eligibility thresholds and denylist
#[derive(Debug, Clone)]
pub struct EligibilityPolicy {
    pub election_horizon_years: u32,
    pub stale_after_years: u32,
    pub departed: DepartedRegistry,
}

impl Default for EligibilityPolicy {
    fn default() -> Self {
        Self {
            election_horizon_years: 2,
            stale_after_years: 2,
            departed: DepartedRegistry::default(),
        }
    }
}

impl From<&EligibilitySection> for EligibilityPolicy {
    fn from(section: &EligibilitySection) -> Self {
        Self {
            election_horizon_years: section.election_horizon_years,
            stale_after_years: section.stale_after_years,
            departed: DepartedRegistry::new(&section.departed_officials),
        }
    }
}

impl EligibilityPolicy {
    /// Evaluate one roster entry
    pub fn evaluate(&self, entry: &RosterEntry, now: DateTime<Utc>) -> EligibilityVerdict {
        self.evaluate_facts(&TermFacts::from(entry), now)
    }

    /// Evaluate raw term facts
    pub fn evaluate_facts(&self, facts: &TermFacts<'_>, now: DateTime<Utc>) -> EligibilityVerdict {
        let (rule, reason) = self.decide(facts, now);
        EligibilityVerdict {
            is_current: rule == EligibilityRule::Current,
            reason,
            evaluated_at: now,
            rule,
        }
    }

    fn decide(&self, facts: &TermFacts<'_>, now: DateTime<Utc>) -> (EligibilityRule, String) {
        let today = now.date_naive();

        if let Some(start) = facts.term_start {
            if start > today {
                return (
                    EligibilityRule::TermNotStarted,
                    format!("term hasn't started (starts {start})"),
                );
            }
        }

        if let Some(end) = facts.term_end {
            if end < today {
                return (
                    EligibilityRule::TermExpired,
                    format!("term expired on {end}"),
                );
            }
        }

        if let Some(election) = facts.next_election {
            let horizon = year_end_after(now, self.election_horizon_years);
            if election > horizon {
                return (
                    EligibilityRule::ElectionTooFar,
                    format!("election too far in future ({election} is after {horizon})"),
                );
            }
        }

        if let Some(updated) = facts.last_updated {
            let cutoff = years_before(now, self.stale_after_years);
            if updated < cutoff {
                return (
                    EligibilityRule::StaleData,
                    format!(
                        "stale data (last updated {}, more than {} years ago)",
                        updated.date_naive(),
                        self.stale_after_years
                    ),
                );
            }
        }

        if self.departed.contains(facts.name) {
            return (
                EligibilityRule::KnownDeparted,
                "known to have left office".to_string(),
            );
        }

        (EligibilityRule::Current, "current officeholder".to_string())
    }

    /// Evaluate a batch and tally the results
    pub fn evaluate_all(&self, entries: &[RosterEntry], now: DateTime<Utc>) -> EligibilityReport {
        let verdicts: Vec<EligibilityVerdict> =
            entries.iter().map(|e| self.evaluate(e, now)).collect();
        let summary = EligibilitySummary::from_verdicts(&verdicts);
        EligibilityReport { verdicts, summary }
    }
}

/// Batch evaluation result, verdicts in input order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EligibilityReport {
    pub verdicts: Vec<EligibilityVerdict>,
    pub summary: EligibilitySummary,
}

/// Counts over a batch of verdicts
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EligibilitySummary {
    pub total: usize,
    pub current: usize,
    pub non_current: usize,
    /// current / total as a percentage, 0 for an empty batch
    pub accuracy: f64,
    pub by_rule: BTreeMap<EligibilityRule, usize>,
}

impl EligibilitySummary {
    pub fn from_verdicts(verdicts: &[EligibilityVerdict]) -> Self {
        let total = verdicts.len();
        let current = verdicts.iter().filter(|v| v.is_current).count();

        let mut by_rule = BTreeMap::new();
        for verdict in verdicts {
            *by_rule.entry(verdict.rule).or_insert(0) += 1;
        }

        let accuracy = if total == 0 {
            0.0
        } else {
            (current as f64 / total as f64) * 100.0
        };

        Self {
            total,
            current,
            non_current: total - current,
            accuracy,
            by_rule,
        }
    }
}
