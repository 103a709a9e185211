//! The decision engine: load and compile the rule set, evaluate one event,
//! and compose a single decision.
//!
//! This module is the fail-open boundary. Every recoverable failure below it
//! (unreadable files, malformed frontmatter, bad patterns) has already been
//! converted into a diagnostic, and an unreadable rule directory degrades to
//! an allow decision with one diagnostic. [`RuleEngine::evaluate`] can never
//! fail to return a [`Decision`].

use std::path::PathBuf;

use tracing::{debug, trace, warn};

use crate::compile::{compile_rule, CompiledRule, RegexCache};
use crate::decision::Decision;
use crate::frontmatter;
use crate::loader;
use crate::matcher::condition_matches;
use crate::schema::{RuleAction, ToolEvent};

/// An immutable compiled rule set plus the diagnostics accumulated while
/// building it.
///
/// Snapshots are plain data: a long-lived host can build one with
/// [`RuleEngine::load_snapshot`], share it behind an `Arc` across concurrent
/// evaluations, and swap in a freshly built snapshot atomically on reload.
/// In-flight evaluations keep reading the snapshot they started with.
#[derive(Debug, Default)]
pub struct RuleSnapshot {
    pub rules: Vec<CompiledRule>,
    pub diagnostics: Vec<String>,
}

impl RuleSnapshot {
    /// Evaluate one event against this snapshot.
    ///
    /// Candidate rules are the enabled ones whose category accepts the
    /// event's, in file order. All of a rule's conditions must match (AND); a
    /// rule with zero conditions never matches. The first matching block rule
    /// decides and short-circuits; otherwise the first matching warn rule
    /// decides; otherwise the decision is allow.
    pub fn evaluate(&self, event: &ToolEvent) -> Decision {
        let diagnostics = self.diagnostics.clone();
        let mut first_warn: Option<&CompiledRule> = None;

        for compiled in &self.rules {
            let rule = &compiled.rule;
            if !rule.enabled || !rule.event.accepts(event.category) {
                continue;
            }
            if compiled.conditions.is_empty() {
                continue;
            }
            if !compiled
                .conditions
                .iter()
                .all(|cond| condition_matches(cond, event))
            {
                continue;
            }

            trace!(rule = rule.name, action = ?rule.action, "rule matched event");
            match rule.action {
                RuleAction::Block => {
                    return Decision::block(rule.message.clone()).with_diagnostics(diagnostics);
                }
                RuleAction::Warn => {
                    if first_warn.is_none() {
                        first_warn = Some(compiled);
                    }
                }
            }
        }

        match first_warn {
            Some(compiled) => {
                Decision::warn(compiled.rule.message.clone()).with_diagnostics(diagnostics)
            }
            None => Decision::allow().with_diagnostics(diagnostics),
        }
    }
}

/// The rule evaluation engine.
///
/// Owns the rule directory path and the shared regex-compilation cache. The
/// rule set itself is rebuilt from disk on every [`evaluate`](Self::evaluate)
/// call; only the regex cache persists across calls, which is safe because
/// pattern compilation is pure.
#[derive(Debug)]
pub struct RuleEngine {
    rules_dir: PathBuf,
    cache: RegexCache,
}

impl RuleEngine {
    pub fn new(rules_dir: impl Into<PathBuf>) -> Self {
        Self {
            rules_dir: rules_dir.into(),
            cache: RegexCache::new(),
        }
    }

    /// Read, extract, and compile every rule file into a fresh snapshot.
    ///
    /// Never fails: malformed or unusable rules become diagnostics, and an
    /// unreadable directory yields an empty snapshot with one diagnostic.
    pub fn load_snapshot(&self) -> RuleSnapshot {
        let mut diagnostics = Vec::new();
        let files = match loader::load_rule_files(&self.rules_dir, &mut diagnostics) {
            Ok(files) => files,
            Err(e) => {
                warn!(error = %e, "rule source unavailable; failing open");
                diagnostics.push(e.to_string());
                return RuleSnapshot {
                    rules: Vec::new(),
                    diagnostics,
                };
            }
        };

        let mut rules = Vec::with_capacity(files.len());
        for file in &files {
            match frontmatter::extract(&file.text) {
                Ok((fm, body)) => {
                    if let Some(rule) =
                        compile_rule(&file.stem, &fm, &body, &self.cache, &mut diagnostics)
                    {
                        rules.push(rule);
                    }
                }
                Err(e) => {
                    diagnostics.push(format!("rule file '{}': {e}", file.file_name));
                }
            }
        }

        debug!(
            rules = rules.len(),
            diagnostics = diagnostics.len(),
            "built rule snapshot"
        );
        RuleSnapshot { rules, diagnostics }
    }

    /// Evaluate one event against the current on-disk rule set.
    pub fn evaluate(&self, event: &ToolEvent) -> Decision {
        self.load_snapshot().evaluate(event)
    }
}
