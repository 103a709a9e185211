//! Rule compilation: turn extracted frontmatter into typed, pattern-compiled
//! rules, recovering from every per-condition failure with a diagnostic.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use regex::{Regex, RegexBuilder};
use tracing::debug;

use crate::frontmatter::{Frontmatter, Scalar};
use crate::schema::{Condition, EventCategory, Rule, RuleAction};

// ---------------------------------------------------------------------------
// Regex cache
// ---------------------------------------------------------------------------

/// Shared cache of case-insensitively compiled regexes, keyed by pattern text.
///
/// Compilation is pure (the same pattern always yields the same result), so
/// entries are inserted once and retained indefinitely. Failed compilations
/// are cached too, keeping repeat diagnostics cheap. The interior mutex makes
/// concurrent evaluations safe; readers only ever observe complete entries.
#[derive(Debug, Default)]
pub struct RegexCache {
    entries: Mutex<HashMap<String, Result<Arc<Regex>, String>>>,
}

impl RegexCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compile `pattern` case-insensitively, or return the cached result.
    ///
    /// The error value is the rendered compile error, suitable for use as a
    /// diagnostic.
    pub fn compile(&self, pattern: &str) -> Result<Arc<Regex>, String> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries
            .entry(pattern.to_string())
            .or_insert_with(|| {
                RegexBuilder::new(pattern)
                    .case_insensitive(true)
                    .build()
                    .map(Arc::new)
                    .map_err(|e| e.to_string())
            })
            .clone()
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

// ---------------------------------------------------------------------------
// Compiled representations
// ---------------------------------------------------------------------------

/// Which event field a compiled condition reads.
#[derive(Debug, Clone)]
pub enum FieldRef {
    /// A field named explicitly by the condition.
    Named(String),
    /// The default field of the incoming event's category, used by legacy
    /// single-pattern rules.
    CategoryDefault,
}

/// A condition's test, resolved to a concrete operation.
///
/// `Never` stands in for a condition that was neutralized at compile time
/// (invalid regex or unrecognized operator); it matches nothing but keeps the
/// rest of the rule intact.
#[derive(Debug, Clone)]
pub enum CompiledTest {
    Regex(Arc<Regex>),
    Contains(String),
    NotContains(String),
    Equals(String),
    StartsWith(String),
    EndsWith(String),
    Never,
}

#[derive(Debug, Clone)]
pub struct CompiledCondition {
    pub field: FieldRef,
    pub test: CompiledTest,
}

/// A [`Rule`] plus its pattern-compiled conditions, ready for evaluation.
#[derive(Debug, Clone)]
pub struct CompiledRule {
    pub rule: Rule,
    pub conditions: Vec<CompiledCondition>,
}

// ---------------------------------------------------------------------------
// Compilation
// ---------------------------------------------------------------------------

/// Build a [`CompiledRule`] from one file's frontmatter and message body.
///
/// Returns `None` (with a diagnostic) when the rule is unusable as a whole:
/// `name` or `event` absent, or the `event` value unrecognized. Per-condition
/// failures neutralize only the offending condition.
pub fn compile_rule(
    source: &str,
    fm: &Frontmatter,
    body: &str,
    cache: &RegexCache,
    diagnostics: &mut Vec<String>,
) -> Option<CompiledRule> {
    let Some(name) = fm.scalars.get("name").map(Scalar::to_text) else {
        diagnostics.push(format!("rule file '{source}': missing required key 'name'"));
        return None;
    };

    let event = match fm.scalars.get("event").map(Scalar::to_text) {
        Some(raw) => match EventCategory::parse(&raw) {
            Some(cat) => cat,
            None => {
                diagnostics.push(format!("rule '{name}': unknown event category '{raw}'"));
                return None;
            }
        },
        None => {
            diagnostics.push(format!("rule '{name}': missing required key 'event'"));
            return None;
        }
    };

    let enabled = match fm.scalars.get("enabled") {
        Some(Scalar::Bool(b)) => *b,
        // Tolerate a quoted boolean.
        Some(Scalar::Str(s)) if s.eq_ignore_ascii_case("false") => false,
        Some(_) | None => true,
    };

    let action = match fm.scalars.get("action").map(Scalar::to_text) {
        Some(raw) => match raw.to_ascii_lowercase().as_str() {
            "block" => RuleAction::Block,
            "warn" => RuleAction::Warn,
            other => {
                diagnostics.push(format!(
                    "rule '{name}': unknown action '{other}', defaulting to warn"
                ));
                RuleAction::Warn
            }
        },
        None => RuleAction::Warn,
    };

    let legacy_pattern = fm.scalars.get("pattern").map(Scalar::to_text);

    let mut conditions: Vec<Condition> = Vec::with_capacity(fm.conditions.len());
    let mut compiled = Vec::with_capacity(fm.conditions.len() + 1);

    // The legacy single-pattern shorthand counts as one regex condition
    // against the event category's default field.
    if let Some(pattern) = &legacy_pattern {
        compiled.push(CompiledCondition {
            field: FieldRef::CategoryDefault,
            test: compile_regex_test(&name, pattern, cache, diagnostics),
        });
    }

    for (idx, item) in fm.conditions.iter().enumerate() {
        let field = item.get("field").map(Scalar::to_text).unwrap_or_default();
        let operator = item.get("operator").map(Scalar::to_text).unwrap_or_default();
        let pattern_value = item.get("pattern");

        // A missing pattern must not silently become the empty pattern:
        // `contains ""` matches every value, so a typo would turn the
        // condition into an always-firing one. An explicitly quoted empty
        // pattern is left alone.
        let usable = !field.is_empty() && !operator.is_empty() && pattern_value.is_some();
        let cond = Condition {
            field,
            operator,
            pattern: pattern_value.map(Scalar::to_text).unwrap_or_default(),
        };

        if usable {
            compiled.push(compile_condition(&name, &cond, cache, diagnostics));
        } else {
            diagnostics.push(format!(
                "rule '{name}': condition {idx} is missing 'field', 'operator', or 'pattern'"
            ));
            compiled.push(CompiledCondition {
                field: FieldRef::CategoryDefault,
                test: CompiledTest::Never,
            });
        }
        conditions.push(cond);
    }

    let rule = Rule {
        name,
        enabled,
        event,
        action,
        legacy_pattern,
        conditions,
        message: body.to_string(),
    };

    debug!(
        rule = rule.name,
        conditions = compiled.len(),
        enabled = rule.enabled,
        "compiled rule"
    );

    Some(CompiledRule {
        rule,
        conditions: compiled,
    })
}

/// Compile one well-formed condition; the caller has already rejected items
/// with a missing field, operator, or pattern.
fn compile_condition(
    rule_name: &str,
    cond: &Condition,
    cache: &RegexCache,
    diagnostics: &mut Vec<String>,
) -> CompiledCondition {
    let field = FieldRef::Named(cond.field.clone());

    let test = match cond.operator.as_str() {
        "regex_match" => compile_regex_test(rule_name, &cond.pattern, cache, diagnostics),
        "contains" => CompiledTest::Contains(cond.pattern.clone()),
        "not_contains" => CompiledTest::NotContains(cond.pattern.clone()),
        "equals" => CompiledTest::Equals(cond.pattern.clone()),
        "starts_with" => CompiledTest::StartsWith(cond.pattern.clone()),
        "ends_with" => CompiledTest::EndsWith(cond.pattern.clone()),
        other => {
            diagnostics.push(format!(
                "rule '{rule_name}': unknown operator '{other}', condition will never match"
            ));
            CompiledTest::Never
        }
    };

    CompiledCondition { field, test }
}

fn compile_regex_test(
    rule_name: &str,
    pattern: &str,
    cache: &RegexCache,
    diagnostics: &mut Vec<String>,
) -> CompiledTest {
    match cache.compile(pattern) {
        Ok(re) => CompiledTest::Regex(re),
        Err(err) => {
            diagnostics.push(format!("rule '{rule_name}': invalid regex '{pattern}': {err}"));
            CompiledTest::Never
        }
    }
}
