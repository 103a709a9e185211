//! Condition evaluation against event fields.
//!
//! `regex_match` is case-insensitive (the flag is baked in at compilation);
//! every other operator compares case-sensitively. Absent event fields read
//! as empty strings, never as a missing-field error. Matching never fails:
//! neutralized conditions carry [`CompiledTest::Never`] and match nothing.
//!
//! The regex crate guarantees linear-time matching, so user-authored
//! patterns cannot trigger catastrophic backtracking.

use crate::compile::{CompiledCondition, CompiledTest, FieldRef};
use crate::schema::ToolEvent;

/// Evaluate one compiled test against a field value.
pub fn test_matches(test: &CompiledTest, value: &str) -> bool {
    match test {
        CompiledTest::Regex(re) => re.is_match(value),
        CompiledTest::Contains(p) => value.contains(p.as_str()),
        CompiledTest::NotContains(p) => !value.contains(p.as_str()),
        CompiledTest::Equals(p) => value == p,
        CompiledTest::StartsWith(p) => value.starts_with(p.as_str()),
        CompiledTest::EndsWith(p) => value.ends_with(p.as_str()),
        CompiledTest::Never => false,
    }
}

/// Evaluate one compiled condition against an event, resolving the field
/// reference first.
pub fn condition_matches(cond: &CompiledCondition, event: &ToolEvent) -> bool {
    let value = match &cond.field {
        FieldRef::Named(name) => event.field(name),
        FieldRef::CategoryDefault => event.field(event.category.default_field()),
    };
    test_matches(&cond.test, value)
}
