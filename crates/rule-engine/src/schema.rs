use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// The kind of tool action a rule applies to.
///
/// Rule files name a category with their `event:` key; incoming events carry
/// the category derived from the tool that is about to run. `Wildcard` is only
/// valid on rules and matches every event category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventCategory {
    /// Shell command execution.
    Bash,
    /// An edit to an existing file.
    Edit,
    /// Writing a new file (or overwriting one wholesale).
    Write,
    /// Reading a file.
    Read,
    /// Rule-only: applies to every category.
    Wildcard,
}

impl EventCategory {
    /// Parse the `event:` value of a rule file. Case-insensitive.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bash" => Some(Self::Bash),
            "edit" => Some(Self::Edit),
            "write" => Some(Self::Write),
            "read" => Some(Self::Read),
            "*" | "all" => Some(Self::Wildcard),
            _ => None,
        }
    }

    /// The event field a legacy single-pattern rule is matched against.
    pub fn default_field(self) -> &'static str {
        match self {
            Self::Bash => "command",
            Self::Edit => "new_string",
            Self::Write => "content",
            Self::Read => "file_path",
            // Wildcard rules resolve the default field from the event's own
            // category, so this is only reached for synthetic events.
            Self::Wildcard => "command",
        }
    }

    /// Whether a rule declared for `self` applies to an event of `category`.
    pub fn accepts(self, category: EventCategory) -> bool {
        self == Self::Wildcard || self == category
    }
}

/// What a rule does when it matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleAction {
    /// Let the action proceed but surface the rule's message.
    Warn,
    /// Deny the action and surface the rule's message.
    Block,
}

/// A single field/operator/pattern test within a rule.
///
/// The operator is kept as the raw string from the rule file; it is resolved
/// to a typed test at compile time so that an unrecognized operator can be
/// neutralized with a diagnostic instead of rejecting the whole rule.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub field: String,
    pub operator: String,
    pub pattern: String,
}

/// A typed rule as extracted from one rule file, before pattern compilation.
#[derive(Debug, Clone)]
pub struct Rule {
    /// Unique within a load by convention; uniqueness is not enforced.
    pub name: String,
    pub enabled: bool,
    pub event: EventCategory,
    pub action: RuleAction,
    /// Single-pattern shorthand: a regex matched against the event
    /// category's default field.
    pub legacy_pattern: Option<String>,
    pub conditions: Vec<Condition>,
    /// Free text after the closing frontmatter delimiter, shown to the user
    /// on warn/block.
    pub message: String,
}

/// One tool-invocation event submitted for evaluation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolEvent {
    pub category: EventCategory,
    pub tool_name: String,
    /// Named string fields describing the action (e.g. `command`,
    /// `file_path`, `new_string`). Absent fields read as empty strings.
    #[serde(default)]
    pub fields: HashMap<String, String>,
}

impl ToolEvent {
    pub fn new(category: EventCategory, tool_name: impl Into<String>) -> Self {
        Self {
            category,
            tool_name: tool_name.into(),
            fields: HashMap::new(),
        }
    }

    /// Builder-style field insertion, mainly for tests and synthetic events.
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    /// Look up a field value; missing fields are logically empty, never an
    /// error.
    pub fn field(&self, name: &str) -> &str {
        self.fields.get(name).map(String::as_str).unwrap_or("")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_parse_is_case_insensitive() {
        assert_eq!(EventCategory::parse("Bash"), Some(EventCategory::Bash));
        assert_eq!(EventCategory::parse("EDIT"), Some(EventCategory::Edit));
        assert_eq!(EventCategory::parse("*"), Some(EventCategory::Wildcard));
        assert_eq!(EventCategory::parse("all"), Some(EventCategory::Wildcard));
        assert_eq!(EventCategory::parse("teleport"), None);
    }

    #[test]
    fn wildcard_accepts_every_category() {
        for cat in [
            EventCategory::Bash,
            EventCategory::Edit,
            EventCategory::Write,
            EventCategory::Read,
        ] {
            assert!(EventCategory::Wildcard.accepts(cat));
        }
        assert!(!EventCategory::Bash.accepts(EventCategory::Edit));
        assert!(EventCategory::Bash.accepts(EventCategory::Bash));
    }

    #[test]
    fn default_fields_per_category() {
        assert_eq!(EventCategory::Bash.default_field(), "command");
        assert_eq!(EventCategory::Edit.default_field(), "new_string");
        assert_eq!(EventCategory::Write.default_field(), "content");
        assert_eq!(EventCategory::Read.default_field(), "file_path");
    }

    #[test]
    fn missing_field_reads_as_empty() {
        let event = ToolEvent::new(EventCategory::Bash, "Bash").with_field("command", "ls");
        assert_eq!(event.field("command"), "ls");
        assert_eq!(event.field("no_such_field"), "");
    }
}
