//! Hook wire protocol: map the host's inbound event record to a
//! [`ToolEvent`] and render the engine's [`Decision`] into the response
//! shapes the host expects.

use serde::Deserialize;
use serde_json::{json, Value};

use rule_engine::{Decision, DecisionAction, EventCategory, ToolEvent};

/// The inbound hook record read from stdin.
#[derive(Debug, Deserialize)]
pub struct HookInput {
    #[serde(default, alias = "hookEventName")]
    pub hook_event_name: String,
    #[serde(default, alias = "toolName")]
    pub tool_name: String,
    #[serde(default, alias = "toolInput")]
    pub tool_input: Value,
}

/// Map a hook record to a tool event, or `None` when the lifecycle point or
/// tool is not one we gate (the caller answers with the allow shape).
pub fn to_event(input: &HookInput) -> Option<ToolEvent> {
    match input.hook_event_name.as_str() {
        "PreToolUse" | "PostToolUse" => {}
        _ => return None,
    }

    let category = match input.tool_name.as_str() {
        "Bash" => EventCategory::Bash,
        "Edit" | "MultiEdit" => EventCategory::Edit,
        "Write" => EventCategory::Write,
        "Read" => EventCategory::Read,
        _ => return None,
    };

    let mut event = ToolEvent::new(category, input.tool_name.clone());

    if let Some(obj) = input.tool_input.as_object() {
        for (key, value) in obj {
            if let Some(s) = value.as_str() {
                event.fields.insert(key.clone(), s.to_string());
            }
        }
        // MultiEdit carries its text in an edits array; fold the new strings
        // into the category's default field.
        if let Some(edits) = obj.get("edits").and_then(Value::as_array) {
            let joined: Vec<&str> = edits
                .iter()
                .filter_map(|e| e.get("new_string").and_then(Value::as_str))
                .collect();
            if !joined.is_empty() {
                event.fields.insert("new_string".to_string(), joined.join("\n"));
            }
        }
    }

    Some(event)
}

/// Render a decision into the host's response shape.
///
/// Allow is an empty object. Warn carries an advisory `systemMessage`. Block
/// carries an explicit decision flag plus the reason. Diagnostics are
/// appended to warn/block messages as auxiliary lines; for allow they are
/// only logged by the caller.
pub fn render_decision(decision: &Decision) -> Value {
    match decision.action {
        DecisionAction::Allow => json!({}),
        DecisionAction::Warn => json!({
            "systemMessage": message_with_diagnostics(decision),
        }),
        DecisionAction::Block => json!({
            "decision": "block",
            "reason": message_with_diagnostics(decision),
        }),
    }
}

fn message_with_diagnostics(decision: &Decision) -> String {
    let mut out = decision.reason.clone().unwrap_or_default();
    for diag in &decision.diagnostics {
        out.push_str("\n[rulegate] ");
        out.push_str(diag);
    }
    out
}
