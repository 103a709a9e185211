mod cli;
mod protocol;

use std::io::Read;

use anyhow::{Context, Result};
use clap::Parser;
use serde_json::{json, Value};
use tracing::{debug, warn};

use rule_engine::RuleEngine;

use crate::cli::Cli;
use crate::protocol::HookInput;

fn main() {
    let cli = Cli::parse();

    // Logs go to stderr; stdout carries exactly one decision JSON object.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    // Fail open: whatever goes wrong, the host gets a well-formed allow
    // response and the tool invocation proceeds.
    let output = run(&cli).unwrap_or_else(|err| {
        warn!(error = %err, "evaluation failed; failing open");
        json!({})
    });

    println!("{output}");
}

fn run(cli: &Cli) -> Result<Value> {
    let mut raw = String::new();
    std::io::stdin()
        .read_to_string(&mut raw)
        .context("failed to read hook input from stdin")?;
    evaluate_raw(&cli.rules_dir, &raw)
}

/// Parse one raw hook record and evaluate it against the rules directory.
fn evaluate_raw(rules_dir: &std::path::Path, raw: &str) -> Result<Value> {
    let hook: HookInput =
        serde_json::from_str(raw).context("failed to parse hook input JSON")?;

    let Some(event) = protocol::to_event(&hook) else {
        debug!(
            hook_event = hook.hook_event_name,
            tool = hook.tool_name,
            "event is not gated"
        );
        return Ok(json!({}));
    };

    let engine = RuleEngine::new(rules_dir);
    let decision = engine.evaluate(&event);

    for diag in &decision.diagnostics {
        warn!(diagnostic = %diag, "rule evaluation diagnostic");
    }
    debug!(action = ?decision.action, "decision rendered");

    Ok(protocol::render_decision(&decision))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn rules_dir() -> TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("block-rm.md"),
            "---\nname: block-rm\nevent: bash\naction: block\npattern: \"rm\\\\s+-rf\"\n---\nRecursive force removal is blocked.",
        )
        .unwrap();
        dir
    }

    fn hook_json(command: &str) -> String {
        serde_json::json!({
            "hook_event_name": "PreToolUse",
            "tool_name": "Bash",
            "tool_input": {"command": command},
        })
        .to_string()
    }

    #[test]
    fn end_to_end_block_from_rules_on_disk() {
        let dir = rules_dir();
        let out = evaluate_raw(dir.path(), &hook_json("rm -rf /")).unwrap();
        assert_eq!(out["decision"], "block");
        assert_eq!(out["reason"], "Recursive force removal is blocked.");
    }

    #[test]
    fn end_to_end_allow_is_empty_object() {
        let dir = rules_dir();
        let out = evaluate_raw(dir.path(), &hook_json("ls -la")).unwrap();
        assert_eq!(out, json!({}));
    }

    #[test]
    fn cli_rules_dir_flag_reaches_the_engine() {
        let dir = rules_dir();
        let cli = Cli::parse_from([
            "rulegate",
            "--rules-dir",
            dir.path().to_str().unwrap(),
        ]);
        let out = evaluate_raw(&cli.rules_dir, &hook_json("rm -rf /")).unwrap();
        assert_eq!(out["decision"], "block");
    }

    #[test]
    fn non_gated_tool_is_allowed_without_reading_rules() {
        // The rules directory does not even exist; an ungated tool must
        // still get the allow shape.
        let raw = serde_json::json!({
            "hook_event_name": "PreToolUse",
            "tool_name": "WebFetch",
            "tool_input": {"url": "https://example.com"},
        })
        .to_string();
        let out = evaluate_raw(std::path::Path::new("/no/such/dir"), &raw).unwrap();
        assert_eq!(out, json!({}));
    }

    #[test]
    fn invalid_json_is_an_error_for_main_to_fail_open_on() {
        let dir = rules_dir();
        assert!(evaluate_raw(dir.path(), "not json at all").is_err());
    }

    #[test]
    fn missing_rules_dir_still_allows() {
        let out =
            evaluate_raw(std::path::Path::new("/no/such/dir"), &hook_json("rm -rf /")).unwrap();
        assert_eq!(out, json!({}));
    }
}
