//! # rule-engine
//!
//! Core policy logic for the rulegate hook. This crate loads markdown rule
//! files with frontmatter metadata, compiles their patterns through a shared
//! case-insensitive regex cache, and evaluates tool-invocation events into a
//! single allow/warn/block decision.
//!
//! The engine fails open: malformed rules, bad patterns, and unknown
//! operators become diagnostics on the decision, and even an unreadable rule
//! directory yields an allow decision. Evaluation never returns an error.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use rule_engine::{EventCategory, RuleEngine, ToolEvent};
//!
//! let engine = RuleEngine::new("rules");
//! let event = ToolEvent::new(EventCategory::Bash, "Bash")
//!     .with_field("command", "rm -rf /tmp/scratch");
//! let decision = engine.evaluate(&event);
//! println!("{:?}", decision.action);
//! ```

mod compile;
mod decision;
mod engine;
pub mod frontmatter;
pub mod loader;
pub mod matcher;
mod schema;

// Re-export primary public API at crate root.
pub use compile::{compile_rule, CompiledCondition, CompiledRule, CompiledTest, FieldRef, RegexCache};
pub use decision::{Decision, DecisionAction};
pub use engine::{RuleEngine, RuleSnapshot};
pub use schema::{Condition, EventCategory, Rule, RuleAction, ToolEvent};
