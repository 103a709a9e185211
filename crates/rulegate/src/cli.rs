use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "rulegate", version, about = "Rule-based gate for assistant tool invocations")]
pub struct Cli {
    /// Directory containing rule files
    #[arg(short, long, env = "RULEGATE_RULES_DIR", default_value = "rules")]
    pub rules_dir: PathBuf,

    /// Log level filter written to stderr (stdout carries the decision)
    #[arg(long, default_value = "warn")]
    pub log_level: String,
}
