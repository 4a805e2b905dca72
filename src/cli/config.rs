use std::time::Duration;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

use crate::crawler::config::{CrawlMode, CrawlerConfig};

// ============================================================================
// CLI Argument Parsing (clap derive)
// ============================================================================

#[derive(Parser, Debug)]
#[command(
    name = "ui-crawler",
    version,
    about = "Autonomous mobile-app UI crawler with screen-state deduplication"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Ollama API endpoint
    #[arg(long, global = true)]
    pub ollama_endpoint: Option<String>,

    /// Ollama model name
    #[arg(long, global = true)]
    pub ollama_model: Option<String>,

    /// Path to config file (default: ui-crawler.yaml in current dir)
    #[arg(long, global = true)]
    pub config: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Crawl a simulated app defined by a YAML screen graph
    Crawl {
        /// Path to the simulated app spec (YAML)
        #[arg(long)]
        app: String,

        /// Crawl budget: steps or time
        #[arg(long, default_value = "steps")]
        mode: String,

        /// Maximum crawl steps (steps mode)
        #[arg(long)]
        max_steps: Option<u64>,

        /// Maximum crawl duration in seconds (time mode)
        #[arg(long)]
        max_duration: Option<u64>,

        /// Decision oracle: heuristic or remote
        #[arg(long, default_value = "heuristic")]
        oracle: String,

        /// JSONL trace output path (disabled when omitted)
        #[arg(long)]
        trace: Option<String>,
    },

    /// Print the structural hash of a UI tree JSON file
    Hash {
        /// Path to a UI tree JSON dump
        #[arg(long)]
        tree: String,
    },
}

// ============================================================================
// Config File Model (optional YAML)
// ============================================================================

/// Optional YAML config file: `ui-crawler.yaml`
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub crawl: CrawlFileConfig,
    #[serde(default)]
    pub ollama: OllamaConfig,
}

/// Crawl tuning as it appears in the config file. Every field is optional;
/// unset fields keep the engine defaults.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CrawlFileConfig {
    pub max_steps: Option<u64>,
    pub max_duration_seconds: Option<u64>,
    pub similarity_threshold: Option<u32>,
    pub max_same_action_repeat: Option<u32>,
    pub max_consecutive_no_op: Option<u32>,
    pub max_ai_failures: Option<u32>,
    pub max_mapping_failures: Option<u32>,
    pub max_execution_failures: Option<u32>,
    pub expensive_matching: Option<bool>,
    pub max_retries: Option<u32>,
    pub failure_threshold: Option<u32>,
    pub wait_after_action_ms: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct OllamaConfig {
    pub endpoint: Option<String>,
    pub model: Option<String>,
}

// ============================================================================
// Config File Loading
// ============================================================================

/// Load config from a YAML file. Returns defaults if file is missing or malformed.
pub fn load_config(path: Option<&str>) -> AppConfig {
    let config_path = path.unwrap_or("ui-crawler.yaml");
    match std::fs::read_to_string(config_path) {
        Ok(content) => serde_yaml::from_str(&content).unwrap_or_default(),
        Err(_) => AppConfig::default(),
    }
}

// ============================================================================
// Config Builders (merge CLI args with config file)
// ============================================================================

/// Build the engine config from resolved CLI/config-file values.
/// Precedence: CLI flag > config file > engine default.
pub fn build_crawler_config(
    file: &CrawlFileConfig,
    mode: &str,
    max_steps: Option<u64>,
    max_duration: Option<u64>,
) -> CrawlerConfig {
    let mut cfg = CrawlerConfig::default();

    cfg.crawl_mode = match mode {
        "time" => CrawlMode::Time,
        _ => CrawlMode::Steps,
    };
    if let Some(v) = max_steps.or(file.max_steps) {
        cfg.max_steps = v;
    }
    if let Some(v) = max_duration.or(file.max_duration_seconds) {
        cfg.max_duration = Duration::from_secs(v);
    }
    if let Some(v) = file.similarity_threshold {
        cfg.similarity_threshold = v;
    }
    if let Some(v) = file.max_same_action_repeat {
        cfg.max_same_action_repeat = v;
    }
    if let Some(v) = file.max_consecutive_no_op {
        cfg.max_consecutive_no_op = v;
    }
    if let Some(v) = file.max_ai_failures {
        cfg.max_ai_failures = v;
    }
    if let Some(v) = file.max_mapping_failures {
        cfg.max_mapping_failures = v;
    }
    if let Some(v) = file.max_execution_failures {
        cfg.max_execution_failures = v;
    }
    if let Some(v) = file.expensive_matching {
        cfg.expensive_matching = v;
    }
    if let Some(v) = file.max_retries {
        cfg.max_retries = v;
    }
    if let Some(v) = file.failure_threshold {
        cfg.failure_threshold = v;
    }
    if let Some(v) = file.wait_after_action_ms {
        cfg.wait_after_action = Duration::from_millis(v);
    }

    cfg
}
