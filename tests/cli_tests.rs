use clap::Parser;
use ui_crawler::cli::config::{build_crawler_config, AppConfig, Cli, Commands, CrawlFileConfig};
use ui_crawler::crawler::config::CrawlMode;

// ============================================================================
// Argument parsing
// ============================================================================

#[test]
fn parses_crawl_subcommand_with_defaults() {
    let cli = Cli::try_parse_from(["ui-crawler", "crawl", "--app", "demo.yaml"]).unwrap();

    match cli.command {
        Commands::Crawl { app, mode, max_steps, oracle, trace, .. } => {
            assert_eq!(app, "demo.yaml");
            assert_eq!(mode, "steps");
            assert_eq!(max_steps, None);
            assert_eq!(oracle, "heuristic");
            assert_eq!(trace, None);
        }
        other => panic!("expected crawl subcommand, got {:?}", other),
    }
}

#[test]
fn parses_crawl_overrides() {
    let cli = Cli::try_parse_from([
        "ui-crawler", "crawl", "--app", "demo.yaml", "--mode", "time", "--max-duration", "120",
        "--oracle", "remote", "--trace", "run.jsonl",
    ])
    .unwrap();

    match cli.command {
        Commands::Crawl { mode, max_duration, oracle, trace, .. } => {
            assert_eq!(mode, "time");
            assert_eq!(max_duration, Some(120));
            assert_eq!(oracle, "remote");
            assert_eq!(trace.as_deref(), Some("run.jsonl"));
        }
        other => panic!("expected crawl subcommand, got {:?}", other),
    }
}

#[test]
fn parses_hash_subcommand() {
    let cli = Cli::try_parse_from(["ui-crawler", "hash", "--tree", "tree.json"]).unwrap();
    assert!(matches!(cli.command, Commands::Hash { tree } if tree == "tree.json"));
}

#[test]
fn crawl_requires_an_app() {
    assert!(Cli::try_parse_from(["ui-crawler", "crawl"]).is_err());
}

// ============================================================================
// Config file and precedence
// ============================================================================

#[test]
fn app_config_parses_partial_yaml() {
    let yaml = r#"
crawl:
  max_steps: 25
  similarity_threshold: 8
ollama:
  model: "llama3"
"#;
    let config: AppConfig = serde_yaml::from_str(yaml).unwrap();
    assert_eq!(config.crawl.max_steps, Some(25));
    assert_eq!(config.crawl.similarity_threshold, Some(8));
    assert_eq!(config.crawl.max_retries, None);
    assert_eq!(config.ollama.model.as_deref(), Some("llama3"));
    assert_eq!(config.ollama.endpoint, None);
}

#[test]
fn cli_value_beats_config_file() {
    let file = CrawlFileConfig {
        max_steps: Some(25),
        ..CrawlFileConfig::default()
    };
    let cfg = build_crawler_config(&file, "steps", Some(7), None);
    assert_eq!(cfg.max_steps, 7);
}

#[test]
fn config_file_beats_engine_default() {
    let file = CrawlFileConfig {
        max_steps: Some(25),
        similarity_threshold: Some(8),
        ..CrawlFileConfig::default()
    };
    let cfg = build_crawler_config(&file, "steps", None, None);
    assert_eq!(cfg.max_steps, 25);
    assert_eq!(cfg.similarity_threshold, 8);
}

#[test]
fn engine_defaults_apply_when_nothing_is_set() {
    let cfg = build_crawler_config(&CrawlFileConfig::default(), "steps", None, None);
    assert_eq!(cfg.crawl_mode, CrawlMode::Steps);
    assert_eq!(cfg.max_steps, 100);
    assert_eq!(cfg.similarity_threshold, 5);
    assert_eq!(cfg.max_ai_failures, 3);
}

#[test]
fn time_mode_is_recognized() {
    let cfg = build_crawler_config(&CrawlFileConfig::default(), "time", None, Some(120));
    assert_eq!(cfg.crawl_mode, CrawlMode::Time);
    assert_eq!(cfg.max_duration.as_secs(), 120);
}
