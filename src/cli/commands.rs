use crate::backend::sim::{SimAppSpec, SimBackend, SimScreenSource, SimulatedDevice};
use crate::cli::config::{build_crawler_config, CrawlFileConfig};
use crate::crawler::orchestrator::Crawler;
use crate::crawler::session::CrawlControl;
use crate::hash::codec::structural_hash;
use crate::oracle::heuristic::HeuristicOracle;
use crate::oracle::oracle::DecisionOracle;
use crate::oracle::remote::RemoteOracle;
use crate::trace::logger::EventLogger;

// ============================================================================
// crawl subcommand
// ============================================================================

#[allow(clippy::too_many_arguments)]
pub fn cmd_crawl(
    app_path: &str,
    mode: &str,
    max_steps: Option<u64>,
    max_duration: Option<u64>,
    oracle_name: &str,
    trace: Option<&str>,
    file_cfg: &CrawlFileConfig,
    verbose: u8,
    ollama_endpoint: Option<&str>,
    ollama_model: Option<&str>,
) -> Result<(), Box<dyn std::error::Error>> {
    let yaml = std::fs::read_to_string(app_path)?;
    let spec = SimAppSpec::from_yaml(&yaml)?;
    let app_name = spec.name.clone();
    let device = SimulatedDevice::new(spec)?.shared();

    let cfg = build_crawler_config(file_cfg, mode, max_steps, max_duration);
    let oracle = build_oracle(oracle_name, ollama_endpoint, ollama_model);
    let events = match trace {
        Some(path) => EventLogger::new(path),
        None => EventLogger::disabled(),
    };

    if verbose > 0 {
        eprintln!(
            "Crawling '{}' (mode={}, max_steps={}, oracle={})...",
            app_name, mode, cfg.max_steps, oracle_name
        );
    }

    let control = CrawlControl::new();
    let mut crawler = Crawler::new(
        cfg,
        oracle,
        Box::new(SimScreenSource(device.clone())),
        Box::new(SimBackend(device)),
        control,
        events,
    );

    let report = crawler.run();

    println!();
    println!("Lifecycle:      {:?}", report.lifecycle);
    println!("Reason:         {}", report.reason.as_str());
    println!("Steps:          {}", report.steps);
    println!("Unique screens: {}", report.unique_screens);
    println!("Transitions:    {}", report.transitions);

    for state in crawler.store().states() {
        println!(
            "  {} visits={} first_seen=step {} hash={}",
            state.id, state.visit_count, state.first_seen_step, state.composite_hash
        );
    }

    Ok(())
}

// ============================================================================
// hash subcommand
// ============================================================================

pub fn cmd_hash(tree_path: &str) -> Result<(), Box<dyn std::error::Error>> {
    let json = std::fs::read_to_string(tree_path)?;
    let hash = structural_hash(&json)?;
    println!("{}", hash);
    Ok(())
}

// ============================================================================
// Helpers
// ============================================================================

/// Build the decision oracle based on name.
fn build_oracle(
    name: &str,
    ollama_endpoint: Option<&str>,
    ollama_model: Option<&str>,
) -> Box<dyn DecisionOracle> {
    match name {
        "remote" => {
            let endpoint = ollama_endpoint.unwrap_or("http://localhost:11434/api/generate");
            let model = ollama_model.unwrap_or("qwen2.5:1.5b");
            Box::new(RemoteOracle::new(endpoint, model))
        }
        _ => Box::new(HeuristicOracle),
    }
}
