use clap::Parser;
use ui_crawler::cli::commands::{cmd_crawl, cmd_hash};
use ui_crawler::cli::config::{Cli, Commands, load_config};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref());

    // Resolve Ollama settings: CLI > config file > defaults
    let ollama_endpoint = cli
        .ollama_endpoint
        .as_deref()
        .or(config.ollama.endpoint.as_deref());
    let ollama_model = cli
        .ollama_model
        .as_deref()
        .or(config.ollama.model.as_deref());

    match cli.command {
        Commands::Crawl {
            app,
            mode,
            max_steps,
            max_duration,
            oracle,
            trace,
        } => {
            cmd_crawl(
                &app,
                &mode,
                max_steps,
                max_duration,
                &oracle,
                trace.as_deref(),
                &config.crawl,
                cli.verbose,
                ollama_endpoint,
                ollama_model,
            )?;
        }
        Commands::Hash { tree } => {
            cmd_hash(&tree)?;
        }
    }

    Ok(())
}
