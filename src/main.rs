use clap::Parser;
use spa_prober::cli::commands::{cmd_crawl, cmd_smoke};
use spa_prober::cli::config::{Cli, Commands, apply_overrides, load_config, log_level};
use spa_prober::crawl::scheduler::CrawlMode;
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // RUST_LOG, when set, takes precedence over -v / --quiet
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level(&cli))),
        )
        .with_target(false)
        .compact()
        .init();

    let mut config = load_config(cli.config.as_deref());
    apply_overrides(&mut config, &cli);

    let clean = match cli.command.clone().unwrap_or(Commands::Probe) {
        Commands::Probe => cmd_crawl(&config, CrawlMode::Probe)?,
        Commands::Catalog => cmd_crawl(&config, CrawlMode::Catalog)?,
        Commands::Smoke { paths } => cmd_smoke(&config, &paths)?,
    };

    if !clean {
        std::process::exit(1);
    }

    Ok(())
}
