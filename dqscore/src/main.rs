// dqscore/src/main.rs

mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Setup Logging (Tracing)
    // RUST_LOG=debug dqscore run ... pour voir les détails des étapes
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run(args) => commands::run::execute(args).await?,
        Commands::Register {
            name,
            contract,
            db_path,
        } => commands::register::execute(&db_path, &name, contract.as_deref()).await?,
        Commands::Scores {
            dataset,
            limit,
            db_path,
        } => commands::scores::execute(&db_path, &dataset, limit).await?,
        Commands::Anomalies {
            dataset,
            run_date,
            db_path,
        } => commands::anomalies::execute(&db_path, &dataset, run_date).await?,
        Commands::BaselineAudit(args) => commands::baseline_audit::execute(args).await?,
        Commands::CheckConfig { config } => commands::check_config::execute(config.as_deref())?,
    }

    Ok(())
}
