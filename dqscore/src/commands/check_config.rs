// dqscore/src/commands/check_config.rs
//
// USE CASE: Validate the thresholds file without touching the database.

use anyhow::Context;
use std::path::Path;

use dqscore_core::infrastructure::config::load_quality_config;

pub fn execute(explicit: Option<&Path>) -> anyhow::Result<()> {
    let cwd = std::env::current_dir().context("Cannot read the working directory")?;
    let config = load_quality_config(explicit, &cwd).context("Invalid quality thresholds")?;

    println!("✅ Configuration is valid");
    for (dimension, weight) in config.weights() {
        println!("   {:<13} weight={}", dimension.as_str(), weight);
    }
    let alerts = config.alerts();
    println!(
        "   alerts        warning<{} critical<{}",
        alerts.warning_score, alerts.critical_score
    );
    println!("   baseline      {} day(s)", config.baseline_window_days());
    Ok(())
}
