//! Rules command - maintain the persisted rule cache.

use anyhow::Context;

use crate::config::Settings;
use crate::io::ExitCode;
use crate::pipeline::rebuild_rule_cache;
use crate::rules::{RefreshOutcome, cache};

/// Build or refresh the rule cache.
pub async fn run_build(settings: &Settings, force: bool) -> anyhow::Result<ExitCode> {
    let outcome = rebuild_rule_cache(settings, force)
        .await
        .context("cannot build rule cache")?;
    let cache_path = settings.resolve_path(&settings.rules.cache);

    match outcome {
        RefreshOutcome::Reused { rules } => println!(
            "Rule cache is up to date: {rules} rules in {}",
            cache_path.display()
        ),
        RefreshOutcome::Rebuilt { rules, dimension } => println!(
            "Built rule cache: {rules} rules ({dimension} dimensions) in {}",
            cache_path.display()
        ),
    }
    Ok(ExitCode::Success)
}

/// Print the cache fingerprint.
pub fn run_status(settings: &Settings) -> ExitCode {
    let cache_path = settings.resolve_path(&settings.rules.cache);
    if !cache_path.exists() {
        println!("No rule cache at {}", cache_path.display());
        println!("Run 'clausewise rules build' to create it.");
        return ExitCode::GeneralError;
    }

    println!("Rule cache: {}", cache_path.display());
    match cache::load_fingerprint(&cache_path) {
        Some(fingerprint) => {
            let built = chrono::DateTime::from_timestamp(fingerprint.created_at as i64, 0)
                .map(|t| t.to_rfc3339())
                .unwrap_or_else(|| fingerprint.created_at.to_string());
            println!("  model:       {}", fingerprint.model);
            println!("  dimension:   {}", fingerprint.dimension);
            println!("  chunk size:  {}", fingerprint.chunk_size);
            println!("  source hash: {}", fingerprint.source_hash);
            println!("  built:       {built}");
        }
        None => println!("  no fingerprint; the next build will regenerate the cache"),
    }
    ExitCode::Success
}
