use anyhow::{bail, Context, Result};
use chrono::Utc;
use std::env;
use tracing_subscriber::{fmt, EnvFilter};

// Use library instead of local modules
use region_satisfaction::{
    calculator, resolve, Config, RegionRegistry, RegistrySnapshot, VariationInjector,
};

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let args: Vec<String> = env::args().collect();

    match args.get(1).map(String::as_str) {
        Some("check") | None => run_check(),
        Some("overall") => run_overall(),
        Some("stats") => {
            let region = args.get(2).context("Usage: satisfaction stats <region>")?;
            run_stats(region)
        }
        Some(other) => {
            eprintln!("Usage: satisfaction [check | overall | stats <region>]");
            bail!("Unknown command: {other}")
        }
    }
}

/// Load the configured data directory or fail with the load error
fn load_registry() -> Result<(Config, RegionRegistry)> {
    let config = Config::load();
    let registry = RegionRegistry::open(config.registry_source());

    if !registry.snapshot().is_loaded() {
        let reason = registry
            .last_error()
            .unwrap_or_else(|| "no regions in data files".to_string());
        bail!("No region data loaded from {}: {reason}", config.data_dir.display());
    }

    Ok((config, registry))
}

fn run_check() -> Result<()> {
    println!("🔎 Region data check");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let (config, registry) = load_registry()?;
    let snapshot = registry.snapshot();

    println!("\n📂 Data directory: {}", config.data_dir.display());
    println!("✓ Tier: {:?}", snapshot.tier());
    println!("✓ Regions: {}", snapshot.len());
    println!("✓ Entries: {}", snapshot.total_entries());

    let unrated: Vec<&str> = snapshot
        .regions()
        .filter(|r| r.rating().is_none())
        .map(|r| r.name.as_str())
        .collect();
    if !unrated.is_empty() {
        println!("⚠️  Regions without a rating: {}", unrated.join(", "));
    }

    let snapshots = config.snapshot_store();
    match snapshots.root() {
        Some(root) if root.is_dir() => println!("✓ Snapshots: {}", root.display()),
        Some(root) => println!("• Snapshots: none at {}", root.display()),
        None => println!("• Snapshots: disabled"),
    }

    println!("\n━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("✅ Data OK");

    Ok(())
}

fn run_overall() -> Result<()> {
    let (_, registry) = load_registry()?;
    let snapshot = registry.snapshot();
    let aggregate = calculator::overall(&snapshot, &VariationInjector::live());

    println!("📊 Overall satisfaction ({:?})", aggregate.basis);
    println!("   Rating:         {:.2}", aggregate.rating);
    println!("   Regions:        {}", aggregate.total_states);
    println!("   Reviews:        {}", aggregate.total_reviews);
    println!("   Recommend rate: {}%", aggregate.recommend_rate());

    Ok(())
}

fn run_stats(requested: &str) -> Result<()> {
    let (_, registry) = load_registry()?;
    let snapshot = registry.snapshot();
    let name = canonical_name(&snapshot, requested)?;

    let statistics = calculator::statistics_for(&snapshot, &name, Utc::now())?;

    println!("📈 {name}");
    println!("{}", serde_json::to_string_pretty(&statistics)?);

    Ok(())
}

fn canonical_name(snapshot: &RegistrySnapshot, requested: &str) -> Result<String> {
    let keys: Vec<&str> = snapshot.key_refs().collect();
    match resolve(requested, &keys) {
        Some(resolution) => Ok(resolution.name.to_string()),
        None => bail!("State not found: {requested}"),
    }
}
