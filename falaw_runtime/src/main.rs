//! falaw-sim: run a scenario and print its summary.
//!
//! Usage: falaw-sim [scenario] [config.json]
//!
//! `scenario` is a built-in name or a path to a JSON scenario file
//! (default: `default`). `config.json` overrides the kernel constants.
//! Log verbosity follows RUST_LOG (default: info).

use std::fs;
use std::process;

use falaw_kernel::config::KernelConfig;
use falaw_runtime::drift::verify_determinism;
use falaw_runtime::error::RuntimeResult;
use falaw_runtime::replay::run_scenario;
use falaw_runtime::scenario::Scenario;
use tracing::error;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer().without_time())
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let scenario = args.first().map(String::as_str).unwrap_or("default");
    let config_path = args.get(1).map(String::as_str);

    if let Err(e) = run(scenario, config_path) {
        error!(error = %e, "simulation failed");
        println!("[FAIL] {}", e);
        process::exit(1);
    }
}

fn run(scenario: &str, config_path: Option<&str>) -> RuntimeResult<()> {
    let config = match config_path {
        Some(path) => KernelConfig::from_json(&fs::read_to_string(path)?)?,
        None => KernelConfig::default(),
    };
    let scenario = Scenario::load(scenario)?;

    let (report, hash) = run_scenario(&config, &scenario)?;

    println!("scenario:         {}", report.scenario);
    println!("steps:            {}", report.steps_run);
    println!("termination:      {:?}", report.termination);
    println!("alive:            {}/{}", report.entities_alive, report.entities_total);
    println!("total primal:     {:.4}", report.total_primal);
    println!("avg primal:       {:.4}", report.avg_primal);
    println!("regime events:    {}", report.regime_events);
    println!("eliminations:     {}", report.eliminations);
    println!("extinctions:      {}", report.extinctions);
    println!(
        "final field:      cohesion={:.3} fragmentation={:.3} flow={:.3} clarity={:.3}",
        report.final_field.cohesion,
        report.final_field.fragmentation,
        report.final_field.primal_flow,
        report.final_field.target_clarity
    );
    println!(
        "final tension:    {:.4} ({:?})",
        report.final_tension.aggregate.value, report.final_tension.aggregate.level
    );
    for (strategy, count) in &report.regime_activity.strategies {
        println!("  recent {:<22} {}", strategy.to_string(), count);
    }
    println!("fingerprint:      {}", hash);

    let replayed = verify_determinism(&config, &scenario)?;
    if replayed == hash {
        println!("[OK] determinism check passed");
    } else {
        println!("[FAIL] fingerprint changed between runs: {} vs {}", hash, replayed);
        process::exit(1);
    }
    Ok(())
}
