//! ecm-compete entry point: CLI wiring and config-driven engine run.

use std::path::Path;
use std::process;

use tracing_subscriber::EnvFilter;

use ecm_compete::config::RunConfig;
use ecm_compete::engine::Engine;
use ecm_compete::io::export::{export_csv, export_json};
use ecm_compete::io::input;
use ecm_compete::report::PortfolioReport;
use ecm_compete::sample::sample_portfolio;

/// Parsed CLI arguments.
struct CliArgs {
    config_path: Option<String>,
    preset: Option<String>,
    measures_path: Option<String>,
    results_out: Option<String>,
    json_out: Option<String>,
    seed_override: Option<u64>,
}

fn print_help() {
    eprintln!("ecm-compete: measure competition and financial-metrics engine");
    eprintln!();
    eprintln!("Usage: ecm-compete [OPTIONS]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --config <path>          Load run configuration from a TOML file");
    eprintln!(
        "  --preset <name>          Use a built-in preset ({})",
        RunConfig::PRESETS.join(", ")
    );
    eprintln!("  --measures <path>        Load measures from a JSON file");
    eprintln!("  --results-out <path>     Export the results table to CSV");
    eprintln!("  --json-out <path>        Export the full results to JSON");
    eprintln!("  --seed <u64>             Override the sample portfolio seed");
    eprintln!("  --help                   Show this help message");
    eprintln!();
    eprintln!("If no --config or --preset is given, the aeo preset is used.");
    eprintln!("If no --measures is given, the built-in sample portfolio is used.");
}

/// Takes the value following a flag, or exits with a usage error.
fn flag_value(args: &[String], i: &mut usize, flag: &str, what: &str) -> String {
    *i += 1;
    if *i >= args.len() {
        eprintln!("error: {flag} requires a {what} argument");
        process::exit(1);
    }
    args[*i].clone()
}

fn parse_args() -> CliArgs {
    let args: Vec<String> = std::env::args().collect();
    let mut cli = CliArgs {
        config_path: None,
        preset: None,
        measures_path: None,
        results_out: None,
        json_out: None,
        seed_override: None,
    };

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--help" | "-h" => {
                print_help();
                process::exit(0);
            }
            "--config" => cli.config_path = Some(flag_value(&args, &mut i, "--config", "path")),
            "--preset" => cli.preset = Some(flag_value(&args, &mut i, "--preset", "name")),
            "--measures" => {
                cli.measures_path = Some(flag_value(&args, &mut i, "--measures", "path"));
            }
            "--results-out" => {
                cli.results_out = Some(flag_value(&args, &mut i, "--results-out", "path"));
            }
            "--json-out" => cli.json_out = Some(flag_value(&args, &mut i, "--json-out", "path")),
            "--seed" => {
                let raw = flag_value(&args, &mut i, "--seed", "u64");
                if let Ok(s) = raw.parse::<u64>() {
                    cli.seed_override = Some(s);
                } else {
                    eprintln!("error: --seed value \"{raw}\" is not a valid u64");
                    process::exit(1);
                }
            }
            other => {
                eprintln!("error: unknown argument \"{other}\"");
                print_help();
                process::exit(1);
            }
        }
        i += 1;
    }

    cli
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = parse_args();

    // --config takes priority, then --preset, then the aeo default
    let mut config = if let Some(ref path) = cli.config_path {
        match RunConfig::from_toml_file(Path::new(path)) {
            Ok(cfg) => cfg,
            Err(e) => {
                eprintln!("{e}");
                process::exit(1);
            }
        }
    } else if let Some(ref name) = cli.preset {
        match RunConfig::from_preset(name) {
            Ok(cfg) => cfg,
            Err(e) => {
                eprintln!("{e}");
                process::exit(1);
            }
        }
    } else {
        RunConfig::aeo()
    };

    if let Some(seed) = cli.seed_override {
        config.sample.seed = seed;
    }

    let errors = config.validate();
    if !errors.is_empty() {
        for e in &errors {
            eprintln!("{e}");
        }
        process::exit(1);
    }

    let measures = match cli.measures_path {
        Some(ref path) => input::from_json_file(Path::new(path)),
        None => sample_portfolio(&config),
    };
    let measures = measures.unwrap_or_else(|e| {
        eprintln!("error: {e}");
        process::exit(1);
    });
    tracing::info!(measures = measures.len(), "measures loaded");

    let results = match Engine::new(config, measures).and_then(Engine::run) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("error: {e}");
            process::exit(1);
        }
    };

    println!("{}", PortfolioReport::from_results(&results));

    if let Some(ref path) = cli.results_out {
        if let Err(e) = export_csv(&results, Path::new(path)) {
            eprintln!("error: failed to write CSV: {e}");
            process::exit(1);
        }
        eprintln!("Results written to {path}");
    }
    if let Some(ref path) = cli.json_out {
        if let Err(e) = export_json(&results, Path::new(path)) {
            eprintln!("error: failed to write JSON: {e}");
            process::exit(1);
        }
        eprintln!("Results written to {path}");
    }
}
