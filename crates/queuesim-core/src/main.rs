//! QueueSim CLI — Simulate open networks of finite-capacity queues.

use clap::{Parser, Subcommand};
use queuesim_core::config::SimConfig;
use queuesim_core::engine::SimulationEngine;
use queuesim_core::metrics::{self, ReplicationSummary};
use queuesim_core::random::SeededStream;
use queuesim_core::theory;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "queuesim",
    about = "Simulate open networks of finite-capacity queues",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a single simulation from a TOML config.
    Run {
        /// Path to TOML configuration file.
        #[arg(short, long)]
        config: PathBuf,
        /// Override the config seed.
        #[arg(short, long)]
        seed: Option<u64>,
        /// Routing policy name.
        #[arg(short, long, default_value = "probabilistic")]
        routing: String,
        /// Output results to JSON file.
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Print the final engine state.
        #[arg(long)]
        snapshot: bool,
    },
    /// Run from positional arguments and print the one-line result:
    /// `horizon N p_1..p_N lambda cap_1..cap_N mu_1..mu_N`.
    Legacy {
        /// Positional parameters.
        #[arg(required = true, num_args = 1..)]
        args: Vec<String>,
        /// Random seed.
        #[arg(short, long)]
        seed: Option<u64>,
    },
    /// Run independent replications in parallel and summarize them.
    Replicate {
        /// Path to TOML configuration file.
        #[arg(short, long)]
        config: PathBuf,
        /// Number of replications.
        #[arg(short = 'n', long, default_value = "10")]
        runs: usize,
        /// Seed of the first replication; the others follow consecutively.
        #[arg(long)]
        base_seed: Option<u64>,
        /// Output results to JSON file.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Print the analytic M/M/1/K reference for a config.
    Theory {
        /// Path to TOML configuration file.
        #[arg(short, long)]
        config: PathBuf,
    },
    /// List available routing policies.
    ListPolicies,
}

#[derive(Serialize)]
struct ReplicationOutput<'a> {
    summary: &'a ReplicationSummary,
    runs: &'a [metrics::SimulationResults],
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("warn,queuesim_core=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            config,
            seed,
            routing,
            output,
            snapshot,
        } => {
            let mut sim_config = load_config(&config);
            if let Some(seed) = seed {
                sim_config = sim_config.with_seed(seed);
            }

            let policy = queuesim_routing::policy_by_name(
                &routing,
                sim_config.routing_probabilities(),
            )
            .unwrap_or_else(|| {
                eprintln!(
                    "Unknown routing policy: {}. Available: {:?}",
                    routing,
                    queuesim_routing::available_policies()
                );
                std::process::exit(1);
            })
            .unwrap_or_else(|e| {
                eprintln!("Error building routing policy: {}", e);
                std::process::exit(1);
            });

            let stream = Box::new(SeededStream::new(sim_config.seed()));
            let mut engine =
                SimulationEngine::with_routing(sim_config, policy, stream).unwrap_or_else(|e| {
                    eprintln!("Error creating engine: {}", e);
                    std::process::exit(1);
                });
            let result = engine.run();
            println!("{}", metrics::format_table(&result));
            if snapshot {
                print!("{}", engine.snapshot());
            }

            if let Some(output_path) = output {
                write_json(&output_path, &result);
            }
        }
        Commands::Legacy { args, seed } => {
            let mut sim_config = SimConfig::from_positional(args.as_slice()).unwrap_or_else(|e| {
                eprintln!("Error parsing arguments: {}", e);
                std::process::exit(1);
            });
            if let Some(seed) = seed {
                sim_config = sim_config.with_seed(seed);
            }
            let result = queuesim_core::run_simulation(sim_config).unwrap_or_else(|e| {
                eprintln!("Error running simulation: {}", e);
                std::process::exit(1);
            });
            println!("{}", metrics::format_legacy_line(&result));
        }
        Commands::Replicate {
            config,
            runs,
            base_seed,
            output,
        } => {
            let sim_config = load_config(&config);
            let seeds =
                queuesim_core::replication_seeds(base_seed.unwrap_or(sim_config.seed()), runs);
            let results =
                queuesim_core::run_replications(&sim_config, &seeds).unwrap_or_else(|e| {
                    eprintln!("Error running replications: {}", e);
                    std::process::exit(1);
                });
            let summary = ReplicationSummary::from_runs(sim_config.name(), &results);
            println!("{}", metrics::format_replication_table(&summary));

            if let Some(output_path) = output {
                write_json(
                    &output_path,
                    &ReplicationOutput {
                        summary: &summary,
                        runs: &results,
                    },
                );
            }
        }
        Commands::Theory { config } => {
            let sim_config = load_config(&config);
            let reference = theory::network_reference(&sim_config);
            println!(
                "{}",
                theory::format_reference_table(sim_config.name(), &reference)
            );
        }
        Commands::ListPolicies => {
            println!("Available routing policies:");
            for name in queuesim_routing::available_policies() {
                println!("  - {}", name);
            }
        }
    }
}

fn load_config(path: &Path) -> SimConfig {
    SimConfig::from_file(path).unwrap_or_else(|e| {
        eprintln!("Error loading config: {}", e);
        std::process::exit(1);
    })
}

fn write_json<T: Serialize>(path: &Path, value: &T) {
    let json = serde_json::to_string_pretty(value).unwrap_or_else(|e| {
        eprintln!("Error serializing results: {}", e);
        std::process::exit(1);
    });
    std::fs::write(path, json).unwrap_or_else(|e| {
        eprintln!("Error writing output: {}", e);
        std::process::exit(1);
    });
    println!("Results written to {}", path.display());
}
