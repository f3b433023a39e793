//! QueueSim — Discrete-event simulator for open networks of finite queues.
//!
//! Poisson arrivals are routed probabilistically to independent single-server
//! queues with exponential service and finite capacity. Arrivals that find
//! their queue full are dropped. The engine runs to a time horizon, stops
//! admitting arrivals, drains the queues, and reports wait and sojourn
//! statistics of the accepted jobs.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────┐     ┌───────────┐     ┌──────────────┐
//! │ Arrivals │────▶│  Engine   │────▶│   Metrics    │
//! │ (Poisson)│     │  (Clock)  │     │ (Integrals)  │
//! └──────────┘     └─────┬─────┘     └──────────────┘
//!                        │
//!                ┌───────┴───────┐
//!                │    Routing    │
//!                │ (Categorical) │
//!                └───────┬───────┘
//!                        │
//!          ┌─────────────┼─────────────┐
//!          ▼             ▼             ▼
//!    ┌──────────┐  ┌──────────┐  ┌──────────┐
//!    │ Server 0 │  │ Server 1 │  │ Server N │
//!    │ cap K_0  │  │ cap K_1  │  │ cap K_N  │
//!    └──────────┘  └──────────┘  └──────────┘
//! ```
//!
//! Every random draw goes through one [`RandomStream`], so a run is fully
//! determined by its config and seed.

pub mod arrivals;
pub mod clock;
pub mod config;
pub mod engine;
pub mod metrics;
pub mod random;
pub mod server;
pub mod theory;

use rayon::prelude::*;

// Re-export key types for convenience.
pub use arrivals::ArrivalSource;
pub use clock::SimClock;
pub use config::{ConfigError, SimConfig};
pub use engine::{EngineSnapshot, SimError, SimEvent, SimulationEngine, StepOutcome};
pub use metrics::{MetricsError, ReplicationSummary, SimulationResults};
pub use queuesim_routing::{RandomStream, RoutingPolicy};
pub use random::{Draw, ScriptedStream, SeededStream};
pub use server::{Admission, Completion, ServerPhase, ServerState};

/// Run a complete simulation with the given config.
pub fn run_simulation(config: SimConfig) -> Result<SimulationResults, SimError> {
    let mut engine = SimulationEngine::new(config)?;
    Ok(engine.run())
}

/// Run one independent replication per seed, in parallel.
///
/// Results come back in seed order, and each equals
/// `run_simulation(config.with_seed(seed))`.
pub fn run_replications(
    config: &SimConfig,
    seeds: &[u64],
) -> Result<Vec<SimulationResults>, SimError> {
    config.validate()?;
    seeds
        .par_iter()
        .map(|&seed| run_simulation(config.clone().with_seed(seed)))
        .collect()
}

/// Consecutive seeds starting at `base_seed`.
pub fn replication_seeds(base_seed: u64, runs: usize) -> Vec<u64> {
    (0..runs as u64).map(|i| base_seed.wrapping_add(i)).collect()
}
