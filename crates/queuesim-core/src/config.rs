//! TOML configuration parsing for QueueSim.
//!
//! Defines the configuration schema of a run: horizon and seed, the external
//! arrival process, and one entry per server with its routing probability,
//! capacity and service rate. Every constructor validates the result.

use queuesim_routing::validate_distribution;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
}

/// Top-level simulation configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimConfig {
    pub simulation: SimulationSection,
    pub arrivals: ArrivalSection,
    pub servers: Vec<ServerSection>,
}

/// General simulation parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationSection {
    /// Human-readable name for this simulation.
    #[serde(default = "default_sim_name")]
    pub name: String,
    /// Random seed for reproducibility.
    #[serde(default = "default_seed")]
    pub seed: u64,
    /// Simulated time after which no new arrivals are admitted.
    pub horizon: f64,
}

fn default_sim_name() -> String {
    "simulation".to_string()
}

fn default_seed() -> u64 {
    42
}

/// External arrival process.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArrivalSection {
    /// Poisson arrival rate (lambda).
    pub rate: f64,
}

/// One single-server queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSection {
    /// Probability that an arrival is routed here.
    pub routing_probability: f64,
    /// Maximum jobs held, including the one in service.
    pub capacity: u32,
    /// Exponential service rate (mu).
    pub service_rate: f64,
}

impl SimConfig {
    /// Build a validated configuration from per-server arrays.
    pub fn new(
        horizon: f64,
        arrival_rate: f64,
        routing_probabilities: Vec<f64>,
        queue_capacity: Vec<u32>,
        service_rates: Vec<f64>,
    ) -> Result<Self, ConfigError> {
        let n = routing_probabilities.len();
        if queue_capacity.len() != n || service_rates.len() != n {
            return Err(ConfigError::InvalidConfiguration(format!(
                "per-server arrays must have equal length: routing={}, capacity={}, service={}",
                n,
                queue_capacity.len(),
                service_rates.len(),
            )));
        }
        let servers = routing_probabilities
            .into_iter()
            .zip(queue_capacity)
            .zip(service_rates)
            .map(
                |((routing_probability, capacity), service_rate)| ServerSection {
                    routing_probability,
                    capacity,
                    service_rate,
                },
            )
            .collect();
        let config = SimConfig {
            simulation: SimulationSection {
                name: default_sim_name(),
                seed: default_seed(),
                horizon,
            },
            arrivals: ArrivalSection { rate: arrival_rate },
            servers,
        };
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Parse configuration from a TOML string.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Result<Self, ConfigError> {
        let config: SimConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse the positional command line
    /// `horizon N p_1..p_N lambda cap_1..cap_N mu_1..mu_N`.
    pub fn from_positional<S: AsRef<str>>(args: &[S]) -> Result<Self, ConfigError> {
        let mut cursor = PositionalArgs::new(args);
        let horizon: f64 = cursor.next("horizon")?;
        let n: usize = cursor.next("num_servers")?;
        if n == 0 {
            return Err(ConfigError::InvalidConfiguration(
                "num_servers must be > 0".to_string(),
            ));
        }
        let routing = (0..n)
            .map(|i| cursor.next(&format!("routing_probability[{}]", i)))
            .collect::<Result<Vec<f64>, _>>()?;
        let arrival_rate: f64 = cursor.next("arrival_rate")?;
        let capacity = (0..n)
            .map(|i| cursor.next(&format!("capacity[{}]", i)))
            .collect::<Result<Vec<u32>, _>>()?;
        let service = (0..n)
            .map(|i| cursor.next(&format!("service_rate[{}]", i)))
            .collect::<Result<Vec<f64>, _>>()?;
        cursor.finish()?;
        Self::new(horizon, arrival_rate, routing, capacity, service)
    }

    /// Set the random seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.simulation.seed = seed;
        self
    }

    /// Set the report name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.simulation.name = name.into();
        self
    }

    /// Validate configuration consistency.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let horizon = self.simulation.horizon;
        if !horizon.is_finite() || horizon <= 0.0 {
            return Err(ConfigError::InvalidConfiguration(format!(
                "horizon must be finite and > 0, got {}",
                horizon
            )));
        }
        let rate = self.arrivals.rate;
        if !has_finite_mean(rate) {
            return Err(ConfigError::InvalidConfiguration(format!(
                "arrival rate must be > 0 with a finite mean 1/rate, got {}",
                rate
            )));
        }
        if self.servers.is_empty() {
            return Err(ConfigError::InvalidConfiguration(
                "at least one server is required".to_string(),
            ));
        }
        for (i, server) in self.servers.iter().enumerate() {
            if server.capacity == 0 {
                return Err(ConfigError::InvalidConfiguration(format!(
                    "servers[{}].capacity must be > 0",
                    i
                )));
            }
            if !has_finite_mean(server.service_rate) {
                return Err(ConfigError::InvalidConfiguration(format!(
                    "servers[{}].service_rate must be > 0 with a finite mean 1/rate, got {}",
                    i, server.service_rate
                )));
            }
        }
        validate_distribution(&self.routing_probabilities())
            .map_err(|e| ConfigError::InvalidConfiguration(e.to_string()))?;
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.simulation.name
    }

    pub fn seed(&self) -> u64 {
        self.simulation.seed
    }

    pub fn horizon(&self) -> f64 {
        self.simulation.horizon
    }

    pub fn arrival_rate(&self) -> f64 {
        self.arrivals.rate
    }

    pub fn num_servers(&self) -> usize {
        self.servers.len()
    }

    pub fn routing_probabilities(&self) -> Vec<f64> {
        self.servers.iter().map(|s| s.routing_probability).collect()
    }

    pub fn queue_capacity(&self) -> Vec<u32> {
        self.servers.iter().map(|s| s.capacity).collect()
    }

    pub fn service_rates(&self) -> Vec<f64> {
        self.servers.iter().map(|s| s.service_rate).collect()
    }
}

/// Exponential rate usable for sampling: positive, finite, and with a
/// representable mean.
fn has_finite_mean(rate: f64) -> bool {
    rate.is_finite() && rate > 0.0 && (1.0 / rate).is_finite()
}

/// Cursor over positional arguments with per-field error messages.
struct PositionalArgs<'a, S> {
    args: &'a [S],
    pos: usize,
}

impl<'a, S: AsRef<str>> PositionalArgs<'a, S> {
    fn new(args: &'a [S]) -> Self {
        Self { args, pos: 0 }
    }

    fn next<T: std::str::FromStr>(&mut self, field: &str) -> Result<T, ConfigError> {
        let raw: &str = match self.args.get(self.pos) {
            Some(arg) => arg.as_ref(),
            None => {
                return Err(ConfigError::InvalidConfiguration(format!(
                    "missing argument {} at position {}",
                    field,
                    self.pos + 1
                )))
            }
        };
        self.pos += 1;
        raw.trim().parse().map_err(|_| {
            ConfigError::InvalidConfiguration(format!("cannot parse {} from {:?}", field, raw))
        })
    }

    fn finish(&self) -> Result<(), ConfigError> {
        if self.pos < self.args.len() {
            return Err(ConfigError::InvalidConfiguration(format!(
                "{} unexpected trailing argument(s)",
                self.args.len() - self.pos
            )));
        }
        Ok(())
    }
}
