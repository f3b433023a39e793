//! Routing policy and random stream trait definitions.
//!
//! The engine never touches a random number generator directly. Every draw
//! goes through a [`RandomStream`], so a run is reproducible from its seed and
//! tests can substitute a scripted sequence of draws.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Maximum allowed deviation of a routing distribution's sum from 1.0.
pub const DISTRIBUTION_TOLERANCE: f64 = 1e-6;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RoutingError {
    #[error("Invalid routing distribution: {reason}")]
    InvalidDistribution { reason: String },
}

/// A single logical stream of random draws.
///
/// Implementations must consume randomness in call order only, so that two
/// streams built from the same seed yield identical simulations.
pub trait RandomStream {
    /// Sample from an exponential distribution with the given rate (mean `1 / rate`).
    fn exponential(&mut self, rate: f64) -> f64;

    /// Draw an index in `[0, probabilities.len())`, index `i` with probability
    /// `probabilities[i]`. Consumes exactly one unit of randomness.
    fn categorical(&mut self, probabilities: &[f64]) -> usize;
}

impl<S: RandomStream + ?Sized> RandomStream for Box<S> {
    fn exponential(&mut self, rate: f64) -> f64 {
        (**self).exponential(rate)
    }

    fn categorical(&mut self, probabilities: &[f64]) -> usize {
        (**self).categorical(probabilities)
    }
}

/// Summary of how a policy spreads traffic, for reports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutingSummary {
    pub name: String,
    pub probabilities: Vec<f64>,
}

/// Maps each arrival to the server it should join.
///
/// The policy is fixed for the whole run; the engine calls [`choose_server`]
/// exactly once per arrival, before admission is checked.
///
/// [`choose_server`]: RoutingPolicy::choose_server
pub trait RoutingPolicy: Send + Sync {
    /// Pick a target server index in `[0, num_servers())`.
    ///
    /// Returning an index outside that range is a contract violation; the
    /// engine panics on it rather than routing to a server that does not exist.
    fn choose_server(&mut self, stream: &mut dyn RandomStream) -> usize;

    /// Number of servers this policy routes across.
    fn num_servers(&self) -> usize;

    /// Human-readable name for reports.
    fn name(&self) -> &str;

    /// Long-run share of traffic each server receives.
    fn summary(&self) -> RoutingSummary;
}

/// Check that `probabilities` is a usable categorical distribution.
pub fn validate_distribution(probabilities: &[f64]) -> Result<(), RoutingError> {
    if probabilities.is_empty() {
        return Err(RoutingError::InvalidDistribution {
            reason: "distribution is empty".to_string(),
        });
    }
    if let Some((i, p)) = probabilities
        .iter()
        .enumerate()
        .find(|(_, p)| !p.is_finite() || **p < 0.0)
    {
        return Err(RoutingError::InvalidDistribution {
            reason: format!("probability[{}] = {} is negative or not finite", i, p),
        });
    }
    let sum: f64 = probabilities.iter().sum();
    if (sum - 1.0).abs() > DISTRIBUTION_TOLERANCE {
        return Err(RoutingError::InvalidDistribution {
            reason: format!("probabilities sum to {}, expected 1", sum),
        });
    }
    Ok(())
}

/// Map a uniform sample `u` in `[0, 1)` onto a categorical distribution by
/// inverse CDF. Zero-probability entries are never selected; rounding slack
/// at the top end falls to the last entry with positive probability.
pub fn categorical_index(probabilities: &[f64], u: f64) -> usize {
    let mut cumulative = 0.0;
    for (i, &p) in probabilities.iter().enumerate() {
        cumulative += p;
        if u < cumulative {
            return i;
        }
    }
    probabilities
        .iter()
        .rposition(|&p| p > 0.0)
        .unwrap_or(0)
}
