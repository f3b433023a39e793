//! Probabilistic (categorical) routing.
//!
//! Each arrival independently joins server `i` with a fixed probability
//! `p_i`. This is the classic Bernoulli splitting of a Poisson stream: every
//! server sees its own Poisson arrivals with rate `lambda * p_i`.

use crate::traits::*;

/// Routes arrivals by a single categorical draw over a fixed distribution.
#[derive(Debug, Clone)]
pub struct ProbabilisticRouting {
    probabilities: Vec<f64>,
}

impl ProbabilisticRouting {
    /// Build a policy from per-server probabilities.
    ///
    /// The distribution is used as given; it is not re-normalized.
    pub fn new(probabilities: Vec<f64>) -> Result<Self, RoutingError> {
        validate_distribution(&probabilities)?;
        Ok(Self { probabilities })
    }

    /// Spread traffic evenly over `num_servers` servers.
    pub fn uniform(num_servers: usize) -> Result<Self, RoutingError> {
        if num_servers == 0 {
            return Err(RoutingError::InvalidDistribution {
                reason: "distribution is empty".to_string(),
            });
        }
        Self::new(vec![1.0 / num_servers as f64; num_servers])
    }

    pub fn probabilities(&self) -> &[f64] {
        &self.probabilities
    }
}

impl RoutingPolicy for ProbabilisticRouting {
    fn choose_server(&mut self, stream: &mut dyn RandomStream) -> usize {
        stream.categorical(&self.probabilities)
    }

    fn num_servers(&self) -> usize {
        self.probabilities.len()
    }

    fn name(&self) -> &str {
        "probabilistic"
    }

    fn summary(&self) -> RoutingSummary {
        RoutingSummary {
            name: self.name().to_string(),
            probabilities: self.probabilities.clone(),
        }
    }
}
