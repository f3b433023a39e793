//! Routing policies for QueueSim.
//!
//! This crate provides the [`RoutingPolicy`] trait that decides which server
//! an arrival joins, and the [`RandomStream`] trait through which every random
//! draw of a simulation flows.
//!
//! | Policy | Strategy |
//! |--------|----------|
//! | [`ProbabilisticRouting`] | Independent categorical draw per arrival |

pub mod probabilistic;
pub mod traits;

pub use probabilistic::ProbabilisticRouting;
pub use traits::*;

/// Create a routing policy by name over the given distribution.
pub fn policy_by_name(
    name: &str,
    probabilities: Vec<f64>,
) -> Option<Result<Box<dyn RoutingPolicy>, RoutingError>> {
    match name {
        "probabilistic" => Some(
            ProbabilisticRouting::new(probabilities).map(|p| Box::new(p) as Box<dyn RoutingPolicy>),
        ),
        _ => None,
    }
}

/// List all available built-in policy names.
pub fn available_policies() -> Vec<&'static str> {
    vec!["probabilistic"]
}
