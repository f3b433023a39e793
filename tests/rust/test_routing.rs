/// Integration tests for routing policies in a simulation context.
use queuesim_core::config::SimConfig;
use queuesim_core::engine::{SimEvent, SimulationEngine};
use queuesim_core::random::SeededStream;
use queuesim_routing::*;

fn pair_config(routing: Vec<f64>) -> SimConfig {
    SimConfig::new(2_000.0, 2.0, routing, vec![4, 4], vec![1.5, 1.5]).unwrap()
}

/// Policy that sends everything to the last server without drawing.
struct LastServer {
    n: usize,
}

impl RoutingPolicy for LastServer {
    fn choose_server(&mut self, _stream: &mut dyn RandomStream) -> usize {
        self.n - 1
    }

    fn num_servers(&self) -> usize {
        self.n
    }

    fn name(&self) -> &str {
        "last_server"
    }

    fn summary(&self) -> RoutingSummary {
        let mut probabilities = vec![0.0; self.n];
        probabilities[self.n - 1] = 1.0;
        RoutingSummary {
            name: self.name().to_string(),
            probabilities,
        }
    }
}

#[test]
fn test_zero_probability_server_never_receives() {
    let results = queuesim_core::run_simulation(pair_config(vec![1.0, 0.0])).unwrap();
    assert!(results.total_requests > 0);
    assert_eq!(results.per_server[1].accepted, 0);
    assert_eq!(results.per_server[1].dropped, 0);
    assert_eq!(results.per_server[1].completed, 0);
    assert_eq!(results.per_server[1].utilization, 0.0);
    assert_eq!(results.per_server[0].accepted, results.accepted_requests);
    assert_eq!(results.routing.probabilities, vec![1.0, 0.0]);
}

#[test]
fn test_named_policies_keep_configured_distribution() {
    let config = pair_config(vec![1.0, 0.0]);
    assert!(policy_by_name("uniform", config.routing_probabilities()).is_none());
    for name in available_policies() {
        let policy = policy_by_name(name, config.routing_probabilities())
            .unwrap()
            .unwrap();
        let stream = Box::new(SeededStream::new(3));
        let mut engine = SimulationEngine::with_routing(config.clone(), policy, stream).unwrap();
        let results = engine.run();
        assert_eq!(results.per_server[1].accepted, 0);
        assert_eq!(results.per_server[1].dropped, 0);
    }
}

#[test]
fn test_routing_frequencies_follow_distribution() {
    let mut engine = SimulationEngine::new(pair_config(vec![0.25, 0.75])).unwrap();
    let mut counts = [0u64; 2];
    while !engine.is_finished() {
        for event in engine.advance().events {
            if let SimEvent::Arrival { server, .. } = event {
                counts[server] += 1;
            }
        }
    }
    let total = (counts[0] + counts[1]) as f64;
    let share = counts[0] as f64 / total;
    assert!((share - 0.25).abs() < 0.03, "share = {}", share);
}

#[test]
fn test_custom_policy_plugs_into_engine() {
    let config = pair_config(vec![0.5, 0.5]);
    let stream = Box::new(SeededStream::new(config.seed()));
    let mut engine =
        SimulationEngine::with_routing(config, Box::new(LastServer { n: 2 }), stream).unwrap();
    let results = engine.run();
    assert_eq!(results.routing.name, "last_server");
    assert_eq!(results.per_server[0].accepted, 0);
    assert!(results.per_server[1].accepted > 0);
}

#[test]
fn test_policy_by_name_builds_engine_policies() {
    for name in available_policies() {
        let policy = policy_by_name(name, vec![0.5, 0.5]).unwrap().unwrap();
        let config = pair_config(vec![0.5, 0.5]);
        let stream = Box::new(SeededStream::new(1));
        let mut engine = SimulationEngine::with_routing(config, policy, stream).unwrap();
        assert!(engine.run().total_requests > 0);
    }
}

#[test]
fn test_invalid_distribution_rejected_by_config() {
    assert!(SimConfig::new(10.0, 1.0, vec![0.6, 0.6], vec![1, 1], vec![1.0, 1.0]).is_err());
    assert!(SimConfig::new(10.0, 1.0, vec![-0.5, 1.5], vec![1, 1], vec![1.0, 1.0]).is_err());
    assert!(SimConfig::new(10.0, 1.0, vec![0.5, 0.5 + 1e-9], vec![1, 1], vec![1.0, 1.0]).is_ok());
}

#[test]
fn test_probabilistic_summary_reports_weights() {
    let policy = ProbabilisticRouting::new(vec![0.2, 0.8]).unwrap();
    let summary = policy.summary();
    assert_eq!(summary.name, "probabilistic");
    assert_eq!(summary.probabilities, vec![0.2, 0.8]);
}
