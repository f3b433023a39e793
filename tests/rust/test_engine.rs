/// Integration tests for the simulation engine.
use queuesim_core::config::SimConfig;
use queuesim_core::engine::{SimEvent, SimulationEngine};
use queuesim_core::server::{Admission, ServerState};

fn network_config() -> SimConfig {
    SimConfig::from_str(
        r#"
[simulation]
name = "integration-test"
seed = 42
horizon = 500.0

[arrivals]
rate = 3.0

[[servers]]
routing_probability = 0.5
capacity = 3
service_rate = 1.5

[[servers]]
routing_probability = 0.3
capacity = 1
service_rate = 1.0

[[servers]]
routing_probability = 0.2
capacity = 10
service_rate = 0.8
"#,
    )
    .unwrap()
}

#[test]
fn test_counters_stay_consistent_every_step() {
    let mut engine = SimulationEngine::new(network_config()).unwrap();
    let mut last_clock = engine.now();
    let mut last_wait_area = 0.0;
    let mut last_sojourn_area = 0.0;
    let mut last_total = 0;
    let mut last_dropped = 0;

    while !engine.is_finished() {
        engine.advance();
        let snap = engine.snapshot();

        let held: u64 = snap.servers.iter().map(|s| s.queue_length as u64).sum();
        let waiting: u64 = snap
            .servers
            .iter()
            .map(|s| s.queue_length.saturating_sub(1) as u64)
            .sum();
        assert_eq!(snap.num_in_system, held);
        assert_eq!(snap.num_waiting, waiting);
        assert!(snap.num_waiting <= snap.num_in_system);
        assert!(snap.num_dropped <= snap.total_requests);

        for s in &snap.servers {
            assert!(s.queue_length <= s.capacity);
            match s.next_completion_time {
                Some(t) => {
                    assert!(s.queue_length > 0);
                    assert!(t >= snap.clock);
                }
                None => assert_eq!(s.queue_length, 0),
            }
        }

        assert!(snap.clock >= last_clock);
        assert!(snap.total_wait_time_integral >= last_wait_area);
        assert!(snap.total_sojourn_time_integral >= last_sojourn_area);
        assert!(snap.total_wait_time_integral <= snap.total_sojourn_time_integral);
        assert!(snap.total_requests >= last_total);
        assert!(snap.num_dropped >= last_dropped);
        last_clock = snap.clock;
        last_wait_area = snap.total_wait_time_integral;
        last_sojourn_area = snap.total_sojourn_time_integral;
        last_total = snap.total_requests;
        last_dropped = snap.num_dropped;
    }

    let results = engine.results().unwrap();
    assert!(results.end_time >= 500.0);
    assert!(results.total_requests > 1_000);
    assert!(engine.servers().iter().all(ServerState::is_idle));
}

#[test]
fn test_admission_follows_capacity() {
    let mut engine = SimulationEngine::new(network_config()).unwrap();
    while !engine.is_finished() {
        let before: Vec<u32> = engine.servers().iter().map(|s| s.queue_length()).collect();
        let step = engine.advance();
        for event in &step.events {
            if let SimEvent::Arrival { server, admission } = *event {
                let cap = engine.servers()[server].capacity();
                match admission {
                    Admission::Dropped => assert_eq!(before[server], cap),
                    Admission::StartedService => assert_eq!(before[server], 0),
                    Admission::Queued => {
                        assert!(before[server] > 0 && before[server] < cap)
                    }
                }
            }
        }
    }
}

#[test]
fn test_no_arrivals_admitted_after_horizon() {
    let mut engine = SimulationEngine::new(network_config()).unwrap();
    while !engine.is_finished() {
        let step = engine.advance();
        for event in &step.events {
            if matches!(event, SimEvent::Arrival { .. }) {
                assert!(step.time < 500.0);
            }
        }
    }
}

#[test]
fn test_every_accepted_job_completes() {
    let mut engine = SimulationEngine::new(network_config()).unwrap();
    let results = engine.run();
    let completed: u64 = results.per_server.iter().map(|s| s.completed).sum();
    let accepted: u64 = results.per_server.iter().map(|s| s.accepted).sum();
    let dropped: u64 = results.per_server.iter().map(|s| s.dropped).sum();
    assert_eq!(completed, results.accepted_requests);
    assert_eq!(accepted, results.accepted_requests);
    assert_eq!(dropped, results.num_dropped);
    assert_eq!(
        results.events_processed,
        results.total_requests + results.accepted_requests
    );
}

#[test]
fn test_run_is_deterministic_per_seed() {
    let a = queuesim_core::run_simulation(network_config()).unwrap();
    let b = queuesim_core::run_simulation(network_config()).unwrap();
    assert_eq!(a, b);

    let c = queuesim_core::run_simulation(network_config().with_seed(7)).unwrap();
    assert_ne!(a, c);
}

#[test]
fn test_single_slot_server_never_queues() {
    let mut engine = SimulationEngine::new(network_config()).unwrap();
    while !engine.is_finished() {
        engine.advance();
        assert!(engine.servers()[1].waiting() == 0);
    }
}
