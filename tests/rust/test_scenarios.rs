/// End-to-end scenarios checked against known queueing results.
use queuesim_core::config::SimConfig;
use queuesim_core::metrics::{self, ReplicationSummary};
use queuesim_core::theory;

fn single_server(horizon: f64, lambda: f64, capacity: u32, mu: f64) -> SimConfig {
    SimConfig::new(horizon, lambda, vec![1.0], vec![capacity], vec![mu]).unwrap()
}

#[test]
fn test_light_load_single_server() {
    let config = single_server(1_000.0, 0.1, 1_000_000, 1.0);
    let results = queuesim_core::run_simulation(config).unwrap();

    assert!(
        (60..=140).contains(&results.total_requests),
        "total = {}",
        results.total_requests
    );
    assert_eq!(results.num_dropped, 0);
    assert!(results.end_time >= 1_000.0);

    let wait = results.mean_wait().unwrap();
    let sojourn = results.mean_sojourn().unwrap();
    assert!(wait >= 0.0);
    // Sojourn minus wait is the sample mean service time.
    assert!(
        (sojourn - wait - 1.0).abs() < 0.4,
        "wait = {}, sojourn = {}",
        wait,
        sojourn
    );
}

#[test]
fn test_single_slot_saturation_matches_erlang_loss() {
    let config = single_server(5_000.0, 10.0, 1, 1.0);
    let results = queuesim_core::run_simulation(config.clone()).unwrap();

    let expected = theory::mm1k(10.0, 1.0, 1).blocking_probability;
    let drop_rate = results.drop_rate.unwrap();
    assert!(
        (drop_rate - expected).abs() < 0.02,
        "drop rate {} vs {}",
        drop_rate,
        expected
    );
    // A single slot never holds a waiting job.
    assert_eq!(results.mean_wait_time, Some(0.0));
}

#[test]
fn test_finite_queue_sojourn_matches_mm1k() {
    let config = single_server(20_000.0, 0.5, 5, 1.0);
    let reference = theory::network_reference(&config);
    let results = queuesim_core::run_simulation(config).unwrap();

    let expected = reference.mean_sojourn_time.unwrap();
    let observed = results.mean_sojourn().unwrap();
    assert!(
        (observed - expected).abs() / expected < 0.1,
        "sojourn {} vs {}",
        observed,
        expected
    );
    let drop_rate = results.drop_rate.unwrap();
    assert!(
        (drop_rate - reference.drop_probability).abs() < 0.01,
        "drop rate {} vs {}",
        drop_rate,
        reference.drop_probability
    );
}

#[test]
fn test_split_network_matches_reference() {
    let config = SimConfig::new(
        20_000.0,
        2.0,
        vec![0.5, 0.5],
        vec![2, 2],
        vec![1.5, 1.5],
    )
    .unwrap();
    let reference = theory::network_reference(&config);
    let results = queuesim_core::run_simulation(config).unwrap();

    let drop_rate = results.drop_rate.unwrap();
    assert!(
        (drop_rate - reference.drop_probability).abs() < 0.02,
        "drop rate {} vs {}",
        drop_rate,
        reference.drop_probability
    );
    for (report, expected) in results.per_server.iter().zip(&reference.servers) {
        assert!(
            (report.utilization - expected.utilization).abs() < 0.03,
            "server {} utilization {} vs {}",
            report.id,
            report.utilization,
            expected.utilization
        );
    }
}

#[test]
fn test_tiny_rate_accepts_nothing() {
    let config = single_server(1.0, 1e-9, 1, 1.0);
    let results = queuesim_core::run_simulation(config).unwrap();

    assert_eq!(results.total_requests, 0);
    assert_eq!(results.num_dropped, 0);
    assert!(results.end_time > 1.0);
    assert_eq!(results.mean_wait_time, None);
    assert_eq!(results.mean_sojourn_time, None);
    assert!(results.mean_wait().is_err());

    let line = metrics::format_legacy_line(&results);
    assert!(line.starts_with("0 0 "));
    assert!(line.ends_with("undefined undefined"));
}

#[test]
fn test_replications_equal_sequential_runs() {
    let config = single_server(200.0, 0.9, 4, 1.0);
    let seeds = queuesim_core::replication_seeds(100, 6);
    assert_eq!(seeds, vec![100, 101, 102, 103, 104, 105]);

    let parallel = queuesim_core::run_replications(&config, &seeds).unwrap();
    assert_eq!(parallel.len(), seeds.len());
    for (seed, result) in seeds.iter().zip(&parallel) {
        let sequential =
            queuesim_core::run_simulation(config.clone().with_seed(*seed)).unwrap();
        assert_eq!(result, &sequential);
        assert_eq!(result.seed, *seed);
    }

    let summary = ReplicationSummary::from_runs(config.name(), &parallel);
    assert_eq!(summary.runs, 6);
    assert_eq!(summary.mean_sojourn_time.as_ref().unwrap().samples, 6);
    assert!(metrics::format_replication_table(&summary).contains("Replications (6)"));
}

#[test]
fn test_positional_arguments_drive_same_run() {
    let args = ["100", "2", "0.5", "0.5", "1.5", "3", "3", "1.0", "2.0"];
    let from_args = SimConfig::from_positional(&args[..]).unwrap();
    let built = SimConfig::new(100.0, 1.5, vec![0.5, 0.5], vec![3, 3], vec![1.0, 2.0]).unwrap();
    assert_eq!(
        queuesim_core::run_simulation(from_args).unwrap(),
        queuesim_core::run_simulation(built).unwrap()
    );
}

#[test]
fn test_config_file_round_trip_through_engine() {
    let path = std::env::temp_dir().join(format!("queuesim-scenario-{}.toml", std::process::id()));
    std::fs::write(
        &path,
        r#"
[simulation]
name = "from-file"
horizon = 50.0

[arrivals]
rate = 1.0

[[servers]]
routing_probability = 1.0
capacity = 2
service_rate = 2.0
"#,
    )
    .unwrap();

    let config = SimConfig::from_file(&path).unwrap();
    std::fs::remove_file(&path).ok();

    assert_eq!(config.name(), "from-file");
    assert_eq!(config.seed(), 42);
    let results = queuesim_core::run_simulation(config).unwrap();
    assert_eq!(results.name, "from-file");
    assert!(metrics::format_table(&results).contains("from-file Results"));
    let json = serde_json::to_string(&results).unwrap();
    assert!(json.contains("\"mean_sojourn_time\""));
}
