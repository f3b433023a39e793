//! Statistics accumulation and result reporting.
//!
//! Wait and sojourn times are measured with time-weighted integrals: between
//! two consecutive events the number of jobs in the system (and waiting) is
//! constant, so the area under each count curve is exact. Dividing an area by
//! the number of accepted jobs gives the mean time per job (Little's law).

use crate::server::{Admission, Completion, ServerState};
use queuesim_routing::RoutingSummary;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum MetricsError {
    #[error("{statistic} is undefined: no request was accepted")]
    UndefinedStatistic { statistic: &'static str },
}

/// Running counters and integrals owned by the engine.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Accumulator {
    /// Arrivals seen before the horizon, accepted or not.
    pub total_requests: u64,
    /// Arrivals rejected because the target queue was full.
    pub num_dropped: u64,
    /// Jobs currently held by all servers.
    pub num_in_system: u64,
    /// Jobs currently held but not in service.
    pub num_waiting: u64,
    /// Integral of `num_waiting` over time.
    pub total_wait_time_integral: f64,
    /// Integral of `num_in_system` over time.
    pub total_sojourn_time_integral: f64,
}

impl Accumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add the areas for an interval of length `elapsed` during which the
    /// counts did not change.
    pub fn integrate(&mut self, elapsed: f64) {
        self.total_sojourn_time_integral += self.num_in_system as f64 * elapsed;
        self.total_wait_time_integral += self.num_waiting as f64 * elapsed;
    }

    /// Count an arrival and apply its admission outcome.
    pub fn record_arrival(&mut self, admission: Admission) {
        self.total_requests += 1;
        match admission {
            Admission::Dropped => self.num_dropped += 1,
            Admission::StartedService => self.num_in_system += 1,
            Admission::Queued => {
                self.num_in_system += 1;
                self.num_waiting += 1;
            }
        }
    }

    /// Apply a service completion.
    pub fn record_completion(&mut self, completion: Completion) {
        self.num_in_system = self.num_in_system.saturating_sub(1);
        if completion == Completion::NextStarted {
            self.num_waiting = self.num_waiting.saturating_sub(1);
        }
    }

    /// Requests that were not dropped.
    pub fn accepted(&self) -> u64 {
        self.total_requests - self.num_dropped
    }
}

/// Per-server summary in the final results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerReport {
    pub id: usize,
    pub capacity: u32,
    pub service_rate: f64,
    pub accepted: u64,
    pub dropped: u64,
    pub completed: u64,
    /// Fraction of the run the server held at least one job.
    pub utilization: f64,
}

/// Final results of one run. Produced once, when the system has drained.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationResults {
    /// Simulation name.
    pub name: String,
    /// Seed the random stream was built from.
    pub seed: u64,
    /// Configured horizon.
    pub horizon: f64,
    /// Routing policy the run used.
    pub routing: RoutingSummary,
    /// Clock value when the last job left the system.
    pub end_time: f64,
    pub total_requests: u64,
    pub num_dropped: u64,
    pub accepted_requests: u64,
    /// Mean queueing delay of accepted requests; `None` if none were accepted.
    pub mean_wait_time: Option<f64>,
    /// Mean time in system (wait + service) of accepted requests.
    pub mean_sojourn_time: Option<f64>,
    /// `num_dropped / total_requests`; `None` if no request arrived.
    pub drop_rate: Option<f64>,
    /// Accepted requests per unit of simulated time.
    pub throughput: f64,
    /// Time-average number of jobs in the system.
    pub mean_in_system: f64,
    pub events_processed: u64,
    pub per_server: Vec<ServerReport>,
}

impl SimulationResults {
    /// Derive the results from the accumulator at the final instant.
    pub fn finalize(
        name: &str,
        seed: u64,
        horizon: f64,
        end_time: f64,
        stats: &Accumulator,
        servers: &[ServerState],
        routing: RoutingSummary,
        events_processed: u64,
    ) -> Self {
        let accepted = stats.accepted();
        let per_accepted = |integral: f64| {
            if accepted > 0 {
                Some(integral / accepted as f64)
            } else {
                None
            }
        };
        let per_time = |value: f64| if end_time > 0.0 { value / end_time } else { 0.0 };

        let per_server = servers
            .iter()
            .map(|s| ServerReport {
                id: s.id(),
                capacity: s.capacity(),
                service_rate: s.service_rate(),
                accepted: s.accepted(),
                dropped: s.dropped(),
                completed: s.completed(),
                utilization: per_time(s.busy_time()),
            })
            .collect();

        Self {
            name: name.to_string(),
            seed,
            horizon,
            routing,
            end_time,
            total_requests: stats.total_requests,
            num_dropped: stats.num_dropped,
            accepted_requests: accepted,
            mean_wait_time: per_accepted(stats.total_wait_time_integral),
            mean_sojourn_time: per_accepted(stats.total_sojourn_time_integral),
            drop_rate: if stats.total_requests > 0 {
                Some(stats.num_dropped as f64 / stats.total_requests as f64)
            } else {
                None
            },
            throughput: per_time(accepted as f64),
            mean_in_system: per_time(stats.total_sojourn_time_integral),
            events_processed,
            per_server,
        }
    }

    /// Mean wait time, or an error if it is undefined.
    pub fn mean_wait(&self) -> Result<f64, MetricsError> {
        self.mean_wait_time.ok_or(MetricsError::UndefinedStatistic {
            statistic: "mean wait time",
        })
    }

    /// Mean sojourn time, or an error if it is undefined.
    pub fn mean_sojourn(&self) -> Result<f64, MetricsError> {
        self.mean_sojourn_time.ok_or(MetricsError::UndefinedStatistic {
            statistic: "mean sojourn time",
        })
    }
}

/// Sample mean and spread of one statistic across replications.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Estimate {
    pub mean: f64,
    pub std_dev: f64,
    /// Half-width of a normal-approximation 95% confidence interval.
    pub ci95_half_width: f64,
    pub samples: usize,
}

impl Estimate {
    /// Estimate from the defined values; `None` if there are none.
    pub fn from_values(values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let std_dev = if values.len() > 1 {
            (values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0)).sqrt()
        } else {
            0.0
        };
        Some(Self {
            mean,
            std_dev,
            ci95_half_width: 1.96 * std_dev / n.sqrt(),
            samples: values.len(),
        })
    }
}

/// Aggregate over independent replications of one configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplicationSummary {
    pub name: String,
    pub runs: usize,
    pub mean_wait_time: Option<Estimate>,
    pub mean_sojourn_time: Option<Estimate>,
    pub drop_rate: Option<Estimate>,
    pub throughput: Option<Estimate>,
}

impl ReplicationSummary {
    pub fn from_runs(name: &str, runs: &[SimulationResults]) -> Self {
        let collect = |f: fn(&SimulationResults) -> Option<f64>| {
            let values: Vec<f64> = runs.iter().filter_map(f).collect();
            Estimate::from_values(&values)
        };
        Self {
            name: name.to_string(),
            runs: runs.len(),
            mean_wait_time: collect(|r| r.mean_wait_time),
            mean_sojourn_time: collect(|r| r.mean_sojourn_time),
            drop_rate: collect(|r| r.drop_rate),
            throughput: collect(|r| Some(r.throughput)),
        }
    }
}

fn fmt_optional(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{:.4}", v),
        None => "undefined".to_string(),
    }
}

fn fmt_estimate(estimate: &Option<Estimate>) -> String {
    match estimate {
        Some(e) => format!("{:.4} ± {:.4} (n={})", e.mean, e.ci95_half_width, e.samples),
        None => "undefined".to_string(),
    }
}

/// One-line result in the classic field order:
/// `total_requests num_dropped end_time mean_wait mean_sojourn`.
pub fn format_legacy_line(results: &SimulationResults) -> String {
    format!(
        "{} {} {} {} {}",
        results.total_requests,
        results.num_dropped,
        results.end_time,
        results
            .mean_wait_time
            .map_or_else(|| "undefined".to_string(), |v| v.to_string()),
        results
            .mean_sojourn_time
            .map_or_else(|| "undefined".to_string(), |v| v.to_string()),
    )
}

/// Format results as a pretty-printed table string.
pub fn format_table(results: &SimulationResults) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "\n{:=<70}\n",
        format!("  {} Results  ", results.name)
    ));
    out.push_str(&format!(
        "  Seed: {} | Horizon: {:.1} | End time: {:.3} | Events: {}\n",
        results.seed, results.horizon, results.end_time, results.events_processed
    ));
    out.push_str(&format!(
        "  Routing: {} {:?}\n",
        results.routing.name, results.routing.probabilities
    ));
    out.push_str(&format!("{:-<70}\n", "  Requests  "));
    out.push_str(&format!(
        "  Total: {}  Accepted: {}  Dropped: {}  Drop rate: {}\n",
        results.total_requests,
        results.accepted_requests,
        results.num_dropped,
        fmt_optional(results.drop_rate),
    ));
    out.push_str(&format!("{:-<70}\n", "  Latency  "));
    out.push_str(&format!(
        "  Mean wait: {}  Mean sojourn: {}\n",
        fmt_optional(results.mean_wait_time),
        fmt_optional(results.mean_sojourn_time),
    ));
    out.push_str(&format!("{:-<70}\n", "  Throughput  "));
    out.push_str(&format!(
        "  Accepted/time: {:.4}  Mean in system: {:.4}\n",
        results.throughput, results.mean_in_system,
    ));
    out.push_str(&format!("{:-<70}\n", "  Servers  "));
    out.push_str(&format!(
        "  {:>4} {:>8} {:>8} {:>10} {:>10} {:>10} {:>8}\n",
        "id", "cap", "mu", "accepted", "dropped", "completed", "util"
    ));
    for s in &results.per_server {
        out.push_str(&format!(
            "  {:>4} {:>8} {:>8.3} {:>10} {:>10} {:>10} {:>7.1}%\n",
            s.id,
            s.capacity,
            s.service_rate,
            s.accepted,
            s.dropped,
            s.completed,
            s.utilization * 100.0,
        ));
    }
    out.push_str(&format!("{:=<70}\n", ""));
    out
}

/// Format a replication summary.
pub fn format_replication_table(summary: &ReplicationSummary) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "\n{:=<70}\n",
        format!("  {} Replications ({})  ", summary.name, summary.runs)
    ));
    out.push_str(&format!(
        "  Mean wait:    {}\n",
        fmt_estimate(&summary.mean_wait_time)
    ));
    out.push_str(&format!(
        "  Mean sojourn: {}\n",
        fmt_estimate(&summary.mean_sojourn_time)
    ));
    out.push_str(&format!(
        "  Drop rate:    {}\n",
        fmt_estimate(&summary.drop_rate)
    ));
    out.push_str(&format!(
        "  Throughput:   {}\n",
        fmt_estimate(&summary.throughput)
    ));
    out.push_str(&format!("{:=<70}\n", ""));
    out
}
