//! Closed-form M/M/1/K results, used to sanity-check simulation output.
//!
//! With Poisson splitting each server in the network is an independent
//! M/M/1/K queue fed at rate `lambda * p_i`, so the network figures are
//! throughput-weighted combinations of the per-server ones.

use crate::config::SimConfig;
use serde::{Deserialize, Serialize};

/// Utilization values closer than this to 1 use the `rho == 1` formulas.
const UNIT_LOAD_EPSILON: f64 = 1e-9;

/// Stationary metrics of one M/M/1/K queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mm1kMetrics {
    pub arrival_rate: f64,
    pub service_rate: f64,
    pub capacity: u32,
    /// Probability an arrival finds the queue full.
    pub blocking_probability: f64,
    /// Time-average number of jobs held.
    pub mean_in_system: f64,
    /// Rate of accepted arrivals.
    pub throughput: f64,
    /// Fraction of time the server is busy.
    pub utilization: f64,
    /// Mean time in system of accepted jobs. `None` without arrivals.
    pub mean_sojourn_time: Option<f64>,
    /// Mean queueing delay of accepted jobs. `None` without arrivals.
    pub mean_wait_time: Option<f64>,
}

/// Mean queue length of a truncated geometric distribution with ratio `r < 1`
/// on `0..=k`.
fn truncated_geometric_mean(r: f64, k: u32) -> f64 {
    let tail = r.powf(f64::from(k) + 1.0);
    r / (1.0 - r) - (f64::from(k) + 1.0) * tail / (1.0 - tail)
}

/// Stationary metrics of an M/M/1/K queue with arrival rate `lambda`,
/// service rate `mu` and capacity `k` (including the job in service).
pub fn mm1k(lambda: f64, mu: f64, k: u32) -> Mm1kMetrics {
    let kf = f64::from(k);
    let (blocking_probability, mean_in_system) = if lambda <= 0.0 {
        (0.0, 0.0)
    } else {
        let rho = lambda / mu;
        if (rho - 1.0).abs() < UNIT_LOAD_EPSILON {
            (1.0 / (kf + 1.0), kf / 2.0)
        } else if rho < 1.0 {
            let tail = rho.powf(kf + 1.0);
            let blocking = rho.powf(kf) * (1.0 - rho) / (1.0 - tail);
            (blocking, truncated_geometric_mean(rho, k))
        } else {
            // Mirror n -> k - n turns the distribution into one with ratio 1/rho.
            let r = 1.0 / rho;
            let blocking = (1.0 - r) / (1.0 - r.powf(kf + 1.0));
            (blocking, kf - truncated_geometric_mean(r, k))
        }
    };

    let throughput = lambda.max(0.0) * (1.0 - blocking_probability);
    let mean_sojourn_time = if throughput > 0.0 {
        Some(mean_in_system / throughput)
    } else if lambda <= 0.0 {
        Some(1.0 / mu)
    } else {
        None
    };

    Mm1kMetrics {
        arrival_rate: lambda,
        service_rate: mu,
        capacity: k,
        blocking_probability,
        mean_in_system,
        throughput,
        utilization: throughput / mu,
        mean_sojourn_time,
        mean_wait_time: mean_sojourn_time.map(|w| (w - 1.0 / mu).max(0.0)),
    }
}

/// Reference figures for a whole network.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkReference {
    pub servers: Vec<Mm1kMetrics>,
    /// Fraction of all arrivals that are dropped.
    pub drop_probability: f64,
    pub throughput: f64,
    pub mean_sojourn_time: Option<f64>,
    pub mean_wait_time: Option<f64>,
}

/// Stationary reference for the network described by `config`.
pub fn network_reference(config: &SimConfig) -> NetworkReference {
    let lambda = config.arrival_rate();
    let servers: Vec<Mm1kMetrics> = config
        .servers
        .iter()
        .map(|s| mm1k(lambda * s.routing_probability, s.service_rate, s.capacity))
        .collect();

    let throughput: f64 = servers.iter().map(|m| m.throughput).sum();
    let weighted = |f: fn(&Mm1kMetrics) -> Option<f64>| {
        if throughput <= 0.0 {
            return None;
        }
        let total: f64 = servers
            .iter()
            .filter(|m| m.throughput > 0.0)
            .map(|m| m.throughput * f(m).unwrap_or(0.0))
            .sum();
        Some(total / throughput)
    };

    NetworkReference {
        drop_probability: if lambda > 0.0 {
            1.0 - throughput / lambda
        } else {
            0.0
        },
        throughput,
        mean_sojourn_time: weighted(|m| m.mean_sojourn_time),
        mean_wait_time: weighted(|m| m.mean_wait_time),
        servers,
    }
}

/// Format the reference as a table.
pub fn format_reference_table(name: &str, reference: &NetworkReference) -> String {
    let fmt_opt = |v: Option<f64>| v.map_or_else(|| "undefined".to_string(), |v| format!("{:.4}", v));
    let mut out = String::new();
    out.push_str(&format!("\n{:=<70}\n", ""));
    out.push_str(&format!("  M/M/1/K reference: {}\n", name));
    out.push_str(&format!("{:=<70}\n", ""));
    out.push_str(&format!(
        "  {:<8} {:>10} {:>10} {:>6} {:>10} {:>10} {:>10}\n",
        "Server", "Lambda", "Mu", "K", "Blocking", "Sojourn", "Util"
    ));
    out.push_str(&format!("  {:-<68}\n", ""));
    for (i, m) in reference.servers.iter().enumerate() {
        out.push_str(&format!(
            "  {:<8} {:>10.4} {:>10.4} {:>6} {:>10.4} {:>10} {:>10.4}\n",
            i,
            m.arrival_rate,
            m.service_rate,
            m.capacity,
            m.blocking_probability,
            fmt_opt(m.mean_sojourn_time),
            m.utilization
        ));
    }
    out.push_str(&format!("  {:-<68}\n", ""));
    out.push_str(&format!(
        "  Drop probability: {:.4}  Throughput: {:.4}\n",
        reference.drop_probability, reference.throughput
    ));
    out.push_str(&format!(
        "  Mean wait: {}  Mean sojourn: {}\n",
        fmt_opt(reference.mean_wait_time),
        fmt_opt(reference.mean_sojourn_time)
    ));
    out.push_str(&format!("{:=<70}\n", ""));
    out
}
