//! Discrete-event simulation engine.
//!
//! The engine does not keep an event queue: the only pending events are the
//! next external arrival and each server's next completion, so the earliest
//! one is found by a scan. Each [`SimulationEngine::advance`] call moves the
//! clock to that time, integrates the statistics over the elapsed interval,
//! and applies the events due at that instant.
//!
//! Arrivals are admitted only before the horizon. After it, the engine keeps
//! processing completions until every queue is empty, and only then are the
//! results final.

use crate::arrivals::ArrivalSource;
use crate::clock::SimClock;
use crate::config::{ConfigError, SimConfig};
use crate::metrics::{Accumulator, SimulationResults};
use crate::random::SeededStream;
use crate::server::{Admission, Completion, ServerSnapshot, ServerState};
use queuesim_routing::{
    ProbabilisticRouting, RandomStream, RoutingError, RoutingPolicy, RoutingSummary,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use tracing::{debug, trace, warn};

#[derive(Error, Debug)]
pub enum SimError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Routing(#[from] RoutingError),
}

/// An event applied during one step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimEvent {
    /// An external arrival was routed to `server`.
    Arrival { server: usize, admission: Admission },
    /// The job in service at `server` finished.
    Completion { server: usize, completion: Completion },
}

/// What one call to [`SimulationEngine::advance`] did.
#[derive(Debug, Clone, PartialEq)]
pub struct StepOutcome {
    /// Clock value after the step.
    pub time: f64,
    /// Events applied at `time`, arrival first.
    pub events: Vec<SimEvent>,
    /// Whether the run is finished after this step.
    pub finished: bool,
}

/// Read-only view of the whole engine state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineSnapshot {
    pub clock: f64,
    pub horizon: f64,
    pub next_arrival_time: f64,
    pub routing: RoutingSummary,
    pub servers: Vec<ServerSnapshot>,
    pub num_in_system: u64,
    pub num_waiting: u64,
    pub total_requests: u64,
    pub num_dropped: u64,
    pub total_wait_time_integral: f64,
    pub total_sojourn_time_integral: f64,
    pub events_processed: u64,
    pub finished: bool,
}

impl fmt::Display for EngineSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "clock={:.6} next_arrival={:.6} horizon={} finished={} routing={} {:?}",
            self.clock,
            self.next_arrival_time,
            self.horizon,
            self.finished,
            self.routing.name,
            self.routing.probabilities
        )?;
        writeln!(
            f,
            "in_system={} waiting={} total={} dropped={} wait_area={:.6} sojourn_area={:.6}",
            self.num_in_system,
            self.num_waiting,
            self.total_requests,
            self.num_dropped,
            self.total_wait_time_integral,
            self.total_sojourn_time_integral
        )?;
        for s in &self.servers {
            let done = s
                .next_completion_time
                .map_or_else(|| "inf".to_string(), |t| format!("{:.6}", t));
            writeln!(
                f,
                "  server {}: {:?} {}/{} next_done={}",
                s.id, s.phase, s.queue_length, s.capacity, done
            )?;
        }
        Ok(())
    }
}

/// The main simulation engine.
pub struct SimulationEngine {
    config: SimConfig,
    clock: SimClock,
    /// Absolute time of the next external arrival.
    next_arrival_time: f64,
    arrivals: ArrivalSource,
    routing: Box<dyn RoutingPolicy>,
    stream: Box<dyn RandomStream + Send>,
    servers: Vec<ServerState>,
    stats: Accumulator,
    events_processed: u64,
    /// Set exactly once, when the system has drained past the horizon.
    results: Option<SimulationResults>,
}

impl SimulationEngine {
    /// Create an engine with probabilistic routing and a stream seeded from
    /// the config.
    pub fn new(config: SimConfig) -> Result<Self, SimError> {
        let stream = SeededStream::new(config.seed());
        Self::with_stream(config, stream)
    }

    /// Create an engine with probabilistic routing over a caller-supplied
    /// random stream.
    pub fn with_stream(
        config: SimConfig,
        stream: impl RandomStream + Send + 'static,
    ) -> Result<Self, SimError> {
        let routing = ProbabilisticRouting::new(config.routing_probabilities())?;
        Self::with_routing(config, Box::new(routing), Box::new(stream))
    }

    /// Create an engine from explicit parts.
    ///
    /// Draws the first inter-arrival time immediately, so the first value
    /// taken from `stream` is always an exponential sample.
    pub fn with_routing(
        config: SimConfig,
        routing: Box<dyn RoutingPolicy>,
        mut stream: Box<dyn RandomStream + Send>,
    ) -> Result<Self, SimError> {
        config.validate()?;
        if routing.num_servers() != config.num_servers() {
            return Err(ConfigError::InvalidConfiguration(format!(
                "routing policy '{}' covers {} servers, config has {}",
                routing.name(),
                routing.num_servers(),
                config.num_servers()
            ))
            .into());
        }

        let servers: Vec<ServerState> = config
            .servers
            .iter()
            .enumerate()
            .map(|(id, s)| ServerState::new(id, s.capacity, s.service_rate))
            .collect();
        let arrivals = ArrivalSource::new(config.arrival_rate());
        let next_arrival_time = arrivals.next_inter_arrival_time(stream.as_mut());

        debug!(
            name = config.name(),
            seed = config.seed(),
            horizon = config.horizon(),
            servers = servers.len(),
            routing = routing.name(),
            first_arrival = next_arrival_time,
            "engine created"
        );

        Ok(Self {
            config,
            clock: SimClock::new(),
            next_arrival_time,
            arrivals,
            routing,
            stream,
            servers,
            stats: Accumulator::new(),
            events_processed: 0,
            results: None,
        })
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Current simulation time.
    pub fn now(&self) -> f64 {
        self.clock.now()
    }

    pub fn next_arrival_time(&self) -> f64 {
        self.next_arrival_time
    }

    pub fn servers(&self) -> &[ServerState] {
        &self.servers
    }

    pub fn stats(&self) -> &Accumulator {
        &self.stats
    }

    pub fn events_processed(&self) -> u64 {
        self.events_processed
    }

    pub fn is_finished(&self) -> bool {
        self.results.is_some()
    }

    /// Final results, once the run is finished.
    pub fn results(&self) -> Option<&SimulationResults> {
        self.results.as_ref()
    }

    /// Run until the horizon has passed and every queue has drained.
    pub fn run(&mut self) -> SimulationResults {
        loop {
            if let Some(results) = &self.results {
                return results.clone();
            }
            self.advance();
        }
    }

    /// Time of the next event to apply.
    ///
    /// The pending arrival counts only while it can still be admitted, or
    /// when every server is idle (then nothing else is pending).
    fn next_event_time(&self) -> f64 {
        let earliest_completion = self
            .servers
            .iter()
            .map(ServerState::next_completion_time)
            .fold(f64::INFINITY, f64::min);
        if self.servers.iter().all(ServerState::is_idle) {
            self.next_arrival_time
        } else if self.next_arrival_time >= self.config.horizon() {
            earliest_completion
        } else {
            self.next_arrival_time.min(earliest_completion)
        }
    }

    /// Process every event due at the next event time.
    ///
    /// A no-op once the run is finished.
    pub fn advance(&mut self) -> StepOutcome {
        if self.is_finished() {
            return StepOutcome {
                time: self.clock.now(),
                events: Vec::new(),
                finished: true,
            };
        }

        let horizon = self.config.horizon();
        let event_time = self.next_event_time();
        if !event_time.is_finite() {
            return self.finish_without_events(horizon);
        }
        let elapsed = self.clock.advance_to(event_time);
        self.stats.integrate(elapsed);
        for server in &mut self.servers {
            server.accumulate(elapsed);
        }

        let mut events = Vec::new();
        if event_time < horizon && event_time == self.next_arrival_time {
            events.push(self.handle_arrival());
        }
        for id in 0..self.servers.len() {
            let server = &self.servers[id];
            if !server.is_idle() && server.next_completion_time() == event_time {
                events.push(self.handle_completion(id));
            }
        }
        self.events_processed += events.len() as u64;

        if self.clock.reached(horizon) && self.servers.iter().all(ServerState::is_idle) {
            self.finalize();
        }

        StepOutcome {
            time: event_time,
            events,
            finished: self.is_finished(),
        }
    }

    /// Nothing is ever due again: close the run at the horizon instead of
    /// integrating over an infinite interval.
    fn finish_without_events(&mut self, horizon: f64) -> StepOutcome {
        warn!(
            time = self.clock.now(),
            next_arrival = self.next_arrival_time,
            "no finite event pending, closing run at horizon"
        );
        let target = self.clock.now().max(horizon);
        let elapsed = self.clock.advance_to(target);
        self.stats.integrate(elapsed);
        for server in &mut self.servers {
            server.accumulate(elapsed);
        }
        self.finalize();
        StepOutcome {
            time: target,
            events: Vec::new(),
            finished: true,
        }
    }

    /// Route an arrival, apply admission, and schedule the next arrival.
    ///
    /// # Panics
    ///
    /// Panics if the routing policy returns an index outside
    /// `0..num_servers()`, which breaks the [`RoutingPolicy`] contract.
    fn handle_arrival(&mut self) -> SimEvent {
        let now = self.clock.now();
        let server = self.routing.choose_server(self.stream.as_mut());
        assert!(
            server < self.servers.len(),
            "Routing policy '{}' chose server {} out of range for {} servers",
            self.routing.name(),
            server,
            self.servers.len()
        );
        let admission = self.servers[server].admit(now, self.stream.as_mut());
        self.stats.record_arrival(admission);
        self.next_arrival_time = now + self.arrivals.next_inter_arrival_time(self.stream.as_mut());

        trace!(
            time = now,
            server,
            ?admission,
            queue_length = self.servers[server].queue_length(),
            next_arrival = self.next_arrival_time,
            "arrival"
        );
        SimEvent::Arrival { server, admission }
    }

    /// Finish the job in service at `server` and start the next one.
    fn handle_completion(&mut self, server: usize) -> SimEvent {
        let now = self.clock.now();
        let completion = self.servers[server].complete(now, self.stream.as_mut());
        self.stats.record_completion(completion);

        trace!(
            time = now,
            server,
            ?completion,
            queue_length = self.servers[server].queue_length(),
            "completion"
        );
        SimEvent::Completion { server, completion }
    }

    fn finalize(&mut self) {
        let results = SimulationResults::finalize(
            self.config.name(),
            self.config.seed(),
            self.config.horizon(),
            self.clock.now(),
            &self.stats,
            &self.servers,
            self.routing.summary(),
            self.events_processed,
        );
        debug!(
            end_time = results.end_time,
            total_requests = results.total_requests,
            num_dropped = results.num_dropped,
            mean_wait = ?results.mean_wait_time,
            mean_sojourn = ?results.mean_sojourn_time,
            "simulation drained"
        );
        self.results = Some(results);
    }

    /// Snapshot of the current state. Does not mutate anything.
    pub fn snapshot(&self) -> EngineSnapshot {
        EngineSnapshot {
            clock: self.clock.now(),
            horizon: self.config.horizon(),
            next_arrival_time: self.next_arrival_time,
            routing: self.routing.summary(),
            servers: self.servers.iter().map(ServerState::snapshot).collect(),
            num_in_system: self.stats.num_in_system,
            num_waiting: self.stats.num_waiting,
            total_requests: self.stats.total_requests,
            num_dropped: self.stats.num_dropped,
            total_wait_time_integral: self.stats.total_wait_time_integral,
            total_sojourn_time_integral: self.stats.total_sojourn_time_integral,
            events_processed: self.events_processed,
            finished: self.is_finished(),
        }
    }
}
