//! Single-server queue state machine.
//!
//! Each [`ServerState`] holds at most `capacity` jobs, one of them in service.
//! The only ways to change it are [`ServerState::admit`] and
//! [`ServerState::complete`], which implement this transition table:
//!
//! | From | Event | To | Effect |
//! |------|-------|----|--------|
//! | Idle | arrival accepted | Busy | length 1, draw service, schedule completion |
//! | Busy | arrival accepted | Busy | length + 1, completion unchanged |
//! | any  | arrival, full    | same | dropped |
//! | Busy | completion, length 1 | Idle | length 0, completion = +inf |
//! | Busy | completion, length > 1 | Busy | length - 1, draw service for next job |

use queuesim_routing::RandomStream;
use serde::{Deserialize, Serialize};

/// Whether a server is serving a job.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ServerPhase {
    /// No jobs held; next completion is at infinity.
    #[default]
    Idle,
    /// One job in service, possibly more waiting.
    Busy,
}

/// Result of offering an arrival to a server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Server was idle; the job went straight into service.
    StartedService,
    /// Server was busy; the job waits behind the one in service.
    Queued,
    /// Server was full; the job was dropped.
    Dropped,
}

impl Admission {
    pub fn is_admitted(self) -> bool {
        self != Admission::Dropped
    }
}

/// Result of a service completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// The queue emptied.
    BecameIdle,
    /// A waiting job moved into service.
    NextStarted,
}

/// Read-only view of a server, for introspection and reports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerSnapshot {
    pub id: usize,
    pub phase: ServerPhase,
    pub queue_length: u32,
    pub capacity: u32,
    /// Absolute completion time of the job in service; `None` while idle.
    pub next_completion_time: Option<f64>,
    pub accepted: u64,
    pub dropped: u64,
    pub completed: u64,
    pub busy_time: f64,
}

/// A finite-capacity single-server queue with exponential service.
#[derive(Debug, Clone)]
pub struct ServerState {
    id: usize,
    capacity: u32,
    service_rate: f64,
    queue_length: u32,
    next_completion_time: f64,
    // --- Counters ---
    accepted: u64,
    dropped: u64,
    completed: u64,
    /// Time spent with at least one job held.
    busy_time: f64,
}

impl ServerState {
    /// Create an idle server.
    pub fn new(id: usize, capacity: u32, service_rate: f64) -> Self {
        Self {
            id,
            capacity,
            service_rate,
            queue_length: 0,
            next_completion_time: f64::INFINITY,
            accepted: 0,
            dropped: 0,
            completed: 0,
            busy_time: 0.0,
        }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    pub fn service_rate(&self) -> f64 {
        self.service_rate
    }

    /// Jobs held, in service plus waiting.
    pub fn queue_length(&self) -> u32 {
        self.queue_length
    }

    /// Absolute time of the next completion, `f64::INFINITY` while idle.
    pub fn next_completion_time(&self) -> f64 {
        self.next_completion_time
    }

    pub fn phase(&self) -> ServerPhase {
        if self.queue_length == 0 {
            ServerPhase::Idle
        } else {
            ServerPhase::Busy
        }
    }

    pub fn is_idle(&self) -> bool {
        self.queue_length == 0
    }

    /// Jobs held but not in service.
    pub fn waiting(&self) -> u32 {
        self.queue_length.saturating_sub(1)
    }

    /// Whether the queue has room for another job.
    pub fn can_accept(&self) -> bool {
        self.queue_length < self.capacity
    }

    pub fn accepted(&self) -> u64 {
        self.accepted
    }

    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    pub fn completed(&self) -> u64 {
        self.completed
    }

    pub fn busy_time(&self) -> f64 {
        self.busy_time
    }

    /// Offer an arriving job at time `now`.
    ///
    /// Draws a service time only when the job starts service immediately.
    pub fn admit(&mut self, now: f64, stream: &mut dyn RandomStream) -> Admission {
        if !self.can_accept() {
            self.dropped += 1;
            return Admission::Dropped;
        }
        self.queue_length += 1;
        self.accepted += 1;
        if self.queue_length == 1 {
            self.next_completion_time = now + stream.exponential(self.service_rate);
            Admission::StartedService
        } else {
            Admission::Queued
        }
    }

    /// Finish the job in service at time `now` and start the next one, if any.
    ///
    /// # Panics
    ///
    /// Panics in debug mode if the server is idle.
    pub fn complete(&mut self, now: f64, stream: &mut dyn RandomStream) -> Completion {
        debug_assert!(
            self.queue_length > 0,
            "Completion on idle server {}",
            self.id
        );
        self.queue_length = self.queue_length.saturating_sub(1);
        self.completed += 1;
        if self.queue_length == 0 {
            self.next_completion_time = f64::INFINITY;
            Completion::BecameIdle
        } else {
            self.next_completion_time = now + stream.exponential(self.service_rate);
            Completion::NextStarted
        }
    }

    /// Account `elapsed` time spent in the current phase.
    pub fn accumulate(&mut self, elapsed: f64) {
        if !self.is_idle() {
            self.busy_time += elapsed;
        }
    }

    /// Read-only snapshot of the current state.
    pub fn snapshot(&self) -> ServerSnapshot {
        ServerSnapshot {
            id: self.id,
            phase: self.phase(),
            queue_length: self.queue_length,
            capacity: self.capacity,
            next_completion_time: if self.next_completion_time.is_finite() {
                Some(self.next_completion_time)
            } else {
                None
            },
            accepted: self.accepted,
            dropped: self.dropped,
            completed: self.completed,
            busy_time: self.busy_time,
        }
    }
}
