//! External arrival process.

use queuesim_routing::RandomStream;

/// Poisson arrival source: inter-arrival times are exponential with rate lambda.
#[derive(Debug, Clone, Copy)]
pub struct ArrivalSource {
    rate: f64,
}

impl ArrivalSource {
    pub fn new(rate: f64) -> Self {
        Self { rate }
    }

    pub fn rate(&self) -> f64 {
        self.rate
    }

    /// Draw a fresh inter-arrival gap. The caller turns it into an absolute
    /// time by adding the current clock.
    pub fn next_inter_arrival_time(&self, stream: &mut dyn RandomStream) -> f64 {
        stream.exponential(self.rate)
    }
}
