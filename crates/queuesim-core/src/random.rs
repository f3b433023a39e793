//! Random stream implementations.
//!
//! [`SeededStream`] is the production stream: one ChaCha8 generator seeded
//! from the config, so a seed fully determines a run. [`ScriptedStream`]
//! replays an exact list of draws and is meant for golden-state tests.

use queuesim_routing::{categorical_index, RandomStream};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Exp};
use std::collections::VecDeque;

/// Seeded pseudo-random stream backed by ChaCha8.
#[derive(Debug, Clone)]
pub struct SeededStream {
    rng: ChaCha8Rng,
}

impl SeededStream {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }
}

impl RandomStream for SeededStream {
    fn exponential(&mut self, rate: f64) -> f64 {
        // Rates are validated positive and finite before any engine exists.
        match Exp::new(rate) {
            Ok(dist) => dist.sample(&mut self.rng),
            Err(_) => f64::INFINITY,
        }
    }

    fn categorical(&mut self, probabilities: &[f64]) -> usize {
        let u: f64 = self.rng.gen();
        categorical_index(probabilities, u)
    }
}

/// One scripted draw.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Draw {
    /// Returned verbatim from the next `exponential` call, whatever the rate.
    Exponential(f64),
    /// Returned verbatim from the next `categorical` call.
    Categorical(usize),
}

/// Stream that replays a fixed script of draws in order.
///
/// # Panics
///
/// Panics when the script runs out or when the next scripted draw is of the
/// wrong kind. Both mean the test's expectation of the draw order is wrong.
#[derive(Debug, Clone, Default)]
pub struct ScriptedStream {
    script: VecDeque<Draw>,
    consumed: usize,
}

impl ScriptedStream {
    pub fn new(script: impl IntoIterator<Item = Draw>) -> Self {
        Self {
            script: script.into_iter().collect(),
            consumed: 0,
        }
    }

    /// Draws not yet consumed.
    pub fn remaining(&self) -> usize {
        self.script.len()
    }

    /// Draws consumed so far.
    pub fn consumed(&self) -> usize {
        self.consumed
    }

    fn next_draw(&mut self) -> Draw {
        let draw = self.script.pop_front().unwrap_or_else(|| {
            panic!("Scripted stream exhausted after {} draws", self.consumed)
        });
        self.consumed += 1;
        draw
    }
}

impl RandomStream for ScriptedStream {
    fn exponential(&mut self, _rate: f64) -> f64 {
        match self.next_draw() {
            Draw::Exponential(sample) => sample,
            other => panic!(
                "Scripted draw {} was {:?}, expected an exponential sample",
                self.consumed, other
            ),
        }
    }

    fn categorical(&mut self, probabilities: &[f64]) -> usize {
        match self.next_draw() {
            Draw::Categorical(index) => {
                assert!(
                    index < probabilities.len(),
                    "Scripted categorical index {} out of range for {} entries",
                    index,
                    probabilities.len()
                );
                index
            }
            other => panic!(
                "Scripted draw {} was {:?}, expected a categorical index",
                self.consumed, other
            ),
        }
    }
}
