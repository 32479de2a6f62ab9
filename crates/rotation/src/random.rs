//! Injectable randomness for the simulator and the evaluator.
//!
//! Production code draws from `rand::thread_rng`; tests substitute
//! `SeededRandom` or a fixed `SequenceRandom`.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

pub trait RandomSource: Send {
    /// Uniform sample from the closed interval `[low, high]`.
    fn uniform(&mut self, low: f64, high: f64) -> f64;

    /// Uniform integer from the closed interval `[low, high]`.
    fn int_inclusive(&mut self, low: u64, high: u64) -> u64;
}

/// Thread-local OS-seeded generator.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadRandom;

impl RandomSource for ThreadRandom {
    fn uniform(&mut self, low: f64, high: f64) -> f64 {
        if low >= high {
            return low;
        }
        rand::thread_rng().gen_range(low..=high)
    }

    fn int_inclusive(&mut self, low: u64, high: u64) -> u64 {
        if low >= high {
            return low;
        }
        rand::thread_rng().gen_range(low..=high)
    }
}

/// Reproducible generator for replaying a demo run.
#[derive(Debug, Clone)]
pub struct SeededRandom {
    rng: StdRng,
}

impl SeededRandom {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl RandomSource for SeededRandom {
    fn uniform(&mut self, low: f64, high: f64) -> f64 {
        if low >= high {
            return low;
        }
        self.rng.gen_range(low..=high)
    }

    fn int_inclusive(&mut self, low: u64, high: u64) -> u64 {
        if low >= high {
            return low;
        }
        self.rng.gen_range(low..=high)
    }
}

/// Cycles through fixed unit fractions in `[0, 1]`.
///
/// A fraction `f` maps to `low + f * (high - low)`; `0.0` and `1.0` yield
/// the bounds exactly.
#[derive(Debug, Clone)]
pub struct SequenceRandom {
    fractions: Vec<f64>,
    cursor: usize,
}

impl SequenceRandom {
    pub fn new(fractions: Vec<f64>) -> Self {
        let fractions = if fractions.is_empty() { vec![0.5] } else { fractions };
        Self {
            fractions: fractions.into_iter().map(|f| f.clamp(0.0, 1.0)).collect(),
            cursor: 0,
        }
    }

    /// Always the same fraction.
    pub fn constant(fraction: f64) -> Self {
        Self::new(vec![fraction])
    }

    fn next_fraction(&mut self) -> f64 {
        let f = self.fractions[self.cursor % self.fractions.len()];
        self.cursor += 1;
        f
    }
}

impl RandomSource for SequenceRandom {
    fn uniform(&mut self, low: f64, high: f64) -> f64 {
        let f = self.next_fraction();
        if f >= 1.0 {
            return high;
        }
        low + f * (high - low)
    }

    fn int_inclusive(&mut self, low: u64, high: u64) -> u64 {
        let f = self.next_fraction();
        if low >= high {
            return low;
        }
        let span = (high - low) as f64;
        low + (f * span).round() as u64
    }
}
