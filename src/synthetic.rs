//! Synthetic fix stream generator for stress testing and benchmarking.
//!
//! Generates a noisy walk with injected upstream faults (multipath spikes,
//! duplicate redelivery, unknown accuracy) and records exactly which faults
//! were injected, providing ground truth for the engine's filtering.
//!
//! Feature-gated behind `synthetic`; not included in production builds.
//!
//! # Example
//!
//! ```rust
//! use tripmeter::synthetic::FixStreamScenario;
//! use tripmeter::{OdometerConfig, replay_fixes};
//!
//! let stream = FixStreamScenario {
//!     sample_count: 200,
//!     spike_probability: 0.05,
//!     ..FixStreamScenario::default()
//! }
//! .generate();
//!
//! let summary = replay_fixes("synthetic", &stream.fixes, &OdometerConfig::default());
//! assert_eq!(summary.stats.rejected_implausible_jump, stream.faults.spikes);
//! ```

use std::f64::consts::PI;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::FixSample;
use crate::geo_utils::offset_coordinate;

/// How far a multipath spike throws the reported position (meters).
const SPIKE_OFFSET_METERS: f64 = 5_000.0;

/// Scenario configuration for a synthetic fix stream.
#[derive(Debug, Clone)]
pub struct FixStreamScenario {
    /// Starting latitude.
    pub origin_lat: f64,
    /// Starting longitude.
    pub origin_lng: f64,
    /// Number of time slots (each emits one fix, plus possibly a duplicate).
    pub sample_count: usize,
    /// Time between slots in milliseconds.
    pub interval_ms: i64,
    /// Ground speed of the simulated subject in m/s.
    pub speed_mps: f64,
    /// Reported horizontal accuracy of clean fixes in meters.
    pub accuracy_meters: f64,
    /// Gaussian position noise standard deviation in meters.
    pub noise_sigma_meters: f64,
    /// Probability that a slot reports a spike instead of the true position.
    pub spike_probability: f64,
    /// Probability that a slot reports unknown (zero) accuracy.
    pub unknown_accuracy_probability: f64,
    /// Probability that a clean fix is delivered twice.
    pub duplicate_probability: f64,
    /// RNG seed for deterministic reproduction.
    pub seed: u64,
}

impl Default for FixStreamScenario {
    fn default() -> Self {
        Self {
            origin_lat: 47.37,
            origin_lng: 8.55,
            sample_count: 500,
            interval_ms: 1_000,
            speed_mps: 10.0,
            accuracy_meters: 5.0,
            noise_sigma_meters: 2.0,
            spike_probability: 0.0,
            unknown_accuracy_probability: 0.0,
            duplicate_probability: 0.0,
            seed: 42,
        }
    }
}

/// Faults that were injected into a stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InjectedFaults {
    pub spikes: u64,
    pub duplicates: u64,
    pub unknown_accuracy: u64,
}

/// A generated stream with ground truth.
#[derive(Debug, Clone)]
pub struct SyntheticStream {
    /// Fixes in delivery order.
    pub fixes: Vec<FixSample>,
    /// Noise-free path length in meters.
    pub true_distance: f64,
    /// Number of clean fixes (each should be accepted exactly once).
    pub clean_fixes: u64,
    pub faults: InjectedFaults,
}

impl FixStreamScenario {
    /// Generate the stream. The first fix is always clean, so every injected
    /// spike has an accepted fix to be compared against.
    pub fn generate(&self) -> SyntheticStream {
        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut fixes = Vec::with_capacity(self.sample_count + self.sample_count / 10);
        let mut faults = InjectedFaults::default();
        let mut clean_fixes = 0u64;

        let step = self.speed_mps * self.interval_ms as f64 / 1000.0;
        let mut heading: f64 = rng.gen_range(0.0..2.0 * PI);
        let (mut lat, mut lng) = (self.origin_lat, self.origin_lng);
        let mut true_distance = 0.0;

        for i in 0..self.sample_count {
            if i > 0 {
                heading += rng.gen_range(-0.05..0.05);
                (lat, lng) = offset_coordinate(lat, lng, step * heading.sin(), step * heading.cos());
                true_distance += step;
            }
            let timestamp_ms = i as i64 * self.interval_ms;

            if i > 0 && rng.gen_bool(self.spike_probability) {
                let angle: f64 = rng.gen_range(0.0..2.0 * PI);
                let (spike_lat, spike_lng) = offset_coordinate(
                    lat,
                    lng,
                    SPIKE_OFFSET_METERS * angle.sin(),
                    SPIKE_OFFSET_METERS * angle.cos(),
                );
                fixes.push(FixSample::new(
                    spike_lat,
                    spike_lng,
                    self.accuracy_meters,
                    timestamp_ms,
                ));
                faults.spikes += 1;
                continue;
            }

            let (noisy_lat, noisy_lng) = self.add_noise(lat, lng, &mut rng);

            if i > 0 && rng.gen_bool(self.unknown_accuracy_probability) {
                fixes.push(FixSample::new(noisy_lat, noisy_lng, 0.0, timestamp_ms));
                faults.unknown_accuracy += 1;
                continue;
            }

            let fix = FixSample::new(noisy_lat, noisy_lng, self.accuracy_meters, timestamp_ms)
                .with_speed(self.speed_mps);
            fixes.push(fix);
            clean_fixes += 1;

            if rng.gen_bool(self.duplicate_probability) {
                fixes.push(fix);
                faults.duplicates += 1;
            }
        }

        SyntheticStream {
            fixes,
            true_distance,
            clean_fixes,
            faults,
        }
    }

    /// Add Gaussian noise to a position (Box-Muller transform).
    fn add_noise(&self, lat: f64, lng: f64, rng: &mut StdRng) -> (f64, f64) {
        if self.noise_sigma_meters <= 0.0 {
            return (lat, lng);
        }
        let u1: f64 = rng.gen_range(0.0001..1.0);
        let u2: f64 = rng.gen_range(0.0..1.0);
        let r = (-2.0 * u1.ln()).sqrt() * self.noise_sigma_meters;
        let theta = 2.0 * PI * u2;
        offset_coordinate(lat, lng, r * theta.sin(), r * theta.cos())
    }
}
