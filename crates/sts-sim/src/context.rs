//! ---
//! sts_section: "02-telemetry-generator"
//! sts_subsection: "module"
//! sts_type: "source"
//! sts_scope: "code"
//! sts_description: "Noise and trend engines backing the device models."
//! sts_version: "v0.1.0"
//! sts_owner: "tbd"
//! ---
use std::collections::HashMap;
use std::time::{Duration, Instant};

use rand::prelude::*;

/// A trend value untouched for longer than this is re-seeded from its
/// nominal instead of continuing the old walk.
pub const TREND_STALE_AFTER: Duration = Duration::from_secs(60);

/// Parameters of one smoothed random-walk quantity.
///
/// Fault and non-fault regimes of the same physical quantity carry their
/// own spec and their own state key, so toggling a fault does not inherit
/// the other regime's momentum.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrendSpec {
    pub nominal: f64,
    pub min: f64,
    pub max: f64,
    /// Maximum magnitude of a single tick-to-tick step.
    pub step: f64,
    /// Probability of a free oscillation step instead of the walk biased
    /// back toward nominal.
    pub oscillation: f64,
}

#[derive(Debug)]
struct TrendState {
    value: f64,
    updated: Instant,
}

/// Per-run simulation state: the seeded RNG and the trend map.
///
/// Constructed once per simulation run and discarded on stop; device
/// models only reach the trend state through this interface.
#[derive(Debug)]
pub struct SimulationContext {
    rng: StdRng,
    trends: HashMap<String, TrendState>,
}

impl SimulationContext {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            trends: HashMap::new(),
        }
    }

    /// Stateless jitter around a nominal value: uniform spread of
    /// `percent` percent with inclusive bounds, rounded to `decimals`.
    pub fn noise(&mut self, nominal: f64, percent: f64, decimals: u32) -> f64 {
        let spread = self.rng.gen_range(-percent..=percent);
        round_to(nominal * (1.0 + spread / 100.0), decimals)
    }

    /// Uniform inclusive integer, e.g. a tap changer position.
    pub fn integer(&mut self, low: i64, high: i64) -> i64 {
        self.rng.gen_range(low..=high)
    }

    /// Advance the smoothed walk stored under `key` and return the new
    /// reading.
    pub fn trend(&mut self, key: &str, spec: &TrendSpec) -> f64 {
        self.trend_at(Instant::now(), key, spec)
    }

    /// [`SimulationContext::trend`] with an explicit clock, so staleness
    /// behaviour is testable without sleeping.
    pub fn trend_at(&mut self, now: Instant, key: &str, spec: &TrendSpec) -> f64 {
        let current = match self.trends.get(key) {
            Some(state) if now.saturating_duration_since(state.updated) <= TREND_STALE_AFTER => {
                Some(state.value)
            }
            _ => None,
        };

        let next = match current {
            None => spec.nominal,
            Some(current) => {
                let step = if self.rng.gen_bool(spec.oscillation) {
                    self.rng.gen_range(-spec.step..=spec.step)
                } else {
                    // Persistence with a pull back toward nominal: the sign
                    // follows the existing deviation.
                    let magnitude = self.rng.gen_range(0.0..=spec.step);
                    if current < spec.nominal {
                        magnitude
                    } else if current > spec.nominal {
                        -magnitude
                    } else if self.rng.gen_bool(0.5) {
                        magnitude
                    } else {
                        -magnitude
                    }
                };
                (current + step).clamp(spec.min, spec.max)
            }
        };

        let rounded = round_to(next, 2);
        self.trends.insert(
            key.to_owned(),
            TrendState {
                value: rounded,
                updated: now,
            },
        );
        rounded
    }
}

pub fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;

    const SPEC: TrendSpec = TrendSpec {
        nominal: 50.0,
        min: 40.0,
        max: 60.0,
        step: 2.0,
        oscillation: 0.2,
    };

    #[test]
    fn noise_stays_within_percent_spread() {
        let mut ctx = SimulationContext::new(1);
        for _ in 0..200 {
            let value = ctx.noise(100.0, 10.0, 2);
            assert!((90.0..=110.0).contains(&value), "value {value} out of spread");
        }
    }

    #[test]
    fn noise_respects_decimals() {
        let mut ctx = SimulationContext::new(2);
        let value = ctx.noise(1.5, 5.0, 1);
        assert_eq!(value, round_to(value, 1));
    }

    #[test]
    fn first_sample_returns_nominal() {
        let mut ctx = SimulationContext::new(3);
        assert_eq!(ctx.trend("k", &SPEC), 50.0);
    }

    #[test]
    fn consecutive_samples_stay_within_one_step() {
        let mut ctx = SimulationContext::new(4);
        let mut previous = ctx.trend("k", &SPEC);
        for _ in 0..100 {
            let next = ctx.trend("k", &SPEC);
            // Half a cent of slack for the 2-decimal rounding of stored values.
            assert!(
                (next - previous).abs() <= SPEC.step + 0.005,
                "jump from {previous} to {next}"
            );
            assert!((SPEC.min..=SPEC.max).contains(&next));
            previous = next;
        }
    }

    #[test]
    fn stale_key_resets_to_nominal() {
        let mut ctx = SimulationContext::new(5);
        let start = Instant::now();
        let first = ctx.trend_at(start, "k", &SPEC);
        assert_eq!(first, 50.0);
        // Drift away from nominal within the staleness window.
        for i in 1..30 {
            ctx.trend_at(start + Duration::from_secs(i), "k", &SPEC);
        }
        let after_gap = ctx.trend_at(start + Duration::from_secs(30 + 61), "k", &SPEC);
        assert_eq!(after_gap, 50.0);
    }

    #[test]
    fn sample_just_inside_staleness_window_continues_walk() {
        let mut ctx = SimulationContext::new(6);
        let start = Instant::now();
        let first = ctx.trend_at(start, "k", &SPEC);
        let second = ctx.trend_at(start + Duration::from_secs(59), "k", &SPEC);
        assert!((second - first).abs() <= SPEC.step + 0.005);
    }

    #[test]
    fn distinct_keys_do_not_share_momentum() {
        let mut ctx = SimulationContext::new(7);
        for _ in 0..50 {
            ctx.trend("oil_temp", &SPEC);
        }
        // A fresh fault-variant key starts at its own nominal regardless of
        // the sibling walk.
        let fault_spec = TrendSpec {
            nominal: 95.0,
            min: 88.0,
            max: 102.0,
            ..SPEC
        };
        assert_eq!(ctx.trend("oil_temp_fault", &fault_spec), 95.0);
    }

    #[test]
    fn walk_is_clamped_to_envelope() {
        let narrow = TrendSpec {
            nominal: 10.0,
            min: 9.5,
            max: 10.5,
            step: 5.0,
            oscillation: 1.0,
        };
        let mut ctx = SimulationContext::new(8);
        for _ in 0..100 {
            let value = ctx.trend("n", &narrow);
            assert!((narrow.min..=narrow.max).contains(&value));
        }
    }
}
