//! Convergence series engine.
//!
//! # Tick
//!
//! For each method that has not converged, with k = step_index + 1:
//!
//! ```text
//! E(k) = E_target + (E_initial - E_target) · exp(-decay · k) + U(-a_k, a_k)
//! a_k  = a_0 · exp(-γ · k)
//! ```
//!
//! The value is appended and checked: if the last `convergence_window`
//! values span less than `threshold` and the method is past its warm-up,
//! the method is frozen. The warm-up is the larger of `min_steps` and the
//! method's [`MethodParams::settling_step`], so a lucky pair of noisy
//! values early on cannot freeze a curve that is still far from target. Frozen methods repeat their last
//! value every tick so all histories stay the same length.
//!
//! # Determinism
//!
//! The random source is a type parameter. [`SeriesEngine::with_seed`]
//! gives exact, replayable trajectories; [`SeriesEngine::from_entropy`]
//! is for the live dashboard.

use std::fmt;

use log::{debug, info};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::method::{Method, MethodParams, ParamOverrides};
use crate::noise::SettlingNoise;
use crate::series::SeriesState;
use crate::viewport::{self, AxisRange, ViewportBounds};

/// Energy change below which a method counts as settled (Hartree).
pub const DEFAULT_THRESHOLD: f64 = 0.001;
/// Generated steps required before convergence may be declared.
pub const DEFAULT_MIN_STEPS: usize = 10;
/// Values inspected by the convergence check; 2 compares successive values.
pub const DEFAULT_WINDOW: usize = 2;

/// Parameters for each of the three methods.
///
/// When deserialized, each table may name only the fields it changes; the
/// rest come from that method's preset.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "MethodTableOverrides")]
pub struct MethodTable {
    pub normal_vqe: MethodParams,
    pub vqe_uccsd_hybrid: MethodParams,
    pub vqe_uccsd_hybrid_zne: MethodParams,
}

impl MethodTable {
    pub fn get(&self, method: Method) -> &MethodParams {
        match method {
            Method::Normal => &self.normal_vqe,
            Method::Hybrid => &self.vqe_uccsd_hybrid,
            Method::HybridZne => &self.vqe_uccsd_hybrid_zne,
        }
    }

    pub fn get_mut(&mut self, method: Method) -> &mut MethodParams {
        match method {
            Method::Normal => &mut self.normal_vqe,
            Method::Hybrid => &mut self.vqe_uccsd_hybrid,
            Method::HybridZne => &mut self.vqe_uccsd_hybrid_zne,
        }
    }
}

impl Default for MethodTable {
    fn default() -> Self {
        Self {
            normal_vqe: MethodParams::normal(),
            vqe_uccsd_hybrid: MethodParams::hybrid(),
            vqe_uccsd_hybrid_zne: MethodParams::hybrid_zne(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct MethodTableOverrides {
    normal_vqe: ParamOverrides,
    vqe_uccsd_hybrid: ParamOverrides,
    vqe_uccsd_hybrid_zne: ParamOverrides,
}

impl From<MethodTableOverrides> for MethodTable {
    fn from(o: MethodTableOverrides) -> Self {
        Self {
            normal_vqe: o.normal_vqe.apply(MethodParams::normal()),
            vqe_uccsd_hybrid: o.vqe_uccsd_hybrid.apply(MethodParams::hybrid()),
            vqe_uccsd_hybrid_zne: o.vqe_uccsd_hybrid_zne.apply(MethodParams::hybrid_zne()),
        }
    }
}

/// Configuration for a [`SeriesEngine`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Convergence threshold on the spread of recent values (Hartree)
    pub threshold: f64,
    /// Minimum generated steps before convergence can trigger; a method
    /// whose curve settles later waits for its settling step instead
    pub min_steps: usize,
    /// Number of most recent values whose spread is checked (≥ 2)
    pub convergence_window: usize,
    /// Per-method curve parameters
    pub methods: MethodTable,
}

impl EngineConfig {
    /// Replace one method's parameters.
    pub fn with_method(mut self, method: Method, params: MethodParams) -> Self {
        *self.methods.get_mut(method) = params;
        self
    }

    pub fn with_min_steps(mut self, min_steps: usize) -> Self {
        self.min_steps = min_steps;
        self
    }

    /// Check the spread of the last `window` values instead of a single
    /// successive difference, e.g. 5 for a settled tail.
    pub fn with_window(mut self, window: usize) -> Self {
        self.convergence_window = window;
        self
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            min_steps: DEFAULT_MIN_STEPS,
            convergence_window: DEFAULT_WINDOW,
            methods: MethodTable::default(),
        }
    }
}

/// How many methods have converged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConvergenceStatus {
    Running,
    Partial { converged: usize, total: usize },
    Complete,
}

impl ConvergenceStatus {
    pub fn from_counts(converged: usize, total: usize) -> Self {
        if converged == 0 {
            ConvergenceStatus::Running
        } else if converged >= total {
            ConvergenceStatus::Complete
        } else {
            ConvergenceStatus::Partial { converged, total }
        }
    }

    pub fn is_complete(&self) -> bool {
        matches!(self, ConvergenceStatus::Complete)
    }
}

impl fmt::Display for ConvergenceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConvergenceStatus::Running => f.write_str("Running simulations..."),
            ConvergenceStatus::Partial { converged, total } => {
                write!(f, "{}/{} methods converged", converged, total)
            }
            ConvergenceStatus::Complete => f.write_str("All methods converged!"),
        }
    }
}

/// One method's reading in a tick snapshot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MethodReading {
    pub method: Method,
    pub value: f64,
    pub converged: bool,
}

/// Snapshot returned by [`SeriesEngine::step`].
#[derive(Debug, Clone, PartialEq)]
pub struct TickResult {
    /// Ticks since the last reset, this one included
    pub tick: usize,
    /// Readings in [`Method::ALL`] order
    pub readings: [MethodReading; 3],
    pub status: ConvergenceStatus,
}

impl TickResult {
    pub fn get(&self, method: Method) -> &MethodReading {
        &self.readings[method.index()]
    }

    pub fn value(&self, method: Method) -> f64 {
        self.get(method).value
    }

    pub fn is_converged(&self, method: Method) -> bool {
        self.get(method).converged
    }

    pub fn iter(&self) -> impl Iterator<Item = &MethodReading> {
        self.readings.iter()
    }
}

/// Owns the three convergence series and advances them tick by tick.
#[derive(Debug, Clone)]
pub struct SeriesEngine<R = StdRng> {
    config: EngineConfig,
    series: [SeriesState; 3],
    /// First step at which each method may converge
    warmup: [usize; 3],
    rng: R,
    ticks: usize,
}

impl SeriesEngine<StdRng> {
    /// Engine with a seeded `StdRng`; same seed, same trajectories.
    pub fn with_seed(config: EngineConfig, seed: u64) -> Self {
        Self::new(config, StdRng::seed_from_u64(seed))
    }

    /// Engine seeded from OS entropy.
    pub fn from_entropy(config: EngineConfig) -> Self {
        Self::new(config, StdRng::from_entropy())
    }

    /// Reseed the random source and reset, for an exact replay.
    pub fn reseed(&mut self, seed: u64) {
        self.rng = StdRng::seed_from_u64(seed);
        self.reset();
    }
}

impl<R: Rng> SeriesEngine<R> {
    /// Engine drawing noise from `rng`, already reset.
    pub fn new(config: EngineConfig, rng: R) -> Self {
        let series = Method::ALL.map(|m| SeriesState::new(m, config.methods.get(m).initial));
        let warmup = Method::ALL.map(|m| {
            let settle = config.methods.get(m).settling_step(config.threshold);
            debug!("{} settles at step {}", m.key(), settle);
            settle.max(config.min_steps)
        });
        Self {
            config,
            series,
            warmup,
            rng,
            ticks: 0,
        }
    }

    /// Restart every series from its seed value. Nothing from the previous
    /// run survives; the random stream simply continues.
    pub fn reset(&mut self) {
        for s in self.series.iter_mut() {
            s.reset(self.config.methods.get(s.method).initial);
        }
        self.ticks = 0;
        debug!("series engine reset");
    }

    /// Advance every method by one tick and return the snapshot.
    pub fn step(&mut self) -> TickResult {
        let was_complete = self.all_converged();
        self.ticks += 1;

        let threshold = self.config.threshold;
        let window = self.config.convergence_window.max(2);

        for s in self.series.iter_mut() {
            if s.is_converged() {
                s.hold();
                continue;
            }

            let params = self.config.methods.get(s.method);
            let k = s.step_index() + 1;
            let noise = SettlingNoise::for_params(params).sample(k, &mut self.rng);
            let value = params.expected_energy(k) + noise;
            s.push(k, value);
            debug!("{} step {}: E = {:.6}", s.method.key(), k, value);

            let settled = s.recent_spread(window).map_or(false, |spread| spread < threshold);
            if settled && k >= self.warmup[s.method.index()] {
                s.mark_converged();
                info!("{} converged at step {} (E = {:.6})", s.method, k, value);
            }
        }

        if !was_complete && self.all_converged() {
            info!("all methods converged after {} ticks", self.ticks);
        }

        self.snapshot()
    }

    /// True once every method has converged; stays true until `reset`.
    pub fn all_converged(&self) -> bool {
        self.series.iter().all(|s| s.is_converged())
    }

    pub fn converged_count(&self) -> usize {
        self.series.iter().filter(|s| s.is_converged()).count()
    }

    pub fn status(&self) -> ConvergenceStatus {
        ConvergenceStatus::from_counts(self.converged_count(), self.series.len())
    }

    /// Current readings without advancing.
    pub fn snapshot(&self) -> TickResult {
        TickResult {
            tick: self.ticks,
            readings: std::array::from_fn(|i| {
                let s = &self.series[i];
                MethodReading {
                    method: s.method,
                    value: s.latest(),
                    converged: s.is_converged(),
                }
            }),
            status: self.status(),
        }
    }

    /// Ticks since the last reset.
    pub fn ticks(&self) -> usize {
        self.ticks
    }

    /// Step from which `method` may be declared converged.
    pub fn warmup(&self, method: Method) -> usize {
        self.warmup[method.index()]
    }

    pub fn series(&self, method: Method) -> &SeriesState {
        &self.series[method.index()]
    }

    pub fn history(&self, method: Method) -> &[f64] {
        self.series(method).history()
    }

    /// All histories in [`Method::ALL`] order.
    pub fn histories(&self) -> [&[f64]; 3] {
        std::array::from_fn(|i| self.series[i].history())
    }

    /// Shared y-range over every history.
    pub fn bounds(&self) -> ViewportBounds {
        viewport::compute_bounds(self.histories())
    }

    /// Y-range for one method's own panel.
    pub fn bounds_for(&self, method: Method) -> ViewportBounds {
        viewport::compute_bounds([self.history(method)])
    }

    /// X-range covering the current history length.
    pub fn x_range(&self) -> AxisRange {
        viewport::iteration_range(self.series[0].len())
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded() -> SeriesEngine {
        SeriesEngine::with_seed(EngineConfig::default(), 42)
    }

    fn run_until_converged(engine: &mut SeriesEngine, max: usize) -> usize {
        for i in 1..=max {
            engine.step();
            if engine.all_converged() {
                return i;
            }
        }
        max
    }

    #[test]
    fn reset_seeds_every_history() {
        let engine = seeded();
        for m in Method::ALL {
            assert_eq!(engine.history(m), &[m.preset().initial]);
            assert!(!engine.series(m).is_converged());
        }
        assert_eq!(engine.ticks(), 0);
        assert_eq!(engine.status(), ConvergenceStatus::Running);
    }

    #[test]
    fn five_steps_trend_toward_target_without_converging() {
        let params = MethodParams {
            initial: 0.0,
            target: -1.0,
            decay_rate: 0.3,
            noise_amplitude: 0.02,
            noise_decay: 0.3,
        };
        let config = EngineConfig::default().with_method(Method::Normal, params);
        let mut engine = SeriesEngine::with_seed(config, 7);
        engine.reset();
        for _ in 0..5 {
            engine.step();
        }

        let h = engine.history(Method::Normal);
        assert_eq!(h.len(), 6);
        assert_eq!(h[0], 0.0);
        for w in h.windows(2) {
            assert!(w[1] < w[0], "history should decrease: {:?}", h);
        }
        for &v in &h[1..] {
            assert!(v > -1.0 && v < 0.0, "{} outside (-1, 0)", v);
        }
        assert!(!engine.series(Method::Normal).is_converged());
    }

    #[test]
    fn history_length_tracks_step_calls() {
        let mut engine = seeded();
        for n in 1..=150 {
            engine.step();
            for m in Method::ALL {
                assert_eq!(engine.history(m).len(), n + 1);
            }
            assert_eq!(engine.ticks(), n);
        }
    }

    #[test]
    fn all_methods_converge_within_200_steps() {
        let mut engine = seeded();
        for _ in 0..200 {
            engine.step();
        }
        assert!(engine.all_converged());
        assert_eq!(engine.status(), ConvergenceStatus::Complete);

        let frozen = engine.snapshot();
        for _ in 0..50 {
            let tick = engine.step();
            assert!(engine.all_converged());
            for m in Method::ALL {
                assert_eq!(tick.value(m), frozen.value(m));
                assert!(tick.is_converged(m));
            }
        }
    }

    #[test]
    fn convergence_holds_for_many_seeds() {
        for seed in 0..25 {
            let mut engine = SeriesEngine::with_seed(EngineConfig::default(), seed);
            let ticks = run_until_converged(&mut engine, 200);
            assert!(engine.all_converged(), "seed {} not converged after {} ticks", seed, ticks);
        }
    }

    #[test]
    fn converged_series_is_constant_afterwards() {
        let mut engine = seeded();
        run_until_converged(&mut engine, 300);
        for m in Method::ALL {
            let s = engine.series(m);
            let k = s.converged_at().expect("converged");
            assert!(k >= engine.warmup(m));
            let h = s.history();
            assert!(h[k..].iter().all(|&v| v == h[k]), "{} moved after step {}", m, k);
            let delta = (h[k] - h[k - 1]).abs();
            assert!(delta < DEFAULT_THRESHOLD, "{} delta {}", m, delta);
        }
    }

    #[test]
    fn converged_values_sit_near_target() {
        for seed in 0..200 {
            let mut engine = SeriesEngine::with_seed(EngineConfig::default(), seed);
            run_until_converged(&mut engine, 200);
            assert!(engine.all_converged(), "seed {} did not converge", seed);
            for m in Method::ALL {
                let s = engine.series(m);
                let k = s.converged_at().expect("converged");
                let settle = m.preset().settling_step(DEFAULT_THRESHOLD);
                assert!(k >= settle, "seed {}: {} froze at {} before settling at {}", seed, m, k, settle);
                let gap = (s.latest() - m.preset().target).abs();
                assert!(gap < 0.01, "seed {}: {} froze {} Ha from target", seed, m, gap);
            }
        }
    }

    #[test]
    fn warmup_is_larger_of_min_steps_and_settling() {
        let engine = seeded();
        for m in Method::ALL {
            let settle = m.preset().settling_step(DEFAULT_THRESHOLD);
            assert_eq!(engine.warmup(m), settle.max(DEFAULT_MIN_STEPS));
            assert!(engine.warmup(m) > DEFAULT_MIN_STEPS);
        }
        let late = SeriesEngine::with_seed(EngineConfig::default().with_min_steps(150), 0);
        assert_eq!(late.warmup(Method::Normal), 150);
    }

    #[test]
    fn method_table_merges_partial_tables_with_presets() {
        let table: MethodTable = toml::from_str("[normal_vqe]\ntarget = -1.3\n").unwrap();
        let expected = MethodParams {
            target: -1.3,
            ..MethodParams::normal()
        };
        assert_eq!(table.normal_vqe, expected);
        assert_eq!(table.vqe_uccsd_hybrid, MethodParams::hybrid());
        assert_eq!(table.vqe_uccsd_hybrid_zne, MethodParams::hybrid_zne());

        assert!(toml::from_str::<MethodTable>("[normal_vqe]\ntarget_energy = -1.3\n").is_err());
        assert!(toml::from_str::<MethodTable>("[normal]\ntarget = -1.3\n").is_err());
    }

    #[test]
    fn min_steps_guard_delays_convergence() {
        let flat = MethodParams {
            initial: 0.0,
            target: -1.0,
            decay_rate: 50.0,
            noise_amplitude: 0.0,
            noise_decay: 0.0,
        };
        let mut config = EngineConfig::default();
        for m in Method::ALL {
            config = config.with_method(m, flat);
        }
        let mut engine = SeriesEngine::with_seed(config, 0);
        for _ in 0..9 {
            engine.step();
            assert!(!engine.all_converged());
        }
        engine.step();
        assert!(engine.all_converged());
        assert_eq!(engine.series(Method::Hybrid).converged_at(), Some(DEFAULT_MIN_STEPS));
    }

    #[test]
    fn all_converged_is_monotonic() {
        let mut engine = seeded();
        let mut seen = false;
        for _ in 0..300 {
            engine.step();
            if seen {
                assert!(engine.all_converged());
            }
            seen |= engine.all_converged();
        }
        assert!(seen);
    }

    #[test]
    fn reset_discards_previous_run() {
        let mut engine = seeded();
        run_until_converged(&mut engine, 300);
        engine.reset();
        assert!(!engine.all_converged());
        assert_eq!(engine.ticks(), 0);
        for m in Method::ALL {
            assert_eq!(engine.history(m).len(), 1);
            assert_eq!(engine.series(m).converged_at(), None);
        }
        engine.step();
        assert_eq!(engine.history(Method::Normal).len(), 2);
    }

    #[test]
    fn same_seed_same_trajectory() {
        let mut a = seeded();
        let mut b = seeded();
        for _ in 0..60 {
            assert_eq!(a.step(), b.step());
        }
        let mut c = seeded();
        c.step();
        c.reseed(42);
        let mut d = seeded();
        for _ in 0..20 {
            assert_eq!(c.step(), d.step());
        }
    }

    #[test]
    fn bounds_cover_every_history() {
        let mut engine = seeded();
        for _ in 0..40 {
            engine.step();
            let b = engine.bounds();
            for h in engine.histories() {
                assert!(h.iter().all(|&v| b.contains(v)));
            }
            for m in Method::ALL {
                let pb = engine.bounds_for(m);
                assert!(engine.history(m).iter().all(|&v| pb.contains(v)));
            }
        }
    }

    #[test]
    fn windowed_convergence_needs_settled_tail() {
        let mut engine = SeriesEngine::with_seed(EngineConfig::default().with_window(5), 3);
        run_until_converged(&mut engine, 300);
        for m in Method::ALL {
            let s = engine.series(m);
            let k = s.converged_at().expect("converged");
            let tail = &s.history()[k - 4..=k];
            let spread = tail.iter().cloned().fold(f64::NEG_INFINITY, f64::max)
                - tail.iter().cloned().fold(f64::INFINITY, f64::min);
            assert!(spread < DEFAULT_THRESHOLD);
        }
    }

    #[test]
    fn status_text() {
        assert_eq!(ConvergenceStatus::from_counts(0, 3).to_string(), "Running simulations...");
        assert_eq!(ConvergenceStatus::from_counts(2, 3).to_string(), "2/3 methods converged");
        assert_eq!(ConvergenceStatus::from_counts(3, 3).to_string(), "All methods converged!");
    }

    #[test]
    fn x_range_grows_with_history() {
        let mut engine = seeded();
        assert_eq!(engine.x_range().max, 50.0);
        for _ in 0..60 {
            engine.step();
        }
        assert_eq!(engine.x_range().max, 65.0);
    }
}
