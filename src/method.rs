//! The three compared VQE variants and their generation parameters.
//!
//! Each method traces
//!
//! ```text
//! E(k) = E_target + (E_initial - E_target) · exp(-decay · k) + ξ_k
//! ```
//!
//! where ξ_k is symmetric noise whose amplitude shrinks with k (see
//! [`crate::noise`]). More advanced methods start lower, decay faster and
//! carry less noise.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Upper end of the search in [`MethodParams::settling_step`].
const SETTLING_SEARCH_LIMIT: usize = 100_000;

/// A fictitious VQE variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Method {
    /// Plain VQE: slow convergence, most noise.
    Normal,
    /// VQE with UCCSD ansatz and a hybrid optimizer.
    Hybrid,
    /// Hybrid plus zero-noise extrapolation.
    HybridZne,
}

impl Method {
    /// Every method, in display order.
    pub const ALL: [Method; 3] = [Method::Normal, Method::Hybrid, Method::HybridZne];

    /// Human-readable panel title.
    pub fn label(&self) -> &'static str {
        match self {
            Method::Normal => "Normal VQE",
            Method::Hybrid => "VQE + UCCSD + Hybrid",
            Method::HybridZne => "VQE + UCCSD + Hybrid + ZNE",
        }
    }

    /// Stable machine key, also used as the TOML table name.
    pub fn key(&self) -> &'static str {
        match self {
            Method::Normal => "normal_vqe",
            Method::Hybrid => "vqe_uccsd_hybrid",
            Method::HybridZne => "vqe_uccsd_hybrid_zne",
        }
    }

    /// Position in [`Method::ALL`].
    pub fn index(&self) -> usize {
        match self {
            Method::Normal => 0,
            Method::Hybrid => 1,
            Method::HybridZne => 2,
        }
    }

    /// Preset generation parameters for this method.
    pub fn preset(&self) -> MethodParams {
        match self {
            Method::Normal => MethodParams::normal(),
            Method::Hybrid => MethodParams::hybrid(),
            Method::HybridZne => MethodParams::hybrid_zne(),
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Generation parameters for one method's synthetic curve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MethodParams {
    /// Energy at step 0, the seed of every run (Hartree)
    pub initial: f64,
    /// Asymptotic energy the curve decays toward (Hartree)
    pub target: f64,
    /// Exponential decay rate per step
    pub decay_rate: f64,
    /// Half-width of the uniform noise at step 0 (Hartree)
    pub noise_amplitude: f64,
    /// Rate at which the noise half-width shrinks per step
    pub noise_decay: f64,
}

impl MethodParams {
    /// Plain VQE: -0.8 → -1.2 Ha, time constant 20 steps.
    pub fn normal() -> Self {
        Self {
            initial: -0.8,
            target: -1.2,
            decay_rate: 0.05,
            noise_amplitude: 0.08,
            noise_decay: 0.05,
        }
    }

    /// UCCSD + hybrid optimizer: -1.0 → -1.4 Ha, time constant 10 steps.
    pub fn hybrid() -> Self {
        Self {
            initial: -1.0,
            target: -1.4,
            decay_rate: 0.1,
            noise_amplitude: 0.03,
            noise_decay: 0.1,
        }
    }

    /// UCCSD + hybrid + ZNE: -1.1 → -1.6 Ha, time constant 8 steps.
    pub fn hybrid_zne() -> Self {
        Self {
            initial: -1.1,
            target: -1.6,
            decay_rate: 0.125,
            noise_amplitude: 0.02,
            noise_decay: 0.125,
        }
    }

    /// Noise-free energy at step `k`.
    pub fn expected_energy(&self, k: usize) -> f64 {
        self.target + (self.initial - self.target) * (-self.decay_rate * k as f64).exp()
    }

    /// Noise half-width at step `k`.
    pub fn noise_width(&self, k: usize) -> f64 {
        self.noise_amplitude * (-self.noise_decay * k as f64).exp()
    }

    /// Noise-free change from step `k - 1` to step `k`.
    pub fn step_change(&self, k: usize) -> f64 {
        if k == 0 {
            return 0.0;
        }
        (self.expected_energy(k) - self.expected_energy(k - 1)).abs()
    }

    /// First step at which the curve's own movement plus the noise
    /// half-width drops below `threshold`.
    ///
    /// Convergence is never declared before this step. A curve whose noise
    /// does not decay gets the search limit, as does a non-positive
    /// threshold.
    pub fn settling_step(&self, threshold: f64) -> usize {
        (1..SETTLING_SEARCH_LIMIT)
            .find(|&k| self.step_change(k) + self.noise_width(k) < threshold)
            .unwrap_or(SETTLING_SEARCH_LIMIT)
    }
}

/// One method's table as written in a config file. Absent fields keep the
/// value of the base parameters they are applied to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ParamOverrides {
    pub initial: Option<f64>,
    pub target: Option<f64>,
    pub decay_rate: Option<f64>,
    pub noise_amplitude: Option<f64>,
    pub noise_decay: Option<f64>,
}

impl ParamOverrides {
    pub fn apply(self, base: MethodParams) -> MethodParams {
        MethodParams {
            initial: self.initial.unwrap_or(base.initial),
            target: self.target.unwrap_or(base.target),
            decay_rate: self.decay_rate.unwrap_or(base.decay_rate),
            noise_amplitude: self.noise_amplitude.unwrap_or(base.noise_amplitude),
            noise_decay: self.noise_decay.unwrap_or(base.noise_decay),
        }
    }
}

impl Default for MethodParams {
    fn default() -> Self {
        Self::normal()
    }
}
