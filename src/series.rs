//! Per-method convergence history.

use crate::method::Method;

/// History and convergence flags for one method's curve.
///
/// The history is append-only and always holds the seed value first, so
/// after n steps it has n + 1 entries.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesState {
    pub method: Method,
    history: Vec<f64>,
    converged: bool,
    converged_at: Option<usize>,
    step_index: usize,
}

impl SeriesState {
    /// A fresh series holding only `seed`.
    pub fn new(method: Method, seed: f64) -> Self {
        Self {
            method,
            history: vec![seed],
            converged: false,
            converged_at: None,
            step_index: 0,
        }
    }

    /// Drop everything and start again from `seed`.
    pub(crate) fn reset(&mut self, seed: f64) {
        self.history.clear();
        self.history.push(seed);
        self.converged = false;
        self.converged_at = None;
        self.step_index = 0;
    }

    /// Record a freshly generated value for step `k`.
    pub(crate) fn push(&mut self, k: usize, value: f64) {
        self.history.push(value);
        self.step_index = k;
    }

    /// Repeat the last value unchanged; used once converged.
    pub(crate) fn hold(&mut self) {
        let last = self.latest();
        self.history.push(last);
    }

    pub(crate) fn mark_converged(&mut self) {
        if !self.converged {
            self.converged = true;
            self.converged_at = Some(self.step_index);
        }
    }

    /// Every value emitted since the last reset, seed first.
    pub fn history(&self) -> &[f64] {
        &self.history
    }

    /// Most recent value.
    pub fn latest(&self) -> f64 {
        // history is never empty: it is created and reset with a seed
        self.history[self.history.len() - 1]
    }

    pub fn is_converged(&self) -> bool {
        self.converged
    }

    /// Generation step at which convergence was declared.
    pub fn converged_at(&self) -> Option<usize> {
        self.converged_at
    }

    /// Number of generated (non-frozen) steps.
    pub fn step_index(&self) -> usize {
        self.step_index
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    /// True if no values are recorded.
    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    /// Spread (max - min) of the last `window` values, or `None` if fewer
    /// than `window` values exist.
    pub fn recent_spread(&self, window: usize) -> Option<f64> {
        if window == 0 || self.history.len() < window {
            return None;
        }
        let tail = &self.history[self.history.len() - window..];
        let (lo, hi) = tail
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
        Some(hi - lo)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_series_holds_seed() {
        let s = SeriesState::new(Method::Normal, -0.8);
        assert_eq!(s.history(), &[-0.8]);
        assert_eq!(s.latest(), -0.8);
        assert_eq!(s.step_index(), 0);
        assert!(!s.is_converged());
    }

    #[test]
    fn hold_repeats_last_value() {
        let mut s = SeriesState::new(Method::Hybrid, -1.0);
        s.push(1, -1.1);
        s.hold();
        s.hold();
        assert_eq!(s.history(), &[-1.0, -1.1, -1.1, -1.1]);
        assert_eq!(s.step_index(), 1);
    }

    #[test]
    fn spread_of_last_window() {
        let mut s = SeriesState::new(Method::Normal, 0.0);
        s.push(1, 1.0);
        s.push(2, 0.5);
        assert_eq!(s.recent_spread(2), Some(0.5));
        assert_eq!(s.recent_spread(3), Some(1.0));
        assert_eq!(s.recent_spread(4), None);
    }

    #[test]
    fn converged_at_is_recorded_once() {
        let mut s = SeriesState::new(Method::Normal, 0.0);
        s.push(1, 1.0);
        s.mark_converged();
        s.push(2, 2.0);
        s.mark_converged();
        assert_eq!(s.converged_at(), Some(1));
    }

    #[test]
    fn reset_discards_everything() {
        let mut s = SeriesState::new(Method::HybridZne, -1.1);
        s.push(1, -1.2);
        s.mark_converged();
        s.reset(-1.1);
        assert_eq!(s, SeriesState::new(Method::HybridZne, -1.1));
    }
}
