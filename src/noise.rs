//! Settling noise for synthetic convergence curves.
//!
//! A sample at step k is drawn uniformly from [-a_k, a_k] with
//! a_k = a_0 · exp(-γ k), so early iterations jitter visibly and late ones
//! barely move. The random source is passed in, which keeps seeded runs
//! reproducible.

use rand::Rng;

use crate::method::MethodParams;

/// Symmetric uniform noise with an exponentially shrinking half-width.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SettlingNoise {
    /// Half-width at step 0
    pub amplitude: f64,
    /// Shrink rate per step
    pub decay: f64,
}

impl SettlingNoise {
    pub fn new(amplitude: f64, decay: f64) -> Self {
        Self { amplitude, decay }
    }

    /// Noise model described by a method's parameters.
    pub fn for_params(params: &MethodParams) -> Self {
        Self::new(params.noise_amplitude, params.noise_decay)
    }

    /// Half-width a_k at step `k`.
    pub fn width(&self, k: usize) -> f64 {
        (self.amplitude * (-self.decay * k as f64).exp()).abs()
    }

    /// Draw one perturbation for step `k`.
    pub fn sample<R: Rng + ?Sized>(&self, k: usize, rng: &mut R) -> f64 {
        let w = self.width(k);
        if w <= 0.0 || !w.is_finite() {
            return 0.0;
        }
        rng.gen_range(-w..=w)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn samples_stay_within_width() {
        let noise = SettlingNoise::new(0.08, 0.05);
        let mut rng = StdRng::seed_from_u64(7);
        for k in 0..200 {
            let w = noise.width(k);
            for _ in 0..20 {
                let x = noise.sample(k, &mut rng);
                assert!(x.abs() <= w, "step {}: |{}| > {}", k, x, w);
            }
        }
    }

    #[test]
    fn zero_amplitude_is_silent() {
        let noise = SettlingNoise::new(0.0, 0.1);
        let mut rng = StdRng::seed_from_u64(1);
        for k in 0..10 {
            assert_eq!(noise.sample(k, &mut rng), 0.0);
        }
    }

    #[test]
    fn noise_is_roughly_symmetric() {
        let noise = SettlingNoise::new(1.0, 0.0);
        let mut rng = StdRng::seed_from_u64(99);
        let n = 20_000;
        let mean: f64 = (0..n).map(|_| noise.sample(0, &mut rng)).sum::<f64>() / n as f64;
        assert!(mean.abs() < 0.05, "mean {} should be near zero", mean);
    }

    #[test]
    fn same_seed_same_samples() {
        let noise = SettlingNoise::for_params(&MethodParams::hybrid());
        let mut a = StdRng::seed_from_u64(42);
        let mut b = StdRng::seed_from_u64(42);
        for k in 0..50 {
            assert_eq!(noise.sample(k, &mut a), noise.sample(k, &mut b));
        }
    }
}
