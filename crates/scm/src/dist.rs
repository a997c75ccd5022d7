//! Univariate Gaussian support for structural equations.
//!
//! Structural equations in this workspace are linear-Gaussian: a node's
//! value is `intercept + Σ coef·parent + noise` with Gaussian noise. This
//! module provides the one distribution the engine actually evaluates
//! densities for, plus the logistic curve the MNAR mechanism uses.

use rand::Rng;
use rand_distr::StandardNormal;
use std::f64::consts::PI;

/// A univariate Gaussian N(mean, std_dev²).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Gaussian {
    pub mean: f64,
    pub std_dev: f64,
}

impl Gaussian {
    /// Create N(mean, std_dev²). Callers are expected to pass a
    /// non-negative standard deviation; a zero value models a point mass.
    pub fn new(mean: f64, std_dev: f64) -> Self {
        debug_assert!(std_dev >= 0.0, "standard deviation must be non-negative");
        Self { mean, std_dev }
    }

    /// The standard normal N(0, 1).
    pub fn standard() -> Self {
        Self {
            mean: 0.0,
            std_dev: 1.0,
        }
    }

    pub fn variance(&self) -> f64 {
        self.std_dev * self.std_dev
    }

    /// Log probability density at x.
    ///
    /// For a point mass (σ = 0) this returns +∞ at the mean and −∞
    /// elsewhere.
    pub fn log_pdf(&self, x: f64) -> f64 {
        if self.std_dev == 0.0 {
            if (x - self.mean).abs() < 1e-12 {
                f64::INFINITY
            } else {
                f64::NEG_INFINITY
            }
        } else {
            let z = (x - self.mean) / self.std_dev;
            -0.5 * (2.0 * PI).ln() - self.std_dev.ln() - 0.5 * z * z
        }
    }

    /// Reparameterized sample: given ε ~ N(0,1), returns mean + std_dev·ε.
    /// Gradients flow through mean and std_dev, which is what the
    /// variational fitter relies on.
    pub fn sample_reparam(&self, epsilon: f64) -> f64 {
        self.mean + self.std_dev * epsilon
    }

    /// Draw a sample using the supplied RNG.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        let eps: f64 = rng.sample(StandardNormal);
        self.sample_reparam(eps)
    }
}

/// The standard logistic function, 1 / (1 + e^{-x}).
///
/// Saturates to 0 and 1 at the tails; the MNAR missingness mechanism is
/// defined in terms of it.
pub fn sigmoid(x: f64) -> f64 {
    if x >= 0.0 {
        1.0 / (1.0 + (-x).exp())
    } else {
        // Rearranged to avoid overflow of exp() for large negative x.
        let e = x.exp();
        e / (1.0 + e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    const EPS: f64 = 1e-10;

    #[test]
    fn test_log_pdf_standard_normal_at_zero() {
        let g = Gaussian::standard();
        // log N(0 | 0, 1) = -0.5 * log(2π)
        let expected = -0.5 * (2.0 * PI).ln();
        assert!((g.log_pdf(0.0) - expected).abs() < EPS);
    }

    #[test]
    fn test_log_pdf_scales_with_std() {
        let wide = Gaussian::new(0.0, 2.0);
        let narrow = Gaussian::new(0.0, 0.5);
        // At the mean, density is inversely proportional to σ.
        assert!(narrow.log_pdf(0.0) > wide.log_pdf(0.0));
    }

    #[test]
    fn test_sample_reparam() {
        let g = Gaussian::new(3.0, 0.5);
        assert!((g.sample_reparam(0.0) - 3.0).abs() < EPS);
        assert!((g.sample_reparam(2.0) - 4.0).abs() < EPS);
    }

    #[test]
    fn test_seeded_sampling_reproducible() {
        let g = Gaussian::new(1.0, 2.0);
        let mut a = StdRng::seed_from_u64(7);
        let mut b = StdRng::seed_from_u64(7);
        for _ in 0..10 {
            assert_eq!(g.sample(&mut a), g.sample(&mut b));
        }
    }

    #[test]
    fn test_sample_mean_roughly_correct() {
        let g = Gaussian::new(-2.0, 1.0);
        let mut rng = StdRng::seed_from_u64(11);
        let n = 20_000;
        let mean: f64 = (0..n).map(|_| g.sample(&mut rng)).sum::<f64>() / n as f64;
        assert!((mean + 2.0).abs() < 0.05, "sample mean {} too far", mean);
    }

    #[test]
    fn test_sigmoid_saturates() {
        assert!(sigmoid(0.0) == 0.5);
        assert!(sigmoid(50.0) > 1.0 - 1e-9);
        assert!(sigmoid(-50.0) < 1e-9);
        assert!(sigmoid(-800.0) >= 0.0);
        assert!(sigmoid(800.0) <= 1.0);
    }

    #[test]
    fn test_sigmoid_monotone() {
        let mut prev = sigmoid(-6.0);
        let mut x = -6.0;
        while x < 6.0 {
            x += 0.25;
            let cur = sigmoid(x);
            assert!(cur > prev);
            prev = cur;
        }
    }
}
