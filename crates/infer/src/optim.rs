//! Gradient-based optimizers for the variational fit.
//!
//! The ELBO surface mixes parameters of very different curvature (equation
//! coefficients vs. log noise scales vs. thousands of imputed cells), so the
//! workhorse is Adam, whose per-element step normalization makes one
//! learning rate serve all of them.

/// Adam optimizer.
///
/// Updates parameters in-place using bias-corrected first and second moment
/// estimates:
///
/// - `m = β₁·m + (1-β₁)·g`
/// - `v = β₂·v + (1-β₂)·g²`
/// - `θ = θ - lr · m̂ / (√v̂ + ε)`
#[derive(Debug, Clone)]
pub struct Adam {
    pub learning_rate: f64,
    pub beta1: f64,
    pub beta2: f64,
    pub epsilon: f64,
    m: Vec<f64>,
    v: Vec<f64>,
    t: i32,
}

impl Adam {
    /// Create an Adam optimizer with the given learning rate and standard
    /// moment decay rates (0.9, 0.999).
    pub fn new(learning_rate: f64) -> Self {
        Self {
            learning_rate,
            beta1: 0.9,
            beta2: 0.999,
            epsilon: 1e-8,
            m: Vec::new(),
            v: Vec::new(),
            t: 0,
        }
    }

    /// Perform a single optimization step, minimizing along `grads`.
    pub fn step(&mut self, params: &mut [f64], grads: &[f64]) {
        assert_eq!(
            params.len(),
            grads.len(),
            "number of params ({}) must match number of grads ({})",
            params.len(),
            grads.len()
        );
        if self.m.is_empty() {
            self.m = vec![0.0; params.len()];
            self.v = vec![0.0; params.len()];
        }

        self.t += 1;
        let correction1 = 1.0 - self.beta1.powi(self.t);
        let correction2 = 1.0 - self.beta2.powi(self.t);

        for ((p, &g), (m, v)) in params
            .iter_mut()
            .zip(grads.iter())
            .zip(self.m.iter_mut().zip(self.v.iter_mut()))
        {
            if !g.is_finite() {
                continue;
            }
            *m = self.beta1 * *m + (1.0 - self.beta1) * g;
            *v = self.beta2 * *v + (1.0 - self.beta2) * g * g;
            let m_hat = *m / correction1;
            let v_hat = *v / correction2;
            *p -= self.learning_rate * m_hat / (v_hat.sqrt() + self.epsilon);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_moves_against_gradient() {
        let mut params = vec![1.0, -1.0];
        let grads = vec![1.0, -1.0];
        let mut opt = Adam::new(0.1);
        opt.step(&mut params, &grads);
        assert!(params[0] < 1.0);
        assert!(params[1] > -1.0);
    }

    #[test]
    fn test_converges_on_quadratic() {
        // Minimize (x - 3)²; gradient is 2(x - 3).
        let mut params = vec![0.0];
        let mut opt = Adam::new(0.1);
        for _ in 0..500 {
            let grads = vec![2.0 * (params[0] - 3.0)];
            opt.step(&mut params, &grads);
        }
        assert!((params[0] - 3.0).abs() < 1e-3, "got {}", params[0]);
    }

    #[test]
    fn test_non_finite_gradient_skipped() {
        let mut params = vec![1.0, 2.0];
        let grads = vec![f64::NAN, 1.0];
        let mut opt = Adam::new(0.1);
        opt.step(&mut params, &grads);
        assert_eq!(params[0], 1.0);
        assert!(params[1] < 2.0);
    }
}
