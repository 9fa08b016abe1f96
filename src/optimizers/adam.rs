//! Adam (Adaptive Moment Estimation) optimizer implementation

use crate::optimizers::Optimizer;

/// Adam optimizer.
///
/// Keeps an exponential moving average of the gradient (`m`) and of its
/// square (`v`) for every parameter, with bias correction for the early steps:
///
/// ```text
/// m_t = β1 * m_{t-1} + (1 - β1) * gradient
/// v_t = β2 * v_{t-1} + (1 - β2) * gradient²
/// m_hat = m_t / (1 - β1^t)
/// v_hat = v_t / (1 - β2^t)
/// parameter = parameter - α * m_hat / (√v_hat + ε)
/// ```
///
/// Moment buffers are sized lazily on the first update.
///
/// Kingma, D. P., & Ba, J. (2014). Adam: A method for stochastic optimization.
pub struct Adam {
    learning_rate: f32,
    beta1: f32,
    beta2: f32,
    epsilon: f32,
    m: Vec<f32>,
    v: Vec<f32>,
    t: i32,
}

impl Adam {
    /// Creates a new Adam optimizer with explicit hyperparameters.
    ///
    /// # Examples
    ///
    /// ```
    /// use signs_cnn::optimizers::{Adam, Optimizer};
    ///
    /// let optimizer = Adam::new(0.001, 0.9, 0.999, 1e-8);
    /// assert_eq!(optimizer.learning_rate(), 0.001);
    /// ```
    pub fn new(learning_rate: f32, beta1: f32, beta2: f32, epsilon: f32) -> Self {
        Self {
            learning_rate,
            beta1,
            beta2,
            epsilon,
            m: Vec::new(),
            v: Vec::new(),
            t: 0,
        }
    }

    /// Adam with β1 = 0.9, β2 = 0.999, ε = 1e-8.
    pub fn with_learning_rate(learning_rate: f32) -> Self {
        Self::new(learning_rate, 0.9, 0.999, 1e-8)
    }
}

impl Optimizer for Adam {
    fn update(&mut self, parameters: &mut [f32], gradients: &[f32]) {
        assert_eq!(
            parameters.len(),
            gradients.len(),
            "Parameters and gradients must have the same length"
        );

        if self.m.len() != parameters.len() {
            self.m = vec![0.0; parameters.len()];
            self.v = vec![0.0; parameters.len()];
            self.t = 0;
        }

        self.t += 1;
        let bias_correction1 = 1.0 - self.beta1.powi(self.t);
        let bias_correction2 = 1.0 - self.beta2.powi(self.t);

        for (((param, &grad), m), v) in parameters
            .iter_mut()
            .zip(gradients)
            .zip(self.m.iter_mut())
            .zip(self.v.iter_mut())
        {
            *m = self.beta1 * *m + (1.0 - self.beta1) * grad;
            *v = self.beta2 * *v + (1.0 - self.beta2) * grad * grad;

            let m_hat = *m / bias_correction1;
            let v_hat = *v / bias_correction2;
            *param -= self.learning_rate * m_hat / (v_hat.sqrt() + self.epsilon);
        }
    }

    fn learning_rate(&self) -> f32 {
        self.learning_rate
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_adam_first_step_is_learning_rate_sized() {
        // With bias correction the first step moves each parameter by ~lr * sign(grad).
        let mut optimizer = Adam::with_learning_rate(0.01);
        let mut params = vec![1.0, 1.0];
        optimizer.update(&mut params, &[4.0, -0.001]);

        assert!((params[0] - 0.99).abs() < 1e-5);
        assert!((params[1] - 1.01).abs() < 1e-4);
        assert_eq!(optimizer.t, 1);
    }

    #[test]
    fn test_adam_state_persistence() {
        let mut optimizer = Adam::with_learning_rate(0.01);
        let mut params = vec![1.0, 2.0];

        optimizer.update(&mut params, &[0.1, 0.2]);
        let m_after_first = optimizer.m.clone();
        optimizer.update(&mut params, &[0.1, 0.2]);

        assert_eq!(optimizer.t, 2);
        assert_ne!(optimizer.m, m_after_first);
    }

    #[test]
    fn test_adam_restarts_on_new_tensor_length() {
        let mut optimizer = Adam::with_learning_rate(0.001);
        let mut params = vec![1.0, 2.0, 3.0];
        optimizer.update(&mut params, &[0.1, 0.2, 0.3]);
        optimizer.update(&mut params, &[0.1, 0.2, 0.3]);

        let mut other = vec![1.0];
        optimizer.update(&mut other, &[0.5]);

        assert_eq!(optimizer.t, 1);
        assert_eq!(optimizer.m.len(), 1);
    }

    #[test]
    fn test_adam_minimizes_quadratic() {
        // f(x) = (x - 3)², gradient 2(x - 3).
        let mut optimizer = Adam::with_learning_rate(0.1);
        let mut x = vec![0.0f32];
        for _ in 0..500 {
            let grad = [2.0 * (x[0] - 3.0)];
            optimizer.update(&mut x, &grad);
        }
        assert!((x[0] - 3.0).abs() < 0.05, "x = {}", x[0]);
    }

    #[test]
    #[should_panic(expected = "Parameters and gradients must have the same length")]
    fn test_adam_mismatched_lengths() {
        let mut optimizer = Adam::with_learning_rate(0.001);
        let mut params = vec![1.0, 2.0, 3.0];
        optimizer.update(&mut params, &[0.1, 0.2]);
    }
}
