//! Pluggable weight-update policies bound to termination names.
use nalgebra::DMatrix;

/// A weight-update policy. Given the current weights, the input most recently
/// delivered to the termination, and the unit's output, the rule produces a
/// weight derivative to be applied by the owning unit.
pub trait PlasticityRule: std::fmt::Debug + Send {
    /// The weight derivative (same shape as `weights`).
    fn derivative(
        &self,
        weights: &DMatrix<f64>,
        input: &[f64],
        output: &[f64],
        time: f64,
    ) -> DMatrix<f64>;

    /// An independent copy of the rule.
    fn clone_box(&self) -> Box<dyn PlasticityRule>;
}

impl Clone for Box<dyn PlasticityRule> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

/// A rate-based Hebbian rule: dW = learning_rate * output ⊗ input.
#[derive(Debug, Clone, PartialEq)]
pub struct RateHebbRule {
    learning_rate: f64,
}

impl RateHebbRule {
    pub fn new(learning_rate: f64) -> Self {
        RateHebbRule { learning_rate }
    }

    /// Returns the learning rate.
    pub fn learning_rate(&self) -> f64 {
        self.learning_rate
    }
}

impl PlasticityRule for RateHebbRule {
    fn derivative(
        &self,
        weights: &DMatrix<f64>,
        input: &[f64],
        output: &[f64],
        _time: f64,
    ) -> DMatrix<f64> {
        let mut derivative = DMatrix::zeros(weights.nrows(), weights.ncols());
        for i in 0..weights.nrows() {
            for j in 0..weights.ncols() {
                let post = output.get(i).copied().unwrap_or(0.0);
                let pre = input.get(j).copied().unwrap_or(0.0);
                derivative[(i, j)] = self.learning_rate * post * pre;
            }
        }
        derivative
    }

    fn clone_box(&self) -> Box<dyn PlasticityRule> {
        Box::new(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hebb_derivative_is_outer_product() {
        let rule = RateHebbRule::new(0.1);
        let weights = DMatrix::zeros(1, 2);
        let derivative = rule.derivative(&weights, &[2.0, 3.0], &[4.0], 0.0);
        assert_eq!(derivative[(0, 0)], 0.1 * 4.0 * 2.0);
        assert_eq!(derivative[(0, 1)], 0.1 * 4.0 * 3.0);
    }

    #[test]
    fn test_clone_box() {
        let rule = RateHebbRule::new(0.1);
        let clone = rule.clone_box();
        let weights = DMatrix::zeros(1, 1);
        assert_eq!(
            rule.derivative(&weights, &[1.0], &[1.0], 0.0),
            clone.derivative(&weights, &[1.0], &[1.0], 0.0)
        );
    }
}
