//! Functions of simulated time, used to drive source nodes.
use serde::{Deserialize, Serialize};

/// A real-valued function of a real vector. Functions driving a
/// [`FunctionInput`](crate::input::FunctionInput) must have input dimension 1
/// (functions of simulated time).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Function {
    /// f(t) = value.
    Constant { value: f64 },
    /// f(t) = slope * t + intercept.
    Linear { slope: f64, intercept: f64 },
    /// f(t) = amplitude * sin(omega * t + phase).
    Sine {
        amplitude: f64,
        omega: f64,
        phase: f64,
    },
    /// f(x) = x[index], a function of a `dimension`-dimensional vector.
    Identity { dimension: usize, index: usize },
}

impl Function {
    /// Returns the input dimension of the function.
    pub fn dimension(&self) -> usize {
        match self {
            Function::Identity { dimension, .. } => *dimension,
            _ => 1,
        }
    }

    /// Evaluate the function at the given point. Missing coordinates are
    /// treated as zero.
    pub fn map(&self, from: &[f64]) -> f64 {
        let t = from.first().copied().unwrap_or(0.0);
        match self {
            Function::Constant { value } => *value,
            Function::Linear { slope, intercept } => slope * t + intercept,
            Function::Sine {
                amplitude,
                omega,
                phase,
            } => amplitude * (omega * t + phase).sin(),
            Function::Identity { index, .. } => from.get(*index).copied().unwrap_or(0.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dimension() {
        assert_eq!(Function::Constant { value: 1.0 }.dimension(), 1);
        assert_eq!(
            Function::Identity {
                dimension: 2,
                index: 0
            }
            .dimension(),
            2
        );
    }

    #[test]
    fn test_map() {
        let linear = Function::Linear {
            slope: 2.0,
            intercept: 1.0,
        };
        assert_eq!(linear.map(&[0.0]), 1.0);
        assert_eq!(linear.map(&[2.0]), 5.0);

        let sine = Function::Sine {
            amplitude: 3.0,
            omega: 1.0,
            phase: 0.0,
        };
        assert_eq!(sine.map(&[0.0]), 0.0);

        let identity = Function::Identity {
            dimension: 2,
            index: 1,
        };
        assert_eq!(identity.map(&[1.0, 7.0]), 7.0);
    }
}
