//! Named input ports carrying weight matrices.
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

use crate::error::NeuroError;

/// A named input port. The weight matrix maps the input dimension (columns)
/// to unit-local influence (rows). A modulatory termination contributes no
/// drive current; its input is available to plasticity rules instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Termination {
    name: String,
    weights: DMatrix<f64>,
    tau_psc: f64,
    modulatory: bool,
    input: Option<Vec<f64>>,
}

impl Termination {
    /// Create a termination from weight rows. All rows must have the same
    /// length (the termination's dimension); ragged or empty rows are a
    /// structural error.
    pub fn build(
        name: &str,
        weight_rows: &[Vec<f64>],
        tau_psc: f64,
        modulatory: bool,
    ) -> Result<Self, NeuroError> {
        let dimension = match weight_rows.first() {
            Some(row) => row.len(),
            None => {
                return Err(NeuroError::Structural(format!(
                    "Termination '{}' needs at least one weight row",
                    name
                )))
            }
        };
        if weight_rows.iter().any(|row| row.len() != dimension) {
            return Err(NeuroError::Structural(format!(
                "All weight rows of termination '{}' must have the same length",
                name
            )));
        }

        let flat: Vec<f64> = weight_rows.iter().flatten().copied().collect();
        Ok(Termination {
            name: name.to_string(),
            weights: DMatrix::from_row_slice(weight_rows.len(), dimension, &flat),
            tau_psc,
            modulatory,
            input: None,
        })
    }

    /// Returns the name of the termination.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the dimension (number of weight columns).
    pub fn dimension(&self) -> usize {
        self.weights.ncols()
    }

    /// Returns the weight matrix.
    pub fn weights(&self) -> &DMatrix<f64> {
        &self.weights
    }

    /// Replace the weight matrix. The shape must be unchanged.
    pub fn set_weights(&mut self, weights: DMatrix<f64>) -> Result<(), NeuroError> {
        if weights.shape() != self.weights.shape() {
            return Err(NeuroError::Structural(format!(
                "Termination '{}' has weight shape {:?}, not {:?}",
                self.name,
                self.weights.shape(),
                weights.shape()
            )));
        }
        self.weights = weights;
        Ok(())
    }

    /// Returns the post-synaptic time constant (s).
    pub fn tau_psc(&self) -> f64 {
        self.tau_psc
    }

    /// Returns true if the termination is modulatory.
    pub fn modulatory(&self) -> bool {
        self.modulatory
    }

    /// Hold a new input vector on the termination.
    /// Returns a simulation error on a dimension mismatch.
    pub fn set_input(&mut self, values: Vec<f64>) -> Result<(), NeuroError> {
        if values.len() != self.dimension() {
            return Err(NeuroError::Simulation(format!(
                "Input of dimension {} delivered to termination '{}' of dimension {}",
                values.len(),
                self.name,
                self.dimension()
            )));
        }
        self.input = Some(values);
        Ok(())
    }

    /// Returns the currently held input vector, if any.
    pub fn input(&self) -> Option<&[f64]> {
        self.input.as_deref()
    }

    /// Discard the held input.
    pub fn clear_input(&mut self) {
        self.input = None;
    }

    /// The drive this termination currently contributes: weights times the
    /// held input, or zeros when no input is held or the termination is
    /// modulatory.
    pub fn drive(&self) -> Vec<f64> {
        if self.modulatory {
            return vec![0.0; self.weights.nrows()];
        }
        match &self.input {
            Some(input) => {
                let x = nalgebra::DVector::from_column_slice(input);
                (&self.weights * x).iter().copied().collect()
            }
            None => vec![0.0; self.weights.nrows()],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_ragged_rows() {
        assert!(Termination::build("T", &[vec![1.0, 2.0], vec![3.0]], 0.01, false).is_err());
        assert!(Termination::build("T", &[], 0.01, false).is_err());
    }

    #[test]
    fn test_dimension_and_weights() {
        let termination =
            Termination::build("T", &[vec![1.0, 2.0], vec![3.0, 4.0]], 0.01, false).unwrap();
        assert_eq!(termination.dimension(), 2);
        assert_eq!(termination.weights()[(1, 0)], 3.0);
    }

    #[test]
    fn test_set_input_dimension_check() {
        let mut termination = Termination::build("T", &[vec![1.0, 2.0]], 0.01, false).unwrap();
        assert!(termination.set_input(vec![1.0]).is_err());
        assert!(termination.set_input(vec![1.0, 1.0]).is_ok());
        assert_eq!(termination.input(), Some(&[1.0, 1.0][..]));
    }

    #[test]
    fn test_drive() {
        let mut termination = Termination::build("T", &[vec![1.0, 2.0]], 0.01, false).unwrap();
        assert_eq!(termination.drive(), vec![0.0]);
        termination.set_input(vec![2.0, 3.0]).unwrap();
        assert_eq!(termination.drive(), vec![8.0]);
    }

    #[test]
    fn test_modulatory_contributes_no_drive() {
        let mut termination = Termination::build("T", &[vec![1.0]], 0.01, true).unwrap();
        termination.set_input(vec![5.0]).unwrap();
        assert_eq!(termination.drive(), vec![0.0]);
    }
}
