//! Instantaneous outputs of simulatable units and the origins that publish them.
use serde::{Deserialize, Serialize};

use crate::error::NeuroError;
use crate::noise::Noise;
use crate::series::Units;

/// The most recently computed output of a unit, packaged per simulation mode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum InstantaneousOutput {
    /// Real-valued output, e.g., firing rates or function values.
    Real {
        values: Vec<f64>,
        units: Units,
        time: f64,
    },
    /// Boolean spike pattern, one entry per dimension.
    Spikes { pattern: Vec<bool>, time: f64 },
    /// Precise spike times relative to the start of the last run interval.
    /// A negative entry means no spike occurred.
    PreciseSpikes { times: Vec<f64>, time: f64 },
}

impl InstantaneousOutput {
    /// Returns the dimension of the output.
    pub fn dimension(&self) -> usize {
        match self {
            InstantaneousOutput::Real { values, .. } => values.len(),
            InstantaneousOutput::Spikes { pattern, .. } => pattern.len(),
            InstantaneousOutput::PreciseSpikes { times, .. } => times.len(),
        }
    }

    /// Returns the simulated time at which the output was computed.
    pub fn time(&self) -> f64 {
        match self {
            InstantaneousOutput::Real { time, .. } => *time,
            InstantaneousOutput::Spikes { time, .. } => *time,
            InstantaneousOutput::PreciseSpikes { time, .. } => *time,
        }
    }

    /// Render the output as a real-valued vector for delivery to a
    /// termination: spikes map to 1.0/0.0, precise spike times to spike presence.
    pub fn to_vector(&self) -> Vec<f64> {
        match self {
            InstantaneousOutput::Real { values, .. } => values.clone(),
            InstantaneousOutput::Spikes { pattern, .. } => pattern
                .iter()
                .map(|&spiked| if spiked { 1.0 } else { 0.0 })
                .collect(),
            InstantaneousOutput::PreciseSpikes { times, .. } => times
                .iter()
                .map(|&t| if t >= 0.0 { 1.0 } else { 0.0 })
                .collect(),
        }
    }
}

/// A named output port holding the most recently computed output of a unit.
/// The dimension is fixed at construction but can be changed explicitly with
/// [`Origin::set_dimension`] when the backing function set changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Origin {
    name: String,
    dimension: usize,
    values: InstantaneousOutput,
    #[serde(skip)]
    noise: Option<Box<dyn Noise>>,
}

impl Origin {
    /// Create an origin publishing a zero vector of the given dimension.
    pub fn new(name: &str, dimension: usize, units: Units) -> Self {
        Origin {
            name: name.to_string(),
            dimension,
            values: InstantaneousOutput::Real {
                values: vec![0.0; dimension],
                units,
                time: 0.0,
            },
            noise: None,
        }
    }

    /// Returns the name of the origin.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the dimension of the origin.
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Resize the origin. Used when the function set backing it changes.
    pub fn set_dimension(&mut self, dimension: usize) {
        self.dimension = dimension;
    }

    /// Returns the most recently published output.
    pub fn values(&self) -> &InstantaneousOutput {
        &self.values
    }

    /// Publish a new output. Real-valued outputs pass through the attached
    /// noise model, if any. Returns an error on a dimension mismatch.
    pub fn set_values(&mut self, values: InstantaneousOutput) -> Result<(), NeuroError> {
        if values.dimension() != self.dimension {
            return Err(NeuroError::Simulation(format!(
                "Output of dimension {} published on origin '{}' of dimension {}",
                values.dimension(),
                self.name,
                self.dimension
            )));
        }
        self.values = match (values, self.noise.as_mut()) {
            (
                InstantaneousOutput::Real {
                    values,
                    units,
                    time,
                },
                Some(noise),
            ) => InstantaneousOutput::Real {
                values: values.into_iter().map(|v| noise.sample(time, v)).collect(),
                units,
                time,
            },
            (values, _) => values,
        };
        Ok(())
    }

    /// Attach or detach a noise model.
    pub fn set_noise(&mut self, noise: Option<Box<dyn Noise>>) {
        self.noise = noise;
    }

    /// Returns the attached noise model, if any.
    pub fn noise(&self) -> Option<&dyn Noise> {
        self.noise.as_deref()
    }

    /// Restore the origin to a zero output and reset the noise model.
    pub fn reset(&mut self) {
        self.values = InstantaneousOutput::Real {
            values: vec![0.0; self.dimension],
            units: Units::Unknown,
            time: 0.0,
        };
        if let Some(noise) = self.noise.as_mut() {
            noise.reset();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::noise::GaussianNoise;

    #[test]
    fn test_set_values_dimension_check() {
        let mut origin = Origin::new("origin", 2, Units::Unknown);
        assert!(origin
            .set_values(InstantaneousOutput::Real {
                values: vec![1.0],
                units: Units::Unknown,
                time: 0.0,
            })
            .is_err());
        assert!(origin
            .set_values(InstantaneousOutput::Spikes {
                pattern: vec![true, false],
                time: 0.0,
            })
            .is_ok());
    }

    #[test]
    fn test_to_vector() {
        let spikes = InstantaneousOutput::Spikes {
            pattern: vec![true, false],
            time: 0.0,
        };
        assert_eq!(spikes.to_vector(), vec![1.0, 0.0]);

        let precise = InstantaneousOutput::PreciseSpikes {
            times: vec![0.25, -1.0],
            time: 0.0,
        };
        assert_eq!(precise.to_vector(), vec![1.0, 0.0]);
    }

    #[test]
    fn test_noise_applies_to_real_output_only() {
        let mut origin = Origin::new("origin", 1, Units::Unknown);
        origin.set_noise(Some(Box::new(GaussianNoise::new(0.5, 42))));
        origin
            .set_values(InstantaneousOutput::Real {
                values: vec![1.0],
                units: Units::Unknown,
                time: 0.0,
            })
            .unwrap();
        // With sigma > 0, the published value is almost surely perturbed.
        match origin.values() {
            InstantaneousOutput::Real { values, .. } => assert_ne!(values[0], 1.0),
            _ => panic!("expected real output"),
        }

        origin
            .set_values(InstantaneousOutput::Spikes {
                pattern: vec![true],
                time: 0.1,
            })
            .unwrap();
        assert_eq!(
            origin.values(),
            &InstantaneousOutput::Spikes {
                pattern: vec![true],
                time: 0.1,
            }
        );
    }
}
