//! A source node that produces real-valued output from functions of
//! simulated time.
use serde::{Deserialize, Serialize};

use crate::error::NeuroError;
use crate::function::Function;
use crate::listener::{ChangeEvent, ChangeListener, ListenerSet};
use crate::mode::SimulationMode;
use crate::output::{InstantaneousOutput, Origin};
use crate::probe::Probeable;
use crate::series::{TimeSeries, Units};

/// Name of the sole origin of a [`FunctionInput`].
pub const ORIGIN_NAME: &str = "origin";

/// Name of the probeable state of a [`FunctionInput`].
pub const STATE_NAME: &str = "input";

/// A node that evaluates a set of functions of simulated time and publishes
/// the resulting vector, one dimension per function. It has no terminations.
#[derive(Debug, Serialize, Deserialize)]
pub struct FunctionInput {
    name: String,
    functions: Vec<Function>,
    units: Units,
    time: f64,
    origin: Origin,
    #[serde(skip)]
    listeners: ListenerSet,
}

impl FunctionInput {
    /// Create a function input. Each function contributes one output
    /// dimension and must have input dimension 1 (a function of time);
    /// anything else is a structural error. The initial output is f(0).
    pub fn build(name: &str, functions: Vec<Function>, units: Units) -> Result<Self, NeuroError> {
        check_function_dimension(&functions)?;
        let mut input = FunctionInput {
            name: name.to_string(),
            origin: Origin::new(ORIGIN_NAME, functions.len(), units),
            functions,
            units,
            time: 0.0,
            listeners: ListenerSet::new(),
        };
        input.run(0.0, 0.0)?;
        Ok(input)
    }

    /// Returns the name of the node.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Rename the node and notify listeners.
    pub fn set_name(&mut self, name: &str) {
        let old_name = std::mem::replace(&mut self.name, name.to_string());
        self.listeners.notify(&ChangeEvent::NameChanged {
            old_name,
            new_name: name.to_string(),
        });
    }

    /// Returns the functions defining the output.
    pub fn functions(&self) -> &[Function] {
        &self.functions[..]
    }

    /// Replace the function set, resizing the origin to match.
    /// Fails with a structural error if any function is not unary.
    pub fn set_functions(&mut self, functions: Vec<Function>) -> Result<(), NeuroError> {
        check_function_dimension(&functions)?;
        self.origin.set_dimension(functions.len());
        self.functions = functions;
        Ok(())
    }

    /// Returns the node's current simulated time.
    pub fn time(&self) -> f64 {
        self.time
    }

    /// Returns the sole output port.
    pub fn origin(&self) -> &Origin {
        &self.origin
    }

    /// Returns a mutable reference to the output port (e.g., to attach noise).
    pub fn origin_mut(&mut self) -> &mut Origin {
        &mut self.origin
    }

    /// This node has no terminations; any lookup fails.
    pub fn get_termination(&self, _name: &str) -> Result<(), NeuroError> {
        Err(NeuroError::Structural(
            "This node has no terminations".to_string(),
        ))
    }

    /// This call has no effect; the default mode is always used.
    pub fn set_mode(&mut self, _mode: SimulationMode) {}

    /// Returns the node's simulation mode, always the default.
    pub fn mode(&self) -> SimulationMode {
        SimulationMode::Default
    }

    /// Evaluate each function at the end of the interval (a right-endpoint
    /// sample, not an average over the interval) and republish the vector.
    pub fn run(&mut self, _start_time: f64, end_time: f64) -> Result<(), NeuroError> {
        self.time = end_time;
        let values: Vec<f64> = self
            .functions
            .iter()
            .map(|function| function.map(&[end_time]))
            .collect();
        self.origin.set_values(InstantaneousOutput::Real {
            values,
            units: self.units,
            time: end_time,
        })
    }

    /// Restore the initial condition: the noise model back to its initial
    /// state, time back to 0, and the origin republished with the function
    /// values at t = 0, as at construction.
    pub fn reset(&mut self, _randomize: bool) {
        self.origin.reset();
        // The same publication as at construction; the origin dimension
        // always equals the function count, so this cannot fail.
        let _ = self.run(0.0, 0.0);
    }

    /// Register a change listener; returns its registration id.
    pub fn add_change_listener(&mut self, listener: Box<dyn ChangeListener>) -> usize {
        self.listeners.add(listener)
    }

    /// Deregister a change listener. Unknown ids are ignored.
    pub fn remove_change_listener(&mut self, id: usize) {
        self.listeners.remove(id);
    }

    /// An independent copy: functions and any attached noise model are deep
    /// copied; listeners are not carried over.
    pub fn try_clone(&self) -> Result<FunctionInput, NeuroError> {
        let mut clone = FunctionInput {
            name: self.name.clone(),
            functions: self.functions.clone(),
            units: self.units,
            time: self.time,
            origin: Origin::new(ORIGIN_NAME, self.functions.len(), self.units),
            listeners: ListenerSet::new(),
        };
        // Values first: attaching noise before copying would perturb the
        // copied values a second time.
        clone
            .origin
            .set_values(self.origin.values().clone())
            .map_err(|e| NeuroError::CloneError(format!("Problem copying origin values: {}", e)))?;
        clone
            .origin
            .set_noise(self.origin.noise().map(|noise| noise.clone_box()));
        Ok(clone)
    }
}

fn check_function_dimension(functions: &[Function]) -> Result<(), NeuroError> {
    for function in functions {
        if function.dimension() != 1 {
            return Err(NeuroError::Structural(
                "All functions in a function input must be 1-D functions of time".to_string(),
            ));
        }
    }
    Ok(())
}

impl Probeable for FunctionInput {
    fn history(&self, state: &str) -> Result<TimeSeries, NeuroError> {
        if state != STATE_NAME {
            return Err(NeuroError::Simulation(format!(
                "State {} is unknown",
                state
            )));
        }
        let values = self.origin.values().to_vector();
        TimeSeries::build(vec![self.time], vec![values], self.units)
    }

    fn list_states(&self) -> Vec<(String, String)> {
        vec![(STATE_NAME.to_string(), "Function of time".to_string())]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::noise::GaussianNoise;

    #[test]
    fn test_build_rejects_multidimensional_function() {
        let result = FunctionInput::build(
            "input",
            vec![Function::Identity {
                dimension: 2,
                index: 0,
            }],
            Units::Unknown,
        );
        assert_eq!(
            result.err(),
            Some(NeuroError::Structural(
                "All functions in a function input must be 1-D functions of time".to_string()
            ))
        );
    }

    #[test]
    fn test_run_evaluates_at_interval_end() {
        let mut input = FunctionInput::build(
            "input",
            vec![
                Function::Linear {
                    slope: 1.0,
                    intercept: 0.0,
                },
                Function::Linear {
                    slope: 2.0,
                    intercept: 0.0,
                },
            ],
            Units::Unknown,
        )
        .unwrap();
        input.run(0.0, 1.0).unwrap();
        assert_eq!(
            input.origin().values(),
            &InstantaneousOutput::Real {
                values: vec![1.0, 2.0],
                units: Units::Unknown,
                time: 1.0,
            }
        );
    }

    #[test]
    fn test_initial_state_is_f_of_zero() {
        let input = FunctionInput::build(
            "input",
            vec![Function::Constant { value: 7.0 }],
            Units::Unknown,
        )
        .unwrap();
        assert_eq!(input.origin().values().to_vector(), vec![7.0]);
    }

    #[test]
    fn test_reset_restores_initial_output() {
        let mut input = FunctionInput::build(
            "input",
            vec![Function::Constant { value: 3.0 }],
            Units::Unknown,
        )
        .unwrap();
        let initial = input.origin().values().clone();

        input.run(0.0, 0.5).unwrap();
        input.reset(false);
        assert_eq!(input.time(), 0.0);
        assert_eq!(input.origin().values(), &initial);
        assert_eq!(input.origin().values().to_vector(), vec![3.0]);
    }

    #[test]
    fn test_no_terminations() {
        let input =
            FunctionInput::build("input", vec![Function::Constant { value: 0.0 }], Units::Unknown)
                .unwrap();
        assert!(input.get_termination("T").is_err());
    }

    #[test]
    fn test_set_functions_resizes_origin() {
        let mut input =
            FunctionInput::build("input", vec![Function::Constant { value: 0.0 }], Units::Unknown)
                .unwrap();
        input
            .set_functions(vec![
                Function::Constant { value: 1.0 },
                Function::Constant { value: 2.0 },
            ])
            .unwrap();
        assert_eq!(input.origin().dimension(), 2);
        assert!(input
            .set_functions(vec![Function::Identity {
                dimension: 3,
                index: 1
            }])
            .is_err());
    }

    #[test]
    fn test_history() {
        let mut input = FunctionInput::build(
            "input",
            vec![Function::Linear {
                slope: 3.0,
                intercept: 0.0,
            }],
            Units::Unknown,
        )
        .unwrap();
        input.run(0.0, 2.0).unwrap();
        let history = input.history(STATE_NAME).unwrap();
        assert_eq!(history.times(), &[2.0]);
        assert_eq!(history.values(), &[vec![6.0]]);
        assert!(input.history("V").is_err());
    }

    #[test]
    fn test_clone_carries_noise_model() {
        let mut input =
            FunctionInput::build("input", vec![Function::Constant { value: 1.0 }], Units::Unknown)
                .unwrap();
        input
            .origin_mut()
            .set_noise(Some(Box::new(GaussianNoise::new(0.1, 42))));
        let clone = input.try_clone().unwrap();
        assert!(clone.origin().noise().is_some());
        assert_eq!(clone.origin().values(), input.origin().values());
    }
}
