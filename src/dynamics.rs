//! Contracts for dynamical systems and their numerical integration.
//!
//! Only the contracts are normative; concrete integration schemes are
//! pluggable. A forward-Euler scheme is provided as the stock implementation.
use crate::error::NeuroError;
use crate::series::{TimeSeries, Units};

/// A continuous-time dynamical system dx/dt = f(t, x, u) with output y = g(t, x).
pub trait DynamicalSystem {
    /// Returns the current state vector.
    fn state(&self) -> &[f64];

    /// Replace the state vector. Returns an error on a dimension mismatch.
    fn set_state(&mut self, state: Vec<f64>) -> Result<(), NeuroError>;

    /// The state derivative at time `t` under input `input`.
    fn derivative(&self, t: f64, input: &[f64]) -> Vec<f64>;

    /// The output vector at time `t`.
    fn output(&self, t: f64) -> Vec<f64>;

    /// Returns the dimension of the input vector.
    fn input_dimension(&self) -> usize;

    /// Returns the dimension of the output vector.
    fn output_dimension(&self) -> usize;
}

/// A numerical integrator of ordinary differential equations.
///
/// The input series must be defined at least at the desired start and end
/// times of integration; how an implementation interpolates between input
/// samples is its own choice.
pub trait Integrator {
    /// Integrate the given system over the time span of the input series,
    /// mutating the system state. Returns the time series of output vectors.
    fn integrate(
        &self,
        system: &mut dyn DynamicalSystem,
        input: &TimeSeries,
    ) -> Result<TimeSeries, NeuroError>;
}

/// Forward-Euler integration with a bounded step size and zero-order hold of
/// the input between samples.
#[derive(Debug, Clone, PartialEq)]
pub struct EulerIntegrator {
    max_time_step: f64,
}

impl EulerIntegrator {
    /// Create an integrator that never steps coarser than `max_time_step`.
    pub fn new(max_time_step: f64) -> Self {
        EulerIntegrator { max_time_step }
    }

    /// Returns the maximum integration time step.
    pub fn max_time_step(&self) -> f64 {
        self.max_time_step
    }
}

impl Integrator for EulerIntegrator {
    fn integrate(
        &self,
        system: &mut dyn DynamicalSystem,
        input: &TimeSeries,
    ) -> Result<TimeSeries, NeuroError> {
        if input.len() < 2 {
            return Err(NeuroError::InvalidArgument(
                "The input series must be defined at least at the start and end times".to_string(),
            ));
        }
        if input.dimension() != system.input_dimension() {
            return Err(NeuroError::InvalidArgument(format!(
                "Input of dimension {} given for a system with input dimension {}",
                input.dimension(),
                system.input_dimension()
            )));
        }

        let times = input.times();
        let t0 = times[0];
        let t1 = times[times.len() - 1];
        let len = t1 - t0;
        let steps = (len / self.max_time_step).ceil() as usize;
        let dt = len / steps as f64;

        let mut output = TimeSeries::empty(Units::Unknown);
        output.append(t0, system.output(t0))?;

        let mut input_index = 0;
        for i in 0..steps {
            let t = t0 + i as f64 * dt;
            while input_index + 1 < times.len() && times[input_index + 1] <= t {
                input_index += 1;
            }
            let u = &input.values()[input_index];

            let derivative = system.derivative(t, u);
            let state = system
                .state()
                .iter()
                .zip(derivative.iter())
                .map(|(x, dx)| x + dt * dx)
                .collect();
            system.set_state(state)?;
            output.append(t + dt, system.output(t + dt))?;
        }

        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// First-order low-pass: tau dx/dt = u - x, y = x.
    struct LowPass {
        tau: f64,
        state: Vec<f64>,
    }

    impl DynamicalSystem for LowPass {
        fn state(&self) -> &[f64] {
            &self.state
        }

        fn set_state(&mut self, state: Vec<f64>) -> Result<(), NeuroError> {
            if state.len() != 1 {
                return Err(NeuroError::InvalidArgument(
                    "LowPass state is one-dimensional".to_string(),
                ));
            }
            self.state = state;
            Ok(())
        }

        fn derivative(&self, _t: f64, input: &[f64]) -> Vec<f64> {
            vec![(input[0] - self.state[0]) / self.tau]
        }

        fn output(&self, _t: f64) -> Vec<f64> {
            self.state.clone()
        }

        fn input_dimension(&self) -> usize {
            1
        }

        fn output_dimension(&self) -> usize {
            1
        }
    }

    #[test]
    fn test_integrate_requires_two_samples() {
        let mut system = LowPass {
            tau: 0.01,
            state: vec![0.0],
        };
        let integrator = EulerIntegrator::new(0.001);
        let input = TimeSeries::build_1d(vec![0.0], vec![1.0], Units::Unknown).unwrap();
        assert!(integrator.integrate(&mut system, &input).is_err());
    }

    #[test]
    fn test_integrate_step_response() {
        let mut system = LowPass {
            tau: 0.01,
            state: vec![0.0],
        };
        let integrator = EulerIntegrator::new(0.0001);
        let input = TimeSeries::build_1d(vec![0.0, 0.1], vec![1.0, 1.0], Units::Unknown).unwrap();
        let output = integrator.integrate(&mut system, &input).unwrap();

        // After ten time constants the response has settled at the input.
        let (t, y) = output.last().unwrap();
        assert!((t - 0.1).abs() < 1e-9);
        assert!((y[0] - 1.0).abs() < 1e-3);
    }
}
