//! A leaky-integrate-and-fire model of spike generation.
//!
//! The subthreshold model is C dV(t)/dt + V(t)/R = I(t); a spike occurs when
//! V reaches a threshold (spike-related currents are not modelled). For
//! simplicity the membrane resistance and firing threshold are fixed at 1,
//! which does not limit the behaviour of the model.
use serde::{Deserialize, Serialize};

use crate::error::NeuroError;
use crate::mode::SimulationMode;
use crate::output::InstantaneousOutput;
use crate::probe::Probeable;
use crate::series::{TimeSeries, Units};
use crate::{FIRING_THRESHOLD, MAX_TIME_STEP_SLACK, MEMBRANE_RESISTANCE};

/// Leaky-integrate-and-fire spike generator.
///
/// Supports all four simulation modes. In the spiking modes the requested
/// interval is subdivided into equal sub-steps no coarser than the maximum
/// time step, the injected current is held piecewise constant, and spike
/// times are linearly interpolated within the sub-step in which the threshold
/// was crossed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LifSpikeGenerator {
    /// Scaled slightly above the configured value; float division of the
    /// interval length by the nominal step can otherwise produce an extra step.
    max_time_step: f64,
    tau_rc: f64,
    tau_ref: f64,
    initial_voltage: f64,

    voltage: f64,
    time_since_last_spike: f64,

    time_history: Vec<f64>,
    voltage_history: Vec<f64>,

    mode: SimulationMode,
    supported_modes: Vec<SimulationMode>,
}

impl LifSpikeGenerator {
    /// Create a generator with the default time constants
    /// (0.5 ms maximum step, 20 ms membrane constant, 2 ms refractory period).
    pub fn default_constants() -> Self {
        LifSpikeGenerator::new(0.0005, 0.02, 0.002)
    }

    /// Create a generator with zero initial voltage.
    ///
    /// * `max_time_step` - maximum integration time step (s); shorter steps are
    ///   used when a run length is not an integer multiple of this value
    /// * `tau_rc` - resistive-capacitive time constant (s)
    /// * `tau_ref` - refractory period (s)
    pub fn new(max_time_step: f64, tau_rc: f64, tau_ref: f64) -> Self {
        LifSpikeGenerator::with_initial_voltage(max_time_step, tau_rc, tau_ref, 0.0)
    }

    /// Create a generator with the given initial condition on V.
    pub fn with_initial_voltage(
        max_time_step: f64,
        tau_rc: f64,
        tau_ref: f64,
        initial_voltage: f64,
    ) -> Self {
        let mut generator = LifSpikeGenerator {
            max_time_step: max_time_step * MAX_TIME_STEP_SLACK,
            tau_rc,
            tau_ref,
            initial_voltage,
            voltage: initial_voltage,
            time_since_last_spike: tau_ref,
            time_history: vec![],
            voltage_history: vec![],
            mode: SimulationMode::Default,
            supported_modes: vec![
                SimulationMode::Default,
                SimulationMode::ConstantRate,
                SimulationMode::Rate,
                SimulationMode::Precise,
            ],
        };
        generator.reset(false);
        generator
    }

    /// Returns the maximum integration time step (s).
    pub fn max_time_step(&self) -> f64 {
        self.max_time_step / MAX_TIME_STEP_SLACK
    }

    /// Set the maximum integration time step (s).
    pub fn set_max_time_step(&mut self, max: f64) {
        self.max_time_step = max * MAX_TIME_STEP_SLACK;
    }

    /// Returns the resistive-capacitive time constant (s).
    pub fn tau_rc(&self) -> f64 {
        self.tau_rc
    }

    /// Set the resistive-capacitive time constant (s).
    pub fn set_tau_rc(&mut self, tau_rc: f64) {
        self.tau_rc = tau_rc;
    }

    /// Returns the refractory period (s).
    pub fn tau_ref(&self) -> f64 {
        self.tau_ref
    }

    /// Set the refractory period (s).
    pub fn set_tau_ref(&mut self, tau_ref: f64) {
        self.tau_ref = tau_ref;
    }

    /// Returns the membrane voltage.
    pub fn voltage(&self) -> f64 {
        self.voltage
    }

    /// Returns the current simulation mode.
    pub fn mode(&self) -> SimulationMode {
        self.mode
    }

    /// Request a simulation mode. An unsupported request resolves to the
    /// closest supported mode.
    pub fn set_mode(&mut self, mode: SimulationMode) {
        self.mode = SimulationMode::closest(mode, &self.supported_modes);
    }

    /// Returns the modes this generator supports.
    pub fn supported_modes(&self) -> &[SimulationMode] {
        &self.supported_modes[..]
    }

    /// Restore the initial voltage, clear the trajectory history, and reset
    /// the refractory clock to its own threshold so the unit is immediately
    /// eligible to spike. The `randomize` flag is accepted for interface
    /// uniformity; this generator's reset is deterministic regardless.
    pub fn reset(&mut self, _randomize: bool) {
        self.time_since_last_spike = self.tau_ref;
        self.voltage = self.initial_voltage;
        self.time_history = vec![];
        self.voltage_history = vec![];
    }

    /// Advance the generator over the interval spanned by `times`, with the
    /// injected current sampled at (at least) those times.
    ///
    /// `times` must be strictly increasing with at least 2 entries and
    /// `currents` must have the same length; violations are invalid-argument
    /// errors. The result is packaged per the current mode.
    pub fn run(&mut self, times: &[f64], currents: &[f64]) -> Result<InstantaneousOutput, NeuroError> {
        self.check_arguments(times, currents)?;
        let end_time = times[times.len() - 1];

        match self.mode {
            SimulationMode::ConstantRate | SimulationMode::Rate => {
                let rate = self.constant_rate_run(currents[currents.len() - 1]);
                Ok(InstantaneousOutput::Real {
                    values: vec![rate],
                    units: Units::SpikesPerSecond,
                    time: end_time,
                })
            }
            SimulationMode::Precise => {
                let spike_time = self.precise_spiking_run(times, currents);
                Ok(InstantaneousOutput::PreciseSpikes {
                    times: vec![spike_time],
                    time: end_time,
                })
            }
            SimulationMode::Default => {
                let spike_time = self.precise_spiking_run(times, currents);
                Ok(InstantaneousOutput::Spikes {
                    pattern: vec![spike_time >= 0.0],
                    time: end_time,
                })
            }
        }
    }

    fn check_arguments(&self, times: &[f64], currents: &[f64]) -> Result<(), NeuroError> {
        if times.len() < 2 {
            return Err(NeuroError::InvalidArgument(
                "The time sequence must have length at least 2".to_string(),
            ));
        }
        if times.len() != currents.len() {
            return Err(NeuroError::InvalidArgument(format!(
                "{} time points given for {} current samples",
                times.len(),
                currents.len()
            )));
        }
        if times.windows(2).any(|w| w[1] <= w[0]) {
            return Err(NeuroError::InvalidArgument(
                "The time sequence must be strictly increasing".to_string(),
            ));
        }
        Ok(())
    }

    /// Integrate the subthreshold dynamics dV/dt = (I(t) - V) / tauRC over the
    /// requested interval and return the time of the last spike relative to
    /// the interval start, or -1 if no spike occurred.
    ///
    /// Earlier spikes within the same call are superseded; callers needing
    /// every spike must run at single-sub-step granularity.
    fn precise_spiking_run(&mut self, times: &[f64], currents: &[f64]) -> f64 {
        let len = times[times.len() - 1] - times[0];
        let steps = (len / self.max_time_step).ceil() as usize;
        let dt = len / steps as f64;

        self.time_history = Vec::with_capacity(steps);
        self.voltage_history = Vec::with_capacity(steps);

        let mut input_index = 0;
        let mut spike_time = -1.0;

        for i in 0..steps {
            let step_start = times[0] + i as f64 * dt;
            self.time_history.push(step_start);

            // Zero-order hold: the last sample at or before the sub-step time.
            while input_index + 1 < times.len() && times[input_index + 1] <= step_start {
                input_index += 1;
            }
            let current = currents[input_index];

            let mut dv = (current * MEMBRANE_RESISTANCE - self.voltage) / self.tau_rc;
            self.time_since_last_spike += dt;
            if self.time_since_last_spike < self.tau_ref {
                dv = 0.0;
            } else if self.time_since_last_spike < self.tau_ref + dt {
                // Partial-step linear blending out of refractoriness.
                dv *= (self.time_since_last_spike - self.tau_ref) / dt;
            }
            let previous_voltage = self.voltage;
            self.voltage = (self.voltage + dt * dv).max(0.0);
            self.voltage_history.push(self.voltage);

            if self.voltage >= FIRING_THRESHOLD {
                // Linear interpolation between the pre- and post-update voltage.
                let d_spike =
                    (FIRING_THRESHOLD - previous_voltage) * dt / (self.voltage - previous_voltage);
                self.time_since_last_spike = dt - d_spike;
                spike_time = i as f64 * dt + d_spike;
                self.voltage = 0.0;
            }
        }

        spike_time
    }

    /// Closed-form instantaneous firing rate; no trajectory is computed, so
    /// no voltage history is available after a constant-rate run.
    fn constant_rate_run(&mut self, current: f64) -> f64 {
        self.time_history = vec![];
        self.voltage_history = vec![];

        // Implicitly Vth == R == 1.
        if current > 1.0 {
            1.0 / (self.tau_ref - self.tau_rc * (1.0 - 1.0 / current).ln())
        } else {
            0.0
        }
    }
}

impl Probeable for LifSpikeGenerator {
    fn history(&self, state: &str) -> Result<TimeSeries, NeuroError> {
        if state == "V" {
            TimeSeries::build_1d(
                self.time_history.clone(),
                self.voltage_history.clone(),
                Units::Avu,
            )
        } else {
            Err(NeuroError::Simulation(format!(
                "The state name {} is unknown",
                state
            )))
        }
    }

    fn list_states(&self) -> Vec<(String, String)> {
        vec![(
            "V".to_string(),
            "membrane potential (arbitrary units)".to_string(),
        )]
    }
}
