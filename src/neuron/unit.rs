//! A named, simulatable spiking unit built around a LIF generator.
use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::NeuroError;
use crate::mode::SimulationMode;
use crate::neuron::lif::LifSpikeGenerator;
use crate::output::Origin;
use crate::plasticity::PlasticityRule;
use crate::probe::Probeable;
use crate::series::{TimeSeries, Units};
use crate::termination::Termination;

/// Name of the output port of every spiking unit.
pub const AXON: &str = "AXON";

/// Plasticity bookkeeping of a plastic unit: rules keyed by termination name
/// and the interval at which they are applied.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlasticityState {
    #[serde(skip)]
    rules: HashMap<String, Box<dyn PlasticityRule>>,
    interval: f64,
    last_update: f64,
}

impl PlasticityState {
    fn new(interval: f64) -> Self {
        PlasticityState {
            rules: HashMap::new(),
            interval,
            last_update: 0.0,
        }
    }
}

/// A spiking model neuron: a LIF generator fed by the summed drive of its
/// terminations, publishing spikes on the origin [`AXON`].
///
/// The unit may be expandable (new single-row terminations can be added by
/// name) and may support plasticity (weight-update rules bound to
/// termination names, applied at a configurable interval).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpikingNeuron {
    name: String,
    generator: LifSpikeGenerator,
    terminations: Vec<Termination>,
    origin: Origin,
    expandable: bool,
    plasticity: Option<PlasticityState>,
    time: f64,
}

impl SpikingNeuron {
    /// Create an expandable, non-plastic unit.
    pub fn new(name: &str, generator: LifSpikeGenerator) -> Self {
        SpikingNeuron {
            name: name.to_string(),
            generator,
            terminations: vec![],
            origin: Origin::new(AXON, 1, Units::Spikes),
            expandable: true,
            plasticity: None,
            time: 0.0,
        }
    }

    /// Create a unit whose termination set is fixed: terminations given here
    /// exist from construction and none can be added or removed later.
    pub fn with_fixed_terminations(
        name: &str,
        generator: LifSpikeGenerator,
        terminations: Vec<Termination>,
    ) -> Self {
        SpikingNeuron {
            name: name.to_string(),
            generator,
            terminations,
            origin: Origin::new(AXON, 1, Units::Spikes),
            expandable: false,
            plasticity: None,
            time: 0.0,
        }
    }

    /// Returns the name of the unit.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Rename the unit.
    pub fn set_name(&mut self, name: &str) {
        self.name = name.to_string();
    }

    /// Returns the unit's current simulated time.
    pub fn time(&self) -> f64 {
        self.time
    }

    /// Returns the underlying spike generator.
    pub fn generator(&self) -> &LifSpikeGenerator {
        &self.generator
    }

    /// Returns the current simulation mode.
    pub fn mode(&self) -> SimulationMode {
        self.generator.mode()
    }

    /// Request a simulation mode; resolves to the closest supported one.
    pub fn set_mode(&mut self, mode: SimulationMode) {
        self.generator.set_mode(mode);
    }

    /// Returns the output port.
    pub fn origin(&self) -> &Origin {
        &self.origin
    }

    /// Returns a mutable reference to the output port (e.g., to attach noise).
    pub fn origin_mut(&mut self) -> &mut Origin {
        &mut self.origin
    }

    /// Returns true if new terminations can be added to this unit.
    pub fn is_expandable(&self) -> bool {
        self.expandable
    }

    /// Returns the terminations of the unit, in creation order.
    pub fn terminations(&self) -> &[Termination] {
        &self.terminations[..]
    }

    /// Returns the termination with the given name, if any.
    pub fn get_termination(&self, name: &str) -> Option<&Termination> {
        self.terminations.iter().find(|t| t.name() == name)
    }

    /// Returns a mutable reference to the termination with the given name.
    pub fn get_termination_mut(&mut self, name: &str) -> Option<&mut Termination> {
        self.terminations.iter_mut().find(|t| t.name() == name)
    }

    /// Add a single-row termination. Fails on a non-expandable unit, a
    /// duplicate name, or a weight matrix with more than one row.
    pub fn add_termination(
        &mut self,
        name: &str,
        weight_rows: &[Vec<f64>],
        tau_psc: f64,
        modulatory: bool,
    ) -> Result<(), NeuroError> {
        if !self.expandable {
            return Err(NeuroError::Structural(format!(
                "Unit '{}' does not accept new terminations",
                self.name
            )));
        }
        if self.get_termination(name).is_some() {
            return Err(NeuroError::Structural(format!(
                "Unit '{}' already has a termination named '{}'",
                self.name, name
            )));
        }
        if weight_rows.len() != 1 {
            return Err(NeuroError::Structural(format!(
                "A termination on a single unit takes exactly 1 weight row, {} given",
                weight_rows.len()
            )));
        }
        self.terminations
            .push(Termination::build(name, weight_rows, tau_psc, modulatory)?);
        Ok(())
    }

    /// Remove a termination by name.
    pub fn remove_termination(&mut self, name: &str) -> Result<(), NeuroError> {
        if !self.expandable {
            return Err(NeuroError::Structural(format!(
                "Unit '{}' does not allow removing terminations",
                self.name
            )));
        }
        match self.terminations.iter().position(|t| t.name() == name) {
            Some(index) => {
                self.terminations.remove(index);
                Ok(())
            }
            None => Err(NeuroError::Structural(format!(
                "Unit '{}' has no termination named '{}'",
                self.name, name
            ))),
        }
    }

    /// Returns true if the unit supports plasticity.
    pub fn is_plastic(&self) -> bool {
        self.plasticity.is_some()
    }

    /// Enable plasticity with the given update interval (s).
    pub fn enable_plasticity(&mut self, interval: f64) {
        self.plasticity = Some(PlasticityState::new(interval));
    }

    /// Returns the plasticity interval, if the unit is plastic.
    pub fn plasticity_interval(&self) -> Option<f64> {
        self.plasticity.as_ref().map(|p| p.interval)
    }

    /// Set the plasticity interval. Ignored on a non-plastic unit.
    pub fn set_plasticity_interval(&mut self, interval: f64) {
        if let Some(plasticity) = self.plasticity.as_mut() {
            plasticity.interval = interval;
        }
    }

    /// Bind a rule to a termination name, replacing any previous binding.
    /// Ignored on a non-plastic unit.
    pub fn set_plasticity_rule(&mut self, termination_name: &str, rule: Box<dyn PlasticityRule>) {
        if let Some(plasticity) = self.plasticity.as_mut() {
            plasticity.rules.insert(termination_name.to_string(), rule);
        }
    }

    /// Returns the rule bound to the given termination name, if any.
    pub fn get_plasticity_rule(&self, termination_name: &str) -> Option<&dyn PlasticityRule> {
        self.plasticity
            .as_ref()
            .and_then(|p| p.rules.get(termination_name))
            .map(|rule| rule.as_ref())
    }

    /// Advance the unit over `[start_time, end_time]`: sum the drive of all
    /// terminations, run the generator, republish the origin, and apply any
    /// due plasticity updates.
    pub fn run(&mut self, start_time: f64, end_time: f64) -> Result<(), NeuroError> {
        let drive: f64 = self
            .terminations
            .iter()
            .map(|termination| termination.drive().first().copied().unwrap_or(0.0))
            .sum();

        let output = self
            .generator
            .run(&[start_time, end_time], &[drive, drive])?;
        self.origin.set_values(output)?;
        self.time = end_time;

        self.apply_plasticity(end_time)?;
        Ok(())
    }

    fn apply_plasticity(&mut self, time: f64) -> Result<(), NeuroError> {
        let output = self.origin.values().to_vector();
        let Some(plasticity) = self.plasticity.as_mut() else {
            return Ok(());
        };
        if plasticity.rules.is_empty() || time - plasticity.last_update < plasticity.interval {
            return Ok(());
        }
        let elapsed = time - plasticity.last_update;
        plasticity.last_update = time;

        for (name, rule) in plasticity.rules.iter() {
            let Some(termination) = self
                .terminations
                .iter_mut()
                .find(|t| t.name() == name.as_str())
            else {
                continue;
            };
            let input = termination.input().map(|i| i.to_vec()).unwrap_or_default();
            let derivative = rule.derivative(termination.weights(), &input, &output, time);
            let weights = termination.weights() + derivative * elapsed;
            termination.set_weights(weights)?;
        }
        Ok(())
    }

    /// Restore the initial condition: generator state, origin, held inputs,
    /// and the plasticity clock.
    pub fn reset(&mut self, randomize: bool) {
        self.generator.reset(randomize);
        self.origin.reset();
        for termination in self.terminations.iter_mut() {
            termination.clear_input();
        }
        if let Some(plasticity) = self.plasticity.as_mut() {
            plasticity.last_update = 0.0;
        }
        self.time = 0.0;
    }
}

impl Probeable for SpikingNeuron {
    fn history(&self, state: &str) -> Result<TimeSeries, NeuroError> {
        self.generator.history(state)
    }

    fn list_states(&self) -> Vec<(String, String)> {
        self.generator.list_states()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::InstantaneousOutput;
    use crate::plasticity::RateHebbRule;

    fn unit(name: &str) -> SpikingNeuron {
        SpikingNeuron::new(name, LifSpikeGenerator::new(0.001, 0.02, 0.002))
    }

    #[test]
    fn test_add_termination_checks() {
        let mut neuron = unit("n0");
        neuron.add_termination("T", &[vec![1.0, 2.0]], 0.01, false).unwrap();
        assert!(neuron
            .add_termination("T", &[vec![1.0, 2.0]], 0.01, false)
            .is_err());
        assert!(neuron
            .add_termination("U", &[vec![1.0], vec![2.0]], 0.01, false)
            .is_err());
        assert_eq!(neuron.terminations().len(), 1);
    }

    #[test]
    fn test_non_expandable_unit() {
        let termination = Termination::build("fixed", &[vec![1.0]], 0.01, false).unwrap();
        let mut neuron = SpikingNeuron::with_fixed_terminations(
            "n0",
            LifSpikeGenerator::new(0.001, 0.02, 0.002),
            vec![termination],
        );
        assert!(!neuron.is_expandable());
        assert!(neuron.get_termination("fixed").is_some());
        assert!(neuron.add_termination("T", &[vec![1.0]], 0.01, false).is_err());
        assert!(neuron.remove_termination("fixed").is_err());
    }

    #[test]
    fn test_run_drives_generator_through_terminations() {
        let mut neuron = unit("n0");
        neuron.add_termination("T", &[vec![2.0]], 0.01, false).unwrap();
        neuron
            .get_termination_mut("T")
            .unwrap()
            .set_input(vec![1.5])
            .unwrap();

        // Drive of 3.0 over 100 ms: the unit must spike.
        let mut spiked = false;
        let mut t = 0.0;
        for _ in 0..100 {
            neuron.run(t, t + 0.001).unwrap();
            if let InstantaneousOutput::Spikes { pattern, .. } = neuron.origin().values() {
                spiked |= pattern[0];
            }
            t += 0.001;
        }
        assert!(spiked);
    }

    #[test]
    fn test_no_input_means_no_spike() {
        let mut neuron = unit("n0");
        neuron.add_termination("T", &[vec![2.0]], 0.01, false).unwrap();
        let mut t = 0.0;
        for _ in 0..100 {
            neuron.run(t, t + 0.001).unwrap();
            assert_eq!(
                neuron.origin().values(),
                &InstantaneousOutput::Spikes {
                    pattern: vec![false],
                    time: t + 0.001,
                }
            );
            t += 0.001;
        }
    }

    #[test]
    fn test_plasticity_rule_updates_weights() {
        let mut neuron = unit("n0");
        neuron.enable_plasticity(0.001);
        neuron.set_mode(SimulationMode::ConstantRate);
        neuron.add_termination("T", &[vec![2.0]], 0.01, false).unwrap();
        neuron.set_plasticity_rule("T", Box::new(RateHebbRule::new(0.1)));
        neuron
            .get_termination_mut("T")
            .unwrap()
            .set_input(vec![1.5])
            .unwrap();

        let before = neuron.get_termination("T").unwrap().weights()[(0, 0)];
        neuron.run(0.0, 0.01).unwrap();
        let after = neuron.get_termination("T").unwrap().weights()[(0, 0)];
        // Positive rate and positive input: the Hebbian update grows the weight.
        assert!(after > before);
    }

    #[test]
    fn test_rules_ignored_on_non_plastic_unit() {
        let mut neuron = unit("n0");
        neuron.add_termination("T", &[vec![2.0]], 0.01, false).unwrap();
        neuron.set_plasticity_rule("T", Box::new(RateHebbRule::new(0.1)));
        assert!(neuron.get_plasticity_rule("T").is_none());
        assert_eq!(neuron.plasticity_interval(), None);
    }

    #[test]
    fn test_reset_clears_held_inputs() {
        let mut neuron = unit("n0");
        neuron.add_termination("T", &[vec![2.0]], 0.01, false).unwrap();
        neuron
            .get_termination_mut("T")
            .unwrap()
            .set_input(vec![1.0])
            .unwrap();
        neuron.run(0.0, 0.01).unwrap();
        neuron.reset(false);
        assert_eq!(neuron.time(), 0.0);
        assert!(neuron.get_termination("T").unwrap().input().is_none());
    }
}
