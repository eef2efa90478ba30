//! Ensembles: composite units aggregating constituent neurons and their
//! terminations.
//!
//! Terminations can be set up on units before they are grouped into an
//! ensemble. After construction, new terminations should only be added
//! through [`Ensemble::add_termination`]; a termination added directly to a
//! constituent afterwards will not appear in the ensemble's own table.
use std::collections::{BTreeMap, HashMap};

use itertools::Itertools;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::NeuroError;
use crate::listener::{ChangeEvent, ChangeListener, ListenerSet};
use crate::mode::SimulationMode;
use crate::neuron::unit::{SpikingNeuron, AXON};
use crate::output::{InstantaneousOutput, Origin};
use crate::plasticity::PlasticityRule;
use crate::series::Units;
use crate::MIN_PARALLEL_NEURONS;

/// A composite termination: one logical input port fanned out to a single-row
/// termination on each expandable constituent. `members` are indices into the
/// ensemble's constituent sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnsembleTermination {
    name: String,
    dimension: usize,
    tau_psc: f64,
    modulatory: bool,
    members: Vec<usize>,
}

impl EnsembleTermination {
    /// Returns the name of the composite termination.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the shared dimension of the member terminations.
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Returns the post-synaptic time constant (s).
    pub fn tau_psc(&self) -> f64 {
        self.tau_psc
    }

    /// Returns true if the composite termination is modulatory.
    pub fn modulatory(&self) -> bool {
        self.modulatory
    }

    /// Returns the constituent indices the composite fans out to.
    pub fn members(&self) -> &[usize] {
        &self.members[..]
    }
}

/// A composite node owning an ordered sequence of constituent neurons.
///
/// The constituent sequence is fixed after construction; only terminations
/// and plasticity rules on it change. A composite termination is in the
/// ensemble's own table if and only if it was created via
/// [`Ensemble::add_termination`].
#[derive(Debug, Serialize, Deserialize)]
pub struct Ensemble {
    name: String,
    neurons: Vec<SpikingNeuron>,
    /// Indices of the expandable constituents, cached at construction.
    expandable: Vec<usize>,
    expanded_terminations: BTreeMap<String, EnsembleTermination>,
    #[serde(skip)]
    plasticity_rules: HashMap<String, Box<dyn PlasticityRule>>,
    origin: Origin,
    mode: SimulationMode,
    time: f64,
    #[serde(skip)]
    listeners: ListenerSet,
}

impl Ensemble {
    /// Create an ensemble from its constituent neurons. The expandable subset
    /// is cached here and never recomputed.
    pub fn new(name: &str, neurons: Vec<SpikingNeuron>) -> Self {
        let expandable = neurons
            .iter()
            .enumerate()
            .filter(|(_, neuron)| neuron.is_expandable())
            .map(|(i, _)| i)
            .collect();
        let origin = Origin::new(AXON, neurons.len(), Units::Spikes);
        Ensemble {
            name: name.to_string(),
            neurons,
            expandable,
            expanded_terminations: BTreeMap::new(),
            plasticity_rules: HashMap::new(),
            origin,
            mode: SimulationMode::Default,
            time: 0.0,
            listeners: ListenerSet::new(),
        }
    }

    /// Returns the name of the ensemble.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Rename the ensemble and notify listeners.
    pub fn set_name(&mut self, name: &str) {
        let old_name = std::mem::replace(&mut self.name, name.to_string());
        self.listeners.notify(&ChangeEvent::NameChanged {
            old_name,
            new_name: name.to_string(),
        });
    }

    /// Returns the ensemble's current simulated time.
    pub fn time(&self) -> f64 {
        self.time
    }

    /// Returns the constituent neurons, in their fixed order.
    pub fn neurons(&self) -> &[SpikingNeuron] {
        &self.neurons[..]
    }

    /// Returns the constituent at the given index, if any.
    pub fn neuron(&self, index: usize) -> Option<&SpikingNeuron> {
        self.neurons.get(index)
    }

    /// Returns a mutable reference to the constituent at the given index.
    pub fn neuron_mut(&mut self, index: usize) -> Option<&mut SpikingNeuron> {
        self.neurons.get_mut(index)
    }

    /// Returns the number of expandable constituents, i.e., the number of
    /// weight rows [`Ensemble::add_termination`] expects.
    pub fn expandable_count(&self) -> usize {
        self.expandable.len()
    }

    /// Returns the output port aggregating the constituents' spike outputs.
    pub fn origin(&self) -> &Origin {
        &self.origin
    }

    /// Returns the current simulation mode.
    pub fn mode(&self) -> SimulationMode {
        self.mode
    }

    /// Request a simulation mode; broadcast to every constituent, each of
    /// which resolves it to its closest supported mode.
    pub fn set_mode(&mut self, mode: SimulationMode) {
        self.mode = mode;
        for neuron in self.neurons.iter_mut() {
            neuron.set_mode(mode);
        }
    }

    /// Register a change listener; returns its registration id.
    pub fn add_change_listener(&mut self, listener: Box<dyn ChangeListener>) -> usize {
        self.listeners.add(listener)
    }

    /// Deregister a change listener. Unknown ids are ignored.
    pub fn remove_change_listener(&mut self, id: usize) {
        self.listeners.remove(id);
    }

    /// Create a composite termination: one single-row termination per
    /// expandable constituent, presented as one logical input named `name`.
    ///
    /// All preconditions (row count, equal row lengths, no duplicate name)
    /// are checked before any constituent is mutated, so a failure leaves the
    /// ensemble unchanged.
    pub fn add_termination(
        &mut self,
        name: &str,
        weight_rows: &[Vec<f64>],
        tau_psc: f64,
        modulatory: bool,
    ) -> Result<&EnsembleTermination, NeuroError> {
        if weight_rows.len() != self.expandable.len() {
            return Err(NeuroError::Structural(format!(
                "{} sets of weights given for {} expandable nodes",
                weight_rows.len(),
                self.expandable.len()
            )));
        }
        let dimension = match weight_rows.first() {
            Some(row) => row.len(),
            None => {
                return Err(NeuroError::Structural(
                    "A composite termination needs at least one expandable node".to_string(),
                ))
            }
        };
        if !weight_rows.iter().map(|row| row.len()).all_equal() {
            return Err(NeuroError::Structural(
                "Equal numbers of weights are needed for termination onto each node".to_string(),
            ));
        }
        if self.expanded_terminations.contains_key(name)
            || self
                .neurons
                .iter()
                .any(|neuron| neuron.get_termination(name).is_some())
        {
            return Err(NeuroError::Structural(format!(
                "Termination '{}' already exists",
                name
            )));
        }

        for (row, &index) in weight_rows.iter().zip(self.expandable.iter()) {
            self.neurons[index].add_termination(name, &[row.clone()], tau_psc, modulatory)?;
        }
        let termination = EnsembleTermination {
            name: name.to_string(),
            dimension,
            tau_psc,
            modulatory,
            members: self.expandable.clone(),
        };
        self.expanded_terminations
            .insert(name.to_string(), termination);

        self.listeners.notify(&ChangeEvent::Changed {
            subject: self.name.clone(),
        });
        Ok(&self.expanded_terminations[name])
    }

    /// Remove a composite termination created via
    /// [`Ensemble::add_termination`]. Terminations that existed on
    /// constituents before assembly are immutable from the ensemble's
    /// perspective.
    pub fn remove_termination(&mut self, name: &str) -> Result<(), NeuroError> {
        if let Some(termination) = self.expanded_terminations.remove(name) {
            for &index in termination.members() {
                self.neurons[index].remove_termination(name)?;
            }
            self.listeners.notify(&ChangeEvent::Changed {
                subject: self.name.clone(),
            });
            Ok(())
        } else if self
            .neurons
            .iter()
            .any(|neuron| neuron.get_termination(name).is_some())
        {
            Err(NeuroError::Structural(format!(
                "Can't remove termination '{}'. It consists of terminations on underlying \
                 nodes that existed before this ensemble was created",
                name
            )))
        } else {
            Err(NeuroError::Structural(format!(
                "Termination '{}' does not exist",
                name
            )))
        }
    }

    /// Look up a termination by name: the ensemble's own table first, then
    /// terminations reachable on constituents (presented as a composite view).
    pub fn get_termination(&self, name: &str) -> Result<EnsembleTermination, NeuroError> {
        if let Some(termination) = self.expanded_terminations.get(name) {
            return Ok(termination.clone());
        }
        let members: Vec<usize> = self
            .neurons
            .iter()
            .enumerate()
            .filter(|(_, neuron)| neuron.get_termination(name).is_some())
            .map(|(i, _)| i)
            .collect();
        match members.first() {
            Some(&first) => {
                let termination = self.neurons[first]
                    .get_termination(name)
                    .expect("member index found just above");
                Ok(EnsembleTermination {
                    name: name.to_string(),
                    dimension: termination.dimension(),
                    tau_psc: termination.tau_psc(),
                    modulatory: termination.modulatory(),
                    members,
                })
            }
            None => Err(NeuroError::Structural(format!(
                "Termination '{}' does not exist",
                name
            ))),
        }
    }

    /// The names in the ensemble's own termination table.
    pub fn termination_names(&self) -> Vec<String> {
        self.expanded_terminations.keys().cloned().collect()
    }

    /// The stacked weight rows of a termination, one row per member.
    pub fn termination_weights(&self, name: &str) -> Result<Vec<Vec<f64>>, NeuroError> {
        let termination = self.get_termination(name)?;
        termination
            .members()
            .iter()
            .map(|&index| {
                let t = self.neurons[index]
                    .get_termination(name)
                    .ok_or_else(|| missing_member_termination(name, index))?;
                Ok(t.weights().row(0).iter().copied().collect())
            })
            .collect()
    }

    /// Replace the weight rows of a composite termination, one row per member.
    pub fn set_termination_weights(
        &mut self,
        name: &str,
        weight_rows: &[Vec<f64>],
    ) -> Result<(), NeuroError> {
        let termination = self.get_termination(name)?;
        if weight_rows.len() != termination.members().len() {
            return Err(NeuroError::Structural(format!(
                "{} weight rows given for {} member terminations",
                weight_rows.len(),
                termination.members().len()
            )));
        }
        for (row, &index) in weight_rows.iter().zip(termination.members().iter()) {
            let member = self.neurons[index]
                .get_termination_mut(name)
                .ok_or_else(|| missing_member_termination(name, index))?;
            member.set_weights(nalgebra::DMatrix::from_row_slice(1, row.len(), row))?;
        }
        Ok(())
    }

    /// Deliver an input vector to a termination, fanning it down to the
    /// member constituents' own terminations.
    pub fn set_termination_input(&mut self, name: &str, values: &[f64]) -> Result<(), NeuroError> {
        let termination = self.get_termination(name)?;
        if values.len() != termination.dimension() {
            return Err(NeuroError::Simulation(format!(
                "Input of dimension {} delivered to termination '{}' of dimension {}",
                values.len(),
                name,
                termination.dimension()
            )));
        }
        for &index in termination.members() {
            self.neurons[index]
                .get_termination_mut(name)
                .ok_or_else(|| missing_member_termination(name, index))?
                .set_input(values.to_vec())?;
        }
        Ok(())
    }

    /// Bind a plasticity rule to a termination name: applied to every
    /// constituent that supports plasticity (others are silently skipped) and
    /// unconditionally recorded in the ensemble's own rule table.
    pub fn set_plasticity_rule(&mut self, termination_name: &str, rule: Box<dyn PlasticityRule>) {
        for neuron in self.neurons.iter_mut().filter(|n| n.is_plastic()) {
            neuron.set_plasticity_rule(termination_name, rule.clone());
        }
        self.plasticity_rules
            .insert(termination_name.to_string(), rule);
    }

    /// Returns the rule recorded under the given termination name, if any.
    pub fn get_plasticity_rule(&self, termination_name: &str) -> Option<&dyn PlasticityRule> {
        self.plasticity_rules
            .get(termination_name)
            .map(|rule| rule.as_ref())
    }

    /// The termination names with recorded plasticity rules.
    pub fn plasticity_rule_names(&self) -> Vec<String> {
        self.plasticity_rules.keys().cloned().collect()
    }

    /// The minimum plasticity interval over the plastic constituents, or -1
    /// if no constituent is plastic.
    pub fn get_plasticity_interval(&self) -> f64 {
        self.neurons
            .iter()
            .filter_map(|neuron| neuron.plasticity_interval())
            .fold(-1.0, |result: f64, interval| {
                if result < 0.0 || result > interval {
                    interval
                } else {
                    result
                }
            })
    }

    /// Broadcast a plasticity interval to every plastic constituent.
    pub fn set_plasticity_interval(&mut self, interval: f64) {
        for neuron in self.neurons.iter_mut() {
            neuron.set_plasticity_interval(interval);
        }
    }

    /// Advance every constituent over `[start_time, end_time]` and republish
    /// the ensemble origin with the aggregated spike outputs. Constituents
    /// run in parallel above the [`MIN_PARALLEL_NEURONS`] threshold. State
    /// advanced before a failure stays advanced.
    pub fn run(&mut self, start_time: f64, end_time: f64) -> Result<(), NeuroError> {
        if self.neurons.len() >= MIN_PARALLEL_NEURONS {
            self.neurons
                .par_iter_mut()
                .try_for_each(|neuron| neuron.run(start_time, end_time))?;
        } else {
            self.neurons
                .iter_mut()
                .try_for_each(|neuron| neuron.run(start_time, end_time))?;
        }
        self.time = end_time;

        let output = match self.mode {
            SimulationMode::Default => InstantaneousOutput::Spikes {
                pattern: self
                    .neurons
                    .iter()
                    .map(|n| n.origin().values().to_vector().first().copied().unwrap_or(0.0) > 0.0)
                    .collect(),
                time: end_time,
            },
            SimulationMode::Precise => InstantaneousOutput::PreciseSpikes {
                times: self
                    .neurons
                    .iter()
                    .map(|n| match n.origin().values() {
                        InstantaneousOutput::PreciseSpikes { times, .. } => {
                            times.first().copied().unwrap_or(-1.0)
                        }
                        other => {
                            if other.to_vector().first().copied().unwrap_or(0.0) > 0.0 {
                                0.0
                            } else {
                                -1.0
                            }
                        }
                    })
                    .collect(),
                time: end_time,
            },
            SimulationMode::Rate | SimulationMode::ConstantRate => InstantaneousOutput::Real {
                values: self
                    .neurons
                    .iter()
                    .map(|n| n.origin().values().to_vector().first().copied().unwrap_or(0.0))
                    .collect(),
                units: Units::SpikesPerSecond,
                time: end_time,
            },
        };
        self.origin.set_values(output)
    }

    /// Reset every constituent and the ensemble origin.
    pub fn reset(&mut self, randomize: bool) {
        if self.neurons.len() >= MIN_PARALLEL_NEURONS {
            self.neurons
                .par_iter_mut()
                .for_each(|neuron| neuron.reset(randomize));
        } else {
            self.neurons
                .iter_mut()
                .for_each(|neuron| neuron.reset(randomize));
        }
        self.origin.reset();
        self.time = 0.0;
    }

    /// An independent deep copy: constituents, composite-termination
    /// bookkeeping rebuilt against the cloned constituents, and a deep-cloned
    /// rule table. Listeners are not carried over. Any structural
    /// inconsistency found while rebuilding becomes a clone error; cloning is
    /// all-or-nothing.
    pub fn try_clone(&self) -> Result<Ensemble, NeuroError> {
        let neurons: Vec<SpikingNeuron> = self.neurons.clone();

        let mut expanded_terminations = BTreeMap::new();
        for (name, termination) in self.expanded_terminations.iter() {
            for &index in termination.members() {
                let member = neurons.get(index).and_then(|n| n.get_termination(name));
                match member {
                    Some(member) if member.dimension() == termination.dimension() => {}
                    _ => {
                        return Err(NeuroError::CloneError(format!(
                            "Problem making clone: termination '{}' is missing on constituent {}",
                            name, index
                        )))
                    }
                }
            }
            expanded_terminations.insert(name.clone(), termination.clone());
        }

        let plasticity_rules = self
            .plasticity_rules
            .iter()
            .map(|(name, rule)| (name.clone(), rule.clone_box()))
            .collect();

        Ok(Ensemble {
            name: self.name.clone(),
            neurons,
            expandable: self.expandable.clone(),
            expanded_terminations,
            plasticity_rules,
            origin: self.origin.clone(),
            mode: self.mode,
            time: self.time,
            listeners: ListenerSet::new(),
        })
    }
}

/// A member listed in the ensemble's own table no longer holds the
/// termination, e.g., it was removed directly on the constituent.
fn missing_member_termination(name: &str, index: usize) -> NeuroError {
    NeuroError::Structural(format!(
        "Termination '{}' is missing on constituent {}",
        name, index
    ))
}
