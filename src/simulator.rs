//! Time-stepped simulation of a network: projection delivery, node updates,
//! and probe collection, one step at a time.
use crate::error::NeuroError;
use crate::listener::{ChangeEvent, ChangeListener, ListenerSet};
use crate::network::Network;
use crate::probe::{Probe, ProbeAddress, Probeable};
use crate::series::TimeSeries;

/// Runs a network forward in time on the local machine.
///
/// The simulator takes ownership of the network it is initialized with;
/// structural edits between runs go through [`network_mut`](Self::network_mut).
/// Within each step, origin values from the end of the previous step are
/// delivered to terminations before any node advances, so all nodes see
/// inputs that lag by one step.
#[derive(Debug, Default)]
pub struct LocalSimulator {
    network: Option<Network>,
    probes: Vec<Probe>,
    next_probe_id: usize,
    listeners: ListenerSet,
}

impl LocalSimulator {
    /// Create a simulator with no network bound.
    pub fn new() -> Self {
        LocalSimulator::default()
    }

    /// Bind a network, discarding any previous network and all probes.
    pub fn initialize(&mut self, network: Network) {
        self.network = Some(network);
        self.probes.clear();
        self.listeners.notify(&ChangeEvent::Changed {
            subject: "simulator".to_string(),
        });
    }

    /// Returns the bound network, if any.
    pub fn network(&self) -> Option<&Network> {
        self.network.as_ref()
    }

    /// Returns the bound network for structural edits between runs.
    pub fn network_mut(&mut self) -> Option<&mut Network> {
        self.network.as_mut()
    }

    /// Returns the registered probes.
    pub fn probes(&self) -> &[Probe] {
        &self.probes[..]
    }

    /// Probe a named state of a top-level node. Returns the probe id.
    pub fn add_probe(
        &mut self,
        node: &str,
        state: &str,
        record: bool,
    ) -> Result<usize, NeuroError> {
        let address = ProbeAddress::Node {
            node: node.to_string(),
        };
        self.register_probe(address, state, record)
    }

    /// Probe a named state of an ensemble constituent, by index.
    pub fn add_probe_in_ensemble(
        &mut self,
        ensemble: &str,
        index: usize,
        state: &str,
        record: bool,
    ) -> Result<usize, NeuroError> {
        let address = ProbeAddress::Constituent {
            ensemble: ensemble.to_string(),
            index,
        };
        self.register_probe(address, state, record)
    }

    /// Probe a named state of a target resolved by name: a top-level node
    /// when `ensemble` is none, otherwise a constituent of that ensemble.
    pub fn add_probe_to(
        &mut self,
        ensemble: Option<&str>,
        node: &str,
        state: &str,
        record: bool,
    ) -> Result<usize, NeuroError> {
        let address = ProbeAddress::Target {
            ensemble: ensemble.map(str::to_string),
            node: node.to_string(),
        };
        self.register_probe(address, state, record)
    }

    fn register_probe(
        &mut self,
        address: ProbeAddress,
        state: &str,
        record: bool,
    ) -> Result<usize, NeuroError> {
        let network = self.network.as_ref().ok_or_else(|| {
            NeuroError::Simulation("The simulator has no network to probe".to_string())
        })?;
        let target = resolve(network, &address)?;
        if !target
            .list_states()
            .iter()
            .any(|(name, _)| name == state)
        {
            return Err(NeuroError::Simulation(format!(
                "The probed target does not have state '{}'",
                state
            )));
        }

        let id = self.next_probe_id;
        self.next_probe_id += 1;
        self.probes.push(Probe::new(id, address, state, record));
        self.listeners.notify(&ChangeEvent::Changed {
            subject: "simulator".to_string(),
        });
        Ok(id)
    }

    /// Remove a probe by id.
    pub fn remove_probe(&mut self, id: usize) -> Result<(), NeuroError> {
        match self.probes.iter().position(|probe| probe.id() == id) {
            Some(index) => {
                self.probes.remove(index);
                self.listeners.notify(&ChangeEvent::Changed {
                    subject: "simulator".to_string(),
                });
                Ok(())
            }
            None => Err(NeuroError::Simulation(format!(
                "No probe with id {} is registered",
                id
            ))),
        }
    }

    /// Returns the data a probe has collected so far.
    pub fn probe_data(&self, id: usize) -> Result<&TimeSeries, NeuroError> {
        self.probes
            .iter()
            .find(|probe| probe.id() == id)
            .map(Probe::data)
            .ok_or_else(|| {
                NeuroError::Simulation(format!("No probe with id {} is registered", id))
            })
    }

    /// Run the network from `start_time` to `end_time` with the given step.
    /// The final step is shortened to land exactly on `end_time`. A node
    /// failure aborts the run mid-way; state is left as of the failed step.
    pub fn run(&mut self, start_time: f64, end_time: f64, step: f64) -> Result<(), NeuroError> {
        if !(step > 0.0) {
            return Err(NeuroError::InvalidArgument(format!(
                "Time step must be positive, got {}",
                step
            )));
        }
        if end_time < start_time {
            return Err(NeuroError::InvalidArgument(format!(
                "End time {} is before start time {}",
                end_time, start_time
            )));
        }
        let network = self.network.as_mut().ok_or_else(|| {
            NeuroError::Simulation("The simulator has no network to run".to_string())
        })?;

        log::info!(
            "Running network from {}s to {}s with step {}s",
            start_time,
            end_time,
            step
        );
        let total = end_time - start_time;
        let num_steps = (total / step).ceil() as usize;
        let mut last_logged_percent = 0_usize;

        for i in 0..num_steps {
            let time = (start_time + i as f64 * step).min(end_time);
            let step_end = (start_time + (i + 1) as f64 * step).min(end_time);
            if step_end <= time {
                break;
            }

            network.deliver_projections()?;
            for node in network.nodes_mut() {
                node.run(time, step_end)?;
            }
            for probe in self.probes.iter_mut() {
                let target = resolve(network, probe.address())?;
                let series = target.history(probe.state())?;
                probe.collect(&series)?;
            }

            let percent = ((step_end - start_time) / total * 100.0) as usize;
            if percent > last_logged_percent {
                last_logged_percent = percent;
                log::debug!("Simulation time {:.6}s ({}%)", step_end, percent);
            }
        }

        log::info!("Network run finished at {}s", end_time);
        Ok(())
    }

    /// Reset every node to its initial condition and clear probe data.
    pub fn reset_network(&mut self, randomize: bool) -> Result<(), NeuroError> {
        let network = self.network.as_mut().ok_or_else(|| {
            NeuroError::Simulation("The simulator has no network to reset".to_string())
        })?;
        for node in network.nodes_mut() {
            node.reset(randomize);
        }
        for probe in self.probes.iter_mut() {
            probe.clear();
        }
        Ok(())
    }

    /// Register a listener for simulator changes. Returns a registration id.
    pub fn add_listener(&mut self, listener: Box<dyn ChangeListener>) -> usize {
        self.listeners.add(listener)
    }

    /// Deregister a listener. Unknown ids are ignored.
    pub fn remove_listener(&mut self, id: usize) {
        self.listeners.remove(id);
    }
}

fn resolve<'a>(
    network: &'a Network,
    address: &ProbeAddress,
) -> Result<&'a dyn Probeable, NeuroError> {
    match address {
        ProbeAddress::Node { node } => network.probeable(None, node),
        ProbeAddress::Constituent { ensemble, index } => {
            network.probeable_constituent(ensemble, *index)
        }
        ProbeAddress::Target { ensemble, node } => network.probeable(ensemble.as_deref(), node),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ensemble::Ensemble;
    use crate::function::Function;
    use crate::input::FunctionInput;
    use crate::network::NetworkNode;
    use crate::neuron::lif::LifSpikeGenerator;
    use crate::neuron::unit::SpikingNeuron;
    use crate::series::Units;

    fn two_node_network() -> Network {
        let mut network = Network::new();
        let input =
            FunctionInput::build("input", vec![Function::Constant { value: 3.0 }], Units::Unknown)
                .unwrap();
        network.add_node(NetworkNode::Function(input)).unwrap();

        let neurons = vec![
            SpikingNeuron::new("n0", LifSpikeGenerator::new(0.0005, 0.02, 0.002)),
            SpikingNeuron::new("n1", LifSpikeGenerator::new(0.0005, 0.02, 0.002)),
        ];
        let mut ensemble = Ensemble::new("E", neurons);
        ensemble
            .add_termination("drive", &[vec![1.0], vec![1.0]], 0.01, false)
            .unwrap();
        network.add_node(NetworkNode::Ensemble(ensemble)).unwrap();
        network
            .add_projection("input", "origin", "E", "drive")
            .unwrap();
        network
    }

    #[test]
    fn test_run_requires_network() {
        let mut simulator = LocalSimulator::new();
        assert!(simulator.run(0.0, 0.1, 0.001).is_err());
    }

    #[test]
    fn test_run_rejects_bad_interval() {
        let mut simulator = LocalSimulator::new();
        simulator.initialize(two_node_network());
        assert!(simulator.run(0.0, 0.1, 0.0).is_err());
        assert!(simulator.run(0.1, 0.0, 0.001).is_err());
    }

    #[test]
    fn test_probed_input_history() {
        let mut simulator = LocalSimulator::new();
        simulator.initialize(two_node_network());
        let id = simulator.add_probe("input", "input", true).unwrap();
        simulator.run(0.0, 0.01, 0.001).unwrap();

        let data = simulator.probe_data(id).unwrap();
        assert_eq!(data.len(), 10);
        assert_eq!(data.values()[0], vec![3.0]);
        assert!((data.times()[9] - 0.01).abs() < 1e-9);
    }

    #[test]
    fn test_probe_without_record_keeps_last_step() {
        let mut simulator = LocalSimulator::new();
        simulator.initialize(two_node_network());
        let id = simulator.add_probe("input", "input", false).unwrap();
        simulator.run(0.0, 0.01, 0.001).unwrap();
        assert_eq!(simulator.probe_data(id).unwrap().len(), 1);
    }

    #[test]
    fn test_constituent_probe_collects_voltage() {
        let mut simulator = LocalSimulator::new();
        simulator.initialize(two_node_network());
        let id = simulator.add_probe_in_ensemble("E", 0, "V", true).unwrap();
        simulator.run(0.0, 0.01, 0.001).unwrap();
        let data = simulator.probe_data(id).unwrap();
        assert!(!data.is_empty());
        // The constant drive of 3 is above threshold, so the first samples
        // show the membrane charging from rest.
        assert!(data.values()[0][0] >= 0.0);
    }

    #[test]
    fn test_probe_by_resolved_name() {
        let mut simulator = LocalSimulator::new();
        simulator.initialize(two_node_network());
        assert!(simulator.add_probe_to(Some("E"), "n1", "V", true).is_ok());
        assert!(simulator.add_probe_to(None, "input", "input", true).is_ok());
        assert!(simulator
            .add_probe_to(Some("E"), "missing", "V", true)
            .is_err());
    }

    #[test]
    fn test_probe_unknown_state_or_target() {
        let mut simulator = LocalSimulator::new();
        simulator.initialize(two_node_network());
        assert!(simulator.add_probe("input", "voltage", true).is_err());
        assert!(simulator.add_probe("missing", "input", true).is_err());
        assert!(simulator.add_probe("E", "V", true).is_err());
    }

    #[test]
    fn test_remove_probe() {
        let mut simulator = LocalSimulator::new();
        simulator.initialize(two_node_network());
        let id = simulator.add_probe("input", "input", true).unwrap();
        simulator.remove_probe(id).unwrap();
        assert!(simulator.remove_probe(id).is_err());
        assert!(simulator.probe_data(id).is_err());
    }

    #[test]
    fn test_reset_clears_probe_data() {
        let mut simulator = LocalSimulator::new();
        simulator.initialize(two_node_network());
        let id = simulator.add_probe("input", "input", true).unwrap();
        simulator.run(0.0, 0.005, 0.001).unwrap();
        simulator.reset_network(false).unwrap();
        assert!(simulator.probe_data(id).unwrap().is_empty());

        // A reset network runs again from its initial condition.
        simulator.run(0.0, 0.005, 0.001).unwrap();
        assert_eq!(simulator.probe_data(id).unwrap().len(), 5);
    }

    #[test]
    fn test_initialize_discards_probes() {
        let mut simulator = LocalSimulator::new();
        simulator.initialize(two_node_network());
        simulator.add_probe("input", "input", true).unwrap();
        simulator.initialize(two_node_network());
        assert!(simulator.probes().is_empty());
    }
}
