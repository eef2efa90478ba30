//! Networks: named nodes wired together by projections from origins to
//! terminations.
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::ensemble::Ensemble;
use crate::error::NeuroError;
use crate::input::FunctionInput;
use crate::neuron::unit::{SpikingNeuron, AXON};
use crate::probe::Probeable;

/// A top-level node of a network.
#[derive(Debug, Serialize, Deserialize)]
pub enum NetworkNode {
    /// A function-of-time source node.
    Function(FunctionInput),
    /// A single spiking unit.
    Neuron(SpikingNeuron),
    /// A composite of spiking units.
    Ensemble(Ensemble),
}

impl NetworkNode {
    /// Returns the name of the node.
    pub fn name(&self) -> &str {
        match self {
            NetworkNode::Function(input) => input.name(),
            NetworkNode::Neuron(neuron) => neuron.name(),
            NetworkNode::Ensemble(ensemble) => ensemble.name(),
        }
    }

    /// Advance the node over `[start_time, end_time]`.
    pub fn run(&mut self, start_time: f64, end_time: f64) -> Result<(), NeuroError> {
        match self {
            NetworkNode::Function(input) => input.run(start_time, end_time),
            NetworkNode::Neuron(neuron) => neuron.run(start_time, end_time),
            NetworkNode::Ensemble(ensemble) => ensemble.run(start_time, end_time),
        }
    }

    /// Restore the node's initial condition.
    pub fn reset(&mut self, randomize: bool) {
        match self {
            NetworkNode::Function(input) => input.reset(randomize),
            NetworkNode::Neuron(neuron) => neuron.reset(randomize),
            NetworkNode::Ensemble(ensemble) => ensemble.reset(randomize),
        }
    }

    /// The dimension of the named origin.
    pub fn origin_dimension(&self, origin: &str) -> Result<usize, NeuroError> {
        match self {
            NetworkNode::Function(input) if origin == input.origin().name() => {
                Ok(input.origin().dimension())
            }
            NetworkNode::Neuron(neuron) if origin == AXON => Ok(neuron.origin().dimension()),
            NetworkNode::Ensemble(ensemble) if origin == AXON => Ok(ensemble.origin().dimension()),
            _ => Err(NeuroError::Structural(format!(
                "Node '{}' has no origin named '{}'",
                self.name(),
                origin
            ))),
        }
    }

    /// The current values of the named origin, as a real vector.
    pub fn origin_values(&self, origin: &str) -> Result<Vec<f64>, NeuroError> {
        self.origin_dimension(origin)?;
        match self {
            NetworkNode::Function(input) => Ok(input.origin().values().to_vector()),
            NetworkNode::Neuron(neuron) => Ok(neuron.origin().values().to_vector()),
            NetworkNode::Ensemble(ensemble) => Ok(ensemble.origin().values().to_vector()),
        }
    }

    /// The dimension of the named termination.
    pub fn termination_dimension(&self, termination: &str) -> Result<usize, NeuroError> {
        match self {
            NetworkNode::Function(input) => input.get_termination(termination).map(|_| 0),
            NetworkNode::Neuron(neuron) => neuron
                .get_termination(termination)
                .map(|t| t.dimension())
                .ok_or_else(|| {
                    NeuroError::Structural(format!(
                        "Node '{}' has no termination named '{}'",
                        neuron.name(),
                        termination
                    ))
                }),
            NetworkNode::Ensemble(ensemble) => ensemble
                .get_termination(termination)
                .map(|t| t.dimension()),
        }
    }

    /// Deliver an input vector to the named termination.
    pub fn set_termination_input(
        &mut self,
        termination: &str,
        values: &[f64],
    ) -> Result<(), NeuroError> {
        match self {
            NetworkNode::Function(input) => input.get_termination(termination),
            NetworkNode::Neuron(neuron) => {
                let name = neuron.name().to_string();
                neuron
                    .get_termination_mut(termination)
                    .ok_or_else(|| {
                        NeuroError::Structural(format!(
                            "Node '{}' has no termination named '{}'",
                            name, termination
                        ))
                    })?
                    .set_input(values.to_vec())
            }
            NetworkNode::Ensemble(ensemble) => ensemble.set_termination_input(termination, values),
        }
    }

    /// The node as a probeable target, if it is one. Ensembles are probed
    /// through their constituents instead.
    pub fn as_probeable(&self) -> Option<&dyn Probeable> {
        match self {
            NetworkNode::Function(input) => Some(input),
            NetworkNode::Neuron(neuron) => Some(neuron),
            NetworkNode::Ensemble(_) => None,
        }
    }
}

/// A wire from a node's origin to another node's termination. Values are
/// delivered once per simulator step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Projection {
    pub source_node: String,
    pub origin: String,
    pub target_node: String,
    pub termination: String,
}

/// A collection of named nodes and the projections wiring them together.
/// Node names are unique; nodes keep their insertion order.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Network {
    nodes: Vec<NetworkNode>,
    projections: Vec<Projection>,
}

impl Network {
    /// Create an empty network.
    pub fn new() -> Self {
        Network::default()
    }

    /// Returns the nodes in insertion order.
    pub fn nodes(&self) -> &[NetworkNode] {
        &self.nodes[..]
    }

    /// Returns the nodes for mutation in insertion order.
    pub fn nodes_mut(&mut self) -> &mut [NetworkNode] {
        &mut self.nodes[..]
    }

    /// Returns the projections.
    pub fn projections(&self) -> &[Projection] {
        &self.projections[..]
    }

    /// Returns the number of nodes.
    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// Add a node. A duplicate name is a structural error.
    pub fn add_node(&mut self, node: NetworkNode) -> Result<(), NeuroError> {
        if self.get_node(node.name()).is_some() {
            return Err(NeuroError::Structural(format!(
                "A node named '{}' already exists in the network",
                node.name()
            )));
        }
        self.nodes.push(node);
        Ok(())
    }

    /// Returns the node with the given name, if any.
    pub fn get_node(&self, name: &str) -> Option<&NetworkNode> {
        self.nodes.iter().find(|node| node.name() == name)
    }

    /// Returns a mutable reference to the node with the given name.
    pub fn get_node_mut(&mut self, name: &str) -> Option<&mut NetworkNode> {
        self.nodes.iter_mut().find(|node| node.name() == name)
    }

    /// Remove a node and every projection touching it.
    pub fn remove_node(&mut self, name: &str) -> Result<NetworkNode, NeuroError> {
        match self.nodes.iter().position(|node| node.name() == name) {
            Some(index) => {
                self.projections
                    .retain(|p| p.source_node != name && p.target_node != name);
                Ok(self.nodes.remove(index))
            }
            None => Err(NeuroError::Structural(format!(
                "No node named '{}' in the network",
                name
            ))),
        }
    }

    /// Wire an origin to a termination. Both ends must exist and their
    /// dimensions must match.
    pub fn add_projection(
        &mut self,
        source_node: &str,
        origin: &str,
        target_node: &str,
        termination: &str,
    ) -> Result<(), NeuroError> {
        let source = self.get_node(source_node).ok_or_else(|| {
            NeuroError::Structural(format!("No node named '{}' in the network", source_node))
        })?;
        let origin_dimension = source.origin_dimension(origin)?;

        let target = self.get_node(target_node).ok_or_else(|| {
            NeuroError::Structural(format!("No node named '{}' in the network", target_node))
        })?;
        let termination_dimension = target.termination_dimension(termination)?;

        if origin_dimension != termination_dimension {
            return Err(NeuroError::Structural(format!(
                "Origin '{}.{}' of dimension {} cannot project to termination '{}.{}' of dimension {}",
                source_node, origin, origin_dimension, target_node, termination, termination_dimension
            )));
        }

        self.projections.push(Projection {
            source_node: source_node.to_string(),
            origin: origin.to_string(),
            target_node: target_node.to_string(),
            termination: termination.to_string(),
        });
        Ok(())
    }

    /// Deliver every projection's current origin values to its target
    /// termination.
    pub fn deliver_projections(&mut self) -> Result<(), NeuroError> {
        for i in 0..self.projections.len() {
            let projection = self.projections[i].clone();
            let values = self
                .get_node(&projection.source_node)
                .ok_or_else(|| {
                    NeuroError::Simulation(format!(
                        "Projection source '{}' disappeared from the network",
                        projection.source_node
                    ))
                })?
                .origin_values(&projection.origin)?;
            self.get_node_mut(&projection.target_node)
                .ok_or_else(|| {
                    NeuroError::Simulation(format!(
                        "Projection target '{}' disappeared from the network",
                        projection.target_node
                    ))
                })?
                .set_termination_input(&projection.termination, &values)?;
        }
        Ok(())
    }

    /// Resolve a probeable target: a top-level node when `ensemble` is none,
    /// otherwise a constituent (by name) of the named ensemble.
    pub fn probeable(
        &self,
        ensemble: Option<&str>,
        node: &str,
    ) -> Result<&dyn Probeable, NeuroError> {
        match ensemble {
            None => {
                let target = self.get_node(node).ok_or_else(|| {
                    NeuroError::Simulation(format!("No node named '{}' in the network", node))
                })?;
                target.as_probeable().ok_or_else(|| {
                    NeuroError::Simulation(format!("Node '{}' is not probeable", node))
                })
            }
            Some(ensemble_name) => {
                let ensemble = self.get_ensemble(ensemble_name)?;
                let neuron = ensemble
                    .neurons()
                    .iter()
                    .find(|n| n.name() == node)
                    .ok_or_else(|| {
                        NeuroError::Simulation(format!(
                            "Ensemble '{}' has no constituent named '{}'",
                            ensemble_name, node
                        ))
                    })?;
                Ok(neuron)
            }
        }
    }

    /// Resolve a probeable constituent of an ensemble by index.
    pub fn probeable_constituent(
        &self,
        ensemble: &str,
        index: usize,
    ) -> Result<&dyn Probeable, NeuroError> {
        let ensemble_ref = self.get_ensemble(ensemble)?;
        match ensemble_ref.neuron(index) {
            Some(neuron) => Ok(neuron),
            None => Err(NeuroError::Simulation(format!(
                "Ensemble '{}' has no constituent at index {}",
                ensemble, index
            ))),
        }
    }

    fn get_ensemble(&self, name: &str) -> Result<&Ensemble, NeuroError> {
        match self.get_node(name) {
            Some(NetworkNode::Ensemble(ensemble)) => Ok(ensemble),
            Some(_) => Err(NeuroError::Simulation(format!(
                "Node '{}' is not an ensemble",
                name
            ))),
            None => Err(NeuroError::Simulation(format!(
                "No node named '{}' in the network",
                name
            ))),
        }
    }

    /// Write the network as pretty-printed JSON. Plasticity rules, noise
    /// models, and listeners are runtime attachments and are not serialized.
    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> std::io::Result<()> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, self)?;
        writer.flush()?;
        Ok(())
    }

    /// Read a network back from JSON.
    pub fn load_from<P: AsRef<Path>>(path: P) -> std::io::Result<Network> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);
        serde_json::from_reader(reader)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))
    }
}
