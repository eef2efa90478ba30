//! This crate provides tools for building and simulating time-stepped
//! networks of model neurons in Rust.
//!
//! # Building Networks
//!
//! ```rust
//! use neurosim::ensemble::Ensemble;
//! use neurosim::function::Function;
//! use neurosim::input::FunctionInput;
//! use neurosim::network::{Network, NetworkNode};
//! use neurosim::neuron::{LifSpikeGenerator, SpikingNeuron};
//! use neurosim::series::Units;
//!
//! // A constant current source
//! let input = FunctionInput::build(
//!     "input",
//!     vec![Function::Constant { value: 2.0 }],
//!     Units::Unknown,
//! )
//! .unwrap();
//!
//! // An ensemble of two leaky-integrate-and-fire units with a shared
//! // one-dimensional termination
//! let neurons = vec![
//!     SpikingNeuron::new("n0", LifSpikeGenerator::new(0.001, 0.02, 0.002)),
//!     SpikingNeuron::new("n1", LifSpikeGenerator::new(0.001, 0.02, 0.002)),
//! ];
//! let mut ensemble = Ensemble::new("E", neurons);
//! ensemble
//!     .add_termination("drive", &[vec![1.0], vec![0.5]], 0.01, false)
//!     .unwrap();
//!
//! let mut network = Network::new();
//! network.add_node(NetworkNode::Function(input)).unwrap();
//! network.add_node(NetworkNode::Ensemble(ensemble)).unwrap();
//! network.add_projection("input", "origin", "E", "drive").unwrap();
//! assert_eq!(network.num_nodes(), 2);
//! ```
//!
//! # Simulating Networks
//!
//! ```rust
//! # use neurosim::ensemble::Ensemble;
//! # use neurosim::function::Function;
//! # use neurosim::input::FunctionInput;
//! # use neurosim::network::{Network, NetworkNode};
//! # use neurosim::neuron::{LifSpikeGenerator, SpikingNeuron};
//! # use neurosim::series::Units;
//! use neurosim::simulator::LocalSimulator;
//!
//! # let input = FunctionInput::build(
//! #     "input",
//! #     vec![Function::Constant { value: 2.0 }],
//! #     Units::Unknown,
//! # )
//! # .unwrap();
//! # let neurons = vec![
//! #     SpikingNeuron::new("n0", LifSpikeGenerator::new(0.001, 0.02, 0.002)),
//! #     SpikingNeuron::new("n1", LifSpikeGenerator::new(0.001, 0.02, 0.002)),
//! # ];
//! # let mut ensemble = Ensemble::new("E", neurons);
//! # ensemble
//! #     .add_termination("drive", &[vec![1.0], vec![0.5]], 0.01, false)
//! #     .unwrap();
//! # let mut network = Network::new();
//! # network.add_node(NetworkNode::Function(input)).unwrap();
//! # network.add_node(NetworkNode::Ensemble(ensemble)).unwrap();
//! # network.add_projection("input", "origin", "E", "drive").unwrap();
//! let mut simulator = LocalSimulator::new();
//! simulator.initialize(network);
//!
//! // Record the membrane potential of the first unit of the ensemble
//! let probe = simulator.add_probe_in_ensemble("E", 0, "V", true).unwrap();
//!
//! simulator.run(0.0, 0.1, 0.001).unwrap();
//! assert!(!simulator.probe_data(probe).unwrap().is_empty());
//! ```

pub mod dynamics;
pub mod ensemble;
pub mod error;
pub mod function;
pub mod input;
pub mod listener;
pub mod mode;
pub mod network;
pub mod neuron;
pub mod noise;
pub mod output;
pub mod plasticity;
pub mod probe;
pub mod series;
pub mod simulator;
pub mod termination;

/// The nominal membrane potential at which a neuron fires.
pub const FIRING_THRESHOLD: f64 = 1.0;
/// The membrane resistance scaling input current into potential.
pub const MEMBRANE_RESISTANCE: f64 = 1.0;
/// Slack applied to a requested maximum integration step, so that intervals
/// that are a whole number of steps long do not gain an extra step to
/// rounding.
pub const MAX_TIME_STEP_SLACK: f64 = 1.01;
/// The number of neurons in an ensemble above which a step is run in
/// parallel.
pub const MIN_PARALLEL_NEURONS: usize = 100;
