//! Module implementing the model neurons.
//!
//! - [`lif`]: the leaky-integrate-and-fire spike generator
//! - [`unit`]: a named, simulatable spiking unit built around a generator
pub mod lif;
pub mod unit;

pub use lif::LifSpikeGenerator;
pub use unit::SpikingNeuron;
