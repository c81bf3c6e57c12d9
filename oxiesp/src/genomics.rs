//! The modular genome data model: neurons, connections,
//! regulatory gates and the per-genome consistency rules.
mod errors;
mod genes;
mod genome;
mod nodes;
mod regulation;

pub use errors::GenomeConsistencyError;
pub use genes::Connection;
pub use genome::{ModularGenome, ModuleSubgraph};
pub use nodes::{Neuron, NeuronRole};
pub use regulation::{
    ModuleKind, RegulatoryGate, NESTING_PANDEMONIUM_OFFSET, NO_PANDEMONIUM,
};

pub(crate) use regulation::nested_group;
