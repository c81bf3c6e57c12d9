use crate::{GenomeId, Innovation, ModuleId};

use std::error::Error;
use std::fmt;

/// An error type indicating that a genome violates the
/// per-genome structural invariants. These are internal
/// consistency violations: a mutator producing one is a bug,
/// not a recoverable condition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenomeConsistencyError {
    /// Two neurons share an id.
    DuplicateNeuronId(GenomeId, Innovation),
    /// Two connections share an innovation number.
    DuplicateConnectionId(GenomeId, Innovation),
    /// A connection references a neuron that is not present.
    DanglingEndpoint(GenomeId, Innovation, Innovation),
    /// A module does not have exactly one regulatory neuron.
    RegulatoryCount {
        genome: GenomeId,
        module: ModuleId,
        count: usize,
    },
    /// A module's LocalInput or LocalOutput neurons do not
    /// form a contiguous run within the neuron list.
    NonContiguousModuleRun { genome: GenomeId, module: ModuleId },
}

impl fmt::Display for GenomeConsistencyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateNeuronId(genome, id) => {
                write!(f, "duplicate neuron id {} in genome {}", id, genome)
            }
            Self::DuplicateConnectionId(genome, id) => {
                write!(f, "duplicate connection id {} in genome {}", id, genome)
            }
            Self::DanglingEndpoint(genome, connection, neuron) => write!(
                f,
                "connection {} in genome {} references nonexistant neuron {}",
                connection, genome, neuron
            ),
            Self::RegulatoryCount {
                genome,
                module,
                count,
            } => write!(
                f,
                "module {} in genome {} has {} regulatory neurons instead of 1",
                module, genome, count
            ),
            Self::NonContiguousModuleRun { genome, module } => write!(
                f,
                "module {} in genome {} has a non-contiguous local neuron run",
                module, genome
            ),
        }
    }
}

impl Error for GenomeConsistencyError {}
