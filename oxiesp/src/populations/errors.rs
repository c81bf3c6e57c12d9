use crate::genomics::GenomeConsistencyError;
use crate::{GenomeId, Innovation, ModuleId};

use std::error::Error;
use std::fmt;

/// An error type indicating that the population as a whole
/// violates a cross-genome invariant. Like the per-genome
/// variant, producing one of these from a structural edit is
/// an implementation bug, not a recoverable condition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PopulationConsistencyError {
    /// A genome violates its own structural invariants.
    Genome(GenomeConsistencyError),
    /// A genome's module id set differs from the rest of
    /// the population.
    ModuleSetMismatch { genome: GenomeId },
    /// A frozen module's subgraph is not bit-identical
    /// across the population.
    FrozenModuleDiverged { module: ModuleId, genome: GenomeId },
    /// The population contains no genomes.
    EmptyPopulation,
}

impl fmt::Display for PopulationConsistencyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Genome(e) => write!(f, "{}", e),
            Self::ModuleSetMismatch { genome } => write!(
                f,
                "genome {} carries a different module set than the rest of the population",
                genome
            ),
            Self::FrozenModuleDiverged { module, genome } => write!(
                f,
                "frozen module {} diverged in genome {}",
                module, genome
            ),
            Self::EmptyPopulation => write!(f, "population contains no genomes"),
        }
    }
}

impl Error for PopulationConsistencyError {}

impl From<GenomeConsistencyError> for PopulationConsistencyError {
    fn from(e: GenomeConsistencyError) -> Self {
        Self::Genome(e)
    }
}

/// An error type indicating that a requested structural edit
/// is illegal. The edit is rejected synchronously and the
/// population is left unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditError {
    /// The module id does not exist in the population.
    UnknownModule(ModuleId),
    /// The referenced neuron does not exist.
    UnknownNeuron(Innovation),
    /// Deletion of the active module: frozen modules only,
    /// since deleting the module still being evolved has no
    /// well-defined revert-to-champion semantics.
    DeleteActiveModule(ModuleId),
    /// The base module is not a module and cannot be edited
    /// as one.
    BaseModule,
    /// A module cannot be nested into itself or into one of
    /// its own descendants.
    NestIntoSelf(ModuleId),
    /// The child is already nested in a container.
    AlreadyNested { child: ModuleId, parent: ModuleId },
    /// The nesting target is not a regulation container.
    NotAContainer(ModuleId),
    /// The edit targets a module outside the active one.
    OutsideActiveModule(ModuleId),
    /// The edit addresses a protected regulatory connection.
    ProtectedConnection(Innovation),
    /// The referenced neuron is not a LocalOutput of the
    /// active module.
    NotALocalOutput(Innovation),
    /// The edit requires a resolved champion and the champion
    /// pointer does not resolve.
    ChampionUnresolved(GenomeId),
}

impl fmt::Display for EditError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownModule(m) => write!(f, "module {} does not exist", m),
            Self::UnknownNeuron(n) => write!(f, "neuron {} does not exist", n),
            Self::DeleteActiveModule(m) => {
                write!(f, "module {} is active and cannot be deleted", m)
            }
            Self::BaseModule => write!(f, "the base module cannot be edited as a module"),
            Self::NestIntoSelf(m) => write!(f, "module {} cannot be nested into itself", m),
            Self::AlreadyNested { child, parent } => {
                write!(f, "module {} is already nested in container {}", child, parent)
            }
            Self::NotAContainer(m) => write!(f, "module {} is not a regulation container", m),
            Self::OutsideActiveModule(m) => {
                write!(f, "edit targets module {} outside the active module", m)
            }
            Self::ProtectedConnection(c) => {
                write!(f, "connection {} is protected regulatory material", c)
            }
            Self::NotALocalOutput(n) => {
                write!(f, "neuron {} is not a local output of the active module", n)
            }
            Self::ChampionUnresolved(id) => {
                write!(f, "champion id {} does not resolve to any genome", id)
            }
        }
    }
}

impl Error for EditError {}

impl From<super::HierarchyError> for EditError {
    fn from(e: super::HierarchyError) -> Self {
        use super::HierarchyError;
        match e {
            HierarchyError::UnknownContainer(m) => Self::NotAContainer(m),
            HierarchyError::SelfNesting(m) | HierarchyError::CyclicNesting(m) => {
                Self::NestIntoSelf(m)
            }
            HierarchyError::AlreadyNested { child, parent } => Self::AlreadyNested { child, parent },
        }
    }
}
