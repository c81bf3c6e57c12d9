use crate::genomics::{Connection, GenomeConsistencyError, Neuron, NeuronRole};
use crate::{GenomeId, Innovation, ModuleId, BASE_MODULE};

use ahash::RandomState;
use serde::{Deserialize, Serialize};

use std::collections::HashSet;
use std::fmt;

/// The neurons and connections of a single module, cloned
/// out of a genome. Used for frozen-module comparisons and
/// for replicating a module across a population.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct ModuleSubgraph {
    pub(crate) neurons: Vec<Neuron>,
    pub(crate) connections: Vec<Connection>,
}

impl ModuleSubgraph {
    /// Returns an iterator over the subgraph's neurons.
    pub fn neurons(&self) -> impl Iterator<Item = &Neuron> {
        self.neurons.iter()
    }

    /// Returns an iterator over the subgraph's connections.
    pub fn connections(&self) -> impl Iterator<Item = &Connection> {
        self.connections.iter()
    }
}

/// A modular genome: an ordered list of neurons and an ordered
/// list of connections, partitioned into modules. The genome
/// itself knows nothing about which module is active; that is
/// population-level state.
///
/// Invariants (checked by [`validate`]):
/// - neuron ids are unique, connection innovation numbers are unique;
/// - every connection endpoint exists;
/// - every module has exactly one regulatory neuron;
/// - a module's LocalInput and LocalOutput neurons each form a
///   contiguous run within the neuron list.
///
/// [`validate`]: ModularGenome::validate
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct ModularGenome {
    id: GenomeId,
    birth_generation: usize,
    fitness: f32,
    neurons: Vec<Neuron>,
    connections: Vec<Connection>,
}

impl ModularGenome {
    /// Returns a genome containing only the base module:
    /// a bias neuron with id 0, `input_count` global inputs
    /// and `output_count` global outputs, and no connections.
    ///
    /// # Examples
    /// ```
    /// use oxiesp::genomics::ModularGenome;
    ///
    /// let genome = ModularGenome::with_base(0, 0, 2, 1);
    ///
    /// assert_eq!(genome.neurons().count(), 4);
    /// assert_eq!(genome.connections().count(), 0);
    /// assert!(genome.modules().is_empty());
    /// ```
    pub fn with_base(
        id: GenomeId,
        birth_generation: usize,
        input_count: usize,
        output_count: usize,
    ) -> ModularGenome {
        let mut neurons = vec![Neuron::global(0, NeuronRole::Bias)];
        neurons.extend((0..input_count).map(|i| Neuron::global(1 + i, NeuronRole::Input)));
        neurons.extend(
            (0..output_count).map(|o| Neuron::global(1 + input_count + o, NeuronRole::Output)),
        );
        ModularGenome {
            id,
            birth_generation,
            fitness: 0.0,
            neurons,
            connections: vec![],
        }
    }

    /// Returns the genome's id.
    pub fn id(&self) -> GenomeId {
        self.id
    }

    /// Returns the generation the genome was born in.
    pub fn birth_generation(&self) -> usize {
        self.birth_generation
    }

    /// Returns the genome's fitness value.
    pub fn fitness(&self) -> f32 {
        self.fitness
    }

    /// Sets the genome's fitness value.
    pub fn set_fitness(&mut self, fitness: f32) {
        self.fitness = fitness;
    }

    /// Returns an iterator over the genome's neurons,
    /// in genome order.
    pub fn neurons(&self) -> impl Iterator<Item = &Neuron> {
        self.neurons.iter()
    }

    /// Returns an iterator over the genome's connections,
    /// in genome order.
    pub fn connections(&self) -> impl Iterator<Item = &Connection> {
        self.connections.iter()
    }

    /// Returns the neuron with the specified id, if present.
    pub fn neuron(&self, id: Innovation) -> Option<&Neuron> {
        self.neurons.iter().find(|n| n.id() == id)
    }

    /// Returns the connection with the specified innovation
    /// number, if present.
    pub fn connection(&self, id: Innovation) -> Option<&Connection> {
        self.connections.iter().find(|c| c.innovation() == id)
    }

    /// Returns the sorted list of module ids present in the
    /// genome, excluding the base module.
    ///
    /// # Examples
    /// ```
    /// use oxiesp::genomics::{ModularGenome, Neuron, NeuronRole, RegulatoryGate};
    ///
    /// let genome = ModularGenome::with_base(0, 0, 1, 1);
    /// assert!(genome.modules().is_empty());
    /// ```
    pub fn modules(&self) -> Vec<ModuleId> {
        let mut modules: Vec<ModuleId> = self
            .neurons
            .iter()
            .map(Neuron::module)
            .chain(self.connections.iter().map(Connection::module))
            .filter(|m| *m != BASE_MODULE)
            .collect();
        modules.sort_unstable();
        modules.dedup();
        modules
    }

    /// Returns the highest module id present in the genome,
    /// or the base module id if no modules exist.
    pub fn max_module_id(&self) -> ModuleId {
        self.modules().last().copied().unwrap_or(BASE_MODULE)
    }

    /// Returns the highest neuron id present in the genome.
    pub fn max_neuron_id(&self) -> Option<Innovation> {
        self.neurons.iter().map(Neuron::id).max()
    }

    /// Returns the highest connection innovation number
    /// present in the genome.
    pub fn max_connection_id(&self) -> Option<Innovation> {
        self.connections.iter().map(Connection::innovation).max()
    }

    /// Returns the module's regulatory neuron, if the
    /// module is present.
    pub fn regulatory(&self, module: ModuleId) -> Option<&Neuron> {
        self.neurons
            .iter()
            .find(|n| n.module() == module && n.role() == NeuronRole::Regulatory)
    }

    pub(crate) fn regulatory_mut(&mut self, module: ModuleId) -> Option<&mut Neuron> {
        self.neurons
            .iter_mut()
            .find(|n| n.module() == module && n.role() == NeuronRole::Regulatory)
    }

    /// Clones the module's neurons and connections out of
    /// the genome, in genome order.
    pub fn module_subgraph(&self, module: ModuleId) -> ModuleSubgraph {
        ModuleSubgraph {
            neurons: self
                .neurons
                .iter()
                .filter(|n| n.module() == module)
                .cloned()
                .collect(),
            connections: self
                .connections
                .iter()
                .filter(|c| c.module() == module)
                .cloned()
                .collect(),
        }
    }

    /// Returns the genome's complexity as
    /// `(neuron count, connection count)`.
    pub fn complexity(&self) -> (usize, usize) {
        (self.neurons.len(), self.connections.len())
    }

    pub(crate) fn connections_mut(&mut self) -> impl Iterator<Item = &mut Connection> {
        self.connections.iter_mut()
    }

    pub(crate) fn push_neuron(&mut self, neuron: Neuron) {
        self.neurons.push(neuron);
    }

    pub(crate) fn push_connection(&mut self, connection: Connection) {
        self.connections.push(connection);
    }

    /// Inserts a neuron while keeping its module's per-role
    /// runs contiguous: after the last neuron of the same
    /// module and role, else after the last neuron of the
    /// module, else at the end.
    pub(crate) fn insert_neuron_in_module(&mut self, neuron: Neuron) {
        let same_run = self
            .neurons
            .iter()
            .rposition(|n| n.module() == neuron.module() && n.role() == neuron.role());
        let same_module = self
            .neurons
            .iter()
            .rposition(|n| n.module() == neuron.module());
        match same_run.or(same_module) {
            Some(i) => self.neurons.insert(i + 1, neuron),
            None => self.neurons.push(neuron),
        }
    }

    /// Removes the module's protected regulatory connections,
    /// in preparation for a gate rewrite or demotion.
    pub(crate) fn strip_protected(&mut self, module: ModuleId) {
        self.connections
            .retain(|c| !(c.module() == module && c.protected()));
    }

    /// Removes the module's neurons and connections, along
    /// with any connection left dangling by the removal.
    pub(crate) fn remove_module(&mut self, module: ModuleId) {
        let removed: HashSet<Innovation, RandomState> = self
            .neurons
            .iter()
            .filter(|n| n.module() == module)
            .map(Neuron::id)
            .collect();
        self.neurons.retain(|n| n.module() != module);
        self.connections.retain(|c| {
            c.module() != module && !removed.contains(&c.source()) && !removed.contains(&c.target())
        });
    }

    /// Replaces the module's genetic material with the passed
    /// subgraph, preserving the module's position in the
    /// genome's ordering.
    pub(crate) fn splice_module(&mut self, module: ModuleId, subgraph: &ModuleSubgraph) {
        // All removed elements sit at or after the first module
        // element, so the first element's index survives the retain.
        let neuron_at = self
            .neurons
            .iter()
            .position(|n| n.module() == module)
            .unwrap_or(self.neurons.len());
        self.neurons.retain(|n| n.module() != module);
        self.neurons
            .splice(neuron_at..neuron_at, subgraph.neurons.iter().cloned());

        let connection_at = self
            .connections
            .iter()
            .position(|c| c.module() == module)
            .unwrap_or(self.connections.len());
        self.connections.retain(|c| c.module() != module);
        self.connections.splice(
            connection_at..connection_at,
            subgraph.connections.iter().cloned(),
        );
    }

    /// Inserts a module's subgraph immediately before the
    /// anchor module in the genome's ordering, or at the end
    /// if the anchor has no material of the given kind.
    pub(crate) fn insert_module_before(&mut self, anchor: ModuleId, subgraph: &ModuleSubgraph) {
        let neuron_at = self
            .neurons
            .iter()
            .position(|n| n.module() == anchor)
            .unwrap_or(self.neurons.len());
        self.neurons
            .splice(neuron_at..neuron_at, subgraph.neurons.iter().cloned());

        let connection_at = self
            .connections
            .iter()
            .position(|c| c.module() == anchor)
            .unwrap_or(self.connections.len());
        self.connections
            .splice(connection_at..connection_at, subgraph.connections.iter().cloned());
    }

    /// Checks the per-genome structural invariants.
    ///
    /// # Errors
    /// Returns the first violation found: duplicate neuron or
    /// connection ids, dangling endpoints, a module without
    /// exactly one regulatory neuron, or a non-contiguous
    /// local neuron run.
    pub fn validate(&self) -> Result<(), GenomeConsistencyError> {
        let mut neuron_ids: HashSet<Innovation, RandomState> = HashSet::default();
        for neuron in &self.neurons {
            if !neuron_ids.insert(neuron.id()) {
                return Err(GenomeConsistencyError::DuplicateNeuronId(
                    self.id,
                    neuron.id(),
                ));
            }
        }

        let mut connection_ids: HashSet<Innovation, RandomState> = HashSet::default();
        for connection in &self.connections {
            if !connection_ids.insert(connection.innovation()) {
                return Err(GenomeConsistencyError::DuplicateConnectionId(
                    self.id,
                    connection.innovation(),
                ));
            }
            for endpoint in [connection.source(), connection.target()] {
                if !neuron_ids.contains(&endpoint) {
                    return Err(GenomeConsistencyError::DanglingEndpoint(
                        self.id,
                        connection.innovation(),
                        endpoint,
                    ));
                }
            }
        }

        for module in self.modules() {
            let count = self
                .neurons
                .iter()
                .filter(|n| n.module() == module && n.role() == NeuronRole::Regulatory)
                .count();
            if count != 1 {
                return Err(GenomeConsistencyError::RegulatoryCount {
                    genome: self.id,
                    module,
                    count,
                });
            }

            for role in [NeuronRole::LocalInput, NeuronRole::LocalOutput] {
                let positions: Vec<usize> = self
                    .neurons
                    .iter()
                    .enumerate()
                    .filter(|(_, n)| n.module() == module && n.role() == role)
                    .map(|(i, _)| i)
                    .collect();
                if let (Some(first), Some(last)) = (positions.first(), positions.last()) {
                    if last - first + 1 != positions.len() {
                        return Err(GenomeConsistencyError::NonContiguousModuleRun {
                            genome: self.id,
                            module,
                        });
                    }
                }
            }
        }

        Ok(())
    }
}

impl fmt::Display for ModularGenome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Genome {}[gen {}, {} neurons, {} connections, modules {:?}]",
            self.id,
            self.birth_generation,
            self.neurons.len(),
            self.connections.len(),
            self.modules(),
        )
    }
}
