use crate::genomics::{
    nested_group, Connection, ModularGenome, ModuleKind, Neuron, NeuronRole, RegulatoryGate,
    NESTING_PANDEMONIUM_OFFSET,
};
use crate::populations::{EditError, Population, RegulationHierarchy};
use crate::{Innovation, ModuleId, BASE_MODULE};

use ahash::RandomState;

use std::collections::HashMap;

/// Bound for randomized initial connection weights
/// in freshly added modules.
const INITIAL_WEIGHT_BOUND: f32 = 1.0;

/// The structural-edit protocol, applied uniformly across a
/// population. Every operation is all-or-nothing: a candidate
/// genome list is built, mutated identically for every genome,
/// revalidated against the cross-genome invariants, and only
/// then committed. Illegal requests are rejected synchronously
/// before any mutation; a candidate failing revalidation is an
/// implementation bug and panics.
///
/// All operations are no-ops with respect to frozen modules,
/// touching only the active module's region, except where the
/// operation itself targets another module (deletion, gate
/// demotion on nesting, pandemonium tagging) and is applied
/// identically everywhere, preserving bit-identity.
pub struct ModuleMutator<'a> {
    population: &'a mut Population,
    hierarchy: &'a mut RegulationHierarchy,
}

impl<'a> ModuleMutator<'a> {
    /// Borrows the population and hierarchy for a sequence
    /// of structural edits.
    pub fn new(
        population: &'a mut Population,
        hierarchy: &'a mut RegulationHierarchy,
    ) -> ModuleMutator<'a> {
        ModuleMutator {
            population,
            hierarchy,
        }
    }

    /// Adds a new module to every genome and makes it the
    /// active module.
    ///
    /// The module id is one more than the highest id observed
    /// across all genomes, recomputed fresh on every call so
    /// ids cannot collide after a population reload. The new
    /// module consists of one regulatory neuron carrying the
    /// passed gate, one LocalInput per referenced source
    /// neuron, one LocalOutput per referenced target neuron,
    /// full LocalInput-to-LocalOutput wiring with randomized
    /// weights, and the protected connections realizing the
    /// gate. Its pandemonium group starts as "no group".
    ///
    /// # Errors
    /// Rejected if any referenced neuron does not exist.
    pub fn add_module(
        &mut self,
        kind: ModuleKind,
        local_inputs: &[Innovation],
        local_outputs: &[Innovation],
        gate: RegulatoryGate,
    ) -> Result<ModuleId, EditError> {
        let reference = self.reference();
        for id in local_inputs.iter().chain(local_outputs) {
            if reference.neuron(*id).is_none() {
                return Err(EditError::UnknownNeuron(*id));
            }
        }
        if let RegulatoryGate::Basic { input, .. } = gate {
            if reference.neuron(input).is_none() {
                return Err(EditError::UnknownNeuron(input));
            }
        }
        let bias = self.bias_id();

        let module = self.population.max_module_id() + 1;
        let mut neuron_id = self.next_neuron_id();
        let mut connection_id = self.next_connection_id();

        let mut neurons = vec![Neuron::regulatory(neuron_id, module, gate)];
        let regulatory = neuron_id;
        neuron_id += 1;

        let mut connections = vec![];
        let mut locals_in = vec![];
        for source in local_inputs {
            neurons.push(Neuron::new(neuron_id, NeuronRole::LocalInput, module));
            connections.push(Connection::new(
                connection_id,
                *source,
                neuron_id,
                Connection::random_weight(INITIAL_WEIGHT_BOUND),
                module,
            ));
            locals_in.push(neuron_id);
            neuron_id += 1;
            connection_id += 1;
        }
        let mut locals_out = vec![];
        for target in local_outputs {
            neurons.push(Neuron::new(neuron_id, NeuronRole::LocalOutput, module));
            connections.push(Connection::new(
                connection_id,
                neuron_id,
                *target,
                Connection::random_weight(INITIAL_WEIGHT_BOUND),
                module,
            ));
            locals_out.push(neuron_id);
            neuron_id += 1;
            connection_id += 1;
        }
        for li in &locals_in {
            for lo in &locals_out {
                connections.push(Connection::new(
                    connection_id,
                    *li,
                    *lo,
                    Connection::random_weight(INITIAL_WEIGHT_BOUND),
                    module,
                ));
                connection_id += 1;
            }
        }
        connections.extend(gate_connections(&gate, bias, regulatory, module, connection_id));

        let mut candidate = self.population.genomes.clone();
        for genome in &mut candidate {
            for neuron in &neurons {
                genome.push_neuron(neuron.clone());
            }
            for connection in &connections {
                genome.push_connection(connection.clone());
            }
        }

        if kind == ModuleKind::Regulation {
            self.hierarchy.add_container(module);
        }
        self.commit(candidate, module);
        Ok(module)
    }

    /// Duplicates the source module with fresh neuron and
    /// connection ids, placing the clone immediately before
    /// the source in genome ordering. The clone is never
    /// itself the active module.
    ///
    /// The champion's copy of the source is used as the
    /// template (so a clone of the active module freezes a
    /// single consistent snapshot); if the champion does not
    /// resolve, the first genome's copy is used instead.
    ///
    /// If the source is a container, the clone receives an
    /// independent copy of the children list referencing the
    /// *same* child module ids. Shared children are known to
    /// require further work for complex modules; the behavior
    /// is kept as-is.
    ///
    /// # Errors
    /// Rejected for the base module or an unknown module id.
    pub fn clone_module(&mut self, source: ModuleId) -> Result<ModuleId, EditError> {
        if source == BASE_MODULE {
            return Err(EditError::BaseModule);
        }
        if !self.reference().modules().contains(&source) {
            return Err(EditError::UnknownModule(source));
        }

        let template = self
            .population
            .resolve_champion()
            .unwrap_or_else(|| self.population.genomes.first().expect("population is never empty"))
            .module_subgraph(source);

        let module = self.population.max_module_id() + 1;
        let mut neuron_id = self.next_neuron_id();
        let mut connection_id = self.next_connection_id();

        let mut remapped: HashMap<Innovation, Innovation, RandomState> = HashMap::default();
        let mut subgraph = template;
        for neuron in &mut subgraph.neurons {
            remapped.insert(neuron.id(), neuron_id);
            neuron.set_id(neuron_id);
            neuron.set_module(module);
            neuron_id += 1;
        }
        for connection in &mut subgraph.connections {
            connection.set_id(connection_id);
            connection.set_module(module);
            if let Some(new_source) = remapped.get(&connection.source()) {
                connection.set_source(*new_source);
            }
            if let Some(new_target) = remapped.get(&connection.target()) {
                connection.set_target(*new_target);
            }
            connection_id += 1;
        }

        let mut candidate = self.population.genomes.clone();
        for genome in &mut candidate {
            genome.insert_module_before(source, &subgraph);
        }

        self.hierarchy.clone_children(source, module);
        let active = self.population.active_module();
        self.commit(candidate, active);
        Ok(module)
    }

    /// Removes the module's neurons and connections from every
    /// genome, along with any connection left dangling, and
    /// detaches the module from the hierarchy.
    ///
    /// # Errors
    /// Rejected for the active module (deletion is only legal
    /// for frozen modules), the base module, or an unknown
    /// module id.
    pub fn delete_module(&mut self, module: ModuleId) -> Result<(), EditError> {
        if module == BASE_MODULE {
            return Err(EditError::BaseModule);
        }
        if module == self.population.active_module() {
            return Err(EditError::DeleteActiveModule(module));
        }
        if !self.reference().modules().contains(&module) {
            return Err(EditError::UnknownModule(module));
        }

        let mut candidate = self.population.genomes.clone();
        for genome in &mut candidate {
            genome.remove_module(module);
        }

        if self.hierarchy.is_container(module) {
            let _ = self.hierarchy.remove_container(module, false);
        }
        self.hierarchy.release_child(module);

        let active = self.population.active_module();
        self.commit(candidate, active);
        Ok(())
    }

    /// Discards the active module's diverged genetic material
    /// in every genome, replacing it with a fresh copy from
    /// the champion, and advances the generation counter: a
    /// reset is a generation boundary, not merely an edit.
    ///
    /// # Errors
    /// Rejected if no module has been added yet, or if the
    /// champion pointer does not resolve.
    pub fn reset_active_module(&mut self) -> Result<ModuleId, EditError> {
        let active = self.population.active_module();
        if active == BASE_MODULE {
            return Err(EditError::BaseModule);
        }
        let champion_id = self.population.champion_id();
        let subgraph = self
            .population
            .resolve_champion()
            .ok_or(EditError::ChampionUnresolved(champion_id))?
            .module_subgraph(active);

        let mut candidate = self.population.genomes.clone();
        for genome in &mut candidate {
            genome.splice_module(active, &subgraph);
        }

        self.population.advance_generation();
        self.commit(candidate, active);
        Ok(active)
    }

    /// Nests `child` into the active regulation container
    /// `parent`: a new LocalOutput is created in the parent's
    /// region, connected to the child's regulatory neuron with
    /// the given weight; the child's gate is demoted to
    /// Advanced (its protected toggle connections are removed)
    /// and the child joins the parent's pandemonium group, so
    /// siblings remain mutually exclusive.
    ///
    /// # Errors
    /// Rejected if the parent is not the active module, the
    /// parent is not a registered container, the child is the
    /// base module or unknown, or the nesting violates the
    /// hierarchy's single-ownership or acyclicity rules.
    pub fn nest_module(
        &mut self,
        parent: ModuleId,
        child: ModuleId,
        weight: f32,
    ) -> Result<(), EditError> {
        if parent != self.population.active_module() {
            return Err(EditError::OutsideActiveModule(parent));
        }
        if child == BASE_MODULE {
            return Err(EditError::BaseModule);
        }
        if !self.reference().modules().contains(&child) {
            return Err(EditError::UnknownModule(child));
        }
        self.hierarchy.nest_child(parent, child)?;

        let child_regulatory = self
            .reference()
            .regulatory(child)
            .expect("validated module has a regulatory neuron")
            .id();
        let local_output = self.next_neuron_id();
        let connection = self.next_connection_id();
        let group = nested_group(parent);

        let mut candidate = self.population.genomes.clone();
        for genome in &mut candidate {
            genome.insert_neuron_in_module(Neuron::new(
                local_output,
                NeuronRole::LocalOutput,
                parent,
            ));
            genome.push_connection(Connection::new(
                connection,
                local_output,
                child_regulatory,
                weight,
                parent,
            ));
            genome.strip_protected(child);
            let regulatory = genome
                .regulatory_mut(child)
                .expect("validated module has a regulatory neuron");
            regulatory.set_gate(RegulatoryGate::Advanced);
            regulatory.set_pandemonium(group);
        }

        self.commit(candidate, parent);
        Ok(())
    }

    /// Rewrites connection weights within the active module.
    /// Updates are addressed by innovation id; ids absent from
    /// a given genome's copy of the active module are skipped
    /// for that genome, since active-module contents may
    /// legitimately diverge across genomes mid-evolution.
    ///
    /// # Errors
    /// Rejected if an update addresses a protected connection
    /// or a connection outside the active module.
    pub fn change_weights(&mut self, updates: &[(Innovation, f32)]) -> Result<(), EditError> {
        let active = self.population.active_module();
        if active == BASE_MODULE {
            return Err(EditError::BaseModule);
        }
        for (id, _) in updates {
            if let Some(connection) = self.reference().connection(*id) {
                if connection.protected() {
                    return Err(EditError::ProtectedConnection(*id));
                }
                if connection.module() != active {
                    return Err(EditError::OutsideActiveModule(connection.module()));
                }
            }
        }

        let mut candidate = self.population.genomes.clone();
        for genome in &mut candidate {
            for connection in genome.connections_mut() {
                if connection.module() != active || connection.protected() {
                    continue;
                }
                if let Some((_, weight)) = updates
                    .iter()
                    .find(|(id, _)| *id == connection.innovation())
                {
                    connection.set_weight(*weight);
                }
            }
        }

        self.commit(candidate, active);
        Ok(())
    }

    /// Retargets the outgoing connections of LocalOutput
    /// neurons in the active module. Each rewire names a
    /// LocalOutput neuron and a new target neuron; genomes
    /// whose active-module copy lacks the neuron (or the
    /// target) are skipped.
    ///
    /// # Errors
    /// Rejected if a named neuron is known but is not a
    /// LocalOutput of the active module, or a target neuron
    /// is entirely unknown.
    pub fn change_targets(
        &mut self,
        rewires: &[(Innovation, Innovation)],
    ) -> Result<(), EditError> {
        let active = self.population.active_module();
        if active == BASE_MODULE {
            return Err(EditError::BaseModule);
        }
        for (local_output, target) in rewires {
            if self.reference().neuron(*target).is_none() {
                return Err(EditError::UnknownNeuron(*target));
            }
            if let Some(neuron) = self.reference().neuron(*local_output) {
                if neuron.role() != NeuronRole::LocalOutput || neuron.module() != active {
                    return Err(EditError::NotALocalOutput(*local_output));
                }
            }
        }

        let mut candidate = self.population.genomes.clone();
        for genome in &mut candidate {
            for (local_output, target) in rewires {
                if genome.neuron(*target).is_none() {
                    continue;
                }
                let rewirable: Vec<Innovation> = genome
                    .connections()
                    .filter(|c| {
                        c.module() == active && c.source() == *local_output && !c.protected()
                    })
                    .map(Connection::innovation)
                    .collect();
                for id in rewirable {
                    for connection in genome.connections_mut() {
                        if connection.innovation() == id {
                            connection.set_target(*target);
                        }
                    }
                }
            }
        }

        self.commit(candidate, active);
        Ok(())
    }

    /// Rewrites the active module's regulatory gate: the old
    /// protected connections are removed and, for a basic
    /// gate, fresh protected connections realizing the new
    /// toggle are added identically to every genome.
    ///
    /// # Errors
    /// Rejected if a basic gate references an unknown input
    /// neuron, or no module has been added yet.
    pub fn update_regulatory_gate(&mut self, gate: RegulatoryGate) -> Result<(), EditError> {
        let active = self.population.active_module();
        if active == BASE_MODULE {
            return Err(EditError::BaseModule);
        }
        if let RegulatoryGate::Basic { input, .. } = gate {
            if self.reference().neuron(input).is_none() {
                return Err(EditError::UnknownNeuron(input));
            }
        }
        let bias = self.bias_id();
        let regulatory = self
            .reference()
            .regulatory(active)
            .expect("validated module has a regulatory neuron")
            .id();
        let connection_id = self.next_connection_id();
        let connections = gate_connections(&gate, bias, regulatory, active, connection_id);

        let mut candidate = self.population.genomes.clone();
        for genome in &mut candidate {
            genome.strip_protected(active);
            genome
                .regulatory_mut(active)
                .expect("validated module has a regulatory neuron")
                .set_gate(gate);
            for connection in &connections {
                genome.push_connection(connection.clone());
            }
        }

        self.commit(candidate, active);
        Ok(())
    }

    /// Rewrites a module's pandemonium group tag in every
    /// genome. Applies to frozen modules too: the tag is
    /// metadata replicated identically across the population.
    ///
    /// # Errors
    /// Rejected for the base module or an unknown module id.
    pub fn update_pandemonium(&mut self, module: ModuleId, group: usize) -> Result<(), EditError> {
        if module == BASE_MODULE {
            return Err(EditError::BaseModule);
        }
        if !self.reference().modules().contains(&module) {
            return Err(EditError::UnknownModule(module));
        }

        let mut candidate = self.population.genomes.clone();
        for genome in &mut candidate {
            genome
                .regulatory_mut(module)
                .expect("validated module has a regulatory neuron")
                .set_pandemonium(group);
        }

        let active = self.population.active_module();
        self.commit(candidate, active);
        Ok(())
    }

    fn reference(&self) -> &ModularGenome {
        self.population
            .genomes
            .first()
            .expect("population is never empty")
    }

    fn bias_id(&self) -> Innovation {
        self.reference()
            .neurons()
            .find(|n| n.role() == NeuronRole::Bias)
            .expect("genomes always carry a bias neuron")
            .id()
    }

    fn next_neuron_id(&self) -> Innovation {
        self.population
            .genomes
            .iter()
            .filter_map(ModularGenome::max_neuron_id)
            .max()
            .map_or(0, |max| max + 1)
    }

    fn next_connection_id(&self) -> Innovation {
        self.population
            .genomes
            .iter()
            .filter_map(ModularGenome::max_connection_id)
            .max()
            .map_or(0, |max| max + 1)
    }

    /// Swaps the candidate genome list in and revalidates the
    /// whole population. A violation here is an implementation
    /// bug in the edit protocol, not a recoverable condition.
    fn commit(&mut self, candidate: Vec<ModularGenome>, active: ModuleId) {
        self.population.genomes = candidate;
        self.population.set_active_module(active);
        if let Err(e) = self.population.validate() {
            panic!("structural edit produced an inconsistent population: {}", e);
        }
    }
}

/// Returns the protected connections realizing a gate:
/// "active when input is active" is a single +1 connection
/// from the input; the inverted toggle is +1 from bias and
/// -1 from the input; an advanced gate adds nothing.
fn gate_connections(
    gate: &RegulatoryGate,
    bias: Innovation,
    regulatory: Innovation,
    module: ModuleId,
    first_id: Innovation,
) -> Vec<Connection> {
    match gate {
        RegulatoryGate::Basic {
            input,
            active_when_input_active: true,
        } => vec![Connection::new_protected(first_id, *input, regulatory, 1.0, module)],
        RegulatoryGate::Basic {
            input,
            active_when_input_active: false,
        } => vec![
            Connection::new_protected(first_id, bias, regulatory, 1.0, module),
            Connection::new_protected(first_id + 1, *input, regulatory, -1.0, module),
        ],
        RegulatoryGate::Advanced => vec![],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::num::NonZeroUsize;

    fn fresh(size: usize) -> (Population, RegulationHierarchy) {
        (
            Population::new(NonZeroUsize::new(size).unwrap(), 2, 1),
            RegulationHierarchy::new(),
        )
    }

    fn basic_gate() -> RegulatoryGate {
        RegulatoryGate::Basic {
            input: 1,
            active_when_input_active: true,
        }
    }

    #[test]
    fn add_module_to_fresh_population() {
        let (mut population, mut hierarchy) = fresh(3);
        let module = ModuleMutator::new(&mut population, &mut hierarchy)
            .add_module(ModuleKind::Basic, &[1, 2], &[3], basic_gate())
            .unwrap();

        assert_eq!(module, 1);
        assert_eq!(population.active_module(), 1);
        assert_eq!(population.max_module_id(), 1);
        for genome in population.genomes() {
            assert_eq!(genome.modules(), vec![1]);
            assert_eq!(
                genome
                    .neurons()
                    .filter(|n| n.module() == 1 && n.role() == NeuronRole::Regulatory)
                    .count(),
                1
            );
        }
        assert!(population.validate().is_ok());
    }

    #[test]
    fn add_module_allocates_fresh_ids_after_reload() {
        let (mut population, mut hierarchy) = fresh(2);
        ModuleMutator::new(&mut population, &mut hierarchy)
            .add_module(ModuleKind::Basic, &[1], &[3], basic_gate())
            .unwrap();

        // Simulate a process restart: the population travels
        // through its serialized form, losing any in-memory state.
        let json = serde_json::to_string(&population).unwrap();
        let mut reloaded: Population = serde_json::from_str(&json).unwrap();

        let module = ModuleMutator::new(&mut reloaded, &mut hierarchy)
            .add_module(ModuleKind::Basic, &[2], &[3], basic_gate())
            .unwrap();
        assert_eq!(module, 2);
        assert!(reloaded.validate().is_ok());
    }

    #[test]
    fn gate_realization_uses_protected_connections() {
        let (mut population, mut hierarchy) = fresh(1);
        ModuleMutator::new(&mut population, &mut hierarchy)
            .add_module(
                ModuleKind::Basic,
                &[1],
                &[3],
                RegulatoryGate::Basic {
                    input: 1,
                    active_when_input_active: false,
                },
            )
            .unwrap();
        let genome = population.genomes().next().unwrap();
        let protected: Vec<&Connection> =
            genome.connections().filter(|c| c.protected()).collect();
        assert_eq!(protected.len(), 2);
        assert_eq!(protected[0].source(), 0); // bias
        assert_eq!(protected[0].weight(), 1.0);
        assert_eq!(protected[1].source(), 1);
        assert_eq!(protected[1].weight(), -1.0);
    }

    #[test]
    fn delete_active_module_is_rejected() {
        let (mut population, mut hierarchy) = fresh(2);
        let mut mutator = ModuleMutator::new(&mut population, &mut hierarchy);
        let module = mutator
            .add_module(ModuleKind::Basic, &[1], &[3], basic_gate())
            .unwrap();
        assert_eq!(
            mutator.delete_module(module),
            Err(EditError::DeleteActiveModule(module))
        );
    }

    #[test]
    fn delete_frozen_module_removes_it_everywhere() {
        let (mut population, mut hierarchy) = fresh(3);
        let mut mutator = ModuleMutator::new(&mut population, &mut hierarchy);
        let first = mutator
            .add_module(ModuleKind::Basic, &[1], &[3], basic_gate())
            .unwrap();
        let second = mutator
            .add_module(ModuleKind::Basic, &[2], &[3], basic_gate())
            .unwrap();
        assert_eq!(population.active_module(), second);

        let mut mutator = ModuleMutator::new(&mut population, &mut hierarchy);
        mutator.delete_module(first).unwrap();
        for genome in population.genomes() {
            assert_eq!(genome.modules(), vec![second]);
        }
        assert!(population.validate().is_ok());
    }

    #[test]
    fn reset_active_module_restores_champion_material() {
        let (mut population, mut hierarchy) = fresh(5);
        ModuleMutator::new(&mut population, &mut hierarchy)
            .add_module(ModuleKind::Basic, &[1, 2], &[3], basic_gate())
            .unwrap();
        let generation = population.generation();
        let champion_copy = population
            .resolve_champion()
            .unwrap()
            .module_subgraph(population.active_module());

        // Diverge one genome's active module, as external
        // evolution would between generations.
        {
            let active = population.active_module();
            let genome = &mut population.genomes[3];
            for connection in genome.connections_mut() {
                if connection.module() == active && !connection.protected() {
                    connection.set_weight(42.0);
                }
            }
        }

        ModuleMutator::new(&mut population, &mut hierarchy)
            .reset_active_module()
            .unwrap();

        assert_eq!(population.generation(), generation + 1);
        for genome in population.genomes() {
            assert_eq!(
                genome.module_subgraph(population.active_module()),
                champion_copy
            );
        }
    }

    #[test]
    fn nesting_demotes_child_and_tags_pandemonium() {
        let (mut population, mut hierarchy) = fresh(2);
        let mut mutator = ModuleMutator::new(&mut population, &mut hierarchy);
        let child = mutator
            .add_module(ModuleKind::Basic, &[1], &[3], basic_gate())
            .unwrap();
        let parent = mutator
            .add_module(ModuleKind::Regulation, &[1, 2], &[3], basic_gate())
            .unwrap();
        mutator.nest_module(parent, child, 0.75).unwrap();

        assert_eq!(hierarchy.children(parent), &[child]);
        for genome in population.genomes() {
            let regulatory = genome.regulatory(child).unwrap();
            assert!(regulatory.gate().unwrap().is_advanced());
            assert_eq!(
                regulatory.pandemonium(),
                parent + NESTING_PANDEMONIUM_OFFSET
            );
            // The child's toggle realization is gone; the parent
            // now feeds the child's regulatory neuron.
            assert!(genome
                .connections()
                .all(|c| !(c.module() == child && c.protected())));
            assert_eq!(
                genome
                    .connections()
                    .filter(|c| c.target() == regulatory.id() && c.module() == parent)
                    .count(),
                1
            );
        }
        assert!(population.validate().is_ok());
    }

    #[test]
    fn nesting_requires_active_parent() {
        let (mut population, mut hierarchy) = fresh(1);
        let mut mutator = ModuleMutator::new(&mut population, &mut hierarchy);
        let parent = mutator
            .add_module(ModuleKind::Regulation, &[1], &[3], basic_gate())
            .unwrap();
        let child = mutator
            .add_module(ModuleKind::Basic, &[2], &[3], basic_gate())
            .unwrap();
        // `child` is now active, so `parent` is frozen.
        assert_eq!(
            mutator.nest_module(parent, child, 1.0),
            Err(EditError::OutsideActiveModule(parent))
        );
    }

    #[test]
    fn clone_of_container_shares_children() {
        let (mut population, mut hierarchy) = fresh(2);
        let mut mutator = ModuleMutator::new(&mut population, &mut hierarchy);
        let first = mutator
            .add_module(ModuleKind::Basic, &[1], &[3], basic_gate())
            .unwrap();
        let second = mutator
            .add_module(ModuleKind::Basic, &[2], &[3], basic_gate())
            .unwrap();
        let container = mutator
            .add_module(ModuleKind::Regulation, &[1, 2], &[3], basic_gate())
            .unwrap();
        mutator.nest_module(container, first, 1.0).unwrap();
        mutator.nest_module(container, second, 1.0).unwrap();

        let clone = mutator.clone_module(container).unwrap();
        assert_ne!(clone, container);
        assert_eq!(population.active_module(), container);
        assert_eq!(hierarchy.children(clone), &[first, second]);
        assert!(population.validate().is_ok());
    }

    #[test]
    fn clone_is_placed_before_source() {
        let (mut population, mut hierarchy) = fresh(1);
        let mut mutator = ModuleMutator::new(&mut population, &mut hierarchy);
        let source = mutator
            .add_module(ModuleKind::Basic, &[1], &[3], basic_gate())
            .unwrap();
        let clone = mutator.clone_module(source).unwrap();

        let genome = population.genomes().next().unwrap();
        let first_clone = genome.neurons().position(|n| n.module() == clone).unwrap();
        let first_source = genome.neurons().position(|n| n.module() == source).unwrap();
        assert!(first_clone < first_source);
    }

    #[test]
    fn change_weights_skips_frozen_modules() {
        let (mut population, mut hierarchy) = fresh(2);
        let mut mutator = ModuleMutator::new(&mut population, &mut hierarchy);
        mutator
            .add_module(ModuleKind::Basic, &[1], &[3], basic_gate())
            .unwrap();
        let frozen_connection = population
            .genomes()
            .next()
            .unwrap()
            .connections()
            .find(|c| !c.protected())
            .unwrap()
            .innovation();
        let second = ModuleMutator::new(&mut population, &mut hierarchy)
            .add_module(ModuleKind::Basic, &[2], &[3], basic_gate())
            .unwrap();
        assert_eq!(population.active_module(), second);

        let result = ModuleMutator::new(&mut population, &mut hierarchy)
            .change_weights(&[(frozen_connection, 9.0)]);
        assert_eq!(result, Err(EditError::OutsideActiveModule(1)));
    }

    #[test]
    fn change_targets_rewires_active_local_outputs() {
        let mut population = Population::new(NonZeroUsize::new(2).unwrap(), 2, 2);
        let mut hierarchy = RegulationHierarchy::new();
        let mut mutator = ModuleMutator::new(&mut population, &mut hierarchy);
        let frozen = mutator
            .add_module(ModuleKind::Basic, &[1], &[3], basic_gate())
            .unwrap();
        mutator
            .add_module(ModuleKind::Basic, &[2], &[3], basic_gate())
            .unwrap();
        let frozen_copy = population.genomes().next().unwrap().module_subgraph(frozen);
        let local_output = population
            .genomes()
            .next()
            .unwrap()
            .neurons()
            .find(|n| n.module() == population.active_module() && n.role() == NeuronRole::LocalOutput)
            .unwrap()
            .id();

        ModuleMutator::new(&mut population, &mut hierarchy)
            .change_targets(&[(local_output, 4)])
            .unwrap();

        for genome in population.genomes() {
            assert!(genome
                .connections()
                .any(|c| c.source() == local_output && c.target() == 4));
            assert!(genome
                .connections()
                .all(|c| !(c.source() == local_output && c.target() == 3)));
            assert_eq!(genome.module_subgraph(frozen), frozen_copy);
        }
        assert!(population.validate().is_ok());
    }

    #[test]
    fn change_targets_rejects_non_local_outputs() {
        let (mut population, mut hierarchy) = fresh(1);
        ModuleMutator::new(&mut population, &mut hierarchy)
            .add_module(ModuleKind::Basic, &[1], &[3], basic_gate())
            .unwrap();
        let local_input = population
            .genomes()
            .next()
            .unwrap()
            .neurons()
            .find(|n| n.role() == NeuronRole::LocalInput)
            .unwrap()
            .id();
        let result = ModuleMutator::new(&mut population, &mut hierarchy)
            .change_targets(&[(local_input, 3)]);
        assert_eq!(result, Err(EditError::NotALocalOutput(local_input)));
    }

    #[test]
    fn change_targets_rejects_unknown_targets() {
        let (mut population, mut hierarchy) = fresh(1);
        ModuleMutator::new(&mut population, &mut hierarchy)
            .add_module(ModuleKind::Basic, &[1], &[3], basic_gate())
            .unwrap();
        let result =
            ModuleMutator::new(&mut population, &mut hierarchy).change_targets(&[(6, 99)]);
        assert_eq!(result, Err(EditError::UnknownNeuron(99)));
    }

    #[test]
    fn change_weights_rejects_protected_connections() {
        let (mut population, mut hierarchy) = fresh(1);
        let mut mutator = ModuleMutator::new(&mut population, &mut hierarchy);
        mutator
            .add_module(ModuleKind::Basic, &[1], &[3], basic_gate())
            .unwrap();
        let protected = population
            .genomes()
            .next()
            .unwrap()
            .connections()
            .find(|c| c.protected())
            .unwrap()
            .innovation();
        let result = ModuleMutator::new(&mut population, &mut hierarchy)
            .change_weights(&[(protected, 9.0)]);
        assert_eq!(result, Err(EditError::ProtectedConnection(protected)));
    }

    #[test]
    fn update_regulatory_gate_replaces_protected_material() {
        let (mut population, mut hierarchy) = fresh(2);
        let mut mutator = ModuleMutator::new(&mut population, &mut hierarchy);
        mutator
            .add_module(ModuleKind::Basic, &[1], &[3], basic_gate())
            .unwrap();
        mutator
            .update_regulatory_gate(RegulatoryGate::Basic {
                input: 2,
                active_when_input_active: false,
            })
            .unwrap();

        for genome in population.genomes() {
            let protected: Vec<&Connection> =
                genome.connections().filter(|c| c.protected()).collect();
            assert_eq!(protected.len(), 2);
            assert_eq!(protected[1].source(), 2);
            assert_eq!(
                genome.regulatory(1).unwrap().gate(),
                Some(&RegulatoryGate::Basic {
                    input: 2,
                    active_when_input_active: false,
                })
            );
        }
        assert!(population.validate().is_ok());
    }

    #[test]
    fn update_pandemonium_tags_every_genome() {
        let (mut population, mut hierarchy) = fresh(3);
        let mut mutator = ModuleMutator::new(&mut population, &mut hierarchy);
        let module = mutator
            .add_module(ModuleKind::Basic, &[1], &[3], basic_gate())
            .unwrap();
        mutator.update_pandemonium(module, 7).unwrap();
        for genome in population.genomes() {
            assert_eq!(genome.regulatory(module).unwrap().pandemonium(), 7);
        }
    }

    #[test]
    fn frozen_modules_stay_identical_across_edits() {
        let (mut population, mut hierarchy) = fresh(4);
        let mut mutator = ModuleMutator::new(&mut population, &mut hierarchy);
        let frozen = mutator
            .add_module(ModuleKind::Basic, &[1, 2], &[3], basic_gate())
            .unwrap();
        let active = mutator
            .add_module(ModuleKind::Basic, &[1], &[3], basic_gate())
            .unwrap();
        let weight_target = population
            .genomes()
            .next()
            .unwrap()
            .connections()
            .find(|c| c.module() == active && !c.protected())
            .unwrap()
            .innovation();

        let mut mutator = ModuleMutator::new(&mut population, &mut hierarchy);
        mutator.change_weights(&[(weight_target, 0.123)]).unwrap();
        mutator.update_pandemonium(frozen, 3).unwrap();
        mutator.clone_module(frozen).unwrap();

        let reference = population.genomes().next().unwrap().module_subgraph(frozen);
        for genome in population.genomes() {
            assert_eq!(genome.module_subgraph(frozen), reference);
        }
        assert!(population.validate().is_ok());
    }
}
