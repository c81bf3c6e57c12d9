//! A Population is an ordered collection of modular genomes
//! plus the coordination state that keeps them mutually
//! consistent: the champion pointer, the generation counter
//! and the single active module.
mod errors;
mod hierarchy;
mod log;
mod mutator;

pub use errors::{EditError, PopulationConsistencyError};
pub use hierarchy::{HierarchyError, RegulationHierarchy};
pub use log::{GenerationRecord, Summary};
pub use mutator::ModuleMutator;

use crate::genomics::ModularGenome;
use crate::{GenomeId, ModuleId, BASE_MODULE};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::warn;

use std::num::NonZeroUsize;

/// A population of modular genomes.
///
/// All genomes carry topologically-equivalent module structure:
/// every module id present in one genome is present in all of
/// them, and every module other than the active one is a
/// bit-identical frozen copy of the champion's material. The
/// population is exclusively owned by its controller; external
/// collaborators receive read-only access and route every
/// mutation through the structural-edit API.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Population {
    genomes: Vec<ModularGenome>,
    champion: GenomeId,
    generation: usize,
    active_module: ModuleId,
    next_genome_id: GenomeId,
}

impl Population {
    /// Creates a fresh population of `size` genomes containing
    /// only the base module. The module id space starts at 1:
    /// the first added module receives id 1 and becomes active.
    ///
    /// # Examples
    /// ```
    /// use oxiesp::populations::Population;
    /// use std::num::NonZeroUsize;
    ///
    /// let population = Population::new(NonZeroUsize::new(5).unwrap(), 2, 1);
    ///
    /// assert_eq!(population.genomes().count(), 5);
    /// assert_eq!(population.generation(), 0);
    /// assert_eq!(population.active_module(), 0);
    /// ```
    pub fn new(size: NonZeroUsize, input_count: usize, output_count: usize) -> Population {
        Population {
            genomes: (0..size.get())
                .map(|id| ModularGenome::with_base(id, 0, input_count, output_count))
                .collect(),
            champion: 0,
            generation: 0,
            active_module: BASE_MODULE,
            next_genome_id: size.get(),
        }
    }

    /// Returns an iterator over the population's genomes.
    pub fn genomes(&self) -> impl Iterator<Item = &ModularGenome> {
        self.genomes.iter()
    }

    /// Returns the genome with the specified id, if present.
    pub fn genome(&self, id: GenomeId) -> Option<&ModularGenome> {
        self.genomes.iter().find(|g| g.id() == id)
    }

    /// Returns the stored champion genome id. The id is a
    /// pointer, not a guarantee: see [`resolve_champion`].
    ///
    /// [`resolve_champion`]: Population::resolve_champion
    pub fn champion_id(&self) -> GenomeId {
        self.champion
    }

    /// Points the champion at the specified genome id.
    pub fn set_champion(&mut self, id: GenomeId) {
        self.champion = id;
    }

    /// Finds the genome the champion pointer refers to.
    ///
    /// If the pointer does not resolve (possible after a
    /// structural edit renumbers or replaces genomes), a
    /// warning is emitted and `None` is returned; the pointer
    /// is left untouched, since subsequent generations will
    /// naturally produce a new champion.
    pub fn resolve_champion(&self) -> Option<&ModularGenome> {
        let champion = self.genome(self.champion);
        if champion.is_none() {
            warn!(
                champion = self.champion,
                "champion id does not resolve to any genome; champion unknown until next generation"
            );
        }
        champion
    }

    /// Returns the current generation number.
    pub fn generation(&self) -> usize {
        self.generation
    }

    /// Increments the generation counter.
    pub fn advance_generation(&mut self) {
        self.generation += 1;
    }

    /// Returns the id of the single module currently subject
    /// to structural evolution.
    pub fn active_module(&self) -> ModuleId {
        self.active_module
    }

    fn set_active_module(&mut self, module: ModuleId) {
        self.active_module = module;
    }

    /// Returns the highest module id observed across all
    /// genomes. Recomputed fresh on every call, never cached,
    /// so module id allocation cannot collide after a reload.
    pub fn max_module_id(&self) -> ModuleId {
        self.genomes
            .iter()
            .map(ModularGenome::max_module_id)
            .max()
            .unwrap_or(BASE_MODULE)
    }

    /// Reserves and returns a fresh genome id for an external
    /// reproduction strategy.
    pub fn allocate_genome_id(&mut self) -> GenomeId {
        let id = self.next_genome_id;
        self.next_genome_id += 1;
        id
    }

    /// Evaluates the fitness of each genome using the passed
    /// evaluator, one task per genome, joining all results
    /// before returning. The return value of the evaluator
    /// should be non-negative.
    pub fn evaluate_fitness<E>(&mut self, evaluator: E)
    where
        E: Fn(&ModularGenome) -> f32 + Sync,
    {
        let fitnesses: Vec<f32> = self.genomes.par_iter().map(|g| evaluator(g)).collect();
        for (genome, fitness) in self.genomes.iter_mut().zip(fitnesses) {
            assert!(fitness >= 0.0, "fitness function returned a negative value");
            genome.set_fitness(fitness);
        }
    }

    /// Assigns the passed per-genome fitness values, e.g.
    /// from a manual selection verdict. Ids not present in
    /// the population are ignored.
    pub fn assign_fitness(&mut self, fitnesses: &[(GenomeId, f32)]) {
        for (id, fitness) in fitnesses {
            if let Some(genome) = self.genomes.iter_mut().find(|g| g.id() == *id) {
                genome.set_fitness(*fitness);
            }
        }
    }

    /// Checks the cross-genome consistency invariants: every
    /// genome is internally valid, all genomes carry the same
    /// module id set, and every non-active module's subgraph
    /// is bit-identical across the population.
    ///
    /// # Errors
    /// Returns the first violation found.
    pub fn validate(&self) -> Result<(), PopulationConsistencyError> {
        let reference = match self.genomes.first() {
            Some(reference) => reference,
            None => return Err(PopulationConsistencyError::EmptyPopulation),
        };

        for genome in &self.genomes {
            genome.validate()?;
        }

        let modules = reference.modules();
        for genome in &self.genomes[1..] {
            if genome.modules() != modules {
                return Err(PopulationConsistencyError::ModuleSetMismatch {
                    genome: genome.id(),
                });
            }
        }

        for module in modules {
            if module == self.active_module {
                continue;
            }
            let frozen = reference.module_subgraph(module);
            for genome in &self.genomes[1..] {
                if genome.module_subgraph(module) != frozen {
                    return Err(PopulationConsistencyError::FrozenModuleDiverged {
                        module,
                        genome: genome.id(),
                    });
                }
            }
        }

        Ok(())
    }

    /// Returns recomputed population statistics.
    pub fn summary(&self) -> Summary {
        Summary::of(self)
    }
}
