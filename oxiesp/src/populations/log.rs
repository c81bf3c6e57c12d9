use crate::populations::Population;

use serde::{Deserialize, Serialize};

use std::fmt;

/// One line of the append-only research log: the generation
/// number and the maximum fitness it reached.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GenerationRecord {
    pub generation: usize,
    pub max_fitness: f32,
}

impl fmt::Display for GenerationRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}\t{}", self.generation, self.max_fitness)
    }
}

/// Recomputed population statistics: the dependent counters
/// that structural edits re-derive after mutation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Summary {
    pub generation: usize,
    pub max_fitness: f32,
    pub mean_fitness: f32,
    pub neuron_count: usize,
    pub connection_count: usize,
    pub module_count: usize,
}

impl Summary {
    /// Returns statistics recomputed from the population's
    /// current state. Neuron, connection and module counts are
    /// taken from the first genome; all genomes carry the same
    /// module set, so the module count holds population-wide.
    pub fn of(population: &Population) -> Summary {
        let fitnesses: Vec<f32> = population.genomes().map(|g| g.fitness()).collect();
        let max_fitness = fitnesses.iter().copied().fold(0.0, f32::max);
        let mean_fitness = if fitnesses.is_empty() {
            0.0
        } else {
            fitnesses.iter().copied().sum::<f32>() / fitnesses.len() as f32
        };
        let (neuron_count, connection_count) = population
            .genomes()
            .next()
            .map(|g| g.complexity())
            .unwrap_or((0, 0));
        Summary {
            generation: population.generation(),
            max_fitness,
            mean_fitness,
            neuron_count,
            connection_count,
            module_count: population
                .genomes()
                .next()
                .map(|g| g.modules().len())
                .unwrap_or(0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genomics::{ModuleKind, RegulatoryGate};
    use crate::populations::{ModuleMutator, RegulationHierarchy};

    use std::num::NonZeroUsize;

    #[test]
    fn record_formats_as_tab_separated_line() {
        let record = GenerationRecord {
            generation: 7,
            max_fitness: 3.5,
        };
        assert_eq!(record.to_string(), "7\t3.5");
    }

    #[test]
    fn summary_recomputes_fitness_statistics() {
        let mut population = Population::new(NonZeroUsize::new(2).unwrap(), 1, 1);
        population.evaluate_fitness(|g| if g.id() == 0 { 1.0 } else { 3.0 });
        let summary = population.summary();
        assert_eq!(summary.max_fitness, 3.0);
        assert_eq!(summary.mean_fitness, 2.0);
        assert_eq!(summary.neuron_count, 3);
    }

    #[test]
    fn summary_counts_modules_across_id_gaps() {
        let mut population = Population::new(NonZeroUsize::new(2).unwrap(), 2, 1);
        let mut hierarchy = RegulationHierarchy::new();
        let gate = RegulatoryGate::Basic {
            input: 1,
            active_when_input_active: true,
        };
        let mut mutator = ModuleMutator::new(&mut population, &mut hierarchy);
        let first = mutator.add_module(ModuleKind::Basic, &[1], &[3], gate).unwrap();
        mutator.add_module(ModuleKind::Basic, &[2], &[3], gate).unwrap();
        mutator.delete_module(first).unwrap();

        // Module ids are 1 and 2, with 1 deleted: one module
        // remains even though the highest id is 2.
        assert_eq!(population.summary().module_count, 1);
    }
}
