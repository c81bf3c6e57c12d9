use crate::controller::GenerationVerdict;
use crate::populations::Population;
use crate::GenomeId;

/// The sign of the fitness a manual selection assigns.
///
/// Under [`Reward`], selected genomes receive the session's
/// reward fitness and unselected genomes receive zero. Under
/// [`Punish`] the ranking is flipped: selected genomes receive
/// zero and everything else receives the reward.
///
/// [`Reward`]: Judgment::Reward
/// [`Punish`]: Judgment::Punish
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Judgment {
    Reward,
    Punish,
}

/// A human-in-the-loop generation: instead of computed
/// fitness, the collaborator toggles per-genome selections and
/// the session turns them into the same generation-advance
/// verdict automatic evaluation produces.
///
/// The session is detached from the controller: build it with
/// [`EvolutionController::manual_session`], collect picks, and
/// feed [`end_generation`]'s verdict back through
/// [`EvolutionController::on_generation_advanced`].
///
/// [`EvolutionController::manual_session`]: crate::controller::EvolutionController::manual_session
/// [`EvolutionController::on_generation_advanced`]: crate::controller::EvolutionController::on_generation_advanced
/// [`end_generation`]: ManualSelectionSession::end_generation
#[derive(Clone, Debug)]
pub struct ManualSelectionSession {
    entries: Vec<(GenomeId, bool)>,
    judgment: Judgment,
    reward: f32,
}

impl ManualSelectionSession {
    pub(super) fn over(population: &Population, reward: f32) -> ManualSelectionSession {
        ManualSelectionSession {
            entries: population.genomes().map(|g| (g.id(), false)).collect(),
            judgment: Judgment::Reward,
            reward,
        }
    }

    /// Marks the genome as selected. Unknown ids are ignored.
    pub fn select(&mut self, id: GenomeId) {
        self.set_selected(id, true);
    }

    /// Clears the genome's selection. Unknown ids are ignored.
    pub fn deselect(&mut self, id: GenomeId) {
        self.set_selected(id, false);
    }

    /// Returns whether the genome is currently selected.
    pub fn selected(&self, id: GenomeId) -> bool {
        self.entries
            .iter()
            .any(|(entry, selected)| *entry == id && *selected)
    }

    /// Sets the judgment applied when the session ends.
    pub fn set_judgment(&mut self, judgment: Judgment) {
        self.judgment = judgment;
    }

    /// Returns the judgment applied when the session ends.
    pub fn judgment(&self) -> Judgment {
        self.judgment
    }

    /// Closes the session, turning the collected picks into a
    /// generation-advance verdict. The champion is the first
    /// genome carrying the highest assigned fitness.
    pub fn end_generation(self) -> GenerationVerdict {
        let fitnesses: Vec<(GenomeId, f32)> = self
            .entries
            .iter()
            .map(|(id, selected)| {
                let rewarded = match self.judgment {
                    Judgment::Reward => *selected,
                    Judgment::Punish => !*selected,
                };
                (*id, if rewarded { self.reward } else { 0.0 })
            })
            .collect();
        let (champion, max_fitness) = fitnesses
            .iter()
            .fold(None, |best: Option<(GenomeId, f32)>, (id, fitness)| {
                match best {
                    Some((_, top)) if top >= *fitness => best,
                    _ => Some((*id, *fitness)),
                }
            })
            .unwrap_or((0, 0.0));
        GenerationVerdict {
            fitnesses,
            champion,
            max_fitness,
        }
    }

    /// Aborts the session. Whatever picks were accumulated
    /// before the interruption still produce a valid verdict,
    /// so the generation machinery never stalls; an aborted
    /// session is indistinguishable from one ended early.
    pub fn abort(self) -> GenerationVerdict {
        self.end_generation()
    }

    fn set_selected(&mut self, id: GenomeId, value: bool) {
        if let Some(entry) = self.entries.iter_mut().find(|(entry, _)| *entry == id) {
            entry.1 = value;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::num::NonZeroUsize;

    fn session() -> ManualSelectionSession {
        let population = Population::new(NonZeroUsize::new(4).unwrap(), 1, 1);
        ManualSelectionSession::over(&population, 2.0)
    }

    #[test]
    fn reward_assigns_fitness_to_selected_genomes() {
        let mut session = session();
        session.select(1);
        session.select(3);
        session.deselect(3);

        let verdict = session.end_generation();
        assert_eq!(
            verdict.fitnesses,
            vec![(0, 0.0), (1, 2.0), (2, 0.0), (3, 0.0)]
        );
        assert_eq!(verdict.champion, 1);
        assert_eq!(verdict.max_fitness, 2.0);
    }

    #[test]
    fn punish_flips_the_ranking() {
        let mut session = session();
        session.set_judgment(Judgment::Punish);
        session.select(0);

        let verdict = session.end_generation();
        assert_eq!(
            verdict.fitnesses,
            vec![(0, 0.0), (1, 2.0), (2, 2.0), (3, 2.0)]
        );
        assert_eq!(verdict.champion, 1);
    }

    #[test]
    fn abort_still_produces_a_verdict() {
        let mut session = session();
        session.select(2);

        let verdict = session.abort();
        assert_eq!(verdict.champion, 2);
        assert_eq!(verdict.max_fitness, 2.0);
    }

    #[test]
    fn empty_selection_falls_back_to_the_first_genome() {
        let verdict = session().end_generation();
        assert_eq!(verdict.champion, 0);
        assert_eq!(verdict.max_fitness, 0.0);
    }
}
