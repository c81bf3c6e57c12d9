//! The generation state machine: owns the population, drives
//! automatic evaluation rounds or waits on manual selection,
//! and serializes structural edits against evaluation
//! activity.
//!
//! A generation is "in flight" between the moment fitness
//! evaluation begins (or a manual session is handed out) and
//! the moment its verdict is fed back through
//! [`EvolutionController::on_generation_advanced`]. Edit
//! requests issued in flight are queued, never dropped or
//! interleaved; mode switches in flight are rejected outright.
mod errors;
mod manual;

pub use errors::ControllerError;
pub use manual::{Judgment, ManualSelectionSession};

use crate::genomics::{ModularGenome, ModuleKind, RegulatoryGate, NESTING_PANDEMONIUM_OFFSET};
use crate::persistence::{PersistenceError, PersistenceGateway};
use crate::populations::{
    GenerationRecord, ModuleMutator, Population, RegulationHierarchy,
};
use crate::{GenomeId, Innovation, ModuleId};

use tracing::{info, warn};

use std::collections::VecDeque;
use std::num::NonZeroUsize;
use std::sync::mpsc;

/// The controller's run state. Mode is tracked orthogonally,
/// see [`Mode`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Running,
    Paused,
}

/// The generation-advancement mode: computed fitness or
/// human-in-the-loop selection.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    Automatic,
    Manual,
}

/// Typed notifications pushed to subscribed observers.
/// Subscriptions are scoped to the controller's lifetime;
/// dropped receivers are pruned on the next notification.
#[derive(Clone, Debug)]
pub enum EvolutionEvent {
    /// A generation completed.
    GenerationAdvanced { generation: usize, max_fitness: f32 },
    /// The champion pointer moved; carries a snapshot of the
    /// newly resolved champion.
    ChampionChanged(ModularGenome),
    /// The module list changed shape. External layout or
    /// placement logic re-probes from here.
    ModuleListChanged { active: ModuleId },
}

/// The generation-advance contract both drivers produce:
/// per-genome fitness, the new champion and the generation's
/// maximum fitness.
#[derive(Clone, Debug, PartialEq)]
pub struct GenerationVerdict {
    pub fitnesses: Vec<(GenomeId, f32)>,
    pub champion: GenomeId,
    pub max_fitness: f32,
}

/// The external NEAT-family decoder boundary: turns a genome
/// into whatever phenotype the simulation driver executes.
pub trait Decoder {
    type Phenotype;

    fn decode(&self, genome: &ModularGenome) -> Self::Phenotype;
}

/// A structural edit request, queued while a generation is in
/// flight and applied at the next quiescent point.
#[derive(Clone, Debug)]
pub enum EditRequest {
    AddModule {
        kind: ModuleKind,
        local_inputs: Vec<Innovation>,
        local_outputs: Vec<Innovation>,
        gate: RegulatoryGate,
    },
    CloneModule {
        source: ModuleId,
    },
    DeleteModule {
        module: ModuleId,
    },
    ResetActiveModule,
    NestModule {
        parent: ModuleId,
        child: ModuleId,
        weight: f32,
    },
    ChangeWeights {
        updates: Vec<(Innovation, f32)>,
    },
    ChangeTargets {
        rewires: Vec<(Innovation, Innovation)>,
    },
    UpdateRegulatoryGate {
        gate: RegulatoryGate,
    },
    UpdatePandemonium {
        module: ModuleId,
        group: usize,
    },
}

/// Configuration for a fresh population and the manual
/// selection reward.
#[derive(Clone, Copy, Debug)]
pub struct ControllerConfig {
    /// Number of genomes in a freshly created population.
    pub population_size: NonZeroUsize,
    /// Number of global input neurons.
    pub input_count: usize,
    /// Number of global output neurons.
    pub output_count: usize,
    /// Fitness assigned to rewarded genomes in manual mode.
    pub manual_reward: f32,
}

impl Default for ControllerConfig {
    fn default() -> ControllerConfig {
        ControllerConfig {
            population_size: NonZeroUsize::new(50).unwrap(),
            input_count: 2,
            output_count: 1,
            manual_reward: 1.0,
        }
    }
}

/// The coordination core's single owner of population state.
///
/// External collaborators receive read-only snapshots and
/// route every mutation through [`request_edit`]; fitness
/// arrives either through [`evaluate_generation`] closures or
/// a [`ManualSelectionSession`] verdict.
///
/// [`request_edit`]: EvolutionController::request_edit
/// [`evaluate_generation`]: EvolutionController::evaluate_generation
pub struct EvolutionController<S: PersistenceGateway> {
    gateway: S,
    config: ControllerConfig,
    state: RunState,
    mode: Mode,
    population: Option<Population>,
    hierarchy: RegulationHierarchy,
    evaluating: bool,
    stop_requested: bool,
    pending_edits: VecDeque<EditRequest>,
    observers: Vec<mpsc::Sender<EvolutionEvent>>,
}

impl<S: PersistenceGateway> EvolutionController<S> {
    /// Creates an idle controller. No storage is touched until
    /// [`start`].
    ///
    /// [`start`]: EvolutionController::start
    pub fn new(gateway: S, config: ControllerConfig) -> EvolutionController<S> {
        EvolutionController {
            gateway,
            config,
            state: RunState::Idle,
            mode: Mode::Automatic,
            population: None,
            hierarchy: RegulationHierarchy::new(),
            evaluating: false,
            stop_requested: false,
            pending_edits: VecDeque::new(),
            observers: Vec::new(),
        }
    }

    /// Loads the saved population and hierarchy, or creates a
    /// fresh population when nothing was saved yet, and
    /// transitions Idle to Running.
    ///
    /// # Errors
    /// Rejected if the controller already left the idle state,
    /// if storage fails, if the loaded population violates the
    /// cross-genome consistency invariants, or if the
    /// hierarchy document is missing although the loaded
    /// population demonstrably uses regulatory nesting.
    pub fn start(&mut self) -> Result<(), ControllerError> {
        if self.state != RunState::Idle {
            return Err(ControllerError::NotIdle);
        }

        let population = match self.gateway.load_population()? {
            Some(population) => {
                // Stored documents are external input: a corrupt
                // one is reported here, not treated as an
                // implementation bug deeper in the edit path.
                population.validate()?;
                population
            }
            None => {
                info!("no saved population found, creating a fresh one");
                Population::new(
                    self.config.population_size,
                    self.config.input_count,
                    self.config.output_count,
                )
            }
        };
        let hierarchy = match self.gateway.load_hierarchy()? {
            Some(hierarchy) => hierarchy,
            None if uses_nesting(&population) => {
                return Err(ControllerError::Persistence(
                    PersistenceError::MissingHierarchy,
                ));
            }
            None => RegulationHierarchy::new(),
        };

        self.population = Some(population);
        self.hierarchy = hierarchy;
        self.state = RunState::Running;
        Ok(())
    }

    /// Returns the current run state.
    pub fn state(&self) -> RunState {
        self.state
    }

    /// Returns the current generation-advancement mode.
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Returns a read-only view of the population, if started.
    pub fn population(&self) -> Option<&Population> {
        self.population.as_ref()
    }

    /// Returns a read-only view of the regulation hierarchy.
    pub fn hierarchy(&self) -> &RegulationHierarchy {
        &self.hierarchy
    }

    /// Subscribes an observer to evolution events.
    pub fn subscribe(&mut self) -> mpsc::Receiver<EvolutionEvent> {
        let (sender, receiver) = mpsc::channel();
        self.observers.push(sender);
        receiver
    }

    /// Requests a transition to Paused. If a generation is in
    /// flight the request takes effect at the next quiescent
    /// point; otherwise the population and hierarchy are
    /// persisted and the pause completes immediately. A pause
    /// is not acknowledged as complete until the save succeeds.
    ///
    /// # Errors
    /// Rejected if the controller is not running, or if the
    /// save fails (the controller then stays Running).
    pub fn request_stop(&mut self) -> Result<(), ControllerError> {
        if self.state != RunState::Running {
            return Err(ControllerError::NotRunning);
        }
        if self.evaluating {
            self.stop_requested = true;
            return Ok(());
        }
        self.persist_state()?;
        self.state = RunState::Paused;
        Ok(())
    }

    /// Transitions Paused back to Running.
    ///
    /// # Errors
    /// Rejected if the controller is not paused.
    pub fn resume(&mut self) -> Result<(), ControllerError> {
        if self.state != RunState::Paused {
            return Err(ControllerError::NotPaused);
        }
        self.state = RunState::Running;
        Ok(())
    }

    /// Switches between automatic and manual generation
    /// advancement.
    ///
    /// # Errors
    /// Rejected while a generation is in flight; mode switches
    /// are only accepted while paused or between generations.
    pub fn request_mode_switch(&mut self, mode: Mode) -> Result<(), ControllerError> {
        if self.evaluating {
            return Err(ControllerError::ModeSwitchMidEvaluation);
        }
        self.mode = mode;
        Ok(())
    }

    /// Evaluates one automatic generation: decodes every
    /// genome, fans the fitness evaluation out one task per
    /// genome, joins all results, and returns the verdict to
    /// feed back through [`on_generation_advanced`]. The
    /// generation counts as in flight until that feedback.
    ///
    /// # Errors
    /// Rejected if the controller is not running, is in manual
    /// mode, or already has a generation in flight.
    ///
    /// [`on_generation_advanced`]: EvolutionController::on_generation_advanced
    pub fn evaluate_generation<D, F>(
        &mut self,
        decoder: &D,
        fitness: F,
    ) -> Result<GenerationVerdict, ControllerError>
    where
        D: Decoder + Sync,
        F: Fn(&D::Phenotype) -> f32 + Sync,
    {
        if self.state != RunState::Running {
            return Err(ControllerError::NotRunning);
        }
        if self.mode != Mode::Automatic {
            return Err(ControllerError::AutomaticModeRequired);
        }
        if self.evaluating {
            return Err(ControllerError::EvaluationInFlight);
        }

        let population = self.population.as_mut().ok_or(ControllerError::NotRunning)?;
        population.evaluate_fitness(|genome| fitness(&decoder.decode(genome)));

        let fitnesses: Vec<(GenomeId, f32)> = population
            .genomes()
            .map(|g| (g.id(), g.fitness()))
            .collect();
        let (champion, max_fitness) = fitnesses
            .iter()
            .fold(None, |best: Option<(GenomeId, f32)>, (id, fitness)| {
                match best {
                    Some((_, top)) if top >= *fitness => best,
                    _ => Some((*id, *fitness)),
                }
            })
            .unwrap_or((population.champion_id(), 0.0));

        self.evaluating = true;
        Ok(GenerationVerdict {
            fitnesses,
            champion,
            max_fitness,
        })
    }

    /// Opens a manual selection session over the current
    /// population. The generation counts as in flight until
    /// the session's verdict is fed back through
    /// [`on_generation_advanced`].
    ///
    /// # Errors
    /// Rejected if the controller is not running, is in
    /// automatic mode, or already has a generation in flight.
    ///
    /// [`on_generation_advanced`]: EvolutionController::on_generation_advanced
    pub fn manual_session(&mut self) -> Result<ManualSelectionSession, ControllerError> {
        if self.state != RunState::Running {
            return Err(ControllerError::NotRunning);
        }
        if self.mode != Mode::Manual {
            return Err(ControllerError::ManualModeRequired);
        }
        if self.evaluating {
            return Err(ControllerError::EvaluationInFlight);
        }
        let population = self.population.as_ref().ok_or(ControllerError::NotRunning)?;
        let session = ManualSelectionSession::over(population, self.config.manual_reward);
        self.evaluating = true;
        Ok(session)
    }

    /// Completes the in-flight generation: assigns the
    /// verdict's fitness values, advances the generation
    /// counter, re-points and re-resolves the champion,
    /// persists everything, notifies observers and applies any
    /// queued edits. A stop requested mid-flight takes effect
    /// here.
    ///
    /// # Errors
    /// Rejected if the controller is not running or no
    /// generation is in flight (a verdict completes exactly
    /// one generation; resubmission is rejected). If
    /// persistence fails, the in-memory advancement is rolled
    /// back and the verdict must be resubmitted.
    pub fn on_generation_advanced(
        &mut self,
        verdict: GenerationVerdict,
    ) -> Result<(), ControllerError> {
        if self.state != RunState::Running {
            return Err(ControllerError::NotRunning);
        }
        if !self.evaluating {
            return Err(ControllerError::NoGenerationInFlight);
        }
        let population = self.population.as_mut().ok_or(ControllerError::NotRunning)?;
        let snapshot = population.clone();
        let previous_champion = population.champion_id();

        population.assign_fitness(&verdict.fitnesses);
        population.advance_generation();
        population.set_champion(verdict.champion);
        let champion = population.resolve_champion().cloned();
        let generation = population.generation();

        if let Err(e) = self.persist_generation(generation, verdict.max_fitness, champion.as_ref())
        {
            *self.population.as_mut().unwrap() = snapshot;
            return Err(e);
        }

        self.evaluating = false;
        if verdict.champion != previous_champion {
            if let Some(champion) = champion {
                self.notify(EvolutionEvent::ChampionChanged(champion));
            }
        }
        self.notify(EvolutionEvent::GenerationAdvanced {
            generation,
            max_fitness: verdict.max_fitness,
        });

        self.drain_pending_edits();

        if self.stop_requested {
            self.stop_requested = false;
            self.persist_state()?;
            self.state = RunState::Paused;
        }
        Ok(())
    }

    /// Applies a structural edit, or queues it if a generation
    /// is in flight. Queued edits are applied in order at the
    /// next quiescent point, never dropped.
    ///
    /// Returns the id of the module an `AddModule` or
    /// `CloneModule` created, or `None` for the other edit
    /// kinds and for queued requests.
    ///
    /// # Errors
    /// Illegal edits are rejected synchronously with the
    /// population unchanged. If persisting the edited
    /// population fails, the edit is rolled back and must be
    /// retried.
    pub fn request_edit(
        &mut self,
        request: EditRequest,
    ) -> Result<Option<ModuleId>, ControllerError> {
        if self.state == RunState::Idle {
            return Err(ControllerError::NotRunning);
        }
        if self.evaluating {
            self.pending_edits.push_back(request);
            return Ok(None);
        }
        self.apply_edit(request)
    }

    fn apply_edit(&mut self, request: EditRequest) -> Result<Option<ModuleId>, ControllerError> {
        let population = self.population.as_mut().ok_or(ControllerError::NotRunning)?;
        let population_snapshot = population.clone();
        let hierarchy_snapshot = self.hierarchy.clone();

        let mut mutator = ModuleMutator::new(population, &mut self.hierarchy);
        let (created, reshaped) = match request {
            EditRequest::AddModule {
                kind,
                local_inputs,
                local_outputs,
                gate,
            } => (
                Some(mutator.add_module(kind, &local_inputs, &local_outputs, gate)?),
                true,
            ),
            EditRequest::CloneModule { source } => (Some(mutator.clone_module(source)?), true),
            EditRequest::DeleteModule { module } => {
                mutator.delete_module(module)?;
                (None, true)
            }
            EditRequest::ResetActiveModule => {
                mutator.reset_active_module()?;
                (None, true)
            }
            EditRequest::NestModule {
                parent,
                child,
                weight,
            } => {
                mutator.nest_module(parent, child, weight)?;
                (None, true)
            }
            EditRequest::ChangeWeights { updates } => {
                mutator.change_weights(&updates)?;
                (None, false)
            }
            EditRequest::ChangeTargets { rewires } => {
                mutator.change_targets(&rewires)?;
                (None, false)
            }
            EditRequest::UpdateRegulatoryGate { gate } => {
                mutator.update_regulatory_gate(gate)?;
                (None, false)
            }
            EditRequest::UpdatePandemonium { module, group } => {
                mutator.update_pandemonium(module, group)?;
                (None, false)
            }
        };

        if let Err(e) = self.persist_state() {
            *self.population.as_mut().unwrap() = population_snapshot;
            self.hierarchy = hierarchy_snapshot;
            return Err(e);
        }

        if reshaped {
            let active = self
                .population
                .as_ref()
                .map(Population::active_module)
                .unwrap_or_default();
            self.notify(EvolutionEvent::ModuleListChanged { active });
        }
        Ok(created)
    }

    fn drain_pending_edits(&mut self) {
        while let Some(request) = self.pending_edits.pop_front() {
            // A queued edit may have become illegal by the time
            // the quiescent point is reached. It is reported and
            // skipped rather than blocking the queue.
            if let Err(e) = self.apply_edit(request) {
                warn!(error = %e, "queued structural edit could not be applied");
            }
        }
    }

    fn persist_state(&self) -> Result<(), ControllerError> {
        let population = self.population.as_ref().ok_or(ControllerError::NotRunning)?;
        self.gateway.save_population(population)?;
        self.gateway.save_hierarchy(&self.hierarchy)?;
        Ok(())
    }

    fn persist_generation(
        &self,
        generation: usize,
        max_fitness: f32,
        champion: Option<&ModularGenome>,
    ) -> Result<(), ControllerError> {
        self.persist_state()?;
        if let Some(champion) = champion {
            self.gateway.save_champion(champion)?;
        }
        self.gateway.append_research_record(&GenerationRecord {
            generation,
            max_fitness,
        })?;
        Ok(())
    }

    fn notify(&mut self, event: EvolutionEvent) {
        self.observers
            .retain(|observer| observer.send(event.clone()).is_ok());
    }
}

/// Whether the population's genomes demonstrably carry
/// regulatory nesting: any regulatory neuron tagged into a
/// nesting pandemonium group was placed there by a nest edit,
/// so a hierarchy document must exist for it.
fn uses_nesting(population: &Population) -> bool {
    population.generation() > 1
        && population.genomes().any(|genome| {
            genome.neurons().any(|neuron| {
                neuron.gate().is_some() && neuron.pandemonium() >= NESTING_PANDEMONIUM_OFFSET
            })
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::populations::PopulationConsistencyError;

    use std::fs;

    fn basic_gate() -> RegulatoryGate {
        RegulatoryGate::Basic {
            input: 1,
            active_when_input_active: true,
        }
    }

    fn add_module_request() -> EditRequest {
        EditRequest::AddModule {
            kind: ModuleKind::Basic,
            local_inputs: vec![1, 2],
            local_outputs: vec![3],
            gate: basic_gate(),
        }
    }

    struct ConnectionCount;

    impl Decoder for ConnectionCount {
        type Phenotype = usize;

        fn decode(&self, genome: &ModularGenome) -> usize {
            genome.connections().count()
        }
    }

    fn started_controller(root: &std::path::Path) -> EvolutionController<crate::persistence::FileGateway> {
        let gateway = crate::persistence::FileGateway::new(root);
        let mut controller = EvolutionController::new(gateway, ControllerConfig::default());
        controller.start().unwrap();
        controller
    }

    #[test]
    fn start_creates_a_fresh_population_when_storage_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let controller = started_controller(dir.path());
        assert_eq!(controller.state(), RunState::Running);
        let population = controller.population().unwrap();
        assert_eq!(population.genomes().count(), 50);
        assert_eq!(population.generation(), 0);
    }

    #[test]
    fn corrupt_population_document_is_reported_on_start() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("population.json"),
            r#"{"genomes":[],"champion":0,"generation":0,"active_module":0,"next_genome_id":0}"#,
        )
        .unwrap();

        let gateway = crate::persistence::FileGateway::new(dir.path());
        let mut controller = EvolutionController::new(gateway, ControllerConfig::default());
        assert!(matches!(
            controller.start(),
            Err(ControllerError::Consistency(
                PopulationConsistencyError::EmptyPopulation
            ))
        ));
        assert_eq!(controller.state(), RunState::Idle);
    }

    #[test]
    fn resubmitted_verdicts_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut controller = started_controller(dir.path());
        let verdict = controller
            .evaluate_generation(&ConnectionCount, |c| *c as f32)
            .unwrap();
        controller.on_generation_advanced(verdict.clone()).unwrap();

        assert!(matches!(
            controller.on_generation_advanced(verdict),
            Err(ControllerError::NoGenerationInFlight)
        ));
        // The counter advanced exactly once, and the research
        // log holds a single line.
        assert_eq!(controller.population().unwrap().generation(), 1);
        let log = fs::read_to_string(dir.path().join("research.log")).unwrap();
        assert_eq!(log.lines().count(), 1);
    }

    #[test]
    fn start_is_rejected_once_running() {
        let dir = tempfile::tempdir().unwrap();
        let mut controller = started_controller(dir.path());
        assert!(matches!(controller.start(), Err(ControllerError::NotIdle)));
    }

    #[test]
    fn automatic_generation_advances_and_persists() {
        let dir = tempfile::tempdir().unwrap();
        let mut controller = started_controller(dir.path());
        controller.request_edit(add_module_request()).unwrap();

        let verdict = controller
            .evaluate_generation(&ConnectionCount, |connections| *connections as f32)
            .unwrap();
        assert!(verdict.max_fitness > 0.0);
        controller.on_generation_advanced(verdict).unwrap();

        let population = controller.population().unwrap();
        assert_eq!(population.generation(), 1);
        assert!(population.resolve_champion().is_some());

        let log = fs::read_to_string(dir.path().join("research.log")).unwrap();
        assert!(log.starts_with("1\t"));
        assert!(dir.path().join("champion.json").exists());
    }

    #[test]
    fn edits_queue_while_a_generation_is_in_flight() {
        let dir = tempfile::tempdir().unwrap();
        let mut controller = started_controller(dir.path());

        let verdict = controller
            .evaluate_generation(&ConnectionCount, |c| *c as f32)
            .unwrap();
        // In flight: the edit is queued, not applied.
        assert_eq!(controller.request_edit(add_module_request()).unwrap(), None);
        assert_eq!(controller.population().unwrap().max_module_id(), 0);

        controller.on_generation_advanced(verdict).unwrap();
        assert_eq!(controller.population().unwrap().max_module_id(), 1);
        assert_eq!(controller.population().unwrap().active_module(), 1);
    }

    #[test]
    fn mode_switch_is_rejected_mid_evaluation() {
        let dir = tempfile::tempdir().unwrap();
        let mut controller = started_controller(dir.path());
        let verdict = controller
            .evaluate_generation(&ConnectionCount, |c| *c as f32)
            .unwrap();
        assert!(matches!(
            controller.request_mode_switch(Mode::Manual),
            Err(ControllerError::ModeSwitchMidEvaluation)
        ));
        controller.on_generation_advanced(verdict).unwrap();
        controller.request_mode_switch(Mode::Manual).unwrap();
        assert_eq!(controller.mode(), Mode::Manual);
    }

    #[test]
    fn stop_requested_in_flight_takes_effect_at_the_quiescent_point() {
        let dir = tempfile::tempdir().unwrap();
        let mut controller = started_controller(dir.path());
        let verdict = controller
            .evaluate_generation(&ConnectionCount, |c| *c as f32)
            .unwrap();

        controller.request_stop().unwrap();
        assert_eq!(controller.state(), RunState::Running);

        controller.on_generation_advanced(verdict).unwrap();
        assert_eq!(controller.state(), RunState::Paused);

        controller.resume().unwrap();
        assert_eq!(controller.state(), RunState::Running);
    }

    #[test]
    fn stop_persists_before_pausing() {
        let dir = tempfile::tempdir().unwrap();
        let mut controller = started_controller(dir.path());
        controller.request_stop().unwrap();
        assert_eq!(controller.state(), RunState::Paused);
        assert!(dir.path().join("population.json").exists());
        assert!(dir.path().join("hierarchy.json").exists());
    }

    #[test]
    fn manual_session_verdict_advances_the_generation() {
        let dir = tempfile::tempdir().unwrap();
        let mut controller = started_controller(dir.path());
        controller.request_mode_switch(Mode::Manual).unwrap();

        let mut session = controller.manual_session().unwrap();
        session.select(3);
        let verdict = session.end_generation();
        controller.on_generation_advanced(verdict).unwrap();

        let population = controller.population().unwrap();
        assert_eq!(population.generation(), 1);
        assert_eq!(population.champion_id(), 3);
        assert_eq!(population.genome(3).unwrap().fitness(), 1.0);
    }

    #[test]
    fn manual_session_requires_manual_mode() {
        let dir = tempfile::tempdir().unwrap();
        let mut controller = started_controller(dir.path());
        assert!(matches!(
            controller.manual_session(),
            Err(ControllerError::ManualModeRequired)
        ));
    }

    #[test]
    fn illegal_edits_are_rejected_with_state_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let mut controller = started_controller(dir.path());
        controller.request_edit(add_module_request()).unwrap();
        let before = controller.population().unwrap().clone();

        let result = controller.request_edit(EditRequest::DeleteModule { module: 1 });
        assert!(matches!(result, Err(ControllerError::Edit(_))));
        assert_eq!(controller.population().unwrap(), &before);
    }

    #[test]
    fn observers_receive_generation_and_module_events() {
        let dir = tempfile::tempdir().unwrap();
        let mut controller = started_controller(dir.path());
        let events = controller.subscribe();

        controller.request_edit(add_module_request()).unwrap();
        let verdict = controller
            .evaluate_generation(&ConnectionCount, |c| *c as f32)
            .unwrap();
        controller.on_generation_advanced(verdict).unwrap();

        assert!(matches!(
            events.try_recv(),
            Ok(EvolutionEvent::ModuleListChanged { active: 1 })
        ));
        assert!(matches!(
            events.try_recv(),
            Ok(EvolutionEvent::GenerationAdvanced { generation: 1, .. })
        ));
    }

    #[test]
    fn restart_resumes_from_persisted_state() {
        let dir = tempfile::tempdir().unwrap();
        {
            let mut controller = started_controller(dir.path());
            controller.request_edit(add_module_request()).unwrap();
            let verdict = controller
                .evaluate_generation(&ConnectionCount, |c| *c as f32)
                .unwrap();
            controller.on_generation_advanced(verdict).unwrap();
            controller.request_stop().unwrap();
        }

        let controller = started_controller(dir.path());
        let population = controller.population().unwrap();
        assert_eq!(population.generation(), 1);
        assert_eq!(population.active_module(), 1);
        assert_eq!(population.genomes().count(), 50);
    }

    #[test]
    fn missing_hierarchy_with_known_nesting_is_a_consistency_error() {
        let dir = tempfile::tempdir().unwrap();
        {
            let mut controller = started_controller(dir.path());
            let child = controller.request_edit(add_module_request()).unwrap().unwrap();
            for _ in 0..2 {
                let verdict = controller
                    .evaluate_generation(&ConnectionCount, |c| *c as f32)
                    .unwrap();
                controller.on_generation_advanced(verdict).unwrap();
            }
            let parent = controller
                .request_edit(EditRequest::AddModule {
                    kind: ModuleKind::Regulation,
                    local_inputs: vec![1],
                    local_outputs: vec![3],
                    gate: basic_gate(),
                })
                .unwrap()
                .unwrap();
            controller
                .request_edit(EditRequest::NestModule {
                    parent,
                    child,
                    weight: 0.5,
                })
                .unwrap();
            controller.request_stop().unwrap();
        }
        fs::remove_file(dir.path().join("hierarchy.json")).unwrap();

        let gateway = crate::persistence::FileGateway::new(dir.path());
        let mut controller = EvolutionController::new(gateway, ControllerConfig::default());
        assert!(matches!(
            controller.start(),
            Err(ControllerError::Persistence(
                PersistenceError::MissingHierarchy
            ))
        ));
    }
}
