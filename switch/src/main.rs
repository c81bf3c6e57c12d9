//! A small demonstration run: automatic evolution of a toy
//! "switch" task with a stub weight-vector decoder, exercising
//! start, structural edits, generation advancement and
//! persistence.

use oxiesp::controller::{
    ControllerConfig, Decoder, EditRequest, EvolutionController, EvolutionEvent,
};
use oxiesp::genomics::{ModularGenome, ModuleKind, RegulatoryGate};
use oxiesp::persistence::FileGateway;

const GENERATIONS: usize = 50;
const TARGET_WEIGHT: f32 = 0.5;

/// The stub decoder: a phenotype is just the genome's
/// connection weights. A real deployment plugs a NEAT-family
/// network decoder in here.
struct WeightVector;

impl Decoder for WeightVector {
    type Phenotype = Vec<f32>;

    fn decode(&self, genome: &ModularGenome) -> Vec<f32> {
        genome.connections().map(|c| c.weight()).collect()
    }
}

fn evaluate_switch(weights: &Vec<f32>) -> f32 {
    weights
        .iter()
        .map(|w| (1.0 - (w - TARGET_WEIGHT).abs()).max(0.0))
        .sum()
}

fn main() {
    tracing_subscriber::fmt::init();

    let state_dir = tempfile::tempdir().expect("could not create a state directory");
    let gateway = FileGateway::new(state_dir.path());
    let mut controller = EvolutionController::new(gateway, ControllerConfig::default());
    let events = controller.subscribe();

    controller.start().expect("controller failed to start");
    let module = controller
        .request_edit(EditRequest::AddModule {
            kind: ModuleKind::Basic,
            local_inputs: vec![1, 2],
            local_outputs: vec![3],
            gate: RegulatoryGate::Basic {
                input: 1,
                active_when_input_active: true,
            },
        })
        .expect("initial module edit failed")
        .expect("edit was unexpectedly queued");
    println!("evolving module {}", module);

    for generation in 1..=GENERATIONS {
        let verdict = controller
            .evaluate_generation(&WeightVector, evaluate_switch)
            .expect("evaluation failed");
        controller
            .on_generation_advanced(verdict)
            .expect("generation advance failed");

        // Half-way in, discard the diverged material and restart
        // the module from the champion's copy.
        if generation == GENERATIONS / 2 {
            controller
                .request_edit(EditRequest::ResetActiveModule)
                .expect("reset failed");
        }
    }

    for event in events.try_iter() {
        if let EvolutionEvent::GenerationAdvanced {
            generation,
            max_fitness,
        } = event
        {
            println!("generation {:>3}: max fitness {:.3}", generation, max_fitness);
        }
    }

    let champion = controller
        .population()
        .and_then(|p| p.resolve_champion())
        .expect("no champion resolved");
    println!(
        "champion: {}",
        serde_json::to_string_pretty(champion).expect("champion serialization failed")
    );

    controller.request_stop().expect("stop failed");
}
