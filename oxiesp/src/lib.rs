//! A coordination core for ESP-style evolution of modular
//! neural-network genomes.
//!
//! Instead of one monolithic genome per individual, a genome here is a
//! composition of named **modules**: independently extensible subgraphs,
//! each gated by a regulatory neuron, optionally nested inside
//! "regulation" container modules, and tagged into mutually-exclusive
//! pandemonium groups. Exactly one module is *active* (subject to
//! structural evolution) at a time; all other modules are frozen copies
//! of the champion's genetic material, replicated bit-identically across
//! the whole population.
//!
//! This crate covers only the coordination layer:
//!
//! - [`Population`]: the genome list, champion pointer, generation
//!   counter and active-module pointer, plus the cross-genome
//!   consistency invariants.
//! - [`ModuleMutator`]: the structural-edit protocol (add, clone,
//!   delete, reset, nest, and the narrower weight/target/gate edits),
//!   applied atomically and identically to every genome.
//! - [`RegulationHierarchy`]: the forest of container modules.
//! - [`EvolutionController`]: the generation state machine, driving
//!   automatic fitness evaluation or waiting on manual selection, and
//!   serializing structural edits against evaluation activity.
//! - [`ManualSelectionSession`]: human-in-the-loop generation
//!   advancement via reward/punish picks.
//! - [`PersistenceGateway`]: the durable-storage boundary, with a
//!   file-backed JSON implementation.
//!
//! Phenotype decoding, crossover/speciation and fitness simulation are
//! external collaborators: decoding is abstracted by the [`Decoder`]
//! trait, and fitness arrives through evaluation closures or manual
//! selection verdicts.
//!
//! [`Population`]: crate::populations::Population
//! [`ModuleMutator`]: crate::populations::ModuleMutator
//! [`RegulationHierarchy`]: crate::populations::RegulationHierarchy
//! [`EvolutionController`]: crate::controller::EvolutionController
//! [`ManualSelectionSession`]: crate::controller::ManualSelectionSession
//! [`PersistenceGateway`]: crate::persistence::PersistenceGateway
//! [`Decoder`]: crate::controller::Decoder
//!
//! # Example usage: automatic evolution with a stub decoder
//! ```no_run
//! use oxiesp::controller::{ControllerConfig, Decoder, EvolutionController};
//! use oxiesp::genomics::ModularGenome;
//! use oxiesp::persistence::FileGateway;
//!
//! struct WeightVector;
//!
//! impl Decoder for WeightVector {
//!     type Phenotype = Vec<f32>;
//!
//!     fn decode(&self, genome: &ModularGenome) -> Vec<f32> {
//!         genome.connections().map(|c| c.weight()).collect()
//!     }
//! }
//!
//! let gateway = FileGateway::new("./evolution-state");
//! let mut controller = EvolutionController::new(gateway, ControllerConfig::default());
//! controller.start().unwrap();
//!
//! for _ in 0..100 {
//!     let verdict = controller
//!         .evaluate_generation(&WeightVector, |weights: &Vec<f32>| {
//!             weights.iter().map(|w| 1.0 - (w - 0.5).abs()).sum::<f32>().max(0.0)
//!         })
//!         .unwrap();
//!     controller.on_generation_advanced(verdict).unwrap();
//! }
//! controller.request_stop().unwrap();
//! ```

pub mod controller;
pub mod genomics;
pub mod persistence;
pub mod populations;

/// Identifier type for neurons and connections,
/// compatible with innovation numbers assigned by
/// an external NEAT-family library.
pub type Innovation = usize;

/// Identifier type for genomes. Monotonically
/// increasing and never reused within a population.
pub type GenomeId = usize;

/// Identifier type for modules. `0` is the always-present
/// base module, which is never itself evolved as a module.
pub type ModuleId = usize;

/// The always-present base module. Bias, global Input and
/// global Output neurons belong to it.
pub const BASE_MODULE: ModuleId = 0;
