//! The durable-storage boundary: a gateway trait for the
//! population, champion, labels and hierarchy documents, plus
//! a file-backed JSON implementation.
//!
//! A missing document on first run is a checked outcome
//! (`Ok(None)`), not an error. A missing hierarchy document
//! when nesting is known to exist is the one exception, and is
//! surfaced by the controller as a consistency error on load.

use crate::genomics::ModularGenome;
use crate::populations::{GenerationRecord, Population, RegulationHierarchy};
use crate::ModuleId;

use serde::{Deserialize, Serialize};

use std::collections::BTreeMap;
use std::error::Error;
use std::fmt;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// An error type for failed persistence operations.
///
/// Save failures are fatal to the operation that requested
/// them (the edit or pause is not considered complete) and
/// must be retried by the caller.
#[derive(Debug)]
pub enum PersistenceError {
    /// The underlying store failed.
    Io(io::Error),
    /// A stored document could not be read back as the
    /// expected schema.
    Format(serde_json::Error),
    /// The hierarchy document is absent although the loaded
    /// population is known to use regulatory nesting.
    MissingHierarchy,
}

impl fmt::Display for PersistenceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "storage operation failed: {}", e),
            Self::Format(e) => write!(f, "stored document is malformed: {}", e),
            Self::MissingHierarchy => write!(
                f,
                "hierarchy document is missing although the population uses nesting"
            ),
        }
    }
}

impl Error for PersistenceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Format(e) => Some(e),
            Self::MissingHierarchy => None,
        }
    }
}

impl From<io::Error> for PersistenceError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<serde_json::Error> for PersistenceError {
    fn from(e: serde_json::Error) -> Self {
        Self::Format(e)
    }
}

/// The labels document: human-readable names for global
/// inputs, global outputs and modules.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Labels {
    /// Ordered `(index, text)` pairs for the global inputs.
    pub inputs: Vec<(usize, String)>,
    /// Ordered `(index, text)` pairs for the global outputs.
    pub outputs: Vec<(usize, String)>,
    /// Module id to label.
    pub modules: BTreeMap<ModuleId, String>,
}

/// The interface between the coordination core and durable
/// storage.
///
/// Every `load_*` operation distinguishes "never saved"
/// (`Ok(None)`) from actual failure. The champion document is
/// a bare single-genome list in the genome schema, without the
/// population document's wrapper fields.
pub trait PersistenceGateway {
    fn load_population(&self) -> Result<Option<Population>, PersistenceError>;
    fn save_population(&self, population: &Population) -> Result<(), PersistenceError>;

    fn load_champion(&self) -> Result<Option<ModularGenome>, PersistenceError>;
    fn save_champion(&self, champion: &ModularGenome) -> Result<(), PersistenceError>;

    fn load_labels(&self) -> Result<Option<Labels>, PersistenceError>;
    fn save_labels(&self, labels: &Labels) -> Result<(), PersistenceError>;

    fn load_hierarchy(&self) -> Result<Option<RegulationHierarchy>, PersistenceError>;
    fn save_hierarchy(&self, hierarchy: &RegulationHierarchy) -> Result<(), PersistenceError>;

    /// Appends one line to the append-only research log.
    fn append_research_record(&self, record: &GenerationRecord) -> Result<(), PersistenceError>;
}

/// A file-backed gateway: one JSON document per store under a
/// root directory, plus a line-oriented research log.
#[derive(Clone, Debug)]
pub struct FileGateway {
    root: PathBuf,
}

impl FileGateway {
    const POPULATION: &'static str = "population.json";
    const CHAMPION: &'static str = "champion.json";
    const LABELS: &'static str = "labels.json";
    const HIERARCHY: &'static str = "hierarchy.json";
    const RESEARCH_LOG: &'static str = "research.log";

    /// Creates a gateway rooted at the passed directory. The
    /// directory is created lazily on first save.
    pub fn new<P: Into<PathBuf>>(root: P) -> FileGateway {
        FileGateway { root: root.into() }
    }

    /// Returns the directory the documents live under.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn read_document<T>(&self, name: &str) -> Result<Option<T>, PersistenceError>
    where
        T: for<'de> Deserialize<'de>,
    {
        match fs::read_to_string(self.root.join(name)) {
            Ok(contents) => Ok(Some(serde_json::from_str(&contents)?)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn write_document<T: Serialize>(&self, name: &str, document: &T) -> Result<(), PersistenceError> {
        fs::create_dir_all(&self.root)?;
        fs::write(self.root.join(name), serde_json::to_string_pretty(document)?)?;
        Ok(())
    }
}

impl PersistenceGateway for FileGateway {
    fn load_population(&self) -> Result<Option<Population>, PersistenceError> {
        self.read_document(Self::POPULATION)
    }

    fn save_population(&self, population: &Population) -> Result<(), PersistenceError> {
        self.write_document(Self::POPULATION, population)
    }

    fn load_champion(&self) -> Result<Option<ModularGenome>, PersistenceError> {
        let genomes: Option<Vec<ModularGenome>> = self.read_document(Self::CHAMPION)?;
        Ok(genomes.and_then(|mut genomes| {
            if genomes.is_empty() {
                None
            } else {
                Some(genomes.remove(0))
            }
        }))
    }

    fn save_champion(&self, champion: &ModularGenome) -> Result<(), PersistenceError> {
        // A bare single-genome list, not a full population
        // document.
        self.write_document(Self::CHAMPION, &[champion])
    }

    fn load_labels(&self) -> Result<Option<Labels>, PersistenceError> {
        self.read_document(Self::LABELS)
    }

    fn save_labels(&self, labels: &Labels) -> Result<(), PersistenceError> {
        self.write_document(Self::LABELS, labels)
    }

    fn load_hierarchy(&self) -> Result<Option<RegulationHierarchy>, PersistenceError> {
        self.read_document(Self::HIERARCHY)
    }

    fn save_hierarchy(&self, hierarchy: &RegulationHierarchy) -> Result<(), PersistenceError> {
        self.write_document(Self::HIERARCHY, hierarchy)
    }

    fn append_research_record(&self, record: &GenerationRecord) -> Result<(), PersistenceError> {
        fs::create_dir_all(&self.root)?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.root.join(Self::RESEARCH_LOG))?;
        writeln!(file, "{}", record)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::num::NonZeroUsize;

    #[test]
    fn missing_documents_load_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let gateway = FileGateway::new(dir.path().join("state"));
        assert!(gateway.load_population().unwrap().is_none());
        assert!(gateway.load_champion().unwrap().is_none());
        assert!(gateway.load_labels().unwrap().is_none());
        assert!(gateway.load_hierarchy().unwrap().is_none());
    }

    #[test]
    fn population_round_trips_structurally() {
        let dir = tempfile::tempdir().unwrap();
        let gateway = FileGateway::new(dir.path());
        let population = Population::new(NonZeroUsize::new(4).unwrap(), 3, 2);

        gateway.save_population(&population).unwrap();
        let reloaded = gateway.load_population().unwrap().unwrap();
        assert_eq!(reloaded, population);
    }

    #[test]
    fn champion_document_is_a_single_genome_list() {
        let dir = tempfile::tempdir().unwrap();
        let gateway = FileGateway::new(dir.path());
        let population = Population::new(NonZeroUsize::new(2).unwrap(), 1, 1);
        let champion = population.resolve_champion().unwrap().clone();

        gateway.save_champion(&champion).unwrap();

        let contents = fs::read_to_string(dir.path().join("champion.json")).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&contents).unwrap();
        assert_eq!(parsed.as_array().map(Vec::len), Some(1));
        assert_eq!(gateway.load_champion().unwrap().unwrap(), champion);
    }

    #[test]
    fn hierarchy_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let gateway = FileGateway::new(dir.path());
        let mut hierarchy = RegulationHierarchy::new();
        hierarchy.add_container(2);
        hierarchy.nest_child(2, 5).unwrap();
        hierarchy.nest_child(2, 6).unwrap();

        gateway.save_hierarchy(&hierarchy).unwrap();
        assert_eq!(gateway.load_hierarchy().unwrap().unwrap(), hierarchy);
    }

    #[test]
    fn labels_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let gateway = FileGateway::new(dir.path());
        let mut labels = Labels::default();
        labels.inputs.push((0, "left sensor".to_string()));
        labels.outputs.push((0, "motor".to_string()));
        labels.modules.insert(1, "gait".to_string());

        gateway.save_labels(&labels).unwrap();
        assert_eq!(gateway.load_labels().unwrap().unwrap(), labels);
    }

    #[test]
    fn research_log_appends_tab_separated_lines() {
        let dir = tempfile::tempdir().unwrap();
        let gateway = FileGateway::new(dir.path());
        gateway
            .append_research_record(&GenerationRecord {
                generation: 1,
                max_fitness: 0.5,
            })
            .unwrap();
        gateway
            .append_research_record(&GenerationRecord {
                generation: 2,
                max_fitness: 1.25,
            })
            .unwrap();

        let contents = fs::read_to_string(dir.path().join("research.log")).unwrap();
        assert_eq!(contents, "1\t0.5\n2\t1.25\n");
    }
}
