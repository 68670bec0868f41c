//! Lazy, load-once cache of named model artifacts.
//!
//! Every registered artifact lives in a slot that moves through
//! `NotLoaded → Loading → {Loaded, Failed}`. The first caller loads the file
//! outside the slot lock; callers racing it block on the slot's condition
//! variable until the outcome is settled. Both `Loaded` and `Failed` are
//! terminal, so a broken artifact costs one disk read and one warning for the
//! lifetime of the process. [`ArtifactStore::reset`] exists for tests.

use std::collections::BTreeMap;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::classifier::DecisionTree;
use super::error::ArtifactError;
use super::rules::RuleTable;
use super::{Classifier, RuleSource};

/// What an artifact file contains, and therefore how it is parsed.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    Classifier,
    RuleTable,
}

impl ArtifactKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Classifier => "classifier",
            Self::RuleTable => "rule_table",
        }
    }
}

/// Registration of one artifact: its key, file name and kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactSpec {
    pub name: String,
    pub file: String,
    pub kind: ArtifactKind,
}

impl ArtifactSpec {
    pub fn new(name: impl Into<String>, file: impl Into<String>, kind: ArtifactKind) -> Self {
        Self {
            name: name.into(),
            file: file.into(),
            kind,
        }
    }
}

/// A loaded artifact, adapted to its capability trait.
#[derive(Clone)]
pub enum LoadedArtifact {
    Classifier(Arc<dyn Classifier>),
    RuleTable(Arc<dyn RuleSource>),
}

impl LoadedArtifact {
    pub fn kind(&self) -> ArtifactKind {
        match self {
            Self::Classifier(_) => ArtifactKind::Classifier,
            Self::RuleTable(_) => ArtifactKind::RuleTable,
        }
    }
}

impl fmt::Debug for LoadedArtifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Classifier(_) => f.write_str("LoadedArtifact::Classifier(..)"),
            Self::RuleTable(rules) => {
                write!(f, "LoadedArtifact::RuleTable({} rules)", rules.rule_count())
            }
        }
    }
}

/// Reads and deserializes one artifact. Swappable so tests can count or fake loads.
pub trait ArtifactLoader: Send + Sync {
    fn load(&self, spec: &ArtifactSpec, path: &Path) -> Result<LoadedArtifact, ArtifactError>;
}

/// Loads the JSON artifacts exported by the offline trainer.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileLoader;

impl ArtifactLoader for FileLoader {
    fn load(&self, spec: &ArtifactSpec, path: &Path) -> Result<LoadedArtifact, ArtifactError> {
        let bytes = std::fs::read(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => ArtifactError::Missing {
                path: path.to_path_buf(),
            },
            _ => ArtifactError::corrupt(path, e),
        })?;

        let loaded = match spec.kind {
            ArtifactKind::Classifier => DecisionTree::from_json(&bytes)
                .map(|tree| LoadedArtifact::Classifier(Arc::new(tree))),
            ArtifactKind::RuleTable => RuleTable::from_json(&bytes)
                .map(|table| LoadedArtifact::RuleTable(Arc::new(table))),
        };

        loaded.map_err(|reason| ArtifactError::corrupt(path, reason))
    }
}

/// Externally visible load state of a slot.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LoadState {
    NotLoaded,
    Loading,
    Loaded,
    Failed,
}

/// Snapshot of one artifact slot, for status endpoints and the CLI.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ArtifactDescriptor {
    pub name: String,
    pub kind: ArtifactKind,
    pub path: PathBuf,
    pub state: LoadState,
    /// Set only when `state` is `Failed`.
    pub failure: Option<String>,
    /// Set only when `state` is `Loaded`.
    pub loaded_at: Option<DateTime<Utc>>,
}

enum SlotState {
    NotLoaded,
    Loading,
    Loaded {
        artifact: LoadedArtifact,
        at: DateTime<Utc>,
    },
    Failed(ArtifactError),
}

struct Slot {
    spec: ArtifactSpec,
    path: PathBuf,
    state: Mutex<SlotState>,
    settled: Condvar,
}

impl Slot {
    fn lock(&self) -> MutexGuard<'_, SlotState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn wait<'a>(&self, guard: MutexGuard<'a, SlotState>) -> MutexGuard<'a, SlotState> {
        self.settled.wait(guard).unwrap_or_else(PoisonError::into_inner)
    }

    fn describe(&self) -> ArtifactDescriptor {
        let state = self.lock();
        let (load_state, failure, loaded_at) = match &*state {
            SlotState::NotLoaded => (LoadState::NotLoaded, None, None),
            SlotState::Loading => (LoadState::Loading, None, None),
            SlotState::Loaded { at, .. } => (LoadState::Loaded, None, Some(*at)),
            SlotState::Failed(err) => (LoadState::Failed, Some(err.to_string()), None),
        };

        ArtifactDescriptor {
            name: self.spec.name.clone(),
            kind: self.spec.kind,
            path: self.path.clone(),
            state: load_state,
            failure,
            loaded_at,
        }
    }
}

pub struct ArtifactStore {
    dir: PathBuf,
    slots: BTreeMap<String, Slot>,
    loader: Arc<dyn ArtifactLoader>,
}

impl ArtifactStore {
    /// Register `specs` under `dir`. Nothing is read until first access, so a
    /// missing directory is not an error here.
    pub fn new(dir: impl Into<PathBuf>, specs: impl IntoIterator<Item = ArtifactSpec>) -> Self {
        Self::with_loader(dir, specs, Arc::new(FileLoader))
    }

    pub fn with_loader(
        dir: impl Into<PathBuf>,
        specs: impl IntoIterator<Item = ArtifactSpec>,
        loader: Arc<dyn ArtifactLoader>,
    ) -> Self {
        let dir = dir.into();
        let slots = specs
            .into_iter()
            .map(|spec| {
                let slot = Slot {
                    path: dir.join(&spec.file),
                    spec,
                    state: Mutex::new(SlotState::NotLoaded),
                    settled: Condvar::new(),
                };
                (slot.spec.name.clone(), slot)
            })
            .collect();

        Self { dir, slots, loader }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// The artifact, or `None` if it is unregistered or failed to load.
    pub fn get(&self, name: &str) -> Option<LoadedArtifact> {
        self.try_get(name).ok()
    }

    /// Like [`get`](Self::get), but keeps the memoized reason for absence.
    pub fn try_get(&self, name: &str) -> Result<LoadedArtifact, ArtifactError> {
        let slot = self
            .slots
            .get(name)
            .ok_or_else(|| ArtifactError::NotRegistered(name.to_string()))?;

        let mut state = slot.lock();
        loop {
            match &*state {
                SlotState::Loaded { artifact, .. } => return Ok(artifact.clone()),
                SlotState::Failed(err) => return Err(err.clone()),
                SlotState::Loading => {}
                SlotState::NotLoaded => break,
            }
            state = slot.wait(state);
        }
        *state = SlotState::Loading;
        drop(state);

        self.load_slot(slot)
    }

    pub fn classifier(&self, name: &str) -> Result<Arc<dyn Classifier>, ArtifactError> {
        match self.try_get(name)? {
            LoadedArtifact::Classifier(classifier) => Ok(classifier),
            other => Err(self.kind_mismatch(name, ArtifactKind::Classifier, other.kind())),
        }
    }

    pub fn rule_source(&self, name: &str) -> Result<Arc<dyn RuleSource>, ArtifactError> {
        match self.try_get(name)? {
            LoadedArtifact::RuleTable(rules) => Ok(rules),
            other => Err(self.kind_mismatch(name, ArtifactKind::RuleTable, other.kind())),
        }
    }

    /// Return a slot to `NotLoaded`, waiting out any in-flight load first.
    /// Returns `false` for unregistered names. Test isolation only.
    pub fn reset(&self, name: &str) -> bool {
        let Some(slot) = self.slots.get(name) else {
            return false;
        };

        let mut state = slot.lock();
        while matches!(*state, SlotState::Loading) {
            state = slot.wait(state);
        }
        *state = SlotState::NotLoaded;
        true
    }

    pub fn descriptor(&self, name: &str) -> Option<ArtifactDescriptor> {
        self.slots.get(name).map(Slot::describe)
    }

    /// Current state of every slot. Does not trigger loads.
    pub fn descriptors(&self) -> Vec<ArtifactDescriptor> {
        self.slots.values().map(Slot::describe).collect()
    }

    /// Force first access of every slot and report the outcome.
    pub fn load_all(&self) -> Vec<ArtifactDescriptor> {
        for name in self.slots.keys() {
            let _ = self.try_get(name);
        }
        self.descriptors()
    }

    fn load_slot(&self, slot: &Slot) -> Result<LoadedArtifact, ArtifactError> {
        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            self.loader.load(&slot.spec, &slot.path)
        }))
        .unwrap_or_else(|_| Err(ArtifactError::corrupt(&slot.path, "loader panicked")))
        .and_then(|artifact| {
            if artifact.kind() == slot.spec.kind {
                Ok(artifact)
            } else {
                Err(ArtifactError::corrupt(
                    &slot.path,
                    format!(
                        "expected a {}, loader produced a {}",
                        slot.spec.kind.as_str(),
                        artifact.kind().as_str()
                    ),
                ))
            }
        });

        let settled = match &result {
            Ok(artifact) => {
                tracing::info!(
                    artifact = %slot.spec.name,
                    path = %slot.path.display(),
                    "Loaded model artifact"
                );
                SlotState::Loaded {
                    artifact: artifact.clone(),
                    at: Utc::now(),
                }
            }
            Err(err) => {
                tracing::warn!(
                    artifact = %slot.spec.name,
                    path = %slot.path.display(),
                    error = %err,
                    "Model artifact unavailable, falling back to heuristics"
                );
                SlotState::Failed(err.clone())
            }
        };

        *slot.lock() = settled;
        slot.settled.notify_all();

        result
    }

    fn kind_mismatch(
        &self,
        name: &str,
        expected: ArtifactKind,
        found: ArtifactKind,
    ) -> ArtifactError {
        let path = self
            .slots
            .get(name)
            .map(|slot| slot.path.clone())
            .unwrap_or_else(|| self.dir.join(name));
        ArtifactError::corrupt(
            path,
            format!("expected a {}, found a {}", expected.as_str(), found.as_str()),
        )
    }
}
