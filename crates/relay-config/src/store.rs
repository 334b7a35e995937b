//! Load-once store of report job definitions.

use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use std::sync::OnceLock;

use tracing::debug;

use crate::error::DefinitionsError;
use crate::job::JobDefinition;

/// Holds the job definitions read at startup.
///
/// The set is loaded exactly once per store; a second [`load`](Self::load)
/// fails with [`DefinitionsError::AlreadyLoaded`] and leaves the loaded set
/// untouched, so an accidental reload can never produce duplicate schedules.
#[derive(Debug, Default)]
pub struct JobDefinitionStore {
    definitions: OnceLock<Vec<JobDefinition>>,
}

impl JobDefinitionStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Read the JSON array of job definitions at `path`, preserving file order.
    ///
    /// Only structural decoding happens here. Cron expressions and output paths
    /// are checked when jobs are scheduled and run.
    pub fn load(&self, path: &Path) -> Result<&[JobDefinition], DefinitionsError> {
        if self.is_loaded() {
            return Err(DefinitionsError::AlreadyLoaded);
        }

        let content = fs::read_to_string(path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => DefinitionsError::Missing(path.to_path_buf()),
            _ => DefinitionsError::Unreadable {
                path: path.to_path_buf(),
                source: e,
            },
        })?;

        let definitions: Vec<JobDefinition> =
            serde_json::from_str(&content).map_err(|e| DefinitionsError::Malformed {
                path: path.to_path_buf(),
                source: e,
            })?;

        debug!(
            "Decoded {} job definitions from {}",
            definitions.len(),
            path.display()
        );

        self.definitions
            .set(definitions)
            .map_err(|_| DefinitionsError::AlreadyLoaded)?;
        Ok(self.definitions())
    }

    /// Whether a load has already succeeded.
    pub fn is_loaded(&self) -> bool {
        self.definitions.get().is_some()
    }

    /// The loaded definitions, empty before the first successful load.
    pub fn definitions(&self) -> &[JobDefinition] {
        self.definitions.get().map(Vec::as_slice).unwrap_or(&[])
    }

    /// Look up a definition by job id.
    pub fn get(&self, id: &str) -> Option<&JobDefinition> {
        self.definitions().iter().find(|d| d.id == id)
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
