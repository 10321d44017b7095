//! Destination patient id relay.
//!
//! The patient migration stage writes the id the destination server assigned; the
//! condition, observation and procedure stages read it back in a later invocation.
//! The file holds the bare id and nothing else. Writes overwrite without locking.

use crate::config::BridgeConfig;
use crate::{BridgeError, BridgeResult};
use carebridge_types::NonEmptyText;
use std::path::{Path, PathBuf};

/// Identifier of a Patient created on the destination server.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DestinationPatientRef(NonEmptyText);

impl DestinationPatientRef {
    /// # Errors
    ///
    /// Returns [`BridgeError::InvalidInput`] for a blank id.
    pub fn new(id: impl AsRef<str>) -> BridgeResult<Self> {
        NonEmptyText::new(id)
            .map(Self)
            .map_err(|_| BridgeError::InvalidInput("patient reference cannot be empty".into()))
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl std::fmt::Display for DestinationPatientRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// File-backed store for the most recently created destination patient id.
#[derive(Clone, Debug)]
pub struct PatientRefRelay {
    path: PathBuf,
}

impl PatientRefRelay {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn from_config(cfg: &BridgeConfig) -> Self {
        Self::new(cfg.patient_ref_path())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Overwrite the relay file, creating its directory on demand.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::StorageIo`] if the directory or file cannot be written.
    pub fn save(&self, patient_ref: &DestinationPatientRef) -> BridgeResult<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| BridgeError::StorageIo {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        std::fs::write(&self.path, patient_ref.as_str()).map_err(|source| {
            BridgeError::StorageIo {
                path: self.path.clone(),
                source,
            }
        })?;
        tracing::info!(
            "saved destination patient id {} to {}",
            patient_ref,
            self.path.display()
        );
        Ok(())
    }

    /// Read the stored id.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::PrerequisiteMissing`] if the file is absent or blank, and
    /// [`BridgeError::StorageIo`] for other read failures.
    pub fn load(&self) -> BridgeResult<DestinationPatientRef> {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(self.missing());
            }
            Err(source) => {
                return Err(BridgeError::StorageIo {
                    path: self.path.clone(),
                    source,
                });
            }
        };
        NonEmptyText::new(contents)
            .map(DestinationPatientRef)
            .map_err(|_| self.missing())
    }

    /// Use `explicit` when the caller supplied one, otherwise fall back to the file.
    pub fn resolve(
        &self,
        explicit: Option<DestinationPatientRef>,
    ) -> BridgeResult<DestinationPatientRef> {
        match explicit {
            Some(patient_ref) => Ok(patient_ref),
            None => self.load(),
        }
    }

    fn missing(&self) -> BridgeError {
        BridgeError::PrerequisiteMissing(format!(
            "no destination patient id at {}; run migrate-patient first or pass --patient-ref",
            self.path.display()
        ))
    }
}
