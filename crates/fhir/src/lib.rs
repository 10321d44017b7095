//! FHIR R4 wire support for the CareBridge migration toolkit.
//!
//! This crate provides **wire models** and **translation helpers** for the JSON exchanged
//! with the source EHR server and the destination Primary Care server:
//! - lenient source-side models that pull the handful of fields a migration needs
//!   out of full resources returned by the source system
//! - strict destination-side models that are built once per invocation from typed
//!   records and serialised as POST bodies
//! - searchset bundle handling (entries and paging links)
//!
//! This crate performs no I/O. HTTP transport, credentials and orchestration live in
//! `carebridge-core`.

pub mod bundle;
pub mod condition;
pub mod datatypes;
pub mod observation;
pub mod patient;
pub mod procedure;

// Re-export facades
pub use bundle::{CreatedResource, SearchBundle};
pub use condition::Condition;
pub use observation::Observation;
pub use patient::Patient;
pub use procedure::Procedure;

// Re-export public domain-level types
pub use bundle::{BundleEntry, BundleLink};
pub use condition::{ConditionRecord, ConditionSummary, SourceCondition};
pub use datatypes::{CodeableConcept, Coding, Reference};
pub use observation::ObservationSummary;
pub use patient::{PatientRecord, PatientSummary, PostalAddress, SourcePatient};

/// Code system URI for SNOMED CT.
pub const SNOMED_SYSTEM: &str = "http://snomed.info/sct";

/// Code system URI for LOINC.
pub const LOINC_SYSTEM: &str = "http://loinc.org";

/// Errors returned by the `fhir` boundary crate.
#[derive(Debug, thiserror::Error)]
pub enum FhirError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("missing field: {0}")]
    MissingField(String),

    #[error("translation error: {0}")]
    Translation(String),
}

/// Type alias for Results that can fail with a [`FhirError`].
pub type FhirResult<T> = Result<T, FhirError>;

/// Deserialise `T` from JSON text, reporting the failing path on schema mismatch.
pub(crate) fn parse_json<T>(json_text: &str, what: &str) -> FhirResult<T>
where
    T: serde::de::DeserializeOwned,
{
    let mut deserializer = serde_json::Deserializer::from_str(json_text);
    serde_path_to_error::deserialize::<_, T>(&mut deserializer)
        .map_err(|err| schema_mismatch(what, err))
}

/// Deserialise `T` from an already-parsed JSON value.
pub(crate) fn from_value<T>(value: serde_json::Value, what: &str) -> FhirResult<T>
where
    T: serde::de::DeserializeOwned,
{
    serde_path_to_error::deserialize::<_, T>(value).map_err(|err| schema_mismatch(what, err))
}

/// Reject a resource whose `resourceType` is not the one expected.
pub(crate) fn expect_resource_type(found: &str, expected: &str) -> FhirResult<()> {
    if found != expected {
        return Err(FhirError::InvalidInput(format!(
            "Expected resourceType '{expected}', got '{found}'"
        )));
    }
    Ok(())
}

fn schema_mismatch(what: &str, err: serde_path_to_error::Error<serde_json::Error>) -> FhirError {
    let path = err.path().to_string();
    let source = err.into_inner();
    let path = if path.is_empty() || path == "." {
        "<root>"
    } else {
        path.as_str()
    };
    FhirError::Translation(format!("{what} schema mismatch at {path}: {source}"))
}
