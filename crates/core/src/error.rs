use std::path::PathBuf;

/// Errors raised by CareBridge services.
///
/// Remote failures keep the URL that was called so the operator can see which of
/// the three servers misbehaved.
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    #[error("credential file not found: {}", path.display())]
    CredentialMissing { path: PathBuf },

    #[error("credential file {} could not be read: {reason}", path.display())]
    CredentialUnparseable { path: PathBuf, reason: String },

    #[error("missing prerequisite: {0}")]
    PrerequisiteMissing(String),

    #[error("request to {url} failed with status {status}: {body}")]
    RemoteRequestFailed {
        url: String,
        status: u16,
        body: String,
    },

    #[error("request to {url} timed out")]
    RemoteRequestTimedOut { url: String },

    #[error("could not reach {url}: {reason}")]
    RemoteUnreachable { url: String, reason: String },

    #[error("response from {url} is not valid JSON: {reason}")]
    ResponseUnparseable { url: String, reason: String },

    #[error("no matching data: {0}")]
    NoMatchingData(String),

    #[error("missing field: {0}")]
    MissingField(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("failed to access {}: {source}", path.display())]
    StorageIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("FHIR error: {0}")]
    Fhir(fhir::FhirError),
}

impl From<fhir::FhirError> for BridgeError {
    fn from(err: fhir::FhirError) -> Self {
        match err {
            fhir::FhirError::MissingField(field) => BridgeError::MissingField(field),
            other => BridgeError::Fhir(other),
        }
    }
}

pub type BridgeResult<T> = std::result::Result<T, BridgeError>;
