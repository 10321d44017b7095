//! # CareBridge Core
//!
//! Migration and reporting services for moving patient data from a source EHR FHIR
//! server to a destination Primary Care FHIR server.
//!
//! This crate contains the HTTP-facing logic:
//! - bearer credential loading and the destination patient id relay file
//! - source and destination FHIR clients over a pluggable [`transport::HttpTransport`]
//! - SNOMED CT neighbour resolution through the terminology server
//! - the migration stages and the read-only reporting queries
//!
//! **No CLI concerns**: argument parsing, environment loading and output formatting
//! belong in the `carebridge` binary. Payload shapes live in the `fhir` crate.

pub mod config;
pub mod constants;
pub mod credentials;
pub mod error;
pub mod pipeline;
pub mod relay;
pub mod reporting;
pub mod servers;
pub mod terminology;
pub mod transport;

pub use config::BridgeConfig;
pub use credentials::{AccessToken, CredentialStore};
pub use error::{BridgeError, BridgeResult};
pub use pipeline::{FirstEntryPolicy, MigrationPipeline, Stage, StageOutcome};
pub use relay::{DestinationPatientRef, PatientRefRelay};
pub use reporting::{AgeHistogram, PatientCriteria, PatientSearch, SourceQueries};
pub use servers::{DestinationServer, SourceServer};
pub use terminology::{Direction, Ecl, SnomedConceptRef, TerminologyClient};
pub use transport::{HttpTransport, ReqwestTransport};
