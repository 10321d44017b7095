//! Constants used throughout the CareBridge core crate.
//!
//! Endpoint defaults, local file names and request limits live here so the
//! configuration layer and the services agree on them.

use std::time::Duration;

/// Default base URL of the source EHR FHIR server.
pub const DEFAULT_SOURCE_BASE_URL: &str =
    "https://in-info-web20.luddy.indianapolis.iu.edu/apis/default/fhir";

/// Default base URL of the destination Primary Care FHIR server.
pub const DEFAULT_DESTINATION_BASE_URL: &str = "http://137.184.71.65:8080/fhir";

/// Default base URL of the SNOMED CT terminology server.
pub const DEFAULT_TERMINOLOGY_BASE_URL: &str = "http://159.65.173.51:8080/v1/snomed";

/// Default directory for locally persisted state when no explicit directory is configured.
pub const DEFAULT_DATA_DIR: &str = "data";

/// Filename of the bearer token file inside the data directory.
pub const ACCESS_TOKEN_FILENAME: &str = "access_token.json";

/// Filename of the destination patient id relay file inside the data directory.
pub const PATIENT_REF_FILENAME: &str = "patient_resource_id.txt";

/// Per-request timeout used while paging through the full patient collection.
pub const PAGINATION_REQUEST_TIMEOUT: Duration = Duration::from_secs(180);

/// Preferred term reported when a concept lookup returns no description.
pub const NO_DESCRIPTION_AVAILABLE: &str = "No description available";
