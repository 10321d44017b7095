//! FHIR Patient wire models and translation helpers.
//!
//! Responsibilities:
//! - Extract the demographics a migration copies (name, birth date, gender, first
//!   address) from a full source-system Patient
//! - Build the destination Patient payload from a [`PatientRecord`]
//! - Flatten search results into [`PatientSummary`] rows for reports
//!
//! Notes:
//! - Only the first `name` and first `address` entries of a source patient are used
//! - The destination identifier is freshly generated per migration run; nothing from
//!   the source identifier list is carried over

use crate::datatypes::{CodeableConcept, Coding, Period};
use crate::{expect_resource_type, from_value, parse_json, FhirError, FhirResult};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;

/// Range the generated destination identifier value is drawn from.
pub const IDENTIFIER_VALUE_RANGE: RangeInclusive<u32> = 10_000..=99_999;

/// District recorded when the source address does not carry one.
pub const DISTRICT_NOT_AVAILABLE: &str = "N/A";

const IDENTIFIER_TYPE_SYSTEM: &str = "http://terminology.hl7.org/CodeSystem/v2-0203";
const IDENTIFIER_TYPE_MEDICAL_RECORD: &str = "MR";
const IDENTIFIER_SYSTEM: &str = "urn:oid:1.2.36.146.595.217.0.1";

// ============================================================================
// Public domain-level types
// ============================================================================

/// Postal address fields copied from the first source address.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PostalAddress {
    pub line: String,
    pub city: String,
    pub district: String,
    pub state: String,
    pub postal_code: String,
}

impl PostalAddress {
    /// Single-line rendering used for the FHIR `address.text` element.
    pub fn text(&self) -> String {
        format!(
            "{}, {}, {}, {}",
            self.line, self.city, self.state, self.postal_code
        )
    }
}

/// Demographics extracted from a source-system Patient.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourcePatient {
    /// Source-system logical id, when the resource carries one.
    pub id: Option<String>,
    pub family: String,
    /// First given name only.
    pub given: String,
    /// ISO date copied verbatim (`YYYY-MM-DD`).
    pub birth_date: Option<String>,
    /// Administrative gender code copied verbatim.
    pub gender: Option<String>,
    pub address: PostalAddress,
}

/// Everything needed to build one destination Patient payload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PatientRecord {
    pub family: String,
    pub given: String,
    pub birth_date: Option<String>,
    pub gender: Option<String>,
    pub address: PostalAddress,
    /// Generated identifier value, within [`IDENTIFIER_VALUE_RANGE`].
    pub identifier_value: u32,
    /// Start of the identifier period (the migration date).
    pub identifier_start: NaiveDate,
}

impl PatientRecord {
    /// Combine source demographics with a freshly generated identifier.
    ///
    /// # Errors
    ///
    /// Returns [`FhirError::InvalidInput`] if `identifier_value` lies outside
    /// [`IDENTIFIER_VALUE_RANGE`].
    pub fn from_source(
        source: SourcePatient,
        identifier_value: u32,
        identifier_start: NaiveDate,
    ) -> FhirResult<Self> {
        if !IDENTIFIER_VALUE_RANGE.contains(&identifier_value) {
            return Err(FhirError::InvalidInput(format!(
                "identifier value {identifier_value} outside {}..={}",
                IDENTIFIER_VALUE_RANGE.start(),
                IDENTIFIER_VALUE_RANGE.end()
            )));
        }

        Ok(Self {
            family: source.family,
            given: source.given,
            birth_date: source.birth_date,
            gender: source.gender,
            address: source.address,
            identifier_value,
            identifier_start,
        })
    }
}

/// Flattened patient row for tabular reports.
///
/// Absent source elements become empty strings rather than errors.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PatientSummary {
    pub id: String,
    pub gender: String,
    pub given: String,
    pub family: String,
    pub birth_date: String,
}

// ============================================================================
// Public Patient operations
// ============================================================================

/// Patient resource operations.
///
/// This is a zero-sized type used for namespacing patient-related operations.
pub struct Patient;

impl Patient {
    /// Parse a source-system Patient and extract the migrated demographics.
    ///
    /// # Errors
    ///
    /// Returns [`FhirError`] if:
    /// - the JSON does not match the expected shape (the failing path is reported),
    /// - `resourceType` is not `Patient`,
    /// - the resource has no `name` entry with a family and a given name,
    /// - the resource has no `address` entry.
    pub fn parse_source(json_text: &str) -> FhirResult<SourcePatient> {
        let wire: SourcePatientWire = parse_json(json_text, "Patient")?;
        expect_resource_type(&wire.resource_type, "Patient")?;
        source_wire_to_domain(wire)
    }

    /// Render the destination Patient payload as a JSON value.
    ///
    /// # Errors
    ///
    /// Returns [`FhirError`] if serialisation fails.
    pub fn render(record: &PatientRecord) -> FhirResult<serde_json::Value> {
        let wire = record_to_wire(record);
        serde_json::to_value(&wire)
            .map_err(|e| FhirError::Translation(format!("Failed to serialise patient: {e}")))
    }

    /// Flatten a Patient resource taken from a search bundle entry.
    pub fn summarise(resource: &serde_json::Value) -> PatientSummary {
        match from_value::<SourcePatientWire>(resource.clone(), "Patient") {
            Ok(wire) => {
                let first_name = wire.name.first();
                PatientSummary {
                    id: wire.id.unwrap_or_default(),
                    gender: wire.gender.unwrap_or_default(),
                    given: first_name
                        .and_then(|n| n.given.first().cloned())
                        .unwrap_or_default(),
                    family: first_name
                        .and_then(|n| n.family.clone())
                        .unwrap_or_default(),
                    birth_date: wire.birth_date.unwrap_or_default(),
                }
            }
            Err(_) => PatientSummary {
                id: resource
                    .get("id")
                    .and_then(|v| v.as_str())
                    .unwrap_or_default()
                    .to_owned(),
                ..PatientSummary::default()
            },
        }
    }
}

// ============================================================================
// Wire types (internal)
// ============================================================================

/// Source-side Patient: lenient, unknown elements are ignored.
#[derive(Clone, Debug, Deserialize)]
struct SourcePatientWire {
    #[serde(rename = "resourceType")]
    resource_type: String,

    #[serde(default)]
    id: Option<String>,

    #[serde(default)]
    name: Vec<SourceNameWire>,

    #[serde(rename = "birthDate", default)]
    birth_date: Option<String>,

    #[serde(default)]
    gender: Option<String>,

    #[serde(default)]
    address: Vec<SourceAddressWire>,
}

#[derive(Clone, Debug, Deserialize)]
struct SourceNameWire {
    #[serde(default)]
    family: Option<String>,

    #[serde(default)]
    given: Vec<String>,
}

#[derive(Clone, Debug, Deserialize)]
struct SourceAddressWire {
    #[serde(default)]
    line: Vec<String>,

    #[serde(default)]
    city: Option<String>,

    #[serde(default)]
    district: Option<String>,

    #[serde(default)]
    state: Option<String>,

    #[serde(rename = "postalCode", default)]
    postal_code: Option<String>,
}

/// Destination-side Patient as posted to the Primary Care server.
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
struct PatientWire {
    #[serde(rename = "resourceType")]
    resource_type: String,

    identifier: Vec<IdentifierWire>,

    active: bool,

    name: Vec<HumanNameWire>,

    #[serde(skip_serializing_if = "Option::is_none")]
    gender: Option<String>,

    #[serde(rename = "birthDate", skip_serializing_if = "Option::is_none")]
    birth_date: Option<String>,

    #[serde(rename = "deceasedBoolean")]
    deceased_boolean: bool,

    address: Vec<AddressWire>,
}

#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
struct IdentifierWire {
    #[serde(rename = "use")]
    use_type: String,

    #[serde(rename = "type")]
    identifier_type: CodeableConcept,

    system: String,

    value: String,

    period: Period,
}

#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
struct HumanNameWire {
    #[serde(rename = "use")]
    use_type: String,

    family: String,

    given: Vec<String>,
}

#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
struct AddressWire {
    #[serde(rename = "use")]
    use_type: String,

    #[serde(rename = "type")]
    address_type: String,

    text: String,

    line: Vec<String>,

    city: String,

    district: String,

    state: String,

    #[serde(rename = "postalCode")]
    postal_code: String,
}

// ============================================================================
// Helper functions (internal)
// ============================================================================

/// Convert the lenient source wire model into the domain type.
fn source_wire_to_domain(wire: SourcePatientWire) -> FhirResult<SourcePatient> {
    let name = wire
        .name
        .into_iter()
        .next()
        .ok_or_else(|| FhirError::MissingField("name[0]".into()))?;
    let family = name
        .family
        .ok_or_else(|| FhirError::MissingField("name[0].family".into()))?;
    let given = name
        .given
        .into_iter()
        .next()
        .ok_or_else(|| FhirError::MissingField("name[0].given[0]".into()))?;

    let address = wire
        .address
        .into_iter()
        .next()
        .ok_or_else(|| FhirError::MissingField("address[0]".into()))?;

    Ok(SourcePatient {
        id: wire.id,
        family,
        given,
        birth_date: wire.birth_date,
        gender: wire.gender,
        address: PostalAddress {
            line: address.line.into_iter().next().unwrap_or_default(),
            city: address.city.unwrap_or_default(),
            district: address
                .district
                .unwrap_or_else(|| DISTRICT_NOT_AVAILABLE.to_owned()),
            state: address.state.unwrap_or_default(),
            postal_code: address.postal_code.unwrap_or_default(),
        },
    })
}

/// Build the destination wire model from a record.
fn record_to_wire(record: &PatientRecord) -> PatientWire {
    PatientWire {
        resource_type: "Patient".to_owned(),
        identifier: vec![IdentifierWire {
            use_type: "usual".to_owned(),
            identifier_type: CodeableConcept::single(Coding::code_only(
                IDENTIFIER_TYPE_SYSTEM,
                IDENTIFIER_TYPE_MEDICAL_RECORD,
            )),
            system: IDENTIFIER_SYSTEM.to_owned(),
            value: record.identifier_value.to_string(),
            period: Period {
                start: Some(record.identifier_start.to_string()),
            },
        }],
        active: true,
        name: vec![HumanNameWire {
            use_type: "official".to_owned(),
            family: record.family.clone(),
            given: vec![record.given.clone()],
        }],
        gender: record.gender.clone(),
        birth_date: record.birth_date.clone(),
        deceased_boolean: false,
        address: vec![AddressWire {
            use_type: "home".to_owned(),
            address_type: "both".to_owned(),
            text: record.address.text(),
            line: vec![record.address.line.clone()],
            city: record.address.city.clone(),
            district: record.address.district.clone(),
            state: record.address.state.clone(),
            postal_code: record.address.postal_code.clone(),
        }],
    }
}
