//! FHIR Condition wire models and translation helpers.
//!
//! A migrated Condition does not copy the source diagnosis code. The source code is
//! read, translated to a neighbouring SNOMED concept by the caller, and the resolved
//! concept is what gets written to the destination. Only the verification status is
//! carried over verbatim.

use crate::datatypes::{CodeableConcept, Coding, Reference};
use crate::{expect_resource_type, from_value, FhirError, FhirResult, SNOMED_SYSTEM};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Code written to severity and body site, which are not derived from source data.
pub const NOT_APPLICABLE_CODE: &str = "N/A";

/// Display paired with [`NOT_APPLICABLE_CODE`].
pub const NOT_APPLICABLE_DISPLAY: &str = "Not Applicable";

const CLINICAL_STATUS_SYSTEM: &str = "http://terminology.hl7.org/CodeSystem/condition-clinical";
const VERIFICATION_STATUS_SYSTEM: &str =
    "http://terminology.hl7.org/CodeSystem/condition-ver-status";
const CATEGORY_SYSTEM: &str = "http://terminology.hl7.org/CodeSystem/condition-category";

// ============================================================================
// Public domain-level types
// ============================================================================

/// Fields read from a source-system Condition.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourceCondition {
    pub id: Option<String>,
    /// Code of the first coding (a SNOMED concept id in the source system).
    pub snomed_code: String,
    /// Code of the first verification-status coding, copied verbatim.
    pub verification_status: String,
}

/// Everything needed to build one destination Condition payload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConditionRecord {
    /// SNOMED concept id of the resolved neighbour concept.
    pub concept_id: String,
    /// Preferred term of the resolved concept; used for display and text.
    pub preferred_term: String,
    pub verification_status: String,
    /// Destination-system patient id (without the `Patient/` prefix).
    pub patient_ref: String,
    pub onset: NaiveDate,
}

/// Flattened condition row for tabular reports.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ConditionSummary {
    pub resource_type: String,
    pub id: String,
    pub code: String,
}

// ============================================================================
// Public Condition operations
// ============================================================================

/// Condition resource operations.
pub struct Condition;

impl Condition {
    /// Extract the code and verification status from a source Condition resource.
    ///
    /// # Errors
    ///
    /// Returns [`FhirError`] if the resource is not a Condition, has no
    /// `code.coding[0].code`, or has no `verificationStatus.coding[0].code`.
    pub fn parse_source(resource: serde_json::Value) -> FhirResult<SourceCondition> {
        let wire: SourceConditionWire = from_value(resource, "Condition")?;
        expect_resource_type(&wire.resource_type, "Condition")?;

        let snomed_code = wire
            .code
            .as_ref()
            .and_then(|c| c.first_code())
            .ok_or_else(|| FhirError::MissingField("code.coding[0].code".into()))?
            .to_owned();
        let verification_status = wire
            .verification_status
            .as_ref()
            .and_then(|c| c.first_code())
            .ok_or_else(|| FhirError::MissingField("verificationStatus.coding[0].code".into()))?
            .to_owned();

        Ok(SourceCondition {
            id: wire.id,
            snomed_code,
            verification_status,
        })
    }

    /// Render the destination Condition payload as a JSON value.
    ///
    /// # Errors
    ///
    /// Returns [`FhirError`] if serialisation fails.
    pub fn render(record: &ConditionRecord) -> FhirResult<serde_json::Value> {
        let wire = record_to_wire(record);
        serde_json::to_value(&wire)
            .map_err(|e| FhirError::Translation(format!("Failed to serialise condition: {e}")))
    }

    /// Flatten a Condition resource taken from a search bundle entry.
    pub fn summarise(resource: &serde_json::Value) -> ConditionSummary {
        let field = |name: &str| {
            resource
                .get(name)
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_owned()
        };
        let code = resource
            .pointer("/code/coding/0/code")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_owned();

        ConditionSummary {
            resource_type: field("resourceType"),
            id: field("id"),
            code,
        }
    }
}

// ============================================================================
// Wire types (internal)
// ============================================================================

#[derive(Clone, Debug, Deserialize)]
struct SourceConditionWire {
    #[serde(rename = "resourceType")]
    resource_type: String,

    #[serde(default)]
    id: Option<String>,

    #[serde(default)]
    code: Option<CodeableConcept>,

    #[serde(rename = "verificationStatus", default)]
    verification_status: Option<CodeableConcept>,
}

#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
struct ConditionWire {
    #[serde(rename = "resourceType")]
    resource_type: String,

    #[serde(rename = "clinicalStatus")]
    clinical_status: CodeableConcept,

    #[serde(rename = "verificationStatus")]
    verification_status: CodeableConcept,

    category: Vec<CodeableConcept>,

    severity: CodeableConcept,

    code: CodeableConcept,

    #[serde(rename = "bodySite")]
    body_site: Vec<CodeableConcept>,

    subject: Reference,

    #[serde(rename = "onsetDateTime")]
    onset_date_time: String,
}

// ============================================================================
// Helper functions (internal)
// ============================================================================

fn not_applicable() -> Coding {
    Coding::new(SNOMED_SYSTEM, NOT_APPLICABLE_CODE, NOT_APPLICABLE_DISPLAY)
}

fn record_to_wire(record: &ConditionRecord) -> ConditionWire {
    ConditionWire {
        resource_type: "Condition".to_owned(),
        clinical_status: CodeableConcept::single(Coding::code_only(
            CLINICAL_STATUS_SYSTEM,
            "active",
        )),
        verification_status: CodeableConcept::single(Coding::code_only(
            VERIFICATION_STATUS_SYSTEM,
            &record.verification_status,
        )),
        category: vec![CodeableConcept {
            coding: vec![
                Coding::new(
                    CATEGORY_SYSTEM,
                    "encounter-diagnosis",
                    "Encounter Diagnosis",
                ),
                Coding::new(SNOMED_SYSTEM, "439401001", "Diagnosis"),
            ],
            text: None,
        }],
        severity: CodeableConcept::single(not_applicable()),
        code: CodeableConcept::single(Coding::new(
            SNOMED_SYSTEM,
            &record.concept_id,
            &record.preferred_term,
        ))
        .with_text(&record.preferred_term),
        body_site: vec![
            CodeableConcept::single(not_applicable()).with_text(NOT_APPLICABLE_DISPLAY),
        ],
        subject: Reference::to("Patient", &record.patient_ref),
        onset_date_time: record.onset.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn source_condition() -> serde_json::Value {
        json!({
            "resourceType": "Condition",
            "id": "c-17",
            "code": {"coding": [{
                "system": "http://snomed.info/sct",
                "code": "74400008",
                "display": "Appendicitis"
            }]},
            "verificationStatus": {"coding": [{
                "system": VERIFICATION_STATUS_SYSTEM,
                "code": "confirmed"
            }]},
            "subject": {"reference": "Patient/985ac7e3"}
        })
    }

    #[test]
    fn extracts_code_and_verification_status() {
        let parsed = Condition::parse_source(source_condition()).expect("parse condition");
        assert_eq!(parsed.id.as_deref(), Some("c-17"));
        assert_eq!(parsed.snomed_code, "74400008");
        assert_eq!(parsed.verification_status, "confirmed");
    }

    #[test]
    fn missing_verification_status_is_reported() {
        let mut resource = source_condition();
        resource
            .as_object_mut()
            .expect("object")
            .remove("verificationStatus");
        let err = Condition::parse_source(resource).expect_err("should require status");
        match err {
            FhirError::MissingField(field) => {
                assert_eq!(field, "verificationStatus.coding[0].code")
            }
            other => panic!("expected MissingField error, got {other:?}"),
        }
    }

    #[test]
    fn renders_resolved_concept_with_fixed_sentinels() {
        let record = ConditionRecord {
            concept_id: "18526009".into(),
            preferred_term: "Disorder of appendix".into(),
            verification_status: "confirmed".into(),
            patient_ref: "4821".into(),
            onset: NaiveDate::from_ymd_opt(2024, 12, 9).expect("valid date"),
        };
        let value = Condition::render(&record).expect("render condition");

        assert_eq!(value["resourceType"], "Condition");
        assert_eq!(value["clinicalStatus"]["coding"][0]["code"], "active");
        assert_eq!(value["verificationStatus"]["coding"][0]["code"], "confirmed");
        assert_eq!(value["code"]["coding"][0]["code"], "18526009");
        assert_eq!(value["code"]["coding"][0]["display"], "Disorder of appendix");
        assert_eq!(value["code"]["text"], "Disorder of appendix");
        assert_eq!(value["category"][0]["coding"][1]["code"], "439401001");
        assert_eq!(value["severity"]["coding"][0]["code"], "N/A");
        assert_eq!(value["severity"]["coding"][0]["display"], "Not Applicable");
        assert_eq!(value["bodySite"][0]["coding"][0]["code"], "N/A");
        assert_eq!(value["bodySite"][0]["text"], "Not Applicable");
        assert_eq!(value["subject"]["reference"], "Patient/4821");
        assert_eq!(value["onsetDateTime"], "2024-12-09");
    }

    #[test]
    fn summarise_reads_first_coding() {
        let summary = Condition::summarise(&source_condition());
        assert_eq!(
            summary,
            ConditionSummary {
                resource_type: "Condition".into(),
                id: "c-17".into(),
                code: "74400008".into(),
            }
        );
        assert_eq!(Condition::summarise(&json!({})).code, "");
    }
}
