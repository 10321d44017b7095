//! Canned vital-signs Observation.
//!
//! The destination system receives a fixed blood-pressure panel example; the only
//! variable element is the subject reference. Nothing here is read from the source.

use crate::datatypes::{CodeableConcept, Coding, Narrative, Quantity, Reference};
use crate::{FhirError, FhirResult, LOINC_SYSTEM, SNOMED_SYSTEM};
use serde::Serialize;

/// LOINC code of the blood pressure panel.
pub const BLOOD_PRESSURE_PANEL_CODE: &str = "85354-9";

const VITAL_SIGNS_PROFILE: &str = "http://hl7.org/fhir/StructureDefinition/vitalsigns";
const CATEGORY_SYSTEM: &str = "http://terminology.hl7.org/CodeSystem/observation-category";
const INTERPRETATION_SYSTEM: &str =
    "http://terminology.hl7.org/CodeSystem/v3-ObservationInterpretation";

/// Flattened observation row for tabular reports.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ObservationSummary {
    pub id: String,
    pub status: String,
    pub code: String,
    pub effective: String,
}

/// Observation resource operations.
pub struct Observation;

impl Observation {
    /// Blood pressure panel (systolic 107 mmHg, diastolic 60 mmHg) for `patient_ref`.
    ///
    /// # Errors
    ///
    /// Returns [`FhirError`] if serialisation fails.
    pub fn blood_pressure_panel(patient_ref: &str) -> FhirResult<serde_json::Value> {
        let wire = blood_pressure_wire(patient_ref);
        serde_json::to_value(&wire)
            .map_err(|e| FhirError::Translation(format!("Failed to serialise observation: {e}")))
    }

    /// Search parameter value selecting blood pressure panels (`system|code`).
    pub fn blood_pressure_code_param() -> String {
        format!("{LOINC_SYSTEM}|{BLOOD_PRESSURE_PANEL_CODE}")
    }

    /// Flatten an Observation taken from a search bundle entry.
    ///
    /// Absent fields become empty strings.
    pub fn summarise(resource: &serde_json::Value) -> ObservationSummary {
        let text = |pointer: &str| {
            resource
                .pointer(pointer)
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_owned()
        };
        ObservationSummary {
            id: text("/id"),
            status: text("/status"),
            code: text("/code/coding/0/code"),
            effective: text("/effectiveDateTime"),
        }
    }
}

#[derive(Clone, Debug, Serialize, PartialEq)]
struct ObservationWire {
    #[serde(rename = "resourceType")]
    resource_type: String,

    meta: MetaWire,

    text: Narrative,

    identifier: Vec<IdentifierWire>,

    #[serde(rename = "basedOn")]
    based_on: Vec<BasedOnWire>,

    status: String,

    category: Vec<CodeableConcept>,

    code: CodeableConcept,

    subject: Reference,

    #[serde(rename = "effectiveDateTime")]
    effective_date_time: String,

    performer: Vec<Reference>,

    interpretation: Vec<CodeableConcept>,

    #[serde(rename = "bodySite")]
    body_site: CodeableConcept,

    component: Vec<ComponentWire>,
}

#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
struct MetaWire {
    profile: Vec<String>,
}

#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
struct IdentifierWire {
    system: String,
    value: String,
}

#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
struct BasedOnWire {
    identifier: IdentifierWire,
}

#[derive(Clone, Debug, Serialize, PartialEq)]
struct ComponentWire {
    code: CodeableConcept,

    #[serde(rename = "valueQuantity")]
    value_quantity: Quantity,

    interpretation: Vec<CodeableConcept>,
}

fn low() -> CodeableConcept {
    CodeableConcept::single(Coding::new(INTERPRETATION_SYSTEM, "L", "low"))
        .with_text("Below low normal")
}

fn normal() -> CodeableConcept {
    CodeableConcept::single(Coding::new(INTERPRETATION_SYSTEM, "N", "normal")).with_text("Normal")
}

fn blood_pressure_wire(patient_ref: &str) -> ObservationWire {
    ObservationWire {
        resource_type: "Observation".to_owned(),
        meta: MetaWire {
            profile: vec![VITAL_SIGNS_PROFILE.to_owned()],
        },
        text: Narrative::generated(),
        identifier: vec![IdentifierWire {
            system: "urn:ietf:rfc:3986".to_owned(),
            value: "urn:uuid:187e0c12-8dd2-67e2-99b2-bf273c878281".to_owned(),
        }],
        based_on: vec![BasedOnWire {
            identifier: IdentifierWire {
                system: "https://acme.org/identifiers".to_owned(),
                value: "1234".to_owned(),
            },
        }],
        status: "final".to_owned(),
        category: vec![CodeableConcept::single(Coding::new(
            CATEGORY_SYSTEM,
            "vital-signs",
            "Vital Signs",
        ))],
        code: CodeableConcept::single(Coding::new(
            LOINC_SYSTEM,
            BLOOD_PRESSURE_PANEL_CODE,
            "Blood pressure panel with all children optional",
        ))
        .with_text("Blood pressure systolic & diastolic"),
        subject: Reference::to("Patient", patient_ref),
        effective_date_time: "2012-09-17".to_owned(),
        performer: vec![Reference::to("Practitioner", "4")],
        interpretation: vec![low()],
        body_site: CodeableConcept::single(Coding::new(SNOMED_SYSTEM, "368209003", "Right arm")),
        component: vec![
            ComponentWire {
                code: CodeableConcept {
                    coding: vec![
                        Coding::new(LOINC_SYSTEM, "8480-6", "Systolic blood pressure"),
                        Coding::new(SNOMED_SYSTEM, "271649006", "Systolic blood pressure"),
                        Coding::new(
                            "http://acme.org/devices/clinical-codes",
                            "bp-s",
                            "Systolic Blood pressure",
                        ),
                    ],
                    text: None,
                },
                value_quantity: Quantity::mm_hg(107.0),
                interpretation: vec![normal()],
            },
            ComponentWire {
                code: CodeableConcept::single(Coding::new(
                    LOINC_SYSTEM,
                    "8462-4",
                    "Diastolic blood pressure",
                )),
                value_quantity: Quantity::mm_hg(60.0),
                interpretation: vec![low()],
            },
        ],
    }
}
