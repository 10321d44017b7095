//! Canned Appendectomy Procedure.

use crate::datatypes::{Annotation, CodeableConcept, Coding, Narrative, Reference};
use crate::{FhirError, FhirResult, SNOMED_SYSTEM};
use serde::Serialize;

const PERFORMER_REFERENCE: &str = "4";
const PERFORMER_DISPLAY: &str = "Dr Adam Careful";

/// Procedure resource operations.
pub struct Procedure;

impl Procedure {
    /// Completed appendectomy performed on `patient_ref`.
    ///
    /// # Errors
    ///
    /// Returns [`FhirError`] if serialisation fails.
    pub fn appendectomy(patient_ref: &str) -> FhirResult<serde_json::Value> {
        let wire = appendectomy_wire(patient_ref);
        serde_json::to_value(&wire)
            .map_err(|e| FhirError::Translation(format!("Failed to serialise procedure: {e}")))
    }
}

#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
struct ProcedureWire {
    #[serde(rename = "resourceType")]
    resource_type: String,

    text: Narrative,

    status: String,

    code: CodeableConcept,

    subject: Reference,

    recorder: Reference,

    performer: Vec<PerformerWire>,

    #[serde(rename = "followUp")]
    follow_up: Vec<Annotation>,

    note: Vec<Annotation>,
}

#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
struct PerformerWire {
    actor: Reference,
}

fn practitioner() -> Reference {
    Reference::to("Practitioner", PERFORMER_REFERENCE).with_display(PERFORMER_DISPLAY)
}

fn appendectomy_wire(patient_ref: &str) -> ProcedureWire {
    ProcedureWire {
        resource_type: "Procedure".to_owned(),
        text: Narrative::generated(),
        status: "completed".to_owned(),
        code: CodeableConcept::single(Coding::new(
            SNOMED_SYSTEM,
            "74400008",
            "Appendectomy (Procedure)",
        ))
        .with_text("Appendectomy"),
        subject: Reference::to("Patient", patient_ref),
        recorder: practitioner(),
        performer: vec![PerformerWire {
            actor: practitioner(),
        }],
        follow_up: vec![Annotation {
            text: "ROS 5 days  - 2024-04-12".to_owned(),
        }],
        note: vec![Annotation {
            text: "Routine Appendectomy. Appendix was inflamed and in retro-caecal position"
                .to_owned(),
        }],
    }
}
