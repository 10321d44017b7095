//! FHIR complex datatypes shared by the resource wire models.
//!
//! These are deliberately partial: only the elements read from the source system or
//! written to the destination system are modelled. Deserialisation ignores unknown
//! elements because source resources carry far more than we consume.

use serde::{Deserialize, Serialize};

/// A code defined by a terminology system.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct Coding {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display: Option<String>,
}

impl Coding {
    /// A coding with system, code and display all present.
    pub fn new(system: &str, code: &str, display: &str) -> Self {
        Self {
            system: Some(system.to_owned()),
            code: Some(code.to_owned()),
            display: Some(display.to_owned()),
        }
    }

    /// A coding without a display term.
    pub fn code_only(system: &str, code: &str) -> Self {
        Self {
            system: Some(system.to_owned()),
            code: Some(code.to_owned()),
            display: None,
        }
    }
}

/// A concept expressed as one or more codings plus optional free text.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct CodeableConcept {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub coding: Vec<Coding>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl CodeableConcept {
    pub fn single(coding: Coding) -> Self {
        Self {
            coding: vec![coding],
            text: None,
        }
    }

    pub fn with_text(mut self, text: &str) -> Self {
        self.text = Some(text.to_owned());
        self
    }

    /// The code of the first coding, when present.
    pub fn first_code(&self) -> Option<&str> {
        self.coding.first().and_then(|c| c.code.as_deref())
    }
}

/// A reference from one resource to another.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct Reference {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display: Option<String>,
}

impl Reference {
    /// A literal reference such as `Patient/123`.
    pub fn to(resource_type: &str, id: &str) -> Self {
        Self {
            reference: Some(format!("{resource_type}/{id}")),
            display: None,
        }
    }

    pub fn with_display(mut self, display: &str) -> Self {
        self.display = Some(display.to_owned());
        self
    }
}

/// A time range; only the start is ever populated here.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct Period {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<String>,
}

/// A measured amount with UCUM unit.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct Quantity {
    pub value: f64,
    pub unit: String,
    pub system: String,
    pub code: String,
}

impl Quantity {
    /// A pressure in millimetres of mercury.
    pub fn mm_hg(value: f64) -> Self {
        Self {
            value,
            unit: "mmHg".to_owned(),
            system: "http://unitsofmeasure.org".to_owned(),
            code: "mm[Hg]".to_owned(),
        }
    }
}

/// Narrative summary marker; the destination server generates the XHTML.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct Narrative {
    pub status: String,
}

impl Narrative {
    pub fn generated() -> Self {
        Self {
            status: "generated".to_owned(),
        }
    }
}

/// A free-text element (notes, follow-up instructions).
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct Annotation {
    pub text: String,
}
