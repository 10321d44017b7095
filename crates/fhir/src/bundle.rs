//! Searchset bundles and create responses.
//!
//! Search results are kept as raw JSON resources; callers pick the typed view they
//! need (`Patient::summarise`, `Condition::parse_source`, ...). Paging follows the
//! `next` relation of the bundle's `link` array.

use crate::{from_value, parse_json, FhirResult};
use serde::Deserialize;

/// One page of search results.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct SearchBundle {
    #[serde(default)]
    pub entry: Vec<BundleEntry>,

    #[serde(default)]
    pub link: Vec<BundleLink>,
}

/// A single search hit.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct BundleEntry {
    #[serde(default, rename = "fullUrl")]
    pub full_url: Option<String>,

    #[serde(default)]
    pub resource: serde_json::Value,
}

/// A paging link (`self`, `next`, `previous`, ...).
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct BundleLink {
    #[serde(default)]
    pub relation: String,

    pub url: String,
}

impl SearchBundle {
    /// Parse a searchset bundle. Absent `entry`/`link` arrays decode as empty.
    ///
    /// # Errors
    ///
    /// Returns [`crate::FhirError`] when the text is not JSON or the arrays have the
    /// wrong shape.
    pub fn parse(json_text: &str) -> FhirResult<Self> {
        parse_json(json_text, "Bundle")
    }

    /// Build from an already-decoded response body.
    pub fn from_value(value: serde_json::Value) -> FhirResult<Self> {
        from_value(value, "Bundle")
    }

    pub fn is_empty(&self) -> bool {
        self.entry.is_empty()
    }

    /// The resources of every entry, in server order.
    pub fn resources(&self) -> impl Iterator<Item = &serde_json::Value> {
        self.entry.iter().map(|e| &e.resource)
    }

    /// The first entry's resource.
    ///
    /// Server ordering is not a clinical ranking; "first" only means first returned.
    pub fn first_resource(&self) -> Option<&serde_json::Value> {
        self.entry.first().map(|e| &e.resource)
    }

    /// URL of the next page, if the server advertised one.
    pub fn next_url(&self) -> Option<&str> {
        self.link
            .iter()
            .find(|l| l.relation == "next")
            .map(|l| l.url.as_str())
    }
}

/// Minimal view of a create (POST) response.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct CreatedResource {
    #[serde(rename = "resourceType", default)]
    pub resource_type: Option<String>,

    #[serde(default)]
    pub id: Option<String>,
}

impl CreatedResource {
    /// Parse the body of a create response.
    pub fn parse(json_text: &str) -> FhirResult<Self> {
        parse_json(json_text, "created resource")
    }

    /// Build from an already-decoded response body.
    pub fn from_value(value: serde_json::Value) -> FhirResult<Self> {
        from_value(value, "created resource")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_searchset_has_no_entries() {
        let bundle =
            SearchBundle::parse(r#"{"resourceType": "Bundle", "type": "searchset", "total": 0}"#)
                .expect("parse bundle");
        assert!(bundle.is_empty());
        assert!(bundle.first_resource().is_none());
        assert!(bundle.next_url().is_none());
    }

    #[test]
    fn next_url_uses_next_relation_only() {
        let bundle = SearchBundle::parse(
            r#"{
                "resourceType": "Bundle",
                "link": [
                    {"relation": "self", "url": "https://ehr.example/fhir/Patient"},
                    {"relation": "next", "url": "https://ehr.example/fhir/Patient?_page=2"}
                ],
                "entry": [{"resource": {"resourceType": "Patient", "id": "a"}}]
            }"#,
        )
        .expect("parse bundle");
        assert_eq!(
            bundle.next_url(),
            Some("https://ehr.example/fhir/Patient?_page=2")
        );

        let last_page = SearchBundle::parse(
            r#"{"link": [{
                "relation": "self",
                "url": "https://ehr.example/fhir/Patient?_page=2"
            }]}"#,
        )
        .expect("parse bundle");
        assert!(last_page.next_url().is_none());
    }

    #[test]
    fn resources_keep_server_order() {
        let bundle = SearchBundle::parse(
            r#"{"entry": [
                {"resource": {"id": "second-oldest"}},
                {"resource": {"id": "oldest"}},
                {"resource": {"id": "newest"}}
            ]}"#,
        )
        .expect("parse bundle");
        let ids: Vec<_> = bundle
            .resources()
            .map(|r| r["id"].as_str().expect("id"))
            .collect();
        assert_eq!(ids, ["second-oldest", "oldest", "newest"]);
        assert_eq!(
            bundle.first_resource().expect("first")["id"],
            "second-oldest"
        );
    }

    #[test]
    fn created_resource_id() {
        let created =
            CreatedResource::parse(r#"{"resourceType": "Patient", "id": "4821", "active": true}"#)
                .expect("parse");
        assert_eq!(created.id.as_deref(), Some("4821"));
        assert_eq!(created.resource_type.as_deref(), Some("Patient"));
    }
}
