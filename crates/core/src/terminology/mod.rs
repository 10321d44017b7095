//! SNOMED CT terminology lookups.
//!
//! The terminology server answers `GET {base}/search?constraint=<ECL>` with a JSON array
//! of `{conceptId, preferredTerm, ...}` objects and `GET {base}/concepts/{id}` with a
//! single concept. Concept ids may arrive as JSON numbers or strings; both are accepted.

pub mod catalogue;
pub mod ecl;

pub use ecl::{build_constraint, Direction, Ecl};

use crate::constants::NO_DESCRIPTION_AVAILABLE;
use crate::transport::{HttpRequest, HttpTransport};
use crate::BridgeResult;
use serde::Deserialize;
use std::sync::Arc;

/// A concept resolved from a terminology query.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SnomedConceptRef {
    pub concept_id: String,
    pub preferred_term: String,
}

/// A concept fetched by id.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConceptDetail {
    pub id: String,
    pub term: String,
}

#[derive(Deserialize)]
struct SearchHitWire {
    #[serde(rename = "conceptId")]
    concept_id: serde_json::Value,

    #[serde(rename = "preferredTerm", default)]
    preferred_term: Option<String>,
}

#[derive(Deserialize)]
struct ConceptWire {
    #[serde(default)]
    id: serde_json::Value,

    #[serde(rename = "preferredDescription", default)]
    preferred_description: Option<DescriptionWire>,
}

#[derive(Deserialize)]
struct DescriptionWire {
    #[serde(default)]
    term: Option<String>,
}

/// Client for the terminology server.
#[derive(Clone)]
pub struct TerminologyClient {
    base_url: String,
    transport: Arc<dyn HttpTransport>,
}

impl TerminologyClient {
    pub fn new(base_url: impl Into<String>, transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            base_url: base_url.into(),
            transport,
        }
    }

    /// First concept matching `constraint`.
    ///
    /// Returns `Ok(None)` when the server rejects the query (the status and body are
    /// logged) or when no concept matches. The first array entry wins regardless of
    /// how the rest are ordered.
    ///
    /// # Errors
    ///
    /// Network failures and unparseable bodies.
    pub fn resolve(&self, constraint: &Ecl) -> BridgeResult<Option<SnomedConceptRef>> {
        Ok(self
            .search_hits(constraint)?
            .and_then(|hits| hits.into_iter().next()))
    }

    /// Every concept matching `constraint`, in server order.
    ///
    /// A rejected query yields an empty list.
    pub fn search(&self, constraint: &Ecl) -> BridgeResult<Vec<SnomedConceptRef>> {
        Ok(self.search_hits(constraint)?.unwrap_or_default())
    }

    /// Resolve the direct parent or child of `concept_id`.
    pub fn neighbour(
        &self,
        concept_id: &str,
        direction: Direction,
    ) -> BridgeResult<Option<SnomedConceptRef>> {
        self.resolve(&build_constraint(concept_id, direction))
    }

    /// Fetch a single concept.
    ///
    /// # Errors
    ///
    /// [`crate::BridgeError::RemoteRequestFailed`] for a non-200 status, plus network
    /// and parse failures.
    pub fn concept(&self, concept_id: &str) -> BridgeResult<ConceptDetail> {
        let request = HttpRequest::get(format!(
            "{}/concepts/{}",
            self.base_url,
            concept_id.trim()
        ));
        let response = self.transport.send(&request)?;
        if !response.is_ok() {
            return Err(response.into_failure());
        }

        let wire: ConceptWire = response.json()?;
        let term = wire
            .preferred_description
            .and_then(|d| d.term)
            .unwrap_or_else(|| NO_DESCRIPTION_AVAILABLE.to_owned());
        Ok(ConceptDetail {
            id: id_text(&wire.id),
            term,
        })
    }

    fn search_hits(&self, constraint: &Ecl) -> BridgeResult<Option<Vec<SnomedConceptRef>>> {
        let request = HttpRequest::get(format!("{}/search", self.base_url))
            .query("constraint", constraint.as_str());
        let response = self.transport.send(&request)?;
        if !response.is_ok() {
            tracing::warn!(
                "terminology search rejected with status {}: {}",
                response.status,
                response.body
            );
            return Ok(None);
        }

        let hits: Vec<SearchHitWire> = response.json()?;
        tracing::debug!("{} concepts match {}", hits.len(), constraint);
        Ok(Some(
            hits.into_iter()
                .map(|hit| SnomedConceptRef {
                    concept_id: id_text(&hit.concept_id),
                    preferred_term: hit.preferred_term.unwrap_or_default(),
                })
                .collect(),
        ))
    }
}

fn id_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::scripted::ScriptedTransport;
    use crate::BridgeError;
    use serde_json::json;

    const BASE: &str = "http://tx.example/v1/snomed";

    fn client(transport: &Arc<ScriptedTransport>) -> TerminologyClient {
        TerminologyClient::new(BASE, transport.clone())
    }

    #[test]
    fn resolve_takes_first_entry() {
        let transport = Arc::new(ScriptedTransport::new().respond(
            200,
            json!([
                {"conceptId": 18526009, "preferredTerm": "Disorder of appendix"},
                {"conceptId": "302168000", "preferredTerm": "Inflamed appendix"}
            ]),
        ));

        let resolved = client(&transport)
            .neighbour("74400008", Direction::Ancestor)
            .expect("request succeeds")
            .expect("one match");
        assert_eq!(resolved.concept_id, "18526009");
        assert_eq!(resolved.preferred_term, "Disorder of appendix");

        let sent = transport.requests();
        assert_eq!(sent[0].url, "http://tx.example/v1/snomed/search");
        assert_eq!(
            sent[0].query_value("constraint"),
            Some(">! 74400008 | Parent |")
        );
    }

    #[test]
    fn resolve_ignores_order_of_remaining_entries() {
        let first = json!({"conceptId": "1", "preferredTerm": "first"});
        let transport = Arc::new(
            ScriptedTransport::new()
                .respond(200, json!([first, {"conceptId": "2"}, {"conceptId": "3"}]))
                .respond(200, json!([first, {"conceptId": "3"}, {"conceptId": "2"}])),
        );
        let client = client(&transport);
        let ecl = build_constraint("9", Direction::Descendant);

        let a = client.resolve(&ecl).expect("ok").expect("match");
        let b = client.resolve(&ecl).expect("ok").expect("match");
        assert_eq!(a, b);
        assert_eq!(a.concept_id, "1");
    }

    #[test]
    fn empty_result_is_no_match() {
        let transport = Arc::new(ScriptedTransport::new().respond(200, json!([])));
        let resolved = client(&transport)
            .neighbour("74400008", Direction::Descendant)
            .expect("request succeeds");
        assert!(resolved.is_none());
    }

    #[test]
    fn rejected_query_is_no_match() {
        let transport = Arc::new(
            ScriptedTransport::new().respond(400, json!({"error": "invalid constraint"})),
        );
        let ecl = Ecl::new("<< nonsense").expect("ecl");
        assert!(client(&transport).resolve(&ecl).expect("not an error").is_none());
    }

    #[test]
    fn unparseable_body_is_an_error() {
        let transport = Arc::new(ScriptedTransport::new().respond_raw(200, "<html>"));
        let ecl = Ecl::new("< 65413006 | Caries |").expect("ecl");
        assert!(matches!(
            client(&transport).resolve(&ecl),
            Err(BridgeError::ResponseUnparseable { .. })
        ));
    }

    #[test]
    fn search_returns_every_entry() {
        let transport = Arc::new(ScriptedTransport::new().respond(
            200,
            json!([
                {"conceptId": 80967001, "preferredTerm": "Dental caries"},
                {"conceptId": 109570002, "preferredTerm": "Root caries"}
            ]),
        ));
        let ecl = Ecl::new("< 65413006 | Caries |").expect("ecl");
        let hits = client(&transport).search(&ecl).expect("search");
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[1].preferred_term, "Root caries");
    }

    #[test]
    fn concept_defaults_missing_description() {
        let transport = Arc::new(
            ScriptedTransport::new()
                .respond(
                    200,
                    json!({"id": 271737000, "preferredDescription": {"term": "Anemia"}}),
                )
                .respond(200, json!({"id": "271737000"})),
        );
        let client = client(&transport);

        let described = client.concept("271737000").expect("concept");
        assert_eq!(described.id, "271737000");
        assert_eq!(described.term, "Anemia");

        let bare = client.concept("271737000").expect("concept");
        assert_eq!(bare.term, "No description available");
        assert_eq!(
            transport.requests()[0].url,
            "http://tx.example/v1/snomed/concepts/271737000"
        );
    }

    #[test]
    fn concept_not_found_is_remote_failure() {
        let transport = Arc::new(ScriptedTransport::new().respond(404, json!({})));
        assert!(matches!(
            client(&transport).concept("0"),
            Err(BridgeError::RemoteRequestFailed { status: 404, .. })
        ));
    }
}
