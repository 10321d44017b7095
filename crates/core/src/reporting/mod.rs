//! Read-only queries against the source EHR server.
//!
//! Summaries are flattened leniently: a patient without a name or a condition without
//! a coding still produces a row, with empty strings where data is missing.

pub mod ages;

pub use ages::{calculate_age, AgeHistogram};

use crate::constants::PAGINATION_REQUEST_TIMEOUT;
use crate::servers::SourceServer;
use crate::{BridgeError, BridgeResult};
use chrono::NaiveDate;
use fhir::{
    BundleEntry, Condition, ConditionSummary, Observation, ObservationSummary, Patient,
    PatientSummary, SearchBundle,
};
use std::collections::HashSet;

/// Patient search parameters. Unset fields are not sent.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PatientCriteria {
    pub name: Option<String>,
    pub gender: Option<String>,
    /// Substring matched anywhere in the address (`address:contains`).
    pub address_contains: Option<String>,
    /// Exact birth date, `YYYY-MM-DD`.
    pub born_on: Option<String>,
    /// Birth date strictly after this date (`birthdate=gt...`).
    pub born_after: Option<String>,
}

impl PatientCriteria {
    fn query(&self) -> Vec<(&'static str, String)> {
        let mut query = Vec::new();
        if let Some(name) = &self.name {
            query.push(("name", name.clone()));
        }
        if let Some(gender) = &self.gender {
            query.push(("gender", gender.clone()));
        }
        if let Some(text) = &self.address_contains {
            query.push(("address:contains", text.clone()));
        }
        if let Some(date) = &self.born_on {
            query.push(("birthdate", date.clone()));
        }
        if let Some(date) = &self.born_after {
            query.push(("birthdate", format!("gt{date}")));
        }
        query
    }
}

/// A patient search page with its flattened rows.
#[derive(Clone, Debug, PartialEq)]
pub struct PatientSearch {
    pub bundle: SearchBundle,
    pub rows: Vec<PatientSummary>,
}

/// Report queries over the source server.
pub struct SourceQueries {
    source: SourceServer,
}

impl SourceQueries {
    pub fn new(source: SourceServer) -> Self {
        Self { source }
    }

    /// `GET Patient/{id}` as raw JSON.
    pub fn fetch_patient(&self, id: &str) -> BridgeResult<serde_json::Value> {
        self.source.read_json(&format!("Patient/{id}"), &[])
    }

    /// `GET {resource_type}` (for example `Observation` or `Encounter`) as raw JSON.
    pub fn fetch_resource(&self, resource_type: &str) -> BridgeResult<serde_json::Value> {
        self.source.read_json(resource_type, &[])
    }

    pub fn search_patients(&self, criteria: &PatientCriteria) -> BridgeResult<PatientSearch> {
        let query = criteria.query();
        let query: Vec<(&str, &str)> = query.iter().map(|(k, v)| (*k, v.as_str())).collect();
        let bundle = self.source.search("Patient", &query)?;
        let rows = bundle.resources().map(Patient::summarise).collect();
        Ok(PatientSearch { bundle, rows })
    }

    pub fn search_patients_by_name(&self, name: &str) -> BridgeResult<PatientSearch> {
        self.search_patients(&PatientCriteria {
            name: Some(name.to_owned()),
            ..PatientCriteria::default()
        })
    }

    pub fn search_patients_by_name_and_gender(
        &self,
        name: &str,
        gender: &str,
    ) -> BridgeResult<PatientSearch> {
        self.search_patients(&PatientCriteria {
            name: Some(name.to_owned()),
            gender: Some(gender.to_owned()),
            ..PatientCriteria::default()
        })
    }

    pub fn search_patients_where_address_contains(
        &self,
        text: &str,
    ) -> BridgeResult<PatientSearch> {
        self.search_patients(&PatientCriteria {
            address_contains: Some(text.to_owned()),
            ..PatientCriteria::default()
        })
    }

    pub fn search_patients_born_on(&self, date: &str) -> BridgeResult<PatientSearch> {
        self.search_patients(&PatientCriteria {
            born_on: Some(date.to_owned()),
            ..PatientCriteria::default()
        })
    }

    pub fn search_patients_born_after(&self, date: &str) -> BridgeResult<PatientSearch> {
        self.search_patients(&PatientCriteria {
            born_after: Some(date.to_owned()),
            ..PatientCriteria::default()
        })
    }

    /// Conditions recorded for a source patient.
    pub fn search_conditions(&self, patient_id: &str) -> BridgeResult<Vec<ConditionSummary>> {
        let bundle = self
            .source
            .search("Condition", &[("patient", patient_id)])?;
        Ok(bundle.resources().map(Condition::summarise).collect())
    }

    /// Blood-pressure panel observations for a source patient.
    ///
    /// # Errors
    ///
    /// [`BridgeError::RemoteRequestFailed`] for a non-2xx status.
    pub fn search_vital_sign_observations(
        &self,
        patient_id: &str,
    ) -> BridgeResult<Vec<ObservationSummary>> {
        let code = Observation::blood_pressure_code_param();
        let bundle = self
            .source
            .search("Observation", &[("patient", patient_id), ("code", code.as_str())])?;
        Ok(bundle.resources().map(Observation::summarise).collect())
    }

    /// Every Patient entry on the server, following `next` links page by page.
    ///
    /// Each page request may take up to three minutes. A timeout, network error,
    /// non-200 status, unparseable page or repeated link ends the walk; whatever was
    /// collected up to that point is returned.
    pub fn fetch_all_patients(&self) -> Vec<BundleEntry> {
        let mut url = format!("{}/Patient", self.source.base_url());
        let mut visited = HashSet::new();
        let mut entries = Vec::new();

        loop {
            if !visited.insert(url.clone()) {
                tracing::warn!("stopping pagination: {url} was already fetched");
                break;
            }

            let response = match self.source.get_url(&url, Some(PAGINATION_REQUEST_TIMEOUT)) {
                Ok(response) => response,
                Err(e) => {
                    tracing::warn!("stopping pagination: {e}");
                    break;
                }
            };
            if !response.is_ok() {
                tracing::warn!(
                    "stopping pagination: {url} returned status {}: {}",
                    response.status,
                    response.body
                );
                break;
            }

            let page = match response
                .json::<serde_json::Value>()
                .and_then(|value| SearchBundle::from_value(value).map_err(BridgeError::from))
            {
                Ok(page) => page,
                Err(e) => {
                    tracing::warn!("stopping pagination: {e}");
                    break;
                }
            };

            let next = page.next_url().map(str::to_owned);
            tracing::debug!("{} patients on page {url}", page.entry.len());
            entries.extend(page.entry);

            match next {
                Some(next) => url = next,
                None => break,
            }
        }

        tracing::info!("fetched {} patients", entries.len());
        entries
    }

    /// Age distribution of every patient on the server as of `today`.
    ///
    /// Patients without a parseable `birthDate` are counted as unknown.
    pub fn age_histogram(&self, today: NaiveDate) -> AgeHistogram {
        histogram_of(&self.fetch_all_patients(), today)
    }
}

/// Bin the `birthDate` of each Patient entry.
pub fn histogram_of(entries: &[BundleEntry], today: NaiveDate) -> AgeHistogram {
    let mut histogram = AgeHistogram::new();
    for entry in entries {
        let age = entry
            .resource
            .get("birthDate")
            .and_then(|v| v.as_str())
            .map(|birth_date| calculate_age(birth_date, today));
        match age {
            Some(Ok(age)) => histogram.record(age),
            Some(Err(e)) => {
                tracing::debug!("skipping patient age: {e}");
                histogram.record_unknown();
            }
            None => histogram.record_unknown(),
        }
    }
    histogram
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::scripted::ScriptedTransport;
    use serde_json::json;
    use std::sync::Arc;

    const BASE: &str = "https://ehr.example/fhir";

    fn queries(transport: &Arc<ScriptedTransport>) -> SourceQueries {
        SourceQueries::new(SourceServer::new(BASE, None, transport.clone()))
    }

    fn patient(id: &str, birth_date: &str) -> serde_json::Value {
        json!({"resource": {"resourceType": "Patient", "id": id, "birthDate": birth_date}})
    }

    #[test]
    fn pagination_follows_next_link_until_absent() {
        let transport = Arc::new(
            ScriptedTransport::new()
                .respond(
                    200,
                    json!({
                        "resourceType": "Bundle",
                        "link": [
                            {"relation": "self", "url": format!("{BASE}/Patient")},
                            {"relation": "next", "url": format!("{BASE}/Patient?_page=2")}
                        ],
                        "entry": [patient("a", "1990-01-01"), patient("b", "1950-05-05")]
                    }),
                )
                .respond(
                    200,
                    json!({"resourceType": "Bundle", "entry": [patient("c", "2010-07-07")]}),
                ),
        );

        let entries = queries(&transport).fetch_all_patients();
        let ids: Vec<_> = entries
            .iter()
            .map(|e| e.resource["id"].as_str().expect("id"))
            .collect();
        assert_eq!(ids, ["a", "b", "c"]);

        let sent = transport.requests();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[1].url, format!("{BASE}/Patient?_page=2"));
        assert_eq!(sent[1].timeout, Some(PAGINATION_REQUEST_TIMEOUT));
        assert_eq!(transport.remaining(), 0);
    }

    #[test]
    fn pagination_keeps_pages_read_before_a_failure() {
        let transport = Arc::new(
            ScriptedTransport::new()
                .respond(
                    200,
                    json!({
                        "link": [{"relation": "next", "url": format!("{BASE}/Patient?_page=2")}],
                        "entry": [patient("a", "1990-01-01")]
                    }),
                )
                .fail(BridgeError::RemoteRequestTimedOut {
                    url: format!("{BASE}/Patient?_page=2"),
                }),
        );

        let entries = queries(&transport).fetch_all_patients();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn pagination_stops_on_error_status_and_repeated_link() {
        let rejected = Arc::new(ScriptedTransport::new().respond(401, json!({})));
        assert!(queries(&rejected).fetch_all_patients().is_empty());

        let looping = Arc::new(ScriptedTransport::new().respond(
            200,
            json!({
                "link": [{"relation": "next", "url": format!("{BASE}/Patient")}],
                "entry": [patient("a", "1990-01-01")]
            }),
        ));
        assert_eq!(queries(&looping).fetch_all_patients().len(), 1);
        assert_eq!(looping.requests().len(), 1);
    }

    #[test]
    fn patient_search_builds_query_and_rows() {
        let transport = Arc::new(ScriptedTransport::new().respond(
            200,
            json!({"entry": [{"resource": {
                "resourceType": "Patient",
                "id": "p1",
                "gender": "male",
                "name": [{"family": "Smith", "given": ["John"]}]
            }}]}),
        ));

        let search = queries(&transport)
            .search_patients(&PatientCriteria {
                name: Some("Smith".into()),
                gender: Some("male".into()),
                born_after: Some("1980-01-01".into()),
                ..PatientCriteria::default()
            })
            .expect("search");

        assert_eq!(search.rows.len(), 1);
        assert_eq!(search.rows[0].family, "Smith");
        assert_eq!(search.rows[0].birth_date, "");

        let sent = &transport.requests()[0];
        assert_eq!(sent.query_value("name"), Some("Smith"));
        assert_eq!(sent.query_value("gender"), Some("male"));
        assert_eq!(sent.query_value("birthdate"), Some("gt1980-01-01"));
    }

    #[test]
    fn address_search_uses_contains_modifier() {
        let transport = Arc::new(ScriptedTransport::new().respond(200, json!({})));
        let search = queries(&transport)
            .search_patients_where_address_contains("Indianapolis")
            .expect("search");
        assert!(search.rows.is_empty());
        assert_eq!(
            transport.requests()[0].query_value("address:contains"),
            Some("Indianapolis")
        );
    }

    fn sent_query(transport: &ScriptedTransport) -> Vec<(String, String)> {
        transport.requests()[0].query.clone()
    }

    fn pair(key: &str, value: &str) -> (String, String) {
        (key.to_owned(), value.to_owned())
    }

    #[test]
    fn name_search_sends_only_the_name() {
        let transport = Arc::new(ScriptedTransport::new().respond(200, json!({})));
        queries(&transport)
            .search_patients_by_name("Graham")
            .expect("search");
        assert_eq!(transport.requests()[0].url, format!("{BASE}/Patient"));
        assert_eq!(sent_query(&transport), vec![pair("name", "Graham")]);
    }

    #[test]
    fn name_and_gender_search_sends_both() {
        let transport = Arc::new(ScriptedTransport::new().respond(200, json!({})));
        queries(&transport)
            .search_patients_by_name_and_gender("Graham", "female")
            .expect("search");
        assert_eq!(
            sent_query(&transport),
            vec![pair("name", "Graham"), pair("gender", "female")]
        );
    }

    #[test]
    fn born_on_search_matches_the_exact_date() {
        let transport = Arc::new(ScriptedTransport::new().respond(200, json!({})));
        queries(&transport)
            .search_patients_born_on("1984-03-22")
            .expect("search");
        assert_eq!(sent_query(&transport), vec![pair("birthdate", "1984-03-22")]);
    }

    #[test]
    fn born_after_search_uses_gt_prefix() {
        let transport = Arc::new(ScriptedTransport::new().respond(200, json!({})));
        queries(&transport)
            .search_patients_born_after("1980-01-01")
            .expect("search");
        assert_eq!(sent_query(&transport), vec![pair("birthdate", "gt1980-01-01")]);
    }

    #[test]
    fn vital_signs_filter_by_panel_code() {
        let transport = Arc::new(ScriptedTransport::new().respond(
            200,
            json!({"entry": [{"resource": {
                "resourceType": "Observation",
                "id": "o1",
                "status": "final",
                "code": {"coding": [{"code": "85354-9"}]}
            }}]}),
        ));
        let rows = queries(&transport)
            .search_vital_sign_observations("p1")
            .expect("observations");
        assert_eq!(rows[0].code, "85354-9");

        let sent = &transport.requests()[0];
        assert_eq!(sent.url, format!("{BASE}/Observation"));
        assert_eq!(sent.query_value("code"), Some("http://loinc.org|85354-9"));
    }

    #[test]
    fn vital_signs_error_status_is_remote_failure() {
        let transport = Arc::new(ScriptedTransport::new().respond(403, json!({})));
        assert!(matches!(
            queries(&transport).search_vital_sign_observations("p1"),
            Err(BridgeError::RemoteRequestFailed { status: 403, .. })
        ));
    }

    #[test]
    fn condition_rows_tolerate_missing_codes() {
        let transport = Arc::new(ScriptedTransport::new().respond(
            200,
            json!({"entry": [
                {"resource": {
                    "resourceType": "Condition",
                    "id": "c1",
                    "code": {"coding": [{"code": "74400008"}]}
                }},
                {"resource": {"resourceType": "Condition", "id": "c2"}}
            ]}),
        ));
        let rows = queries(&transport).search_conditions("p1").expect("conditions");
        assert_eq!(rows[0].code, "74400008");
        assert_eq!(rows[1].id, "c2");
        assert_eq!(rows[1].code, "");
    }

    #[test]
    fn histogram_counts_unknown_birth_dates() {
        let entries: Vec<BundleEntry> = serde_json::from_value(json!([
            {"resource": {"birthDate": "2000-06-15"}},
            {"resource": {"birthDate": "not-a-date"}},
            {"resource": {}}
        ]))
        .expect("entries");
        let today = NaiveDate::from_ymd_opt(2024, 6, 15).expect("date");

        let histogram = histogram_of(&entries, today);
        assert_eq!(histogram.charted(), 1);
        assert_eq!(histogram.unknown(), 2);
        assert_eq!(histogram.bins().nth(4), Some((20, 24, 1)));
    }
}
