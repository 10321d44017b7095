//! Clients for the two FHIR servers.
//!
//! [`SourceServer`] is read-only and authenticated with the bearer token.
//! [`DestinationServer`] only creates resources and needs no credential.

use crate::credentials::AccessToken;
use crate::transport::{HttpRequest, HttpResponse, HttpTransport};
use crate::{BridgeError, BridgeResult};
use fhir::{CreatedResource, SearchBundle};
use std::sync::Arc;
use std::time::Duration;

/// Read access to the source EHR FHIR server.
#[derive(Clone)]
pub struct SourceServer {
    base_url: String,
    token: Option<AccessToken>,
    transport: Arc<dyn HttpTransport>,
}

impl SourceServer {
    pub fn new(
        base_url: impl Into<String>,
        token: Option<AccessToken>,
        transport: Arc<dyn HttpTransport>,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            token,
            transport,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `GET {base}/{path}` with the given query, returning the raw response.
    ///
    /// # Errors
    ///
    /// Only transport failures; any status is returned as-is.
    pub fn get(&self, path: &str, query: &[(&str, &str)]) -> BridgeResult<HttpResponse> {
        let request = query.iter().fold(
            HttpRequest::get(format!("{}/{}", self.base_url, path)),
            |request, (key, value)| request.query(key, value),
        );
        self.send(request)
    }

    /// `GET` an absolute URL (such as a paging link) with an optional timeout.
    pub fn get_url(&self, url: &str, timeout: Option<Duration>) -> BridgeResult<HttpResponse> {
        let mut request = HttpRequest::get(url);
        if let Some(timeout) = timeout {
            request = request.timeout(timeout);
        }
        self.send(request)
    }

    /// `GET` expecting a 2xx status.
    ///
    /// # Errors
    ///
    /// [`BridgeError::RemoteRequestFailed`] for any other status.
    pub fn read(&self, path: &str, query: &[(&str, &str)]) -> BridgeResult<HttpResponse> {
        let response = self.get(path, query)?;
        if !response.is_success() {
            return Err(response.into_failure());
        }
        Ok(response)
    }

    /// Like [`read`](Self::read), decoding the body as JSON.
    ///
    /// # Errors
    ///
    /// Also [`BridgeError::ResponseUnparseable`] for a non-JSON body.
    pub fn read_json(&self, path: &str, query: &[(&str, &str)]) -> BridgeResult<serde_json::Value> {
        self.read(path, query)?.json()
    }

    /// Run a search and decode the searchset bundle.
    pub fn search(
        &self,
        resource_type: &str,
        query: &[(&str, &str)],
    ) -> BridgeResult<SearchBundle> {
        let value = self.read_json(resource_type, query)?;
        Ok(SearchBundle::from_value(value)?)
    }

    fn send(&self, request: HttpRequest) -> BridgeResult<HttpResponse> {
        let request = match &self.token {
            Some(token) => request.header("Authorization", &token.bearer()),
            None => request,
        };
        self.transport.send(&request)
    }
}

/// A resource accepted by the destination server.
#[derive(Clone, Debug, PartialEq)]
pub struct CreatedOnDestination {
    pub resource_type: String,
    /// Server-assigned id; `None` if the server echoed no id.
    pub id: Option<String>,
    /// Full response body as returned by the server.
    pub body: serde_json::Value,
}

/// Write access to the destination Primary Care FHIR server.
#[derive(Clone)]
pub struct DestinationServer {
    base_url: String,
    transport: Arc<dyn HttpTransport>,
}

impl DestinationServer {
    pub fn new(base_url: impl Into<String>, transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            base_url: base_url.into(),
            transport,
        }
    }

    /// `POST {base}/{resource_type}` with `body`.
    ///
    /// # Errors
    ///
    /// - [`BridgeError::RemoteRequestFailed`] unless the status is 200 or 201
    /// - [`BridgeError::ResponseUnparseable`] if the success body is not JSON
    pub fn create(
        &self,
        resource_type: &str,
        body: serde_json::Value,
    ) -> BridgeResult<CreatedOnDestination> {
        let request = HttpRequest::post_json(format!("{}/{}", self.base_url, resource_type), body)
            .header("Accept", "application/json");
        let response = self.transport.send(&request)?;
        if !response.is_created() {
            return Err(response.into_failure());
        }

        let body: serde_json::Value = response.json()?;
        let created = CreatedResource::from_value(body.clone()).map_err(|e| {
            BridgeError::ResponseUnparseable {
                url: response.url.clone(),
                reason: e.to_string(),
            }
        })?;

        Ok(CreatedOnDestination {
            resource_type: created
                .resource_type
                .unwrap_or_else(|| resource_type.to_owned()),
            id: created.id,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::scripted::ScriptedTransport;
    use serde_json::json;

    #[test]
    fn source_requests_carry_bearer_token() {
        let transport =
            Arc::new(ScriptedTransport::new().respond(200, json!({"resourceType": "Bundle"})));
        let token = AccessToken::new("abc").expect("valid token");
        let source = SourceServer::new("https://ehr.example/fhir", Some(token), transport.clone());

        let bundle = source
            .search("Patient", &[("name", "Graham")])
            .expect("search should succeed");
        assert!(bundle.is_empty());

        let sent = transport.requests();
        assert_eq!(sent[0].url, "https://ehr.example/fhir/Patient");
        assert_eq!(sent[0].query_value("name"), Some("Graham"));
        assert_eq!(sent[0].header_value("Authorization"), Some("Bearer abc"));
    }

    #[test]
    fn source_without_token_sends_no_authorization() {
        let transport = Arc::new(
            ScriptedTransport::new().respond(401, json!({"error": "invalid_token"})),
        );
        let source = SourceServer::new("https://ehr.example/fhir", None, transport.clone());

        let err = source
            .read_json("Patient/1", &[])
            .expect_err("401 should fail");
        assert!(matches!(err, BridgeError::RemoteRequestFailed { status: 401, .. }));
        assert!(transport.requests()[0].header_value("Authorization").is_none());
    }

    #[test]
    fn destination_create_accepts_201() {
        let transport = Arc::new(
            ScriptedTransport::new().respond(201, json!({"resourceType": "Patient", "id": "4821"})),
        );
        let destination = DestinationServer::new("http://pc.example/fhir", transport.clone());

        let created = destination
            .create("Patient", json!({"resourceType": "Patient"}))
            .expect("create should succeed");
        assert_eq!(created.id.as_deref(), Some("4821"));
        assert_eq!(created.resource_type, "Patient");

        let sent = transport.posts();
        assert_eq!(sent[0].url, "http://pc.example/fhir/Patient");
        assert_eq!(sent[0].header_value("Accept"), Some("application/json"));
        assert_eq!(sent[0].body, Some(json!({"resourceType": "Patient"})));
    }

    #[test]
    fn destination_rejection_is_remote_failure() {
        let transport = Arc::new(ScriptedTransport::new().respond_raw(422, "{\"issue\": []}"));
        let destination = DestinationServer::new("http://pc.example/fhir", transport);

        let err = destination
            .create("Condition", json!({}))
            .expect_err("422 should fail");
        match err {
            BridgeError::RemoteRequestFailed { status, body, .. } => {
                assert_eq!(status, 422);
                assert!(body.contains("issue"));
            }
            other => panic!("expected RemoteRequestFailed, got {other:?}"),
        }
    }
}
