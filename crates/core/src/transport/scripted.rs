//! Replays canned responses in order and records every request.

use super::{HttpRequest, HttpResponse, HttpTransport, Method};
use crate::{BridgeError, BridgeResult};
use std::collections::VecDeque;
use std::sync::Mutex;

#[derive(Default)]
pub(crate) struct ScriptedTransport {
    replies: Mutex<VecDeque<BridgeResult<(u16, String)>>>,
    sent: Mutex<Vec<HttpRequest>>,
}

impl ScriptedTransport {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Queue a response with `status` and a JSON `body`.
    pub(crate) fn respond(self, status: u16, body: serde_json::Value) -> Self {
        self.respond_raw(status, &body.to_string())
    }

    pub(crate) fn respond_raw(self, status: u16, body: &str) -> Self {
        self.replies
            .lock()
            .expect("replies lock")
            .push_back(Ok((status, body.to_owned())));
        self
    }

    /// Queue a transport-level failure.
    pub(crate) fn fail(self, err: BridgeError) -> Self {
        self.replies.lock().expect("replies lock").push_back(Err(err));
        self
    }

    pub(crate) fn requests(&self) -> Vec<HttpRequest> {
        self.sent.lock().expect("sent lock").clone()
    }

    pub(crate) fn posts(&self) -> Vec<HttpRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.method == Method::Post)
            .collect()
    }

    pub(crate) fn remaining(&self) -> usize {
        self.replies.lock().expect("replies lock").len()
    }
}

impl HttpTransport for ScriptedTransport {
    fn send(&self, request: &HttpRequest) -> BridgeResult<HttpResponse> {
        self.sent.lock().expect("sent lock").push(request.clone());
        let reply = self
            .replies
            .lock()
            .expect("replies lock")
            .pop_front()
            .unwrap_or_else(|| {
                Err(BridgeError::RemoteUnreachable {
                    url: request.url.clone(),
                    reason: "no scripted response left".into(),
                })
            })?;

        let (status, body) = reply;
        Ok(HttpResponse {
            url: request.url.clone(),
            status,
            body,
        })
    }
}
