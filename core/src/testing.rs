//! In-memory transport for unit tests.

use std::cell::RefCell;
use std::collections::VecDeque;

use serde_json::Value;

use crate::auth::Credentials;
use crate::client::TestRailClient;
use crate::http::{HttpRequest, HttpResponse, Transport, TransportError};

pub(crate) type Reply = Result<HttpResponse, TransportError>;

/// Records every request and answers from a queue; an empty queue answers
/// 200 with an empty body.
#[derive(Default)]
pub(crate) struct MockTransport {
    requests: RefCell<Vec<HttpRequest>>,
    replies: RefCell<VecDeque<Reply>>,
}

impl MockTransport {
    pub(crate) fn with_responses(replies: Vec<Reply>) -> Self {
        Self {
            requests: RefCell::new(Vec::new()),
            replies: RefCell::new(replies.into()),
        }
    }

    pub(crate) fn requests(&self) -> Vec<HttpRequest> {
        self.requests.borrow().clone()
    }

    pub(crate) fn last_request(&self) -> HttpRequest {
        self.requests.borrow().last().cloned().expect("no request was sent")
    }
}

impl Transport for MockTransport {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        self.requests.borrow_mut().push(request.clone());
        self.replies
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| status(200, ""))
    }
}

pub(crate) fn client_with(transport: MockTransport) -> TestRailClient<MockTransport> {
    TestRailClient::with_transport("https://tr.example", Credentials::new("alice", "k1"), transport)
}

pub(crate) fn status(code: u16, body: &str) -> Reply {
    Ok(HttpResponse {
        status: code,
        headers: Vec::new(),
        body: body.to_string(),
    })
}

pub(crate) fn ok(body: Value) -> Reply {
    status(200, &body.to_string())
}
