//! Request dispatcher for the TestRail v2 API.
//!
//! # Design
//! `TestRailClient` owns the normalized API URL, the Basic-auth header and a
//! `Transport`. Every operation goes through `send_request`, which is split
//! into `build_request` (pure) and `parse_response` (pure) around a single
//! `Transport::execute` call. There is no retry and no state kept between
//! calls; the endpoint wrappers in `crate::endpoints` only pick a verb and a
//! URI.

use std::fmt;

use serde_json::Value;
use tracing::{debug, warn};

use crate::auth::Credentials;
use crate::config::TestRailConfig;
use crate::error::{ApiError, Result};
use crate::http::{HttpMethod, HttpRequest, HttpResponse, Transport, UreqTransport};
use crate::types::JsonObject;

/// Fixed path prefix of every API call, appended to the instance URL.
pub const API_PREFIX: &str = "index.php?/api/v2/";

/// Blocking client for one TestRail instance.
///
/// Each call performs exactly one HTTP round-trip. The client is safe to
/// reuse for sequential calls; concurrent callers should use one client each
/// or serialize access.
#[derive(Clone)]
pub struct TestRailClient<T = UreqTransport> {
    api_url: String,
    credentials: Credentials,
    authorization: String,
    transport: T,
}

impl TestRailClient<UreqTransport> {
    /// Create a client using a pooled `ureq` agent. No network I/O happens here.
    pub fn new(base_url: &str, username: &str, api_key: &str) -> Self {
        Self::with_transport(base_url, Credentials::new(username, api_key), UreqTransport::new())
    }

    pub fn from_config(config: &TestRailConfig) -> Self {
        Self::new(&config.base_url, &config.username, &config.api_key)
    }
}

impl<T> TestRailClient<T> {
    pub fn with_transport(base_url: &str, credentials: Credentials, transport: T) -> Self {
        let authorization = credentials.authorization_header();
        Self {
            api_url: api_url(base_url),
            credentials,
            authorization,
            transport,
        }
    }

    /// Normalized `<base>/index.php?/api/v2/` prefix.
    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Build the request for `method` on `uri` without sending it.
    ///
    /// `params` only apply to GET; null entries are dropped. `data` only
    /// applies to POST and PUT, and an empty object sends no body.
    pub fn build_request(
        &self,
        method: &str,
        uri: &str,
        data: Option<&JsonObject>,
        params: Option<&JsonObject>,
    ) -> Result<HttpRequest> {
        let method: HttpMethod = method.parse()?;

        let mut url = format!("{}{uri}", self.api_url);
        if method == HttpMethod::Get {
            if let Some(params) = params {
                append_query(&mut url, params);
            }
        }

        let body = match method {
            HttpMethod::Post | HttpMethod::Put => match data.filter(|d| !d.is_empty()) {
                Some(data) => Some(
                    serde_json::to_string(data).map_err(|e| ApiError::Serialization(e.to_string()))?,
                ),
                None => None,
            },
            HttpMethod::Get | HttpMethod::Delete => None,
        };

        Ok(HttpRequest {
            method,
            url,
            headers: vec![
                ("Authorization".to_string(), self.authorization.clone()),
                ("Content-Type".to_string(), "application/json".to_string()),
            ],
            body,
        })
    }

    /// Interpret a response to a request sent to `url`.
    ///
    /// Any status below 300 is success: the decoded body, or an empty object
    /// when the body is empty.
    pub fn parse_response(
        &self,
        url: &str,
        params: Option<&JsonObject>,
        response: HttpResponse,
    ) -> Result<Value> {
        if response.status >= 300 {
            let error = match serde_json::from_str::<Value>(&response.body) {
                Ok(decoded) => decoded.to_string(),
                Err(_) => response.body,
            };
            return Err(ApiError::RemoteRequestFailed {
                status: Some(response.status),
                error,
                url: url.to_string(),
                params: original_params(params),
            });
        }

        if response.body.is_empty() {
            return Ok(Value::Object(JsonObject::new()));
        }
        serde_json::from_str(&response.body).map_err(|e| ApiError::Deserialization(e.to_string()))
    }
}

impl<T: Transport> TestRailClient<T> {
    /// Send one request and return the decoded response.
    ///
    /// `method` is one of GET, POST, PUT or DELETE in any case; anything else
    /// fails with `InvalidArgument` before the network is touched.
    pub fn send_request(
        &self,
        method: &str,
        uri: &str,
        data: Option<&JsonObject>,
        params: Option<&JsonObject>,
    ) -> Result<Value> {
        let request = self.build_request(method, uri, data, params)?;
        debug!(method = %request.method, url = %request.url, "sending TestRail request");

        let response = match self.transport.execute(&request) {
            Ok(response) => response,
            Err(e) => {
                warn!(url = %request.url, error = %e, "TestRail request failed without a response");
                return Err(ApiError::RemoteRequestFailed {
                    status: None,
                    error: e.to_string(),
                    url: request.url,
                    params: original_params(params),
                });
            }
        };

        debug!(status = response.status, url = %request.url, "TestRail response");
        let result = self.parse_response(&request.url, params, response);
        if let Err(e) = &result {
            warn!(error = %e, "TestRail request failed");
        }
        result
    }

    pub(crate) fn get(&self, uri: &str) -> Result<Value> {
        self.send_request("GET", uri, None, None)
    }

    pub(crate) fn get_with(&self, uri: &str, params: &JsonObject) -> Result<Value> {
        self.send_request("GET", uri, None, Some(params))
    }

    pub(crate) fn post(&self, uri: &str, data: Option<&JsonObject>) -> Result<Value> {
        self.send_request("POST", uri, data, None)
    }
}

impl<T> fmt::Debug for TestRailClient<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestRailClient")
            .field("api_url", &self.api_url)
            .field("credentials", &self.credentials)
            .finish_non_exhaustive()
    }
}

/// `base_url` with exactly one trailing slash, followed by `API_PREFIX`.
fn api_url(base_url: &str) -> String {
    format!("{}/{API_PREFIX}", base_url.trim_end_matches('/'))
}

/// Form-encode the non-null entries of `params` onto `url`.
///
/// The API prefix already carries a `?`, so parameters normally join with
/// `&`; `?` is only used for a URL without any query part.
fn append_query(url: &mut String, params: &JsonObject) {
    let mut query = url::form_urlencoded::Serializer::new(String::new());
    let mut appended = false;
    for (key, value) in params.iter().filter(|(_, v)| !v.is_null()) {
        query.append_pair(key, &query_value(value));
        appended = true;
    }
    if !appended {
        return;
    }
    url.push(if url.contains('?') { '&' } else { '?' });
    url.push_str(&query.finish());
}

fn query_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Bool(true) => "1".to_string(),
        Value::Bool(false) => "0".to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(items) => items
            .iter()
            .filter(|item| !item.is_null())
            .map(query_value)
            .collect::<Vec<_>>()
            .join(","),
        Value::Null => String::new(),
        Value::Object(_) => value.to_string(),
    }
}

fn original_params(params: Option<&JsonObject>) -> Option<String> {
    params
        .filter(|p| !p.is_empty())
        .map(|p| Value::Object(p.clone()).to_string())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::http::TransportError;
    use crate::testing::{client_with, ok, status, MockTransport};

    fn object(value: Value) -> JsonObject {
        value.as_object().cloned().unwrap()
    }

    fn client() -> TestRailClient<MockTransport> {
        client_with(MockTransport::default())
    }

    #[test]
    fn base_url_without_slash_gets_one() {
        let c = TestRailClient::with_transport("https://tr.example", Credentials::new("a", "b"), MockTransport::default());
        assert_eq!(c.api_url(), "https://tr.example/index.php?/api/v2/");
    }

    #[test]
    fn base_url_with_slashes_keeps_exactly_one() {
        for base in ["https://tr.example/", "https://tr.example//", "https://tr.example/testrail/"] {
            let c = TestRailClient::with_transport(base, Credentials::new("a", "b"), MockTransport::default());
            assert!(c.api_url().ends_with("/index.php?/api/v2/"), "{base}");
            assert!(!c.api_url().contains("//index.php"), "{base}");
        }
    }

    #[test]
    fn from_config_uses_configured_instance() {
        let config = TestRailConfig::new("https://tr.local/testrail", "alice", "k1");
        let c = TestRailClient::from_config(&config);
        assert_eq!(c.api_url(), "https://tr.local/testrail/index.php?/api/v2/");
        assert_eq!(c.credentials(), &Credentials::new("alice", "k1"));
    }

    #[test]
    fn every_request_carries_auth_and_content_type() {
        let req = client().build_request("GET", "get_projects", None, None).unwrap();
        assert_eq!(req.header("authorization"), Some("Basic YWxpY2U6azE="));
        assert_eq!(req.header("content-type"), Some("application/json"));
    }

    #[test]
    fn null_params_are_dropped() {
        let params = object(json!({"suite_id": null, "x": 5}));
        let req = client().build_request("GET", "get_cases/3", None, Some(&params)).unwrap();
        assert!(req.url.contains("x=5"));
        assert!(!req.url.contains("suite_id"));
    }

    #[test]
    fn all_null_params_leave_url_untouched() {
        let params = object(json!({"suite_id": null}));
        let req = client().build_request("GET", "get_cases/3", None, Some(&params)).unwrap();
        assert_eq!(req.url, "https://tr.example/index.php?/api/v2/get_cases/3");
    }

    #[test]
    fn params_join_existing_query_with_ampersand() {
        let params = object(json!({"a": 1}));
        let req = client().build_request("GET", "delete_section/5?soft=1", None, Some(&params)).unwrap();
        assert!(req.url.ends_with("delete_section/5?soft=1&a=1"), "{}", req.url);
        assert_eq!(req.url.matches('?').count(), 2);
    }

    #[test]
    fn params_join_api_prefix_with_ampersand() {
        let params = object(json!({"suite_id": 7}));
        let req = client().build_request("get", "get_cases/3", None, Some(&params)).unwrap();
        assert_eq!(req.url, "https://tr.example/index.php?/api/v2/get_cases/3&suite_id=7");
    }

    #[test]
    fn question_mark_used_when_url_has_no_query() {
        let mut url = "http://localhost/plain".to_string();
        append_query(&mut url, &object(json!({"a": "b c"})));
        assert_eq!(url, "http://localhost/plain?a=b+c");
    }

    #[test]
    fn query_values_render_remote_conventions() {
        let params = object(json!({
            "is_completed": true,
            "status_id": [1, 5],
            "filter": "login & logout",
            "limit": 250
        }));
        let req = client().build_request("GET", "get_runs/1", None, Some(&params)).unwrap();
        assert!(req.url.ends_with("&is_completed=1&status_id=1%2C5&filter=login+%26+logout&limit=250"), "{}", req.url);
    }

    #[test]
    fn params_are_ignored_for_post() {
        let params = object(json!({"a": 1}));
        let req = client().build_request("POST", "add_project", None, Some(&params)).unwrap();
        assert_eq!(req.url, "https://tr.example/index.php?/api/v2/add_project");
    }

    #[test]
    fn empty_data_sends_no_body() {
        let data = JsonObject::new();
        let req = client().build_request("POST", "close_run/4", Some(&data), None).unwrap();
        assert!(req.body.is_none());
    }

    #[test]
    fn post_and_put_serialize_data() {
        let data = object(json!({"name": "Smoke", "suite_mode": 1}));
        for method in ["POST", "put"] {
            let req = client().build_request(method, "add_project", Some(&data), None).unwrap();
            let body: Value = serde_json::from_str(req.body.as_deref().unwrap()).unwrap();
            assert_eq!(body, json!({"name": "Smoke", "suite_mode": 1}));
        }
    }

    #[test]
    fn get_and_delete_never_carry_a_body() {
        let data = object(json!({"name": "ignored"}));
        for method in ["GET", "DELETE"] {
            let req = client().build_request(method, "get_projects", Some(&data), None).unwrap();
            assert!(req.body.is_none(), "{method}");
        }
    }

    #[test]
    fn unsupported_method_fails_before_sending() {
        let c = client();
        let err = c.send_request("PATCH", "get_projects", None, None).unwrap_err();
        assert!(matches!(err, ApiError::InvalidArgument(_)));
        assert!(c.transport().requests().is_empty());
    }

    #[test]
    fn empty_success_body_is_empty_object() {
        let c = client_with(MockTransport::with_responses(vec![status(200, "")]));
        let value = c.send_request("POST", "delete_case/1", None, None).unwrap();
        assert_eq!(value, json!({}));
    }

    #[test]
    fn success_body_is_returned_verbatim() {
        let c = client_with(MockTransport::with_responses(vec![ok(json!([{"id": 1}, {"id": 2}]))]));
        let value = c.send_request("GET", "get_projects", None, None).unwrap();
        assert_eq!(value, json!([{"id": 1}, {"id": 2}]));
    }

    #[test]
    fn error_status_surfaces_code_and_payload() {
        let c = client_with(MockTransport::with_responses(vec![status(404, r#"{"error": "not found"}"#)]));
        let err = c.send_request("GET", "get_case/9", None, None).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("404"), "{message}");
        assert!(message.contains("not found"), "{message}");
        assert!(message.contains("[URL: https://tr.example/index.php?/api/v2/get_case/9]"), "{message}");
        assert_eq!(err.status(), Some(404));
    }

    #[test]
    fn error_with_non_json_body_keeps_raw_text() {
        let c = client_with(MockTransport::with_responses(vec![status(502, "Bad Gateway")]));
        let err = c.send_request("GET", "get_projects", None, None).unwrap_err();
        assert!(matches!(
            err,
            ApiError::RemoteRequestFailed { status: Some(502), ref error, .. } if error == "Bad Gateway"
        ));
    }

    #[test]
    fn redirect_status_is_a_failure() {
        let c = client_with(MockTransport::with_responses(vec![status(302, "")]));
        let err = c.send_request("GET", "get_projects", None, None).unwrap_err();
        assert_eq!(err.status(), Some(302));
    }

    #[test]
    fn error_reports_original_params_before_filtering() {
        let c = client_with(MockTransport::with_responses(vec![status(400, r#"{"error":"bad"}"#)]));
        let params = object(json!({"suite_id": null, "x": 5}));
        let err = c.send_request("GET", "get_cases/3", None, Some(&params)).unwrap_err();
        assert!(err.to_string().ends_with(r#"[Original params: {"suite_id":null,"x":5}]"#), "{err}");
    }

    #[test]
    fn empty_params_are_not_reported() {
        let c = client_with(MockTransport::with_responses(vec![status(400, "bad")]));
        let params = JsonObject::new();
        let err = c.send_request("GET", "get_cases/3", None, Some(&params)).unwrap_err();
        assert!(!err.to_string().contains("Original params"));
    }

    #[test]
    fn malformed_success_body_is_deserialization_error() {
        let c = client_with(MockTransport::with_responses(vec![status(200, "<html>")]));
        let err = c.send_request("GET", "get_projects", None, None).unwrap_err();
        assert!(matches!(err, ApiError::Deserialization(_)));
    }

    #[test]
    fn transport_failure_is_remote_failure_without_status() {
        let c = client_with(MockTransport::with_responses(vec![Err(TransportError(
            "connection refused".to_string(),
        ))]));
        let err = c.send_request("GET", "get_projects", None, None).unwrap_err();
        assert!(matches!(
            err,
            ApiError::RemoteRequestFailed { status: None, ref error, .. } if error == "connection refused"
        ));
    }

    #[test]
    fn debug_does_not_leak_authorization() {
        let rendered = format!("{:?}", client());
        assert!(!rendered.contains("YWxpY2U6azE="));
        assert!(!rendered.contains("k1"));
    }
}
