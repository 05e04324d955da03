//! In-memory stand-in for a TestRail instance.
//!
//! Serves `GET` and `POST` on `/index.php` and routes on the raw query
//! string, the way TestRail does: `index.php?/api/v2/<action>[/<id>][&k=v]`.
//! Every call needs Basic auth matching the credentials the app was built
//! with.

pub mod store;

use std::sync::Arc;

use axum::{
    extract::{RawQuery, State},
    http::{header::AUTHORIZATION, HeaderMap, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use base64::{engine::general_purpose::STANDARD, Engine};
use serde::Serialize;
use serde_json::Value;
use tokio::{net::TcpListener, sync::RwLock};
use tracing::debug;

pub use store::{ApiFailure, JsonObject, Params, Store};

pub const DEFAULT_USERNAME: &str = "admin@example.com";
pub const DEFAULT_API_KEY: &str = "secret";

const API_PATH: &str = "/api/v2/";

pub type Db = Arc<RwLock<Store>>;

#[derive(Clone)]
pub struct AppState {
    pub db: Db,
    authorization: String,
}

pub fn app() -> Router {
    app_with_credentials(DEFAULT_USERNAME, DEFAULT_API_KEY)
}

pub fn app_with_credentials(username: &str, api_key: &str) -> Router {
    let token = STANDARD.encode(format!("{username}:{api_key}"));
    let state = AppState {
        db: Arc::new(RwLock::new(Store::default())),
        authorization: format!("Basic {token}"),
    };
    Router::new()
        .route("/index.php", get(handle_get).post(handle_post))
        .with_state(state)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    serve(listener, app()).await
}

pub async fn serve(listener: TcpListener, router: Router) -> Result<(), std::io::Error> {
    axum::serve(listener, router).await
}

/// One `index.php?/api/v2/...` call.
#[derive(Debug, PartialEq, Eq)]
pub struct ApiCall {
    pub action: String,
    pub id: Option<u64>,
    pub params: Params,
}

impl ApiCall {
    /// Parse the raw query string. Parameters start after the first `&` or
    /// `?` following the path; a later `?` also separates parameters.
    pub fn parse(raw_query: &str) -> Result<Self, ApiFailure> {
        let call = raw_query
            .strip_prefix(API_PATH)
            .ok_or_else(|| ApiFailure::bad_request("Invalid or unknown API call."))?;
        let (path, query) = match call.find(['&', '?']) {
            Some(split) => (&call[..split], &call[split + 1..]),
            None => (call, ""),
        };

        let (action, id) = match path.split_once('/') {
            Some((action, "")) => (action, None),
            Some((action, raw_id)) => {
                let id = raw_id
                    .parse::<u64>()
                    .map_err(|_| ApiFailure::bad_request(format!("Invalid resource ID '{raw_id}'.")))?;
                (action, Some(id))
            }
            None => (path, None),
        };

        let normalized = query.replace('?', "&");
        let params = url::form_urlencoded::parse(normalized.as_bytes())
            .into_owned()
            .collect();

        Ok(Self {
            action: action.to_string(),
            id,
            params,
        })
    }

    fn expected_method(&self) -> Method {
        if self.action.starts_with("get_") {
            Method::GET
        } else {
            Method::POST
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for ApiFailure {
    fn into_response(self) -> Response {
        (self.status, Json(ErrorBody { error: self.message })).into_response()
    }
}

async fn handle_get(
    State(state): State<AppState>,
    headers: HeaderMap,
    RawQuery(query): RawQuery,
) -> Response {
    respond(&state, Method::GET, &headers, query.as_deref(), "").await
}

async fn handle_post(
    State(state): State<AppState>,
    headers: HeaderMap,
    RawQuery(query): RawQuery,
    body: String,
) -> Response {
    respond(&state, Method::POST, &headers, query.as_deref(), &body).await
}

async fn respond(
    state: &AppState,
    method: Method,
    headers: &HeaderMap,
    query: Option<&str>,
    body: &str,
) -> Response {
    match dispatch(state, method, headers, query, body).await {
        Ok(Some(value)) => Json(value).into_response(),
        Ok(None) => StatusCode::OK.into_response(),
        Err(failure) => {
            debug!(status = %failure.status, error = %failure.message, "rejected API call");
            failure.into_response()
        }
    }
}

async fn dispatch(
    state: &AppState,
    method: Method,
    headers: &HeaderMap,
    query: Option<&str>,
    body: &str,
) -> Result<Option<Value>, ApiFailure> {
    authorize(state, headers)?;

    let call = ApiCall::parse(query.unwrap_or_default())?;
    let expected = call.expected_method();
    if method != expected {
        return Err(ApiFailure::bad_request(format!(
            "This method must be called via {expected}."
        )));
    }
    let body = parse_body(body)?;

    debug!(action = %call.action, id = ?call.id, "handling API call");
    state
        .db
        .write()
        .await
        .call(&call.action, call.id, &call.params, body)
}

fn authorize(state: &AppState, headers: &HeaderMap) -> Result<(), ApiFailure> {
    let presented = headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok());
    if presented == Some(state.authorization.as_str()) {
        return Ok(());
    }
    Err(ApiFailure {
        status: StatusCode::UNAUTHORIZED,
        message: "Authentication failed: invalid or missing user/password or session cookie."
            .to_string(),
    })
}

fn parse_body(body: &str) -> Result<JsonObject, ApiFailure> {
    if body.trim().is_empty() {
        return Ok(JsonObject::new());
    }
    match serde_json::from_str::<Value>(body) {
        Ok(Value::Object(fields)) => Ok(fields),
        _ => Err(ApiFailure::bad_request("The request body must be a JSON object.")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_action_and_id() {
        let call = ApiCall::parse("/api/v2/get_case/12").unwrap();
        assert_eq!(call.action, "get_case");
        assert_eq!(call.id, Some(12));
        assert!(call.params.is_empty());
    }

    #[test]
    fn parses_action_without_id() {
        let call = ApiCall::parse("/api/v2/get_projects").unwrap();
        assert_eq!(call.action, "get_projects");
        assert_eq!(call.id, None);
    }

    #[test]
    fn parses_ampersand_params() {
        let call = ApiCall::parse("/api/v2/get_cases/3&suite_id=7&filter=a+%26+b").unwrap();
        assert_eq!(call.id, Some(3));
        assert_eq!(call.params.get("suite_id").map(String::as_str), Some("7"));
        assert_eq!(call.params.get("filter").map(String::as_str), Some("a & b"));
    }

    #[test]
    fn parses_question_mark_params() {
        let call = ApiCall::parse("/api/v2/delete_section/5?soft=1&a=1").unwrap();
        assert_eq!(call.action, "delete_section");
        assert_eq!(call.id, Some(5));
        assert_eq!(call.params.get("soft").map(String::as_str), Some("1"));
        assert_eq!(call.params.get("a").map(String::as_str), Some("1"));
    }

    #[test]
    fn rejects_foreign_prefix() {
        assert!(ApiCall::parse("/api/v1/get_case/1").is_err());
    }

    #[test]
    fn rejects_non_numeric_id() {
        let err = ApiCall::parse("/api/v2/get_case/abc").unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn reads_verb_from_action_name() {
        assert_eq!(ApiCall::parse("/api/v2/get_run/1").unwrap().expected_method(), Method::GET);
        assert_eq!(ApiCall::parse("/api/v2/close_run/1").unwrap().expected_method(), Method::POST);
    }

    #[test]
    fn body_must_be_an_object() {
        assert!(parse_body("").unwrap().is_empty());
        assert!(parse_body("[1]").is_err());
        assert_eq!(parse_body(r#"{"name":"x"}"#).unwrap()["name"], "x");
    }
}
