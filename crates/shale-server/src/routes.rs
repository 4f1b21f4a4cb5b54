//! Route dispatch and JSON request/response plumbing.
//!
//! Engine outcomes — including SQL errors — are always `200` with the
//! detail in the body; `400` is reserved for malformed request bodies
//! and `500` for unexpected faults.

use std::collections::HashMap;
use std::sync::Arc;

use http_body_util::{BodyExt, Full};
use hyper::body::{Bytes, Incoming};
use hyper::{Method, Request, Response, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::error;

use shale_engine::Database;

/// Shared server state: the database handle plus CORS configuration.
pub struct AppState {
    /// The engine façade.
    pub db: Database,
    /// Allowed CORS origins; `*` allows any.
    pub cors_origins: Vec<String>,
}

/// Body of `POST /api/v1/execute`.
#[derive(Deserialize)]
struct ExecuteRequest {
    query: String,
    session_id: Option<String>,
}

/// Default history page size when `limit` is absent.
const DEFAULT_HISTORY_LIMIT: usize = 50;

/// Entry point: collects the body and dispatches on method and path.
pub async fn handle(req: Request<Incoming>, state: Arc<AppState>) -> Response<Full<Bytes>> {
    let (parts, body) = req.into_parts();
    let bytes = body
        .collect()
        .await
        .map(|collected| collected.to_bytes())
        .unwrap_or_default();
    let origin = parts
        .headers
        .get("origin")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let mut response = dispatch(
        &parts.method,
        parts.uri.path(),
        parts.uri.query(),
        &bytes,
        &state,
    );
    apply_cors(&mut response, origin.as_deref(), &state.cors_origins);
    response
}

/// Routes one request. Split from [`handle`] so tests can call it with
/// plain values.
fn dispatch(
    method: &Method,
    path: &str,
    query: Option<&str>,
    body: &[u8],
    state: &AppState,
) -> Response<Full<Bytes>> {
    match (method, path) {
        (&Method::OPTIONS, _) => preflight(),
        (&Method::POST, "/api/v1/execute") => execute(body, state),
        (&Method::GET, "/api/v1/history") => history(query, state),
        (&Method::POST, "/api/v1/reset") => reset(state),
        (&Method::GET, "/api/v1/tables") => tables(state),
        (&Method::GET, "/health") => json_response(StatusCode::OK, &json!({"ok": true})),
        _ => json_response(StatusCode::NOT_FOUND, &json!({"error": "not found"})),
    }
}

/// `POST /api/v1/execute` — run SQL, return the uniform envelope.
fn execute(body: &[u8], state: &AppState) -> Response<Full<Bytes>> {
    let request: ExecuteRequest = match serde_json::from_slice(body) {
        Ok(request) => request,
        Err(e) => {
            return json_response(
                StatusCode::BAD_REQUEST,
                &json!({"error": format!("invalid request body: {e}")}),
            );
        }
    };

    let outcome = state
        .db
        .execute(&request.query, request.session_id.as_deref());
    json_response(StatusCode::OK, &outcome)
}

/// `GET /api/v1/history?session_id=&limit=` — recent queries.
fn history(query: Option<&str>, state: &AppState) -> Response<Full<Bytes>> {
    let params = parse_query(query);
    let session = params.get("session_id").map(String::as_str);
    let limit = params
        .get("limit")
        .and_then(|v| v.parse().ok())
        .unwrap_or(DEFAULT_HISTORY_LIMIT);

    json_response(StatusCode::OK, &state.db.history(session, limit))
}

/// `POST /api/v1/reset` — wipe the database.
fn reset(state: &AppState) -> Response<Full<Bytes>> {
    match state.db.reset() {
        Ok(()) => json_response(StatusCode::OK, &json!({"ok": true})),
        Err(e) => {
            error!(error = %e, "reset failed");
            json_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &json!({"error": e.to_string()}),
            )
        }
    }
}

/// `GET /api/v1/tables` — schema listing.
fn tables(state: &AppState) -> Response<Full<Bytes>> {
    json_response(StatusCode::OK, &json!({"tables": state.db.tables()}))
}

/// Empty 204 for CORS preflight; the allow headers come from
/// [`apply_cors`].
fn preflight() -> Response<Full<Bytes>> {
    Response::builder()
        .status(StatusCode::NO_CONTENT)
        .body(Full::new(Bytes::new()))
        .unwrap()
}

/// Serializes a response body as JSON.
fn json_response<T: Serialize>(status: StatusCode, data: &T) -> Response<Full<Bytes>> {
    match serde_json::to_vec(data) {
        Ok(body) => Response::builder()
            .status(status)
            .header("Content-Type", "application/json")
            .body(Full::new(Bytes::from(body)))
            .unwrap(),
        Err(e) => {
            error!(error = %e, "response serialization failed");
            Response::builder()
                .status(StatusCode::INTERNAL_SERVER_ERROR)
                .body(Full::new(Bytes::from_static(b"{}")))
                .unwrap()
        }
    }
}

/// Adds CORS headers when the request origin is allowed.
fn apply_cors(
    response: &mut Response<Full<Bytes>>,
    origin: Option<&str>,
    allowed: &[String],
) {
    let any = allowed.iter().any(|a| a == "*");
    let value = if any {
        Some(String::from("*"))
    } else {
        origin
            .filter(|o| allowed.iter().any(|a| a == o))
            .map(str::to_string)
    };

    if let Some(value) = value {
        let headers = response.headers_mut();
        if let Ok(value) = value.parse() {
            headers.insert("Access-Control-Allow-Origin", value);
        }
        headers.insert(
            "Access-Control-Allow-Methods",
            "GET, POST, OPTIONS".parse().unwrap(),
        );
        headers.insert(
            "Access-Control-Allow-Headers",
            "Content-Type".parse().unwrap(),
        );
    }
}

/// Parses a query string into a key/value map. No percent decoding;
/// session ids and limits are plain tokens.
fn parse_query(query: Option<&str>) -> HashMap<String, String> {
    let mut params = HashMap::new();
    let Some(query) = query else {
        return params;
    };
    for pair in query.split('&') {
        if let Some((key, value)) = pair.split_once('=') {
            params.insert(key.to_string(), value.to_string());
        }
    }
    params
}
