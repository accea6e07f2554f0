//! Walks the path segments of a request and adapts it to the server traits.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    Json,
};
use percent_encoding::percent_decode_str;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, error, warn};

use super::request::{ListServerRequest, ListServerResponse, ServerError, ServerResponse};
use super::{clusters_mgmt, service_logs, Server};
use crate::error::ApiError;
use crate::model::{Page, Resource};

/// Service name used in error envelopes for paths outside any service
const ROOT_SERVICE: &str = "api";

/// Incoming request, as seen by the dispatch functions.
pub(crate) struct Call {
    pub(crate) method: Method,
    pub(crate) path: String,
    pub(crate) query: HashMap<String, String>,
    pub(crate) body: Bytes,
    /// Service the path belongs to, e.g. `clusters_mgmt`.
    pub(crate) service: &'static str,
}

/// Fallback handler of the router: every request goes through here.
pub(crate) async fn handle(
    State(server): State<Arc<Server>>,
    method: Method,
    uri: Uri,
    Query(query): Query<HashMap<String, String>>,
    body: Bytes,
) -> Response {
    let mut call = Call {
        method,
        path: uri.path().to_string(),
        query,
        body,
        service: ROOT_SERVICE,
    };
    dispatch(&server, &mut call).await
}

async fn dispatch(server: &Server, call: &mut Call) -> Response {
    let decoded = decode_segments(&call.path);
    let segments: Vec<&str> = decoded.iter().map(String::as_str).collect();
    debug!("Dispatching {} {}", call.method, call.path);

    match segments.as_slice() {
        ["api", "clusters_mgmt", "v1", rest @ ..] => {
            call.service = "clusters_mgmt";
            match server.clusters_mgmt {
                Some(ref target) => clusters_mgmt::dispatch(call, target.as_ref(), rest).await,
                None => send_not_found(call),
            }
        }
        ["api", "service_logs", "v1", rest @ ..] => {
            call.service = "service_logs";
            match server.service_logs {
                Some(ref target) => service_logs::dispatch(call, target.as_ref(), rest).await,
                None => send_not_found(call),
            }
        }
        _ => send_not_found(call),
    }
}

/// Splits a request path into percent-decoded segments, dropping empty ones.
fn decode_segments(path: &str) -> Vec<String> {
    path.split('/')
        .filter(|s| !s.is_empty())
        .map(|s| percent_decode_str(s).decode_utf8_lossy().into_owned())
        .collect()
}

/// Calls the dispatch function of a located sub-resource, or answers 404.
macro_rules! locate {
    ($call:expr, $target:expr, $dispatch:path, $rest:expr) => {
        match $target {
            Some(target) => $dispatch($call, target.as_ref(), $rest).await,
            None => $crate::server::dispatch::send_not_found($call),
        }
    };
}

pub(crate) use locate;

pub(crate) fn send_error(error: ApiError) -> Response {
    let status = StatusCode::from_u16(error.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(error)).into_response()
}

pub(crate) fn send_not_found(call: &Call) -> Response {
    send_error(ApiError::not_found(call.service, &call.path))
}

pub(crate) fn send_method_not_allowed(call: &Call) -> Response {
    send_error(ApiError::method_not_allowed(
        call.service,
        call.method.as_str(),
        &call.path,
    ))
}

fn send_bad_request(call: &Call, reason: String) -> Response {
    warn!(
        "Can't read request for method '{}' and path '{}': {}",
        call.method, call.path, reason
    );
    send_error(ApiError::bad_request(call.service, reason))
}

fn send_server_error(call: &Call, err: ServerError) -> Response {
    match err {
        ServerError::NotFound(reason) => send_error(ApiError::new(404, call.service, reason)),
        ServerError::BadRequest(reason) => send_error(ApiError::bad_request(call.service, reason)),
        ServerError::Api(error) => send_error(error),
        ServerError::Internal(message) => {
            error!(
                "Can't process request for method '{}' and path '{}': {}",
                call.method, call.path, message
            );
            send_error(ApiError::internal(
                call.service,
                call.method.as_str(),
                &call.path,
            ))
        }
    }
}

fn status_or(status: Option<u16>, default: StatusCode) -> StatusCode {
    status
        .and_then(|s| StatusCode::from_u16(s).ok())
        .unwrap_or(default)
}

/// Decodes the body of an add or update request.
pub(crate) fn read_body<T: DeserializeOwned>(call: &Call) -> Result<T, Response> {
    serde_json::from_slice(&call.body)
        .map_err(|e| send_bad_request(call, format!("Can't decode request body: {}", e)))
}

pub(crate) fn read_list_request(call: &Call) -> Result<ListServerRequest, Response> {
    ListServerRequest::from_query(&call.query).map_err(|reason| send_bad_request(call, reason))
}

pub(crate) fn read_query<T>(
    call: &Call,
    parse: fn(&HashMap<String, String>) -> Result<T, String>,
) -> Result<T, Response> {
    parse(&call.query).map_err(|reason| send_bad_request(call, reason))
}

/// Writes the result of an operation that returns one object.
pub(crate) fn write_object<T>(
    call: &Call,
    default: StatusCode,
    result: Result<ServerResponse<T>, ServerError>,
) -> Response
where
    T: Serialize + Resource,
{
    match result {
        Ok(response) => {
            let status = status_or(response.status, default);
            match response.body {
                Some(mut body) => {
                    body.ensure_kind();
                    (status, Json(body)).into_response()
                }
                None => status.into_response(),
            }
        }
        Err(err) => send_server_error(call, err),
    }
}

/// Writes the result of an operation without response body.
pub(crate) fn write_empty(
    call: &Call,
    default: StatusCode,
    result: Result<ServerResponse<()>, ServerError>,
) -> Response {
    match result {
        Ok(response) => status_or(response.status, default).into_response(),
        Err(err) => send_server_error(call, err),
    }
}

/// Writes a page of a collection.
pub(crate) fn write_list<T>(
    call: &Call,
    result: Result<ListServerResponse<T>, ServerError>,
) -> Response
where
    T: Serialize + Resource,
{
    match result {
        Ok(response) => {
            let status = status_or(response.status, StatusCode::OK);
            let mut items = response.items;
            for item in &mut items {
                item.ensure_kind();
            }
            let mut page = Page::new(items);
            page.page = response.page;
            page.size = response.size;
            page.total = response.total;
            (status, Json(page)).into_response()
        }
        Err(err) => send_server_error(call, err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_segments() {
        assert_eq!(
            decode_segments("/api/clusters_mgmt/v1//clusters/"),
            vec!["api", "clusters_mgmt", "v1", "clusters"]
        );
        assert_eq!(
            decode_segments("/users/jane%20doe/ops%2Foncall/50%25"),
            vec!["users", "jane doe", "ops/oncall", "50%"]
        );
    }
}
