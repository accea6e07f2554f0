//! Error envelope of the API and the error type of the crate.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Kind carried by every error envelope.
pub const ERROR_KIND: &str = "Error";

/// Structured error returned by the API for any 4xx/5xx response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiError {
    /// HTTP status of the response that carried the envelope.
    #[serde(skip)]
    pub status: u16,

    #[serde(default = "error_kind")]
    pub kind: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub href: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

fn error_kind() -> String {
    ERROR_KIND.to_string()
}

impl ApiError {
    /// Builds an envelope for the given service, e.g. `clusters_mgmt`.
    ///
    /// The identifier is the status, the code is `<SERVICE>-<status>` and the
    /// link points to `/api/<service>/v1/errors/<status>`.
    pub fn new(status: u16, service: &str, reason: impl Into<String>) -> Self {
        let prefix = service.to_uppercase().replace('_', "-");
        Self {
            status,
            kind: error_kind(),
            id: Some(status.to_string()),
            href: Some(format!("/api/{}/v1/errors/{}", service, status)),
            code: Some(format!("{}-{}", prefix, status)),
            reason: Some(reason.into()),
            operation_id: None,
            details: None,
        }
    }

    pub fn not_found(service: &str, path: &str) -> Self {
        Self::new(
            404,
            service,
            format!("Can't find resource for path '{}'", path),
        )
    }

    pub fn method_not_allowed(service: &str, method: &str, path: &str) -> Self {
        Self::new(
            405,
            service,
            format!("Method '{}' isn't supported for path '{}'", method, path),
        )
    }

    pub fn bad_request(service: &str, reason: impl Into<String>) -> Self {
        Self::new(400, service, reason)
    }

    pub fn internal(service: &str, method: &str, path: &str) -> Self {
        Self::new(
            500,
            service,
            format!("Can't process '{}' request for path '{}'", method, path),
        )
    }

    /// Decodes an envelope from a response body.
    ///
    /// Bodies that are not an envelope (proxies, load balancers) are kept as
    /// the reason text so the caller still sees what the server said.
    pub fn from_body(status: u16, body: &[u8]) -> Self {
        match serde_json::from_slice::<ApiError>(body) {
            Ok(mut error) if error.is_envelope() => {
                error.status = status;
                error
            }
            _ => Self {
                status,
                kind: error_kind(),
                id: Some(status.to_string()),
                href: None,
                code: None,
                reason: Some(String::from_utf8_lossy(body).trim().to_string()),
                operation_id: None,
                details: None,
            },
        }
    }

    /// An envelope names the `Error` kind and carries a code or a reason.
    fn is_envelope(&self) -> bool {
        self.kind == ERROR_KIND && (self.code.is_some() || self.reason.is_some())
    }

    pub fn with_operation_id(mut self, value: impl Into<String>) -> Self {
        self.operation_id = Some(value.into());
        self
    }

    pub fn reason(&self) -> &str {
        self.reason.as_deref().unwrap_or_default()
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "status is {}", self.status)?;
        if let Some(id) = &self.id {
            write!(f, ", identifier is '{}'", id)?;
        }
        if let Some(code) = &self.code {
            write!(f, ", code is '{}'", code)?;
        }
        if let Some(operation_id) = &self.operation_id {
            write!(f, ", operation identifier is '{}'", operation_id)?;
        }
        match &self.reason {
            Some(reason) if !reason.is_empty() => write!(f, ": {}", reason),
            _ => Ok(()),
        }
    }
}

impl std::error::Error for ApiError {}

/// Errors produced by the client side of the crate
#[derive(Error, Debug)]
pub enum Error {
    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("API error: {0}")]
    Api(#[from] ApiError),

    #[error("Invalid URL '{0}'")]
    InvalidUrl(String),

    #[error("Request deadline expired")]
    DeadlineExceeded,

    #[error("Invalid poll request: {0}")]
    Poll(String),

    #[error("Polling deadline expired, last status was {last_status}")]
    PollTimeout { last_status: u16 },
}

impl Error {
    /// Status of the response behind the error, if there was one.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Api(error) => Some(error.status),
            Error::PollTimeout { last_status } if *last_status != 0 => Some(*last_status),
            Error::Transport(error) => error.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_for_service() {
        let error = ApiError::not_found("clusters_mgmt", "/api/clusters_mgmt/v1/clusters/123");

        assert_eq!(error.status, 404);
        assert_eq!(error.id.as_deref(), Some("404"));
        assert_eq!(error.code.as_deref(), Some("CLUSTERS-MGMT-404"));
        assert_eq!(
            error.href.as_deref(),
            Some("/api/clusters_mgmt/v1/errors/404")
        );
        assert!(error.reason().contains("/clusters/123"));
    }

    #[test]
    fn test_envelope_json_omits_status() {
        let error = ApiError::new(400, "service_logs", "bad");
        let json = serde_json::to_value(&error).unwrap();

        assert_eq!(json["kind"], "Error");
        assert_eq!(json["code"], "SERVICE-LOGS-400");
        assert!(json.get("status").is_none());
        assert!(json.get("operation_id").is_none());
    }

    #[test]
    fn test_from_body_envelope() {
        let body = br#"{
            "kind": "Error",
            "id": "7",
            "href": "/api/accounts_mgmt/v1/errors/7",
            "code": "ACCT-MGMT-7",
            "reason": "Unable to find credential",
            "operation_id": "op_id"
        }"#;

        let error = ApiError::from_body(401, body);
        assert_eq!(error.status, 401);
        assert_eq!(error.code.as_deref(), Some("ACCT-MGMT-7"));
        assert_eq!(error.operation_id.as_deref(), Some("op_id"));
    }

    #[test]
    fn test_from_body_plain_text() {
        let error = ApiError::from_body(502, b"Bad Gateway\n");

        assert_eq!(error.status, 502);
        assert_eq!(error.reason(), "Bad Gateway");
        assert!(error.code.is_none());

        let body = br#"{"message":"upstream exploded"}"#;
        let error = ApiError::from_body(502, body);
        assert_eq!(error.kind, ERROR_KIND);
        assert_eq!(error.reason(), r#"{"message":"upstream exploded"}"#);

        let error = ApiError::from_body(500, br#"{"kind":"Cluster","reason":"odd"}"#);
        assert_eq!(error.reason(), r#"{"kind":"Cluster","reason":"odd"}"#);
    }

    #[test]
    fn test_display() {
        let error = ApiError::new(404, "clusters_mgmt", "Cluster 'abc' not found")
            .with_operation_id("op-1");

        assert_eq!(
            error.to_string(),
            "status is 404, identifier is '404', code is 'CLUSTERS-MGMT-404', \
             operation identifier is 'op-1': Cluster 'abc' not found"
        );
    }

    #[test]
    fn test_error_status() {
        let error = Error::from(ApiError::new(404, "clusters_mgmt", "gone"));
        assert!(error.is_not_found());

        let error = Error::PollTimeout { last_status: 0 };
        assert_eq!(error.status(), None);
    }
}
