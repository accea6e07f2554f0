//! Requests handed to server implementations and the responses they return.

use std::collections::HashMap;

use thiserror::Error;

use crate::error::ApiError;

/// Failure of a server implementation.
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Sent to the client as is, with the status of the envelope.
    #[error("{0}")]
    Api(ApiError),

    /// Logged, and answered with a generic 500 envelope.
    #[error("Internal error: {0}")]
    Internal(String),
}

pub type ServerResult<T> = Result<T, ServerError>;

/// Paging and filtering parameters of a `GET` on a collection.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListServerRequest {
    /// Index of the requested page, starting at 1.
    pub page: Option<i32>,
    /// Maximum number of items of the page.
    pub size: Option<i32>,
    pub search: Option<String>,
    pub order: Option<String>,
}

impl ListServerRequest {
    pub(crate) fn from_query(query: &HashMap<String, String>) -> Result<Self, String> {
        Ok(Self {
            page: parse_integer(query, "page")?,
            size: parse_integer(query, "size")?,
            search: query.get("search").cloned().filter(|s| !s.trim().is_empty()),
            order: query.get("order").cloned().filter(|s| !s.trim().is_empty()),
        })
    }
}

fn parse_integer(query: &HashMap<String, String>, name: &str) -> Result<Option<i32>, String> {
    match query.get(name) {
        None => Ok(None),
        Some(value) => value.trim().parse::<i32>().map(Some).map_err(|_| {
            format!(
                "Value '{}' of parameter '{}' isn't a valid integer",
                value, name
            )
        }),
    }
}

/// Parameters of a `DELETE` on a cluster.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClusterDeleteServerRequest {
    /// `Some(false)` keeps the cloud resources of the cluster.
    pub deprovision: Option<bool>,
}

impl ClusterDeleteServerRequest {
    pub(crate) fn from_query(query: &HashMap<String, String>) -> Result<Self, String> {
        let deprovision = match query.get("deprovision").map(|v| v.trim()) {
            None => None,
            Some("true") => Some(true),
            Some("false") => Some(false),
            Some(value) => {
                return Err(format!(
                    "Value '{}' of parameter 'deprovision' isn't a valid boolean",
                    value
                ))
            }
        };
        Ok(Self { deprovision })
    }
}

/// Response of an operation on a single object.
///
/// The status defaults to the success status of the operation: 200 for `GET`,
/// `PATCH` and actions, 201 for `POST` on a collection, 204 for `DELETE`.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerResponse<T> {
    pub(crate) status: Option<u16>,
    pub(crate) body: Option<T>,
}

impl<T> Default for ServerResponse<T> {
    fn default() -> Self {
        Self {
            status: None,
            body: None,
        }
    }
}

impl<T> ServerResponse<T> {
    /// Response without body.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_body(body: T) -> Self {
        Self {
            status: None,
            body: Some(body),
        }
    }

    pub fn status(mut self, value: u16) -> Self {
        self.status = Some(value);
        self
    }

    pub fn body(mut self, value: T) -> Self {
        self.body = Some(value);
        self
    }
}

/// Response of a `GET` on a collection.
#[derive(Debug, Clone, PartialEq)]
pub struct ListServerResponse<T> {
    pub(crate) status: Option<u16>,
    pub(crate) items: Vec<T>,
    pub(crate) page: Option<i32>,
    pub(crate) size: Option<i32>,
    pub(crate) total: Option<i32>,
}

impl<T> ListServerResponse<T> {
    pub fn new(items: Vec<T>) -> Self {
        Self {
            status: None,
            items,
            page: None,
            size: None,
            total: None,
        }
    }

    pub fn status(mut self, value: u16) -> Self {
        self.status = Some(value);
        self
    }

    pub fn page(mut self, value: i32) -> Self {
        self.page = Some(value);
        self
    }

    pub fn size(mut self, value: i32) -> Self {
        self.size = Some(value);
        self
    }

    pub fn total(mut self, value: i32) -> Self {
        self.total = Some(value);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_list_request_parsing() {
        let request = ListServerRequest::from_query(&query(&[
            ("page", "2"),
            ("size", "10"),
            ("search", "name = 'x'"),
        ]))
        .unwrap();

        assert_eq!(request.page, Some(2));
        assert_eq!(request.size, Some(10));
        assert_eq!(request.search.as_deref(), Some("name = 'x'"));
        assert_eq!(request.order, None);
    }

    #[test]
    fn test_list_request_empty_search_is_absent() {
        let request = ListServerRequest::from_query(&query(&[("search", "  ")])).unwrap();
        assert_eq!(request.search, None);
    }

    #[test]
    fn test_list_request_invalid_integer() {
        let error = ListServerRequest::from_query(&query(&[("size", "ten")])).unwrap_err();
        assert!(error.contains("'size'"));
    }

    #[test]
    fn test_cluster_delete_request() {
        let request = ClusterDeleteServerRequest::from_query(&query(&[])).unwrap();
        assert_eq!(request.deprovision, None);

        let request =
            ClusterDeleteServerRequest::from_query(&query(&[("deprovision", "false")])).unwrap();
        assert_eq!(request.deprovision, Some(false));

        assert!(ClusterDeleteServerRequest::from_query(&query(&[("deprovision", "no")])).is_err());
    }
}
