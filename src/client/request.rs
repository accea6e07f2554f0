//! Generic request builders and response wrappers.
//!
//! Every operation of the API is one of a handful of shapes (get, list, add,
//! update, delete, action). The typed clients hand out these builders bound
//! to a path and a body type.

use std::fmt::Display;
use std::marker::PhantomData;
use std::time::Duration;

use reqwest::header::HeaderMap;
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::time::Instant;
use tracing::debug;

use super::Connection;
use crate::error::{ApiError, Error, Result};
use crate::model::Page;

/// State shared by all request builders: target path, query and headers.
#[derive(Clone)]
pub(crate) struct RequestCore {
    connection: Connection,
    path: String,
    query: Vec<(String, String)>,
    headers: Vec<(String, String)>,
}

/// Undecoded result of a round trip
pub(crate) struct RawResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: Vec<u8>,
}

impl RawResponse {
    fn api_error(&self) -> Option<ApiError> {
        if self.status.as_u16() >= 400 {
            Some(ApiError::from_body(self.status.as_u16(), &self.body))
        } else {
            None
        }
    }
}

impl RequestCore {
    pub(crate) fn new(connection: Connection, path: String) -> Self {
        Self {
            connection,
            path,
            query: Vec::new(),
            headers: Vec::new(),
        }
    }

    fn add_parameter(&mut self, name: &str, value: impl Display) {
        self.query.push((name.to_string(), value.to_string()));
    }

    fn add_header(&mut self, name: &str, value: impl Display) {
        self.headers.push((name.to_string(), value.to_string()));
    }

    /// Performs one round trip.
    ///
    /// Query and headers are copied so the builder can be sent again, and
    /// `extra` parameters are appended after the ones added by the caller.
    async fn round_trip(
        &self,
        method: Method,
        extra: Vec<(String, String)>,
        body: Option<Vec<u8>>,
        deadline: Option<Instant>,
    ) -> Result<RawResponse> {
        let mut query = self.query.clone();
        query.extend(extra);

        let mut request = self.connection.request(method.clone(), &self.path);
        if !query.is_empty() {
            request = request.query(&query);
        }
        for (name, value) in &self.headers {
            request = request.header(name.as_str(), value.as_str());
        }
        if let Some(body) = body {
            request = request
                .header(reqwest::header::CONTENT_TYPE, "application/json")
                .body(body);
        }

        debug!("Sending {} request to {}", method, self.path);

        let exchange = async {
            let response = request.send().await?;
            let status = response.status();
            let headers = response.headers().clone();
            let body = response.bytes().await?.to_vec();
            Ok::<_, Error>(RawResponse {
                status,
                headers,
                body,
            })
        };

        let response = match deadline {
            Some(deadline) => tokio::time::timeout_at(deadline, exchange)
                .await
                .map_err(|_| Error::DeadlineExceeded)??,
            None => exchange.await?,
        };

        debug!(
            "Received status {} for {} request to {}",
            response.status.as_u16(),
            method,
            self.path
        );

        Ok(response)
    }
}

/// Response to a request for a single object, or to a request without body.
#[derive(Debug, Clone)]
pub struct Response<T> {
    status: StatusCode,
    headers: HeaderMap,
    body: Option<T>,
    error: Option<ApiError>,
}

impl<T> Response<T> {
    pub fn status(&self) -> u16 {
        self.status.as_u16()
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn body(&self) -> Option<&T> {
        self.body.as_ref()
    }

    pub fn into_body(self) -> Option<T> {
        self.body
    }

    /// Error envelope sent by the server, for statuses >= 400.
    pub fn error(&self) -> Option<&ApiError> {
        self.error.as_ref()
    }

    fn into_result(self) -> Result<Self> {
        match self.error {
            Some(error) => Err(Error::Api(error)),
            None => Ok(self),
        }
    }

    fn decode(raw: RawResponse, decode_body: bool) -> Result<Self>
    where
        T: DeserializeOwned,
    {
        let error = raw.api_error();
        let body = if error.is_none() && decode_body && !raw.body.is_empty() {
            Some(serde_json::from_slice(&raw.body)?)
        } else {
            None
        };
        Ok(Self {
            status: raw.status,
            headers: raw.headers,
            body,
            error,
        })
    }
}

/// Response to a request for a page of a collection.
#[derive(Debug, Clone)]
pub struct ListResponse<T> {
    status: StatusCode,
    headers: HeaderMap,
    page: Option<i32>,
    size: Option<i32>,
    total: Option<i32>,
    items: Vec<T>,
}

impl<T> ListResponse<T> {
    pub fn status(&self) -> u16 {
        self.status.as_u16()
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Index of the returned page, starting at 1.
    pub fn page(&self) -> i32 {
        self.page.unwrap_or_default()
    }

    /// Number of items in the returned page.
    pub fn size(&self) -> i32 {
        self.size.unwrap_or(self.items.len() as i32)
    }

    /// Number of items in the whole collection.
    pub fn total(&self) -> i32 {
        self.total.unwrap_or_default()
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn into_items(self) -> Vec<T> {
        self.items
    }
}

macro_rules! request_options {
    ($name:ident $(<$param:ident>)?) => {
        impl$(<$param>)? $name$(<$param>)? {
            /// Adds a query parameter. Adding the same name twice sends both values.
            pub fn parameter(mut self, name: &str, value: impl Display) -> Self {
                self.core.add_parameter(name, value);
                self
            }

            pub fn header(mut self, name: &str, value: impl Display) -> Self {
                self.core.add_header(name, value);
                self
            }
        }
    };
}

/// Request that retrieves a single object.
pub struct GetRequest<T> {
    core: RequestCore,
    marker: PhantomData<fn() -> T>,
}

request_options!(GetRequest<T>);

impl<T: DeserializeOwned> GetRequest<T> {
    pub(crate) fn new(core: RequestCore) -> Self {
        Self {
            core,
            marker: PhantomData,
        }
    }

    pub async fn send(&self) -> Result<Response<T>> {
        self.execute(None).await?.into_result()
    }

    /// Sends the request, giving up when `timeout` elapses.
    pub async fn send_with_timeout(&self, timeout: Duration) -> Result<Response<T>> {
        self.execute(Some(Instant::now() + timeout))
            .await?
            .into_result()
    }

    /// Like `send`, but error statuses are kept inside the response.
    pub(crate) async fn execute(&self, deadline: Option<Instant>) -> Result<Response<T>> {
        let raw = self
            .core
            .round_trip(Method::GET, Vec::new(), None, deadline)
            .await?;
        Response::decode(raw, true)
    }
}

/// Request that retrieves a page of a collection.
pub struct ListRequest<T> {
    core: RequestCore,
    page: Option<i32>,
    size: Option<i32>,
    search: Option<String>,
    order: Option<String>,
    marker: PhantomData<fn() -> T>,
}

request_options!(ListRequest<T>);

impl<T: DeserializeOwned> ListRequest<T> {
    pub(crate) fn new(core: RequestCore) -> Self {
        Self {
            core,
            page: None,
            size: None,
            search: None,
            order: None,
            marker: PhantomData,
        }
    }

    /// Index of the requested page, starting at 1.
    pub fn page(mut self, value: i32) -> Self {
        self.page = Some(value);
        self
    }

    /// Maximum number of items of the requested page.
    pub fn size(mut self, value: i32) -> Self {
        self.size = Some(value);
        self
    }

    /// Search criteria, e.g. `name = 'mycluster' and state = 'ready'`.
    pub fn search(mut self, value: impl Into<String>) -> Self {
        self.search = Some(value.into());
        self
    }

    /// Order criteria, e.g. `name asc`.
    pub fn order(mut self, value: impl Into<String>) -> Self {
        self.order = Some(value.into());
        self
    }

    fn paging(&self) -> Vec<(String, String)> {
        let mut extra = Vec::new();
        if let Some(page) = self.page {
            extra.push(("page".to_string(), page.to_string()));
        }
        if let Some(size) = self.size {
            extra.push(("size".to_string(), size.to_string()));
        }
        if let Some(ref search) = self.search {
            extra.push(("search".to_string(), search.clone()));
        }
        if let Some(ref order) = self.order {
            extra.push(("order".to_string(), order.clone()));
        }
        extra
    }

    pub async fn send(&self) -> Result<ListResponse<T>> {
        self.send_inner(None).await
    }

    pub async fn send_with_timeout(&self, timeout: Duration) -> Result<ListResponse<T>> {
        self.send_inner(Some(Instant::now() + timeout)).await
    }

    async fn send_inner(&self, deadline: Option<Instant>) -> Result<ListResponse<T>> {
        let raw = self
            .core
            .round_trip(Method::GET, self.paging(), None, deadline)
            .await?;
        if let Some(error) = raw.api_error() {
            return Err(Error::Api(error));
        }
        let page: Page<T> = serde_json::from_slice(&raw.body)?;
        Ok(ListResponse {
            status: raw.status,
            headers: raw.headers,
            page: page.page,
            size: page.size,
            total: page.total,
            items: page.items,
        })
    }
}

/// Request that sends an object and receives one back, `POST` or `PATCH`.
pub struct BodyRequest<T> {
    core: RequestCore,
    method: Method,
    body: Option<T>,
}

/// Request that adds an object to a collection.
pub type AddRequest<T> = BodyRequest<T>;

/// Request that updates an object, sending only the fields that are set.
pub type UpdateRequest<T> = BodyRequest<T>;

request_options!(BodyRequest<T>);

impl<T: Serialize + DeserializeOwned> BodyRequest<T> {
    pub(crate) fn add(core: RequestCore) -> Self {
        Self {
            core,
            method: Method::POST,
            body: None,
        }
    }

    pub(crate) fn update(core: RequestCore) -> Self {
        Self {
            core,
            method: Method::PATCH,
            body: None,
        }
    }

    pub fn body(mut self, value: T) -> Self {
        self.body = Some(value);
        self
    }

    pub async fn send(&self) -> Result<Response<T>> {
        self.send_inner(None).await
    }

    pub async fn send_with_timeout(&self, timeout: Duration) -> Result<Response<T>> {
        self.send_inner(Some(Instant::now() + timeout)).await
    }

    async fn send_inner(&self, deadline: Option<Instant>) -> Result<Response<T>> {
        let body = match self.body {
            Some(ref body) => serde_json::to_vec(body)?,
            None => b"{}".to_vec(),
        };
        let raw = self
            .core
            .round_trip(self.method.clone(), Vec::new(), Some(body), deadline)
            .await?;
        Response::decode(raw, true)?.into_result()
    }
}

/// Request without request or response body: deletes and actions such as
/// `hibernate`.
pub struct EmptyRequest {
    core: RequestCore,
    method: Method,
}

/// Request that deletes an object.
pub type DeleteRequest = EmptyRequest;

/// Request that triggers an action on an object.
pub type ActionRequest = EmptyRequest;

request_options!(EmptyRequest);

impl EmptyRequest {
    pub(crate) fn delete(core: RequestCore) -> Self {
        Self {
            core,
            method: Method::DELETE,
        }
    }

    pub(crate) fn action(core: RequestCore) -> Self {
        Self {
            core,
            method: Method::POST,
        }
    }

    pub async fn send(&self) -> Result<Response<()>> {
        self.send_inner(Vec::new(), None).await
    }

    pub async fn send_with_timeout(&self, timeout: Duration) -> Result<Response<()>> {
        self.send_inner(Vec::new(), Some(Instant::now() + timeout))
            .await
    }

    pub(crate) async fn send_inner(
        &self,
        extra: Vec<(String, String)>,
        deadline: Option<Instant>,
    ) -> Result<Response<()>> {
        let raw = self
            .core
            .round_trip(self.method.clone(), extra, None, deadline)
            .await?;
        Response::decode(raw, false)?.into_result()
    }
}
