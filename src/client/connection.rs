use std::sync::Arc;
use std::time::Duration;

use reqwest::{Method, Url};

use super::clusters_mgmt::ClustersMgmtClient;
use super::service_logs::ServiceLogsClient;
use crate::error::{Error, Result};

/// Default timeout of a single round trip
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Default user agent sent with every request
pub const DEFAULT_USER_AGENT: &str = concat!("ocm-sdk/", env!("CARGO_PKG_VERSION"));

/// Connection to an API server, shared by all the clients created from it.
///
/// Cloning is cheap: clones share the underlying HTTP connection pool.
#[derive(Clone)]
pub struct Connection {
    inner: Arc<ConnectionInner>,
}

struct ConnectionInner {
    http: reqwest::Client,
    url: Url,
    token: Option<String>,
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("url", &self.inner.url.as_str())
            .field("authenticated", &self.inner.token.is_some())
            .finish()
    }
}

impl Connection {
    pub fn builder() -> ConnectionBuilder {
        ConnectionBuilder::default()
    }

    pub fn url(&self) -> &Url {
        &self.inner.url
    }

    /// Root of the `clusters_mgmt` service.
    pub fn clusters_mgmt(&self) -> ClustersMgmtClient {
        ClustersMgmtClient::new(self.clone(), "/api/clusters_mgmt".to_string())
    }

    /// Root of the `service_logs` service.
    pub fn service_logs(&self) -> ServiceLogsClient {
        ServiceLogsClient::new(self.clone(), "/api/service_logs".to_string())
    }

    /// Absolute URL of an API path.
    pub(crate) fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.inner.url.as_str().trim_end_matches('/'), path)
    }

    pub(crate) fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        let mut request = self.inner.http.request(method, self.endpoint(path));
        if let Some(ref token) = self.inner.token {
            request = request.bearer_auth(token);
        }
        request
    }
}

/// Builder for [`Connection`]
#[derive(Debug, Clone)]
pub struct ConnectionBuilder {
    url: Option<String>,
    token: Option<String>,
    user_agent: String,
    timeout: Duration,
}

impl Default for ConnectionBuilder {
    fn default() -> Self {
        Self {
            url: None,
            token: None,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl ConnectionBuilder {
    /// Base URL of the server, e.g. `https://api.example.com`
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Bearer token sent in the `Authorization` header
    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn build(self) -> Result<Connection> {
        let raw = self
            .url
            .ok_or_else(|| Error::InvalidUrl("no URL given".to_string()))?;
        let url = Url::parse(&raw).map_err(|e| Error::InvalidUrl(format!("{}: {}", raw, e)))?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(Error::InvalidUrl(format!(
                "{}: scheme must be http or https",
                raw
            )));
        }

        let http = reqwest::Client::builder()
            .timeout(self.timeout)
            .user_agent(self.user_agent)
            .build()?;

        Ok(Connection {
            inner: Arc::new(ConnectionInner {
                http,
                url,
                token: self.token.filter(|t| !t.is_empty()),
            }),
        })
    }
}
