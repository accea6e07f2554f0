//! Server side of the API: one trait per resource, and a router that walks
//! the request path through the locators of those traits.

pub mod clusters_mgmt;
mod dispatch;
pub mod request;
pub mod service_logs;

use std::sync::Arc;

use axum::Router;
use tower_http::trace::TraceLayer;

pub use clusters_mgmt::ClustersMgmtServer;
pub use request::{
    ClusterDeleteServerRequest, ListServerRequest, ListServerResponse, ServerError,
    ServerResponse, ServerResult,
};
pub use service_logs::ServiceLogsServer;

/// Services served by the router. A missing service answers 404.
#[derive(Clone, Default)]
pub struct Server {
    clusters_mgmt: Option<Arc<dyn ClustersMgmtServer>>,
    service_logs: Option<Arc<dyn ServiceLogsServer>>,
}

impl Server {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clusters_mgmt(mut self, server: Arc<dyn ClustersMgmtServer>) -> Self {
        self.clusters_mgmt = Some(server);
        self
    }

    pub fn service_logs(mut self, server: Arc<dyn ServiceLogsServer>) -> Self {
        self.service_logs = Some(server);
        self
    }
}

/// Create the API router
pub fn create_router(server: Server) -> Router {
    Router::new()
        .fallback(dispatch::handle)
        .with_state(Arc::new(server))
        .layer(TraceLayer::new_for_http())
}
