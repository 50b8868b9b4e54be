use std::net::SocketAddr;
use std::sync::Arc;

use log::info;

use super::routes;
use crate::error_handling::types::WebError;
use crate::query_service::QueryService;

/// HTTP server exposing the query service as JSON.
pub struct WebServer {
    service: Arc<QueryService>,
    allowed_origins: Vec<String>,
}

impl WebServer {
    pub fn new(service: Arc<QueryService>, allowed_origins: Vec<String>) -> Self {
        Self {
            service,
            allowed_origins,
        }
    }

    /// Serve on `addr` until Ctrl-C.
    pub async fn start(&self, addr: SocketAddr) -> Result<(), WebError> {
        // warp panics on a failed bind, probe first to get an error instead
        let probe = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| WebError::BindFailed(format!("{}: {}", addr, e)))?;
        drop(probe);

        let routes = routes::routes(self.service.clone(), &self.allowed_origins);
        info!("Listening on http://{}", addr);

        tokio::select! {
            _ = warp::serve(routes).run(addr) => {}
            _ = tokio::signal::ctrl_c() => {
                info!("Shutdown requested");
            }
        }
        Ok(())
    }
}
