use crate::configuration::config::Config;
use crate::error_handling::types::*;
use crate::query_service::QueryService;
use crate::storage::database_storage::DatabaseStorage;
use crate::storage::Storage;
use crate::web_interface::WebServer;
use log::info;
use std::sync::Arc;

/// Owns the process-wide pieces: configuration, the store and the query
/// service built on top of it.
pub struct Controller {
    pub config: Config,
    service: Arc<QueryService>,
}

impl Controller {
    /// Opens the configured database and wires the query service to it.
    pub async fn new(config: Config) -> Result<Self, ControllerError> {
        config.validate()?;
        info!("Opening database {}", config.database_path.display());
        let storage = DatabaseStorage::open(&config.database_path).await?;
        Ok(Self::with_storage(config, Arc::new(storage)))
    }

    pub fn with_storage(config: Config, storage: Arc<dyn Storage>) -> Self {
        let service = Arc::new(QueryService::new(storage, config.query_timeout()));
        Self { config, service }
    }

    pub fn service(&self) -> Arc<QueryService> {
        self.service.clone()
    }

    /// Serves the HTTP API until Ctrl-C.
    pub async fn run(&self) -> Result<(), ControllerError> {
        let addr = self.config.socket_addr()?;
        let server = WebServer::new(self.service.clone(), self.config.allowed_origins.clone());
        server.start(addr).await?;
        info!("Controller stopped");
        Ok(())
    }
}
