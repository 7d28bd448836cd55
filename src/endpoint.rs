//! Component and endpoint construction.
//!
//! A [`BlobComponent`] holds the default configuration shared by every
//! endpoint it creates.  Each endpoint takes its own copy of those defaults,
//! overlays its URI options, and freezes the result behind an `Arc`, so
//! configuring one endpoint never changes another.

use std::sync::Arc;

use tracing::{debug, info};

use crate::config::{BlobConfiguration, ClientConfig, Config};
use crate::consumer::BlobConsumer;
use crate::errors::{BlobError, Result};
use crate::producer::BlobProducer;
use crate::proxy::ConfigurationProxy;
use crate::storage::azure::AzureBlobClient;
use crate::storage::backend::BlobClient;
use crate::storage::memory::MemoryBlobClient;

/// Account name used by the memory client when none is configured.
pub const DEFAULT_MEMORY_ACCOUNT: &str = "devstoreaccount1";

/// Factory for blob endpoints.
pub struct BlobComponent {
    defaults: BlobConfiguration,
    client_config: ClientConfig,
    /// Client shared by every endpoint instead of building one per endpoint.
    client: Option<Arc<dyn BlobClient>>,
}

impl BlobComponent {
    pub fn new(defaults: BlobConfiguration, client_config: ClientConfig) -> Self {
        Self {
            defaults,
            client_config,
            client: None,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.endpoint.clone(), config.client.clone())
    }

    /// Use `client` for every endpoint.
    pub fn with_client(mut self, client: Arc<dyn BlobClient>) -> Self {
        self.client = Some(client);
        self
    }

    pub fn defaults(&self) -> &BlobConfiguration {
        &self.defaults
    }

    /// Create an endpoint from the defaults overlaid with `uri`.
    pub fn create_endpoint(&self, uri: &str) -> Result<BlobEndpoint> {
        let mut config = self.defaults.clone();
        config.apply_uri(uri)?;
        self.build(config)
    }

    /// Create an endpoint from the defaults alone.
    pub fn create_default_endpoint(&self) -> Result<BlobEndpoint> {
        self.build(self.defaults.clone())
    }

    fn build(&self, config: BlobConfiguration) -> Result<BlobEndpoint> {
        let client = match &self.client {
            Some(client) => client.clone(),
            None => build_client(&config, &self.client_config)?,
        };
        info!(
            "Blob endpoint created: account={} container={} operation={}",
            client.account_name(),
            config.container_name.as_deref().unwrap_or("-"),
            config.operation
        );
        debug!("Blob endpoint options: {:?}", config.describe());
        Ok(BlobEndpoint {
            config: Arc::new(config),
            client,
        })
    }
}

/// One configured endpoint: a frozen configuration plus its client.
#[derive(Clone)]
pub struct BlobEndpoint {
    config: Arc<BlobConfiguration>,
    client: Arc<dyn BlobClient>,
}

impl BlobEndpoint {
    pub fn configuration(&self) -> &BlobConfiguration {
        &self.config
    }

    pub fn client(&self) -> Arc<dyn BlobClient> {
        self.client.clone()
    }

    pub fn producer(&self) -> BlobProducer {
        BlobProducer::new(self.client.clone(), ConfigurationProxy::new(self.config.clone()))
    }

    pub fn consumer(&self) -> BlobConsumer {
        BlobConsumer::new(self.client.clone(), ConfigurationProxy::new(self.config.clone()))
    }
}

/// Build the storage client selected by `client_config.backend`.
fn build_client(
    config: &BlobConfiguration,
    client_config: &ClientConfig,
) -> Result<Arc<dyn BlobClient>> {
    match client_config.backend.as_str() {
        "azure" => {
            let client = AzureBlobClient::new(config)?;
            info!("Azure blob client initialized: account={}", client.account_name());
            Ok(Arc::new(client))
        }
        "memory" => {
            let account = config
                .account_name
                .clone()
                .unwrap_or_else(|| DEFAULT_MEMORY_ACCOUNT.to_string());
            let max_size_bytes = client_config
                .memory
                .as_ref()
                .map(|m| m.max_size_bytes)
                .unwrap_or(0);
            info!(
                "Memory blob client initialized: account={} max_size_bytes={}",
                account, max_size_bytes
            );
            Ok(Arc::new(MemoryBlobClient::with_limit(account, max_size_bytes)))
        }
        other => Err(BlobError::config(format!(
            "unknown client backend '{other}' (expected 'azure' or 'memory')"
        ))),
    }
}
