//! Polling consumer.
//!
//! Each [`BlobConsumer::poll`] reads blobs using the endpoint configuration
//! alone: the configured blob if one is named, otherwise every blob in the
//! container that passes the prefix/regex filters.  Blobs are written under
//! the configured file directory when there is one.  A missing container or
//! blob yields an empty poll rather than an error.  Scheduling belongs to
//! the host; [`BlobConsumer::poll_interval`] is the delay it should use.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::constants::{BLOB_CONTAINER_NAME, BLOB_NAME};
use crate::envelope::{self, VendorResult};
use crate::errors::{BlobError, Result};
use crate::exchange::{Exchange, Headers};
use crate::metrics;
use crate::producer::{empty_if_not_found, file_path, full_match, write_file};
use crate::proxy::{ConfigurationProxy, ResolvedOptions};
use crate::storage::backend::BlobClient;

/// Delay between polls when none is configured.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Label used for not-found accounting.
const CONSUMER: &str = "consumer";

/// Reads blobs from one endpoint.
#[derive(Clone)]
pub struct BlobConsumer {
    client: Arc<dyn BlobClient>,
    proxy: ConfigurationProxy,
}

impl BlobConsumer {
    pub fn new(client: Arc<dyn BlobClient>, proxy: ConfigurationProxy) -> Self {
        Self { client, proxy }
    }

    pub fn poll_interval(&self) -> Duration {
        self.proxy
            .configuration()
            .poll_interval
            .unwrap_or(DEFAULT_POLL_INTERVAL)
    }

    /// One exchange per blob read in this poll.
    pub async fn poll(&self) -> Result<Vec<Exchange>> {
        let options = self.proxy.resolve(&Headers::new())?;
        let container = options.require_container()?;
        match options.blob_name.as_deref() {
            Some(blob) => Ok(self.fetch(&options, container, blob).await?.into_iter().collect()),
            None => self.fetch_all(&options, container).await,
        }
    }

    async fn fetch_all(&self, options: &ResolvedOptions, container: &str) -> Result<Vec<Exchange>> {
        let filter = options.regex.as_deref().map(full_match).transpose()?;
        let result = self
            .client
            .list_blobs(container, &options.list_blobs_options, options.timeout)
            .await;
        let items = empty_if_not_found(CONSUMER, result)?;

        let mut exchanges = Vec::with_capacity(items.len());
        for item in items {
            if filter.as_ref().is_some_and(|re| !re.is_match(&item.name)) {
                continue;
            }
            if let Some(exchange) = self.fetch(options, container, &item.name).await? {
                exchanges.push(exchange);
            }
        }
        debug!("poll {}: {} blob(s)", container, exchanges.len());
        Ok(exchanges)
    }

    /// Download one blob, or `None` when it does not exist.
    ///
    /// With a file directory configured the blob is written under it and
    /// the exchange carries the file path instead of the bytes.
    async fn fetch(
        &self,
        options: &ResolvedOptions,
        container: &str,
        blob: &str,
    ) -> Result<Option<Exchange>> {
        let path = options
            .file_dir
            .as_deref()
            .map(|dir| file_path(dir, blob))
            .transpose()?;
        let downloaded = match self
            .client
            .download(
                container,
                blob,
                options.blob_range,
                &options.request_conditions,
                options.timeout,
            )
            .await
        {
            Ok(downloaded) => downloaded,
            Err(BlobError::NotFound { resource }) => {
                warn!("poll: {} not found, skipping", resource);
                metrics::record_not_found_as_empty(CONSUMER);
                return Ok(None);
            }
            Err(err) => return Err(err),
        };
        metrics::record_downloaded(downloaded.data.len());

        let result = match path {
            Some(path) => {
                write_file(&path, &downloaded.data).await?;
                debug!("poll: {}/{} written to {}", container, blob, path.display());
                VendorResult::DownloadedToFile {
                    path,
                    properties: downloaded.properties,
                }
            }
            None => VendorResult::Downloaded {
                data: downloaded.data,
                properties: downloaded.properties,
            },
        };
        let headers = Headers::new()
            .with(BLOB_CONTAINER_NAME, container)
            .with(BLOB_NAME, blob);
        let mut exchange = Exchange::with_headers(headers);
        exchange.apply(envelope::build(result));
        Ok(Some(exchange))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BlobConfiguration;
    use crate::constants::BLOB_SIZE;
    use crate::exchange::{Body, HeaderValue};
    use crate::storage::backend::WriteOptions;
    use crate::storage::memory::MemoryBlobClient;
    use bytes::Bytes;

    fn make_consumer(config: BlobConfiguration) -> (BlobConsumer, Arc<MemoryBlobClient>) {
        let client = Arc::new(MemoryBlobClient::new("devaccount"));
        let consumer = BlobConsumer::new(client.clone(), ConfigurationProxy::new(Arc::new(config)));
        (consumer, client)
    }

    fn in_box() -> BlobConfiguration {
        BlobConfiguration {
            container_name: Some("box".to_string()),
            ..Default::default()
        }
    }

    async fn seed(client: &MemoryBlobClient, names: &[&str]) {
        client.create_container("box", None, None, None).await.unwrap();
        for name in names {
            client
                .upload_block_blob(
                    "box",
                    name,
                    Bytes::from(name.to_string()),
                    &WriteOptions::default(),
                    None,
                )
                .await
                .unwrap();
        }
    }

    #[tokio::test]
    async fn test_poll_missing_container_is_empty() {
        let (consumer, _) = make_consumer(in_box());
        assert!(consumer.poll().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_poll_missing_blob_is_empty() {
        let (consumer, client) = make_consumer(BlobConfiguration {
            blob_name: Some("gone.txt".to_string()),
            ..in_box()
        });
        seed(&client, &[]).await;
        assert!(consumer.poll().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_poll_named_blob() {
        let (consumer, client) = make_consumer(BlobConfiguration {
            blob_name: Some("a.txt".to_string()),
            ..in_box()
        });
        seed(&client, &["a.txt", "b.txt"]).await;
        let exchanges = consumer.poll().await.unwrap();
        assert_eq!(exchanges.len(), 1);
        assert_eq!(exchanges[0].body, Body::Bytes(Bytes::from_static(b"a.txt")));
        assert_eq!(
            exchanges[0].headers.get(BLOB_SIZE),
            Some(&HeaderValue::Integer(5))
        );
    }

    #[tokio::test]
    async fn test_poll_all_with_regex() {
        let (consumer, client) = make_consumer(BlobConfiguration {
            regex: Some(".*\\.csv".to_string()),
            ..in_box()
        });
        seed(&client, &["a.csv", "b.txt", "c.csv"]).await;
        let exchanges = consumer.poll().await.unwrap();
        let names: Vec<_> = exchanges
            .iter()
            .map(|e| e.headers.get(BLOB_NAME).cloned())
            .collect();
        assert_eq!(
            names,
            vec![Some(HeaderValue::from("a.csv")), Some(HeaderValue::from("c.csv"))]
        );
    }

    #[tokio::test]
    async fn test_poll_writes_to_file_dir() {
        let dir = tempfile::tempdir().unwrap();
        let (consumer, client) = make_consumer(BlobConfiguration {
            file_dir: Some(dir.path().to_path_buf()),
            ..in_box()
        });
        seed(&client, &["a.txt", "logs/b.txt"]).await;
        let exchanges = consumer.poll().await.unwrap();
        assert_eq!(exchanges.len(), 2);
        let expected = dir.path().join("logs/b.txt");
        assert_eq!(exchanges[1].body, Body::Path(expected.clone()));
        assert_eq!(std::fs::read(&expected).unwrap(), b"logs/b.txt");
        assert_eq!(std::fs::read(dir.path().join("a.txt")).unwrap(), b"a.txt");
    }

    #[tokio::test]
    async fn test_poll_requires_container() {
        let (consumer, _) = make_consumer(BlobConfiguration::default());
        assert!(matches!(
            consumer.poll().await.unwrap_err(),
            BlobError::Configuration { .. }
        ));
    }

    #[test]
    fn test_poll_interval() {
        let (consumer, _) = make_consumer(in_box());
        assert_eq!(consumer.poll_interval(), DEFAULT_POLL_INTERVAL);
        let (consumer, _) = make_consumer(BlobConfiguration {
            poll_interval: Some(Duration::from_secs(5)),
            ..in_box()
        });
        assert_eq!(consumer.poll_interval(), Duration::from_secs(5));
    }
}
