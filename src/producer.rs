//! Operation dispatch.
//!
//! [`BlobProducer::process`] resolves the options of one exchange, runs the
//! handler for the resolved [`BlobOperation`], and writes the resulting
//! envelope back onto the exchange.  Option resolution happens before
//! dispatch, so an unsupported operation name fails without touching the
//! client.

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::Bytes;
use regex::Regex;
use tracing::{debug, warn};

use crate::envelope::{self, VendorResult};
use crate::errors::{BlobError, Result};
use crate::exchange::{Body, Exchange};
use crate::metrics;
use crate::operations::BlobOperation;
use crate::options::{BlobBlock, RequestConditions};
use crate::proxy::{ConfigurationProxy, ResolvedOptions};
use crate::storage::backend::{BlobClient, CopySource, WriteOptions};

/// Default lifetime of a generated download link.
pub const DEFAULT_DOWNLOAD_LINK_EXPIRATION: Duration = Duration::from_secs(60 * 60);

/// Executes blob operations against one endpoint's client.
#[derive(Clone)]
pub struct BlobProducer {
    client: Arc<dyn BlobClient>,
    proxy: ConfigurationProxy,
}

impl BlobProducer {
    pub fn new(client: Arc<dyn BlobClient>, proxy: ConfigurationProxy) -> Self {
        Self { client, proxy }
    }

    /// Run the exchange's operation and apply its envelope.
    ///
    /// On error the exchange is left untouched.
    pub async fn process(&self, exchange: &mut Exchange) -> Result<()> {
        let options = self.proxy.resolve(&exchange.headers)?;
        let operation = options.operation;
        let start = Instant::now();
        debug!("dispatch {}", operation);
        let result = self.dispatch(&options, &exchange.body).await;
        match result {
            Ok(result) => {
                metrics::record_operation(operation, "ok", start.elapsed());
                debug!("{} -> {}", operation, result.kind());
                exchange.apply(envelope::build(result));
                Ok(())
            }
            Err(err) => {
                metrics::record_operation(operation, err.code(), start.elapsed());
                debug!("{} failed: {}", operation, err);
                Err(err)
            }
        }
    }

    async fn dispatch(&self, options: &ResolvedOptions, body: &Body) -> Result<VendorResult> {
        match options.operation {
            BlobOperation::ListBlobContainers => self.list_blob_containers(options).await,
            BlobOperation::CreateBlobContainer => self.create_blob_container(options).await,
            BlobOperation::DeleteBlobContainer => self.delete_blob_container(options).await,
            BlobOperation::ListBlobs => self.list_blobs(options).await,
            BlobOperation::GetBlob => self.get_blob(options).await,
            BlobOperation::DeleteBlob => self.delete_blob(options).await,
            BlobOperation::DownloadBlobToFile => self.download_blob_to_file(options).await,
            BlobOperation::DownloadLink => self.download_link(options),
            BlobOperation::UploadBlockBlob => self.upload_block_blob(options, body).await,
            BlobOperation::StageBlockBlobList => self.stage_block_blob_list(options, body).await,
            BlobOperation::CommitBlobBlockList => self.commit_blob_block_list(options, body).await,
            BlobOperation::GetBlobBlockList => self.get_blob_block_list(options).await,
            BlobOperation::CreateAppendBlob => self.create_append_blob(options).await,
            BlobOperation::CommitAppendBlob => self.commit_append_blob(options, body).await,
            BlobOperation::CreatePageBlob => self.create_page_blob(options).await,
            BlobOperation::UploadPageBlob => self.upload_page_blob(options, body).await,
            BlobOperation::ResizePageBlob => self.resize_page_blob(options).await,
            BlobOperation::ClearPageBlob => self.clear_page_blob(options).await,
            BlobOperation::GetPageBlobRanges => self.get_page_blob_ranges(options).await,
            BlobOperation::CopyBlob => self.copy_blob(options).await,
        }
    }

    // ── Service ─────────────────────────────────────────────────────

    async fn list_blob_containers(&self, options: &ResolvedOptions) -> Result<VendorResult> {
        let result = self
            .client
            .list_containers(&options.list_containers_options, options.timeout)
            .await;
        let items = empty_if_not_found(BlobOperation::ListBlobContainers.as_str(), result)?;
        Ok(VendorResult::Containers(items))
    }

    // ── Container ───────────────────────────────────────────────────

    async fn create_blob_container(&self, options: &ResolvedOptions) -> Result<VendorResult> {
        let container = options.require_container()?;
        let raw = self
            .client
            .create_container(
                container,
                options.metadata.as_ref(),
                options.public_access_type,
                options.timeout,
            )
            .await?;
        Ok(VendorResult::RawHeaders(raw))
    }

    async fn delete_blob_container(&self, options: &ResolvedOptions) -> Result<VendorResult> {
        let container = options.require_container()?;
        let raw = self
            .client
            .delete_container(container, &options.request_conditions, options.timeout)
            .await?;
        Ok(VendorResult::RawHeaders(raw))
    }

    async fn list_blobs(&self, options: &ResolvedOptions) -> Result<VendorResult> {
        let container = options.require_container()?;
        let filter = options.regex.as_deref().map(full_match).transpose()?;
        let result = self
            .client
            .list_blobs(container, &options.list_blobs_options, options.timeout)
            .await;
        let mut items = empty_if_not_found(BlobOperation::ListBlobs.as_str(), result)?;
        if let Some(filter) = filter {
            items.retain(|item| filter.is_match(&item.name));
        }
        Ok(VendorResult::Blobs(items))
    }

    // ── Blob reads ──────────────────────────────────────────────────

    async fn get_blob(&self, options: &ResolvedOptions) -> Result<VendorResult> {
        let (container, blob) = blob_address(options)?;
        let downloaded = self
            .client
            .download(
                container,
                blob,
                options.blob_range,
                &options.request_conditions,
                options.timeout,
            )
            .await?;
        metrics::record_downloaded(downloaded.data.len());
        Ok(VendorResult::Downloaded {
            data: downloaded.data,
            properties: downloaded.properties,
        })
    }

    async fn download_blob_to_file(&self, options: &ResolvedOptions) -> Result<VendorResult> {
        let (container, blob) = blob_address(options)?;
        let dir = options.file_dir.as_deref().ok_or_else(|| {
            BlobError::config("file directory is required to download a blob to a file")
        })?;
        let path = file_path(dir, blob)?;
        let downloaded = self
            .client
            .download(
                container,
                blob,
                options.blob_range,
                &options.request_conditions,
                options.timeout,
            )
            .await?;
        write_file(&path, &downloaded.data).await?;
        metrics::record_downloaded(downloaded.data.len());
        debug!("downloaded {}/{} to {}", container, blob, path.display());
        Ok(VendorResult::DownloadedToFile {
            path,
            properties: downloaded.properties,
        })
    }

    fn download_link(&self, options: &ResolvedOptions) -> Result<VendorResult> {
        let (container, blob) = blob_address(options)?;
        let expires_in = options
            .download_link_expiration
            .unwrap_or(DEFAULT_DOWNLOAD_LINK_EXPIRATION);
        let url = self.client.download_url(container, blob, expires_in)?;
        Ok(VendorResult::Link(url))
    }

    async fn delete_blob(&self, options: &ResolvedOptions) -> Result<VendorResult> {
        let (container, blob) = blob_address(options)?;
        let raw = self
            .client
            .delete_blob(
                container,
                blob,
                options.delete_snapshots_option,
                &options.request_conditions,
                options.timeout,
            )
            .await?;
        Ok(VendorResult::RawHeaders(raw))
    }

    // ── Block blobs ─────────────────────────────────────────────────

    async fn upload_block_blob(
        &self,
        options: &ResolvedOptions,
        body: &Body,
    ) -> Result<VendorResult> {
        let (container, blob) = blob_address(options)?;
        let data = payload(options.operation, body)?;
        metrics::record_uploaded(data.len());
        let item = self
            .client
            .upload_block_blob(container, blob, data, &write_options(options), options.timeout)
            .await?;
        Ok(VendorResult::BlockBlob(item))
    }

    async fn stage_block_blob_list(
        &self,
        options: &ResolvedOptions,
        body: &Body,
    ) -> Result<VendorResult> {
        let (container, blob) = blob_address(options)?;
        let blocks = match body {
            Body::Blocks(blocks) => blocks.clone(),
            Body::Bytes(_) | Body::Text(_) => {
                vec![BlobBlock::new(payload(options.operation, body)?)]
            }
            other => return Err(unexpected_body(options.operation, other)),
        };
        if blocks.is_empty() {
            return Err(BlobError::config("no blocks to stage"));
        }
        for block in &blocks {
            metrics::record_uploaded(block.data.len());
            self.client
                .stage_block(
                    container,
                    blob,
                    block,
                    options.lease_id.as_deref(),
                    options.timeout,
                )
                .await?;
        }
        if options.commit_block_list_later {
            return Ok(VendorResult::Staged);
        }
        let ids: Vec<String> = blocks.into_iter().map(|b| b.id).collect();
        let item = self
            .client
            .commit_block_list(container, blob, &ids, &write_options(options), options.timeout)
            .await?;
        Ok(VendorResult::BlockBlob(item))
    }

    async fn commit_blob_block_list(
        &self,
        options: &ResolvedOptions,
        body: &Body,
    ) -> Result<VendorResult> {
        let (container, blob) = blob_address(options)?;
        let ids: Vec<String> = match body {
            Body::BlockIds(ids) => ids.clone(),
            Body::Blocks(blocks) => blocks.iter().map(|b| b.id.clone()).collect(),
            other => return Err(unexpected_body(options.operation, other)),
        };
        let item = self
            .client
            .commit_block_list(container, blob, &ids, &write_options(options), options.timeout)
            .await?;
        Ok(VendorResult::BlockBlob(item))
    }

    async fn get_blob_block_list(&self, options: &ResolvedOptions) -> Result<VendorResult> {
        let (container, blob) = blob_address(options)?;
        let list = self
            .client
            .get_block_list(
                container,
                blob,
                options.block_list_type,
                options.lease_id.as_deref(),
                options.timeout,
            )
            .await?;
        Ok(VendorResult::BlockList(list))
    }

    // ── Append blobs ────────────────────────────────────────────────

    async fn create_append_blob(&self, options: &ResolvedOptions) -> Result<VendorResult> {
        let (container, blob) = blob_address(options)?;
        let item = self
            .client
            .create_append_blob(container, blob, &write_options(options), options.timeout)
            .await?;
        Ok(VendorResult::AppendBlob(item))
    }

    async fn commit_append_blob(
        &self,
        options: &ResolvedOptions,
        body: &Body,
    ) -> Result<VendorResult> {
        let (container, blob) = blob_address(options)?;
        let data = payload(options.operation, body)?;
        if options.create_append_blob && !self.blob_exists(container, blob, options).await? {
            debug!("creating missing append blob {}/{}", container, blob);
            self.client
                .create_append_blob(container, blob, &creation_options(options), options.timeout)
                .await?;
        }
        metrics::record_uploaded(data.len());
        let item = self
            .client
            .append_block(
                container,
                blob,
                data,
                options.content_md5.as_deref(),
                &options.request_conditions,
                options.timeout,
            )
            .await?;
        Ok(VendorResult::AppendBlob(item))
    }

    // ── Page blobs ──────────────────────────────────────────────────

    async fn create_page_blob(&self, options: &ResolvedOptions) -> Result<VendorResult> {
        let (container, blob) = blob_address(options)?;
        let item = self
            .client
            .create_page_blob(
                container,
                blob,
                options.page_blob_size,
                options.blob_sequence_number,
                &write_options(options),
                options.timeout,
            )
            .await?;
        Ok(VendorResult::PageBlob(item))
    }

    async fn upload_page_blob(
        &self,
        options: &ResolvedOptions,
        body: &Body,
    ) -> Result<VendorResult> {
        let (container, blob) = blob_address(options)?;
        let range = options.require_page_range()?;
        let data = payload(options.operation, body)?;
        if options.create_page_blob && !self.blob_exists(container, blob, options).await? {
            debug!("creating missing page blob {}/{}", container, blob);
            self.client
                .create_page_blob(
                    container,
                    blob,
                    options.page_blob_size,
                    options.blob_sequence_number,
                    &creation_options(options),
                    options.timeout,
                )
                .await?;
        }
        metrics::record_uploaded(data.len());
        let item = self
            .client
            .upload_pages(
                container,
                blob,
                range,
                data,
                options.content_md5.as_deref(),
                &options.request_conditions,
                options.timeout,
            )
            .await?;
        Ok(VendorResult::PageBlob(item))
    }

    async fn resize_page_blob(&self, options: &ResolvedOptions) -> Result<VendorResult> {
        let (container, blob) = blob_address(options)?;
        let item = self
            .client
            .resize_page_blob(
                container,
                blob,
                options.page_blob_size,
                &options.request_conditions,
                options.timeout,
            )
            .await?;
        Ok(VendorResult::PageBlob(item))
    }

    async fn clear_page_blob(&self, options: &ResolvedOptions) -> Result<VendorResult> {
        let (container, blob) = blob_address(options)?;
        let range = options.require_page_range()?;
        let item = self
            .client
            .clear_pages(container, blob, range, &options.request_conditions, options.timeout)
            .await?;
        Ok(VendorResult::PageBlob(item))
    }

    async fn get_page_blob_ranges(&self, options: &ResolvedOptions) -> Result<VendorResult> {
        let (container, blob) = blob_address(options)?;
        let list = self
            .client
            .get_page_ranges(
                container,
                blob,
                options.blob_range,
                &options.request_conditions,
                options.timeout,
            )
            .await?;
        Ok(VendorResult::PageList(list))
    }

    // ── Copy ────────────────────────────────────────────────────────

    async fn copy_blob(&self, options: &ResolvedOptions) -> Result<VendorResult> {
        let (container, blob) = blob_address(options)?;
        let source = CopySource {
            account: options
                .source_blob_account_name
                .clone()
                .unwrap_or_else(|| self.client.account_name().to_string()),
            container: options
                .source_blob_container_name
                .clone()
                .unwrap_or_else(|| container.to_string()),
            blob: blob.to_string(),
        };
        let info = self
            .client
            .copy_blob(&source, container, blob, options.timeout)
            .await?;
        Ok(VendorResult::Copy(info))
    }

    // ── Helpers ─────────────────────────────────────────────────────

    async fn blob_exists(
        &self,
        container: &str,
        blob: &str,
        options: &ResolvedOptions,
    ) -> Result<bool> {
        match self
            .client
            .get_properties(container, blob, &RequestConditions::default(), options.timeout)
            .await
        {
            Ok(_) => Ok(true),
            Err(err) if err.is_not_found() => Ok(false),
            Err(err) => Err(err),
        }
    }
}

/// Treat a not-found listing as an empty one.
pub(crate) fn empty_if_not_found<T: Default>(label: &'static str, result: Result<T>) -> Result<T> {
    match result {
        Err(BlobError::NotFound { resource }) => {
            warn!("{}: {} not found, returning an empty result", label, resource);
            metrics::record_not_found_as_empty(label);
            Ok(T::default())
        }
        other => other,
    }
}

/// Compile `pattern` so it must match a whole blob name.
pub(crate) fn full_match(pattern: &str) -> Result<Regex> {
    Regex::new(&format!("^(?:{pattern})$"))
        .map_err(|e| BlobError::config(format!("invalid regex '{pattern}': {e}")))
}

/// Local path for `blob` under `dir`.
///
/// Only plain name segments are kept; a blob name that is absolute, climbs
/// with `..`, or has no segments at all cannot be written under `dir`.
pub(crate) fn file_path(dir: &Path, blob: &str) -> Result<PathBuf> {
    let mut relative = PathBuf::new();
    for component in Path::new(blob).components() {
        match component {
            Component::Normal(segment) => relative.push(segment),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(BlobError::config(format!(
                    "blob name '{blob}' does not resolve to a path under {}",
                    dir.display()
                )))
            }
        }
    }
    if relative.as_os_str().is_empty() {
        return Err(BlobError::config(format!(
            "blob name '{blob}' does not name a file"
        )));
    }
    Ok(dir.join(relative))
}

pub(crate) async fn write_file(path: &Path, data: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, data).await?;
    Ok(())
}

fn blob_address(options: &ResolvedOptions) -> Result<(&str, &str)> {
    Ok((options.require_container()?, options.require_blob()?))
}

fn payload(operation: BlobOperation, body: &Body) -> Result<Bytes> {
    body.as_bytes()
        .ok_or_else(|| unexpected_body(operation, body))
}

fn unexpected_body(operation: BlobOperation, body: &Body) -> BlobError {
    BlobError::config(format!(
        "{operation} cannot use a {} message body",
        body.kind()
    ))
}

fn write_options(options: &ResolvedOptions) -> WriteOptions {
    WriteOptions {
        http_headers: options.http_headers.clone(),
        metadata: options.metadata.clone(),
        access_tier: options.access_tier,
        content_md5: options.content_md5.clone(),
        conditions: options.request_conditions.clone(),
    }
}

/// Options for implicitly creating a blob before writing to it.  Conditions
/// and the content MD5 belong to the write that follows.
fn creation_options(options: &ResolvedOptions) -> WriteOptions {
    WriteOptions {
        content_md5: None,
        conditions: RequestConditions::default(),
        ..write_options(options)
    }
}
