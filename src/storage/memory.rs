//! In-memory blob client.
//!
//! Containers and blobs are held in a `tokio::sync::RwLock<BTreeMap<...>>`
//! keyed by container name.  The client follows the service's observable
//! semantics closely enough to exercise every operation: ETags change on
//! every write, page writes must be 512-byte aligned, staged blocks stay
//! invisible until committed, and a missing container or blob is reported as
//! [`BlobError::NotFound`].  Leases are not modelled; lease ids are accepted
//! and ignored.
//!
//! A configurable memory limit (`max_size_bytes`) caps total stored bytes.

use std::collections::{BTreeMap, BTreeSet};
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use md5::{Digest, Md5};
use tracing::debug;

use super::backend::{
    AppendBlobItem, BlobClient, BlobItem, BlobProperties, Block, BlockBlobItem, BlockList,
    ClientFuture, ContainerItem, CopyInfo, CopySource, DownloadedBlob, PageBlobItem, PageList,
    RawHeaders, WriteInfo, WriteOptions,
};
use crate::errors::{BlobError, Result};
use crate::options::{
    AccessTier, BlobBlock, BlobHttpHeaders, BlobRange, BlobType, BlockListType,
    DeleteSnapshotsOption, ListBlobsOptions, ListContainersOptions, PageRange, PublicAccessType,
    RequestConditions,
};

/// Page size of page blobs.
pub const PAGE_SIZE: u64 = 512;

/// In-memory blob client.
pub struct MemoryBlobClient {
    account: String,
    containers: tokio::sync::RwLock<BTreeMap<String, MemoryContainer>>,
    /// Current total bytes stored (committed content + staged blocks).
    current_size: AtomicU64,
    /// Maximum bytes allowed.  0 means unlimited.
    max_size_bytes: u64,
    /// Source of ETag values.
    version: AtomicU64,
}

struct MemoryContainer {
    etag: String,
    last_modified: DateTime<Utc>,
    metadata: BTreeMap<String, String>,
    public_access: Option<PublicAccessType>,
    blobs: BTreeMap<String, StoredBlob>,
    /// Uncommitted blocks per blob name, in staging order.
    staged: BTreeMap<String, Vec<(String, Bytes)>>,
}

#[derive(Clone)]
struct StoredBlob {
    blob_type: BlobType,
    data: Vec<u8>,
    http_headers: BlobHttpHeaders,
    metadata: BTreeMap<String, String>,
    access_tier: Option<AccessTier>,
    etag: String,
    created: DateTime<Utc>,
    last_modified: DateTime<Utc>,
    sequence_number: i64,
    /// Committed block ids and sizes (block blobs).
    committed_blocks: Vec<(String, Bytes)>,
    /// Number of appended blocks (append blobs).
    committed_block_count: i64,
    /// Indices of pages holding data (page blobs).
    written_pages: BTreeSet<u64>,
    copy: Option<CopyInfo>,
    copy_source: Option<String>,
}

impl MemoryBlobClient {
    /// Create an empty client for `account` with no size limit.
    pub fn new(account: impl Into<String>) -> Self {
        Self::with_limit(account, 0)
    }

    /// Create an empty client that refuses writes beyond `max_size_bytes`.
    pub fn with_limit(account: impl Into<String>, max_size_bytes: u64) -> Self {
        Self {
            account: account.into(),
            containers: tokio::sync::RwLock::new(BTreeMap::new()),
            current_size: AtomicU64::new(0),
            max_size_bytes,
            version: AtomicU64::new(1),
        }
    }

    // ── Helpers ─────────────────────────────────────────────────────

    fn next_etag(&self) -> String {
        let n = self.version.fetch_add(1, Ordering::Relaxed);
        format!("\"0x8D{:012X}\"", n)
    }

    /// Base64 MD5 of `data`, as the service reports it.
    fn compute_md5(data: &[u8]) -> String {
        let mut hasher = Md5::new();
        hasher.update(data);
        BASE64_STANDARD.encode(hasher.finalize())
    }

    fn verify_md5(expected: Option<&str>, data: &[u8]) -> Result<()> {
        match expected {
            Some(md5) if md5 != Self::compute_md5(data) => Err(vendor(
                400,
                "Md5Mismatch",
                "The MD5 value specified in the request did not match the MD5 value \
                 calculated by the server.",
            )),
            _ => Ok(()),
        }
    }

    /// Check whether adding `additional` bytes would exceed the memory limit.
    fn check_capacity(&self, additional: u64) -> Result<()> {
        if self.max_size_bytes == 0 {
            return Ok(());
        }
        let current = self.current_size.load(Ordering::Relaxed);
        if current + additional > self.max_size_bytes {
            return Err(BlobError::Internal(anyhow::anyhow!(
                "Memory limit exceeded: current={current}, additional={additional}, max={}",
                self.max_size_bytes
            )));
        }
        Ok(())
    }

    /// Adjust the tracked size from `old` to `new` bytes.
    fn adjust_size(&self, old: u64, new: u64) {
        if new >= old {
            self.current_size.fetch_add(new - old, Ordering::Relaxed);
        } else {
            self.current_size.fetch_sub(old - new, Ordering::Relaxed);
        }
    }

    fn write_info(blob: &StoredBlob, content_md5: Option<String>) -> WriteInfo {
        WriteInfo {
            etag: Some(blob.etag.clone()),
            last_modified: Some(blob.last_modified),
            content_md5,
            server_encrypted: Some(true),
            encryption_key_sha256: None,
            encryption_scope: None,
        }
    }

    fn page_item(blob: &StoredBlob) -> PageBlobItem {
        PageBlobItem {
            info: Self::write_info(blob, None),
            blob_sequence_number: Some(blob.sequence_number),
        }
    }

    fn properties(blob: &StoredBlob) -> BlobProperties {
        BlobProperties {
            etag: Some(blob.etag.clone()),
            last_modified: Some(blob.last_modified),
            creation_time: Some(blob.created),
            content_type: Some(
                blob.http_headers
                    .content_type
                    .clone()
                    .unwrap_or_else(|| "application/octet-stream".to_string()),
            ),
            content_md5: blob.http_headers.content_md5.clone(),
            content_encoding: blob.http_headers.content_encoding.clone(),
            content_disposition: blob.http_headers.content_disposition.clone(),
            content_language: blob.http_headers.content_language.clone(),
            cache_control: blob.http_headers.cache_control.clone(),
            blob_size: Some(blob.data.len() as u64),
            blob_type: Some(blob.blob_type),
            blob_sequence_number: (blob.blob_type == BlobType::PageBlob)
                .then_some(blob.sequence_number),
            lease_status: Some("unlocked".to_string()),
            lease_state: Some("available".to_string()),
            lease_duration: None,
            copy_id: blob.copy.as_ref().map(|c| c.copy_id.clone()),
            copy_status: blob.copy.as_ref().and_then(|c| c.copy_status.clone()),
            copy_source: blob.copy_source.clone(),
            copy_progress: blob
                .copy
                .as_ref()
                .map(|_| format!("{}/{}", blob.data.len(), blob.data.len())),
            copy_completion_time: blob.copy.as_ref().map(|_| blob.last_modified),
            copy_status_description: None,
            server_encrypted: Some(true),
            encryption_key_sha256: None,
            encryption_scope: None,
            access_tier: match blob.blob_type {
                BlobType::BlockBlob => Some(blob.access_tier.unwrap_or(AccessTier::Hot)),
                _ => None,
            },
            access_tier_inherited: match blob.blob_type {
                BlobType::BlockBlob => Some(blob.access_tier.is_none()),
                _ => None,
            },
            archive_status: None,
            access_tier_change_time: None,
            committed_block_count: (blob.blob_type == BlobType::AppendBlob)
                .then_some(blob.committed_block_count),
            metadata: Some(blob.metadata.clone()),
            version_id: None,
        }
    }

    fn new_blob(&self, blob_type: BlobType, data: Vec<u8>, options: &WriteOptions) -> StoredBlob {
        let now = Utc::now();
        StoredBlob {
            blob_type,
            data,
            http_headers: options.http_headers.clone().unwrap_or_default(),
            metadata: options.metadata.clone().unwrap_or_default(),
            access_tier: options.access_tier,
            etag: self.next_etag(),
            created: now,
            last_modified: now,
            sequence_number: 0,
            committed_blocks: Vec::new(),
            committed_block_count: 0,
            written_pages: BTreeSet::new(),
            copy: None,
            copy_source: None,
        }
    }

    // ── Service and container operations ─────────────────────────────

    async fn do_list_containers(
        &self,
        options: &ListContainersOptions,
    ) -> Result<Vec<ContainerItem>> {
        let containers = self.containers.read().await;
        let prefix = options.prefix.as_deref().unwrap_or("");
        Ok(containers
            .iter()
            .filter(|(name, _)| name.starts_with(prefix))
            .map(|(name, c)| ContainerItem {
                name: name.clone(),
                etag: Some(c.etag.clone()),
                last_modified: Some(c.last_modified),
                public_access: c.public_access,
                metadata: if options.include_metadata {
                    c.metadata.clone()
                } else {
                    BTreeMap::new()
                },
            })
            .collect())
    }

    async fn do_create_container(
        &self,
        container: &str,
        metadata: Option<&BTreeMap<String, String>>,
        public_access: Option<PublicAccessType>,
    ) -> Result<RawHeaders> {
        let mut containers = self.containers.write().await;
        if containers.contains_key(container) {
            return Err(vendor(
                409,
                "ContainerAlreadyExists",
                "The specified container already exists.",
            ));
        }
        let etag = self.next_etag();
        let now = Utc::now();
        containers.insert(
            container.to_string(),
            MemoryContainer {
                etag: etag.clone(),
                last_modified: now,
                metadata: metadata.cloned().unwrap_or_default(),
                public_access,
                blobs: BTreeMap::new(),
                staged: BTreeMap::new(),
            },
        );
        debug!("memory create_container: {}", container);
        Ok(raw_headers(&etag, now))
    }

    async fn do_delete_container(
        &self,
        container: &str,
        conditions: &RequestConditions,
    ) -> Result<RawHeaders> {
        let mut containers = self.containers.write().await;
        let existing = containers
            .get(container)
            .ok_or_else(|| BlobError::not_found(container))?;
        check_conditions(conditions, &existing.etag, existing.last_modified)?;
        let removed = containers
            .remove(container)
            .ok_or_else(|| BlobError::not_found(container))?;
        let freed: u64 = removed
            .blobs
            .values()
            .map(|b| b.data.len() as u64)
            .sum::<u64>()
            + staged_size(&removed.staged);
        self.adjust_size(freed, 0);
        debug!("memory delete_container: {}", container);
        Ok(raw_headers(&removed.etag, Utc::now()))
    }

    async fn do_list_blobs(
        &self,
        container: &str,
        options: &ListBlobsOptions,
    ) -> Result<Vec<BlobItem>> {
        let containers = self.containers.read().await;
        let c = containers
            .get(container)
            .ok_or_else(|| BlobError::not_found(container))?;
        let prefix = options.prefix.as_deref().unwrap_or("");
        let mut items: Vec<BlobItem> = c
            .blobs
            .iter()
            .filter(|(name, _)| name.starts_with(prefix))
            .map(|(name, blob)| BlobItem {
                name: name.clone(),
                snapshot: None,
                deleted: false,
                blob_type: Some(blob.blob_type),
                size: Some(blob.data.len() as u64),
                content_type: blob.http_headers.content_type.clone(),
                etag: Some(blob.etag.clone()),
                last_modified: Some(blob.last_modified),
                access_tier: blob.access_tier,
                metadata: if options.details.metadata {
                    blob.metadata.clone()
                } else {
                    BTreeMap::new()
                },
            })
            .collect();
        if options.details.uncommitted_blobs {
            for name in c.staged.keys() {
                if name.starts_with(prefix) && !c.blobs.contains_key(name) {
                    items.push(BlobItem {
                        name: name.clone(),
                        blob_type: Some(BlobType::BlockBlob),
                        size: Some(0),
                        ..Default::default()
                    });
                }
            }
            items.sort_by(|a, b| a.name.cmp(&b.name));
        }
        Ok(items)
    }

    // ── Blob reads ───────────────────────────────────────────────────

    async fn do_download(
        &self,
        container: &str,
        blob: &str,
        range: BlobRange,
        conditions: &RequestConditions,
    ) -> Result<DownloadedBlob> {
        let containers = self.containers.read().await;
        let stored = find_blob(&containers, container, blob)?;
        check_conditions(conditions, &stored.etag, stored.last_modified)?;
        let size = stored.data.len() as u64;
        if range.offset > 0 && range.offset >= size {
            return Err(vendor(
                416,
                "InvalidRange",
                "The range specified is invalid for the current size of the resource.",
            ));
        }
        let end = range.end_within(size);
        let data = Bytes::copy_from_slice(&stored.data[range.offset as usize..end as usize]);
        Ok(DownloadedBlob {
            data,
            properties: Self::properties(stored),
        })
    }

    async fn do_get_properties(
        &self,
        container: &str,
        blob: &str,
        conditions: &RequestConditions,
    ) -> Result<BlobProperties> {
        let containers = self.containers.read().await;
        let stored = find_blob(&containers, container, blob)?;
        check_conditions(conditions, &stored.etag, stored.last_modified)?;
        Ok(Self::properties(stored))
    }

    async fn do_delete_blob(
        &self,
        container: &str,
        blob: &str,
        _snapshots: Option<DeleteSnapshotsOption>,
        conditions: &RequestConditions,
    ) -> Result<RawHeaders> {
        let mut containers = self.containers.write().await;
        let c = containers
            .get_mut(container)
            .ok_or_else(|| BlobError::not_found(container))?;
        let stored = c
            .blobs
            .get(blob)
            .ok_or_else(|| BlobError::not_found(format!("{container}/{blob}")))?;
        check_conditions(conditions, &stored.etag, stored.last_modified)?;
        if let Some(removed) = c.blobs.remove(blob) {
            self.adjust_size(removed.data.len() as u64, 0);
        }
        if let Some(staged) = c.staged.remove(blob) {
            let size: u64 = staged.iter().map(|(_, d)| d.len() as u64).sum();
            self.adjust_size(size, 0);
        }
        debug!("memory delete_blob: {}/{}", container, blob);
        let mut headers = RawHeaders::new();
        headers.insert("x-ms-delete-type-permanent".to_string(), "true".to_string());
        Ok(headers)
    }

    // ── Block blobs ──────────────────────────────────────────────────

    async fn do_upload_block_blob(
        &self,
        container: &str,
        blob: &str,
        data: Bytes,
        options: &WriteOptions,
    ) -> Result<BlockBlobItem> {
        Self::verify_md5(options.content_md5.as_deref(), &data)?;
        let mut containers = self.containers.write().await;
        let c = containers
            .get_mut(container)
            .ok_or_else(|| BlobError::not_found(container))?;
        let old_len = match c.blobs.get(blob) {
            Some(existing) => {
                check_conditions(&options.conditions, &existing.etag, existing.last_modified)?;
                existing.data.len() as u64
            }
            None => {
                check_conditions_absent(&options.conditions)?;
                0
            }
        };
        if data.len() as u64 > old_len {
            self.check_capacity(data.len() as u64 - old_len)?;
        }
        let md5 = Self::compute_md5(&data);
        let mut stored = self.new_blob(BlobType::BlockBlob, data.to_vec(), options);
        if stored.http_headers.content_md5.is_none() {
            stored.http_headers.content_md5 = Some(md5.clone());
        }
        stored.committed_blocks = Vec::new();
        if let Some(existing) = c.blobs.get(blob) {
            stored.created = existing.created;
        }
        let item = BlockBlobItem {
            info: Self::write_info(&stored, Some(md5)),
            version_id: None,
        };
        self.adjust_size(old_len, stored.data.len() as u64);
        c.blobs.insert(blob.to_string(), stored);
        debug!("memory upload_block_blob: {}/{}", container, blob);
        Ok(item)
    }

    async fn do_stage_block(&self, container: &str, blob: &str, block: &BlobBlock) -> Result<()> {
        let mut containers = self.containers.write().await;
        let c = containers
            .get_mut(container)
            .ok_or_else(|| BlobError::not_found(container))?;
        self.check_capacity(block.data.len() as u64)?;
        let staged = c.staged.entry(blob.to_string()).or_default();
        if let Some(pos) = staged.iter().position(|(id, _)| id == &block.id) {
            let (_, old) = staged.remove(pos);
            self.adjust_size(old.len() as u64, 0);
        }
        staged.push((block.id.clone(), block.data.clone()));
        self.adjust_size(0, block.data.len() as u64);
        debug!(
            "memory stage_block: {}/{} id={} ({} bytes)",
            container,
            blob,
            block.id,
            block.data.len()
        );
        Ok(())
    }

    async fn do_commit_block_list(
        &self,
        container: &str,
        blob: &str,
        block_ids: &[String],
        options: &WriteOptions,
    ) -> Result<BlockBlobItem> {
        let mut containers = self.containers.write().await;
        let c = containers
            .get_mut(container)
            .ok_or_else(|| BlobError::not_found(container))?;
        let staged = c.staged.get(blob).cloned().unwrap_or_default();
        let existing = c.blobs.get(blob);
        match existing {
            Some(b) => check_conditions(&options.conditions, &b.etag, b.last_modified)?,
            None => check_conditions_absent(&options.conditions)?,
        }
        let committed = existing
            .map(|b| b.committed_blocks.clone())
            .unwrap_or_default();

        let mut blocks = Vec::with_capacity(block_ids.len());
        for id in block_ids {
            let found = staged
                .iter()
                .rev()
                .find(|(sid, _)| sid == id)
                .or_else(|| committed.iter().find(|(cid, _)| cid == id));
            match found {
                Some((bid, data)) => blocks.push((bid.clone(), data.clone())),
                None => {
                    return Err(vendor(
                        400,
                        "InvalidBlockList",
                        "The specified block list is invalid.",
                    ))
                }
            }
        }

        let data: Vec<u8> = blocks.iter().flat_map(|(_, d)| d.iter().copied()).collect();
        let old_len = existing.map(|b| b.data.len() as u64).unwrap_or(0);
        let created = existing.map(|b| b.created);
        let mut stored = self.new_blob(BlobType::BlockBlob, data, options);
        if let Some(created) = created {
            stored.created = created;
        }
        stored.committed_blocks = blocks;
        let item = BlockBlobItem {
            info: Self::write_info(&stored, None),
            version_id: None,
        };
        let staged_bytes = staged_size_of(&staged);
        self.adjust_size(old_len + staged_bytes, stored.data.len() as u64);
        c.staged.remove(blob);
        c.blobs.insert(blob.to_string(), stored);
        debug!(
            "memory commit_block_list: {}/{} blocks={}",
            container,
            blob,
            block_ids.len()
        );
        Ok(item)
    }

    async fn do_get_block_list(
        &self,
        container: &str,
        blob: &str,
        list_type: BlockListType,
    ) -> Result<BlockList> {
        let containers = self.containers.read().await;
        let c = containers
            .get(container)
            .ok_or_else(|| BlobError::not_found(container))?;
        let stored = c.blobs.get(blob);
        let staged = c.staged.get(blob);
        if stored.is_none() && staged.is_none() {
            return Err(BlobError::not_found(format!("{container}/{blob}")));
        }
        let to_blocks = |blocks: &[(String, Bytes)]| -> Vec<Block> {
            blocks
                .iter()
                .map(|(id, data)| Block {
                    name: id.clone(),
                    size: data.len() as u64,
                })
                .collect()
        };
        let committed = match list_type {
            BlockListType::Committed | BlockListType::All => stored
                .map(|b| to_blocks(&b.committed_blocks))
                .unwrap_or_default(),
            BlockListType::Uncommitted => Vec::new(),
        };
        let uncommitted = match list_type {
            BlockListType::Uncommitted | BlockListType::All => {
                staged.map(|s| to_blocks(s)).unwrap_or_default()
            }
            BlockListType::Committed => Vec::new(),
        };
        Ok(BlockList {
            committed,
            uncommitted,
        })
    }

    // ── Append blobs ─────────────────────────────────────────────────

    async fn do_create_append_blob(
        &self,
        container: &str,
        blob: &str,
        options: &WriteOptions,
    ) -> Result<AppendBlobItem> {
        let mut containers = self.containers.write().await;
        let c = containers
            .get_mut(container)
            .ok_or_else(|| BlobError::not_found(container))?;
        let old_len = match c.blobs.get(blob) {
            Some(b) => {
                check_conditions(&options.conditions, &b.etag, b.last_modified)?;
                b.data.len() as u64
            }
            None => {
                check_conditions_absent(&options.conditions)?;
                0
            }
        };
        let stored = self.new_blob(BlobType::AppendBlob, Vec::new(), options);
        let item = AppendBlobItem {
            info: Self::write_info(&stored, None),
            append_offset: None,
            committed_block_count: None,
        };
        self.adjust_size(old_len, 0);
        c.blobs.insert(blob.to_string(), stored);
        debug!("memory create_append_blob: {}/{}", container, blob);
        Ok(item)
    }

    async fn do_append_block(
        &self,
        container: &str,
        blob: &str,
        data: Bytes,
        content_md5: Option<&str>,
        conditions: &RequestConditions,
    ) -> Result<AppendBlobItem> {
        Self::verify_md5(content_md5, &data)?;
        self.check_capacity(data.len() as u64)?;
        let etag = self.next_etag();
        let mut containers = self.containers.write().await;
        let stored = find_blob_mut(&mut containers, container, blob)?;
        check_conditions(conditions, &stored.etag, stored.last_modified)?;
        if stored.blob_type != BlobType::AppendBlob {
            return Err(invalid_blob_type());
        }
        let offset = stored.data.len() as u64;
        stored.data.extend_from_slice(&data);
        stored.committed_block_count += 1;
        stored.etag = etag;
        stored.last_modified = Utc::now();
        self.adjust_size(0, data.len() as u64);
        debug!(
            "memory append_block: {}/{} offset={} ({} bytes)",
            container,
            blob,
            offset,
            data.len()
        );
        Ok(AppendBlobItem {
            info: Self::write_info(stored, Some(Self::compute_md5(&data))),
            append_offset: Some(offset),
            committed_block_count: Some(stored.committed_block_count),
        })
    }

    // ── Page blobs ───────────────────────────────────────────────────

    async fn do_create_page_blob(
        &self,
        container: &str,
        blob: &str,
        size: u64,
        sequence_number: i64,
        options: &WriteOptions,
    ) -> Result<PageBlobItem> {
        if size % PAGE_SIZE != 0 {
            return Err(vendor(
                400,
                "InvalidHeaderValue",
                "The page blob size must be aligned to a 512-byte boundary.",
            ));
        }
        let mut containers = self.containers.write().await;
        let c = containers
            .get_mut(container)
            .ok_or_else(|| BlobError::not_found(container))?;
        let old_len = match c.blobs.get(blob) {
            Some(b) => {
                check_conditions(&options.conditions, &b.etag, b.last_modified)?;
                b.data.len() as u64
            }
            None => {
                check_conditions_absent(&options.conditions)?;
                0
            }
        };
        if size > old_len {
            self.check_capacity(size - old_len)?;
        }
        let mut stored = self.new_blob(BlobType::PageBlob, vec![0u8; size as usize], options);
        stored.sequence_number = sequence_number;
        let item = Self::page_item(&stored);
        self.adjust_size(old_len, size);
        c.blobs.insert(blob.to_string(), stored);
        debug!("memory create_page_blob: {}/{} size={}", container, blob, size);
        Ok(item)
    }

    async fn do_upload_pages(
        &self,
        container: &str,
        blob: &str,
        range: PageRange,
        data: Bytes,
        content_md5: Option<&str>,
        conditions: &RequestConditions,
    ) -> Result<PageBlobItem> {
        Self::verify_md5(content_md5, &data)?;
        let etag = self.next_etag();
        let mut containers = self.containers.write().await;
        let stored = find_blob_mut(&mut containers, container, blob)?;
        check_conditions(conditions, &stored.etag, stored.last_modified)?;
        if stored.blob_type != BlobType::PageBlob {
            return Err(invalid_blob_type());
        }
        check_page_range(range, stored.data.len() as u64)?;
        if data.len() as u64 != range.len() {
            return Err(vendor(
                400,
                "InvalidHeaderValue",
                "The content length does not match the page range.",
            ));
        }
        stored.data[range.start as usize..range.end as usize].copy_from_slice(&data);
        for page in range.start / PAGE_SIZE..range.end / PAGE_SIZE {
            stored.written_pages.insert(page);
        }
        stored.etag = etag;
        stored.last_modified = Utc::now();
        debug!(
            "memory upload_pages: {}/{} range={}",
            container,
            blob,
            range.to_header()
        );
        let mut item = Self::page_item(stored);
        item.info.content_md5 = Some(Self::compute_md5(&data));
        Ok(item)
    }

    async fn do_resize_page_blob(
        &self,
        container: &str,
        blob: &str,
        size: u64,
        conditions: &RequestConditions,
    ) -> Result<PageBlobItem> {
        if size % PAGE_SIZE != 0 {
            return Err(vendor(
                400,
                "InvalidHeaderValue",
                "The page blob size must be aligned to a 512-byte boundary.",
            ));
        }
        let etag = self.next_etag();
        let mut containers = self.containers.write().await;
        let stored = find_blob_mut(&mut containers, container, blob)?;
        check_conditions(conditions, &stored.etag, stored.last_modified)?;
        if stored.blob_type != BlobType::PageBlob {
            return Err(invalid_blob_type());
        }
        let old_len = stored.data.len() as u64;
        if size > old_len {
            self.check_capacity(size - old_len)?;
        }
        stored.data.resize(size as usize, 0);
        stored.written_pages.retain(|page| (page + 1) * PAGE_SIZE <= size);
        stored.etag = etag;
        stored.last_modified = Utc::now();
        self.adjust_size(old_len, size);
        Ok(Self::page_item(stored))
    }

    async fn do_clear_pages(
        &self,
        container: &str,
        blob: &str,
        range: PageRange,
        conditions: &RequestConditions,
    ) -> Result<PageBlobItem> {
        let etag = self.next_etag();
        let mut containers = self.containers.write().await;
        let stored = find_blob_mut(&mut containers, container, blob)?;
        check_conditions(conditions, &stored.etag, stored.last_modified)?;
        if stored.blob_type != BlobType::PageBlob {
            return Err(invalid_blob_type());
        }
        check_page_range(range, stored.data.len() as u64)?;
        stored.data[range.start as usize..range.end as usize].fill(0);
        for page in range.start / PAGE_SIZE..range.end / PAGE_SIZE {
            stored.written_pages.remove(&page);
        }
        stored.etag = etag;
        stored.last_modified = Utc::now();
        Ok(Self::page_item(stored))
    }

    async fn do_get_page_ranges(
        &self,
        container: &str,
        blob: &str,
        range: BlobRange,
        conditions: &RequestConditions,
    ) -> Result<PageList> {
        let containers = self.containers.read().await;
        let stored = find_blob(&containers, container, blob)?;
        check_conditions(conditions, &stored.etag, stored.last_modified)?;
        if stored.blob_type != BlobType::PageBlob {
            return Err(invalid_blob_type());
        }
        let size = stored.data.len() as u64;
        let start = range.offset;
        let end = range.end_within(size);

        let mut page_ranges: Vec<PageRange> = Vec::new();
        for page in stored.written_pages.iter().copied() {
            let page_start = page * PAGE_SIZE;
            let page_end = page_start + PAGE_SIZE;
            if page_end <= start || page_start >= end {
                continue;
            }
            match page_ranges.last_mut() {
                Some(last) if last.end == page_start => last.end = page_end,
                _ => page_ranges.push(PageRange::new(page_start, page_end)),
            }
        }
        Ok(PageList {
            page_ranges,
            clear_ranges: Vec::new(),
        })
    }

    // ── Copy ─────────────────────────────────────────────────────────

    async fn do_copy_blob(
        &self,
        source: &CopySource,
        container: &str,
        blob: &str,
    ) -> Result<CopyInfo> {
        if source.account != self.account {
            return Err(vendor(
                403,
                "CannotVerifyCopySource",
                "The source account is not reachable from this client.",
            ));
        }
        let etag = self.next_etag();
        let mut containers = self.containers.write().await;
        let mut copied = find_blob(&containers, &source.container, &source.blob)?.clone();
        let c = containers
            .get_mut(container)
            .ok_or_else(|| BlobError::not_found(container))?;
        let old_len = c.blobs.get(blob).map(|b| b.data.len() as u64).unwrap_or(0);
        if copied.data.len() as u64 > old_len {
            self.check_capacity(copied.data.len() as u64 - old_len)?;
        }
        let info = CopyInfo {
            copy_id: uuid::Uuid::new_v4().to_string(),
            copy_status: Some("success".to_string()),
        };
        let now = Utc::now();
        copied.etag = etag;
        copied.created = now;
        copied.last_modified = now;
        copied.copy = Some(info.clone());
        copied.copy_source = Some(format!(
            "{}/{}/{}",
            self.account, source.container, source.blob
        ));
        self.adjust_size(old_len, copied.data.len() as u64);
        c.blobs.insert(blob.to_string(), copied);
        debug!(
            "memory copy_blob: {}/{} -> {}/{}",
            source.container, source.blob, container, blob
        );
        Ok(info)
    }
}

// ── Free helpers ──────────────────────────────────────────────────────

fn vendor(status: u16, code: &str, message: &str) -> BlobError {
    BlobError::Vendor {
        status,
        code: code.to_string(),
        message: message.to_string(),
    }
}

fn invalid_blob_type() -> BlobError {
    vendor(
        409,
        "InvalidBlobType",
        "The blob type is invalid for this operation.",
    )
}

fn raw_headers(etag: &str, last_modified: DateTime<Utc>) -> RawHeaders {
    let mut headers = RawHeaders::new();
    headers.insert("etag".to_string(), etag.to_string());
    headers.insert(
        "last-modified".to_string(),
        crate::options::http_date(&last_modified),
    );
    headers
}

fn staged_size(staged: &BTreeMap<String, Vec<(String, Bytes)>>) -> u64 {
    staged.values().map(|blocks| staged_size_of(blocks)).sum()
}

fn staged_size_of(blocks: &[(String, Bytes)]) -> u64 {
    blocks.iter().map(|(_, d)| d.len() as u64).sum()
}

fn find_blob<'c>(
    containers: &'c BTreeMap<String, MemoryContainer>,
    container: &str,
    blob: &str,
) -> Result<&'c StoredBlob> {
    containers
        .get(container)
        .ok_or_else(|| BlobError::not_found(container))?
        .blobs
        .get(blob)
        .ok_or_else(|| BlobError::not_found(format!("{container}/{blob}")))
}

fn find_blob_mut<'c>(
    containers: &'c mut BTreeMap<String, MemoryContainer>,
    container: &str,
    blob: &str,
) -> Result<&'c mut StoredBlob> {
    containers
        .get_mut(container)
        .ok_or_else(|| BlobError::not_found(container))?
        .blobs
        .get_mut(blob)
        .ok_or_else(|| BlobError::not_found(format!("{container}/{blob}")))
}

fn check_page_range(range: PageRange, size: u64) -> Result<()> {
    if range.start % PAGE_SIZE != 0
        || range.end % PAGE_SIZE != 0
        || range.is_empty()
        || range.end > size
    {
        return Err(vendor(
            416,
            "InvalidPageRange",
            "The page range specified is invalid.",
        ));
    }
    Ok(())
}

/// Evaluate preconditions against an existing resource.
fn check_conditions(
    conditions: &RequestConditions,
    etag: &str,
    last_modified: DateTime<Utc>,
) -> Result<()> {
    let not_met = || {
        vendor(
            412,
            "ConditionNotMet",
            "The condition specified using HTTP conditional header(s) is not met.",
        )
    };
    if let Some(if_match) = &conditions.if_match {
        if if_match != "*" && if_match != etag {
            return Err(not_met());
        }
    }
    if let Some(if_none_match) = &conditions.if_none_match {
        if if_none_match == "*" || if_none_match == etag {
            return Err(not_met());
        }
    }
    if let Some(since) = conditions.if_modified_since {
        if last_modified <= since {
            return Err(not_met());
        }
    }
    if let Some(since) = conditions.if_unmodified_since {
        if last_modified > since {
            return Err(not_met());
        }
    }
    Ok(())
}

/// Evaluate preconditions when the target does not exist yet.
fn check_conditions_absent(conditions: &RequestConditions) -> Result<()> {
    if conditions.if_match.is_some() {
        return Err(vendor(
            412,
            "ConditionNotMet",
            "The condition specified using HTTP conditional header(s) is not met.",
        ));
    }
    Ok(())
}

/// Apply the per-call timeout, if any.  A zero timeout has already expired.
async fn within<T>(
    timeout: Option<Duration>,
    fut: impl Future<Output = Result<T>>,
) -> Result<T> {
    match timeout {
        Some(limit) if limit.is_zero() => Err(timed_out(limit)),
        Some(limit) => tokio::time::timeout(limit, fut)
            .await
            .map_err(|_| timed_out(limit))?,
        None => fut.await,
    }
}

fn timed_out(limit: Duration) -> BlobError {
    BlobError::Internal(anyhow::anyhow!("operation timed out after {:?}", limit))
}

// ── BlobClient implementation ────────────────────────────────────────

impl BlobClient for MemoryBlobClient {
    fn account_name(&self) -> &str {
        &self.account
    }

    fn list_containers<'a>(
        &'a self,
        options: &'a ListContainersOptions,
        timeout: Option<Duration>,
    ) -> ClientFuture<'a, Vec<ContainerItem>> {
        Box::pin(within(timeout, self.do_list_containers(options)))
    }

    fn create_container<'a>(
        &'a self,
        container: &'a str,
        metadata: Option<&'a BTreeMap<String, String>>,
        public_access: Option<PublicAccessType>,
        timeout: Option<Duration>,
    ) -> ClientFuture<'a, RawHeaders> {
        Box::pin(within(
            timeout,
            self.do_create_container(container, metadata, public_access),
        ))
    }

    fn delete_container<'a>(
        &'a self,
        container: &'a str,
        conditions: &'a RequestConditions,
        timeout: Option<Duration>,
    ) -> ClientFuture<'a, RawHeaders> {
        Box::pin(within(timeout, self.do_delete_container(container, conditions)))
    }

    fn list_blobs<'a>(
        &'a self,
        container: &'a str,
        options: &'a ListBlobsOptions,
        timeout: Option<Duration>,
    ) -> ClientFuture<'a, Vec<BlobItem>> {
        Box::pin(within(timeout, self.do_list_blobs(container, options)))
    }

    fn download<'a>(
        &'a self,
        container: &'a str,
        blob: &'a str,
        range: BlobRange,
        conditions: &'a RequestConditions,
        timeout: Option<Duration>,
    ) -> ClientFuture<'a, DownloadedBlob> {
        Box::pin(within(
            timeout,
            self.do_download(container, blob, range, conditions),
        ))
    }

    fn get_properties<'a>(
        &'a self,
        container: &'a str,
        blob: &'a str,
        conditions: &'a RequestConditions,
        timeout: Option<Duration>,
    ) -> ClientFuture<'a, BlobProperties> {
        Box::pin(within(
            timeout,
            self.do_get_properties(container, blob, conditions),
        ))
    }

    fn delete_blob<'a>(
        &'a self,
        container: &'a str,
        blob: &'a str,
        snapshots: Option<DeleteSnapshotsOption>,
        conditions: &'a RequestConditions,
        timeout: Option<Duration>,
    ) -> ClientFuture<'a, RawHeaders> {
        Box::pin(within(
            timeout,
            self.do_delete_blob(container, blob, snapshots, conditions),
        ))
    }

    fn upload_block_blob<'a>(
        &'a self,
        container: &'a str,
        blob: &'a str,
        data: Bytes,
        options: &'a WriteOptions,
        timeout: Option<Duration>,
    ) -> ClientFuture<'a, BlockBlobItem> {
        Box::pin(within(
            timeout,
            self.do_upload_block_blob(container, blob, data, options),
        ))
    }

    fn stage_block<'a>(
        &'a self,
        container: &'a str,
        blob: &'a str,
        block: &'a BlobBlock,
        _lease_id: Option<&'a str>,
        timeout: Option<Duration>,
    ) -> ClientFuture<'a, ()> {
        Box::pin(within(timeout, self.do_stage_block(container, blob, block)))
    }

    fn commit_block_list<'a>(
        &'a self,
        container: &'a str,
        blob: &'a str,
        block_ids: &'a [String],
        options: &'a WriteOptions,
        timeout: Option<Duration>,
    ) -> ClientFuture<'a, BlockBlobItem> {
        Box::pin(within(
            timeout,
            self.do_commit_block_list(container, blob, block_ids, options),
        ))
    }

    fn get_block_list<'a>(
        &'a self,
        container: &'a str,
        blob: &'a str,
        list_type: BlockListType,
        _lease_id: Option<&'a str>,
        timeout: Option<Duration>,
    ) -> ClientFuture<'a, BlockList> {
        Box::pin(within(
            timeout,
            self.do_get_block_list(container, blob, list_type),
        ))
    }

    fn create_append_blob<'a>(
        &'a self,
        container: &'a str,
        blob: &'a str,
        options: &'a WriteOptions,
        timeout: Option<Duration>,
    ) -> ClientFuture<'a, AppendBlobItem> {
        Box::pin(within(
            timeout,
            self.do_create_append_blob(container, blob, options),
        ))
    }

    fn append_block<'a>(
        &'a self,
        container: &'a str,
        blob: &'a str,
        data: Bytes,
        content_md5: Option<&'a str>,
        conditions: &'a RequestConditions,
        timeout: Option<Duration>,
    ) -> ClientFuture<'a, AppendBlobItem> {
        Box::pin(within(
            timeout,
            self.do_append_block(container, blob, data, content_md5, conditions),
        ))
    }

    fn create_page_blob<'a>(
        &'a self,
        container: &'a str,
        blob: &'a str,
        size: u64,
        sequence_number: i64,
        options: &'a WriteOptions,
        timeout: Option<Duration>,
    ) -> ClientFuture<'a, PageBlobItem> {
        Box::pin(within(
            timeout,
            self.do_create_page_blob(container, blob, size, sequence_number, options),
        ))
    }

    fn upload_pages<'a>(
        &'a self,
        container: &'a str,
        blob: &'a str,
        range: PageRange,
        data: Bytes,
        content_md5: Option<&'a str>,
        conditions: &'a RequestConditions,
        timeout: Option<Duration>,
    ) -> ClientFuture<'a, PageBlobItem> {
        Box::pin(within(
            timeout,
            self.do_upload_pages(container, blob, range, data, content_md5, conditions),
        ))
    }

    fn resize_page_blob<'a>(
        &'a self,
        container: &'a str,
        blob: &'a str,
        size: u64,
        conditions: &'a RequestConditions,
        timeout: Option<Duration>,
    ) -> ClientFuture<'a, PageBlobItem> {
        Box::pin(within(
            timeout,
            self.do_resize_page_blob(container, blob, size, conditions),
        ))
    }

    fn clear_pages<'a>(
        &'a self,
        container: &'a str,
        blob: &'a str,
        range: PageRange,
        conditions: &'a RequestConditions,
        timeout: Option<Duration>,
    ) -> ClientFuture<'a, PageBlobItem> {
        Box::pin(within(
            timeout,
            self.do_clear_pages(container, blob, range, conditions),
        ))
    }

    fn get_page_ranges<'a>(
        &'a self,
        container: &'a str,
        blob: &'a str,
        range: BlobRange,
        conditions: &'a RequestConditions,
        timeout: Option<Duration>,
    ) -> ClientFuture<'a, PageList> {
        Box::pin(within(
            timeout,
            self.do_get_page_ranges(container, blob, range, conditions),
        ))
    }

    fn copy_blob<'a>(
        &'a self,
        source: &'a CopySource,
        container: &'a str,
        blob: &'a str,
        timeout: Option<Duration>,
    ) -> ClientFuture<'a, CopyInfo> {
        Box::pin(within(timeout, self.do_copy_blob(source, container, blob)))
    }

    fn download_url(&self, container: &str, blob: &str, expires_in: Duration) -> Result<String> {
        let expiry = Utc::now()
            + chrono::Duration::from_std(expires_in)
                .map_err(|e| BlobError::config(format!("invalid link expiration: {e}")))?;
        Ok(format!(
            "memory://{}/{}/{}?se={}",
            self.account,
            container,
            blob,
            expiry.format("%Y-%m-%dT%H:%M:%SZ")
        ))
    }
}

// ── Tests ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    async fn client_with_container() -> MemoryBlobClient {
        let client = MemoryBlobClient::new("account");
        client
            .create_container("box", None, None, None)
            .await
            .unwrap();
        client
    }

    fn no_conditions() -> RequestConditions {
        RequestConditions::default()
    }

    #[tokio::test]
    async fn test_create_container_twice_conflicts() {
        let client = client_with_container().await;
        let err = client
            .create_container("box", None, None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, BlobError::Vendor { status: 409, .. }));
    }

    #[tokio::test]
    async fn test_list_blobs_missing_container_is_not_found() {
        let client = MemoryBlobClient::new("account");
        let err = client
            .list_blobs("nope", &ListBlobsOptions::default(), None)
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_upload_and_download_range() {
        let client = client_with_container().await;
        client
            .upload_block_blob(
                "box",
                "a.txt",
                Bytes::from_static(b"hello world"),
                &WriteOptions::default(),
                None,
            )
            .await
            .unwrap();
        let conditions = no_conditions();
        let full = client
            .download("box", "a.txt", BlobRange::default(), &conditions, None)
            .await
            .unwrap();
        assert_eq!(full.data, Bytes::from_static(b"hello world"));
        assert_eq!(full.properties.blob_size, Some(11));
        assert_eq!(full.properties.blob_type, Some(BlobType::BlockBlob));

        let part = client
            .download("box", "a.txt", BlobRange::new(6, Some(5)), &conditions, None)
            .await
            .unwrap();
        assert_eq!(part.data, Bytes::from_static(b"world"));
    }

    #[tokio::test]
    async fn test_if_match_mismatch_fails() {
        let client = client_with_container().await;
        client
            .upload_block_blob(
                "box",
                "a",
                Bytes::from_static(b"x"),
                &WriteOptions::default(),
                None,
            )
            .await
            .unwrap();
        let conditions = RequestConditions {
            if_match: Some("\"other\"".to_string()),
            ..Default::default()
        };
        let err = client
            .download("box", "a", BlobRange::default(), &conditions, None)
            .await
            .unwrap_err();
        assert!(matches!(err, BlobError::Vendor { status: 412, .. }));
    }

    #[tokio::test]
    async fn test_md5_mismatch_rejected() {
        let client = client_with_container().await;
        let options = WriteOptions {
            content_md5: Some(MemoryBlobClient::compute_md5(b"other")),
            ..Default::default()
        };
        let err = client
            .upload_block_blob("box", "a", Bytes::from_static(b"x"), &options, None)
            .await
            .unwrap_err();
        assert!(matches!(err, BlobError::Vendor { status: 400, .. }));
    }

    #[tokio::test]
    async fn test_stage_and_commit_blocks() {
        let client = client_with_container().await;
        let b1 = BlobBlock::with_id("YQ==", Bytes::from_static(b"ab"));
        let b2 = BlobBlock::with_id("Yg==", Bytes::from_static(b"cd"));
        client.stage_block("box", "blk", &b1, None, None).await.unwrap();
        client.stage_block("box", "blk", &b2, None, None).await.unwrap();

        let pending = client
            .get_block_list("box", "blk", BlockListType::All, None, None)
            .await
            .unwrap();
        assert!(pending.committed.is_empty());
        assert_eq!(pending.uncommitted.len(), 2);

        let ids = vec![b2.id.clone(), b1.id.clone()];
        client
            .commit_block_list("box", "blk", &ids, &WriteOptions::default(), None)
            .await
            .unwrap();
        let blob = client
            .download("box", "blk", BlobRange::default(), &no_conditions(), None)
            .await
            .unwrap();
        assert_eq!(blob.data, Bytes::from_static(b"cdab"));

        let list = client
            .get_block_list("box", "blk", BlockListType::Committed, None, None)
            .await
            .unwrap();
        assert_eq!(list.committed.len(), 2);
        assert_eq!(list.committed[0].name, "Yg==");
    }

    #[tokio::test]
    async fn test_commit_unknown_block_fails() {
        let client = client_with_container().await;
        let ids = vec!["bm9wZQ==".to_string()];
        let err = client
            .commit_block_list("box", "blk", &ids, &WriteOptions::default(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, BlobError::Vendor { status: 400, .. }));
    }

    #[tokio::test]
    async fn test_append_offsets_advance() {
        let client = client_with_container().await;
        client
            .create_append_blob("box", "log", &WriteOptions::default(), None)
            .await
            .unwrap();
        let conditions = no_conditions();
        let first = client
            .append_block("box", "log", Bytes::from_static(b"abc"), None, &conditions, None)
            .await
            .unwrap();
        let second = client
            .append_block("box", "log", Bytes::from_static(b"de"), None, &conditions, None)
            .await
            .unwrap();
        assert_eq!(first.append_offset, Some(0));
        assert_eq!(second.append_offset, Some(3));
        assert_eq!(second.committed_block_count, Some(2));
    }

    #[tokio::test]
    async fn test_append_to_block_blob_rejected() {
        let client = client_with_container().await;
        client
            .upload_block_blob(
                "box",
                "a",
                Bytes::from_static(b"x"),
                &WriteOptions::default(),
                None,
            )
            .await
            .unwrap();
        let err = client
            .append_block("box", "a", Bytes::from_static(b"y"), None, &no_conditions(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, BlobError::Vendor { status: 409, .. }));
    }

    #[tokio::test]
    async fn test_page_blob_lifecycle() {
        let client = client_with_container().await;
        let conditions = no_conditions();
        client
            .create_page_blob("box", "disk", 2048, 7, &WriteOptions::default(), None)
            .await
            .unwrap();
        client
            .upload_pages(
                "box",
                "disk",
                PageRange::new(512, 1024),
                Bytes::from(vec![1u8; 512]),
                None,
                &conditions,
                None,
            )
            .await
            .unwrap();
        client
            .upload_pages(
                "box",
                "disk",
                PageRange::new(1024, 1536),
                Bytes::from(vec![2u8; 512]),
                None,
                &conditions,
                None,
            )
            .await
            .unwrap();
        let ranges = client
            .get_page_ranges("box", "disk", BlobRange::default(), &conditions, None)
            .await
            .unwrap();
        assert_eq!(ranges.page_ranges, vec![PageRange::new(512, 1536)]);

        client
            .clear_pages("box", "disk", PageRange::new(512, 1024), &conditions, None)
            .await
            .unwrap();
        let ranges = client
            .get_page_ranges("box", "disk", BlobRange::default(), &conditions, None)
            .await
            .unwrap();
        assert_eq!(ranges.page_ranges, vec![PageRange::new(1024, 1536)]);

        let resized = client
            .resize_page_blob("box", "disk", 1024, &conditions, None)
            .await
            .unwrap();
        assert_eq!(resized.blob_sequence_number, Some(7));
        let props = client
            .get_properties("box", "disk", &conditions, None)
            .await
            .unwrap();
        assert_eq!(props.blob_size, Some(1024));
    }

    #[tokio::test]
    async fn test_unaligned_page_write_rejected() {
        let client = client_with_container().await;
        client
            .create_page_blob("box", "disk", 1024, 0, &WriteOptions::default(), None)
            .await
            .unwrap();
        let err = client
            .upload_pages(
                "box",
                "disk",
                PageRange::new(100, 612),
                Bytes::from(vec![0u8; 512]),
                None,
                &no_conditions(),
                None,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, BlobError::Vendor { status: 416, .. }));
    }

    #[tokio::test]
    async fn test_copy_blob_within_account() {
        let client = client_with_container().await;
        client
            .upload_block_blob(
                "box",
                "src",
                Bytes::from_static(b"data"),
                &WriteOptions::default(),
                None,
            )
            .await
            .unwrap();
        let source = CopySource {
            account: "account".to_string(),
            container: "box".to_string(),
            blob: "src".to_string(),
        };
        let info = client.copy_blob(&source, "box", "dst", None).await.unwrap();
        assert_eq!(info.copy_status.as_deref(), Some("success"));
        let props = client
            .get_properties("box", "dst", &no_conditions(), None)
            .await
            .unwrap();
        assert_eq!(props.copy_id, Some(info.copy_id));
        assert_eq!(props.copy_source.as_deref(), Some("account/box/src"));
    }

    #[tokio::test]
    async fn test_memory_limit_enforced() {
        let client = MemoryBlobClient::with_limit("account", 4);
        client.create_container("box", None, None, None).await.unwrap();
        let err = client
            .upload_block_blob(
                "box",
                "big",
                Bytes::from_static(b"too large"),
                &WriteOptions::default(),
                None,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, BlobError::Internal(_)));
    }

    #[tokio::test]
    async fn test_delete_container_frees_blobs() {
        let client = client_with_container().await;
        client
            .upload_block_blob(
                "box",
                "a",
                Bytes::from_static(b"abc"),
                &WriteOptions::default(),
                None,
            )
            .await
            .unwrap();
        client
            .delete_container("box", &no_conditions(), None)
            .await
            .unwrap();
        assert_eq!(client.current_size.load(Ordering::Relaxed), 0);
        let listed = client
            .list_containers(&ListContainersOptions::default(), None)
            .await
            .unwrap();
        assert!(listed.is_empty());
    }

    #[test]
    fn test_download_url_contains_expiry() {
        let client = MemoryBlobClient::new("account");
        let url = client
            .download_url("box", "a", Duration::from_secs(60))
            .unwrap();
        assert!(url.starts_with("memory://account/box/a?se="));
    }
}
