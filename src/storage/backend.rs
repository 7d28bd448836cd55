//! Abstract blob service client.
//!
//! Every storage client must implement [`BlobClient`].  Each method is one
//! call against the blob service and returns one of the result shapes
//! defined here; the producer never sees wire-level details.  A 404 from the
//! service is always reported as [`BlobError::NotFound`] so callers can
//! decide whether "missing" is fatal.
//!
//! [`BlobError::NotFound`]: crate::errors::BlobError::NotFound

use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::errors::Result;
use crate::options::{
    AccessTier, BlobBlock, BlobHttpHeaders, BlobRange, BlobType, BlockListType,
    DeleteSnapshotsOption, ListBlobsOptions, ListContainersOptions, PageRange, PublicAccessType,
    RequestConditions,
};

/// Boxed future returned by every client call.
pub type ClientFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + Send + 'a>>;

/// Raw response headers of calls whose only result is the HTTP response.
pub type RawHeaders = BTreeMap<String, String>;

// -- Result shapes -------------------------------------------------------------

/// One entry of a container listing.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ContainerItem {
    pub name: String,
    pub etag: Option<String>,
    pub last_modified: Option<DateTime<Utc>>,
    pub public_access: Option<PublicAccessType>,
    pub metadata: BTreeMap<String, String>,
}

/// One entry of a blob listing.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct BlobItem {
    pub name: String,
    pub snapshot: Option<String>,
    pub deleted: bool,
    pub blob_type: Option<BlobType>,
    pub size: Option<u64>,
    pub content_type: Option<String>,
    pub etag: Option<String>,
    pub last_modified: Option<DateTime<Utc>>,
    pub access_tier: Option<AccessTier>,
    pub metadata: BTreeMap<String, String>,
}

/// Properties of a single blob.  Fields the service did not report are
/// `None`.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct BlobProperties {
    pub etag: Option<String>,
    pub last_modified: Option<DateTime<Utc>>,
    pub creation_time: Option<DateTime<Utc>>,
    pub content_type: Option<String>,
    pub content_md5: Option<String>,
    pub content_encoding: Option<String>,
    pub content_disposition: Option<String>,
    pub content_language: Option<String>,
    pub cache_control: Option<String>,
    pub blob_size: Option<u64>,
    pub blob_type: Option<BlobType>,
    pub blob_sequence_number: Option<i64>,
    pub lease_status: Option<String>,
    pub lease_state: Option<String>,
    pub lease_duration: Option<String>,
    pub copy_id: Option<String>,
    pub copy_status: Option<String>,
    pub copy_source: Option<String>,
    pub copy_progress: Option<String>,
    pub copy_completion_time: Option<DateTime<Utc>>,
    pub copy_status_description: Option<String>,
    pub server_encrypted: Option<bool>,
    pub encryption_key_sha256: Option<String>,
    pub encryption_scope: Option<String>,
    pub access_tier: Option<AccessTier>,
    pub access_tier_inherited: Option<bool>,
    pub archive_status: Option<String>,
    pub access_tier_change_time: Option<DateTime<Utc>>,
    pub committed_block_count: Option<i64>,
    pub metadata: Option<BTreeMap<String, String>>,
    pub version_id: Option<String>,
}

/// Blob content plus its properties.
#[derive(Debug, Clone, PartialEq)]
pub struct DownloadedBlob {
    pub data: Bytes,
    pub properties: BlobProperties,
}

/// Fields common to every blob write response.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct WriteInfo {
    pub etag: Option<String>,
    pub last_modified: Option<DateTime<Utc>>,
    pub content_md5: Option<String>,
    pub server_encrypted: Option<bool>,
    pub encryption_key_sha256: Option<String>,
    pub encryption_scope: Option<String>,
}

/// Result of a block blob upload or block list commit.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct BlockBlobItem {
    pub info: WriteInfo,
    pub version_id: Option<String>,
}

/// Result of an append blob create or append.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct AppendBlobItem {
    pub info: WriteInfo,
    pub append_offset: Option<u64>,
    pub committed_block_count: Option<i64>,
}

/// Result of a page blob create, write, resize, or clear.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct PageBlobItem {
    pub info: WriteInfo,
    pub blob_sequence_number: Option<i64>,
}

/// A block as reported by a block list query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Block {
    pub name: String,
    pub size: u64,
}

/// Committed and uncommitted blocks of a block blob.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct BlockList {
    pub committed: Vec<Block>,
    pub uncommitted: Vec<Block>,
}

/// Valid and cleared page ranges of a page blob.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct PageList {
    pub page_ranges: Vec<PageRange>,
    pub clear_ranges: Vec<PageRange>,
}

/// Result of starting a server-side copy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CopyInfo {
    pub copy_id: String,
    pub copy_status: Option<String>,
}

// -- Request shapes ------------------------------------------------------------

/// Options shared by calls that create or overwrite a blob.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct WriteOptions {
    pub http_headers: Option<BlobHttpHeaders>,
    pub metadata: Option<BTreeMap<String, String>>,
    pub access_tier: Option<AccessTier>,
    /// Base64 MD5 of the transmitted content, checked by the service.
    pub content_md5: Option<String>,
    pub conditions: RequestConditions,
}

/// Source of a server-side copy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopySource {
    pub account: String,
    pub container: String,
    pub blob: String,
}

// -- Client contract -----------------------------------------------------------

/// Async blob service contract.
///
/// `timeout` is the per-call service timeout; clients pass it through to
/// the transport and never retry.
pub trait BlobClient: Send + Sync + 'static {
    /// Account this client is bound to.
    fn account_name(&self) -> &str;

    /// List containers in the account.
    fn list_containers<'a>(
        &'a self,
        options: &'a ListContainersOptions,
        timeout: Option<Duration>,
    ) -> ClientFuture<'a, Vec<ContainerItem>>;

    /// Create a container.
    fn create_container<'a>(
        &'a self,
        container: &'a str,
        metadata: Option<&'a BTreeMap<String, String>>,
        public_access: Option<PublicAccessType>,
        timeout: Option<Duration>,
    ) -> ClientFuture<'a, RawHeaders>;

    /// Delete a container.
    fn delete_container<'a>(
        &'a self,
        container: &'a str,
        conditions: &'a RequestConditions,
        timeout: Option<Duration>,
    ) -> ClientFuture<'a, RawHeaders>;

    /// List blobs in a container.
    fn list_blobs<'a>(
        &'a self,
        container: &'a str,
        options: &'a ListBlobsOptions,
        timeout: Option<Duration>,
    ) -> ClientFuture<'a, Vec<BlobItem>>;

    /// Read a blob (or a range of it) with its properties.
    fn download<'a>(
        &'a self,
        container: &'a str,
        blob: &'a str,
        range: BlobRange,
        conditions: &'a RequestConditions,
        timeout: Option<Duration>,
    ) -> ClientFuture<'a, DownloadedBlob>;

    /// Read blob properties without content.
    fn get_properties<'a>(
        &'a self,
        container: &'a str,
        blob: &'a str,
        conditions: &'a RequestConditions,
        timeout: Option<Duration>,
    ) -> ClientFuture<'a, BlobProperties>;

    /// Delete a blob.
    fn delete_blob<'a>(
        &'a self,
        container: &'a str,
        blob: &'a str,
        snapshots: Option<DeleteSnapshotsOption>,
        conditions: &'a RequestConditions,
        timeout: Option<Duration>,
    ) -> ClientFuture<'a, RawHeaders>;

    /// Create or overwrite a block blob in one call.
    fn upload_block_blob<'a>(
        &'a self,
        container: &'a str,
        blob: &'a str,
        data: Bytes,
        options: &'a WriteOptions,
        timeout: Option<Duration>,
    ) -> ClientFuture<'a, BlockBlobItem>;

    /// Stage one uncommitted block.
    fn stage_block<'a>(
        &'a self,
        container: &'a str,
        blob: &'a str,
        block: &'a BlobBlock,
        lease_id: Option<&'a str>,
        timeout: Option<Duration>,
    ) -> ClientFuture<'a, ()>;

    /// Commit staged or committed blocks, in order, as the blob content.
    fn commit_block_list<'a>(
        &'a self,
        container: &'a str,
        blob: &'a str,
        block_ids: &'a [String],
        options: &'a WriteOptions,
        timeout: Option<Duration>,
    ) -> ClientFuture<'a, BlockBlobItem>;

    /// Query the block list of a block blob.
    fn get_block_list<'a>(
        &'a self,
        container: &'a str,
        blob: &'a str,
        list_type: BlockListType,
        lease_id: Option<&'a str>,
        timeout: Option<Duration>,
    ) -> ClientFuture<'a, BlockList>;

    /// Create an empty append blob.
    fn create_append_blob<'a>(
        &'a self,
        container: &'a str,
        blob: &'a str,
        options: &'a WriteOptions,
        timeout: Option<Duration>,
    ) -> ClientFuture<'a, AppendBlobItem>;

    /// Append a block to an existing append blob.
    fn append_block<'a>(
        &'a self,
        container: &'a str,
        blob: &'a str,
        data: Bytes,
        content_md5: Option<&'a str>,
        conditions: &'a RequestConditions,
        timeout: Option<Duration>,
    ) -> ClientFuture<'a, AppendBlobItem>;

    /// Create a zero-filled page blob of `size` bytes.
    fn create_page_blob<'a>(
        &'a self,
        container: &'a str,
        blob: &'a str,
        size: u64,
        sequence_number: i64,
        options: &'a WriteOptions,
        timeout: Option<Duration>,
    ) -> ClientFuture<'a, PageBlobItem>;

    /// Write `data` into `range` of a page blob.
    fn upload_pages<'a>(
        &'a self,
        container: &'a str,
        blob: &'a str,
        range: PageRange,
        data: Bytes,
        content_md5: Option<&'a str>,
        conditions: &'a RequestConditions,
        timeout: Option<Duration>,
    ) -> ClientFuture<'a, PageBlobItem>;

    /// Change the size of a page blob.
    fn resize_page_blob<'a>(
        &'a self,
        container: &'a str,
        blob: &'a str,
        size: u64,
        conditions: &'a RequestConditions,
        timeout: Option<Duration>,
    ) -> ClientFuture<'a, PageBlobItem>;

    /// Clear `range` of a page blob.
    fn clear_pages<'a>(
        &'a self,
        container: &'a str,
        blob: &'a str,
        range: PageRange,
        conditions: &'a RequestConditions,
        timeout: Option<Duration>,
    ) -> ClientFuture<'a, PageBlobItem>;

    /// Valid page ranges within `range` of a page blob.
    fn get_page_ranges<'a>(
        &'a self,
        container: &'a str,
        blob: &'a str,
        range: BlobRange,
        conditions: &'a RequestConditions,
        timeout: Option<Duration>,
    ) -> ClientFuture<'a, PageList>;

    /// Start a server-side copy from `source` to `container/blob`.
    fn copy_blob<'a>(
        &'a self,
        source: &'a CopySource,
        container: &'a str,
        blob: &'a str,
        timeout: Option<Duration>,
    ) -> ClientFuture<'a, CopyInfo>;

    /// A read-only URL for the blob valid for `expires_in`.
    fn download_url(&self, container: &str, blob: &str, expires_in: Duration) -> Result<String>;
}
