//! Response envelopes.
//!
//! [`build`] maps every client result shape onto a body plus a set of
//! result headers keyed by the names in [`crate::constants`].  The mapping
//! is total and pure: each call builds a fresh header map, and a field the
//! service did not report is left out rather than defaulted.

use std::path::PathBuf;

use bytes::Bytes;

use crate::constants::*;
use crate::exchange::{Body, HeaderValue, Headers};
use crate::storage::backend::{
    AppendBlobItem, BlobItem, BlobProperties, BlockBlobItem, BlockList, ContainerItem, CopyInfo,
    PageBlobItem, PageList, RawHeaders, WriteInfo,
};

/// The body and result headers of one operation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Envelope {
    pub body: Body,
    pub headers: Headers,
}

/// What a handler hands back from its client call(s).
#[derive(Debug, Clone, PartialEq)]
pub enum VendorResult {
    Containers(Vec<ContainerItem>),
    Blobs(Vec<BlobItem>),
    Downloaded {
        data: Bytes,
        properties: BlobProperties,
    },
    DownloadedToFile {
        path: PathBuf,
        properties: BlobProperties,
    },
    Link(String),
    BlockBlob(BlockBlobItem),
    AppendBlob(AppendBlobItem),
    PageBlob(PageBlobItem),
    /// Calls whose only result is the HTTP response.
    RawHeaders(RawHeaders),
    BlockList(BlockList),
    PageList(PageList),
    /// Blocks staged without committing.
    Staged,
    Copy(CopyInfo),
}

impl VendorResult {
    /// Short name used in logs and metrics labels.
    pub fn kind(&self) -> &'static str {
        match self {
            VendorResult::Containers(_) => "containers",
            VendorResult::Blobs(_) => "blobs",
            VendorResult::Downloaded { .. } => "downloaded",
            VendorResult::DownloadedToFile { .. } => "downloaded_to_file",
            VendorResult::Link(_) => "link",
            VendorResult::BlockBlob(_) => "block_blob",
            VendorResult::AppendBlob(_) => "append_blob",
            VendorResult::PageBlob(_) => "page_blob",
            VendorResult::RawHeaders(_) => "raw_headers",
            VendorResult::BlockList(_) => "block_list",
            VendorResult::PageList(_) => "page_list",
            VendorResult::Staged => "staged",
            VendorResult::Copy(_) => "copy",
        }
    }
}

/// Map a client result onto its envelope.
pub fn build(result: VendorResult) -> Envelope {
    let mut headers = Headers::new();
    let body = match result {
        VendorResult::Containers(items) => Body::Containers(items),
        VendorResult::Blobs(items) => Body::Blobs(items),
        VendorResult::Downloaded { data, properties } => {
            put_properties(&mut headers, properties);
            Body::Bytes(data)
        }
        VendorResult::DownloadedToFile { path, properties } => {
            put_properties(&mut headers, properties);
            headers.insert(FILE_NAME, path.to_string_lossy().into_owned());
            Body::Path(path)
        }
        VendorResult::Link(url) => {
            headers.insert(DOWNLOAD_LINK, url);
            Body::Empty
        }
        VendorResult::BlockBlob(item) => {
            put_write_info(&mut headers, item.info);
            put(&mut headers, VERSION_ID, item.version_id);
            Body::Bool(true)
        }
        VendorResult::AppendBlob(item) => {
            put_write_info(&mut headers, item.info);
            put(&mut headers, APPEND_OFFSET, item.append_offset);
            put(&mut headers, COMMITTED_BLOCK_COUNT, item.committed_block_count);
            Body::Bool(true)
        }
        VendorResult::PageBlob(item) => {
            put_write_info(&mut headers, item.info);
            put(&mut headers, BLOB_SEQUENCE_NUMBER, item.blob_sequence_number);
            Body::Bool(true)
        }
        VendorResult::RawHeaders(raw) => {
            headers.insert(RAW_HTTP_HEADERS, raw);
            Body::Bool(true)
        }
        VendorResult::BlockList(list) => Body::BlockList(list),
        VendorResult::PageList(list) => Body::PageList(list),
        VendorResult::Staged => Body::Bool(true),
        VendorResult::Copy(info) => {
            headers.insert(COPY_ID, info.copy_id.clone());
            put(&mut headers, COPY_STATUS, info.copy_status);
            Body::Text(info.copy_id)
        }
    };
    Envelope { body, headers }
}

fn put<T: Into<HeaderValue>>(headers: &mut Headers, key: &str, value: Option<T>) {
    if let Some(value) = value {
        headers.insert(key, value);
    }
}

fn put_write_info(headers: &mut Headers, info: WriteInfo) {
    put(headers, E_TAG, info.etag);
    put(headers, LAST_MODIFIED, info.last_modified);
    put(headers, CONTENT_MD5, info.content_md5);
    put(headers, SERVER_ENCRYPTED, info.server_encrypted);
    put(headers, ENCRYPTION_KEY_SHA_256, info.encryption_key_sha256);
    put(headers, ENCRYPTION_SCOPE, info.encryption_scope);
}

fn put_properties(headers: &mut Headers, p: BlobProperties) {
    put(headers, E_TAG, p.etag);
    put(headers, LAST_MODIFIED, p.last_modified);
    put(headers, CREATION_TIME, p.creation_time);
    put(headers, CONTENT_TYPE, p.content_type);
    put(headers, CONTENT_MD5, p.content_md5);
    put(headers, CONTENT_ENCODING, p.content_encoding);
    put(headers, CONTENT_DISPOSITION, p.content_disposition);
    put(headers, CONTENT_LANGUAGE, p.content_language);
    put(headers, CACHE_CONTROL, p.cache_control);
    put(headers, BLOB_SIZE, p.blob_size);
    put(headers, BLOB_TYPE, p.blob_type);
    put(headers, BLOB_SEQUENCE_NUMBER, p.blob_sequence_number);
    put(headers, LEASE_STATUS, p.lease_status);
    put(headers, LEASE_STATE, p.lease_state);
    put(headers, LEASE_DURATION, p.lease_duration);
    put(headers, COPY_ID, p.copy_id);
    put(headers, COPY_STATUS, p.copy_status);
    put(headers, COPY_SOURCE, p.copy_source);
    put(headers, COPY_PROGRESS, p.copy_progress);
    put(headers, COPY_COMPLETION_TIME, p.copy_completion_time);
    put(headers, COPY_STATUS_DESCRIPTION, p.copy_status_description);
    put(headers, SERVER_ENCRYPTED, p.server_encrypted);
    put(headers, ENCRYPTION_KEY_SHA_256, p.encryption_key_sha256);
    put(headers, ENCRYPTION_SCOPE, p.encryption_scope);
    put(headers, ACCESS_TIER, p.access_tier);
    put(headers, ACCESS_TIER_INHERITED, p.access_tier_inherited);
    put(headers, ARCHIVE_STATUS, p.archive_status);
    put(headers, ACCESS_TIER_CHANGE_TIME, p.access_tier_change_time);
    put(headers, COMMITTED_BLOCK_COUNT, p.committed_block_count);
    put(headers, METADATA, p.metadata);
    put(headers, VERSION_ID, p.version_id);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::{BlobType, PageRange};
    use std::collections::BTreeMap;

    #[test]
    fn test_properties_contain_exactly_present_fields() {
        let properties = BlobProperties {
            blob_size: Some(42),
            content_type: Some("text/plain".to_string()),
            etag: Some("\"0x1\"".to_string()),
            ..Default::default()
        };
        let envelope = build(VendorResult::Downloaded {
            data: Bytes::from_static(b"hello"),
            properties,
        });
        assert_eq!(envelope.body, Body::Bytes(Bytes::from_static(b"hello")));
        assert_eq!(envelope.headers.len(), 3);
        assert_eq!(
            envelope.headers.get("AzureStorageBlobBlobSize"),
            Some(&HeaderValue::Integer(42))
        );
        assert_eq!(
            envelope.headers.get("AzureStorageBlobContentType"),
            Some(&HeaderValue::from("text/plain"))
        );
        assert_eq!(
            envelope.headers.get("AzureStorageBlobETag"),
            Some(&HeaderValue::from("\"0x1\""))
        );
    }

    #[test]
    fn test_empty_properties_add_no_headers() {
        let envelope = build(VendorResult::Downloaded {
            data: Bytes::new(),
            properties: BlobProperties::default(),
        });
        assert!(envelope.headers.is_empty());
    }

    #[test]
    fn test_listings_have_no_headers() {
        let envelope = build(VendorResult::Containers(vec![ContainerItem {
            name: "a".to_string(),
            ..Default::default()
        }]));
        assert!(envelope.headers.is_empty());
        assert!(matches!(envelope.body, Body::Containers(ref items) if items.len() == 1));

        let envelope = build(VendorResult::Blobs(Vec::new()));
        assert!(envelope.headers.is_empty());
        assert_eq!(envelope.body, Body::Blobs(Vec::new()));
    }

    #[test]
    fn test_write_items() {
        let info = WriteInfo {
            etag: Some("\"e\"".to_string()),
            server_encrypted: Some(true),
            ..Default::default()
        };
        let envelope = build(VendorResult::AppendBlob(AppendBlobItem {
            info: info.clone(),
            append_offset: Some(10),
            committed_block_count: Some(2),
        }));
        assert_eq!(envelope.body, Body::Bool(true));
        assert_eq!(
            envelope.headers.get(APPEND_OFFSET),
            Some(&HeaderValue::Integer(10))
        );
        assert_eq!(
            envelope.headers.get(COMMITTED_BLOCK_COUNT),
            Some(&HeaderValue::Integer(2))
        );
        assert_eq!(
            envelope.headers.get(SERVER_ENCRYPTED),
            Some(&HeaderValue::Boolean(true))
        );
        assert!(!envelope.headers.contains_key(LAST_MODIFIED));

        let envelope = build(VendorResult::PageBlob(PageBlobItem {
            info,
            blob_sequence_number: Some(0),
        }));
        assert_eq!(
            envelope.headers.get(BLOB_SEQUENCE_NUMBER),
            Some(&HeaderValue::Integer(0))
        );

        let envelope = build(VendorResult::BlockBlob(BlockBlobItem::default()));
        assert!(envelope.headers.is_empty());
    }

    #[test]
    fn test_raw_headers() {
        let mut raw = BTreeMap::new();
        raw.insert("x-ms-request-id".to_string(), "abc".to_string());
        let envelope = build(VendorResult::RawHeaders(raw.clone()));
        assert_eq!(envelope.body, Body::Bool(true));
        assert_eq!(
            envelope.headers.get(RAW_HTTP_HEADERS),
            Some(&HeaderValue::Map(raw))
        );
    }

    #[test]
    fn test_download_to_file() {
        let path = PathBuf::from("/tmp/out/report.csv");
        let envelope = build(VendorResult::DownloadedToFile {
            path: path.clone(),
            properties: BlobProperties {
                blob_type: Some(BlobType::BlockBlob),
                ..Default::default()
            },
        });
        assert_eq!(envelope.body, Body::Path(path));
        assert_eq!(
            envelope.headers.get(FILE_NAME),
            Some(&HeaderValue::from("/tmp/out/report.csv"))
        );
        assert_eq!(
            envelope.headers.get(BLOB_TYPE),
            Some(&HeaderValue::BlobType(BlobType::BlockBlob))
        );
    }

    #[test]
    fn test_link_and_copy() {
        let envelope = build(VendorResult::Link("https://a/b?sig=x".to_string()));
        assert_eq!(envelope.body, Body::Empty);
        assert_eq!(
            envelope.headers.get(DOWNLOAD_LINK),
            Some(&HeaderValue::from("https://a/b?sig=x"))
        );

        let envelope = build(VendorResult::Copy(CopyInfo {
            copy_id: "copy-1".to_string(),
            copy_status: None,
        }));
        assert_eq!(envelope.body, Body::Text("copy-1".to_string()));
        assert_eq!(envelope.headers.len(), 1);
        assert_eq!(
            envelope.headers.get(COPY_ID),
            Some(&HeaderValue::from("copy-1"))
        );
    }

    #[test]
    fn test_lists_and_staged() {
        let list = PageList {
            page_ranges: vec![PageRange::new(0, 512)],
            clear_ranges: Vec::new(),
        };
        let envelope = build(VendorResult::PageList(list.clone()));
        assert_eq!(envelope.body, Body::PageList(list));
        assert!(envelope.headers.is_empty());

        let envelope = build(VendorResult::Staged);
        assert_eq!(envelope.body, Body::Bool(true));
        assert!(envelope.headers.is_empty());
    }
}
