//! Typed option values shared by the configuration, the exchange headers,
//! and the storage client.
//!
//! Enumerated options parse case-insensitively from their wire names
//! (`"pageblob"`, `"Hot"`, `"include"`, ...) so they can be supplied as
//! plain strings in endpoint URIs, YAML files, or exchange headers.

use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::{BlobError, Result};

/// Declare a closed string-valued option enum.
///
/// Generates `as_str`, `Display`, case-insensitive `FromStr`, and the
/// `String` conversions serde uses for (de)serialization.
macro_rules! string_enum {
    (
        $(#[$meta:meta])*
        $name:ident { $( $(#[$vmeta:meta])* $variant:ident => $wire:literal ),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ::serde::Serialize, ::serde::Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub enum $name {
            $( $(#[$vmeta])* $variant ),+
        }

        impl $name {
            /// Every value, in declaration order.
            pub const ALL: &'static [$name] = &[$( $name::$variant ),+];

            /// Wire name of this value.
            pub fn as_str(&self) -> &'static str {
                match self {
                    $( $name::$variant => $wire ),+
                }
            }
        }

        impl ::std::fmt::Display for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl ::std::str::FromStr for $name {
            type Err = $crate::errors::BlobError;

            fn from_str(s: &str) -> ::std::result::Result<Self, Self::Err> {
                let s = s.trim();
                $(
                    if s.eq_ignore_ascii_case($wire) {
                        return Ok($name::$variant);
                    }
                )+
                Err($crate::errors::BlobError::config(format!(
                    "invalid {} value '{}'",
                    stringify!($name),
                    s
                )))
            }
        }

        impl ::std::convert::TryFrom<String> for $name {
            type Error = $crate::errors::BlobError;

            fn try_from(value: String) -> ::std::result::Result<Self, Self::Error> {
                value.parse()
            }
        }

        impl ::std::convert::From<$name> for String {
            fn from(value: $name) -> Self {
                value.as_str().to_string()
            }
        }
    };
}

pub(crate) use string_enum;

string_enum! {
    /// Kind of blob an operation targets.
    BlobType {
        BlockBlob => "blockblob",
        AppendBlob => "appendblob",
        PageBlob => "pageblob",
    }
}

string_enum! {
    /// Storage access tier.
    AccessTier {
        Hot => "Hot",
        Cool => "Cool",
        Cold => "Cold",
        Archive => "Archive",
    }
}

string_enum! {
    /// Anonymous read access granted on a new container.
    PublicAccessType {
        Container => "container",
        Blob => "blob",
    }
}

string_enum! {
    /// How snapshots are handled when deleting a base blob.
    DeleteSnapshotsOption {
        Include => "include",
        Only => "only",
    }
}

string_enum! {
    /// Which blocks a block-list query returns.
    BlockListType {
        Committed => "committed",
        Uncommitted => "uncommitted",
        All => "all",
    }
}

impl Default for BlobType {
    fn default() -> Self {
        BlobType::BlockBlob
    }
}

impl Default for BlockListType {
    fn default() -> Self {
        BlockListType::Committed
    }
}

/// A byte range of a blob: `count` bytes starting at `offset`.
/// `count == None` or `Some(0)` reads to the end of the blob.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BlobRange {
    pub offset: u64,
    pub count: Option<u64>,
}

impl BlobRange {
    pub fn new(offset: u64, count: Option<u64>) -> Self {
        Self { offset, count }
    }

    /// Number of bytes to read, or `None` to read to the end.
    pub fn limit(&self) -> Option<u64> {
        self.count.filter(|&count| count > 0)
    }

    /// Exclusive end of the range within a blob of `size` bytes.
    pub fn end_within(&self, size: u64) -> u64 {
        match self.limit() {
            Some(count) => self.offset.saturating_add(count).min(size),
            None => size,
        }
    }

    /// Render as an HTTP `Range` header value, or `None` for the whole blob.
    pub fn to_header(&self) -> Option<String> {
        match self.limit() {
            Some(count) => Some(format!(
                "bytes={}-{}",
                self.offset,
                self.offset.saturating_add(count - 1)
            )),
            None if self.offset == 0 => None,
            None => Some(format!("bytes={}-", self.offset)),
        }
    }
}

/// A page range expressed as a start/end pair.
///
/// `end` is the exclusive upper bound of the range, so the range covers
/// `end - start` bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRange {
    pub start: u64,
    pub end: u64,
}

impl PageRange {
    pub fn new(start: u64, end: u64) -> Self {
        Self { start, end }
    }

    /// Reject ranges whose end lies before their start.
    pub fn validate(self) -> Result<Self> {
        if self.end < self.start {
            return Err(BlobError::config(format!(
                "page range end {} is before its start {}",
                self.end, self.start
            )));
        }
        Ok(self)
    }

    /// Number of bytes covered by the range.
    pub fn len(&self) -> u64 {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Render as the inclusive `x-ms-range` header value.
    pub fn to_header(&self) -> String {
        format!("bytes={}-{}", self.start, self.end.saturating_sub(1))
    }
}

/// Standard HTTP headers stored with a blob.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BlobHttpHeaders {
    pub content_type: Option<String>,
    pub content_encoding: Option<String>,
    pub content_language: Option<String>,
    pub content_disposition: Option<String>,
    pub cache_control: Option<String>,
    /// Base64-encoded MD5 of the whole blob.
    pub content_md5: Option<String>,
}

/// Preconditions attached to a write, read, or delete.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RequestConditions {
    pub if_match: Option<String>,
    pub if_none_match: Option<String>,
    pub if_modified_since: Option<DateTime<Utc>>,
    pub if_unmodified_since: Option<DateTime<Utc>>,
    pub lease_id: Option<String>,
}

impl RequestConditions {
    /// Whether no condition is set.
    pub fn is_empty(&self) -> bool {
        self.if_match.is_none()
            && self.if_none_match.is_none()
            && self.if_modified_since.is_none()
            && self.if_unmodified_since.is_none()
            && self.lease_id.is_none()
    }
}

/// Extra datasets to include in a blob listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BlobListDetails {
    pub metadata: bool,
    pub snapshots: bool,
    pub uncommitted_blobs: bool,
    pub copy: bool,
    pub deleted_blobs: bool,
}

impl BlobListDetails {
    /// Comma-separated `include=` query value, or `None` when nothing is requested.
    pub fn include_param(&self) -> Option<String> {
        let mut parts = Vec::new();
        if self.copy {
            parts.push("copy");
        }
        if self.deleted_blobs {
            parts.push("deleted");
        }
        if self.metadata {
            parts.push("metadata");
        }
        if self.snapshots {
            parts.push("snapshots");
        }
        if self.uncommitted_blobs {
            parts.push("uncommittedblobs");
        }
        if parts.is_empty() {
            None
        } else {
            Some(parts.join(","))
        }
    }
}

/// Options for listing blobs in a container.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ListBlobsOptions {
    pub prefix: Option<String>,
    pub max_results_per_page: Option<u32>,
    pub details: BlobListDetails,
}

/// Options for listing containers in an account.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ListContainersOptions {
    pub prefix: Option<String>,
    pub max_results_per_page: Option<u32>,
    pub include_metadata: bool,
}

/// One block of a block blob: a base64 block id plus its data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobBlock {
    pub id: String,
    pub data: Bytes,
}

impl BlobBlock {
    /// Wrap `data` in a block with a freshly generated id.
    ///
    /// Ids are base64 of a UUID so every generated id has the same length,
    /// which the service requires within one blob.
    pub fn new(data: impl Into<Bytes>) -> Self {
        let id = BASE64_STANDARD.encode(uuid::Uuid::new_v4().to_string());
        Self {
            id,
            data: data.into(),
        }
    }

    pub fn with_id(id: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            id: id.into(),
            data: data.into(),
        }
    }
}

/// Format a timestamp as an RFC 1123 HTTP date.
pub fn http_date(dt: &DateTime<Utc>) -> String {
    dt.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

/// Parse an RFC 1123 HTTP date, as the service reports `Last-Modified`.
pub fn parse_http_date(value: &str) -> Option<DateTime<Utc>> {
    httpdate::parse_http_date(value.trim())
        .ok()
        .map(DateTime::<Utc>::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blob_type_parse_case_insensitive() {
        assert_eq!("pageblob".parse::<BlobType>().unwrap(), BlobType::PageBlob);
        assert_eq!("PageBlob".parse::<BlobType>().unwrap(), BlobType::PageBlob);
        assert_eq!(
            " appendblob ".parse::<BlobType>().unwrap(),
            BlobType::AppendBlob
        );
        assert!("tableblob".parse::<BlobType>().is_err());
    }

    #[test]
    fn test_access_tier_wire_name() {
        assert_eq!("hot".parse::<AccessTier>().unwrap(), AccessTier::Hot);
        assert_eq!(AccessTier::Archive.as_str(), "Archive");
        assert_eq!(AccessTier::Cool.to_string(), "Cool");
    }

    #[test]
    fn test_string_enum_serde() {
        let json = serde_json::to_string(&DeleteSnapshotsOption::Include).unwrap();
        assert_eq!(json, "\"include\"");
        let parsed: BlockListType = serde_json::from_str("\"ALL\"").unwrap();
        assert_eq!(parsed, BlockListType::All);
        assert!(serde_json::from_str::<BlockListType>("\"some\"").is_err());
    }

    #[test]
    fn test_blob_range_header() {
        assert_eq!(BlobRange::new(0, None).to_header(), None);
        assert_eq!(
            BlobRange::new(0, Some(1024)).to_header().as_deref(),
            Some("bytes=0-1023")
        );
        assert_eq!(
            BlobRange::new(100, None).to_header().as_deref(),
            Some("bytes=100-")
        );
    }

    #[test]
    fn test_blob_range_near_u64_max() {
        let range = BlobRange::new(1, Some(u64::MAX));
        assert_eq!(range.end_within(5), 5);
        assert_eq!(
            range.to_header().as_deref(),
            Some("bytes=1-18446744073709551615")
        );
    }

    #[test]
    fn test_zero_count_reads_to_end() {
        let range = BlobRange::new(100, Some(0));
        assert_eq!(range.limit(), None);
        assert_eq!(range.end_within(300), 300);
        assert_eq!(range.to_header().as_deref(), Some("bytes=100-"));
    }

    #[test]
    fn test_inverted_page_range_rejected() {
        assert!(PageRange::new(1024, 512).validate().is_err());
        assert_eq!(
            PageRange::new(512, 512).validate().unwrap(),
            PageRange::new(512, 512)
        );
    }

    #[test]
    fn test_page_range_len_and_header() {
        let range = PageRange::new(0, 512);
        assert_eq!(range.len(), 512);
        assert_eq!(range.to_header(), "bytes=0-511");
        assert!(PageRange::new(512, 512).is_empty());
    }

    #[test]
    fn test_list_details_include_param() {
        assert_eq!(BlobListDetails::default().include_param(), None);
        let details = BlobListDetails {
            metadata: true,
            snapshots: true,
            ..Default::default()
        };
        assert_eq!(details.include_param().as_deref(), Some("metadata,snapshots"));
    }

    #[test]
    fn test_generated_block_ids_same_length() {
        let a = BlobBlock::new(Bytes::from_static(b"a"));
        let b = BlobBlock::new(Bytes::from_static(b"bbbb"));
        assert_ne!(a.id, b.id);
        assert_eq!(a.id.len(), b.id.len());
    }

    #[test]
    fn test_http_date_format() {
        let dt = DateTime::parse_from_rfc3339("2026-02-24T12:34:56Z")
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(http_date(&dt), "Tue, 24 Feb 2026 12:34:56 GMT");
        assert_eq!(parse_http_date("Tue, 24 Feb 2026 12:34:56 GMT"), Some(dt));
        assert_eq!(parse_http_date("yesterday"), None);
    }
}
