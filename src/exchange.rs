//! The unit of work handed over by the host runtime.
//!
//! An [`Exchange`] carries typed [`Headers`] (the per-call option
//! overrides) and a [`Body`].  Headers live for exactly one call; the
//! producer reads them only through the configuration proxy and writes its
//! results back with [`Exchange::apply`].

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use crate::envelope::Envelope;
use crate::operations::BlobOperation;
use crate::options::{
    AccessTier, BlobBlock, BlobHttpHeaders, BlobType, BlockListType,
    DeleteSnapshotsOption, ListBlobsOptions, ListContainersOptions, PageRange, PublicAccessType,
    RequestConditions,
};
use crate::storage::backend::{BlobItem, BlockList, ContainerItem, PageList};

/// A typed header value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum HeaderValue {
    Null,
    String(String),
    Integer(i64),
    Boolean(bool),
    Duration(Duration),
    Timestamp(DateTime<Utc>),
    Map(BTreeMap<String, String>),
    List(Vec<String>),
    Operation(BlobOperation),
    BlobType(BlobType),
    AccessTier(AccessTier),
    PublicAccessType(PublicAccessType),
    DeleteSnapshotsOption(DeleteSnapshotsOption),
    BlockListType(BlockListType),
    PageRange(PageRange),
    HttpHeaders(BlobHttpHeaders),
    RequestConditions(RequestConditions),
    ListBlobsOptions(ListBlobsOptions),
    ListContainersOptions(ListContainersOptions),
}

impl HeaderValue {
    /// Whether this value counts as "not supplied".
    ///
    /// Null, blank strings, and empty collections are empty.  Booleans,
    /// numbers, durations and structured options never are, so an explicit
    /// `false` or `0` still overrides the endpoint configuration.
    pub fn is_empty(&self) -> bool {
        match self {
            HeaderValue::Null => true,
            HeaderValue::String(s) => s.trim().is_empty(),
            HeaderValue::Map(m) => m.is_empty(),
            HeaderValue::List(l) => l.is_empty(),
            _ => false,
        }
    }

    /// Short type name for error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            HeaderValue::Null => "null",
            HeaderValue::String(_) => "string",
            HeaderValue::Integer(_) => "integer",
            HeaderValue::Boolean(_) => "boolean",
            HeaderValue::Duration(_) => "duration",
            HeaderValue::Timestamp(_) => "timestamp",
            HeaderValue::Map(_) => "map",
            HeaderValue::List(_) => "list",
            HeaderValue::Operation(_) => "operation",
            HeaderValue::BlobType(_) => "blob type",
            HeaderValue::AccessTier(_) => "access tier",
            HeaderValue::PublicAccessType(_) => "public access type",
            HeaderValue::DeleteSnapshotsOption(_) => "delete snapshots option",
            HeaderValue::BlockListType(_) => "block list type",
            HeaderValue::PageRange(_) => "page range",
            HeaderValue::HttpHeaders(_) => "http headers",
            HeaderValue::RequestConditions(_) => "request conditions",
            HeaderValue::ListBlobsOptions(_) => "list blobs options",
            HeaderValue::ListContainersOptions(_) => "list containers options",
        }
    }
}

/// Conversion from a header value to an option's Rust type.
///
/// Returns `None` when the value has an incompatible type.  Strings are
/// coerced where the host would naturally supply them as text.
pub trait FromHeaderValue: Sized {
    fn from_header_value(value: &HeaderValue) -> Option<Self>;
}

impl FromHeaderValue for String {
    fn from_header_value(value: &HeaderValue) -> Option<Self> {
        match value {
            HeaderValue::String(s) => Some(s.clone()),
            HeaderValue::Integer(i) => Some(i.to_string()),
            HeaderValue::Boolean(b) => Some(b.to_string()),
            _ => None,
        }
    }
}

impl FromHeaderValue for i64 {
    fn from_header_value(value: &HeaderValue) -> Option<Self> {
        match value {
            HeaderValue::Integer(i) => Some(*i),
            HeaderValue::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }
}

impl FromHeaderValue for u64 {
    fn from_header_value(value: &HeaderValue) -> Option<Self> {
        i64::from_header_value(value).and_then(|i| u64::try_from(i).ok())
    }
}

impl FromHeaderValue for u32 {
    fn from_header_value(value: &HeaderValue) -> Option<Self> {
        i64::from_header_value(value).and_then(|i| u32::try_from(i).ok())
    }
}

impl FromHeaderValue for bool {
    fn from_header_value(value: &HeaderValue) -> Option<Self> {
        match value {
            HeaderValue::Boolean(b) => Some(*b),
            HeaderValue::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }
}

/// Integers and numeric strings are milliseconds.
impl FromHeaderValue for Duration {
    fn from_header_value(value: &HeaderValue) -> Option<Self> {
        match value {
            HeaderValue::Duration(d) => Some(*d),
            other => u64::from_header_value(other).map(Duration::from_millis),
        }
    }
}

impl FromHeaderValue for BTreeMap<String, String> {
    fn from_header_value(value: &HeaderValue) -> Option<Self> {
        match value {
            HeaderValue::Map(m) => Some(m.clone()),
            _ => None,
        }
    }
}

impl FromHeaderValue for Vec<String> {
    fn from_header_value(value: &HeaderValue) -> Option<Self> {
        match value {
            HeaderValue::List(l) => Some(l.clone()),
            HeaderValue::String(s) => Some(
                s.split(',')
                    .map(|part| part.trim().to_string())
                    .filter(|part| !part.is_empty())
                    .collect(),
            ),
            _ => None,
        }
    }
}

/// Implement [`FromHeaderValue`] for an option enum: accept its own variant
/// or its wire name as a string.
macro_rules! enum_from_header {
    ($($ty:ident),+ $(,)?) => {
        $(
            impl FromHeaderValue for $ty {
                fn from_header_value(value: &HeaderValue) -> Option<Self> {
                    match value {
                        HeaderValue::$ty(v) => Some(*v),
                        HeaderValue::String(s) => s.parse().ok(),
                        _ => None,
                    }
                }
            }
        )+
    };
}

enum_from_header!(
    BlobType,
    AccessTier,
    PublicAccessType,
    DeleteSnapshotsOption,
    BlockListType,
);

// The operation string is parsed by the proxy itself so an unknown name can
// be reported as an unsupported operation rather than a type mismatch.
impl FromHeaderValue for BlobOperation {
    fn from_header_value(value: &HeaderValue) -> Option<Self> {
        match value {
            HeaderValue::Operation(op) => Some(*op),
            _ => None,
        }
    }
}

/// Implement [`FromHeaderValue`] for a structured option carried only as
/// its own variant.
macro_rules! struct_from_header {
    ($($variant:ident => $ty:ty),+ $(,)?) => {
        $(
            impl FromHeaderValue for $ty {
                fn from_header_value(value: &HeaderValue) -> Option<Self> {
                    match value {
                        HeaderValue::$variant(v) => Some(v.clone()),
                        _ => None,
                    }
                }
            }
        )+
    };
}

struct_from_header!(
    Timestamp => DateTime<Utc>,
    PageRange => PageRange,
    HttpHeaders => BlobHttpHeaders,
    RequestConditions => RequestConditions,
    ListBlobsOptions => ListBlobsOptions,
    ListContainersOptions => ListContainersOptions,
);

macro_rules! header_value_from {
    ($($ty:ty => $variant:ident),+ $(,)?) => {
        $(
            impl From<$ty> for HeaderValue {
                fn from(value: $ty) -> Self {
                    HeaderValue::$variant(value)
                }
            }
        )+
    };
}

header_value_from!(
    String => String,
    i64 => Integer,
    bool => Boolean,
    Duration => Duration,
    DateTime<Utc> => Timestamp,
    BTreeMap<String, String> => Map,
    Vec<String> => List,
    BlobOperation => Operation,
    BlobType => BlobType,
    AccessTier => AccessTier,
    PublicAccessType => PublicAccessType,
    DeleteSnapshotsOption => DeleteSnapshotsOption,
    BlockListType => BlockListType,
    PageRange => PageRange,
    BlobHttpHeaders => HttpHeaders,
    RequestConditions => RequestConditions,
    ListBlobsOptions => ListBlobsOptions,
    ListContainersOptions => ListContainersOptions,
);

impl From<&str> for HeaderValue {
    fn from(value: &str) -> Self {
        HeaderValue::String(value.to_string())
    }
}

impl From<u64> for HeaderValue {
    fn from(value: u64) -> Self {
        // Sizes beyond i64::MAX are not representable by the service either.
        HeaderValue::Integer(i64::try_from(value).unwrap_or(i64::MAX))
    }
}

/// Per-call header map.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Headers(BTreeMap<String, HeaderValue>);

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&HeaderValue> {
        self.0.get(key)
    }

    /// The value under `key`, unless it is absent or empty.
    pub fn get_non_empty(&self, key: &str) -> Option<&HeaderValue> {
        self.0.get(key).filter(|v| !v.is_empty())
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<HeaderValue>) {
        self.0.insert(key.into(), value.into());
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<HeaderValue>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn remove(&mut self, key: &str) -> Option<HeaderValue> {
        self.0.remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &HeaderValue)> {
        self.0.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }

    /// Insert every entry of `other`, replacing existing keys.
    pub fn extend(&mut self, other: Headers) {
        self.0.extend(other.0);
    }
}

impl FromIterator<(String, HeaderValue)> for Headers {
    fn from_iter<T: IntoIterator<Item = (String, HeaderValue)>>(iter: T) -> Self {
        Headers(iter.into_iter().collect())
    }
}

/// Message body.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Body {
    #[default]
    Empty,
    Bytes(Bytes),
    Text(String),
    Bool(bool),
    /// Blocks to stage, each with its own id.
    Blocks(Vec<BlobBlock>),
    /// Ids of previously staged blocks to commit.
    BlockIds(Vec<String>),
    Containers(Vec<ContainerItem>),
    Blobs(Vec<BlobItem>),
    BlockList(BlockList),
    PageList(PageList),
    Path(PathBuf),
}

impl Body {
    /// Raw payload for upload operations.
    pub fn as_bytes(&self) -> Option<Bytes> {
        match self {
            Body::Bytes(b) => Some(b.clone()),
            Body::Text(s) => Some(Bytes::from(s.clone())),
            _ => None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Body::Empty => "empty",
            Body::Bytes(_) => "bytes",
            Body::Text(_) => "text",
            Body::Bool(_) => "bool",
            Body::Blocks(_) => "blocks",
            Body::BlockIds(_) => "block ids",
            Body::Containers(_) => "containers",
            Body::Blobs(_) => "blobs",
            Body::BlockList(_) => "block list",
            Body::PageList(_) => "page list",
            Body::Path(_) => "path",
        }
    }
}

impl From<Bytes> for Body {
    fn from(value: Bytes) -> Self {
        Body::Bytes(value)
    }
}

impl From<&str> for Body {
    fn from(value: &str) -> Self {
        Body::Text(value.to_string())
    }
}

impl From<Vec<u8>> for Body {
    fn from(value: Vec<u8>) -> Self {
        Body::Bytes(Bytes::from(value))
    }
}

/// Bytes render as UTF-8 text when valid, base64 otherwise.
impl Serialize for Body {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Body::Empty => serializer.serialize_none(),
            Body::Bytes(b) => match std::str::from_utf8(b) {
                Ok(text) => serializer.serialize_str(text),
                Err(_) => {
                    let mut map = serializer.serialize_map(Some(1))?;
                    map.serialize_entry("base64", &BASE64_STANDARD.encode(b))?;
                    map.end()
                }
            },
            Body::Text(s) => serializer.serialize_str(s),
            Body::Bool(b) => serializer.serialize_bool(*b),
            Body::Blocks(blocks) => {
                let ids: Vec<&str> = blocks.iter().map(|b| b.id.as_str()).collect();
                ids.serialize(serializer)
            }
            Body::BlockIds(ids) => ids.serialize(serializer),
            Body::Containers(items) => items.serialize(serializer),
            Body::Blobs(items) => items.serialize(serializer),
            Body::BlockList(list) => list.serialize(serializer),
            Body::PageList(list) => list.serialize(serializer),
            Body::Path(path) => path.serialize(serializer),
        }
    }
}

/// One request/response unit of work.
#[derive(Debug, Clone, Default)]
pub struct Exchange {
    pub headers: Headers,
    pub body: Body,
}

impl Exchange {
    pub fn new(headers: Headers, body: impl Into<Body>) -> Self {
        Self {
            headers,
            body: body.into(),
        }
    }

    pub fn with_headers(headers: Headers) -> Self {
        Self {
            headers,
            body: Body::Empty,
        }
    }

    /// Write an operation result back: the body is replaced and the result
    /// headers are merged over the request headers.
    pub fn apply(&mut self, envelope: Envelope) {
        self.body = envelope.body;
        self.headers.extend(envelope.headers);
    }
}
