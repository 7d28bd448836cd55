//! Per-call option resolution.
//!
//! [`ConfigurationProxy`] answers "what value does this call use for option
//! X?".  Every accessor follows the same rule: a non-empty exchange header
//! wins, otherwise the endpoint's static configuration applies, otherwise
//! the option is undefined (`None`).  Resolution never mutates either
//! source.
//!
//! Two accessors derive their value:
//! - [`prefix`](ConfigurationProxy::prefix) is always undefined while a
//!   regex filter resolves to a non-empty value;
//! - [`blob_range`](ConfigurationProxy::blob_range) uses the page range of
//!   a page blob call and the static offset/count otherwise.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::config::BlobConfiguration;
use crate::constants::*;
use crate::errors::{BlobError, Result};
use crate::exchange::{FromHeaderValue, HeaderValue, Headers};
use crate::operations::BlobOperation;
use crate::options::{
    AccessTier, BlobHttpHeaders, BlobRange, BlobType, BlockListType, DeleteSnapshotsOption,
    ListBlobsOptions, ListContainersOptions, PageRange, PublicAccessType, RequestConditions,
};

/// Resolves option values for one call from exchange headers over the
/// endpoint configuration.
#[derive(Debug, Clone)]
pub struct ConfigurationProxy {
    config: Arc<BlobConfiguration>,
}

/// Header value if present and non-empty, converted to `T`.
///
/// A value of the wrong type is a configuration error naming the header.
fn header<T: FromHeaderValue>(headers: &Headers, key: &str) -> Result<Option<T>> {
    match headers.get_non_empty(key) {
        None => Ok(None),
        Some(value) => T::from_header_value(value).map(Some).ok_or_else(|| {
            BlobError::config(format!(
                "header {key} holds an incompatible {} value",
                value.kind()
            ))
        }),
    }
}

fn non_blank(value: &Option<String>) -> Option<String> {
    value.clone().filter(|v| !v.trim().is_empty())
}

impl ConfigurationProxy {
    pub fn new(config: Arc<BlobConfiguration>) -> Self {
        Self { config }
    }

    /// The static configuration this proxy falls back to.
    pub fn configuration(&self) -> &BlobConfiguration {
        &self.config
    }

    // ── Addressing ──────────────────────────────────────────────────

    pub fn blob_name(&self, headers: &Headers) -> Result<Option<String>> {
        Ok(header(headers, BLOB_NAME)?.or_else(|| non_blank(&self.config.blob_name)))
    }

    pub fn container_name(&self, headers: &Headers) -> Result<Option<String>> {
        Ok(header(headers, BLOB_CONTAINER_NAME)?
            .or_else(|| non_blank(&self.config.container_name)))
    }

    /// The operation to run.  An operation name that is not one of
    /// [`BlobOperation::ALL`] is an unsupported operation.
    pub fn operation(&self, headers: &Headers) -> Result<BlobOperation> {
        match headers.get_non_empty(OPERATION) {
            None => Ok(self.config.operation),
            Some(HeaderValue::Operation(op)) => Ok(*op),
            Some(HeaderValue::String(name)) => {
                name.parse()
                    .map_err(|_| BlobError::UnsupportedOperation {
                        operation: name.trim().to_string(),
                    })
            }
            Some(other) => Err(BlobError::config(format!(
                "header {OPERATION} holds an incompatible {} value",
                other.kind()
            ))),
        }
    }

    pub fn blob_type(&self, headers: &Headers) -> Result<BlobType> {
        Ok(header(headers, BLOB_TYPE)?.unwrap_or(self.config.blob_type))
    }

    // ── Call behaviour ──────────────────────────────────────────────

    pub fn timeout(&self, headers: &Headers) -> Result<Option<Duration>> {
        Ok(header(headers, TIMEOUT)?.or(self.config.timeout))
    }

    pub fn metadata(&self, headers: &Headers) -> Result<Option<BTreeMap<String, String>>> {
        header(headers, METADATA)
    }

    pub fn public_access_type(&self, headers: &Headers) -> Result<Option<PublicAccessType>> {
        header(headers, PUBLIC_ACCESS_TYPE)
    }

    /// Request conditions; a resolved lease id fills in a missing one.
    pub fn request_conditions(&self, headers: &Headers) -> Result<RequestConditions> {
        let mut conditions: RequestConditions =
            header(headers, BLOB_REQUEST_CONDITION)?.unwrap_or_default();
        if conditions.lease_id.is_none() {
            conditions.lease_id = self.lease_id(headers)?;
        }
        Ok(conditions)
    }

    pub fn http_headers(&self, headers: &Headers) -> Result<Option<BlobHttpHeaders>> {
        header(headers, BLOB_HTTP_HEADERS)
    }

    pub fn access_tier(&self, headers: &Headers) -> Result<Option<AccessTier>> {
        Ok(header(headers, ACCESS_TIER)?.or(self.config.access_tier))
    }

    /// Base64 MD5 of the transmitted content.
    pub fn content_md5(&self, headers: &Headers) -> Result<Option<String>> {
        header(headers, CONTENT_MD5)
    }

    pub fn lease_id(&self, headers: &Headers) -> Result<Option<String>> {
        Ok(header(headers, LEASE_ID)?.or_else(|| non_blank(&self.config.lease_id)))
    }

    // ── Listing ─────────────────────────────────────────────────────

    pub fn max_results_per_page(&self, headers: &Headers) -> Result<Option<u32>> {
        Ok(header(headers, MAX_RESULTS_PER_PAGE)?.or(self.config.max_results_per_page))
    }

    pub fn regex(&self, headers: &Headers) -> Result<Option<String>> {
        Ok(header(headers, REGEX)?.or_else(|| non_blank(&self.config.regex)))
    }

    /// Name prefix filter.  Undefined whenever [`regex`](Self::regex)
    /// resolves to a non-empty value.
    pub fn prefix(&self, headers: &Headers) -> Result<Option<String>> {
        if self.regex(headers)?.is_some() {
            return Ok(None);
        }
        Ok(header(headers, PREFIX)?.or_else(|| non_blank(&self.config.prefix)))
    }

    /// Blob listing options: a whole-object override, or built from the
    /// resolved prefix and page size.  The prefix is cleared while a regex
    /// is in effect either way.
    pub fn list_blobs_options(&self, headers: &Headers) -> Result<ListBlobsOptions> {
        match header::<ListBlobsOptions>(headers, LIST_BLOBS_OPTIONS)? {
            Some(mut options) => {
                if self.regex(headers)?.is_some() {
                    options.prefix = None;
                }
                Ok(options)
            }
            None => Ok(ListBlobsOptions {
                prefix: self.prefix(headers)?,
                max_results_per_page: self.max_results_per_page(headers)?,
                ..Default::default()
            }),
        }
    }

    pub fn list_containers_options(&self, headers: &Headers) -> Result<ListContainersOptions> {
        match header(headers, LIST_BLOB_CONTAINERS_OPTIONS)? {
            Some(options) => Ok(options),
            None => Ok(ListContainersOptions {
                max_results_per_page: self.max_results_per_page(headers)?,
                ..Default::default()
            }),
        }
    }

    // ── Ranges ──────────────────────────────────────────────────────

    /// The page range override; an end before its start is a
    /// configuration error.
    pub fn page_range(&self, headers: &Headers) -> Result<Option<PageRange>> {
        header::<PageRange>(headers, PAGE_BLOB_RANGE)?
            .map(PageRange::validate)
            .transpose()
    }

    pub fn blob_offset(&self, headers: &Headers) -> Result<u64> {
        Ok(header(headers, BLOB_OFFSET)?.unwrap_or(self.config.blob_offset))
    }

    pub fn data_count(&self, headers: &Headers) -> Result<Option<u64>> {
        Ok(header(headers, DATA_COUNT)?.or(self.config.data_count))
    }

    /// The byte range a read covers.
    ///
    /// For page blobs with a page range `(start, end)` this is
    /// `(start, end - start)`; otherwise the static `(blob_offset,
    /// data_count)`.
    pub fn blob_range(&self, headers: &Headers) -> Result<BlobRange> {
        if self.blob_type(headers)? == BlobType::PageBlob {
            if let Some(range) = self.page_range(headers)? {
                return Ok(BlobRange::new(range.start, Some(range.len())));
            }
        }
        Ok(BlobRange::new(self.config.blob_offset, self.config.data_count))
    }

    // ── Blob type specifics ─────────────────────────────────────────

    pub fn commit_block_list_later(&self, headers: &Headers) -> Result<bool> {
        Ok(header(headers, COMMIT_BLOCK_LIST_LATER)?.unwrap_or(self.config.commit_block_list_later))
    }

    pub fn create_append_blob(&self, headers: &Headers) -> Result<bool> {
        Ok(header(headers, CREATE_APPEND_BLOB)?.unwrap_or(self.config.create_append_blob))
    }

    pub fn create_page_blob(&self, headers: &Headers) -> Result<bool> {
        Ok(header(headers, CREATE_PAGE_BLOB)?.unwrap_or(self.config.create_page_blob))
    }

    pub fn block_list_type(&self, headers: &Headers) -> Result<BlockListType> {
        Ok(header(headers, BLOCK_LIST_TYPE)?.unwrap_or(self.config.block_list_type))
    }

    pub fn page_blob_size(&self, headers: &Headers) -> Result<u64> {
        Ok(header(headers, PAGE_BLOB_SIZE)?.unwrap_or(self.config.page_blob_size))
    }

    pub fn blob_sequence_number(&self, headers: &Headers) -> Result<i64> {
        Ok(header(headers, BLOB_SEQUENCE_NUMBER)?.unwrap_or(self.config.blob_sequence_number))
    }

    pub fn delete_snapshots_option(
        &self,
        headers: &Headers,
    ) -> Result<Option<DeleteSnapshotsOption>> {
        Ok(header(headers, DELETE_SNAPSHOT_OPTION_TYPE)?.or(self.config.delete_snapshots_option))
    }

    // ── Files, links and copies ─────────────────────────────────────

    pub fn file_dir(&self, headers: &Headers) -> Result<Option<PathBuf>> {
        Ok(header::<String>(headers, FILE_DIR)?
            .map(PathBuf::from)
            .or_else(|| self.config.file_dir.clone()))
    }

    pub fn download_link_expiration(&self, headers: &Headers) -> Result<Option<Duration>> {
        Ok(header(headers, DOWNLOAD_LINK_EXPIRATION)?.or(self.config.download_link_expiration))
    }

    pub fn source_blob_account_name(&self, headers: &Headers) -> Result<Option<String>> {
        Ok(header(headers, SOURCE_BLOB_ACCOUNT_NAME)?
            .or_else(|| non_blank(&self.config.source_blob_account_name)))
    }

    pub fn source_blob_container_name(&self, headers: &Headers) -> Result<Option<String>> {
        Ok(header(headers, SOURCE_BLOB_CONTAINER_NAME)?
            .or_else(|| non_blank(&self.config.source_blob_container_name)))
    }

    /// Materialize every option for one call.
    pub fn resolve(&self, headers: &Headers) -> Result<ResolvedOptions> {
        Ok(ResolvedOptions {
            operation: self.operation(headers)?,
            container_name: self.container_name(headers)?,
            blob_name: self.blob_name(headers)?,
            blob_type: self.blob_type(headers)?,
            timeout: self.timeout(headers)?,
            metadata: self.metadata(headers)?,
            public_access_type: self.public_access_type(headers)?,
            request_conditions: self.request_conditions(headers)?,
            http_headers: self.http_headers(headers)?,
            access_tier: self.access_tier(headers)?,
            content_md5: self.content_md5(headers)?,
            lease_id: self.lease_id(headers)?,
            regex: self.regex(headers)?,
            prefix: self.prefix(headers)?,
            max_results_per_page: self.max_results_per_page(headers)?,
            list_blobs_options: self.list_blobs_options(headers)?,
            list_containers_options: self.list_containers_options(headers)?,
            page_range: self.page_range(headers)?,
            blob_offset: self.blob_offset(headers)?,
            data_count: self.data_count(headers)?,
            blob_range: self.blob_range(headers)?,
            commit_block_list_later: self.commit_block_list_later(headers)?,
            create_append_blob: self.create_append_blob(headers)?,
            create_page_blob: self.create_page_blob(headers)?,
            block_list_type: self.block_list_type(headers)?,
            page_blob_size: self.page_blob_size(headers)?,
            blob_sequence_number: self.blob_sequence_number(headers)?,
            delete_snapshots_option: self.delete_snapshots_option(headers)?,
            file_dir: self.file_dir(headers)?,
            download_link_expiration: self.download_link_expiration(headers)?,
            source_blob_account_name: self.source_blob_account_name(headers)?,
            source_blob_container_name: self.source_blob_container_name(headers)?,
        })
    }
}

/// Every option of one call, resolved once.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedOptions {
    pub operation: BlobOperation,
    pub container_name: Option<String>,
    pub blob_name: Option<String>,
    pub blob_type: BlobType,
    pub timeout: Option<Duration>,
    pub metadata: Option<BTreeMap<String, String>>,
    pub public_access_type: Option<PublicAccessType>,
    pub request_conditions: RequestConditions,
    pub http_headers: Option<BlobHttpHeaders>,
    pub access_tier: Option<AccessTier>,
    pub content_md5: Option<String>,
    pub lease_id: Option<String>,
    pub regex: Option<String>,
    pub prefix: Option<String>,
    pub max_results_per_page: Option<u32>,
    pub list_blobs_options: ListBlobsOptions,
    pub list_containers_options: ListContainersOptions,
    pub page_range: Option<PageRange>,
    pub blob_offset: u64,
    pub data_count: Option<u64>,
    pub blob_range: BlobRange,
    pub commit_block_list_later: bool,
    pub create_append_blob: bool,
    pub create_page_blob: bool,
    pub block_list_type: BlockListType,
    pub page_blob_size: u64,
    pub blob_sequence_number: i64,
    pub delete_snapshots_option: Option<DeleteSnapshotsOption>,
    pub file_dir: Option<PathBuf>,
    pub download_link_expiration: Option<Duration>,
    pub source_blob_account_name: Option<String>,
    pub source_blob_container_name: Option<String>,
}

impl ResolvedOptions {
    /// Container name, required by every container or blob operation.
    pub fn require_container(&self) -> Result<&str> {
        self.container_name
            .as_deref()
            .ok_or_else(|| BlobError::config("container name is required"))
    }

    /// Blob name, required by every blob operation.
    pub fn require_blob(&self) -> Result<&str> {
        self.blob_name
            .as_deref()
            .ok_or_else(|| BlobError::config("blob name is required"))
    }

    pub fn require_page_range(&self) -> Result<PageRange> {
        self.page_range
            .ok_or_else(|| {
                BlobError::config(format!("a page range ({PAGE_BLOB_RANGE}) is required"))
            })?
            .validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn proxy(config: BlobConfiguration) -> ConfigurationProxy {
        ConfigurationProxy::new(Arc::new(config))
    }

    #[test]
    fn test_override_wins() {
        let p = proxy(BlobConfiguration {
            blob_name: Some("static.txt".to_string()),
            ..Default::default()
        });
        let headers = Headers::new().with(BLOB_NAME, "override.txt");
        assert_eq!(
            p.blob_name(&headers).unwrap().as_deref(),
            Some("override.txt")
        );
    }

    #[test]
    fn test_static_fallback() {
        let p = proxy(BlobConfiguration {
            blob_name: Some("static.txt".to_string()),
            ..Default::default()
        });
        let headers = Headers::new();
        assert_eq!(p.blob_name(&headers).unwrap().as_deref(), Some("static.txt"));
        assert_eq!(p.container_name(&headers).unwrap(), None);
    }

    #[test]
    fn test_blank_override_falls_back() {
        let p = proxy(BlobConfiguration {
            container_name: Some("box".to_string()),
            ..Default::default()
        });
        let headers = Headers::new()
            .with(BLOB_CONTAINER_NAME, "  ")
            .with(METADATA, BTreeMap::<String, String>::new());
        assert_eq!(p.container_name(&headers).unwrap().as_deref(), Some("box"));
        assert_eq!(p.metadata(&headers).unwrap(), None);
    }

    #[test]
    fn test_false_override_wins_over_static_true() {
        let p = proxy(BlobConfiguration::default());
        let headers = Headers::new()
            .with(COMMIT_BLOCK_LIST_LATER, false)
            .with(CREATE_PAGE_BLOB, "false");
        assert!(!p.commit_block_list_later(&headers).unwrap());
        assert!(!p.create_page_blob(&headers).unwrap());
        assert!(p.create_append_blob(&headers).unwrap());
    }

    #[test]
    fn test_zero_override_wins() {
        let p = proxy(BlobConfiguration {
            blob_sequence_number: 9,
            ..Default::default()
        });
        let headers = Headers::new().with(BLOB_SEQUENCE_NUMBER, 0i64);
        assert_eq!(p.blob_sequence_number(&headers).unwrap(), 0);
    }

    #[test]
    fn test_null_override_falls_back() {
        let p = proxy(BlobConfiguration {
            page_blob_size: 1024,
            ..Default::default()
        });
        let headers = Headers::new().with(PAGE_BLOB_SIZE, HeaderValue::Null);
        assert_eq!(p.page_blob_size(&headers).unwrap(), 1024);
    }

    #[test]
    fn test_incompatible_override_is_configuration_error() {
        let p = proxy(BlobConfiguration::default());
        let headers = Headers::new().with(PAGE_BLOB_SIZE, "abc");
        let err = p.page_blob_size(&headers).unwrap_err();
        assert!(matches!(err, BlobError::Configuration { .. }));
        assert!(err.to_string().contains(PAGE_BLOB_SIZE));
    }

    #[test]
    fn test_regex_suppresses_prefix() {
        let p = proxy(BlobConfiguration {
            prefix: Some("static/".to_string()),
            ..Default::default()
        });
        let headers = Headers::new()
            .with(REGEX, ".*\\.csv")
            .with(PREFIX, "logs/");
        assert_eq!(p.prefix(&headers).unwrap(), None);
        assert_eq!(p.regex(&headers).unwrap().as_deref(), Some(".*\\.csv"));
        assert_eq!(p.list_blobs_options(&headers).unwrap().prefix, None);
    }

    #[test]
    fn test_static_regex_suppresses_static_prefix() {
        let p = proxy(BlobConfiguration {
            prefix: Some("static/".to_string()),
            regex: Some("a.*".to_string()),
            ..Default::default()
        });
        assert_eq!(p.prefix(&Headers::new()).unwrap(), None);
    }

    #[test]
    fn test_prefix_without_regex() {
        let p = proxy(BlobConfiguration {
            prefix: Some("static/".to_string()),
            regex: Some(String::new()),
            max_results_per_page: Some(10),
            ..Default::default()
        });
        let options = p.list_blobs_options(&Headers::new()).unwrap();
        assert_eq!(options.prefix.as_deref(), Some("static/"));
        assert_eq!(options.max_results_per_page, Some(10));
    }

    #[test]
    fn test_list_options_override_loses_prefix_under_regex() {
        let p = proxy(BlobConfiguration::default());
        let options = ListBlobsOptions {
            prefix: Some("logs/".to_string()),
            max_results_per_page: Some(5),
            ..Default::default()
        };
        let headers = Headers::new()
            .with(LIST_BLOBS_OPTIONS, options)
            .with(REGEX, "x+");
        let resolved = p.list_blobs_options(&headers).unwrap();
        assert_eq!(resolved.prefix, None);
        assert_eq!(resolved.max_results_per_page, Some(5));
    }

    #[test]
    fn test_page_range_derives_blob_range() {
        let p = proxy(BlobConfiguration::default());
        let headers = Headers::new()
            .with(BLOB_TYPE, BlobType::PageBlob)
            .with(PAGE_BLOB_RANGE, PageRange::new(100, 612));
        assert_eq!(
            p.blob_range(&headers).unwrap(),
            BlobRange::new(100, Some(512))
        );
    }

    #[test]
    fn test_inverted_page_range_is_configuration_error() {
        let p = proxy(BlobConfiguration::default());
        let headers = Headers::new()
            .with(BLOB_TYPE, BlobType::PageBlob)
            .with(PAGE_BLOB_RANGE, PageRange::new(612, 100));
        assert!(matches!(
            p.page_range(&headers).unwrap_err(),
            BlobError::Configuration { .. }
        ));
        assert!(matches!(
            p.blob_range(&headers).unwrap_err(),
            BlobError::Configuration { .. }
        ));
        assert!(p.resolve(&headers).is_err());

        let resolved = ResolvedOptions {
            page_range: Some(PageRange::new(612, 100)),
            ..p.resolve(&Headers::new()).unwrap()
        };
        assert!(resolved.require_page_range().is_err());
    }

    #[test]
    fn test_blob_range_static_fallback() {
        let p = proxy(BlobConfiguration {
            blob_offset: 0,
            data_count: Some(1024),
            ..Default::default()
        });
        assert_eq!(
            p.blob_range(&Headers::new()).unwrap(),
            BlobRange::new(0, Some(1024))
        );
    }

    #[test]
    fn test_page_range_ignored_for_block_blobs() {
        let p = proxy(BlobConfiguration {
            blob_offset: 7,
            ..Default::default()
        });
        let headers = Headers::new().with(PAGE_BLOB_RANGE, PageRange::new(100, 612));
        assert_eq!(p.blob_range(&headers).unwrap(), BlobRange::new(7, None));
    }

    #[test]
    fn test_operation_resolution() {
        let p = proxy(BlobConfiguration {
            operation: BlobOperation::GetBlob,
            ..Default::default()
        });
        assert_eq!(p.operation(&Headers::new()).unwrap(), BlobOperation::GetBlob);
        let headers = Headers::new().with(OPERATION, "deleteBlob");
        assert_eq!(p.operation(&headers).unwrap(), BlobOperation::DeleteBlob);
        let headers = Headers::new().with(OPERATION, BlobOperation::CopyBlob);
        assert_eq!(p.operation(&headers).unwrap(), BlobOperation::CopyBlob);
    }

    #[test]
    fn test_unknown_operation_is_unsupported() {
        let p = proxy(BlobConfiguration::default());
        let headers = Headers::new().with(OPERATION, "renameBlob");
        match p.operation(&headers).unwrap_err() {
            BlobError::UnsupportedOperation { operation } => assert_eq!(operation, "renameBlob"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_default_operation() {
        let p = proxy(BlobConfiguration::default());
        assert_eq!(
            p.operation(&Headers::new()).unwrap(),
            BlobOperation::ListBlobContainers
        );
    }

    #[test]
    fn test_lease_id_fills_request_conditions() {
        let p = proxy(BlobConfiguration {
            lease_id: Some("lease-1".to_string()),
            ..Default::default()
        });
        let conditions = p.request_conditions(&Headers::new()).unwrap();
        assert_eq!(conditions.lease_id.as_deref(), Some("lease-1"));

        let explicit = RequestConditions {
            if_match: Some("\"e\"".to_string()),
            lease_id: Some("lease-2".to_string()),
            ..Default::default()
        };
        let headers = Headers::new().with(BLOB_REQUEST_CONDITION, explicit.clone());
        assert_eq!(p.request_conditions(&headers).unwrap(), explicit);
    }

    #[test]
    fn test_durations_from_milliseconds() {
        let p = proxy(BlobConfiguration {
            timeout: Some(Duration::from_secs(30)),
            ..Default::default()
        });
        assert_eq!(
            p.timeout(&Headers::new()).unwrap(),
            Some(Duration::from_secs(30))
        );
        let headers = Headers::new().with(TIMEOUT, 1500i64);
        assert_eq!(
            p.timeout(&headers).unwrap(),
            Some(Duration::from_millis(1500))
        );
    }

    #[test]
    fn test_resolution_does_not_mutate_sources() {
        let config = BlobConfiguration {
            blob_name: Some("static.txt".to_string()),
            ..Default::default()
        };
        let p = proxy(config.clone());
        let headers = Headers::new().with(BLOB_NAME, "override.txt");
        let before = headers.clone();
        let resolved = p.resolve(&headers).unwrap();
        assert_eq!(resolved.blob_name.as_deref(), Some("override.txt"));
        assert_eq!(headers, before);
        assert_eq!(p.configuration(), &config);
        assert_eq!(
            p.resolve(&Headers::new()).unwrap().blob_name.as_deref(),
            Some("static.txt")
        );
    }

    #[test]
    fn test_resolve_propagates_errors() {
        let p = proxy(BlobConfiguration::default());
        let headers = Headers::new().with(OPERATION, "fly");
        assert!(matches!(
            p.resolve(&headers).unwrap_err(),
            BlobError::UnsupportedOperation { .. }
        ));
    }

    #[test]
    fn test_require_helpers() {
        let p = proxy(BlobConfiguration::default());
        let resolved = p.resolve(&Headers::new()).unwrap();
        assert!(matches!(
            resolved.require_container().unwrap_err(),
            BlobError::Configuration { .. }
        ));
        assert!(resolved.require_blob().is_err());
        assert!(resolved.require_page_range().is_err());
    }
}
