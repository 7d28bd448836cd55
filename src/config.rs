//! Configuration loading and types for blobgate.
//!
//! Configuration is read from a YAML file and deserialized into the
//! [`Config`] struct, or built from an endpoint URI of the form
//!
//! ```text
//! azure-storage-blob://<account>[/<container>]?blobName=a.txt&operation=getBlob
//! ```
//!
//! [`BlobConfiguration`] is the static option bag of one endpoint.  It is
//! never mutated once an endpoint is built; per-call variation goes through
//! exchange headers and the [`ConfigurationProxy`](crate::proxy::ConfigurationProxy).

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Deserializer};
use url::Url;

use crate::errors::{BlobError, Result};
use crate::operations::BlobOperation;
use crate::options::{string_enum, AccessTier, BlobType, BlockListType, DeleteSnapshotsOption};

/// URI scheme of blob endpoints.
pub const URI_SCHEME: &str = "azure-storage-blob";

string_enum! {
    /// How the REST client authenticates.
    CredentialType {
        SharedAccountKey => "sharedAccountKey",
        AzureSas => "azureSas",
        ConnectionString => "connectionString",
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    /// Static options of the endpoint.
    #[serde(default)]
    pub endpoint: BlobConfiguration,

    /// Storage client selection.
    #[serde(default)]
    pub client: ClientConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Observability settings.
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

/// Static options of one blob endpoint.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BlobConfiguration {
    /// Storage account name.
    #[serde(default)]
    pub account_name: Option<String>,

    #[serde(default)]
    pub container_name: Option<String>,

    #[serde(default)]
    pub blob_name: Option<String>,

    /// Operation executed when the exchange does not name one.
    #[serde(default)]
    pub operation: BlobOperation,

    #[serde(default)]
    pub blob_type: BlobType,

    /// Start of the byte range read by `getBlob`.
    #[serde(default)]
    pub blob_offset: u64,

    /// Length of the byte range read by `getBlob`; `None` reads to the end.
    #[serde(default)]
    pub data_count: Option<u64>,

    /// Directory `downloadBlobToFile` writes into.
    #[serde(default)]
    pub file_dir: Option<PathBuf>,

    #[serde(default)]
    pub max_results_per_page: Option<u32>,

    #[serde(default)]
    pub prefix: Option<String>,

    /// Full-match filter on blob names.  Takes precedence over `prefix`.
    #[serde(default)]
    pub regex: Option<String>,

    /// Per-call service timeout, in milliseconds in YAML and URIs.
    #[serde(default, deserialize_with = "duration_ms")]
    pub timeout: Option<Duration>,

    /// When false, `stageBlockBlobList` commits the staged blocks at once.
    #[serde(default = "default_true")]
    pub commit_block_list_later: bool,

    /// Create the append blob on `commitAppendBlob` when it does not exist.
    #[serde(default = "default_true")]
    pub create_append_blob: bool,

    /// Create the page blob on `uploadPageBlob` when it does not exist.
    #[serde(default = "default_true")]
    pub create_page_blob: bool,

    #[serde(default)]
    pub block_list_type: BlockListType,

    #[serde(default = "default_page_blob_size")]
    pub page_blob_size: u64,

    #[serde(default)]
    pub blob_sequence_number: i64,

    #[serde(default)]
    pub delete_snapshots_option: Option<DeleteSnapshotsOption>,

    /// Lifetime of `downloadLink` URLs, in milliseconds in YAML and URIs.
    #[serde(default, deserialize_with = "duration_ms")]
    pub download_link_expiration: Option<Duration>,

    #[serde(default)]
    pub source_blob_account_name: Option<String>,

    #[serde(default)]
    pub source_blob_container_name: Option<String>,

    #[serde(default)]
    pub lease_id: Option<String>,

    #[serde(default)]
    pub access_tier: Option<AccessTier>,

    // -- Credentials --
    #[serde(default)]
    pub credential_type: Option<CredentialType>,

    /// Base64 storage account key.
    #[serde(default)]
    pub access_key: Option<String>,

    #[serde(default)]
    pub sas_token: Option<String>,

    #[serde(default)]
    pub connection_string: Option<String>,

    /// Blob service base URL, e.g. an emulator.  Defaults to
    /// `https://<account>.blob.core.windows.net`.
    #[serde(default)]
    pub service_endpoint: Option<String>,

    /// Interval the host should wait between consumer polls.
    #[serde(default, deserialize_with = "duration_ms")]
    pub poll_interval: Option<Duration>,
}

impl Default for BlobConfiguration {
    fn default() -> Self {
        Self {
            account_name: None,
            container_name: None,
            blob_name: None,
            operation: BlobOperation::default(),
            blob_type: BlobType::default(),
            blob_offset: 0,
            data_count: None,
            file_dir: None,
            max_results_per_page: None,
            prefix: None,
            regex: None,
            timeout: None,
            commit_block_list_later: true,
            create_append_blob: true,
            create_page_blob: true,
            block_list_type: BlockListType::default(),
            page_blob_size: default_page_blob_size(),
            blob_sequence_number: 0,
            delete_snapshots_option: None,
            download_link_expiration: None,
            source_blob_account_name: None,
            source_blob_container_name: None,
            lease_id: None,
            access_tier: None,
            credential_type: None,
            access_key: None,
            sas_token: None,
            connection_string: None,
            service_endpoint: None,
            poll_interval: None,
        }
    }
}

impl BlobConfiguration {
    /// Build a configuration from defaults overlaid with `uri`.
    pub fn from_uri(uri: &str) -> Result<Self> {
        let mut config = Self::default();
        config.apply_uri(uri)?;
        Ok(config)
    }

    /// Overlay the account, container, and query options of `uri`.
    pub fn apply_uri(&mut self, uri: &str) -> Result<()> {
        let url = Url::parse(uri)
            .map_err(|e| BlobError::config(format!("invalid endpoint URI '{uri}': {e}")))?;
        if url.scheme() != URI_SCHEME {
            return Err(BlobError::config(format!(
                "endpoint URI must use the {URI_SCHEME}:// scheme, got '{}'",
                url.scheme()
            )));
        }

        if let Some(host) = url.host_str().filter(|h| !h.is_empty()) {
            self.account_name = Some(host.to_string());
        }

        let path = percent_encoding::percent_decode_str(url.path().trim_matches('/'))
            .decode_utf8()
            .map_err(|e| BlobError::config(format!("invalid container in '{uri}': {e}")))?;
        if path.contains('/') {
            return Err(BlobError::config(format!(
                "endpoint URI path must be a single container name, got '{path}'"
            )));
        }
        if !path.is_empty() {
            self.container_name = Some(path.into_owned());
        }

        for (name, value) in url.query_pairs() {
            self.set_option(&name, &value)?;
        }
        Ok(())
    }

    /// Set one option by its camelCase URI name.
    pub fn set_option(&mut self, name: &str, value: &str) -> Result<()> {
        match name {
            "accountName" => self.account_name = Some(value.to_string()),
            "containerName" => self.container_name = Some(value.to_string()),
            "blobName" => self.blob_name = Some(value.to_string()),
            "operation" => self.operation = value.parse()?,
            "blobType" => self.blob_type = value.parse()?,
            "blobOffset" => self.blob_offset = parse_number(name, value)?,
            "dataCount" => self.data_count = Some(parse_number(name, value)?),
            "fileDir" => self.file_dir = Some(PathBuf::from(value)),
            "maxResultsPerPage" => self.max_results_per_page = Some(parse_number(name, value)?),
            "prefix" => self.prefix = Some(value.to_string()),
            "regex" => self.regex = Some(value.to_string()),
            "timeout" => self.timeout = Some(Duration::from_millis(parse_number(name, value)?)),
            "commitBlockListLater" => self.commit_block_list_later = parse_bool(name, value)?,
            "createAppendBlob" => self.create_append_blob = parse_bool(name, value)?,
            "createPageBlob" => self.create_page_blob = parse_bool(name, value)?,
            "blockListType" => self.block_list_type = value.parse()?,
            "pageBlobSize" => self.page_blob_size = parse_number(name, value)?,
            "blobSequenceNumber" => self.blob_sequence_number = parse_number(name, value)?,
            "deleteSnapshotsOption" => self.delete_snapshots_option = Some(value.parse()?),
            "downloadLinkExpiration" => {
                self.download_link_expiration =
                    Some(Duration::from_millis(parse_number(name, value)?))
            }
            "sourceBlobAccountName" => self.source_blob_account_name = Some(value.to_string()),
            "sourceBlobContainerName" => self.source_blob_container_name = Some(value.to_string()),
            "leaseId" => self.lease_id = Some(value.to_string()),
            "accessTier" => self.access_tier = Some(value.parse()?),
            "credentialType" => self.credential_type = Some(value.parse()?),
            "accessKey" => self.access_key = Some(value.to_string()),
            "sasToken" => self.sas_token = Some(value.to_string()),
            "connectionString" => self.connection_string = Some(value.to_string()),
            "serviceEndpoint" => self.service_endpoint = Some(value.to_string()),
            "pollInterval" => {
                self.poll_interval = Some(Duration::from_millis(parse_number(name, value)?))
            }
            _ => {
                return Err(BlobError::config(format!(
                    "unknown endpoint option '{name}'"
                )))
            }
        }
        Ok(())
    }

    /// Options as `(name, value)` pairs for logging, with secrets masked.
    pub fn describe(&self) -> BTreeMap<&'static str, String> {
        let mut out = BTreeMap::new();
        let mut put = |name: &'static str, value: Option<String>| {
            if let Some(v) = value {
                out.insert(name, v);
            }
        };
        put("accountName", self.account_name.clone());
        put("containerName", self.container_name.clone());
        put("blobName", self.blob_name.clone());
        put("operation", Some(self.operation.to_string()));
        put("blobType", Some(self.blob_type.to_string()));
        put("serviceEndpoint", self.service_endpoint.clone());
        put(
            "credentialType",
            self.credential_type.map(|c| c.to_string()),
        );
        put("accessKey", self.access_key.as_ref().map(|_| "***".to_string()));
        put("sasToken", self.sas_token.as_ref().map(|_| "***".to_string()));
        put(
            "connectionString",
            self.connection_string.as_ref().map(|_| "***".to_string()),
        );
        out
    }
}

fn parse_number<T: std::str::FromStr>(name: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| BlobError::config(format!("option '{name}' expects a number, got '{value}'")))
}

fn parse_bool(name: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(BlobError::config(format!(
            "option '{name}' expects true or false, got '{value}'"
        ))),
    }
}

/// Storage client selection.
#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
    /// Client type: `azure` or `memory`.
    #[serde(default = "default_client_backend")]
    pub backend: String,

    /// Memory client configuration.
    #[serde(default)]
    pub memory: Option<MemoryClientConfig>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            backend: default_client_backend(),
            memory: None,
        }
    }
}

/// Memory client configuration.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct MemoryClientConfig {
    /// Maximum total size in bytes (0 = unlimited).
    #[serde(default)]
    pub max_size_bytes: u64,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: text or json.
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

/// Observability settings.
#[derive(Debug, Clone, Deserialize)]
pub struct ObservabilityConfig {
    /// Record per-operation metrics.
    #[serde(default = "default_true")]
    pub metrics: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self { metrics: true }
    }
}

// -- Defaults ----------------------------------------------------------------

fn default_true() -> bool {
    true
}

fn default_page_blob_size() -> u64 {
    512
}

fn default_client_backend() -> String {
    "azure".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

fn duration_ms<'de, D>(deserializer: D) -> std::result::Result<Option<Duration>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<u64>::deserialize(deserializer)?.map(Duration::from_millis))
}

// -- Loader ------------------------------------------------------------------

/// Load and parse configuration from a YAML file at `path`.
pub fn load_config<P: AsRef<Path>>(path: P) -> anyhow::Result<Config> {
    let contents = std::fs::read_to_string(path.as_ref())?;
    let config: Config = serde_yaml::from_str(&contents)?;
    Ok(config)
}
