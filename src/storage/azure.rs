//! Azure Blob Storage REST client.
//!
//! Talks to the Blob service REST API with `reqwest`, one HTTP request per
//! client call (list calls follow `NextMarker` until the enumeration ends).
//! Requests are signed with Shared Key or carry a SAS token.
//!
//! Credentials are resolved, in order, from:
//!   - the endpoint's `credential_type` with its matching option
//!     (`access_key`, `sas_token`, `connection_string`), falling back to the
//!     matching environment variable;
//!   - otherwise any configured option, then the environment:
//!     `AZURE_STORAGE_KEY`, `AZURE_STORAGE_CONNECTION_STRING`,
//!     `AZURE_STORAGE_SAS_TOKEN`.

use std::collections::BTreeMap;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use reqwest::header::HeaderMap;
use reqwest::{Method, StatusCode};
use sha2::Sha256;
use tracing::{debug, info};

use super::backend::{
    AppendBlobItem, BlobClient, BlobItem, BlobProperties, BlockBlobItem, BlockList, ClientFuture,
    ContainerItem, CopyInfo, CopySource, DownloadedBlob, PageBlobItem, PageList, RawHeaders,
    WriteInfo, WriteOptions,
};
use crate::config::{BlobConfiguration, CredentialType};
use crate::errors::{BlobError, Result};
use crate::options::{
    http_date, parse_http_date, BlobBlock, BlobRange, BlockListType, DeleteSnapshotsOption,
    ListBlobsOptions, ListContainersOptions, PageRange, PublicAccessType, RequestConditions,
};
use crate::xml;

/// Azure REST API version used for all requests.
const AZURE_API_VERSION: &str = "2023-11-03";

/// Percent-encoding set for Azure blob names: encode everything except
/// unreserved characters and '/'.
const AZURE_BLOB_ENCODE_SET: percent_encoding::AsciiSet = percent_encoding::NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~')
    .remove(b'/');

/// Percent-encoding set for query parameter values.
const AZURE_QUERY_ENCODE_SET: percent_encoding::AsciiSet = percent_encoding::NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

type HmacSha256 = Hmac<Sha256>;

/// Blob client backed by the Azure Blob REST API.
pub struct AzureBlobClient {
    /// HTTP client for Azure Blob REST API calls.
    client: reqwest::Client,
    /// Azure storage account name.
    account: String,
    /// The base URL for the Azure Blob service endpoint, without trailing '/'.
    base_url: String,
    /// Authentication method.
    auth: AzureAuth,
}

/// Azure authentication method.
#[derive(Debug, Clone, PartialEq)]
enum AzureAuth {
    /// Shared Key authentication using the storage account key.
    SharedKey { key_bytes: Vec<u8> },
    /// SAS token authentication (appended as query parameter).
    SasToken { token: String },
}

/// One REST call before signing.
struct AzureRequest<'a> {
    method: Method,
    container: Option<&'a str>,
    blob: Option<&'a str>,
    query: Vec<(String, String)>,
    /// Lower-case header names.
    headers: Vec<(String, String)>,
    body: Bytes,
    timeout: Option<Duration>,
}

impl<'a> AzureRequest<'a> {
    fn new(method: Method, container: Option<&'a str>, blob: Option<&'a str>) -> Self {
        Self {
            method,
            container,
            blob,
            query: Vec::new(),
            headers: Vec::new(),
            body: Bytes::new(),
            timeout: None,
        }
    }

    fn service(method: Method) -> Self {
        Self::new(method, None, None)
    }

    fn container(method: Method, container: &'a str) -> Self {
        Self::new(method, Some(container), None).query("restype", "container")
    }

    fn blob(method: Method, container: &'a str, blob: &'a str) -> Self {
        Self::new(method, Some(container), Some(blob))
    }

    fn query(mut self, key: &str, value: impl Into<String>) -> Self {
        self.query.push((key.to_string(), value.into()));
        self
    }

    fn opt_query(self, key: &str, value: Option<impl Into<String>>) -> Self {
        match value {
            Some(v) => self.query(key, v),
            None => self,
        }
    }

    fn header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.push((name.to_ascii_lowercase(), value.into()));
        self
    }

    fn opt_header(self, name: &str, value: Option<impl Into<String>>) -> Self {
        match value {
            Some(v) => self.header(name, v),
            None => self,
        }
    }

    fn metadata(mut self, metadata: Option<&BTreeMap<String, String>>) -> Self {
        for (k, v) in metadata.into_iter().flatten() {
            self.headers
                .push((format!("x-ms-meta-{}", k.to_ascii_lowercase()), v.clone()));
        }
        self
    }

    fn conditions(self, conditions: &RequestConditions) -> Self {
        self.opt_header("if-match", conditions.if_match.clone())
            .opt_header("if-none-match", conditions.if_none_match.clone())
            .opt_header(
                "if-modified-since",
                conditions.if_modified_since.as_ref().map(http_date),
            )
            .opt_header(
                "if-unmodified-since",
                conditions.if_unmodified_since.as_ref().map(http_date),
            )
            .opt_header("x-ms-lease-id", conditions.lease_id.clone())
    }

    fn write_options(self, options: &WriteOptions) -> Self {
        let headers = options.http_headers.clone().unwrap_or_default();
        self.opt_header("x-ms-blob-content-type", headers.content_type)
            .opt_header("x-ms-blob-content-encoding", headers.content_encoding)
            .opt_header("x-ms-blob-content-language", headers.content_language)
            .opt_header("x-ms-blob-content-disposition", headers.content_disposition)
            .opt_header("x-ms-blob-cache-control", headers.cache_control)
            .opt_header("x-ms-blob-content-md5", headers.content_md5)
            .opt_header("x-ms-access-tier", options.access_tier.map(|t| t.to_string()))
            .metadata(options.metadata.as_ref())
            .conditions(&options.conditions)
    }

    fn body(mut self, body: Bytes, content_type: &str) -> Self {
        self.body = body;
        self.header("content-type", content_type)
    }

    /// Per-request timeout, also sent as the service-side `timeout` in seconds.
    fn timeout(mut self, timeout: Option<Duration>) -> Self {
        if let Some(t) = timeout {
            self.timeout = Some(t);
            self.query
                .push(("timeout".to_string(), t.as_secs().max(1).to_string()));
        }
        self
    }

    fn header_value(&self, name: &str) -> &str {
        self.headers
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
            .unwrap_or("")
    }

    /// Resource path as used in the canonicalized resource (unencoded).
    fn resource_path(&self) -> String {
        match (self.container, self.blob) {
            (Some(c), Some(b)) => format!("/{}/{}", c, b),
            (Some(c), None) => format!("/{}", c),
            _ => "/".to_string(),
        }
    }

    /// Percent-encoded URL path.
    fn url_path(&self) -> String {
        match (self.container, self.blob) {
            (Some(c), Some(b)) => format!(
                "/{}/{}",
                c,
                percent_encoding::utf8_percent_encode(b, &AZURE_BLOB_ENCODE_SET)
            ),
            (Some(c), None) => format!("/{}", c),
            _ => "/".to_string(),
        }
    }

    fn description(&self) -> String {
        let comp = self
            .query
            .iter()
            .find(|(k, _)| k == "comp")
            .map(|(_, v)| format!("?comp={v}"))
            .unwrap_or_default();
        format!("{} {}{}", self.method, self.resource_path(), comp)
    }
}

impl AzureBlobClient {
    /// Create a client for the account named in `config`.
    pub fn new(config: &BlobConfiguration) -> Result<Self> {
        let account = config
            .account_name
            .clone()
            .filter(|a| !a.is_empty())
            .ok_or_else(|| BlobError::config("account name is required"))?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(300))
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to create HTTP client: {}", e))?;

        let auth = Self::resolve_auth(config)?;
        let base_url = match &config.service_endpoint {
            Some(endpoint) if !endpoint.is_empty() => endpoint.trim_end_matches('/').to_string(),
            _ => connection_string_field(config, "BlobEndpoint")
                .map(|e| e.trim_end_matches('/').to_string())
                .unwrap_or_else(|| format!("https://{}.blob.core.windows.net", account)),
        };

        info!(
            "Azure blob client initialized: account={} endpoint={} auth={}",
            account,
            base_url,
            match auth {
                AzureAuth::SharedKey { .. } => "shared-key",
                AzureAuth::SasToken { .. } => "sas",
            }
        );

        Ok(Self {
            client,
            account,
            base_url,
            auth,
        })
    }

    /// Resolve Azure authentication from the configuration and environment.
    fn resolve_auth(config: &BlobConfiguration) -> Result<AzureAuth> {
        let from_env = |name: &str| std::env::var(name).ok().filter(|v| !v.is_empty());
        let configured = |value: &Option<String>| value.clone().filter(|v| !v.is_empty());

        match config.credential_type {
            Some(CredentialType::SharedAccountKey) => {
                let key = configured(&config.access_key)
                    .or_else(|| from_env("AZURE_STORAGE_KEY"))
                    .ok_or_else(|| BlobError::config("sharedAccountKey requires an access key"))?;
                shared_key(&key)
            }
            Some(CredentialType::AzureSas) => {
                let token = configured(&config.sas_token)
                    .or_else(|| from_env("AZURE_STORAGE_SAS_TOKEN"))
                    .ok_or_else(|| BlobError::config("azureSas requires a SAS token"))?;
                Ok(sas_token(&token))
            }
            Some(CredentialType::ConnectionString) => {
                let conn_str = configured(&config.connection_string)
                    .or_else(|| from_env("AZURE_STORAGE_CONNECTION_STRING"))
                    .ok_or_else(|| {
                        BlobError::config("connectionString requires a connection string")
                    })?;
                connection_string_auth(&conn_str)
            }
            None => {
                // 1. Explicit configuration
                if let Some(key) = configured(&config.access_key) {
                    return shared_key(&key);
                }
                if let Some(conn_str) = configured(&config.connection_string) {
                    return connection_string_auth(&conn_str);
                }
                if let Some(token) = configured(&config.sas_token) {
                    return Ok(sas_token(&token));
                }
                // 2. Environment
                if let Some(key) = from_env("AZURE_STORAGE_KEY") {
                    return shared_key(&key);
                }
                if let Some(conn_str) = from_env("AZURE_STORAGE_CONNECTION_STRING") {
                    return connection_string_auth(&conn_str);
                }
                if let Some(token) = from_env("AZURE_STORAGE_SAS_TOKEN") {
                    return Ok(sas_token(&token));
                }
                Err(BlobError::config(
                    "No Azure credentials found. Set access_key, connection_string or \
                     sas_token, or AZURE_STORAGE_KEY, AZURE_STORAGE_CONNECTION_STRING or \
                     AZURE_STORAGE_SAS_TOKEN.",
                ))
            }
        }
    }

    /// Compute the Shared Key `Authorization` header value for `req`.
    ///
    /// The string-to-sign format:
    /// ```text
    /// VERB\n
    /// Content-Encoding\n
    /// Content-Language\n
    /// Content-Length\n
    /// Content-MD5\n
    /// Content-Type\n
    /// Date\n
    /// If-Modified-Since\n
    /// If-Match\n
    /// If-None-Match\n
    /// If-Unmodified-Since\n
    /// Range\n
    /// CanonicalizedHeaders\n
    /// CanonicalizedResource
    /// ```
    fn sign_request(&self, req: &AzureRequest<'_>, date: &str) -> Result<Option<String>> {
        let key_bytes = match &self.auth {
            AzureAuth::SharedKey { key_bytes } => key_bytes,
            AzureAuth::SasToken { .. } => return Ok(None),
        };
        let string_to_sign = self.string_to_sign(req, date);
        let signature = hmac_base64(key_bytes, &string_to_sign)?;
        Ok(Some(format!("SharedKey {}:{}", self.account, signature)))
    }

    fn string_to_sign(&self, req: &AzureRequest<'_>, date: &str) -> String {
        // Content-Length: empty for 0.
        let content_length = match req.body.len() {
            0 => String::new(),
            len => len.to_string(),
        };

        // Canonicalized headers (x-ms-*, sorted).
        let mut ms_headers: Vec<(String, String)> = vec![
            ("x-ms-date".to_string(), date.to_string()),
            ("x-ms-version".to_string(), AZURE_API_VERSION.to_string()),
        ];
        for (k, v) in &req.headers {
            if k.starts_with("x-ms-") && k != "x-ms-date" && k != "x-ms-version" {
                ms_headers.push((k.clone(), v.trim().to_string()));
            }
        }
        ms_headers.sort_by(|a, b| a.0.cmp(&b.0));
        let canonicalized_headers = ms_headers
            .iter()
            .map(|(k, v)| format!("{}:{}", k, v))
            .collect::<Vec<_>>()
            .join("\n");

        // Canonicalized resource: the un-encoded path plus sorted query params.
        let mut canonicalized_resource = format!("/{}{}", self.account, req.resource_path());
        let mut params: BTreeMap<String, Vec<&str>> = BTreeMap::new();
        for (k, v) in &req.query {
            params.entry(k.to_lowercase()).or_default().push(v);
        }
        for (k, mut values) in params {
            values.sort_unstable();
            canonicalized_resource.push_str(&format!("\n{}:{}", k, values.join(",")));
        }

        format!(
            "{}\n{}\n{}\n{}\n{}\n{}\n\n{}\n{}\n{}\n{}\n{}\n{}\n{}",
            req.method,
            req.header_value("content-encoding"),
            req.header_value("content-language"),
            content_length,
            req.header_value("content-md5"),
            req.header_value("content-type"),
            req.header_value("if-modified-since"),
            req.header_value("if-match"),
            req.header_value("if-none-match"),
            req.header_value("if-unmodified-since"),
            req.header_value("range"),
            canonicalized_headers,
            canonicalized_resource
        )
    }

    /// Get the current UTC date in RFC 1123 format for Azure headers.
    fn rfc1123_date() -> String {
        use std::time::SystemTime;
        httpdate::fmt_http_date(SystemTime::now())
    }

    /// Build the full URL of `req`, including the SAS token if any.
    fn request_url(&self, req: &AzureRequest<'_>) -> String {
        let mut url = format!("{}{}", self.base_url, req.url_path());
        let mut params: Vec<String> = req
            .query
            .iter()
            .map(|(k, v)| {
                format!(
                    "{}={}",
                    k,
                    percent_encoding::utf8_percent_encode(v, &AZURE_QUERY_ENCODE_SET)
                )
            })
            .collect();
        if let AzureAuth::SasToken { token } = &self.auth {
            params.push(token.clone());
        }
        if !params.is_empty() {
            url.push('?');
            url.push_str(&params.join("&"));
        }
        url
    }

    /// Sign and send `req`, mapping non-success statuses to errors.
    async fn send(&self, req: AzureRequest<'_>) -> Result<reqwest::Response> {
        let url = self.request_url(&req);
        let date = Self::rfc1123_date();
        let authorization = self.sign_request(&req, &date)?;

        debug!("Azure request: {}", req.description());

        let mut builder = self
            .client
            .request(req.method.clone(), &url)
            .header("x-ms-date", &date)
            .header("x-ms-version", AZURE_API_VERSION);
        for (k, v) in &req.headers {
            builder = builder.header(k.as_str(), v.as_str());
        }
        if let Some(auth_header) = authorization {
            builder = builder.header("Authorization", auth_header);
        }
        if let Some(t) = req.timeout {
            builder = builder.timeout(t);
        }
        if !req.body.is_empty() || req.method == Method::PUT {
            builder = builder.body(req.body.clone());
        }

        let resp = builder.send().await.map_err(|e| {
            anyhow::anyhow!("Azure request {} failed: {}", req.description(), e)
        })?;

        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        if Self::is_not_found(status) {
            return Err(BlobError::not_found(req.resource_path()));
        }
        let error_code = resp
            .headers()
            .get("x-ms-error-code")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = resp.text().await.unwrap_or_default();
        Err(Self::map_azure_error(status, error_code, &body))
    }

    /// Check if a status code indicates "not found" (404).
    fn is_not_found(status: StatusCode) -> bool {
        status == StatusCode::NOT_FOUND
    }

    /// Map an Azure HTTP error to a vendor error.
    fn map_azure_error(status: StatusCode, error_code: Option<String>, body: &str) -> BlobError {
        let (xml_code, xml_message) = xml::parse_error(body).unwrap_or((None, None));
        BlobError::Vendor {
            status: status.as_u16(),
            code: error_code
                .or(xml_code)
                .unwrap_or_else(|| status.canonical_reason().unwrap_or("Unknown").to_string()),
            message: xml_message.unwrap_or_else(|| body.trim().to_string()),
        }
    }

    async fn text(resp: reqwest::Response) -> Result<String> {
        resp.text()
            .await
            .map_err(|e| BlobError::Internal(anyhow::anyhow!("Azure body read failed: {}", e)))
    }

    // -- Azure Blob REST API operations ----------------------------------------

    async fn azure_list_containers(
        &self,
        options: &ListContainersOptions,
        timeout: Option<Duration>,
    ) -> Result<Vec<ContainerItem>> {
        let mut all = Vec::new();
        let mut marker: Option<String> = None;
        loop {
            let req = AzureRequest::service(Method::GET)
                .query("comp", "list")
                .opt_query("prefix", options.prefix.clone())
                .opt_query(
                    "maxresults",
                    options.max_results_per_page.map(|m| m.to_string()),
                )
                .opt_query("include", options.include_metadata.then_some("metadata"))
                .opt_query("marker", marker.take())
                .timeout(timeout);
            let body = Self::text(self.send(req).await?).await?;
            let page = xml::parse_container_list(&body)?;
            all.extend(page.items);
            match page.next_marker {
                Some(next) => marker = Some(next),
                None => break,
            }
        }
        debug!("Azure list_containers: {} containers", all.len());
        Ok(all)
    }

    async fn azure_list_blobs(
        &self,
        container: &str,
        options: &ListBlobsOptions,
        timeout: Option<Duration>,
    ) -> Result<Vec<BlobItem>> {
        let mut all = Vec::new();
        let mut marker: Option<String> = None;
        loop {
            let req = AzureRequest::container(Method::GET, container)
                .query("comp", "list")
                .opt_query("prefix", options.prefix.clone())
                .opt_query(
                    "maxresults",
                    options.max_results_per_page.map(|m| m.to_string()),
                )
                .opt_query("include", options.details.include_param())
                .opt_query("marker", marker.take())
                .timeout(timeout);
            let body = Self::text(self.send(req).await?).await?;
            let page = xml::parse_blob_list(&body)?;
            all.extend(page.items);
            match page.next_marker {
                Some(next) => marker = Some(next),
                None => break,
            }
        }
        debug!("Azure list_blobs: container={} {} blobs", container, all.len());
        Ok(all)
    }

    async fn azure_download(
        &self,
        container: &str,
        blob: &str,
        range: BlobRange,
        conditions: &RequestConditions,
        timeout: Option<Duration>,
    ) -> Result<DownloadedBlob> {
        let req = AzureRequest::blob(Method::GET, container, blob)
            .opt_header("x-ms-range", range.to_header())
            .conditions(conditions)
            .timeout(timeout);
        let resp = self.send(req).await?;
        let properties = properties_from_headers(resp.headers());
        let data = resp
            .bytes()
            .await
            .map_err(|e| anyhow::anyhow!("Azure download body read failed: {}", e))?;
        debug!(
            "Azure download: {}/{} ({} bytes)",
            container,
            blob,
            data.len()
        );
        Ok(DownloadedBlob { data, properties })
    }

    async fn azure_upload_block_blob(
        &self,
        container: &str,
        blob: &str,
        data: Bytes,
        options: &WriteOptions,
        timeout: Option<Duration>,
    ) -> Result<BlockBlobItem> {
        let len = data.len();
        let req = AzureRequest::blob(Method::PUT, container, blob)
            .header("x-ms-blob-type", "BlockBlob")
            .opt_header("content-md5", options.content_md5.clone())
            .write_options(options)
            .body(data, "application/octet-stream")
            .timeout(timeout);
        let resp = self.send(req).await?;
        debug!("Azure upload: {}/{} ({} bytes)", container, blob, len);
        Ok(BlockBlobItem {
            info: write_info_from_headers(resp.headers()),
            version_id: header_string(resp.headers(), "x-ms-version-id"),
        })
    }

    async fn azure_commit_block_list(
        &self,
        container: &str,
        blob: &str,
        block_ids: &[String],
        options: &WriteOptions,
        timeout: Option<Duration>,
    ) -> Result<BlockBlobItem> {
        let body = xml::render_block_list(block_ids)?;
        let req = AzureRequest::blob(Method::PUT, container, blob)
            .query("comp", "blocklist")
            .write_options(options)
            .body(Bytes::from(body), "application/xml")
            .timeout(timeout);
        let resp = self.send(req).await?;
        debug!(
            "Azure commit_block_list: {}/{} ({} blocks)",
            container,
            blob,
            block_ids.len()
        );
        Ok(BlockBlobItem {
            info: write_info_from_headers(resp.headers()),
            version_id: header_string(resp.headers(), "x-ms-version-id"),
        })
    }

    async fn azure_append_block(
        &self,
        container: &str,
        blob: &str,
        data: Bytes,
        content_md5: Option<&str>,
        conditions: &RequestConditions,
        timeout: Option<Duration>,
    ) -> Result<AppendBlobItem> {
        let req = AzureRequest::blob(Method::PUT, container, blob)
            .query("comp", "appendblock")
            .opt_header("content-md5", content_md5)
            .conditions(conditions)
            .body(data, "application/octet-stream")
            .timeout(timeout);
        let resp = self.send(req).await?;
        Ok(append_item_from_headers(resp.headers()))
    }

    async fn azure_page_write(
        &self,
        req: AzureRequest<'_>,
        timeout: Option<Duration>,
    ) -> Result<PageBlobItem> {
        let resp = self.send(req.timeout(timeout)).await?;
        Ok(page_item_from_headers(resp.headers()))
    }

    /// Sign a read-only service SAS for one blob.
    fn service_sas(
        &self,
        key_bytes: &[u8],
        container: &str,
        blob: &str,
        expiry: &str,
    ) -> Result<String> {
        let canonical = format!("/blob/{}/{}/{}", self.account, container, blob);
        let string_to_sign = format!(
            "r\n\n{}\n{}\n\n\n\n{}\nb\n\n\n\n\n\n\n",
            expiry, canonical, AZURE_API_VERSION
        );
        let signature = hmac_base64(key_bytes, &string_to_sign)?;
        let encode = |v: &str| {
            percent_encoding::utf8_percent_encode(v, &AZURE_QUERY_ENCODE_SET).to_string()
        };
        Ok(format!(
            "sp=r&se={}&sv={}&sr=b&sig={}",
            encode(expiry),
            AZURE_API_VERSION,
            encode(&signature)
        ))
    }

    fn copy_source_url(&self, source: &CopySource) -> String {
        let base = if source.account == self.account {
            self.base_url.clone()
        } else {
            format!("https://{}.blob.core.windows.net", source.account)
        };
        format!(
            "{}/{}/{}",
            base,
            source.container,
            percent_encoding::utf8_percent_encode(&source.blob, &AZURE_BLOB_ENCODE_SET)
        )
    }
}

// -- Credential helpers --------------------------------------------------------

fn shared_key(key: &str) -> Result<AzureAuth> {
    let key_bytes = BASE64_STANDARD
        .decode(key.trim())
        .map_err(|e| BlobError::config(format!("Invalid account key (not valid base64): {}", e)))?;
    Ok(AzureAuth::SharedKey { key_bytes })
}

fn sas_token(sas: &str) -> AzureAuth {
    let token = sas.strip_prefix('?').unwrap_or(sas).to_string();
    AzureAuth::SasToken { token }
}

/// Split a `Key=Value;Key=Value` connection string into its fields.
fn parse_connection_string(conn_str: &str) -> BTreeMap<String, String> {
    conn_str
        .split(';')
        .filter_map(|part| part.split_once('='))
        .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        .collect()
}

fn connection_string_auth(conn_str: &str) -> Result<AzureAuth> {
    let fields = parse_connection_string(conn_str);
    if let Some(key) = fields.get("AccountKey") {
        return shared_key(key);
    }
    if let Some(sas) = fields.get("SharedAccessSignature") {
        return Ok(sas_token(sas));
    }
    Err(BlobError::config(
        "connection string has neither AccountKey nor SharedAccessSignature",
    ))
}

/// A field of the configured connection string, if any.
fn connection_string_field(config: &BlobConfiguration, field: &str) -> Option<String> {
    let conn_str = config
        .connection_string
        .clone()
        .or_else(|| std::env::var("AZURE_STORAGE_CONNECTION_STRING").ok())?;
    parse_connection_string(&conn_str).remove(field)
}

fn hmac_base64(key_bytes: &[u8], string_to_sign: &str) -> Result<String> {
    let mut mac = HmacSha256::new_from_slice(key_bytes)
        .map_err(|e| anyhow::anyhow!("HMAC key error: {}", e))?;
    mac.update(string_to_sign.as_bytes());
    Ok(BASE64_STANDARD.encode(mac.finalize().into_bytes()))
}

// -- Response header parsing --------------------------------------------------

fn header_string(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

fn header_parse<T: std::str::FromStr>(headers: &HeaderMap, name: &str) -> Option<T> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse().ok())
}

fn header_date(headers: &HeaderMap, name: &str) -> Option<DateTime<Utc>> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .and_then(parse_http_date)
}

/// Total blob size from `Content-Range: bytes 0-9/1234`, else `Content-Length`.
fn blob_size(headers: &HeaderMap) -> Option<u64> {
    header_string(headers, "content-range")
        .and_then(|r| r.rsplit('/').next().and_then(|total| total.parse().ok()))
        .or_else(|| header_parse(headers, "content-length"))
}

fn metadata_from_headers(headers: &HeaderMap) -> BTreeMap<String, String> {
    headers
        .iter()
        .filter_map(|(name, value)| {
            let key = name.as_str().strip_prefix("x-ms-meta-")?;
            Some((key.to_string(), value.to_str().ok()?.to_string()))
        })
        .collect()
}

fn properties_from_headers(headers: &HeaderMap) -> BlobProperties {
    BlobProperties {
        etag: header_string(headers, "etag"),
        last_modified: header_date(headers, "last-modified"),
        creation_time: header_date(headers, "x-ms-creation-time"),
        content_type: header_string(headers, "content-type"),
        content_md5: header_string(headers, "x-ms-blob-content-md5")
            .or_else(|| header_string(headers, "content-md5")),
        content_encoding: header_string(headers, "content-encoding"),
        content_disposition: header_string(headers, "content-disposition"),
        content_language: header_string(headers, "content-language"),
        cache_control: header_string(headers, "cache-control"),
        blob_size: blob_size(headers),
        blob_type: header_parse(headers, "x-ms-blob-type"),
        blob_sequence_number: header_parse(headers, "x-ms-blob-sequence-number"),
        lease_status: header_string(headers, "x-ms-lease-status"),
        lease_state: header_string(headers, "x-ms-lease-state"),
        lease_duration: header_string(headers, "x-ms-lease-duration"),
        copy_id: header_string(headers, "x-ms-copy-id"),
        copy_status: header_string(headers, "x-ms-copy-status"),
        copy_source: header_string(headers, "x-ms-copy-source"),
        copy_progress: header_string(headers, "x-ms-copy-progress"),
        copy_completion_time: header_date(headers, "x-ms-copy-completion-time"),
        copy_status_description: header_string(headers, "x-ms-copy-status-description"),
        server_encrypted: header_parse(headers, "x-ms-server-encrypted"),
        encryption_key_sha256: header_string(headers, "x-ms-encryption-key-sha256"),
        encryption_scope: header_string(headers, "x-ms-encryption-scope"),
        access_tier: header_parse(headers, "x-ms-access-tier"),
        access_tier_inherited: header_parse(headers, "x-ms-access-tier-inferred"),
        archive_status: header_string(headers, "x-ms-archive-status"),
        access_tier_change_time: header_date(headers, "x-ms-access-tier-change-time"),
        committed_block_count: header_parse(headers, "x-ms-blob-committed-block-count"),
        metadata: Some(metadata_from_headers(headers)),
        version_id: header_string(headers, "x-ms-version-id"),
    }
}

fn write_info_from_headers(headers: &HeaderMap) -> WriteInfo {
    WriteInfo {
        etag: header_string(headers, "etag"),
        last_modified: header_date(headers, "last-modified"),
        content_md5: header_string(headers, "content-md5"),
        server_encrypted: header_parse(headers, "x-ms-request-server-encrypted"),
        encryption_key_sha256: header_string(headers, "x-ms-encryption-key-sha256"),
        encryption_scope: header_string(headers, "x-ms-encryption-scope"),
    }
}

fn append_item_from_headers(headers: &HeaderMap) -> AppendBlobItem {
    AppendBlobItem {
        info: write_info_from_headers(headers),
        append_offset: header_parse(headers, "x-ms-blob-append-offset"),
        committed_block_count: header_parse(headers, "x-ms-blob-committed-block-count"),
    }
}

fn page_item_from_headers(headers: &HeaderMap) -> PageBlobItem {
    PageBlobItem {
        info: write_info_from_headers(headers),
        blob_sequence_number: header_parse(headers, "x-ms-blob-sequence-number"),
    }
}

fn raw_headers(headers: &HeaderMap) -> RawHeaders {
    headers
        .iter()
        .filter_map(|(k, v)| Some((k.as_str().to_string(), v.to_str().ok()?.to_string())))
        .collect()
}

// -- BlobClient implementation ------------------------------------------------

impl BlobClient for AzureBlobClient {
    fn account_name(&self) -> &str {
        &self.account
    }

    fn list_containers<'a>(
        &'a self,
        options: &'a ListContainersOptions,
        timeout: Option<Duration>,
    ) -> ClientFuture<'a, Vec<ContainerItem>> {
        Box::pin(self.azure_list_containers(options, timeout))
    }

    fn create_container<'a>(
        &'a self,
        container: &'a str,
        metadata: Option<&'a BTreeMap<String, String>>,
        public_access: Option<PublicAccessType>,
        timeout: Option<Duration>,
    ) -> ClientFuture<'a, RawHeaders> {
        Box::pin(async move {
            let req = AzureRequest::container(Method::PUT, container)
                .metadata(metadata)
                .opt_header("x-ms-blob-public-access", public_access.map(|p| p.to_string()))
                .timeout(timeout);
            let resp = self.send(req).await?;
            debug!("Azure create_container: {}", container);
            Ok(raw_headers(resp.headers()))
        })
    }

    fn delete_container<'a>(
        &'a self,
        container: &'a str,
        conditions: &'a RequestConditions,
        timeout: Option<Duration>,
    ) -> ClientFuture<'a, RawHeaders> {
        Box::pin(async move {
            let req = AzureRequest::container(Method::DELETE, container)
                .conditions(conditions)
                .timeout(timeout);
            let resp = self.send(req).await?;
            debug!("Azure delete_container: {}", container);
            Ok(raw_headers(resp.headers()))
        })
    }

    fn list_blobs<'a>(
        &'a self,
        container: &'a str,
        options: &'a ListBlobsOptions,
        timeout: Option<Duration>,
    ) -> ClientFuture<'a, Vec<BlobItem>> {
        Box::pin(self.azure_list_blobs(container, options, timeout))
    }

    fn download<'a>(
        &'a self,
        container: &'a str,
        blob: &'a str,
        range: BlobRange,
        conditions: &'a RequestConditions,
        timeout: Option<Duration>,
    ) -> ClientFuture<'a, DownloadedBlob> {
        Box::pin(self.azure_download(container, blob, range, conditions, timeout))
    }

    fn get_properties<'a>(
        &'a self,
        container: &'a str,
        blob: &'a str,
        conditions: &'a RequestConditions,
        timeout: Option<Duration>,
    ) -> ClientFuture<'a, BlobProperties> {
        Box::pin(async move {
            let req = AzureRequest::blob(Method::HEAD, container, blob)
                .conditions(conditions)
                .timeout(timeout);
            let resp = self.send(req).await?;
            Ok(properties_from_headers(resp.headers()))
        })
    }

    fn delete_blob<'a>(
        &'a self,
        container: &'a str,
        blob: &'a str,
        snapshots: Option<DeleteSnapshotsOption>,
        conditions: &'a RequestConditions,
        timeout: Option<Duration>,
    ) -> ClientFuture<'a, RawHeaders> {
        Box::pin(async move {
            let req = AzureRequest::blob(Method::DELETE, container, blob)
                .opt_header("x-ms-delete-snapshots", snapshots.map(|s| s.to_string()))
                .conditions(conditions)
                .timeout(timeout);
            let resp = self.send(req).await?;
            debug!("Azure delete_blob: {}/{}", container, blob);
            Ok(raw_headers(resp.headers()))
        })
    }

    fn upload_block_blob<'a>(
        &'a self,
        container: &'a str,
        blob: &'a str,
        data: Bytes,
        options: &'a WriteOptions,
        timeout: Option<Duration>,
    ) -> ClientFuture<'a, BlockBlobItem> {
        Box::pin(self.azure_upload_block_blob(container, blob, data, options, timeout))
    }

    fn stage_block<'a>(
        &'a self,
        container: &'a str,
        blob: &'a str,
        block: &'a BlobBlock,
        lease_id: Option<&'a str>,
        timeout: Option<Duration>,
    ) -> ClientFuture<'a, ()> {
        Box::pin(async move {
            let req = AzureRequest::blob(Method::PUT, container, blob)
                .query("comp", "block")
                .query("blockid", block.id.clone())
                .opt_header("x-ms-lease-id", lease_id)
                .body(block.data.clone(), "application/octet-stream")
                .timeout(timeout);
            self.send(req).await?;
            debug!(
                "Azure stage_block: {}/{} id={} ({} bytes)",
                container,
                blob,
                block.id,
                block.data.len()
            );
            Ok(())
        })
    }

    fn commit_block_list<'a>(
        &'a self,
        container: &'a str,
        blob: &'a str,
        block_ids: &'a [String],
        options: &'a WriteOptions,
        timeout: Option<Duration>,
    ) -> ClientFuture<'a, BlockBlobItem> {
        Box::pin(self.azure_commit_block_list(container, blob, block_ids, options, timeout))
    }

    fn get_block_list<'a>(
        &'a self,
        container: &'a str,
        blob: &'a str,
        list_type: BlockListType,
        lease_id: Option<&'a str>,
        timeout: Option<Duration>,
    ) -> ClientFuture<'a, BlockList> {
        Box::pin(async move {
            let req = AzureRequest::blob(Method::GET, container, blob)
                .query("comp", "blocklist")
                .query("blocklisttype", list_type.as_str())
                .opt_header("x-ms-lease-id", lease_id)
                .timeout(timeout);
            let body = Self::text(self.send(req).await?).await?;
            xml::parse_block_list(&body)
        })
    }

    fn create_append_blob<'a>(
        &'a self,
        container: &'a str,
        blob: &'a str,
        options: &'a WriteOptions,
        timeout: Option<Duration>,
    ) -> ClientFuture<'a, AppendBlobItem> {
        Box::pin(async move {
            let req = AzureRequest::blob(Method::PUT, container, blob)
                .header("x-ms-blob-type", "AppendBlob")
                .write_options(options)
                .timeout(timeout);
            let resp = self.send(req).await?;
            debug!("Azure create_append_blob: {}/{}", container, blob);
            Ok(append_item_from_headers(resp.headers()))
        })
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
        Box::pin(self.azure_append_block(container, blob, data, content_md5, conditions, timeout))
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
        let req = AzureRequest::blob(Method::PUT, container, blob)
            .header("x-ms-blob-type", "PageBlob")
            .header("x-ms-blob-content-length", size.to_string())
            .header("x-ms-blob-sequence-number", sequence_number.to_string())
            .write_options(options);
        Box::pin(self.azure_page_write(req, timeout))
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
        let req = AzureRequest::blob(Method::PUT, container, blob)
            .query("comp", "page")
            .header("x-ms-page-write", "update")
            .header("x-ms-range", range.to_header())
            .opt_header("content-md5", content_md5)
            .conditions(conditions)
            .body(data, "application/octet-stream");
        Box::pin(self.azure_page_write(req, timeout))
    }

    fn resize_page_blob<'a>(
        &'a self,
        container: &'a str,
        blob: &'a str,
        size: u64,
        conditions: &'a RequestConditions,
        timeout: Option<Duration>,
    ) -> ClientFuture<'a, PageBlobItem> {
        let req = AzureRequest::blob(Method::PUT, container, blob)
            .query("comp", "properties")
            .header("x-ms-blob-content-length", size.to_string())
            .conditions(conditions);
        Box::pin(self.azure_page_write(req, timeout))
    }

    fn clear_pages<'a>(
        &'a self,
        container: &'a str,
        blob: &'a str,
        range: PageRange,
        conditions: &'a RequestConditions,
        timeout: Option<Duration>,
    ) -> ClientFuture<'a, PageBlobItem> {
        let req = AzureRequest::blob(Method::PUT, container, blob)
            .query("comp", "page")
            .header("x-ms-page-write", "clear")
            .header("x-ms-range", range.to_header())
            .conditions(conditions);
        Box::pin(self.azure_page_write(req, timeout))
    }

    fn get_page_ranges<'a>(
        &'a self,
        container: &'a str,
        blob: &'a str,
        range: BlobRange,
        conditions: &'a RequestConditions,
        timeout: Option<Duration>,
    ) -> ClientFuture<'a, PageList> {
        Box::pin(async move {
            let req = AzureRequest::blob(Method::GET, container, blob)
                .query("comp", "pagelist")
                .opt_header("x-ms-range", range.to_header())
                .conditions(conditions)
                .timeout(timeout);
            let body = Self::text(self.send(req).await?).await?;
            xml::parse_page_list(&body)
        })
    }

    fn copy_blob<'a>(
        &'a self,
        source: &'a CopySource,
        container: &'a str,
        blob: &'a str,
        timeout: Option<Duration>,
    ) -> ClientFuture<'a, CopyInfo> {
        Box::pin(async move {
            let source_url = self.copy_source_url(source);
            let req = AzureRequest::blob(Method::PUT, container, blob)
                .header("x-ms-copy-source", source_url.clone())
                .timeout(timeout);
            let resp = self.send(req).await?;
            let copy_id = header_string(resp.headers(), "x-ms-copy-id").ok_or_else(|| {
                anyhow::anyhow!("Azure copy response is missing x-ms-copy-id")
            })?;
            debug!("Azure copy: src={} dst={}/{}", source_url, container, blob);
            Ok(CopyInfo {
                copy_id,
                copy_status: header_string(resp.headers(), "x-ms-copy-status"),
            })
        })
    }

    fn download_url(&self, container: &str, blob: &str, expires_in: Duration) -> Result<String> {
        let expiry = Utc::now()
            + chrono::Duration::from_std(expires_in)
                .map_err(|e| BlobError::config(format!("invalid link expiration: {e}")))?;
        let expiry = expiry.format("%Y-%m-%dT%H:%M:%SZ").to_string();
        let query = match &self.auth {
            AzureAuth::SharedKey { key_bytes } => {
                self.service_sas(key_bytes, container, blob, &expiry)?
            }
            AzureAuth::SasToken { token } => token.clone(),
        };
        Ok(format!(
            "{}/{}/{}?{}",
            self.base_url,
            container,
            percent_encoding::utf8_percent_encode(blob, &AZURE_BLOB_ENCODE_SET),
            query
        ))
    }
}

// -- Tests -------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    const TEST_KEY: &str = "a2V5LWJ5dGVzLWZvci10ZXN0aW5n";

    fn test_config() -> BlobConfiguration {
        BlobConfiguration {
            account_name: Some("acct".to_string()),
            access_key: Some(TEST_KEY.to_string()),
            ..Default::default()
        }
    }

    fn test_client() -> AzureBlobClient {
        AzureBlobClient::new(&test_config()).unwrap()
    }

    #[test]
    fn test_requires_account_name() {
        let config = BlobConfiguration {
            access_key: Some(TEST_KEY.to_string()),
            ..Default::default()
        };
        let err = AzureBlobClient::new(&config).err().unwrap();
        assert!(matches!(err, BlobError::Configuration { .. }));
    }

    #[test]
    fn test_default_base_url_and_override() {
        assert_eq!(test_client().base_url, "https://acct.blob.core.windows.net");
        let config = BlobConfiguration {
            service_endpoint: Some("http://127.0.0.1:10000/devstoreaccount1/".to_string()),
            ..test_config()
        };
        let client = AzureBlobClient::new(&config).unwrap();
        assert_eq!(client.base_url, "http://127.0.0.1:10000/devstoreaccount1");
    }

    #[test]
    fn test_configured_key_is_shared_key_auth() {
        let auth = AzureBlobClient::resolve_auth(&test_config()).unwrap();
        assert!(matches!(auth, AzureAuth::SharedKey { .. }));
    }

    #[test]
    fn test_explicit_sas_credential_type() {
        let config = BlobConfiguration {
            credential_type: Some(CredentialType::AzureSas),
            sas_token: Some("?sv=2023-11-03&sig=abc".to_string()),
            ..test_config()
        };
        let auth = AzureBlobClient::resolve_auth(&config).unwrap();
        assert_eq!(
            auth,
            AzureAuth::SasToken {
                token: "sv=2023-11-03&sig=abc".to_string()
            }
        );
    }

    #[test]
    fn test_invalid_key_is_configuration_error() {
        let config = BlobConfiguration {
            access_key: Some("not base64!".to_string()),
            ..test_config()
        };
        let err = AzureBlobClient::resolve_auth(&config).unwrap_err();
        assert!(matches!(err, BlobError::Configuration { .. }));
    }

    #[test]
    fn test_connection_string_auth_and_endpoint() {
        let conn = format!(
            "DefaultEndpointsProtocol=https;AccountName=acct;AccountKey={};BlobEndpoint=https://custom.example/;",
            TEST_KEY
        );
        assert!(matches!(
            connection_string_auth(&conn).unwrap(),
            AzureAuth::SharedKey { .. }
        ));
        let config = BlobConfiguration {
            credential_type: Some(CredentialType::ConnectionString),
            connection_string: Some(conn),
            access_key: None,
            ..test_config()
        };
        let client = AzureBlobClient::new(&config).unwrap();
        assert_eq!(client.base_url, "https://custom.example");
    }

    #[test]
    fn test_sas_token_prefix_stripped() {
        let auth = sas_token("?sv=2023-11-03&ss=b&srt=sco&sig=xxx");
        assert_eq!(
            auth,
            AzureAuth::SasToken {
                token: "sv=2023-11-03&ss=b&srt=sco&sig=xxx".to_string()
            }
        );
        let auth = sas_token("sv=2023-11-03&ss=b");
        assert_eq!(
            auth,
            AzureAuth::SasToken {
                token: "sv=2023-11-03&ss=b".to_string()
            }
        );
    }

    #[test]
    fn test_is_not_found() {
        assert!(AzureBlobClient::is_not_found(StatusCode::NOT_FOUND));
        assert!(!AzureBlobClient::is_not_found(StatusCode::OK));
        assert!(!AzureBlobClient::is_not_found(StatusCode::FORBIDDEN));
    }

    #[test]
    fn test_azure_api_version() {
        assert_eq!(AZURE_API_VERSION, "2023-11-03");
    }

    #[test]
    fn test_blob_url_encoding() {
        let client = test_client();
        let req = AzureRequest::blob(Method::GET, "box", "dir/key with spaces.txt");
        let url = client.request_url(&req);
        assert_eq!(
            url,
            "https://acct.blob.core.windows.net/box/dir/key%20with%20spaces.txt"
        );
    }

    #[test]
    fn test_query_and_sas_in_url() {
        let config = BlobConfiguration {
            account_name: Some("acct".to_string()),
            sas_token: Some("sv=1&sig=x".to_string()),
            ..Default::default()
        };
        let client = AzureBlobClient::new(&config).unwrap();
        let req = AzureRequest::container(Method::GET, "box")
            .query("comp", "list")
            .query("prefix", "a b");
        assert_eq!(
            client.request_url(&req),
            "https://acct.blob.core.windows.net/box?restype=container&comp=list&prefix=a%20b&sv=1&sig=x"
        );
    }

    #[test]
    fn test_timeout_becomes_query_param() {
        let req = AzureRequest::service(Method::GET).timeout(Some(Duration::from_millis(2500)));
        assert_eq!(req.query, vec![("timeout".to_string(), "2".to_string())]);
        assert_eq!(req.timeout, Some(Duration::from_millis(2500)));
        let req = AzureRequest::service(Method::GET).timeout(Some(Duration::from_millis(10)));
        assert_eq!(req.query[0].1, "1");
    }

    #[test]
    fn test_string_to_sign_layout() {
        let client = test_client();
        let req = AzureRequest::blob(Method::PUT, "box", "a.txt")
            .query("comp", "block")
            .query("blockid", "QUFB")
            .header("x-ms-lease-id", "lease-1")
            .body(Bytes::from_static(b"hello"), "application/octet-stream");
        let date = "Tue, 24 Feb 2026 12:34:56 GMT";
        let sts = client.string_to_sign(&req, date);
        let expected = "PUT\n\n\n5\n\napplication/octet-stream\n\n\n\n\n\n\n\
x-ms-date:Tue, 24 Feb 2026 12:34:56 GMT\nx-ms-lease-id:lease-1\nx-ms-version:2023-11-03\n\
/acct/box/a.txt\nblockid:QUFB\ncomp:block";
        assert_eq!(sts, expected);
    }

    #[test]
    fn test_string_to_sign_service_level() {
        let client = test_client();
        let req = AzureRequest::service(Method::GET).query("comp", "list");
        let sts = client.string_to_sign(&req, "d");
        assert!(sts.starts_with("GET\n\n\n\n\n\n\n\n\n\n\n\n"));
        assert!(sts.ends_with("/acct/\ncomp:list"));
    }

    #[test]
    fn test_sign_request_shape() {
        let client = test_client();
        let req = AzureRequest::service(Method::GET).query("comp", "list");
        let header = client.sign_request(&req, "d").unwrap().unwrap();
        assert!(header.starts_with("SharedKey acct:"));
        let signature = header.trim_start_matches("SharedKey acct:");
        assert_eq!(BASE64_STANDARD.decode(signature).unwrap().len(), 32);
    }

    #[test]
    fn test_conditions_become_headers() {
        let dt = DateTime::parse_from_rfc3339("2026-02-24T12:34:56Z")
            .unwrap()
            .with_timezone(&Utc);
        let conditions = RequestConditions {
            if_match: Some("\"e1\"".to_string()),
            if_modified_since: Some(dt),
            lease_id: Some("l1".to_string()),
            ..Default::default()
        };
        let req = AzureRequest::blob(Method::GET, "box", "a").conditions(&conditions);
        assert_eq!(req.header_value("if-match"), "\"e1\"");
        assert_eq!(
            req.header_value("if-modified-since"),
            "Tue, 24 Feb 2026 12:34:56 GMT"
        );
        assert_eq!(req.header_value("x-ms-lease-id"), "l1");
        assert_eq!(req.header_value("if-none-match"), "");
    }

    #[test]
    fn test_properties_from_headers() {
        let mut headers = HeaderMap::new();
        headers.insert("etag", HeaderValue::from_static("\"0x8D1\""));
        headers.insert(
            "last-modified",
            HeaderValue::from_static("Tue, 24 Feb 2026 12:34:56 GMT"),
        );
        headers.insert("content-type", HeaderValue::from_static("text/plain"));
        headers.insert("content-range", HeaderValue::from_static("bytes 0-9/1234"));
        headers.insert("content-length", HeaderValue::from_static("10"));
        headers.insert("x-ms-blob-type", HeaderValue::from_static("PageBlob"));
        headers.insert("x-ms-blob-sequence-number", HeaderValue::from_static("3"));
        headers.insert("x-ms-server-encrypted", HeaderValue::from_static("true"));
        headers.insert("x-ms-meta-owner", HeaderValue::from_static("ops"));

        let props = properties_from_headers(&headers);
        assert_eq!(props.etag.as_deref(), Some("\"0x8D1\""));
        assert!(props.last_modified.is_some());
        assert_eq!(props.content_type.as_deref(), Some("text/plain"));
        assert_eq!(props.blob_size, Some(1234));
        assert_eq!(props.blob_type, Some(crate::options::BlobType::PageBlob));
        assert_eq!(props.blob_sequence_number, Some(3));
        assert_eq!(props.server_encrypted, Some(true));
        assert_eq!(
            props.metadata.unwrap().get("owner").map(String::as_str),
            Some("ops")
        );
        assert_eq!(props.copy_id, None);
    }

    #[test]
    fn test_map_azure_error_prefers_error_code_header() {
        let body = "<?xml version=\"1.0\"?><Error><Code>BodyCode</Code><Message>Nope</Message></Error>";
        let err = AzureBlobClient::map_azure_error(
            StatusCode::CONFLICT,
            Some("ContainerBeingDeleted".to_string()),
            body,
        );
        match err {
            BlobError::Vendor {
                status,
                code,
                message,
            } => {
                assert_eq!(status, 409);
                assert_eq!(code, "ContainerBeingDeleted");
                assert_eq!(message, "Nope");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_download_url_service_sas() {
        let client = test_client();
        let url = client
            .download_url("box", "a b.txt", Duration::from_secs(3600))
            .unwrap();
        assert!(url.starts_with("https://acct.blob.core.windows.net/box/a%20b.txt?sp=r&se="));
        assert!(url.contains("&sv=2023-11-03&sr=b&sig="));
    }

    #[test]
    fn test_copy_source_url() {
        let client = test_client();
        let same = CopySource {
            account: "acct".to_string(),
            container: "src".to_string(),
            blob: "a.txt".to_string(),
        };
        assert_eq!(
            client.copy_source_url(&same),
            "https://acct.blob.core.windows.net/src/a.txt"
        );
        let other = CopySource {
            account: "other".to_string(),
            ..same
        };
        assert_eq!(
            client.copy_source_url(&other),
            "https://other.blob.core.windows.net/src/a.txt"
        );
    }
}
