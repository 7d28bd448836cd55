//! blobgate -- run one blob operation against a configured endpoint.
//!
//! The endpoint comes from a YAML file, an `azure-storage-blob://` URI, or
//! both (URI options win).  `--header` entries become per-call overrides.
//! The resulting envelope is printed as JSON.

use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use serde_json::json;
use tracing::info;

use blobgate::config::{load_config, Config, LoggingConfig};
use blobgate::constants::{HEADER_PREFIX, METADATA, OPERATION, PAGE_BLOB_RANGE};
use blobgate::options::PageRange;
use blobgate::{BlobComponent, Body, Exchange, HeaderValue, Headers};

/// Command-line arguments for blobgate.
#[derive(Parser, Debug)]
#[command(
    name = "blobgate",
    version,
    about = "Run Azure Blob Storage operations with per-call option overrides"
)]
struct Cli {
    /// Path to the YAML configuration file.
    #[arg(short, long)]
    config: Option<String>,

    /// Endpoint URI, e.g. azure-storage-blob://account/container?operation=listBlobs
    #[arg(short, long)]
    uri: Option<String>,

    /// Per-call override as KEY=VALUE. The AzureStorageBlob prefix is optional.
    #[arg(short = 'H', long = "header", value_name = "KEY=VALUE")]
    headers: Vec<String>,

    /// File whose contents become the message body.
    #[arg(short, long)]
    body_file: Option<PathBuf>,

    /// Operation to run for this call.
    #[arg(short, long)]
    operation: Option<String>,

    /// Run one consumer poll instead of a producer call.
    #[arg(long)]
    poll: bool,

    /// Print Prometheus metrics after the call.
    #[arg(long)]
    metrics: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path).with_context(|| format!("loading {path}"))?,
        None => Config::default(),
    };
    init_logging(&config.logging);
    if let Some(path) = &cli.config {
        info!("Loaded configuration from {}", path);
    }

    if config.observability.metrics || cli.metrics {
        blobgate::metrics::init_metrics()?;
        blobgate::metrics::describe_metrics();
    }

    let component = BlobComponent::from_config(&config);
    let endpoint = match &cli.uri {
        Some(uri) => component.create_endpoint(uri)?,
        None => component.create_default_endpoint()?,
    };

    let output = if cli.poll {
        let exchanges = endpoint.consumer().poll().await?;
        let items: Vec<_> = exchanges
            .iter()
            .map(|e| json!({ "body": e.body, "headers": e.headers }))
            .collect();
        serde_json::to_string_pretty(&items)?
    } else {
        let mut headers = Headers::new();
        for entry in &cli.headers {
            let (key, value) = parse_header(entry)?;
            headers.insert(key, value);
        }
        if let Some(operation) = &cli.operation {
            headers.insert(OPERATION, operation.as_str());
        }
        let body = match &cli.body_file {
            Some(path) => Body::from(
                std::fs::read(path).with_context(|| format!("reading {}", path.display()))?,
            ),
            None => Body::Empty,
        };

        let mut exchange = Exchange::new(headers, body);
        endpoint.producer().process(&mut exchange).await?;
        serde_json::to_string_pretty(&json!({
            "body": exchange.body,
            "headers": exchange.headers,
        }))?
    };
    println!("{output}");

    if cli.metrics {
        if let Some(text) = blobgate::metrics::render() {
            println!("{text}");
        }
    }
    Ok(())
}

/// Initialize tracing from the logging config; `RUST_LOG` takes precedence.
fn init_logging(logging: &LoggingConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&logging.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if logging.format == "json" {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Parse a `KEY=VALUE` override.
///
/// Page ranges are written `start-end` and metadata `k:v,k:v`; every other
/// value is passed as a string and converted when the option is resolved.
fn parse_header(entry: &str) -> anyhow::Result<(String, HeaderValue)> {
    let (key, value) = entry
        .split_once('=')
        .with_context(|| format!("header '{entry}' must be KEY=VALUE"))?;
    let key = if key.starts_with(HEADER_PREFIX) {
        key.to_string()
    } else {
        format!("{HEADER_PREFIX}{key}")
    };
    let value = if key == PAGE_BLOB_RANGE {
        let (start, end) = value
            .split_once('-')
            .with_context(|| format!("page range '{value}' must be start-end"))?;
        HeaderValue::from(PageRange::new(start.trim().parse()?, end.trim().parse()?))
    } else if key == METADATA {
        let mut metadata = BTreeMap::new();
        for pair in value.split(',').filter(|p| !p.is_empty()) {
            let (k, v) = pair
                .split_once(':')
                .with_context(|| format!("metadata entry '{pair}' must be key:value"))?;
            metadata.insert(k.trim().to_string(), v.trim().to_string());
        }
        HeaderValue::from(metadata)
    } else {
        HeaderValue::from(value)
    };
    Ok((key, value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_header_adds_prefix() {
        let (key, value) = parse_header("BlobName=a.txt").unwrap();
        assert_eq!(key, "AzureStorageBlobBlobName");
        assert_eq!(value, HeaderValue::from("a.txt"));
        let (key, _) = parse_header("AzureStorageBlobBlobName=a=b").unwrap();
        assert_eq!(key, "AzureStorageBlobBlobName");
    }

    #[test]
    fn test_parse_structured_headers() {
        let (_, value) = parse_header("PageBlobRange=0-512").unwrap();
        assert_eq!(value, HeaderValue::PageRange(PageRange::new(0, 512)));
        let (_, value) = parse_header("Metadata=owner:ops,env:dev").unwrap();
        match value {
            HeaderValue::Map(map) => assert_eq!(map.get("env").map(String::as_str), Some("dev")),
            other => panic!("unexpected value: {other:?}"),
        }
        assert!(parse_header("no-equals").is_err());
    }
}
