//! blobgate: Azure Blob Storage operations driven by per-call options.
//!
//! An endpoint is configured once ([`config::BlobConfiguration`], from YAML
//! or an `azure-storage-blob://` URI).  Each call carries an
//! [`exchange::Exchange`] whose headers may override any option for that
//! call alone; [`proxy::ConfigurationProxy`] resolves the effective value,
//! [`producer::BlobProducer`] runs the selected operation, and
//! [`envelope`] maps the result back onto the exchange.

pub mod config;
pub mod constants;
pub mod consumer;
pub mod endpoint;
pub mod envelope;
pub mod errors;
pub mod exchange;
pub mod metrics;
pub mod operations;
pub mod options;
pub mod producer;
pub mod proxy;
pub mod storage;
pub mod xml;

pub use endpoint::{BlobComponent, BlobEndpoint};
pub use errors::{BlobError, Result};
pub use exchange::{Body, Exchange, HeaderValue, Headers};
