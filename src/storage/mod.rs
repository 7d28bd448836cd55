//! Blob service clients.
//!
//! The [`backend::BlobClient`] trait abstracts over where the blob service
//! lives.  [`azure::AzureBlobClient`] talks to Azure Blob Storage over its
//! REST API; [`memory::MemoryBlobClient`] keeps everything in process for
//! tests and local runs.

pub mod azure;
pub mod backend;
pub mod memory;
