//! Object store access: manifest downloads and output listings

use std::fmt;
use std::path::Path;

use async_trait::async_trait;

/// Parse and render `s3://` locations
pub mod location;
/// rusoto backed implementation of [ObjectStore]
pub mod s3;

pub use location::S3Uri;

#[derive(Debug)]
pub enum StoreError {
    InvalidUri(String),
    DownloadError(String),
    ListError(String),
    WriteError(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            StoreError::InvalidUri(msg) => write!(f, "invalid object store URI {msg}"),
            StoreError::DownloadError(msg) => write!(f, "object download failed: {msg}"),
            StoreError::ListError(msg) => write!(f, "object listing failed: {msg}"),
            StoreError::WriteError(msg) => write!(f, "can't write local file: {msg}"),
        }
    }
}

impl std::error::Error for StoreError {}

/// A missing object is an expected outcome, not an error
#[derive(Debug, PartialEq, Eq)]
pub enum Download {
    Saved,
    NotFound,
}

/// One page of a prefix listing
#[derive(Debug, Default)]
pub struct ListPage {
    pub keys: Vec<String>,
    pub next: Option<String>,
}

#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Copy an object to a local file
    async fn download(&self, location: &S3Uri, dest: &Path) -> Result<Download, StoreError>;

    /// List keys under a prefix, continuing from a previous page when `continuation` is set
    async fn list_page(
        &self,
        bucket: &str,
        prefix: &str,
        continuation: Option<String>,
    ) -> Result<ListPage, StoreError>;
}
