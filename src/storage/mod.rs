//! Blob storage access.
//!
//! The upload stage writes through the [`BlobStore`] trait. [`AzureBlobStore`]
//! is backed by the Azure storage SDK; tests substitute a recording store.

mod azure;
pub mod sas;

pub use azure::{AzureBlobStore, BLOCK_SIZE};
pub use sas::ContainerSas;

use std::path::Path;

use async_trait::async_trait;

use crate::error::StorageError;

/// Destination for uploaded asset files
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Write the contents of `source` to `blob_path` in `container`,
    /// returning the number of bytes written.
    async fn put_file(
        &self,
        container: &str,
        blob_path: &str,
        source: &Path,
    ) -> Result<u64, StorageError>;
}

/// Blob name for a file at `relative` under the upload root.
///
/// Path components are joined with `/` after `prefix`, and any backslash left
/// in a component is turned into `/` as well.
pub fn blob_path(prefix: &str, relative: &Path) -> String {
    let relative = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/");
    format!("{}{}", prefix, relative).replace('\\', "/")
}
