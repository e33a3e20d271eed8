//! Upload of the local asset directory to the input container.

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::config::AssetConversionSettings;
use crate::error::UploadError;
use crate::storage::{blob_path, BlobStore};

/// What an upload wrote.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadSummary {
    pub files: usize,
    pub bytes: u64,
    /// Blob names in upload order
    pub blobs: Vec<String>,
}

/// Every regular file under `root`, in walk order (sorted by name per directory).
///
/// Symlinks are followed, so a linked file is uploaded under the link's name.
pub fn collect_files(root: &Path) -> Result<Vec<PathBuf>, UploadError> {
    let mut files = Vec::new();
    for entry in WalkDir::new(root).follow_links(true).sort_by_file_name() {
        let entry = entry.map_err(|e| UploadError::Walk {
            path: root.to_path_buf(),
            message: e.to_string(),
        })?;
        if entry.file_type().is_file() {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

/// Copy the configured local asset directory into the input container.
///
/// Files are written one at a time. The first failed write stops the upload;
/// blobs written before it are left in place.
pub async fn upload_asset_directory(
    store: &dyn BlobStore,
    settings: &AssetConversionSettings,
) -> Result<UploadSummary, UploadError> {
    let root = settings
        .local_asset_directory_path
        .as_deref()
        .ok_or_else(|| UploadError::MissingDirectory(PathBuf::new()))?;

    if !root.is_dir() {
        return Err(UploadError::MissingDirectory(root.to_path_buf()));
    }

    let files = collect_files(root)?;
    if files.is_empty() {
        return Err(UploadError::EmptyDirectory(root.to_path_buf()));
    }

    let input_asset = settings
        .local_input_asset()
        .unwrap_or_else(|| root.to_path_buf());
    if settings.input_asset_path.is_empty() || !files.contains(&input_asset) {
        return Err(UploadError::MissingInputAsset(input_asset));
    }

    tracing::info!(
        files = files.len(),
        container = %settings.input_container,
        "Uploading {:?}",
        root
    );

    let mut summary = UploadSummary::default();
    for file in files {
        let relative = file.strip_prefix(root).unwrap_or(&file);
        let blob = blob_path(&settings.input_folder_path, relative);

        tracing::info!(blob = %blob, "Uploading {:?}", relative);

        let bytes = store
            .put_file(&settings.input_container, &blob, &file)
            .await
            .map_err(|source| UploadError::Storage {
                path: file.clone(),
                source,
            })?;

        summary.files += 1;
        summary.bytes += bytes;
        summary.blobs.push(blob);
    }

    tracing::info!(
        files = summary.files,
        bytes = summary.bytes,
        "Upload complete"
    );

    Ok(summary)
}
