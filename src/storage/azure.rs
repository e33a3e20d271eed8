use std::path::Path;

use async_trait::async_trait;
use azure_core::RetryOptions;
use azure_storage::prelude::*;
use azure_storage::shared_access_signature::service_sas::BlobSasPermissions;
use azure_storage::shared_access_signature::SasToken;
use azure_storage::CloudLocation;
use azure_storage_blobs::prelude::*;
use time::OffsetDateTime;
use tokio::io::AsyncReadExt;

use super::BlobStore;
use crate::config::AssetConversionSettings;
use crate::error::StorageError;

/// Files larger than this are written as a list of blocks of this size
pub const BLOCK_SIZE: usize = 4 * 1024 * 1024; // 4 MB

/// Blob store backed by the Azure storage SDK, authenticated with the
/// storage account key.
pub struct AzureBlobStore {
    service: BlobServiceClient,
    endpoint: String,
    account_name: String,
}

impl std::fmt::Debug for AzureBlobStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AzureBlobStore")
            .field("endpoint", &self.endpoint)
            .field("account_name", &self.account_name)
            .finish()
    }
}

impl AzureBlobStore {
    /// Client for the account in `settings`, using `blob_endpoint` when set
    /// and the public cloud endpoint otherwise.
    pub fn new(settings: &AssetConversionSettings) -> Result<Self, StorageError> {
        let key = settings
            .storage_account_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .ok_or_else(|| StorageError::Credentials("storage account key is not set".into()))?;

        let account_name = settings.storage_account_name.clone();
        let credentials = StorageCredentials::access_key(account_name.clone(), key.to_string());

        let builder = match settings.blob_endpoint.as_deref().filter(|e| !e.is_empty()) {
            Some(endpoint) => {
                tracing::debug!("Using custom blob endpoint: {}", endpoint);
                let location = CloudLocation::Custom {
                    account: account_name.clone(),
                    uri: endpoint.trim_end_matches('/').to_string(),
                };
                ClientBuilder::with_location(location, credentials)
            }
            None => ClientBuilder::new(account_name.clone(), credentials),
        };

        // No client-side retries: the first failed write ends the upload.
        let service = builder.retry(RetryOptions::none()).blob_service_client();

        Ok(Self {
            service,
            endpoint: settings.blob_endpoint(),
            account_name,
        })
    }

    /// Container-scoped SAS token, without a leading `?`.
    pub async fn container_sas(
        &self,
        container: &str,
        permissions: BlobSasPermissions,
        expiry: OffsetDateTime,
    ) -> Result<String, StorageError> {
        let sas = self
            .service
            .container_client(container)
            .shared_access_signature(permissions, expiry)
            .await
            .map_err(|e| StorageError::from_azure(container, e))?;
        sas.token()
            .map_err(|e| StorageError::from_azure(container, e))
    }
}

fn block_id(index: usize) -> String {
    azure_core::base64::encode(format!("{:08}", index).into_bytes())
}

#[async_trait]
impl BlobStore for AzureBlobStore {
    async fn put_file(
        &self,
        container: &str,
        blob_path: &str,
        source: &Path,
    ) -> Result<u64, StorageError> {
        let io = |e: std::io::Error| StorageError::Io {
            path: source.to_path_buf(),
            source: e,
        };
        let azure = |e: azure_core::Error| StorageError::from_azure(blob_path, e);

        let mut file = tokio::fs::File::open(source).await.map_err(io)?;
        let length = file.metadata().await.map_err(io)?.len();
        let blob = self.service.container_client(container).blob_client(blob_path);

        tracing::debug!(container, blob = blob_path, bytes = length, "Writing blob");

        if length <= BLOCK_SIZE as u64 {
            let mut data = Vec::with_capacity(length as usize);
            file.read_to_end(&mut data).await.map_err(io)?;
            let written = data.len() as u64;
            blob.put_block_blob(data).await.map_err(azure)?;
            return Ok(written);
        }

        let mut blocks = Vec::new();
        let mut written = 0u64;
        loop {
            let mut chunk = Vec::with_capacity(BLOCK_SIZE);
            let read = (&mut file)
                .take(BLOCK_SIZE as u64)
                .read_to_end(&mut chunk)
                .await
                .map_err(io)?;
            if read == 0 {
                break;
            }

            let id = block_id(blocks.len());
            tracing::trace!(blob = blob_path, block = blocks.len(), bytes = read, "Writing block");
            blob.put_block(id.clone(), chunk).await.map_err(azure)?;
            blocks.push(BlobBlockType::new_uncommitted(id));
            written += read as u64;
        }

        tracing::debug!(blob = blob_path, blocks = blocks.len(), "Committing block list");
        blob.put_block_list(BlockList { blocks })
            .await
            .map_err(azure)?;

        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(endpoint: Option<&str>) -> AssetConversionSettings {
        AssetConversionSettings {
            storage_account_name: "assets".into(),
            storage_account_key: Some("c2VjcmV0LWtleQ==".into()),
            blob_endpoint: endpoint.map(Into::into),
            ..Default::default()
        }
    }

    #[test]
    fn missing_key_is_rejected() {
        let mut settings = settings(None);
        settings.storage_account_key = Some("  ".into());
        assert!(matches!(
            AzureBlobStore::new(&settings),
            Err(StorageError::Credentials(_))
        ));
    }

    #[test]
    fn debug_hides_key() {
        let store = AzureBlobStore::new(&settings(None)).unwrap();
        let debug = format!("{:?}", store);
        assert!(debug.contains("https://assets.blob.core.windows.net"));
        assert!(!debug.contains("c2VjcmV0"));
    }

    #[test]
    fn block_ids_have_equal_length() {
        assert_eq!(block_id(0).len(), block_id(12345).len());
        assert_ne!(block_id(0), block_id(1));
    }

    #[tokio::test]
    async fn container_sas_is_scoped_to_container() {
        let store = AzureBlobStore::new(&settings(Some("http://127.0.0.1:10000/assets"))).unwrap();
        let permissions = BlobSasPermissions {
            read: true,
            list: true,
            ..Default::default()
        };
        let sas = store
            .container_sas("input", permissions, time::macros::datetime!(2026-10-20 12:00 UTC))
            .await
            .unwrap();

        assert!(!sas.starts_with('?'));
        assert!(sas.contains("sr=c"));
        assert!(sas.contains("sp=rl"));
        assert!(sas.contains("sig="));
    }
}
