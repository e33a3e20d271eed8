//! Container shared access signatures handed to the conversion service.

use azure_storage::shared_access_signature::service_sas::BlobSasPermissions;
use time::{Duration, OffsetDateTime};

use super::AzureBlobStore;
use crate::config::AssetConversionSettings;
use crate::error::StorageError;

/// How long generated container signatures stay valid
pub const SAS_LIFETIME: Duration = Duration::hours(24);

/// Container SAS tokens handed to the conversion service.
#[derive(Clone, PartialEq, Eq)]
pub struct ContainerSas {
    /// Read and list access to the input container
    pub read_list: String,
    /// Write access to the output container
    pub write: String,
}

impl std::fmt::Debug for ContainerSas {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContainerSas").finish_non_exhaustive()
    }
}

impl ContainerSas {
    /// Use the pre-issued tokens from `settings` when both are present,
    /// otherwise sign fresh ones with the storage account key.
    pub async fn for_settings(
        settings: &AssetConversionSettings,
        now: OffsetDateTime,
    ) -> Result<Self, StorageError> {
        if let (Some(read_list), Some(write)) = (
            non_empty(&settings.input_container_sas),
            non_empty(&settings.output_container_sas),
        ) {
            tracing::debug!("Using pre-issued container SAS tokens");
            return Ok(Self {
                read_list: read_list.to_string(),
                write: write.to_string(),
            });
        }

        let store = AzureBlobStore::new(settings)?;
        let expiry = now + SAS_LIFETIME;

        tracing::info!(%expiry, "Generating container SAS tokens");

        Ok(Self {
            read_list: store
                .container_sas(&settings.input_container, read_list_permissions(), expiry)
                .await?,
            write: store
                .container_sas(&settings.output_container, write_permissions(), expiry)
                .await?,
        })
    }
}

fn read_list_permissions() -> BlobSasPermissions {
    BlobSasPermissions {
        read: true,
        list: true,
        ..Default::default()
    }
}

fn write_permissions() -> BlobSasPermissions {
    BlobSasPermissions {
        write: true,
        ..Default::default()
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn settings() -> AssetConversionSettings {
        AssetConversionSettings {
            storage_account_name: "assets".into(),
            storage_account_key: Some("c2VjcmV0LWtleQ==".into()),
            input_container: "input".into(),
            output_container: "output".into(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn generated_tokens_carry_container_permissions() {
        let now = datetime!(2026-10-19 08:30 UTC);
        let sas = ContainerSas::for_settings(&settings(), now).await.unwrap();

        assert!(sas.read_list.contains("sp=rl"));
        assert!(sas.write.contains("sp=w"));
        assert!(!sas.write.contains("sp=rl"));
        for token in [&sas.read_list, &sas.write] {
            assert!(token.contains("sr=c"));
            assert!(token.contains("se=2026-10-20T08"));
            assert!(token.contains("sig="));
        }
    }

    #[tokio::test]
    async fn pre_issued_tokens_win() {
        let mut settings = settings();
        settings.storage_account_key = None;
        settings.input_container_sas = Some("sv=read".into());
        settings.output_container_sas = Some("sv=write".into());
        let sas = ContainerSas::for_settings(&settings, OffsetDateTime::now_utc())
            .await
            .unwrap();
        assert_eq!(sas.read_list, "sv=read");
        assert_eq!(sas.write, "sv=write");
    }

    #[tokio::test]
    async fn no_key_and_no_tokens_is_an_error() {
        let mut settings = settings();
        settings.storage_account_key = None;
        settings.input_container_sas = Some("sv=read".into());
        let err = ContainerSas::for_settings(&settings, OffsetDateTime::now_utc())
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Credentials(_)));
    }

    #[test]
    fn debug_hides_tokens() {
        let sas = ContainerSas {
            read_list: "sig=secret".into(),
            write: "sig=secret".into(),
        };
        assert!(!format!("{:?}", sas).contains("secret"));
    }
}
