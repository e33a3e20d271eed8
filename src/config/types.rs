use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// File extension the conversion service requires on output assets.
pub const ASSET_EXTENSION: &str = ".arrAsset";

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default, alias = "accountSettings")]
    pub account: AccountSettings,

    #[serde(default, alias = "assetConversionSettings")]
    pub conversion: AssetConversionSettings,
}

/// Remote rendering account used to authenticate against the service.
#[derive(Clone, Default, Deserialize, Serialize)]
pub struct AccountSettings {
    #[serde(default, alias = "arrAccountId")]
    pub account_id: String,

    #[serde(default, alias = "arrAccountKey")]
    pub account_key: String,

    /// Domain of the account, e.g. `westus2.mixedreality.azure.com`
    #[serde(default, alias = "arrAccountDomain")]
    pub account_domain: String,

    #[serde(default)]
    pub region: String,

    #[serde(default, alias = "authenticationEndpoint")]
    pub authentication_endpoint: String,

    #[serde(default, alias = "serviceEndpoint")]
    pub service_endpoint: String,
}

impl fmt::Debug for AccountSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccountSettings")
            .field("account_id", &self.account_id)
            .field("account_key", &mask(&self.account_key))
            .field("account_domain", &self.account_domain)
            .field("region", &self.region)
            .field("authentication_endpoint", &self.authentication_endpoint)
            .field("service_endpoint", &self.service_endpoint)
            .finish()
    }
}

/// Where the asset lives locally, where it goes in storage, and what the
/// converted output is called.
#[derive(Clone, Default, Deserialize, Serialize)]
pub struct AssetConversionSettings {
    #[serde(default, alias = "storageAccountName")]
    pub storage_account_name: String,

    /// Base64 storage account key, used for uploads and SAS generation
    #[serde(default, alias = "storageAccountKey")]
    pub storage_account_key: Option<String>,

    /// Blob service endpoint (default: `https://<account>.blob.core.windows.net`)
    #[serde(default, alias = "blobEndpoint")]
    pub blob_endpoint: Option<String>,

    #[serde(default, alias = "blobInputContainerName")]
    pub input_container: String,

    #[serde(default, alias = "inputFolderPath")]
    pub input_folder_path: String,

    /// Path of the asset to convert, relative to the input folder
    #[serde(default, alias = "inputAssetPath")]
    pub input_asset_path: String,

    #[serde(default, alias = "blobOutputContainerName")]
    pub output_container: String,

    #[serde(default, alias = "outputFolderPath")]
    pub output_folder_path: String,

    #[serde(default, alias = "outputAssetFileName")]
    pub output_asset_file_name: String,

    #[serde(default, alias = "localAssetDirectoryPath")]
    pub local_asset_directory_path: Option<PathBuf>,

    /// Pre-issued read/list SAS for the input container
    #[serde(default, alias = "inputContainerSas")]
    pub input_container_sas: Option<String>,

    /// Pre-issued write SAS for the output container
    #[serde(default, alias = "outputContainerSas")]
    pub output_container_sas: Option<String>,
}

impl AssetConversionSettings {
    /// Blob service endpoint without a trailing slash.
    pub fn blob_endpoint(&self) -> String {
        match self.blob_endpoint.as_deref() {
            Some(endpoint) if !endpoint.is_empty() => endpoint.trim_end_matches('/').to_string(),
            _ => format!("https://{}.blob.core.windows.net", self.storage_account_name),
        }
    }

    /// Local file the conversion will read once uploaded.
    pub fn local_input_asset(&self) -> Option<PathBuf> {
        self.local_asset_directory_path
            .as_ref()
            .map(|dir| dir.join(&self.input_asset_path))
    }

    /// Output file name derived from the input asset, e.g. `box.fbx` -> `box.arrAsset`.
    pub fn default_output_name(&self) -> Option<String> {
        let file_name = self.input_asset_path.rsplit(['/', '\\']).next()?;
        let stem = match file_name.rfind('.') {
            Some(0) | None => file_name,
            Some(idx) => &file_name[..idx],
        };
        if stem.is_empty() {
            return None;
        }
        Some(format!("{}{}", stem, ASSET_EXTENSION))
    }
}

impl fmt::Debug for AssetConversionSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AssetConversionSettings")
            .field("storage_account_name", &self.storage_account_name)
            .field(
                "storage_account_key",
                &self.storage_account_key.as_deref().map(mask),
            )
            .field("blob_endpoint", &self.blob_endpoint)
            .field("input_container", &self.input_container)
            .field("input_folder_path", &self.input_folder_path)
            .field("input_asset_path", &self.input_asset_path)
            .field("output_container", &self.output_container)
            .field("output_folder_path", &self.output_folder_path)
            .field("output_asset_file_name", &self.output_asset_file_name)
            .field("local_asset_directory_path", &self.local_asset_directory_path)
            .field("input_container_sas", &self.input_container_sas.as_deref().map(mask))
            .field("output_container_sas", &self.output_container_sas.as_deref().map(mask))
            .finish()
    }
}

/// Values supplied on the command line. `Some` replaces the file value.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub account_id: Option<String>,
    pub account_key: Option<String>,
    pub account_domain: Option<String>,
    pub region: Option<String>,
    pub authentication_endpoint: Option<String>,
    pub service_endpoint: Option<String>,
    pub storage_account_name: Option<String>,
    pub storage_account_key: Option<String>,
    pub blob_endpoint: Option<String>,
    pub input_container: Option<String>,
    pub input_folder_path: Option<String>,
    pub input_asset_path: Option<String>,
    pub output_container: Option<String>,
    pub output_folder_path: Option<String>,
    pub output_asset_file_name: Option<String>,
    pub local_asset_directory_path: Option<PathBuf>,
}

impl ConfigOverrides {
    pub fn apply(&self, config: &mut Config) {
        fn set(target: &mut String, value: &Option<String>) {
            if let Some(v) = value {
                *target = v.clone();
            }
        }

        let account = &mut config.account;
        set(&mut account.account_id, &self.account_id);
        set(&mut account.account_key, &self.account_key);
        set(&mut account.account_domain, &self.account_domain);
        set(&mut account.region, &self.region);
        set(&mut account.authentication_endpoint, &self.authentication_endpoint);
        set(&mut account.service_endpoint, &self.service_endpoint);

        let conversion = &mut config.conversion;
        set(&mut conversion.storage_account_name, &self.storage_account_name);
        set(&mut conversion.input_container, &self.input_container);
        set(&mut conversion.input_folder_path, &self.input_folder_path);
        set(&mut conversion.input_asset_path, &self.input_asset_path);
        set(&mut conversion.output_container, &self.output_container);
        set(&mut conversion.output_folder_path, &self.output_folder_path);
        set(&mut conversion.output_asset_file_name, &self.output_asset_file_name);

        if self.storage_account_key.is_some() {
            conversion.storage_account_key = self.storage_account_key.clone();
        }
        if self.blob_endpoint.is_some() {
            conversion.blob_endpoint = self.blob_endpoint.clone();
        }
        if self.local_asset_directory_path.is_some() {
            conversion.local_asset_directory_path = self.local_asset_directory_path.clone();
        }
    }
}

/// Pipeline stages a configuration must be complete enough for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Upload,
    Submit { use_container_sas: bool },
    /// Status query or polling of an existing conversion
    Query,
}

fn mask(secret: &str) -> &'static str {
    if secret.is_empty() {
        ""
    } else {
        "***"
    }
}
