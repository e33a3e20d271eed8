mod types;

pub use types::*;

use anyhow::{Context, Result};
use std::path::Path;

const DEFAULT_STS_DOMAIN: &str = "mixedreality.azure.com";

/// Load configuration from a TOML file, or from JSON when the path ends in `.json`
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

    let config: Config = if is_json {
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path))?
    } else {
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path))?
    };

    Ok(config)
}

/// Load config from default locations or return default config
pub fn load_config_or_default(custom_path: Option<&Path>) -> Result<Config> {
    if let Some(path) = custom_path {
        return load_config(path);
    }

    let default_paths = [
        "./arrconfig.toml",
        "./arrconfig.json",
        "~/.config/arrconvert/config.toml",
    ];

    for path_str in default_paths {
        let path = shellexpand::tilde(path_str);
        let path = Path::new(path.as_ref());
        if path.exists() {
            tracing::debug!("Using config file {:?}", path);
            return load_config(path);
        }
    }

    Ok(Config::default())
}

/// Build the configuration used for the rest of the run: file values,
/// then command-line overrides, then derived defaults, validated for `stages`.
pub fn resolve(
    custom_path: Option<&Path>,
    overrides: &ConfigOverrides,
    stages: &[Stage],
) -> Result<Config> {
    let mut config = load_config_or_default(custom_path)?;
    overrides.apply(&mut config);
    fill_derived(&mut config);
    validate_config(&config, stages)?;
    Ok(config)
}

/// Fill in endpoints and names that can be inferred from other settings.
pub fn fill_derived(config: &mut Config) {
    let account = &mut config.account;

    if account.service_endpoint.is_empty() && !account.region.is_empty() {
        account.service_endpoint = format!(
            "https://remoterendering.{}.mixedreality.azure.com",
            account.region
        );
    }
    if account.authentication_endpoint.is_empty() {
        let domain = if account.account_domain.is_empty() {
            DEFAULT_STS_DOMAIN
        } else {
            account.account_domain.as_str()
        };
        account.authentication_endpoint = format!("https://sts.{}", domain);
    }
    account.service_endpoint = account.service_endpoint.trim_end_matches('/').to_string();
    account.authentication_endpoint = account
        .authentication_endpoint
        .trim_end_matches('/')
        .to_string();

    let conversion = &mut config.conversion;
    // Blob paths always use forward slashes
    conversion.input_folder_path = conversion.input_folder_path.replace('\\', "/");
    conversion.input_asset_path = conversion.input_asset_path.replace('\\', "/");
    conversion.output_folder_path = conversion.output_folder_path.replace('\\', "/");
    if conversion.output_asset_file_name.is_empty() {
        if let Some(name) = conversion.default_output_name() {
            conversion.output_asset_file_name = name;
        }
    }
}

/// Validate that everything `stages` will need is present
pub fn validate_config(config: &Config, stages: &[Stage]) -> Result<()> {
    let account = &config.account;
    let conversion = &config.conversion;

    let needs_service = stages
        .iter()
        .any(|s| matches!(s, Stage::Submit { .. } | Stage::Query));

    if needs_service {
        require(&account.account_id, "account_id")?;
        require(&account.account_key, "account_key")?;
        require(&account.service_endpoint, "service_endpoint (or region)")?;
        require(&account.authentication_endpoint, "authentication_endpoint")?;
    }

    for stage in stages {
        match *stage {
            Stage::Upload => {
                require(&conversion.storage_account_name, "storage_account_name")?;
                require(&conversion.input_container, "input_container")?;
                require(&conversion.input_asset_path, "input_asset_path")?;
                if conversion.local_asset_directory_path.is_none() {
                    anyhow::bail!("Missing required setting: local_asset_directory_path");
                }
                if is_blank(&conversion.storage_account_key) {
                    anyhow::bail!("Missing required setting: storage_account_key (needed to upload)");
                }
            }
            Stage::Submit { use_container_sas } => {
                require(&conversion.storage_account_name, "storage_account_name")?;
                require(&conversion.input_container, "input_container")?;
                require(&conversion.output_container, "output_container")?;
                require(&conversion.input_asset_path, "input_asset_path")?;
                require(&conversion.output_asset_file_name, "output_asset_file_name")?;

                if !has_asset_extension(&conversion.output_asset_file_name) {
                    anyhow::bail!(
                        "output_asset_file_name '{}' must end with {}",
                        conversion.output_asset_file_name,
                        ASSET_EXTENSION
                    );
                }

                let pre_issued =
                    !is_blank(&conversion.input_container_sas) && !is_blank(&conversion.output_container_sas);
                if use_container_sas && !pre_issued && is_blank(&conversion.storage_account_key) {
                    anyhow::bail!(
                        "Container SAS requested but neither pre-issued SAS tokens nor storage_account_key are configured"
                    );
                }
            }
            Stage::Query => {}
        }
    }

    Ok(())
}

fn require(value: &str, name: &str) -> Result<()> {
    if value.trim().is_empty() {
        anyhow::bail!("Missing required setting: {}", name);
    }
    Ok(())
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().map_or(true, |v| v.trim().is_empty())
}

fn has_asset_extension(name: &str) -> bool {
    name.len() > ASSET_EXTENSION.len()
        && name
            .get(name.len() - ASSET_EXTENSION.len()..)
            .is_some_and(|ext| ext.eq_ignore_ascii_case(ASSET_EXTENSION))
}
