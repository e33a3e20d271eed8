use arrconvert::config::{ConfigOverrides, Stage};
use arrconvert::conversion::DEFAULT_POLL_INTERVAL;
use arrconvert::pipeline::SubmitOptions;
use clap::{Args, Parser, Subcommand};
use serde_json::{Map, Value};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "arrconvert")]
#[command(
    author,
    version,
    about = "Upload 3D assets and convert them with the remote rendering service"
)]
pub struct Cli {
    /// Path to config file (TOML, or JSON when ending in .json)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Seconds to wait between status queries
    #[arg(long, global = true, default_value_t = DEFAULT_POLL_INTERVAL.as_secs())]
    pub poll_interval_secs: u64,

    /// Stop polling after this many status queries (default: poll until finished)
    #[arg(long, global = true, value_parser = clap::value_parser!(u32).range(1..))]
    pub max_poll_attempts: Option<u32>,

    #[command(flatten)]
    pub settings: SettingsArgs,

    /// Defaults to `run` when omitted
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Upload the asset directory, submit a conversion and wait for it
    Run(ConvertArgs),

    /// Upload the local asset directory to the input container
    Upload,

    /// Submit a conversion for an already uploaded asset
    Convert(ConvertArgs),

    /// Query the status of a conversion once and print the response
    Status {
        /// Conversion id returned at submission
        conversion_id: String,
    },

    /// Wait for an existing conversion to finish
    Poll {
        /// Conversion id returned at submission
        conversion_id: String,
    },

    /// Validate the merged configuration
    Validate {
        /// Also check what container SAS submission needs
        #[arg(long)]
        use_container_sas: bool,
    },

    /// Display version information
    Version,
}

#[derive(Args, Clone, Default)]
pub struct ConvertArgs {
    /// Pass container SAS tokens instead of relying on a linked storage account
    #[arg(long)]
    pub use_container_sas: bool,

    /// JSON object merged into the top level of the conversion request
    #[arg(long, value_parser = parse_json_object)]
    pub additional_params: Option<Map<String, Value>>,

    /// Return after submission without waiting for the result
    #[arg(long)]
    pub no_poll: bool,
}

impl ConvertArgs {
    pub fn submit_options(&self) -> SubmitOptions {
        SubmitOptions {
            use_container_sas: self.use_container_sas,
            additional_params: self.additional_params.clone().unwrap_or_default(),
        }
    }
}

/// Overrides for individual config file settings
#[derive(Args, Clone, Default)]
pub struct SettingsArgs {
    /// Remote rendering account id
    #[arg(long, global = true)]
    pub account_id: Option<String>,

    /// Remote rendering account key
    #[arg(long, global = true, env = "ARR_ACCOUNT_KEY", hide_env_values = true)]
    pub account_key: Option<String>,

    /// Remote rendering account domain
    #[arg(long, global = true)]
    pub account_domain: Option<String>,

    /// Service region, used to derive the service endpoint
    #[arg(long, global = true)]
    pub region: Option<String>,

    #[arg(long, global = true)]
    pub authentication_endpoint: Option<String>,

    #[arg(long, global = true)]
    pub service_endpoint: Option<String>,

    #[arg(long, global = true)]
    pub storage_account_name: Option<String>,

    /// Storage account key (base64)
    #[arg(long, global = true, env = "AZURE_STORAGE_ACCOUNT_KEY", hide_env_values = true)]
    pub storage_account_key: Option<String>,

    /// Blob service endpoint
    #[arg(long, global = true)]
    pub blob_endpoint: Option<String>,

    #[arg(long, global = true)]
    pub input_container: Option<String>,

    #[arg(long, global = true)]
    pub input_folder_path: Option<String>,

    /// Asset to convert, relative to the local directory and input folder
    #[arg(long, global = true)]
    pub input_asset_path: Option<String>,

    #[arg(long, global = true)]
    pub output_container: Option<String>,

    #[arg(long, global = true)]
    pub output_folder_path: Option<String>,

    /// Converted file name, must end in .arrAsset
    #[arg(long, global = true)]
    pub output_asset_file_name: Option<String>,

    /// Local directory uploaded to the input container
    #[arg(long, global = true)]
    pub local_asset_directory_path: Option<PathBuf>,
}

impl From<SettingsArgs> for ConfigOverrides {
    fn from(args: SettingsArgs) -> Self {
        Self {
            account_id: args.account_id,
            account_key: args.account_key,
            account_domain: args.account_domain,
            region: args.region,
            authentication_endpoint: args.authentication_endpoint,
            service_endpoint: args.service_endpoint,
            storage_account_name: args.storage_account_name,
            storage_account_key: args.storage_account_key,
            blob_endpoint: args.blob_endpoint,
            input_container: args.input_container,
            input_folder_path: args.input_folder_path,
            input_asset_path: args.input_asset_path,
            output_container: args.output_container,
            output_folder_path: args.output_folder_path,
            output_asset_file_name: args.output_asset_file_name,
            local_asset_directory_path: args.local_asset_directory_path,
        }
    }
}

impl Commands {
    /// Stages the configuration must support before anything runs.
    pub fn stages(&self) -> Vec<Stage> {
        match self {
            Commands::Run(args) => vec![
                Stage::Upload,
                Stage::Submit {
                    use_container_sas: args.use_container_sas,
                },
                Stage::Query,
            ],
            Commands::Upload => vec![Stage::Upload],
            Commands::Convert(args) => vec![
                Stage::Submit {
                    use_container_sas: args.use_container_sas,
                },
                Stage::Query,
            ],
            Commands::Status { .. } | Commands::Poll { .. } => vec![Stage::Query],
            Commands::Validate { use_container_sas } => vec![
                Stage::Upload,
                Stage::Submit {
                    use_container_sas: *use_container_sas,
                },
                Stage::Query,
            ],
            Commands::Version => Vec::new(),
        }
    }

    pub fn needs_store(&self) -> bool {
        matches!(self, Commands::Run(_) | Commands::Upload)
    }
}

fn parse_json_object(s: &str) -> Result<Map<String, Value>, String> {
    match serde_json::from_str::<Value>(s) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err("expected a JSON object".to_string()),
        Err(e) => Err(format!("invalid JSON: {}", e)),
    }
}
