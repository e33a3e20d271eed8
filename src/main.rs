mod cli;

use std::process::ExitCode;
use std::time::Duration;

use anyhow::Result;
use arrconvert::{
    auth::StsTokenProvider,
    config::{self, Config, ConfigOverrides},
    conversion::{ConversionClient, ConversionOutcome, PollPolicy},
    pipeline::{Pipeline, RunOptions},
    storage::AzureBlobStore,
};
use clap::Parser;
use cli::{Cli, Commands, ConvertArgs};

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "arrconvert=trace,reqwest=debug".to_string()
        } else {
            "arrconvert=info".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .with_writer(std::io::stderr)
        .init();

    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            tracing::error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode> {
    let Cli {
        config: config_path,
        verbose: _,
        poll_interval_secs,
        max_poll_attempts,
        settings,
        command,
    } = cli;

    let command = command.unwrap_or_else(|| Commands::Run(ConvertArgs::default()));
    if let Commands::Version = command {
        println!("arrconvert {}", env!("CARGO_PKG_VERSION"));
        return Ok(ExitCode::SUCCESS);
    }

    let overrides = ConfigOverrides::from(settings);
    let config = config::resolve(config_path.as_deref(), &overrides, &command.stages())?;

    if let Commands::Validate { .. } = command {
        print_config_summary(&config);
        return Ok(ExitCode::SUCCESS);
    }

    let policy = PollPolicy {
        interval: Duration::from_secs(poll_interval_secs),
        max_attempts: max_poll_attempts,
    };
    let pipeline = build_pipeline(config, policy, command.needs_store())?;

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(execute(&pipeline, command))
}

fn build_pipeline(config: Config, policy: PollPolicy, needs_store: bool) -> Result<Pipeline> {
    let http = reqwest::Client::builder().build()?;

    let store = if needs_store {
        Some(AzureBlobStore::new(&config.conversion)?)
    } else {
        None
    };

    let tokens = StsTokenProvider::new(http.clone(), &config.account);
    let conversions = ConversionClient::new(http, &config.account, Box::new(tokens));

    let mut pipeline = Pipeline::new(config, conversions).with_poll_policy(policy);
    if let Some(store) = store {
        pipeline = pipeline.with_store(Box::new(store));
    }
    Ok(pipeline)
}

async fn execute(pipeline: &Pipeline, command: Commands) -> Result<ExitCode> {
    match command {
        Commands::Run(args) => run_stages(pipeline, true, &args).await,
        Commands::Convert(args) => run_stages(pipeline, false, &args).await,
        Commands::Upload => {
            let summary = pipeline.upload().await?;
            println!("Uploaded {} files ({} bytes)", summary.files, summary.bytes);
            Ok(ExitCode::SUCCESS)
        }
        Commands::Status { conversion_id } => {
            let status = pipeline.status(&conversion_id).await?;
            println!("{}", serde_json::to_string_pretty(&status)?);
            Ok(ExitCode::SUCCESS)
        }
        Commands::Poll { conversion_id } => {
            let outcome = pipeline.poll(&conversion_id).await?;
            print_outcome(&outcome);
            Ok(exit_code(!outcome.is_success()))
        }
        Commands::Validate { .. } | Commands::Version => Ok(ExitCode::SUCCESS),
    }
}

async fn run_stages(pipeline: &Pipeline, upload: bool, args: &ConvertArgs) -> Result<ExitCode> {
    let options = RunOptions {
        upload,
        submit: args.submit_options(),
        poll: !args.no_poll,
    };
    let report = pipeline.run(&options).await?;

    if let Some(ref summary) = report.upload {
        println!("Uploaded {} files ({} bytes)", summary.files, summary.bytes);
    }
    println!("Conversion id: {}", report.conversion_id);

    match report.outcome {
        Some(ref outcome) => print_outcome(outcome),
        None => println!(
            "Not waiting for completion. Check later with: arrconvert poll {}",
            report.conversion_id
        ),
    }
    Ok(exit_code(report.is_failure()))
}

fn exit_code(failed: bool) -> ExitCode {
    if failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

fn print_outcome(outcome: &ConversionOutcome) {
    match outcome {
        ConversionOutcome::Succeeded(asset) => {
            println!("Conversion succeeded");
            let fields = [
                ("Storage account", &asset.storage_account_name),
                ("Container", &asset.blob_container_name),
                ("Asset", &asset.asset_file_path),
            ];
            for (label, value) in fields {
                if let Some(value) = value {
                    println!("  {}: {}", label, value);
                }
            }
        }
        ConversionOutcome::Failed(reason) => println!("Conversion failed: {}", reason),
        ConversionOutcome::TimedOut => {
            println!("Conversion still running after the maximum number of status checks")
        }
        ConversionOutcome::Pending => println!("Conversion still running"),
    }
}

fn print_config_summary(config: &Config) {
    let account = &config.account;
    let conversion = &config.conversion;

    println!("✓ Configuration is valid");
    println!("  Account: {}", account.account_id);
    println!("  Service endpoint: {}", account.service_endpoint);
    println!("  Authentication endpoint: {}", account.authentication_endpoint);
    println!("  Storage account: {}", conversion.storage_account_name);
    println!(
        "  Input: {}/{}{}",
        conversion.input_container, conversion.input_folder_path, conversion.input_asset_path
    );
    println!(
        "  Output: {}/{}{}",
        conversion.output_container,
        conversion.output_folder_path,
        conversion.output_asset_file_name
    );
    if let Some(ref dir) = conversion.local_asset_directory_path {
        println!("  Local directory: {}", dir.display());
    }
}
