//! Upload → submit → poll, with each stage also callable on its own.

use anyhow::{Context, Result};
use serde_json::{Map, Value};
use time::OffsetDateTime;

use crate::config::Config;
use crate::conversion::{poll_conversion, ConversionClient, ConversionOutcome, ConversionRequest, PollPolicy};
use crate::storage::{BlobStore, ContainerSas};
use crate::upload::{upload_asset_directory, UploadSummary};

/// How a conversion is submitted.
#[derive(Debug, Clone, Default)]
pub struct SubmitOptions {
    /// Grant access through container SAS tokens instead of a linked storage account
    pub use_container_sas: bool,
    /// Extra top-level fields for the request body
    pub additional_params: Map<String, Value>,
}

/// Which stages [`Pipeline::run`] executes.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub upload: bool,
    pub submit: SubmitOptions,
    pub poll: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            upload: true,
            submit: SubmitOptions::default(),
            poll: true,
        }
    }
}

/// What a full run produced.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub upload: Option<UploadSummary>,
    pub conversion_id: String,
    /// `None` when polling was skipped
    pub outcome: Option<ConversionOutcome>,
}

impl RunReport {
    /// A run fails when polling ended in anything but success.
    pub fn is_failure(&self) -> bool {
        self.outcome.as_ref().is_some_and(|o| !o.is_success())
    }
}

pub struct Pipeline {
    config: Config,
    conversions: ConversionClient,
    store: Option<Box<dyn BlobStore>>,
    poll_policy: PollPolicy,
}

impl Pipeline {
    pub fn new(config: Config, conversions: ConversionClient) -> Self {
        Self {
            config,
            conversions,
            store: None,
            poll_policy: PollPolicy::default(),
        }
    }

    pub fn with_store(mut self, store: Box<dyn BlobStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_poll_policy(mut self, policy: PollPolicy) -> Self {
        self.poll_policy = policy;
        self
    }

    pub async fn upload(&self) -> Result<UploadSummary> {
        let store = self
            .store
            .as_deref()
            .context("No blob store configured for upload")?;

        let summary = upload_asset_directory(store, &self.config.conversion)
            .await
            .context("Upload failed")?;
        Ok(summary)
    }

    /// Submit the configured asset for conversion and return the job id.
    pub async fn submit(&self, options: &SubmitOptions) -> Result<String> {
        let settings = &self.config.conversion;
        let request = if options.use_container_sas {
            let sas = ContainerSas::for_settings(settings, OffsetDateTime::now_utc())
                .await
                .context("Failed to prepare container SAS tokens")?;
            ConversionRequest::with_sas(settings, &sas)
        } else {
            ConversionRequest::linked(settings)
        };

        let conversion_id = self
            .conversions
            .create(&request, &options.additional_params)
            .await
            .context("Failed to submit conversion")?;

        tracing::info!(conversion_id = %conversion_id, "Conversion submitted");
        Ok(conversion_id)
    }

    /// Single status query, returned as the service sent it.
    pub async fn status(&self, conversion_id: &str) -> Result<Value> {
        self.conversions
            .status(conversion_id)
            .await
            .with_context(|| format!("Failed to query conversion {}", conversion_id))
    }

    pub async fn poll(&self, conversion_id: &str) -> Result<ConversionOutcome> {
        let outcome = poll_conversion(&self.conversions, conversion_id, &self.poll_policy)
            .await
            .with_context(|| format!("Failed to poll conversion {}", conversion_id))?;

        match &outcome {
            ConversionOutcome::Succeeded(asset) => tracing::info!(
                conversion_id,
                storage_account = ?asset.storage_account_name,
                container = ?asset.blob_container_name,
                path = ?asset.asset_file_path,
                "Conversion succeeded"
            ),
            ConversionOutcome::Failed(reason) => {
                tracing::error!(conversion_id, reason = %reason, "Conversion failed")
            }
            ConversionOutcome::TimedOut => {
                tracing::error!(conversion_id, "Conversion did not finish in time")
            }
            ConversionOutcome::Pending => {}
        }

        Ok(outcome)
    }

    /// Run the selected stages in order, stopping at the first error.
    pub async fn run(&self, options: &RunOptions) -> Result<RunReport> {
        let upload = if options.upload {
            Some(self.upload().await?)
        } else {
            None
        };

        let conversion_id = self.submit(&options.submit).await?;

        let outcome = if options.poll {
            Some(self.poll(&conversion_id).await?)
        } else {
            None
        };

        Ok(RunReport {
            upload,
            conversion_id,
            outcome,
        })
    }
}
