//! Shared test harness for integration tests.
//!
//! Provides [`TestHarness`], which owns a wiremock server standing in for the
//! conversion service, a temporary asset directory, and a [`Config`] pointing
//! at both. [`RecordingStore`] captures blob writes in memory.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use arrconvert::auth::StaticToken;
use arrconvert::config::{fill_derived, Config};
use arrconvert::conversion::{ConversionClient, PollPolicy};
use arrconvert::error::StorageError;
use arrconvert::pipeline::Pipeline;
use arrconvert::storage::BlobStore;
use async_trait::async_trait;
use tempfile::TempDir;
use wiremock::{MockServer, ResponseTemplate};

pub const ACCOUNT_ID: &str = "acct-1";
pub const TOKEN: &str = "test-token";

/// One blob write seen by [`RecordingStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobWrite {
    pub container: String,
    pub blob_path: String,
    pub contents: Vec<u8>,
}

/// Blob store that keeps every write in memory, optionally failing from
/// the n-th write on.
#[derive(Clone, Default)]
pub struct RecordingStore {
    writes: Arc<Mutex<Vec<BlobWrite>>>,
    fail_from: Option<usize>,
}

impl RecordingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Writes after the first `n` succeed fail with a storage error.
    pub fn failing_after(n: usize) -> Self {
        Self {
            writes: Arc::default(),
            fail_from: Some(n),
        }
    }

    pub fn writes(&self) -> Vec<BlobWrite> {
        self.writes.lock().unwrap().clone()
    }

    pub fn blob_paths(&self) -> Vec<String> {
        self.writes().into_iter().map(|w| w.blob_path).collect()
    }
}

#[async_trait]
impl BlobStore for RecordingStore {
    async fn put_file(
        &self,
        container: &str,
        blob_path: &str,
        source: &Path,
    ) -> Result<u64, StorageError> {
        let mut writes = self.writes.lock().unwrap();
        if self.fail_from.is_some_and(|n| writes.len() >= n) {
            return Err(StorageError::Status {
                target: format!("{}/{}", container, blob_path),
                status: 503,
                error_code: Some("ServerBusy".into()),
            });
        }

        let contents = std::fs::read(source).map_err(|e| StorageError::Io {
            path: source.to_path_buf(),
            source: e,
        })?;
        let len = contents.len() as u64;
        writes.push(BlobWrite {
            container: container.to_string(),
            blob_path: blob_path.to_string(),
            contents,
        });
        Ok(len)
    }
}

/// Mock service, asset directory and matching configuration.
pub struct TestHarness {
    pub server: MockServer,
    pub assets: TempDir,
    pub config: Config,
}

impl TestHarness {
    /// Harness whose asset directory contains `model/box.fbx`.
    pub async fn new() -> Self {
        let harness = Self::empty().await;
        harness.write_asset("box.fbx", b"fbx-bytes");
        harness
    }

    /// Harness with an empty asset directory.
    pub async fn empty() -> Self {
        let server = MockServer::start().await;
        let assets = tempfile::tempdir().expect("failed to create temp dir");
        let config = test_config(&server.uri(), assets.path());
        Self {
            server,
            assets,
            config,
        }
    }

    pub fn asset_dir(&self) -> PathBuf {
        self.assets.path().to_path_buf()
    }

    /// Write a file below the asset directory, creating parent directories.
    pub fn write_asset(&self, relative: &str, contents: &[u8]) -> PathBuf {
        let path = self.assets.path().join(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("failed to create asset dir");
        }
        std::fs::write(&path, contents).expect("failed to write asset");
        path
    }

    pub fn client(&self) -> ConversionClient {
        ConversionClient::new(
            reqwest::Client::new(),
            &self.config.account,
            Box::new(StaticToken(TOKEN.to_string())),
        )
    }

    /// Pipeline writing into `store` and polling every millisecond.
    pub fn pipeline(&self, store: RecordingStore) -> Pipeline {
        Pipeline::new(self.config.clone(), self.client())
            .with_store(Box::new(store))
            .with_poll_policy(fast_poll(None))
    }

    pub fn conversions_path(&self, suffix: &str) -> String {
        format!("/v1/accounts/{}/conversions/{}", ACCOUNT_ID, suffix)
    }

    /// JSON bodies of every request received so far.
    pub async fn request_bodies(&self) -> Vec<serde_json::Value> {
        self.server
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .filter(|r| !r.body.is_empty())
            .map(|r| serde_json::from_slice(&r.body).expect("request body is not JSON"))
            .collect()
    }
}

/// Complete configuration pointing the service and STS at `service_uri`.
pub fn test_config(service_uri: &str, asset_dir: &Path) -> Config {
    let mut config = Config::default();
    config.account.account_id = ACCOUNT_ID.into();
    config.account.account_key = "account-key".into();
    config.account.service_endpoint = service_uri.into();
    config.account.authentication_endpoint = service_uri.into();
    config.conversion.storage_account_name = "assets".into();
    config.conversion.storage_account_key = Some("c2VjcmV0LWtleQ==".into());
    config.conversion.blob_endpoint = Some(service_uri.into());
    config.conversion.input_container = "arrinput".into();
    config.conversion.input_folder_path = "models/".into();
    config.conversion.input_asset_path = "box.fbx".into();
    config.conversion.output_container = "arroutput".into();
    config.conversion.output_folder_path = "converted/".into();
    config.conversion.local_asset_directory_path = Some(asset_dir.to_path_buf());
    fill_derived(&mut config);
    config
}

pub fn fast_poll(max_attempts: Option<u32>) -> PollPolicy {
    PollPolicy {
        interval: std::time::Duration::from_millis(1),
        max_attempts,
    }
}

pub fn success_status() -> serde_json::Value {
    serde_json::json!({
        "status": "Success",
        "convertedAsset": {
            "storageAccountName": "assets",
            "blobContainerName": "arroutput",
            "assetFilePath": "converted/box.arrAsset"
        }
    })
}

/// Blob service reply to a successful write, with the headers the storage
/// client reads from it.
pub fn blob_created() -> ResponseTemplate {
    ResponseTemplate::new(201)
        .insert_header("ETag", "\"0x8DCF0A1B2C3D4E5\"")
        .insert_header("Last-Modified", "Mon, 19 Oct 2026 08:00:00 GMT")
        .insert_header("Date", "Mon, 19 Oct 2026 08:00:00 GMT")
        .insert_header("Content-MD5", "CY9rzUYh03PK3k6DJie09g==")
        .insert_header("x-ms-request-id", "7f2c3b1e-0a4d-4c5e-9b6f-1d2e3f4a5b6c")
        .insert_header("x-ms-version", "2022-11-02")
        .insert_header("x-ms-request-server-encrypted", "true")
}
