use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::config::AssetConversionSettings;
use crate::storage::ContainerSas;

/// Where the service reads the source asset from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionInput {
    pub storage_account_name: String,
    pub blob_container_name: String,
    pub folder_path: String,
    pub input_asset_path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container_read_list_sas: Option<String>,
}

/// Where the service writes the converted asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionOutput {
    pub storage_account_name: String,
    pub blob_container_name: String,
    pub folder_path: String,
    pub output_asset_file_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container_write_sas: Option<String>,
}

/// Job descriptor posted to the conversion service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionRequest {
    pub input: ConversionInput,
    pub output: ConversionOutput,
}

impl ConversionRequest {
    /// Request for a storage account the service is already linked to.
    pub fn linked(settings: &AssetConversionSettings) -> Self {
        Self {
            input: ConversionInput {
                storage_account_name: settings.storage_account_name.clone(),
                blob_container_name: settings.input_container.clone(),
                folder_path: settings.input_folder_path.clone(),
                input_asset_path: settings.input_asset_path.clone(),
                container_read_list_sas: None,
            },
            output: ConversionOutput {
                storage_account_name: settings.storage_account_name.clone(),
                blob_container_name: settings.output_container.clone(),
                folder_path: settings.output_folder_path.clone(),
                output_asset_file_name: settings.output_asset_file_name.clone(),
                container_write_sas: None,
            },
        }
    }

    /// Request that grants the service access through container SAS tokens.
    pub fn with_sas(settings: &AssetConversionSettings, sas: &ContainerSas) -> Self {
        let mut request = Self::linked(settings);
        request.input.container_read_list_sas = Some(sas.read_list.clone());
        request.output.container_write_sas = Some(sas.write.clone());
        request
    }

    pub fn uses_sas(&self) -> bool {
        self.input.container_read_list_sas.is_some() || self.output.container_write_sas.is_some()
    }

    /// JSON body with `extra` merged in at the top level. Extra keys replace
    /// keys of the same name.
    pub fn to_body(&self, extra: &Map<String, Value>) -> Value {
        let mut body = Map::new();
        body.insert(
            "input".into(),
            serde_json::to_value(&self.input).unwrap_or(Value::Null),
        );
        body.insert(
            "output".into(),
            serde_json::to_value(&self.output).unwrap_or(Value::Null),
        );
        for (key, value) in extra {
            body.insert(key.clone(), value.clone());
        }
        Value::Object(body)
    }
}

/// Location of a successfully converted asset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConvertedAsset {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_account_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blob_container_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asset_file_path: Option<String>,
    /// Any further fields the service included
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Job status as reported by the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversionStatus {
    Running,
    Success,
    Failure,
}

impl ConversionStatus {
    /// Decode a status string. Anything that is not terminal counts as running.
    pub fn from_service(status: &str) -> Self {
        match status.trim().to_ascii_lowercase().as_str() {
            "success" | "succeeded" => Self::Success,
            "failure" | "failed" => Self::Failure,
            _ => Self::Running,
        }
    }
}

/// Result of checking (or polling) a conversion.
#[derive(Debug, Clone, PartialEq)]
pub enum ConversionOutcome {
    /// Still running
    Pending,
    Succeeded(ConvertedAsset),
    /// Failed on the service side, with the reported reason
    Failed(String),
    /// Polling gave up before a terminal state
    TimedOut,
}

impl ConversionOutcome {
    /// Interpret a raw status response.
    pub fn from_status_response(response: &Value) -> Result<Self, String> {
        let status = response
            .get("status")
            .and_then(Value::as_str)
            .ok_or_else(|| "missing 'status' field".to_string())?;

        match ConversionStatus::from_service(status) {
            ConversionStatus::Running => Ok(Self::Pending),
            ConversionStatus::Success => {
                let asset = response
                    .get("convertedAsset")
                    .cloned()
                    .ok_or_else(|| "successful conversion without 'convertedAsset'".to_string())?;
                serde_json::from_value(asset)
                    .map(Self::Succeeded)
                    .map_err(|e| format!("invalid 'convertedAsset': {}", e))
            }
            ConversionStatus::Failure => Ok(Self::Failed(failure_reason(response, status))),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded(_))
    }
}

fn failure_reason(response: &Value, status: &str) -> String {
    match response.get("error") {
        Some(Value::String(message)) => message.clone(),
        Some(Value::Object(error)) => match (error.get("code"), error.get("message")) {
            (Some(Value::String(code)), Some(Value::String(message))) => {
                format!("{}: {}", code, message)
            }
            (_, Some(Value::String(message))) => message.clone(),
            _ => Value::Object(error.clone()).to_string(),
        },
        _ => format!("conversion reported status '{}'", status),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn settings() -> AssetConversionSettings {
        AssetConversionSettings {
            storage_account_name: "assets".into(),
            input_container: "input".into(),
            input_folder_path: "models/".into(),
            input_asset_path: "box.fbx".into(),
            output_container: "output".into(),
            output_folder_path: "converted/".into(),
            output_asset_file_name: "box.arrAsset".into(),
            ..Default::default()
        }
    }

    #[test]
    fn linked_body_shape() {
        let body = ConversionRequest::linked(&settings()).to_body(&Map::new());
        assert_eq!(
            body,
            json!({
                "input": {
                    "storageAccountName": "assets",
                    "blobContainerName": "input",
                    "folderPath": "models/",
                    "inputAssetPath": "box.fbx"
                },
                "output": {
                    "storageAccountName": "assets",
                    "blobContainerName": "output",
                    "folderPath": "converted/",
                    "outputAssetFileName": "box.arrAsset"
                }
            })
        );
    }

    #[test]
    fn sas_body_embeds_tokens() {
        let sas = ContainerSas {
            read_list: "sv=read".into(),
            write: "sv=write".into(),
        };
        let request = ConversionRequest::with_sas(&settings(), &sas);
        assert!(request.uses_sas());
        let body = request.to_body(&Map::new());
        assert_eq!(body["input"]["containerReadListSas"], "sv=read");
        assert_eq!(body["output"]["containerWriteSas"], "sv=write");
    }

    #[test]
    fn extra_fields_merge_at_top_level() {
        let mut extra = Map::new();
        extra.insert("settings".into(), json!({"scaling": 2.0}));
        extra.insert("input".into(), json!("replaced"));
        let body = ConversionRequest::linked(&settings()).to_body(&extra);
        assert_eq!(body["settings"]["scaling"], 2.0);
        assert_eq!(body["input"], "replaced");
        assert_eq!(body["output"]["blobContainerName"], "output");
    }

    #[test]
    fn status_decoding_is_case_insensitive() {
        assert_eq!(ConversionStatus::from_service("SUCCESS"), ConversionStatus::Success);
        assert_eq!(ConversionStatus::from_service("Succeeded"), ConversionStatus::Success);
        assert_eq!(ConversionStatus::from_service("failure"), ConversionStatus::Failure);
        assert_eq!(ConversionStatus::from_service("Failed"), ConversionStatus::Failure);
        assert_eq!(ConversionStatus::from_service("Running"), ConversionStatus::Running);
        assert_eq!(ConversionStatus::from_service("NotStarted"), ConversionStatus::Running);
    }

    #[test]
    fn success_response_keeps_asset_payload() {
        let response = json!({
            "status": "Success",
            "convertedAsset": {
                "storageAccountName": "assets",
                "blobContainerName": "output",
                "assetFilePath": "converted/box.arrAsset",
                "sizeBytes": 1024
            }
        });
        let outcome = ConversionOutcome::from_status_response(&response).unwrap();
        let ConversionOutcome::Succeeded(asset) = outcome else {
            panic!("expected success, got {:?}", outcome);
        };
        assert_eq!(asset.asset_file_path.as_deref(), Some("converted/box.arrAsset"));
        assert_eq!(serde_json::to_value(&asset).unwrap(), response["convertedAsset"]);
    }

    #[test]
    fn partial_asset_payload_is_not_padded() {
        let response = json!({
            "status": "Success",
            "convertedAsset": {"assetFilePath": "box.arrAsset"}
        });
        let outcome = ConversionOutcome::from_status_response(&response).unwrap();
        let ConversionOutcome::Succeeded(asset) = outcome else {
            panic!("expected success, got {:?}", outcome);
        };
        assert_eq!(asset.storage_account_name, None);
        assert_eq!(serde_json::to_value(&asset).unwrap(), response["convertedAsset"]);
    }

    #[test]
    fn failure_reason_from_error_object() {
        let response = json!({
            "status": "Failure",
            "error": {"code": "InputAssetNotFound", "message": "box.fbx missing"}
        });
        assert_eq!(
            ConversionOutcome::from_status_response(&response).unwrap(),
            ConversionOutcome::Failed("InputAssetNotFound: box.fbx missing".into())
        );
    }

    #[test]
    fn failure_without_error_payload() {
        let response = json!({"status": "failure"});
        assert_eq!(
            ConversionOutcome::from_status_response(&response).unwrap(),
            ConversionOutcome::Failed("conversion reported status 'failure'".into())
        );
    }

    #[test]
    fn missing_status_is_an_error() {
        assert!(ConversionOutcome::from_status_response(&json!({})).is_err());
    }
}
