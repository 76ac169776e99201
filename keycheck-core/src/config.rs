//! Checker and activation client configuration.

use crate::activation::RequestShape;
use crate::error::{KeyCheckError, KeyCheckResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level configuration for a key checker process.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckerConfig {
    /// Catalog listing the candidate configuration files.
    pub catalog_path: PathBuf,
    /// Directory the catalog's relative paths are resolved against.
    pub config_dir: PathBuf,
    /// Marketplace id passed to the validation engine.
    pub marketplace_id: String,
    /// Remote activation lookup.
    pub activation: ActivationConfig,
}

impl Default for CheckerConfig {
    fn default() -> Self {
        Self {
            catalog_path: PathBuf::from("PKeyConfig/PkeyData.xml"),
            config_dir: PathBuf::from("PKeyConfig"),
            marketplace_id: "00000".to_string(),
            activation: ActivationConfig::default(),
        }
    }
}

impl CheckerConfig {
    /// Reads a JSON config file. Missing fields take their defaults.
    pub fn from_file(path: &Path) -> KeyCheckResult<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            KeyCheckError::ConfigLoad(format!("failed to read {}: {e}", path.display()))
        })?;
        serde_json::from_str(&raw).map_err(|e| {
            KeyCheckError::ConfigLoad(format!("invalid config {}: {e}", path.display()))
        })
    }
}

/// Batch activation service settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ActivationConfig {
    /// Service URL.
    pub endpoint: String,
    /// Value of the `SOAPAction` header.
    pub soap_action: String,
    /// Whole-request timeout.
    pub timeout_secs: u64,
    /// Which request envelope to send.
    pub shape: RequestShape,
}

impl Default for ActivationConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://activation.sls.microsoft.com/BatchActivation/BatchActivation.asmx"
                .to_string(),
            soap_action: "http://www.microsoft.com/BatchActivationService/BatchActivate"
                .to_string(),
            timeout_secs: 60,
            shape: RequestShape::Signed,
        }
    }
}
