use crate::{
    activation_functions::ActivationPlacement, fully_connected::ScoringMode, pooling::PoolingMode,
};
use serde_derive::{Deserialize, Serialize};
use std::{fs, path::Path};
use thiserror::Error;

type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config file not found. Filesystem reported error\n {0}.")]
    ConfigFileNotFoundError(#[from] std::io::Error),
    #[error("Config file didn't have the correct format (required: JSON dict with the keys pooling, scoring, activation):\n {0}.")]
    ConfigFormatError(#[from] serde_json::Error),
}

/// Runtime switches of the pipeline. Missing keys fall back to their defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    pub pooling: PoolingMode,
    pub scoring: ScoringMode,
    pub activation: ActivationPlacement,
}

impl NetworkConfig {
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> ConfigResult<NetworkConfig> {
        let raw_file = fs::read_to_string(path)?;
        NetworkConfig::from_json_str(&raw_file)
    }

    pub fn from_json_str(raw: &str) -> ConfigResult<NetworkConfig> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Settings of the demonstration run: no activation and plain weighted sums,
    /// so values can be followed by hand.
    pub fn demonstration() -> NetworkConfig {
        NetworkConfig {
            pooling: PoolingMode::Average,
            scoring: ScoringMode::Linear,
            activation: ActivationPlacement::Disabled,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs::File;
    use std::io::Write;

    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_json_config() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("network.json");
        let mut file = File::create(&file_path).unwrap();
        writeln!(
            file,
            // Rust escapes curly braces by doubling them
            "{{ \"pooling\": \"sum-sigmoid\", \"scoring\": \"linear\", \"activation\": \"disabled\" }}"
        )
        .unwrap();

        let config = NetworkConfig::from_json_file(&file_path).unwrap();
        assert_eq!(
            config,
            NetworkConfig {
                pooling: PoolingMode::SumSigmoid,
                scoring: ScoringMode::Linear,
                activation: ActivationPlacement::Disabled,
            }
        );

        drop(file);
        dir.close().unwrap();
    }

    #[test]
    fn test_missing_keys_use_defaults() {
        let config = NetworkConfig::from_json_str("{ \"pooling\": \"sum\" }").unwrap();
        assert_eq!(config.pooling, PoolingMode::Sum);
        assert_eq!(config.scoring, ScoringMode::Distance);
        assert_eq!(config.activation, ActivationPlacement::HiddenLayers);
        assert_eq!(
            NetworkConfig::from_json_str("{}").unwrap(),
            NetworkConfig::default()
        );
    }

    #[test]
    fn test_bad_config() {
        assert!(matches!(
            NetworkConfig::from_json_str("{ \"scoring\": \"cosine\" }"),
            Err(ConfigError::ConfigFormatError(_))
        ));
        assert!(matches!(
            NetworkConfig::from_json_file("/nonexistent/network.json"),
            Err(ConfigError::ConfigFileNotFoundError(_))
        ));
    }
}
