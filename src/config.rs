use crate::error::AllocError;
use crate::types::CompatibilityPolicy;
use serde::{Deserialize, Serialize};
use std::fs::read_to_string;
use std::path::{Path, PathBuf};

/// Run settings, usually read from a YAML file.
///
/// ```yaml
/// solver: CBC
/// policy: direct_addressing
/// timeLimit: 60
/// resultsDir: resultados_instancias
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub solver: String,
    pub policy: CompatibilityPolicy,
    #[serde(rename = "timeLimit")]
    pub time_limit: Option<f64>,
    #[serde(rename = "resultsDir")]
    pub results_dir: PathBuf,
    #[serde(rename = "exhaustiveLimit")]
    pub exhaustive_limit: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            solver: "CBC".to_owned(),
            policy: CompatibilityPolicy::default(),
            time_limit: None,
            results_dir: PathBuf::from("results"),
            exhaustive_limit: 24,
        }
    }
}

impl Config {
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, AllocError> {
        let path = path.as_ref();
        let buf = read_to_string(path).map_err(|source| AllocError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_yaml::from_str(&buf).map_err(|source| AllocError::Config {
            path: path.to_path_buf(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_yaml_keeps_defaults() {
        let yaml = "policy: direct_addressing\ntimeLimit: 30.5\n";
        let config: Config = serde_yaml::from_str(yaml).unwrap();

        assert_eq!(config.policy, CompatibilityPolicy::DirectAddressing);
        assert_eq!(config.time_limit, Some(30.5));
        assert_eq!(config.solver, "CBC");
        assert_eq!(config.results_dir, PathBuf::from("results"));
    }

    #[test]
    fn unknown_policy_is_rejected() {
        let parsed: Result<Config, _> = serde_yaml::from_str("policy: anything_goes\n");
        assert!(parsed.is_err());
    }

    #[test]
    fn missing_config_file_is_io_error() {
        let err = Config::from_yaml_file("no/such/config.yaml").unwrap_err();
        assert!(matches!(err, AllocError::Io { .. }));
    }
}
