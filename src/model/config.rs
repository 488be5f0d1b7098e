use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

const ENV_CONFIG_PATH: &str = "JUDGMENT_SCORING_CONFIG_PATH";
const DEFAULT_CONFIG_PATH: &str = "scoring.yaml";

/// Invalid engine configuration
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("{field} must be within [0, 1], got {value}")]
    OutOfUnitInterval { field: &'static str, value: f64 },

    #[error("log_loss_epsilon must be within (0, 0.5), got {0}")]
    InvalidEpsilon(f64),

    #[error("calibration_bins must be at least 1")]
    NoCalibrationBins,

    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] serde_yaml::Error),
}

/// Tunable constants of the scoring policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// Margin added to each side of the ground-truth range before a point
    /// outside it loses its last point
    pub tolerance_margin: f64,
    /// Distance from 0 or 1 at which an estimate counts as overconfident
    pub extreme_band: f64,
    /// Share of a stated range's width that must fall inside the ground truth
    pub min_overlap_fraction: f64,
    /// Clamp applied to probabilities before taking logarithms
    pub log_loss_epsilon: f64,
    /// Number of fixed-width reliability bins spanning [0, 1]
    pub calibration_bins: usize,
    /// How close a final estimate must sit to a cited market price to count
    /// as copied from it
    pub market_anchor_tolerance: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            tolerance_margin: 0.10,
            extreme_band: 0.03,
            min_overlap_fraction: 0.5,
            log_loss_epsilon: 1e-6,
            calibration_bins: 10,
            market_anchor_tolerance: 0.01,
        }
    }
}

impl ScoringConfig {
    /// Reject values the scoring policy cannot work with
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("tolerance_margin", self.tolerance_margin),
            ("extreme_band", self.extreme_band),
            ("min_overlap_fraction", self.min_overlap_fraction),
            ("market_anchor_tolerance", self.market_anchor_tolerance),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::OutOfUnitInterval { field, value });
            }
        }

        if !(self.log_loss_epsilon > 0.0 && self.log_loss_epsilon < 0.5) {
            return Err(ConfigError::InvalidEpsilon(self.log_loss_epsilon));
        }

        if self.calibration_bins == 0 {
            return Err(ConfigError::NoCalibrationBins);
        }

        Ok(())
    }
}

/// YAML configuration file structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub scoring: ScoringConfig,
}

/// Engine configuration
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub scoring: ScoringConfig,
}

impl Config {
    /// Load configuration from the file named by the environment, falling
    /// back to defaults when it is missing or unusable
    pub fn from_env() -> Self {
        let config_path =
            std::env::var(ENV_CONFIG_PATH).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());

        let scoring = Self::load_config_file(&config_path)
            .map(|cf| cf.scoring)
            .unwrap_or_default();

        if let Err(e) = scoring.validate() {
            tracing::warn!(
                path = %config_path,
                error = %e,
                "Invalid scoring configuration, using defaults"
            );
            return Self::default();
        }

        Self { scoring }
    }

    /// Parse and validate configuration from YAML text
    pub fn from_yaml_str(contents: &str) -> Result<Self, ConfigError> {
        let contents = contents.trim();
        let file = if contents.is_empty() {
            ConfigFile::default()
        } else {
            serde_yaml::from_str::<ConfigFile>(contents)?
        };
        file.scoring.validate()?;
        Ok(Self {
            scoring: file.scoring,
        })
    }

    /// Load configuration from YAML file
    fn load_config_file(path: &str) -> Option<ConfigFile> {
        let path = Path::new(path);

        if !path.exists() {
            tracing::debug!(path = %path.display(), "Config file not found, using defaults");
            return None;
        }

        match fs::read_to_string(path) {
            Ok(contents) => {
                let contents = contents.trim();
                if contents.is_empty() {
                    tracing::debug!(path = %path.display(), "Config file is empty, using defaults");
                    return Some(ConfigFile::default());
                }

                match serde_yaml::from_str(contents) {
                    Ok(config) => {
                        tracing::info!(
                            path = %path.display(),
                            "Loaded scoring configuration from file"
                        );
                        Some(config)
                    }
                    Err(e) => {
                        tracing::warn!(
                            path = %path.display(),
                            error = %e,
                            "Failed to parse config file, using defaults"
                        );
                        None
                    }
                }
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "Failed to read config file, using defaults"
                );
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = ScoringConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.calibration_bins, 10);
        assert!((config.tolerance_margin - 0.10).abs() < 1e-12);
        assert!((config.extreme_band - 0.03).abs() < 1e-12);
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let config = Config::from_yaml_str("scoring:\n  calibration_bins: 20\n").unwrap();
        assert_eq!(config.scoring.calibration_bins, 20);
        assert!((config.scoring.log_loss_epsilon - 1e-6).abs() < 1e-18);
    }

    #[test]
    fn test_empty_yaml_uses_defaults() {
        let config = Config::from_yaml_str("   \n").unwrap();
        assert_eq!(config.scoring, ScoringConfig::default());
    }

    #[test]
    fn test_rejects_zero_bins() {
        let result = Config::from_yaml_str("scoring:\n  calibration_bins: 0\n");
        assert!(matches!(result, Err(ConfigError::NoCalibrationBins)));
    }

    #[test]
    fn test_rejects_margin_outside_unit_interval() {
        let result = Config::from_yaml_str("scoring:\n  tolerance_margin: 1.5\n");
        assert!(matches!(
            result,
            Err(ConfigError::OutOfUnitInterval {
                field: "tolerance_margin",
                ..
            })
        ));
    }

    #[test]
    fn test_rejects_bad_epsilon() {
        let config = ScoringConfig {
            log_loss_epsilon: 0.0,
            ..ScoringConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::InvalidEpsilon(_))));
    }

    #[test]
    fn test_malformed_yaml_is_parse_error() {
        let result = Config::from_yaml_str("scoring: [not, a, map]");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }
}
