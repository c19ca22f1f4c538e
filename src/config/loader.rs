//! Configuration loader for YAML files
//!
//! This module handles loading and validating configuration from YAML files.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use tracing::warn;

use crate::error::AppError;

use super::types::AppConfig;

/// Load configuration from a YAML file
///
/// This function:
/// 1. Parses the YAML content
/// 2. Validates the configuration rules
///
/// # Returns
/// * `Ok(AppConfig)` - Successfully loaded and validated configuration
/// * `Err(AppError)` - File not found, parse error, or validation failure
pub fn load_config(path: &Path) -> Result<AppConfig, AppError> {
    if !path.exists() {
        return Err(AppError::Config(format!(
            "Configuration file not found: {}",
            path.display()
        )));
    }

    let file = File::open(path)?;
    let reader = BufReader::new(file);

    let config: AppConfig = serde_yaml::from_reader(reader).map_err(|e| {
        AppError::Config(format!(
            "YAML parse error in '{}': {}",
            path.display(),
            e
        ))
    })?;

    config.validate()?;

    Ok(config)
}

/// Load configuration from a YAML string (useful for testing)
pub fn load_config_from_str(yaml_content: &str) -> Result<AppConfig, AppError> {
    let config: AppConfig = serde_yaml::from_str(yaml_content).map_err(|e| {
        AppError::Config(format!("YAML parse error: {}", e))
    })?;

    config.validate()?;

    Ok(config)
}

/// Startup loader: file if present (defaults with a warning otherwise),
/// then env overrides, then validation.
pub fn load_config_or_default(path: &Path) -> Result<AppConfig, AppError> {
    let mut config = if path.exists() {
        load_config(path)?
    } else {
        warn!(
            path = %path.display(),
            "Configuration file not found, using defaults"
        );
        AppConfig::default()
    };

    config.apply_env_overrides();
    config.validate()?;
    Ok(config)
}

// ============================================================================
// Tests
// ============================================================================
