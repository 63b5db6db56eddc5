//! Configuration for copy jobs

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Default name offered for the processed workbook
pub const DEFAULT_OUTPUT_FILE_NAME: &str = "processed_excel.xlsx";

/// Name of the configuration file looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "sheetcopy.toml";

const LOG_LEVELS: [&str; 6] = ["off", "error", "warn", "info", "debug", "trace"];

/// Main configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SheetCopyConfig {
    /// Suggested file name for the processed workbook
    pub output_file_name: String,
    /// Carry merged cells, column widths and row heights over to the rewritten sheet
    pub preserve_layout: bool,
    /// Default log level when `RUST_LOG` is not set
    pub log_level: String,
}

impl SheetCopyConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: SheetCopyConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Validate the configuration values
    pub fn validate(&self) -> Result<()> {
        let name = self.output_file_name.trim();
        if name.is_empty() {
            anyhow::bail!("Configuration error: output_file_name must not be empty");
        }
        if !name.to_ascii_lowercase().ends_with(".xlsx") {
            anyhow::bail!(
                "Configuration error: output_file_name '{}' must end in .xlsx",
                self.output_file_name
            );
        }
        if name.contains(['/', '\\']) {
            anyhow::bail!(
                "Configuration error: output_file_name '{}' must be a bare file name",
                self.output_file_name
            );
        }
        if !LOG_LEVELS.contains(&self.log_level.to_ascii_lowercase().as_str()) {
            anyhow::bail!(
                "Configuration error: Unknown log_level '{}' (expected one of {})",
                self.log_level,
                LOG_LEVELS.join(", ")
            );
        }
        Ok(())
    }
}

impl Default for SheetCopyConfig {
    fn default() -> Self {
        Self {
            output_file_name: DEFAULT_OUTPUT_FILE_NAME.to_string(),
            preserve_layout: true,
            log_level: "warn".to_string(),
        }
    }
}
