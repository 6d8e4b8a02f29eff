// SPDX-License-Identifier: AGPL-3.0-only
// Copyright (C) 2024 Jonathan Lee
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License version 3
// as published by the Free Software Foundation.
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.
// See the GNU Affero General Public License for more details.
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see https://www.gnu.org/licenses/.

use crate::error::{utils, ConfigError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SummarizerConfig {
    /// Name of the occurrence column in value-count results.
    pub count_column: String,
    /// Name of the reduced column in group-by results.
    pub aggregate_column: String,
    pub default_top_rows: usize,
    pub infer_schema_rows: usize,
    pub describe_percentiles: Vec<f64>,
    pub max_preview_rows: usize,
}
impl Default for SummarizerConfig {
    fn default() -> Self {
        Self {
            count_column: "count".to_string(),
            aggregate_column: "newcol".to_string(),
            default_top_rows: 5,
            infer_schema_rows: 100,
            describe_percentiles: vec![0.25, 0.5, 0.75],
            max_preview_rows: 1000,
        }
    }
}
impl SummarizerConfig {
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::ConfigFileError {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml_str(&content)
    }
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(content).map_err(ConfigError::from)?;
        config.validate()?;
        Ok(config)
    }
    pub fn validate(&self) -> Result<()> {
        if self.count_column.trim().is_empty() {
            return Err(utils::invalid_config("count_column", &self.count_column));
        }
        if self.aggregate_column.trim().is_empty() {
            return Err(utils::invalid_config(
                "aggregate_column",
                &self.aggregate_column,
            ));
        }
        if self.default_top_rows == 0 {
            return Err(utils::invalid_config("default_top_rows", 0));
        }
        if self.infer_schema_rows == 0 {
            return Err(utils::invalid_config("infer_schema_rows", 0));
        }
        if self.max_preview_rows == 0 {
            return Err(utils::invalid_config("max_preview_rows", 0));
        }
        if let Some(p) = self
            .describe_percentiles
            .iter()
            .find(|p| !(0.0..=1.0).contains(*p))
        {
            return Err(utils::invalid_config("describe_percentiles", p));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SummarizerError;
    use std::io::Write;

    #[test]
    fn partial_yaml_keeps_defaults() {
        let config = SummarizerConfig::from_yaml_str("aggregate_column: total\n").unwrap();
        assert_eq!(config.aggregate_column, "total");
        assert_eq!(config.count_column, "count");
        assert_eq!(config.describe_percentiles, vec![0.25, 0.5, 0.75]);
    }

    #[test]
    fn out_of_range_percentile_is_rejected() {
        let err = SummarizerConfig::from_yaml_str("describe_percentiles: [0.5, 1.5]\n").unwrap_err();
        assert!(matches!(
            err,
            SummarizerError::Config(ConfigError::InvalidValue { ref field, .. }) if field == "describe_percentiles"
        ));
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "count_column: n\ndefault_top_rows: 10").unwrap();
        let config = SummarizerConfig::from_yaml_file(file.path()).unwrap();
        assert_eq!(config.count_column, "n");
        assert_eq!(config.default_top_rows, 10);
    }

    #[test]
    fn missing_file_reports_path() {
        let err = SummarizerConfig::from_yaml_file("/nonexistent/tabel.yml").unwrap_err();
        assert!(err.to_string().contains("/nonexistent/tabel.yml"));
    }
}
