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

use serde::Serialize;
use thiserror::Error;
#[derive(Error, Debug)]
pub enum SummarizerError {
    #[error("Failed to read uploaded file: {reason}")]
    Parse { reason: String },
    #[error("Column '{column}' not found in table")]
    ColumnNotFound { column: String },
    #[error("Cannot apply '{operation}' to column '{column}' of type {dtype}")]
    AggregationType {
        operation: String,
        column: String,
        dtype: String,
    },
    #[error("Invalid request: {reason}")]
    InvalidRequest { reason: String },
    #[error("Invalid '{binding}' binding for {chart} chart: {reason}")]
    ChartBinding {
        chart: String,
        binding: String,
        reason: String,
    },
    #[error("No table has been uploaded yet")]
    NoTable,
    #[error("Table has no numeric columns to summarise")]
    NoNumericColumns,
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("Data engine error: {0}")]
    Engine(#[from] polars::error::PolarsError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read configuration file '{path}': {source}")]
    ConfigFileError {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse YAML configuration: {source}")]
    YamlParseError {
        #[from]
        source: serde_yaml::Error,
    },
    #[error("Invalid configuration value: {field} = {value}")]
    InvalidValue { field: String, value: String },
}
pub type Result<T> = std::result::Result<T, SummarizerError>;
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;
impl From<calamine::XlsxError> for SummarizerError {
    fn from(err: calamine::XlsxError) -> Self {
        SummarizerError::Parse {
            reason: format!("spreadsheet: {err}"),
        }
    }
}
impl SummarizerError {
    /// Every summarizer failure is an input problem; only configuration and
    /// I/O failures outlive the current interaction.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, SummarizerError::Config(_) | SummarizerError::Io(_))
    }
    pub fn category(&self) -> &'static str {
        match self {
            SummarizerError::Parse { .. } => "Upload",
            SummarizerError::ColumnNotFound { .. } => "Column",
            SummarizerError::AggregationType { .. } => "Aggregation",
            SummarizerError::InvalidRequest { .. } => "Request",
            SummarizerError::ChartBinding { .. } => "Chart",
            SummarizerError::NoTable | SummarizerError::NoNumericColumns => "Data",
            SummarizerError::Config(_) => "Configuration",
            SummarizerError::Engine(_) => "Engine",
            SummarizerError::Io(_) => "I/O",
        }
    }
    pub fn suggestions(&self) -> Vec<String> {
        match self {
            SummarizerError::Parse { .. } => vec![
                "Upload a .csv or .xlsx file".to_string(),
                "Check that the first row holds the column names".to_string(),
            ],
            SummarizerError::ColumnNotFound { .. } => vec![
                "The selection may refer to a previous upload".to_string(),
                "Pick the column again from the current list".to_string(),
            ],
            SummarizerError::AggregationType { .. } => vec![
                "Choose a numeric operation column".to_string(),
                "Use 'count' to tally values of any type".to_string(),
            ],
            SummarizerError::ChartBinding { .. } => {
                vec!["Value and size axes accept numeric columns only".to_string()]
            }
            SummarizerError::NoTable => vec!["Upload a file to begin".to_string()],
            _ => vec!["Check the error message for specific guidance".to_string()],
        }
    }
    pub fn user_message(&self) -> String {
        match self {
            SummarizerError::AggregationType { .. } => format!("Error during aggregation: {self}"),
            SummarizerError::NoTable => "Please upload a csv or excel file first.".to_string(),
            SummarizerError::Engine(_) => {
                "The data engine could not complete the request. Try a different selection."
                    .to_string()
            }
            _ => self.to_string(),
        }
    }
}
pub mod utils {
    use super::*;
    pub fn parse_error(reason: impl Into<String>) -> SummarizerError {
        SummarizerError::Parse {
            reason: reason.into(),
        }
    }
    pub fn column_not_found(column: &str) -> SummarizerError {
        SummarizerError::ColumnNotFound {
            column: column.to_string(),
        }
    }
    pub fn invalid_request(reason: impl Into<String>) -> SummarizerError {
        SummarizerError::InvalidRequest {
            reason: reason.into(),
        }
    }
    pub fn chart_binding(chart: &str, binding: &str, reason: impl Into<String>) -> SummarizerError {
        SummarizerError::ChartBinding {
            chart: chart.to_string(),
            binding: binding.to_string(),
            reason: reason.into(),
        }
    }
    pub fn invalid_config(field: &str, value: impl ToString) -> SummarizerError {
        SummarizerError::Config(ConfigError::InvalidValue {
            field: field.to_string(),
            value: value.to_string(),
        })
    }
    pub fn error_severity(error: &SummarizerError) -> ErrorSeverity {
        match error {
            SummarizerError::NoTable | SummarizerError::NoNumericColumns => ErrorSeverity::Info,
            SummarizerError::ColumnNotFound { .. } | SummarizerError::ChartBinding { .. } => {
                ErrorSeverity::Warning
            }
            SummarizerError::Config(_) => ErrorSeverity::Critical,
            _ => ErrorSeverity::Error,
        }
    }
}
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum ErrorSeverity {
    Info,
    Warning,
    Error,
    Critical,
}
impl ErrorSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorSeverity::Info => "INFO",
            ErrorSeverity::Warning => "WARNING",
            ErrorSeverity::Error => "ERROR",
            ErrorSeverity::Critical => "CRITICAL",
        }
    }
    pub fn color_code(&self) -> &'static str {
        match self {
            ErrorSeverity::Info => "\x1b[36m",
            ErrorSeverity::Warning => "\x1b[33m",
            ErrorSeverity::Error => "\x1b[31m",
            ErrorSeverity::Critical => "\x1b[35m",
        }
    }
}
#[derive(Debug, Clone)]
pub struct ErrorReporter {
    pub show_suggestions: bool,
    pub colored_output: bool,
}
impl ErrorReporter {
    pub fn new() -> Self {
        Self {
            show_suggestions: true,
            colored_output: true,
        }
    }
    pub fn plain() -> Self {
        Self {
            show_suggestions: true,
            colored_output: false,
        }
    }
    pub fn report(&self, error: &SummarizerError) -> String {
        let severity = utils::error_severity(error);
        let mut output = String::new();
        if self.colored_output {
            output.push_str(severity.color_code());
        }
        output.push_str(&format!(
            "[{}] {}: {}\n",
            severity.as_str(),
            error.category(),
            error.user_message()
        ));
        if self.colored_output {
            output.push_str("\x1b[0m");
        }
        if self.show_suggestions {
            let suggestions = error.suggestions();
            if !suggestions.is_empty() {
                output.push_str("\nSuggestions:\n");
                for suggestion in suggestions {
                    output.push_str(&format!("  • {suggestion}\n"));
                }
            }
        }
        output
    }
}
impl Default for ErrorReporter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aggregation_errors_are_recoverable_and_prefixed() {
        let err = SummarizerError::AggregationType {
            operation: "mean".to_string(),
            column: "city".to_string(),
            dtype: "str".to_string(),
        };
        assert!(err.is_recoverable());
        assert_eq!(err.category(), "Aggregation");
        assert!(err.user_message().starts_with("Error during aggregation:"));
    }

    #[test]
    fn plain_report_has_no_escape_codes() {
        let report = ErrorReporter::plain().report(&utils::column_not_found("dept"));
        assert!(report.starts_with("[WARNING] Column:"));
        assert!(!report.contains('\x1b'));
        assert!(report.contains("Suggestions:"));
    }

    #[test]
    fn default_report_is_colored_by_severity() {
        let report = ErrorReporter::default().report(&SummarizerError::NoTable);
        assert!(report.starts_with(ErrorSeverity::Info.color_code()));
        assert!(report.contains("\x1b[0m"));
    }

    #[test]
    fn config_errors_are_critical() {
        let err = utils::invalid_config("count_column", "");
        assert_eq!(utils::error_severity(&err), ErrorSeverity::Critical);
        assert!(!err.is_recoverable());
    }
}
