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

use crate::chart::{self, ChartBindings, ChartKind, ChartOutcome, ChartSpec, ChartWarning};
use crate::config::SummarizerConfig;
use crate::error::{utils, ErrorSeverity, Result, SummarizerError};
use crate::ingest::{self, FileKind};
use crate::insights;
use crate::summarize::{self, GroupByRequest, ValueCountRequest};
use crate::table::{ColumnClassification, Table};
use serde::Serialize;
use tracing::{info, warn};
/// Non-fatal message shown next to the widget that caused it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub severity: ErrorSeverity,
    pub message: String,
}
impl Notice {
    pub fn from_error(error: &SummarizerError) -> Self {
        Self {
            severity: utils::error_severity(error),
            message: error.user_message(),
        }
    }
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            severity: ErrorSeverity::Info,
            message: message.into(),
        }
    }
    pub fn from_warning(warning: ChartWarning) -> Self {
        Self {
            severity: ErrorSeverity::Warning,
            message: warning.message().to_string(),
        }
    }
}
#[derive(Debug, Clone)]
pub struct ValueCountView {
    pub result: Table,
    pub charts: Vec<ChartSpec>,
}
/// Holds the last uploaded table for one user; every request recomputes
/// from it.
#[derive(Debug, Clone, Default)]
pub struct Session {
    config: SummarizerConfig,
    table: Option<Table>,
}
impl Session {
    pub fn new(config: SummarizerConfig) -> Self {
        Self {
            config,
            table: None,
        }
    }
    pub fn config(&self) -> &SummarizerConfig {
        &self.config
    }
    pub fn table(&self) -> Result<&Table> {
        self.table.as_ref().ok_or(SummarizerError::NoTable)
    }
    pub fn has_table(&self) -> bool {
        self.table.is_some()
    }
    /// Replaces the current table. A failed upload leaves the session empty.
    pub fn upload(&mut self, name: &str, bytes: Vec<u8>) -> Result<&Table> {
        self.table = None;
        let kind = FileKind::from_file_name(name)?;
        let table = ingest::load_table(name, bytes, kind, &self.config)?;
        info!(name, shape = ?table.shape(), "Session table replaced");
        Ok(&*self.table.insert(table))
    }
    pub fn clear(&mut self) {
        self.table = None;
    }
    pub fn classify(&self) -> Result<ColumnClassification> {
        Ok(self.table()?.classify())
    }
    pub fn preview(&self, rows: usize, from_end: bool) -> Result<Table> {
        let table = self.table()?;
        let rows = rows.min(self.config.max_preview_rows);
        Ok(if from_end {
            table.tail(rows)
        } else {
            table.head(rows)
        })
    }
    pub fn describe(&self) -> Result<Table> {
        insights::describe(self.table()?, &self.config)
    }
    pub fn dtypes(&self) -> Result<Table> {
        insights::dtypes(self.table()?)
    }
    pub fn value_counts(&self, column: &str, limit: usize) -> Result<ValueCountView> {
        let table = self.table()?;
        let result = summarize::value_counts(
            table,
            &ValueCountRequest::new(column, limit),
            &self.config,
        )?;
        let charts = chart::value_count_charts(&result, column, &self.config)?;
        Ok(ValueCountView { result, charts })
    }
    pub fn group_by(&self, request: &GroupByRequest) -> Result<Table> {
        summarize::group_by_aggregate(self.table()?, request, &self.config)
    }
    pub fn chart(
        &self,
        result: &Table,
        kind: ChartKind,
        bindings: &ChartBindings,
    ) -> Result<ChartOutcome> {
        chart::derive_chart_spec(result, kind, bindings, &self.config)
    }
    /// Confirms a good upload with an info notice.
    pub fn run_upload(&mut self, name: &str, bytes: Vec<u8>) -> std::result::Result<Notice, Notice> {
        self.upload(name, bytes)
            .map(|_| Notice::info("File is uploaded successfully"))
            .map_err(|e| notice(&e))
    }
    pub fn run_value_counts(
        &self,
        column: &str,
        limit: usize,
    ) -> std::result::Result<ValueCountView, Notice> {
        self.value_counts(column, limit).map_err(|e| notice(&e))
    }
    pub fn run_group_by(&self, request: &GroupByRequest) -> std::result::Result<Table, Notice> {
        self.group_by(request).map_err(|e| notice(&e))
    }
    /// A withheld chart surfaces as a warning notice, like a failure would.
    pub fn run_chart(
        &self,
        result: &Table,
        kind: ChartKind,
        bindings: &ChartBindings,
    ) -> std::result::Result<ChartSpec, Notice> {
        match self.chart(result, kind, bindings) {
            Ok(ChartOutcome::Ready(spec)) => Ok(spec),
            Ok(ChartOutcome::Withheld(warning)) => Err(Notice::from_warning(warning)),
            Err(e) => Err(notice(&e)),
        }
    }
}
fn notice(error: &SummarizerError) -> Notice {
    warn!(category = error.category(), error = %error, "Request failed");
    Notice::from_error(error)
}
