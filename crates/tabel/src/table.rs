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

use crate::error::{utils, Result};
use crate::ingest::FileKind;
use chrono::{DateTime, Utc};
use polars::prelude::{Column, DataFrame, DataType};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TableId(String);
impl TableId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}
impl Default for TableId {
    fn default() -> Self {
        Self::new()
    }
}
impl fmt::Display for TableId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableMetadata {
    pub id: TableId,
    pub name: String,
    pub source: Option<FileKind>,
    pub loaded_at: DateTime<Utc>,
}
/// Coarse type of a column, as far as chart axes and aggregations care.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum ColumnKind {
    Numeric,
    Boolean,
    Temporal,
    Text,
    Other,
}
impl ColumnKind {
    pub fn of(dtype: &DataType) -> Self {
        match dtype {
            DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float32
            | DataType::Float64 => ColumnKind::Numeric,
            DataType::Boolean => ColumnKind::Boolean,
            DataType::String => ColumnKind::Text,
            dt if dt.is_temporal() => ColumnKind::Temporal,
            _ => ColumnKind::Other,
        }
    }
    pub fn is_numeric(&self) -> bool {
        matches!(self, ColumnKind::Numeric)
    }
    /// Whether min/max have a meaningful order over this kind.
    pub fn is_orderable(&self) -> bool {
        !matches!(self, ColumnKind::Other)
    }
}
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnDescriptor {
    pub name: String,
    pub kind: ColumnKind,
    pub dtype: String,
}
impl ColumnDescriptor {
    fn from_column(column: &Column) -> Self {
        Self {
            name: column.name().to_string(),
            kind: ColumnKind::of(column.dtype()),
            dtype: column.dtype().to_string(),
        }
    }
    pub fn is_numeric(&self) -> bool {
        self.kind.is_numeric()
    }
}
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnClassification {
    pub numeric: Vec<String>,
    pub all: Vec<String>,
}
impl ColumnClassification {
    pub fn is_numeric(&self, name: &str) -> bool {
        self.numeric.iter().any(|n| n == name)
    }
    pub fn contains(&self, name: &str) -> bool {
        self.all.iter().any(|n| n == name)
    }
}
#[derive(Debug, Clone)]
pub struct Table {
    frame: DataFrame,
    metadata: TableMetadata,
}
impl Table {
    pub fn new(name: impl Into<String>, frame: DataFrame) -> Self {
        Self {
            frame,
            metadata: TableMetadata {
                id: TableId::new(),
                name: name.into(),
                source: None,
                loaded_at: Utc::now(),
            },
        }
    }
    pub fn with_source(mut self, source: FileKind) -> Self {
        self.metadata.source = Some(source);
        self
    }
    /// A new table computed from this one, named after its origin.
    pub fn derive(&self, suffix: &str, frame: DataFrame) -> Table {
        Table::new(format!("{}_{suffix}", self.metadata.name), frame)
    }
    pub fn frame(&self) -> &DataFrame {
        &self.frame
    }
    pub fn into_frame(self) -> DataFrame {
        self.frame
    }
    pub fn metadata(&self) -> &TableMetadata {
        &self.metadata
    }
    pub fn name(&self) -> &str {
        &self.metadata.name
    }
    pub fn shape(&self) -> (usize, usize) {
        self.frame.shape()
    }
    pub fn row_count(&self) -> usize {
        self.frame.height()
    }
    pub fn column_count(&self) -> usize {
        self.frame.width()
    }
    pub fn shape_sentence(&self) -> String {
        let (rows, cols) = self.shape();
        format!("There are {rows} rows and {cols} columns in the dataset")
    }
    pub fn column_names(&self) -> Vec<String> {
        self.frame
            .get_columns()
            .iter()
            .map(|c| c.name().to_string())
            .collect()
    }
    pub fn has_column(&self, name: &str) -> bool {
        self.frame.get_columns().iter().any(|c| c.name().as_str() == name)
    }
    pub fn column(&self, name: &str) -> Result<&Column> {
        self.frame
            .column(name)
            .map_err(|_| utils::column_not_found(name))
    }
    pub fn descriptor(&self, name: &str) -> Result<ColumnDescriptor> {
        self.column(name).map(ColumnDescriptor::from_column)
    }
    pub fn descriptors(&self) -> Vec<ColumnDescriptor> {
        self.frame
            .get_columns()
            .iter()
            .map(ColumnDescriptor::from_column)
            .collect()
    }
    pub fn classify(&self) -> ColumnClassification {
        classify_columns(self)
    }
    pub fn head(&self, rows: usize) -> Table {
        let rows = self.clamp_rows(rows);
        self.derive("head", self.frame.head(Some(rows)))
    }
    pub fn tail(&self, rows: usize) -> Table {
        let rows = self.clamp_rows(rows);
        self.derive("tail", self.frame.tail(Some(rows)))
    }
    fn clamp_rows(&self, rows: usize) -> usize {
        rows.clamp(1, self.row_count().max(1))
    }
}
pub fn classify_columns(table: &Table) -> ColumnClassification {
    let mut classification = ColumnClassification::default();
    for descriptor in table.descriptors() {
        if descriptor.is_numeric() {
            classification.numeric.push(descriptor.name.clone());
        }
        classification.all.push(descriptor.name);
    }
    classification
}
