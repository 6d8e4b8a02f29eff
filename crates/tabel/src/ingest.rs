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

use crate::config::SummarizerConfig;
use crate::error::{utils, Result};
use crate::table::Table;
use calamine::{Data, Reader, Xlsx};
use chrono::NaiveDateTime;
use polars::prelude::{Column, CsvReadOptions, DataFrame, SerReader};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::io::Cursor;
use std::path::Path;
use tracing::{debug, info};
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    Csv,
    Xlsx,
}
impl FileKind {
    pub fn from_extension(extension: &str) -> Result<Self> {
        match extension
            .trim()
            .trim_start_matches('.')
            .to_ascii_lowercase()
            .as_str()
        {
            "csv" => Ok(FileKind::Csv),
            "xlsx" => Ok(FileKind::Xlsx),
            other => Err(utils::parse_error(format!(
                "unsupported file type '{other}', expected csv or xlsx"
            ))),
        }
    }
    pub fn from_file_name(name: &str) -> Result<Self> {
        let extension = Path::new(name)
            .extension()
            .and_then(|e| e.to_str())
            .ok_or_else(|| utils::parse_error(format!("'{name}' has no file extension")))?;
        Self::from_extension(extension)
    }
    pub fn extension(&self) -> &'static str {
        match self {
            FileKind::Csv => "csv",
            FileKind::Xlsx => "xlsx",
        }
    }
}
pub fn load_table(
    name: &str,
    bytes: Vec<u8>,
    kind: FileKind,
    config: &SummarizerConfig,
) -> Result<Table> {
    if bytes.is_empty() {
        return Err(utils::parse_error(format!("'{name}' is empty")));
    }
    debug!(name, bytes = bytes.len(), kind = kind.extension(), "Reading upload");
    let frame = match kind {
        FileKind::Csv => read_csv(bytes, config)?,
        FileKind::Xlsx => read_xlsx(bytes)?,
    };
    if frame.width() == 0 {
        return Err(utils::parse_error(format!("'{name}' has no columns")));
    }
    info!(
        name,
        rows = frame.height(),
        columns = frame.width(),
        "Loaded table"
    );
    Ok(Table::new(name, frame).with_source(kind))
}
pub fn load_path<P: AsRef<Path>>(path: P, config: &SummarizerConfig) -> Result<Table> {
    let path = path.as_ref();
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("upload")
        .to_string();
    let kind = FileKind::from_file_name(&name)?;
    let bytes = std::fs::read(path)?;
    load_table(&name, bytes, kind, config)
}
fn read_csv(bytes: Vec<u8>, config: &SummarizerConfig) -> Result<DataFrame> {
    CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(config.infer_schema_rows))
        .into_reader_with_file_handle(Cursor::new(bytes))
        .finish()
        .map_err(|e| utils::parse_error(format!("csv: {e}")))
}
fn read_xlsx(bytes: Vec<u8>) -> Result<DataFrame> {
    let mut workbook: Xlsx<_> = Xlsx::new(Cursor::new(bytes))?;
    let sheet = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| utils::parse_error("workbook has no worksheets"))?;
    let range = workbook.worksheet_range(&sheet)?;
    let mut rows = range.rows();
    let header = rows
        .next()
        .ok_or_else(|| utils::parse_error(format!("worksheet '{sheet}' is empty")))?;
    let names = header_names(header);
    let mut cells: Vec<Vec<Option<&Data>>> = vec![Vec::new(); names.len()];
    for row in rows {
        for (i, column) in cells.iter_mut().enumerate() {
            column.push(row.get(i).filter(|d| !matches!(d, Data::Empty)));
        }
    }
    let columns: Vec<Column> = names
        .iter()
        .zip(cells.iter())
        .map(|(name, values)| sheet_column(name, values))
        .collect();
    Ok(DataFrame::new(columns)?)
}
fn header_names(header: &[Data]) -> Vec<String> {
    let mut seen = HashSet::new();
    header
        .iter()
        .enumerate()
        .map(|(i, cell)| {
            let raw = match cell {
                Data::String(s) => s.trim().to_string(),
                Data::Empty => String::new(),
                other => other.to_string(),
            };
            let base = if raw.is_empty() {
                format!("column_{i}")
            } else {
                raw
            };
            let mut name = base.clone();
            let mut n = 1;
            while !seen.insert(name.clone()) {
                name = format!("{base}_{n}");
                n += 1;
            }
            name
        })
        .collect()
}
/// Narrowest column type that holds every non-empty cell: integral numbers
/// become Int64, other numbers Float64, and anything mixed falls back to text.
fn sheet_column(name: &str, values: &[Option<&Data>]) -> Column {
    let present: Vec<&Data> = values.iter().flatten().copied().collect();
    let all_numbers = present
        .iter()
        .all(|d| matches!(d, Data::Int(_) | Data::Float(_)));
    if all_numbers && !present.is_empty() {
        let integral = present.iter().all(|d| match d {
            Data::Int(_) => true,
            Data::Float(f) => f.fract() == 0.0 && f.abs() < i64::MAX as f64,
            _ => false,
        });
        if integral {
            let data: Vec<Option<i64>> = values
                .iter()
                .map(|cell| match cell {
                    Some(Data::Int(v)) => Some(*v),
                    Some(Data::Float(f)) => Some(*f as i64),
                    _ => None,
                })
                .collect();
            return Column::new(name.into(), data);
        }
        let data: Vec<Option<f64>> = values
            .iter()
            .map(|cell| match cell {
                Some(Data::Int(v)) => Some(*v as f64),
                Some(Data::Float(f)) => Some(*f),
                _ => None,
            })
            .collect();
        return Column::new(name.into(), data);
    }
    if !present.is_empty() && present.iter().all(|d| matches!(d, Data::Bool(_))) {
        let data: Vec<Option<bool>> = values
            .iter()
            .map(|cell| match cell {
                Some(Data::Bool(b)) => Some(*b),
                _ => None,
            })
            .collect();
        return Column::new(name.into(), data);
    }
    if !present.is_empty() && present.iter().all(|d| matches!(d, Data::DateTime(_))) {
        let data: Vec<Option<NaiveDateTime>> = values
            .iter()
            .map(|cell| match cell {
                Some(Data::DateTime(dt)) => dt.as_datetime(),
                _ => None,
            })
            .collect();
        return Column::new(name.into(), data);
    }
    let data: Vec<Option<String>> = values
        .iter()
        .map(|cell| cell.map(|d| d.to_string()))
        .collect();
    Column::new(name.into(), data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SummarizerError;
    use crate::table::ColumnKind;
    use rust_xlsxwriter::{ExcelDateTime, Format, Workbook};
    use std::io::Write;

    fn config() -> SummarizerConfig {
        SummarizerConfig::default()
    }

    #[test]
    fn kind_from_name_is_case_insensitive() {
        assert_eq!(FileKind::from_file_name("Sales.CSV").unwrap(), FileKind::Csv);
        assert_eq!(FileKind::from_file_name("q1.xlsx").unwrap(), FileKind::Xlsx);
        assert!(matches!(
            FileKind::from_file_name("notes.txt"),
            Err(SummarizerError::Parse { .. })
        ));
        assert!(matches!(
            FileKind::from_file_name("README"),
            Err(SummarizerError::Parse { .. })
        ));
    }

    #[test]
    fn csv_upload_infers_column_types() {
        let csv = b"dept,sales,region\nX,10,north\nX,20,south\nY,5,\n".to_vec();
        let table = load_table("sales.csv", csv, FileKind::Csv, &config()).unwrap();
        assert_eq!(table.shape(), (3, 3));
        assert_eq!(table.descriptor("sales").unwrap().kind, ColumnKind::Numeric);
        assert_eq!(table.descriptor("dept").unwrap().kind, ColumnKind::Text);
        assert_eq!(table.column("region").unwrap().null_count(), 1);
        assert_eq!(table.metadata().source, Some(FileKind::Csv));
    }

    #[test]
    fn empty_upload_is_a_parse_error() {
        let err = load_table("empty.csv", Vec::new(), FileKind::Csv, &config()).unwrap_err();
        assert!(matches!(err, SummarizerError::Parse { .. }));
    }

    #[test]
    fn garbage_spreadsheet_is_a_parse_error() {
        let err = load_table(
            "broken.xlsx",
            b"definitely not a zip archive".to_vec(),
            FileKind::Xlsx,
            &config(),
        )
        .unwrap_err();
        assert!(matches!(err, SummarizerError::Parse { .. }));
    }

    #[test]
    fn xlsx_upload_reads_first_sheet() {
        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        sheet.write_string(0, 0, "dept").unwrap();
        sheet.write_string(0, 1, "sales").unwrap();
        sheet.write_string(0, 2, "sales").unwrap();
        sheet.write_string(0, 3, "ratio").unwrap();
        sheet.write_string(1, 0, "X").unwrap();
        sheet.write_number(1, 1, 10.0).unwrap();
        sheet.write_boolean(1, 2, true).unwrap();
        sheet.write_number(1, 3, 0.5).unwrap();
        sheet.write_string(2, 0, "Y").unwrap();
        sheet.write_number(2, 1, 5.0).unwrap();
        sheet.write_boolean(2, 2, false).unwrap();
        sheet.write_number(2, 3, 2.0).unwrap();
        let date = Format::new().set_num_format("yyyy-mm-dd");
        sheet.write_string(0, 4, "when").unwrap();
        sheet
            .write_datetime_with_format(1, 4, ExcelDateTime::from_ymd(2024, 1, 2).unwrap(), &date)
            .unwrap();
        sheet
            .write_datetime_with_format(2, 4, ExcelDateTime::from_ymd(2024, 3, 9).unwrap(), &date)
            .unwrap();
        sheet.write_string(1, 5, "first").unwrap();
        sheet.write_string(2, 5, "second").unwrap();
        let bytes = workbook.save_to_buffer().unwrap();

        let table = load_table("book.xlsx", bytes, FileKind::Xlsx, &config()).unwrap();
        assert_eq!(
            table.column_names(),
            vec!["dept", "sales", "sales_1", "ratio", "when", "column_5"]
        );
        assert_eq!(table.row_count(), 2);
        assert_eq!(
            table.column("sales").unwrap().dtype(),
            &polars::prelude::DataType::Int64
        );
        assert_eq!(
            table.column("ratio").unwrap().dtype(),
            &polars::prelude::DataType::Float64
        );
        assert_eq!(table.descriptor("sales_1").unwrap().kind, ColumnKind::Boolean);
        assert_eq!(table.descriptor("when").unwrap().kind, ColumnKind::Temporal);
        assert_eq!(table.column("when").unwrap().null_count(), 0);
        assert_eq!(table.descriptor("column_5").unwrap().kind, ColumnKind::Text);
    }

    #[test]
    fn load_path_uses_file_name() {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        writeln!(file, "city\nA\nB").unwrap();
        let table = load_path(file.path(), &config()).unwrap();
        assert!(table.name().ends_with(".csv"));
        assert_eq!(table.row_count(), 2);
    }
}
