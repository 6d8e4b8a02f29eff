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
use crate::error::{Result, SummarizerError};
use crate::table::Table;
use polars::prelude::{
    ChunkAgg, ChunkQuantile, ChunkVar, Column, DataFrame, DataType, QuantileMethod,
};
use rayon::prelude::*;
use tracing::debug;
/// Summary statistics of every numeric column: count, mean, std, min, the
/// configured percentiles and max, one row per statistic.
pub fn describe(table: &Table, config: &SummarizerConfig) -> Result<Table> {
    let numeric = table.classify().numeric;
    if numeric.is_empty() {
        return Err(SummarizerError::NoNumericColumns);
    }
    let mut labels: Vec<String> = ["count", "mean", "std", "min"]
        .into_iter()
        .map(String::from)
        .collect();
    labels.extend(config.describe_percentiles.iter().map(|p| percentile_label(*p)));
    labels.push("max".to_string());
    let stats: Vec<Column> = numeric
        .par_iter()
        .map(|name| {
            let values = numeric_stats(table.column(name)?, &config.describe_percentiles)?;
            Ok(Column::new(name.as_str().into(), values))
        })
        .collect::<Result<_>>()?;
    let mut label = "statistic".to_string();
    while table.has_column(&label) {
        label = format!("{label}_statistic");
    }
    let mut columns = Vec::with_capacity(stats.len() + 1);
    columns.push(Column::new(label.as_str().into(), labels));
    columns.extend(stats);
    let frame = DataFrame::new(columns)?;
    debug!(table = table.name(), columns = numeric.len(), "Described numeric columns");
    Ok(table.derive("describe", frame))
}
/// Column names alongside their engine data types, in table order.
pub fn dtypes(table: &Table) -> Result<Table> {
    let descriptors = table.descriptors();
    let names: Vec<&str> = descriptors.iter().map(|d| d.name.as_str()).collect();
    let types: Vec<&str> = descriptors.iter().map(|d| d.dtype.as_str()).collect();
    let frame = DataFrame::new(vec![
        Column::new("column".into(), names),
        Column::new("dtype".into(), types),
    ])?;
    Ok(table.derive("dtypes", frame))
}
fn numeric_stats(column: &Column, percentiles: &[f64]) -> Result<Vec<Option<f64>>> {
    let cast = column.cast(&DataType::Float64)?;
    let values = cast.as_materialized_series().f64()?;
    let present = values.len() - values.null_count();
    let mut stats = vec![
        Some(present as f64),
        values.mean(),
        values.std(1),
        values.min(),
    ];
    for p in percentiles {
        stats.push(values.quantile(*p, QuantileMethod::Linear)?);
    }
    stats.push(values.max());
    Ok(stats)
}
fn percentile_label(p: f64) -> String {
    let pct = (p * 100.0 * 1e6).round() / 1e6;
    format!("{pct}%")
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::df;

    fn stat(table: &Table, column: &str, row: usize) -> Option<f64> {
        table
            .column(column)
            .unwrap()
            .as_materialized_series()
            .f64()
            .unwrap()
            .get(row)
    }

    #[test]
    fn describe_reports_pandas_style_rows() {
        let frame = df!(
            "city" => ["A", "B", "C", "D"],
            "sales" => [Some(1i64), Some(2), Some(3), None],
            "ratio" => [0.5f64, 1.5, 2.5, 3.5]
        )
        .unwrap();
        let table = Table::new("shop", frame);
        let summary = describe(&table, &SummarizerConfig::default()).unwrap();
        assert_eq!(summary.column_names(), vec!["statistic", "sales", "ratio"]);
        assert_eq!(summary.row_count(), 8);
        let labels: Vec<String> = summary
            .column("statistic")
            .unwrap()
            .as_materialized_series()
            .str()
            .unwrap()
            .into_iter()
            .map(|v| v.unwrap().to_string())
            .collect();
        assert_eq!(labels, vec!["count", "mean", "std", "min", "25%", "50%", "75%", "max"]);
        assert_eq!(stat(&summary, "sales", 0), Some(3.0));
        assert_eq!(stat(&summary, "sales", 1), Some(2.0));
        assert_eq!(stat(&summary, "sales", 2), Some(1.0));
        assert_eq!(stat(&summary, "sales", 5), Some(2.0));
        assert_eq!(stat(&summary, "ratio", 7), Some(3.5));
    }

    #[test]
    fn describe_renames_label_column_on_clash() {
        let frame = df!("statistic" => [1i64, 2, 3]).unwrap();
        let summary = describe(&Table::new("t", frame), &SummarizerConfig::default()).unwrap();
        assert_eq!(summary.column_names(), vec!["statistic_statistic", "statistic"]);
        assert_eq!(stat(&summary, "statistic", 1), Some(2.0));
    }

    #[test]
    fn describe_without_numeric_columns_fails() {
        let frame = df!("city" => ["A", "B"]).unwrap();
        let err = describe(&Table::new("t", frame), &SummarizerConfig::default()).unwrap_err();
        assert!(matches!(err, SummarizerError::NoNumericColumns));
    }

    #[test]
    fn dtypes_list_every_column() {
        let frame = df!("city" => ["A"], "sales" => [1i64]).unwrap();
        let types = dtypes(&Table::new("t", frame)).unwrap();
        assert_eq!(types.row_count(), 2);
        assert_eq!(types.column_names(), vec!["column", "dtype"]);
    }

    #[test]
    fn percentile_labels_drop_float_noise() {
        assert_eq!(percentile_label(0.25), "25%");
        assert_eq!(percentile_label(0.333), "33.3%");
    }
}
