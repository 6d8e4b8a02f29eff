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
use crate::error::{utils, Result, SummarizerError};
use crate::table::{ColumnDescriptor, Table};
use itertools::Itertools;
use polars::error::PolarsError;
use polars::prelude::{col, len, Expr, IdxSize, IntoLazy, SortMultipleOptions};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, warn};
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueCountRequest {
    pub column: String,
    pub limit: usize,
}
impl ValueCountRequest {
    pub fn new(column: impl Into<String>, limit: usize) -> Self {
        Self {
            column: column.into(),
            limit,
        }
    }
}
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AggregateOp {
    Sum,
    Max,
    Min,
    Mean,
    Median,
    Count,
}
impl AggregateOp {
    pub const ALL: [AggregateOp; 6] = [
        AggregateOp::Sum,
        AggregateOp::Max,
        AggregateOp::Min,
        AggregateOp::Mean,
        AggregateOp::Median,
        AggregateOp::Count,
    ];
    pub fn as_str(&self) -> &'static str {
        match self {
            AggregateOp::Sum => "sum",
            AggregateOp::Max => "max",
            AggregateOp::Min => "min",
            AggregateOp::Mean => "mean",
            AggregateOp::Median => "median",
            AggregateOp::Count => "count",
        }
    }
    pub fn requires_numeric(&self) -> bool {
        matches!(self, AggregateOp::Sum | AggregateOp::Mean | AggregateOp::Median)
    }
    pub fn accepts(&self, column: &ColumnDescriptor) -> bool {
        match self {
            AggregateOp::Count => true,
            AggregateOp::Min | AggregateOp::Max => column.kind.is_orderable(),
            _ => column.is_numeric(),
        }
    }
    fn expr(&self, column: &str) -> Expr {
        let c = col(column);
        match self {
            AggregateOp::Sum => c.sum(),
            AggregateOp::Max => c.max(),
            AggregateOp::Min => c.min(),
            AggregateOp::Mean => c.mean(),
            AggregateOp::Median => c.median(),
            AggregateOp::Count => c.count(),
        }
    }
}
impl fmt::Display for AggregateOp {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
impl FromStr for AggregateOp {
    type Err = SummarizerError;
    fn from_str(s: &str) -> Result<Self> {
        AggregateOp::ALL
            .into_iter()
            .find(|op| op.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                utils::invalid_request(format!(
                    "unknown operation '{s}', expected one of {}",
                    AggregateOp::ALL.iter().join(", ")
                ))
            })
    }
}
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupByRequest {
    pub group_columns: Vec<String>,
    pub operation_column: String,
    pub operation: AggregateOp,
}
impl GroupByRequest {
    pub fn new(
        group_columns: impl IntoIterator<Item = impl Into<String>>,
        operation_column: impl Into<String>,
        operation: AggregateOp,
    ) -> Self {
        Self {
            group_columns: group_columns.into_iter().map(Into::into).collect(),
            operation_column: operation_column.into(),
            operation,
        }
    }
}
/// Frequency of each distinct non-null value of `request.column`, most
/// frequent first, truncated to `request.limit` rows.
pub fn value_counts(
    table: &Table,
    request: &ValueCountRequest,
    config: &SummarizerConfig,
) -> Result<Table> {
    if request.limit == 0 {
        return Err(utils::invalid_request("row limit must be at least 1"));
    }
    let present = present_values(table, &request.column)?;
    let count_name = count_column_name(&request.column, config);
    let limit = IdxSize::try_from(request.limit).unwrap_or(IdxSize::MAX);
    let frame = table
        .frame()
        .clone()
        .lazy()
        .filter(present)
        .group_by_stable([col(request.column.as_str())])
        .agg([len().alias(count_name.as_str())])
        .sort_by_exprs(
            [col(count_name.as_str())],
            SortMultipleOptions::default()
                .with_order_descending(true)
                .with_maintain_order(true),
        )
        .limit(limit)
        .collect()?;
    debug!(
        table = table.name(),
        column = %request.column,
        limit = request.limit,
        rows = frame.height(),
        "Computed value counts"
    );
    Ok(table.derive("value_counts", frame))
}
/// One row per distinct, fully non-null key tuple over `group_columns`,
/// ordered by key, with the reduced `operation_column` in the configured
/// aggregate column.
pub fn group_by_aggregate(
    table: &Table,
    request: &GroupByRequest,
    config: &SummarizerConfig,
) -> Result<Table> {
    if request.group_columns.is_empty() {
        return Err(utils::invalid_request(
            "select at least one column to group by",
        ));
    }
    let mut complete_keys = Vec::with_capacity(request.group_columns.len());
    for name in &request.group_columns {
        complete_keys.push(present_values(table, name)?);
    }
    let target = table.descriptor(&request.operation_column)?;
    if !request.operation.accepts(&target) {
        warn!(
            operation = %request.operation,
            column = %target.name,
            dtype = %target.dtype,
            "Rejected aggregation for incompatible column type"
        );
        return Err(SummarizerError::AggregationType {
            operation: request.operation.to_string(),
            column: target.name,
            dtype: target.dtype,
        });
    }
    let keys: Vec<Expr> = request
        .group_columns
        .iter()
        .map(|c| col(c.as_str()))
        .collect();
    let complete_keys = complete_keys
        .into_iter()
        .reduce(|acc, e| acc.and(e))
        .ok_or_else(|| utils::invalid_request("select at least one column to group by"))?;
    let frame = table
        .frame()
        .clone()
        .lazy()
        .filter(complete_keys)
        .group_by_stable(keys.clone())
        .agg([request
            .operation
            .expr(&request.operation_column)
            .alias(config.aggregate_column.as_str())])
        .sort_by_exprs(
            keys,
            SortMultipleOptions::default().with_maintain_order(true),
        )
        .collect()
        .map_err(|e| classify_engine_error(e, request, &target))?;
    debug!(
        table = table.name(),
        groups = frame.height(),
        operation = %request.operation,
        "Computed group-by aggregate"
    );
    Ok(table.derive("grouped", frame))
}
/// Row filter keeping the rows where `column` holds a value; NaN counts as
/// missing in float columns.
fn present_values(table: &Table, column: &str) -> Result<Expr> {
    let present = col(column).is_not_null();
    Ok(if table.column(column)?.dtype().is_float() {
        present.and(col(column).is_not_nan())
    } else {
        present
    })
}
pub(crate) fn count_column_name(column: &str, config: &SummarizerConfig) -> String {
    if column == config.count_column {
        format!("{}_{}", config.count_column, config.count_column)
    } else {
        config.count_column.clone()
    }
}
fn classify_engine_error(
    error: PolarsError,
    request: &GroupByRequest,
    target: &ColumnDescriptor,
) -> SummarizerError {
    match error {
        PolarsError::InvalidOperation(_) | PolarsError::SchemaMismatch(_) => {
            SummarizerError::AggregationType {
                operation: request.operation.to_string(),
                column: target.name.clone(),
                dtype: target.dtype.clone(),
            }
        }
        other => SummarizerError::Engine(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::df;
    use polars::prelude::DataType;

    fn counts_of(table: &Table, column: &str) -> Vec<i64> {
        table
            .column(column)
            .unwrap()
            .cast(&DataType::Int64)
            .unwrap()
            .as_materialized_series()
            .i64()
            .unwrap()
            .into_iter()
            .map(|v| v.unwrap())
            .collect()
    }

    fn strings_of(table: &Table, column: &str) -> Vec<String> {
        table
            .column(column)
            .unwrap()
            .as_materialized_series()
            .str()
            .unwrap()
            .into_iter()
            .map(|v| v.unwrap().to_string())
            .collect()
    }

    fn sales() -> Table {
        let frame = df!(
            "dept" => ["X", "X", "Y", "Y", "Z"],
            "region" => [Some("n"), Some("s"), Some("n"), None, Some("s")],
            "sales" => [10i64, 20, 5, 7, 1],
            "label" => ["a", "b", "c", "d", "e"]
        )
        .unwrap();
        Table::new("sales", frame)
    }

    #[test]
    fn op_names_round_trip_through_from_str() {
        for op in AggregateOp::ALL {
            assert_eq!(op.as_str().parse::<AggregateOp>().unwrap(), op);
        }
        assert_eq!(" Mean ".parse::<AggregateOp>().unwrap(), AggregateOp::Mean);
        assert!(matches!(
            "mode".parse::<AggregateOp>(),
            Err(SummarizerError::InvalidRequest { .. })
        ));
    }

    #[test]
    fn value_counts_drop_nulls() {
        let table = sales();
        let config = SummarizerConfig::default();
        let result = value_counts(&table, &ValueCountRequest::new("region", 10), &config).unwrap();
        assert_eq!(result.column_names(), vec!["region", "count"]);
        assert_eq!(counts_of(&result, "count").iter().sum::<i64>(), 4);
    }

    #[test]
    fn value_counts_treat_nan_as_missing() {
        let frame = df!("f" => [Some(1.0f64), Some(f64::NAN), None, Some(f64::NAN)]).unwrap();
        let table = Table::new("floats", frame);
        let result = value_counts(
            &table,
            &ValueCountRequest::new("f", 10),
            &SummarizerConfig::default(),
        )
        .unwrap();
        assert_eq!(result.row_count(), 1);
        assert_eq!(counts_of(&result, "count"), vec![1]);
    }

    #[test]
    fn group_by_drops_nan_keys() {
        let frame = df!(
            "band" => [Some(1.0f64), Some(f64::NAN), Some(1.0), None, Some(2.0)],
            "sales" => [10i64, 20, 5, 7, 1]
        )
        .unwrap();
        let table = Table::new("bands", frame);
        let request = GroupByRequest::new(["band"], "sales", AggregateOp::Sum);
        let result = group_by_aggregate(&table, &request, &SummarizerConfig::default()).unwrap();
        assert_eq!(result.row_count(), 2);
        assert_eq!(counts_of(&result, "newcol"), vec![15, 1]);
    }

    #[test]
    fn value_counts_reject_zero_limit() {
        let err = value_counts(
            &sales(),
            &ValueCountRequest::new("dept", 0),
            &SummarizerConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(err, SummarizerError::InvalidRequest { .. }));
    }

    #[test]
    fn value_counts_on_count_column_avoid_name_clash() {
        let frame = df!("count" => [1i64, 1, 2]).unwrap();
        let table = Table::new("clash", frame);
        let result = value_counts(
            &table,
            &ValueCountRequest::new("count", 5),
            &SummarizerConfig::default(),
        )
        .unwrap();
        assert_eq!(result.column_names(), vec!["count", "count_count"]);
        assert_eq!(counts_of(&result, "count_count"), vec![2, 1]);
    }

    #[test]
    fn group_by_orders_keys_and_names_new_column() {
        let request = GroupByRequest::new(["dept"], "sales", AggregateOp::Max);
        let result = group_by_aggregate(&sales(), &request, &SummarizerConfig::default()).unwrap();
        assert_eq!(result.column_names(), vec!["dept", "newcol"]);
        assert_eq!(strings_of(&result, "dept"), vec!["X", "Y", "Z"]);
        assert_eq!(counts_of(&result, "newcol"), vec![20, 7, 1]);
    }

    #[test]
    fn group_by_drops_rows_with_null_keys() {
        let request = GroupByRequest::new(["region"], "sales", AggregateOp::Sum);
        let result = group_by_aggregate(&sales(), &request, &SummarizerConfig::default()).unwrap();
        assert_eq!(strings_of(&result, "region"), vec!["n", "s"]);
        assert_eq!(counts_of(&result, "newcol"), vec![15, 21]);
    }

    #[test]
    fn multi_column_keys_are_unique() {
        let request = GroupByRequest::new(["dept", "region"], "sales", AggregateOp::Count);
        let result = group_by_aggregate(&sales(), &request, &SummarizerConfig::default()).unwrap();
        assert_eq!(result.row_count(), 4);
        assert_eq!(counts_of(&result, "newcol"), vec![1, 1, 1, 1]);
    }

    #[test]
    fn min_and_max_accept_text() {
        let request = GroupByRequest::new(["dept"], "label", AggregateOp::Min);
        let result = group_by_aggregate(&sales(), &request, &SummarizerConfig::default()).unwrap();
        assert_eq!(strings_of(&result, "newcol"), vec!["a", "c", "e"]);
    }

    #[test]
    fn median_of_text_is_a_type_error() {
        let request = GroupByRequest::new(["dept"], "label", AggregateOp::Median);
        let err = group_by_aggregate(&sales(), &request, &SummarizerConfig::default()).unwrap_err();
        assert!(matches!(
            err,
            SummarizerError::AggregationType { ref operation, ref column, .. }
                if operation == "median" && column == "label"
        ));
    }

    #[test]
    fn empty_group_columns_are_rejected() {
        let request = GroupByRequest::new(Vec::<String>::new(), "sales", AggregateOp::Sum);
        let err = group_by_aggregate(&sales(), &request, &SummarizerConfig::default()).unwrap_err();
        assert!(matches!(err, SummarizerError::InvalidRequest { .. }));
    }

    #[test]
    fn stale_operation_column_is_not_found() {
        let request = GroupByRequest::new(["dept"], "revenue", AggregateOp::Sum);
        let err = group_by_aggregate(&sales(), &request, &SummarizerConfig::default()).unwrap_err();
        assert!(matches!(err, SummarizerError::ColumnNotFound { ref column } if column == "revenue"));
    }
}
