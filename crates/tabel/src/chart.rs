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
use crate::summarize;
use crate::table::{ColumnClassification, ColumnKind, Table};
use itertools::Itertools;
use polars::prelude::DataType;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use tracing::{debug, warn};
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartKind {
    Line,
    Bar,
    Scatter,
    Pie,
    Sunburst,
}
impl ChartKind {
    pub const ALL: [ChartKind; 5] = [
        ChartKind::Line,
        ChartKind::Bar,
        ChartKind::Scatter,
        ChartKind::Pie,
        ChartKind::Sunburst,
    ];
    pub fn as_str(&self) -> &'static str {
        match self {
            ChartKind::Line => "line",
            ChartKind::Bar => "bar",
            ChartKind::Scatter => "scatter",
            ChartKind::Pie => "pie",
            ChartKind::Sunburst => "sunburst",
        }
    }
    pub fn rules(&self) -> &'static [ChannelRule] {
        match self {
            ChartKind::Line | ChartKind::Bar => CARTESIAN_RULES,
            ChartKind::Scatter => SCATTER_RULES,
            ChartKind::Pie => PIE_RULES,
            ChartKind::Sunburst => SUNBURST_RULES,
        }
    }
}
impl fmt::Display for ChartKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
impl FromStr for ChartKind {
    type Err = SummarizerError;
    fn from_str(s: &str) -> Result<Self> {
        ChartKind::ALL
            .into_iter()
            .find(|k| k.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                utils::invalid_request(format!(
                    "unknown chart '{s}', expected one of {}",
                    ChartKind::ALL.iter().join(", ")
                ))
            })
    }
}
/// Visual channel a result column can be bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    X,
    Y,
    Color,
    Facet,
    Size,
    /// Count labels; only the default value-count charts bind it.
    Text,
    Names,
    Values,
    Path,
}
impl Channel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::X => "x",
            Channel::Y => "y",
            Channel::Color => "color",
            Channel::Facet => "facet",
            Channel::Size => "size",
            Channel::Text => "text",
            Channel::Names => "names",
            Channel::Values => "values",
            Channel::Path => "path",
        }
    }
}
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelRule {
    pub channel: Channel,
    pub required: bool,
    pub numeric: bool,
}
const fn rule(channel: Channel, required: bool, numeric: bool) -> ChannelRule {
    ChannelRule {
        channel,
        required,
        numeric,
    }
}
const CARTESIAN_RULES: &[ChannelRule] = &[
    rule(Channel::X, true, false),
    rule(Channel::Y, true, true),
    rule(Channel::Color, false, false),
    rule(Channel::Facet, false, false),
];
const SCATTER_RULES: &[ChannelRule] = &[
    rule(Channel::X, true, true),
    rule(Channel::Y, true, true),
    rule(Channel::Color, false, false),
    rule(Channel::Size, false, true),
];
const PIE_RULES: &[ChannelRule] = &[
    rule(Channel::Names, true, false),
    rule(Channel::Values, true, true),
];
// Sunburst values fall back to the aggregate column, so they are not required here.
const SUNBURST_RULES: &[ChannelRule] = &[
    rule(Channel::Path, true, false),
    rule(Channel::Values, false, true),
];
/// Raw widget selections for a chart; channels the chosen kind does not use
/// are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChartBindings {
    pub x: Option<String>,
    pub y: Option<String>,
    pub color: Option<String>,
    pub facet: Option<String>,
    pub size: Option<String>,
    pub names: Option<String>,
    pub values: Option<String>,
    pub path: Vec<String>,
}
impl ChartBindings {
    pub fn get(&self, channel: Channel) -> Option<&str> {
        let slot = match channel {
            Channel::X => &self.x,
            Channel::Y => &self.y,
            Channel::Color => &self.color,
            Channel::Facet => &self.facet,
            Channel::Size => &self.size,
            Channel::Names => &self.names,
            Channel::Values => &self.values,
            Channel::Text | Channel::Path => return None,
        };
        slot.as_deref().filter(|s| !s.is_empty())
    }
    pub fn set(&mut self, channel: Channel, column: Option<String>) {
        let slot = match channel {
            Channel::X => &mut self.x,
            Channel::Y => &mut self.y,
            Channel::Color => &mut self.color,
            Channel::Facet => &mut self.facet,
            Channel::Size => &mut self.size,
            Channel::Text => return,
            Channel::Names => &mut self.names,
            Channel::Values => &mut self.values,
            Channel::Path => {
                self.path = column.into_iter().collect();
                return;
            }
        };
        *slot = column;
    }
    pub fn xy(x: impl Into<String>, y: impl Into<String>) -> Self {
        Self {
            x: Some(x.into()),
            y: Some(y.into()),
            ..Self::default()
        }
    }
    pub fn pie(names: impl Into<String>, values: impl Into<String>) -> Self {
        Self {
            names: Some(names.into()),
            values: Some(values.into()),
            ..Self::default()
        }
    }
    pub fn sunburst(path: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            path: path.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }
}
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChartSpec {
    pub kind: ChartKind,
    pub mappings: BTreeMap<Channel, String>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub path: Vec<String>,
}
impl ChartSpec {
    pub fn get(&self, channel: Channel) -> Option<&str> {
        self.mappings.get(&channel).map(String::as_str)
    }
    /// Columns the chart reads, in first-use order.
    pub fn columns(&self) -> Vec<&str> {
        self.path
            .iter()
            .map(String::as_str)
            .chain(self.mappings.values().map(String::as_str))
            .unique()
            .collect()
    }
    /// JSON hand-off for the charting library: the bindings plus the bound
    /// columns of `table`, column-major.
    pub fn to_payload(&self, table: &Table) -> Result<Value> {
        let mut data = Map::new();
        for name in self.columns() {
            data.insert(name.to_string(), column_values(table, name)?);
        }
        Ok(json!({
            "kind": self.kind,
            "mappings": self.mappings,
            "path": self.path,
            "data": data,
        }))
    }
}
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChartWarning {
    EmptyPath,
}
impl ChartWarning {
    pub fn message(&self) -> &'static str {
        match self {
            ChartWarning::EmptyPath => "Please select at least one column for the sunburst path.",
        }
    }
}
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChartOutcome {
    Ready(ChartSpec),
    Withheld(ChartWarning),
}
impl ChartOutcome {
    pub fn spec(&self) -> Option<&ChartSpec> {
        match self {
            ChartOutcome::Ready(spec) => Some(spec),
            ChartOutcome::Withheld(_) => None,
        }
    }
}
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AxisOption {
    pub channel: Channel,
    pub required: bool,
    pub candidates: Vec<String>,
}
/// Candidate columns per channel of `kind`; numeric channels only offer
/// numeric columns.
pub fn axis_options(result: &Table, kind: ChartKind) -> Vec<AxisOption> {
    let classes = result.classify();
    kind.rules()
        .iter()
        .map(|rule| AxisOption {
            channel: rule.channel,
            required: rule.required,
            candidates: if rule.numeric {
                classes.numeric.clone()
            } else {
                classes.all.clone()
            },
        })
        .collect()
}
pub fn derive_chart_spec(
    result: &Table,
    kind: ChartKind,
    bindings: &ChartBindings,
    config: &SummarizerConfig,
) -> Result<ChartOutcome> {
    let classes = result.classify();
    let mut spec = ChartSpec {
        kind,
        mappings: BTreeMap::new(),
        path: Vec::new(),
    };
    for rule in kind.rules() {
        if rule.channel == Channel::Path {
            if bindings.path.is_empty() {
                warn!(table = result.name(), "Sunburst requested without a path");
                return Ok(ChartOutcome::Withheld(ChartWarning::EmptyPath));
            }
            for name in &bindings.path {
                check_column(&classes, kind, rule, name)?;
            }
            spec.path = bindings.path.clone();
            continue;
        }
        let selected = match (bindings.get(rule.channel), kind, rule.channel) {
            (Some(name), _, _) => Some(name),
            (None, ChartKind::Sunburst, Channel::Values) => Some(config.aggregate_column.as_str()),
            (None, _, _) => None,
        };
        match selected {
            Some(name) => {
                check_column(&classes, kind, rule, name)?;
                spec.mappings.insert(rule.channel, name.to_string());
            }
            None if rule.required => {
                return Err(utils::chart_binding(
                    kind.as_str(),
                    rule.channel.as_str(),
                    "a column must be selected",
                ));
            }
            None => {}
        }
    }
    debug!(kind = %kind, columns = spec.columns().len(), "Derived chart spec");
    Ok(ChartOutcome::Ready(spec))
}
/// The bar, line and pie charts drawn for a value-count result of `column`.
pub fn value_count_charts(
    result: &Table,
    column: &str,
    config: &SummarizerConfig,
) -> Result<Vec<ChartSpec>> {
    let count = summarize::count_column_name(column, config);
    let bar = ChartBindings {
        color: Some(count.clone()),
        ..ChartBindings::xy(column, count.clone())
    };
    let line = ChartBindings::xy(column, count.clone());
    let pie = ChartBindings::pie(column, count.clone());
    let mut specs = Vec::with_capacity(3);
    for (kind, bindings) in [
        (ChartKind::Bar, bar),
        (ChartKind::Line, line),
        (ChartKind::Pie, pie),
    ] {
        if let ChartOutcome::Ready(mut spec) = derive_chart_spec(result, kind, &bindings, config)? {
            // Count labels are drawn on the default bar and line charts only.
            if kind != ChartKind::Pie {
                spec.mappings.insert(Channel::Text, count.clone());
            }
            specs.push(spec);
        }
    }
    Ok(specs)
}
fn check_column(
    classes: &ColumnClassification,
    kind: ChartKind,
    rule: &ChannelRule,
    name: &str,
) -> Result<()> {
    if !classes.contains(name) {
        return Err(utils::column_not_found(name));
    }
    if rule.numeric && !classes.is_numeric(name) {
        return Err(utils::chart_binding(
            kind.as_str(),
            rule.channel.as_str(),
            format!("'{name}' is not numeric"),
        ));
    }
    Ok(())
}
fn column_values(table: &Table, name: &str) -> Result<Value> {
    let descriptor = table.descriptor(name)?;
    let column = table.column(name)?;
    let values: Vec<Value> = match descriptor.kind {
        ColumnKind::Numeric if column.dtype().is_float() => column
            .cast(&DataType::Float64)?
            .as_materialized_series()
            .f64()?
            .into_iter()
            .map(|v| v.map_or(Value::Null, |f| json!(f)))
            .collect(),
        ColumnKind::Numeric => column
            .cast(&DataType::Int64)?
            .as_materialized_series()
            .i64()?
            .into_iter()
            .map(|v| v.map_or(Value::Null, |i| json!(i)))
            .collect(),
        ColumnKind::Boolean => column
            .as_materialized_series()
            .bool()?
            .into_iter()
            .map(|v| v.map_or(Value::Null, Value::Bool))
            .collect(),
        _ => column
            .cast(&DataType::String)?
            .as_materialized_series()
            .str()?
            .into_iter()
            .map(|v| v.map_or(Value::Null, |s| Value::String(s.to_string())))
            .collect(),
    };
    Ok(Value::Array(values))
}
