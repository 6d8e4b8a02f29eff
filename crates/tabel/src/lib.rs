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

pub mod chart;
pub mod config;
pub mod error;
pub mod ingest;
pub mod insights;
pub mod session;
pub mod summarize;
pub mod table;

pub use chart::{
    axis_options, derive_chart_spec, value_count_charts, AxisOption, Channel, ChartBindings,
    ChartKind, ChartOutcome, ChartSpec, ChartWarning,
};
pub use config::SummarizerConfig;
pub use error::{ErrorReporter, ErrorSeverity, Result, SummarizerError};
pub use ingest::{load_path, load_table, FileKind};
pub use session::{Notice, Session, ValueCountView};
pub use summarize::{
    group_by_aggregate, value_counts, AggregateOp, GroupByRequest, ValueCountRequest,
};
pub use table::{classify_columns, ColumnClassification, ColumnDescriptor, ColumnKind, Table};
