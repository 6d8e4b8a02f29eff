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

use anyhow::Context;
use eframe::egui;
use std::io::IsTerminal;
use std::path::PathBuf;
use tabel::{
    axis_options, AggregateOp, Channel, ChartBindings, ChartKind, ErrorReporter, ErrorSeverity,
    GroupByRequest, Notice, Session, SummarizerConfig, SummarizerError, Table, ValueCountView,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .init();
    let config = match std::env::args().nth(1) {
        Some(path) => SummarizerConfig::from_yaml_file(&path)
            .map_err(|e| anyhow::anyhow!(reporter().report(&e)))
            .with_context(|| format!("loading {path}"))?,
        None => SummarizerConfig::default(),
    };
    info!(?config, "Starting tabular summarizer portal");
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1200.0, 800.0])
            .with_title("Tabular Summarizer"),
        ..Default::default()
    };
    eframe::run_native(
        "Tabular Summarizer",
        options,
        Box::new(|_cc| Ok(Box::new(PortalApp::new(config)))),
    )
    .map_err(|e| anyhow::anyhow!("{e}"))
}

fn reporter() -> ErrorReporter {
    if std::io::stderr().is_terminal() {
        ErrorReporter::new()
    } else {
        ErrorReporter::plain()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum ActiveTab {
    Insights,
    ValueCounts,
    GroupBy,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum InsightView {
    Head,
    Tail,
    Describe,
    Dtypes,
    Columns,
}

type Outcome<T> = std::result::Result<T, Notice>;

struct PortalApp {
    session: Session,
    file_name: Option<String>,
    upload_notice: Option<Notice>,
    active_tab: ActiveTab,
    insight: InsightView,
    preview_rows: usize,
    vc_column: Option<String>,
    vc_limit: usize,
    vc_view: Option<Outcome<ValueCountView>>,
    gb_columns: Vec<String>,
    gb_target: Option<String>,
    gb_op: AggregateOp,
    grouped: Option<Outcome<Table>>,
    chart_kind: ChartKind,
    bindings: ChartBindings,
    payload: Option<Outcome<String>>,
}

impl PortalApp {
    fn new(config: SummarizerConfig) -> Self {
        let preview_rows = config.default_top_rows;
        Self {
            session: Session::new(config),
            file_name: None,
            upload_notice: None,
            active_tab: ActiveTab::Insights,
            insight: InsightView::Head,
            preview_rows,
            vc_column: None,
            vc_limit: 10,
            vc_view: None,
            gb_columns: Vec::new(),
            gb_target: None,
            gb_op: AggregateOp::Sum,
            grouped: None,
            chart_kind: ChartKind::Bar,
            bindings: ChartBindings::default(),
            payload: None,
        }
    }

    fn upload(&mut self, path: PathBuf) {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());
        self.vc_column = None;
        self.vc_view = None;
        self.gb_columns.clear();
        self.gb_target = None;
        self.grouped = None;
        self.bindings = ChartBindings::default();
        self.payload = None;
        let bytes = match std::fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Could not read file");
                self.session.clear();
                self.upload_notice = Some(Notice::from_error(&SummarizerError::Io(e)));
                return;
            }
        };
        self.upload_notice = Some(match self.session.run_upload(&name, bytes) {
            Ok(confirmed) => confirmed,
            Err(failed) => failed,
        });
        self.file_name = Some(name);
    }

    fn refresh_value_counts(&mut self) {
        self.vc_view = self
            .vc_column
            .as_deref()
            .map(|column| self.session.run_value_counts(column, self.vc_limit));
    }

    fn refresh_group_by(&mut self) {
        self.grouped = match &self.gb_target {
            Some(target) if !self.gb_columns.is_empty() => {
                let request = GroupByRequest::new(self.gb_columns.clone(), target.clone(), self.gb_op);
                Some(self.session.run_group_by(&request))
            }
            _ => None,
        };
        self.refresh_chart();
    }

    fn refresh_chart(&mut self) {
        self.payload = match &self.grouped {
            Some(Ok(result)) => Some(
                self.session
                    .run_chart(result, self.chart_kind, &self.bindings)
                    .and_then(|spec| {
                        spec.to_payload(result)
                            .and_then(|p| {
                                serde_json::to_string_pretty(&p)
                                    .map_err(|e| tabel::error::utils::invalid_request(e.to_string()))
                            })
                            .map_err(|e| Notice::from_error(&e))
                    }),
            ),
            _ => None,
        };
    }
}

impl eframe::App for PortalApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        egui::TopBottomPanel::top("top_panel").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.heading("Tabular Summarizer");
                ui.separator();
                if ui.button("Upload CSV or Excel").clicked() {
                    if let Some(path) = rfd::FileDialog::new()
                        .add_filter("Tables", &["csv", "xlsx"])
                        .pick_file()
                    {
                        self.upload(path);
                    }
                }
                if let Some(ref name) = self.file_name {
                    ui.label(format!("File: {name}"));
                }
            });
        });

        egui::TopBottomPanel::bottom("bottom_panel").show(ctx, |ui| {
            ui.horizontal(|ui| match self.session.table() {
                Ok(table) => {
                    ui.label(table.shape_sentence());
                }
                Err(_) => {
                    ui.label("No table loaded");
                }
            });
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            if let Some(ref notice) = self.upload_notice {
                notice_label(ui, notice);
                if notice.severity != ErrorSeverity::Info {
                    return;
                }
            }
            if !self.session.has_table() {
                ui.centered_and_justified(|ui| {
                    ui.heading("Please upload a csv or excel file first.");
                });
                return;
            }
            ui.horizontal(|ui| {
                ui.selectable_value(&mut self.active_tab, ActiveTab::Insights, "Basic Insights");
                ui.selectable_value(&mut self.active_tab, ActiveTab::ValueCounts, "Value Counts");
                ui.selectable_value(&mut self.active_tab, ActiveTab::GroupBy, "Group By");
            });
            ui.separator();
            match self.active_tab {
                ActiveTab::Insights => self.render_insights_tab(ui),
                ActiveTab::ValueCounts => self.render_value_counts_tab(ui),
                ActiveTab::GroupBy => self.render_group_by_tab(ui),
            }
        });
    }
}

impl PortalApp {
    fn render_insights_tab(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            ui.selectable_value(&mut self.insight, InsightView::Head, "Top rows");
            ui.selectable_value(&mut self.insight, InsightView::Tail, "Bottom rows");
            ui.selectable_value(&mut self.insight, InsightView::Describe, "Summary");
            ui.selectable_value(&mut self.insight, InsightView::Dtypes, "Data types");
            ui.selectable_value(&mut self.insight, InsightView::Columns, "Columns");
        });
        let max_rows = self.session.config().max_preview_rows;
        if matches!(self.insight, InsightView::Head | InsightView::Tail) {
            ui.add(egui::Slider::new(&mut self.preview_rows, 1..=max_rows).text("rows"));
        }
        ui.separator();
        let view = match self.insight {
            InsightView::Head => self.session.preview(self.preview_rows, false),
            InsightView::Tail => self.session.preview(self.preview_rows, true),
            InsightView::Describe => self.session.describe(),
            InsightView::Dtypes => self.session.dtypes(),
            InsightView::Columns => {
                if let Ok(classes) = self.session.classify() {
                    for name in &classes.all {
                        let marker = if classes.is_numeric(name) { " (numeric)" } else { "" };
                        ui.label(format!("• {name}{marker}"));
                    }
                }
                return;
            }
        };
        match view {
            Ok(table) => table_grid(ui, &table, "insight_grid", max_rows),
            Err(e) => notice_label(ui, &Notice::from_error(&e)),
        }
    }

    fn render_value_counts_tab(&mut self, ui: &mut egui::Ui) {
        let columns = self
            .session
            .classify()
            .map(|c| c.all)
            .unwrap_or_default();
        let mut changed = false;
        ui.horizontal(|ui| {
            ui.label("Column:");
            changed |= column_combo(ui, "vc_column", &mut self.vc_column, &columns, false);
            ui.label("Rows:");
            changed |= ui
                .add(egui::DragValue::new(&mut self.vc_limit).range(1..=500))
                .changed();
        });
        if changed {
            self.refresh_value_counts();
        }
        ui.separator();
        let max_rows = self.session.config().max_preview_rows;
        match &self.vc_view {
            Some(Ok(view)) => {
                table_grid(ui, &view.result, "vc_grid", max_rows);
                ui.separator();
                ui.strong("Charts");
                for spec in &view.charts {
                    let mapped = spec
                        .mappings
                        .iter()
                        .map(|(channel, column)| format!("{}={column}", channel.as_str()))
                        .collect::<Vec<_>>()
                        .join(", ");
                    ui.label(format!("{}: {mapped}", spec.kind));
                }
            }
            Some(Err(notice)) => notice_label(ui, notice),
            None => {
                ui.label("Select a column to count its values.");
            }
        }
    }

    fn render_group_by_tab(&mut self, ui: &mut egui::Ui) {
        let columns = self
            .session
            .classify()
            .map(|c| c.all)
            .unwrap_or_default();
        let mut changed = false;
        ui.horizontal_wrapped(|ui| {
            ui.label("Group by:");
            for name in &columns {
                let mut on = self.gb_columns.contains(name);
                if ui.checkbox(&mut on, name.as_str()).changed() {
                    if on {
                        self.gb_columns.push(name.clone());
                    } else {
                        self.gb_columns.retain(|c| c != name);
                    }
                    changed = true;
                }
            }
        });
        ui.horizontal(|ui| {
            ui.label("Operation column:");
            changed |= column_combo(ui, "gb_target", &mut self.gb_target, &columns, false);
            ui.label("Operation:");
            egui::ComboBox::from_id_salt("gb_op")
                .selected_text(self.gb_op.as_str())
                .show_ui(ui, |ui| {
                    for op in AggregateOp::ALL {
                        changed |= ui.selectable_value(&mut self.gb_op, op, op.as_str()).changed();
                    }
                });
        });
        if changed {
            self.refresh_group_by();
        }
        ui.separator();
        let max_rows = self.session.config().max_preview_rows;
        let result = match &self.grouped {
            Some(Ok(result)) => result.clone(),
            Some(Err(notice)) => {
                notice_label(ui, notice);
                return;
            }
            None => {
                ui.label("Pick group columns and an operation column.");
                return;
            }
        };
        table_grid(ui, &result, "gb_grid", max_rows);
        ui.separator();
        self.render_chart_config(ui, &result);
    }

    fn render_chart_config(&mut self, ui: &mut egui::Ui, result: &Table) {
        let mut changed = false;
        ui.horizontal(|ui| {
            ui.label("Chart:");
            egui::ComboBox::from_id_salt("chart_kind")
                .selected_text(self.chart_kind.as_str())
                .show_ui(ui, |ui| {
                    for kind in ChartKind::ALL {
                        if ui
                            .selectable_value(&mut self.chart_kind, kind, kind.as_str())
                            .changed()
                        {
                            self.bindings = ChartBindings::default();
                            changed = true;
                        }
                    }
                });
        });
        for option in axis_options(result, self.chart_kind) {
            ui.horizontal(|ui| {
                ui.label(format!("{}:", option.channel.as_str()));
                if option.channel == Channel::Path {
                    for name in &option.candidates {
                        let mut on = self.bindings.path.contains(name);
                        if ui.checkbox(&mut on, name.as_str()).changed() {
                            if on {
                                self.bindings.path.push(name.clone());
                            } else {
                                self.bindings.path.retain(|c| c != name);
                            }
                            changed = true;
                        }
                    }
                } else {
                    let mut selected = self.bindings.get(option.channel).map(str::to_string);
                    let id = format!("binding_{}", option.channel.as_str());
                    if column_combo(ui, &id, &mut selected, &option.candidates, !option.required) {
                        self.bindings.set(option.channel, selected);
                        changed = true;
                    }
                }
            });
        }
        if changed || self.payload.is_none() {
            self.refresh_chart();
        }
        match &self.payload {
            Some(Ok(json)) => {
                if ui.button("Copy chart payload").clicked() {
                    ui.ctx().copy_text(json.clone());
                }
                egui::ScrollArea::vertical()
                    .id_salt("payload")
                    .max_height(240.0)
                    .show(ui, |ui| {
                        ui.monospace(json);
                    });
            }
            Some(Err(notice)) => notice_label(ui, notice),
            None => {}
        }
    }
}

fn column_combo(
    ui: &mut egui::Ui,
    id: &str,
    selected: &mut Option<String>,
    candidates: &[String],
    allow_none: bool,
) -> bool {
    let mut changed = false;
    egui::ComboBox::from_id_salt(id)
        .selected_text(selected.as_deref().unwrap_or("None"))
        .show_ui(ui, |ui| {
            if allow_none {
                changed |= ui.selectable_value(&mut *selected, None, "None").changed();
            }
            for name in candidates {
                changed |= ui
                    .selectable_value(&mut *selected, Some(name.clone()), name.as_str())
                    .changed();
            }
        });
    changed
}

fn notice_label(ui: &mut egui::Ui, notice: &Notice) {
    let color = match notice.severity {
        ErrorSeverity::Info => egui::Color32::LIGHT_BLUE,
        ErrorSeverity::Warning => egui::Color32::YELLOW,
        ErrorSeverity::Error | ErrorSeverity::Critical => egui::Color32::RED,
    };
    ui.colored_label(color, &notice.message);
}

fn table_grid(ui: &mut egui::Ui, table: &Table, id: &str, max_rows: usize) {
    let columns = table.frame().get_columns();
    egui::ScrollArea::both()
        .id_salt(id)
        .max_height(360.0)
        .show(ui, |ui| {
            egui::Grid::new(id).striped(true).show(ui, |ui| {
                for column in columns {
                    ui.strong(column.name().as_str());
                }
                ui.end_row();
                for row in 0..table.row_count().min(max_rows) {
                    for column in columns {
                        let cell = match column.get(row) {
                            Ok(value) => value
                                .get_str()
                                .map(str::to_string)
                                .unwrap_or_else(|| value.to_string()),
                            Err(_) => String::new(),
                        };
                        ui.label(cell);
                    }
                    ui.end_row();
                }
            });
        });
}
