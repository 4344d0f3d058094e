//! Renderer set: turns component configs into serializable tile views.
//!
//! DESIGN
//! ======
//! Each config type implements `Render`, so a renderer can only ever receive
//! the config of its own kind. Rendering is pure: no I/O beyond the injected
//! `DataSource`, and it never fails. Missing data, empty column lists and
//! unsupported documents all produce a `TileView::Placeholder`.

pub mod data;

use pulldown_cmark::{Event, Options, Parser, html};
use serde::Serialize;
use serde_json::Value;

use crate::doc::{
    Aggregation, ChangeType, ChartConfig, ChartType, ComponentBody, DashboardComponent, Layout, MetricConfig, Position,
    TableConfig, TextConfig,
};
use data::{DataSource, Row};

/// Row cap for table tiles.
pub const MAX_TABLE_ROWS: usize = 100;

/// Row key charts group by.
pub const CHART_LABEL_KEY: &str = "label";

/// Row key charts aggregate.
pub const CHART_VALUE_KEY: &str = "value";

// =============================================================================
// VIEWS
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartPoint {
    pub label: String,
    pub value: f64,
}

/// Visual representation of one tile, ready for a client to draw.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "view", rename_all = "snake_case")]
pub enum TileView {
    Chart { chart_type: ChartType, aggregation: Aggregation, points: Vec<ChartPoint> },
    Table { columns: Vec<String>, rows: Vec<Vec<Value>>, truncated: bool },
    Metric { label: String, value: String, change: String, change_type: ChangeType },
    Text { content: String, html: String },
    Placeholder { message: String },
}

impl TileView {
    fn placeholder(message: impl Into<String>) -> Self {
        Self::Placeholder { message: message.into() }
    }

    fn no_data(source: &str) -> Self {
        Self::placeholder(format!("No data available for \"{source}\""))
    }
}

/// A rendered component with the metadata a canvas needs to place it.
#[derive(Debug, Clone, Serialize)]
pub struct RenderedTile {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub title: String,
    pub position: Position,
    #[serde(flatten)]
    pub view: TileView,
}

// =============================================================================
// RENDERERS
// =============================================================================

/// Rendering strategy for one config type.
pub trait Render {
    fn render(&self, data: &dyn DataSource) -> TileView;
}

impl Render for ChartConfig {
    fn render(&self, data: &dyn DataSource) -> TileView {
        let rows = data.rows(&self.data_source);
        if rows.is_empty() {
            return TileView::no_data(&self.data_source);
        }
        TileView::Chart { chart_type: self.chart_type, aggregation: self.aggregation, points: aggregate(&rows, self.aggregation) }
    }
}

impl Render for TableConfig {
    fn render(&self, data: &dyn DataSource) -> TileView {
        if self.columns.is_empty() {
            return TileView::placeholder("No columns selected");
        }
        let rows = data.rows(&self.data_source);
        if rows.is_empty() {
            return TileView::no_data(&self.data_source);
        }
        let truncated = rows.len() > MAX_TABLE_ROWS;
        let rows = rows
            .iter()
            .take(MAX_TABLE_ROWS)
            .map(|row| {
                self.columns
                    .iter()
                    .map(|col| row.get(col).cloned().unwrap_or(Value::Null))
                    .collect()
            })
            .collect();
        TileView::Table { columns: self.columns.clone(), rows, truncated }
    }
}

impl Render for MetricConfig {
    fn render(&self, _data: &dyn DataSource) -> TileView {
        let m = &self.metric;
        TileView::Metric { label: m.label.clone(), value: m.value.clone(), change: m.change.clone(), change_type: m.change_type }
    }
}

impl Render for TextConfig {
    fn render(&self, _data: &dyn DataSource) -> TileView {
        TileView::Text { content: self.content.clone(), html: markdown_to_html(&self.content) }
    }
}

/// Dispatch a component body to its renderer.
#[must_use]
pub fn render_body(body: &ComponentBody, data: &dyn DataSource) -> TileView {
    match body {
        ComponentBody::Chart(c) => c.render(data),
        ComponentBody::Table(c) => c.render(data),
        ComponentBody::Metric(c) => c.render(data),
        ComponentBody::Text(c) => c.render(data),
        ComponentBody::Unsupported { kind, .. } => {
            TileView::placeholder(format!("Unsupported component type \"{kind}\""))
        }
    }
}

#[must_use]
pub fn render_component(component: &DashboardComponent, data: &dyn DataSource) -> RenderedTile {
    RenderedTile {
        id: component.id.clone(),
        kind: component.type_tag().to_owned(),
        title: component.title.clone(),
        position: component.position,
        view: render_body(&component.body, data),
    }
}

/// Render every component in layout order.
#[must_use]
pub fn render_layout(layout: &Layout, data: &dyn DataSource) -> Vec<RenderedTile> {
    render_components(&layout.components, data)
}

#[must_use]
pub fn render_components(components: &[DashboardComponent], data: &dyn DataSource) -> Vec<RenderedTile> {
    components.iter().map(|c| render_component(c, data)).collect()
}

// =============================================================================
// HELPERS
// =============================================================================

/// Group rows by label in first-seen order and fold each group's values.
fn aggregate(rows: &[Row], aggregation: Aggregation) -> Vec<ChartPoint> {
    let mut groups: Vec<(String, usize, Vec<f64>)> = Vec::new();
    for row in rows {
        let label = match row.get(CHART_LABEL_KEY) {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Null) | None => "(none)".to_owned(),
            Some(other) => other.to_string(),
        };
        let value = row.get(CHART_VALUE_KEY).and_then(Value::as_f64);
        let index = match groups.iter().position(|(l, _, _)| *l == label) {
            Some(i) => i,
            None => {
                groups.push((label, 0, Vec::new()));
                groups.len() - 1
            }
        };
        let group = &mut groups[index];
        group.1 += 1;
        group.2.extend(value);
    }

    groups
        .into_iter()
        .map(|(label, count, values)| ChartPoint { label, value: fold(aggregation, count, &values) })
        .collect()
}

#[allow(clippy::cast_precision_loss)]
fn fold(aggregation: Aggregation, count: usize, values: &[f64]) -> f64 {
    if aggregation == Aggregation::Count {
        return count as f64;
    }
    if values.is_empty() {
        return 0.0;
    }
    match aggregation {
        Aggregation::Count => count as f64,
        Aggregation::Sum => values.iter().sum(),
        Aggregation::Avg => values.iter().sum::<f64>() / values.len() as f64,
        Aggregation::Min => values.iter().copied().fold(f64::INFINITY, f64::min),
        Aggregation::Max => values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
    }
}

fn markdown_to_html(markdown: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TASKLISTS);

    // Raw HTML from stored content is never passed through.
    let parser = Parser::new_ext(markdown, options).filter_map(|event| match event {
        Event::Html(_) | Event::InlineHtml(_) => None,
        other => Some(other),
    });

    let mut out = String::new();
    html::push_html(&mut out, parser);
    out
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
