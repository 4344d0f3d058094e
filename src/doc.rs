//! Document model: dashboard components, their typed configs, and the
//! component registry.
//!
//! DESIGN
//! ======
//! A component's configuration is a sum type keyed by its kind, so a chart
//! can only ever carry a `ChartConfig`. On the wire a component keeps the flat
//! `{id, type, title, config, position}` shape of the stored `layout` JSON.
//! Documents whose `type` is unknown, or whose config does not parse for its
//! type, are kept as `ComponentBody::Unsupported` with the raw JSON intact so
//! hand-edited or partially migrated layouts load, round-trip, and render as a
//! placeholder instead of failing.

use std::collections::HashSet;

use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Identifier of a component, unique within one dashboard.
pub type ComponentId = String;

// =============================================================================
// KINDS AND ENUMS
// =============================================================================

/// The kind of a dashboard component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentKind {
    Chart,
    Table,
    Metric,
    Text,
}

impl ComponentKind {
    pub const ALL: [Self; 4] = [Self::Chart, Self::Table, Self::Metric, Self::Text];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Chart => "chart",
            Self::Table => "table",
            Self::Metric => "metric",
            Self::Text => "text",
        }
    }

    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == raw)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartType {
    #[default]
    Bar,
    Line,
    Pie,
    Doughnut,
    Area,
}

impl ChartType {
    pub const ALL: [Self; 5] = [Self::Bar, Self::Line, Self::Pie, Self::Doughnut, Self::Area];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Bar => "bar",
            Self::Line => "line",
            Self::Pie => "pie",
            Self::Doughnut => "doughnut",
            Self::Area => "area",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Aggregation {
    #[default]
    Count,
    Sum,
    Avg,
    Min,
    Max,
}

impl Aggregation {
    pub const ALL: [Self; 5] = [Self::Count, Self::Sum, Self::Avg, Self::Min, Self::Max];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Count => "count",
            Self::Sum => "sum",
            Self::Avg => "avg",
            Self::Min => "min",
            Self::Max => "max",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeType {
    Positive,
    Negative,
    #[default]
    Neutral,
}

impl ChangeType {
    pub const ALL: [Self; 3] = [Self::Positive, Self::Negative, Self::Neutral];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Positive => "positive",
            Self::Negative => "negative",
            Self::Neutral => "neutral",
        }
    }
}

// =============================================================================
// CONFIGS
// =============================================================================

/// Default data source for charts and tables.
pub const DEFAULT_DATA_SOURCE: &str = "organizations";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChartConfig {
    pub chart_type: ChartType,
    pub data_source: String,
    pub aggregation: Aggregation,
    /// Keys this version does not know, kept so they survive a save.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            chart_type: ChartType::Bar,
            data_source: DEFAULT_DATA_SOURCE.into(),
            aggregation: Aggregation::Count,
            extra: Map::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TableConfig {
    pub data_source: String,
    pub columns: Vec<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            data_source: DEFAULT_DATA_SOURCE.into(),
            columns: vec!["name".into(), "status".into(), "members".into()],
            extra: Map::new(),
        }
    }
}

/// Headline figure shown by a metric tile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Metric {
    pub label: String,
    pub value: String,
    pub change: String,
    pub change_type: ChangeType,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for Metric {
    fn default() -> Self {
        Self {
            label: "Total Members".into(),
            value: "0".into(),
            change: "+0%".into(),
            change_type: ChangeType::Neutral,
            extra: Map::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricConfig {
    pub metric: Metric,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextConfig {
    pub content: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for TextConfig {
    fn default() -> Self {
        Self { content: "Enter your text here".into(), extra: Map::new() }
    }
}

/// Type-specific configuration of a component.
#[derive(Debug, Clone, PartialEq)]
pub enum ComponentBody {
    Chart(ChartConfig),
    Table(TableConfig),
    Metric(MetricConfig),
    Text(TextConfig),
    /// Unknown type tag or a config that does not parse for its tag.
    Unsupported { kind: String, config: Value },
}

impl ComponentBody {
    /// Structurally valid default config for a known kind.
    #[must_use]
    pub fn default_for(kind: ComponentKind) -> Self {
        match kind {
            ComponentKind::Chart => Self::Chart(ChartConfig::default()),
            ComponentKind::Table => Self::Table(TableConfig::default()),
            ComponentKind::Metric => Self::Metric(MetricConfig::default()),
            ComponentKind::Text => Self::Text(TextConfig::default()),
        }
    }

    /// Known kind of this body, `None` for unsupported documents.
    #[must_use]
    pub fn kind(&self) -> Option<ComponentKind> {
        match self {
            Self::Chart(_) => Some(ComponentKind::Chart),
            Self::Table(_) => Some(ComponentKind::Table),
            Self::Metric(_) => Some(ComponentKind::Metric),
            Self::Text(_) => Some(ComponentKind::Text),
            Self::Unsupported { .. } => None,
        }
    }

    /// The `type` tag written to the layout document.
    #[must_use]
    pub fn type_tag(&self) -> &str {
        match self {
            Self::Unsupported { kind, .. } => kind,
            other => other.kind().map_or("", ComponentKind::as_str),
        }
    }

    /// Rebuild a body from its stored tag and raw config.
    #[must_use]
    pub fn from_parts(tag: &str, config: Value) -> Self {
        let unsupported = |config| Self::Unsupported { kind: tag.to_owned(), config };
        let Some(kind) = ComponentKind::parse(tag) else {
            return unsupported(config);
        };
        // A missing config means "all defaults".
        if config.is_null() {
            return default_config(tag);
        }
        let parsed = match kind {
            ComponentKind::Chart => serde_json::from_value(config.clone()).map(Self::Chart),
            ComponentKind::Table => serde_json::from_value(config.clone()).map(Self::Table),
            ComponentKind::Metric => serde_json::from_value(config.clone()).map(Self::Metric),
            ComponentKind::Text => serde_json::from_value(config.clone()).map(Self::Text),
        };
        parsed.unwrap_or_else(|_| unsupported(config))
    }

    fn serialize_config<S: SerializeStruct>(&self, state: &mut S) -> Result<(), S::Error> {
        match self {
            Self::Chart(c) => state.serialize_field("config", c),
            Self::Table(c) => state.serialize_field("config", c),
            Self::Metric(c) => state.serialize_field("config", c),
            Self::Text(c) => state.serialize_field("config", c),
            Self::Unsupported { config, .. } => state.serialize_field("config", config),
        }
    }
}

/// Registry lookup: default config for a raw type tag.
///
/// Total over `ComponentKind`; an unrecognized tag yields an unsupported body
/// with an empty config object, which renders as a fallback message.
#[must_use]
pub fn default_config(tag: &str) -> ComponentBody {
    match ComponentKind::parse(tag) {
        Some(kind) => ComponentBody::default_for(kind),
        None => ComponentBody::Unsupported { kind: tag.to_owned(), config: serde_json::json!({}) },
    }
}

// =============================================================================
// PALETTE
// =============================================================================

/// One addable component type as offered to the user.
#[derive(Debug, Clone, Serialize)]
pub struct PaletteEntry {
    #[serde(rename = "type")]
    pub kind: ComponentKind,
    pub label: &'static str,
    pub description: &'static str,
    pub default_title: &'static str,
    pub width: f64,
    pub height: f64,
}

const PALETTE: [PaletteEntry; 4] = [
    PaletteEntry {
        kind: ComponentKind::Chart,
        label: "Chart",
        description: "Bar, line, pie, doughnut or area chart over a data source",
        default_title: "New Chart",
        width: 600.0,
        height: 300.0,
    },
    PaletteEntry {
        kind: ComponentKind::Table,
        label: "Table",
        description: "Selected columns of a data source",
        default_title: "New Table",
        width: 600.0,
        height: 300.0,
    },
    PaletteEntry {
        kind: ComponentKind::Metric,
        label: "Metric",
        description: "Single headline figure with change indicator",
        default_title: "New Metric",
        width: 300.0,
        height: 150.0,
    },
    PaletteEntry {
        kind: ComponentKind::Text,
        label: "Text",
        description: "Free-form Markdown text",
        default_title: "New Text",
        width: 600.0,
        height: 150.0,
    },
];

/// Every component type that can be added, in display order.
#[must_use]
pub fn palette() -> &'static [PaletteEntry] {
    &PALETTE
}

/// Palette entry for a kind.
#[must_use]
pub fn palette_entry(kind: ComponentKind) -> &'static PaletteEntry {
    match kind {
        ComponentKind::Chart => &PALETTE[0],
        ComponentKind::Table => &PALETTE[1],
        ComponentKind::Metric => &PALETTE[2],
        ComponentKind::Text => &PALETTE[3],
    }
}

// =============================================================================
// COMPONENT
// =============================================================================

/// Bounding box of a component on the canvas.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Position {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// One tile on a dashboard canvas.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(from = "RawComponent")]
pub struct DashboardComponent {
    pub id: ComponentId,
    pub title: String,
    pub body: ComponentBody,
    pub position: Position,
}

impl DashboardComponent {
    /// Generate a fresh component id. Ids are time-ordered UUIDs.
    #[must_use]
    pub fn new_id() -> ComponentId {
        Uuid::now_v7().to_string()
    }

    #[must_use]
    pub fn type_tag(&self) -> &str {
        self.body.type_tag()
    }
}

/// Flat wire shape of a component, used only for deserialization.
#[derive(Deserialize)]
struct RawComponent {
    id: ComponentId,
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    config: Value,
    #[serde(default)]
    position: Position,
}

impl From<RawComponent> for DashboardComponent {
    fn from(raw: RawComponent) -> Self {
        Self {
            id: raw.id,
            title: raw.title,
            body: ComponentBody::from_parts(&raw.kind, raw.config),
            position: raw.position,
        }
    }
}

impl Serialize for DashboardComponent {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("DashboardComponent", 5)?;
        state.serialize_field("id", &self.id)?;
        state.serialize_field("type", self.type_tag())?;
        state.serialize_field("title", &self.title)?;
        self.body.serialize_config(&mut state)?;
        state.serialize_field("position", &self.position)?;
        state.end()
    }
}

// =============================================================================
// DASHBOARD
// =============================================================================

/// Ordered component list persisted as the dashboard's `layout` document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Layout {
    #[serde(default)]
    pub components: Vec<DashboardComponent>,
}

impl Layout {
    /// Component ids that occur more than once, in first-duplicate order.
    #[must_use]
    pub fn duplicate_ids(&self) -> Vec<ComponentId> {
        let mut seen = HashSet::new();
        let mut dupes = Vec::new();
        for component in &self.components {
            if !seen.insert(component.id.as_str()) && !dupes.contains(&component.id) {
                dupes.push(component.id.clone());
            }
        }
        dupes
    }
}

/// A stored dashboard.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dashboard {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub is_public: bool,
    pub layout: Layout,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: time::OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: time::OffsetDateTime,
}

/// Writable fields of a dashboard, shared by create and update.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DashboardDraft {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub is_public: bool,
    #[serde(default)]
    pub layout: Layout,
}

impl From<Dashboard> for DashboardDraft {
    fn from(dashboard: Dashboard) -> Self {
        Self {
            title: dashboard.title,
            description: dashboard.description,
            is_public: dashboard.is_public,
            layout: dashboard.layout,
        }
    }
}

/// Listing row for a dashboard.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardSummary {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub is_public: bool,
    pub component_count: usize,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: time::OffsetDateTime,
}

#[cfg(test)]
#[path = "doc_test.rs"]
mod tests;
