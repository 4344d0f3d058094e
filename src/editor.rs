//! Property editor: type-specific form description and field edits.
//!
//! DESIGN
//! ======
//! `fields_for` lists exactly the fields that make sense for a component's
//! kind, with current values, so a client can build the form without knowing
//! config shapes. `apply_edits` takes the changed keys of that form and
//! produces a `ComponentPatch` whose config is the existing config with those
//! keys replaced. Keys of the nested `metric` object are merged one by one,
//! so editing `label` never clobbers `value` or `changeType`.

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::doc::{Aggregation, ChangeType, ChartType, ComponentBody, DashboardComponent};
use crate::layout::ComponentPatch;
use crate::render::data::DataSource;

#[derive(Debug, thiserror::Error)]
pub enum EditorError {
    #[error("no changes supplied")]
    Empty,
    #[error("field {field} is not editable on a {kind} component")]
    UnknownField { kind: String, field: String },
    #[error("invalid value for {field}: expected {expected}")]
    InvalidValue { field: String, expected: &'static str },
}

impl crate::routes::ErrorCode for EditorError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Empty => "E_EDIT_EMPTY",
            Self::UnknownField { .. } => "E_EDIT_UNKNOWN_FIELD",
            Self::InvalidValue { .. } => "E_EDIT_INVALID_VALUE",
        }
    }
}

// =============================================================================
// FORM DESCRIPTION
// =============================================================================

/// Input widget for a field.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FieldInput {
    Text,
    Textarea,
    Select { options: Vec<String> },
    /// Ordered list of strings.
    List,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldSpec {
    pub key: &'static str,
    pub label: &'static str,
    pub input: FieldInput,
    pub value: Value,
}

impl FieldSpec {
    fn new(key: &'static str, label: &'static str, input: FieldInput, value: Value) -> Self {
        Self { key, label, input, value }
    }
}

fn select<T: Copy>(all: &[T], as_str: fn(T) -> &'static str) -> FieldInput {
    FieldInput::Select { options: all.iter().map(|v| as_str(*v).to_owned()).collect() }
}

/// Form fields for `component`: the title, then its kind's config fields.
#[must_use]
pub fn fields_for(component: &DashboardComponent, data: &dyn DataSource) -> Vec<FieldSpec> {
    let mut fields = vec![FieldSpec::new("title", "Title", FieldInput::Text, Value::from(component.title.as_str()))];
    let sources = FieldInput::Select { options: data.names() };

    match &component.body {
        ComponentBody::Chart(c) => {
            fields.push(FieldSpec::new(
                "chartType",
                "Chart type",
                select(&ChartType::ALL, ChartType::as_str),
                c.chart_type.as_str().into(),
            ));
            fields.push(FieldSpec::new("dataSource", "Data source", sources, c.data_source.as_str().into()));
            fields.push(FieldSpec::new(
                "aggregation",
                "Aggregation",
                select(&Aggregation::ALL, Aggregation::as_str),
                c.aggregation.as_str().into(),
            ));
        }
        ComponentBody::Table(c) => {
            fields.push(FieldSpec::new("dataSource", "Data source", sources, c.data_source.as_str().into()));
            fields.push(FieldSpec::new("columns", "Columns", FieldInput::List, Value::from(c.columns.clone())));
        }
        ComponentBody::Metric(c) => {
            let m = &c.metric;
            fields.push(FieldSpec::new("label", "Label", FieldInput::Text, m.label.as_str().into()));
            fields.push(FieldSpec::new("value", "Value", FieldInput::Text, m.value.as_str().into()));
            fields.push(FieldSpec::new("change", "Change", FieldInput::Text, m.change.as_str().into()));
            fields.push(FieldSpec::new(
                "changeType",
                "Change type",
                select(&ChangeType::ALL, ChangeType::as_str),
                m.change_type.as_str().into(),
            ));
        }
        ComponentBody::Text(c) => {
            fields.push(FieldSpec::new("content", "Content", FieldInput::Textarea, c.content.as_str().into()));
        }
        ComponentBody::Unsupported { .. } => {}
    }
    fields
}

// =============================================================================
// EDITS
// =============================================================================

/// Merge form changes into a patch for `component`.
///
/// # Errors
///
/// Returns `Empty` for an empty change set, `UnknownField` for keys not in
/// the component's form, and `InvalidValue` for values of the wrong shape.
/// On error nothing is applied.
pub fn apply_edits(component: &DashboardComponent, changes: &Map<String, Value>) -> Result<ComponentPatch, EditorError> {
    if changes.is_empty() {
        return Err(EditorError::Empty);
    }

    let mut patch = ComponentPatch::default();
    let mut body = component.body.clone();
    let mut body_changed = false;

    for (key, value) in changes {
        if key == "title" {
            patch.title = Some(string(key, value)?);
            continue;
        }
        apply_field(&mut body, key, value)?;
        body_changed = true;
    }

    if body_changed {
        patch.body = Some(body);
    }
    Ok(patch)
}

fn apply_field(body: &mut ComponentBody, key: &str, value: &Value) -> Result<(), EditorError> {
    match (body, key) {
        (ComponentBody::Chart(c), "chartType") => c.chart_type = choice(key, value, "bar|line|pie|doughnut|area")?,
        (ComponentBody::Chart(c), "dataSource") => c.data_source = string(key, value)?,
        (ComponentBody::Chart(c), "aggregation") => c.aggregation = choice(key, value, "count|sum|avg|min|max")?,
        (ComponentBody::Table(c), "dataSource") => c.data_source = string(key, value)?,
        (ComponentBody::Table(c), "columns") => c.columns = list(key, value)?,
        (ComponentBody::Metric(c), "label") => c.metric.label = string(key, value)?,
        (ComponentBody::Metric(c), "value") => c.metric.value = scalar(key, value)?,
        (ComponentBody::Metric(c), "change") => c.metric.change = scalar(key, value)?,
        (ComponentBody::Metric(c), "changeType") => c.metric.change_type = choice(key, value, "positive|negative|neutral")?,
        (ComponentBody::Text(c), "content") => c.content = string(key, value)?,
        (other, _) => {
            return Err(EditorError::UnknownField { kind: other.type_tag().to_owned(), field: key.to_owned() });
        }
    }
    Ok(())
}

fn invalid(field: &str, expected: &'static str) -> EditorError {
    EditorError::InvalidValue { field: field.to_owned(), expected }
}

fn string(field: &str, value: &Value) -> Result<String, EditorError> {
    value.as_str().map(str::to_owned).ok_or_else(|| invalid(field, "string"))
}

/// Strings, or numbers rendered as text.
fn scalar(field: &str, value: &Value) -> Result<String, EditorError> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        _ => Err(invalid(field, "string or number")),
    }
}

fn choice<T: DeserializeOwned>(field: &str, value: &Value, expected: &'static str) -> Result<T, EditorError> {
    serde_json::from_value(value.clone()).map_err(|_| invalid(field, expected))
}

/// Array of strings, or a comma-separated string. Blank entries are dropped.
fn list(field: &str, value: &Value) -> Result<Vec<String>, EditorError> {
    let items: Vec<String> = match value {
        Value::String(s) => s.split(',').map(str::to_owned).collect(),
        Value::Array(items) => items
            .iter()
            .map(|item| item.as_str().map(str::to_owned))
            .collect::<Option<_>>()
            .ok_or_else(|| invalid(field, "list of strings"))?,
        _ => return Err(invalid(field, "list of strings")),
    };
    Ok(items
        .into_iter()
        .map(|s| s.trim().to_owned())
        .filter(|s| !s.is_empty())
        .collect())
}

#[cfg(test)]
#[path = "editor_test.rs"]
mod tests;
