//! Declarative field validation.
//!
//! Each entity has one `Schema` listing its fields and their rules. The same
//! schema is used on create, on update, and when an editor session saves, so
//! required-field checks live in exactly one place.

use serde::Serialize;

use crate::doc::DashboardDraft;

/// A single constraint on a string field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    /// Must contain at least one non-whitespace character.
    Required,
    /// At most this many characters.
    MaxLen(usize),
}

impl Rule {
    fn check(self, value: &str) -> Option<String> {
        match self {
            Self::Required if value.trim().is_empty() => Some("is required".into()),
            Self::MaxLen(max) if value.chars().count() > max => Some(format!("must be at most {max} characters")),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FieldSchema {
    pub field: &'static str,
    pub rules: &'static [Rule],
}

#[derive(Debug, Clone, Copy)]
pub struct Schema {
    pub entity: &'static str,
    pub fields: &'static [FieldSchema],
}

/// Entities that expose named string fields to a schema.
pub trait Validated {
    const SCHEMA: Schema;

    /// Value of a schema field. Unknown names read as empty.
    fn field(&self, name: &str) -> &str;

    /// Entity-specific checks beyond per-field rules.
    fn extra_errors(&self) -> Vec<FieldError> {
        Vec::new()
    }

    /// Run every rule and collect all failures.
    ///
    /// # Errors
    ///
    /// Returns `ValidationErrors` listing each failing field.
    fn validate(&self) -> Result<(), ValidationErrors> {
        let schema = Self::SCHEMA;
        let mut errors: Vec<FieldError> = schema
            .fields
            .iter()
            .flat_map(|f| {
                let value = self.field(f.field);
                f.rules
                    .iter()
                    .filter_map(move |rule| rule.check(value).map(|message| FieldError { field: f.field.into(), message }))
            })
            .collect();
        errors.extend(self.extra_errors());

        if errors.is_empty() { Ok(()) } else { Err(ValidationErrors { entity: schema.entity, errors }) }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

/// Every failed rule for one entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[error("invalid {entity}: {}", summarize(.errors))]
pub struct ValidationErrors {
    pub entity: &'static str,
    pub errors: Vec<FieldError>,
}

fn summarize(errors: &[FieldError]) -> String {
    errors.iter().map(|e| format!("{} {}", e.field, e.message)).collect::<Vec<_>>().join(", ")
}

impl crate::routes::ErrorCode for ValidationErrors {
    fn error_code(&self) -> &'static str {
        "E_VALIDATION"
    }
}

// =============================================================================
// DASHBOARD
// =============================================================================

pub const TITLE_MAX_LEN: usize = 200;
pub const DESCRIPTION_MAX_LEN: usize = 2000;

pub const DASHBOARD_SCHEMA: Schema = Schema {
    entity: "dashboard",
    fields: &[
        FieldSchema { field: "title", rules: &[Rule::Required, Rule::MaxLen(TITLE_MAX_LEN)] },
        FieldSchema { field: "description", rules: &[Rule::MaxLen(DESCRIPTION_MAX_LEN)] },
    ],
};

impl Validated for DashboardDraft {
    const SCHEMA: Schema = DASHBOARD_SCHEMA;

    fn field(&self, name: &str) -> &str {
        match name {
            "title" => &self.title,
            "description" => &self.description,
            _ => "",
        }
    }

    fn extra_errors(&self) -> Vec<FieldError> {
        self.layout
            .duplicate_ids()
            .into_iter()
            .map(|id| FieldError { field: "layout".into(), message: format!("duplicate component id {id}") })
            .collect()
    }
}

#[cfg(test)]
#[path = "schema_test.rs"]
mod tests;
