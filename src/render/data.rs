//! Data-source boundary for renderers.
//!
//! Renderers only ever ask "rows for this source name". The placeholder
//! source below is a static lookup table; a live backend can be swapped in
//! by implementing `DataSource`.

use std::collections::BTreeMap;

use serde_json::{Map, Value, json};

/// One record of a data source.
pub type Row = Map<String, Value>;

/// Named row provider consumed by renderers.
pub trait DataSource: Send + Sync {
    /// Rows for `name`. Unknown names yield no rows.
    fn rows(&self, name: &str) -> Vec<Row>;

    /// Known source names, for editor dropdowns.
    fn names(&self) -> Vec<String>;
}

/// In-memory lookup table of rows keyed by source name.
#[derive(Debug, Clone, Default)]
pub struct StaticDataSource {
    tables: BTreeMap<String, Vec<Row>>,
}

impl StaticDataSource {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert of a table. Non-object values are skipped.
    #[must_use]
    pub fn with_table(mut self, name: &str, rows: Vec<Value>) -> Self {
        let rows = rows
            .into_iter()
            .filter_map(|row| match row {
                Value::Object(map) => Some(map),
                _ => None,
            })
            .collect();
        self.tables.insert(name.to_owned(), rows);
        self
    }

    /// Sample dataset used until dashboards are wired to live queries.
    #[must_use]
    pub fn placeholder() -> Self {
        Self::new()
            .with_table(
                "organizations",
                vec![
                    json!({"label": "Active", "name": "Harbor Rowing Club", "status": "active", "members": 84, "value": 84}),
                    json!({"label": "Active", "name": "Northside Chess Society", "status": "active", "members": 41, "value": 41}),
                    json!({"label": "Pending", "name": "Lakeview Runners", "status": "pending", "members": 12, "value": 12}),
                    json!({"label": "Active", "name": "Old Town Choir", "status": "active", "members": 57, "value": 57}),
                    json!({"label": "Inactive", "name": "Riverside Cyclists", "status": "inactive", "members": 9, "value": 9}),
                ],
            )
            .with_table(
                "members",
                vec![
                    json!({"label": "Jan", "name": "A. Okafor", "email": "a.okafor@example.org", "status": "active", "value": 12}),
                    json!({"label": "Feb", "name": "B. Lindqvist", "email": "b.lindqvist@example.org", "status": "active", "value": 18}),
                    json!({"label": "Mar", "name": "C. Moreau", "email": "c.moreau@example.org", "status": "pending", "value": 9}),
                    json!({"label": "Apr", "name": "D. Tanaka", "email": "d.tanaka@example.org", "status": "active", "value": 22}),
                ],
            )
            .with_table(
                "events",
                vec![
                    json!({"label": "Workshop", "name": "Spring Workshop", "date": "2026-03-14", "attendees": 35, "value": 35}),
                    json!({"label": "Meeting", "name": "Annual General Meeting", "date": "2026-05-02", "attendees": 120, "value": 120}),
                    json!({"label": "Workshop", "name": "Autumn Workshop", "date": "2026-09-19", "attendees": 28, "value": 28}),
                ],
            )
            .with_table(
                "tasks",
                vec![
                    json!({"label": "Open", "name": "Call new applicants", "assignee": "Office", "value": 1}),
                    json!({"label": "Done", "name": "Send renewal reminders", "assignee": "Office", "value": 1}),
                    json!({"label": "Open", "name": "Update fee schedule", "assignee": "Board", "value": 1}),
                ],
            )
            .with_table(
                "invoices",
                vec![
                    json!({"label": "Paid", "name": "INV-1001", "amount": 250.0, "value": 250.0}),
                    json!({"label": "Overdue", "name": "INV-1002", "amount": 125.5, "value": 125.5}),
                    json!({"label": "Paid", "name": "INV-1003", "amount": 310.0, "value": 310.0}),
                ],
            )
    }
}

impl DataSource for StaticDataSource {
    fn rows(&self, name: &str) -> Vec<Row> {
        self.tables.get(name).cloned().unwrap_or_default()
    }

    fn names(&self) -> Vec<String> {
        self.tables.keys().cloned().collect()
    }
}
