//! Attribute-level diffs between prior and planned state

use crate::planner::PlannedChange;
use crate::schema::ResourceSchema;
use crate::types::Action;
use serde::Serialize;
use serde_json::Value;
use std::fmt;

/// Value of an attribute on one side of a diff
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum AttributeValue {
    /// Not set
    Absent,
    Known(Value),
    /// Computed during apply
    Unknown,
}

impl AttributeValue {
    /// Multi-line string content, if any
    pub fn as_multiline(&self) -> Option<&str> {
        match self {
            Self::Known(Value::String(s)) if s.contains('\n') => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Absent => f.write_str("null"),
            Self::Known(value) => write!(f, "{value}"),
            Self::Unknown => f.write_str("(known after apply)"),
        }
    }
}

/// A change to one attribute
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttributeChange {
    pub name: String,
    pub before: AttributeValue,
    pub after: AttributeValue,
    /// This change is why the entity must be replaced
    pub forces_replacement: bool,
    pub sensitive: bool,
}

fn side(object: Option<&Value>, name: &str, computed: bool) -> AttributeValue {
    match object {
        None => AttributeValue::Absent,
        Some(object) => match object.get(name) {
            None | Some(Value::Null) if computed => AttributeValue::Unknown,
            None | Some(Value::Null) => AttributeValue::Absent,
            Some(value) => AttributeValue::Known(value.clone()),
        },
    }
}

/// Compute attribute changes in declaration order
///
/// `prior` is `None` for entities that don't exist yet, `planned` is `None`
/// for entities being destroyed. Null computed attributes in `planned` are
/// unknown until apply.
pub fn attribute_changes(
    schema: &ResourceSchema,
    prior: Option<&Value>,
    planned: Option<&Value>,
) -> Vec<AttributeChange> {
    schema
        .attributes
        .iter()
        .filter_map(|attr| {
            let before = match side(prior, attr.name, false) {
                AttributeValue::Unknown => AttributeValue::Absent,
                other => other,
            };
            let after = side(planned, attr.name, attr.computed);
            if before == after {
                return None;
            }
            Some(AttributeChange {
                name: attr.name.to_string(),
                forces_replacement: attr.requires_replace()
                    && !attr.computed
                    && prior.is_some()
                    && planned.is_some(),
                sensitive: attr.sensitive,
                before,
                after,
            })
        })
        .collect()
}

/// Diff summary statistics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DiffSummary {
    /// Entities to create, replacements included
    pub add: usize,
    /// Entities to update in place
    pub change: usize,
    /// Entities to destroy, replacements included
    pub destroy: usize,
}

impl DiffSummary {
    /// Create a summary from planned changes
    pub fn from_changes(changes: &[PlannedChange]) -> Self {
        let mut summary = Self::default();
        for change in changes {
            match change.action {
                Action::NoOp => {}
                Action::Create => summary.add += 1,
                Action::Update => summary.change += 1,
                Action::Replace => {
                    summary.add += 1;
                    summary.destroy += 1;
                }
                Action::Delete => summary.destroy += 1,
            }
        }
        summary
    }

    /// Total number of changes
    pub fn total(&self) -> usize {
        self.add + self.change + self.destroy
    }

    /// Check if there are any changes
    pub fn has_changes(&self) -> bool {
        self.total() > 0
    }
}

impl fmt::Display for DiffSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Plan: {} to add, {} to change, {} to destroy.",
            self.add, self.change, self.destroy
        )
    }
}
