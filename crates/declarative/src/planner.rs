//! Execution planner - decides the action for every entity
//!
//! Configuration and prior state are attribute maps (`serde_json::Value`
//! objects). For each address the planner picks one of create, update,
//! replace, delete or no-op:
//!
//! - in configuration only: create
//! - in state only: delete
//! - configured attributes equal to state: no-op
//! - a changed attribute carries `RequiresReplace`: replace
//! - otherwise: update in place
//!
//! Computed attributes are unknown (null) in the planned value, except that
//! an in-place update keeps the prior value of attributes carrying
//! `UseStateForUnknown`.

use crate::diff::{AttributeChange, DiffSummary, attribute_changes};
use crate::error::{Error, Result};
use crate::schema::ResourceSchema;
use crate::types::{Action, Address, Diagnostic, Diagnostics};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};

/// The planned action for one entity
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlannedChange {
    pub address: Address,
    pub action: Action,
    /// State before the change, if the entity exists
    pub prior: Option<Value>,
    /// Expected state after the change, if the entity will exist
    pub planned: Option<Value>,
    pub attributes: Vec<AttributeChange>,
}

impl PlannedChange {
    /// Names of the attributes forcing a replacement
    pub fn replace_reasons(&self) -> impl Iterator<Item = &str> {
        self.attributes
            .iter()
            .filter(|c| c.forces_replacement)
            .map(|c| c.name.as_str())
    }
}

/// Validate one entity's configuration against the schema
pub fn validate_config(schema: &ResourceSchema, address: &Address, config: &Value) -> Diagnostics {
    let mut diags = Diagnostics::new();

    let Some(object) = config.as_object() else {
        diags.push(Diagnostic::error(
            "Invalid configuration",
            format!("{address} must be a table of attributes"),
        ));
        return diags;
    };

    for attr in &schema.attributes {
        let value = object.get(attr.name).filter(|v| !v.is_null());
        if attr.required && value.is_none() {
            diags.push(
                Diagnostic::error(
                    "Missing required argument",
                    format!(
                        "The argument \"{}\" is required, but no definition was found in {address}.",
                        attr.name
                    ),
                )
                .for_attribute(attr.name),
            );
        }
        if attr.computed && value.is_some() {
            diags.push(
                Diagnostic::error(
                    "Invalid configuration",
                    format!(
                        "\"{}\" is computed by the resource and cannot be set in {address}.",
                        attr.name
                    ),
                )
                .for_attribute(attr.name),
            );
        }
    }

    for key in object.keys() {
        if schema.get(key).is_none() {
            diags.push(
                Diagnostic::error(
                    "Unsupported argument",
                    format!("An argument named \"{key}\" is not expected in {address}."),
                )
                .for_attribute(key.clone()),
            );
        }
    }

    diags
}

fn attr<'a>(object: &'a Value, name: &str) -> &'a Value {
    object.get(name).unwrap_or(&Value::Null)
}

/// Build the planned value from configuration
///
/// Computed attributes become unknown unless `keep_prior` supplies a state
/// to carry `UseStateForUnknown` values from.
fn planned_value(schema: &ResourceSchema, config: &Value, keep_prior: Option<&Value>) -> Value {
    let mut planned = Map::new();
    for attr in &schema.attributes {
        let value = if attr.computed {
            match keep_prior {
                Some(prior) if attr.uses_state_for_unknown() => attr_value(prior, attr.name),
                _ => Value::Null,
            }
        } else {
            attr_value(config, attr.name)
        };
        planned.insert(attr.name.to_string(), value);
    }
    Value::Object(planned)
}

fn attr_value(object: &Value, name: &str) -> Value {
    attr(object, name).clone()
}

/// Plan the change for one entity
///
/// # Errors
///
/// Returns the validation diagnostics if the configuration is invalid.
pub fn plan_change(
    schema: &ResourceSchema,
    address: Address,
    config: Option<&Value>,
    prior: Option<&Value>,
) -> std::result::Result<PlannedChange, Diagnostics> {
    if let Some(config) = config {
        validate_config(schema, &address, config).into_result()?;
    }

    let (action, planned) = match (config, prior) {
        (None, None) => (Action::NoOp, None),
        (None, Some(_)) => (Action::Delete, None),
        (Some(config), None) => (Action::Create, Some(planned_value(schema, config, None))),
        (Some(config), Some(prior)) => {
            let changed: Vec<_> = schema
                .configurable()
                .filter(|a| attr(config, a.name) != attr(prior, a.name))
                .collect();

            if changed.is_empty() {
                (Action::NoOp, Some(prior.clone()))
            } else if changed.iter().any(|a| a.requires_replace()) {
                (Action::Replace, Some(planned_value(schema, config, None)))
            } else {
                (
                    Action::Update,
                    Some(planned_value(schema, config, Some(prior))),
                )
            }
        }
    };

    log::debug!("Planned {action} for {address}");

    Ok(PlannedChange {
        attributes: attribute_changes(schema, prior, planned.as_ref()),
        address,
        action,
        prior: prior.cloned(),
        planned,
    })
}

/// An execution plan: one planned change per entity, ordered by address
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ExecutionPlan {
    pub changes: Vec<PlannedChange>,
}

impl ExecutionPlan {
    /// Create a new empty plan
    pub fn new() -> Self {
        Self::default()
    }

    /// Plan every entity of one resource type
    ///
    /// `configs` and `states` map entity names to attribute maps.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Invalid`] with every validation diagnostic if any
    /// configuration is invalid.
    pub fn build(
        schema: &ResourceSchema,
        resource_type: &str,
        configs: &BTreeMap<String, Value>,
        states: &BTreeMap<String, Value>,
    ) -> Result<Self> {
        let names: BTreeSet<&String> = configs.keys().chain(states.keys()).collect();

        let mut plan = Self::new();
        let mut diags = Diagnostics::new();
        for name in names {
            let address = Address::new(resource_type, name.clone());
            match plan_change(schema, address, configs.get(name), states.get(name)) {
                Ok(change) => plan.changes.push(change),
                Err(errors) => diags.extend(errors),
            }
        }

        if diags.has_errors() {
            return Err(Error::Invalid(diags));
        }
        Ok(plan)
    }

    /// Plan the destruction of every entity in `states`
    pub fn destroy(
        schema: &ResourceSchema,
        resource_type: &str,
        states: &BTreeMap<String, Value>,
    ) -> Self {
        let changes = states
            .iter()
            .map(|(name, state)| PlannedChange {
                address: Address::new(resource_type, name.clone()),
                action: Action::Delete,
                attributes: attribute_changes(schema, Some(state), None),
                prior: Some(state.clone()),
                planned: None,
            })
            .collect();
        Self { changes }
    }

    /// Filter plan to only include changes matching a predicate
    pub fn filter<F>(self, predicate: F) -> Self
    where
        F: Fn(&PlannedChange) -> bool,
    {
        Self {
            changes: self.changes.into_iter().filter(|c| predicate(c)).collect(),
        }
    }

    /// Filter plan to only include changes matching a target
    ///
    /// Target format: "type" or "type.name"
    ///
    /// # Errors
    ///
    /// Returns an error if the target is malformed or matches nothing.
    pub fn filter_by_target(self, target: Option<&str>) -> Result<Self> {
        let Some(target) = target else {
            return Ok(self);
        };

        let (resource_type, name) = parse_target(target)?;
        let filtered = self.filter(|c| {
            c.address.resource_type == resource_type
                && name.as_ref().is_none_or(|n| c.address.name == *n)
        });

        if filtered.changes.is_empty() {
            return Err(Error::UnknownTarget(target.to_string()));
        }
        Ok(filtered)
    }

    /// Changes that actually do something
    pub fn pending(&self) -> impl Iterator<Item = &PlannedChange> {
        self.changes.iter().filter(|c| c.action.is_change())
    }

    pub fn summary(&self) -> DiffSummary {
        DiffSummary::from_changes(&self.changes)
    }

    /// Total number of entities in the plan
    pub fn len(&self) -> usize {
        self.changes.len()
    }

    /// Check if plan is empty
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// Check if any entity needs a change
    pub fn has_changes(&self) -> bool {
        self.pending().next().is_some()
    }
}

/// Parse a target string like "type.name" into (type, name)
pub fn parse_target(target: &str) -> Result<(String, Option<String>)> {
    let parts: Vec<&str> = target.split('.').collect();
    match parts.as_slice() {
        [resource_type] if !resource_type.is_empty() => Ok(((*resource_type).to_string(), None)),
        [resource_type, name] if !resource_type.is_empty() && !name.is_empty() => Ok((
            (*resource_type).to_string(),
            Some((*name).to_string()),
        )),
        _ => Err(Error::InvalidTarget(target.to_string())),
    }
}
