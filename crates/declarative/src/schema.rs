//! Attribute schema declarations
//!
//! A resource declares its attributes once. The planner reads the
//! declaration to validate configuration and to decide between an
//! in-place update and a replacement.

use serde::Serialize;

/// How the planner treats changes to an attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanModifier {
    /// A change forces delete-then-create
    RequiresReplace,
    /// Keep the prior value in the plan instead of marking it unknown
    UseStateForUnknown,
}

/// Declaration of one attribute
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttributeSchema {
    pub name: &'static str,
    pub description: &'static str,
    /// Must be set in configuration
    pub required: bool,
    /// Set by the resource, never by the user
    pub computed: bool,
    pub sensitive: bool,
    pub modifiers: Vec<PlanModifier>,
}

impl AttributeSchema {
    fn new(name: &'static str, required: bool, computed: bool) -> Self {
        Self {
            name,
            description: "",
            required,
            computed,
            sensitive: false,
            modifiers: Vec::new(),
        }
    }

    /// An attribute the user must set
    pub fn required(name: &'static str) -> Self {
        Self::new(name, true, false)
    }

    /// An attribute the user may leave out
    pub fn optional(name: &'static str) -> Self {
        Self::new(name, false, false)
    }

    /// An attribute only the resource sets
    pub fn computed(name: &'static str) -> Self {
        Self::new(name, false, true)
    }

    pub fn describe(mut self, description: &'static str) -> Self {
        self.description = description;
        self
    }

    pub fn sensitive(mut self) -> Self {
        self.sensitive = true;
        self
    }

    pub fn with_modifier(mut self, modifier: PlanModifier) -> Self {
        if !self.modifiers.contains(&modifier) {
            self.modifiers.push(modifier);
        }
        self
    }

    pub fn has_modifier(&self, modifier: PlanModifier) -> bool {
        self.modifiers.contains(&modifier)
    }

    pub fn requires_replace(&self) -> bool {
        self.has_modifier(PlanModifier::RequiresReplace)
    }

    pub fn uses_state_for_unknown(&self) -> bool {
        self.has_modifier(PlanModifier::UseStateForUnknown)
    }
}

/// Declaration of a resource type's attributes
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResourceSchema {
    pub description: &'static str,
    pub attributes: Vec<AttributeSchema>,
}

impl ResourceSchema {
    pub fn new(description: &'static str) -> Self {
        Self {
            description,
            attributes: Vec::new(),
        }
    }

    pub fn attribute(mut self, attribute: AttributeSchema) -> Self {
        self.attributes.push(attribute);
        self
    }

    /// Look up an attribute by name
    pub fn get(&self, name: &str) -> Option<&AttributeSchema> {
        self.attributes.iter().find(|a| a.name == name)
    }

    /// Attributes in declaration order that the user configures
    pub fn configurable(&self) -> impl Iterator<Item = &AttributeSchema> {
        self.attributes.iter().filter(|a| !a.computed)
    }

    /// Attributes only the resource sets
    pub fn computed(&self) -> impl Iterator<Item = &AttributeSchema> {
        self.attributes.iter().filter(|a| a.computed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema() -> ResourceSchema {
        ResourceSchema::new("test")
            .attribute(
                AttributeSchema::required("prompt").with_modifier(PlanModifier::RequiresReplace),
            )
            .attribute(AttributeSchema::optional("label"))
            .attribute(
                AttributeSchema::computed("response")
                    .with_modifier(PlanModifier::UseStateForUnknown)
                    .with_modifier(PlanModifier::UseStateForUnknown),
            )
    }

    #[test]
    fn test_lookup_and_modifiers() {
        let schema = schema();
        assert!(schema.get("prompt").unwrap().requires_replace());
        assert!(schema.get("response").unwrap().uses_state_for_unknown());
        assert_eq!(schema.get("response").unwrap().modifiers.len(), 1);
        assert!(schema.get("missing").is_none());
    }

    #[test]
    fn test_configurable_and_computed() {
        let schema = schema();
        let configurable: Vec<_> = schema.configurable().map(|a| a.name).collect();
        assert_eq!(configurable, vec!["prompt", "label"]);
        let computed: Vec<_> = schema.computed().map(|a| a.name).collect();
        assert_eq!(computed, vec!["response"]);
    }
}
