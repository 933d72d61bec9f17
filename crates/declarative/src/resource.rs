//! Resource trait for declarative state management
//!
//! A Resource owns the create/read/update/delete transitions of one entity
//! type. The host plans which transition to run and persists what it
//! returns.

use crate::context::OperationContext;
use crate::schema::ResourceSchema;
use crate::types::{Diagnostic, Diagnostics};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt;

/// Result of a resource operation
pub type OpResult<T> = std::result::Result<T, Diagnostics>;

/// Core trait for declarative resources
///
/// # Example
///
/// ```
/// use declarative::{OpResult, OperationContext, Resource, ResourceSchema, AttributeSchema};
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Debug, Clone, Serialize, Deserialize)]
/// struct Greeting {
///     name: String,
///     message: Option<String>,
/// }
///
/// struct GreetingResource;
///
/// impl Resource for GreetingResource {
///     type Model = Greeting;
///
///     fn type_name(&self) -> &'static str {
///         "greeting"
///     }
///
///     fn schema(&self) -> ResourceSchema {
///         ResourceSchema::new("A greeting")
///             .attribute(AttributeSchema::required("name"))
///             .attribute(AttributeSchema::computed("message"))
///     }
///
///     fn create(&self, _ctx: &OperationContext, planned: &Greeting) -> OpResult<Greeting> {
///         Ok(Greeting {
///             message: Some(format!("hello {}", planned.name)),
///             ..planned.clone()
///         })
///     }
///
///     fn read(&self, _ctx: &OperationContext, state: &Greeting) -> OpResult<Greeting> {
///         Ok(state.clone())
///     }
///
///     fn update(&self, ctx: &OperationContext, planned: &Greeting, _prior: &Greeting) -> OpResult<Greeting> {
///         self.create(ctx, planned)
///     }
///
///     fn delete(&self, _ctx: &OperationContext, _state: &Greeting) -> OpResult<()> {
///         Ok(())
///     }
/// }
/// ```
pub trait Resource: Send + Sync {
    /// Typed attribute values of one entity
    type Model: Serialize + DeserializeOwned + Clone + Send + Sync + fmt::Debug;

    /// Resource type name, the first half of an address
    fn type_name(&self) -> &'static str;

    /// Attribute declaration
    fn schema(&self) -> ResourceSchema;

    /// Bring a new entity into existence from its planned values
    fn create(&self, ctx: &OperationContext, planned: &Self::Model) -> OpResult<Self::Model>;

    /// Refresh an existing entity
    fn read(&self, ctx: &OperationContext, state: &Self::Model) -> OpResult<Self::Model>;

    /// Change an existing entity in place
    fn update(
        &self,
        ctx: &OperationContext,
        planned: &Self::Model,
        prior: &Self::Model,
    ) -> OpResult<Self::Model>;

    /// Remove an entity
    fn delete(&self, ctx: &OperationContext, state: &Self::Model) -> OpResult<()>;
}

/// Encode a model as an attribute map
pub fn to_value<M: Serialize>(model: &M) -> OpResult<Value> {
    serde_json::to_value(model)
        .map_err(|e| Diagnostic::error("Unable to encode resource state", e.to_string()).into())
}

/// Decode an attribute map into a model
pub fn from_value<M: DeserializeOwned>(value: &Value) -> OpResult<M> {
    M::deserialize(value)
        .map_err(|e| Diagnostic::error("Unable to decode resource state", e.to_string()).into())
}
