//! # Declarative
//!
//! A small host for declarative resources.
//!
//! This crate provides the pieces a tool needs to drive resources through
//! their create/read/update/delete transitions: attribute schemas with plan
//! modifiers, a planner that decides between update and replacement, and an
//! executor that applies changes in parallel.
//!
//! ## Core Concepts
//!
//! - **Resource**: an entity type with typed attributes and CRUD transitions
//! - **ResourceSchema**: which attributes are required, computed, or force replacement
//! - **ExecutionPlan**: one planned [`Action`] per entity address
//! - **Executor**: applies the plan and reports what to persist
//!
//! ## Example
//!
//! ```ignore
//! use declarative::{ExecuteOptions, ExecutionPlan, execute_simple};
//!
//! let plan = ExecutionPlan::build(&resource.schema(), resource.type_name(), &configs, &states)?;
//! println!("{}", plan.summary());
//!
//! let report = execute_simple(&resource, &plan, &ExecuteOptions::default())?;
//! for outcome in report.outcomes {
//!     store.apply(&outcome.address, outcome.state);
//! }
//! ```
//!
//! ## Callback Traits
//!
//! - [`ProgressCallback`]: Receives progress updates
//! - [`ConfirmCallback`]: Handles user confirmations
//!
//! This allows the crate to be used without hard dependencies on
//! specific UI frameworks.

pub mod context;
pub mod diff;
pub mod error;
pub mod executor;
pub mod planner;
pub mod resource;
pub mod schema;
pub mod types;

// Re-export main types at crate root
pub use context::{
    AutoConfirm, AutoDecline, ConfirmCallback, NoProgress, OperationContext, ProgressCallback,
};
pub use diff::{AttributeChange, AttributeValue, DiffSummary, attribute_changes};
pub use error::{Error, Result};
pub use executor::{ExecuteReport, Outcome, StateChange, execute, execute_simple, refresh};
pub use planner::{ExecutionPlan, PlannedChange, parse_target, plan_change, validate_config};
pub use resource::{OpResult, Resource};
pub use schema::{AttributeSchema, PlanModifier, ResourceSchema};
pub use types::{
    Action, Address, ApplyResult, Diagnostic, Diagnostics, ExecuteOptions, ExecuteSummary,
    Severity,
};
