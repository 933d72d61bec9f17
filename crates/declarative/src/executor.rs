//! Execution engine - applies planned changes with parallelism
//!
//! Distinct entities are applied in parallel on a rayon pool; each entity
//! runs exactly one transition. The executor never touches persisted state:
//! every [`Outcome`] says what the host should do with the entity's entry.

use crate::context::{ConfirmCallback, OperationContext, ProgressCallback};
use crate::error::Error;
use crate::planner::{ExecutionPlan, PlannedChange};
use crate::resource::{OpResult, Resource, from_value, to_value};
use crate::types::{Action, Address, ApplyResult, Diagnostic, ExecuteOptions, ExecuteSummary};
use anyhow::Result;
use rayon::prelude::*;
use serde_json::Value;
use std::sync::{Mutex, PoisonError};

/// What to do with an entity's state entry after its transition
#[derive(Debug, Clone, PartialEq)]
pub enum StateChange {
    /// Store this value
    Set(Value),
    /// Drop the entry
    Remove,
    /// Leave the entry untouched
    Keep,
}

/// Result of one planned change
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome {
    pub address: Address,
    pub action: Action,
    pub result: ApplyResult,
    pub state: StateChange,
}

/// Everything an execution produced
#[derive(Debug, Clone, Default)]
pub struct ExecuteReport {
    pub summary: ExecuteSummary,
    /// Outcomes of the changes that ran, in plan order
    pub outcomes: Vec<Outcome>,
}

/// Execute a plan with the given options and callbacks
///
/// Asks for confirmation once when the plan has changes, then applies
/// every pending change.
pub fn execute<R, P, C>(
    resource: &R,
    plan: &ExecutionPlan,
    opts: &ExecuteOptions,
    progress: &mut P,
    confirm: &mut C,
) -> Result<ExecuteReport>
where
    R: Resource,
    P: ProgressCallback,
    C: ConfirmCallback,
{
    let pending: Vec<&PlannedChange> = plan.pending().collect();
    let mut report = ExecuteReport {
        summary: ExecuteSummary {
            no_change: plan.len() - pending.len(),
            ..Default::default()
        },
        outcomes: Vec::new(),
    };

    if pending.is_empty() {
        return Ok(report);
    }

    let prompt = format!("Apply {} change(s)?", pending.len());
    if !confirm.confirm(&prompt)? {
        report.summary.skipped = pending.len();
        return Ok(report);
    }

    progress.on_start(pending.len());
    let outcomes: Vec<Outcome> = if opts.jobs <= 1 || pending.len() == 1 {
        pending
            .iter()
            .map(|change| apply_with_progress(resource, change, opts, progress))
            .collect()
    } else {
        execute_parallel(resource, &pending, opts, progress)?
    };
    progress.on_complete();

    for outcome in &outcomes {
        report.summary.add_result(&outcome.result);
    }
    report.outcomes = outcomes;
    Ok(report)
}

/// Execute changes in parallel using rayon
fn execute_parallel<R: Resource, P: ProgressCallback>(
    resource: &R,
    pending: &[&PlannedChange],
    opts: &ExecuteOptions,
    progress: &mut P,
) -> Result<Vec<Outcome>> {
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(opts.jobs)
        .build()
        .map_err(|e| Error::ThreadPool(e.to_string()))?;

    let progress = Mutex::new(progress);

    let outcomes: Vec<Outcome> = pool.install(|| {
        pending
            .par_iter()
            .map(|change| {
                lock(&progress).on_resource_start(&change.address, change.action);
                let outcome = apply_change(resource, change, operation_context(opts));
                lock(&progress).on_resource_complete(&outcome.address, &outcome.result);
                outcome
            })
            .collect()
    });

    Ok(outcomes)
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn apply_with_progress<R: Resource, P: ProgressCallback>(
    resource: &R,
    change: &PlannedChange,
    opts: &ExecuteOptions,
    progress: &mut P,
) -> Outcome {
    progress.on_resource_start(&change.address, change.action);
    let outcome = apply_change(resource, change, operation_context(opts));
    progress.on_resource_complete(&outcome.address, &outcome.result);
    outcome
}

fn operation_context(opts: &ExecuteOptions) -> OperationContext {
    OperationContext::new()
        .with_timeout(opts.timeout)
        .with_cancel_flag(opts.cancel.clone())
}

/// Apply a single planned change
///
/// A replacement deletes first; if the create that follows fails, the
/// entity is gone and its entry is removed.
fn apply_change<R: Resource>(resource: &R, change: &PlannedChange, ctx: OperationContext) -> Outcome {
    let outcome = |result, state| Outcome {
        address: change.address.clone(),
        action: change.action,
        result,
        state,
    };

    if ctx.is_cancelled() {
        return outcome(
            ApplyResult::Skipped {
                reason: "cancelled".to_string(),
            },
            StateChange::Keep,
        );
    }

    log::debug!("Applying {} to {}", change.action, change.address);

    let (result, state) = match change.action {
        Action::NoOp => (Ok(ApplyResult::NoChange), StateChange::Keep),
        Action::Create => match create(resource, &ctx, change) {
            Ok(value) => (Ok(ApplyResult::Created), StateChange::Set(value)),
            Err(diags) => (Err(diags), StateChange::Keep),
        },
        Action::Update => match update(resource, &ctx, change) {
            Ok(value) => (Ok(ApplyResult::Updated), StateChange::Set(value)),
            Err(diags) => (Err(diags), StateChange::Keep),
        },
        Action::Replace => match delete(resource, &ctx, change) {
            Err(diags) => (Err(diags), StateChange::Keep),
            Ok(()) => match create(resource, &ctx, change) {
                Ok(value) => (Ok(ApplyResult::Replaced), StateChange::Set(value)),
                Err(diags) => (Err(diags), StateChange::Remove),
            },
        },
        Action::Delete => match delete(resource, &ctx, change) {
            Ok(()) => (Ok(ApplyResult::Deleted), StateChange::Remove),
            Err(diags) => (Err(diags), StateChange::Keep),
        },
    };

    match result {
        Ok(result) => {
            log::debug!("{} complete for {}", change.action, change.address);
            outcome(result, state)
        }
        Err(diagnostics) => {
            log::debug!("{} failed for {}: {diagnostics}", change.action, change.address);
            outcome(ApplyResult::Failed { diagnostics }, state)
        }
    }
}

fn planned_state<'a>(change: &'a PlannedChange) -> OpResult<&'a Value> {
    change.planned.as_ref().ok_or_else(|| {
        Diagnostic::error("Invalid plan", format!("{} has no planned state", change.address)).into()
    })
}

fn prior_state<'a>(change: &'a PlannedChange) -> OpResult<&'a Value> {
    change.prior.as_ref().ok_or_else(|| {
        Diagnostic::error("Invalid plan", format!("{} has no prior state", change.address)).into()
    })
}

fn create<R: Resource>(resource: &R, ctx: &OperationContext, change: &PlannedChange) -> OpResult<Value> {
    let planned: R::Model = from_value(planned_state(change)?)?;
    to_value(&resource.create(ctx, &planned)?)
}

fn update<R: Resource>(resource: &R, ctx: &OperationContext, change: &PlannedChange) -> OpResult<Value> {
    let planned: R::Model = from_value(planned_state(change)?)?;
    let prior: R::Model = from_value(prior_state(change)?)?;
    to_value(&resource.update(ctx, &planned, &prior)?)
}

fn delete<R: Resource>(resource: &R, ctx: &OperationContext, change: &PlannedChange) -> OpResult<()> {
    let prior: R::Model = from_value(prior_state(change)?)?;
    resource.delete(ctx, &prior)
}

/// Refresh one entity's stored state through the resource's read
pub fn refresh<R: Resource>(resource: &R, ctx: &OperationContext, state: &Value) -> OpResult<Value> {
    let current: R::Model = from_value(state)?;
    to_value(&resource.read(ctx, &current)?)
}

/// Simple execution without callbacks
///
/// For basic use cases where you don't need progress or confirmation.
pub fn execute_simple<R: Resource>(
    resource: &R,
    plan: &ExecutionPlan,
    opts: &ExecuteOptions,
) -> Result<ExecuteReport> {
    use crate::context::{AutoConfirm, NoProgress};

    execute(resource, plan, opts, &mut NoProgress, &mut AutoConfirm)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{AutoConfirm, AutoDecline, NoProgress};
    use crate::schema::{AttributeSchema, PlanModifier, ResourceSchema};
    use crate::types::Diagnostics;
    use serde::{Deserialize, Serialize};
    use serde_json::json;
    use std::collections::BTreeMap;
    use std::sync::Arc;

    #[derive(Debug, Clone, Serialize, Deserialize)]
    struct Echo {
        input: String,
        output: Option<String>,
    }

    /// Echoes input into output; inputs starting with "fail" fail.
    #[derive(Default)]
    struct EchoResource {
        log: Arc<Mutex<Vec<String>>>,
        fail_delete: bool,
    }

    impl EchoResource {
        fn record(&self, entry: String) {
            lock(&self.log).push(entry);
        }

        fn log(&self) -> Vec<String> {
            lock(&self.log).clone()
        }
    }

    impl Resource for EchoResource {
        type Model = Echo;

        fn type_name(&self) -> &'static str {
            "echo"
        }

        fn schema(&self) -> ResourceSchema {
            ResourceSchema::new("echo")
                .attribute(
                    AttributeSchema::required("input")
                        .with_modifier(PlanModifier::RequiresReplace),
                )
                .attribute(AttributeSchema::computed("output"))
        }

        fn create(&self, _ctx: &OperationContext, planned: &Echo) -> OpResult<Echo> {
            self.record(format!("create {}", planned.input));
            if planned.input.starts_with("fail") {
                return Err(Diagnostic::error("Create failed", planned.input.clone()).into());
            }
            Ok(Echo {
                output: Some(planned.input.to_uppercase()),
                ..planned.clone()
            })
        }

        fn read(&self, _ctx: &OperationContext, state: &Echo) -> OpResult<Echo> {
            Ok(state.clone())
        }

        fn update(&self, ctx: &OperationContext, planned: &Echo, _prior: &Echo) -> OpResult<Echo> {
            self.create(ctx, planned)
        }

        fn delete(&self, _ctx: &OperationContext, state: &Echo) -> OpResult<()> {
            self.record(format!("delete {}", state.input));
            if self.fail_delete {
                return Err(Diagnostics::from(Diagnostic::error("Delete failed", "")));
            }
            Ok(())
        }
    }

    fn plan(resource: &EchoResource, configs: &[(&str, &str)], states: &[(&str, &str)]) -> ExecutionPlan {
        let configs: BTreeMap<String, Value> = configs
            .iter()
            .map(|(n, i)| ((*n).to_string(), json!({"input": i})))
            .collect();
        let states: BTreeMap<String, Value> = states
            .iter()
            .map(|(n, i)| ((*n).to_string(), json!({"input": i, "output": i.to_uppercase()})))
            .collect();
        ExecutionPlan::build(&resource.schema(), "echo", &configs, &states).unwrap()
    }

    fn opts(jobs: usize) -> ExecuteOptions {
        ExecuteOptions {
            jobs,
            ..Default::default()
        }
    }

    #[test]
    fn test_execute_empty_plan() {
        let resource = EchoResource::default();
        let report = execute_simple(&resource, &ExecutionPlan::new(), &opts(4)).unwrap();
        assert_eq!(report.summary.total(), 0);
        assert!(report.outcomes.is_empty());
    }

    #[test]
    fn test_execute_no_changes() {
        let resource = EchoResource::default();
        let plan = plan(&resource, &[("a", "x")], &[("a", "x")]);

        let report = execute_simple(&resource, &plan, &opts(4)).unwrap();
        assert_eq!(report.summary.no_change, 1);
        assert!(report.outcomes.is_empty());
        assert!(resource.log().is_empty());
    }

    #[test]
    fn test_execute_create_sets_state() {
        let resource = EchoResource::default();
        let plan = plan(&resource, &[("a", "x")], &[]);

        let report = execute_simple(&resource, &plan, &opts(1)).unwrap();
        assert_eq!(report.summary.created, 1);
        assert_eq!(
            report.outcomes[0].state,
            StateChange::Set(json!({"input": "x", "output": "X"}))
        );
    }

    #[test]
    fn test_execute_replace_deletes_then_creates() {
        let resource = EchoResource::default();
        let plan = plan(&resource, &[("a", "y")], &[("a", "x")]);
        assert_eq!(plan.changes[0].action, Action::Replace);

        let report = execute_simple(&resource, &plan, &opts(1)).unwrap();
        assert_eq!(report.summary.replaced, 1);
        assert_eq!(resource.log(), vec!["delete x", "create y"]);
    }

    #[test]
    fn test_execute_failed_create_keeps_nothing() {
        let resource = EchoResource::default();
        let plan = plan(&resource, &[("a", "fail")], &[]);

        let report = execute_simple(&resource, &plan, &opts(1)).unwrap();
        assert_eq!(report.summary.failed, 1);
        assert_eq!(report.outcomes[0].state, StateChange::Keep);
        assert!(!report.outcomes[0].result.is_success());
    }

    #[test]
    fn test_execute_failed_replace_create_removes_entry() {
        let resource = EchoResource::default();
        let plan = plan(&resource, &[("a", "fail-again")], &[("a", "x")]);

        let report = execute_simple(&resource, &plan, &opts(1)).unwrap();
        assert_eq!(report.outcomes[0].state, StateChange::Remove);
    }

    #[test]
    fn test_execute_failed_delete_keeps_entry() {
        let resource = EchoResource {
            fail_delete: true,
            ..Default::default()
        };
        let plan = plan(&resource, &[], &[("a", "x")]);

        let report = execute_simple(&resource, &plan, &opts(1)).unwrap();
        assert_eq!(report.summary.failed, 1);
        assert_eq!(report.outcomes[0].state, StateChange::Keep);
    }

    #[test]
    fn test_execute_declined() {
        let resource = EchoResource::default();
        let plan = plan(&resource, &[("a", "x"), ("b", "y")], &[]);

        let report = execute(&resource, &plan, &opts(4), &mut NoProgress, &mut AutoDecline).unwrap();
        assert_eq!(report.summary.skipped, 2);
        assert!(resource.log().is_empty());
    }

    #[test]
    fn test_execute_parallel_preserves_plan_order() {
        let resource = EchoResource::default();
        let configs: Vec<(String, String)> =
            (0..8).map(|i| (format!("e{i}"), format!("v{i}"))).collect();
        let refs: Vec<(&str, &str)> = configs.iter().map(|(n, v)| (n.as_str(), v.as_str())).collect();
        let plan = plan(&resource, &refs, &[]);

        let report = execute(&resource, &plan, &opts(4), &mut NoProgress, &mut AutoConfirm).unwrap();
        assert_eq!(report.summary.created, 8);
        let names: Vec<_> = report.outcomes.iter().map(|o| o.address.name.clone()).collect();
        let expected: Vec<_> = plan.changes.iter().map(|c| c.address.name.clone()).collect();
        assert_eq!(names, expected);
    }

    #[test]
    fn test_execute_cancelled_skips() {
        let resource = EchoResource::default();
        let plan = plan(&resource, &[("a", "x")], &[]);
        let opts = opts(1);
        opts.cancel.store(true, std::sync::atomic::Ordering::SeqCst);

        let report = execute_simple(&resource, &plan, &opts).unwrap();
        assert_eq!(report.summary.skipped, 1);
        assert!(resource.log().is_empty());
    }

    #[test]
    fn test_refresh_reads_state() {
        let resource = EchoResource::default();
        let state = json!({"input": "x", "output": "X"});
        let ctx = OperationContext::new();
        assert_eq!(refresh(&resource, &ctx, &state).unwrap(), state);
    }
}
