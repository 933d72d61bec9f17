//! Command implementations
//!
//! - `plan` - Preview what apply would change
//! - `apply` - Generate responses until state matches the config
//! - `destroy` - Forget entities
//! - `show` - Print stored entities
//! - `schema` - Translate a response schema

pub mod apply;
pub mod destroy;
pub mod plan;
pub mod schema;
pub mod show;

use anyhow::{Result, bail};
use colored::Colorize;
use declarative::{
    AutoConfirm, ConfirmCallback, ExecuteOptions, ExecuteReport, ExecutionPlan, OperationContext,
    Resource,
};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::Context;
use crate::config::Config;
use crate::progress::ApplyProgress;
use crate::provider::{self, Provider};
use crate::resource::model_garden::ModelGardenResource;
use crate::state::StateFile;
use crate::ui;

/// Configure the provider, printing diagnostics on failure
pub fn configure(config: &Config) -> Result<Provider> {
    match provider::configure(&config.provider) {
        Ok(provider) => Ok(provider),
        Err(diags) => {
            ui::diagnostics(&diags);
            bail!("Provider configuration failed")
        }
    }
}

/// Re-read every stored entity through the resource
///
/// Refreshed values replace the stored ones in memory.
pub fn refresh(
    resource: &ModelGardenResource,
    ctx: &OperationContext,
    state: &mut StateFile,
) -> Result<BTreeMap<String, Value>> {
    let mut refreshed = BTreeMap::new();
    for (name, value) in state.entities()? {
        log::trace!("Refreshing {}.{name}", resource.type_name());
        match declarative::refresh(resource, ctx, &value) {
            Ok(value) => {
                state.set(&name, value.clone())?;
                refreshed.insert(name, value);
            }
            Err(diags) => {
                ui::diagnostics(&diags);
                bail!("Failed to refresh {}.{name}", resource.type_name());
            }
        }
    }
    Ok(refreshed)
}

/// Turn a planning error into a printed report
pub fn plan_error(err: declarative::Error) -> anyhow::Error {
    match err {
        declarative::Error::Invalid(diags) => {
            ui::diagnostics(&diags);
            anyhow::anyhow!("Invalid configuration")
        }
        other => other.into(),
    }
}

/// Build the plan for every configured and stored entity
pub fn build_plan(
    resource: &ModelGardenResource,
    config: &Config,
    states: &BTreeMap<String, Value>,
    target: Option<&str>,
) -> Result<ExecutionPlan> {
    let configs = config.entities()?;
    ExecutionPlan::build(&resource.schema(), resource.type_name(), &configs, states)
        .and_then(|plan| plan.filter_by_target(target))
        .map_err(plan_error)
}

/// Asks on the terminal before applying
pub struct PromptConfirm;

impl ConfirmCallback for PromptConfirm {
    fn confirm(&mut self, prompt: &str) -> Result<bool> {
        println!();
        let confirmed = dialoguer::Confirm::new()
            .with_prompt(prompt)
            .default(false)
            .interact()?;
        Ok(confirmed)
    }
}

/// Execute a plan with terminal progress
pub fn execute(
    ctx: &Context,
    resource: &ModelGardenResource,
    plan: &ExecutionPlan,
    opts: &ExecuteOptions,
    yes: bool,
) -> Result<ExecuteReport> {
    let mut progress = ApplyProgress::new(ctx.quiet);
    if yes {
        declarative::execute(resource, plan, opts, &mut progress, &mut AutoConfirm)
    } else {
        declarative::execute(resource, plan, opts, &mut progress, &mut PromptConfirm)
    }
}

/// Persist outcomes and report failures
///
/// State is saved even when some entities failed, so the ones that
/// succeeded are not generated again.
pub fn finish(ctx: &Context, state: &mut StateFile, report: &ExecuteReport) -> Result<()> {
    if report.outcomes.is_empty() && report.summary.skipped > 0 {
        ui::warn("Cancelled, nothing was changed");
        return Ok(());
    }

    let changed = state.commit(&report.outcomes)?;
    if changed > 0 {
        state.save(&ctx.state_path)?;
        log::info!("Saved {changed} change(s) to {}", ctx.state_path.display());
    }

    for outcome in &report.outcomes {
        if let declarative::ApplyResult::Failed { diagnostics } = &outcome.result {
            eprintln!();
            ui::error(&outcome.address.to_string().bold().to_string());
            ui::diagnostics(diagnostics);
        }
    }

    ui::print_summary(&report.summary);

    if !report.summary.is_success() {
        bail!("{} entity operation(s) failed", report.summary.failed);
    }
    Ok(())
}
