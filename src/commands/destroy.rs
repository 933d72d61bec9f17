use anyhow::Result;

use crate::Context;
use crate::cli::DestroyArgs;
use crate::config::Config;
use crate::resource::model_garden::ModelGardenResource;
use crate::state::StateFile;
use crate::ui;
use declarative::{ExecuteOptions, ExecutionPlan, Resource};

pub fn run(ctx: &Context, args: &DestroyArgs) -> Result<()> {
    // Entities are forgotten even when the config is gone
    let config = Config::load_optional(&ctx.config_path)?;
    let provider = super::configure(&config)?;
    let resource = ModelGardenResource::new(provider.options);

    let mut state = StateFile::load(&ctx.state_path)?;
    let states = state.entities()?;
    if states.is_empty() {
        ui::info("No entities in state, nothing to destroy");
        return Ok(());
    }

    let plan = ExecutionPlan::destroy(&resource.schema(), resource.type_name(), &states)
        .filter_by_target(args.target.as_deref())
        .map_err(super::plan_error)?;

    ui::header("Destroying");
    ui::plan(&plan);

    let opts = ExecuteOptions {
        timeout: provider.timeout,
        ..Default::default()
    };
    let report = super::execute(ctx, &resource, &plan, &opts, args.yes)?;
    super::finish(ctx, &mut state, &report)
}
