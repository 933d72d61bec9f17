use anyhow::Result;

use crate::Context;
use crate::cli::PlanArgs;
use crate::config::Config;
use crate::resource::model_garden::ModelGardenResource;
use crate::state::StateFile;
use crate::ui;
use declarative::OperationContext;

pub fn run(ctx: &Context, args: &PlanArgs) -> Result<()> {
    let config = Config::load(&ctx.config_path)?;
    let provider = super::configure(&config)?;
    let resource = ModelGardenResource::new(provider.options);

    let mut state = StateFile::load(&ctx.state_path)?;
    let op_ctx = OperationContext::new().with_timeout(provider.timeout);
    let states = super::refresh(&resource, &op_ctx, &mut state)?;

    let plan = super::build_plan(&resource, &config, &states, args.target.as_deref())?;
    log::debug!("Planned {} entities", plan.len());

    if !ctx.quiet && plan.has_changes() {
        ui::header("Execution Plan");
    }
    ui::plan(&plan);
    Ok(())
}
