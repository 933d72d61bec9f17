use anyhow::Result;

use crate::Context;
use crate::cli::ApplyArgs;
use crate::config::Config;
use crate::resource::model_garden::ModelGardenResource;
use crate::state::StateFile;
use crate::ui;
use declarative::{ExecuteOptions, OperationContext};

pub fn run(ctx: &Context, args: &ApplyArgs) -> Result<()> {
    let config = Config::load(&ctx.config_path)?;
    let provider = super::configure(&config)?;
    let timeout = provider.timeout;
    let resource = ModelGardenResource::new(provider.options);

    let mut state = StateFile::load(&ctx.state_path)?;
    let states = super::refresh(
        &resource,
        &OperationContext::new().with_timeout(timeout),
        &mut state,
    )?;

    let plan = super::build_plan(&resource, &config, &states, args.target.as_deref())?;
    if !plan.has_changes() {
        ui::success("No changes. Your model gardens match the configuration.");
        return Ok(());
    }

    ui::header("Applying Configuration");
    ui::plan(&plan);

    let opts = ExecuteOptions {
        jobs: args.jobs.max(1),
        timeout,
        ..Default::default()
    };
    let report = super::execute(ctx, &resource, &plan, &opts, args.yes)?;
    super::finish(ctx, &mut state, &report)
}
