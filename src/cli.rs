use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "modelgarden")]
#[command(author = "Alberto Cavalcante")]
#[command(version)]
#[command(about = "Declarative structured generation with Vertex AI models", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Config file [default: ./modelgarden.toml]
    #[arg(long, global = true, env = crate::paths::ENV_CONFIG)]
    pub config: Option<PathBuf>,

    /// State file [default: ~/.local/state/modelgarden/state.toml]
    #[arg(long, global = true)]
    pub state: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Preview what apply would change
    Plan(PlanArgs),

    /// Generate responses until state matches the config
    Apply(ApplyArgs),

    /// Forget every entity in state
    Destroy(DestroyArgs),

    /// Show stored entities
    Show(ShowArgs),

    /// Translate a response schema and print the wire form
    Schema(SchemaArgs),

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Debug, Args)]
pub struct PlanArgs {
    /// Target a specific entity (e.g. model_garden.weather)
    #[arg(long)]
    pub target: Option<String>,
}

#[derive(Debug, Args)]
pub struct ApplyArgs {
    /// Skip the confirmation prompt
    #[arg(short, long)]
    pub yes: bool,

    /// Number of entities generated in parallel
    #[arg(short, long, default_value = "4")]
    pub jobs: usize,

    /// Target a specific entity (e.g. model_garden.weather)
    #[arg(long)]
    pub target: Option<String>,
}

#[derive(Debug, Args)]
pub struct DestroyArgs {
    /// Skip the confirmation prompt
    #[arg(short, long)]
    pub yes: bool,

    /// Target a specific entity (e.g. model_garden.weather)
    #[arg(long)]
    pub target: Option<String>,
}

#[derive(Debug, Args)]
pub struct ShowArgs {
    /// Entity address (e.g. model_garden.weather); all entities if omitted
    pub address: Option<String>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct SchemaArgs {
    /// Schema file, or - for stdin
    pub file: String,
}
