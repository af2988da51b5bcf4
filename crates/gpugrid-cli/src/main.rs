use std::path::PathBuf;

use clap::{Parser, Subcommand};
use gpugrid_state::GpuTypeFilter;

mod commands;

use commands::OutputFormat;

#[derive(Parser)]
#[command(
    name = "gpugrid",
    about = "GpuGrid — GPU cluster tenancy search and dashboard views",
    version,
    propagate_version = true,
)]
struct Cli {
    /// Reject snapshots that break an invariant instead of repairing them
    #[arg(long, global = true)]
    strict: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a generated sample snapshot as JSON
    Generate {
        /// RNG seed (default: current time)
        #[arg(short, long)]
        seed: Option<u64>,
        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Compound search over nodes, e.g. `A100-01/kim`
    Search {
        #[arg(short, long)]
        snapshot: PathBuf,
        #[arg(short, long)]
        query: String,
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
    /// Per-tenant GPU usage records matching every query token
    Users {
        #[arg(short, long)]
        snapshot: PathBuf,
        #[arg(short, long)]
        query: String,
        /// GPU type filter: all, A100, A30, H100, H200
        #[arg(short, long, default_value = "all")]
        gpu_type: GpuTypeFilter,
        /// Narrow the results by node name, user, team or GPU type
        #[arg(short, long)]
        refine: Option<String>,
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
    /// Replay selection events and print the derived dashboard view.
    ///
    /// The first --select is a plain click, later ones are modifier
    /// clicks that toggle membership. KEY is `gpu_id:user:team`.
    View {
        #[arg(short, long)]
        snapshot: PathBuf,
        #[arg(short, long, default_value = "")]
        query: String,
        /// Cluster tab (default from config)
        #[arg(short, long)]
        gpu_type: Option<GpuTypeFilter>,
        /// Filter for search hits and the tenant panel
        #[arg(long, default_value = "all")]
        search_gpu_type: GpuTypeFilter,
        #[arg(long = "select", value_name = "KEY")]
        selections: Vec<String>,
        /// Enter focus mode after selecting
        #[arg(long)]
        focus: bool,
        /// Highlight the GPUs of this job's user and team
        #[arg(long)]
        job: Option<String>,
        /// Open the node-detail panel for this node
        #[arg(long)]
        node: Option<String>,
        /// An expanded side panel covers the grid
        #[arg(long)]
        expand_panel: bool,
        /// Dashboard config (gpugrid.toml)
        #[arg(short, long)]
        config: Option<PathBuf>,
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("gpugrid=info".parse()?)
        )
        .init();

    let cli = Cli::parse();
    let policy = commands::ingest_policy(cli.strict);

    match cli.command {
        Commands::Generate { seed, output } => {
            commands::generate::generate(seed, output.as_deref())
        }
        Commands::Search { snapshot, query, format } => {
            commands::search::search(&snapshot, policy, &query, format)
        }
        Commands::Users { snapshot, query, gpu_type, refine, format } => {
            commands::users::users(&snapshot, policy, &query, gpu_type, refine.as_deref(), format)
        }
        Commands::View {
            snapshot,
            query,
            gpu_type,
            search_gpu_type,
            selections,
            focus,
            job,
            node,
            expand_panel,
            config,
            format,
        } => commands::view::view(commands::view::ViewArgs {
            snapshot: &snapshot,
            policy,
            query: &query,
            gpu_type,
            search_gpu_type,
            selections: &selections,
            focus,
            job: job.as_deref(),
            node: node.as_deref(),
            expand_panel,
            config: config.as_deref(),
            format,
        }),
    }
}
