//! SpecMem CLI: impact analysis, spec history and lifecycle governance.

mod commands;
mod config;
mod workspace;

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use workspace::Workspace;

/// Environment variable holding a `tracing` filter directive.
const LOG_ENV: &str = "SPECMEM_LOG";

#[derive(Parser)]
#[command(name = "specmem", version, about = "Spec-to-code impact graph and spec history")]
struct Cli {
    /// Print machine-readable JSON instead of text
    #[arg(long, global = true)]
    json: bool,
    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
    /// Configuration file (default: nearest .specmem.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Workspace directory (default: current directory)
    #[arg(short = 'C', long, global = true)]
    workspace: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build or inspect the impact graph
    Graph {
        #[command(subcommand)]
        action: GraphAction,
    },
    /// Show specs, code and tests affected by changed files
    Impact {
        /// Changed files, workspace-relative
        files: Vec<String>,
        /// Read changed files from a unified diff ("-" for stdin)
        #[arg(long)]
        git_diff: Option<PathBuf>,
        /// Maximum number of hops from a changed file
        #[arg(long)]
        depth: Option<usize>,
        /// Also follow suggested (heuristic) links
        #[arg(long)]
        suggested: bool,
        /// Ignore suggested links below this confidence
        #[arg(long)]
        min_confidence: Option<f64>,
    },
    /// Record a version for every spec block that changed
    Track,
    /// Show the version history of a spec
    History {
        /// Spec id
        id: String,
        /// Show only the newest N versions
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Show statement-level changes between two versions of a spec
    Diff {
        /// Spec id
        id: String,
        /// Older version (id, N or #N; default: the one before --to)
        #[arg(long)]
        from: Option<String>,
        /// Newer version (id, N or #N; default: latest)
        #[arg(long)]
        to: Option<String>,
    },
    /// Report specs whose cached version is stale
    Stale {
        /// Spec ids to check (default: all tracked specs)
        ids: Vec<String>,
        /// Cached version held for a spec, as ID=VERSION
        #[arg(long, value_name = "ID=VERSION")]
        cached: Vec<String>,
        /// Include acknowledged warnings
        #[arg(long)]
        all: bool,
    },
    /// Acknowledge a staleness warning
    Ack {
        /// Spec id
        id: String,
        /// The cached version being acknowledged
        version: String,
    },
    /// Report code that changed after the specs it implements
    Drift,
    /// List statements contradicted by later versions of a spec
    Contradictions {
        /// Spec id
        id: String,
    },
    /// List deprecated specs, most urgent first
    Deprecations {
        /// Include specs past their deadline
        #[arg(long)]
        include_expired: bool,
    },
    /// Move a spec to a new lifecycle status
    Transition {
        /// Spec id
        id: String,
        /// Target status (active, deprecated, legacy, obsolete)
        status: String,
        /// Who made the change
        #[arg(long)]
        actor: Option<String>,
        /// Why the change was made
        #[arg(long)]
        reason: Option<String>,
    },
    /// Show the lifecycle audit log
    Audit {
        /// Only entries for this spec
        id: Option<String>,
        /// Re-check the hash chain
        #[arg(long)]
        verify: bool,
    },
}

#[derive(Subcommand)]
enum GraphAction {
    /// Rebuild the graph from the spec blocks
    Build,
    /// Show node and edge counts
    Stats,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = run(cli);
    if let Err(e) = result {
        eprintln!("error: {e:#}");
        process::exit(1);
    }
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let start_dir = match cli.workspace {
        Some(dir) => dir,
        None => std::env::current_dir()?,
    };
    let ws = Workspace::discover(&start_dir, cli.config.as_deref())?;
    let json = cli.json;

    match cli.command {
        Commands::Graph { action } => match action {
            GraphAction::Build => commands::graph::build(&ws, json),
            GraphAction::Stats => commands::graph::stats(&ws, json),
        },

        Commands::Impact {
            files,
            git_diff,
            depth,
            suggested,
            min_confidence,
        } => {
            let impact = &ws.config().impact;
            let options = commands::impact::QueryOptions {
                depth: depth.unwrap_or(impact.depth),
                include_suggested: suggested || impact.include_suggested,
                min_confidence: min_confidence.or(impact.min_confidence),
            };
            commands::impact::run(&ws, &files, git_diff.as_deref(), &options, json)
        }

        Commands::Track => commands::history::track(&ws, json),
        Commands::History { id, limit } => commands::history::history(&ws, &id, limit, json),
        Commands::Diff { id, from, to } => {
            commands::history::diff(&ws, &id, from.as_deref(), to.as_deref(), json)
        }
        Commands::Contradictions { id } => commands::history::contradictions(&ws, &id, json),

        Commands::Stale { ids, cached, all } => commands::stale::stale(&ws, &ids, &cached, all, json),
        Commands::Ack { id, version } => commands::stale::ack(&ws, &id, &version, json),
        Commands::Drift => commands::stale::drift(&ws, json),

        Commands::Deprecations { include_expired } => {
            commands::lifecycle::deprecations(&ws, include_expired, json)
        }
        Commands::Transition {
            id,
            status,
            actor,
            reason,
        } => commands::lifecycle::transition(
            &ws,
            &id,
            &status,
            actor.as_deref(),
            reason.as_deref(),
            json,
        ),
        Commands::Audit { id, verify } => commands::lifecycle::audit(&ws, id.as_deref(), verify, json),
    }
}
