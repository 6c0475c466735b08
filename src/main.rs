use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use tracing::info;

mod card;
mod dashboard;
mod form;
mod models;
mod report;
mod seed;
mod session;
mod telemetry;
mod validation;

use dashboard::Dashboard;
use models::{Incident, SeverityFilter, SortOrder};

#[derive(Parser)]
#[command(name = "incident-dashboard", version)]
#[command(about = "Track and triage AI safety incidents from the terminal", long_about = None)]
struct Cli {
    /// Log at debug level (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct SeedArgs {
    /// CSV file with id,title,description,severity,reported_at rows
    #[arg(long, env = "INCIDENT_SEED_CSV")]
    seed: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Open the dashboard and read commands from stdin
    Interactive {
        #[command(flatten)]
        seed: SeedArgs,
    },
    /// Render the incident list once and exit
    List {
        #[command(flatten)]
        seed: SeedArgs,
        #[arg(long, default_value = "all")]
        severity: SeverityFilter,
        #[arg(long, default_value = "newest")]
        sort: SortOrder,
        /// Show the full description of these incident ids
        #[arg(long, value_delimiter = ',')]
        expand: Vec<u64>,
        #[arg(long)]
        json: bool,
    },
}

fn load_incidents(args: &SeedArgs) -> anyhow::Result<Vec<Incident>> {
    match &args.seed {
        Some(path) => {
            let incidents = seed::load_csv(path)
                .with_context(|| format!("failed to load seed file {}", path.display()))?;
            info!(count = incidents.len(), path = %path.display(), "loaded seed incidents");
            Ok(incidents)
        }
        None => seed::seed_incidents(),
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    telemetry::init_logging(cli.verbose)?;

    match cli.command {
        Commands::Interactive { seed } => {
            let mut dashboard = Dashboard::new(load_incidents(&seed)?);
            let stdin = io::stdin();
            let mut stdout = io::stdout();
            session::run(&mut dashboard, stdin.lock(), &mut stdout)?;
        }
        Commands::List {
            seed,
            severity,
            sort,
            expand,
            json,
        } => {
            let mut dashboard = Dashboard::new(load_incidents(&seed)?);
            dashboard.set_severity_filter(severity);
            dashboard.set_sort_order(sort);
            session::expand_incidents(&mut dashboard, expand)?;

            let mut stdout = io::stdout().lock();
            if json {
                let rendered =
                    report::render_json(&dashboard).context("failed to encode incidents")?;
                writeln!(stdout, "{rendered}")?;
            } else {
                write!(stdout, "{}", report::render(&dashboard))?;
            }
        }
    }

    Ok(())
}
