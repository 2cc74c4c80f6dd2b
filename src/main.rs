use std::path::PathBuf;

use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use projectdesk::config::DataPaths;
use projectdesk::db::Database;
use projectdesk::models::{
    BaselineId, EntityKind, MemberId, ProjectId, ProjectStatus, TaskStatus,
};
use projectdesk::prefs::Preferences;
use projectdesk::query::{AssigneeFilter, ProjectFilter, SearchQuery, TaskFilter};

#[derive(Parser)]
#[command(name = "pdesk")]
#[command(about = "Offline project, task, team and document tracking")]
struct Cli {
    /// Data directory (defaults to $PROJECTDESK_DATA_DIR or the platform data dir)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show where data is stored
    Paths,
    /// Print dashboard statistics
    Stats,
    /// Search across projects, tasks, members, documents, risks, meetings and research
    Search {
        text: String,

        /// Restrict to one or more entity kinds
        #[arg(short, long)]
        kind: Vec<EntityKind>,
    },
    /// List projects
    Projects {
        #[arg(short, long)]
        status: Option<ProjectStatus>,
    },
    /// List tasks
    Tasks {
        #[arg(short, long)]
        project: Option<u64>,

        #[arg(short, long)]
        status: Option<TaskStatus>,

        /// Member id, or `unassigned`
        #[arg(short, long, value_parser = parse_assignee)]
        assignee: Option<AssigneeFilter>,
    },
    /// Show the critical path of a project
    Schedule { project: u64 },
    /// Show a project's risk register, highest score first
    Risks { project: u64 },
    /// List a project's meeting notes, most recent first
    Meetings { project: u64 },
    /// Capture the current tasks of a project as a baseline
    Baseline {
        project: u64,

        #[arg(short, long)]
        label: Option<String>,
    },
    /// Compare a baseline with the live schedule
    Variance { baseline: u64 },
    /// Show or change the active theme
    Theme { name: Option<String> },
    /// Write a timestamped copy of the dataset
    Backup {
        /// Target directory (defaults to the backups folder in the data dir)
        #[arg(short, long)]
        dir: Option<PathBuf>,
    },
}

fn parse_assignee(value: &str) -> Result<AssigneeFilter, String> {
    if value.eq_ignore_ascii_case("unassigned") {
        return Ok(AssigneeFilter::Unassigned);
    }
    value
        .parse::<u64>()
        .map(|id| AssigneeFilter::Member(MemberId(id)))
        .map_err(|_| format!("expected a member id or `unassigned`, got `{value}`"))
}

/// Logs go to stderr so stdout carries only JSON output.
fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| "projectdesk=info".into()),
    );

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let explicit_dir = cli.data_dir.is_some();
    let paths = match cli.data_dir {
        Some(dir) => DataPaths::in_dir(dir),
        None => DataPaths::resolve()?,
    };
    let open_database = || {
        if explicit_dir {
            Database::open(paths.dataset_file())
        } else {
            Database::open_default()
        }
    };

    match cli.command {
        Commands::Paths => {
            println!("data dir:    {}", paths.data_dir().display());
            println!("dataset:     {}", paths.dataset_file().display());
            println!("preferences: {}", paths.preferences_file().display());
            println!("backups:     {}", paths.backup_dir().display());
        }
        Commands::Stats => {
            let db = open_database()?;
            print_json(&db.statistics())?;
        }
        Commands::Search { text, kind } => {
            let db = open_database()?;
            print_json(&db.search(&SearchQuery::new(text).in_kinds(kind)))?;
        }
        Commands::Projects { status } => {
            let db = open_database()?;
            let filter = ProjectFilter {
                status,
                ..ProjectFilter::default()
            };
            print_json(&db.filter_projects(&filter))?;
        }
        Commands::Tasks {
            project,
            status,
            assignee,
        } => {
            let db = open_database()?;
            let filter = TaskFilter {
                project_id: project.map(ProjectId),
                status,
                assignee,
                ..TaskFilter::default()
            };
            print_json(&db.filter_tasks(&filter))?;
        }
        Commands::Schedule { project } => {
            let db = open_database()?;
            print_json(&db.critical_path(ProjectId(project))?)?;
        }
        Commands::Risks { project } => {
            let db = open_database()?;
            print_json(&db.get_risks_by_project(ProjectId(project))?)?;
        }
        Commands::Meetings { project } => {
            let db = open_database()?;
            print_json(&db.get_meeting_notes_by_project(ProjectId(project))?)?;
        }
        Commands::Baseline { project, label } => {
            let db = open_database()?;
            print_json(&db.create_baseline(ProjectId(project), label)?)?;
        }
        Commands::Variance { baseline } => {
            let db = open_database()?;
            print_json(&db.baseline_variance(BaselineId(baseline))?)?;
        }
        Commands::Theme { name } => {
            let mut prefs = Preferences::open(paths.preferences_file())?;
            if let Some(name) = name {
                prefs.set_theme(&name)?;
            }
            println!("{}", prefs.theme());
        }
        Commands::Backup { dir } => {
            let db = open_database()?;
            let dir = dir.unwrap_or_else(|| paths.backup_dir());
            let path = db.backup(&dir)?;
            println!("{}", path.display());
        }
    }

    Ok(())
}
