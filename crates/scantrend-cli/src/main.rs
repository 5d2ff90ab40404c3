//! scantrend CLI: the user-facing command-line interface.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use commands::{FilterArgs, OutputFormat, SourceArgs};

mod commands;

#[derive(Parser)]
#[command(
    name = "scantrend",
    version,
    about = "Competency scan trends for a class dashboard"
)]
struct Cli {
    /// Config file path
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Read scores from this snapshot file instead of the configured source
    #[arg(long, global = true)]
    snapshot: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the dashboard overview for the current scan
    Overview {
        #[command(flatten)]
        filters: FilterArgs,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,

        /// Also write the overview JSON to this file
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Drill into one category of the current scan
    Category {
        /// Category id
        category_id: String,

        #[command(flatten)]
        filters: FilterArgs,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// List students in the current scan
    Students {
        #[command(flatten)]
        filters: FilterArgs,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Show one student's scores across every scan
    History {
        /// Student id
        student_id: String,

        /// Restrict to one course
        #[arg(long)]
        course: Option<String>,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Show goals and reflections recorded in one scan
    Feedback {
        /// Scan (window) id
        window_id: String,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Check a snapshot file for malformed score data
    Validate {
        /// Snapshot JSON file
        path: PathBuf,
    },

    /// Create a starter config and demo snapshot
    Init,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("scantrend_core=info,scantrend_sources=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let source = SourceArgs {
        config: cli.config,
        snapshot: cli.snapshot,
    };

    let result = match cli.command {
        Commands::Overview {
            filters,
            format,
            output,
        } => commands::overview::execute(&source, filters, format, output).await,
        Commands::Category {
            category_id,
            filters,
            format,
        } => commands::category::execute(&source, &category_id, filters, format).await,
        Commands::Students { filters, format } => {
            commands::students::execute(&source, filters, format).await
        }
        Commands::History {
            student_id,
            course,
            format,
        } => commands::history::execute(&source, &student_id, course, format).await,
        Commands::Feedback { window_id, format } => {
            commands::feedback::execute(&source, &window_id, format).await
        }
        Commands::Validate { path } => commands::validate::execute(&source, &path),
        Commands::Init => commands::init::execute(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
