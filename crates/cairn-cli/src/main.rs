//! cairn command line.
//!
//! Ordered, resumable infrastructure migrations driven by shell commands.
//!
//! # Quick Start
//!
//! ```bash
//! # Create a target folder with a starter cairn.yaml
//! cairn init infra/staging
//!
//! # Create a migration in the current folder
//! cairn new "add storage bucket"
//!
//! # Apply pending migrations for a target
//! cairn up infra/staging
//! ```

mod commands;
mod style;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use commands::GlobalOptions;

/// cairn - ordered, resumable infrastructure migrations.
#[derive(Parser)]
#[command(name = "cairn")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Verbose logging, and trace each command as it runs.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Do not prompt for confirmation.
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Folder with migrations, instead of the parent of the target folder.
    #[arg(long, global = true, value_name = "DIR")]
    migrations: Option<PathBuf>,

    /// Disable colored output.
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a target folder with a starter cairn.yaml.
    Init {
        /// Target folder to create.
        target: PathBuf,
    },

    /// Create a new migration file.
    New {
        /// Title of the migration, used for the filename.
        title: String,

        /// Commands of the do section, one per line.
        #[arg(long = "do", value_name = "COMMANDS")]
        do_section: Option<String>,

        /// Commands of the undo section, one per line.
        #[arg(long = "undo", value_name = "COMMANDS")]
        undo_section: Option<String>,

        /// Commands of the view section, one per line.
        #[arg(long = "view", value_name = "COMMANDS")]
        view_section: Option<String>,

        /// Condition that must hold for the sections to run.
        #[arg(long = "if", value_name = "EXPRESSION")]
        condition: Option<String>,
    },

    /// Apply pending migrations.
    #[command(alias = "apply")]
    Up {
        /// Target folder holding cairn.yaml.
        target: PathBuf,

        /// Stop after applying this migration.
        stop: Option<String>,
    },

    /// Undo the last applied migration.
    #[command(alias = "rollback")]
    Down {
        /// Target folder holding cairn.yaml.
        target: PathBuf,
    },

    /// Show applied and pending migrations.
    Status {
        /// Target folder holding cairn.yaml.
        target: PathBuf,
    },

    /// Show the commands `up` would run, with variables substituted.
    Plan {
        /// Target folder holding cairn.yaml.
        target: PathBuf,

        /// Stop after this migration.
        stop: Option<String>,
    },

    /// Run view sections of applied migrations.
    View {
        /// Target folder holding cairn.yaml.
        target: PathBuf,

        /// Only view this migration.
        file: Option<String>,
    },

    /// Change state or run sections out of order.
    #[command(subcommand)]
    Force(ForceCommands),
}

#[derive(Subcommand)]
enum ForceCommands {
    /// Overwrite the last applied migration.
    State {
        /// Target folder holding cairn.yaml.
        target: PathBuf,

        /// Migration filename to record as last applied.
        file: String,
    },

    /// Run the do section of one migration. State is not changed.
    Do {
        /// Target folder holding cairn.yaml.
        target: PathBuf,

        /// Migration filename.
        file: String,
    },

    /// Run the undo section of one migration. State is not changed.
    Undo {
        /// Target folder holding cairn.yaml.
        target: PathBuf,

        /// Migration filename.
        file: String,
    },
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);
    if cli.no_color {
        style::set_no_color(true);
    }

    let options = GlobalOptions {
        verbose: cli.verbose,
        quiet: cli.quiet,
        migrations: cli.migrations,
    };

    match cli.command {
        Commands::Init { target } => commands::init::run(&target),
        Commands::New {
            title,
            do_section,
            undo_section,
            view_section,
            condition,
        } => commands::new::run(
            &options,
            &title,
            &commands::new::Sections {
                do_section,
                undo_section,
                view_section,
                condition,
            },
        ),
        Commands::Up { target, stop } => {
            commands::migrate::up(&options, &target, stop.as_deref().unwrap_or_default())
        }
        Commands::Down { target } => commands::migrate::down(&options, &target),
        Commands::Status { target } => commands::migrate::status(&options, &target),
        Commands::Plan { target, stop } => {
            commands::migrate::plan(&options, &target, stop.as_deref().unwrap_or_default())
        }
        Commands::View { target, file } => {
            commands::migrate::view(&options, &target, file.as_deref())
        }
        Commands::Force(cmd) => match cmd {
            ForceCommands::State { target, file } => {
                commands::force::state(&options, &target, &file)
            }
            ForceCommands::Do { target, file } => {
                commands::force::section(&options, &target, &file, cairn_migration::Section::Do)
            }
            ForceCommands::Undo { target, file } => {
                commands::force::section(&options, &target, &file, cairn_migration::Section::Undo)
            }
        },
    }
}
