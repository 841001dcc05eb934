//! Command-line interface for questlog
//!
//! This module defines the CLI structure using clap derive macros.
//! Each subcommand is defined in its own submodule.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::error::Result;

mod claim;
mod init;
mod log;
mod quests;
mod status;

/// questlog - Quest & Progression Metrics Engine
///
/// Turns a journal of job applications and manual activity streams into
/// quest progression: daily/weekly/lifetime metrics, time-boxed event
/// quests, and claimable rewards.
#[derive(Parser, Debug)]
#[command(name = "questlog")]
#[command(author, version, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Data directory (defaults to the platform data dir)
    #[arg(long, global = true, env = "QUESTLOG_DIR")]
    pub dir: Option<PathBuf>,

    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize a questlog data directory
    Init,

    /// Append entries to the journal
    #[command(subcommand)]
    Log(LogCommands),

    /// Show today's and this week's metrics
    Status,

    /// Show resolved quest tabs
    Quests {
        /// Show a single tab
        tab: Option<String>,
    },

    /// Claim a completed quest's reward
    Claim {
        /// Claim key or quest id
        key: String,
    },
}

/// Journal subcommands
#[derive(Subcommand, Debug)]
pub enum LogCommands {
    /// Log a job application
    App {
        /// Platform the application went through
        #[arg(long)]
        platform: String,

        /// Application kind: full or easy
        #[arg(long, default_value = "easy")]
        kind: String,

        /// City the position is in
        #[arg(long)]
        city: Option<String>,

        /// CV was tailored for this application
        #[arg(long)]
        cv_tailored: bool,

        /// Motivation letter attached
        #[arg(long)]
        motivation: bool,

        /// Mark as favorite
        #[arg(long)]
        favorite: bool,

        /// Quality score, 0-3
        #[arg(long)]
        quality: Option<u8>,

        /// Timestamp override (RFC 3339 or YYYY-MM-DD; default now)
        #[arg(long)]
        date: Option<String>,
    },

    /// Log an entry on a manual stream (coldOutreach, skillLearning, ...)
    Manual {
        /// Stream name
        stream: String,

        /// Timestamp override (RFC 3339 or YYYY-MM-DD; default now)
        #[arg(long)]
        date: Option<String>,
    },

    /// Record an application status change
    Status {
        /// Application id
        id: String,

        /// New status (Applied, Rejected, Ghosted, Interview)
        to: String,
    },
}

impl Cli {
    /// Execute the CLI command
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Init => init::run(self.dir, self.json, self.quiet),
            Commands::Log(cmd) => match cmd {
                LogCommands::App {
                    platform,
                    kind,
                    city,
                    cv_tailored,
                    motivation,
                    favorite,
                    quality,
                    date,
                } => log::run_app(log::AppOptions {
                    platform,
                    kind,
                    city,
                    cv_tailored,
                    motivation,
                    favorite,
                    quality,
                    date,
                    dir: self.dir,
                    json: self.json,
                    quiet: self.quiet,
                }),
                LogCommands::Manual { stream, date } => log::run_manual(log::ManualOptions {
                    stream,
                    date,
                    dir: self.dir,
                    json: self.json,
                    quiet: self.quiet,
                }),
                LogCommands::Status { id, to } => log::run_status(log::StatusOptions {
                    id,
                    to,
                    dir: self.dir,
                    json: self.json,
                    quiet: self.quiet,
                }),
            },
            Commands::Status => status::run(self.dir, self.json, self.quiet),
            Commands::Quests { tab } => quests::run(quests::QuestsOptions {
                tab,
                dir: self.dir,
                json: self.json,
                quiet: self.quiet,
            }),
            Commands::Claim { key } => claim::run(claim::ClaimOptions {
                key,
                dir: self.dir,
                json: self.json,
                quiet: self.quiet,
            }),
        }
    }
}
