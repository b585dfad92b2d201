//! CLI command definitions.
//!
//! This module defines the structure of all CLI subcommands.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Subcommand, ValueEnum};

use crate::session::SubmissionFlow;

/// Flight session commands.
#[derive(Debug, Subcommand)]
pub enum SessionCommand {
    /// Start timing a flight
    Start {
        /// Aircraft id
        aircraft: String,

        /// Submit as a pilot through this invite token instead of as the owner
        #[arg(long, value_name = "TOKEN")]
        invite: Option<String>,
    },

    /// Stop timing a flight and submit it
    Stop {
        /// Aircraft id
        aircraft: String,
    },

    /// Show tracked sessions
    Status {
        /// Only show this aircraft
        aircraft: Option<String>,

        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show elapsed time for tracked sessions until interrupted
    Watch {
        /// Override the configured tick interval
        #[arg(long, value_name = "MS")]
        interval_ms: Option<u64>,
    },
}

impl SessionCommand {
    /// Submission flow selected for `session start`.
    #[must_use]
    pub fn flow(invite: Option<&str>) -> SubmissionFlow {
        match invite {
            Some(token) => SubmissionFlow::PilotInvite {
                token: token.to_string(),
            },
            None => SubmissionFlow::Owner,
        }
    }
}

/// Maintenance report arguments.
#[derive(Debug, Args)]
pub struct ReportCommand {
    /// Fetch component and ELT settings for this aircraft from the backend
    #[arg(short, long, conflicts_with = "settings")]
    pub aircraft: Option<String>,

    /// Read component settings from a JSON file
    #[arg(short, long, value_name = "FILE")]
    pub settings: Option<PathBuf>,

    /// Read ELT settings from a JSON file
    #[arg(long, value_name = "FILE", requires = "settings")]
    pub elt: Option<PathBuf>,

    /// Compute the report as of this date (YYYY-MM-DD) instead of today
    #[arg(long, value_name = "DATE")]
    pub date: Option<NaiveDate>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,
}

/// Submission history arguments.
#[derive(Debug, Args)]
pub struct HistoryCommand {
    /// Only show flights for this aircraft
    #[arg(short, long)]
    pub aircraft: Option<String>,

    /// Maximum number of entries (defaults to `storage.history_limit`)
    #[arg(short, long)]
    pub limit: Option<usize>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,
}

/// Aircraft management commands.
#[derive(Debug, Subcommand)]
pub enum AircraftCommand {
    /// Delete aircraft from the backend
    Delete {
        /// Aircraft ids
        #[arg(required = true)]
        ids: Vec<String>,
    },
}

/// Configuration commands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show the configuration file path
    Path,

    /// Validate configuration
    Validate {
        /// Path to configuration file to validate
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}

/// Output format for commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Plain text output
    Plain,
    /// Formatted table
    #[default]
    Table,
    /// JSON output
    Json,
}
