//! Command-line interface for aerologix.
//!
//! This module provides the CLI structure for the `aerologix` binary.

mod commands;
pub mod output;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use commands::{
    AircraftCommand, ConfigCommand, HistoryCommand, OutputFormat, ReportCommand, SessionCommand,
};

/// aerologix - Flight timing and maintenance tracking
///
/// Times flights per aircraft and submits them to your AeroLogix logbook,
/// and reports how close each component is to its next maintenance.
#[derive(Debug, Parser)]
#[command(name = "aerologix")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to custom configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// The command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Time flights
    #[command(subcommand)]
    Session(SessionCommand),

    /// Show the maintenance status of each component
    Report(ReportCommand),

    /// Show flights submitted from this machine
    History(HistoryCommand),

    /// Manage aircraft on the backend
    #[command(subcommand)]
    Aircraft(AircraftCommand),

    /// View or check configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

impl Cli {
    /// Get the verbosity level based on flags.
    #[must_use]
    pub fn verbosity(&self) -> crate::logging::Verbosity {
        crate::logging::Verbosity::from_flags(self.verbose, self.quiet)
    }
}
