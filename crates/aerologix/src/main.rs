//! `aerologix` - CLI for flight session timing and maintenance reports
//!
//! This binary times flights, submits them to the AeroLogix backend, and
//! prints maintenance reports.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use std::path::Path;
use std::time::Duration;

use anyhow::{bail, Context};
use chrono::Local;
use clap::Parser;
use tokio::sync::mpsc;
use tracing::debug;

use aerologix::api::run_batch;
use aerologix::cli::{
    output, AircraftCommand, Cli, Command, ConfigCommand, HistoryCommand, OutputFormat,
    ReportCommand, SessionCommand,
};
use aerologix::maintenance::settings::{read_json_file, ComponentSettings, EltSettings};
use aerologix::{
    init_logging, report, ApiClient, Config, Error, FlightSession, SessionRecorder, StopOutcome,
    Storage, SubmissionFlow, Ticker,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbosity());

    // Validation reports its own errors instead of failing the load.
    if let Command::Config(ConfigCommand::Validate { file }) = &cli.command {
        let path = file
            .clone()
            .or_else(|| cli.config.clone())
            .unwrap_or_else(Config::default_config_path);
        return validate_config(&path);
    }

    let config = Config::load_from(cli.config.clone()).context("loading configuration")?;

    match cli.command {
        Command::Session(cmd) => handle_session(&config, cmd).await,
        Command::Report(cmd) => handle_report(&config, &cmd).await,
        Command::History(cmd) => handle_history(&config, &cmd),
        Command::Aircraft(cmd) => handle_aircraft(&config, cmd).await,
        Command::Config(cmd) => handle_config(&config, &cmd),
    }
}

fn open_recorder(config: &Config) -> anyhow::Result<SessionRecorder> {
    let storage = Storage::open(config.database_path())?;
    Ok(SessionRecorder::new(storage)?)
}

fn api_client(config: &Config) -> anyhow::Result<ApiClient> {
    ApiClient::new(&config.api).map_err(|e| anyhow::anyhow!(e.user_message()))
}

async fn handle_session(config: &Config, cmd: SessionCommand) -> anyhow::Result<()> {
    let recorder = open_recorder(config)?;

    match cmd {
        SessionCommand::Start { aircraft, invite } => {
            let flow = SessionCommand::flow(invite.as_deref());
            let session = recorder.start(&aircraft, flow)?;
            println!(
                "Tracking flight for {} ({}) since {}",
                session.aircraft_id,
                session.flow,
                session
                    .started_at
                    .map(aerologix::session::iso8601)
                    .unwrap_or_default()
            );
        }
        SessionCommand::Stop { aircraft } => {
            let client = api_client(config)?;
            match recorder.stop(&aircraft, &client).await {
                Ok(StopOutcome::Submitted(candidate)) => {
                    let destination = match candidate.flow {
                        SubmissionFlow::Owner => "Flight submitted for review",
                        SubmissionFlow::PilotInvite { .. } => "Flight submitted to the owner",
                    };
                    println!(
                        "{destination}: {} for {}",
                        output::format_elapsed(i64::from(candidate.duration_est_minutes)),
                        candidate.aircraft_id
                    );
                }
                Ok(StopOutcome::AlreadySubmitted { aircraft_id }) => {
                    println!("Flight for {aircraft_id} was already submitted; session cleared.");
                }
                Err(e @ Error::Submission { .. }) => {
                    bail!(
                        "{}\nThe session is still running. Run `aerologix session stop {aircraft}` to retry.",
                        e.user_message()
                    );
                }
                Err(e) => return Err(e.into()),
            }
        }
        SessionCommand::Status { aircraft, json } => {
            let sessions = match aircraft {
                Some(id) => vec![recorder.status(&id).unwrap_or_else(|| inactive(&id))],
                None => recorder.active(),
            };
            let format = if json {
                OutputFormat::Json
            } else {
                OutputFormat::Table
            };
            println!("{}", output::sessions(&sessions, format)?);
        }
        SessionCommand::Watch { interval_ms } => {
            let period = interval_ms.map_or_else(|| config.tick_interval(), Duration::from_millis);
            watch(&recorder, period).await?;
        }
    }
    Ok(())
}

fn inactive(aircraft_id: &str) -> FlightSession {
    let mut session =
        FlightSession::started(aircraft_id, SubmissionFlow::Owner, chrono::Utc::now());
    session.reset();
    session
}

async fn watch(recorder: &SessionRecorder, period: Duration) -> anyhow::Result<()> {
    let (tx, mut rx) = mpsc::channel(4);
    let ticker = Ticker::spawn(recorder.tracker().clone(), period, tx);
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    eprintln!("Watching sessions every {period:?}; press Ctrl-C to stop.");
    loop {
        tokio::select! {
            snapshot = rx.recv() => {
                if snapshot.is_none() {
                    break;
                }
                let sessions = recorder.refresh()?;
                println!("{}\n", output::sessions(&sessions, OutputFormat::Table)?);
            }
            _ = &mut ctrl_c => {
                debug!("Interrupted");
                break;
            }
        }
    }

    ticker.stop().await;
    Ok(())
}

async fn handle_report(config: &Config, cmd: &ReportCommand) -> anyhow::Result<()> {
    let today = cmd.date.unwrap_or_else(|| Local::now().date_naive());

    let rows = if let Some(aircraft) = &cmd.aircraft {
        api_client(config)?
            .maintenance_report(aircraft, today)
            .await
            .map_err(|e| anyhow::anyhow!(e.user_message()))?
    } else if let Some(path) = &cmd.settings {
        let settings: ComponentSettings =
            read_json_file(path).with_context(|| format!("loading {}", path.display()))?;
        let elt: Option<EltSettings> = match &cmd.elt {
            Some(path) => Some(
                read_json_file(path).with_context(|| format!("loading {}", path.display()))?,
            ),
            None => None,
        };
        report(&settings, elt.as_ref(), today)
    } else {
        bail!("either --aircraft or --settings is required");
    };

    println!("{}", output::report(&rows, cmd.format)?);
    Ok(())
}

fn handle_history(config: &Config, cmd: &HistoryCommand) -> anyhow::Result<()> {
    let storage = Storage::open(config.database_path())?;
    let limit = cmd.limit.unwrap_or(config.storage.history_limit);

    let records = match &cmd.aircraft {
        Some(aircraft) => storage.submissions_for(aircraft, limit)?,
        None => storage.recent_submissions(limit)?,
    };
    let stats = storage.stats()?;
    println!("{}", output::history(&records, &stats, cmd.format)?);
    Ok(())
}

async fn handle_aircraft(config: &Config, cmd: AircraftCommand) -> anyhow::Result<()> {
    match cmd {
        AircraftCommand::Delete { ids } => {
            let client = api_client(config)?;
            let client = &client;
            let outcome = run_batch(&ids, |id| async move { client.delete_aircraft(&id).await })
                .await;

            let summary = outcome.summary("Deleted");
            if !outcome.is_complete() {
                bail!(summary);
            }
            println!("{summary}");
        }
    }
    Ok(())
}

fn validate_config(path: &Path) -> anyhow::Result<()> {
    println!("Validating configuration: {}", path.display());
    match Config::load_from(Some(path.to_path_buf())) {
        Ok(_) => {
            println!("Configuration is valid.");
            Ok(())
        }
        Err(e) => bail!("Configuration error: {e}"),
    }
}

fn handle_config(config: &Config, cmd: &ConfigCommand) -> anyhow::Result<()> {
    match cmd {
        ConfigCommand::Show { json } => {
            let mut shown = config.clone();
            if shown.api.auth_token.is_some() {
                shown.api.auth_token = Some("********".to_string());
            }
            if *json {
                println!("{}", serde_json::to_string_pretty(&shown)?);
            } else {
                println!("Current Configuration");
                println!("=====================");
                println!();
                println!("[API]");
                println!("  Base URL:           {}", shown.api.base_url);
                println!(
                    "  Auth token:         {}",
                    if shown.api.auth_token.is_some() { "set" } else { "not set" }
                );
                println!("  Timeout (secs):     {}", shown.api.timeout_secs);
                println!();
                println!("[Session]");
                println!("  Tick interval (ms): {}", shown.session.tick_interval_ms);
                println!();
                println!("[Storage]");
                println!("  Database path:      {}", shown.database_path().display());
                println!("  History limit:      {}", shown.storage.history_limit);
            }
        }
        ConfigCommand::Path => {
            println!("{}", Config::default_config_path().display());
        }
        ConfigCommand::Validate { .. } => {
            validate_config(&Config::default_config_path())?;
        }
    }
    Ok(())
}
