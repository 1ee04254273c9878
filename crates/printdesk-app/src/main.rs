// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Printdesk: desktop print pipeline and self-updater
//
// Entry point. Initialises logging and backend services, opens a view
// session whose events are written to the log, and runs one command.

mod services;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use printdesk_bridge::ViewSession;
use printdesk_bridge::traits::EventSink;
use printdesk_core::types::{PrintSource, UiEvent, UpdateState};
use tracing::{error, info, warn};

use services::app_services::AppServices;

/// Print documents through the desktop print pipeline.
#[derive(Parser, Debug)]
#[command(name = "printdesk", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print a file (asks for one when omitted)
    Print {
        file: Option<PathBuf>,
        /// Destination printer; the system default when omitted
        #[arg(short, long)]
        printer: Option<String>,
    },
    /// List the printers the system knows about
    Printers,
    /// Check for a newer release and download it
    Update {
        /// Install the downloaded release and restart
        #[arg(long)]
        install: bool,
    },
    /// Show the effective configuration and write it to config.json
    Config,
}

/// Session sink for a headless run: UI events go to the log as JSON.
struct LogSink;

impl EventSink for LogSink {
    fn emit(&self, event: UiEvent) {
        match serde_json::to_string(&event) {
            Ok(json) => info!(event = event.name(), payload = %json, "ui event"),
            Err(e) => warn!(event = event.name(), error = %e, "unserialisable ui event"),
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    info!("Printdesk starting");

    let svc = AppServices::init();
    let session = ViewSession::new(Arc::new(LogSink));
    svc.attach_session(session.clone());

    let command = cli.command.unwrap_or(Command::Print {
        file: None,
        printer: None,
    });
    // Runs alongside the command and is awaited before exit.
    let launch_check = if svc.config().update.check_on_launch
        && !matches!(command, Command::Update { .. })
    {
        svc.check_for_updates()
    } else {
        None
    };

    let code = match command {
        Command::Print { file, printer } => print(&svc, &session, file, printer).await,
        Command::Printers => {
            for printer in svc.list_printers().await {
                let marker = if printer.is_default { " (default)" } else { "" };
                println!("{}\t{}{marker}", printer.name, printer.display_name);
            }
            ExitCode::SUCCESS
        }
        Command::Update { install } => update(&svc, install).await,
        Command::Config => {
            let config = svc.config();
            match serde_json::to_string_pretty(&config) {
                Ok(json) => println!("{json}"),
                Err(e) => warn!(error = %e, "could not render config"),
            }
            match svc.save_config(&config) {
                Ok(()) => {
                    info!(dir = %svc.data_dir().display(), "config saved");
                    ExitCode::SUCCESS
                }
                Err(e) => {
                    error!(error = %e, "could not write config");
                    ExitCode::FAILURE
                }
            }
        }
    };

    if let Some(check) = launch_check {
        if let Err(e) = check.await {
            warn!(error = %e, "launch update check task failed");
        }
    }

    svc.shutdown();
    svc.detach_session(session.id());
    session.close();
    code
}

async fn print(
    svc: &AppServices,
    session: &ViewSession,
    file: Option<PathBuf>,
    printer: Option<String>,
) -> ExitCode {
    let file = match file {
        Some(file) => Some(file),
        None => svc.select_file().await,
    };
    let Some(file) = file else {
        info!("nothing selected, nothing printed");
        return ExitCode::SUCCESS;
    };

    let result = svc
        .submit_print(session, PrintSource::ExternalFile(file), printer)
        .await;
    if let Some(message) = &result.message {
        println!("{message}");
    }
    if result.success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

async fn update(svc: &AppServices, install: bool) -> ExitCode {
    let Some(check) = svc.check_for_updates() else {
        println!("No update feed is configured.");
        return ExitCode::FAILURE;
    };
    if let Err(e) = check.await {
        error!(error = %e, "update check task failed");
        return ExitCode::FAILURE;
    }

    if matches!(svc.update_state(), Some(UpdateState::Available(_))) {
        if let Some(download) = svc.download_update() {
            if let Err(e) = download.await {
                error!(error = %e, "update download task failed");
                return ExitCode::FAILURE;
            }
        }
    }

    match svc.update_state() {
        Some(UpdateState::Downloaded { info, artifact }) => {
            println!("Printdesk {} is ready at {}", info.version, artifact.display());
            if install {
                if let Some(task) = svc.install_update() {
                    let _ = task.await;
                }
            }
            ExitCode::SUCCESS
        }
        Some(UpdateState::NoUpdateFound) => {
            println!("Printdesk is up to date.");
            ExitCode::SUCCESS
        }
        other => {
            warn!(state = ?other, "update did not complete");
            ExitCode::FAILURE
        }
    }
}
