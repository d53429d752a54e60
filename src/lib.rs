pub mod authorization;
pub mod booking;
pub mod cancellation;
pub mod clinic_state;
pub mod commands;
pub mod config;
pub mod db;
pub mod directory;
pub mod error;
pub mod ledger;
pub mod lifecycle;
pub mod models;
pub mod slots;

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::clinic_state::ClinicState;
use crate::commands::Cli;

pub fn run() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    tracing::debug!("{} v{}", config::APP_NAME, config::APP_VERSION);

    let settings = match cli.settings.clone().or_else(config::settings_path) {
        Some(path) => match config::load_settings(&path) {
            Ok(settings) => settings,
            Err(e) => {
                tracing::warn!(error = %e, "Settings rejected");
                eprintln!("{e}");
                return ExitCode::FAILURE;
            }
        },
        None => config::ClinicSettings::default(),
    };

    let Some(db_path) = cli.db.clone().or_else(config::database_path) else {
        eprintln!("Cannot determine home directory; pass --db");
        return ExitCode::FAILURE;
    };
    if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        if let Err(e) = std::fs::create_dir_all(parent) {
            eprintln!("Cannot create {}: {e}", parent.display());
            return ExitCode::FAILURE;
        }
    }

    let state = match ClinicState::open(&db_path, settings) {
        Ok(state) => state,
        Err(e) => {
            eprintln!("Cannot open database {}: {e}", db_path.display());
            return ExitCode::FAILURE;
        }
    };

    match commands::execute(&state, cli.command) {
        Ok(value) => {
            println!("{value:#}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("{e}");
            ExitCode::FAILURE
        }
    }
}
