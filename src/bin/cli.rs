#![cfg(not(tarpaulin_include))]

use chrono::Utc;
use clap::Parser;
use env_logger::Env;
use guesthouse::config::Config;
use guesthouse::import::{ImportMode, run_import};
use guesthouse::record::{FieldSchema, timestamp};
use guesthouse::store::GuestStore;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(name = "guest-import", about = "Import a channel booking export into the guests tab")]
struct Args {
    /// Booking.com or Airbnb export (.csv, .xls, .xlsx)
    file: PathBuf,

    /// Reconcile and report without writing to the sheet
    #[arg(long, default_value = "false")]
    dry_run: bool,

    /// Override GUESTS_TAB
    #[arg(long)]
    tab: Option<String>,
}

async fn import(args: Args) -> Result<String, Box<dyn std::error::Error>> {
    let mut config = Config::from_env()?;
    if let Some(tab) = args.tab {
        config.guests_tab = tab;
        config.validate()?;
    }

    let file_name = args
        .file
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_default();
    let bytes = tokio::fs::read(&args.file).await?;

    let store = GuestStore::new(config.backend(), &config.guests_tab, FieldSchema::default());
    let mode = if args.dry_run {
        ImportMode::DryRun
    } else {
        ImportMode::Apply
    };

    let report = run_import(
        &store,
        config.policy,
        &file_name,
        &bytes,
        mode,
        &timestamp(Utc::now()),
    )
    .await?;

    Ok(serde_json::to_string_pretty(&report)?)
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(Env::default().default_filter_or("warn")).init();

    match import(Args::parse()).await {
        Ok(report) => {
            println!("{}", report);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
