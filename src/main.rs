use booking_grid::args::{Args, Command};
use booking_grid::{commands, Config, Result};
use clap::Parser;
use std::process::ExitCode;
use tracing::{debug, error, trace};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    let log_level = args.common().log_level();
    init_logger(log_level);
    debug!("Log level set to {}", log_level.to_string().to_lowercase());

    match main_inner(args).await {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Exiting with error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

pub async fn main_inner(args: Args) -> Result<()> {
    trace!("{args:?}");
    let home = args.common().bookings_home().path();

    let _: () = match args.command() {
        Command::Init(init_args) => {
            commands::init(home, init_args.backend(), init_args.months())
                .await?
                .print()
        }
        Command::Set(set_args) => commands::set(Config::load(home).await?, set_args.clone())
            .await?
            .print(),
        Command::Expense(expense_args) => {
            commands::expense(Config::load(home).await?, expense_args.clone())
                .await?
                .print()
        }
        Command::Show(show_args) => commands::show(Config::load(home).await?, show_args.clone())
            .await?
            .print(),
        Command::Clear(clear_args) => {
            commands::clear(Config::load(home).await?, clear_args.clone())
                .await?
                .print()
        }
        Command::Import(import_args) => {
            commands::import(Config::load(home).await?, import_args.clone())
                .await?
                .print()
        }
        Command::Export(export_args) => {
            commands::export(Config::load(home).await?, export_args.clone())
                .await?
                .print()
        }
        Command::Stats(stats_args) => {
            commands::stats(Config::load(home).await?, stats_args.clone())
                .await?
                .print()
        }
    };
    Ok(())
}

/// Initializes the tracing subscriber.
pub fn init_logger(level: LevelFilter) {
    let filter = match std::env::var("RUST_LOG").ok() {
        Some(_) => {
            // RUST_LOG exists; use it.
            EnvFilter::from_default_env()
        }
        None => {
            // RUST_LOG does not exist; use default log level for this crate only.
            EnvFilter::new(format!(
                "{}={},{}={}",
                env!("CARGO_CRATE_NAME"),
                level,
                env!("CARGO_BIN_NAME"),
                level
            ))
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
