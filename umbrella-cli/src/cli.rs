use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use umbrella_core::{
    Advisor, Config, DayIndex, FileStore, ForecastCache, LocationResolver,
    provider::provider_from_config,
};

use crate::{configure, display};

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "umbrella", version, about = "Should you carry an umbrella today?")]
pub struct Cli {
    /// Log debug details to stderr (RUST_LOG overrides this).
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Defaults to `check` for today.
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Check whether rain is expected.
    Check(CheckArgs),

    /// Interactively set the fallback location, timezone and thresholds.
    Configure,

    /// Print where the config file and forecast cache live.
    ConfigPath,
}

#[derive(Debug, Default, Args)]
pub struct CheckArgs {
    /// Look at tomorrow instead of today.
    #[arg(long, conflicts_with = "day")]
    pub tomorrow: bool,

    /// Day to check: "today" or "tomorrow".
    #[arg(long, value_parser = parse_day)]
    pub day: Option<DayIndex>,

    /// Ignore a recently saved forecast and ask the provider again.
    #[arg(long)]
    pub refresh: bool,

    /// Latitude to use instead of detecting the position.
    #[arg(long, requires = "lon", allow_hyphen_values = true)]
    pub lat: Option<f64>,

    /// Longitude to use instead of detecting the position.
    #[arg(long, requires = "lat", allow_hyphen_values = true)]
    pub lon: Option<f64>,

    /// Print the full report as JSON.
    #[arg(long)]
    pub json: bool,

    /// Keep forecasts in memory only; nothing is read from or written to disk.
    #[arg(long)]
    pub no_cache: bool,
}

impl CheckArgs {
    pub fn day(&self) -> DayIndex {
        if self.tomorrow { DayIndex::Tomorrow } else { self.day.unwrap_or_default() }
    }
}

fn parse_day(value: &str) -> Result<DayIndex, String> {
    DayIndex::try_from(value).map_err(|err| err.to_string())
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<ExitCode> {
        match self.command.unwrap_or(Command::Check(CheckArgs::default())) {
            Command::Check(args) => check(args).await,
            Command::Configure => {
                let cfg = configure::prompt(Config::load()?)?;
                cfg.save()?;
                println!("Saved configuration to {}", Config::config_file_path()?.display());
                Ok(ExitCode::SUCCESS)
            }
            Command::ConfigPath => {
                println!("config: {}", Config::config_file_path()?.display());
                println!("cache:  {}", Config::cache_file_path()?.display());
                Ok(ExitCode::SUCCESS)
            }
        }
    }
}

async fn check(args: CheckArgs) -> anyhow::Result<ExitCode> {
    let mut config = Config::load()?;
    if let Some(position) = args.lat.zip(args.lon) {
        config.set_fixed_position(Some(position));
    }

    let advisor = Advisor::new(
        LocationResolver::from_config(&config),
        provider_from_config(&config)?,
        forecast_cache(args.no_cache),
        &config,
    );

    match advisor.update(args.day(), args.refresh).await {
        Ok(report) => {
            if args.json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print!("{}", display::render(&report));
            }
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => {
            tracing::debug!(error = ?err, "update failed");
            eprintln!("{}", display::FAILURE_STATUS);
            Ok(ExitCode::FAILURE)
        }
    }
}

fn forecast_cache(memory_only: bool) -> ForecastCache {
    if memory_only {
        return ForecastCache::in_memory();
    }

    match Config::cache_file_path() {
        Ok(path) => ForecastCache::new(Box::new(FileStore::new(path))),
        Err(err) => {
            tracing::warn!(error = %err, "no cache directory, forecasts will not be saved");
            ForecastCache::in_memory()
        }
    }
}
