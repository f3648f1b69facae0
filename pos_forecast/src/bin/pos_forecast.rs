use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use pos_forecast::{ForecastConfig, ForecastService, ModelStrategy, Result, UserId, WeatherObservation};
use serde::Serialize;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, Level};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[clap(author, version, about)]
struct Cli {
    #[clap(short, long, global = true)]
    log_level: Option<String>,
    /// TOML configuration file
    #[clap(short, long, global = true)]
    config: Option<PathBuf>,
    /// Storage root, overriding the configuration
    #[clap(short, long, global = true)]
    root: Option<PathBuf>,
    /// Model strategy for training: random_forest or weighted_blend
    #[clap(short, long, global = true)]
    strategy: Option<ModelStrategy>,
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replace a user's dataset with a Shift_JIS CSV export
    Upload { user: u64, file: PathBuf },
    /// Train and store a model from the user's dataset
    Train { user: u64 },
    Predict {
        user: u64,
        /// Target date, YYYY-MM-DD
        date: NaiveDate,
        /// Weather label such as 晴れ or sunny; defaults to fine weather
        #[clap(short, long)]
        weather: Option<String>,
        #[clap(short, long)]
        temperature: Option<f64>,
    },
    Stats {
        user: u64,
        /// Show the dashboard overview instead of the detailed breakdown
        #[clap(short, long)]
        dashboard: bool,
    },
    Status { user: u64 },
    Records {
        user: u64,
        #[clap(long, default_value = "0")]
        skip: usize,
        #[clap(long, default_value = "100")]
        limit: usize,
    },
    Delete { user: u64 },
}

fn main() -> ExitCode {
    let args = Cli::parse();
    setup_logging(&args.log_level);

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{}", err);
            eprintln!("error: {}", err);
            ExitCode::FAILURE
        }
    }
}

fn run(args: Cli) -> Result<()> {
    let mut config = match &args.config {
        Some(path) => ForecastConfig::from_file(path)?,
        None => ForecastConfig::default(),
    };
    if let Some(root) = args.root {
        config = config.with_storage_root(root);
    }
    if let Some(strategy) = args.strategy {
        config = config.with_strategy(strategy);
    }
    let service = ForecastService::open(config)?;

    match args.command {
        Commands::Upload { user, file } => {
            let bytes = std::fs::read(&file)?;
            print_json(&service.upload(UserId(user), &bytes)?)
        }
        Commands::Train { user } => print_json(&service.train(UserId(user))?),
        Commands::Predict {
            user,
            date,
            weather,
            temperature,
        } => {
            let mut observation = WeatherObservation::fallback();
            if let Some(label) = weather {
                observation = WeatherObservation::new(label, observation.temperature);
            }
            if let Some(temperature) = temperature {
                observation.temperature = temperature;
            }
            print_json(&service.predict(UserId(user), date, &observation)?)
        }
        Commands::Stats { user, dashboard } => {
            if dashboard {
                print_json(&service.dashboard(UserId(user))?)
            } else {
                print_json(&service.stats(UserId(user))?)
            }
        }
        Commands::Status { user } => print_json(&service.status(UserId(user))?),
        Commands::Records { user, skip, limit } => {
            print_json(&service.records(UserId(user), skip, limit)?)
        }
        Commands::Delete { user } => print_json(&service.delete(UserId(user))?),
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn setup_logging(log_level: &Option<String>) {
    let log_level = match log_level
        .as_deref()
        .unwrap_or("info")
        .to_lowercase()
        .as_str()
    {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(format!("pos_forecast={},warn", log_level)))
        .with_writer(std::io::stderr)
        .without_time()
        .init();
}
