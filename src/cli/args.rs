use crate::config::DEFAULT_CONFIG_FILE;
use clap::{Args, CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use std::net::IpAddr;
use std::path::PathBuf;
use std::time::Duration;

fn parse_seconds(s: &str) -> Result<Duration, String> {
    let value: f64 = parse_number(s)?;

    if !value.is_finite() || value < 0.0 {
        return Err(format!("'{s}' must be a non-negative number of seconds"));
    }

    Duration::try_from_secs_f64(value).map_err(|_| format!("'{s}' is out of range"))
}

fn parse_positive_seconds(s: &str) -> Result<Duration, String> {
    let value = parse_seconds(s)?;

    if value.is_zero() {
        return Err("must be greater than zero".to_string());
    }

    Ok(value)
}

fn parse_backoff_factor(s: &str) -> Result<f64, String> {
    let value: f64 = parse_number(s)?;

    if !value.is_finite() || value <= 1.0 {
        return Err("backoff-factor must be greater than 1".to_string());
    }

    Ok(value)
}

fn parse_attempts(s: &str) -> Result<u32, String> {
    let value: u32 = parse_number(s)?;

    if value == 0 {
        return Err("attempts must be at least 1".to_string());
    }

    if value > 10 {
        return Err("attempts must be at most 10".to_string());
    }

    Ok(value)
}

fn parse_error_rate(s: &str) -> Result<f64, String> {
    let value: f64 = parse_number(s)?;

    if !(0.0..=1.0).contains(&value) {
        return Err("error-rate must be between 0 and 1".to_string());
    }

    Ok(value)
}

fn parse_number<T: std::str::FromStr>(s: &str) -> Result<T, String> {
    s.parse()
        .map_err(|_| format!("'{s}' is not a valid number"))
}

#[derive(Parser, Debug)]
#[command(name = "tpoll", version, about = "Translation job status poller")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to configuration file
    #[arg(long, global = true, env = "TPOLL_CONFIG")]
    pub config: Option<PathBuf>,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Control color output
    #[arg(long, value_enum, default_value = "auto", global = true)]
    pub color: ColorChoice,
}

impl Cli {
    /// Config file to read, and whether the user named it explicitly.
    pub fn config_path(&self) -> (PathBuf, bool) {
        match &self.config {
            Some(path) => (path.clone(), true),
            None => (PathBuf::from(DEFAULT_CONFIG_FILE), false),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum ColorChoice {
    #[default]
    Auto,
    Always,
    Never,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Wait for a translation job to finish and print its status
    Status(StatusArgs),

    /// Run a mock status server that simulates translation jobs
    Serve(ServeArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Args, Debug)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: Shell,
}

impl CompletionsArgs {
    /// Generates and prints shell completions to stdout.
    pub fn generate(&self) {
        let mut cmd = Cli::command();
        clap_complete::generate(self.shell, &mut cmd, "tpoll", &mut std::io::stdout());
    }
}

#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Translation job identifier
    pub job_id: String,

    /// Overall time to wait for the job, in seconds
    #[arg(
        long,
        env = "TPOLL_TIMEOUT",
        default_value = "300",
        value_parser = parse_positive_seconds
    )]
    pub timeout: Duration,

    /// Base URL of the translation service
    #[arg(long, env = "TPOLL_BASE_URL")]
    pub base_url: Option<String>,

    /// API key sent with every status request
    #[arg(long, env = "TPOLL_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Delay before the first re-poll, in seconds
    #[arg(long, env = "TPOLL_INITIAL_INTERVAL", value_parser = parse_positive_seconds)]
    pub initial_interval: Option<Duration>,

    /// Upper bound on the delay between polls, in seconds
    #[arg(long, env = "TPOLL_MAX_INTERVAL", value_parser = parse_positive_seconds)]
    pub max_interval: Option<Duration>,

    /// Growth factor applied to the delay after each poll (> 1)
    #[arg(long, env = "TPOLL_BACKOFF_FACTOR", value_parser = parse_backoff_factor)]
    pub backoff_factor: Option<f64>,

    /// Consecutive transport failures tolerated before giving up
    #[arg(long, env = "TPOLL_TRANSPORT_RETRIES")]
    pub transport_retries: Option<u32>,

    /// Deadline for a single status request, in seconds
    #[arg(long, env = "TPOLL_REQUEST_TIMEOUT", value_parser = parse_positive_seconds)]
    pub request_timeout: Option<Duration>,

    /// Total polls of the job when it reports failure (1-10)
    #[arg(long, default_value = "1", value_parser = parse_attempts)]
    pub attempts: u32,
}

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Address to listen on
    #[arg(long, env = "TPOLL_SERVE_HOST", default_value = "127.0.0.1")]
    pub host: IpAddr,

    /// Port to listen on
    #[arg(short, long, env = "TPOLL_SERVE_PORT", default_value = "8000")]
    pub port: u16,

    /// Shortest simulated job duration, in seconds
    #[arg(long, default_value = "15", value_parser = parse_seconds)]
    pub min_duration: Duration,

    /// Longest simulated job duration, in seconds
    #[arg(long, default_value = "30", value_parser = parse_seconds)]
    pub max_duration: Duration,

    /// Probability that a query on a running job reports an error (0-1)
    #[arg(long, default_value = "0.15", value_parser = parse_error_rate)]
    pub error_rate: f64,

    /// Seed for reproducible job durations and failures
    #[arg(long)]
    pub seed: Option<u64>,
}
