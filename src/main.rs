//! SimuFed command-line entry point.
//!
//! ```bash
//! simufed partitions --clients 5
//! simufed sync --clients 5 --drop-prob 0.2 --max-delay 3
//! simufed async --clients 5 --grace 1
//! simufed experiments --output results.csv
//! ```

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::error;

use simufed::coordinator::{AsyncCoordinator, RoundConfig, SyncCoordinator};
use simufed::experiment::{
    generate_partitions, stats_line, summary_text, write_partitions, write_results_csv,
    ExperimentPlan, ExperimentRunner, PartitionPlan,
};
use simufed::fault::FaultConfig;
use simufed::monitoring::{init_logging, LogFormat, LogLevel, LoggerConfig};

/// SimuFed - federated statistical aggregation simulator
#[derive(Parser, Debug)]
#[command(name = "simufed")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", global = true)]
    log_level: LogLevel,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run one synchronous (barrier) round
    Sync(RoundArgs),
    /// Run one asynchronous (streaming) round
    Async(RoundArgs),
    /// Generate synthetic CSV partitions
    Partitions(PartitionArgs),
    /// Sweep drop probabilities in both modes and write a results table
    Experiments(ExperimentArgs),
}

#[derive(Args, Debug)]
struct RoundArgs {
    /// JSON round configuration; flags below are ignored when given
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Directory with partition_<i>.csv files
    #[arg(long, default_value = "datasets")]
    dataset_dir: PathBuf,

    /// Number of clients
    #[arg(long, default_value_t = 3)]
    clients: usize,

    /// Histogram bin count
    #[arg(long, default_value_t = 10)]
    bins: usize,

    /// Lower bound of the shared histogram range
    #[arg(long, default_value_t = -15.0, allow_negative_numbers = true)]
    hist_min: f64,

    /// Upper bound of the shared histogram range
    #[arg(long, default_value_t = 15.0, allow_negative_numbers = true)]
    hist_max: f64,

    /// Round timeout in seconds
    #[arg(long, default_value_t = 5.0)]
    timeout: f64,

    /// Per-client drop probability
    #[arg(long, default_value_t = 0.0)]
    drop_prob: f64,

    /// Maximum simulated delay per client in seconds
    #[arg(long, default_value_t = 0.0)]
    max_delay: f64,

    /// Silence after the last update that closes an asynchronous round, in seconds
    #[arg(long, default_value_t = 1.0)]
    grace: f64,
}

impl RoundArgs {
    fn round_config(&self) -> Result<RoundConfig> {
        if let Some(path) = &self.config {
            return RoundConfig::from_json_file(path)
                .with_context(|| format!("Failed to load configuration from {}", path.display()));
        }

        let config = RoundConfig {
            clients: self.clients,
            dataset_dir: self.dataset_dir.clone(),
            bins: self.bins,
            hist_range: Some([self.hist_min, self.hist_max]),
            faults: FaultConfig {
                drop_probability: self.drop_prob,
                max_delay: seconds(self.max_delay, "max-delay")?,
            },
            timeout: seconds(self.timeout, "timeout")?,
            grace_period: seconds(self.grace, "grace")?,
            ..Default::default()
        };
        config.validate()?;
        Ok(config)
    }
}

#[derive(Args, Debug)]
struct PartitionArgs {
    /// Output directory
    #[arg(long, default_value = "datasets")]
    outdir: PathBuf,

    /// Number of partitions
    #[arg(long, default_value_t = 3)]
    clients: usize,

    /// Rows per partition
    #[arg(long, default_value_t = 1000)]
    rows: usize,

    /// RNG seed
    #[arg(long, default_value_t = 42)]
    seed: u64,
}

#[derive(Args, Debug)]
struct ExperimentArgs {
    #[command(flatten)]
    round: RoundArgs,

    /// Drop probabilities to sweep
    #[arg(long, value_delimiter = ',', default_values_t = vec![0.0, 0.5, 0.8])]
    drop_probs: Vec<f64>,

    /// Results table path
    #[arg(long, default_value = "results.csv")]
    output: PathBuf,
}

fn seconds(value: f64, name: &str) -> Result<Duration> {
    Duration::try_from_secs_f64(value).with_context(|| format!("--{name} must be a non-negative number of seconds"))
}

fn check_dataset(config: &RoundConfig) -> Result<()> {
    for id in 1..=config.clients as u32 {
        let path = config.partition_path(id);
        if !path.exists() {
            bail!(
                "Missing dataset file: {} (generate with `simufed partitions`)",
                path.display()
            );
        }
    }
    Ok(())
}

async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Sync(args) => {
            let config = args.round_config()?;
            check_dataset(&config)?;

            let result = SyncCoordinator::new(config.timeout)
                .run_round(config.client_configs())
                .await?;
            println!("{}", summary_text(&result));
            println!("{}", stats_line(&result));
        }
        Command::Async(args) => {
            let config = args.round_config()?;
            check_dataset(&config)?;

            let result = AsyncCoordinator::new(config.timeout, config.grace_period)
                .run_round_with_progress(config.client_configs(), |p| {
                    println!(
                        "[Async] Update {}/{} from client {} -> global mean={:.4}, var={:.4}",
                        p.received, p.expected, p.client_id, p.aggregate.mean, p.aggregate.variance
                    );
                })
                .await?;
            println!("{}", summary_text(&result));
            println!("{}", stats_line(&result));
        }
        Command::Partitions(args) => {
            let plan = PartitionPlan {
                clients: args.clients,
                rows: args.rows,
                seed: args.seed,
            };
            let partitions = generate_partitions(&plan)?;
            let paths = write_partitions(&args.outdir, &partitions)?;
            println!(
                "Created {} CSV partitions in {}/ (pooled mean=0, std={})",
                paths.len(),
                args.outdir.display(),
                args.clients
            );
        }
        Command::Experiments(args) => {
            let base = args.round.round_config()?;
            check_dataset(&base)?;

            let plan = ExperimentPlan {
                base,
                drop_probabilities: args.drop_probs,
                ..Default::default()
            };
            let records = ExperimentRunner::new(plan).run().await?;
            write_results_csv(&args.output, &records)
                .with_context(|| format!("Failed to write {}", args.output.display()))?;
            println!("Saved {} with {} rows", args.output.display(), records.len());
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let logger = LoggerConfig {
        level: cli.log_level,
        format: if cli.json_logs { LogFormat::Json } else { LogFormat::Text },
        directives: None,
    };
    if let Err(e) = init_logging(&logger) {
        eprintln!("Failed to initialize logging: {e}");
        return ExitCode::FAILURE;
    }

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_round_args_defaults() {
        let cli = Cli::parse_from(["simufed", "sync", "--clients", "5", "--hist-min", "-3"]);
        let Command::Sync(args) = cli.command else {
            panic!("expected sync subcommand");
        };
        let config = args.round_config().unwrap();
        assert_eq!(config.clients, 5);
        assert_eq!(config.hist_range, Some([-3.0, 15.0]));
        assert_eq!(config.timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_negative_timeout_rejected() {
        let cli = Cli::parse_from(["simufed", "async", "--timeout=-1"]);
        let Command::Async(args) = cli.command else {
            panic!("expected async subcommand");
        };
        assert!(args.round_config().is_err());
    }

    #[test]
    fn test_experiment_drop_probs() {
        let cli = Cli::parse_from(["simufed", "experiments", "--drop-probs", "0.1,0.9"]);
        let Command::Experiments(args) = cli.command else {
            panic!("expected experiments subcommand");
        };
        assert_eq!(args.drop_probs, vec![0.1, 0.9]);
    }
}
