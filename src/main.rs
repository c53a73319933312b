use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use wellbeing_rs::render;
use wellbeing_rs::{Dashboard, DashboardConfig, Dataset};

#[derive(Parser)]
#[command(name = "wellbeing")]
#[command(about = "Activity, sentiment and risk overview of a child's school email export", long_about = None)]
struct Cli {
    /// TOML configuration file; the environment is used when absent
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Print JSON instead of text
    #[arg(long, global = true)]
    json: bool,
    /// Log filter used when RUST_LOG is unset
    #[arg(long, global = true, default_value = "info")]
    log_level: String,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Activity metrics for an uploaded export
    Overview {
        #[arg(long)]
        csv: PathBuf,
        /// Number of message rows to list
        #[arg(long, default_value_t = 20)]
        rows: usize,
    },
    /// Risk categories and sentiment summary
    Wellbeing {
        #[arg(long)]
        csv: PathBuf,
        /// Messages sent to the classifier
        #[arg(long, conflicts_with = "all")]
        sample_size: Option<usize>,
        /// Classify every message
        #[arg(long)]
        all: bool,
        /// Classifier calls in flight at once
        #[arg(long)]
        concurrency: Option<usize>,
    },
    /// Ask the assistant a free-form question
    Ask { question: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level)?;

    match cli.command {
        Commands::Overview { csv, rows } => {
            let Some(dataset) = load_dataset(&csv) else {
                return Ok(());
            };
            let overview = dataset.overview();
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&overview)?);
            } else {
                print!("{}", render::render_overview(&overview));
                println!();
                print!("{}", render::render_messages(&dataset, Some(rows)));
            }
        }
        Commands::Wellbeing {
            csv,
            sample_size,
            all,
            concurrency,
        } => {
            let Some(dataset) = load_dataset(&csv) else {
                return Ok(());
            };

            let mut config = load_config(cli.config.as_deref())?;
            if all {
                config = config.with_sample_size(None);
            } else if let Some(size) = sample_size {
                config = config.with_sample_size(Some(size));
            }
            if let Some(concurrency) = concurrency {
                config = config.with_max_concurrency(concurrency);
            }
            let dashboard = Dashboard::from_config(&config).context("failed to set up model clients")?;

            let cancel = CancellationToken::new();
            let on_interrupt = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    tracing::warn!("interrupted; returning partial results");
                    on_interrupt.cancel();
                }
            });

            let report = dashboard.wellbeing_with_cancel(&dataset, &cancel).await;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print!("{}", render::render_wellbeing(&report));
            }
        }
        Commands::Ask { question } => {
            let config = load_config(cli.config.as_deref())?;
            let dashboard = Dashboard::from_config(&config).context("failed to set up model clients")?;
            let answer = dashboard.ask(&question).await;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&answer)?);
            } else {
                print!("{}", render::render_answer(&question, &answer));
            }
        }
    }

    Ok(())
}

fn init_tracing(level: &str) -> anyhow::Result<()> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(level))
        .context("invalid log filter")?;

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    Ok(())
}

fn load_config(path: Option<&Path>) -> anyhow::Result<DashboardConfig> {
    match path {
        Some(path) => DashboardConfig::from_toml_file(path)
            .with_context(|| format!("failed to load config from {}", path.display())),
        None => DashboardConfig::from_env().context("failed to load config from the environment"),
    }
}

/// A bad upload is a user-facing prompt, not a failure of the tool
fn load_dataset(path: &Path) -> Option<Dataset> {
    match Dataset::from_path(path) {
        Ok(dataset) => Some(dataset),
        Err(err) => {
            println!("{}", err.user_message());
            None
        }
    }
}
