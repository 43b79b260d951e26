//! histoplot command line front-end
//!
//! Thin glue around the core entry points: build a configuration from
//! archive files, render the enabled plots, monitor archives as they
//! appear, or compute metrics over registered records.

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing::error;

use histoplot_core::{
    compute_metrics, configure_from_sources, overlay_plots_for_sources, plot_for_each_source,
    render_enabled_plots, run_monitor, DataRegistry, LoadOptions, MonitorOptions, PlotConfig,
};
use histoplot_io::SourceExtractor;

#[derive(Parser)]
#[command(name = "histoplot", about = "Extract and plot records from analysis archives")]
struct Cli {
    /// Verbose log output
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Build a plot configuration from archive files
    Configure {
        /// Input archives to enumerate
        #[arg(short, long, num_args = 1.., required = true)]
        files: Vec<PathBuf>,

        /// One label per input file
        #[arg(short, long, num_args = 1..)]
        labels: Vec<String>,

        /// Where to write the derived JSON configuration
        #[arg(short, long, default_value = "config.json")]
        output: PathBuf,

        /// Declare one single-record plot per source found
        #[arg(long)]
        single: bool,

        /// Declare overlay plots for sources with matching structure
        #[arg(long)]
        overlay: bool,

        /// Enable plots (pass "all" to enable every plot)
        #[arg(long = "enable-plots", num_args = 1..)]
        enable_plots: Vec<String>,
    },

    /// Load records and render the enabled plots
    Plot {
        /// Plot configuration
        #[arg(short, long)]
        config: PathBuf,

        /// Top directory where to save plots
        #[arg(short, long, default_value = "./")]
        output: PathBuf,

        /// Render everything into one summary figure
        #[arg(long)]
        all_in_one: bool,

        /// Load every declared source, not only the referenced ones
        #[arg(long)]
        load_all: bool,
    },

    /// Re-extract and re-render on a fixed interval
    Monitor {
        /// Plot configuration
        #[arg(short, long)]
        config: PathBuf,

        /// Top directory where to save plots
        #[arg(short, long, default_value = "./")]
        output: PathBuf,

        /// Seconds between cycles
        #[arg(long, default_value_t = 5)]
        interval: u64,

        /// Render everything into one summary figure
        #[arg(long)]
        all_in_one: bool,
    },

    /// Compute metrics over registered records
    Metrics {
        /// Plot configuration
        #[arg(short, long)]
        config: PathBuf,

        /// Record identifiers to evaluate
        #[arg(short, long, num_args = 1.., required = true)]
        identifiers: Vec<String>,

        /// Metric names to compute
        #[arg(short, long, num_args = 1.., default_values_t = [String::from("integral")])]
        metrics: Vec<String>,

        /// Also compute pairwise comparisons
        #[arg(long)]
        compare: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level)),
        )
        .init();

    match run(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err}");
            ExitCode::FAILURE
        }
    }
}

fn run(command: Command) -> Result<(), Box<dyn std::error::Error>> {
    let mut extractor = SourceExtractor::new();

    match command {
        Command::Configure {
            files,
            labels,
            output,
            single,
            overlay,
            enable_plots,
        } => {
            let labels = if labels.is_empty() { None } else { Some(labels.as_slice()) };
            let mut config = configure_from_sources(&mut extractor, &files, labels, None)?;
            if single {
                plot_for_each_source(&mut config);
            }
            if overlay {
                overlay_plots_for_sources(&mut config);
            }
            if !enable_plots.is_empty() {
                config.enable_plots(&enable_plots);
            }
            config.write(&output)?;
        }

        Command::Plot {
            config,
            output,
            all_in_one,
            load_all,
        } => {
            let config = PlotConfig::read(&config)?;
            let mut registry = DataRegistry::new();
            registry.load_from_config(
                &mut extractor,
                &config,
                LoadOptions {
                    load_all,
                    ..LoadOptions::default()
                },
            )?;
            render_enabled_plots(&registry, &config, &output, all_in_one, false)?;
        }

        Command::Monitor {
            config,
            output,
            interval,
            all_in_one,
        } => {
            let config = PlotConfig::read(&config)?;
            let mut registry = DataRegistry::new();
            let options = MonitorOptions {
                interval: Duration::from_secs(interval),
                output_dir: output,
                all_in_one,
                ..MonitorOptions::default()
            };
            run_monitor(&mut extractor, &mut registry, &config, &options)?;
        }

        Command::Metrics {
            config,
            identifiers,
            metrics,
            compare,
        } => {
            let config = PlotConfig::read(&config)?;
            let mut registry = DataRegistry::new();
            for identifier in &identifiers {
                let _ = registry.load_one(&mut extractor, &config, identifier, false)?;
            }
            let report = compute_metrics(&registry, &identifiers, &metrics, compare)?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }
    Ok(())
}
