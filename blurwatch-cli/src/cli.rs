use anyhow::{Context, Result};
use blurwatch_core::{BlurwatchConfig, WashdownClock, WashdownSchedule};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "blurwatch")]
#[command(about = "Blurry production-line camera simulator and alert engine", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Configuration file (defaults to ./.blurwatch.toml, then ~/.config/blurwatch/config.toml)
    #[arg(long, global = true, env = "BLURWATCH_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the camera simulator and alert engine
    Run(RunArgs),

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigCommands,
    },
}

#[derive(Subcommand, Debug, Clone)]
pub enum ConfigCommands {
    /// Write a default configuration file
    Init {
        /// Where to write it (defaults to ~/.config/blurwatch/config.toml)
        #[arg(long)]
        path: Option<PathBuf>,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Print the effective configuration
    Show,

    /// Validate the configuration
    Validate,
}

/// How alerts are printed to the terminal.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Overrides for the configuration file; anything left unset keeps the file's value.
#[derive(Args, Debug, Default, Clone)]
pub struct RunArgs {
    /// Number of simulated cameras
    #[arg(long)]
    pub cameras: Option<usize>,

    /// Seconds between ticks
    #[arg(long)]
    pub interval: Option<f64>,

    /// File that receives one row per camera per tick
    #[arg(long)]
    pub csv: Option<PathBuf>,

    /// File to log blur start/end times once a lens is cleaned
    #[arg(long)]
    pub episodes_csv: Option<PathBuf>,

    /// Seconds a camera must stay blurry before it alerts
    #[arg(long)]
    pub alert_threshold: Option<f64>,

    /// Seconds to suppress repeat alerts per camera after one is shown
    #[arg(long)]
    pub suppress: Option<f64>,

    /// Logical site identifier for aggregation
    #[arg(long)]
    pub site: Option<String>,

    /// Rolling window, in seconds, for counting alerting cameras
    #[arg(long)]
    pub aggregate_window: Option<f64>,

    /// Minimum number of cameras to trigger an aggregate alert
    #[arg(long)]
    pub aggregate_min: Option<usize>,

    /// Seconds to suppress repeat aggregate alerts for the same site
    #[arg(long)]
    pub aggregate_suppress: Option<f64>,

    /// Comma separated HH:MM-HH:MM windows considered washdown periods
    #[arg(long)]
    pub washdown: Option<String>,

    /// Read washdown windows as UTC instead of local time
    #[arg(long)]
    pub washdown_utc: bool,

    /// Stop after this many ticks
    #[arg(long)]
    pub max_ticks: Option<u64>,

    /// Seed for the blur simulator
    #[arg(long)]
    pub seed: Option<u64>,

    /// Let simulated cameras become clean again on their own
    #[arg(long)]
    pub auto_clear: bool,

    /// Alert output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

impl RunArgs {
    /// Layer command-line values over the loaded configuration.
    pub fn apply(&self, config: &mut BlurwatchConfig) -> Result<()> {
        if let Some(cameras) = self.cameras {
            config.fleet.cameras = cameras;
        }
        if let Some(interval) = self.interval {
            config.fleet.tick_interval_seconds = interval;
        }
        if let Some(site) = &self.site {
            config.fleet.site_id = site.clone();
        }
        if let Some(csv) = &self.csv {
            config.storage.events_csv = csv.clone();
        }
        if let Some(episodes) = &self.episodes_csv {
            config.storage.episodes_csv = episodes.clone();
        }
        if let Some(threshold) = self.alert_threshold {
            config.alerts.alert_threshold_seconds = threshold;
        }
        if let Some(suppress) = self.suppress {
            config.alerts.suppress_seconds = suppress;
        }
        if let Some(window) = self.aggregate_window {
            config.aggregate.window_seconds = window;
        }
        if let Some(min) = self.aggregate_min {
            config.aggregate.min_count = min;
        }
        if let Some(suppress) = self.aggregate_suppress {
            config.aggregate.suppress_seconds = suppress;
        }
        if let Some(windows) = &self.washdown {
            let schedule: WashdownSchedule = windows
                .parse()
                .with_context(|| format!("Invalid --washdown value '{}'", windows))?;
            config.washdown.windows = schedule.windows().to_vec();
        }
        if self.washdown_utc {
            config.washdown.clock = WashdownClock::Utc;
        }
        if let Some(max_ticks) = self.max_ticks {
            config.simulator.max_ticks = Some(max_ticks);
        }
        if let Some(seed) = self.seed {
            config.simulator.seed = Some(seed);
        }
        if self.auto_clear {
            config.simulator.auto_clear = true;
        }
        Ok(())
    }
}
