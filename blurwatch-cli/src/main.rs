mod cli;
mod console;
mod operator;
mod runner;
mod simulator;

use anyhow::{bail, Context, Result};
use blurwatch_core::{BlurMonitor, BlurwatchConfig, CsvEventSink};
use clap::Parser;
use cli::{Cli, Commands, ConfigCommands, RunArgs};
use console::ConsoleNotifier;
use runner::Simulation;
use simulator::RandomSampler;
use std::path::Path;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so alerts on stdout stay readable
    let level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::from_default_env()
        .add_directive(format!("blurwatch={}", level).parse()?)
        .add_directive(format!("blurwatch_core={}", level).parse()?);
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Some(Commands::Run(args)) => run_simulation(cli.config.as_deref(), args).await,
        Some(Commands::Config { action }) => handle_config_command(cli.config.as_deref(), action),
        None => run_simulation(cli.config.as_deref(), RunArgs::default()).await,
    }
}

async fn run_simulation(config_path: Option<&Path>, args: RunArgs) -> Result<()> {
    let (mut config, source) = BlurwatchConfig::load(config_path).context("Failed to load configuration")?;
    if let Some(path) = &source {
        info!("Loaded configuration from {}", path.display());
    }
    args.apply(&mut config)?;
    config.validate().context("Invalid configuration")?;

    let sink = CsvEventSink::new(&config.storage.events_csv, &config.storage.episodes_csv);
    if let Err(err) = sink.prepare() {
        warn!("Event log not ready, records may be dropped: {}", err);
    }

    let cameras = config.cameras();
    let sampler = RandomSampler::new(&cameras, &config.simulator);
    let mut notifier = ConsoleNotifier::stdout(args.format);
    notifier.print_message(&format!(
        "Simulating {} cameras at site {}, tick every {}s. Logging ticks to {} and episodes to {}.",
        cameras.len(),
        config.fleet.site_id,
        config.fleet.tick_interval_seconds,
        config.storage.events_csv.display(),
        config.storage.episodes_csv.display()
    ));
    notifier.print_message(operator::USAGE);

    let monitor = BlurMonitor::from_config(&config, sink, notifier)?;
    let interval = Duration::try_from_secs_f64(config.fleet.tick_interval_seconds)
        .context("Invalid tick interval")?;

    let (tx, rx) = mpsc::channel(32);
    // Detached; it ends with the process or at end of input
    operator::spawn_stdin_reader(tx);

    let mut simulation = Simulation::new(monitor, sampler, interval, config.simulator.max_ticks);
    let summary = simulation.run(rx).await?;

    let still_alerting = simulation.monitor().snapshot().alerting().count();
    info!(
        "Stopped after {} ticks: {} alerts, {} aggregate alerts, {} episodes, {} dropped records, {} cameras still alerting",
        summary.ticks,
        summary.alerts,
        summary.aggregate_alerts,
        summary.episodes,
        summary.sink_failures,
        still_alerting
    );
    Ok(())
}

fn handle_config_command(config_path: Option<&Path>, action: ConfigCommands) -> Result<()> {
    match action {
        ConfigCommands::Init { path, force } => {
            let target = match path.or_else(|| config_path.map(Path::to_path_buf)) {
                Some(target) => target,
                None => BlurwatchConfig::user_config_path().context("Could not determine home directory")?,
            };
            if target.exists() && !force {
                bail!("{} already exists (use --force to overwrite)", target.display());
            }
            BlurwatchConfig::default().save_to_path(&target)?;
            println!("Wrote default configuration to {}", target.display());
        }
        ConfigCommands::Show => {
            let (config, source) = BlurwatchConfig::load(config_path)?;
            match source {
                Some(path) => println!("# {}", path.display()),
                None => println!("# built-in defaults"),
            }
            print!("{}", config.to_toml_string()?);
        }
        ConfigCommands::Validate => {
            let (config, source) = BlurwatchConfig::load(config_path)?;
            config.validate()?;
            let origin = source
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "built-in defaults".to_string());
            println!("Configuration OK ({})", origin);
        }
    }
    Ok(())
}
