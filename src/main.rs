pub mod config;
pub mod controller;
pub mod diagnostics;
pub mod engine;
pub mod geometry;
pub mod mapping;
pub mod platform;

use std::path::PathBuf;
use std::time::Instant;

use clap::Parser;
use color_eyre::Result;
use tokio_util::sync::CancellationToken;
use tracing::{info, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use crate::config::{find_config_path, Config};
use crate::controller::{DeviceSampler, GilrsSampler};
use crate::engine::{scheduler, Engine};
use crate::geometry::Desktop;
use crate::platform::{EnigoSink, SystemDesktop};

/// Pins the mouse cursor to a target position driven by game controllers
#[derive(Parser, Debug)]
#[command(name = "padpin", version, about)]
struct Cli {
    /// Config file (default: ./padpin.toml, then the user config dir)
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Log at debug level
    #[arg(short, long)]
    verbose: bool,

    /// List controllers with identifiers and binding numbers, then exit
    #[arg(long)]
    list_devices: bool,

    /// List monitors with geometry, then exit
    #[arg(long)]
    list_monitors: bool,

    /// List candidate target windows with class and title, then exit
    #[arg(long)]
    list_windows: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    setup(cli.verbose)?;

    platform::enable_dpi_awareness();

    if cli.list_devices || cli.list_monitors || cli.list_windows {
        return list(&cli);
    }

    let path = find_config_path(cli.config.as_deref())?;
    let config = Config::load(&path)?;

    let sampler = GilrsSampler::create()?;
    let sink = EnigoSink::create()?;
    let desktop = SystemDesktop::create()?;

    let mut engine = Engine::create(
        config,
        Box::new(sampler),
        Box::new(sink),
        Box::new(desktop),
    )
    .start(Instant::now())?;

    let cancel = CancellationToken::new();
    let _ctrl_c = scheduler::cancel_on_ctrl_c(cancel.clone());
    scheduler::run(&mut engine, cancel).await?;

    info!("Stopped");
    Ok(())
}

fn list(cli: &Cli) -> Result<()> {
    if cli.list_devices {
        let sampler = GilrsSampler::create()?;
        print!("{}", diagnostics::format_devices(sampler.devices()));
        print!("{}", diagnostics::format_capabilities());
    }
    if cli.list_monitors || cli.list_windows {
        let desktop = SystemDesktop::create()?;
        if cli.list_monitors {
            print!("{}", diagnostics::format_monitors(&desktop.monitors()));
        }
        if cli.list_windows {
            print!("{}", diagnostics::format_windows(&desktop.windows()));
        }
    }
    Ok(())
}

fn setup(verbose: bool) -> Result<()> {
    if std::env::var("RUST_LIB_BACKTRACE").is_err() {
        std::env::set_var("RUST_LIB_BACKTRACE", "0")
    }
    color_eyre::install()?;
    setup_logging_env(if verbose { Level::DEBUG } else { Level::INFO });
    Ok(())
}

fn setup_logging_env(level: Level) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.as_str().to_lowercase()));

    FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .pretty()
        .init();
}
