//! `ipmon-tui`: live segment status and settings editor for the IP monitor.
//!
//! Two screens, switched with `1`/`2` or Tab: Status polls the selected
//! segment on a timer, Config edits the backend settings with inline
//! validation and a local draft. Logs go to a file so they never land on
//! the terminal.

mod action;
mod app;
mod component;
mod data_bridge;
mod event;
mod screen;
mod screens;
mod theme;
mod tui;
mod widgets;

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use color_eyre::eyre::{Result, WrapErr, bail};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use ipmon_config::Profile;
use ipmon_core::{ConfigController, MonitorConfig, StatusPoller, TlsVerification};

use crate::app::App;

/// Terminal dashboard for the IP monitor.
#[derive(Parser, Debug)]
#[command(name = "ipmon-tui", version, about)]
struct Cli {
    /// Server URL; overrides the profile's (e.g., http://10.0.0.5:5000)
    #[arg(short = 'S', long, env = "IPMON_SERVER")]
    server: Option<String>,

    /// Profile from the config file
    #[arg(short, long, env = "IPMON_PROFILE")]
    profile: Option<String>,

    /// Accept invalid TLS certificates
    #[arg(short = 'k', long, env = "IPMON_INSECURE")]
    insecure: bool,

    /// Log file path [default: <tmp>/ipmon-tui.log]
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

/// File-only tracing; stdout belongs to the terminal UI. Hold the guard
/// until exit so buffered lines get flushed.
fn setup_tracing(cli: &Cli) -> WorkerGuard {
    let level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("ipmon_tui={level},ipmon_core={level},ipmon_api={level}"))
    });

    let path = cli
        .log_file
        .clone()
        .unwrap_or_else(|| std::env::temp_dir().join("ipmon-tui.log"));
    let dir = path
        .parent()
        .map_or_else(std::env::temp_dir, std::path::Path::to_path_buf);
    let file = path
        .file_name()
        .map_or_else(|| "ipmon-tui.log".into(), std::ffi::OsStr::to_os_string);

    let (writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::never(dir, file));
    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(true),
        )
        .init();
    guard
}

/// Flags over the selected profile over nothing. Unlike the CLI there is
/// no server-less mode: without one there is nothing to show.
fn resolve_config(cli: &Cli) -> Result<MonitorConfig> {
    let cfg = ipmon_config::load_config().wrap_err("failed to load the config file")?;
    let name = cli
        .profile
        .clone()
        .or_else(|| cfg.default_profile.clone())
        .unwrap_or_else(|| "default".into());

    let profile = match (cfg.profiles.get(&name), &cli.server) {
        (Some(profile), _) => profile.clone(),
        (None, Some(server)) => Profile::new(server.clone()),
        (None, None) if cli.profile.is_some() => bail!("profile '{name}' not found"),
        (None, None) => bail!(
            "no IP monitor server configured; pass --server or run `ipmon profile init` \
             (config: {})",
            ipmon_config::config_path().display()
        ),
    };

    let mut config = ipmon_config::profile_to_monitor_config(&profile)
        .wrap_err_with(|| format!("invalid profile '{name}'"))?;
    if let Some(server) = &cli.server {
        config.url = ipmon_config::parse_server_url(server)?;
    }
    if cli.insecure || cfg.defaults.insecure {
        config.tls = TlsVerification::DangerAcceptInvalid;
    }
    if profile.timeout.is_none() {
        config.timeout = Duration::from_secs(cfg.defaults.timeout);
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Before anything touches the terminal
    tui::install_hooks()?;
    let _log_guard = setup_tracing(&cli);

    let config = resolve_config(&cli)?;
    info!(server = %config.url, segment = %config.default_segment, "starting ipmon-tui");

    let poller = StatusPoller::from_config(&config)?;
    let controller = ConfigController::from_config(&config)?;
    App::new(poller, controller, &config).run().await
}
