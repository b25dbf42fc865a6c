//! `irbox` command-line front end.
//!
//! Loads the configuration file, applies command-line overrides, connects to
//! the IR box, runs one subcommand, and prints the device's answer.
//!
//! ```text
//! irbox nop
//! irbox tx -p 0x08 -a 0x04 -c 0x10
//! irbox tx -p 0x13 -a 0x01 -c 0x15 -b 12 -r 3
//! irbox rx --count 2
//! irbox --host 192.168.1.50 raw "nop"
//! irbox --host 192.168.1.50 init-config
//! ```
//!
//! The exit status is zero only when the device accepted the command.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use irbox_client::application::{run_command, send_tx, watch_rx, CommandReport, RxWatchLimits};
use irbox_client::infrastructure::config::{config_file_path, load_config, save_config_to, IrboxConfig};
use irbox_client::infrastructure::network::IrBoxClient;
use irbox_core::{Command, TxRequest};

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Control an IR box over the network.
#[derive(Debug, Parser)]
#[command(name = "irbox", about = "Send and capture IR codes through an IR box", version)]
struct Cli {
    /// Configuration file (defaults to the platform config directory).
    #[arg(long, env = "IRBOX_CONFIG")]
    config: Option<PathBuf>,

    /// IR box host name or address; overrides `[device] host`.
    #[arg(long, env = "IRBOX_HOST")]
    host: Option<String>,

    /// IR box TCP port; overrides `[device] port`.
    #[arg(long, env = "IRBOX_PORT")]
    port: Option<u16>,

    /// How long to wait for each response, in milliseconds.
    #[arg(long)]
    response_timeout_ms: Option<u64>,

    #[command(subcommand)]
    command: CliCommand,
}

#[derive(Debug, Subcommand)]
enum CliCommand {
    /// Check that the device answers.
    Nop,
    /// Transmit an IR code.
    Tx {
        /// Protocol identifier in hex, e.g. 0x08 for NEC.
        #[arg(short, long)]
        protocol: String,
        #[arg(short, long)]
        address: String,
        #[arg(short, long)]
        command: String,
        /// Bit count (required for Sony).
        #[arg(short, long)]
        bits: Option<String>,
        #[arg(short, long)]
        repeats: Option<String>,
    },
    /// Capture IR codes in receive mode.
    Rx {
        /// Stop after this many captured codes.
        #[arg(long, default_value_t = 1)]
        count: usize,
        /// Give up after this many response timeouts.
        #[arg(long, default_value_t = 12)]
        polls: usize,
    },
    /// Leave receive mode.
    Norx,
    /// Send a command the device does not know.
    Invalid,
    /// Send arbitrary message text.
    Raw { message: String },
    /// List the configured remotes.
    Remotes,
    /// Write the effective configuration (file plus flags) to the config file.
    InitConfig {
        /// Replace an existing file.
        #[arg(long)]
        force: bool,
    },
}

impl Cli {
    /// Applies command-line overrides on top of the file configuration.
    fn apply_overrides(&self, config: &mut IrboxConfig) {
        if let Some(host) = &self.host {
            config.device.host = host.clone();
        }
        if let Some(port) = self.port {
            config.device.port = port;
        }
        if let Some(ms) = self.response_timeout_ms {
            config.device.response_timeout_ms = ms;
        }
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    let mut config = load_config(cli.config.as_deref()).context("failed to load configuration")?;
    cli.apply_overrides(&mut config);

    // `RUST_LOG` wins over the configured level.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        CliCommand::Remotes => {
            for (id, name) in &config.remotes {
                println!("{id}\t{name}");
            }
            return Ok(ExitCode::SUCCESS);
        }
        CliCommand::InitConfig { force } => {
            let path = init_config(cli.config.as_deref(), &config, force)?;
            println!("wrote {}", path.display());
            return Ok(ExitCode::SUCCESS);
        }
        _ => {}
    }

    let device = &config.device;
    let client = IrBoxClient::new(device.device_config());
    if let Err(e) = client
        .connect(device.host.as_str(), device.port, device.soft_connect)
        .await
    {
        eprintln!("{e}");
        return Ok(ExitCode::FAILURE);
    }

    let report = match cli.command {
        CliCommand::Nop => run_command(&client, &Command::Nop).await,
        CliCommand::Tx {
            protocol,
            address,
            command,
            bits,
            repeats,
        } => {
            let request = TxRequest {
                protocol: Some(protocol),
                address: Some(address),
                command: Some(command),
                bits,
                repeats,
            };
            send_tx(&client, &request).await
        }
        CliCommand::Rx { count, polls } => run_rx(&client, count, polls).await,
        CliCommand::Norx => run_command(&client, &Command::Norx).await,
        CliCommand::Invalid => run_command(&client, &Command::Invalid).await,
        CliCommand::Raw { message } => run_command(&client, &Command::raw(message)).await,
        // Handled above without touching the device.
        CliCommand::Remotes | CliCommand::InitConfig { .. } => CommandReport::success(String::new()),
    };

    client.close().await;
    println!("{}", report.message);
    Ok(if report.success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

/// Writes `config` to `explicit` or the default config file.  An existing
/// file is only replaced with `force`.
fn init_config(explicit: Option<&Path>, config: &IrboxConfig, force: bool) -> anyhow::Result<PathBuf> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => config_file_path().context("no configuration directory on this platform")?,
    };
    if path.exists() && !force {
        anyhow::bail!("{} already exists; pass --force to replace it", path.display());
    }
    save_config_to(&path, config).with_context(|| format!("failed to write {}", path.display()))?;
    Ok(path)
}

/// Watches for captures, printing each one.  Ctrl+C ends the watch but
/// still takes the device out of receive mode.
async fn run_rx(client: &IrBoxClient, count: usize, polls: usize) -> CommandReport {
    let limits = RxWatchLimits {
        max_messages: count,
        max_polls: polls,
    };
    info!(timeout = ?client.config().response_timeout, "waiting for IR codes");

    let watch = watch_rx(client, limits, |line| println!("{line}"));
    tokio::select! {
        report = watch => {
            let captured = report.messages.len();
            match report.left {
                Some(left) if !left.success => {
                    warn!("device did not leave receive mode: {}", left.message);
                    left
                }
                Some(_) if captured == 0 => CommandReport::failure("Response timeout"),
                Some(_) => CommandReport::success(format!("captured {captured} code(s)")),
                None => report.entered,
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("interrupted; leaving receive mode");
            run_command(client, &Command::Norx).await
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tx_flags_parse_into_subcommand() {
        // Arrange / Act
        let cli = Cli::parse_from([
            "irbox", "tx", "-p", "0x13", "-a", "0x01", "-c", "0x15", "-b", "12",
        ]);

        // Assert
        match cli.command {
            CliCommand::Tx {
                protocol,
                bits,
                repeats,
                ..
            } => {
                assert_eq!(protocol, "0x13");
                assert_eq!(bits.as_deref(), Some("12"));
                assert_eq!(repeats, None);
            }
            other => panic!("expected tx, got {other:?}"),
        }
    }

    #[test]
    fn test_overrides_replace_file_values() {
        let cli = Cli::parse_from([
            "irbox",
            "--host",
            "10.1.2.3",
            "--port",
            "4000",
            "--response-timeout-ms",
            "750",
            "nop",
        ]);
        let mut config = IrboxConfig::default();

        cli.apply_overrides(&mut config);

        assert_eq!(config.device.host, "10.1.2.3");
        assert_eq!(config.device.port, 4000);
        assert_eq!(config.device.response_timeout_ms, 750);
    }

    #[test]
    fn test_rx_defaults() {
        let cli = Cli::parse_from(["irbox", "rx"]);
        assert!(matches!(cli.command, CliCommand::Rx { count: 1, polls: 12 }));
    }

    #[test]
    fn test_init_config_refuses_existing_file_without_force() {
        // Arrange
        let path = std::env::temp_dir().join(format!("irbox_init_{}.toml", std::process::id()));
        let _ = std::fs::remove_file(&path);
        let mut config = IrboxConfig::default();
        config.device.port = 4000;

        // Act
        let written = init_config(Some(&path), &config, false).expect("first write");
        let again = init_config(Some(&path), &IrboxConfig::default(), false);
        let forced = init_config(Some(&path), &IrboxConfig::default(), true);

        // Assert
        assert_eq!(written, path);
        assert!(again.is_err(), "existing file needs --force");
        assert!(forced.is_ok());
        let restored = load_config(Some(&path)).expect("reload");
        assert_eq!(restored, IrboxConfig::default());
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_init_config_subcommand_parses_force() {
        let cli = Cli::parse_from(["irbox", "init-config", "--force"]);
        assert!(matches!(cli.command, CliCommand::InitConfig { force: true }));
    }

    #[test]
    fn test_init_config_reloads_written_host() {
        let path = std::env::temp_dir().join(format!("irbox_init_host_{}.toml", std::process::id()));
        let _ = std::fs::remove_file(&path);
        let mut config = IrboxConfig::default();
        config.device.host = "10.0.0.9".to_string();

        init_config(Some(&path), &config, false).expect("write");

        assert_eq!(load_config(Some(&path)).expect("reload").device.host, "10.0.0.9");
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_raw_takes_positional_message() {
        let cli = Cli::parse_from(["irbox", "raw", "status"]);
        assert!(matches!(cli.command, CliCommand::Raw { ref message } if message == "status"));
    }
}
