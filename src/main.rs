//! ledenet - Command-line control for Magic Home / LEDENET LED
//! controllers.

mod commands;

use clap::{Parser, Subcommand};
use colored::Colorize;
use ledenet_client::{Bulb, ConnectionConfig};
use ledenet_protocol::{Transition, DEFAULT_PORT};
use std::net::SocketAddr;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "ledenet")]
#[command(about = "Control Magic Home / LEDENET networked LED controllers")]
#[command(version)]
struct Cli {
    /// Controller address (host or host:port; port defaults to 5577)
    #[arg(short, long, env = "LEDENET_ADDR", global = true)]
    addr: Option<String>,

    /// Response timeout in seconds
    #[arg(long, default_value = "5", global = true)]
    timeout: u64,

    /// Retry budget for transient failures
    #[arg(long, default_value = "2", global = true)]
    retries: u32,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Discover controllers on the local network
    Scan {
        /// Seconds to wait for answers
        #[arg(short, long, default_value = "3")]
        wait: u64,

        /// Print results as JSON
        #[arg(long)]
        json: bool,
    },

    /// Query and show the controller's state
    Status,

    /// Turn the controller on
    On,

    /// Turn the controller off
    Off,

    /// Set a solid color
    Color {
        red: u8,
        green: u8,
        blue: u8,

        /// Also drive the warm white channel (RGBW devices only)
        #[arg(short, long)]
        white: Option<u8>,

        /// Brightness 0-255; the color supplies hue and saturation
        #[arg(short, long)]
        brightness: Option<u8>,

        /// Do not persist across power cycles
        #[arg(long)]
        volatile: bool,
    },

    /// Set warm white output as a percentage
    WarmWhite {
        /// Level 0-100
        percent: u8,
    },

    /// Set the cold white channel level
    ColdWhite {
        /// Level 0-255
        level: u8,
    },

    /// Approximate a color temperature on the white channels
    WhiteTemperature {
        /// Temperature in Kelvin (2700-6500)
        kelvin: u16,

        /// Brightness 0-100
        #[arg(default_value = "100")]
        brightness: u8,
    },

    /// Run a built-in preset pattern
    Preset {
        /// Pattern name (see `presets`) or numeric code
        pattern: String,

        /// Speed 0-100
        #[arg(short, long, default_value = "50")]
        speed: u8,
    },

    /// List the known preset patterns
    Presets,

    /// Program a custom pattern from r,g,b color triples
    Custom {
        /// Colors as r,g,b triples, e.g. 255,0,0 0,0,255
        #[arg(required = true)]
        colors: Vec<String>,

        /// Speed 0-100
        #[arg(short, long, default_value = "50")]
        speed: u8,

        /// Transition style: gradual, jump, or strobe
        #[arg(short, long, default_value = "gradual")]
        transition: Transition,
    },

    /// Show the six timer slots
    Timers,

    /// Show the device's wall clock
    Clock,

    /// Sync the device's wall clock to this machine
    SetClock,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();

    // Commands that need no controller connection
    match &cli.command {
        Commands::Scan { wait, json } => {
            return commands::scan(Duration::from_secs(*wait), *json).await;
        }
        Commands::Presets => {
            println!("{}", commands::list_presets());
            return Ok(());
        }
        _ => {}
    }

    let Some(addr) = cli.addr.as_deref() else {
        eprintln!("{}: no controller address (use --addr or LEDENET_ADDR)", "Error".red());
        std::process::exit(2);
    };
    let addr = resolve_addr(addr).await?;
    tracing::debug!(%addr, "controller address resolved");

    let config = ConnectionConfig::new(addr)
        .with_response_timeout(Duration::from_secs(cli.timeout))
        .with_retries(cli.retries);
    let bulb = Bulb::new(config);

    match commands::execute(&bulb, addr, cli.command).await {
        Ok(output) => println!("{output}"),
        Err(e) => {
            eprintln!("{}: {}", "Error".red(), e);
            bulb.close().await;
            std::process::exit(1);
        }
    }

    bulb.close().await;
    Ok(())
}

/// Resolves a host or host:port argument, defaulting to the command
/// port.
async fn resolve_addr(arg: &str) -> Result<SocketAddr, Box<dyn std::error::Error>> {
    let target = if arg.contains(':') {
        arg.to_string()
    } else {
        format!("{arg}:{DEFAULT_PORT}")
    };
    let mut addrs = tokio::net::lookup_host(target.as_str()).await?;
    addrs
        .next()
        .ok_or_else(|| format!("cannot resolve {target}").into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_resolve_addr_default_port() {
        let addr = resolve_addr("127.0.0.1").await.unwrap();
        assert_eq!(addr, "127.0.0.1:5577".parse().unwrap());
    }

    #[tokio::test]
    async fn test_resolve_addr_explicit_port() {
        let addr = resolve_addr("127.0.0.1:1234").await.unwrap();
        assert_eq!(addr, "127.0.0.1:1234".parse().unwrap());
    }
}
