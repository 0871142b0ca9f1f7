// crates/server/src/config.rs
//! Command-line / environment configuration for the server binary.

use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use clap::Parser;
use strix_server_jobs::DriverConfig;

/// Default port for the server.
pub const DEFAULT_PORT: u16 = 8080;

/// Server configuration. Every flag falls back to an environment variable.
#[derive(Debug, Clone, Parser)]
#[command(name = "strix", version, about = "Strix scan API server")]
pub struct Config {
    /// Address to bind.
    #[arg(long, env = "STRIX_HOST", default_value = "0.0.0.0")]
    pub host: IpAddr,

    /// Port to listen on.
    #[arg(long, env = "PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Milliseconds between two progress ticks of a scan.
    #[arg(
        long,
        env = "STRIX_TICK_MS",
        default_value_t = 500,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub tick_ms: u64,

    /// Percentage points added per tick.
    #[arg(
        long,
        env = "STRIX_PROGRESS_STEP",
        default_value_t = 10,
        value_parser = clap::value_parser!(u8).range(1..=100)
    )]
    pub progress_step: u8,

    /// Fail scans still running after this many milliseconds.
    #[arg(long, env = "STRIX_SCAN_TIMEOUT_MS")]
    pub scan_timeout_ms: Option<u64>,
}

impl Config {
    pub fn addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    pub fn driver_config(&self) -> DriverConfig {
        DriverConfig::new()
            .with_tick_interval(Duration::from_millis(self.tick_ms))
            .with_progress_step(self.progress_step)
            .with_scan_timeout(self.scan_timeout_ms.map(Duration::from_millis))
    }
}
