//! Environment-backed application configuration.

use anyhow::{Context, Result};
use std::{env, path::PathBuf, sync::OnceLock, time::Duration};

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub ui_port: u16,
    pub gateway_socket_path: PathBuf,
    pub config_store_socket_path: PathBuf,
    pub telemetry_poll_interval: Duration,
    pub telemetry_retention: usize,
}

impl AppConfig {
    /// Get or load the application configuration.
    ///
    /// # Panics
    /// Panics when a variable fails to parse; the service cannot run with a
    /// broken configuration.
    pub fn get() -> &'static Self {
        static APP_CONFIG: OnceLock<AppConfig> = OnceLock::new();
        APP_CONFIG.get_or_init(|| {
            AppConfig::load().expect("failed to load application configuration")
        })
    }

    fn load() -> Result<Self> {
        Ok(AppConfig {
            ui_port: var_or("UI_PORT", "8086")
                .parse()
                .context("UI_PORT format")?,
            gateway_socket_path: var_or("GATEWAY_SOCKET_PATH", "/socket/atgw.sock").into(),
            config_store_socket_path: var_or(
                "CONFIG_STORE_SOCKET_PATH",
                "/socket/config-store.sock",
            )
            .into(),
            telemetry_poll_interval: Duration::from_secs(
                var_or("TELEMETRY_POLL_INTERVAL_SECS", "5")
                    .parse()
                    .context("TELEMETRY_POLL_INTERVAL_SECS format")?,
            ),
            telemetry_retention: var_or("TELEMETRY_RETENTION", "720")
                .parse()
                .context("TELEMETRY_RETENTION format")?,
        })
    }
}

fn var_or(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}
