//! Host environment bridge.
//!
//! The engine never reaches into its host directly. It asks a [`HostBridge`]
//! for the daemon address, the access token and a version string, and hands
//! it URLs to open in an external browser.

use async_trait::async_trait;
use tracing::{info, warn};

pub const DEFAULT_API_BASE_URL: &str = "http://127.0.0.1:8080";
pub const UNKNOWN_VERSION: &str = "-";

#[async_trait]
pub trait HostBridge: Send + Sync {
    /// Daemon base address, without the `/api` suffix.
    async fn api_base_url(&self) -> anyhow::Result<String>;

    /// Access token; empty when the daemon runs without auth.
    async fn api_token(&self) -> anyhow::Result<String>;

    async fn version(&self) -> anyhow::Result<String>;

    fn open_external(&self, url: &str);
}

/// Bridge used when no host is present: fixed address, no token, no-op open.
#[derive(Debug, Clone, Default)]
pub struct DefaultHost;

#[async_trait]
impl HostBridge for DefaultHost {
    async fn api_base_url(&self) -> anyhow::Result<String> {
        Ok(DEFAULT_API_BASE_URL.to_string())
    }

    async fn api_token(&self) -> anyhow::Result<String> {
        Ok(String::new())
    }

    async fn version(&self) -> anyhow::Result<String> {
        Ok(UNKNOWN_VERSION.to_string())
    }

    fn open_external(&self, url: &str) {
        info!(
            component = "host",
            event = "host.open_external.skipped",
            url = %url,
            "No host available to open URL"
        );
    }
}

/// Bridge for a terminal host: configured values, platform URL opener.
#[derive(Debug, Clone, Default)]
pub struct SystemHost {
    pub base_url: Option<String>,
    pub token: Option<String>,
    pub version: Option<String>,
}

impl SystemHost {
    fn opener() -> &'static str {
        if cfg!(target_os = "macos") {
            "open"
        } else if cfg!(target_os = "windows") {
            "explorer"
        } else {
            "xdg-open"
        }
    }
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

#[async_trait]
impl HostBridge for SystemHost {
    async fn api_base_url(&self) -> anyhow::Result<String> {
        Ok(non_empty(&self.base_url)
            .map(|url| url.trim_end_matches('/').to_string())
            .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string()))
    }

    async fn api_token(&self) -> anyhow::Result<String> {
        Ok(non_empty(&self.token).unwrap_or_default())
    }

    async fn version(&self) -> anyhow::Result<String> {
        Ok(non_empty(&self.version).unwrap_or_else(|| UNKNOWN_VERSION.to_string()))
    }

    fn open_external(&self, url: &str) {
        let opener = Self::opener();
        match std::process::Command::new(opener).arg(url).spawn() {
            Ok(_) => info!(
                component = "host",
                event = "host.open_external",
                url = %url,
                opener,
                "Opened URL"
            ),
            Err(e) => warn!(
                component = "host",
                event = "host.open_external.failed",
                url = %url,
                opener,
                error = %e,
                "Failed to open URL"
            ),
        }
    }
}
