//! Headless Chromium screenshots.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::error::{MediaError, MediaResult};

/// Binary names tried on PATH when `CHROME_PATH` is unset.
const BROWSER_CANDIDATES: &[&str] = &["chromium", "chromium-browser", "google-chrome", "google-chrome-stable"];

/// Screenshot of a local HTML file at a fixed viewport.
#[derive(Debug, Clone)]
pub struct BrowserCommand {
    html_path: PathBuf,
    output: PathBuf,
    width: u32,
    height: u32,
    /// Let the page's network requests (product images) settle
    virtual_time_budget_ms: u64,
}

impl BrowserCommand {
    pub fn new(html_path: impl AsRef<Path>, output: impl AsRef<Path>) -> Self {
        Self {
            html_path: html_path.as_ref().to_path_buf(),
            output: output.as_ref().to_path_buf(),
            width: promo_models::encoding::CARD_WIDTH,
            height: promo_models::encoding::CARD_HEIGHT,
            virtual_time_budget_ms: 5000,
        }
    }

    pub fn viewport(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn virtual_time_budget(mut self, ms: u64) -> Self {
        self.virtual_time_budget_ms = ms;
        self
    }

    pub fn output(&self) -> &Path {
        &self.output
    }

    pub fn build_args(&self) -> Vec<String> {
        vec![
            "--headless=new".to_string(),
            "--disable-gpu".to_string(),
            "--no-sandbox".to_string(),
            "--disable-dev-shm-usage".to_string(),
            "--hide-scrollbars".to_string(),
            "--force-device-scale-factor=1".to_string(),
            format!("--window-size={},{}", self.width, self.height),
            format!("--virtual-time-budget={}", self.virtual_time_budget_ms),
            format!("--screenshot={}", self.output.to_string_lossy()),
            format!("file://{}", self.html_path.to_string_lossy()),
        ]
    }
}

/// Runs Chromium with a kill-on-timeout.
#[derive(Debug, Clone)]
pub struct BrowserRunner {
    binary: PathBuf,
    timeout: Duration,
}

impl BrowserRunner {
    pub fn new(binary: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            binary: binary.into(),
            timeout,
        }
    }

    /// Locate a browser from an explicit path or PATH.
    pub fn locate(explicit: Option<&Path>) -> MediaResult<PathBuf> {
        if let Some(path) = explicit {
            return if path.exists() {
                Ok(path.to_path_buf())
            } else {
                which::which(path).map_err(|_| MediaError::BrowserNotFound)
            };
        }

        BROWSER_CANDIDATES
            .iter()
            .find_map(|name| which::which(name).ok())
            .ok_or(MediaError::BrowserNotFound)
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }

    /// Take the screenshot; the PNG lands at the command's output path.
    pub async fn screenshot(&self, cmd: &BrowserCommand) -> MediaResult<()> {
        let args = cmd.build_args();
        debug!("Running browser: {} {}", self.binary.display(), args.join(" "));

        let mut child = Command::new(&self.binary)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| MediaError::internal("browser stderr not captured"))?;
        let stderr_handle = tokio::spawn(async move {
            let mut buf = String::new();
            let _ = stderr.read_to_string(&mut buf).await;
            buf
        });

        let status = match tokio::time::timeout(self.timeout, child.wait()).await {
            Ok(status) => status?,
            Err(_) => {
                warn!("Browser timed out after {} seconds, killing process", self.timeout.as_secs());
                let _ = child.kill().await;
                return Err(MediaError::Timeout(self.timeout.as_secs()));
            }
        };
        let stderr = stderr_handle.await.unwrap_or_default();

        if !status.success() {
            return Err(MediaError::browser_failed(
                "browser exited with non-zero status",
                tail(&stderr),
                status.code(),
            ));
        }

        // Chromium sometimes exits 0 without writing the file
        if tokio::fs::metadata(cmd.output()).await.is_err() {
            return Err(MediaError::browser_failed(
                "browser produced no screenshot",
                tail(&stderr),
                status.code(),
            ));
        }

        Ok(())
    }
}

fn tail(stderr: &str) -> Option<String> {
    let lines: Vec<&str> = stderr.lines().filter(|l| !l.trim().is_empty()).collect();
    if lines.is_empty() {
        return None;
    }
    let start = lines.len().saturating_sub(10);
    Some(lines[start..].join("\n"))
}
