//! Control of the external proxy process.

use crate::config::V2raySection;
use crate::error::{Error, Result};

use async_trait::async_trait;
use log::{debug, info, warn};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::{Child, Command};

/// Placeholder in the argument list replaced by the config path.
pub const CONFIG_PLACEHOLDER: &str = "{config}";

/// A process that serves traffic through the currently configured upstream.
#[async_trait]
pub trait ProxyProcess: Send {
    /// Start the process. Starting an already running process is a no-op.
    async fn start(&mut self) -> Result<()>;

    /// Stop the process. Stopping a process that is not running is a no-op.
    async fn stop(&mut self) -> Result<()>;

    /// Stop, then start again so that a rewritten config takes effect.
    async fn restart(&mut self) -> Result<()> {
        self.stop().await?;
        self.start().await
    }
}

/// A v2ray (or compatible) binary run as a child process.
#[derive(Debug)]
pub struct V2rayProcess {
    binary: PathBuf,
    args: Vec<String>,
    config_path: PathBuf,
    kill_existing: bool,
    child: Option<Child>,
}

impl V2rayProcess {
    /// Create a controller for `binary`, started with `args`.
    pub fn new(binary: impl Into<PathBuf>, args: Vec<String>, config_path: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            args,
            config_path: config_path.into(),
            kill_existing: false,
            child: None,
        }
    }

    /// Create a controller from the `[v2ray]` config section.
    pub fn from_config(section: &V2raySection) -> Self {
        Self::new(&section.binary, section.args.clone(), &section.config_path)
            .kill_existing(section.kill_existing)
    }

    /// Also kill processes with the binary's image name on stop, including
    /// ones this controller did not start.
    pub fn kill_existing(mut self, enabled: bool) -> Self {
        self.kill_existing = enabled;
        self
    }

    /// Whether the owned child is still alive.
    pub fn is_running(&mut self) -> bool {
        match self.child.as_mut() {
            Some(child) => matches!(child.try_wait(), Ok(None)),
            None => false,
        }
    }

    fn resolved_args(&self) -> Vec<String> {
        let config = self.config_path.display().to_string();
        self.args
            .iter()
            .map(|arg| arg.replace(CONFIG_PLACEHOLDER, &config))
            .collect()
    }

    async fn kill_by_name(&self) {
        let Some(name) = self.binary.file_name().and_then(|n| n.to_str()) else {
            return;
        };

        let mut command = if cfg!(windows) {
            let mut c = Command::new("taskkill");
            c.args(["/F", "/IM", name]);
            c
        } else {
            let mut c = Command::new("pkill");
            c.args(["-x", name]);
            c
        };

        match command.stdout(Stdio::null()).stderr(Stdio::null()).status().await {
            Ok(status) if status.success() => debug!("Killed stray {} processes", name),
            Ok(status) => debug!("No stray {} process to kill ({})", name, status),
            Err(e) => warn!("Failed to kill {} by name: {}", name, e),
        }
    }
}

#[async_trait]
impl ProxyProcess for V2rayProcess {
    async fn start(&mut self) -> Result<()> {
        if self.is_running() {
            debug!("{} already running", self.binary.display());
            return Ok(());
        }

        let child = Command::new(&self.binary)
            .args(self.resolved_args())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| Error::Process(format!("failed to start {}: {}", self.binary.display(), e)))?;

        info!("Started {} (pid {:?})", display_name(&self.binary), child.id());
        self.child = Some(child);
        Ok(())
    }

    async fn stop(&mut self) -> Result<()> {
        if let Some(mut child) = self.child.take() {
            match child.try_wait() {
                Ok(Some(status)) => debug!("{} had already exited: {}", self.binary.display(), status),
                _ => {
                    child
                        .kill()
                        .await
                        .map_err(|e| Error::Process(format!("failed to stop {}: {}", self.binary.display(), e)))?;
                    info!("Stopped {}", display_name(&self.binary));
                }
            }
        }

        if self.kill_existing {
            self.kill_by_name().await;
        }
        Ok(())
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
