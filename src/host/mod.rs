use async_trait::async_trait;
use std::ffi::OsStr;
use std::process::Stdio;
use thiserror::Error;
use tokio::process::Command as TokioCommand;
use tracing::{error, info, warn};

#[derive(Error, Debug)]
pub enum HostError {
    #[error("No command configured for host {0}")]
    EmptyCommand(&'static str),
    #[error("Failed to spawn host {action} command: {source}")]
    Spawn {
        action: &'static str,
        #[source]
        source: std::io::Error,
    },
}

/// Power control for the machine the service runs on.
///
/// Both operations are fire-and-forget: they return once the request has been
/// handed to the operating system, not once the machine has actually gone down.
#[async_trait]
pub trait HostControl: Send + Sync {
    async fn restart(&self) -> Result<(), HostError>;
    async fn shutdown(&self) -> Result<(), HostError>;
}

/// Runs privileged command lines such as `sudo shutdown -h now`.
#[derive(Debug, Clone)]
pub struct SystemHost {
    restart_command: String,
    shutdown_command: String,
}

impl SystemHost {
    pub fn new(restart_command: impl Into<String>, shutdown_command: impl Into<String>) -> Self {
        Self {
            restart_command: restart_command.into(),
            shutdown_command: shutdown_command.into(),
        }
    }

    fn spawn_detached(action: &'static str, command_line: &str) -> Result<(), HostError> {
        let parts: Vec<&str> = command_line.split_whitespace().collect();
        let Some((program, args)) = parts.split_first() else {
            return Err(HostError::EmptyCommand(action));
        };

        let mut command = TokioCommand::new(OsStr::new(program));
        command
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());

        let mut child = command
            .spawn()
            .map_err(|source| HostError::Spawn { action, source })?;
        info!(action, pid = ?child.id(), command = %command_line, "Spawned host power command.");

        tokio::spawn(async move {
            match child.wait().await {
                Ok(status) if status.success() => info!(action, "Host power command exited."),
                Ok(status) => warn!(action, %status, "Host power command exited with failure."),
                Err(e) => error!(action, error = %e, "Failed to wait on host power command."),
            }
        });
        Ok(())
    }
}

#[async_trait]
impl HostControl for SystemHost {
    async fn restart(&self) -> Result<(), HostError> {
        info!("Restarting host.");
        Self::spawn_detached("restart", &self.restart_command)
    }

    async fn shutdown(&self) -> Result<(), HostError> {
        info!("Shutting down host.");
        Self::spawn_detached("shutdown", &self.shutdown_command)
    }
}
