//! Command Gateway Implementation

use crate::command::DriveCommand;
use crate::GatewayError;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::{debug, info, warn};

type ActuatorWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// Result of a [`CommandGateway::send`] call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// Token written and flushed
    Written,
    /// Same as the last command sent; nothing written
    Unchanged,
    /// Write failed or no link; will be retried on the next send
    Failed,
}

/// Deduplicating writer for the motor controller link
pub struct CommandGateway {
    /// Write half of the actuator link, `None` when no hardware was found
    link: Option<ActuatorWriter>,
    /// Last command that reached the link
    last_sent: Option<DriveCommand>,
    /// Absence is reported once, then only at debug level
    absence_reported: bool,
}

impl CommandGateway {
    /// Create a gateway over any byte sink (serial write half, test buffer)
    pub fn new<W>(link: W) -> Self
    where
        W: AsyncWrite + Send + Unpin + 'static,
    {
        info!("Creating command gateway");
        Self {
            link: Some(Box::new(link)),
            last_sent: None,
            absence_reported: false,
        }
    }

    /// Create a gateway with no actuator attached
    pub fn disconnected() -> Self {
        warn!("Actuator link not connected; drive commands will be dropped");
        Self {
            link: None,
            last_sent: None,
            absence_reported: true,
        }
    }

    /// Whether an actuator link is attached
    pub fn is_connected(&self) -> bool {
        self.link.is_some()
    }

    /// Last command successfully written
    pub fn last_sent(&self) -> Option<DriveCommand> {
        self.last_sent
    }

    /// Send `command` unless it is already the active one.
    ///
    /// Failures are logged and returned as [`SendOutcome::Failed`]; the
    /// remembered command is left untouched so the next call writes again.
    pub async fn send(&mut self, command: DriveCommand) -> SendOutcome {
        if self.last_sent == Some(command) {
            return SendOutcome::Unchanged;
        }
        self.write(command).await
    }

    /// Write Stop even if Stop was the last command sent.
    ///
    /// Used where the link state is uncertain: operator kill and shutdown.
    pub async fn force_stop(&mut self) -> SendOutcome {
        self.write(DriveCommand::Stop).await
    }

    async fn write(&mut self, command: DriveCommand) -> SendOutcome {
        match self.write_token(command).await {
            Ok(()) => {
                debug!("Sent drive command {} ({})", command, command.token() as char);
                metrics::counter!("gateway_writes_total", "command" => command.as_str())
                    .increment(1);
                self.last_sent = Some(command);
                SendOutcome::Written
            }
            Err(GatewayError::LinkAbsent) => {
                if !self.absence_reported {
                    warn!("Dropping drive command {}: actuator link not connected", command);
                    self.absence_reported = true;
                }
                SendOutcome::Failed
            }
            Err(e) => {
                warn!("Failed to send drive command {}: {}", command, e);
                metrics::counter!("gateway_write_failures_total").increment(1);
                SendOutcome::Failed
            }
        }
    }

    async fn write_token(&mut self, command: DriveCommand) -> Result<(), GatewayError> {
        let link = self.link.as_mut().ok_or(GatewayError::LinkAbsent)?;
        link.write_all(&[command.token()]).await?;
        link.flush().await?;
        Ok(())
    }
}
