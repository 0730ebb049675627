//! Notifier that writes to the log

use async_trait::async_trait;
use focus_api::Notification;
use focus_host_api::{HostResult, Notifier};
use tracing::info;

/// Emits each notification as a structured log line
#[derive(Debug, Default)]
pub struct LogNotifier;

impl LogNotifier {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, notification: &Notification) -> HostResult<()> {
        info!(
            kind = ?notification.kind,
            title = %notification.title,
            message = %notification.message,
            "Notification"
        );
        Ok(())
    }
}
