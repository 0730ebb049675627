//! Enforcer and notifier traits

use async_trait::async_trait;
use focus_api::Notification;
use std::collections::BTreeSet;
use thiserror::Error;
use tokio::sync::mpsc;

/// Errors from collaborator operations
#[derive(Debug, Error)]
pub enum HostError {
    #[error("Enforcement failed: {0}")]
    EnforcementFailed(String),

    #[error("Notification failed: {0}")]
    NotificationFailed(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type HostResult<T> = Result<T, HostError>;

/// Events reported by the enforcer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnforcerEvent {
    /// A navigation to a denylisted domain was stopped
    NavigationBlocked { domain: String },
}

/// Installs and removes a domain denylist.
///
/// Calls replace the whole set; implementations need not diff.
#[async_trait]
pub trait DenylistEnforcer: Send + Sync {
    /// Install `domains` as the active denylist
    async fn set_denylist(&self, domains: &BTreeSet<String>) -> HostResult<()>;

    /// Remove any installed denylist
    async fn clear_denylist(&self) -> HostResult<()>;

    /// Take the event stream. Returns `None` once it has been taken.
    fn subscribe(&self) -> Option<mpsc::UnboundedReceiver<EnforcerEvent>>;

    fn is_healthy(&self) -> bool {
        true
    }
}

/// Fire-and-forget user notifications
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, notification: &Notification) -> HostResult<()>;
}
