//! Mock collaborators for testing

use async_trait::async_trait;
use focus_api::{Notification, NotificationKind};
use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::mpsc;

use crate::{DenylistEnforcer, EnforcerEvent, HostError, HostResult, Notifier};

fn guard<T>(lock: &Mutex<T>) -> MutexGuard<'_, T> {
    lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// A call received by [`MockEnforcer`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnforcerCall {
    Set(BTreeSet<String>),
    Clear,
}

/// Mock enforcer for unit/integration testing
pub struct MockEnforcer {
    installed: Arc<Mutex<Option<BTreeSet<String>>>>,
    calls: Arc<Mutex<Vec<EnforcerCall>>>,
    event_tx: mpsc::UnboundedSender<EnforcerEvent>,
    event_rx: Arc<Mutex<Option<mpsc::UnboundedReceiver<EnforcerEvent>>>>,

    /// Configure enforcer calls to fail
    pub fail: Arc<Mutex<bool>>,
}

impl MockEnforcer {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();

        Self {
            installed: Arc::new(Mutex::new(None)),
            calls: Arc::new(Mutex::new(Vec::new())),
            event_tx: tx,
            event_rx: Arc::new(Mutex::new(Some(rx))),
            fail: Arc::new(Mutex::new(false)),
        }
    }

    /// Currently installed denylist, `None` when cleared
    pub fn installed(&self) -> Option<BTreeSet<String>> {
        guard(&self.installed).clone()
    }

    pub fn calls(&self) -> Vec<EnforcerCall> {
        guard(&self.calls).clone()
    }

    pub fn set_fail(&self, fail: bool) {
        *guard(&self.fail) = fail;
    }

    /// Simulate the platform stopping a navigation
    pub fn simulate_navigation_blocked(&self, domain: impl Into<String>) {
        let _ = self.event_tx.send(EnforcerEvent::NavigationBlocked {
            domain: domain.into(),
        });
    }

    fn check_fail(&self) -> HostResult<()> {
        if *guard(&self.fail) {
            return Err(HostError::EnforcementFailed("Mock enforcement failure".into()));
        }
        Ok(())
    }
}

impl Default for MockEnforcer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DenylistEnforcer for MockEnforcer {
    async fn set_denylist(&self, domains: &BTreeSet<String>) -> HostResult<()> {
        self.check_fail()?;
        guard(&self.calls).push(EnforcerCall::Set(domains.clone()));
        *guard(&self.installed) = Some(domains.clone());
        Ok(())
    }

    async fn clear_denylist(&self) -> HostResult<()> {
        self.check_fail()?;
        guard(&self.calls).push(EnforcerCall::Clear);
        *guard(&self.installed) = None;
        Ok(())
    }

    fn subscribe(&self) -> Option<mpsc::UnboundedReceiver<EnforcerEvent>> {
        guard(&self.event_rx).take()
    }

    fn is_healthy(&self) -> bool {
        !*guard(&self.fail)
    }
}

/// Mock notifier that records what it was asked to show
pub struct MockNotifier {
    sent: Arc<Mutex<Vec<Notification>>>,

    /// Configure notify to fail
    pub fail: Arc<Mutex<bool>>,

    /// Configure notify to hang before returning
    pub delay: Arc<Mutex<Option<Duration>>>,
}

impl MockNotifier {
    pub fn new() -> Self {
        Self {
            sent: Arc::new(Mutex::new(Vec::new())),
            fail: Arc::new(Mutex::new(false)),
            delay: Arc::new(Mutex::new(None)),
        }
    }

    pub fn sent(&self) -> Vec<Notification> {
        guard(&self.sent).clone()
    }

    pub fn sent_kinds(&self) -> Vec<NotificationKind> {
        guard(&self.sent).iter().map(|n| n.kind).collect()
    }

    pub fn set_fail(&self, fail: bool) {
        *guard(&self.fail) = fail;
    }

    pub fn set_delay(&self, delay: Option<Duration>) {
        *guard(&self.delay) = delay;
    }
}

impl Default for MockNotifier {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Notifier for MockNotifier {
    async fn notify(&self, notification: &Notification) -> HostResult<()> {
        let delay = *guard(&self.delay);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if *guard(&self.fail) {
            return Err(HostError::NotificationFailed("Mock notify failure".into()));
        }
        guard(&self.sent).push(notification.clone());
        Ok(())
    }
}
