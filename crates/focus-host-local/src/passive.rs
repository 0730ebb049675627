//! Enforcer that only records the denylist

use async_trait::async_trait;
use focus_host_api::{DenylistEnforcer, EnforcerEvent, HostResult};
use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tracing::info;

/// Leaves blocking to observers, which ask `check_domain` and send
/// `report_blocked`. Useful where the service cannot touch the network
/// stack.
pub struct PassiveEnforcer {
    installed: Mutex<Option<BTreeSet<String>>>,
    _event_tx: mpsc::UnboundedSender<EnforcerEvent>,
    event_rx: Arc<Mutex<Option<mpsc::UnboundedReceiver<EnforcerEvent>>>>,
}

impl PassiveEnforcer {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            installed: Mutex::new(None),
            _event_tx: tx,
            event_rx: Arc::new(Mutex::new(Some(rx))),
        }
    }

    pub fn installed(&self) -> Option<BTreeSet<String>> {
        self.installed.lock().ok().and_then(|set| set.clone())
    }
}

impl Default for PassiveEnforcer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DenylistEnforcer for PassiveEnforcer {
    async fn set_denylist(&self, domains: &BTreeSet<String>) -> HostResult<()> {
        info!(domains = domains.len(), "Denylist active (observer-enforced)");
        if let Ok(mut installed) = self.installed.lock() {
            *installed = Some(domains.clone());
        }
        Ok(())
    }

    async fn clear_denylist(&self) -> HostResult<()> {
        info!("Denylist cleared (observer-enforced)");
        if let Ok(mut installed) = self.installed.lock() {
            *installed = None;
        }
        Ok(())
    }

    fn subscribe(&self) -> Option<mpsc::UnboundedReceiver<EnforcerEvent>> {
        self.event_rx.lock().ok()?.take()
    }
}
