//! Hosts-file denylist enforcement

use async_trait::async_trait;
use focus_host_api::{DenylistEnforcer, EnforcerEvent, HostError, HostResult};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tracing::{debug, info};

pub const BLOCK_BEGIN: &str = "# BEGIN focusd denylist";
pub const BLOCK_END: &str = "# END focusd denylist";
const SINK_ADDR: &str = "0.0.0.0";

/// Redirects denylisted domains to `0.0.0.0` through a marked block in a
/// hosts file. Lines outside the block are never touched.
///
/// A hosts file cannot observe navigations, so no events are produced.
pub struct HostsFileEnforcer {
    path: PathBuf,
    // Held so the subscriber's channel stays open
    _event_tx: mpsc::UnboundedSender<EnforcerEvent>,
    event_rx: Arc<Mutex<Option<mpsc::UnboundedReceiver<EnforcerEvent>>>>,
}

impl HostsFileEnforcer {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            path: path.into(),
            _event_tx: tx,
            event_rx: Arc::new(Mutex::new(Some(rx))),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn rewrite(&self, domains: Option<&BTreeSet<String>>) -> HostResult<()> {
        let current = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
            Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
                return Err(HostError::PermissionDenied(self.path.display().to_string()));
            }
            Err(e) => return Err(e.into()),
        };

        let updated = render_hosts(&current, domains);
        if updated == current {
            debug!(path = %self.path.display(), "Hosts file already up to date");
            return Ok(());
        }

        tokio::fs::write(&self.path, updated).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::PermissionDenied {
                HostError::PermissionDenied(self.path.display().to_string())
            } else {
                HostError::Io(e)
            }
        })
    }
}

/// Replace the marked block in `content`, or drop it when `domains` is None.
pub fn render_hosts(content: &str, domains: Option<&BTreeSet<String>>) -> String {
    let mut out = String::with_capacity(content.len());
    let mut in_block = false;

    for line in content.lines() {
        match line.trim() {
            BLOCK_BEGIN => in_block = true,
            BLOCK_END => in_block = false,
            _ if in_block => {}
            _ => {
                out.push_str(line);
                out.push('\n');
            }
        }
    }

    if let Some(domains) = domains.filter(|d| !d.is_empty()) {
        if !out.is_empty() && !out.ends_with("\n\n") {
            out.push('\n');
        }
        out.push_str(BLOCK_BEGIN);
        out.push('\n');
        for domain in domains {
            out.push_str(&format!("{} {}\n", SINK_ADDR, domain));
            out.push_str(&format!("{} www.{}\n", SINK_ADDR, domain));
        }
        out.push_str(BLOCK_END);
        out.push('\n');
    } else {
        // Drop the separator left behind by an earlier block
        while out.ends_with("\n\n") {
            out.pop();
        }
    }

    out
}

#[async_trait]
impl DenylistEnforcer for HostsFileEnforcer {
    async fn set_denylist(&self, domains: &BTreeSet<String>) -> HostResult<()> {
        self.rewrite(Some(domains)).await?;
        info!(path = %self.path.display(), domains = domains.len(), "Hosts denylist installed");
        Ok(())
    }

    async fn clear_denylist(&self) -> HostResult<()> {
        self.rewrite(None).await?;
        info!(path = %self.path.display(), "Hosts denylist removed");
        Ok(())
    }

    fn subscribe(&self) -> Option<mpsc::UnboundedReceiver<EnforcerEvent>> {
        self.event_rx.lock().ok()?.take()
    }

    fn is_healthy(&self) -> bool {
        match std::fs::metadata(&self.path) {
            Ok(meta) => !meta.permissions().readonly(),
            Err(e) => e.kind() == std::io::ErrorKind::NotFound,
        }
    }
}
