//! Denylist blocking intent
//!
//! The controller records what should be blocked; the service makes it so.
//! A failed enforcer call leaves the intent untouched and marks the state
//! out of sync so the next tick re-issues it.

use focus_api::BlockingStatus;
use std::collections::BTreeSet;
use tracing::{debug, info};

use crate::{CoreEvent, EnforcementRequest};

#[derive(Debug, Clone)]
pub struct BlockingState {
    active: bool,
    domains: BTreeSet<String>,
    in_sync: bool,
}

impl Default for BlockingState {
    fn default() -> Self {
        Self::new()
    }
}

impl BlockingState {
    /// Inactive, and out of sync so the first reconcile clears any stale
    /// enforcement left by a previous run.
    pub fn new() -> Self {
        Self {
            active: false,
            domains: BTreeSet::new(),
            in_sync: false,
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn domains(&self) -> &BTreeSet<String> {
        &self.domains
    }

    pub fn in_sync(&self) -> bool {
        self.in_sync
    }

    pub fn status(&self) -> BlockingStatus {
        BlockingStatus {
            active: self.active,
            domains: self.domains.clone(),
            in_sync: self.in_sync,
        }
    }

    /// Turn blocking on with `domains`. Nothing is emitted when blocking is
    /// already on with the same set and the enforcer is in sync.
    pub fn enable(&mut self, domains: BTreeSet<String>, events: &mut Vec<CoreEvent>) {
        let changed = !self.active || self.domains != domains;
        if !changed && self.in_sync {
            debug!("Blocking already enabled with this denylist");
            return;
        }

        self.active = true;
        self.domains = domains;
        self.in_sync = true;
        events.push(CoreEvent::Enforce(EnforcementRequest::Install(
            self.domains.clone(),
        )));

        if changed {
            info!(domains = self.domains.len(), "Blocking enabled");
            events.push(self.changed_event());
        }
    }

    /// Turn blocking off. A no-op when already off and in sync.
    pub fn disable(&mut self, events: &mut Vec<CoreEvent>) {
        let changed = self.active;
        if !changed && self.in_sync {
            return;
        }

        self.active = false;
        self.in_sync = true;
        events.push(CoreEvent::Enforce(EnforcementRequest::Clear));

        if changed {
            info!("Blocking disabled");
            events.push(self.changed_event());
        }
    }

    /// The service could not apply the last request
    pub fn mark_out_of_sync(&mut self) {
        self.in_sync = false;
    }

    /// Re-issue the current intent if the last request failed
    pub fn resync(&mut self, events: &mut Vec<CoreEvent>) {
        if self.in_sync {
            return;
        }
        self.in_sync = true;
        let request = if self.active {
            EnforcementRequest::Install(self.domains.clone())
        } else {
            EnforcementRequest::Clear
        };
        debug!(request = ?request, "Re-issuing enforcement");
        events.push(CoreEvent::Enforce(request));
    }

    fn changed_event(&self) -> CoreEvent {
        CoreEvent::BlockingChanged {
            active: self.active,
            domains: self.domains.clone(),
        }
    }
}
