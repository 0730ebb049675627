//! Local collaborators for focusd
//!
//! Provides:
//! - [`HostsFileEnforcer`]: blocks domains through a marked section of a hosts file
//! - [`PassiveEnforcer`]: records the denylist and leaves enforcement to observers
//! - [`LogNotifier`]: writes notifications to the structured log

mod hosts;
mod notify;
mod passive;

pub use hosts::*;
pub use notify::*;
pub use passive::*;
