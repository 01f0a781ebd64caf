//! Badge Surface
//!
//! The icon overlay for a tab. Rendering belongs to the host; the worker
//! only decides which state a tab's badge is in.

use std::collections::HashMap;

use parking_lot::RwLock;
use serde::Serialize;

/// Browser tab identifier
pub type TabId = u32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BadgeState {
    Clear,
    Scanning,
    Warning,
}

impl BadgeState {
    pub fn text(&self) -> &'static str {
        match self {
            BadgeState::Clear => "",
            BadgeState::Scanning => "SCAN",
            BadgeState::Warning => "!",
        }
    }

    /// Background color, None when the badge is hidden
    pub fn color(&self) -> Option<&'static str> {
        match self {
            BadgeState::Clear => None,
            BadgeState::Scanning => Some("#4285F4"),
            BadgeState::Warning => Some("#EA4335"),
        }
    }
}

pub trait Badge: Send + Sync {
    fn set(&self, tab_id: TabId, state: BadgeState);
}

/// Keeps the last state per tab; used by tests and the CLI
#[derive(Default)]
pub struct MemoryBadge {
    states: RwLock<HashMap<TabId, BadgeState>>,
}

impl MemoryBadge {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, tab_id: TabId) -> BadgeState {
        self.states
            .read()
            .get(&tab_id)
            .copied()
            .unwrap_or(BadgeState::Clear)
    }
}

impl Badge for MemoryBadge {
    fn set(&self, tab_id: TabId, state: BadgeState) {
        self.states.write().insert(tab_id, state);
    }
}

/// Writes badge changes to the log
pub struct LogBadge;

impl Badge for LogBadge {
    fn set(&self, tab_id: TabId, state: BadgeState) {
        match state.color() {
            Some(color) => log::info!("Badge tab {}: '{}' {}", tab_id, state.text(), color),
            None => log::debug!("Badge tab {}: cleared", tab_id),
        }
    }
}
