//! Online/offline tracking for the page's status indicator.

/// What the page should show after a connectivity change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusUpdate {
    /// Whether the offline indicator is visible.
    pub show_offline_indicator: bool,
    /// Whether to tell the user queued reports can now be synced.
    pub prompt_sync: bool,
}

/// Tracks connectivity and decides when to prompt for a sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectivityMonitor {
    online: bool,
}

impl Default for ConnectivityMonitor {
    fn default() -> Self {
        Self::new(true)
    }
}

impl ConnectivityMonitor {
    /// Creates a monitor with a known initial state.
    #[must_use]
    pub const fn new(online: bool) -> Self {
        Self { online }
    }

    /// Returns the last known state.
    #[must_use]
    pub const fn is_online(&self) -> bool {
        self.online
    }

    /// Records a connectivity change. A sync prompt is raised whenever the
    /// page is online with reports still queued.
    pub fn update(&mut self, online: bool, queued: usize) -> StatusUpdate {
        if online != self.online {
            log::info!("Connectivity changed: {}", if online { "online" } else { "offline" });
        }
        self.online = online;
        StatusUpdate {
            show_offline_indicator: !online,
            prompt_sync: online && queued > 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offline_shows_indicator_without_prompt() {
        let mut monitor = ConnectivityMonitor::default();
        let update = monitor.update(false, 3);
        assert!(update.show_offline_indicator);
        assert!(!update.prompt_sync);
        assert!(!monitor.is_online());
    }

    #[test]
    fn back_online_with_queue_prompts() {
        let mut monitor = ConnectivityMonitor::new(false);
        assert_eq!(
            monitor.update(true, 2),
            StatusUpdate {
                show_offline_indicator: false,
                prompt_sync: true,
            }
        );
    }

    #[test]
    fn online_with_empty_queue_is_quiet() {
        let mut monitor = ConnectivityMonitor::new(false);
        assert!(!monitor.update(true, 0).prompt_sync);
    }
}
