/// SPA navigation handling: one live observer instance per address
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SettleTicket {
    pub generation: u64,
    pub delay_ms: u32,
}

/// Something that can be shut down when the page changes under it
pub trait Lifecycle {
    fn teardown(&mut self);
}

/// Owns the current instance and replaces it when the address changes.
///
/// A change tears the old instance down immediately; the replacement is
/// only created once the settle delay of the newest navigation elapses.
pub struct NavigationWatcher<I: Lifecycle> {
    current_url: String,
    instance: Option<I>,
    generation: u64,
    settle_ms: u32,
}

impl<I: Lifecycle> NavigationWatcher<I> {
    pub fn new(url: impl Into<String>, instance: I, settle_ms: u32) -> Self {
        NavigationWatcher {
            current_url: url.into(),
            instance: Some(instance),
            generation: 0,
            settle_ms,
        }
    }

    pub fn current_url(&self) -> &str {
        &self.current_url
    }

    pub fn instance(&self) -> Option<&I> {
        self.instance.as_ref()
    }

    /// Observe the current address; returns a ticket when it changed
    pub fn on_location(&mut self, url: &str) -> Option<SettleTicket> {
        if url == self.current_url {
            return None;
        }

        log::info!("Navigation detected: {} -> {}", self.current_url, url);
        self.current_url = url.to_string();
        if let Some(mut old) = self.instance.take() {
            old.teardown();
        }

        self.generation += 1;
        Some(SettleTicket {
            generation: self.generation,
            delay_ms: self.settle_ms,
        })
    }

    /// Would `on_settled` spawn for this ticket?
    pub fn wants(&self, ticket: SettleTicket) -> bool {
        ticket.generation == self.generation && self.instance.is_none()
    }

    /// Settle delay elapsed; spawns the fresh instance if `ticket` is current
    pub fn on_settled<F>(&mut self, ticket: SettleTicket, spawn: F) -> bool
    where
        F: FnOnce() -> I,
    {
        if !self.wants(ticket) {
            return false;
        }
        self.instance = Some(spawn());
        true
    }

    /// Tear down whatever is live, e.g. when the content script unloads
    pub fn shutdown(&mut self) {
        if let Some(mut instance) = self.instance.take() {
            instance.teardown();
        }
        self.generation += 1;
    }
}
