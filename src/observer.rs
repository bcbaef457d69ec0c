/// Per-page observer lifecycle and trailing-edge debounce
use crate::config::SelectorProfile;
use crate::dom::{PageElement, PageSurface};
use crate::injector::{InjectionReport, inject_pass};
use std::cell::Cell;
use std::rc::Rc;

/// Shared flag that stops callbacks from acting after teardown
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Rc<Cell<bool>>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.set(true);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.get()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObserverPhase {
    Uninitialized,
    Observing,
    PendingInjection,
    Destroyed,
}

/// Request to call back `on_quiescent` after `delay_ms`.
///
/// Only the ticket from the most recent qualifying batch is honored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DebounceTicket {
    pub generation: u64,
    pub delay_ms: u32,
}

/// Does any added node contain or carry a ContentUnit?
pub fn is_qualifying<E: PageElement>(added: &[E], unit_selector: &str) -> bool {
    added
        .iter()
        .any(|node| node.matches(unit_selector) || node.query(unit_selector).is_some())
}

#[derive(Debug)]
pub struct PageObserver {
    phase: ObserverPhase,
    generation: u64,
    debounce_ms: u32,
    cancel: CancellationToken,
    passes: usize,
}

impl PageObserver {
    pub fn new(debounce_ms: u32) -> PageObserver {
        PageObserver {
            phase: ObserverPhase::Uninitialized,
            generation: 0,
            debounce_ms,
            cancel: CancellationToken::new(),
            passes: 0,
        }
    }

    pub fn phase(&self) -> ObserverPhase {
        self.phase
    }

    /// Token the mutation callbacks hold on to
    pub fn cancellation(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Injection passes run so far
    pub fn passes(&self) -> usize {
        self.passes
    }

    /// Page is ready: inject into what is already rendered and start observing
    pub fn start<S: PageSurface>(&mut self, surface: &S, profile: &SelectorProfile) -> Option<InjectionReport> {
        if self.phase != ObserverPhase::Uninitialized {
            return None;
        }
        self.phase = ObserverPhase::Observing;
        Some(self.run_pass(surface, profile))
    }

    /// A batch of added nodes arrived.
    ///
    /// Returns a fresh ticket when the batch qualifies; any earlier ticket
    /// becomes stale.
    pub fn on_mutations<E: PageElement>(&mut self, added: &[E], profile: &SelectorProfile) -> Option<DebounceTicket> {
        if self.cancel.is_cancelled()
            || !matches!(self.phase, ObserverPhase::Observing | ObserverPhase::PendingInjection)
            || !is_qualifying(added, &profile.unit_selector)
        {
            return None;
        }

        self.generation += 1;
        self.phase = ObserverPhase::PendingInjection;
        Some(DebounceTicket {
            generation: self.generation,
            delay_ms: self.debounce_ms,
        })
    }

    /// The quiescence window of `ticket` elapsed
    pub fn on_quiescent<S: PageSurface>(
        &mut self,
        ticket: DebounceTicket,
        surface: &S,
        profile: &SelectorProfile,
    ) -> Option<InjectionReport> {
        if self.cancel.is_cancelled() || self.phase != ObserverPhase::PendingInjection {
            return None;
        }
        if ticket.generation != self.generation {
            log::trace!("Debounce ticket {} superseded by {}", ticket.generation, self.generation);
            return None;
        }

        self.phase = ObserverPhase::Observing;
        Some(self.run_pass(surface, profile))
    }

    /// Stop reacting and remove every injected control. Safe to call twice.
    pub fn teardown<S: PageSurface>(&mut self, surface: &S) -> usize {
        if self.phase == ObserverPhase::Destroyed {
            return 0;
        }
        self.cancel.cancel();
        self.phase = ObserverPhase::Destroyed;
        let removed = surface.remove_controls();
        log::debug!("Observer torn down, removed {} controls", removed);
        removed
    }

    fn run_pass<S: PageSurface>(&mut self, surface: &S, profile: &SelectorProfile) -> InjectionReport {
        self.passes += 1;
        inject_pass(surface, profile)
    }
}
