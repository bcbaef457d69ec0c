/// Scan-and-inject pass: one action control per ContentUnit
use crate::config::SelectorProfile;
use crate::dom::{PageElement, PageSurface};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InjectionReport {
    pub injected: usize,
    /// Units left unmarked: no recognizable action bar yet, or the
    /// control could not be attached
    pub skipped: usize,
}

/// First container any matcher finds, in profile order
pub fn locate_container<E: PageElement>(unit: &E, profile: &SelectorProfile) -> Option<E> {
    profile.container.iter().find_map(|matcher| matcher.locate(unit))
}

/// Attach a control to every unit that does not carry the marker yet.
///
/// Marked units are never revisited, so repeated passes over an unchanged
/// page attach nothing new.
pub fn inject_pass<S: PageSurface>(surface: &S, profile: &SelectorProfile) -> InjectionReport {
    let mut report = InjectionReport::default();

    for unit in surface.pending_units(&profile.unit_selector, &profile.marker_attribute) {
        match locate_container(&unit, profile) {
            Some(container) => match surface.attach_control(&container, &unit) {
                Ok(()) => {
                    surface.mark(&unit, &profile.marker_attribute);
                    report.injected += 1;
                }
                Err(e) => {
                    log::warn!("Could not attach save button, will retry: {:?}", e);
                    report.skipped += 1;
                }
            },
            None => report.skipped += 1,
        }
    }

    if report.injected > 0 {
        log::debug!(
            "Injected {} controls ({} units without an action bar)",
            report.injected,
            report.skipped
        );
    }

    report
}
