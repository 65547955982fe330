//! Per-operation error recovery.

use crate::error::{ErrorContext, Fault, FaultKind};
use crate::settings::Settings;
use crate::trace::TraceLevel;

/// Consecutive handled faults allowed at one path before the operation is
/// assumed to be stuck.
const RECOVERY_LIMIT: usize = 100;

/// Tracks handled faults and the anti-divergence budget for one operation.
#[derive(Default)]
pub(crate) struct Recovery {
    faults: Vec<Fault>,
    last_path: String,
    consecutive: usize,
}

impl Recovery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Offers a fault to the hook. `Ok` means it was handled and recorded;
    /// the caller substitutes a default/absent value and continues with the
    /// next sibling. `Err` aborts the operation.
    pub fn offer(&mut self, settings: &Settings, mut fault: Fault) -> Result<(), Fault> {
        if fault.was_offered() {
            return Err(fault);
        }
        fault.mark_offered();

        let Some(hook) = settings.error_hook() else {
            return Err(fault);
        };
        let mut context = ErrorContext::new(&fault);
        hook(&mut context);
        if !context.handled() {
            return Err(fault);
        }

        if fault.path() == self.last_path {
            self.consecutive += 1;
        } else {
            self.last_path = fault.path().to_owned();
            self.consecutive = 1;
        }
        if self.consecutive > RECOVERY_LIMIT {
            return Err(Fault::new(
                FaultKind::InfiniteRecovery,
                fault.path(),
                format!("{RECOVERY_LIMIT} consecutive faults handled without progress"),
            ));
        }

        settings
            .trace()
            .event(TraceLevel::Warning, fault.path(), fault.message());
        self.faults.push(fault);
        Ok(())
    }

    pub fn into_faults(self) -> Vec<Fault> {
        self.faults
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn handling_settings() -> Settings {
        Settings::new().with_error_hook(Arc::new(|cx| cx.handle()))
    }

    #[test]
    fn no_hook_aborts_on_first_fault() {
        let mut recovery = Recovery::new();
        let fault = Fault::new(FaultKind::Format, "a", "bad value");
        assert!(recovery.offer(&Settings::new(), fault).is_err());
    }

    #[test]
    fn handled_faults_are_recorded() {
        let mut recovery = Recovery::new();
        let settings = handling_settings();
        recovery
            .offer(&settings, Fault::new(FaultKind::Format, "a", "bad value"))
            .unwrap();
        let faults = recovery.into_faults();
        assert_eq!(faults.len(), 1);
        assert_eq!(faults[0].kind(), FaultKind::Format);
    }

    #[test]
    fn a_declined_fault_is_not_offered_twice() {
        let mut recovery = Recovery::new();
        let fault = Fault::new(FaultKind::Format, "a", "bad value");
        let fault = recovery.offer(&Settings::new(), fault).unwrap_err();
        // A second boundary sees it already offered and passes it through,
        // even with a hook that would handle anything.
        assert!(recovery.offer(&handling_settings(), fault).is_err());
    }

    #[test]
    fn the_budget_stops_a_stuck_operation() {
        let mut recovery = Recovery::new();
        let settings = handling_settings();
        for _ in 0..RECOVERY_LIMIT {
            recovery
                .offer(&settings, Fault::new(FaultKind::Format, "items[0]", "bad"))
                .unwrap();
        }
        let err = recovery
            .offer(&settings, Fault::new(FaultKind::Format, "items[0]", "bad"))
            .unwrap_err();
        assert_eq!(err.kind(), FaultKind::InfiniteRecovery);
    }
}
