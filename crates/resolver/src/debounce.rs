use foundation::time::ms;
use runtime::timers::{TimerToken, Timers};

use crate::request::LayerRequest;

/// Quiet period before a resolved layer change is actually mounted. Coalesces
/// rapid successive changes, e.g. a user dragging the time slider.
pub const MOUNT_DEBOUNCE_MS: u64 = 100;

/// Last-write-wins debouncer for dynamic-layer mounts.
///
/// At most one attach is ever pending: scheduling a new change first cancels
/// the outstanding timer token, so a slider drag ends up mounting only the
/// final value. `None` payloads are also debounced and mean "remove only".
#[derive(Debug, Default)]
pub struct MountDebouncer {
    pending: Option<(TimerToken, Option<LayerRequest>)>,
}

impl MountDebouncer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace any pending attach with `request`, restarting the delay.
    pub fn schedule(&mut self, timers: &mut Timers, request: Option<LayerRequest>) {
        if let Some((token, _)) = self.pending.take() {
            timers.cancel(token);
        }
        let token = timers.schedule(ms(MOUNT_DEBOUNCE_MS));
        self.pending = Some((token, request));
    }

    /// Drop the pending attach without firing it.
    pub fn cancel(&mut self, timers: &mut Timers) {
        if let Some((token, _)) = self.pending.take() {
            timers.cancel(token);
        }
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Returns the payload once its timer shows up in `fired`.
    pub fn take_due(&mut self, fired: &[TimerToken]) -> Option<Option<LayerRequest>> {
        if let Some((token, _)) = &self.pending {
            if fired.contains(token) {
                return self.pending.take().map(|(_, request)| request);
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::{MOUNT_DEBOUNCE_MS, MountDebouncer};
    use crate::clock::FixedClock;
    use crate::request::resolve;
    use catalog::Catalog;
    use chrono::{TimeZone, Utc};
    use foundation::time::ms;
    use runtime::timers::Timers;

    fn some_request(layer_id: &str) -> Option<crate::request::LayerRequest> {
        let catalog = Catalog::embedded().unwrap();
        let clock = FixedClock(Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap());
        resolve(catalog.layer(layer_id), "2024-06-01T12:00:00Z", &clock)
    }

    #[test]
    fn fires_after_quiet_period() {
        let mut timers = Timers::new();
        let mut debouncer = MountDebouncer::new();
        debouncer.schedule(&mut timers, some_request("pm2p5"));

        let fired = timers.advance(ms(MOUNT_DEBOUNCE_MS) / 2.0);
        assert!(debouncer.take_due(&fired).is_none());

        let fired = timers.advance(ms(MOUNT_DEBOUNCE_MS));
        let payload = debouncer.take_due(&fired).expect("due");
        assert_eq!(payload.unwrap().layer, "composition_pm2p5");
        assert!(!debouncer.has_pending());
    }

    #[test]
    fn newer_change_replaces_pending_attach() {
        let mut timers = Timers::new();
        let mut debouncer = MountDebouncer::new();
        debouncer.schedule(&mut timers, some_request("pm2p5"));
        // Halfway through the quiet period, the user picks another layer.
        let fired = timers.advance(ms(MOUNT_DEBOUNCE_MS) / 2.0);
        assert!(debouncer.take_due(&fired).is_none());
        debouncer.schedule(&mut timers, some_request("pm10"));

        // The original deadline passes without firing anything.
        let fired = timers.advance(ms(MOUNT_DEBOUNCE_MS) / 2.0 + 0.001);
        assert!(debouncer.take_due(&fired).is_none());

        // Only the replacement fires, after its own full delay.
        let fired = timers.advance(ms(MOUNT_DEBOUNCE_MS));
        let payload = debouncer.take_due(&fired).expect("due");
        assert_eq!(payload.unwrap().layer, "composition_pm10");
        assert_eq!(timers.pending_len(), 0);
    }

    #[test]
    fn cancel_discards_payload() {
        let mut timers = Timers::new();
        let mut debouncer = MountDebouncer::new();
        debouncer.schedule(&mut timers, some_request("pm2p5"));
        debouncer.cancel(&mut timers);
        let fired = timers.advance(1.0);
        assert!(fired.is_empty());
        assert!(debouncer.take_due(&fired).is_none());
    }

    #[test]
    fn none_payload_is_delivered() {
        let mut timers = Timers::new();
        let mut debouncer = MountDebouncer::new();
        debouncer.schedule(&mut timers, None);
        let fired = timers.advance(1.0);
        assert_eq!(debouncer.take_due(&fired), Some(None));
    }
}
