use foundation::time::ms;
use runtime::timers::{TimerToken, Timers};

use crate::engine::GlobeEngine;
use crate::surface::RenderSurface;

/// Settle pulses after initial mount. The first catches layout that was
/// ready at first paint; the second absorbs late layout settling (fonts,
/// sidebar animation) where the container's final size arrives late.
pub const SETTLE_PULSE_FIRST_MS: u64 = 50;
pub const SETTLE_PULSE_SECOND_MS: u64 = 500;

/// Keeps the render buffer's pixel dimensions equal to the container's
/// displayed dimensions.
///
/// The host reports container size changes continuously (ResizeObserver on
/// the web, window events natively), not just on window resize: a sidebar
/// collapse changes the container without any window event. Missing
/// container or dead engine makes every operation a no-op.
#[derive(Debug, Default)]
pub struct ViewportSync {
    pulses: Vec<TimerToken>,
    container: Option<(u32, u32)>,
}

impl ViewportSync {
    /// Schedules the two settle pulses and returns the sync.
    pub fn mount(timers: &mut Timers) -> Self {
        Self {
            pulses: vec![
                timers.schedule(ms(SETTLE_PULSE_FIRST_MS)),
                timers.schedule(ms(SETTLE_PULSE_SECOND_MS)),
            ],
            container: None,
        }
    }

    /// New container content-box size; syncs immediately.
    pub fn observe<S: RenderSurface>(
        &mut self,
        engine: &mut GlobeEngine<S>,
        width: u32,
        height: u32,
    ) {
        self.container = Some((width, height));
        self.sync(engine);
    }

    /// The container was unmounted; later pulses become no-ops.
    pub fn container_lost(&mut self) {
        self.container = None;
    }

    /// Re-sync when one of our settle pulses fired.
    pub fn on_timers_fired<S: RenderSurface>(
        &mut self,
        engine: &mut GlobeEngine<S>,
        fired: &[TimerToken],
    ) {
        let had_pulse = self.pulses.iter().any(|p| fired.contains(p));
        self.pulses.retain(|p| !fired.contains(p));
        if had_pulse {
            self.sync(engine);
        }
    }

    /// Resize the buffer to the displayed size if they differ. Never errors.
    pub fn sync<S: RenderSurface>(&mut self, engine: &mut GlobeEngine<S>) {
        let Some((display_w, display_h)) = self.container else {
            return;
        };
        let Some((buf_w, buf_h)) = engine.buffer_size() else {
            return;
        };
        if (buf_w, buf_h) != (display_w, display_h) {
            engine.resize_buffer(display_w, display_h);
        }
    }

    pub fn unmount(&mut self, timers: &mut Timers) {
        for token in self.pulses.drain(..) {
            timers.cancel(token);
        }
        self.container = None;
    }
}

#[cfg(test)]
mod tests {
    use super::{SETTLE_PULSE_SECOND_MS, ViewportSync};
    use crate::engine::GlobeEngine;
    use crate::surface::{OffscreenSurface, RenderSurface, SurfaceError};
    use foundation::time::ms;
    use runtime::timers::Timers;

    fn engine(w: u32, h: u32) -> GlobeEngine<OffscreenSurface> {
        GlobeEngine::initialize(Ok(OffscreenSurface::new(w, h)))
    }

    #[test]
    fn resize_matches_buffer_to_container() {
        let mut timers = Timers::new();
        let mut sync = ViewportSync::mount(&mut timers);
        let mut engine = engine(640, 480);

        sync.observe(&mut engine, 800, 600);
        assert_eq!(engine.buffer_size(), Some((800, 600)));

        // Matching sizes do not trigger a redraw.
        let redraws = engine.surface().unwrap().redraw_count();
        sync.observe(&mut engine, 800, 600);
        assert_eq!(engine.surface().unwrap().redraw_count(), redraws);
    }

    #[test]
    fn settle_pulse_picks_up_late_layout() {
        let mut timers = Timers::new();
        let mut sync = ViewportSync::mount(&mut timers);
        let mut engine = engine(640, 480);
        sync.observe(&mut engine, 640, 480);

        // Layout settles to a different size without an observe call (the
        // container was reported before its final size was known). The
        // second pulse still brings the buffer in line.
        sync.container = Some((1024, 768));
        let fired = timers.advance(ms(SETTLE_PULSE_SECOND_MS));
        sync.on_timers_fired(&mut engine, &fired);
        assert_eq!(engine.buffer_size(), Some((1024, 768)));
    }

    #[test]
    fn missing_container_or_engine_is_a_no_op() {
        let mut timers = Timers::new();
        let mut sync = ViewportSync::mount(&mut timers);

        // No container observed yet.
        let mut engine = engine(640, 480);
        let fired = timers.advance(1.0);
        sync.on_timers_fired(&mut engine, &fired);
        assert_eq!(engine.buffer_size(), Some((640, 480)));

        // Dead engine: still a no-op, never a panic.
        let mut inert: GlobeEngine<OffscreenSurface> = GlobeEngine::initialize(Err(
            SurfaceError::ContextCreation("no webgl".to_string()),
        ));
        sync.observe(&mut inert, 800, 600);
        assert_eq!(inert.buffer_size(), None);
    }

    #[test]
    fn unmount_cancels_pending_pulses() {
        let mut timers = Timers::new();
        let mut sync = ViewportSync::mount(&mut timers);
        assert_eq!(timers.pending_len(), 2);
        sync.unmount(&mut timers);
        assert_eq!(timers.pending_len(), 0);
    }
}
