use foundation::time::Time;

/// Deterministic frame metadata.
///
/// The engine is driven by the host's per-frame callback; this struct is the
/// timebase every per-frame side effect (rotation, animation, timers) sees.
/// It is intentionally small and pure so frame-driven behavior can be tested
/// without a real render loop.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Frame {
    /// 0-based frame index.
    pub index: u64,
    /// Fixed delta time (seconds).
    pub dt_s: f64,
    /// Engine time at the start of the frame (seconds).
    pub time: Time,
}

impl Frame {
    pub fn new(index: u64, dt_s: f64) -> Self {
        Self {
            index,
            dt_s,
            time: Time(index as f64 * dt_s),
        }
    }

    pub fn next(self) -> Self {
        Self::new(self.index + 1, self.dt_s)
    }
}
