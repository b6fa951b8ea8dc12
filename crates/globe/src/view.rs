use foundation::geo::Position;

/// Default look-at: wide equatorial view over the prime meridian.
pub const DEFAULT_LOOK_AT_LATITUDE: f64 = 20.0;
pub const DEFAULT_LOOK_AT_LONGITUDE: f64 = 0.0;
pub const DEFAULT_RANGE_M: f64 = 15_000_000.0;

/// Mid-altitude range used by `go_to_location` when the caller gives none.
pub const DEFAULT_GO_TO_RANGE_M: f64 = 5_000_000.0;

/// Camera/navigator state. Owned exclusively by the engine: mutated by the
/// camera-control calls and the rotation loop, read at render time.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ViewState {
    pub look_at: Position,
    /// Camera distance from the look-at point, meters.
    pub range_m: f64,
    pub auto_rotate: bool,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            look_at: Position::new(DEFAULT_LOOK_AT_LATITUDE, DEFAULT_LOOK_AT_LONGITUDE),
            range_m: DEFAULT_RANGE_M,
            auto_rotate: false,
        }
    }
}
