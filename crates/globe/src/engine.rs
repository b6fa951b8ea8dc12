use foundation::geo::{Position, shortest_longitude_delta, wrap_longitude};
use foundation::raster::RasterBuffer;
use resolver::request::LayerRequest;
use resolver::wms::level_zero_urls;
use runtime::event_bus::EventBus;
use runtime::frame::Frame;
use tracing::{debug, error, warn};

use crate::surface::{RenderSurface, SurfaceError};
use crate::view::{DEFAULT_GO_TO_RANGE_M, ViewState};

/// Longitude advance per render frame while auto-rotation is enabled.
pub const AUTO_ROTATE_STEP_DEG: f64 = 0.1;

/// Dynamic-layer opacity before the user touches the slider.
pub const DEFAULT_OPACITY: f64 = 0.7;

/// Exponential approach rate for the go-to animation (per second).
const GO_TO_SMOOTHING: f64 = 8.0;
/// Within this many degrees of the target the animation snaps and completes.
const GO_TO_ARRIVAL_EPS_DEG: f64 = 0.01;

/// Engine lifecycle. There is no way back to `Uninitialized`.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum EngineState {
    Uninitialized,
    Initialized,
    DynamicLayerMounted,
}

/// A static scene layer (base imagery, atmosphere). Present from
/// initialization to teardown, never replaced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticLayer {
    pub name: &'static str,
    pub enabled: bool,
}

/// The single mounted dynamic layer. The engine holds at most one; mounting
/// replaces the slot wholesale, so two can never coexist.
#[derive(Debug, Clone, PartialEq)]
pub struct MountedLayer {
    pub request: LayerRequest,
    pub opacity: f64,
    /// GetMap URLs for the layer's level-zero tiles, derived at mount time.
    /// Deeper levels subdivide these on demand as the camera closes in.
    pub tile_urls: Vec<String>,
}

#[derive(Debug, Copy, Clone, PartialEq)]
struct GoToAnimation {
    target: Position,
    range_m: f64,
}

/// Capability surface exposed to the host shell. Exactly the four camera and
/// layer primitives; everything else on the engine is wiring.
pub trait GlobeControls {
    fn go_to_location(&mut self, latitude: f64, longitude: f64, range_m: Option<f64>);
    fn snapshot(&self) -> Option<RasterBuffer>;
    fn set_auto_rotate(&mut self, enabled: bool);
    fn set_dynamic_layer(&mut self, request: Option<LayerRequest>);
}

/// Owns the scene, the camera state and the render surface.
pub struct GlobeEngine<S: RenderSurface> {
    surface: Option<S>,
    static_layers: Vec<StaticLayer>,
    view: ViewState,
    dynamic: Option<MountedLayer>,
    opacity: f64,
    go_to: Option<GoToAnimation>,
}

impl<S: RenderSurface> GlobeEngine<S> {
    /// Constructs the scene exactly once.
    ///
    /// Surface creation failure is logged and leaves the engine inert: every
    /// operation becomes a no-op, the host application keeps running.
    pub fn initialize(surface: Result<S, SurfaceError>) -> Self {
        let (surface, static_layers) = match surface {
            Ok(surface) => {
                if !surface.preserves_draw_buffer() {
                    warn!("surface does not preserve its draw buffer; snapshots will be empty");
                }
                let layers = vec![
                    StaticLayer {
                        name: "Blue Marble",
                        enabled: true,
                    },
                    StaticLayer {
                        name: "Atmosphere",
                        enabled: true,
                    },
                ];
                (Some(surface), layers)
            }
            Err(err) => {
                error!(%err, "globe engine is non-functional");
                (None, Vec::new())
            }
        };
        Self {
            surface,
            static_layers,
            view: ViewState::default(),
            dynamic: None,
            opacity: DEFAULT_OPACITY,
            go_to: None,
        }
    }

    pub fn state(&self) -> EngineState {
        match (&self.surface, &self.dynamic) {
            (None, _) => EngineState::Uninitialized,
            (Some(_), None) => EngineState::Initialized,
            (Some(_), Some(_)) => EngineState::DynamicLayerMounted,
        }
    }

    pub fn view(&self) -> ViewState {
        self.view
    }

    pub fn static_layers(&self) -> &[StaticLayer] {
        &self.static_layers
    }

    pub fn mounted_layer(&self) -> Option<&MountedLayer> {
        self.dynamic.as_ref()
    }

    pub fn surface(&self) -> Option<&S> {
        self.surface.as_ref()
    }

    /// Current render-buffer dimensions, if the engine is functional.
    pub fn buffer_size(&self) -> Option<(u32, u32)> {
        self.surface.as_ref().map(|s| s.size())
    }

    /// Resize the render buffer and force a redraw. Used by viewport sync.
    pub fn resize_buffer(&mut self, width: u32, height: u32) {
        if let Some(surface) = self.surface.as_mut() {
            surface.resize(width, height);
            surface.redraw();
        }
    }

    /// Opacity applies to the mounted layer without a remount, and to every
    /// layer mounted later.
    pub fn set_opacity(&mut self, opacity: f64) {
        self.opacity = opacity.clamp(0.0, 1.0);
        if let Some(mounted) = self.dynamic.as_mut() {
            mounted.opacity = self.opacity;
        }
    }

    pub fn opacity(&self) -> f64 {
        self.opacity
    }

    /// Advances per-frame state: auto-rotation and any go-to animation.
    /// Redraws only when something moved, so a cancelled rotation never
    /// produces a trailing frame.
    pub fn tick(&mut self, frame: Frame, bus: &mut EventBus) {
        if self.surface.is_none() {
            return;
        }
        let mut moved = false;

        if self.view.auto_rotate {
            self.view.look_at = Position::new(
                self.view.look_at.latitude,
                wrap_longitude(self.view.look_at.longitude + AUTO_ROTATE_STEP_DEG),
            );
            moved = true;
        }

        if let Some(anim) = self.go_to {
            let dlat = anim.target.latitude - self.view.look_at.latitude;
            let dlon = shortest_longitude_delta(self.view.look_at.longitude, anim.target.longitude);
            if dlat.abs() < GO_TO_ARRIVAL_EPS_DEG && dlon.abs() < GO_TO_ARRIVAL_EPS_DEG {
                self.view.look_at = anim.target;
                self.view.range_m = anim.range_m;
                self.go_to = None;
                bus.emit(
                    frame,
                    "camera",
                    format!(
                        "arrived at {:.4},{:.4}",
                        anim.target.latitude, anim.target.longitude
                    ),
                );
            } else {
                let alpha = 1.0 - (-GO_TO_SMOOTHING * frame.dt_s).exp();
                self.view.look_at = Position::new(
                    self.view.look_at.latitude + dlat * alpha,
                    self.view.look_at.longitude + dlon * alpha,
                );
            }
            moved = true;
        }

        if moved {
            if let Some(surface) = self.surface.as_mut() {
                surface.redraw();
            }
        }
    }

    /// Stops the rotation loop and any in-flight animation. The engine stays
    /// initialized; there is no transition back to `Uninitialized`.
    pub fn teardown(&mut self) {
        self.view.auto_rotate = false;
        self.go_to = None;
    }
}

impl<S: RenderSurface> GlobeControls for GlobeEngine<S> {
    /// Starts an animation toward the coordinate; a new call supersedes any
    /// in-flight one. The range is applied on arrival.
    fn go_to_location(&mut self, latitude: f64, longitude: f64, range_m: Option<f64>) {
        if self.surface.is_none() {
            return;
        }
        self.go_to = Some(GoToAnimation {
            target: Position::new(latitude, longitude),
            range_m: range_m.unwrap_or(DEFAULT_GO_TO_RANGE_M),
        });
    }

    /// Reads back the current frame. Only defined when the surface was
    /// created with draw-buffer preservation.
    fn snapshot(&self) -> Option<RasterBuffer> {
        let surface = self.surface.as_ref()?;
        if !surface.preserves_draw_buffer() {
            warn!("snapshot on an unpreserved draw buffer");
        }
        surface.read_pixels()
    }

    fn set_auto_rotate(&mut self, enabled: bool) {
        if self.surface.is_none() {
            return;
        }
        self.view.auto_rotate = enabled;
    }

    /// Replace-in-slot: the previous dynamic layer is fully detached before
    /// the new one mounts, so the scene never carries two.
    fn set_dynamic_layer(&mut self, request: Option<LayerRequest>) {
        if self.surface.is_none() {
            return;
        }
        self.dynamic = request.map(|request| {
            let tile_urls = level_zero_urls(&request);
            debug!(
                layer = %request.layer,
                time = %request.time,
                tiles = tile_urls.len(),
                "mounting dynamic layer"
            );
            MountedLayer {
                request,
                opacity: self.opacity,
                tile_urls,
            }
        });
        if let Some(surface) = self.surface.as_mut() {
            surface.redraw();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{AUTO_ROTATE_STEP_DEG, EngineState, GlobeControls, GlobeEngine};
    use crate::surface::{OffscreenSurface, RenderSurface, SurfaceError};
    use catalog::Catalog;
    use resolver::clock::FixedClock;
    use resolver::request::{LayerRequest, resolve};
    use runtime::event_bus::EventBus;
    use runtime::frame::Frame;

    fn engine() -> GlobeEngine<OffscreenSurface> {
        GlobeEngine::initialize(Ok(OffscreenSurface::new(640, 480)))
    }

    fn pm25_request() -> LayerRequest {
        let catalog = Catalog::embedded().unwrap();
        let clock = FixedClock(
            chrono::TimeZone::with_ymd_and_hms(&chrono::Utc, 2024, 6, 1, 12, 0, 0).unwrap(),
        );
        resolve(catalog.layer("pm2p5"), "2024-06-01T12:00:00Z", &clock).unwrap()
    }

    #[test]
    fn initialize_builds_static_scene_and_default_camera() {
        let engine = engine();
        assert_eq!(engine.state(), EngineState::Initialized);
        let names: Vec<_> = engine.static_layers().iter().map(|l| l.name).collect();
        assert_eq!(names, vec!["Blue Marble", "Atmosphere"]);
        assert_eq!(engine.view().range_m, 15_000_000.0);
    }

    #[test]
    fn failed_surface_leaves_engine_inert() {
        let mut engine: GlobeEngine<OffscreenSurface> = GlobeEngine::initialize(Err(
            SurfaceError::ContextCreation("no webgl".to_string()),
        ));
        assert_eq!(engine.state(), EngineState::Uninitialized);

        // Every operation is a no-op, never a panic.
        engine.set_dynamic_layer(Some(pm25_request()));
        engine.set_auto_rotate(true);
        engine.go_to_location(11.58, 43.14, None);
        engine.tick(Frame::new(0, 1.0 / 60.0), &mut EventBus::new());
        assert!(engine.snapshot().is_none());
        assert!(engine.mounted_layer().is_none());
        assert_eq!(engine.state(), EngineState::Uninitialized);
    }

    #[test]
    fn mounting_twice_keeps_exactly_one_layer() {
        let mut engine = engine();
        engine.set_dynamic_layer(Some(pm25_request()));
        engine.set_dynamic_layer(Some(pm25_request()));
        assert_eq!(engine.state(), EngineState::DynamicLayerMounted);
        let mounted = engine.mounted_layer().unwrap();
        assert_eq!(mounted.request, pm25_request());
    }

    #[test]
    fn mounting_derives_the_level_zero_tile_urls() {
        let mut engine = engine();
        engine.set_dynamic_layer(Some(pm25_request()));
        let mounted = engine.mounted_layer().unwrap();
        // One GetMap URL per level-zero tile of the conservative policy.
        assert_eq!(mounted.tile_urls.len(), 8);
        for url in &mounted.tile_urls {
            assert!(url.contains("request=GetMap"));
            assert!(url.contains("layers=composition_pm2p5"));
            assert!(url.contains("time=2024-06-01T12%3A00%3A00Z"));
        }
    }

    #[test]
    fn unmounting_returns_to_initialized() {
        let mut engine = engine();
        engine.set_dynamic_layer(Some(pm25_request()));
        engine.set_dynamic_layer(None);
        assert_eq!(engine.state(), EngineState::Initialized);
        assert!(engine.mounted_layer().is_none());
    }

    #[test]
    fn opacity_applies_without_remount() {
        let mut engine = engine();
        engine.set_dynamic_layer(Some(pm25_request()));
        engine.set_opacity(0.35);
        let mounted = engine.mounted_layer().unwrap();
        assert_eq!(mounted.opacity, 0.35);
        assert_eq!(mounted.request, pm25_request());

        // Out-of-range input is clamped.
        engine.set_opacity(3.0);
        assert_eq!(engine.mounted_layer().unwrap().opacity, 1.0);
    }

    #[test]
    fn new_mount_picks_up_current_opacity() {
        let mut engine = engine();
        engine.set_opacity(0.5);
        engine.set_dynamic_layer(Some(pm25_request()));
        assert_eq!(engine.mounted_layer().unwrap().opacity, 0.5);
    }

    #[test]
    fn auto_rotate_advances_one_step_per_frame() {
        let mut engine = engine();
        let mut bus = EventBus::new();
        engine.set_auto_rotate(true);
        let start = engine.view().look_at.longitude;

        let frame = Frame::new(0, 1.0 / 60.0);
        engine.tick(frame, &mut bus);
        assert_eq!(engine.view().look_at.longitude, start + AUTO_ROTATE_STEP_DEG);

        // Disable within the same frame interval: no further movement and no
        // further redraw on the next tick.
        engine.set_auto_rotate(false);
        let redraws = engine.surface().unwrap().redraw_count();
        engine.tick(frame.next(), &mut bus);
        assert_eq!(engine.view().look_at.longitude, start + AUTO_ROTATE_STEP_DEG);
        assert_eq!(engine.surface().unwrap().redraw_count(), redraws);
    }

    #[test]
    fn auto_rotate_wraps_longitude() {
        let mut engine = engine();
        let mut bus = EventBus::new();
        engine.go_to_location(0.0, 179.95, None);
        // Finish the animation.
        let mut frame = Frame::new(0, 1.0 / 60.0);
        for _ in 0..600 {
            engine.tick(frame, &mut bus);
            frame = frame.next();
        }
        engine.set_auto_rotate(true);
        engine.tick(frame, &mut bus);
        assert!(engine.view().look_at.longitude < -179.9);
    }

    #[test]
    fn go_to_arrives_and_applies_range() {
        let mut engine = engine();
        let mut bus = EventBus::new();
        engine.go_to_location(11.5884, 43.1456, None);

        let mut frame = Frame::new(0, 1.0 / 60.0);
        for _ in 0..600 {
            engine.tick(frame, &mut bus);
            frame = frame.next();
        }
        let view = engine.view();
        assert!((view.look_at.latitude - 11.5884).abs() < 1e-9);
        assert!((view.look_at.longitude - 43.1456).abs() < 1e-9);
        assert_eq!(view.range_m, 5_000_000.0);
        assert_eq!(bus.of_kind("camera").len(), 1);
    }

    #[test]
    fn newer_go_to_supersedes_in_flight_animation() {
        let mut engine = engine();
        let mut bus = EventBus::new();
        engine.go_to_location(45.0, 90.0, Some(1_000_000.0));

        let mut frame = Frame::new(0, 1.0 / 60.0);
        for _ in 0..3 {
            engine.tick(frame, &mut bus);
            frame = frame.next();
        }
        engine.go_to_location(-10.0, -60.0, Some(2_000_000.0));
        for _ in 0..600 {
            engine.tick(frame, &mut bus);
            frame = frame.next();
        }
        let view = engine.view();
        assert!((view.look_at.latitude - -10.0).abs() < 1e-9);
        assert!((view.look_at.longitude - -60.0).abs() < 1e-9);
        assert_eq!(view.range_m, 2_000_000.0);
        // Only the second animation completed.
        assert_eq!(bus.of_kind("camera").len(), 1);
    }

    #[test]
    fn snapshot_matches_buffer_dimensions() {
        let engine = engine();
        let shot = engine.snapshot().unwrap();
        assert_eq!((shot.width(), shot.height()), (640, 480));
    }

    #[test]
    fn snapshot_on_unpreserved_buffer_is_none() {
        let engine: GlobeEngine<OffscreenSurface> =
            GlobeEngine::initialize(Ok(OffscreenSurface::without_preserved_buffer(64, 64)));
        assert!(engine.snapshot().is_none());
    }

    #[test]
    fn teardown_stops_rotation_but_stays_initialized() {
        let mut engine = engine();
        engine.set_auto_rotate(true);
        engine.go_to_location(0.0, 0.0, None);
        engine.teardown();
        assert!(!engine.view().auto_rotate);
        assert_eq!(engine.state(), EngineState::Initialized);
    }
}
