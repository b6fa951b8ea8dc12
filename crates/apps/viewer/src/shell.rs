use catalog::{Catalog, CatalogError, ServiceId};
use globe::{GlobeControls, GlobeEngine, RenderSurface, SurfaceError, ViewportSync};
use resolver::clock::Clock;
use resolver::debounce::MountDebouncer;
use resolver::request::resolve;
use resolver::timeline::{TimeOffset, advance_for_play, derive_timestamp};
use runtime::event_bus::EventBus;
use runtime::frame::Frame;
use runtime::timers::Timers;

/// Frame cadence of the cooperative loop.
pub const FRAME_DT_S: f64 = 1.0 / 60.0;

/// Wires the catalog, the resolver, the debouncer and the engine into one
/// cooperative loop driven by `tick`.
///
/// This is the glue the interactive chrome talks to: category tabs call
/// `select_category`, the time slider calls `set_time_offset`, and so on.
/// Every change funnels through the debounced resolve-then-mount path.
pub struct AppShell<S: RenderSurface, C: Clock> {
    catalog: Catalog,
    clock: C,
    engine: GlobeEngine<S>,
    timers: Timers,
    viewport: ViewportSync,
    debouncer: MountDebouncer,
    bus: EventBus,
    frame: Frame,
    active_layer_id: Option<String>,
    active_category_id: Option<String>,
    time_offset: TimeOffset,
}

impl<S: RenderSurface, C: Clock> AppShell<S, C> {
    /// Loads the embedded catalog, initializes the engine and selects the
    /// first layer of the first category, like the dashboard does at
    /// startup.
    pub fn new(surface: Result<S, SurfaceError>, clock: C) -> Result<Self, CatalogError> {
        let catalog = Catalog::embedded()?;
        let mut timers = Timers::new();
        let viewport = ViewportSync::mount(&mut timers);
        let mut shell = Self {
            engine: GlobeEngine::initialize(surface),
            catalog,
            clock,
            timers,
            viewport,
            debouncer: MountDebouncer::new(),
            bus: EventBus::new(),
            frame: Frame::new(0, FRAME_DT_S),
            active_layer_id: None,
            active_category_id: None,
            time_offset: TimeOffset::LIVE,
        };
        if let Some(first) = shell.catalog.categories().first().map(|c| c.id.clone()) {
            shell.select_category(&first);
        }
        Ok(shell)
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn engine(&self) -> &GlobeEngine<S> {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut GlobeEngine<S> {
        &mut self.engine
    }

    pub fn events(&self) -> &EventBus {
        &self.bus
    }

    pub fn active_layer_id(&self) -> Option<&str> {
        self.active_layer_id.as_deref()
    }

    pub fn time_offset(&self) -> TimeOffset {
        self.time_offset
    }

    /// Source attribution for the poster overlay, based on the active layer.
    pub fn attribution(&self) -> &'static str {
        resolver::service::attribution(self.active_service())
    }

    pub fn select_category(&mut self, category_id: &str) {
        self.active_category_id = Some(category_id.to_string());
        let first = self
            .catalog
            .first_in_category(category_id)
            .map(|l| l.id.clone());
        match first {
            Some(id) => self.select_layer(&id),
            None => self.clear_layer(),
        }
    }

    pub fn select_layer(&mut self, layer_id: &str) {
        self.active_layer_id = self
            .catalog
            .layer(layer_id)
            .map(|l| l.id.clone())
            .or(self.active_layer_id.take());
        self.refresh_layer();
    }

    /// Deselects the dynamic layer; the (debounced) mount pass removes it.
    pub fn clear_layer(&mut self) {
        self.active_layer_id = None;
        self.refresh_layer();
    }

    pub fn set_time_offset(&mut self, hours: i64) {
        self.time_offset = TimeOffset::new(hours);
        self.refresh_layer();
    }

    /// One play-mode step: category step size, wrapping past the window end.
    pub fn step_play(&mut self) {
        let step = self
            .active_category_id
            .as_deref()
            .map(|c| self.catalog.time_step_hours(c))
            .unwrap_or(3);
        self.time_offset = advance_for_play(self.time_offset, step);
        self.refresh_layer();
    }

    pub fn set_opacity(&mut self, opacity: f64) {
        self.engine.set_opacity(opacity);
    }

    pub fn set_auto_rotate(&mut self, enabled: bool) {
        self.engine.set_auto_rotate(enabled);
    }

    pub fn go_to(&mut self, latitude: f64, longitude: f64, range_m: Option<f64>) {
        self.engine.go_to_location(latitude, longitude, range_m);
    }

    /// Container content-box size changed.
    pub fn observe_container(&mut self, width: u32, height: u32) {
        self.viewport.observe(&mut self.engine, width, height);
    }

    /// The ISO timestamp currently feeding the resolver.
    pub fn current_timestamp(&self) -> String {
        derive_timestamp(&self.clock, self.time_offset, self.active_service())
    }

    fn active_service(&self) -> ServiceId {
        self.active_layer_id
            .as_deref()
            .and_then(|id| self.catalog.layer(id))
            .map(|l| l.service)
            .unwrap_or(ServiceId::Forecast)
    }

    fn refresh_layer(&mut self) {
        let timestamp = self.current_timestamp();
        let descriptor = self
            .active_layer_id
            .as_deref()
            .and_then(|id| self.catalog.layer(id));
        let request = resolve(descriptor, &timestamp, &self.clock);
        self.debouncer.schedule(&mut self.timers, request);
    }

    /// One cooperative frame: timers, due layer mounts, engine animation.
    pub fn tick(&mut self) {
        let frame = self.frame;
        let fired = self.timers.advance(frame.dt_s);
        self.viewport.on_timers_fired(&mut self.engine, &fired);
        if let Some(request) = self.debouncer.take_due(&fired) {
            self.engine.set_dynamic_layer(request);
        }
        self.engine.tick(frame, &mut self.bus);
        self.frame = frame.next();
    }

    /// Run `n` frames.
    pub fn run_frames(&mut self, n: u32) {
        for _ in 0..n {
            self.tick();
        }
    }

    pub fn teardown(&mut self) {
        self.engine.teardown();
        self.debouncer.cancel(&mut self.timers);
        self.viewport.unmount(&mut self.timers);
    }
}
