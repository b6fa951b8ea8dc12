//! Browser bindings. The page owns the DOM chrome (tabs, slider, buttons)
//! and drives the shell through the exported functions below; the shell owns
//! everything behind the canvas.

use std::cell::RefCell;
use std::rc::Rc;

use capture::compose::encode_raster_png;
use capture::pipeline::{CaptureError, CaptureHost, capture};
use foundation::raster::RasterBuffer;
use globe::{GlobeControls, RenderSurface, SurfaceError};
use resolver::clock::SystemClock;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{HtmlCanvasElement, WebGlRenderingContext};

use crate::shell::{AppShell, FRAME_DT_S};

thread_local! {
    static SHELL: RefCell<Option<AppShell<CanvasSurface, SystemClock>>> = const { RefCell::new(None) };
    /// Poster overlay raster supplied by the page before a capture.
    static OVERLAY: RefCell<Option<RasterBuffer>> = const { RefCell::new(None) };
}

/// Safe TLS access that no-ops after teardown instead of panicking.
fn with_shell<F, R>(f: F) -> R
where
    F: FnOnce(&mut AppShell<CanvasSurface, SystemClock>) -> R,
    R: Default,
{
    SHELL
        .try_with(|cell| cell.borrow_mut().as_mut().map(|shell| f(shell)))
        .ok()
        .flatten()
        .unwrap_or_default()
}

/// Canvas-backed render surface. The context is created once with draw-buffer
/// preservation so poster capture can read the last presented frame.
pub struct CanvasSurface {
    canvas: HtmlCanvasElement,
    context: WebGlRenderingContext,
}

impl CanvasSurface {
    fn create(canvas: HtmlCanvasElement) -> Result<Self, SurfaceError> {
        let options = js_sys::Object::new();
        js_sys::Reflect::set(
            &options,
            &JsValue::from_str("preserveDrawingBuffer"),
            &JsValue::TRUE,
        )
        .map_err(|_| SurfaceError::ContextCreation("context options rejected".to_string()))?;

        let context = canvas
            .get_context_with_context_options("webgl", &options)
            .ok()
            .flatten()
            .ok_or_else(|| SurfaceError::ContextCreation("webgl unavailable".to_string()))?
            .dyn_into::<WebGlRenderingContext>()
            .map_err(|_| SurfaceError::ContextCreation("webgl unavailable".to_string()))?;

        Ok(Self { canvas, context })
    }
}

impl RenderSurface for CanvasSurface {
    fn size(&self) -> (u32, u32) {
        (self.canvas.width(), self.canvas.height())
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.canvas.set_width(width.max(1));
        self.canvas.set_height(height.max(1));
    }

    fn redraw(&mut self) {
        // The scene is presented on the next animation frame; the context's
        // draw buffer then holds it until the frame after.
        self.context.flush();
    }

    fn preserves_draw_buffer(&self) -> bool {
        true
    }

    fn read_pixels(&self) -> Option<RasterBuffer> {
        let width = self.canvas.width();
        let height = self.canvas.height();
        if width == 0 || height == 0 {
            return None;
        }
        let mut pixels = vec![0u8; width as usize * height as usize * 4];
        self.context
            .read_pixels_with_opt_u8_array(
                0,
                0,
                width as i32,
                height as i32,
                WebGlRenderingContext::RGBA,
                WebGlRenderingContext::UNSIGNED_BYTE,
                Some(&mut pixels),
            )
            .ok()?;
        // GL hands rows back bottom-up.
        RasterBuffer::from_rgba(width, height, pixels)
            .ok()
            .map(|buffer| buffer.flipped_vertical())
    }
}

#[wasm_bindgen(start)]
pub fn start() {
    console_error_panic_hook::set_once();
}

/// Creates the shell against the canvas with the given element id and starts
/// the animation and resize plumbing. Context-creation failure leaves the
/// rest of the page functional.
#[wasm_bindgen]
pub fn init_viewer(canvas_id: &str) -> Result<(), JsValue> {
    let window = web_sys::window().ok_or_else(|| JsValue::from_str("no window"))?;
    let document = window
        .document()
        .ok_or_else(|| JsValue::from_str("no document"))?;
    let canvas = document
        .get_element_by_id(canvas_id)
        .ok_or_else(|| JsValue::from_str("missing canvas element"))?
        .dyn_into::<HtmlCanvasElement>()?;

    let surface = CanvasSurface::create(canvas.clone());
    let shell = AppShell::new(surface, SystemClock)
        .map_err(|err| JsValue::from_str(&format!("catalog load failed: {err}")))?;
    SHELL.with(|cell| cell.replace(Some(shell)));

    observe_resize(&canvas)?;
    request_frame_loop()?;
    Ok(())
}

#[wasm_bindgen]
pub fn select_category(category_id: &str) {
    with_shell(|shell| shell.select_category(category_id));
}

#[wasm_bindgen]
pub fn select_layer(layer_id: &str) {
    with_shell(|shell| shell.select_layer(layer_id));
}

#[wasm_bindgen]
pub fn clear_layer() {
    with_shell(|shell| shell.clear_layer());
}

#[wasm_bindgen]
pub fn set_time_offset(hours: i32) {
    with_shell(|shell| shell.set_time_offset(hours as i64));
}

#[wasm_bindgen]
pub fn step_play() {
    with_shell(|shell| shell.step_play());
}

#[wasm_bindgen]
pub fn set_opacity(opacity: f64) {
    with_shell(|shell| shell.set_opacity(opacity));
}

#[wasm_bindgen]
pub fn set_auto_rotate(enabled: bool) {
    with_shell(|shell| shell.set_auto_rotate(enabled));
}

#[wasm_bindgen]
pub fn go_to(latitude: f64, longitude: f64, range_m: Option<f64>) {
    with_shell(|shell| shell.go_to(latitude, longitude, range_m));
}

/// The current render buffer as PNG bytes, for the page's share/preview UI.
#[wasm_bindgen]
pub fn snapshot_png() -> Option<Vec<u8>> {
    with_shell(|shell| shell.engine().snapshot())
        .and_then(|buffer| encode_raster_png(&buffer).ok())
}

/// Stores the page-rendered poster overlay (RGBA, already at print density)
/// consumed by the next `capture_poster` call.
#[wasm_bindgen]
pub fn set_poster_overlay(width: u32, height: u32, pixels: &[u8]) -> Result<(), JsValue> {
    let raster = RasterBuffer::from_rgba(width, height, pixels.to_vec())
        .map_err(|err| JsValue::from_str(&err.to_string()))?;
    let _ = OVERLAY.try_with(|cell| cell.replace(Some(raster)));
    Ok(())
}

/// Runs the poster pipeline against the live shell and triggers a client-side
/// download. Failures are logged to the console; no file is produced.
#[wasm_bindgen]
pub fn capture_poster() {
    let mut host = DomCaptureHost;
    if let Err(err) = capture(&mut host, &SystemClock) {
        web_sys::console::error_1(&JsValue::from_str(&format!("poster capture failed: {err}")));
    }
}

#[wasm_bindgen]
pub fn current_timestamp() -> String {
    with_shell(|shell| shell.current_timestamp())
}

#[wasm_bindgen]
pub fn attribution() -> String {
    with_shell(|shell| shell.attribution().to_string())
}

#[wasm_bindgen]
pub fn active_layer_id() -> Option<String> {
    with_shell(|shell| shell.active_layer_id().map(str::to_string))
}

#[wasm_bindgen]
pub fn teardown() {
    with_shell(|shell| shell.teardown());
    let _ = SHELL.try_with(|cell| cell.replace(None));
    let _ = OVERLAY.try_with(|cell| cell.replace(None));
}

/// Capture host backed by the live page: export mode is a body attribute the
/// stylesheet keys its presentation rules off, the overlay comes from the
/// `set_poster_overlay` store, and delivery is an object-URL download.
struct DomCaptureHost;

impl CaptureHost for DomCaptureHost {
    fn set_export_mode(&mut self, enabled: bool) {
        let Some(body) = web_sys::window()
            .and_then(|w| w.document())
            .and_then(|d| d.body())
        else {
            return;
        };
        if enabled {
            let _ = body.set_attribute("data-export-mode", "true");
        } else {
            let _ = body.remove_attribute("data-export-mode");
        }
    }

    fn settle(&mut self, delay_ms: u64) {
        let frames = (delay_ms as f64 / 1000.0 / FRAME_DT_S).ceil() as u32;
        with_shell(|shell| shell.run_frames(frames));
    }

    fn globe_snapshot(&mut self) -> Option<RasterBuffer> {
        with_shell(|shell| shell.engine().snapshot())
    }

    fn render_overlay(&mut self, _scale: f64) -> Result<RasterBuffer, CaptureError> {
        OVERLAY
            .try_with(|cell| cell.borrow_mut().take())
            .ok()
            .flatten()
            .ok_or_else(|| CaptureError::OverlayRender("no poster overlay supplied".to_string()))
    }

    fn deliver(&mut self, filename: &str, png: &[u8]) -> Result<(), CaptureError> {
        download_png(filename, png)
            .map_err(|err| CaptureError::Deliver(format!("{err:?}")))
    }
}

/// Client-side download via a temporary object URL on a synthetic anchor.
fn download_png(filename: &str, png: &[u8]) -> Result<(), JsValue> {
    let parts = js_sys::Array::new();
    parts.push(&js_sys::Uint8Array::from(png));
    let blob = web_sys::Blob::new_with_u8_array_sequence(&parts)?;
    let url = web_sys::Url::create_object_url_with_blob(&blob)?;

    let document = web_sys::window()
        .and_then(|w| w.document())
        .ok_or_else(|| JsValue::from_str("no document"))?;
    let anchor: web_sys::HtmlAnchorElement = document.create_element("a")?.unchecked_into();
    anchor.set_href(&url);
    anchor.set_download(filename);
    anchor.click();
    web_sys::Url::revoke_object_url(&url)?;
    Ok(())
}

/// Watches the canvas's layout box and forwards content sizes to the shell.
fn observe_resize(canvas: &HtmlCanvasElement) -> Result<(), JsValue> {
    let element: web_sys::Element = canvas.clone().unchecked_into();
    let observed = element.clone();
    let callback = Closure::<dyn FnMut(js_sys::Array)>::new(move |_entries: js_sys::Array| {
        let width = observed.client_width().max(0) as u32;
        let height = observed.client_height().max(0) as u32;
        with_shell(|shell| shell.observe_container(width, height));
    });
    let observer = web_sys::ResizeObserver::new(callback.as_ref().unchecked_ref())?;
    observer.observe(&element);
    // The observer lives as long as the page.
    callback.forget();
    Ok(())
}

/// Self-rescheduling requestAnimationFrame loop driving `AppShell::tick`.
fn request_frame_loop() -> Result<(), JsValue> {
    let holder: Rc<RefCell<Option<Closure<dyn FnMut()>>>> = Rc::new(RefCell::new(None));
    let reschedule = holder.clone();
    *holder.borrow_mut() = Some(Closure::new(move || {
        with_shell(|shell| shell.tick());
        if let Some(closure) = reschedule.borrow().as_ref() {
            let _ = web_sys::window()
                .map(|w| w.request_animation_frame(closure.as_ref().unchecked_ref()));
        }
    }));
    let window = web_sys::window().ok_or_else(|| JsValue::from_str("no window"))?;
    if let Some(closure) = holder.borrow().as_ref() {
        window.request_animation_frame(closure.as_ref().unchecked_ref())?;
    }
    Ok(())
}
