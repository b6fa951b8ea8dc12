#![cfg_attr(target_arch = "wasm32", allow(unused))]

use std::env;
use std::path::PathBuf;

use capture::pipeline::{CaptureError, CaptureHost, capture};
use foundation::raster::RasterBuffer;
use globe::{GlobeControls, OffscreenSurface};
use resolver::clock::SystemClock;
use tracing::info;
#[cfg(not(target_arch = "wasm32"))]
use tracing_subscriber::EnvFilter;
use viewer::{AppShell, FRAME_DT_S};

/// The browser entry point is the library's exported functions; this binary
/// only exists natively.
#[cfg(target_arch = "wasm32")]
fn main() {}

/// Headless demo: mounts the first layer of the chosen category, flies to
/// Djibouti, spins for a bit and writes a poster PNG to disk.
#[cfg(not(target_arch = "wasm32"))]
fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let category = env::var("VIEWER_CATEGORY").unwrap_or_else(|_| "air_quality".to_string());
    let out_dir = env::var("VIEWER_OUT")
        .map(PathBuf::from)
        .unwrap_or_else(|_| env::temp_dir());
    let width: u32 = env::var("VIEWER_WIDTH")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(1280);
    let height: u32 = env::var("VIEWER_HEIGHT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(720);

    let mut shell = AppShell::new(Ok(OffscreenSurface::new(width, height)), SystemClock)?;
    shell.select_category(&category);
    shell.observe_container(width, height);

    // Let the debounce and the settle pulses run their course.
    shell.run_frames(60);
    info!(
        layer = shell.active_layer_id().unwrap_or("<none>"),
        timestamp = %shell.current_timestamp(),
        "layer mounted"
    );

    shell.go_to(11.5884, 43.1456, Some(800_000.0));
    shell.set_auto_rotate(false);
    for _ in 0..600 {
        shell.tick();
        if !shell.events().of_kind("camera").is_empty() {
            break;
        }
    }

    let mut host = FileHost {
        shell: &mut shell,
        out_dir,
        export_mode: false,
    };
    capture(&mut host, &SystemClock)?;

    shell.teardown();
    Ok(())
}

/// Capture host for the headless demo: the overlay is a flat translucent
/// panel raster and delivery is a plain file write.
struct FileHost<'a> {
    shell: &'a mut AppShell<OffscreenSurface, SystemClock>,
    out_dir: PathBuf,
    export_mode: bool,
}

impl CaptureHost for FileHost<'_> {
    fn set_export_mode(&mut self, enabled: bool) {
        self.export_mode = enabled;
    }

    fn settle(&mut self, delay_ms: u64) {
        let frames = (delay_ms as f64 / 1000.0 / FRAME_DT_S).ceil() as u32;
        self.shell.run_frames(frames);
    }

    fn globe_snapshot(&mut self) -> Option<RasterBuffer> {
        self.shell.engine().snapshot()
    }

    fn render_overlay(&mut self, scale: f64) -> Result<RasterBuffer, CaptureError> {
        let (width, height) = self
            .shell
            .engine()
            .buffer_size()
            .ok_or_else(|| CaptureError::OverlayRender("no render buffer".to_string()))?;
        let width = (width as f64 * scale) as u32;
        let height = (height as f64 * scale) as u32;
        RasterBuffer::filled(width, height, [0x0f, 0x17, 0x2a, 0x40])
            .map_err(|err| CaptureError::OverlayRender(err.to_string()))
    }

    fn deliver(&mut self, filename: &str, png: &[u8]) -> Result<(), CaptureError> {
        let path = self.out_dir.join(filename);
        std::fs::write(&path, png).map_err(|err| CaptureError::Deliver(err.to_string()))?;
        info!(path = %path.display(), bytes = png.len(), "poster written");
        Ok(())
    }
}
