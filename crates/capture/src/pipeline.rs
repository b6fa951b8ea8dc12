use chrono::{DateTime, Utc};
use foundation::raster::RasterBuffer;
use resolver::clock::Clock;
use tracing::error;

use crate::compose::{compose_poster, encode_png};

/// DOM settle delay after entering export mode, before either capture pass.
/// Capturing earlier races the presentation-mode style changes and produces
/// a poster missing the overlay content.
pub const SETTLE_DELAY_MS: u64 = 200;

/// Overlay raster density multiplier for print-quality output.
pub const OVERLAY_SCALE: f64 = 2.0;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureError {
    /// The overlay element could not be rasterized.
    OverlayRender(String),
    /// A raster buffer had inconsistent dimensions.
    BadBuffer(String),
    Encode(String),
    /// The client-side download could not be triggered.
    Deliver(String),
}

impl std::fmt::Display for CaptureError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CaptureError::OverlayRender(msg) => write!(f, "overlay render failed: {msg}"),
            CaptureError::BadBuffer(msg) => write!(f, "bad capture buffer: {msg}"),
            CaptureError::Encode(msg) => write!(f, "png encode failed: {msg}"),
            CaptureError::Deliver(msg) => write!(f, "download delivery failed: {msg}"),
        }
    }
}

impl std::error::Error for CaptureError {}

/// Everything the capture pipeline needs from its surroundings.
///
/// Export mode is the presentation flag that hides interactive chrome and
/// shows the poster overlay; `settle` gives the host's layout a chance to
/// commit those changes before anything is read back.
pub trait CaptureHost {
    fn set_export_mode(&mut self, enabled: bool);
    fn settle(&mut self, delay_ms: u64);
    /// Current globe frame. `None` is tolerated: the poster falls back to
    /// the background fill.
    fn globe_snapshot(&mut self) -> Option<RasterBuffer>;
    /// Rasterize the poster overlay at `scale` density with a transparent
    /// background.
    fn render_overlay(&mut self, scale: f64) -> Result<RasterBuffer, CaptureError>;
    fn deliver(&mut self, filename: &str, png: &[u8]) -> Result<(), CaptureError>;
}

/// Download name: ISO timestamp with `:` and `.` flattened to dashes,
/// truncated to second precision.
pub fn poster_filename(now: DateTime<Utc>) -> String {
    format!("djibouti-map-export-{}.png", now.format("%Y-%m-%dT%H-%M-%S"))
}

/// Two-pass capture: globe snapshot plus overlay raster, composited and
/// delivered as one PNG.
///
/// Export mode is exited on every path out of this function, including
/// panics in the host callbacks; a failure in any step is logged and the
/// user simply gets no download, never a partial file.
pub fn capture<H: CaptureHost>(host: &mut H, clock: &impl Clock) -> Result<(), CaptureError> {
    let mut guard = ExportMode::enter(host);
    let result = run(guard.host(), clock);
    drop(guard);

    if let Err(err) = &result {
        error!(%err, "capture failed; no file produced");
    }
    result
}

fn run<H: CaptureHost>(host: &mut H, clock: &impl Clock) -> Result<(), CaptureError> {
    host.settle(SETTLE_DELAY_MS);

    // The globe must be read before export mode is reverted; the overlay
    // only after the export-mode DOM changes have been committed. Both hold
    // here: we are inside the guard and past the settle delay.
    let globe = host.globe_snapshot();
    let overlay = host.render_overlay(OVERLAY_SCALE)?;

    let poster = compose_poster(globe.as_ref(), &overlay)?;
    let png = encode_png(&poster)?;
    host.deliver(&poster_filename(clock.now_utc()), &png)
}

struct ExportMode<'a, H: CaptureHost> {
    host: &'a mut H,
}

impl<'a, H: CaptureHost> ExportMode<'a, H> {
    fn enter(host: &'a mut H) -> Self {
        host.set_export_mode(true);
        Self { host }
    }

    fn host(&mut self) -> &mut H {
        self.host
    }
}

impl<H: CaptureHost> Drop for ExportMode<'_, H> {
    fn drop(&mut self) {
        self.host.set_export_mode(false);
    }
}

#[cfg(test)]
mod tests {
    use super::{CaptureError, CaptureHost, SETTLE_DELAY_MS, capture, poster_filename};
    use chrono::{TimeZone, Utc};
    use foundation::raster::RasterBuffer;
    use pretty_assertions::assert_eq;
    use resolver::clock::FixedClock;

    fn clock() -> FixedClock {
        FixedClock(Utc.with_ymd_and_hms(2024, 6, 1, 12, 30, 5).unwrap())
    }

    #[derive(Default)]
    struct MockHost {
        log: Vec<String>,
        fail_overlay: bool,
        globe_missing: bool,
        delivered: Option<(String, Vec<u8>)>,
    }

    impl CaptureHost for MockHost {
        fn set_export_mode(&mut self, enabled: bool) {
            self.log.push(format!("export_mode:{enabled}"));
        }

        fn settle(&mut self, delay_ms: u64) {
            self.log.push(format!("settle:{delay_ms}"));
        }

        fn globe_snapshot(&mut self) -> Option<RasterBuffer> {
            self.log.push("globe_snapshot".to_string());
            if self.globe_missing {
                None
            } else {
                Some(RasterBuffer::filled(4, 4, [0, 64, 0, 255]).unwrap())
            }
        }

        fn render_overlay(&mut self, scale: f64) -> Result<RasterBuffer, CaptureError> {
            self.log.push(format!("render_overlay:{scale}"));
            if self.fail_overlay {
                Err(CaptureError::OverlayRender("legend image tainted".to_string()))
            } else {
                Ok(RasterBuffer::filled(8, 8, [0, 0, 0, 0]).unwrap())
            }
        }

        fn deliver(&mut self, filename: &str, png: &[u8]) -> Result<(), CaptureError> {
            self.log.push(format!("deliver:{filename}"));
            self.delivered = Some((filename.to_string(), png.to_vec()));
            Ok(())
        }
    }

    #[test]
    fn filename_flattens_iso_punctuation() {
        let name = poster_filename(clock().0);
        assert_eq!(name, "djibouti-map-export-2024-06-01T12-30-05.png");
    }

    #[test]
    fn capture_runs_steps_in_contract_order() {
        let mut host = MockHost::default();
        capture(&mut host, &clock()).unwrap();
        assert_eq!(
            host.log,
            vec![
                "export_mode:true".to_string(),
                format!("settle:{SETTLE_DELAY_MS}"),
                "globe_snapshot".to_string(),
                "render_overlay:2".to_string(),
                "deliver:djibouti-map-export-2024-06-01T12-30-05.png".to_string(),
                "export_mode:false".to_string(),
            ]
        );
        let (_, png) = host.delivered.unwrap();
        let decoded = image::load_from_memory(&png).unwrap();
        // Sized to the overlay raster, not the globe snapshot.
        assert_eq!((decoded.width(), decoded.height()), (8, 8));
    }

    #[test]
    fn overlay_failure_exits_export_mode_and_delivers_nothing() {
        let mut host = MockHost {
            fail_overlay: true,
            ..MockHost::default()
        };
        let err = capture(&mut host, &clock()).unwrap_err();
        assert!(matches!(err, CaptureError::OverlayRender(_)));
        assert!(host.delivered.is_none());
        assert_eq!(host.log.last().unwrap(), "export_mode:false");
        assert!(!host.log.iter().any(|l| l.starts_with("deliver")));
    }

    #[test]
    fn missing_globe_snapshot_still_produces_a_poster() {
        let mut host = MockHost {
            globe_missing: true,
            ..MockHost::default()
        };
        capture(&mut host, &clock()).unwrap();
        assert!(host.delivered.is_some());
    }
}
