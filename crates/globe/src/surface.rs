use foundation::raster::RasterBuffer;

/// Seam between the engine and whatever actually rasterizes the scene.
///
/// On the web this wraps a canvas-backed context created with draw-buffer
/// preservation; in tests and the headless demo it is an in-memory buffer.
/// The engine owns exactly one surface and nobody else mutates it.
pub trait RenderSurface {
    /// Current pixel dimensions of the render buffer.
    fn size(&self) -> (u32, u32);

    /// Resize the render buffer. Does not redraw.
    fn resize(&mut self, width: u32, height: u32);

    /// Rasterize the current scene state into the buffer.
    fn redraw(&mut self);

    /// Whether the buffer survives past presentation. Snapshotting is only
    /// defined when this is true.
    fn preserves_draw_buffer(&self) -> bool;

    /// Read the buffer back as RGBA. `None` when the buffer contents are
    /// not retrievable (unpreserved buffer, lost context).
    fn read_pixels(&self) -> Option<RasterBuffer>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SurfaceError {
    /// The rendering context could not be created at all. Fatal to 3D
    /// functionality but never to the host application.
    ContextCreation(String),
}

impl std::fmt::Display for SurfaceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SurfaceError::ContextCreation(msg) => {
                write!(f, "render context creation failed: {msg}")
            }
        }
    }
}

impl std::error::Error for SurfaceError {}

/// In-memory surface for tests and the headless viewer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OffscreenSurface {
    width: u32,
    height: u32,
    clear_color: [u8; 4],
    preserve: bool,
    redraw_count: u64,
}

impl OffscreenSurface {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            // Deep-space background.
            clear_color: [0x02, 0x06, 0x17, 0xff],
            preserve: true,
            redraw_count: 0,
        }
    }

    /// A surface whose buffer is not preserved past presentation, for
    /// exercising the snapshot precondition.
    pub fn without_preserved_buffer(width: u32, height: u32) -> Self {
        Self {
            preserve: false,
            ..Self::new(width, height)
        }
    }

    pub fn redraw_count(&self) -> u64 {
        self.redraw_count
    }
}

impl RenderSurface for OffscreenSurface {
    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.width = width.max(1);
        self.height = height.max(1);
    }

    fn redraw(&mut self) {
        self.redraw_count += 1;
    }

    fn preserves_draw_buffer(&self) -> bool {
        self.preserve
    }

    fn read_pixels(&self) -> Option<RasterBuffer> {
        if !self.preserve {
            return None;
        }
        RasterBuffer::filled(self.width, self.height, self.clear_color).ok()
    }
}
