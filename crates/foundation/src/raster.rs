/// An owned RGBA8 pixel buffer.
///
/// This is the unit both the globe snapshot and the capture compositor
/// operate on: tightly packed rows, no stride, alpha last.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RasterBuffer {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RasterError {
    /// Pixel vector length does not match `width * height * 4`.
    LengthMismatch {
        width: u32,
        height: u32,
        len: usize,
    },
    ZeroSized,
}

impl std::fmt::Display for RasterError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RasterError::LengthMismatch { width, height, len } => write!(
                f,
                "pixel buffer length {len} does not match {width}x{height} RGBA"
            ),
            RasterError::ZeroSized => write!(f, "raster dimensions must be non-zero"),
        }
    }
}

impl std::error::Error for RasterError {}

impl RasterBuffer {
    pub fn from_rgba(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self, RasterError> {
        if width == 0 || height == 0 {
            return Err(RasterError::ZeroSized);
        }
        let expected = width as usize * height as usize * 4;
        if pixels.len() != expected {
            return Err(RasterError::LengthMismatch {
                width,
                height,
                len: pixels.len(),
            });
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    /// A buffer filled with a single RGBA color.
    pub fn filled(width: u32, height: u32, rgba: [u8; 4]) -> Result<Self, RasterError> {
        if width == 0 || height == 0 {
            return Err(RasterError::ZeroSized);
        }
        let mut pixels = Vec::with_capacity(width as usize * height as usize * 4);
        for _ in 0..(width as usize * height as usize) {
            pixels.extend_from_slice(&rgba);
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    /// The same image with its row order reversed. GL-style readbacks hand
    /// back the bottom row first; this puts row 0 at the top.
    pub fn flipped_vertical(&self) -> RasterBuffer {
        let row_len = self.width as usize * 4;
        let mut pixels = Vec::with_capacity(self.pixels.len());
        for row in self.pixels.chunks_exact(row_len).rev() {
            pixels.extend_from_slice(row);
        }
        RasterBuffer {
            width: self.width,
            height: self.height,
            pixels,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn into_pixels(self) -> Vec<u8> {
        self.pixels
    }
}
