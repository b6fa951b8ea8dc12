use foundation::raster::RasterBuffer;
use image::imageops::{self, FilterType};
use image::{Rgba, RgbaImage};

use crate::pipeline::CaptureError;

/// Poster background, filled first in case the globe snapshot is missing.
pub const EXPORT_BACKGROUND: [u8; 4] = [0x02, 0x06, 0x17, 0xff];

/// Composites the two capture passes into the final poster.
///
/// The output is sized to the overlay (which was rendered at print density).
/// The globe snapshot, when present, is stretched to fill; the overlay is
/// drawn on top unscaled at the origin with its alpha intact.
pub fn compose_poster(
    globe: Option<&RasterBuffer>,
    overlay: &RasterBuffer,
) -> Result<RgbaImage, CaptureError> {
    let (out_w, out_h) = (overlay.width(), overlay.height());
    let mut poster = RgbaImage::from_pixel(out_w, out_h, Rgba(EXPORT_BACKGROUND));

    if let Some(globe) = globe {
        let globe_img = to_image(globe)?;
        let stretched = imageops::resize(&globe_img, out_w, out_h, FilterType::Triangle);
        imageops::replace(&mut poster, &stretched, 0, 0);
    }

    let overlay_img = to_image(overlay)?;
    imageops::overlay(&mut poster, &overlay_img, 0, 0);
    Ok(poster)
}

pub fn encode_png(poster: &RgbaImage) -> Result<Vec<u8>, CaptureError> {
    let mut cursor = std::io::Cursor::new(Vec::new());
    poster
        .write_to(&mut cursor, image::ImageFormat::Png)
        .map_err(|e| CaptureError::Encode(e.to_string()))?;
    Ok(cursor.into_inner())
}

/// Encodes a bare raster (e.g. a globe snapshot on its own) as PNG.
pub fn encode_raster_png(buffer: &RasterBuffer) -> Result<Vec<u8>, CaptureError> {
    encode_png(&to_image(buffer)?)
}

fn to_image(buffer: &RasterBuffer) -> Result<RgbaImage, CaptureError> {
    RgbaImage::from_raw(buffer.width(), buffer.height(), buffer.pixels().to_vec())
        .ok_or_else(|| CaptureError::BadBuffer("raster length/dimension mismatch".to_string()))
}
