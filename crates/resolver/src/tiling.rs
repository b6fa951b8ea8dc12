use serde::Serialize;

/// Parameters governing how a mounted raster layer is split into tile
/// requests.
#[derive(Debug, Copy, Clone, PartialEq, Serialize)]
pub struct TilingPolicy {
    /// Zoom-level count.
    pub num_levels: u32,
    /// Degrees of coverage per level-zero tile.
    pub level_zero_delta_deg: f64,
    /// Square tile edge in pixels.
    pub tile_size_px: u32,
    pub format: &'static str,
    pub transparent: bool,
    pub coordinate_system: &'static str,
    pub wms_version: &'static str,
}

impl TilingPolicy {
    /// The preset every dynamic layer mounts with. Coarse on purpose: the
    /// level count and level-zero delta bound the outstanding tile requests
    /// on each layer switch.
    pub const fn conservative() -> Self {
        Self {
            num_levels: 5,
            level_zero_delta_deg: 90.0,
            tile_size_px: 256,
            format: "image/png",
            transparent: true,
            coordinate_system: "EPSG:4326",
            wms_version: "1.1.1",
        }
    }
}

impl Default for TilingPolicy {
    fn default() -> Self {
        Self::conservative()
    }
}
