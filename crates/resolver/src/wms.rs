use crate::request::LayerRequest;

/// A geographic bounding box in degrees.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Sector {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

impl Sector {
    pub const FULL_SPHERE: Sector = Sector {
        min_lat: -90.0,
        max_lat: 90.0,
        min_lon: -180.0,
        max_lon: 180.0,
    };
}

impl Sector {
    /// Splits the full sphere into the level-zero grid of `delta_deg` tiles,
    /// row-major from the south-west corner.
    pub fn level_zero_grid(delta_deg: f64) -> Vec<Sector> {
        let mut sectors = Vec::new();
        let mut min_lat = -90.0;
        while min_lat < 90.0 {
            let mut min_lon = -180.0;
            while min_lon < 180.0 {
                sectors.push(Sector {
                    min_lat,
                    max_lat: (min_lat + delta_deg).min(90.0),
                    min_lon,
                    max_lon: (min_lon + delta_deg).min(180.0),
                });
                min_lon += delta_deg;
            }
            min_lat += delta_deg;
        }
        sectors
    }
}

/// The GetMap URLs a freshly mounted layer fetches first: one per level-zero
/// tile of the request's tiling policy, at the policy's tile size.
pub fn level_zero_urls(request: &LayerRequest) -> Vec<String> {
    let size = request.tiling.tile_size_px;
    Sector::level_zero_grid(request.tiling.level_zero_delta_deg)
        .into_iter()
        .map(|sector| get_map_url(request, sector, size, size))
        .collect()
}

/// Builds the GetMap URL for one tile of a mounted layer.
///
/// Any query already present on the endpoint (e.g. the public token) is
/// preserved; parameters are appended with the right separator.
pub fn get_map_url(request: &LayerRequest, sector: Sector, width: u32, height: u32) -> String {
    let sep = if request.endpoint.contains('?') {
        if request.endpoint.ends_with('?') || request.endpoint.ends_with('&') {
            ""
        } else {
            "&"
        }
    } else {
        "?"
    };

    let mut url = format!(
        "{endpoint}{sep}service=WMS&version={version}&request=GetMap&layers={layers}&styles={styles}&format={format}&transparent={transparent}&srs={srs}&width={width}&height={height}&bbox={min_lon},{min_lat},{max_lon},{max_lat}",
        endpoint = request.endpoint,
        version = request.tiling.wms_version,
        layers = encode_query_value(&request.layer),
        styles = encode_query_value(&request.style),
        format = encode_query_value(request.tiling.format),
        transparent = request.tiling.transparent,
        srs = encode_query_value(request.tiling.coordinate_system),
        min_lon = sector.min_lon,
        min_lat = sector.min_lat,
        max_lon = sector.max_lon,
        max_lat = sector.max_lat,
    );
    if !request.time.is_empty() {
        url.push_str("&time=");
        url.push_str(&encode_query_value(&request.time));
    }
    url
}

/// Minimal percent-encoding for the characters that actually occur in layer
/// names, style names, MIME types and timestamps.
fn encode_query_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            ' ' => out.push_str("%20"),
            ':' => out.push_str("%3A"),
            '/' => out.push_str("%2F"),
            '+' => out.push_str("%2B"),
            '&' => out.push_str("%26"),
            '#' => out.push_str("%23"),
            _ => out.push(ch),
        }
    }
    out
}
