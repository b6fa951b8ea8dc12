use catalog::ServiceId;

/// Fixed base endpoints keyed by service. The only auth is the public token
/// embedded in the forecast endpoint URL.
pub const FORECAST_ENDPOINT: &str = "https://eccharts.ecmwf.int/wms/?token=public";
pub const SATELLITE_ARCHIVE_ENDPOINT: &str =
    "https://gibs.earthdata.nasa.gov/wms/epsg4326/best/wms.cgi";
pub const NEAR_REAL_TIME_ENDPOINT: &str = "https://view.eumetsat.int/geoserver/wms";

pub fn endpoint_for(service: ServiceId) -> &'static str {
    match service {
        ServiceId::Forecast => FORECAST_ENDPOINT,
        ServiceId::SatelliteArchive => SATELLITE_ARCHIVE_ENDPOINT,
        ServiceId::NearRealTime => NEAR_REAL_TIME_ENDPOINT,
    }
}

/// Source attribution line shown on the export poster.
pub fn attribution(service: ServiceId) -> &'static str {
    match service {
        ServiceId::NearRealTime => "EUMETSAT METEOSAT",
        _ => "COPERNICUS CAMS",
    }
}
