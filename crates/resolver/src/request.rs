use catalog::{LayerDescriptor, ServiceId};
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tracing::debug;

use crate::clock::Clock;
use crate::service::endpoint_for;
use crate::tiling::TilingPolicy;

/// Concrete parameters for mounting one dynamic imagery layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LayerRequest {
    pub endpoint: String,
    pub layer: String,
    pub style: String,
    /// Service-corrected timestamp; date-only for the satellite archive.
    pub time: String,
    pub service: ServiceId,
    pub tiling: TilingPolicy,
}

/// Derives the remote request for `descriptor` at `requested_time`.
///
/// `None` descriptor means no dynamic layer: the caller removes whatever is
/// mounted. Unknown services were already collapsed to the default during
/// catalog load, so the endpoint lookup is total.
pub fn resolve(
    descriptor: Option<&LayerDescriptor>,
    requested_time: &str,
    clock: &impl Clock,
) -> Option<LayerRequest> {
    let descriptor = descriptor?;
    let time = corrected_time(descriptor.service, requested_time, clock.now_utc());
    Some(LayerRequest {
        endpoint: endpoint_for(descriptor.service).to_string(),
        layer: descriptor.layer.clone(),
        style: descriptor.style.clone(),
        time,
        service: descriptor.service,
        tiling: TilingPolicy::conservative(),
    })
}

/// Per-service time-correction rule.
///
/// - forecast: the caller already floored the timestamp to a 3-hour step;
///   pass it through.
/// - satellite archive: the archive publishes with at least one day of lag,
///   so requesting today 404s. Always ask for yesterday, date only.
/// - near-real-time: never ask for the future; clamp to the current wall
///   clock at second precision.
fn corrected_time(service: ServiceId, requested: &str, now: DateTime<Utc>) -> String {
    match service {
        ServiceId::Forecast => requested.to_string(),
        ServiceId::SatelliteArchive => (now - Duration::days(1)).format("%Y-%m-%d").to_string(),
        ServiceId::NearRealTime => match DateTime::parse_from_rfc3339(requested) {
            Ok(parsed) if parsed.with_timezone(&Utc) > now => {
                debug!(requested, "clamping future near-real-time request to now");
                now.format("%Y-%m-%dT%H:%M:%SZ").to_string()
            }
            // Unparseable timestamps pass through untouched; the remote
            // service is the authority on rejecting them.
            _ => requested.to_string(),
        },
    }
}
