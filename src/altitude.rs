//! Altitude-batch merger (§4.7), a thin collaborator for backends that query
//! altitudes from a remote service admitting at most 20 lookups per request.
//
// Grounded on `BackendAltitudeGeonames::queryAltitudes`/`slotResult` in
// `backend_altitude_geonames.cpp`: merge requests sharing a coordinate,
// batch the merged set by 20, parse a whitespace-separated reply with a
// `-32768` no-data sentinel, then fan the result back out to every request
// that shared the coordinate. The actual HTTP transport stays external;
// this module owns only the merge/batch/parse/fan-out bookkeeping.

use log::debug;

use crate::geo::GeoCoordinate;

const MAX_LOOKUPS_PER_REQUEST: usize = 20;
const NO_DATA_SENTINEL: f64 = -32768.0;

/// One original request for an altitude, tagged with a caller-chosen handle
/// used to route the eventual result back.
#[derive(Debug, Clone)]
pub struct AltitudeRequest<H> {
    pub handle: H,
    pub coordinate: GeoCoordinate,
}

/// One outstanding request, holding the deduplicated coordinates it covers
/// and, for each, every original handle that shares it.
#[derive(Debug, Clone)]
pub struct AltitudeBatch<H> {
    coordinates: Vec<GeoCoordinate>,
    handles: Vec<Vec<H>>,
}

impl<H> AltitudeBatch<H> {
    /// Coordinates in request order, altitude-cleared, matching the order
    /// the reply's whitespace-separated altitude list is expected in.
    pub fn coordinates(&self) -> &[GeoCoordinate] {
        &self.coordinates
    }

    pub fn len(&self) -> usize {
        self.coordinates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.coordinates.is_empty()
    }
}

/// Deduplicate `requests` by coincident lat/lon, then split the
/// deduplicated set into batches of at most [`MAX_LOOKUPS_PER_REQUEST`].
pub fn batch_requests<H: Clone>(requests: Vec<AltitudeRequest<H>>) -> Vec<AltitudeBatch<H>> {
    let mut merged: Vec<(GeoCoordinate, Vec<H>)> = Vec::new();
    for request in requests {
        if let Some(slot) = merged
            .iter_mut()
            .find(|(coord, _)| coord.same_lon_lat_as(&request.coordinate))
        {
            slot.1.push(request.handle);
        } else {
            merged.push((request.coordinate, vec![request.handle]));
        }
    }

    merged
        .chunks(MAX_LOOKUPS_PER_REQUEST)
        .map(|chunk| AltitudeBatch {
            coordinates: chunk.iter().map(|(c, _)| *c).collect(),
            handles: chunk.iter().map(|(_, hs)| hs.clone()).collect(),
        })
        .collect()
}

/// Parse a whitespace-separated altitude reply for `batch` and fan each
/// value back out to every handle that shares its coordinate. A malformed
/// or sentinel entry yields `None` for that coordinate's handles rather than
/// storing the sentinel.
pub fn apply_batch_reply<H: Clone>(batch: &AltitudeBatch<H>, reply: &str) -> Vec<(H, Option<f64>)> {
    let mut out = Vec::new();
    for (i, token) in reply.split_whitespace().enumerate() {
        let Some(handles) = batch.handles.get(i) else {
            debug!("altitude reply has more entries than the batch requested; ignoring the rest");
            break;
        };
        let altitude = token.parse::<f64>().ok().filter(|&v| v != NO_DATA_SENTINEL);
        for handle in handles {
            out.push((handle.clone(), altitude));
        }
    }
    out
}
