//! Camera viewport fitting under screen occlusion.
//!
//! Uses the Web Mercator world projection with 512 px tiles, the convention
//! of vector map renderers.

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::geometry::LatLng;

const TILE_SIZE: f64 = 512.0;
const MAX_LATITUDE: f64 = 85.051_128_779_806_59;
/// Deepest zoom the projection supports; used when no tighter bound applies.
const MERCATOR_MAX_ZOOM: f64 = 24.0;

/// Spacing kept between fitted points and the screen edges, in pixels.
const PADDING_PX: f64 = 20.0;
/// Marker height; markers extend upwards from their point.
const MARKER_SIZE_PX: f64 = 50.0;
/// Header overlaying the top of the map.
const OCCLUDED_TOP_PX: f64 = 40.0;
/// Radius of route point circles drawn below their point.
const CIRCLE_RADIUS_PX: f64 = 5.0;
/// Zoom bound applied when nothing occludes the bottom of the map.
const UNOCCLUDED_MAX_ZOOM: f64 = 17.0;

/// Camera state plus the pixel size of the map surface.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub latitude: f64,
    pub longitude: f64,
    pub zoom: f64,
    pub bearing: f64,
    pub pitch: f64,
    pub width: f64,
    pub height: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            latitude: 60.17,
            longitude: 24.941,
            zoom: 15.0,
            bearing: 0.0,
            pitch: 0.0,
            width: 0.0,
            height: 0.0,
        }
    }
}

/// Pixel insets from each screen edge.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Padding {
    pub top: f64,
    pub bottom: f64,
    pub left: f64,
    pub right: f64,
}

/// Frame `points` in `viewport`, leaving room for markers, the header and a
/// bottom panel covering `occluded_bottom` (0..1) of the map height.
///
/// Returns `viewport` unchanged when there is nothing to fit or the padding
/// leaves no room on screen.
pub fn fit(viewport: &Viewport, points: &[Option<LatLng>], occluded_bottom: f64) -> Viewport {
    let points: Vec<LatLng> = points.iter().flatten().copied().collect();
    let Some(first) = points.first() else {
        return *viewport;
    };

    let (mut min, mut max) = (*first, *first);
    for p in &points[1..] {
        min.lat = min.lat.min(p.lat);
        min.lon = min.lon.min(p.lon);
        max.lat = max.lat.max(p.lat);
        max.lon = max.lon.max(p.lon);
    }

    let padding = Padding {
        top: PADDING_PX + OCCLUDED_TOP_PX + MARKER_SIZE_PX,
        bottom: PADDING_PX + occluded_bottom * viewport.height + CIRCLE_RADIUS_PX,
        left: PADDING_PX + MARKER_SIZE_PX / 2.0,
        right: PADDING_PX + MARKER_SIZE_PX / 2.0,
    };
    // The fit cannot honour both bottom padding and a zoom bound.
    let max_zoom = if occluded_bottom == 0.0 {
        UNOCCLUDED_MAX_ZOOM
    } else {
        MERCATOR_MAX_ZOOM
    };

    match fit_bounds(viewport, min, max, padding, max_zoom) {
        Some(fitted) => fitted,
        None => {
            warn!(
                width = viewport.width,
                height = viewport.height,
                "viewport too small for padding, keeping camera"
            );
            *viewport
        }
    }
}

/// Centre and zoom so that the box `south_west`..`north_east` fills the
/// area inside `padding`.
pub fn fit_bounds(
    viewport: &Viewport,
    south_west: LatLng,
    north_east: LatLng,
    padding: Padding,
    max_zoom: f64,
) -> Option<Viewport> {
    let nw = lng_lat_to_world(LatLng::new(north_east.lat, south_west.lon));
    let se = lng_lat_to_world(LatLng::new(south_west.lat, north_east.lon));

    let size = ((se.0 - nw.0).abs(), (se.1 - nw.1).abs());
    let target_width = viewport.width - padding.left - padding.right;
    let target_height = viewport.height - padding.top - padding.bottom;
    if target_width <= 0.0 || target_height <= 0.0 {
        return None;
    }

    // A zero-sized box scales to infinity and leaves the offsets at zero.
    let scale_x = target_width / size.0;
    let scale_y = target_height / size.1;
    let offset_x = (padding.right - padding.left) / 2.0 / scale_x;
    let offset_y = (padding.top - padding.bottom) / 2.0 / scale_y;

    let center = world_to_lng_lat(((se.0 + nw.0) / 2.0 + offset_x, (se.1 + nw.1) / 2.0 + offset_y));
    let zoom = max_zoom.min(scale_x.min(scale_y).abs().log2());

    Some(Viewport {
        latitude: center.lat,
        longitude: center.lon,
        zoom,
        ..*viewport
    })
}

/// Project to world pixels at zoom 0, y growing northwards.
fn lng_lat_to_world(p: LatLng) -> (f64, f64) {
    let lambda = p.lon.to_radians();
    let phi = p.lat.clamp(-MAX_LATITUDE, MAX_LATITUDE).to_radians();
    let x = TILE_SIZE * (lambda + PI) / (2.0 * PI);
    let y = TILE_SIZE * (PI + (PI / 4.0 + phi * 0.5).tan().ln()) / (2.0 * PI);
    (x, y)
}

fn world_to_lng_lat((x, y): (f64, f64)) -> LatLng {
    let lambda = x / TILE_SIZE * (2.0 * PI) - PI;
    let phi = 2.0 * ((y / TILE_SIZE * (2.0 * PI) - PI).exp().atan() - PI / 4.0);
    LatLng::new(phi.to_degrees(), lambda.to_degrees())
}
