//! Coordinate reference system transforms.
//!
//! Only WGS84 longitude/latitude and spherical Web Mercator are supported;
//! those are the two systems the published boundary files use. Any other
//! pair is reported as [`GeoError::UnsupportedReprojection`] rather than
//! silently joining across mismatched systems.

use crime_hotspots_geography_models::Crs;
use geo::{Coord, MapCoords, MultiPolygon};

use crate::GeoError;

/// Web Mercator sphere radius in meters.
const EARTH_RADIUS_M: f64 = 6_378_137.0;

/// Latitude limit of the Web Mercator projection.
const MAX_MERCATOR_LAT: f64 = 85.051_128_779_806_59;

/// Transforms a single coordinate between two systems.
///
/// # Errors
///
/// Returns [`GeoError::UnsupportedReprojection`] if no transform exists.
pub fn project_coord(coord: Coord<f64>, from: Crs, to: Crs) -> Result<Coord<f64>, GeoError> {
    transform_for(from, to).map(|f| f(coord))
}

/// Transforms every vertex of a multipolygon.
///
/// # Errors
///
/// Returns [`GeoError::UnsupportedReprojection`] if no transform exists.
pub fn reproject_multipolygon(
    geometry: &MultiPolygon<f64>,
    from: Crs,
    to: Crs,
) -> Result<MultiPolygon<f64>, GeoError> {
    let transform = transform_for(from, to)?;
    Ok(geometry.map_coords(transform))
}

fn transform_for(from: Crs, to: Crs) -> Result<fn(Coord<f64>) -> Coord<f64>, GeoError> {
    match (from, to) {
        (a, b) if a == b => Ok(identity),
        (Crs::WGS84, Crs::WEB_MERCATOR) => Ok(wgs84_to_web_mercator),
        (Crs::WEB_MERCATOR, Crs::WGS84) => Ok(web_mercator_to_wgs84),
        _ => Err(GeoError::UnsupportedReprojection { from, to }),
    }
}

const fn identity(coord: Coord<f64>) -> Coord<f64> {
    coord
}

fn wgs84_to_web_mercator(coord: Coord<f64>) -> Coord<f64> {
    let lat = coord.y.clamp(-MAX_MERCATOR_LAT, MAX_MERCATOR_LAT);
    Coord {
        x: EARTH_RADIUS_M * coord.x.to_radians(),
        y: EARTH_RADIUS_M * (std::f64::consts::FRAC_PI_4 + lat.to_radians() / 2.0).tan().ln(),
    }
}

fn web_mercator_to_wgs84(coord: Coord<f64>) -> Coord<f64> {
    Coord {
        x: (coord.x / EARTH_RADIUS_M).to_degrees(),
        y: (2.0 * (coord.y / EARTH_RADIUS_M).exp().atan() - std::f64::consts::FRAC_PI_2)
            .to_degrees(),
    }
}
