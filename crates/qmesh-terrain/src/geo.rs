//! Geographic boxes and ellipsoid conversions.
//!
//! Angles are radians throughout. World positions are earth-centered,
//! earth-fixed (z through the north pole).

use glam::DVec3;
use serde::{Deserialize, Serialize};

/// A geographic bounding rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoBox {
    /// Western longitude bound, radians.
    pub west: f64,
    /// Southern latitude bound, radians.
    pub south: f64,
    /// Eastern longitude bound, radians.
    pub east: f64,
    /// Northern latitude bound, radians.
    pub north: f64,
}

impl GeoBox {
    /// Construct from bounds in radians.
    #[must_use]
    pub fn new(west: f64, south: f64, east: f64, north: f64) -> Self {
        Self {
            west,
            south,
            east,
            north,
        }
    }

    /// Longitude span.
    #[must_use]
    pub fn width(&self) -> f64 {
        self.east - self.west
    }

    /// Latitude span.
    #[must_use]
    pub fn height(&self) -> f64 {
        self.north - self.south
    }

    /// Center longitude/latitude.
    #[must_use]
    pub fn center(&self) -> (f64, f64) {
        (
            (self.west + self.east) * 0.5,
            (self.south + self.north) * 0.5,
        )
    }

    /// Longitude at normalized coordinate `u` in `[0, 1]`.
    #[must_use]
    pub fn lon_at(&self, u: f64) -> f64 {
        self.west + self.width() * u
    }

    /// Latitude at normalized coordinate `v` in `[0, 1]`.
    #[must_use]
    pub fn lat_at(&self, v: f64) -> f64 {
        self.south + self.height() * v
    }

    /// The quadrant selected by `left` (western half) and `bottom`
    /// (southern half), by linear bisection.
    #[must_use]
    pub fn quadrant(&self, left: bool, bottom: bool) -> Self {
        let (mid_lon, mid_lat) = self.center();
        Self {
            west: if left { self.west } else { mid_lon },
            east: if left { mid_lon } else { self.east },
            south: if bottom { self.south } else { mid_lat },
            north: if bottom { mid_lat } else { self.north },
        }
    }

    /// Whether this box overlaps `other`.
    #[must_use]
    pub fn intersects(&self, other: &Self) -> bool {
        self.west < other.east
            && other.west < self.east
            && self.south < other.north
            && other.south < self.north
    }
}

/// An ellipsoid of revolution, the projection target for tile
/// geometry.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Ellipsoid {
    /// Semi-axes in meters.
    pub radii: DVec3,
}

impl Ellipsoid {
    /// The WGS84 reference ellipsoid.
    pub const WGS84: Self = Self {
        radii: DVec3::new(6_378_137.0, 6_378_137.0, 6_356_752.314_245_179_3),
    };

    fn radii_squared(&self) -> DVec3 {
        self.radii * self.radii
    }

    fn one_over_radii_squared(&self) -> DVec3 {
        1.0 / self.radii_squared()
    }

    /// Outward unit normal of the ellipsoid surface under the given
    /// geodetic coordinates.
    #[must_use]
    pub fn geodetic_normal(&self, lon: f64, lat: f64) -> DVec3 {
        let cos_lat = lat.cos();
        DVec3::new(cos_lat * lon.cos(), cos_lat * lon.sin(), lat.sin())
    }

    /// Project geodetic coordinates to a world-space point.
    #[must_use]
    pub fn to_cartesian(&self, lon: f64, lat: f64, height: f64) -> DVec3 {
        let n = self.geodetic_normal(lon, lat);
        let mut k = self.radii_squared() * n;
        let gamma = n.dot(k).sqrt();
        k /= gamma;
        k + n * height
    }

    /// Invert [`Self::to_cartesian`]: recover (lon, lat, height).
    ///
    /// Uses the iterative scale-to-geodetic-surface method; converges
    /// to sub-millimeter height accuracy in a handful of iterations
    /// for points anywhere near the surface.
    #[must_use]
    pub fn to_geodetic(&self, position: DVec3) -> (f64, f64, f64) {
        let surface = self.scale_to_geodetic_surface(position);
        let normal = (surface * self.one_over_radii_squared()).normalize();
        let lon = normal.y.atan2(normal.x);
        let lat = normal.z.asin();
        let delta = position - surface;
        let height = delta.length().copysign(delta.dot(normal));
        (lon, lat, height)
    }

    fn scale_to_geodetic_surface(&self, position: DVec3) -> DVec3 {
        let a = self.one_over_radii_squared();
        let p2 = position * position;

        // Initial guess: scale straight toward the center, then seed
        // the Newton multiplier from the surface gradient there.
        let ratio = (1.0 / (p2 * a).element_sum()).sqrt();
        let intersection = position * ratio;
        let gradient = intersection * a * 2.0;
        let mut lambda = (1.0 - ratio) * position.length() / (0.5 * gradient.length());

        // Newton iteration on f(lambda) = |scaled point on ellipsoid| - 1.
        for _ in 0..16 {
            let m = DVec3::ONE / (DVec3::ONE + lambda * a);
            let m2 = m * m;
            let func = (p2 * m2 * a).element_sum() - 1.0;
            if func.abs() < 1e-12 {
                break;
            }
            let denominator = (p2 * m2 * m * a * a).element_sum();
            lambda -= func / (-2.0 * denominator);
        }

        let m = DVec3::ONE / (DVec3::ONE + lambda * a);
        position * m
    }
}

/// Web-Mercator vertical coordinate of a latitude, unnormalized.
#[must_use]
pub fn mercator_y(lat: f64) -> f64 {
    (std::f64::consts::FRAC_PI_4 + lat * 0.5).tan().ln()
}

/// Web-Mercator Y of `lat` normalized to `[0, 1]` within `geo_box`.
#[must_use]
pub fn normalized_mercator_y(lat: f64, geo_box: &GeoBox) -> f64 {
    let south = mercator_y(geo_box.south);
    let north = mercator_y(geo_box.north);
    if (north - south).abs() < f64::EPSILON {
        return 0.0;
    }
    (mercator_y(lat) - south) / (north - south)
}
