//! Height-map rasterization and ground modification.
//!
//! Renders the surface geometry into a small row-major height raster
//! used as a DEM proxy for overlay blending, and burns ground
//! modification polygons into it. These are the only mutations applied
//! to a produced container; the caller keeps a single writer per tile.

use glam::DVec2;

use crate::error::{TerrainError, TerrainResult};
use crate::geo::GeoBox;
use crate::mesh::{GroupKind, HeightMap, TerrainMesh};

/// Raster side length of a rendered height map.
pub const HEIGHT_MAP_SIZE: u32 = 64;

/// A flat-topped modification area: terrain inside the ring is forced
/// to a constant height.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct GroundModificationPolygon {
    /// Closed ring of (lon, lat) in radians; the last vertex connects
    /// back to the first.
    pub ring: Vec<DVec2>,
    /// Replacement height in meters.
    pub height: f64,
}

impl GroundModificationPolygon {
    fn bounding_box(&self) -> Option<GeoBox> {
        let first = self.ring.first()?;
        let mut b = GeoBox::new(first.x, first.y, first.x, first.y);
        for p in &self.ring[1..] {
            b.west = b.west.min(p.x);
            b.east = b.east.max(p.x);
            b.south = b.south.min(p.y);
            b.north = b.north.max(p.y);
        }
        Some(b)
    }

    /// Even-odd ray cast in lon/lat space.
    fn contains(&self, point: DVec2) -> bool {
        let mut inside = false;
        let n = self.ring.len();
        let mut j = n - 1;
        for i in 0..n {
            let a = self.ring[i];
            let b = self.ring[j];
            if (a.y > point.y) != (b.y > point.y) {
                let x = a.x + (point.y - a.y) / (b.y - a.y) * (b.x - a.x);
                if point.x < x {
                    inside = !inside;
                }
            }
            j = i;
        }
        inside
    }
}

/// Rasterize the surface into `mesh.height_map`, then burn in any
/// intersecting modification polygons.
///
/// `geo_box` is the raster's coverage (usually the tile's own box; an
/// overlay pass may render a different window). `flip_y` stores row 0
/// at the northern edge instead of the southern one.
pub fn draw_height_map(
    mesh: &mut TerrainMesh,
    geo_box: &GeoBox,
    polygons: &[GroundModificationPolygon],
    flip_y: bool,
) -> TerrainResult<()> {
    if mesh.is_disposed() {
        return Err(TerrainError::Disposed);
    }

    let size = HEIGHT_MAP_SIZE;
    let mut data = vec![mesh.min_height; (size * size) as usize];

    rasterize_surface(mesh, geo_box, size, &mut data);

    let mut modified = false;
    for polygon in polygons {
        let Some(bbox) = polygon.bounding_box() else {
            continue;
        };
        if !bbox.intersects(geo_box) {
            continue;
        }
        burn_polygon(polygon, geo_box, size, &mut data);
        modified = true;
    }

    if flip_y {
        flip_rows(&mut data, size);
    }

    mesh.height_map = Some(HeightMap {
        width: size,
        height: size,
        data,
    });
    if modified {
        mesh.ground_elevation_modified = true;
        tracing::debug!(
            polygons = polygons.len(),
            "ground modification burned into height map"
        );
    }

    Ok(())
}

/// Barycentric-interpolate surface altitude at each covered texel
/// center. Texel (0, 0) is the south-west corner before any flip.
fn rasterize_surface(mesh: &TerrainMesh, geo_box: &GeoBox, size: u32, data: &mut [f32]) {
    let Some(surface) = mesh.group(GroupKind::Surface) else {
        return;
    };
    let indices = &mesh.indices[surface.start as usize..(surface.start + surface.count) as usize];

    // Vertex coordinates in raster space.
    let raster_pos = |i: usize| -> DVec2 {
        let lon = mesh.geo_box.lon_at(f64::from(mesh.uvs[i * 2]));
        let lat = mesh.geo_box.lat_at(f64::from(mesh.uvs[i * 2 + 1]));
        DVec2::new(
            (lon - geo_box.west) / geo_box.width() * f64::from(size),
            (lat - geo_box.south) / geo_box.height() * f64::from(size),
        )
    };

    for tri in indices.chunks_exact(3) {
        let [a, b, c] = [tri[0] as usize, tri[1] as usize, tri[2] as usize];
        let pa = raster_pos(a);
        let pb = raster_pos(b);
        let pc = raster_pos(c);

        let area = (pb - pa).perp_dot(pc - pa);
        if area.abs() < f64::EPSILON {
            continue;
        }

        let min_x = pa.x.min(pb.x).min(pc.x).floor().max(0.0) as u32;
        let max_x = (pa.x.max(pb.x).max(pc.x).ceil() as u32).min(size);
        let min_y = pa.y.min(pb.y).min(pc.y).floor().max(0.0) as u32;
        let max_y = (pa.y.max(pb.y).max(pc.y).ceil() as u32).min(size);

        for y in min_y..max_y {
            for x in min_x..max_x {
                let p = DVec2::new(f64::from(x) + 0.5, f64::from(y) + 0.5);
                let wa = (pb - p).perp_dot(pc - p) / area;
                let wb = (pc - p).perp_dot(pa - p) / area;
                let wc = 1.0 - wa - wb;
                if wa < -1e-9 || wb < -1e-9 || wc < -1e-9 {
                    continue;
                }
                let altitude = wa * f64::from(mesh.altitudes[a])
                    + wb * f64::from(mesh.altitudes[b])
                    + wc * f64::from(mesh.altitudes[c]);
                data[(y * size + x) as usize] = altitude as f32;
            }
        }
    }
}

fn burn_polygon(
    polygon: &GroundModificationPolygon,
    geo_box: &GeoBox,
    size: u32,
    data: &mut [f32],
) {
    for y in 0..size {
        for x in 0..size {
            let point = DVec2::new(
                geo_box.lon_at((f64::from(x) + 0.5) / f64::from(size)),
                geo_box.lat_at((f64::from(y) + 0.5) / f64::from(size)),
            );
            if polygon.contains(point) {
                data[(y * size + x) as usize] = polygon.height as f32;
            }
        }
    }
}

fn flip_rows(data: &mut [f32], size: u32) {
    let size = size as usize;
    for row in 0..size / 2 {
        let opposite = size - 1 - row;
        for col in 0..size {
            data.swap(row * size + col, opposite * size + col);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{BuildOptions, build};
    use crate::geo::Ellipsoid;
    use crate::test_support::grid_tile;

    fn flat_mesh(height: f32) -> TerrainMesh {
        let decoded = grid_tile(2, |_, _| height / 1000.0);
        build(
            &decoded,
            GeoBox::new(0.0, 0.0, 0.01, 0.01),
            Ellipsoid::WGS84,
            &BuildOptions::default(),
        )
    }

    #[test]
    fn flat_surface_rasterizes_to_constant() {
        let mut mesh = flat_mesh(250.0);
        let geo_box = mesh.geo_box;
        draw_height_map(&mut mesh, &geo_box, &[], false).unwrap();

        let map = mesh.height_map.as_ref().unwrap();
        for &h in &map.data {
            assert!((h - 250.0).abs() < 0.5, "texel height {h}");
        }
        assert!(!mesh.ground_elevation_modified);
    }

    #[test]
    fn polygon_burns_height_and_sets_flag() {
        let mut mesh = flat_mesh(100.0);
        let geo_box = mesh.geo_box;
        // Square covering the south-west quarter of the tile.
        let polygon = GroundModificationPolygon {
            ring: vec![
                DVec2::new(0.0, 0.0),
                DVec2::new(0.005, 0.0),
                DVec2::new(0.005, 0.005),
                DVec2::new(0.0, 0.005),
            ],
            height: -40.0,
        };
        draw_height_map(&mut mesh, &geo_box, &[polygon], false).unwrap();

        assert!(mesh.ground_elevation_modified);
        let map = mesh.height_map.as_ref().unwrap();
        // Inside the polygon.
        assert!((map.sample(5, 5) - -40.0).abs() < 0.5);
        // Far outside.
        assert!((map.sample(60, 60) - 100.0).abs() < 0.5);
    }

    #[test]
    fn non_intersecting_polygon_leaves_flag_clear() {
        let mut mesh = flat_mesh(100.0);
        let geo_box = mesh.geo_box;
        let polygon = GroundModificationPolygon {
            ring: vec![
                DVec2::new(1.0, 1.0),
                DVec2::new(1.1, 1.0),
                DVec2::new(1.1, 1.1),
            ],
            height: 0.0,
        };
        draw_height_map(&mut mesh, &geo_box, &[polygon], false).unwrap();
        assert!(!mesh.ground_elevation_modified);
        // The map still rendered.
        assert!(mesh.height_map.is_some());
    }

    #[test]
    fn flip_y_reverses_rows() {
        // Gradient in v: south low, north high.
        let decoded = grid_tile(2, |_, v| v);
        let mut mesh = build(
            &decoded,
            GeoBox::new(0.0, 0.0, 0.01, 0.01),
            Ellipsoid::WGS84,
            &BuildOptions::default(),
        );
        let geo_box = mesh.geo_box;

        draw_height_map(&mut mesh, &geo_box, &[], false).unwrap();
        let south_up = mesh.height_map.clone().unwrap();
        draw_height_map(&mut mesh, &geo_box, &[], true).unwrap();
        let north_up = mesh.height_map.clone().unwrap();

        assert!(south_up.sample(32, 0) < south_up.sample(32, 63));
        assert!(north_up.sample(32, 0) > north_up.sample(32, 63));
    }
}
