//! Terrain mesh building.
//!
//! Converts decoded vertex data into anchored world-space geometry:
//! the primary surface, an optional solid bottom cap, and vertical
//! skirt walls along the four tile edges. The same assembler is reused
//! by the quadrant clipper so clipped tiles come out data-shaped like
//! freshly decoded ones.

use glam::{DVec3, Vec3};
use qmesh_decode::QuantizedMeshData;

use crate::geo::{Ellipsoid, GeoBox, normalized_mercator_y};
use crate::mesh::{GroupKind, MaterialGroup, TerrainMesh, WaterMask};

/// Decoded heights below this are decode artifacts; clamp.
pub const MIN_ALTITUDE: f64 = -10_000.0;
/// Decoded heights above this are decode artifacts; clamp.
pub const MAX_ALTITUDE: f64 = 9_000.0;

/// Options controlling mesh construction.
#[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize)]
pub struct BuildOptions {
    /// Vertical wall height subtracted from the surface altitude.
    /// Zero disables skirts.
    pub skirt_length: f64,
    /// Copy skirt normals from the surface (true) or compute faceted
    /// wall normals (false).
    pub smooth_skirt_normals: bool,
    /// Add a downward-facing duplicate of the surface, closing the
    /// tile into a solid.
    pub solid: bool,
    /// Compute a Web-Mercator-corrected Y attribute instead of
    /// passing the decoded v coordinate through.
    pub is_web_mercator: bool,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            skirt_length: 0.0,
            smooth_skirt_normals: true,
            solid: false,
            is_web_mercator: false,
        }
    }
}

/// A surface vertex in geographic coordinates, ready for projection.
#[derive(Debug, Clone, Copy)]
pub(crate) struct GeoVertex {
    pub lon: f64,
    pub lat: f64,
    /// Clamped geodetic height.
    pub altitude: f64,
    /// Tile-local normalized coordinates.
    pub u: f32,
    pub v: f32,
    pub web_mercator_y: f32,
    pub normal: Option<Vec3>,
}

/// Accumulates vertex and index buffers for one output mesh.
pub(crate) struct Assembler {
    projection: Ellipsoid,
    anchor: DVec3,
    has_normals: bool,
    positions: Vec<f32>,
    normals: Vec<f32>,
    uvs: Vec<f32>,
    web_mercator_y: Vec<f32>,
    altitudes: Vec<f32>,
    indices: Vec<u32>,
    groups: Vec<MaterialGroup>,
}

impl Assembler {
    pub(crate) fn new(projection: Ellipsoid, geo_box: GeoBox, has_normals: bool) -> Self {
        let (lon, lat) = geo_box.center();
        let anchor = projection.to_cartesian(lon, lat, 0.0);
        Self {
            projection,
            anchor,
            has_normals,
            positions: Vec::new(),
            normals: Vec::new(),
            uvs: Vec::new(),
            web_mercator_y: Vec::new(),
            altitudes: Vec::new(),
            indices: Vec::new(),
            groups: Vec::new(),
        }
    }

    /// Project and append one vertex at the given height offset,
    /// returning its index.
    pub(crate) fn push_vertex(&mut self, v: &GeoVertex, height_offset: f64) -> u32 {
        let index = (self.positions.len() / 3) as u32;
        let altitude = v.altitude + height_offset;
        let world = self.projection.to_cartesian(v.lon, v.lat, altitude);
        let rel = world - self.anchor;
        self.positions
            .extend_from_slice(&[rel.x as f32, rel.y as f32, rel.z as f32]);
        if self.has_normals {
            let n = v.normal.unwrap_or(Vec3::Z);
            self.normals.extend_from_slice(&[n.x, n.y, n.z]);
        }
        self.uvs.extend_from_slice(&[v.u, v.v]);
        self.web_mercator_y.push(v.web_mercator_y);
        self.altitudes.push(altitude as f32);
        index
    }

    fn close_group(&mut self, kind: GroupKind, start: usize) {
        let count = self.indices.len() - start;
        if count > 0 {
            self.groups.push(MaterialGroup {
                start: start as u32,
                count: count as u32,
                kind,
            });
        }
    }

    /// Append the primary surface: all of `vertices`, indexed by
    /// `indices` as-is.
    pub(crate) fn add_surface(&mut self, vertices: &[GeoVertex], indices: &[u32]) {
        let start = self.indices.len();
        for v in vertices {
            self.push_vertex(v, 0.0);
        }
        self.indices.extend_from_slice(indices);
        self.close_group(GroupKind::Surface, start);
    }

    /// Duplicate the surface at `-skirt_length`, reversing winding and
    /// index order (and normals) so the cap faces down.
    pub(crate) fn add_bottom_cap(
        &mut self,
        vertices: &[GeoVertex],
        indices: &[u32],
        skirt_length: f64,
    ) {
        let start = self.indices.len();
        let base = (self.positions.len() / 3) as u32;
        for v in vertices {
            let flipped = GeoVertex {
                normal: v.normal.map(|n| -n),
                ..*v
            };
            self.push_vertex(&flipped, -skirt_length);
        }
        self.indices
            .extend(indices.iter().rev().map(|&i| base + i));
        self.close_group(GroupKind::BottomCap, start);
    }

    /// Append vertical wall strips along the four tile edges.
    ///
    /// Each edge list must already be in perimeter order (the
    /// decoder's sort); consecutive pairs then zip into consistently
    /// outward-facing quads.
    pub(crate) fn add_skirts(
        &mut self,
        vertices: &[GeoVertex],
        edges: &[Vec<u32>; 4],
        skirt_length: f64,
        smooth_normals: bool,
    ) {
        let start = self.indices.len();

        for edge in edges {
            if edge.len() < 2 {
                continue;
            }
            let base = (self.positions.len() / 3) as u32;

            for (slot, &vi) in edge.iter().enumerate() {
                let surface = vertices[vi as usize];
                let normal = if !self.has_normals {
                    None
                } else if smooth_normals {
                    surface.normal
                } else {
                    Some(self.faceted_wall_normal(vertices, edge, slot))
                };
                let v = GeoVertex { normal, ..surface };
                self.push_vertex(&v, 0.0);
                self.push_vertex(&v, -skirt_length);
            }

            for pair in 0..edge.len() - 1 {
                let ta = base + 2 * pair as u32;
                let ba = ta + 1;
                let tb = ta + 2;
                let bb = ta + 3;
                self.indices.extend_from_slice(&[ta, ba, bb, ta, bb, tb]);
            }
        }

        self.close_group(GroupKind::Skirt, start);
    }

    /// Wall normal at an edge vertex: tangent along the edge crossed
    /// with the local up vector.
    fn faceted_wall_normal(&self, vertices: &[GeoVertex], edge: &[u32], slot: usize) -> Vec3 {
        let prev = vertices[edge[slot.saturating_sub(1)] as usize];
        let next = vertices[edge[(slot + 1).min(edge.len() - 1)] as usize];
        let here = vertices[edge[slot] as usize];

        let p0 = self.projection.to_cartesian(prev.lon, prev.lat, prev.altitude);
        let p1 = self.projection.to_cartesian(next.lon, next.lat, next.altitude);
        let tangent = (p1 - p0).normalize_or_zero();
        let up = self.projection.geodetic_normal(here.lon, here.lat);
        let n = tangent.cross(up).normalize_or_zero();
        Vec3::new(n.x as f32, n.y as f32, n.z as f32)
    }

    pub(crate) fn finish(
        self,
        geo_box: GeoBox,
        min_height: f32,
        max_height: f32,
    ) -> TerrainMesh {
        let mut mesh = TerrainMesh::empty(geo_box, self.projection);
        mesh.positions = self.positions;
        mesh.normals = self.normals;
        mesh.uvs = self.uvs;
        mesh.web_mercator_y = self.web_mercator_y;
        mesh.altitudes = self.altitudes;
        mesh.indices = self.indices;
        mesh.groups = self.groups;
        mesh.transform.position = self.anchor;
        mesh.min_height = min_height;
        mesh.max_height = max_height;
        mesh
    }
}

/// Turn decoded per-vertex data into [`GeoVertex`] records.
pub(crate) fn geo_vertices(
    decoded: &QuantizedMeshData,
    geo_box: &GeoBox,
    is_web_mercator: bool,
) -> Vec<GeoVertex> {
    let data = &decoded.vertex_data;
    let min_h = f64::from(decoded.header.min_height);
    let max_h = f64::from(decoded.header.max_height);
    let normals = decoded.extensions.vertex_normals.as_deref();

    (0..data.len())
        .map(|i| {
            let u = data.u[i];
            let v = data.v[i];
            let lon = geo_box.lon_at(f64::from(u));
            let lat = geo_box.lat_at(f64::from(v));
            let height = min_h + (max_h - min_h) * f64::from(data.height[i]);
            let altitude = height.clamp(MIN_ALTITUDE, MAX_ALTITUDE);
            let web_mercator_y = if is_web_mercator {
                normalized_mercator_y(lat, geo_box) as f32
            } else {
                v
            };
            GeoVertex {
                lon,
                lat,
                altitude,
                u,
                v,
                web_mercator_y,
                normal: normals.map(|n| n[i]),
            }
        })
        .collect()
}

/// Build a world-space terrain mesh from a decoded tile.
#[must_use]
pub fn build(
    decoded: &QuantizedMeshData,
    geo_box: GeoBox,
    projection: Ellipsoid,
    options: &BuildOptions,
) -> TerrainMesh {
    let vertices = geo_vertices(decoded, &geo_box, options.is_web_mercator);
    let has_normals = decoded.extensions.vertex_normals.is_some();

    let mut assembler = Assembler::new(projection, geo_box, has_normals);
    assembler.add_surface(&vertices, &decoded.triangle_indices);

    if options.solid {
        assembler.add_bottom_cap(&vertices, &decoded.triangle_indices, options.skirt_length);
    }

    if options.skirt_length > 0.0 {
        let e = &decoded.edge_indices;
        let edges = [
            e.west.clone(),
            e.south.clone(),
            e.east.clone(),
            e.north.clone(),
        ];
        assembler.add_skirts(
            &vertices,
            &edges,
            options.skirt_length,
            options.smooth_skirt_normals,
        );
    }

    let mut mesh = assembler.finish(
        geo_box,
        decoded.header.min_height,
        decoded.header.max_height,
    );
    mesh.metadata = decoded.extensions.metadata.clone();
    mesh.water_mask = decoded.extensions.water_mask.clone().map(|image| WaterMask {
        image,
        geo_box,
    });
    mesh
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::quad_tile;

    fn geo_box() -> GeoBox {
        GeoBox::new(0.0, 0.0, 0.01, 0.01)
    }

    #[test]
    fn surface_only_build() {
        let decoded = quad_tile(&[0.0, 0.0, 0.0, 0.0]);
        let mesh = build(
            &decoded,
            geo_box(),
            Ellipsoid::WGS84,
            &BuildOptions::default(),
        );

        assert_eq!(mesh.vertex_count(), 4);
        assert_eq!(mesh.triangle_count(), 2);
        assert_eq!(mesh.groups.len(), 1);
        assert_eq!(mesh.groups[0].kind, GroupKind::Surface);

        // Anchored positions stay small relative to the tile size.
        for chunk in mesh.positions.chunks_exact(3) {
            let len = (f64::from(chunk[0]).powi(2)
                + f64::from(chunk[1]).powi(2)
                + f64::from(chunk[2]).powi(2))
            .sqrt();
            assert!(len < 100_000.0, "vertex {len} m from anchor");
        }
    }

    #[test]
    fn skirt_bottoms_sit_exactly_skirt_length_lower() {
        let decoded = quad_tile(&[0.25, 0.5, 0.75, 1.0]);
        let options = BuildOptions {
            skirt_length: 500.0,
            ..BuildOptions::default()
        };
        let mesh = build(&decoded, geo_box(), Ellipsoid::WGS84, &options);

        let skirt = mesh.group(GroupKind::Skirt).unwrap();
        assert!(skirt.count > 0);

        // Skirt vertices come in top/bottom pairs appended after the
        // four surface vertices.
        let surface_count = 4;
        let skirt_vertex_count = mesh.vertex_count() - surface_count;
        assert_eq!(skirt_vertex_count % 2, 0);
        for pair in 0..skirt_vertex_count / 2 {
            let top = surface_count + pair * 2;
            let bottom = top + 1;
            let drop = f64::from(mesh.altitudes[top]) - f64::from(mesh.altitudes[bottom]);
            assert!(
                (drop - 500.0).abs() < 1e-3,
                "altitude drop {drop} at pair {pair}"
            );
            let dist = (mesh.world_position(top) - mesh.world_position(bottom)).length();
            assert!((dist - 500.0).abs() < 1e-2, "world drop {dist}");
        }
    }

    #[test]
    fn solid_build_adds_reversed_bottom_cap() {
        let decoded = quad_tile(&[0.0, 0.0, 0.0, 0.0]);
        let options = BuildOptions {
            solid: true,
            skirt_length: 100.0,
            ..BuildOptions::default()
        };
        let mesh = build(&decoded, geo_box(), Ellipsoid::WGS84, &options);

        let cap = mesh.group(GroupKind::BottomCap).unwrap();
        assert_eq!(cap.count, 6);
        let surface = mesh.group(GroupKind::Surface).unwrap();
        assert_eq!(surface.count, 6);

        // Cap indices are the surface triangles reversed, offset by
        // the duplicated vertex block.
        let cap_range =
            &mesh.indices[cap.start as usize..(cap.start + cap.count) as usize];
        let surface_range =
            &mesh.indices[surface.start as usize..(surface.start + surface.count) as usize];
        let expected: Vec<u32> = surface_range.iter().rev().map(|&i| i + 4).collect();
        assert_eq!(cap_range, expected.as_slice());
    }

    #[test]
    fn altitude_clamped_to_sane_range() {
        // Header range far outside the clamp window.
        let mut decoded = quad_tile(&[0.0, 1.0, 0.0, 1.0]);
        decoded.header.min_height = -80_000.0;
        decoded.header.max_height = 50_000.0;
        let mesh = build(
            &decoded,
            geo_box(),
            Ellipsoid::WGS84,
            &BuildOptions::default(),
        );
        for &alt in &mesh.altitudes {
            assert!((MIN_ALTITUDE as f32..=MAX_ALTITUDE as f32).contains(&alt));
        }
    }

    #[test]
    fn web_mercator_y_modes() {
        let decoded = quad_tile(&[0.0; 4]);
        let plain = build(
            &decoded,
            geo_box(),
            Ellipsoid::WGS84,
            &BuildOptions::default(),
        );
        // Pass-through of decoded v.
        assert_eq!(plain.web_mercator_y, decoded.vertex_data.v);

        let mercator = build(
            &decoded,
            geo_box(),
            Ellipsoid::WGS84,
            &BuildOptions {
                is_web_mercator: true,
                ..BuildOptions::default()
            },
        );
        // Corners still map to 0 and 1; interior values differ.
        assert!(mercator.web_mercator_y[0].abs() < 1e-6);
        assert!((mercator.web_mercator_y[2] - 1.0).abs() < 1e-6);
    }
}
