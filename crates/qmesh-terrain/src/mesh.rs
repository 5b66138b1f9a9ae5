//! The terrain mesh container.
//!
//! Owns the per-vertex buffers produced by the builder or the clipper,
//! plus tile metadata. Buffers are flat `Vec<f32>` / `Vec<u32>` for
//! zero-copy transport across the decode boundary.

use glam::{DQuat, DVec3};
use image::GrayImage;
use serde::{Deserialize, Serialize};

use crate::geo::{Ellipsoid, GeoBox};

/// What a material group's triangles render as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GroupKind {
    /// The decoded terrain surface.
    Surface,
    /// The downward-facing cap of a solid tile.
    BottomCap,
    /// A vertical skirt wall along a tile edge.
    Skirt,
}

/// A contiguous index-buffer range rendered with one material.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaterialGroup {
    /// First index of the range.
    pub start: u32,
    /// Number of indices in the range.
    pub count: u32,
    /// What the range contains.
    pub kind: GroupKind,
}

/// Placement of a mesh in world space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    /// Anchor translation; vertex positions are relative to this.
    pub position: DVec3,
    /// Orientation.
    pub rotation: DQuat,
    /// Per-axis scale.
    pub scale: DVec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: DVec3::ZERO,
            rotation: DQuat::IDENTITY,
            scale: DVec3::ONE,
        }
    }
}

/// Water coverage raster with the geographic area it covers.
#[derive(Debug, Clone)]
pub struct WaterMask {
    /// Inverted coverage texels (see the decoder's documented
    /// inversion).
    pub image: GrayImage,
    /// Geographic area the texels span.
    pub geo_box: GeoBox,
}

/// A row-major height raster used as a DEM proxy for overlay blending.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeightMap {
    /// Samples per row.
    pub width: u32,
    /// Number of rows.
    pub height: u32,
    /// Heights in meters, row-major; row 0 is south unless the map was
    /// rendered flipped.
    pub data: Vec<f32>,
}

impl HeightMap {
    /// Sample without interpolation, clamped to the raster bounds.
    #[must_use]
    pub fn sample(&self, x: u32, y: u32) -> f32 {
        let x = x.min(self.width - 1);
        let y = y.min(self.height - 1);
        self.data[(y * self.width + x) as usize]
    }
}

/// Decoded or clipped terrain tile geometry plus metadata.
///
/// Treated as owned-and-immutable once produced, except for the
/// explicit height-map mutation path; see [`crate::heightmap`].
#[derive(Debug, Clone)]
pub struct TerrainMesh {
    /// Vertex positions relative to `transform.position`, interleaved
    /// x y z.
    pub positions: Vec<f32>,
    /// Unit normals, interleaved x y z; empty when the tile carried no
    /// normal extension.
    pub normals: Vec<f32>,
    /// Normalized tile-local coordinates, interleaved u v.
    pub uvs: Vec<f32>,
    /// Web-Mercator-corrected vertical coordinate, one per vertex.
    pub web_mercator_y: Vec<f32>,
    /// Unprojected geodetic height per vertex, meters.
    pub altitudes: Vec<f32>,
    /// Triangle index buffer.
    pub indices: Vec<u32>,
    /// Sub-ranges of `indices` by material.
    pub groups: Vec<MaterialGroup>,
    /// World placement; positions are relative to its translation.
    pub transform: Transform,
    /// Geographic coverage of the tile.
    pub geo_box: GeoBox,
    /// Lowest surface height, meters.
    pub min_height: f32,
    /// Highest surface height, meters.
    pub max_height: f32,
    /// Optional water coverage raster.
    pub water_mask: Option<WaterMask>,
    /// Optional DEM height raster.
    pub height_map: Option<HeightMap>,
    /// Tile metadata JSON from the decoder, if present.
    pub metadata: Option<serde_json::Value>,
    /// Set once ground-modification polygons have been rendered into
    /// the height map.
    pub ground_elevation_modified: bool,
    /// Projection the geometry was built against.
    pub projection: Ellipsoid,
    disposed: bool,
}

impl TerrainMesh {
    /// Number of vertices.
    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.positions.len() / 3
    }

    /// Number of triangles across all groups.
    #[must_use]
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Whether normals are present.
    #[must_use]
    pub fn has_normals(&self) -> bool {
        !self.normals.is_empty()
    }

    /// The index range of the given group kind, if any.
    #[must_use]
    pub fn group(&self, kind: GroupKind) -> Option<MaterialGroup> {
        self.groups.iter().copied().find(|g| g.kind == kind)
    }

    /// Whether [`Self::dispose`] has run.
    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Release geometry and raster buffers. Idempotent.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.positions = Vec::new();
        self.normals = Vec::new();
        self.uvs = Vec::new();
        self.web_mercator_y = Vec::new();
        self.altitudes = Vec::new();
        self.indices = Vec::new();
        self.groups = Vec::new();
        self.water_mask = None;
        self.height_map = None;
        self.disposed = true;
    }

    /// Absolute world position of vertex `index`.
    #[must_use]
    pub fn world_position(&self, index: usize) -> DVec3 {
        let base = index * 3;
        self.transform.position
            + DVec3::new(
                f64::from(self.positions[base]),
                f64::from(self.positions[base + 1]),
                f64::from(self.positions[base + 2]),
            )
    }

    pub(crate) fn empty(geo_box: GeoBox, projection: Ellipsoid) -> Self {
        Self {
            positions: Vec::new(),
            normals: Vec::new(),
            uvs: Vec::new(),
            web_mercator_y: Vec::new(),
            altitudes: Vec::new(),
            indices: Vec::new(),
            groups: Vec::new(),
            transform: Transform::default(),
            geo_box,
            min_height: 0.0,
            max_height: 0.0,
            water_mask: None,
            height_map: None,
            metadata: None,
            ground_elevation_modified: false,
            projection,
            disposed: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dispose_is_idempotent() {
        let mut mesh = TerrainMesh::empty(GeoBox::new(0.0, 0.0, 1.0, 1.0), Ellipsoid::WGS84);
        mesh.positions = vec![0.0; 9];
        mesh.indices = vec![0, 1, 2];

        mesh.dispose();
        assert!(mesh.is_disposed());
        assert!(mesh.positions.is_empty());
        assert!(mesh.indices.is_empty());

        mesh.dispose();
        assert!(mesh.is_disposed());
    }

    #[test]
    fn world_position_applies_anchor() {
        let mut mesh = TerrainMesh::empty(GeoBox::new(0.0, 0.0, 1.0, 1.0), Ellipsoid::WGS84);
        mesh.transform.position = DVec3::new(100.0, 200.0, 300.0);
        mesh.positions = vec![1.0, 2.0, 3.0];
        assert_eq!(mesh.world_position(0), DVec3::new(101.0, 202.0, 303.0));
    }
}
