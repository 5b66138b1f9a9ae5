//! Cross-thread transport of terrain meshes.
//!
//! Decode runs off the main thread; containers cross the boundary as
//! an explicit, versioned record rather than ad hoc field copying, so
//! the worker and main-thread sides stay safe under schema evolution.
//! The transform travels composed as a 4x4 matrix and is decomposed on
//! receipt.

use glam::DMat4;
use serde::{Deserialize, Serialize};

use crate::error::{TerrainError, TerrainResult};
use crate::geo::{Ellipsoid, GeoBox};
use crate::mesh::{HeightMap, MaterialGroup, TerrainMesh, WaterMask};

/// Version stamped into every record; bump on layout change.
pub const WIRE_FORMAT_VERSION: u32 = 1;

/// Water mask raster in transportable form.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WaterMaskRecord {
    /// Raster side length.
    pub size: u32,
    /// Inverted coverage texels, row-major.
    pub data: Vec<u8>,
    /// Geographic area the texels span.
    pub geo_box: GeoBox,
}

/// The serialized form of a [`TerrainMesh`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TerrainMeshRecord {
    /// Format version, checked on receipt.
    pub version: u32,
    /// Interleaved vertex positions relative to the transform.
    pub positions: Vec<f32>,
    /// Interleaved unit normals; empty when absent.
    pub normals: Vec<f32>,
    /// Interleaved tile-local UVs.
    pub uvs: Vec<f32>,
    /// Web-Mercator-corrected Y per vertex.
    pub web_mercator_y: Vec<f32>,
    /// Geodetic height per vertex.
    pub altitudes: Vec<f32>,
    /// Triangle index buffer.
    pub indices: Vec<u32>,
    /// Material sub-ranges of the index buffer.
    pub groups: Vec<MaterialGroup>,
    /// Column-major world transform.
    pub transform: [f64; 16],
    /// Geographic coverage.
    pub geo_box: GeoBox,
    /// Lowest surface height.
    pub min_height: f32,
    /// Highest surface height.
    pub max_height: f32,
    /// Optional water mask raster.
    pub water_mask: Option<WaterMaskRecord>,
    /// Optional DEM raster; only carried on the worker side of the
    /// boundary, the main thread keeps its own copy.
    pub height_map: Option<HeightMap>,
    /// Tile metadata JSON.
    pub metadata: Option<serde_json::Value>,
    /// Whether ground modification has been rendered into the tile.
    pub ground_elevation_modified: bool,
    /// Projection the geometry was built against.
    pub projection: Ellipsoid,
}

/// Serialize a container for transport.
///
/// `include_height_map` is set in worker/decode contexts; the main
/// thread omits the raster to avoid a redundant duplicate.
pub fn to_wire_format(
    mesh: &TerrainMesh,
    include_height_map: bool,
) -> TerrainResult<TerrainMeshRecord> {
    if mesh.is_disposed() {
        return Err(TerrainError::Disposed);
    }

    let t = &mesh.transform;
    let matrix = DMat4::from_scale_rotation_translation(t.scale, t.rotation, t.position);

    Ok(TerrainMeshRecord {
        version: WIRE_FORMAT_VERSION,
        positions: mesh.positions.clone(),
        normals: mesh.normals.clone(),
        uvs: mesh.uvs.clone(),
        web_mercator_y: mesh.web_mercator_y.clone(),
        altitudes: mesh.altitudes.clone(),
        indices: mesh.indices.clone(),
        groups: mesh.groups.clone(),
        transform: matrix.to_cols_array(),
        geo_box: mesh.geo_box,
        min_height: mesh.min_height,
        max_height: mesh.max_height,
        water_mask: mesh.water_mask.as_ref().map(|mask| WaterMaskRecord {
            size: mask.image.width(),
            data: mask.image.as_raw().clone(),
            geo_box: mask.geo_box,
        }),
        height_map: include_height_map.then(|| mesh.height_map.clone()).flatten(),
        metadata: mesh.metadata.clone(),
        ground_elevation_modified: mesh.ground_elevation_modified,
        projection: mesh.projection,
    })
}

/// Rebuild a container from a transported record.
pub fn from_wire_format(record: TerrainMeshRecord) -> TerrainResult<TerrainMesh> {
    if record.version != WIRE_FORMAT_VERSION {
        return Err(TerrainError::WireVersion {
            found: record.version,
            expected: WIRE_FORMAT_VERSION,
        });
    }

    let vertex_count = record.positions.len() / 3;
    if record.positions.len() % 3 != 0 {
        return Err(TerrainError::WireInconsistent(format!(
            "position buffer length {} is not a multiple of 3",
            record.positions.len()
        )));
    }
    for (name, len, per_vertex) in [
        ("normals", record.normals.len(), 3),
        ("uvs", record.uvs.len(), 2),
        ("web_mercator_y", record.web_mercator_y.len(), 1),
        ("altitudes", record.altitudes.len(), 1),
    ] {
        if len != 0 && len != vertex_count * per_vertex {
            return Err(TerrainError::WireInconsistent(format!(
                "{name} buffer holds {len} values for {vertex_count} vertices"
            )));
        }
    }
    if let Some(&max) = record.indices.iter().max()
        && max as usize >= vertex_count
    {
        return Err(TerrainError::WireInconsistent(format!(
            "index {max} out of range for {vertex_count} vertices"
        )));
    }
    for group in &record.groups {
        let end = group.start as usize + group.count as usize;
        if end > record.indices.len() {
            return Err(TerrainError::WireInconsistent(format!(
                "group range {}..{end} exceeds {} indices",
                group.start,
                record.indices.len()
            )));
        }
    }
    if let Some(map) = &record.height_map
        && (map.width == 0
            || map.height == 0
            || map.data.len() as u64 != u64::from(map.width) * u64::from(map.height))
    {
        return Err(TerrainError::WireInconsistent(format!(
            "height map holds {} samples for {}x{} texels",
            map.data.len(),
            map.width,
            map.height
        )));
    }

    let water_mask = match record.water_mask {
        None => None,
        Some(mask) => {
            let image = image::GrayImage::from_raw(mask.size, mask.size, mask.data).ok_or_else(
                || {
                    TerrainError::WireInconsistent(format!(
                        "water mask data does not fill {0}x{0} texels",
                        mask.size
                    ))
                },
            )?;
            Some(WaterMask {
                image,
                geo_box: mask.geo_box,
            })
        }
    };

    let matrix = DMat4::from_cols_array(&record.transform);
    let (scale, rotation, position) = matrix.to_scale_rotation_translation();

    let mut mesh = TerrainMesh::empty(record.geo_box, record.projection);
    mesh.positions = record.positions;
    mesh.normals = record.normals;
    mesh.uvs = record.uvs;
    mesh.web_mercator_y = record.web_mercator_y;
    mesh.altitudes = record.altitudes;
    mesh.indices = record.indices;
    mesh.groups = record.groups;
    mesh.transform.position = position;
    mesh.transform.rotation = rotation;
    mesh.transform.scale = scale;
    mesh.min_height = record.min_height;
    mesh.max_height = record.max_height;
    mesh.water_mask = water_mask;
    mesh.height_map = record.height_map;
    mesh.metadata = record.metadata;
    mesh.ground_elevation_modified = record.ground_elevation_modified;
    Ok(mesh)
}
