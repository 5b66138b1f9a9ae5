//! Worker-side task dispatch.
//!
//! Every kind of terrain work crosses the thread boundary as one
//! variant of a closed sum type. [`run_task`] matches exhaustively, so
//! adding a task kind is a compile error until every consumer handles
//! it, and no task can smuggle in behavior outside this enum.

use glam::DVec3;
use serde::{Deserialize, Serialize};

use crate::builder::{BuildOptions, build};
use crate::error::TerrainResult;
use crate::geo::{Ellipsoid, GeoBox};
use crate::grid::{raster_dem_mesh, stratum_mesh};
use crate::heightmap::{GroundModificationPolygon, draw_height_map};
use crate::mesh::TerrainMesh;
use crate::quadrant::clip_to_quadrant;
use crate::wire::{TerrainMeshRecord, from_wire_format, to_wire_format};

/// Per-task decode settings shared by the geometry-producing variants.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DecodeOptions {
    /// Mesh construction settings.
    pub build: BuildOptions,
    /// Render a height raster into the result.
    pub elevation_map_enabled: bool,
    /// Store height raster row 0 at the northern edge.
    pub elevation_map_flip_y: bool,
    /// Ground modification areas to burn into the height raster.
    pub ground_modification_polygons: Vec<GroundModificationPolygon>,
}

/// One unit of terrain work.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum DecodeTask {
    /// Decode a quantized-mesh tile buffer and build its container.
    QuantizedMesh {
        /// Raw tile bytes.
        buffer: Vec<u8>,
        /// Geographic coverage of the tile.
        geo_box: GeoBox,
        /// Projection to build against.
        projection: Ellipsoid,
        /// Decode settings.
        options: DecodeOptions,
    },
    /// Derive a child tile by clipping a cached parent to the quadrant
    /// covering `target_geo_box`.
    QuantizedUpsample {
        /// The parent container in wire form.
        parent: TerrainMeshRecord,
        /// Coverage of the requested child.
        target_geo_box: GeoBox,
        /// Decode settings.
        options: DecodeOptions,
    },
    /// Synthesize a flat placeholder tile at a constant height.
    QuantizedStratumInit {
        /// Geographic coverage of the tile.
        geo_box: GeoBox,
        /// Projection to build against.
        projection: Ellipsoid,
        /// Placeholder surface height in meters.
        height: f64,
        /// Grid subdivisions per side.
        segments: u32,
        /// Decode settings.
        options: DecodeOptions,
    },
    /// Lift a row-major height raster into a tile mesh.
    RasterDem {
        /// Geographic coverage of the raster.
        geo_box: GeoBox,
        /// Projection to build against.
        projection: Ellipsoid,
        /// Raster width in samples.
        width: u32,
        /// Raster height in samples.
        height: u32,
        /// Heights, row 0 south.
        samples: Vec<f32>,
        /// Decode settings.
        options: DecodeOptions,
    },
    /// Re-render an existing container's height raster over a new
    /// window, burning in ground modification.
    GroundOverlay {
        /// The container in wire form.
        mesh: TerrainMeshRecord,
        /// Raster coverage window.
        geo_box: GeoBox,
        /// Modification areas.
        polygons: Vec<GroundModificationPolygon>,
        /// Store row 0 at the northern edge.
        flip_y: bool,
    },
    /// Rebase an existing container's geometry onto a new anchor.
    GeometryReprojection {
        /// The container in wire form.
        mesh: TerrainMeshRecord,
        /// New anchor in world coordinates.
        anchor: DVec3,
    },
}

impl DecodeTask {
    fn kind(&self) -> &'static str {
        match self {
            Self::QuantizedMesh { .. } => "quantized_mesh",
            Self::QuantizedUpsample { .. } => "quantized_upsample",
            Self::QuantizedStratumInit { .. } => "quantized_stratum_init",
            Self::RasterDem { .. } => "raster_dem",
            Self::GroundOverlay { .. } => "ground_overlay",
            Self::GeometryReprojection { .. } => "geometry_reprojection",
        }
    }
}

/// Execute one task to completion, producing a transportable record.
pub fn run_task(task: DecodeTask) -> TerrainResult<TerrainMeshRecord> {
    tracing::debug!(kind = task.kind(), "running decode task");

    match task {
        DecodeTask::QuantizedMesh {
            buffer,
            geo_box,
            projection,
            options,
        } => {
            let decoded = qmesh_decode::decode(&buffer)?;
            let mesh = build(&decoded, geo_box, projection, &options.build);
            finalize(mesh, &options)
        }
        DecodeTask::QuantizedUpsample {
            parent,
            target_geo_box,
            options,
        } => {
            let parent = from_wire_format(parent)?;
            let (parent_lon, parent_lat) = parent.geo_box.center();
            let (target_lon, target_lat) = target_geo_box.center();
            let left = target_lon < parent_lon;
            let bottom = target_lat < parent_lat;
            let child = clip_to_quadrant(&parent, left, bottom, &options.build)?;
            finalize(child, &options)
        }
        DecodeTask::QuantizedStratumInit {
            geo_box,
            projection,
            height,
            segments,
            options,
        } => {
            let mesh = stratum_mesh(geo_box, projection, height, segments, &options.build);
            finalize(mesh, &options)
        }
        DecodeTask::RasterDem {
            geo_box,
            projection,
            width,
            height,
            samples,
            options,
        } => {
            let mesh = raster_dem_mesh(geo_box, projection, width, height, &samples, &options.build)?;
            finalize(mesh, &options)
        }
        DecodeTask::GroundOverlay {
            mesh,
            geo_box,
            polygons,
            flip_y,
        } => {
            let mut mesh = from_wire_format(mesh)?;
            draw_height_map(&mut mesh, &geo_box, &polygons, flip_y)?;
            to_wire_format(&mesh, true)
        }
        DecodeTask::GeometryReprojection { mesh, anchor } => {
            let mut mesh = from_wire_format(mesh)?;
            rebase_anchor(&mut mesh, anchor);
            let keep_height_map = mesh.height_map.is_some();
            to_wire_format(&mesh, keep_height_map)
        }
    }
}

/// Draw the height raster if requested, then serialize. The raster
/// travels with the record only when it was produced here.
fn finalize(mut mesh: TerrainMesh, options: &DecodeOptions) -> TerrainResult<TerrainMeshRecord> {
    if options.elevation_map_enabled {
        let geo_box = mesh.geo_box;
        draw_height_map(
            &mut mesh,
            &geo_box,
            &options.ground_modification_polygons,
            options.elevation_map_flip_y,
        )?;
    }
    to_wire_format(&mesh, options.elevation_map_enabled)
}

/// Shift relative positions so they are expressed against `anchor`
/// instead of the mesh's current transform position. World positions
/// are unchanged.
fn rebase_anchor(mesh: &mut TerrainMesh, anchor: DVec3) {
    let shift = mesh.transform.position - anchor;
    for chunk in mesh.positions.chunks_exact_mut(3) {
        chunk[0] = (f64::from(chunk[0]) + shift.x) as f32;
        chunk[1] = (f64::from(chunk[1]) + shift.y) as f32;
        chunk[2] = (f64::from(chunk[2]) + shift.z) as f32;
    }
    mesh.transform.position = anchor;
}
