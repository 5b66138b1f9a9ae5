//! Build, clip, and transport terrain tiles decoded by `qmesh-decode`.
//!
//! This crate turns decoded quantized-mesh data into world-space
//! geometry containers and covers the rest of the tile lifecycle:
//!
//! - [`build`]: project decoded vertices against an ellipsoid, add
//!   skirts and an optional bottom cap
//! - [`clip_to_quadrant`]: derive a child tile from a cached parent
//!   when no tile payload exists at the requested resolution
//! - [`draw_height_map`]: render a DEM raster and burn in ground
//!   modification
//! - [`to_wire_format`] / [`from_wire_format`]: versioned transport
//!   across the worker boundary
//! - [`run_task`]: worker-side dispatch over the closed [`DecodeTask`]
//!   sum type
//!
//! Everything is synchronous; the caller owns threading and scheduling.

mod builder;
mod clip;
mod error;
mod geo;
mod grid;
mod heightmap;
mod mesh;
mod quadrant;
mod task;
#[cfg(test)]
mod test_support;
mod wire;

pub use builder::{BuildOptions, MAX_ALTITUDE, MIN_ALTITUDE, build};
pub use clip::{ClipVertex, ClippedData, clip_mesh, midline_sdf};
pub use error::{TerrainError, TerrainResult};
pub use geo::{Ellipsoid, GeoBox};
pub use grid::{raster_dem_mesh, stratum_mesh};
pub use heightmap::{GroundModificationPolygon, HEIGHT_MAP_SIZE, draw_height_map};
pub use mesh::{GroupKind, HeightMap, MaterialGroup, TerrainMesh, Transform, WaterMask};
pub use quadrant::clip_to_quadrant;
pub use task::{DecodeOptions, DecodeTask, run_task};
pub use wire::{
    TerrainMeshRecord, WIRE_FORMAT_VERSION, WaterMaskRecord, from_wire_format, to_wire_format,
};
