//! Tile header decoding.

use glam::DVec3;

use crate::error::{DecodeError, DecodeResult};
use crate::reader::Reader;

/// Fixed 88-byte header preceding the vertex data.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuantizedMeshHeader {
    /// World-space tile center.
    pub center: DVec3,
    /// Lowest elevation in the tile, meters above the ellipsoid.
    pub min_height: f32,
    /// Highest elevation in the tile.
    pub max_height: f32,
    /// Bounding sphere center.
    pub bounding_sphere_center: DVec3,
    /// Bounding sphere radius.
    pub bounding_sphere_radius: f64,
    /// Horizon occlusion point for culling.
    pub horizon_occlusion_point: DVec3,
}

impl QuantizedMeshHeader {
    /// Height span of the tile. Non-negative for a valid header.
    #[must_use]
    pub fn height_range(&self) -> f32 {
        self.max_height - self.min_height
    }
}

fn read_dvec3(r: &mut Reader<'_>, field: &'static str) -> DecodeResult<DVec3> {
    Ok(DVec3::new(
        r.read_f64(field)?,
        r.read_f64(field)?,
        r.read_f64(field)?,
    ))
}

/// Decode the fixed header block.
///
/// Field order and widths follow the wire layout: center (3 x f64),
/// min/max height (2 x f32), bounding sphere (3 x f64 + f64), horizon
/// occlusion point (3 x f64). All little-endian.
pub fn decode_header(r: &mut Reader<'_>) -> DecodeResult<QuantizedMeshHeader> {
    let center = read_dvec3(r, "center")?;
    let min_height = r.read_f32("min_height")?;
    let max_height = r.read_f32("max_height")?;
    let bounding_sphere_center = read_dvec3(r, "bounding_sphere_center")?;
    let bounding_sphere_radius = r.read_f64("bounding_sphere_radius")?;
    let horizon_occlusion_point = read_dvec3(r, "horizon_occlusion_point")?;

    if min_height > max_height {
        return Err(DecodeError::InvalidField {
            field: "min_height",
            reason: format!("min_height {min_height} exceeds max_height {max_height}"),
        });
    }

    Ok(QuantizedMeshHeader {
        center,
        min_height,
        max_height,
        bounding_sphere_center,
        bounding_sphere_radius,
        horizon_occlusion_point,
    })
}
