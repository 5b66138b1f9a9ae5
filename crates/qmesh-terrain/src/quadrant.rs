//! Quadrant clipping: deriving a child tile from a cached parent.
//!
//! Splits the parent's surface along the UV midlines, re-derives true
//! geographic positions for every kept vertex, rescales UVs into the
//! child's own `[0, 1]` space, and rebuilds skirts along the new
//! boundary. The output has the same data shape as a freshly decoded
//! tile, so clips compose: clipping a clip matches a direct decode of
//! that resolution up to floating-point error.

use glam::{DVec2, Vec3};
use image::imageops;

use crate::builder::{Assembler, BuildOptions, GeoVertex, MAX_ALTITUDE, MIN_ALTITUDE};
use crate::clip::{ClipVertex, ClippedData, clip_mesh, midline_sdf};
use crate::error::{TerrainError, TerrainResult};
use crate::geo::normalized_mercator_y;
use crate::mesh::{GroupKind, TerrainMesh, WaterMask};

/// Tolerance for recognizing a rescaled UV as lying on a child edge.
const EDGE_TOLERANCE: f64 = 1e-6;

/// Clip `parent` to one of its four UV quadrants.
///
/// `left` selects the western half, `bottom` the southern half.
pub fn clip_to_quadrant(
    parent: &TerrainMesh,
    left: bool,
    bottom: bool,
    options: &BuildOptions,
) -> TerrainResult<TerrainMesh> {
    if parent.is_disposed() {
        return Err(TerrainError::Disposed);
    }

    let child_box = parent.geo_box.quadrant(left, bottom);

    // Split only the decoded surface; skirts and caps are rebuilt for
    // the child's own boundary.
    let surface = parent
        .group(GroupKind::Surface)
        .ok_or(TerrainError::EmptyClip)?;
    let surface_indices =
        &parent.indices[surface.start as usize..(surface.start + surface.count) as usize];

    let source: Vec<ClipVertex> = (0..parent.vertex_count())
        .map(|i| ClipVertex {
            position: parent.world_position(i),
            normal: parent.has_normals().then(|| {
                Vec3::new(
                    parent.normals[i * 3],
                    parent.normals[i * 3 + 1],
                    parent.normals[i * 3 + 2],
                )
            }),
            uv: DVec2::new(f64::from(parent.uvs[i * 2]), f64::from(parent.uvs[i * 2 + 1])),
        })
        .collect();

    // One half-plane split per UV axis.
    let first = clip_mesh(&source, surface_indices, midline_sdf(false, left));
    let second = clip_mesh(&first.vertices, &first.indices, midline_sdf(true, bottom));
    if second.indices.is_empty() {
        return Err(TerrainError::EmptyClip);
    }

    let vertices = child_geo_vertices(parent, &second, left, bottom, options.is_web_mercator);

    let mut min_height = f32::INFINITY;
    let mut max_height = f32::NEG_INFINITY;
    for v in &vertices {
        min_height = min_height.min(v.altitude as f32);
        max_height = max_height.max(v.altitude as f32);
    }

    let mut assembler = Assembler::new(parent.projection, child_box, parent.has_normals());
    assembler.add_surface(&vertices, &second.indices);

    if options.solid {
        assembler.add_bottom_cap(&vertices, &second.indices, options.skirt_length);
    }

    if options.skirt_length > 0.0 {
        let edges = boundary_edges(&vertices);
        assembler.add_skirts(
            &vertices,
            &edges,
            options.skirt_length,
            options.smooth_skirt_normals,
        );
    }

    let mut child = assembler.finish(child_box, min_height, max_height);
    child.metadata = parent.metadata.clone();
    child.water_mask = parent
        .water_mask
        .as_ref()
        .map(|mask| crop_water_mask(mask, left, bottom));

    tracing::debug!(
        parent_vertices = parent.vertex_count(),
        child_vertices = child.vertex_count(),
        left,
        bottom,
        "clipped tile to quadrant"
    );

    Ok(child)
}

/// Re-derive geographic vertices for the clipped set: unproject each
/// interpolated world position, clamp, and let the assembler reproject
/// at the exact clamped coordinates. This pins clipped vertices to the
/// true surface instead of a chord of the projection.
fn child_geo_vertices(
    parent: &TerrainMesh,
    clipped: &ClippedData,
    left: bool,
    bottom: bool,
    is_web_mercator: bool,
) -> Vec<GeoVertex> {
    let child_box = parent.geo_box.quadrant(left, bottom);
    let offset = DVec2::new(
        if left { 0.0 } else { -0.5 },
        if bottom { 0.0 } else { -0.5 },
    );

    clipped
        .vertices
        .iter()
        .map(|v| {
            let (lon, lat, height) = parent.projection.to_geodetic(v.position);
            let altitude = height.clamp(MIN_ALTITUDE, MAX_ALTITUDE);
            let uv = (v.uv + offset) * 2.0;
            let web_mercator_y = if is_web_mercator {
                normalized_mercator_y(lat, &child_box) as f32
            } else {
                uv.y as f32
            };
            GeoVertex {
                lon,
                lat,
                altitude,
                u: uv.x as f32,
                v: uv.y as f32,
                web_mercator_y,
                normal: v.normal,
            }
        })
        .collect()
}

/// Collect and order the child's boundary vertices from their rescaled
/// UVs, matching the decoder's perimeter convention: west v-descending,
/// south u-ascending, east v-ascending, north u-descending.
fn boundary_edges(vertices: &[GeoVertex]) -> [Vec<u32>; 4] {
    let mut west = Vec::new();
    let mut south = Vec::new();
    let mut east = Vec::new();
    let mut north = Vec::new();

    for (i, v) in vertices.iter().enumerate() {
        let i = i as u32;
        let u = f64::from(v.u);
        let vv = f64::from(v.v);
        if u.abs() < EDGE_TOLERANCE {
            west.push(i);
        }
        if (u - 1.0).abs() < EDGE_TOLERANCE {
            east.push(i);
        }
        if vv.abs() < EDGE_TOLERANCE {
            south.push(i);
        }
        if (vv - 1.0).abs() < EDGE_TOLERANCE {
            north.push(i);
        }
    }

    let key = |i: &u32, coord: fn(&GeoVertex) -> f32| coord(&vertices[*i as usize]);
    west.sort_by(|a, b| key(b, |v| v.v).partial_cmp(&key(a, |v| v.v)).unwrap_or(std::cmp::Ordering::Equal));
    south.sort_by(|a, b| key(a, |v| v.u).partial_cmp(&key(b, |v| v.u)).unwrap_or(std::cmp::Ordering::Equal));
    east.sort_by(|a, b| key(a, |v| v.v).partial_cmp(&key(b, |v| v.v)).unwrap_or(std::cmp::Ordering::Equal));
    north.sort_by(|a, b| key(b, |v| v.u).partial_cmp(&key(a, |v| v.u)).unwrap_or(std::cmp::Ordering::Equal));

    [west, south, east, north]
}

/// Crop the parent's water mask to the child quadrant. Image row 0 is
/// the northern edge, so `bottom` selects the lower half of the image.
fn crop_water_mask(mask: &WaterMask, left: bool, bottom: bool) -> WaterMask {
    let (w, h) = mask.image.dimensions();
    if w <= 1 || h <= 1 {
        return WaterMask {
            image: mask.image.clone(),
            geo_box: mask.geo_box.quadrant(left, bottom),
        };
    }
    let (half_w, half_h) = (w / 2, h / 2);
    let x = if left { 0 } else { half_w };
    let y = if bottom { half_h } else { 0 };
    WaterMask {
        image: imageops::crop_imm(&mask.image, x, y, half_w, half_h).to_image(),
        geo_box: mask.geo_box.quadrant(left, bottom),
    }
}
