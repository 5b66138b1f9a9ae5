//! Regular-grid mesh synthesis.
//!
//! Tiles without quantized source data still need geometry: stratum
//! init tiles use a constant-height grid, and raster DEM tiles lift a
//! row-major height raster into a mesh. Both share the grid assembly
//! here and come out shaped exactly like decoded tiles.

use crate::builder::{Assembler, BuildOptions, GeoVertex, MAX_ALTITUDE, MIN_ALTITUDE};
use crate::error::{TerrainError, TerrainResult};
use crate::geo::{Ellipsoid, GeoBox, normalized_mercator_y};
use crate::mesh::TerrainMesh;

fn grid_mesh(
    geo_box: GeoBox,
    projection: Ellipsoid,
    columns: usize,
    rows: usize,
    sample: impl Fn(usize, usize) -> f64,
    options: &BuildOptions,
) -> TerrainMesh {
    let mut vertices = Vec::with_capacity(columns * rows);
    let mut min_height = f64::INFINITY;
    let mut max_height = f64::NEG_INFINITY;

    for row in 0..rows {
        for col in 0..columns {
            let u = col as f64 / (columns - 1) as f64;
            let v = row as f64 / (rows - 1) as f64;
            let lat = geo_box.lat_at(v);
            let altitude = sample(col, row).clamp(MIN_ALTITUDE, MAX_ALTITUDE);
            min_height = min_height.min(altitude);
            max_height = max_height.max(altitude);
            let web_mercator_y = if options.is_web_mercator {
                normalized_mercator_y(lat, &geo_box) as f32
            } else {
                v as f32
            };
            vertices.push(GeoVertex {
                lon: geo_box.lon_at(u),
                lat,
                altitude,
                u: u as f32,
                v: v as f32,
                web_mercator_y,
                normal: None,
            });
        }
    }

    let mut indices = Vec::with_capacity((columns - 1) * (rows - 1) * 6);
    for row in 0..rows - 1 {
        for col in 0..columns - 1 {
            let sw = (row * columns + col) as u32;
            let se = sw + 1;
            let nw = sw + columns as u32;
            let ne = nw + 1;
            indices.extend_from_slice(&[sw, se, nw, se, ne, nw]);
        }
    }

    // Perimeter order matching the decoder's edge sort.
    let west = (0..rows).rev().map(|r| (r * columns) as u32).collect();
    let south = (0..columns).map(|c| c as u32).collect();
    let east = (0..rows).map(|r| (r * columns + columns - 1) as u32).collect();
    let north = (0..columns)
        .rev()
        .map(|c| ((rows - 1) * columns + c) as u32)
        .collect();

    let mut assembler = Assembler::new(projection, geo_box, false);
    assembler.add_surface(&vertices, &indices);
    if options.solid {
        assembler.add_bottom_cap(&vertices, &indices, options.skirt_length);
    }
    if options.skirt_length > 0.0 {
        assembler.add_skirts(
            &vertices,
            &[west, south, east, north],
            options.skirt_length,
            options.smooth_skirt_normals,
        );
    }

    assembler.finish(geo_box, min_height as f32, max_height as f32)
}

/// A flat tile at a constant height, used where no terrain payload is
/// available yet.
#[must_use]
pub fn stratum_mesh(
    geo_box: GeoBox,
    projection: Ellipsoid,
    height: f64,
    segments: u32,
    options: &BuildOptions,
) -> TerrainMesh {
    let side = segments.max(1) as usize + 1;
    grid_mesh(geo_box, projection, side, side, |_, _| height, options)
}

/// Lift a row-major height raster (row 0 south) into a tile mesh.
pub fn raster_dem_mesh(
    geo_box: GeoBox,
    projection: Ellipsoid,
    width: u32,
    height: u32,
    samples: &[f32],
    options: &BuildOptions,
) -> TerrainResult<TerrainMesh> {
    if width < 2 || height < 2 || samples.len() != (width * height) as usize {
        return Err(TerrainError::InvalidGrid {
            width,
            height,
            samples: samples.len(),
        });
    }
    Ok(grid_mesh(
        geo_box,
        projection,
        width as usize,
        height as usize,
        |col, row| f64::from(samples[row * width as usize + col]),
        options,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::GroupKind;

    fn geo_box() -> GeoBox {
        GeoBox::new(0.0, 0.0, 0.01, 0.01)
    }

    #[test]
    fn stratum_tile_is_flat_and_closed() {
        let options = BuildOptions {
            skirt_length: 50.0,
            ..BuildOptions::default()
        };
        let mesh = stratum_mesh(geo_box(), Ellipsoid::WGS84, 12.0, 4, &options);

        assert_eq!(mesh.min_height, 12.0);
        assert_eq!(mesh.max_height, 12.0);
        let surface = mesh.group(GroupKind::Surface).unwrap();
        assert_eq!(surface.count, 4 * 4 * 6);
        assert!(mesh.group(GroupKind::Skirt).is_some());
    }

    #[test]
    fn dem_heights_carried_per_vertex() {
        let samples = vec![0.0, 10.0, 20.0, 30.0, 40.0, 50.0];
        let mesh = raster_dem_mesh(
            geo_box(),
            Ellipsoid::WGS84,
            3,
            2,
            &samples,
            &BuildOptions::default(),
        )
        .unwrap();
        assert_eq!(mesh.vertex_count(), 6);
        assert_eq!(mesh.altitudes, samples);
        assert_eq!(mesh.min_height, 0.0);
        assert_eq!(mesh.max_height, 50.0);
    }

    #[test]
    fn undersized_raster_rejected() {
        let result = raster_dem_mesh(
            geo_box(),
            Ellipsoid::WGS84,
            3,
            2,
            &[0.0; 5],
            &BuildOptions::default(),
        );
        assert!(matches!(result, Err(TerrainError::InvalidGrid { .. })));
    }
}
