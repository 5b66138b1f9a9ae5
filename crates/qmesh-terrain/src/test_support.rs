//! Synthetic tiles for unit tests.

use glam::DVec3;
use qmesh_decode::{
    EdgeIndices, Extensions, QuantizedMeshData, QuantizedMeshHeader, VertexData,
};

fn header(min_height: f32, max_height: f32) -> QuantizedMeshHeader {
    QuantizedMeshHeader {
        center: DVec3::ZERO,
        min_height,
        max_height,
        bounding_sphere_center: DVec3::ZERO,
        bounding_sphere_radius: 6_400_000.0,
        horizon_occlusion_point: DVec3::ZERO,
    }
}

/// A single quad: corners SW, SE, NW, NE with the given normalized
/// heights and a header range of 0..1000 m.
pub(crate) fn quad_tile(heights: &[f32; 4]) -> QuantizedMeshData {
    QuantizedMeshData {
        header: header(0.0, 1000.0),
        vertex_data: VertexData {
            u: vec![0.0, 1.0, 0.0, 1.0],
            v: vec![0.0, 0.0, 1.0, 1.0],
            height: heights.to_vec(),
        },
        triangle_indices: vec![0, 1, 2, 1, 3, 2],
        edge_indices: EdgeIndices {
            west: vec![2, 0],
            south: vec![0, 1],
            east: vec![1, 3],
            north: vec![3, 2],
        },
        extensions: Extensions::default(),
    }
}

/// A regular (n+1) x (n+1) vertex grid with heights from `f(u, v)`
/// normalized against a 0..1000 m header range.
pub(crate) fn grid_tile(n: usize, f: impl Fn(f32, f32) -> f32) -> QuantizedMeshData {
    let side = n + 1;
    let mut u = Vec::with_capacity(side * side);
    let mut v = Vec::with_capacity(side * side);
    let mut height = Vec::with_capacity(side * side);
    for row in 0..side {
        for col in 0..side {
            let uu = col as f32 / n as f32;
            let vv = row as f32 / n as f32;
            u.push(uu);
            v.push(vv);
            height.push(f(uu, vv).clamp(0.0, 1.0));
        }
    }

    let mut triangle_indices = Vec::new();
    for row in 0..n {
        for col in 0..n {
            let sw = (row * side + col) as u32;
            let se = sw + 1;
            let nw = sw + side as u32;
            let ne = nw + 1;
            triangle_indices.extend_from_slice(&[sw, se, nw, se, ne, nw]);
        }
    }

    // Perimeter order matches the decoder's sort.
    let west = (0..side).rev().map(|r| (r * side) as u32).collect();
    let south = (0..side).map(|c| c as u32).collect();
    let east = (0..side).map(|r| (r * side + n) as u32).collect();
    let north = (0..side).rev().map(|c| (n * side + c) as u32).collect();

    QuantizedMeshData {
        header: header(0.0, 1000.0),
        vertex_data: VertexData { u, v, height },
        triangle_indices,
        edge_indices: EdgeIndices {
            west,
            south,
            east,
            north,
        },
        extensions: Extensions::default(),
    }
}
