//! Boundary edge index lists.
//!
//! The wire format lists the vertices lying on each tile edge in
//! arbitrary order. Skirt construction walks consecutive pairs, so
//! each list is sorted along its edge into one fixed perimeter walk
//! starting at the north-west corner and going counter-clockwise:
//! west by v descending, south by u ascending, east by v ascending,
//! north by u descending. Zipping any sorted list pairwise then yields
//! consistently wound wall quads.

use crate::error::DecodeResult;
use crate::indices::decode_edge_index_list;
use crate::reader::Reader;
use crate::vertices::VertexData;

/// Per-edge boundary vertex indices, each sorted along its edge.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EdgeIndices {
    /// West edge, north to south (v descending).
    pub west: Vec<u32>,
    /// South edge, west to east (u ascending).
    pub south: Vec<u32>,
    /// East edge, south to north (v ascending).
    pub east: Vec<u32>,
    /// North edge, east to west (u descending).
    pub north: Vec<u32>,
}

fn sort_by_key_ascending(indices: &mut [u32], key: &[f32]) {
    indices.sort_by(|&a, &b| {
        key[a as usize]
            .partial_cmp(&key[b as usize])
            .unwrap_or(std::cmp::Ordering::Equal)
    });
}

fn sort_by_key_descending(indices: &mut [u32], key: &[f32]) {
    indices.sort_by(|&a, &b| {
        key[b as usize]
            .partial_cmp(&key[a as usize])
            .unwrap_or(std::cmp::Ordering::Equal)
    });
}

/// Read the four edge blocks, in wire order west, south, east, north,
/// and sort each into perimeter order.
pub fn decode_edge_indices(
    r: &mut Reader<'_>,
    vertices: &VertexData,
) -> DecodeResult<EdgeIndices> {
    let vertex_count = vertices.len();
    let mut west = decode_edge_index_list(r, vertex_count, "west_count", "west_indices")?;
    let mut south = decode_edge_index_list(r, vertex_count, "south_count", "south_indices")?;
    let mut east = decode_edge_index_list(r, vertex_count, "east_count", "east_indices")?;
    let mut north = decode_edge_index_list(r, vertex_count, "north_count", "north_indices")?;

    sort_by_key_descending(&mut west, &vertices.v);
    sort_by_key_ascending(&mut south, &vertices.u);
    sort_by_key_ascending(&mut east, &vertices.v);
    sort_by_key_descending(&mut north, &vertices.u);

    Ok(EdgeIndices {
        west,
        south,
        east,
        north,
    })
}
