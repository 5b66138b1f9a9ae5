//! Decode quantized-mesh terrain tiles from their binary wire format.
//!
//! This crate provides pure synchronous decoding functions for unpacking
//! terrain geometry from the quantized-mesh tile format. All functions are
//! designed to be called from any threading context - the library user
//! controls parallelism.
//!
//! # Design principles
//!
//! - **Synchronous**: No async, no threading primitives
//! - **User-controlled parallelism**: Client decides how to parallelize
//! - **Web-compatible**: Compiles to WASM
//!
//! # Key functions
//!
//! - [`decode`]: Parse a complete tile buffer into [`QuantizedMeshData`]
//! - [`vertices::zig_zag_decode`]: Undo the signed-delta coding
//! - [`indices::decode_triangle_indices`]: Undo the high-water-mark index coding
//! - [`normals::oct_decode`]: Decompress a two-byte oct32p normal
//!
//! # Wire layout
//!
//! An 88-byte header, three zig-zag delta-coded `u16` vertex streams,
//! a padded triangle index block, four boundary edge lists, then
//! `(id, length, payload)` extension records until end of buffer.

mod error;
mod reader;

pub mod edges;
pub mod extensions;
pub mod header;
pub mod indices;
pub mod normals;
pub mod vertices;

pub use edges::EdgeIndices;
pub use error::{DecodeError, DecodeResult};
pub use extensions::Extensions;
pub use header::QuantizedMeshHeader;
pub use normals::{oct_decode, oct_encode};
pub use reader::Reader;
pub use vertices::{VertexData, zig_zag_decode, zig_zag_encode};

/// A fully decoded quantized-mesh tile.
#[derive(Debug, Clone)]
pub struct QuantizedMeshData {
    /// Fixed tile header.
    pub header: QuantizedMeshHeader,
    /// Dequantized per-vertex attributes.
    pub vertex_data: VertexData,
    /// Flat triangle list, three indices per triangle, file order.
    pub triangle_indices: Vec<u32>,
    /// Boundary vertex lists, sorted into perimeter order.
    pub edge_indices: EdgeIndices,
    /// Optional extension payloads.
    pub extensions: Extensions,
}

impl QuantizedMeshData {
    /// Number of vertices in the tile.
    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.vertex_data.len()
    }

    /// Number of triangles in the surface.
    #[must_use]
    pub fn triangle_count(&self) -> usize {
        self.triangle_indices.len() / 3
    }
}

/// Decode a complete quantized-mesh tile buffer.
///
/// Every read is bounds-checked; a truncated buffer fails with a
/// [`DecodeError::Truncated`] naming the field that ran out.
pub fn decode(buffer: &[u8]) -> DecodeResult<QuantizedMeshData> {
    let mut r = Reader::new(buffer);

    let header = header::decode_header(&mut r)?;
    let vertex_count = r.read_u32("vertex_count")? as usize;
    let vertex_data = vertices::decode_vertex_data(&mut r, vertex_count)?;
    let triangle_indices = indices::decode_triangle_indices(&mut r, vertex_count)?;
    let edge_indices = edges::decode_edge_indices(&mut r, &vertex_data)?;
    let extensions = extensions::decode_extensions(&mut r, vertex_count)?;

    Ok(QuantizedMeshData {
        header,
        vertex_data,
        triangle_indices,
        edge_indices,
        extensions,
    })
}
