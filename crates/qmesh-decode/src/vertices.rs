//! Vertex data decoding.
//!
//! Positions arrive as three parallel `u16` streams (u, v, height),
//! each zig-zag coded and delta-accumulated independently. Decoded
//! values are normalized to `[0, 1]` by the quantization maximum.

use crate::error::DecodeResult;
use crate::reader::Reader;

/// Largest quantized coordinate value; decoded values divide by this.
pub const QUANTIZATION_MAX: f32 = 32767.0;

/// Dequantized vertex attributes, all arrays of `vertex_count` length.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VertexData {
    /// Normalized west-to-east coordinate in `[0, 1]`.
    pub u: Vec<f32>,
    /// Normalized south-to-north coordinate in `[0, 1]`.
    pub v: Vec<f32>,
    /// Normalized height in `[0, 1]`, relative to the header bounds.
    pub height: Vec<f32>,
}

impl VertexData {
    /// Number of vertices.
    #[must_use]
    pub fn len(&self) -> usize {
        self.u.len()
    }

    /// Whether the tile has no vertices.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.u.is_empty()
    }
}

/// Map an unsigned zig-zag code back to its signed value.
#[must_use]
pub fn zig_zag_decode(code: u16) -> i16 {
    ((code >> 1) as i16) ^ -((code & 1) as i16)
}

/// Map a signed value to its unsigned zig-zag code.
#[must_use]
pub fn zig_zag_encode(value: i16) -> u16 {
    let v = i32::from(value);
    ((v << 1) ^ (v >> 15)) as u16
}

fn decode_stream(codes: &[u16]) -> Vec<f32> {
    let mut acc: i32 = 0;
    codes
        .iter()
        .map(|&code| {
            acc += i32::from(zig_zag_decode(code));
            acc as f32 / QUANTIZATION_MAX
        })
        .collect()
}

/// Read and dequantize the three vertex attribute streams.
pub fn decode_vertex_data(r: &mut Reader<'_>, vertex_count: usize) -> DecodeResult<VertexData> {
    let u_codes = r.read_u16_array(vertex_count, "vertex_u")?;
    let v_codes = r.read_u16_array(vertex_count, "vertex_v")?;
    let h_codes = r.read_u16_array(vertex_count, "vertex_height")?;

    Ok(VertexData {
        u: decode_stream(&u_codes),
        v: decode_stream(&v_codes),
        height: decode_stream(&h_codes),
    })
}
