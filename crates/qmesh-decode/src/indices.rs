//! Triangle index decoding.
//!
//! Indices are coded against a running "highest index seen" counter:
//! each decoded index is `highest - code`, and the counter increments
//! whenever a code of zero appears. Decoding therefore must walk the
//! stream in file order; reordering breaks the counter.

use crate::error::{DecodeError, DecodeResult};
use crate::reader::Reader;

/// Vertex counts above this use 32-bit index storage on the wire.
pub const SMALL_INDEX_LIMIT: usize = 65536;

/// Decode a high-water-mark coded index stream.
fn decode_high_water_mark(codes: impl Iterator<Item = u32>) -> DecodeResult<Vec<u32>> {
    let mut highest: u32 = 0;
    codes
        .map(|code| {
            let index = highest
                .checked_sub(code)
                .ok_or_else(|| DecodeError::InvalidField {
                    field: "triangle_indices",
                    reason: format!("code {code} exceeds highest index seen {highest}"),
                })?;
            if code == 0 {
                highest += 1;
            }
            Ok(index)
        })
        .collect()
}

/// Read the index block: optional padding, triangle count, then
/// `3 * triangle_count` coded indices at the width selected by
/// `vertex_count`.
pub fn decode_triangle_indices(
    r: &mut Reader<'_>,
    vertex_count: usize,
) -> DecodeResult<Vec<u32>> {
    let wide = vertex_count > SMALL_INDEX_LIMIT;
    // The stream is padded so index elements start aligned.
    r.align_to(if wide { 4 } else { 2 });

    let triangle_count = r.read_u32("triangle_count")? as usize;
    let index_count = triangle_count * 3;

    let indices = if wide {
        decode_high_water_mark(
            r.read_u32_array(index_count, "triangle_indices")?.into_iter(),
        )?
    } else {
        decode_high_water_mark(
            r.read_u16_array(index_count, "triangle_indices")?
                .into_iter()
                .map(u32::from),
        )?
    };

    for &index in &indices {
        if index as usize >= vertex_count {
            return Err(DecodeError::IndexOutOfRange {
                field: "triangle_indices",
                index,
                vertex_count: vertex_count as u32,
            });
        }
    }

    Ok(indices)
}

/// Read one boundary index list at the width selected by `vertex_count`.
///
/// Edge indices are absolute, not high-water-mark coded.
pub fn decode_edge_index_list(
    r: &mut Reader<'_>,
    vertex_count: usize,
    count_field: &'static str,
    index_field: &'static str,
) -> DecodeResult<Vec<u32>> {
    let count = r.read_u32(count_field)? as usize;
    let indices = if vertex_count > SMALL_INDEX_LIMIT {
        r.read_u32_array(count, index_field)?
    } else {
        r.read_u16_array(count, index_field)?
            .into_iter()
            .map(u32::from)
            .collect()
    };

    for &index in &indices {
        if index as usize >= vertex_count {
            return Err(DecodeError::IndexOutOfRange {
                field: index_field,
                index,
                vertex_count: vertex_count as u32,
            });
        }
    }

    Ok(indices)
}
