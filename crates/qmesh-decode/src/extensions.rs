//! Extension record decoding.
//!
//! After the edge blocks, the buffer holds zero or more
//! `(id: u8, length: u32, payload)` records until end of stream.
//! Unknown ids are skipped by their declared length.

use image::GrayImage;

use crate::error::{DecodeError, DecodeResult};
use crate::normals::decode_normal_buffer;
use crate::reader::Reader;

/// Extension id for oct-encoded per-vertex normals.
pub const EXTENSION_VERTEX_NORMALS: u8 = 1;
/// Extension id for the water coverage mask.
pub const EXTENSION_WATER_MASK: u8 = 2;
/// Extension id for the JSON metadata block.
pub const EXTENSION_METADATA: u8 = 4;

/// Side length of a full-resolution water mask.
pub const WATER_MASK_SIZE: u32 = 256;

/// Optional per-tile extension payloads.
#[derive(Debug, Clone, Default)]
pub struct Extensions {
    /// Decoded unit normals, one per vertex.
    pub vertex_normals: Option<Vec<glam::Vec3>>,
    /// Water coverage mask, 1x1 or 256x256, already inverted.
    pub water_mask: Option<GrayImage>,
    /// Parsed metadata JSON (geometric error, availability, ...).
    pub metadata: Option<serde_json::Value>,
}

/// The documented mask inversion: a source byte of 255 becomes 0,
/// anything else becomes 255. Preserved exactly as the source system
/// applies it, including for partially covered texels.
fn invert_mask_byte(value: u8) -> u8 {
    if value == 255 { 0 } else { 255 }
}

fn decode_water_mask(payload: &[u8]) -> DecodeResult<GrayImage> {
    let size = if payload.len() == 1 { 1 } else { WATER_MASK_SIZE };
    let expected = (size * size) as usize;
    if payload.len() != expected {
        return Err(DecodeError::ExtensionLength {
            id: EXTENSION_WATER_MASK,
            expected,
            actual: payload.len(),
        });
    }
    let inverted: Vec<u8> = payload.iter().copied().map(invert_mask_byte).collect();
    GrayImage::from_raw(size, size, inverted).ok_or(DecodeError::ExtensionLength {
        id: EXTENSION_WATER_MASK,
        expected,
        actual: payload.len(),
    })
}

fn decode_metadata(payload: &[u8]) -> DecodeResult<serde_json::Value> {
    let mut r = Reader::new(payload);
    let json_length = r.read_u32("metadata_json_length")? as usize;
    let json_bytes = r.read_bytes(json_length, "metadata_json")?;
    let json = std::str::from_utf8(json_bytes).map_err(DecodeError::MetadataUtf8)?;
    serde_json::from_str(json).map_err(DecodeError::MetadataJson)
}

/// Read extension records until the buffer is exhausted.
pub fn decode_extensions(r: &mut Reader<'_>, vertex_count: usize) -> DecodeResult<Extensions> {
    let mut extensions = Extensions::default();

    while !r.is_empty() {
        let id = r.read_u8("extension_id")?;
        let length = r.read_u32("extension_length")? as usize;
        let payload = r.read_bytes(length, "extension_payload")?;

        match id {
            EXTENSION_VERTEX_NORMALS => {
                let expected = vertex_count * 2;
                if payload.len() != expected {
                    return Err(DecodeError::ExtensionLength {
                        id,
                        expected,
                        actual: payload.len(),
                    });
                }
                extensions.vertex_normals = Some(decode_normal_buffer(payload));
            }
            EXTENSION_WATER_MASK => {
                extensions.water_mask = Some(decode_water_mask(payload)?);
            }
            EXTENSION_METADATA => {
                extensions.metadata = Some(decode_metadata(payload)?);
            }
            _ => {
                // Unknown extension: payload already consumed by length.
            }
        }
    }

    Ok(extensions)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extension_record(id: u8, payload: &[u8]) -> Vec<u8> {
        let mut buf = vec![id];
        buf.extend_from_slice(&(payload.len() as u32).to_le_bytes());
        buf.extend_from_slice(payload);
        buf
    }

    #[test]
    fn water_mask_inversion_is_exact() {
        // Fully land (255) inverts to 0, water (0) inverts to 255.
        let buf = extension_record(EXTENSION_WATER_MASK, &[255]);
        let mut r = Reader::new(&buf);
        let ext = decode_extensions(&mut r, 0).unwrap();
        let mask = ext.water_mask.unwrap();
        assert_eq!(mask.dimensions(), (1, 1));
        assert_eq!(mask.get_pixel(0, 0).0, [0]);

        let buf = extension_record(EXTENSION_WATER_MASK, &[0]);
        let mut r = Reader::new(&buf);
        let mask = decode_extensions(&mut r, 0).unwrap().water_mask.unwrap();
        assert_eq!(mask.get_pixel(0, 0).0, [255]);

        // Partial coverage also maps to 255.
        assert_eq!(invert_mask_byte(128), 255);
    }

    #[test]
    fn full_resolution_mask_must_be_256_squared() {
        let buf = extension_record(EXTENSION_WATER_MASK, &[255u8; 100]);
        let mut r = Reader::new(&buf);
        assert!(matches!(
            decode_extensions(&mut r, 0),
            Err(DecodeError::ExtensionLength { id: 2, .. })
        ));
    }

    #[test]
    fn metadata_json_parses() {
        let json = br#"{"geometricerror":120.5,"available":[[{"startX":0}]]}"#;
        let mut payload = (json.len() as u32).to_le_bytes().to_vec();
        payload.extend_from_slice(json);
        let buf = extension_record(EXTENSION_METADATA, &payload);
        let mut r = Reader::new(&buf);
        let ext = decode_extensions(&mut r, 0).unwrap();
        let meta = ext.metadata.unwrap();
        assert_eq!(meta["geometricerror"], 120.5);
    }

    #[test]
    fn unknown_extension_skipped() {
        let mut buf = extension_record(99, &[1, 2, 3]);
        buf.extend_from_slice(&extension_record(EXTENSION_WATER_MASK, &[0]));
        let mut r = Reader::new(&buf);
        let ext = decode_extensions(&mut r, 0).unwrap();
        assert!(ext.water_mask.is_some());
    }

    #[test]
    fn normals_length_checked_against_vertex_count() {
        let buf = extension_record(EXTENSION_VERTEX_NORMALS, &[0u8; 6]);
        let mut r = Reader::new(&buf);
        assert!(matches!(
            decode_extensions(&mut r, 4),
            Err(DecodeError::ExtensionLength { id: 1, .. })
        ));
    }
}
