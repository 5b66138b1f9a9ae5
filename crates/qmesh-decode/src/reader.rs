//! Bounds-checked little-endian cursor over a tile buffer.
//!
//! Every read names the field it was attempting so truncation errors
//! point at the exact spot in the wire layout.

use crate::error::{DecodeError, DecodeResult};

/// Little-endian reader over a byte slice.
pub struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    /// Wrap a buffer, starting at offset 0.
    #[must_use]
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Current byte offset.
    #[must_use]
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Bytes left to read.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    /// Whether the cursor has consumed the whole buffer.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Round the cursor up to the next multiple of `align` bytes.
    ///
    /// The source format pads the stream so index arrays start on an
    /// element-size boundary. The position is clamped to the buffer
    /// length so a truncated tile fails the following read with
    /// [`DecodeError::Truncated`] rather than overflowing the cursor.
    pub fn align_to(&mut self, align: usize) {
        let rem = self.pos % align;
        if rem != 0 {
            self.pos = (self.pos + align - rem).min(self.buf.len());
        }
    }

    fn take(&mut self, n: usize, field: &'static str) -> DecodeResult<&'a [u8]> {
        if self.remaining() < n {
            return Err(DecodeError::Truncated {
                field,
                offset: self.pos,
            });
        }
        let slice = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    pub fn read_u8(&mut self, field: &'static str) -> DecodeResult<u8> {
        Ok(self.take(1, field)?[0])
    }

    pub fn read_u16(&mut self, field: &'static str) -> DecodeResult<u16> {
        let b = self.take(2, field)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    pub fn read_u32(&mut self, field: &'static str) -> DecodeResult<u32> {
        let b = self.take(4, field)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub fn read_f32(&mut self, field: &'static str) -> DecodeResult<f32> {
        let b = self.take(4, field)?;
        Ok(f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub fn read_f64(&mut self, field: &'static str) -> DecodeResult<f64> {
        let b = self.take(8, field)?;
        Ok(f64::from_le_bytes([
            b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7],
        ]))
    }

    /// Read `count` consecutive `u16` values.
    pub fn read_u16_array(&mut self, count: usize, field: &'static str) -> DecodeResult<Vec<u16>> {
        let bytes = self.take(count * 2, field)?;
        Ok(bytes
            .chunks_exact(2)
            .map(|c| u16::from_le_bytes([c[0], c[1]]))
            .collect())
    }

    /// Read `count` consecutive `u32` values.
    pub fn read_u32_array(&mut self, count: usize, field: &'static str) -> DecodeResult<Vec<u32>> {
        let bytes = self.take(count * 4, field)?;
        Ok(bytes
            .chunks_exact(4)
            .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect())
    }

    /// Read `count` raw bytes.
    pub fn read_bytes(&mut self, count: usize, field: &'static str) -> DecodeResult<&'a [u8]> {
        self.take(count, field)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_little_endian_scalars() {
        let buf = [0x01, 0x00, 0x02, 0x00, 0x00, 0x00];
        let mut r = Reader::new(&buf);
        assert_eq!(r.read_u16("a").unwrap(), 1);
        assert_eq!(r.read_u32("b").unwrap(), 2);
        assert!(r.is_empty());
    }

    #[test]
    fn truncation_names_field_and_offset() {
        let buf = [0xff, 0xff];
        let mut r = Reader::new(&buf);
        let err = r.read_u32("triangle_count").unwrap_err();
        match err {
            DecodeError::Truncated { field, offset } => {
                assert_eq!(field, "triangle_count");
                assert_eq!(offset, 0);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn align_rounds_up() {
        let buf = [0u8; 8];
        let mut r = Reader::new(&buf);
        r.read_u8("x").unwrap();
        r.align_to(4);
        assert_eq!(r.position(), 4);
        r.align_to(4);
        assert_eq!(r.position(), 4);
    }

    #[test]
    fn align_past_end_clamps_and_next_read_truncates() {
        let buf = [0u8; 6];
        let mut r = Reader::new(&buf);
        r.read_u32("a").unwrap();
        r.read_u8("b").unwrap();
        r.align_to(4);
        assert_eq!(r.position(), 6);
        assert!(r.is_empty());
        assert!(matches!(
            r.read_u32("c"),
            Err(DecodeError::Truncated { field: "c", offset: 6 })
        ));
    }
}
