//! Decode error types.

/// Errors produced while decoding a quantized-mesh buffer.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// The buffer ended before the named field could be read.
    #[error("buffer truncated reading `{field}` at offset {offset}")]
    Truncated {
        /// Name of the field being read when the buffer ran out.
        field: &'static str,
        /// Byte offset at which the read started.
        offset: usize,
    },

    /// A header or extension field held a value the format forbids.
    #[error("invalid value for `{field}`: {reason}")]
    InvalidField {
        /// Name of the offending field.
        field: &'static str,
        /// What was wrong with it.
        reason: String,
    },

    /// A decoded triangle or edge index fell outside `[0, vertex_count)`.
    #[error("index {index} out of range for {vertex_count} vertices (in `{field}`)")]
    IndexOutOfRange {
        /// Which index stream the value came from.
        field: &'static str,
        /// The decoded index value.
        index: u32,
        /// Number of vertices in the tile.
        vertex_count: u32,
    },

    /// An extension payload did not match its declared length.
    #[error("extension {id} payload length {actual} does not match expected {expected}")]
    ExtensionLength {
        /// Extension identifier byte.
        id: u8,
        /// Length implied by the tile contents.
        expected: usize,
        /// Length declared in the extension record.
        actual: usize,
    },

    /// The metadata extension did not contain valid JSON.
    #[error("metadata extension is not valid JSON: {0}")]
    MetadataJson(#[source] serde_json::Error),

    /// The metadata extension did not contain valid UTF-8.
    #[error("metadata extension is not valid UTF-8: {0}")]
    MetadataUtf8(#[source] std::str::Utf8Error),
}

/// Convenience alias used throughout the crate.
pub type DecodeResult<T> = Result<T, DecodeError>;
