//! Terrain pipeline error types.

use qmesh_decode::DecodeError;

/// Errors produced while building, clipping, or transporting terrain
/// meshes.
#[derive(Debug, thiserror::Error)]
pub enum TerrainError {
    /// The underlying tile buffer failed to decode.
    #[error("tile decode failed: {0}")]
    Decode(#[from] DecodeError),

    /// A wire record carried an unsupported format version.
    #[error("unsupported wire format version {found}, expected {expected}")]
    WireVersion {
        /// Version found in the record.
        found: u32,
        /// Version this build understands.
        expected: u32,
    },

    /// A wire record's buffers disagreed about the vertex count.
    #[error("wire record is inconsistent: {0}")]
    WireInconsistent(String),

    /// An operation needed geometry that has already been disposed.
    #[error("terrain mesh has been disposed")]
    Disposed,

    /// Clipping removed every triangle; the requested quadrant holds
    /// no parent geometry.
    #[error("clip produced an empty mesh")]
    EmptyClip,

    /// A task referenced a grid with impossible dimensions.
    #[error("invalid grid dimensions {width}x{height} for {samples} samples")]
    InvalidGrid {
        /// Grid width in samples.
        width: u32,
        /// Grid height in samples.
        height: u32,
        /// Samples actually supplied.
        samples: usize,
    },
}

/// Convenience alias used throughout the crate.
pub type TerrainResult<T> = Result<T, TerrainError>;
