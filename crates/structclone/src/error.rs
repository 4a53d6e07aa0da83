use structclone_buffers::BufferError;
use thiserror::Error;

/// Every failure the codec can report.
///
/// Decoding and encoding never panic on untrusted input; all failure modes
/// funnel into this closed set and propagate immediately — there is no
/// recovery inside the codec.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StructCloneError {
    /// Missing or wrong version tag, or an unreadable version varint.
    #[error("invalid header")]
    InvalidHeader,
    /// Version outside the supported range.
    #[error("unsupported format version {0} (supported: 13-15)")]
    UnsupportedVersion(u32),
    /// Tag byte not recognized at this position.
    #[error("unexpected tag 0x{tag:02x} at byte {pos}")]
    UnexpectedTag { tag: u8, pos: usize },
    /// Structural violation, with context.
    #[error("malformed data: {0}")]
    MalformedData(String),
    /// The cursor would advance past the end of the input.
    #[error("unexpected end of input")]
    UnexpectedEof,
    /// A varint ran past 10 bytes or past 64 bits.
    #[error("varint overflow")]
    VarintOverflow,
    /// Recursion exceeded the configured depth limit.
    #[error("max depth exceeded")]
    MaxDepthExceeded,
    /// Input is larger than the configured size limit.
    #[error("input size {size} exceeds limit {limit}")]
    MaxSizeExceeded { size: usize, limit: usize },
    /// Back-reference ID beyond the reference table.
    #[error("invalid object reference {id} (only {len} objects seen)")]
    InvalidReference { id: u32, len: usize },
    /// Recognized tag whose semantics are out of scope.
    #[error("unsupported feature: {0}")]
    UnsupportedFeature(&'static str),
    /// The encoder hit its recursion guard on a cyclic value graph.
    #[error("circular references are not supported by the encoder")]
    CyclicNotSupported,
}

impl From<BufferError> for StructCloneError {
    fn from(err: BufferError) -> Self {
        match err {
            BufferError::EndOfBuffer => StructCloneError::UnexpectedEof,
            BufferError::VarintOverflow => StructCloneError::VarintOverflow,
        }
    }
}
