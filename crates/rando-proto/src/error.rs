//! Codec error type.

/// Errors produced while encoding or decoding a packet frame.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// The frame ended before the header could be read.
    #[error("frame truncated: {len} bytes, need at least {needed}")]
    Truncated {
        /// Bytes actually present.
        len: usize,
        /// Minimum bytes required.
        needed: usize,
    },

    /// The length prefix disagrees with the bytes that follow it.
    #[error("length prefix says {declared} bytes but frame carries {actual}")]
    LengthMismatch {
        /// Length declared in the header.
        declared: usize,
        /// Length actually present after the header.
        actual: usize,
    },

    /// The payload does not fit the frame size limit.
    #[error("frame of {len} bytes exceeds the {max} byte limit")]
    FrameTooLarge {
        /// Size of the offending payload.
        len: usize,
        /// Configured limit.
        max: usize,
    },

    /// The packet body could not be (de)serialized.
    #[error("packet body error: {0}")]
    Body(#[from] bincode::Error),

    /// The packet is a decode-only placeholder and cannot be encoded.
    #[error("packet kind {0} cannot be encoded")]
    Unencodable(u8),
}
