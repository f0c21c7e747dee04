//! Error types for decoder construction and decoding.

/// Result type for decoder operations
pub type DecoderResult<T> = Result<T, DecoderError>;

/// Errors raised during decoder construction or at the decode entry
/// points. Non-convergence is not an error; it is reported through
/// [`BpDecoder::converged`](crate::BpDecoder::converged).
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DecoderError {
    #[error("invalid parity-check matrix: {reason}")]
    InvalidMatrix { reason: String },

    #[error("error rate {0} outside the open interval (0, 1)")]
    InvalidErrorRate(f64),

    #[error("channel probabilities have length {actual}, expected {expected}")]
    ChannelLengthMismatch { expected: usize, actual: usize },

    #[error("no channel information: provide error_rate or channel_probs")]
    MissingChannel,

    #[error("min-sum scaling factor {0} must be non-negative")]
    InvalidScalingFactor(f64),

    #[error("unrecognized BP method `{0}`")]
    InvalidBpMethod(String),

    #[error("unrecognized schedule `{0}`")]
    InvalidSchedule(String),

    #[error("invalid input type: {0}")]
    InvalidInputType(String),

    #[error("square parity-check matrix: input type cannot be inferred, declare syndrome or received")]
    AmbiguousInput,

    #[error("input length {len} matches neither check count {rows} nor bit count {cols}")]
    InvalidInputLength {
        len: usize,
        rows: usize,
        cols: usize,
    },
}
