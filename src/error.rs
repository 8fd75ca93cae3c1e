use thiserror::Error;

/// Input validation failures raised while assembling the optimizer inputs.
/// These indicate malformed data and are never retried. Violations of
/// internal invariants (labels, probabilities, coordinates out of domain)
/// are programming bugs and panic instead.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MontageError {
    #[error("at least {required} source images required, got {given}")]
    TooFewImages { required: usize, given: usize },

    #[error("image {index} is {width}x{height}, expected {expected_width}x{expected_height}")]
    DimensionMismatch {
        index: usize,
        width: usize,
        height: usize,
        expected_width: usize,
        expected_height: usize,
    },

    #[error("channel sample {0} outside [0, 256)")]
    ChannelOutOfRange(i32),
}
