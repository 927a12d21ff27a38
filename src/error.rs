use thiserror::Error;

/// Errors returned by array accessors, views, cursors and bundles.
///
/// Every variant is raised at the point of detection. The only place where
/// problems are collected instead of raised is [`validate()`].
///
/// [`validate()`]: super::validate()
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// The number of indices does not match the rank of the array.
    #[error("wrong number of indices: array has rank {expected}, got {actual}")]
    InvalidRank { expected: usize, actual: usize },

    /// An index lies outside `[0, length)` on some axis.
    #[error("index {index} out of bounds for axis {axis} of length {length}")]
    IndexOutOfBounds { axis: usize, index: usize, length: usize },

    /// A trim was requested with `start > end`.
    #[error("invalid range: start {start} is greater than end {end}")]
    InvalidRange { start: usize, end: usize },

    /// A write was attempted on storage that is shared with other arrays.
    #[error("array is immutable; take a writable copy first")]
    ImmutableViolation,

    /// The operation needs a rectangular array.
    #[error("array is not a qube")]
    NotAQube,

    /// A combination of structural properties that is not understood.
    #[error("unsupported scheme: {0}")]
    UnsupportedScheme(String),

    /// No bundled column matches the requested name or index.
    #[error("no such bundled column: {0}")]
    MalformedBundleReference(String),

    /// Index lists walked in zipped mode must all have the same length.
    #[error("index lists have different lengths: {expected} and {actual}")]
    MismatchedIndexLists { expected: usize, actual: usize },

    /// The array failed structural validation.
    #[error("array failed validation: {}", .0.join("; "))]
    InvalidStructure(Vec<String>),

    /// A cursor was advanced past its last position.
    #[error("no more elements")]
    NoMoreElements,

    /// The number of supplied values does not match the shape.
    #[error("wrong element count: expected {expected}, got {actual}")]
    WrongElementCount { expected: usize, actual: usize },
}

pub type Result<T> = std::result::Result<T, Error>;
