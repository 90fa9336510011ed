//! Error types for the bencode, `.tonic`, and `tonic?:` codecs.

use thiserror::Error;

/// Primary error type for codec operations in this crate.
#[derive(Debug, Error)]
pub enum TonicError {
    /// Bencode input was truncated or otherwise malformed.
    #[error("malformed bencode input at offset {offset}")]
    MalformedBencode {
        /// Byte offset into the input where decoding failed.
        offset: usize,
    },
    /// A required field was missing from a decoded dictionary.
    #[error("missing required field `{field}`")]
    MissingField {
        /// Name of the missing field.
        field: &'static str,
    },
    /// A field held a value that could not be interpreted as UTF-8.
    #[error("field `{field}` is not valid UTF-8")]
    InvalidUtf8 {
        /// Name of the offending field.
        field: &'static str,
    },
    /// A field held a structurally or semantically invalid value.
    #[error("invalid value for field `{field}`")]
    InvalidField {
        /// Name of the offending field.
        field: &'static str,
    },
    /// A file path escaped the folder root or used an absolute anchor.
    #[error("file path escapes folder root: {path}")]
    InvalidPath {
        /// Offending path as recorded in the metadata.
        path: String,
    },
    /// An I/O operation on a `.tonic` file failed.
    #[error("I/O error reading .tonic file")]
    Io(#[from] std::io::Error),
    /// A `tonic?:` URI did not use the required scheme or parameter shape.
    #[error("invalid tonic link: {reason}")]
    InvalidLink {
        /// Human-readable description of the parse failure.
        reason: &'static str,
    },
}

/// Convenience alias for results returned by this crate.
pub type TonicResult<T> = Result<T, TonicError>;
