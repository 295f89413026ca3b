//! Error types for the TypedBytes codec and the row processors.
//!
//! Every failure below the binaries is returned as a [`TypedBytesError`];
//! the program driver decides whether to terminate the process.

use std::io;

use thiserror::Error;

use crate::protocol::TypeTag;

/// Errors raised while decoding, encoding or processing a TypedBytes stream.
#[derive(Debug, Error)]
pub enum TypedBytesError {
    /// Underlying stream failure (including short writes)
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The stream ended in the middle of a value
    #[error("unexpected end of stream while reading {context}")]
    UnexpectedEof {
        /// What was being read when the stream ran dry
        context: &'static str,
    },

    /// A type code outside the registry (11..=49 or 201..=254)
    #[error("illegal type code {0}")]
    IllegalTag(u8),

    /// Strict mode: the primitive requested does not match the last tag read
    #[error("type mismatch: expected {expected:?}, last tag was {found:?}")]
    TagMismatch {
        /// Kind the caller asked to read
        expected: TypeTag,
        /// Tag most recently consumed from the stream
        found: TypeTag,
    },

    /// Numeric conversion requested on a non-numeric tag
    #[error("{tag:?} cannot be converted to {target}")]
    NotConvertible {
        /// Tag most recently consumed from the stream
        tag: TypeTag,
        /// Requested numeric kind
        target: &'static str,
    },

    /// A length prefix with the sign bit set
    #[error("negative length prefix {0}")]
    NegativeLength(i32),

    /// A buffer too large to be described by a 32-bit length prefix
    #[error("length {0} does not fit in a 32-bit length prefix")]
    LengthOverflow(usize),

    /// Chunked read asked for more bytes than the field has left
    #[error("requested {requested} bytes but only {remaining} remain in the field")]
    ChunkOverrun {
        /// Bytes requested by the caller
        requested: usize,
        /// Bytes left in the current string or byte sequence
        remaining: usize,
    },

    /// A field cursor used after the reader moved on to another value
    #[error("field cursor no longer refers to the current value")]
    StaleCursor,

    /// ListEnd seen where no list is open
    #[error("list terminator outside of a list")]
    UnexpectedListEnd,

    /// A row that is neither a Vector nor a List
    #[error("row {row} is not a list or vector (found {tag:?})")]
    NotARow {
        /// Zero-based row index
        row: usize,
        /// Top-level tag found instead
        tag: TypeTag,
    },

    /// A row element that cannot be widened to a double
    #[error("row {row}, col {col} has a non-double-convertible type {tag:?}")]
    NonNumericElement {
        /// Zero-based row index
        row: usize,
        /// Zero-based column index
        col: usize,
        /// Offending element tag
        tag: TypeTag,
    },

    /// A row whose width differs from the first row of the stream
    #[error("row {row} has {found} columns, expected {expected}")]
    RowWidthMismatch {
        /// Zero-based row index
        row: usize,
        /// Width established by the first row
        expected: usize,
        /// Width of the offending row
        found: usize,
    },

    /// A key that could not be read or skipped
    #[error("invalid key at row {row}: {source}")]
    InvalidKey {
        /// Zero-based row index
        row: usize,
        /// Decode failure behind it
        #[source]
        source: Box<TypedBytesError>,
    },

    /// Block reduction failure reported by a numeric backend
    #[error("block reduction failed: {0}")]
    Reduction(String),
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, TypedBytesError>;

impl TypedBytesError {
    /// Map an `io::Error` raised inside a value to [`TypedBytesError::UnexpectedEof`]
    /// when it is a short read.
    pub(crate) fn from_read(err: io::Error, context: &'static str) -> Self {
        if err.kind() == io::ErrorKind::UnexpectedEof {
            TypedBytesError::UnexpectedEof { context }
        } else {
            TypedBytesError::Io(err)
        }
    }
}
