use std::{error, fmt};

/// Boundary and emit-time error taxonomy.
///
/// Only [`CoreError::BadArguments`] and [`CoreError::BadBlockBounds`] are ever
/// returned from a public entry point (see the policy in the crate's design
/// notes): a malformed value slot is rendered as a sentinel at format time
/// instead of aborting the caller's batch, and a worker failure is delivered
/// through the caller's completion callback rather than as a `Result`.
#[derive(Debug, Clone, PartialEq)]
pub enum CoreError {
    /// Arity, type, or length mismatch at a public entry point.
    BadArguments { what: &'static str, detail: String },
    /// `epos` (or another cursor) fell outside the bounds of the raw block.
    BadBlockBounds { epos: usize, len: usize },
    /// A value slot's tag was incompatible with the format entry's selector.
    BadFormatSlot { format_id: i64, cursor: usize },
    /// The async worker failed to complete its emit.
    WorkerError(String),
}

impl fmt::Display for CoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BadArguments { what, detail } => {
                write!(f, "bad arguments for `{what}`: {detail}")
            }
            Self::BadBlockBounds { epos, len } => {
                write!(f, "epos {epos} out of bounds for a block of length {len}")
            }
            Self::BadFormatSlot { format_id, cursor } => {
                write!(
                    f,
                    "incompatible slot at cursor {cursor} for format id {format_id}"
                )
            }
            Self::WorkerError(msg) => write!(f, "async format worker error: {msg}"),
        }
    }
}

impl error::Error for CoreError {}

pub type CoreResult<T> = Result<T, CoreError>;
