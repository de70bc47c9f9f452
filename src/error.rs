use thiserror::Error;

/// Error surface of the truss engine and its collaborators.
///
/// All errors are fatal to the current run; the engine never retries.
#[derive(Debug, Error)]
pub enum TrussError {
    /// The input edge array breaks the preprocessing contract: unsorted,
    /// self-loops, duplicates, a missing mirror edge, or an odd edge count.
    #[error("invalid graph: {0}")]
    InvalidGraph(String),

    /// A large buffer could not be reserved.
    #[error("allocation failure: {0} bytes")]
    Allocation(usize),

    /// A structural invariant broke mid-run. Indicates a bug.
    #[error("internal invariant violated: {0}")]
    Invariant(String),

    /// The edge-list file could not be read.
    #[error("i/o: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed token in an edge-list file.
    #[error("parse error at byte {offset}: {msg}")]
    Parse { offset: usize, msg: String },
}

impl TrussError {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidGraph(msg.into())
    }

    pub(crate) fn invariant(msg: impl Into<String>) -> Self {
        Self::Invariant(msg.into())
    }
}
