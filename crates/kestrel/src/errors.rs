use kestrel_history::HistoryError;

/// The error type of the crate. Variants map one to one onto the error kinds
/// observable at the library boundary.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A query filter triple is invalid.
    #[error("invalid query: {0}")]
    BadQuery(String),
    /// A selector carries no usable constraint or matched nothing.
    #[error("invalid selector: {0}")]
    BadSelector(String),
    /// The solver found no solution; the payload is the rendered problem list.
    #[error("no solution: {0}")]
    NoSolution(String),
    /// The solution would remove protected packages.
    #[error("{0}")]
    RemovalOfProtected(String),
    /// A required metadata extension is not loaded.
    #[error("no capability: {0}")]
    NoCapability(String),
    /// A file could not be opened, read, written or renamed.
    #[error("invalid file: {0}")]
    FileInvalid(String),
    /// Not enough disk space for the operation.
    #[error("no space left: {0}")]
    NoSpace(String),
    /// A remote source is unavailable.
    #[error("cannot fetch source: {0}")]
    CannotFetchSource(String),
    /// The operation was cancelled.
    #[error("operation cancelled")]
    Cancelled,
    /// A library invariant was violated; the affected objects are safe to drop
    /// but not to reuse.
    #[error("internal error: {0}")]
    Internal(String),
    /// The history store failed.
    #[error(transparent)]
    History(#[from] HistoryError),
    /// Anything that does not fit the other kinds.
    #[error("unknown error")]
    Unknown,
}

/// Shorthand result type of this crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;
