use thiserror::Error;

#[derive(Error, Debug)]
pub enum VergenceError {
    /// External renderer failed or timed out.
    #[error("render error: {0}")]
    Render(String),

    /// Missing, truncated or undecodable bitmap.
    #[error("image read error: {0}")]
    ImageRead(String),

    /// Malformed invocation.
    #[error("usage error: {0}")]
    Usage(String),

    /// Snapshot capture or restore failure.
    #[error("snapshot error: {0}")]
    Snapshot(String),

    /// Audit trail violation or artifact write failure.
    #[error("recorder error: {0}")]
    Recorder(String),

    /// Propagated I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
