use std::fmt;

#[derive(Debug)]
pub struct CliError {
    pub msg: String,
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.msg.fmt(f)
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_deref()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

/// Simple CLI error from string.
pub fn simple_cli_error(msg: &str) -> CliError {
    CliError {
        msg: msg.to_string(),
        source: None,
    }
}

/// Convert a vergence library error into a CLI error with a hint.
pub fn vergence_cli_error(context: &str, err: crate::VergenceError) -> CliError {
    CliError {
        msg: format!("{}: {}", context, cli_hint(&err)),
        source: Some(Box::new(err)),
    }
}

/// Return an actionable hint for a vergence error variant.
pub fn cli_hint(err: &crate::VergenceError) -> String {
    use crate::VergenceError::*;
    match err {
        Render(msg) => format!("{msg}. Check the renderer and its timeout."),
        ImageRead(msg) => format!("{msg}. Verify the image file is intact."),
        Usage(msg) => format!("{msg}. See --help."),
        Snapshot(msg) => format!("{msg}. Candidate may be missing or unwritable."),
        Recorder(msg) => format!("{msg}. Session directory may be stale."),
        Io(io) => format!("{io}"),
    }
}
