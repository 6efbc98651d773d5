use std::fmt;

use thiserror::Error;

/// Coarse classification of a resolution failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The script never loaded; permanent for the environment.
    EnvironmentUnavailable,
    /// Some segment of the path has no binding (or the path is malformed).
    PathUndefined,
    /// The value exists but its runtime type disagrees with the request.
    TypeMismatch,
}

/// Reason attached to a [`Diagnostic`]. The `Display` text is the exact
/// message printed after the path.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    #[error("Script is not loaded!")]
    NotLoaded,
    #[error("path is empty")]
    EmptyPath,
    #[error("empty segment at byte {offset}")]
    EmptySegment { offset: usize },
    /// `prefix` is the slice of the requested path up to and including the
    /// undefined segment.
    #[error("{segment} is not defined!")]
    Undefined { segment: String, prefix: String },
    #[error("lookup of {segment} failed: {message}")]
    LookupFailed { segment: String, message: String },
    #[error("Not a number")]
    NotANumber,
    #[error("Not a string")]
    NotAString,
    #[error("Not a table")]
    NotATable,
    #[error("iteration failed: {message}")]
    IterationFailed { message: String },
}

impl ResolveError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ResolveError::NotLoaded => ErrorKind::EnvironmentUnavailable,
            ResolveError::EmptyPath
            | ResolveError::EmptySegment { .. }
            | ResolveError::Undefined { .. }
            | ResolveError::LookupFailed { .. } => ErrorKind::PathUndefined,
            ResolveError::NotANumber
            | ResolveError::NotAString
            | ResolveError::NotATable
            | ResolveError::IterationFailed { .. } => ErrorKind::TypeMismatch,
        }
    }
}

/// One failed (or degraded) resolution: the requested path and why.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub path: String,
    pub error: ResolveError,
}

impl Diagnostic {
    pub fn kind(&self) -> ErrorKind {
        self.error.kind()
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "can't get [{}]. {}", self.path, self.error)
    }
}

/// Collects diagnostics emitted by an environment and forwards each one to
/// the `log` facade as it arrives.
#[derive(Debug, Default, Clone)]
pub struct DiagnosticLog {
    entries: Vec<Diagnostic>,
}

impl DiagnosticLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, path: &str, error: ResolveError) {
        let diagnostic = Diagnostic {
            path: path.to_string(),
            error,
        };
        log::warn!("{diagnostic}");
        self.entries.push(diagnostic);
    }

    pub fn entries(&self) -> &[Diagnostic] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn take(&mut self) -> Vec<Diagnostic> {
        std::mem::take(&mut self.entries)
    }
}
