//! Error types for the dowse CLI.

use std::path::PathBuf;

/// Errors from argument validation, resolution, and run plumbing.
#[derive(Debug)]
#[non_exhaustive]
pub enum Error {
    /// Base directory does not exist or is not readable.
    BaseDirNotFound(PathBuf, std::io::Error),
    /// An identifier resolved to nothing anywhere.
    NoTestsFound(String),
    /// A candidate module could not be read or parsed, and no other
    /// candidate matched either.
    Resolution(PathBuf, String),
    /// Cannot read the rerun list.
    RerunRead(PathBuf, std::io::Error),
    /// Cannot write the rerun list.
    RerunWrite(PathBuf, std::io::Error),
    /// The Python interpreter could not be spawned.
    Interpreter(String, std::io::Error),
}

impl Error {
    /// User-facing hint to accompany the error message.
    pub fn hint(&self) -> Option<&str> {
        match self {
            Self::NoTestsFound(_) => {
                Some("names are fuzzy: try a shorter fragment, or prefix a segment with * to match anywhere")
            }
            Self::Resolution(..) => Some("fix the module so it parses, then rerun"),
            Self::RerunRead(..) => Some("run some tests first; --rerun replays the last failures"),
            Self::Interpreter(..) => Some("point --python at a working interpreter"),
            _ => None,
        }
    }

    /// Process exit code for this error: 2 for load failures, 3 for
    /// nothing-found, 2 otherwise.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::NoTestsFound(_) => 3,
            _ => 2,
        }
    }
}

// Display: lowercase, no trailing punctuation, so it composes into
// larger error messages.
impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BaseDirNotFound(path, source) => {
                write!(f, "cannot use base dir '{}': {source}", path.display())
            }
            Self::NoTestsFound(name) if name.is_empty() => {
                write!(f, "no tests found")
            }
            Self::NoTestsFound(name) => {
                write!(f, "no tests found matching '{name}'")
            }
            Self::Resolution(path, message) => {
                write!(f, "cannot load '{}': {message}", path.display())
            }
            Self::RerunRead(path, source) => {
                write!(f, "cannot read rerun list '{}': {source}", path.display())
            }
            Self::RerunWrite(path, source) => {
                write!(f, "cannot write rerun list '{}': {source}", path.display())
            }
            Self::Interpreter(python, source) => {
                write!(f, "cannot run '{python}': {source}")
            }
        }
    }
}

// Implement source() for error chain introspection.
impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::BaseDirNotFound(_, e)
            | Self::RerunRead(_, e)
            | Self::RerunWrite(_, e)
            | Self::Interpreter(_, e) => Some(e),
            _ => None,
        }
    }
}
