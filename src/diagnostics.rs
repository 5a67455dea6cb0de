//! Build error types.
//!
//! The pipeline has no error recovery: the first syntax error, failed name
//! trace, or I/O failure aborts the whole build before any output is
//! written. Errors are concrete types rather than strings so callers (and
//! tests) can match on them:
//!
//! - `SyntaxError`: scanner/parser failure with the offending span
//! - `ResolutionError`: a traced export name the target module never
//!   supplies
//! - `BuildError`: the union surfaced by `build()`

use crate::span::Span;
use std::fmt;
use std::io;
use std::path::PathBuf;

/// Fatal scanner or parser error.
///
/// The message states expected-vs-actual token kind or names the invalid
/// character; `span` points at the offending bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxError {
    pub message: String,
    pub span: Span,
}

impl SyntaxError {
    pub fn new(message: impl Into<String>, span: Span) -> Self {
        SyntaxError {
            message: message.into(),
            span,
        }
    }
}

impl fmt::Display for SyntaxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (at byte {})", self.message, self.span.start)
    }
}

impl std::error::Error for SyntaxError {}

/// A reexported or imported name that the target module does not supply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolutionError {
    /// The name being traced.
    pub name: String,
    /// Module that was expected to export the name.
    pub target: PathBuf,
    /// Module whose import/reexport requested the name.
    pub importer: PathBuf,
}

impl fmt::Display for ResolutionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "'{}' is not exported by {} (imported by {})",
            self.name,
            self.target.display(),
            self.importer.display()
        )
    }
}

impl std::error::Error for ResolutionError {}

/// Any failure that aborts a build.
#[derive(Debug)]
pub enum BuildError {
    Syntax {
        /// Module being parsed, when known.
        path: Option<PathBuf>,
        error: SyntaxError,
    },
    Resolution(ResolutionError),
    Io {
        path: PathBuf,
        source: io::Error,
    },
}

impl BuildError {
    pub fn syntax(path: impl Into<PathBuf>, error: SyntaxError) -> Self {
        BuildError::Syntax {
            path: Some(path.into()),
            error,
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        BuildError::Io {
            path: path.into(),
            source,
        }
    }
}

impl fmt::Display for BuildError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildError::Syntax {
                path: Some(path),
                error,
            } => write!(f, "{}: {}", path.display(), error),
            BuildError::Syntax { path: None, error } => write!(f, "{error}"),
            BuildError::Resolution(err) => write!(f, "{err}"),
            BuildError::Io { path, source } => {
                write!(f, "{}: {}", path.display(), source)
            }
        }
    }
}

impl std::error::Error for BuildError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            BuildError::Syntax { error, .. } => Some(error),
            BuildError::Resolution(err) => Some(err),
            BuildError::Io { source, .. } => Some(source),
        }
    }
}

impl From<ResolutionError> for BuildError {
    fn from(err: ResolutionError) -> Self {
        BuildError::Resolution(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolution_error_names_all_three_parts() {
        let err = ResolutionError {
            name: "x".to_string(),
            target: PathBuf::from("/src/b.js"),
            importer: PathBuf::from("/src/a.js"),
        };
        let text = err.to_string();
        assert!(text.contains("'x'"));
        assert!(text.contains("/src/b.js"));
        assert!(text.contains("/src/a.js"));
    }

    #[test]
    fn syntax_error_reports_offset() {
        let err = SyntaxError::new("expected Identifier, found Number", Span::new(7, 8));
        assert!(err.to_string().contains("byte 7"));
    }
}
