//! Crate-level error types.

use std::fmt;

/// Errors produced by the phylo-movie crate.
///
/// Only load-time and setup APIs return these. Per-frame code paths degrade
/// to warnings instead of failing.
#[derive(Debug)]
pub enum MovieError {
    /// Malformed movie payload or metadata that does not match the trees.
    MovieLoad(String),
    /// Invalid keyframe sequence (duplicate names, length mismatch).
    Validation(String),
    /// Layout calculation failure for a single tree.
    Layout(String),
    /// Malformed worker wire message.
    Protocol(String),
    /// Generic I/O failure.
    Io(std::io::Error),
    /// Failed to spawn the layout worker thread.
    ThreadSpawn(std::io::Error),
    /// TOML options parsing/serialization failure.
    OptionsParse(String),
}

impl MovieError {
    /// Build a [`MovieError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`MovieError::MovieLoad`] value.
    pub fn movie_load(msg: impl Into<String>) -> Self {
        Self::MovieLoad(msg.into())
    }

    /// Build a [`MovieError::Layout`] value.
    pub fn layout(msg: impl Into<String>) -> Self {
        Self::Layout(msg.into())
    }
}

impl fmt::Display for MovieError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MovieLoad(msg) => write!(f, "movie load error: {msg}"),
            Self::Validation(msg) => write!(f, "validation error: {msg}"),
            Self::Layout(msg) => write!(f, "layout error: {msg}"),
            Self::Protocol(msg) => write!(f, "worker protocol error: {msg}"),
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::ThreadSpawn(e) => {
                write!(f, "failed to spawn thread: {e}")
            }
            Self::OptionsParse(msg) => {
                write!(f, "options parse error: {msg}")
            }
        }
    }
}

impl std::error::Error for MovieError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) | Self::ThreadSpawn(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for MovieError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<serde_json::Error> for MovieError {
    fn from(e: serde_json::Error) -> Self {
        Self::Protocol(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error;

    use super::*;

    #[test]
    fn display_includes_category() {
        let err = MovieError::validation("duplicate tree name 'T1'");
        assert_eq!(
            err.to_string(),
            "validation error: duplicate tree name 'T1'"
        );
    }

    #[test]
    fn io_errors_expose_source() {
        let err = MovieError::from(std::io::Error::other("disk"));
        assert!(err.source().is_some());
        assert!(MovieError::layout("x").source().is_none());
    }
}
