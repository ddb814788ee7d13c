//! Application-wide error types.
//!
//! Library modules return [`Error`] (or a narrower error such as
//! [`crate::download::DownloadError`]); the CLI layer wraps everything in
//! `anyhow` for convenient propagation.
//!
//! Only [`Error::ToolUnavailable`] is fatal for a run. Everything that goes
//! wrong while resolving one track is turned into a track outcome instead of
//! an error, so a single bad line never aborts the batch.

use std::path::PathBuf;

/// Application-wide result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level application error.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// File I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Tag reading error
    #[error("Metadata error for {path}: {message}")]
    Metadata { path: PathBuf, message: String },

    /// Filing a download into the organised library failed
    #[error("Organisation error: {0}")]
    Organisation(String),

    /// A required external tool is missing entirely
    #[error("Required tool `{tool}` is not available: {hint}")]
    ToolUnavailable { tool: String, hint: String },

    /// Generic error with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Create a metadata error.
    pub fn metadata(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Metadata {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create an organisation error.
    pub fn organisation(message: impl Into<String>) -> Self {
        Self::Organisation(message.into())
    }

    /// Create a tool-unavailable error.
    pub fn tool_unavailable(tool: impl Into<String>, hint: impl Into<String>) -> Self {
        Self::ToolUnavailable {
            tool: tool.into(),
            hint: hint.into(),
        }
    }

    /// Add context to an error.
    pub fn context(self, ctx: impl Into<String>) -> Self {
        Self::WithContext {
            context: ctx.into(),
            source: Box::new(self),
        }
    }

    /// Whether this error should abort the whole run.
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::ToolUnavailable { .. } => true,
            Self::WithContext { source, .. } => source.is_fatal(),
            _ => false,
        }
    }
}

/// Extension trait for adding context to Results.
pub trait ResultExt<T> {
    /// Add context to an error result.
    fn with_context(self, ctx: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn with_context(self, ctx: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.context(ctx))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, std::io::Error> {
    fn with_context(self, ctx: impl Into<String>) -> Result<T> {
        self.map_err(|e| Error::Io(e).context(ctx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_unavailable_display() {
        let err = Error::tool_unavailable("qobuz-dl", "pip install qobuz-dl");
        let msg = err.to_string();
        assert!(msg.contains("qobuz-dl"));
        assert!(msg.contains("pip install"));
    }

    #[test]
    fn test_error_with_context() {
        let err = Error::organisation("no free filename").context("while filing track");
        let msg = err.to_string();
        assert!(msg.contains("while filing track"));
        assert!(msg.contains("no free filename"));
    }

    #[test]
    fn test_only_tool_unavailable_is_fatal() {
        assert!(Error::tool_unavailable("ffmpeg", "install it").is_fatal());
        assert!(
            Error::tool_unavailable("ffmpeg", "install it")
                .context("startup")
                .is_fatal()
        );
        assert!(!Error::metadata("/a.flac", "bad header").is_fatal());
        assert!(!Error::organisation("disk full").is_fatal());
    }

    #[test]
    fn test_result_ext() {
        let result: std::result::Result<(), std::io::Error> = Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "gone",
        ));
        let with_ctx = result.with_context("reading tracklist");
        assert!(with_ctx.unwrap_err().to_string().contains("reading tracklist"));
    }
}
