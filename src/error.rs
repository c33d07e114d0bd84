//! Error taxonomy for session setup, reconciliation and publishing.

use thiserror::Error;

/// Errors raised by the reconciliation engine.
///
/// `Discovery`, `NotFound` and `Parse` abort a session before anything is
/// shown to the operator. `Publish` aborts the final commit and guarantees the
/// remote document was not replaced. `InvariantViolation` indicates a defect.
#[derive(Debug, Error)]
pub enum Error {
    /// Remote enumeration failed or found nothing.
    #[error("Package discovery failed: {0}")]
    Discovery(String),

    /// A required remote file or directory is missing.
    #[error("Not found on remote host: {0}")]
    NotFound(String),

    /// A declaration or document could not be parsed.
    #[error("Failed to parse {what}: {reason}")]
    Parse { what: String, reason: String },

    /// Upload or atomic replace failed; the remote file is unchanged.
    #[error("Failed to publish {path}: {reason}")]
    Publish { path: String, reason: String },

    /// Internal selection state is inconsistent.
    #[error("Selection invariant violated: {0}")]
    InvariantViolation(String),

    /// The remote transport reported a failure.
    #[error("Remote command failed: {0}")]
    Remote(#[source] anyhow::Error),
}

impl Error {
    pub fn parse(what: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::Parse {
            what: what.into(),
            reason: reason.into(),
        }
    }

    pub fn publish(path: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Error::Publish {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::parse("enabled.json", "unexpected token `x`");
        assert_eq!(
            err.to_string(),
            "Failed to parse enabled.json: unexpected token `x`"
        );

        let err = Error::publish("/srv/docker-compose.yml", "upload truncated");
        assert!(err.to_string().contains("/srv/docker-compose.yml"));
        assert!(err.to_string().contains("upload truncated"));

        let err = Error::NotFound("enabled.json".into());
        assert!(err.to_string().contains("Not found"));
    }

    #[test]
    fn test_remote_error_keeps_source() {
        let err = Error::Remote(anyhow::anyhow!("connection refused"));
        let source = std::error::Error::source(&err).map(|s| s.to_string());
        assert_eq!(source.as_deref(), Some("connection refused"));
    }
}
