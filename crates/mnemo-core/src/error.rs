//! Error types for mnemo.

use thiserror::Error;

/// Top-level result type for mnemo operations.
pub type Result<T> = std::result::Result<T, MnemoError>;

/// Top-level error type for mnemo.
#[derive(Debug, Error)]
pub enum MnemoError {
    #[error("not configured: {0}")]
    NotConfigured(String),

    #[error("project could not be detected: {0}")]
    ProjectUndetected(String),

    #[error("index error: {0}")]
    Index(String),

    #[error("vector index error: {0}")]
    Vector(String),

    #[error("vault error: {0}")]
    Vault(String),

    #[error("version control error: {0}")]
    Vcs(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("invalid record: {0}")]
    InvalidRecord(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(String),
}

impl MnemoError {
    /// Configuration errors abort an operation before anything is mutated.
    #[must_use]
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::NotConfigured(_) | Self::ProjectUndetected(_) | Self::Config(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errors_display_human_readable_messages() {
        let err = MnemoError::NotConfigured("vault not initialized".to_string());
        let msg = err.to_string();
        assert!(msg.contains("not configured"));
        assert!(msg.contains("vault not initialized"));

        let err = MnemoError::InvalidRecord("missing column 'category'".to_string());
        assert!(err.to_string().contains("category"));
    }

    #[test]
    fn configuration_errors_are_classified() {
        assert!(MnemoError::NotConfigured("x".into()).is_configuration());
        assert!(MnemoError::ProjectUndetected("x".into()).is_configuration());
        assert!(!MnemoError::Vcs("push rejected".into()).is_configuration());
        assert!(!MnemoError::Vector("timeout".into()).is_configuration());
    }
}
