use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("config parse error: {0}")]
    ParseError(String),

    #[error("config validation error: {0}")]
    ValidationError(String),
}

/// Top-level error for the portal binaries.
#[derive(Debug, thiserror::Error)]
pub enum PortalError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("realtime error: {0}")]
    Realtime(String),

    #[error("{0}")]
    Other(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_display() {
        let err = ConfigError::FileNotFound(PathBuf::from("/tmp/missing.toml"));
        assert_eq!(err.to_string(), "config file not found: /tmp/missing.toml");

        let err = ConfigError::ParseError("unexpected token".into());
        assert_eq!(err.to_string(), "config parse error: unexpected token");

        let err = ConfigError::ValidationError("realtime.endpoint is empty".into());
        assert_eq!(
            err.to_string(),
            "config validation error: realtime.endpoint is empty"
        );
    }

    #[test]
    fn portal_error_from_config() {
        let config_err = ConfigError::ParseError("bad toml".into());
        let err: PortalError = config_err.into();
        assert!(matches!(err, PortalError::Config(_)));
        assert!(err.to_string().contains("bad toml"));
    }

    #[test]
    fn portal_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "stdin closed");
        let err: PortalError = io_err.into();
        assert!(matches!(err, PortalError::Io(_)));
        assert!(err.to_string().contains("stdin closed"));
    }

    #[test]
    fn portal_error_other_variants() {
        let err = PortalError::Realtime("broker rejected CONNECT".into());
        assert_eq!(err.to_string(), "realtime error: broker rejected CONNECT");

        let err = PortalError::Other("something went wrong".into());
        assert_eq!(err.to_string(), "something went wrong");
    }
}
