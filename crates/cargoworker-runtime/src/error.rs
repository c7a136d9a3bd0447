use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Result type for cargoworker-runtime operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur in the runtime layer
#[derive(Debug)]
pub enum Error {
    /// Store lookup failed. Shared because one failed lookup may be
    /// reported to every caller that joined it.
    Index(Arc<cargoworker_index::Error>),

    /// Applying pending store migrations failed
    Migration(cargoworker_index::Error),

    /// IO operation failed
    Io(std::io::Error),

    /// Directory traversal failed
    Walk {
        path: PathBuf,
        source: walkdir::Error,
    },

    /// Configuration error (missing input, missing store, bad config file)
    Config(String),

    /// Run was cancelled by the caller
    Cancelled,

    /// Event published after the bus was closed
    BusClosed,

    /// One or more run closers failed
    Teardown(Vec<Error>),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Index(err) => write!(f, "Index error: {}", err),
            Error::Migration(err) => write!(f, "Failed to run migrations: {}", err),
            Error::Io(err) => write!(f, "IO error: {}", err),
            Error::Walk { path, source } => {
                write!(f, "Failed to walk {}: {}", path.display(), source)
            }
            Error::Config(msg) => write!(f, "Configuration error: {}", msg),
            Error::Cancelled => write!(f, "Run cancelled"),
            Error::BusClosed => write!(f, "Event bus is closed"),
            Error::Teardown(errors) => {
                write!(f, "{} closer(s) failed", errors.len())?;
                for err in errors {
                    write!(f, "; {}", err)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Index(err) => Some(err.as_ref()),
            Error::Migration(err) => Some(err),
            Error::Io(err) => Some(err),
            Error::Walk { source, .. } => Some(source),
            Error::Teardown(errors) => errors
                .first()
                .map(|err| err as &(dyn std::error::Error + 'static)),
            Error::Config(_) | Error::Cancelled | Error::BusClosed => None,
        }
    }
}

impl From<cargoworker_index::Error> for Error {
    fn from(err: cargoworker_index::Error) -> Self {
        Error::Index(Arc::new(err))
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for Error {
    fn from(err: toml::ser::Error) -> Self {
        Error::Config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_teardown_lists_every_failure() {
        let err = Error::Teardown(vec![
            Error::Config("first".to_string()),
            Error::BusClosed,
        ]);
        let msg = err.to_string();

        assert!(msg.starts_with("2 closer(s) failed"));
        assert!(msg.contains("first"));
        assert!(msg.contains("Event bus is closed"));
    }

    #[test]
    fn test_migration_error_keeps_source() {
        let err = Error::Migration(cargoworker_index::Error::Cancelled);

        assert!(err.to_string().starts_with("Failed to run migrations"));
        assert!(std::error::Error::source(&err).is_some());
    }
}
