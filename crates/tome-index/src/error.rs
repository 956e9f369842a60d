//! Error types for the content-index crate.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using the index error type.
pub type Result<T> = std::result::Result<T, IndexError>;

/// Error type for content-index operations.
///
/// A missing article is not an error: lookups return `None` and content
/// fetches return nothing.
#[derive(Debug, Error)]
pub enum IndexError {
    /// Network/connectivity error (retryable).
    #[error("Network error: {0}")]
    Network(String),

    /// The service answered with an unexpected status.
    #[error("HTTP {status} from {url}")]
    Http {
        /// Response status code.
        status: u16,
        /// Requested URL.
        url: String,
    },

    /// Configuration error (bad URL etc.).
    #[error("Configuration error: {0}")]
    Config(String),

    /// `kiwix-serve` could not be located.
    #[error(
        "kiwix-serve not found. Install it with:\n  \
         wget https://download.kiwix.org/release/kiwix-tools/kiwix-tools_linux-x86_64.tar.gz\n  \
         tar xzf kiwix-tools_linux-x86_64.tar.gz\n  \
         mv kiwix-tools_*/kiwix-serve ~/.local/bin/"
    )]
    BinaryNotFound,

    /// No ZIM archives were found in any search directory.
    #[error("No Wikipedia ZIM files found in: {}", .searched.iter().map(|p| p.display().to_string()).collect::<Vec<_>>().join(", "))]
    NoZimFiles {
        /// Directories that were searched.
        searched: Vec<PathBuf>,
    },

    /// The server process could not be spawned.
    #[error("Failed to start kiwix-serve: {0}")]
    Spawn(#[source] std::io::Error),

    /// The server process started but never answered.
    #[error("kiwix-serve started but is not responding at {url}")]
    NotReady {
        /// URL that was polled.
        url: String,
    },
}

impl IndexError {
    /// Returns true if this error is retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Network(_))
    }
}

impl From<reqwest::Error> for IndexError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            IndexError::Network(format!("Request timed out: {}", err))
        } else if err.is_connect() {
            IndexError::Network(format!("Connection failed: {}", err))
        } else if let Some(status) = err.status() {
            IndexError::Http {
                status: status.as_u16(),
                url: err.url().map(|u| u.to_string()).unwrap_or_default(),
            }
        } else {
            IndexError::Network(err.to_string())
        }
    }
}
