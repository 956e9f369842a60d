//! Content-index access for Tome.
//!
//! The pipeline reads articles through the [`ContentIndex`] trait. The
//! production implementation talks to `kiwix-serve` over HTTP and extracts
//! paragraphs from the served MediaWiki HTML; [`KiwixServer`] optionally
//! starts that server and owns its process.

pub mod backend;
pub mod error;
pub mod html;
pub mod kiwix;
#[cfg(any(test, feature = "testing"))]
pub mod mock;
pub mod server;
pub mod types;

pub use backend::{ContentIndex, SharedIndex, with_retry};
pub use error::{IndexError, Result};
pub use kiwix::{DEFAULT_BOOK, DEFAULT_KIWIX_URL, KiwixConfig, KiwixIndex, create_shared_index};
#[cfg(any(test, feature = "testing"))]
pub use mock::{IndexCall, MockIndex};
pub use server::{KiwixServer, ServerConfig};
pub use types::{SearchHit, normalize_title};
