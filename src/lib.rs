// rustyclint cache library.
// Expiring key/value store for editor state and an offline-capable HTTP cache controller.

pub mod cache;
pub mod config;
pub mod error;
pub mod network;
pub mod workspace;

pub use cache::{CacheEntry, ExpiringStore, make_key};
pub use config::Config;
pub use error::{CacheError, Result};
pub use network::{Generation, NetworkCacheController};
