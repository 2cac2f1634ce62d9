// Cache module for the editor shell's persistent state.
// Expiring, namespaced key/value storage that survives reloads and degrades to misses on faults.

pub mod backend;
pub mod entry;
pub mod key;
pub mod store;
pub mod ttl;

pub use backend::{FileBackend, MemoryBackend, StorageBackend};
pub use entry::CacheEntry;
pub use key::{editor_tabs_key, file_tree_key, make_key, syntax_highlight_key};
pub use store::{CacheStats, ExpiringStore, global, init, spawn_sweeper};
pub use ttl::DEFAULT_TTL;
