// Network cache module.
// Intercepts application requests and serves them from versioned buckets or the network.

pub mod controller;
pub mod fetcher;
pub mod request;
pub mod routing;
pub mod storage;

pub use controller::{
    ActivateOutcome, FetchOutcome, InstallOutcome, NetworkCacheController, PRECACHE_MANIFEST,
    Phase, SHELL_PATH,
};
pub use fetcher::{Fetcher, HttpFetcher};
pub use request::{Request, Response, ResponseKind};
pub use routing::{Bypass, Route, RoutingRules};
pub use storage::{CacheStorage, Generation, MemoryCacheStorage};
