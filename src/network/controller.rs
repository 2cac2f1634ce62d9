// Network cache controller.
// Install/activate/fetch lifecycle over versioned buckets, independent of the hosting runtime.

use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use url::Url;

use crate::config::Config;
use crate::error::{CacheError, Result};

use super::fetcher::Fetcher;
use super::request::{Request, Response};
use super::routing::{Bypass, Route, RoutingRules};
use super::storage::{CacheStorage, Generation};

/// Application shell fetched at install time.
pub const PRECACHE_MANIFEST: &[&str] = &["/", "/index.html"];

/// Document served when a navigation fails and has no cached copy.
pub const SHELL_PATH: &str = "/index.html";

/// Lifecycle phase of a controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Created, nothing cached yet.
    Parsed,
    /// Shell precached in the current generation's bucket.
    Installed,
    /// Old generations purged; controlling clients.
    Activated,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Parsed => "parsed",
            Phase::Installed => "installed",
            Phase::Activated => "activated",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallOutcome {
    pub bucket: String,
    pub precached: usize,
    /// Become active without waiting for existing clients to close.
    pub skip_waiting: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivateOutcome {
    pub deleted: Vec<String>,
    /// Take control of all open clients immediately.
    pub claim_clients: bool,
}

#[derive(Debug)]
pub enum FetchOutcome {
    /// Not handled; the host performs the request itself.
    PassThrough(Bypass),
    Respond(Result<Response>),
}

pub struct NetworkCacheController<S, F> {
    generation: Generation,
    rules: RoutingRules,
    precache: Vec<String>,
    storage: S,
    fetcher: F,
    phase: RwLock<Phase>,
}

impl<S: CacheStorage, F: Fetcher> NetworkCacheController<S, F> {
    pub fn new(generation: Generation, rules: RoutingRules, storage: S, fetcher: F) -> Self {
        Self {
            generation,
            rules,
            precache: PRECACHE_MANIFEST.iter().map(|p| p.to_string()).collect(),
            storage,
            fetcher,
            phase: RwLock::new(Phase::Parsed),
        }
    }

    pub fn from_config(config: &Config, storage: S, fetcher: F) -> Self {
        Self::new(
            Generation::for_build(&config.build_id),
            RoutingRules::new(config.origin.clone()),
            storage,
            fetcher,
        )
    }

    pub fn generation(&self) -> &Generation {
        &self.generation
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub async fn phase(&self) -> Phase {
        *self.phase.read().await
    }

    fn origin(&self) -> &Url {
        self.rules.origin()
    }

    /// Precache the application shell into the current generation's bucket.
    ///
    /// Every manifest entry is fetched before anything is stored; one failure
    /// fails the install and leaves the bucket unpopulated.
    pub async fn install(&self) -> Result<InstallOutcome> {
        let mut phase = self.phase.write().await;
        if *phase == Phase::Activated {
            return Err(CacheError::Lifecycle {
                action: "install",
                phase: phase.as_str(),
            });
        }

        let bucket = self.generation.bucket_name();
        self.storage.open(&bucket).await?;

        let mut fetched = Vec::with_capacity(self.precache.len());
        for path in &self.precache {
            let request = Request::get_path(self.origin(), path)?;
            let response = self.fetcher.fetch(&request).await?;
            if !response.status.is_success() {
                return Err(CacheError::Precache {
                    url: request.url.to_string(),
                    status: response.status.as_u16(),
                });
            }
            fetched.push((request, response));
        }

        let precached = fetched.len();
        for (request, response) in fetched {
            self.storage.put(&bucket, &request, response).await?;
        }

        *phase = Phase::Installed;
        info!(bucket = %bucket, precached, "Network cache installed");

        Ok(InstallOutcome {
            bucket,
            precached,
            skip_waiting: true,
        })
    }

    /// Delete every earlier generation's bucket, then claim clients.
    ///
    /// Bucket faults are logged and skipped; they never block activation.
    pub async fn activate(&self) -> Result<ActivateOutcome> {
        let mut phase = self.phase.write().await;
        if *phase == Phase::Parsed {
            return Err(CacheError::Lifecycle {
                action: "activate",
                phase: phase.as_str(),
            });
        }

        let mut deleted = Vec::new();
        match self.storage.keys().await {
            Ok(buckets) => {
                for bucket in buckets.into_iter().filter(|b| self.generation.supersedes(b)) {
                    info!(bucket = %bucket, "Deleting old cache");
                    match self.storage.delete(&bucket).await {
                        Ok(_) => deleted.push(bucket),
                        Err(e) => warn!(bucket = %bucket, error = %e, "Failed to delete old cache"),
                    }
                }
            }
            Err(e) => warn!(error = %e, "Failed to enumerate caches during activation"),
        }

        *phase = Phase::Activated;

        Ok(ActivateOutcome {
            deleted,
            claim_clients: true,
        })
    }

    /// Route an intercepted request.
    pub async fn handle_fetch(&self, request: &Request) -> FetchOutcome {
        match self.rules.classify(request) {
            Route::PassThrough(reason) => {
                debug!(url = %request.url, ?reason, "Passing request through");
                FetchOutcome::PassThrough(reason)
            }
            Route::NetworkFirst => FetchOutcome::Respond(self.network_first(request).await),
            Route::CacheFirst => FetchOutcome::Respond(self.cache_first(request).await),
        }
    }

    /// Resolve a request fully, fetching pass-through requests directly.
    pub async fn fetch(&self, request: &Request) -> Result<Response> {
        match self.handle_fetch(request).await {
            FetchOutcome::PassThrough(_) => self.fetcher.fetch(request).await,
            FetchOutcome::Respond(result) => result,
        }
    }

    async fn network_first(&self, request: &Request) -> Result<Response> {
        let err = match self.fetcher.fetch(request).await {
            Ok(response) => return Ok(response),
            Err(e) => e,
        };

        warn!(url = %request.url, error = %err, "Navigation failed, falling back to cache");

        if let Some(cached) = self.lookup(request).await {
            return Ok(cached);
        }

        if let Ok(shell) = Request::get_path(self.origin(), SHELL_PATH) {
            if let Some(cached) = self.lookup(&shell).await {
                debug!(url = %request.url, "Serving cached application shell");
                return Ok(cached);
            }
        }

        Err(err)
    }

    async fn cache_first(&self, request: &Request) -> Result<Response> {
        if let Some(cached) = self.lookup(request).await {
            debug!(url = %request.url, "Served from cache");
            return Ok(cached);
        }

        let response = self.fetcher.fetch(request).await?;

        if response.is_cacheable() {
            let bucket = self.generation.bucket_name();
            if let Err(e) = self.storage.put(&bucket, request, response.clone()).await {
                warn!(url = %request.url, error = %e, "Failed to cache response");
            }
        }

        Ok(response)
    }

    /// Cache match that treats storage faults as misses.
    async fn lookup(&self, request: &Request) -> Option<Response> {
        match self.storage.match_any(request).await {
            Ok(hit) => hit,
            Err(e) => {
                warn!(url = %request.url, error = %e, "Cache match failed");
                None
            }
        }
    }

    /// Delete every bucket, whatever its generation. Returns the deleted names.
    pub async fn clear_all_buckets(&self) -> Vec<String> {
        let buckets = match self.storage.keys().await {
            Ok(buckets) => buckets,
            Err(e) => {
                warn!(error = %e, "Failed to enumerate caches");
                return Vec::new();
            }
        };

        let mut deleted = Vec::new();
        for bucket in buckets {
            info!(bucket = %bucket, "Deleting cache");
            match self.storage.delete(&bucket).await {
                Ok(_) => deleted.push(bucket),
                Err(e) => warn!(bucket = %bucket, error = %e, "Failed to delete cache"),
            }
        }
        deleted
    }
}
