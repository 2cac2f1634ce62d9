// Request routing rules.
// Decides per request whether to bypass the cache, go network-first, or go cache-first.

use reqwest::Method;
use url::{Position, Url};

use super::request::Request;

/// Path fragments of backend API calls. Never cached.
pub const API_PATTERNS: &[&str] = &["/api/"];

/// Dev-server channels and raw source modules. Never cached.
pub const DEV_PATTERNS: &[&str] = &[
    "/@vite/",
    "/@fs/",
    "/src/",
    ".tsx",
    ".ts",
    ".css",
    "__vite_ping",
];

/// Why a request is left to the network untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bypass {
    CrossOrigin,
    Method,
    Api,
    DevAsset,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    PassThrough(Bypass),
    /// Documents: try the network, fall back to cache, then to the app shell.
    NetworkFirst,
    /// Everything else: serve from cache, populate on miss.
    CacheFirst,
}

#[derive(Debug, Clone)]
pub struct RoutingRules {
    origin: Url,
    api_patterns: Vec<String>,
    dev_patterns: Vec<String>,
}

impl RoutingRules {
    pub fn new(origin: Url) -> Self {
        Self {
            origin,
            api_patterns: API_PATTERNS.iter().map(|p| p.to_string()).collect(),
            dev_patterns: DEV_PATTERNS.iter().map(|p| p.to_string()).collect(),
        }
    }

    pub fn with_api_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.api_patterns.push(pattern.into());
        self
    }

    pub fn with_dev_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.dev_patterns.push(pattern.into());
        self
    }

    pub fn origin(&self) -> &Url {
        &self.origin
    }

    /// Classify a request. Rules apply in order; the first match wins.
    pub fn classify(&self, request: &Request) -> Route {
        if !request.is_same_origin(&self.origin) {
            return Route::PassThrough(Bypass::CrossOrigin);
        }

        if request.method != Method::GET {
            return Route::PassThrough(Bypass::Method);
        }

        // Patterns match against path and query only, never the host.
        let target = &request.url[Position::BeforePath..];

        if matches_any(target, &self.api_patterns) {
            return Route::PassThrough(Bypass::Api);
        }

        if matches_any(target, &self.dev_patterns) {
            return Route::PassThrough(Bypass::DevAsset);
        }

        if request.accepts_html() {
            Route::NetworkFirst
        } else {
            Route::CacheFirst
        }
    }
}

fn matches_any(target: &str, patterns: &[String]) -> bool {
    patterns.iter().any(|p| target.contains(p.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rules() -> RoutingRules {
        RoutingRules::new(Url::parse("http://localhost:5173").unwrap())
    }

    fn get(path: &str) -> Request {
        Request::get_path(rules().origin(), path).unwrap()
    }

    #[test]
    fn test_cross_origin_passes_through() {
        let request = Request::get(Url::parse("https://otherhost.com/x").unwrap());
        assert_eq!(rules().classify(&request), Route::PassThrough(Bypass::CrossOrigin));
    }

    #[test]
    fn test_non_get_passes_through() {
        let mut request = get("/upload");
        request.method = Method::POST;
        assert_eq!(rules().classify(&request), Route::PassThrough(Bypass::Method));
    }

    #[test]
    fn test_api_passes_through() {
        for path in ["/api/file-tree", "/api/upload", "/api/download-repo?repo=a/b"] {
            assert_eq!(rules().classify(&get(path)), Route::PassThrough(Bypass::Api), "{}", path);
        }
    }

    #[test]
    fn test_dev_assets_pass_through() {
        for path in [
            "/src/App.tsx",
            "/@vite/client",
            "/@fs/home/dev/node_modules/x.js",
            "/main.ts",
            "/index.css",
            "/__vite_ping",
        ] {
            assert_eq!(
                rules().classify(&get(path)),
                Route::PassThrough(Bypass::DevAsset),
                "{}",
                path
            );
        }
    }

    #[test]
    fn test_documents_are_network_first() {
        let request = Request::navigate(rules().origin().join("/").unwrap());
        assert_eq!(rules().classify(&request), Route::NetworkFirst);
    }

    #[test]
    fn test_assets_are_cache_first() {
        assert_eq!(rules().classify(&get("/assets/logo.png")), Route::CacheFirst);
        assert_eq!(rules().classify(&get("/assets/index-abc123.js")), Route::CacheFirst);
    }

    #[test]
    fn test_custom_patterns() {
        let rules = rules().with_api_pattern("/graphql").with_dev_pattern("/hmr");
        assert_eq!(rules.classify(&get("/graphql")), Route::PassThrough(Bypass::Api));
        assert_eq!(rules.classify(&get("/hmr/ws")), Route::PassThrough(Bypass::DevAsset));
    }
}
