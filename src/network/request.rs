// Request and response model for the network cache controller.
// Host-independent values so routing and caching can run without a real browser or socket.

use reqwest::header::{ACCEPT, HeaderMap, HeaderValue};
use reqwest::{Method, StatusCode};
use url::Url;

use crate::error::Result;

/// An intercepted outgoing request.
#[derive(Debug, Clone)]
pub struct Request {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
}

impl Request {
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: HeaderMap::new(),
        }
    }

    pub fn get(url: Url) -> Self {
        Self::new(Method::GET, url)
    }

    /// GET for `path` resolved against `base`.
    pub fn get_path(base: &Url, path: &str) -> Result<Self> {
        Ok(Self::get(base.join(path)?))
    }

    /// A document navigation: GET with an HTML `Accept` header.
    pub fn navigate(url: Url) -> Self {
        Self::get(url).with_accept("text/html,application/xhtml+xml,*/*;q=0.8")
    }

    pub fn with_accept(mut self, accept: &'static str) -> Self {
        self.headers.insert(ACCEPT, HeaderValue::from_static(accept));
        self
    }

    /// Whether the request declares it accepts an HTML document.
    pub fn accepts_html(&self) -> bool {
        self.headers
            .get_all(ACCEPT)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .any(|v| v.contains("text/html"))
    }

    pub fn is_same_origin(&self, origin: &Url) -> bool {
        self.url.origin() == origin.origin()
    }

    /// Identity used to match cached responses: the URL without its fragment.
    pub fn cache_key(&self) -> String {
        let mut url = self.url.clone();
        url.set_fragment(None);
        url.into()
    }
}

/// Where a response came from, as far as caching is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseKind {
    /// Same-origin response with readable body and headers.
    Basic,
    /// Cross-origin response permitted by CORS.
    Cors,
    /// Cross-origin response whose contents are hidden.
    Opaque,
}

#[derive(Debug, Clone)]
pub struct Response {
    pub status: StatusCode,
    pub kind: ResponseKind,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl Response {
    pub fn new(status: StatusCode, kind: ResponseKind, url: Url, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            kind,
            url,
            headers: HeaderMap::new(),
            body: body.into(),
        }
    }

    /// Only plain 200 same-origin responses are worth keeping.
    pub fn is_cacheable(&self) -> bool {
        self.status == StatusCode::OK && self.kind == ResponseKind::Basic
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_accepts_html() {
        assert!(Request::navigate(url("http://localhost:5173/")).accepts_html());
        assert!(!Request::get(url("http://localhost:5173/")).accepts_html());
        assert!(
            !Request::get(url("http://localhost:5173/a.png"))
                .with_accept("image/*")
                .accepts_html()
        );
    }

    #[test]
    fn test_same_origin() {
        let origin = url("http://localhost:5173");
        assert!(Request::get(url("http://localhost:5173/x")).is_same_origin(&origin));
        assert!(!Request::get(url("https://otherhost.com/x")).is_same_origin(&origin));
        assert!(!Request::get(url("http://localhost:8080/x")).is_same_origin(&origin));
    }

    #[test]
    fn test_cache_key_drops_fragment() {
        let request = Request::get(url("http://localhost:5173/docs?page=2#intro"));
        assert_eq!(request.cache_key(), "http://localhost:5173/docs?page=2");
    }

    #[test]
    fn test_cacheable_responses() {
        let u = url("http://localhost:5173/logo.png");
        assert!(Response::new(StatusCode::OK, ResponseKind::Basic, u.clone(), "x").is_cacheable());
        assert!(!Response::new(StatusCode::NOT_FOUND, ResponseKind::Basic, u.clone(), "").is_cacheable());
        assert!(!Response::new(StatusCode::OK, ResponseKind::Opaque, u.clone(), "").is_cacheable());
        assert!(!Response::new(StatusCode::OK, ResponseKind::Cors, u, "").is_cacheable());
    }
}
