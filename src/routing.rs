//! Routing
//!
//! Pages navigate and read the current URL's query parameters through the
//! `Navigator` trait. `RouteState` is the per-visit implementation: it
//! holds the parsed query and records every navigation request.

use std::collections::HashMap;
use std::sync::Mutex;

/// Where unauthenticated visitors are sent
pub const LOGIN_ROUTE: &str = "/auth/Login";

/// Navigation collaborator
pub trait Navigator: Send + Sync {
    /// Request navigation to `path`
    fn navigate(&self, path: &str);

    /// Query parameters of the current URL
    fn current_query_params(&self) -> HashMap<String, String>;
}

/// Route of one page visit
#[derive(Debug, Default)]
pub struct RouteState {
    query: HashMap<String, String>,
    history: Mutex<Vec<String>>,
}

impl RouteState {
    pub fn new(query: HashMap<String, String>) -> Self {
        Self {
            query,
            history: Mutex::new(Vec::new()),
        }
    }

    /// Parse a raw query string (`id=abc&comment=hi%20there`)
    pub fn from_query_string(raw: &str) -> Self {
        Self::new(parse_query_string(raw))
    }

    /// Most recent navigation request
    pub fn last_navigation(&self) -> Option<String> {
        self.history.lock().ok().and_then(|h| h.last().cloned())
    }

    /// Every navigation request, oldest first
    pub fn history(&self) -> Vec<String> {
        self.history.lock().map(|h| h.clone()).unwrap_or_default()
    }
}

impl Navigator for RouteState {
    fn navigate(&self, path: &str) {
        tracing::debug!(path = %path, "Navigating");
        if let Ok(mut history) = self.history.lock() {
            history.push(path.to_string());
        }
    }

    fn current_query_params(&self) -> HashMap<String, String> {
        self.query.clone()
    }
}

/// Decode `application/x-www-form-urlencoded` pairs; later keys win
pub fn parse_query_string(raw: &str) -> HashMap<String, String> {
    raw.trim_start_matches('?')
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            (decode_component(key), decode_component(value))
        })
        .collect()
}

fn decode_component(raw: &str) -> String {
    let spaced = raw.replace('+', " ");
    urlencoding::decode(&spaced)
        .map(|s| s.into_owned())
        .unwrap_or(spaced)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_query_string() {
        let params = parse_query_string("?id=abc&comment=hi%20there+friend");
        assert_eq!(params.get("id").map(String::as_str), Some("abc"));
        assert_eq!(
            params.get("comment").map(String::as_str),
            Some("hi there friend")
        );
    }

    #[test]
    fn test_parse_query_string_edge_cases() {
        assert!(parse_query_string("").is_empty());
        let params = parse_query_string("flag&x=1&x=2");
        assert_eq!(params.get("flag").map(String::as_str), Some(""));
        assert_eq!(params.get("x").map(String::as_str), Some("2"));
    }

    #[test]
    fn test_navigation_recorded() {
        let route = RouteState::default();
        assert!(route.last_navigation().is_none());

        route.navigate(LOGIN_ROUTE);
        assert_eq!(route.last_navigation().as_deref(), Some(LOGIN_ROUTE));
        assert_eq!(route.history().len(), 1);
    }
}
