use serde::Deserialize;
use serde::Serialize;
use serde_json::json;
use serde_json::Map;
use serde_json::Value;
use tracing::debug;
use tracing::error;

use crate::constants::ROUTER_LOCATION_PATH;
use crate::constants::ROUTER_NOT_FOUND_PATH;
use crate::reactive::WatchClass;
use crate::reactive::WatchSpec;
use crate::Atom;
use crate::Result;

/// Matches locations against router url patterns.
pub trait RouteMatcher: Send + Sync + 'static {
    fn matches(
        &self,
        pattern: &str,
        path: &str,
    ) -> bool;

    /// Captured parameters. Empty when the path does not match.
    fn extract_params(
        &self,
        pattern: &str,
        path: &str,
    ) -> Map<String, Value>;
}

/// `/`-separated patterns made of literal segments and `:name` captures.
///
/// Empty segments are ignored, so `/user/` matches `/user`. A capture matches
/// exactly one non-empty segment.
#[derive(Debug, Clone, Copy, Default)]
pub struct PatternMatcher;

impl PatternMatcher {
    fn capture(
        pattern: &str,
        path: &str,
    ) -> Option<Map<String, Value>> {
        let pattern: Vec<&str> = pattern.split('/').filter(|s| !s.is_empty()).collect();
        let path: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        if pattern.len() != path.len() {
            return None;
        }

        let mut params = Map::new();
        for (expected, actual) in pattern.iter().zip(path.iter()) {
            match expected.strip_prefix(':') {
                Some(name) if !name.is_empty() => {
                    params.insert(name.to_string(), Value::String(actual.to_string()));
                }
                _ if expected == actual => {}
                _ => return None,
            }
        }
        Some(params)
    }
}

impl RouteMatcher for PatternMatcher {
    fn matches(
        &self,
        pattern: &str,
        path: &str,
    ) -> bool {
        Self::capture(pattern, path).is_some()
    }

    fn extract_params(
        &self,
        pattern: &str,
        path: &str,
    ) -> Map<String, Value> {
        Self::capture(pattern, path).unwrap_or_default()
    }
}

/// Writes `{isActive, params}` to `update` on every navigation.
#[derive(Debug, Clone)]
pub struct RouterDefinition {
    pub url_pattern: String,
    pub update: String,
}

impl RouterDefinition {
    pub fn new(
        url_pattern: impl Into<String>,
        update: impl Into<String>,
    ) -> Self {
        Self {
            url_pattern: url_pattern.into(),
            update: update.into(),
        }
    }
}

/// Split form of a location as stored at `app.router.location`. `search`
/// keeps its `?` and `hash` its `#`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Location {
    pub pathname: String,
    pub search: String,
    pub hash: String,
}

impl Location {
    pub fn parse(location: &str) -> Self {
        let (rest, hash) = match location.find('#') {
            Some(i) => location.split_at(i),
            None => (location, ""),
        };
        let (pathname, search) = match rest.find('?') {
            Some(i) => rest.split_at(i),
            None => (rest, ""),
        };
        let pathname = if pathname.is_empty() {
            "/".to_string()
        } else if pathname.starts_with('/') {
            pathname.to_string()
        } else {
            format!("/{}", pathname)
        };

        Self {
            pathname,
            search: search.to_string(),
            hash: hash.to_string(),
        }
    }
}

impl Atom {
    /// Move to `location` (`/path?query#hash`). Routers are re-evaluated on
    /// the next flush.
    pub fn navigate(
        &self,
        location: &str,
    ) -> Result<bool> {
        let location = Location::parse(location);
        debug!(?location, "[Atom::navigate]");
        self.set(ROUTER_LOCATION_PATH, json!(location))
    }

    /// Current location, `None` before the router started or anything
    /// navigated.
    pub fn location(&self) -> Option<Location> {
        self.get(ROUTER_LOCATION_PATH)
            .and_then(|value| serde_json::from_value(value).ok())
    }

    /// Seed the location if nothing navigated yet, evaluate every router once
    /// and re-evaluate them as an ensurer whenever the location changes.
    pub(crate) fn start_router(&self) -> Result<()> {
        self.watch(
            WatchSpec::new([ROUTER_LOCATION_PATH])
                .class(WatchClass::Ensurer)
                .callback(|atom| atom.run_routers()),
        )?;

        if self.location().is_none() {
            self.set(ROUTER_LOCATION_PATH, json!(Location::parse("/")))?;
        }
        self.run_routers();
        Ok(())
    }

    pub(crate) fn run_routers(&self) {
        let pathname = self.location().unwrap_or_default().pathname;
        let routers = self.inner.definitions.read().routers();
        let matcher = self.inner.route_matcher.clone();

        let mut found = false;
        for (name, router) in routers {
            let is_active = matcher.matches(&router.url_pattern, &pathname);
            found |= is_active;
            let result = json!({
                "isActive": is_active,
                "params": matcher.extract_params(&router.url_pattern, &pathname),
            });
            debug!(%name, ?result, "[Atom::run_routers]");
            if let Err(e) = self.set(&router.update, result) {
                error!(%name, "[Atom::run_routers] {}", e);
            }
        }

        if let Err(e) = self.set(ROUTER_NOT_FOUND_PATH, !found) {
            error!("[Atom::run_routers] {}", e);
        }
    }
}
