//! Glob-like URL patterns shared by containers and site boosts.
//!
//! A pattern such as `*.example.com` is translated to an anchored regex where
//! `*` matches any run of characters. Host-only patterns are tested against the
//! URL's hostname; patterns containing a `/` are tested against `host + path`.

use regex::Regex;
use url::Url;

use crate::error::Result;

/// A compiled glob pattern.
#[derive(Debug, Clone)]
pub struct UrlPattern {
    raw: String,
    regex: Regex,
    with_path: bool,
}

impl UrlPattern {
    pub fn new(pattern: &str) -> Result<Self> {
        let pattern = pattern.trim();
        let escaped = regex::escape(pattern).replace(r"\*", ".*");
        let regex = Regex::new(&format!("(?i)^{}$", escaped))?;
        Ok(Self {
            raw: pattern.to_string(),
            regex,
            with_path: pattern.contains('/'),
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Tests an already-parsed URL.
    pub fn matches_url(&self, url: &Url) -> bool {
        let Some(host) = url.host_str() else {
            return false;
        };
        if self.with_path {
            self.regex.is_match(&format!("{}{}", host, url.path()))
        } else {
            self.regex.is_match(host)
        }
    }

    /// Parses `url` and tests it. Unparsable input never matches.
    pub fn matches(&self, url: &str) -> bool {
        parse_url(url).is_some_and(|parsed| self.matches_url(&parsed))
    }
}

/// Parses a URL, tolerating a missing scheme (`example.com/a`).
pub fn parse_url(input: &str) -> Option<Url> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }
    Url::parse(input)
        .ok()
        .filter(|url| url.host_str().is_some())
        .or_else(|| Url::parse(&format!("https://{}", input)).ok())
}

/// Returns the lowercase hostname of `url`, if it has one.
pub fn host_of(url: &str) -> Option<String> {
    parse_url(url).and_then(|u| u.host_str().map(str::to_lowercase))
}

/// Compiles every pattern, skipping (and reporting) the ones that fail.
pub fn compile_all(patterns: &[String]) -> (Vec<UrlPattern>, Vec<String>) {
    let mut compiled = Vec::with_capacity(patterns.len());
    let mut rejected = Vec::new();
    for pattern in patterns {
        match UrlPattern::new(pattern) {
            Ok(p) => compiled.push(p),
            Err(_) => rejected.push(pattern.clone()),
        }
    }
    (compiled, rejected)
}
