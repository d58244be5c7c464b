//! URL pattern matching
//!
//! A pattern is either a literal substring or a `*`-wildcard expression.
//! Matching is case-insensitive. Wildcard patterns are anchored at both ends,
//! literal patterns match anywhere in the URL.

use regex::Regex;

/// A compiled URL pattern.
#[derive(Debug, Clone)]
pub enum UrlPattern {
    /// No wildcard: lower-cased substring containment
    Substring(String),
    /// Contains `*`: anchored full-string match
    Wildcard(Regex),
}

impl UrlPattern {
    /// Compile a pattern. Returns `None` for a blank pattern.
    pub fn parse(pattern: &str) -> Option<Self> {
        let normalized = pattern.trim().to_lowercase();
        if normalized.is_empty() {
            return None;
        }

        if !normalized.contains('*') {
            return Some(Self::Substring(normalized));
        }

        let body = normalized
            .split('*')
            .map(regex::escape)
            .collect::<Vec<_>>()
            .join(".*");

        match Regex::new(&format!("^{}$", body)) {
            Ok(re) => Some(Self::Wildcard(re)),
            Err(e) => {
                log::warn!("Could not compile pattern {:?}: {}", pattern, e);
                None
            }
        }
    }

    /// Check a URL against this pattern
    pub fn matches(&self, url: &str) -> bool {
        if url.is_empty() {
            return false;
        }
        let url = url.to_lowercase();
        match self {
            Self::Substring(needle) => url.contains(needle.as_str()),
            Self::Wildcard(re) => re.is_match(&url),
        }
    }
}

/// Check if a URL matches a single pattern.
///
/// Examples:
/// - `example.com` matches any URL containing `example.com`
/// - `*.example.com/*` matches `https://sub.example.com/page`
/// - `https://example.com/app/*` matches URLs starting with that path
pub fn matches_pattern(url: &str, pattern: &str) -> bool {
    if url.is_empty() {
        return false;
    }
    UrlPattern::parse(pattern).is_some_and(|p| p.matches(url))
}

/// Check if a URL matches any entry of a comma-separated pattern list.
pub fn matches_any_pattern(url: &str, pattern_list: &str) -> bool {
    if url.is_empty() {
        return false;
    }
    pattern_list
        .split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .any(|p| matches_pattern(url, p))
}
