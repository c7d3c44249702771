//! Hash-fragment routes of the application under test.
//!
//! The catalog app addresses its screens by URL fragment
//! (`#/product-details/prod-1`). A [`Route`] is one such path pattern with
//! named `:param` segments; it builds URLs for page descriptors and matches
//! URLs for the simulated session.

use std::collections::BTreeMap;
use std::fmt;

/// Route of the product listing
pub const LISTING_ROUTE: &str = "/products-listing";

/// Route of a product's details, parameterised by `id`
pub const DETAILS_ROUTE: &str = "/product-details/:id";

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Param(String),
}

/// Fragment path pattern such as `/product-details/:id`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pattern: String,
    segments: Vec<Segment>,
}

impl Route {
    /// Parse a pattern; `:name` segments capture one path segment each
    #[must_use]
    pub fn new(pattern: &str) -> Self {
        let segments = split(pattern)
            .map(|s| match s.strip_prefix(':') {
                Some(name) => Segment::Param(name.to_string()),
                None => Segment::Literal(s.to_string()),
            })
            .collect();
        Self {
            pattern: pattern.to_string(),
            segments,
        }
    }

    /// The pattern this route was parsed from
    #[must_use]
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Match a URL's fragment path, returning the captured parameters
    #[must_use]
    pub fn captures(&self, url: &str) -> Option<BTreeMap<String, String>> {
        let path: Vec<&str> = split(fragment_path(url)).collect();
        if path.len() != self.segments.len() {
            return None;
        }
        let mut params = BTreeMap::new();
        for (segment, value) in self.segments.iter().zip(path) {
            match segment {
                Segment::Literal(lit) if lit != value => return None,
                Segment::Literal(_) => {}
                Segment::Param(name) => {
                    let _ = params.insert(name.clone(), value.to_string());
                }
            }
        }
        Some(params)
    }

    /// Whether the URL's fragment path matches this route
    #[must_use]
    pub fn matches(&self, url: &str) -> bool {
        self.captures(url).is_some()
    }

    /// Relative URL (`#/...`) for this route; unknown params render empty
    #[must_use]
    pub fn url(&self, params: &[(&str, &str)]) -> String {
        let mut url = String::from("#");
        for segment in &self.segments {
            url.push('/');
            match segment {
                Segment::Literal(lit) => url.push_str(lit),
                Segment::Param(name) => {
                    if let Some((_, value)) = params.iter().find(|(key, _)| *key == name.as_str()) {
                        url.push_str(value);
                    }
                }
            }
        }
        url
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.pattern)
    }
}

/// Path part of a URL's fragment, or `""` when there is none
#[must_use]
pub fn fragment_path(url: &str) -> &str {
    url.split_once('#').map_or("", |(_, fragment)| fragment)
}

fn split(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_listing_url() {
        assert_eq!(Route::new(LISTING_ROUTE).url(&[]), "#/products-listing");
    }

    #[test]
    fn test_details_url() {
        let url = Route::new(DETAILS_ROUTE).url(&[("id", "prod-2")]);
        assert_eq!(url, "#/product-details/prod-2");
    }

    #[test]
    fn test_captures_from_absolute_url() {
        let params = Route::new(DETAILS_ROUTE)
            .captures("http://localhost:8085/#/product-details/prod-1")
            .unwrap();
        assert_eq!(params.get("id").map(String::as_str), Some("prod-1"));
    }

    #[test]
    fn test_segment_count_must_match() {
        let route = Route::new(DETAILS_ROUTE);
        assert!(!route.matches("#/product-details"));
        assert!(!route.matches("#/product-details/prod-1/extra"));
        assert!(!route.matches("#/products-listing"));
    }

    #[test]
    fn test_no_fragment() {
        assert_eq!(fragment_path("http://localhost:8085/"), "");
        assert!(!Route::new(LISTING_ROUTE).matches("http://localhost:8085/"));
    }

    #[test]
    fn test_display_is_pattern() {
        assert_eq!(Route::new(DETAILS_ROUTE).to_string(), "/product-details/:id");
    }
}
