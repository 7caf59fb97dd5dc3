//! Request classification.
//!
//! An ordered table of `(Rule, Route)` pairs evaluated top to bottom; the
//! first matching rule decides the route. Order is static assets, images,
//! content pages, so a URL matching several rules takes the earliest.

use regex::Regex;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use url::{Position, Url};

use crate::Error;
use crate::config::WorkerConfig;
use crate::http::Request;

/// Image file suffix, optionally followed by a query string.
const IMAGE_EXTENSION: &str = r"(?i)\.(jpg|jpeg|png|webp|gif|svg|ico)(\?.*)?$";

/// Where a request is routed, which also fixes its caching strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Route {
    /// Cache-first against the static partition.
    StaticAsset,
    /// Stale-while-revalidate against the image partition.
    Image,
    /// Network-first against the content partition.
    ContentPage,
    /// Network-only, failures surface to the caller.
    Other,
}

impl Route {
    pub fn strategy(&self) -> &'static str {
        match self {
            Route::StaticAsset => "cache-first",
            Route::Image => "stale-while-revalidate",
            Route::ContentPage => "network-first",
            Route::Other => "network-only",
        }
    }
}

/// One static manifest entry, as the classifier matches it.
#[derive(Debug, Clone, PartialEq, Eq)]
enum ManifestEntry {
    /// A directory entry such as `/blog/`: only that page, with or without a query.
    Page(String),
    /// Any other entry: a substring of the request URL.
    Contains(String),
}

impl ManifestEntry {
    /// Same-origin entries keep their path form; others stay whole URLs.
    fn new(asset: &str, origin: &Url) -> Result<Self, Error> {
        let resolved = origin.join(asset).map_err(|e| Error::InvalidUrl(format!("{asset}: {e}")))?;

        if resolved.path().ends_with('/') && resolved.query().is_none() {
            return Ok(Self::Page(resolved.to_string()));
        }

        if resolved.origin() == origin.origin() {
            Ok(Self::Contains(resolved[Position::BeforePath..].to_string()))
        } else {
            Ok(Self::Contains(resolved.to_string()))
        }
    }

    fn matches(&self, href: &str) -> bool {
        match self {
            Self::Page(page) => href
                .strip_prefix(page.as_str())
                .is_some_and(|rest| rest.is_empty() || rest.starts_with('?')),
            Self::Contains(needle) => href.contains(needle.as_str()),
        }
    }
}

#[derive(Debug)]
enum Rule {
    StaticAsset { manifest: Vec<ManifestEntry>, markers: Vec<String> },
    Image { patterns: Vec<String>, extension: Regex },
    ContentPage { patterns: Vec<String>, blog_root: String },
}

impl Rule {
    fn matches(&self, request: &Request) -> bool {
        let href = request.url.as_str();
        match self {
            Rule::StaticAsset { manifest, markers } => {
                manifest.iter().any(|entry| entry.matches(href)) || markers.iter().any(|m| href.contains(m.as_str()))
            }
            Rule::Image { patterns, extension } => {
                patterns.iter().any(|p| href.contains(p.as_str())) || extension.is_match(href)
            }
            Rule::ContentPage { patterns, blog_root } => {
                patterns.iter().any(|p| href.contains(p.as_str()))
                    || href.contains(blog_root.as_str())
                    || request.accepts_html()
            }
        }
    }
}

/// Ordered predicate table mapping requests to routes.
#[derive(Debug)]
pub struct Classifier {
    rules: Vec<(Rule, Route)>,
}

impl Classifier {
    /// Build the table from configuration.
    ///
    /// Static manifest entries match as substrings of the request URL,
    /// except directory entries, which match only their own page.
    pub fn new(config: &WorkerConfig, origin: &Url) -> Result<Self, Error> {
        let manifest = config
            .static_assets
            .iter()
            .map(|asset| ManifestEntry::new(asset, origin))
            .collect::<Result<Vec<_>, _>>()?;

        let extension = Regex::new(IMAGE_EXTENSION).map_err(|e| Error::InvalidInput(e.to_string()))?;

        let rules = vec![
            (Rule::StaticAsset { manifest, markers: config.static_markers.clone() }, Route::StaticAsset),
            (Rule::Image { patterns: config.image_patterns.clone(), extension }, Route::Image),
            (
                Rule::ContentPage { patterns: config.content_patterns.clone(), blog_root: config.blog_root.clone() },
                Route::ContentPage,
            ),
        ];

        Ok(Self { rules })
    }

    pub fn classify(&self, request: &Request) -> Route {
        self.rules
            .iter()
            .find(|(rule, _)| rule.matches(request))
            .map(|(_, route)| *route)
            .unwrap_or(Route::Other)
    }
}
