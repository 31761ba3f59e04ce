//! Request classification.

use http::Method;
use pwp_core::{Request, WorkerConfig, WorkerError};
use regex::{Regex, RegexBuilder};

/// How the worker handles a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestClass {
    /// A submission to defer until the network is back.
    DeferredWrite,
    /// Passed to the network untouched.
    Bypass,
    /// A page fragment, served stale-while-revalidate.
    Fragment,
    /// A static asset, served stale-while-revalidate.
    Asset,
    /// A page navigation, composed from fragments.
    FullPageNavigation,
}

impl RequestClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DeferredWrite => "deferred-write",
            Self::Bypass => "bypass",
            Self::Fragment => "fragment",
            Self::Asset => "asset",
            Self::FullPageNavigation => "full-page-navigation",
        }
    }

    /// Whether requests of this class may touch the cache.
    pub fn is_cached(&self) -> bool {
        matches!(self, Self::Fragment | Self::Asset | Self::FullPageNavigation)
    }
}

impl std::fmt::Display for RequestClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Assigns exactly one `RequestClass` to each request.
///
/// Rules are checked in order: deferred write, bypass, fragment, asset,
/// then navigation for everything left.
#[derive(Debug, Clone)]
pub struct RequestClassifier {
    submission_path: String,
    admin_prefix: String,
    public_content_prefix: String,
    preview_param: String,
    fragment_param: String,
    fragment_value: String,
    asset_pattern: Regex,
}

impl RequestClassifier {
    pub fn new(config: &WorkerConfig) -> Result<Self, WorkerError> {
        let asset_pattern = RegexBuilder::new(&config.asset_pattern)
            .case_insensitive(true)
            .build()
            .map_err(|e| {
                WorkerError::Config(format!("asset_pattern {:?}: {}", config.asset_pattern, e))
            })?;

        Ok(Self {
            submission_path: config.submission_path.clone(),
            admin_prefix: config.admin_prefix.to_ascii_lowercase(),
            public_content_prefix: config.public_content_prefix.clone(),
            preview_param: config.preview_param.clone(),
            fragment_param: config.fragment_param.clone(),
            fragment_value: config.fragment_value.clone(),
            asset_pattern,
        })
    }

    pub fn classify(&self, request: &Request) -> RequestClass {
        let method = request.method();
        let path = request.url().path();

        if method == Method::POST && path == self.submission_path {
            return RequestClass::DeferredWrite;
        }
        if method != Method::GET || self.is_admin(path) || request.has_query_param(&self.preview_param) {
            return RequestClass::Bypass;
        }
        if request
            .query_param(&self.fragment_param)
            .is_some_and(|v| v == self.fragment_value)
        {
            return RequestClass::Fragment;
        }
        if self.asset_pattern.is_match(request.locator()) {
            return RequestClass::Asset;
        }
        RequestClass::FullPageNavigation
    }

    fn is_admin(&self, path: &str) -> bool {
        !self.admin_prefix.is_empty()
            && path.to_ascii_lowercase().starts_with(&self.admin_prefix)
            && !path.starts_with(&self.public_content_prefix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classifier() -> RequestClassifier {
        RequestClassifier::new(&WorkerConfig::default()).unwrap()
    }

    fn classify(method: Method, url: &str) -> RequestClass {
        classifier().classify(&Request::parse(method, url).unwrap())
    }

    #[test]
    fn test_comment_post_is_deferred() {
        assert_eq!(
            classify(Method::POST, "http://localhost/wp-comments-post.php"),
            RequestClass::DeferredWrite
        );
        assert_eq!(
            classify(Method::GET, "http://localhost/wp-comments-post.php"),
            RequestClass::Bypass
        );
    }

    #[test]
    fn test_admin_paths_bypass() {
        assert_eq!(classify(Method::GET, "http://localhost/wp-admin/"), RequestClass::Bypass);
        assert_eq!(classify(Method::GET, "http://localhost/WP-login.php"), RequestClass::Bypass);
        assert_eq!(
            classify(Method::GET, "http://localhost/wp-includes/js/jquery.js"),
            RequestClass::Bypass
        );
    }

    #[test]
    fn test_public_content_is_not_admin() {
        assert_eq!(
            classify(Method::GET, "http://localhost/wp-content/themes/pwp/lazy.css"),
            RequestClass::Asset
        );
        assert_eq!(
            classify(Method::GET, "http://localhost/wp-content/uploads/"),
            RequestClass::FullPageNavigation
        );
    }

    #[test]
    fn test_preview_bypasses_even_for_fragments() {
        assert_eq!(
            classify(
                Method::GET,
                "http://localhost/?fragment=true&customize_changeset_uuid=abc"
            ),
            RequestClass::Bypass
        );
    }

    #[test]
    fn test_fragment_requires_marker_value() {
        assert_eq!(
            classify(Method::GET, "http://localhost/header.php?fragment=true"),
            RequestClass::Fragment
        );
        assert_eq!(
            classify(Method::GET, "http://localhost/about/?fragment=false"),
            RequestClass::FullPageNavigation
        );
    }

    #[test]
    fn test_asset_pattern_matches_full_locator() {
        assert_eq!(classify(Method::GET, "http://localhost/logo.PNG"), RequestClass::Asset);
        assert_eq!(classify(Method::GET, "http://localhost/photo.jpeg"), RequestClass::Asset);
        assert_eq!(
            classify(Method::GET, "http://localhost/style.css?ver=4.9"),
            RequestClass::FullPageNavigation
        );
    }

    #[test]
    fn test_other_writes_bypass() {
        assert_eq!(classify(Method::POST, "http://localhost/contact/"), RequestClass::Bypass);
        assert_eq!(classify(Method::PUT, "http://localhost/lazy.css"), RequestClass::Bypass);
    }

    #[test]
    fn test_invalid_asset_pattern() {
        let config = WorkerConfig {
            asset_pattern: "(css".to_string(),
            ..Default::default()
        };
        assert!(matches!(RequestClassifier::new(&config), Err(WorkerError::Config(_))));
    }
}
