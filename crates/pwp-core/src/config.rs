//! Origin and routing configuration.

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::WorkerError;

/// Configuration for the worker, injected into every component at
/// construction time.
///
/// All paths are resolved against `origin`, the base URL of the template
/// host. Defaults match a WordPress theme served from `localhost:8080`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// Base URL of the template host.
    pub origin: Url,
    /// Name of the shared response cache.
    pub cache_name: String,
    /// Query parameter that marks a fragment request.
    pub fragment_param: String,
    /// Value of `fragment_param` that marks a fragment request.
    pub fragment_value: String,
    /// Header fragment path, relative to the origin.
    pub header_fragment: String,
    /// Footer fragment path, relative to the origin.
    pub footer_fragment: String,
    /// Case-insensitive pattern matched against the full locator of assets.
    pub asset_pattern: String,
    /// Path prefix of administrative/backend pages (never intercepted).
    pub admin_prefix: String,
    /// Path prefix under `admin_prefix` that still serves public content.
    pub public_content_prefix: String,
    /// Query parameter carried by live-preview requests (never intercepted).
    pub preview_param: String,
    /// Path of the submission endpoint whose POSTs are deferred.
    pub submission_path: String,
    /// Tag registered with the scheduler for queued submissions.
    pub sync_tag: String,
    /// Additional tags accepted as aliases of `sync_tag`.
    pub extra_sync_tags: Vec<String>,
    /// Locators seeded into the cache at install time, relative to the origin.
    pub precache: Vec<String>,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            origin: Url::parse("http://localhost:8080/").expect("static origin is valid"),
            cache_name: "pwp".to_string(),
            fragment_param: "fragment".to_string(),
            fragment_value: "true".to_string(),
            header_fragment: "header.php".to_string(),
            footer_fragment: "footer.php".to_string(),
            asset_pattern: "(jpe?g|png|css|js)$".to_string(),
            admin_prefix: "/wp-".to_string(),
            public_content_prefix: "/wp-content".to_string(),
            preview_param: "customize_changeset_uuid".to_string(),
            submission_path: "/wp-comments-post.php".to_string(),
            sync_tag: "comment-sync".to_string(),
            extra_sync_tags: vec!["test-tag-from-devtools".to_string()],
            precache: vec![
                "header.php?fragment=true".to_string(),
                "./?fragment=true".to_string(),
                "footer.php?fragment=true".to_string(),
                "lazy.css".to_string(),
                "scripts/router.js".to_string(),
                "scripts/pwp-view.js".to_string(),
                "scripts/pwp-spinner.js".to_string(),
            ],
        }
    }
}

impl WorkerConfig {
    /// Create a configuration for an origin, with all other values defaulted.
    pub fn for_origin(origin: Url) -> Self {
        Self {
            origin,
            ..Default::default()
        }
    }

    /// Check the configuration for values the worker cannot run with.
    pub fn validate(&self) -> Result<(), WorkerError> {
        if !matches!(self.origin.scheme(), "http" | "https") {
            return Err(WorkerError::Config(format!(
                "origin must be http(s), got {}",
                self.origin
            )));
        }
        if self.cache_name.is_empty() {
            return Err(WorkerError::Config("cache_name is empty".to_string()));
        }
        if self.fragment_param.is_empty() {
            return Err(WorkerError::Config("fragment_param is empty".to_string()));
        }
        if !self.submission_path.starts_with('/') {
            return Err(WorkerError::Config(format!(
                "submission_path must be absolute, got {}",
                self.submission_path
            )));
        }
        if self.sync_tag.is_empty() {
            return Err(WorkerError::Config("sync_tag is empty".to_string()));
        }
        Ok(())
    }

    /// Resolve a path against the origin.
    ///
    /// The origin is treated as a directory even without a trailing slash,
    /// so `header.php` under `http://host/theme` is `http://host/theme/header.php`.
    pub fn resolve(&self, path: &str) -> Result<Url, WorkerError> {
        let mut base = self.origin.clone();
        if !base.path().ends_with('/') {
            let dir = format!("{}/", base.path());
            base.set_path(&dir);
        }
        base.join(path.trim_start_matches('/'))
            .map_err(|e| WorkerError::Config(format!("cannot resolve {}: {}", path, e)))
    }

    /// Resolve a path and append the fragment marker to it.
    pub fn fragment_url(&self, path: &str) -> Result<Url, WorkerError> {
        let mut url = self.resolve(path)?;
        url.query_pairs_mut()
            .append_pair(&self.fragment_param, &self.fragment_value);
        Ok(url)
    }

    /// Locator of the header fragment.
    pub fn header_url(&self) -> Result<Url, WorkerError> {
        self.fragment_url(&self.header_fragment)
    }

    /// Locator of the footer fragment.
    pub fn footer_url(&self) -> Result<Url, WorkerError> {
        self.fragment_url(&self.footer_fragment)
    }

    /// Resolved locators of the precache list.
    pub fn precache_urls(&self) -> Result<Vec<Url>, WorkerError> {
        self.precache.iter().map(|p| self.resolve(p)).collect()
    }

    /// Whether a scheduler tag drains the submission queue.
    pub fn is_sync_tag(&self, tag: &str) -> bool {
        tag == self.sync_tag || self.extra_sync_tags.iter().any(|t| t == tag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(origin: &str) -> WorkerConfig {
        WorkerConfig::for_origin(Url::parse(origin).unwrap())
    }

    #[test]
    fn test_resolve_treats_origin_as_directory() {
        let config = config("http://localhost/wp-content/themes/pwp");
        assert_eq!(
            config.resolve("lazy.css").unwrap().as_str(),
            "http://localhost/wp-content/themes/pwp/lazy.css"
        );
        assert_eq!(
            config.resolve("/scripts/router.js").unwrap().as_str(),
            "http://localhost/wp-content/themes/pwp/scripts/router.js"
        );
    }

    #[test]
    fn test_fragment_urls() {
        let config = config("http://localhost/theme/");
        assert_eq!(
            config.header_url().unwrap().as_str(),
            "http://localhost/theme/header.php?fragment=true"
        );
        assert_eq!(
            config.footer_url().unwrap().as_str(),
            "http://localhost/theme/footer.php?fragment=true"
        );
    }

    #[test]
    fn test_precache_urls_include_shell() {
        let config = config("http://localhost/theme/");
        let urls = config.precache_urls().unwrap();
        assert_eq!(urls.len(), 7);
        assert_eq!(urls[0].as_str(), "http://localhost/theme/header.php?fragment=true");
        assert_eq!(urls[1].as_str(), "http://localhost/theme/?fragment=true");
        assert_eq!(urls[3].as_str(), "http://localhost/theme/lazy.css");
    }

    #[test]
    fn test_sync_tags() {
        let config = WorkerConfig::default();
        assert!(config.is_sync_tag("comment-sync"));
        assert!(config.is_sync_tag("test-tag-from-devtools"));
        assert!(!config.is_sync_tag("periodic-refresh"));
    }

    #[test]
    fn test_validate() {
        assert!(WorkerConfig::default().validate().is_ok());

        let mut bad = WorkerConfig::default();
        bad.submission_path = "wp-comments-post.php".to_string();
        assert!(matches!(bad.validate(), Err(WorkerError::Config(_))));

        let bad = config("ftp://localhost/");
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_partial_config_deserializes_with_defaults() {
        let config: WorkerConfig =
            serde_json::from_str(r#"{"origin": "https://blog.example.com/theme/"}"#).unwrap();
        assert_eq!(config.origin.as_str(), "https://blog.example.com/theme/");
        assert_eq!(config.cache_name, "pwp");
        assert_eq!(config.submission_path, "/wp-comments-post.php");
    }
}
