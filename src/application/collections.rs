//! Cached collection pages served under `/_collections`.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, instrument};

use crate::{
    application::{error::PartialError, repos::DocumentStore},
    cache::{FragmentCache, MemoKey},
    presentation::views::{CollectionPageTemplate, render_fragment},
};

const SOURCE: &str = "application::collections";

/// Memoization namespace for rendered collection pages.
pub const PAGE_NAMESPACE: &str = "collections.get_page";

/// Map a `/_collections` suffix (`""`, `"/"`, `"/new"`) to the stored page path.
pub fn collection_path(rest: Option<&str>) -> String {
    match rest.map(|rest| rest.trim_matches('/')) {
        Some(rest) if !rest.is_empty() => format!("/collections/{rest}"),
        _ => "/collections".to_string(),
    }
}

pub struct CollectionPageService {
    documents: Arc<dyn DocumentStore>,
    cache: Arc<FragmentCache>,
    default_ttl: Duration,
}

impl CollectionPageService {
    pub fn new(
        documents: Arc<dyn DocumentStore>,
        cache: Arc<FragmentCache>,
        default_ttl: Duration,
    ) -> Self {
        Self {
            documents,
            cache,
            default_ttl,
        }
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    /// Render the page at `path`, serving it from the cache for `ttl`.
    ///
    /// A missing document is `NotFound` and leaves no cache entry. Empty
    /// markup is returned once and then dropped from the cache.
    #[instrument(skip(self), fields(path = %path))]
    pub async fn get_cached_page(&self, path: &str, ttl: Duration) -> Result<String, PartialError> {
        let key = MemoKey::new(PAGE_NAMESPACE, [path]);
        self.cache
            .memoize(key, ttl, || self.render_page(path))
            .await
    }

    async fn render_page(&self, path: &str) -> Result<String, PartialError> {
        let document = self
            .documents
            .page(path)
            .await?
            .ok_or_else(|| PartialError::not_found(path))?;

        if !document.is_renderable() {
            debug!(kind = %document.kind, "page has nothing to render");
            return Ok(String::new());
        }

        let template = CollectionPageTemplate {
            path: document.path,
            title: document.title,
            body_html: document.body,
        };
        Ok(render_fragment(SOURCE, &template)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collection_paths_follow_route_suffix() {
        assert_eq!(collection_path(None), "/collections");
        assert_eq!(collection_path(Some("")), "/collections");
        assert_eq!(collection_path(Some("/")), "/collections");
        assert_eq!(collection_path(Some("new")), "/collections/new");
        assert_eq!(collection_path(Some("/staff-picks/")), "/collections/staff-picks");
    }
}
