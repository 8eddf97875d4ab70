use async_trait::async_trait;
use url::form_urlencoded;

use crate::{
    application::error::PartialError,
    domain::catalog::FulltextHit,
    presentation::views::{FulltextHitView, FulltextSuggestionTemplate, render_fragment},
};

use super::{FragmentProducer, FragmentRequest, PartialDeps, Produced, partials_payload};

const SOURCE: &str = "application::partials::fulltext";

pub const FULLTEXT_CACHE_CONTROL: &str = "public, max-age=300";

/// Rendered in place of suggestions when nothing matched.
pub const EMPTY_SUGGESTION: &str = "<div></div>";

/// Renders "search inside" suggestions for a query (`FulltextSearchSuggestion`).
pub(super) struct FulltextSuggestionProducer {
    deps: PartialDeps,
    request: FragmentRequest,
}

impl FulltextSuggestionProducer {
    pub(super) fn factory(deps: &PartialDeps, request: FragmentRequest) -> Box<dyn FragmentProducer> {
        Box::new(Self {
            deps: deps.clone(),
            request,
        })
    }
}

#[async_trait]
impl FragmentProducer for FulltextSuggestionProducer {
    async fn generate(&self) -> Result<Produced, PartialError> {
        let query = self.request.get_str("data").unwrap_or_default();
        let response = self.deps.fulltext.search(&query).await;

        let markup = if response.hits.is_empty() {
            EMPTY_SUGGESTION.to_string()
        } else {
            let template = FulltextSuggestionTemplate {
                total: response.total,
                hits: response
                    .hits
                    .iter()
                    .map(|hit| hit_view(&query, hit))
                    .collect(),
                search_href: encoded("/search/inside", &query),
                query: query.clone(),
            };
            render_fragment(SOURCE, &template)?
        };

        let produced = Produced::new(partials_payload(markup));
        Ok(match response.error {
            None => produced.with_cache_control(FULLTEXT_CACHE_CONTROL),
            Some(_) => produced,
        })
    }
}

fn encoded(base: &str, query: &str) -> String {
    form_urlencoded::Serializer::new(format!("{base}?"))
        .append_pair("q", query)
        .finish()
}

fn hit_view(query: &str, hit: &FulltextHit) -> FulltextHitView {
    let href = match hit.work_key.as_deref() {
        Some(key) if !key.is_empty() => key.to_string(),
        _ => encoded(
            &format!("https://archive.org/details/{}", hit.identifier),
            query,
        ),
    };
    FulltextHitView {
        title: hit.title.clone(),
        highlight: hit.highlight.clone(),
        href,
    }
}
