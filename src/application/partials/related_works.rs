use async_trait::async_trait;
use serde_json::{Map, Value};
use url::form_urlencoded;

use crate::{
    application::error::PartialError,
    cache::MemoKey,
    domain::catalog::WorkDoc,
    presentation::views::{
        RelatedWorkView, RelatedWorksTemplate, SubjectCarouselView, render_fragment,
    },
};

use super::{FragmentProducer, FragmentRequest, PartialDeps, Produced};

const SOURCE: &str = "application::partials::related_works";

/// Memoization namespace for rendered related-works carousels.
pub const RELATED_CAROUSELS_NAMESPACE: &str = "book.bookspage.component.relatedcarousels";

const MAX_SUBJECT_CAROUSELS: usize = 4;

/// Renders the related works carousels for a work page (`RelatedWorkCarousel`).
pub(super) struct RelatedWorksProducer {
    deps: PartialDeps,
    request: FragmentRequest,
}

impl RelatedWorksProducer {
    pub(super) fn factory(deps: &PartialDeps, request: FragmentRequest) -> Box<dyn FragmentProducer> {
        Box::new(Self {
            deps: deps.clone(),
            request,
        })
    }

    async fn render(&self, workid: &str) -> Result<String, PartialError> {
        let key = format!("/works/{workid}");
        let work = self.deps.documents.work(&key).await?.unwrap_or_default();
        let template = RelatedWorksTemplate {
            work: related_view(&work),
        };
        Ok(render_fragment(SOURCE, &template)?)
    }

    /// Serve the memoized markup, re-rendering and re-storing it when the
    /// stored value is empty.
    async fn render_cached(&self, workid: &str) -> Result<String, PartialError> {
        let cache = &self.deps.cache;
        let ttl = self.deps.cache_config.widget_ttl();
        let key = MemoKey::new(RELATED_CAROUSELS_NAMESPACE, [workid]);

        let markup: String = cache
            .memoize(key.clone(), ttl, || self.render(workid))
            .await?;
        if !markup.is_empty() {
            return Ok(markup);
        }

        let fresh = self.render(workid).await?;
        if !fresh.is_empty() {
            cache.insert(key, Value::String(fresh.clone()), ttl);
        }
        Ok(fresh)
    }
}

#[async_trait]
impl FragmentProducer for RelatedWorksProducer {
    async fn generate(&self) -> Result<Produced, PartialError> {
        let workid = self.request.get_str("workid").unwrap_or_default();

        let markup = if self.deps.cache_config.enable_widget_cache {
            self.render_cached(&workid).await?
        } else {
            self.render(&workid).await?
        };

        let mut payload = Map::new();
        payload.insert("0".to_string(), Value::String(markup));
        Ok(Produced::new(payload))
    }
}

fn related_view(work: &WorkDoc) -> RelatedWorkView {
    let carousels = work
        .subject
        .iter()
        .filter(|subject| !subject.trim().is_empty())
        .take(MAX_SUBJECT_CAROUSELS)
        .map(|subject| {
            let query = subject_query(subject);
            let load_more_href = form_urlencoded::Serializer::new(String::from("/partials?"))
                .append_pair("_component", "CarouselLoadMore")
                .append_pair("queryType", "SEARCH")
                .append_pair("q", &query)
                .append_pair("hasFulltextOnly", "true")
                .finish();
            SubjectCarouselView {
                name: subject.clone(),
                query,
                load_more_href,
            }
        })
        .collect();

    RelatedWorkView {
        key: work.key.clone(),
        title: work.title.clone(),
        carousels,
    }
}

fn subject_query(subject: &str) -> String {
    let escaped = subject.replace('"', "");
    format!("subject:\"{escaped}\" -key:\"\"")
}
