use askama::{Error as AskamaError, Template};
use thiserror::Error;

#[derive(Debug, Error)]
#[error("{public_message}")]
pub struct TemplateRenderError {
    pub(crate) source: &'static str,
    pub(crate) public_message: &'static str,
    #[source]
    pub(crate) error: AskamaError,
}

impl TemplateRenderError {
    pub fn new(source: &'static str, public_message: &'static str, error: AskamaError) -> Self {
        Self {
            source,
            public_message,
            error,
        }
    }

    /// Module that attempted the render.
    pub fn source_module(&self) -> &'static str {
        self.source
    }
}

/// Render a fragment template to markup.
pub fn render_fragment<T: Template>(
    source: &'static str,
    template: &T,
) -> Result<String, TemplateRenderError> {
    template
        .render()
        .map_err(|err| TemplateRenderError::new(source, "Fragment rendering failed", err))
}

// ============================================================================
// Carousels
// ============================================================================

#[derive(Clone)]
pub struct CarouselCard {
    pub key: String,
    pub title: String,
    pub subtitle: Option<String>,
    pub authors: String,
    pub cover_url: Option<String>,
    pub read_href: Option<String>,
    pub read_label: &'static str,
}

#[derive(Template)]
#[template(path = "partials/carousel_card.html")]
pub struct CarouselCardTemplate {
    pub card: CarouselCard,
    pub lazy: bool,
    pub layout: Option<String>,
    pub carousel_key: String,
}

#[derive(Clone)]
pub struct SubjectCarouselView {
    pub name: String,
    pub query: String,
    pub load_more_href: String,
}

pub struct RelatedWorkView {
    pub key: String,
    pub title: String,
    pub carousels: Vec<SubjectCarouselView>,
}

#[derive(Template)]
#[template(path = "partials/related_works.html")]
pub struct RelatedWorksTemplate {
    pub work: RelatedWorkView,
}

// ============================================================================
// Affiliate links
// ============================================================================

#[derive(Clone)]
pub struct AffiliateLinkView {
    pub store: &'static str,
    pub href: String,
}

#[derive(Template)]
#[template(path = "partials/affiliate_links.html")]
pub struct AffiliateLinksTemplate {
    pub title: String,
    pub links: Vec<AffiliateLinkView>,
}

// ============================================================================
// Search facets
// ============================================================================

#[derive(Clone)]
pub struct FacetValueView {
    pub label: String,
    pub count: u64,
    pub href: String,
    pub selected: bool,
}

#[derive(Clone)]
pub struct FacetGroupView {
    pub key: String,
    pub label: &'static str,
    pub values: Vec<FacetValueView>,
}

#[derive(Template)]
#[template(path = "search/facets.html")]
pub struct SearchFacetsTemplate {
    pub path: String,
    pub groups: Vec<FacetGroupView>,
    pub async_load: bool,
}

#[derive(Clone)]
pub struct FacetChipView {
    pub label: String,
    pub value: String,
    pub remove_href: String,
}

#[derive(Template)]
#[template(path = "search/selected_facets.html")]
pub struct SelectedFacetsTemplate {
    pub q: String,
    pub num_found: u64,
    pub chips: Vec<FacetChipView>,
}

// ============================================================================
// Full-text suggestions
// ============================================================================

#[derive(Clone)]
pub struct FulltextHitView {
    pub title: String,
    pub highlight: String,
    pub href: String,
}

#[derive(Template)]
#[template(path = "partials/fulltext_suggestion.html")]
pub struct FulltextSuggestionTemplate {
    pub query: String,
    pub total: u64,
    pub hits: Vec<FulltextHitView>,
    pub search_href: String,
}

// ============================================================================
// Collection pages
// ============================================================================

#[derive(Template)]
#[template(path = "collections/page.html")]
pub struct CollectionPageTemplate {
    pub path: String,
    pub title: String,
    pub body_html: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn card() -> CarouselCard {
        CarouselCard {
            key: "/works/OL45W".to_string(),
            title: "The Left Hand of Darkness".to_string(),
            subtitle: None,
            authors: "Ursula K. Le Guin".to_string(),
            cover_url: Some("https://covers.openlibrary.org/b/id/1-M.jpg".to_string()),
            read_href: None,
            read_label: "Borrow",
        }
    }

    #[test]
    fn carousel_card_marks_lazy_images() {
        let eager = render_fragment(
            "test",
            &CarouselCardTemplate {
                card: card(),
                lazy: false,
                layout: None,
                carousel_key: "trending".to_string(),
            },
        )
        .expect("card renders");
        let lazy = render_fragment(
            "test",
            &CarouselCardTemplate {
                card: card(),
                lazy: true,
                layout: Some("carousel".to_string()),
                carousel_key: "trending".to_string(),
            },
        )
        .expect("card renders");

        assert!(eager.contains("The Left Hand of Darkness"));
        assert!(!eager.contains("loading=\"lazy\""));
        assert!(lazy.contains("loading=\"lazy\""));
        assert!(lazy.contains("book--carousel"));
    }

    #[test]
    fn escapes_user_supplied_text() {
        let html = render_fragment(
            "test",
            &AffiliateLinksTemplate {
                title: "<script>alert(1)</script>".to_string(),
                links: Vec::new(),
            },
        )
        .expect("links render");
        assert!(!html.contains("<script>"));
    }

    #[test]
    fn collection_page_embeds_body_markup() {
        let html = render_fragment(
            "test",
            &CollectionPageTemplate {
                path: "/collections".to_string(),
                title: "Collections".to_string(),
                body_html: "<p>Staff picks</p>".to_string(),
            },
        )
        .expect("page renders");
        assert!(html.contains("<p>Staff picks</p>"));
        assert!(html.contains("Collections"));
    }
}
