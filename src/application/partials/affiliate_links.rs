use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use url::form_urlencoded;

use crate::{
    application::error::PartialError,
    presentation::views::{AffiliateLinkView, AffiliateLinksTemplate, render_fragment},
};

use super::{FragmentProducer, FragmentRequest, PartialDeps, Produced, parse_data, partials_payload};

const SOURCE: &str = "application::partials::affiliate_links";

#[derive(Debug, Deserialize)]
struct AffiliateData {
    #[serde(default)]
    args: Vec<Value>,
}

/// Renders "buy this book" store links (`AffiliateLinks`).
pub(super) struct AffiliateLinksProducer {
    request: FragmentRequest,
}

impl AffiliateLinksProducer {
    pub(super) fn factory(_deps: &PartialDeps, request: FragmentRequest) -> Box<dyn FragmentProducer> {
        Box::new(Self { request })
    }
}

#[async_trait]
impl FragmentProducer for AffiliateLinksProducer {
    async fn generate(&self) -> Result<Produced, PartialError> {
        let data: AffiliateData = parse_data(&self.request)?;
        let [title, options, ..] = data.args.as_slice() else {
            return Err(PartialError::resolution("Unexpected amount of arguments"));
        };

        let title = match title {
            Value::String(text) => text.clone(),
            Value::Null => String::new(),
            other => other.to_string(),
        };
        let isbn = options
            .get("isbn")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|isbn| !isbn.is_empty());

        let template = AffiliateLinksTemplate {
            links: store_links(&title, isbn),
            title,
        };
        let markup = render_fragment(SOURCE, &template)?;
        Ok(Produced::new(partials_payload(markup)))
    }
}

/// Store links for a book, narrowed to the edition when an ISBN is known.
fn store_links(title: &str, isbn: Option<&str>) -> Vec<AffiliateLinkView> {
    let term = isbn.unwrap_or(title);
    let encode = |base: &str, key: &str| {
        form_urlencoded::Serializer::new(format!("{base}?"))
            .append_pair(key, term)
            .finish()
    };

    let better_world_books = match isbn {
        Some(isbn) => format!("https://www.betterworldbooks.com/product/detail/-{isbn}"),
        None => encode("https://www.betterworldbooks.com/search/results", "q"),
    };

    vec![
        AffiliateLinkView {
            store: "Better World Books",
            href: better_world_books,
        },
        AffiliateLinkView {
            store: "Amazon",
            href: encode("https://www.amazon.com/s", "k"),
        },
        AffiliateLinkView {
            store: "Bookshop.org",
            href: encode("https://bookshop.org/search", "keywords"),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn isbn_narrows_links() {
        let links = store_links("Dune", Some("9780441013593"));
        assert_eq!(
            links[0].href,
            "https://www.betterworldbooks.com/product/detail/-9780441013593"
        );
        assert_eq!(links[1].href, "https://www.amazon.com/s?k=9780441013593");
    }

    #[test]
    fn title_is_encoded_without_isbn() {
        let links = store_links("Dune Messiah", None);
        assert_eq!(links[1].href, "https://www.amazon.com/s?k=Dune+Messiah");
        assert_eq!(links.len(), 3);
    }
}
