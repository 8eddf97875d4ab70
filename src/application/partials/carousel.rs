use async_trait::async_trait;
use serde_json::Value;

use crate::{
    application::{
        error::PartialError,
        queries::{QueryKind, QueryParams},
    },
    domain::catalog::{AvailabilityStatus, WorkDoc},
    presentation::views::{CarouselCard, CarouselCardTemplate, render_fragment},
};

use super::{FragmentProducer, FragmentRequest, PartialDeps, Produced, partials_payload};

const SOURCE: &str = "application::partials::carousel";

/// Cards at or below this index load their cover eagerly.
const EAGER_CARDS: usize = 5;

/// Renders the next page of a carousel (`CarouselLoadMore`).
pub(super) struct CarouselCardProducer {
    deps: PartialDeps,
    request: FragmentRequest,
}

impl CarouselCardProducer {
    pub(super) fn factory(deps: &PartialDeps, request: FragmentRequest) -> Box<dyn FragmentProducer> {
        Box::new(Self {
            deps: deps.clone(),
            request,
        })
    }
}

#[async_trait]
impl FragmentProducer for CarouselCardProducer {
    async fn generate(&self) -> Result<Produced, PartialError> {
        let raw_kind = self.request.get_str("queryType").unwrap_or_default();
        let kind = QueryKind::parse(&raw_kind)
            .ok_or_else(|| PartialError::UnknownQueryType(raw_kind.clone()))?;
        let params = QueryParams::from_request(&self.request, kind.default_limit());

        let works = self.deps.queries.run(kind, &params).await?;

        let layout = self
            .request
            .get_str("layout")
            .filter(|layout| !layout.is_empty());
        let carousel_key = self.request.get_str("key").unwrap_or_default();

        let cards = works
            .iter()
            .enumerate()
            .map(|(index, work)| {
                let template = CarouselCardTemplate {
                    card: card_for(work),
                    lazy: index > EAGER_CARDS,
                    layout: layout.clone(),
                    carousel_key: carousel_key.clone(),
                };
                render_fragment(SOURCE, &template).map(Value::String)
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Produced::new(partials_payload(cards)))
    }
}

fn card_for(work: &WorkDoc) -> CarouselCard {
    let identifier = work
        .availability
        .as_ref()
        .and_then(|availability| availability.identifier.clone())
        .or_else(|| work.ia.first().cloned());
    let status = work.availability.as_ref().map(|availability| availability.status);

    let (read_href, read_label) = match (status, identifier) {
        (Some(AvailabilityStatus::Open), Some(id)) => {
            (Some(format!("https://archive.org/details/{id}")), "Read")
        }
        (Some(AvailabilityStatus::Borrowable), Some(id)) => {
            (Some(format!("/borrow/ia/{id}")), "Borrow")
        }
        (Some(AvailabilityStatus::CheckedOut), _) => (None, "Join Waitlist"),
        _ if work.has_external_ebook() => (Some(format!("{}#ebooks", work.key)), "Read"),
        _ => (None, "Learn More"),
    };

    CarouselCard {
        key: work.key.clone(),
        title: work.title.clone(),
        subtitle: work.subtitle.clone().filter(|subtitle| !subtitle.is_empty()),
        authors: work.author_name.join(", "),
        cover_url: work.cover_url('M'),
        read_href,
        read_label,
    }
}

#[cfg(test)]
mod tests {
    use crate::domain::catalog::Availability;

    use super::*;

    fn work() -> WorkDoc {
        WorkDoc {
            key: "/works/OL45W".to_string(),
            title: "Dune".to_string(),
            author_name: vec!["Frank Herbert".to_string()],
            ia: vec!["dune00herb".to_string()],
            ..Default::default()
        }
    }

    #[test]
    fn open_works_link_to_reader() {
        let mut work = work();
        work.availability = Some(Availability {
            status: AvailabilityStatus::Open,
            identifier: None,
        });
        let card = card_for(&work);
        assert_eq!(
            card.read_href.as_deref(),
            Some("https://archive.org/details/dune00herb")
        );
        assert_eq!(card.read_label, "Read");
    }

    #[test]
    fn borrowable_works_prefer_availability_identifier() {
        let mut work = work();
        work.availability = Some(Availability {
            status: AvailabilityStatus::Borrowable,
            identifier: Some("dune1965".to_string()),
        });
        let card = card_for(&work);
        assert_eq!(card.read_href.as_deref(), Some("/borrow/ia/dune1965"));
        assert_eq!(card.read_label, "Borrow");
    }

    #[test]
    fn works_without_availability_fall_back_to_details() {
        let card = card_for(&work());
        assert!(card.read_href.is_none());
        assert_eq!(card.read_label, "Learn More");
        assert_eq!(card.authors, "Frank Herbert");
    }
}
