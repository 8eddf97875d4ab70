use std::collections::HashMap;

use thiserror::Error;

use super::{
    FragmentProducer, FragmentRequest, PartialDeps, affiliate_links::AffiliateLinksProducer,
    carousel::CarouselCardProducer, fulltext::FulltextSuggestionProducer,
    related_works::RelatedWorksProducer, search_facets::SearchFacetsProducer,
};

/// Builds a producer bound to one request.
pub type ProducerFactory = fn(&PartialDeps, FragmentRequest) -> Box<dyn FragmentProducer>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("producer `{0}` is registered more than once")]
    Duplicate(String),
    #[error("producer key must not be empty")]
    EmptyKey,
}

/// Immutable map from component key to producer factory.
pub struct ProducerRegistry {
    producers: HashMap<String, ProducerFactory>,
}

impl ProducerRegistry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    /// The five fragment kinds served by `/partials`.
    pub fn standard() -> Result<Self, RegistryError> {
        Self::builder()
            .register("RelatedWorkCarousel", RelatedWorksProducer::factory)
            .register("CarouselLoadMore", CarouselCardProducer::factory)
            .register("AffiliateLinks", AffiliateLinksProducer::factory)
            .register("SearchFacets", SearchFacetsProducer::factory)
            .register("FulltextSearchSuggestion", FulltextSuggestionProducer::factory)
            .build()
    }

    /// Exact, case-sensitive lookup.
    pub fn get(&self, key: &str) -> Option<ProducerFactory> {
        self.producers.get(key).copied()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.producers.contains_key(key)
    }

    /// Registered keys in sorted order.
    pub fn keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.producers.keys().map(String::as_str).collect();
        keys.sort_unstable();
        keys
    }

    pub fn len(&self) -> usize {
        self.producers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.producers.is_empty()
    }
}

#[derive(Default)]
pub struct RegistryBuilder {
    entries: Vec<(String, ProducerFactory)>,
}

impl RegistryBuilder {
    pub fn register(mut self, key: impl Into<String>, factory: ProducerFactory) -> Self {
        self.entries.push((key.into(), factory));
        self
    }

    /// Freeze the registry, rejecting empty and duplicate keys.
    pub fn build(self) -> Result<ProducerRegistry, RegistryError> {
        let mut producers = HashMap::with_capacity(self.entries.len());
        for (key, factory) in self.entries {
            if key.is_empty() {
                return Err(RegistryError::EmptyKey);
            }
            if producers.contains_key(&key) {
                return Err(RegistryError::Duplicate(key));
            }
            producers.insert(key, factory);
        }
        Ok(ProducerRegistry { producers })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_registry_lists_every_component() {
        let registry = ProducerRegistry::standard().expect("standard registry builds");
        assert_eq!(
            registry.keys(),
            vec![
                "AffiliateLinks",
                "CarouselLoadMore",
                "FulltextSearchSuggestion",
                "RelatedWorkCarousel",
                "SearchFacets",
            ]
        );
    }

    #[test]
    fn lookup_is_case_sensitive() {
        let registry = ProducerRegistry::standard().expect("standard registry builds");
        assert!(registry.contains("SearchFacets"));
        assert!(!registry.contains("searchfacets"));
        assert!(registry.get("SearchFacets ").is_none());
    }

    #[test]
    fn duplicate_keys_are_rejected() {
        let result = ProducerRegistry::builder()
            .register("SearchFacets", SearchFacetsProducer::factory)
            .register("SearchFacets", AffiliateLinksProducer::factory)
            .build();
        assert_eq!(
            result.err(),
            Some(RegistryError::Duplicate("SearchFacets".to_string()))
        );
    }

    #[test]
    fn empty_keys_are_rejected() {
        let result = ProducerRegistry::builder()
            .register("", SearchFacetsProducer::factory)
            .build();
        assert_eq!(result.err(), Some(RegistryError::EmptyKey));
    }
}
