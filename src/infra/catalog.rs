//! Fixture catalog: an in-memory stand-in for the search, availability,
//! trending, subject, full-text and document backends, loaded from TOML.
//!
//! ```toml
//! [[works]]
//! key = "/works/OL45W"
//! title = "Dune"
//! author_name = ["Frank Herbert"]
//! subject = ["Science fiction"]
//! popularity = 12
//! availability = { status = "borrowable", identifier = "dune00herb" }
//!
//! [[pages]]
//! path = "/collections"
//! title = "Collections"
//! body = "<p>Staff picks</p>"
//! ```

use std::cmp::Reverse;
use std::collections::BTreeMap;
use std::path::Path;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::info;

use crate::{
    application::repos::{
        AvailabilityIndex, BackendError, BrowseRequest, DocumentStore, FacetSearchRequest,
        FulltextIndex, SubjectIndex, SubjectRequest, TrendingRequest, TrendingStats, WorkSearch,
        WorkSearchRequest,
    },
    domain::catalog::{
        AvailabilityStatus, BrowseResponse, FacetCount, FulltextHit, FulltextResponse,
        PageDocument, SearchResponse, SubjectRecord, WorkDoc,
    },
};

use super::error::InfraError;

const MAX_FULLTEXT_HITS: usize = 5;

#[derive(Debug, Clone, Deserialize)]
struct FixtureWork {
    #[serde(flatten)]
    doc: WorkDoc,
    #[serde(default)]
    popularity: u32,
}

#[derive(Debug, Clone, Deserialize)]
struct FixtureSubject {
    key: String,
    name: String,
}

#[derive(Debug, Clone, Deserialize)]
struct FixtureText {
    identifier: String,
    title: String,
    text: String,
    #[serde(default)]
    work_key: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FixtureFile {
    works: Vec<FixtureWork>,
    pages: Vec<PageDocument>,
    subjects: Vec<FixtureSubject>,
    fulltext: Vec<FixtureText>,
}

/// Catalog backends served from a fixture file.
#[derive(Debug, Default)]
pub struct FixtureCatalog {
    works: Vec<FixtureWork>,
    pages: BTreeMap<String, PageDocument>,
    subjects: Vec<FixtureSubject>,
    fulltext: Vec<FixtureText>,
}

impl FixtureCatalog {
    pub fn from_toml_str(raw: &str) -> Result<Self, InfraError> {
        let file: FixtureFile = toml::from_str(raw)
            .map_err(|err| InfraError::catalog(format!("failed to parse fixture: {err}")))?;

        let mut pages = BTreeMap::new();
        for page in file.pages {
            if pages.contains_key(&page.path) {
                return Err(InfraError::catalog(format!(
                    "page `{}` is defined more than once",
                    page.path
                )));
            }
            pages.insert(page.path.clone(), page);
        }

        Ok(Self {
            works: file.works,
            pages,
            subjects: file.subjects,
            fulltext: file.fulltext,
        })
    }

    pub async fn load(path: &Path) -> Result<Self, InfraError> {
        let raw = tokio::fs::read_to_string(path).await?;
        let catalog = Self::from_toml_str(&raw)?;
        info!(
            target = "stacks::catalog",
            path = %path.display(),
            works = catalog.works.len(),
            pages = catalog.pages.len(),
            "fixture catalog loaded"
        );
        Ok(catalog)
    }

    fn matching<'a>(&'a self, query: &'a Query) -> impl Iterator<Item = &'a FixtureWork> + 'a {
        self.works.iter().filter(move |work| query.matches(&work.doc))
    }
}

/// Skip `(page - 1) * limit` records and keep `limit`.
fn paginate<T>(items: Vec<T>, page: u32, limit: u32) -> Vec<T> {
    let page = page.max(1) as usize;
    let limit = limit as usize;
    items
        .into_iter()
        .skip((page - 1).saturating_mul(limit))
        .take(limit)
        .collect()
}

fn sort_works(works: &mut [WorkDoc], sort: Option<&str>) {
    match sort {
        Some("new") => works.sort_by_key(|work| Reverse(work.first_publish_year)),
        Some("old") => works.sort_by_key(|work| work.first_publish_year),
        Some("title") => works.sort_by(|a, b| a.title.cmp(&b.title)),
        Some("key") => works.sort_by(|a, b| a.key.cmp(&b.key)),
        _ => {}
    }
}

fn normalize_subject(raw: &str) -> String {
    raw.trim()
        .trim_start_matches("/subjects/")
        .to_lowercase()
        .replace(' ', "_")
}

/// A parsed free-text query: plain terms plus `field:value` filters.
/// Negated clauses (`-key:""`) are ignored.
#[derive(Debug, Default)]
struct Query {
    terms: Vec<String>,
    fields: Vec<(String, String)>,
}

impl Query {
    fn parse(raw: &str) -> Self {
        let mut query = Self::default();
        for token in tokenize(raw) {
            if token.starts_with('-') {
                continue;
            }
            match token.split_once(':') {
                Some((field, value)) => {
                    let value = value.trim_matches('"').to_lowercase();
                    if !value.is_empty() {
                        query.fields.push((field.to_string(), value));
                    }
                }
                None => query.terms.push(token.to_lowercase()),
            }
        }
        query
    }

    fn with_field(mut self, field: &str, value: &str) -> Self {
        let value = value.trim().to_lowercase();
        if !value.is_empty() {
            self.fields.push((field.to_string(), value));
        }
        self
    }

    fn matches(&self, work: &WorkDoc) -> bool {
        let haystack = format!(
            "{} {} {} {}",
            work.title,
            work.subtitle.as_deref().unwrap_or(""),
            work.author_name.join(" "),
            work.subject.join(" ")
        )
        .to_lowercase();

        self.terms.iter().all(|term| haystack.contains(term.as_str()))
            && self
                .fields
                .iter()
                .all(|(field, value)| field_matches(work, field, value))
    }
}

fn field_matches(work: &WorkDoc, field: &str, value: &str) -> bool {
    let any_eq = |values: &[String]| values.iter().any(|candidate| candidate.to_lowercase() == value);
    match field {
        "subject" | "subject_facet" | "subject_key" => {
            work.subject.iter().any(|subject| {
                subject.to_lowercase() == value || normalize_subject(subject) == value
            })
        }
        "author" | "author_name" | "author_facet" => any_eq(&work.author_name),
        "title" => work.title.to_lowercase().contains(value),
        "key" => work.key.to_lowercase() == value,
        "first_publish_year" => work
            .first_publish_year
            .is_some_and(|year| year.to_string() == value),
        "has_fulltext" => work.has_fulltext.to_string() == value,
        _ => true,
    }
}

/// Split on whitespace, keeping double-quoted runs together.
fn tokenize(raw: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut quoted = false;
    for ch in raw.chars() {
        match ch {
            '"' => {
                quoted = !quoted;
                current.push(ch);
            }
            ch if ch.is_whitespace() && !quoted => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
            }
            ch => current.push(ch),
        }
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    tokens
}

fn facet_counts<F>(works: &[&FixtureWork], values: F) -> Vec<FacetCount>
where
    F: Fn(&WorkDoc) -> Vec<String>,
{
    let mut counts: BTreeMap<String, u64> = BTreeMap::new();
    for work in works {
        for value in values(&work.doc) {
            *counts.entry(value).or_default() += 1;
        }
    }
    let mut counts: Vec<FacetCount> = counts
        .into_iter()
        .map(|(value, count)| FacetCount { value, count })
        .collect();
    counts.sort_by_key(|facet| Reverse(facet.count));
    counts
}

#[async_trait]
impl WorkSearch for FixtureCatalog {
    async fn work_search(
        &self,
        request: &WorkSearchRequest,
    ) -> Result<SearchResponse, BackendError> {
        let query = Query::parse(&request.q);
        let mut docs: Vec<WorkDoc> = self
            .matching(&query)
            .filter(|work| !request.has_fulltext || work.doc.has_fulltext)
            .map(|work| work.doc.clone())
            .collect();
        let num_found = docs.len() as u64;
        sort_works(&mut docs, request.sort.split(',').map(str::trim).next());

        Ok(SearchResponse {
            num_found,
            docs: paginate(docs, request.offset, request.limit),
            facet_counts: BTreeMap::new(),
        })
    }

    async fn facet_search(
        &self,
        request: &FacetSearchRequest,
    ) -> Result<SearchResponse, BackendError> {
        let q = request.param.get("q").map(|values| values.join(" "));
        let mut query = Query::parse(q.as_deref().unwrap_or(""));
        for (field, values) in request.param.iter().filter(|(field, _)| *field != "q") {
            for value in values {
                query = query.with_field(field, value);
            }
        }

        let matched: Vec<&FixtureWork> = self.matching(&query).collect();
        let mut facet_map = BTreeMap::new();
        if request.facet {
            facet_map.insert(
                "has_fulltext".to_string(),
                facet_counts(&matched, |work| vec![work.has_fulltext.to_string()]),
            );
            facet_map.insert(
                "author_facet".to_string(),
                facet_counts(&matched, |work| work.author_name.clone()),
            );
            facet_map.insert(
                "subject_facet".to_string(),
                facet_counts(&matched, |work| work.subject.clone()),
            );
            facet_map.insert(
                "first_publish_year".to_string(),
                facet_counts(&matched, |work| {
                    work.first_publish_year
                        .map(|year| year.to_string())
                        .into_iter()
                        .collect()
                }),
            );
        }

        let mut docs: Vec<WorkDoc> = matched.iter().map(|work| work.doc.clone()).collect();
        sort_works(&mut docs, request.sort.as_deref());

        Ok(SearchResponse {
            num_found: matched.len() as u64,
            docs: docs.into_iter().take(request.rows as usize).collect(),
            facet_counts: facet_map,
        })
    }
}

#[async_trait]
impl AvailabilityIndex for FixtureCatalog {
    async fn available(&self, request: &BrowseRequest) -> BrowseResponse {
        let query = Query::parse(&request.query).with_field("subject", &request.subject);
        let mut docs: Vec<WorkDoc> = self
            .matching(&query)
            .filter(|work| {
                matches!(
                    work.doc.availability.as_ref().map(|a| a.status),
                    Some(AvailabilityStatus::Open | AvailabilityStatus::Borrowable)
                )
            })
            .map(|work| work.doc.clone())
            .collect();
        sort_works(&mut docs, request.sorts.first().map(String::as_str));

        BrowseResponse {
            docs: paginate(docs, request.page, request.limit),
            error: None,
        }
    }
}

#[async_trait]
impl TrendingStats for FixtureCatalog {
    async fn trending(&self, request: &TrendingRequest) -> Result<Vec<WorkDoc>, BackendError> {
        let mut trending: Vec<&FixtureWork> = self
            .works
            .iter()
            .filter(|work| work.popularity >= request.minimum)
            .collect();
        trending.sort_by(|a, b| b.popularity.cmp(&a.popularity).then(a.doc.key.cmp(&b.doc.key)));

        let docs = trending.into_iter().map(|work| work.doc.clone()).collect();
        Ok(paginate(docs, request.page, request.limit))
    }
}

#[async_trait]
impl SubjectIndex for FixtureCatalog {
    async fn subject(&self, request: &SubjectRequest) -> Result<SubjectRecord, BackendError> {
        let key = normalize_subject(&request.key);
        if key.is_empty() {
            return Err(BackendError::query("subject key must not be empty"));
        }

        let name = self
            .subjects
            .iter()
            .find(|subject| normalize_subject(&subject.key) == key)
            .map(|subject| subject.name.clone())
            .unwrap_or_else(|| key.replace('_', " "));

        let works: Vec<WorkDoc> = self
            .works
            .iter()
            .filter(|work| {
                work.doc
                    .subject
                    .iter()
                    .any(|subject| normalize_subject(subject) == key)
            })
            .map(|work| work.doc.clone())
            .collect();

        Ok(SubjectRecord {
            key: format!("/subjects/{key}"),
            name,
            work_count: works.len() as u64,
            works: paginate(works, request.offset, request.limit),
        })
    }
}

#[async_trait]
impl FulltextIndex for FixtureCatalog {
    async fn search(&self, query: &str) -> FulltextResponse {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return FulltextResponse {
                error: Some("empty full-text query".to_string()),
                ..Default::default()
            };
        }

        let hits: Vec<FulltextHit> = self
            .fulltext
            .iter()
            .filter(|entry| entry.text.to_lowercase().contains(&needle))
            .map(|entry| FulltextHit {
                identifier: entry.identifier.clone(),
                title: entry.title.clone(),
                highlight: entry.text.clone(),
                work_key: entry.work_key.clone(),
            })
            .collect();

        FulltextResponse {
            total: hits.len() as u64,
            hits: hits.into_iter().take(MAX_FULLTEXT_HITS).collect(),
            error: None,
        }
    }
}

#[async_trait]
impl DocumentStore for FixtureCatalog {
    async fn page(&self, path: &str) -> Result<Option<PageDocument>, BackendError> {
        Ok(self.pages.get(path).cloned())
    }

    async fn work(&self, key: &str) -> Result<Option<WorkDoc>, BackendError> {
        Ok(self
            .works
            .iter()
            .find(|work| work.doc.key == key)
            .map(|work| work.doc.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIXTURE: &str = r#"
[[works]]
key = "/works/OL1W"
title = "Dune"
author_name = ["Frank Herbert"]
subject = ["Science fiction", "Deserts"]
first_publish_year = 1965
has_fulltext = true
popularity = 12
availability = { status = "borrowable", identifier = "dune00herb" }

[[works]]
key = "/works/OL2W"
title = "The Left Hand of Darkness"
author_name = ["Ursula K. Le Guin"]
subject = ["Science fiction"]
first_publish_year = 1969
popularity = 2

[[pages]]
path = "/collections"
title = "Collections"
body = "<p>Staff picks</p>"

[[fulltext]]
identifier = "dune00herb"
title = "Dune"
text = "The spice must flow"
"#;

    fn catalog() -> FixtureCatalog {
        FixtureCatalog::from_toml_str(FIXTURE).expect("fixture parses")
    }

    #[test]
    fn tokenizer_keeps_quoted_runs() {
        assert_eq!(
            tokenize(r#"subject:"Science fiction" -key:"" dune"#),
            vec![
                r#"subject:"Science fiction""#.to_string(),
                r#"-key:"""#.to_string(),
                "dune".to_string(),
            ]
        );
    }

    #[test]
    fn duplicate_pages_are_rejected() {
        let raw = "[[pages]]\npath = \"/a\"\n[[pages]]\npath = \"/a\"\n";
        assert!(FixtureCatalog::from_toml_str(raw).is_err());
    }

    #[tokio::test]
    async fn search_matches_subject_clause_and_sorts_newest_first() {
        let request = WorkSearchRequest {
            q: r#"subject:"Science fiction" -key:"""#.to_string(),
            fields: Vec::new(),
            has_fulltext: false,
            sort: "new".to_string(),
            limit: 10,
            offset: 1,
            facet: false,
        };
        let response = catalog().work_search(&request).await.expect("search runs");
        let keys: Vec<&str> = response.docs.iter().map(|doc| doc.key.as_str()).collect();
        assert_eq!(keys, vec!["/works/OL2W", "/works/OL1W"]);
    }

    #[tokio::test]
    async fn search_orders_by_the_leading_sort_key() {
        let request = WorkSearchRequest {
            q: String::new(),
            fields: Vec::new(),
            has_fulltext: false,
            sort: "old,title".to_string(),
            limit: 10,
            offset: 1,
            facet: false,
        };
        let response = catalog().work_search(&request).await.expect("search runs");
        let keys: Vec<&str> = response.docs.iter().map(|doc| doc.key.as_str()).collect();
        assert_eq!(keys, vec!["/works/OL1W", "/works/OL2W"]);
    }

    #[tokio::test]
    async fn trending_respects_minimum() {
        let request = TrendingRequest {
            minimum: 3,
            limit: 18,
            page: 1,
            books_only: true,
            sort_by_count: false,
        };
        let docs = catalog().trending(&request).await.expect("trending runs");
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].key, "/works/OL1W");
    }

    #[tokio::test]
    async fn browse_lists_only_lendable_works() {
        let request = BrowseRequest {
            query: String::new(),
            subject: "science fiction".to_string(),
            limit: 18,
            page: 1,
            sorts: Vec::new(),
        };
        let response = catalog().available(&request).await;
        assert!(response.error.is_none());
        assert_eq!(response.docs.len(), 1);
    }

    #[tokio::test]
    async fn subjects_resolve_pseudo_keys() {
        let request = SubjectRequest {
            key: "science_fiction".to_string(),
            offset: 1,
            limit: 1,
        };
        let record = catalog().subject(&request).await.expect("subject runs");
        assert_eq!(record.work_count, 2);
        assert_eq!(record.works.len(), 1);
        assert_eq!(record.name, "science fiction");
    }

    #[tokio::test]
    async fn blank_fulltext_query_reports_error() {
        let response = catalog().search("   ").await;
        assert!(response.error.is_some());
        let response = catalog().search("SPICE").await;
        assert_eq!(response.total, 1);
    }

    #[tokio::test]
    async fn documents_are_looked_up_by_path() {
        let catalog = catalog();
        assert!(catalog.page("/collections").await.expect("lookup").is_some());
        assert!(catalog.page("/collections/new").await.expect("lookup").is_none());
        assert!(catalog.work("/works/OL1W").await.expect("lookup").is_some());
    }
}
