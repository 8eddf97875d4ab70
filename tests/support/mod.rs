//! Recording fake backends shared by the integration tests.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use stacks::{
    application::{
        collections::CollectionPageService,
        partials::{PartialDeps, PartialResolver, ProducerRegistry},
        queries::QueryBackends,
        repos::{
            AvailabilityIndex, BackendError, BrowseRequest, DocumentStore, FacetSearchRequest,
            FulltextIndex, SubjectIndex, SubjectRequest, TrendingRequest, TrendingStats,
            WorkSearch, WorkSearchRequest,
        },
    },
    cache::{CacheConfig, FragmentCache},
    domain::catalog::{
        BrowseResponse, FulltextResponse, PageDocument, SearchResponse, SubjectRecord, WorkDoc,
    },
};

pub fn work(n: usize) -> WorkDoc {
    WorkDoc {
        key: format!("/works/OL{n}W"),
        title: format!("Work {n}"),
        author_name: vec![format!("Author {n}")],
        cover_i: Some(n as i64 + 1),
        ..Default::default()
    }
}

pub fn page(path: &str, body: &str) -> PageDocument {
    PageDocument {
        path: path.to_string(),
        kind: "/type/page".to_string(),
        title: "Collections".to_string(),
        body: body.to_string(),
    }
}

fn paginate(works: &[WorkDoc], page: u32, limit: u32) -> Vec<WorkDoc> {
    let skip = (page.max(1) as usize - 1) * limit as usize;
    works.iter().skip(skip).take(limit as usize).cloned().collect()
}

/// In-memory backend that records every request it receives.
#[derive(Default)]
pub struct FakeCatalog {
    pub works: Vec<WorkDoc>,
    pub popularity: Vec<u32>,
    pub browse_error: Option<String>,
    pub search_error: Option<String>,
    pub facet_response: SearchResponse,
    pub fulltext: FulltextResponse,
    pub pages: Mutex<BTreeMap<String, PageDocument>>,
    pub related: BTreeMap<String, WorkDoc>,

    pub search_calls: Mutex<Vec<WorkSearchRequest>>,
    pub facet_calls: Mutex<Vec<FacetSearchRequest>>,
    pub browse_calls: Mutex<Vec<BrowseRequest>>,
    pub trending_calls: Mutex<Vec<TrendingRequest>>,
    pub subject_calls: Mutex<Vec<SubjectRequest>>,
    pub fulltext_calls: Mutex<Vec<String>>,
    pub page_fetches: AtomicUsize,
    pub work_fetches: AtomicUsize,
}

impl FakeCatalog {
    pub fn with_works(count: usize) -> Self {
        Self {
            works: (0..count).map(work).collect(),
            ..Default::default()
        }
    }

    pub fn set_page(&self, document: PageDocument) {
        self.pages
            .lock()
            .expect("pages lock")
            .insert(document.path.clone(), document);
    }

    pub fn remove_page(&self, path: &str) {
        self.pages.lock().expect("pages lock").remove(path);
    }

    pub fn page_fetches(&self) -> usize {
        self.page_fetches.load(Ordering::SeqCst)
    }

    pub fn work_fetches(&self) -> usize {
        self.work_fetches.load(Ordering::SeqCst)
    }

    pub fn backend_calls(&self) -> usize {
        self.search_calls.lock().expect("lock").len()
            + self.facet_calls.lock().expect("lock").len()
            + self.browse_calls.lock().expect("lock").len()
            + self.trending_calls.lock().expect("lock").len()
            + self.subject_calls.lock().expect("lock").len()
            + self.fulltext_calls.lock().expect("lock").len()
            + self.page_fetches()
            + self.work_fetches()
    }
}

#[async_trait]
impl WorkSearch for FakeCatalog {
    async fn work_search(
        &self,
        request: &WorkSearchRequest,
    ) -> Result<SearchResponse, BackendError> {
        self.search_calls
            .lock()
            .expect("lock")
            .push(request.clone());
        if let Some(error) = &self.search_error {
            return Err(BackendError::query(error.clone()));
        }
        Ok(SearchResponse {
            num_found: self.works.len() as u64,
            docs: paginate(&self.works, request.offset, request.limit),
            facet_counts: BTreeMap::new(),
        })
    }

    async fn facet_search(
        &self,
        request: &FacetSearchRequest,
    ) -> Result<SearchResponse, BackendError> {
        self.facet_calls.lock().expect("lock").push(request.clone());
        Ok(self.facet_response.clone())
    }
}

#[async_trait]
impl AvailabilityIndex for FakeCatalog {
    async fn available(&self, request: &BrowseRequest) -> BrowseResponse {
        self.browse_calls
            .lock()
            .expect("lock")
            .push(request.clone());
        BrowseResponse {
            docs: paginate(&self.works, request.page, request.limit),
            error: self.browse_error.clone(),
        }
    }
}

#[async_trait]
impl TrendingStats for FakeCatalog {
    async fn trending(&self, request: &TrendingRequest) -> Result<Vec<WorkDoc>, BackendError> {
        self.trending_calls
            .lock()
            .expect("lock")
            .push(request.clone());
        let popular: Vec<WorkDoc> = self
            .works
            .iter()
            .zip(self.popularity.iter())
            .filter(|(_, popularity)| **popularity >= request.minimum)
            .map(|(work, _)| work.clone())
            .collect();
        Ok(paginate(&popular, request.page, request.limit))
    }
}

#[async_trait]
impl SubjectIndex for FakeCatalog {
    async fn subject(&self, request: &SubjectRequest) -> Result<SubjectRecord, BackendError> {
        self.subject_calls
            .lock()
            .expect("lock")
            .push(request.clone());
        Ok(SubjectRecord {
            key: format!("/subjects/{}", request.key),
            name: request.key.clone(),
            work_count: self.works.len() as u64,
            works: paginate(&self.works, request.offset, request.limit),
        })
    }
}

#[async_trait]
impl FulltextIndex for FakeCatalog {
    async fn search(&self, query: &str) -> FulltextResponse {
        self.fulltext_calls
            .lock()
            .expect("lock")
            .push(query.to_string());
        self.fulltext.clone()
    }
}

#[async_trait]
impl DocumentStore for FakeCatalog {
    async fn page(&self, path: &str) -> Result<Option<PageDocument>, BackendError> {
        self.page_fetches.fetch_add(1, Ordering::SeqCst);
        Ok(self.pages.lock().expect("pages lock").get(path).cloned())
    }

    async fn work(&self, key: &str) -> Result<Option<WorkDoc>, BackendError> {
        self.work_fetches.fetch_add(1, Ordering::SeqCst);
        Ok(self.related.get(key).cloned())
    }
}

pub fn deps(catalog: &Arc<FakeCatalog>, cache_config: CacheConfig) -> PartialDeps {
    PartialDeps {
        queries: QueryBackends {
            search: catalog.clone(),
            availability: catalog.clone(),
            trending: catalog.clone(),
            subjects: catalog.clone(),
        },
        fulltext: catalog.clone(),
        documents: catalog.clone(),
        cache: Arc::new(FragmentCache::new(&cache_config)),
        cache_config,
    }
}

pub fn resolver(catalog: &Arc<FakeCatalog>) -> PartialResolver {
    resolver_with(catalog, CacheConfig::default())
}

pub fn resolver_with(catalog: &Arc<FakeCatalog>, cache_config: CacheConfig) -> PartialResolver {
    let registry = ProducerRegistry::standard().expect("standard registry builds");
    PartialResolver::new(Arc::new(registry), deps(catalog, cache_config))
}

pub fn collections(catalog: &Arc<FakeCatalog>) -> (CollectionPageService, Arc<FragmentCache>) {
    let config = CacheConfig::default();
    let cache = Arc::new(FragmentCache::new(&config));
    let service = CollectionPageService::new(catalog.clone(), cache.clone(), config.page_ttl());
    (service, cache)
}
