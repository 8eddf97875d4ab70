//! Backend traits describing the catalog collaborators.
//!
//! Availability and full-text lookups report backend trouble through an
//! `error` field on their response. Every other lookup returns `Err`.

use std::collections::BTreeMap;

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::catalog::{
    BrowseResponse, FulltextResponse, PageDocument, SearchResponse, SubjectRecord, WorkDoc,
};

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("backend query failed: {0}")]
    Query(String),
}

impl BackendError {
    pub fn query(message: impl Into<String>) -> Self {
        Self::Query(message.into())
    }
}

/// A work search with an explicit field projection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkSearchRequest {
    pub q: String,
    pub fields: Vec<String>,
    pub has_fulltext: bool,
    pub sort: String,
    pub limit: u32,
    /// 1-based page used as the pagination cursor.
    pub offset: u32,
    pub facet: bool,
}

/// A faceted search used to build the search sidebar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FacetSearchRequest {
    /// Filters by field. A field selected several times carries one value per
    /// selection.
    pub param: BTreeMap<String, Vec<String>>,
    pub sort: Option<String>,
    pub rows: u32,
    pub spellcheck_count: u32,
    pub facet: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrowseRequest {
    pub query: String,
    pub subject: String,
    pub limit: u32,
    pub page: u32,
    pub sorts: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrendingRequest {
    pub minimum: u32,
    pub limit: u32,
    pub page: u32,
    pub books_only: bool,
    pub sort_by_count: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubjectRequest {
    pub key: String,
    /// 1-based page used as the pagination cursor.
    pub offset: u32,
    pub limit: u32,
}

#[async_trait]
pub trait WorkSearch: Send + Sync {
    async fn work_search(&self, request: &WorkSearchRequest)
    -> Result<SearchResponse, BackendError>;

    async fn facet_search(
        &self,
        request: &FacetSearchRequest,
    ) -> Result<SearchResponse, BackendError>;
}

#[async_trait]
pub trait AvailabilityIndex: Send + Sync {
    async fn available(&self, request: &BrowseRequest) -> BrowseResponse;
}

#[async_trait]
pub trait TrendingStats: Send + Sync {
    async fn trending(&self, request: &TrendingRequest) -> Result<Vec<WorkDoc>, BackendError>;
}

#[async_trait]
pub trait SubjectIndex: Send + Sync {
    async fn subject(&self, request: &SubjectRequest) -> Result<SubjectRecord, BackendError>;
}

#[async_trait]
pub trait FulltextIndex: Send + Sync {
    async fn search(&self, query: &str) -> FulltextResponse;
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Fetch the page document at `path`, if one exists.
    async fn page(&self, path: &str) -> Result<Option<PageDocument>, BackendError>;

    /// Fetch the work at `key` (`/works/OL45W`), if one exists.
    async fn work(&self, key: &str) -> Result<Option<WorkDoc>, BackendError>;
}
