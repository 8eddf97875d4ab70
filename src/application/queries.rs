//! Query builders translating carousel parameters into backend lookups.
//!
//! Each builder normalizes its own subset of the request, applies defaults,
//! and returns an ordered list of works. The 1-based page number is passed to
//! the backend as its pagination cursor.

use std::sync::Arc;

use tracing::warn;

use crate::{
    application::{
        partials::FragmentRequest,
        repos::{
            AvailabilityIndex, BackendError, BrowseRequest, SubjectIndex, SubjectRequest,
            TrendingRequest, TrendingStats, WorkSearch, WorkSearchRequest,
        },
    },
    domain::catalog::WorkDoc,
};

pub const MAX_LIMIT: u32 = 100;

const SEARCH_DEFAULT_LIMIT: u32 = 20;
const SEARCH_DEFAULT_SORT: &str = "new";
const BROWSE_DEFAULT_LIMIT: u32 = 18;
const TRENDING_DEFAULT_LIMIT: u32 = 18;
const TRENDING_MINIMUM: u32 = 3;
const SUBJECTS_DEFAULT_LIMIT: u32 = 20;

/// Fields projected from the search index for carousel cards.
pub const SEARCH_FIELDS: [&str; 12] = [
    "key",
    "title",
    "subtitle",
    "author_name",
    "cover_i",
    "ia",
    "availability",
    "id_project_gutenberg",
    "id_project_runeberg",
    "id_librivox",
    "id_standard_ebooks",
    "id_openstax",
];

/// Parameters shared by every builder after normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryParams {
    pub q: String,
    pub subject: String,
    /// Raw `sorts` value handed to the search index; `new` when absent.
    pub search_sort: String,
    /// `sorts` split on commas for the availability index.
    pub sorts: Vec<String>,
    pub limit: u32,
    pub page: u32,
    pub has_fulltext_only: bool,
}

impl QueryParams {
    /// Normalize `request` using `default_limit` when `limit` is absent or unusable.
    pub fn from_request(request: &FragmentRequest, default_limit: u32) -> Self {
        Self {
            q: request.get_str("q").unwrap_or_default(),
            subject: request.get_str("subject").unwrap_or_default(),
            search_sort: request
                .get_str("sorts")
                .unwrap_or_else(|| SEARCH_DEFAULT_SORT.to_string()),
            sorts: split_sorts(request.get_str("sorts").as_deref()),
            limit: coerce_positive(request.get_str("limit").as_deref(), default_limit)
                .min(MAX_LIMIT),
            page: coerce_positive(request.get_str("page").as_deref(), 1),
            has_fulltext_only: request.get_bool("hasFulltextOnly"),
        }
    }
}

/// Parse a positive integer, falling back to `default` for anything else.
pub fn coerce_positive(raw: Option<&str>, default: u32) -> u32 {
    raw.and_then(|value| value.trim().parse::<i64>().ok())
        .filter(|value| *value > 0)
        .map(|value| u32::try_from(value).unwrap_or(u32::MAX))
        .unwrap_or(default)
}

/// Split a comma-separated sort list, dropping empty entries.
pub fn split_sorts(raw: Option<&str>) -> Vec<String> {
    raw.map(|value| {
        value
            .split(',')
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
            .map(str::to_string)
            .collect()
    })
    .unwrap_or_default()
}

/// The four backend query shapes a carousel can page through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryKind {
    Search,
    Browse,
    Trending,
    Subjects,
}

impl QueryKind {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "SEARCH" => Some(Self::Search),
            "BROWSE" => Some(Self::Browse),
            "TRENDING" => Some(Self::Trending),
            "SUBJECTS" => Some(Self::Subjects),
            _ => None,
        }
    }

    pub fn default_limit(self) -> u32 {
        match self {
            Self::Search => SEARCH_DEFAULT_LIMIT,
            Self::Browse => BROWSE_DEFAULT_LIMIT,
            Self::Trending => TRENDING_DEFAULT_LIMIT,
            Self::Subjects => SUBJECTS_DEFAULT_LIMIT,
        }
    }
}

/// Backends consulted by the query builders.
#[derive(Clone)]
pub struct QueryBackends {
    pub search: Arc<dyn WorkSearch>,
    pub availability: Arc<dyn AvailabilityIndex>,
    pub trending: Arc<dyn TrendingStats>,
    pub subjects: Arc<dyn SubjectIndex>,
}

impl QueryBackends {
    pub async fn run(
        &self,
        kind: QueryKind,
        params: &QueryParams,
    ) -> Result<Vec<WorkDoc>, BackendError> {
        match kind {
            QueryKind::Search => self.search_works(params).await,
            QueryKind::Browse => Ok(self.browse(params).await),
            QueryKind::Trending => self.trending(params).await,
            QueryKind::Subjects => self.subject_works(params).await,
        }
    }

    pub async fn search_works(&self, params: &QueryParams) -> Result<Vec<WorkDoc>, BackendError> {
        let request = WorkSearchRequest {
            q: params.q.clone(),
            fields: SEARCH_FIELDS.iter().map(|field| field.to_string()).collect(),
            has_fulltext: params.has_fulltext_only,
            sort: params.search_sort.clone(),
            limit: params.limit,
            offset: params.page,
            facet: false,
        };
        let response = self.search.work_search(&request).await?;
        Ok(response.docs)
    }

    /// Browse never fails: a backend error is logged and yields no works.
    pub async fn browse(&self, params: &QueryParams) -> Vec<WorkDoc> {
        let request = BrowseRequest {
            query: params.q.clone(),
            subject: params.subject.clone(),
            limit: params.limit,
            page: params.page,
            sorts: params.sorts.clone(),
        };
        let response = self.availability.available(&request).await;
        match response.error {
            Some(error) => {
                warn!(
                    target = "application::queries",
                    query = %params.q,
                    error = %error,
                    "browse backend reported an error"
                );
                Vec::new()
            }
            None => response.docs,
        }
    }

    pub async fn trending(&self, params: &QueryParams) -> Result<Vec<WorkDoc>, BackendError> {
        let request = TrendingRequest {
            minimum: TRENDING_MINIMUM,
            limit: params.limit,
            page: params.page,
            books_only: true,
            sort_by_count: false,
        };
        self.trending.trending(&request).await
    }

    pub async fn subject_works(&self, params: &QueryParams) -> Result<Vec<WorkDoc>, BackendError> {
        let request = SubjectRequest {
            key: params.q.clone(),
            offset: params.page,
            limit: params.limit,
        };
        let record = self.subjects.subject(&request).await?;
        Ok(record.works)
    }
}
