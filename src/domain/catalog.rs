//! Catalog records exchanged with the search, browse, trending and taxonomy backends.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Type key marking a document that has been deleted from the store.
pub const DELETED_TYPE: &str = "/type/delete";

/// A work as returned by any of the catalog indexes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct WorkDoc {
    pub key: String,
    pub title: String,
    pub subtitle: Option<String>,
    pub author_name: Vec<String>,
    pub cover_i: Option<i64>,
    pub ia: Vec<String>,
    pub first_publish_year: Option<i32>,
    pub subject: Vec<String>,
    pub has_fulltext: bool,
    pub availability: Option<Availability>,
    pub id_project_gutenberg: Vec<String>,
    pub id_project_runeberg: Vec<String>,
    pub id_librivox: Vec<String>,
    pub id_standard_ebooks: Vec<String>,
    pub id_openstax: Vec<String>,
}

impl WorkDoc {
    pub fn cover_url(&self, size: char) -> Option<String> {
        self.cover_i
            .filter(|id| *id > 0)
            .map(|id| format!("https://covers.openlibrary.org/b/id/{id}-{size}.jpg"))
    }

    pub fn has_external_ebook(&self) -> bool {
        [
            &self.id_project_gutenberg,
            &self.id_project_runeberg,
            &self.id_librivox,
            &self.id_standard_ebooks,
            &self.id_openstax,
        ]
        .iter()
        .any(|ids| !ids.is_empty())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AvailabilityStatus {
    Open,
    Borrowable,
    CheckedOut,
    Private,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Availability {
    pub status: AvailabilityStatus,
    #[serde(default)]
    pub identifier: Option<String>,
}

/// One value of a facet with its document count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FacetCount {
    pub value: String,
    pub count: u64,
}

/// Result of a work search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct SearchResponse {
    pub num_found: u64,
    pub docs: Vec<WorkDoc>,
    pub facet_counts: BTreeMap<String, Vec<FacetCount>>,
}

/// Result of the availability (browse) index. Backend failures are reported
/// through `error` rather than as an `Err`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct BrowseResponse {
    pub docs: Vec<WorkDoc>,
    pub error: Option<String>,
}

/// A subject (taxonomy) lookup result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct SubjectRecord {
    pub key: String,
    pub name: String,
    pub work_count: u64,
    pub works: Vec<WorkDoc>,
}

/// A page document served from the document store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageDocument {
    pub path: String,
    #[serde(rename = "type", default = "default_page_type")]
    pub kind: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub body: String,
}

fn default_page_type() -> String {
    "/type/page".to_string()
}

impl PageDocument {
    /// Whether the document has anything worth rendering.
    pub fn is_renderable(&self) -> bool {
        self.kind != DELETED_TYPE && !self.body.trim().is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FulltextHit {
    pub identifier: String,
    pub title: String,
    pub highlight: String,
    #[serde(default)]
    pub work_key: Option<String>,
}

/// Result of a full-text (inside-the-book) search. Backend failures are
/// reported through `error`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct FulltextResponse {
    pub hits: Vec<FulltextHit>,
    pub total: u64,
    pub error: Option<String>,
}
