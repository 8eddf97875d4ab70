use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Map, Value};
use url::form_urlencoded;

use crate::{
    application::{error::PartialError, repos::FacetSearchRequest},
    domain::catalog::SearchResponse,
    presentation::views::{
        FacetChipView, FacetGroupView, FacetValueView, SearchFacetsTemplate,
        SelectedFacetsTemplate, render_fragment,
    },
};

use super::{FragmentProducer, FragmentRequest, PartialDeps, Produced, parse_data};

const SOURCE: &str = "application::partials::search_facets";

/// Facets shown in the sidebar, in display order.
const FACETS: [(&str, &str); 8] = [
    ("has_fulltext", "eBook?"),
    ("author_facet", "Author"),
    ("first_publish_year", "First published"),
    ("subject_facet", "Subjects"),
    ("person_facet", "People"),
    ("place_facet", "Places"),
    ("language", "Language"),
    ("publisher_facet", "Publisher"),
];

#[derive(Debug, Deserialize)]
struct FacetData {
    #[serde(default)]
    path: Option<String>,
    #[serde(default)]
    query: String,
    #[serde(default)]
    param: BTreeMap<String, Value>,
}

/// Renders the search sidebar and the selected-facet chips (`SearchFacets`).
pub(super) struct SearchFacetsProducer {
    deps: PartialDeps,
    request: FragmentRequest,
}

impl SearchFacetsProducer {
    pub(super) fn factory(deps: &PartialDeps, request: FragmentRequest) -> Box<dyn FragmentProducer> {
        Box::new(Self {
            deps: deps.clone(),
            request,
        })
    }
}

#[async_trait]
impl FragmentProducer for SearchFacetsProducer {
    async fn generate(&self) -> Result<Produced, PartialError> {
        let data: FacetData = parse_data(&self.request)?;
        let path = data.path.unwrap_or_else(|| "/search".to_string());
        let query = parse_query(&data.query);
        let param: BTreeMap<String, Vec<String>> = data
            .param
            .into_iter()
            .map(|(key, value)| (key, param_values(value)))
            .filter(|(_, values)| !values.is_empty())
            .collect();

        let request = FacetSearchRequest {
            param,
            sort: None,
            rows: 0,
            spellcheck_count: 3,
            facet: true,
        };
        let response = self.deps.queries.search.facet_search(&request).await?;

        let q = request
            .param
            .get("q")
            .and_then(|values| values.first())
            .cloned()
            .unwrap_or_default();
        let sidebar = render_fragment(
            SOURCE,
            &SearchFacetsTemplate {
                groups: facet_groups(&path, &query, &response),
                path: path.clone(),
                async_load: false,
            },
        )?;
        let active_facets = render_fragment(
            SOURCE,
            &SelectedFacetsTemplate {
                chips: selected_chips(&path, &query),
                num_found: response.num_found,
                q: q.clone(),
            },
        )?;

        let mut payload = Map::new();
        payload.insert("sidebar".to_string(), Value::String(sidebar));
        payload.insert("title".to_string(), Value::String(search_title(&q)));
        payload.insert(
            "activeFacets".to_string(),
            Value::String(active_facets.trim().to_string()),
        );
        Ok(Produced::new(payload))
    }
}

/// Flatten one `param` entry into filter values. Lists give one value per
/// element; nulls are dropped.
fn param_values(value: Value) -> Vec<String> {
    match value {
        Value::Null => Vec::new(),
        Value::String(text) => vec![text],
        Value::Array(items) => items.into_iter().flat_map(param_values).collect(),
        other => vec![other.to_string()],
    }
}

/// Parse a URL query string into ordered pairs. A leading `?` is ignored.
fn parse_query(raw: &str) -> Vec<(String, String)> {
    let raw = raw.trim_start_matches('?');
    form_urlencoded::parse(raw.as_bytes())
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .filter(|(_, value)| !value.is_empty())
        .collect()
}

fn href(path: &str, pairs: &[(String, String)]) -> String {
    if pairs.is_empty() {
        return path.to_string();
    }
    let encoded = form_urlencoded::Serializer::new(String::new())
        .extend_pairs(pairs)
        .finish();
    format!("{path}?{encoded}")
}

/// Toggle `key=value` in the query, resetting pagination.
fn toggled(query: &[(String, String)], key: &str, value: &str) -> (Vec<(String, String)>, bool) {
    let selected = query.iter().any(|(k, v)| k == key && v == value);
    let mut pairs: Vec<(String, String)> = query
        .iter()
        .filter(|(k, v)| k != "page" && !(k == key && v == value))
        .cloned()
        .collect();
    if !selected {
        pairs.push((key.to_string(), value.to_string()));
    }
    (pairs, selected)
}

fn facet_groups(
    path: &str,
    query: &[(String, String)],
    response: &SearchResponse,
) -> Vec<FacetGroupView> {
    FACETS
        .iter()
        .filter_map(|(key, label)| {
            let counts = response.facet_counts.get(*key)?;
            if counts.is_empty() {
                return None;
            }
            let values = counts
                .iter()
                .map(|facet| {
                    let (pairs, selected) = toggled(query, key, &facet.value);
                    FacetValueView {
                        label: facet.value.clone(),
                        count: facet.count,
                        href: href(path, &pairs),
                        selected,
                    }
                })
                .collect();
            Some(FacetGroupView {
                key: key.to_string(),
                label: *label,
                values,
            })
        })
        .collect()
}

fn selected_chips(path: &str, query: &[(String, String)]) -> Vec<FacetChipView> {
    query
        .iter()
        .filter_map(|(key, value)| {
            let (_, label) = FACETS.iter().find(|(facet, _)| *facet == key.as_str())?;
            let (pairs, _) = toggled(query, key, value);
            Some(FacetChipView {
                label: label.to_string(),
                value: value.clone(),
                remove_href: href(path, &pairs),
            })
        })
        .collect()
}

fn search_title(q: &str) -> String {
    let q = q.trim();
    if q.is_empty() {
        "Search results".to_string()
    } else {
        format!("{q} - search results")
    }
}
