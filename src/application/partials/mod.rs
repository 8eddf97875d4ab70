//! Partial fragment resolution.
//!
//! A `/partials` request names a component; the [`ProducerRegistry`] maps that
//! name to a factory that builds a [`FragmentProducer`] for the request, and
//! the [`PartialResolver`] runs it.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::{
    application::{
        error::PartialError,
        queries::QueryBackends,
        repos::{DocumentStore, FulltextIndex},
    },
    cache::{CacheConfig, FragmentCache},
};

mod affiliate_links;
mod carousel;
mod fulltext;
mod registry;
mod related_works;
mod resolver;
mod search_facets;

pub use fulltext::{EMPTY_SUGGESTION, FULLTEXT_CACHE_CONTROL};
pub use registry::{ProducerFactory, ProducerRegistry, RegistryBuilder, RegistryError};
pub use related_works::RELATED_CAROUSELS_NAMESPACE;
pub use resolver::PartialResolver;

/// Query parameter naming the target producer.
pub const COMPONENT_PARAM: &str = "_component";

/// Loosely-typed request parameters. Each producer reads its own subset.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FragmentRequest {
    params: BTreeMap<String, Value>,
}

impl FragmentRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (String, Value)>,
    {
        Self {
            params: pairs.into_iter().collect(),
        }
    }

    /// Build a request from query-string pairs. Later duplicates win.
    pub fn from_query<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        Self::from_pairs(
            pairs
                .into_iter()
                .map(|(key, value)| (key, Value::String(value))),
        )
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.params.get(key)
    }

    /// Read a parameter as text. Numbers and booleans yield their string form.
    pub fn get_str(&self, key: &str) -> Option<String> {
        match self.params.get(key)? {
            Value::Null => None,
            Value::String(text) => Some(text.clone()),
            Value::Bool(flag) => Some(flag.to_string()),
            Value::Number(number) => Some(number.to_string()),
            other => Some(other.to_string()),
        }
    }

    /// Truthiness of a flag parameter: `true`, non-zero numbers, and any
    /// non-empty string other than `false`/`0`.
    pub fn get_bool(&self, key: &str) -> bool {
        match self.params.get(key) {
            Some(Value::Bool(flag)) => *flag,
            Some(Value::Number(number)) => number.as_f64().is_some_and(|value| value != 0.0),
            Some(Value::String(text)) => {
                let text = text.trim();
                !(text.is_empty() || text == "0" || text.eq_ignore_ascii_case("false"))
            }
            _ => false,
        }
    }

    pub fn component(&self) -> Option<String> {
        self.get_str(COMPONENT_PARAM)
    }
}

/// JSON object returned by a producer.
pub type FragmentResult = Map<String, Value>;

/// A producer's payload plus any response-level caching hint.
#[derive(Debug, Clone, PartialEq)]
pub struct Produced {
    pub payload: FragmentResult,
    pub cache_control: Option<&'static str>,
}

impl Produced {
    pub fn new(payload: FragmentResult) -> Self {
        Self {
            payload,
            cache_control: None,
        }
    }

    pub fn with_cache_control(mut self, value: &'static str) -> Self {
        self.cache_control = Some(value);
        self
    }
}

#[async_trait]
pub trait FragmentProducer: Send + Sync {
    async fn generate(&self) -> Result<Produced, PartialError>;
}

/// Collaborators shared by every producer.
#[derive(Clone)]
pub struct PartialDeps {
    pub queries: QueryBackends,
    pub fulltext: Arc<dyn FulltextIndex>,
    pub documents: Arc<dyn DocumentStore>,
    pub cache: Arc<FragmentCache>,
    pub cache_config: CacheConfig,
}

/// Build `{"partials": value}`.
fn partials_payload(value: impl Into<Value>) -> FragmentResult {
    let mut payload = Map::new();
    payload.insert("partials".to_string(), value.into());
    payload
}

/// Decode the JSON carried in the `data` parameter.
fn parse_data<T: serde::de::DeserializeOwned>(
    request: &FragmentRequest,
) -> Result<T, PartialError> {
    let raw = request
        .get_str("data")
        .ok_or_else(|| PartialError::resolution("Missing `data` parameter"))?;
    serde_json::from_str(&raw)
        .map_err(|err| PartialError::resolution(format!("Malformed `data` parameter: {err}")))
}
