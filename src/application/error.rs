use std::error::Error as StdError;

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::{
    application::{partials::RegistryError, repos::BackendError},
    cache::CacheError,
    config::LoadError,
    infra::error::InfraError,
    presentation::views::TemplateRenderError,
};

#[derive(Debug, Clone)]
pub struct ErrorReport {
    pub source: &'static str,
    pub status: StatusCode,
    pub messages: Vec<String>,
}

impl ErrorReport {
    pub fn from_error(source: &'static str, status: StatusCode, error: &dyn StdError) -> Self {
        let mut messages = Vec::new();
        messages.push(error.to_string());
        let mut current = error.source();
        while let Some(inner) = current {
            messages.push(inner.to_string());
            current = inner.source();
        }
        Self {
            source,
            status,
            messages,
        }
    }

    pub fn attach(self, response: &mut Response) {
        response.extensions_mut().insert(self);
    }
}

/// Failures raised while resolving a fragment or a cached page.
#[derive(Debug, Error)]
pub enum PartialError {
    #[error("No handler found for key \"{0}\"")]
    UnresolvedComponent(String),
    #[error("Unknown query type \"{0}\"")]
    UnknownQueryType(String),
    #[error("{0}")]
    Resolution(String),
    #[error("document `{path}` not found")]
    NotFound { path: String },
    #[error(transparent)]
    Backend(#[from] BackendError),
    #[error(transparent)]
    Render(#[from] TemplateRenderError),
    #[error(transparent)]
    Cache(#[from] CacheError),
    #[error("failed to serialize fragment: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl PartialError {
    pub fn resolution(message: impl Into<String>) -> Self {
        Self::Resolution(message.into())
    }

    pub fn not_found(path: impl Into<String>) -> Self {
        Self::NotFound { path: path.into() }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            PartialError::UnresolvedComponent(_)
            | PartialError::UnknownQueryType(_)
            | PartialError::Resolution(_) => StatusCode::BAD_REQUEST,
            PartialError::NotFound { .. } => StatusCode::NOT_FOUND,
            PartialError::Backend(_) => StatusCode::BAD_GATEWAY,
            PartialError::Render(_) | PartialError::Cache(_) | PartialError::Serialize(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Message safe to show to the caller. Client errors echo their detail;
    /// server errors stay generic.
    pub fn public_message(&self) -> String {
        match self {
            PartialError::UnresolvedComponent(_)
            | PartialError::UnknownQueryType(_)
            | PartialError::Resolution(_)
            | PartialError::NotFound { .. } => self.to_string(),
            PartialError::Backend(_) => "Catalog backend unavailable".to_string(),
            PartialError::Render(_) => "Fragment rendering failed".to_string(),
            PartialError::Cache(_) | PartialError::Serialize(_) => {
                "Fragment could not be encoded".to_string()
            }
        }
    }

    fn report_source(&self) -> &'static str {
        match self {
            PartialError::Render(err) => err.source_module(),
            PartialError::Backend(_) => "application::repos",
            PartialError::Cache(_) => "cache::store",
            _ => "application::partials",
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for PartialError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorBody {
            error: self.public_message(),
        };
        let report = ErrorReport::from_error(self.report_source(), status, &self);
        let mut response = (status, Json(body)).into_response();
        report.attach(&mut response);
        response
    }
}

/// Errors surfaced at the binary boundary.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Infra(#[from] InfraError),
    #[error(transparent)]
    Config(#[from] LoadError),
    #[error(transparent)]
    Partial(#[from] PartialError),
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl AppError {
    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected(message.into())
    }
}
