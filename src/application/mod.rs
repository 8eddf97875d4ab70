//! Application services: fragment producers, query builders and cached pages.

pub mod collections;
pub mod error;
pub mod partials;
pub mod queries;
pub mod repos;
