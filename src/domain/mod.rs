//! Domain layer types.

pub mod catalog;
