//! Stacks fragment cache.
//!
//! A single in-process store backs every memoized computation:
//!
//! - **Page cache**: rendered collection pages, keyed by path
//! - **Widget cache**: rendered widget fragments (related works carousels)
//!
//! Entries expire after their TTL and are evicted LRU once `capacity` is
//! reached. Empty values are never kept past the read that produced them.
//!
//! ## Configuration
//!
//! ```toml
//! [cache]
//! capacity = 1000
//! page_ttl_seconds = 300
//! widget_ttl_seconds = 43200
//! enable_widget_cache = true
//! ```

mod config;
mod keys;
mod store;

pub use config::CacheConfig;
pub use keys::MemoKey;
pub use store::{CacheError, FragmentCache, is_falsy};
