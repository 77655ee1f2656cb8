//! Feed fetching, parsing, and the AI news source adapters.
//!
//! This crate provides:
//! - [`Fetcher`]: timed HTTP GET that reports failure as `None`
//! - [`feed`]: a uniform RSS/Atom reader
//! - [`normalize`]: text cleanup and draft construction
//! - [`adapters`]: one [`SourceAdapter`] per external feed, held by an [`AdapterRegistry`]

pub mod adapters;
pub mod feed;
pub mod fetcher;
pub mod normalize;

pub use adapters::{
    AdapterRegistry, ArxivAdapter, Endpoint, SourceAdapter, TechCrunchAdapter, TheVergeAdapter,
};
pub use feed::{FeedEntry, parse_feed};
pub use fetcher::{FetchMode, Fetcher};
