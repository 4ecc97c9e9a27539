//! Prometheus exposition of cached metric families.
//!
//! This crate turns the contents of a [`promfed_core::MetricCache`] into a scrape response:
//! - [`ExpositionFormat`] negotiates the encoding from an `Accept` header
//! - [`FamilyFilter`] applies the `metric[]` and `source_id[]` allow-lists
//! - [`render`] encodes every selected family, skipping the ones that fail
//!
//! ## Example
//! ```rust
//! use promfed_core::MetricCache;
//! use promfed_prometheus::{ExpositionFormat, FamilyFilter, render};
//!
//! let cache = MetricCache::new();
//! let format = ExpositionFormat::negotiate(Some("text/plain; version=0.0.4"));
//! let body = render(&cache, &FamilyFilter::default(), format);
//! assert!(body.is_empty());
//! ```

mod error;
pub use error::EncodeError;

mod filter;
pub use filter::FamilyFilter;

mod format;
pub use format::ExpositionFormat;

mod render;
mod text;
pub use render::{encode_family, render};

pub use prometheus::{PROTOBUF_FORMAT, TEXT_FORMAT};
