//! Providers the fallback factory can build without registration.

mod jsonl;
mod static_data;

pub use jsonl::{FileConnector, JsonLinesProvider, JsonLinesResource};
pub use static_data::{NullConnector, StaticDataProvider, StaticResource};
