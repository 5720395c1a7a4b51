//! # Ferry Engine
//!
//! The Ferry Engine orchestrates data imports: it resolves the provider a resource belongs to,
//! obtains a per-import connector, fetches raw records through it, and runs them through an
//! ordered chain of transformers. Records are produced lazily, either as an [`Iterator`] or as
//! a [`futures_util::Stream`].
//!
//! ## Key Features
//!
//! - **Provider Resolution**: User container first, built-in factory as fallback
//! - **Connector Isolation**: Options-carrying connectors are duplicated for every import
//! - **Fetch Decoration**: Payload caching and bounded retries around every connector
//! - **Transformer Chain**: Capability-checked sync and async transformers with importer injection
//! - **Single Record Imports**: `import_one` guards against more than one record
//!
//! ## Usage
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use ferry_engine::{FilterTransformer, ImportSpecification, Importer, ProviderRegistry, StaticResource, record_from};
//! use serde_json::json;
//!
//! let records = (1..=10).map(|n| record_from([("n", json!(n))]));
//! let mut specification = ImportSpecification::new(StaticResource::new(records));
//! specification.add_transformer(Arc::new(FilterTransformer::new(|record, _| record["n"].as_i64() > Some(8))))?;
//!
//! let importer = Importer::new(ProviderRegistry::new());
//! for record in importer.import(&specification)? {
//!     println!("{}", serde_json::Value::Object(record?));
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Architecture
//!
//! - **`specification`**: What to import and how; cloned by every import
//! - **`provider`**: Provider and resource contracts, registry, resolver, built-in providers
//! - **`connector`**: Connector contracts, acquisition and the decoration step
//! - **`collection`**: Lazy record collections with optional counts
//! - **`transform`**: Transformer contracts, built-in transformers and the chain
//! - **`cardinality`**: Single-record guards
//! - **`importer`**: The orchestrator tying the above together

pub mod cardinality;
pub mod collection;
pub mod connector;
pub mod error;
pub mod importer;
pub mod provider;
pub mod record;
pub mod specification;
pub mod transform;

// Re-export commonly used types for convenience
pub use collection::{AsyncRecordCollection, RawRecordStream, RawRecords, RecordCollection, RecordOrigin};
pub use connector::{
    AsyncConnector, AsyncConnectorSupply, Connector, ConnectorDecorator, ConnectorInfo, ConnectorOptions, ConnectorSupply, DataSource,
    FetchCache, FetchExceptionHandler, MemoryFetchCache, PassthroughDecorator, RecoverableError, RetryDecision, StandardDecorator,
};
pub use error::{ConfigurationError, ImportError, Result};
pub use importer::{Importer, ImporterBuilder};
pub use provider::{
    AsyncProvider, AsyncProviderResource, FileConnector, JsonLinesProvider, JsonLinesResource, Provider, ProviderContainer,
    ProviderRegistry, ProviderResolver, ProviderResource, StaticDataProvider, StaticResource,
};
pub use record::{Context, Record, record_from};
pub use specification::{AsyncImportSpecification, DEFAULT_MAX_FETCH_ATTEMPTS, FetchPolicy, ImportSpecification, Specification};
pub use transform::{AsyncTransformer, FilterTransformer, ImporterAware, MapTransformer, SyncTransformer, Transformer};

/// Last path segment of a type name, without generic arguments.
///
/// `ferry_engine::provider::StaticResource` becomes `StaticResource`.
pub(crate) fn short_type_name(full: &'static str) -> &'static str {
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}
