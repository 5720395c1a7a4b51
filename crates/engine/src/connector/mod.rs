//! Transport connectors and their per-import handling.
//!
//! Modules:
//! - `options`: Request-scoped option bag carried by some connectors
//! - `acquire`: Obtains an isolated connector from a provider
//! - `decorate`: Decoration step applied to every acquired connector (cache + retry)
//! - `cache`: Fetch cache store consulted by the standard decoration
//! - `handler`: Recoverable error marker and the fetch exception handler hook consulted between retries

mod acquire;
mod cache;
mod decorate;
mod handler;
mod options;

use std::{
    fmt,
    hash::{DefaultHasher, Hash, Hasher},
    sync::Arc,
};

use async_trait::async_trait;
use serde_json::{Map as JsonMap, Value};

pub use acquire::{acquire, acquire_async};
pub use cache::{FetchCache, MemoryFetchCache};
pub use decorate::{AsyncImportConnector, ConnectorDecorator, ImportConnector, PassthroughDecorator, StandardDecorator};
pub use handler::{FetchExceptionHandler, HandlerClone, RecoverableError, RetryDecision};
pub use options::ConnectorOptions;

/// Identifies one piece of data a connector can fetch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DataSource {
    location: String,
    parameters: JsonMap<String, Value>,
}

impl DataSource {
    pub fn new(location: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            parameters: JsonMap::new(),
        }
    }

    pub fn with_parameter(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.parameters.insert(name.into(), value.into());
        self
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn parameters(&self) -> &JsonMap<String, Value> {
        &self.parameters
    }

    /// Build a cache key from the location, parameters and the fetching connector's options.
    ///
    /// Two fetches share a key only when all three match.
    pub fn cache_key(&self, options: Option<&ConnectorOptions>) -> String {
        let mut hasher = DefaultHasher::new();
        self.location.hash(&mut hasher);
        if let Ok(serialized_parameters) = serde_json::to_string(&self.parameters) {
            serialized_parameters.hash(&mut hasher);
        }
        if let Some(options) = options {
            options.fingerprint().hash(&mut hasher);
        }
        format!("{}:{}", self.location, hasher.finish())
    }
}

/// State shared by synchronous and asynchronous connectors.
pub trait ConnectorInfo: Send + Sync + fmt::Debug {
    /// Request-scoped options, when the connector carries any.
    ///
    /// A connector returning `Some` must be supplied as isolated so each import works on its own copy.
    fn options(&self) -> Option<&ConnectorOptions> {
        None
    }

    fn name(&self) -> &'static str {
        crate::short_type_name(std::any::type_name::<Self>())
    }
}

/// Blocking transport used by synchronous imports.
pub trait Connector: ConnectorInfo {
    fn fetch(&self, source: &DataSource) -> anyhow::Result<Value>;
}

/// Non-blocking transport used by asynchronous imports.
#[async_trait]
pub trait AsyncConnector: ConnectorInfo {
    async fn fetch_async(&self, source: &DataSource) -> anyhow::Result<Value>;
}

/// Connector that can be duplicated, options included, for a single import.
///
/// Implemented for every `Clone` connector; the `Clone` impl must deep-copy the options.
pub trait IsolatedConnector: Connector {
    fn duplicate(&self) -> Box<dyn Connector>;
}

impl<T> IsolatedConnector for T
where
    T: Connector + Clone + 'static,
{
    fn duplicate(&self) -> Box<dyn Connector> {
        Box::new(self.clone())
    }
}

/// Asynchronous counterpart of [`IsolatedConnector`].
pub trait IsolatedAsyncConnector: AsyncConnector {
    fn duplicate(&self) -> Box<dyn AsyncConnector>;
}

impl<T> IsolatedAsyncConnector for T
where
    T: AsyncConnector + Clone + 'static,
{
    fn duplicate(&self) -> Box<dyn AsyncConnector> {
        Box::new(self.clone())
    }
}

/// How a provider hands out its synchronous connector.
pub enum ConnectorSupply<'a> {
    /// Stateless connector; one instance may serve every import.
    Shared(Arc<dyn Connector>),
    /// Connector with request-scoped options; duplicated for every import.
    Isolated(&'a dyn IsolatedConnector),
}

/// How a provider hands out its asynchronous connector.
pub enum AsyncConnectorSupply<'a> {
    Shared(Arc<dyn AsyncConnector>),
    Isolated(&'a dyn IsolatedAsyncConnector),
}
