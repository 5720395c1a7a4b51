//! Error types for import orchestration.

use thiserror::Error;

/// Result alias used throughout the engine.
pub type Result<T, E = ImportError> = std::result::Result<T, E>;

/// Main error type for import operations.
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("No such provider registered: \"{name}\"")]
    ProviderNotFound { name: String },

    #[error("Cannot fetch data from foreign resource \"{resource}\": owned by \"{owner}\" but resolved provider is \"{provider}\"")]
    ForeignResource { resource: String, owner: String, provider: String },

    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("Transformer already added to specification: {transformer}")]
    DuplicateTransformer { transformer: String },

    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },

    #[error("Cannot import one: more than one record imported.")]
    MoreThanOneRecord,

    #[error("Fetch failed: {0}")]
    Fetch(#[source] anyhow::Error),

    #[error("Transformer {transformer} failed: {source}")]
    Transform {
        transformer: String,
        #[source]
        source: anyhow::Error,
    },
}

/// Errors raised when the pipeline is assembled from incompatible parts.
///
/// These are configuration defects, not transient failures, and are never retried.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("Connector {connector} carries options but was supplied as a shared instance; options must be duplicated per import")]
    SharedConnectorOptions { connector: String },

    #[error("Provider {provider} does not support asynchronous imports")]
    AsyncUnsupported { provider: String },

    #[error("Cannot use synchronous transformer {transformer} in an asynchronous import")]
    SyncTransformerInAsyncImport { transformer: String },

    #[error("Cannot use asynchronous transformer {transformer} in a synchronous import")]
    AsyncTransformerInSyncImport { transformer: String },
}

impl ImportError {
    /// Create a provider not found error.
    pub fn provider_not_found(name: impl Into<String>) -> Self {
        Self::ProviderNotFound { name: name.into() }
    }

    /// Create a foreign resource error.
    pub fn foreign_resource(resource: impl Into<String>, owner: impl Into<String>, provider: impl Into<String>) -> Self {
        Self::ForeignResource {
            resource: resource.into(),
            owner: owner.into(),
            provider: provider.into(),
        }
    }

    /// Create a duplicate transformer error.
    pub fn duplicate_transformer(transformer: impl Into<String>) -> Self {
        Self::DuplicateTransformer {
            transformer: transformer.into(),
        }
    }

    /// Create an invalid argument error.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument { message: message.into() }
    }

    /// Wrap a collaborator failure raised while fetching records.
    pub fn fetch(error: impl Into<anyhow::Error>) -> Self {
        Self::Fetch(error.into())
    }

    /// Wrap a failure raised by a transformer.
    pub fn transform(transformer: impl Into<String>, source: impl Into<anyhow::Error>) -> Self {
        Self::Transform {
            transformer: transformer.into(),
            source: source.into(),
        }
    }
}

impl ConfigurationError {
    /// Create a shared connector options error.
    pub fn shared_connector_options(connector: impl Into<String>) -> Self {
        Self::SharedConnectorOptions {
            connector: connector.into(),
        }
    }

    /// Create an async unsupported error.
    pub fn async_unsupported(provider: impl Into<String>) -> Self {
        Self::AsyncUnsupported { provider: provider.into() }
    }

    /// Create a sync-transformer-in-async-import error.
    pub fn sync_transformer_in_async_import(transformer: impl Into<String>) -> Self {
        Self::SyncTransformerInAsyncImport {
            transformer: transformer.into(),
        }
    }

    /// Create an async-transformer-in-sync-import error.
    pub fn async_transformer_in_sync_import(transformer: impl Into<String>) -> Self {
        Self::AsyncTransformerInSyncImport {
            transformer: transformer.into(),
        }
    }
}
