//! Import orchestration: resolve, acquire, decorate, fetch, transform.

use std::{fmt, sync::Arc};

use tracing::{debug, info, warn};

use crate::{
    AsyncImportSpecification, AsyncRecordCollection, ConfigurationError, ImportError, ImportSpecification, Record, RecordCollection,
    RecordOrigin, Result, cardinality,
    connector::{self, ConnectorDecorator, FetchCache, MemoryFetchCache, StandardDecorator},
    provider::{ProviderContainer, ProviderRegistry, ProviderResolver},
    transform,
};

/// Entry point for imports.
///
/// Cheap to clone; clones share the provider container, decoration step and fetch cache.
#[derive(Clone)]
pub struct Importer {
    inner: Arc<ImporterInner>,
}

struct ImporterInner {
    resolver: ProviderResolver,
    decorator: Arc<dyn ConnectorDecorator>,
}

impl Importer {
    /// Importer over `container` with the standard decoration step and an in-memory fetch cache.
    pub fn new(container: impl ProviderContainer + 'static) -> Self {
        Self::builder().container(container).build()
    }

    pub fn builder() -> ImporterBuilder {
        ImporterBuilder::default()
    }

    pub fn resolver(&self) -> &ProviderResolver {
        &self.inner.resolver
    }

    /// Import records synchronously.
    ///
    /// The specification is cloned first; the caller's instance is never modified.
    pub fn import(&self, specification: &ImportSpecification) -> Result<RecordCollection> {
        let specification = specification.clone();
        let provider_name = specification.effective_provider_name().to_string();
        let resource_name = specification.resource().name();
        info!(provider = %provider_name, resource = resource_name, "import started");

        let records = self.fetch(&specification, &provider_name)?;
        let records = transform::apply_all(records, specification.transformers(), specification.context(), self)?;

        debug!(provider = %provider_name, resource = resource_name, count = ?records.record_count(), "import ready");
        Ok(records.with_origin(RecordOrigin::import(provider_name, resource_name)))
    }

    /// Import at most one record. More than one is an error.
    pub fn import_one(&self, specification: &ImportSpecification) -> Result<Option<Record>> {
        cardinality::one(self.import(specification)?)
    }

    /// Import records asynchronously.
    ///
    /// Fails with a configuration error when the provider has no asynchronous capability,
    /// or when any transformer cannot run asynchronously.
    pub async fn import_async(&self, specification: &AsyncImportSpecification) -> Result<AsyncRecordCollection> {
        let specification = specification.clone();
        let provider_name = specification.effective_provider_name().to_string();
        let resource_name = specification.resource().name();
        info!(provider = %provider_name, resource = resource_name, "async import started");

        let records = self.fetch_async(&specification, &provider_name).await?;
        let records = transform::apply_all_async(records, specification.transformers(), specification.context(), self).await?;

        debug!(provider = %provider_name, resource = resource_name, count = ?records.record_count(), "async import ready");
        Ok(records.with_origin(RecordOrigin::import(provider_name, resource_name)))
    }

    /// Asynchronous counterpart of [`Importer::import_one`].
    pub async fn import_one_async(&self, specification: &AsyncImportSpecification) -> Result<Option<Record>> {
        let records = self.import_async(specification).await?;
        cardinality::one_async(records).await
    }

    fn fetch(&self, specification: &ImportSpecification, provider_name: &str) -> Result<RecordCollection> {
        let resource = specification.resource();
        let provider = self.inner.resolver.resolve(provider_name)?;
        ProviderResolver::ensure_resource_owner(provider.as_ref(), resource.provider_id(), resource.name())?;

        let connector = connector::acquire(provider.as_ref())?;
        let connector = self.inner.decorator.decorate(connector, specification.fetch_policy());

        let raw = resource.fetch(connector).map_err(ImportError::fetch)?;
        debug!(provider = provider.id(), resource = resource.name(), count = ?raw.count(), "fetched records");
        Ok(RecordCollection::wrap(raw, RecordOrigin::provider(provider.id(), resource.name())))
    }

    async fn fetch_async(&self, specification: &AsyncImportSpecification, provider_name: &str) -> Result<AsyncRecordCollection> {
        let resource = specification.resource();
        let provider = self.inner.resolver.resolve(provider_name)?;
        if provider.as_async_provider().is_none() {
            return Err(ConfigurationError::async_unsupported(provider.id()).into());
        }
        ProviderResolver::ensure_resource_owner(provider.as_ref(), resource.provider_id(), resource.name())?;

        let connector = connector::acquire_async(provider.as_ref())?;
        let connector = self.inner.decorator.decorate_async(connector, specification.fetch_policy());

        let raw = resource.fetch_async(connector).await.map_err(ImportError::fetch)?;
        debug!(provider = provider.id(), resource = resource.name(), count = ?raw.count(), "fetched records");
        Ok(AsyncRecordCollection::wrap(raw, RecordOrigin::provider(provider.id(), resource.name())))
    }
}

impl fmt::Debug for Importer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Importer")
            .field("resolver", &self.inner.resolver)
            .field("decorator", &self.inner.decorator)
            .finish()
    }
}

/// Assembles an [`Importer`].
///
/// Without a container the importer only knows the built-in providers. Without a decoration
/// step it uses [`StandardDecorator`] over the configured fetch cache, or a fresh in-memory one.
#[derive(Default)]
pub struct ImporterBuilder {
    container: Option<Arc<dyn ProviderContainer>>,
    decorator: Option<Arc<dyn ConnectorDecorator>>,
    fetch_cache: Option<Arc<dyn FetchCache>>,
}

impl ImporterBuilder {
    pub fn container(self, container: impl ProviderContainer + 'static) -> Self {
        self.shared_container(Arc::new(container))
    }

    pub fn shared_container(mut self, container: Arc<dyn ProviderContainer>) -> Self {
        self.container = Some(container);
        self
    }

    pub fn decorator(mut self, decorator: impl ConnectorDecorator + 'static) -> Self {
        self.decorator = Some(Arc::new(decorator));
        self
    }

    pub fn fetch_cache(mut self, cache: Arc<dyn FetchCache>) -> Self {
        self.fetch_cache = Some(cache);
        self
    }

    pub fn build(self) -> Importer {
        let container = self.container.unwrap_or_else(|| Arc::new(ProviderRegistry::new()));
        let decorator = match (self.decorator, self.fetch_cache) {
            (Some(decorator), None) => decorator,
            (Some(decorator), Some(_)) => {
                warn!("fetch cache ignored: a custom connector decorator was configured");
                decorator
            }
            (None, cache) => {
                let cache = cache.unwrap_or_else(|| Arc::new(MemoryFetchCache::new()));
                Arc::new(StandardDecorator::new(cache)) as Arc<dyn ConnectorDecorator>
            }
        };

        Importer {
            inner: Arc::new(ImporterInner {
                resolver: ProviderResolver::new(container),
                decorator,
            }),
        }
    }
}
