//! Import specifications: what to fetch, from whom, and how to transform it.

use std::sync::Arc;

use crate::{
    Context, ImportError, Result,
    connector::FetchExceptionHandler,
    provider::{AsyncProviderResource, ProviderResource},
    transform::Transformer,
};

/// Fetch attempts made before a failure is surfaced, unless a specification says otherwise.
pub const DEFAULT_MAX_FETCH_ATTEMPTS: u64 = 5;

/// Settings consumed by the connector decoration step.
#[derive(Debug, Clone)]
pub struct FetchPolicy {
    cache: bool,
    max_fetch_attempts: u64,
    exception_handler: Option<Box<dyn FetchExceptionHandler>>,
}

impl Default for FetchPolicy {
    fn default() -> Self {
        Self {
            cache: false,
            max_fetch_attempts: DEFAULT_MAX_FETCH_ATTEMPTS,
            exception_handler: None,
        }
    }
}

impl FetchPolicy {
    pub fn with_cache(mut self, cache: bool) -> Self {
        self.cache = cache;
        self
    }

    /// Set the fetch attempt budget. Fails unless `attempts` is at least one.
    pub fn with_max_fetch_attempts(mut self, attempts: u64) -> Result<Self> {
        self.max_fetch_attempts = positive_attempts(attempts)?;
        Ok(self)
    }

    pub fn with_exception_handler(mut self, handler: impl FetchExceptionHandler + 'static) -> Self {
        self.exception_handler = Some(Box::new(handler));
        self
    }

    pub fn must_cache(&self) -> bool {
        self.cache
    }

    pub fn max_fetch_attempts(&self) -> u64 {
        self.max_fetch_attempts
    }

    pub fn fetch_exception_handler(&self) -> Option<&dyn FetchExceptionHandler> {
        self.exception_handler.as_deref()
    }
}

fn positive_attempts<T>(attempts: T) -> Result<u64>
where
    T: Copy + std::fmt::Display + TryInto<u64>,
{
    attempts
        .try_into()
        .ok()
        .filter(|&attempts: &u64| attempts >= 1)
        .ok_or_else(|| ImportError::invalid_argument(format!("max fetch attempts must be a positive integer, got {attempts}")))
}

/// Describes one import. The importer always works on a clone, so a specification can be
/// reused and is never changed by importing it.
pub struct Specification<R: ?Sized> {
    resource: Box<R>,
    provider_name: Option<String>,
    transformers: Vec<Arc<dyn Transformer>>,
    context: Context,
    fetch: FetchPolicy,
}

/// Specification for a synchronous import.
pub type ImportSpecification = Specification<dyn ProviderResource>;

/// Specification for an asynchronous import.
pub type AsyncImportSpecification = Specification<dyn AsyncProviderResource>;

impl Specification<dyn ProviderResource> {
    pub fn new(resource: impl ProviderResource + 'static) -> Self {
        Self::from_boxed(Box::new(resource))
    }

    /// Provider name the import resolves: the override when set, the resource's owner otherwise.
    pub fn effective_provider_name(&self) -> &str {
        self.provider_name.as_deref().unwrap_or_else(|| self.resource.provider_id())
    }
}

impl Specification<dyn AsyncProviderResource> {
    pub fn new(resource: impl AsyncProviderResource + 'static) -> Self {
        Self::from_boxed(Box::new(resource))
    }

    pub fn effective_provider_name(&self) -> &str {
        self.provider_name.as_deref().unwrap_or_else(|| self.resource.provider_id())
    }
}

impl<R: ?Sized> Specification<R> {
    pub fn from_boxed(resource: Box<R>) -> Self {
        Self {
            resource,
            provider_name: None,
            transformers: Vec::new(),
            context: Context::Null,
            fetch: FetchPolicy::default(),
        }
    }

    pub fn resource(&self) -> &R {
        &self.resource
    }

    pub fn resource_mut(&mut self) -> &mut R {
        &mut self.resource
    }

    pub fn provider_name(&self) -> Option<&str> {
        self.provider_name.as_deref()
    }

    /// Resolve this name instead of the resource's owning provider id.
    pub fn set_provider_name(&mut self, name: impl Into<String>) -> &mut Self {
        self.provider_name = Some(name.into());
        self
    }

    pub fn clear_provider_name(&mut self) -> &mut Self {
        self.provider_name = None;
        self
    }

    pub fn transformers(&self) -> &[Arc<dyn Transformer>] {
        &self.transformers
    }

    /// Append a transformer. The same instance may only be added once.
    pub fn add_transformer(&mut self, transformer: Arc<dyn Transformer>) -> Result<&mut Self> {
        if self.transformers.iter().any(|existing| std::ptr::addr_eq(Arc::as_ptr(existing), Arc::as_ptr(&transformer))) {
            return Err(ImportError::duplicate_transformer(transformer.name()));
        }
        self.transformers.push(transformer);
        Ok(self)
    }

    /// Append several transformers in order, stopping at the first duplicate.
    pub fn add_transformers<I>(&mut self, transformers: I) -> Result<&mut Self>
    where
        I: IntoIterator<Item = Arc<dyn Transformer>>,
    {
        for transformer in transformers {
            self.add_transformer(transformer)?;
        }
        Ok(self)
    }

    pub fn context(&self) -> &Context {
        &self.context
    }

    pub fn set_context(&mut self, context: Context) -> &mut Self {
        self.context = context;
        self
    }

    pub fn must_cache(&self) -> bool {
        self.fetch.cache
    }

    pub fn enable_cache(&mut self) -> &mut Self {
        self.fetch.cache = true;
        self
    }

    pub fn disable_cache(&mut self) -> &mut Self {
        self.fetch.cache = false;
        self
    }

    pub fn max_fetch_attempts(&self) -> u64 {
        self.fetch.max_fetch_attempts
    }

    /// Set the fetch attempt budget. Fails unless `attempts` is at least one.
    pub fn set_max_fetch_attempts(&mut self, attempts: i64) -> Result<&mut Self> {
        self.fetch.max_fetch_attempts = positive_attempts(attempts)?;
        Ok(self)
    }

    pub fn fetch_exception_handler(&self) -> Option<&dyn FetchExceptionHandler> {
        self.fetch.fetch_exception_handler()
    }

    pub fn fetch_exception_handler_mut(&mut self) -> Option<&mut (dyn FetchExceptionHandler + 'static)> {
        self.fetch.exception_handler.as_deref_mut()
    }

    pub fn set_fetch_exception_handler(&mut self, handler: impl FetchExceptionHandler + 'static) -> &mut Self {
        self.fetch.exception_handler = Some(Box::new(handler));
        self
    }

    pub fn clear_fetch_exception_handler(&mut self) -> &mut Self {
        self.fetch.exception_handler = None;
        self
    }

    pub fn fetch_policy(&self) -> &FetchPolicy {
        &self.fetch
    }
}

impl<R: ?Sized> Clone for Specification<R>
where
    Box<R>: Clone,
{
    /// Deep copy: resource, every transformer, context and exception handler are duplicated.
    fn clone(&self) -> Self {
        Self {
            resource: self.resource.clone(),
            provider_name: self.provider_name.clone(),
            transformers: self
                .transformers
                .iter()
                .map(|transformer| Arc::from(transformer.clone_transformer()))
                .collect(),
            context: self.context.clone(),
            fetch: self.fetch.clone(),
        }
    }
}

impl<R: ?Sized + std::fmt::Debug> std::fmt::Debug for Specification<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Specification")
            .field("resource", &self.resource)
            .field("provider_name", &self.provider_name)
            .field("transformers", &self.transformers)
            .field("context", &self.context)
            .field("fetch", &self.fetch)
            .finish()
    }
}
