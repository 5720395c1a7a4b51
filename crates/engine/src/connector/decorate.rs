use std::{
    fmt,
    sync::{Arc, Mutex, PoisonError},
    thread,
};

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, warn};

use super::{
    AsyncConnector, Connector, ConnectorInfo, ConnectorOptions, DataSource, FetchCache, FetchExceptionHandler, MemoryFetchCache,
    RecoverableError, RetryDecision,
};
use crate::FetchPolicy;

/// Step applied to every acquired connector before the resource fetches through it.
///
/// The importer treats this as an opaque `(connector, policy) -> connector` transformation.
pub trait ConnectorDecorator: Send + Sync + fmt::Debug {
    fn decorate(&self, connector: Arc<dyn Connector>, policy: &FetchPolicy) -> Arc<dyn Connector>;
    fn decorate_async(&self, connector: Arc<dyn AsyncConnector>, policy: &FetchPolicy) -> Arc<dyn AsyncConnector>;
}

/// Hands connectors through untouched.
#[derive(Debug, Default, Clone, Copy)]
pub struct PassthroughDecorator;

impl ConnectorDecorator for PassthroughDecorator {
    fn decorate(&self, connector: Arc<dyn Connector>, _policy: &FetchPolicy) -> Arc<dyn Connector> {
        connector
    }

    fn decorate_async(&self, connector: Arc<dyn AsyncConnector>, _policy: &FetchPolicy) -> Arc<dyn AsyncConnector> {
        connector
    }
}

/// Wraps connectors with payload caching (when the policy asks for it) and bounded retries.
#[derive(Debug, Clone)]
pub struct StandardDecorator {
    cache: Arc<dyn FetchCache>,
}

impl StandardDecorator {
    pub fn new(cache: Arc<dyn FetchCache>) -> Self {
        Self { cache }
    }

    pub fn cache(&self) -> &Arc<dyn FetchCache> {
        &self.cache
    }

    fn cache_for(&self, policy: &FetchPolicy) -> Option<Arc<dyn FetchCache>> {
        policy.must_cache().then(|| Arc::clone(&self.cache))
    }
}

impl Default for StandardDecorator {
    fn default() -> Self {
        Self::new(Arc::new(MemoryFetchCache::new()))
    }
}

impl ConnectorDecorator for StandardDecorator {
    fn decorate(&self, connector: Arc<dyn Connector>, policy: &FetchPolicy) -> Arc<dyn Connector> {
        Arc::new(ImportConnector {
            inner: connector,
            cache: self.cache_for(policy),
            retry: RetryState::from_policy(policy),
        })
    }

    fn decorate_async(&self, connector: Arc<dyn AsyncConnector>, policy: &FetchPolicy) -> Arc<dyn AsyncConnector> {
        Arc::new(AsyncImportConnector {
            inner: connector,
            cache: self.cache_for(policy),
            retry: RetryState::from_policy(policy),
        })
    }
}

/// Attempt bookkeeping shared by both decorated connector flavours.
#[derive(Debug)]
struct RetryState {
    max_attempts: u64,
    handler: Mutex<Option<Box<dyn FetchExceptionHandler>>>,
}

impl RetryState {
    fn from_policy(policy: &FetchPolicy) -> Self {
        Self {
            max_attempts: policy.max_fetch_attempts(),
            handler: Mutex::new(policy.fetch_exception_handler().map(|handler| handler.clone_handler())),
        }
    }

    /// Decide what follows failed attempt `attempt`. `None` means the error is final.
    ///
    /// Errors not marked recoverable are final on the first attempt.
    fn after_failure(&self, connector: &str, source: &DataSource, error: &anyhow::Error, attempt: u64) -> Option<RetryDecision> {
        if !RecoverableError::is_recoverable(error) {
            debug!(connector, location = source.location(), error = %error, "fetch failed; error is not recoverable");
            return None;
        }
        if attempt >= self.max_attempts {
            return None;
        }
        let decision = match self.handler.lock().unwrap_or_else(PoisonError::into_inner).as_mut() {
            Some(handler) => handler.handle(error, attempt),
            None => RetryDecision::immediately(),
        };
        match decision {
            RetryDecision::Abort => None,
            RetryDecision::Retry { delay } => {
                warn!(
                    connector,
                    location = source.location(),
                    attempt,
                    max_attempts = self.max_attempts,
                    delay = ?delay,
                    error = %error,
                    "fetch attempt failed; retrying"
                );
                Some(decision)
            }
        }
    }

    fn exhausted(&self, error: anyhow::Error, attempt: u64) -> anyhow::Error {
        if attempt > 1 {
            error.context(format!("fetch failed after {attempt} attempts"))
        } else {
            error
        }
    }
}

fn cached(cache: Option<&Arc<dyn FetchCache>>, key: Option<&String>) -> Option<Value> {
    let value = cache?.get(key?)?;
    debug!(cache_key = key.map(String::as_str).unwrap_or_default(), "fetch cache hit");
    Some(value)
}

/// Synchronous connector produced by [`StandardDecorator`].
#[derive(Debug)]
pub struct ImportConnector {
    inner: Arc<dyn Connector>,
    cache: Option<Arc<dyn FetchCache>>,
    retry: RetryState,
}

impl ImportConnector {
    pub fn inner(&self) -> &Arc<dyn Connector> {
        &self.inner
    }

    fn fetch_with_retry(&self, source: &DataSource) -> anyhow::Result<Value> {
        let mut attempt = 1;
        loop {
            let error = match self.inner.fetch(source) {
                Ok(value) => return Ok(value),
                Err(error) => error,
            };
            match self.retry.after_failure(self.inner.name(), source, &error, attempt) {
                Some(RetryDecision::Retry { delay }) if !delay.is_zero() => thread::sleep(delay),
                Some(_) => {}
                None => return Err(self.retry.exhausted(error, attempt)),
            }
            attempt += 1;
        }
    }
}

impl ConnectorInfo for ImportConnector {
    fn options(&self) -> Option<&ConnectorOptions> {
        self.inner.options()
    }

    fn name(&self) -> &'static str {
        self.inner.name()
    }
}

impl Connector for ImportConnector {
    fn fetch(&self, source: &DataSource) -> anyhow::Result<Value> {
        let key = self.cache.as_ref().map(|_| source.cache_key(self.inner.options()));
        if let Some(value) = cached(self.cache.as_ref(), key.as_ref()) {
            return Ok(value);
        }

        let value = self.fetch_with_retry(source)?;
        if let (Some(cache), Some(key)) = (&self.cache, key) {
            debug!(cache_key = %key, "fetch cache store");
            cache.put(key, value.clone());
        }
        Ok(value)
    }
}

/// Asynchronous connector produced by [`StandardDecorator`].
#[derive(Debug)]
pub struct AsyncImportConnector {
    inner: Arc<dyn AsyncConnector>,
    cache: Option<Arc<dyn FetchCache>>,
    retry: RetryState,
}

impl AsyncImportConnector {
    pub fn inner(&self) -> &Arc<dyn AsyncConnector> {
        &self.inner
    }

    async fn fetch_with_retry(&self, source: &DataSource) -> anyhow::Result<Value> {
        let mut attempt = 1;
        loop {
            let error = match self.inner.fetch_async(source).await {
                Ok(value) => return Ok(value),
                Err(error) => error,
            };
            match self.retry.after_failure(self.inner.name(), source, &error, attempt) {
                Some(RetryDecision::Retry { delay }) if !delay.is_zero() => tokio::time::sleep(delay).await,
                Some(_) => {}
                None => return Err(self.retry.exhausted(error, attempt)),
            }
            attempt += 1;
        }
    }
}

impl ConnectorInfo for AsyncImportConnector {
    fn options(&self) -> Option<&ConnectorOptions> {
        self.inner.options()
    }

    fn name(&self) -> &'static str {
        self.inner.name()
    }
}

#[async_trait]
impl AsyncConnector for AsyncImportConnector {
    async fn fetch_async(&self, source: &DataSource) -> anyhow::Result<Value> {
        let key = self.cache.as_ref().map(|_| source.cache_key(self.inner.options()));
        if let Some(value) = cached(self.cache.as_ref(), key.as_ref()) {
            return Ok(value);
        }

        let value = self.fetch_with_retry(source).await?;
        if let (Some(cache), Some(key)) = (&self.cache, key) {
            debug!(cache_key = %key, "fetch cache store");
            cache.put(key, value.clone());
        }
        Ok(value)
    }
}
