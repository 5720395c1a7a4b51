use std::sync::Arc;

use indexmap::IndexMap;
use tracing::debug;

use super::Provider;

/// Lookup capability over user-supplied providers.
pub trait ProviderContainer: Send + Sync {
    fn get(&self, name: &str) -> Option<Arc<dyn Provider>>;

    fn has(&self, name: &str) -> bool {
        self.get(name).is_some()
    }
}

/// Ordered provider container keyed by provider name.
///
/// Registering under a name that already exists replaces the earlier provider.
#[derive(Debug, Clone, Default)]
pub struct ProviderRegistry {
    providers: IndexMap<String, Arc<dyn Provider>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a provider under its own id.
    pub fn register(&mut self, provider: impl Provider + 'static) -> &mut Self {
        let provider: Arc<dyn Provider> = Arc::new(provider);
        let name = provider.id().to_string();
        self.register_as(name, provider)
    }

    /// Register a provider under an explicit name, e.g. a second configuration of the same provider type.
    pub fn register_as(&mut self, name: impl Into<String>, provider: Arc<dyn Provider>) -> &mut Self {
        let name = name.into();
        debug!(provider = %name, "registering provider");
        if self.providers.insert(name.clone(), provider).is_some() {
            debug!(provider = %name, "replaced previously registered provider");
        }
        self
    }

    pub fn with_provider(mut self, provider: impl Provider + 'static) -> Self {
        self.register(provider);
        self
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.providers.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

impl ProviderContainer for ProviderRegistry {
    fn get(&self, name: &str) -> Option<Arc<dyn Provider>> {
        self.providers.get(name).cloned()
    }

    fn has(&self, name: &str) -> bool {
        self.providers.contains_key(name)
    }
}
