use std::{fmt, sync::Arc};

use once_cell::sync::OnceCell;
use tracing::debug;

use super::{Provider, ProviderContainer, ProviderFactory};
use crate::{ImportError, Result};

/// Resolves provider names: the user container first, then the built-in factory.
pub struct ProviderResolver {
    container: Arc<dyn ProviderContainer>,
    factory: OnceCell<ProviderFactory>,
}

impl ProviderResolver {
    pub fn new(container: Arc<dyn ProviderContainer>) -> Self {
        Self {
            container,
            factory: OnceCell::new(),
        }
    }

    pub fn container(&self) -> &Arc<dyn ProviderContainer> {
        &self.container
    }

    /// Look up `name`, falling back to the factory. The factory is only built on first fallback.
    pub fn resolve(&self, name: &str) -> Result<Arc<dyn Provider>> {
        if let Some(provider) = self.container.get(name) {
            debug!(provider = name, source = "container", "resolved provider");
            return Ok(provider);
        }

        let factory = self.factory.get_or_init(ProviderFactory::new);
        match factory.create_provider(name) {
            Some(provider) => {
                debug!(provider = name, source = "factory", "resolved provider");
                Ok(provider)
            }
            None => Err(ImportError::provider_not_found(name)),
        }
    }

    /// Fail unless the resolved provider is the one the resource belongs to.
    pub fn ensure_resource_owner(provider: &dyn Provider, owner: &str, resource: &str) -> Result<()> {
        if provider.id() != owner {
            return Err(ImportError::foreign_resource(resource, owner, provider.id()));
        }
        Ok(())
    }
}

impl fmt::Debug for ProviderResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderResolver")
            .field("factory_initialized", &self.factory.get().is_some())
            .finish_non_exhaustive()
    }
}
