use std::sync::Arc;

use super::{JsonLinesProvider, Provider, StaticDataProvider};

/// Creates built-in providers on demand when the container has no entry for a name.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProviderFactory;

impl ProviderFactory {
    pub const BUILTIN: [&'static str; 2] = [StaticDataProvider::ID, JsonLinesProvider::ID];

    pub fn new() -> Self {
        Self
    }

    pub fn create_provider(&self, name: &str) -> Option<Arc<dyn Provider>> {
        match name {
            StaticDataProvider::ID => Some(Arc::new(StaticDataProvider::new())),
            JsonLinesProvider::ID => Some(Arc::new(JsonLinesProvider::new())),
            _ => None,
        }
    }
}
