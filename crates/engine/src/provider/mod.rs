//! Providers, their resources, and provider lookup.
//!
//! Modules:
//! - `registry`: User-supplied provider container
//! - `factory`: Fallback factory for the built-in providers
//! - `resolver`: Registry-then-factory lookup plus resource ownership checks
//! - `builtin`: Providers shipped with the engine (`static`, `jsonl`)

mod builtin;
mod factory;
mod registry;
mod resolver;

use std::{fmt, sync::Arc};

use async_trait::async_trait;

pub use builtin::{FileConnector, JsonLinesProvider, JsonLinesResource, NullConnector, StaticDataProvider, StaticResource};
pub use factory::ProviderFactory;
pub use registry::{ProviderContainer, ProviderRegistry};
pub use resolver::ProviderResolver;

use crate::{
    collection::{RawRecordStream, RawRecords},
    connector::{AsyncConnector, AsyncConnectorSupply, Connector, ConnectorSupply},
};

/// A source system reachable through a connector.
pub trait Provider: Send + Sync + fmt::Debug {
    /// Name under which resources refer to this provider.
    fn id(&self) -> &str;

    fn connector(&self) -> ConnectorSupply<'_>;

    /// Asynchronous capability, when the provider has one.
    fn as_async_provider(&self) -> Option<&dyn AsyncProvider> {
        None
    }
}

/// Provider that can also supply an asynchronous connector.
pub trait AsyncProvider: Send + Sync {
    fn async_connector(&self) -> AsyncConnectorSupply<'_>;
}

/// One kind of data offered by a provider.
///
/// A resource names its owning provider by id; it never holds the provider itself.
pub trait ProviderResource: ResourceClone + Send + Sync + fmt::Debug {
    fn provider_id(&self) -> &str;

    fn name(&self) -> &'static str {
        crate::short_type_name(std::any::type_name::<Self>())
    }

    /// Fetch raw records through the connector acquired for this import.
    fn fetch(&self, connector: Arc<dyn Connector>) -> anyhow::Result<RawRecords>;
}

/// Asynchronous counterpart of [`ProviderResource`].
#[async_trait]
pub trait AsyncProviderResource: AsyncResourceClone + Send + Sync + fmt::Debug {
    fn provider_id(&self) -> &str;

    fn name(&self) -> &'static str {
        crate::short_type_name(std::any::type_name::<Self>())
    }

    async fn fetch_async(&self, connector: Arc<dyn AsyncConnector>) -> anyhow::Result<RawRecordStream>;
}

/// Duplication for boxed resources. Implemented for every `Clone` resource.
pub trait ResourceClone {
    fn clone_resource(&self) -> Box<dyn ProviderResource>;
}

impl<T> ResourceClone for T
where
    T: ProviderResource + Clone + 'static,
{
    fn clone_resource(&self) -> Box<dyn ProviderResource> {
        Box::new(self.clone())
    }
}

impl Clone for Box<dyn ProviderResource> {
    fn clone(&self) -> Self {
        (**self).clone_resource()
    }
}

/// Duplication for boxed asynchronous resources.
pub trait AsyncResourceClone {
    fn clone_resource(&self) -> Box<dyn AsyncProviderResource>;
}

impl<T> AsyncResourceClone for T
where
    T: AsyncProviderResource + Clone + 'static,
{
    fn clone_resource(&self) -> Box<dyn AsyncProviderResource> {
        Box::new(self.clone())
    }
}

impl Clone for Box<dyn AsyncProviderResource> {
    fn clone(&self) -> Self {
        (**self).clone_resource()
    }
}
