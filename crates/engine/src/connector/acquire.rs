use std::sync::Arc;

use tracing::debug;

use super::{AsyncConnector, AsyncConnectorSupply, Connector, ConnectorInfo, ConnectorSupply};
use crate::{ConfigurationError, Provider, Result};

/// Obtain the synchronous connector a single import will use.
///
/// Isolated connectors are duplicated so option changes made during this import never
/// reach the provider's instance or any other import. A shared connector that reports
/// options is rejected: sharing it would leak option values between imports.
pub fn acquire(provider: &dyn Provider) -> Result<Arc<dyn Connector>> {
    match provider.connector() {
        ConnectorSupply::Shared(connector) => {
            ensure_stateless(connector.as_ref())?;
            debug!(provider = provider.id(), connector = connector.name(), "using shared connector");
            Ok(connector)
        }
        ConnectorSupply::Isolated(connector) => {
            debug!(provider = provider.id(), connector = connector.name(), "duplicating isolated connector");
            Ok(Arc::from(connector.duplicate()))
        }
    }
}

/// Obtain the asynchronous connector a single import will use.
///
/// Fails when the provider has no asynchronous capability at all.
pub fn acquire_async(provider: &dyn Provider) -> Result<Arc<dyn AsyncConnector>> {
    let async_provider = provider
        .as_async_provider()
        .ok_or_else(|| ConfigurationError::async_unsupported(provider.id()))?;

    match async_provider.async_connector() {
        AsyncConnectorSupply::Shared(connector) => {
            ensure_stateless(connector.as_ref())?;
            debug!(provider = provider.id(), connector = connector.name(), "using shared async connector");
            Ok(connector)
        }
        AsyncConnectorSupply::Isolated(connector) => {
            debug!(provider = provider.id(), connector = connector.name(), "duplicating isolated async connector");
            Ok(Arc::from(connector.duplicate()))
        }
    }
}

fn ensure_stateless<C: ConnectorInfo + ?Sized>(connector: &C) -> Result<()> {
    if connector.options().is_some() {
        return Err(ConfigurationError::shared_connector_options(connector.name()).into());
    }
    Ok(())
}
