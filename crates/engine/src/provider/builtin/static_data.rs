use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::{
    Record,
    collection::{RawRecordStream, RawRecords},
    connector::{AsyncConnector, AsyncConnectorSupply, Connector, ConnectorInfo, ConnectorSupply, DataSource},
    provider::{AsyncProvider, AsyncProviderResource, Provider, ProviderResource},
};

/// Connector for providers that have nothing to transport. Every fetch yields `null`.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullConnector;

impl ConnectorInfo for NullConnector {}

impl Connector for NullConnector {
    fn fetch(&self, _source: &DataSource) -> anyhow::Result<Value> {
        Ok(Value::Null)
    }
}

#[async_trait]
impl AsyncConnector for NullConnector {
    async fn fetch_async(&self, _source: &DataSource) -> anyhow::Result<Value> {
        Ok(Value::Null)
    }
}

/// Provider serving records held in memory by its resources.
#[derive(Debug, Clone, Default)]
pub struct StaticDataProvider {
    connector: Arc<NullConnector>,
}

impl StaticDataProvider {
    pub const ID: &'static str = "static";

    pub fn new() -> Self {
        Self::default()
    }
}

impl Provider for StaticDataProvider {
    fn id(&self) -> &str {
        Self::ID
    }

    fn connector(&self) -> ConnectorSupply<'_> {
        ConnectorSupply::Shared(self.connector.clone())
    }

    fn as_async_provider(&self) -> Option<&dyn AsyncProvider> {
        Some(self)
    }
}

impl AsyncProvider for StaticDataProvider {
    fn async_connector(&self) -> AsyncConnectorSupply<'_> {
        AsyncConnectorSupply::Shared(self.connector.clone())
    }
}

/// Fixed set of records owned by the `static` provider.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StaticResource {
    records: Vec<Record>,
}

impl StaticResource {
    pub fn new(records: impl IntoIterator<Item = Record>) -> Self {
        Self {
            records: records.into_iter().collect(),
        }
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn records_mut(&mut self) -> &mut Vec<Record> {
        &mut self.records
    }
}

impl ProviderResource for StaticResource {
    fn provider_id(&self) -> &str {
        StaticDataProvider::ID
    }

    fn fetch(&self, _connector: Arc<dyn Connector>) -> anyhow::Result<RawRecords> {
        Ok(RawRecords::from(self.records.clone()))
    }
}

#[async_trait]
impl AsyncProviderResource for StaticResource {
    fn provider_id(&self) -> &str {
        StaticDataProvider::ID
    }

    async fn fetch_async(&self, _connector: Arc<dyn AsyncConnector>) -> anyhow::Result<RawRecordStream> {
        Ok(RawRecordStream::from(self.records.clone()))
    }
}
