use std::{fmt, sync::Arc};

use async_trait::async_trait;
use futures_util::StreamExt;

use super::{AsyncTransformer, SyncTransformer, Transformer};
use crate::{AsyncRecordCollection, Context, ImportError, Record, RecordCollection, RecordOrigin, Result};

type Mapper = dyn Fn(Record, &Context) -> anyhow::Result<Record> + Send + Sync;

/// Rewrites every record. Produces one output record per input record, so the count is kept.
#[derive(Clone)]
pub struct MapTransformer {
    mapper: Arc<Mapper>,
}

impl MapTransformer {
    pub fn new<F>(mapper: F) -> Self
    where
        F: Fn(Record, &Context) -> anyhow::Result<Record> + Send + Sync + 'static,
    {
        Self { mapper: Arc::new(mapper) }
    }

    fn apply(mapper: &Mapper, name: &'static str, record: Result<Record>, context: &Context) -> Result<Record> {
        mapper(record?, context).map_err(|error| ImportError::transform(name, error))
    }
}

impl fmt::Debug for MapTransformer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MapTransformer").finish_non_exhaustive()
    }
}

impl Transformer for MapTransformer {
    fn as_sync(&self) -> Option<&dyn SyncTransformer> {
        Some(self)
    }

    fn as_async(&self) -> Option<&dyn AsyncTransformer> {
        Some(self)
    }
}

impl SyncTransformer for MapTransformer {
    fn transform(&self, records: RecordCollection, context: &Context) -> anyhow::Result<RecordCollection> {
        let count = records.record_count();
        let mapper = Arc::clone(&self.mapper);
        let context = context.clone();
        let name = self.name();
        let mapped = records.map(move |record| Self::apply(mapper.as_ref(), name, record, &context));
        Ok(RecordCollection::new(mapped, count, RecordOrigin::transformed(name)))
    }
}

#[async_trait]
impl AsyncTransformer for MapTransformer {
    async fn transform_async(&self, records: AsyncRecordCollection, context: &Context) -> anyhow::Result<AsyncRecordCollection> {
        let count = records.record_count();
        let mapper = Arc::clone(&self.mapper);
        let context = context.clone();
        let name = self.name();
        let mapped = records.map(move |record| Self::apply(mapper.as_ref(), name, record, &context));
        Ok(AsyncRecordCollection::new(mapped, count, RecordOrigin::transformed(name)))
    }
}
