use std::{fmt, sync::Arc};

use async_trait::async_trait;
use futures_util::{StreamExt, future};

use super::{AsyncTransformer, SyncTransformer, Transformer};
use crate::{AsyncRecordCollection, Context, Record, RecordCollection, RecordOrigin};

type Predicate = dyn Fn(&Record, &Context) -> bool + Send + Sync;

/// Keeps the records a predicate accepts. Record errors pass through untouched.
///
/// The output is never countable: its length is unknown until the input has been consumed.
#[derive(Clone)]
pub struct FilterTransformer {
    predicate: Arc<Predicate>,
}

impl FilterTransformer {
    pub fn new<F>(predicate: F) -> Self
    where
        F: Fn(&Record, &Context) -> bool + Send + Sync + 'static,
    {
        Self {
            predicate: Arc::new(predicate),
        }
    }

    fn keep(predicate: &Predicate, record: &crate::Result<Record>, context: &Context) -> bool {
        match record {
            Ok(record) => predicate(record, context),
            Err(_) => true,
        }
    }
}

impl fmt::Debug for FilterTransformer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilterTransformer").finish_non_exhaustive()
    }
}

impl Transformer for FilterTransformer {
    fn as_sync(&self) -> Option<&dyn SyncTransformer> {
        Some(self)
    }

    fn as_async(&self) -> Option<&dyn AsyncTransformer> {
        Some(self)
    }
}

impl SyncTransformer for FilterTransformer {
    fn transform(&self, records: RecordCollection, context: &Context) -> anyhow::Result<RecordCollection> {
        let predicate = Arc::clone(&self.predicate);
        let context = context.clone();
        let filtered = records.filter(move |record| Self::keep(predicate.as_ref(), record, &context));
        Ok(RecordCollection::new(filtered, None, RecordOrigin::transformed(self.name())))
    }
}

#[async_trait]
impl AsyncTransformer for FilterTransformer {
    async fn transform_async(&self, records: AsyncRecordCollection, context: &Context) -> anyhow::Result<AsyncRecordCollection> {
        let predicate = Arc::clone(&self.predicate);
        let context = context.clone();
        let filtered = records.filter(move |record| future::ready(Self::keep(predicate.as_ref(), record, &context)));
        Ok(AsyncRecordCollection::new(filtered, None, RecordOrigin::transformed(self.name())))
    }
}
