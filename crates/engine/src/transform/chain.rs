use std::sync::Arc;

use tracing::debug;

use super::Transformer;
use crate::{AsyncRecordCollection, ConfigurationError, Context, ImportError, Importer, RecordCollection, Result};

/// Apply `transformers` in order, each to the previous step's output.
///
/// Every transformer must support synchronous execution; the first one that does not
/// fails the chain before it runs.
pub fn apply_all(
    mut records: RecordCollection,
    transformers: &[Arc<dyn Transformer>],
    context: &Context,
    importer: &Importer,
) -> Result<RecordCollection> {
    for transformer in transformers {
        let name = transformer.name();
        let sync = transformer
            .as_sync()
            .ok_or_else(|| ConfigurationError::async_transformer_in_sync_import(name))?;
        inject_importer(transformer.as_ref(), importer);

        debug!(transformer = name, count = ?records.record_count(), "applying transformer");
        records = sync
            .transform(records, context)
            .map_err(|error| ImportError::transform(name, error))?;
    }
    Ok(records)
}

/// Asynchronous counterpart of [`apply_all`]. Each step is awaited as a whole.
pub async fn apply_all_async(
    mut records: AsyncRecordCollection,
    transformers: &[Arc<dyn Transformer>],
    context: &Context,
    importer: &Importer,
) -> Result<AsyncRecordCollection> {
    for transformer in transformers {
        let name = transformer.name();
        let asynchronous = transformer
            .as_async()
            .ok_or_else(|| ConfigurationError::sync_transformer_in_async_import(name))?;
        inject_importer(transformer.as_ref(), importer);

        debug!(transformer = name, count = ?records.record_count(), "applying async transformer");
        records = asynchronous
            .transform_async(records, context)
            .await
            .map_err(|error| ImportError::transform(name, error))?;
    }
    Ok(records)
}

fn inject_importer(transformer: &dyn Transformer, importer: &Importer) {
    if let Some(aware) = transformer.as_importer_aware() {
        aware.set_importer(importer.clone());
    }
}
