//! Record transformers and the chain that applies them.
//!
//! Modules:
//! - `chain`: Left fold of a specification's transformers over a collection
//! - `filter`: Predicate-based record filter
//! - `map`: Per-record rewrite

mod chain;
mod filter;
mod map;

use std::fmt;

use async_trait::async_trait;

pub use chain::{apply_all, apply_all_async};
pub use filter::FilterTransformer;
pub use map::MapTransformer;

use crate::{AsyncRecordCollection, Context, Importer, RecordCollection};

/// A step in an import's transformation chain.
///
/// Execution modes are capabilities: a transformer answers `Some` from [`Transformer::as_sync`]
/// and/or [`Transformer::as_async`] for each mode it supports.
pub trait Transformer: TransformerClone + Send + Sync + fmt::Debug {
    fn name(&self) -> &'static str {
        crate::short_type_name(std::any::type_name::<Self>())
    }

    fn as_sync(&self) -> Option<&dyn SyncTransformer> {
        None
    }

    fn as_async(&self) -> Option<&dyn AsyncTransformer> {
        None
    }

    /// Transformers that run nested imports ask for the importer here.
    fn as_importer_aware(&self) -> Option<&dyn ImporterAware> {
        None
    }
}

pub trait SyncTransformer: Send + Sync {
    /// Consume `records` and return the transformed collection.
    fn transform(&self, records: RecordCollection, context: &Context) -> anyhow::Result<RecordCollection>;
}

#[async_trait]
pub trait AsyncTransformer: Send + Sync {
    async fn transform_async(&self, records: AsyncRecordCollection, context: &Context) -> anyhow::Result<AsyncRecordCollection>;
}

/// Receives the running importer before the transformer is invoked.
pub trait ImporterAware: Send + Sync {
    fn set_importer(&self, importer: Importer);
}

/// Duplication for shared transformers. Implemented for every `Clone` transformer.
pub trait TransformerClone {
    fn clone_transformer(&self) -> Box<dyn Transformer>;
}

impl<T> TransformerClone for T
where
    T: Transformer + Clone + 'static,
{
    fn clone_transformer(&self) -> Box<dyn Transformer> {
        Box::new(self.clone())
    }
}

impl Clone for Box<dyn Transformer> {
    fn clone(&self) -> Self {
        (**self).clone_transformer()
    }
}
