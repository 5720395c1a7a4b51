//! Lazy record collections.
//!
//! Two execution modes share one contract:
//! - `sync`: [`RecordCollection`] is a single-pass [`Iterator`]
//! - `stream`: [`AsyncRecordCollection`] is a single-pass [`futures_util::Stream`]
//!
//! Both may carry a count when the producer knows its length up front. The count is
//! informational: it is never used to answer "how many" by consuming the sequence.

mod stream;
mod sync;

use std::fmt;

pub use stream::{AsyncRecordCollection, BoxedRecordStream, RawRecordStream};
pub use sync::{BoxedRecords, RawRecords, RecordCollection};

/// Where a collection came from. Used for diagnostics only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordOrigin {
    /// Raw output of a resource fetch.
    Provider { provider: String, resource: String },
    /// Output of one transformer step.
    Transformed { transformer: String },
    /// Final output of an import, after all transformers ran.
    Import { provider: String, resource: String },
}

impl RecordOrigin {
    pub fn provider(provider: impl Into<String>, resource: impl Into<String>) -> Self {
        Self::Provider {
            provider: provider.into(),
            resource: resource.into(),
        }
    }

    pub fn transformed(transformer: impl Into<String>) -> Self {
        Self::Transformed {
            transformer: transformer.into(),
        }
    }

    pub fn import(provider: impl Into<String>, resource: impl Into<String>) -> Self {
        Self::Import {
            provider: provider.into(),
            resource: resource.into(),
        }
    }
}

impl fmt::Display for RecordOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Provider { provider, resource } => write!(f, "{provider}/{resource} (fetched)"),
            Self::Transformed { transformer } => write!(f, "{transformer} (transformed)"),
            Self::Import { provider, resource } => write!(f, "{provider}/{resource} (imported)"),
        }
    }
}
