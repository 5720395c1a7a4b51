use std::fmt;

use super::RecordOrigin;
use crate::{Record, Result};

/// Boxed single-pass record iterator.
pub type BoxedRecords = Box<dyn Iterator<Item = Result<Record>> + Send>;

/// Raw sequence returned by a resource fetch, before the engine wraps it.
pub struct RawRecords {
    records: BoxedRecords,
    count: Option<usize>,
}

impl RawRecords {
    /// Sequence whose length is unknown until it has been consumed.
    pub fn lazy<I>(records: I) -> Self
    where
        I: IntoIterator<Item = Result<Record>>,
        I::IntoIter: Send + 'static,
    {
        Self {
            records: Box::new(records.into_iter()),
            count: None,
        }
    }

    /// Sequence that knows its exact length without being consumed.
    pub fn counted<I>(records: I) -> Self
    where
        I: IntoIterator<Item = Result<Record>>,
        I::IntoIter: ExactSizeIterator + Send + 'static,
    {
        let records = records.into_iter();
        let count = records.len();
        Self {
            records: Box::new(records),
            count: Some(count),
        }
    }

    /// Sequence with a length reported eagerly by the producer, e.g. a total from a response header.
    ///
    /// The producer guarantees the sequence yields exactly `count` records.
    pub fn with_count<I>(records: I, count: usize) -> Self
    where
        I: IntoIterator<Item = Result<Record>>,
        I::IntoIter: Send + 'static,
    {
        Self {
            records: Box::new(records.into_iter()),
            count: Some(count),
        }
    }

    pub fn count(&self) -> Option<usize> {
        self.count
    }
}

impl From<Vec<Record>> for RawRecords {
    fn from(records: Vec<Record>) -> Self {
        Self::counted(records.into_iter().map(Ok))
    }
}

impl fmt::Debug for RawRecords {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawRecords").field("count", &self.count).finish()
    }
}

/// Lazy, single-pass sequence of records pulled by the caller.
///
/// Provider-level collections wrap raw fetch output; transformers return new collections;
/// the importer hands back an import-level collection. All share this one type and differ
/// only in their [`RecordOrigin`].
pub struct RecordCollection {
    records: BoxedRecords,
    count: Option<usize>,
    origin: RecordOrigin,
}

impl RecordCollection {
    /// Build a collection from any record iterator.
    ///
    /// `count` must only be set when it equals the number of records `records` yields.
    pub fn new<I>(records: I, count: Option<usize>, origin: RecordOrigin) -> Self
    where
        I: IntoIterator<Item = Result<Record>>,
        I::IntoIter: Send + 'static,
    {
        Self {
            records: Box::new(records.into_iter()),
            count,
            origin,
        }
    }

    /// Wrap raw fetch output, keeping its count when it reported one.
    pub fn wrap(raw: RawRecords, origin: RecordOrigin) -> Self {
        Self {
            records: raw.records,
            count: raw.count,
            origin,
        }
    }

    /// Number of records this collection yields, when known without consuming it.
    pub fn record_count(&self) -> Option<usize> {
        self.count
    }

    pub fn is_countable(&self) -> bool {
        self.count.is_some()
    }

    pub fn origin(&self) -> &RecordOrigin {
        &self.origin
    }

    /// Re-label the collection without touching its records or count.
    pub(crate) fn with_origin(self, origin: RecordOrigin) -> Self {
        Self { origin, ..self }
    }
}

impl Iterator for RecordCollection {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        self.records.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.records.size_hint()
    }
}

impl fmt::Debug for RecordCollection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordCollection")
            .field("count", &self.count)
            .field("origin", &self.origin)
            .finish()
    }
}
