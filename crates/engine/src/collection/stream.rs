use std::{
    fmt,
    pin::Pin,
    task::{Context as TaskContext, Poll},
};

use futures_util::stream::{self, BoxStream, Stream, StreamExt};

use super::RecordOrigin;
use crate::{Record, Result};

/// Boxed single-pass record stream.
pub type BoxedRecordStream = BoxStream<'static, Result<Record>>;

/// Raw stream returned by an asynchronous resource fetch.
pub struct RawRecordStream {
    records: BoxedRecordStream,
    count: Option<usize>,
}

impl RawRecordStream {
    /// Stream whose length is unknown until it has been consumed.
    pub fn lazy<S>(records: S) -> Self
    where
        S: Stream<Item = Result<Record>> + Send + 'static,
    {
        Self {
            records: records.boxed(),
            count: None,
        }
    }

    /// Stream with a length reported eagerly by the producer.
    ///
    /// The producer guarantees the stream yields exactly `count` records.
    pub fn with_count<S>(records: S, count: usize) -> Self
    where
        S: Stream<Item = Result<Record>> + Send + 'static,
    {
        Self {
            records: records.boxed(),
            count: Some(count),
        }
    }

    pub fn count(&self) -> Option<usize> {
        self.count
    }
}

impl From<Vec<Record>> for RawRecordStream {
    fn from(records: Vec<Record>) -> Self {
        let count = records.len();
        Self::with_count(stream::iter(records.into_iter().map(Ok)), count)
    }
}

impl fmt::Debug for RawRecordStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawRecordStream").field("count", &self.count).finish()
    }
}

/// Lazy, single-pass stream of records.
///
/// Every `next().await` is a suspension point; records arrive in producer emission order.
pub struct AsyncRecordCollection {
    records: BoxedRecordStream,
    count: Option<usize>,
    origin: RecordOrigin,
}

impl AsyncRecordCollection {
    /// Build a collection from any record stream.
    ///
    /// `count` must only be set when it equals the number of records `records` yields.
    pub fn new<S>(records: S, count: Option<usize>, origin: RecordOrigin) -> Self
    where
        S: Stream<Item = Result<Record>> + Send + 'static,
    {
        Self {
            records: records.boxed(),
            count,
            origin,
        }
    }

    /// Wrap raw fetch output, keeping its count when it reported one.
    pub fn wrap(raw: RawRecordStream, origin: RecordOrigin) -> Self {
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

    pub(crate) fn with_origin(self, origin: RecordOrigin) -> Self {
        Self { origin, ..self }
    }
}

impl Stream for AsyncRecordCollection {
    type Item = Result<Record>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut TaskContext<'_>) -> Poll<Option<Self::Item>> {
        self.records.poll_next_unpin(cx)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.records.size_hint()
    }
}

impl fmt::Debug for AsyncRecordCollection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsyncRecordCollection")
            .field("count", &self.count)
            .field("origin", &self.origin)
            .finish()
    }
}
