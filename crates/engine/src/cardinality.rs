//! Single-record extraction.
//!
//! Both guards advance the sequence at most twice: once for the record and once to prove
//! there is no second one. A known count is never used to skip the second advance.

use futures_util::{Stream, StreamExt};

use crate::{ImportError, Record, Result};

/// Return the only record of `records`, `None` when empty.
pub fn one<I>(records: I) -> Result<Option<Record>>
where
    I: IntoIterator<Item = Result<Record>>,
{
    let mut records = records.into_iter();
    let Some(first) = records.next() else {
        return Ok(None);
    };
    let first = first?;
    match records.next() {
        None => Ok(Some(first)),
        Some(Ok(_)) => Err(ImportError::MoreThanOneRecord),
        Some(Err(error)) => Err(error),
    }
}

/// Asynchronous counterpart of [`one`].
pub async fn one_async<S>(mut records: S) -> Result<Option<Record>>
where
    S: Stream<Item = Result<Record>> + Unpin,
{
    let Some(first) = records.next().await else {
        return Ok(None);
    };
    let first = first?;
    match records.next().await {
        None => Ok(Some(first)),
        Some(Ok(_)) => Err(ImportError::MoreThanOneRecord),
        Some(Err(error)) => Err(error),
    }
}
