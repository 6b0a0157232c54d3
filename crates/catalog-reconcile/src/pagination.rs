//! Keyset pagination over ordered keys.
//!
//! A [`PaginationCursor`] remembers the last key it has seen and asks a
//! [`PageSource`] for the next `batch_size` keys strictly greater than it.
//! Iteration ends on an **empty** page, never on a short one: a short page
//! only means the store had fewer rows at read time, and rows inserted
//! behind the cursor since then must still be picked up.

use async_trait::async_trait;
use tracing::debug;

use crate::error::{ReconcileError, Result};

/// A store that can return keys in ascending order after a given key.
#[async_trait]
pub trait PageSource: Send + Sync {
    /// Native key type of the store.
    type Key: Clone + Ord + Send + Sync + std::fmt::Debug;

    /// Store name used in errors.
    fn store_name(&self) -> &'static str;

    /// Fetch at most `limit` keys strictly greater than `after`, ascending.
    async fn fetch_page(&self, after: Option<&Self::Key>, limit: usize) -> Result<Vec<Self::Key>>;
}

/// Position of a keyset traversal.
#[derive(Debug, Clone, PartialEq)]
pub struct PaginationCursor<K> {
    last_seen: Option<K>,
    batch_size: usize,
    exhausted: bool,
}

impl<K> PaginationCursor<K>
where
    K: Clone + Ord + Send + Sync + std::fmt::Debug,
{
    /// Start a traversal from the beginning of the key space.
    pub fn new(batch_size: usize) -> Self {
        Self {
            last_seen: None,
            batch_size: batch_size.max(1),
            exhausted: false,
        }
    }

    /// Last key returned so far.
    pub fn last_seen(&self) -> Option<&K> {
        self.last_seen.as_ref()
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Whether the traversal has seen its terminating empty page.
    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    /// Fetch the next page and return it with the advanced cursor.
    ///
    /// Once the cursor is exhausted this returns an empty page without
    /// touching the store. Keys that are not strictly ascending (or not past
    /// the previous page) fail with `QueryFailed`, since accepting them would
    /// produce duplicates or skip rows.
    pub async fn next_batch<S>(self, source: &S) -> Result<(Vec<K>, Self)>
    where
        S: PageSource<Key = K> + ?Sized,
    {
        if self.exhausted {
            return Ok((Vec::new(), self));
        }

        let keys = source
            .fetch_page(self.last_seen.as_ref(), self.batch_size)
            .await?;

        if keys.is_empty() {
            debug!("{} pagination exhausted after {:?}", source.store_name(), self.last_seen);
            return Ok((
                keys,
                Self {
                    exhausted: true,
                    ..self
                },
            ));
        }

        if keys.len() > self.batch_size {
            return Err(ReconcileError::query_failed(
                source.store_name(),
                format!(
                    "page returned {} keys for a limit of {}",
                    keys.len(),
                    self.batch_size
                ),
            ));
        }

        let mut previous = self.last_seen.as_ref();
        for key in &keys {
            if let Some(prev) = previous {
                if key <= prev {
                    return Err(ReconcileError::query_failed(
                        source.store_name(),
                        format!("keys not strictly ascending: {:?} after {:?}", key, prev),
                    ));
                }
            }
            previous = Some(key);
        }

        let last_seen = keys.last().cloned();
        Ok((
            keys,
            Self {
                last_seen,
                batch_size: self.batch_size,
                exhausted: false,
            },
        ))
    }
}

/// Drain a source from the beginning, returning every key and the number of
/// store round trips it took (including the terminating empty page).
pub async fn collect_all<S>(source: &S, batch_size: usize) -> Result<(Vec<S::Key>, usize)>
where
    S: PageSource + ?Sized,
{
    let mut cursor = PaginationCursor::new(batch_size);
    let mut keys = Vec::new();
    let mut calls = 0usize;

    loop {
        let (page, next) = cursor.next_batch(source).await?;
        calls += 1;
        if page.is_empty() {
            break;
        }
        keys.extend(page);
        cursor = next;
    }

    Ok((keys, calls))
}
