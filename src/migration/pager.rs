use tracing::debug;

use crate::Error;
use crate::migration::{Cursor, Page};
use crate::store::TableStore;

/// Largest page the bulk-write protocol accepts in one call
pub const MAX_PAGE_SIZE: usize = 25;

/// Reads the source table one bounded page at a time
#[derive(Debug)]
pub struct Pager<'a, S> {
    store: &'a S,
    table: &'a str,
    page_size: usize,
}

impl<'a, S: TableStore> Pager<'a, S> {
    /// Pager over `table`; `page_size` is clamped to `1..=MAX_PAGE_SIZE`
    pub fn new(store: &'a S, table: &'a str, page_size: usize) -> Self {
        Self {
            store,
            table,
            page_size: page_size.clamp(1, MAX_PAGE_SIZE),
        }
    }

    /// Effective page size after clamping
    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Fetch the page after `cursor` with a strongly consistent read
    ///
    /// A page may hold fewer items than the page size, or none at all, and
    /// still not be the last one; only `next_cursor == None` ends the scan.
    pub async fn next_page(&self, cursor: Option<&Cursor>) -> Result<Page, Error> {
        let scanned = self
            .store
            .scan(self.table, cursor, self.page_size, true)
            .await
            .map_err(|source| Error::SourceRead {
                table: self.table.to_string(),
                source: Box::new(source),
            })?;

        debug!(
            table = self.table,
            items = scanned.items.len(),
            last = scanned.last_evaluated_key.is_none(),
            "page fetched"
        );

        Ok(Page {
            items: scanned.items,
            next_cursor: scanned.last_evaluated_key,
        })
    }
}
