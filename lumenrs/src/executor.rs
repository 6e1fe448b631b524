//! Result retrieval: page-at-a-time execution of compiled SQL.
//!
//! Warehouse clients implement [`Executor`]. [`ResultStreamer`] walks the
//! pages of one statement with cursors and shrinks the page size when the
//! warehouse rejects a page as too large.

use async_trait::async_trait;
use futures::stream::{self, Stream};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::{LumenError, Result};
use crate::pagination::{paginate_sql, Cursor};

pub type ResultRow = Map<String, Value>;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnMeta {
    pub name: String,
}

/// One page of rows as returned by an executor.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ResultPage {
    pub columns: Vec<ColumnMeta>,
    pub rows: Vec<ResultRow>,
}

/// A page plus the cursor for the page after it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PaginatedResult {
    pub page: ResultPage,
    /// Page size the page was actually fetched with.
    pub page_size: u64,
    /// Encoded cursor, `None` on the last page.
    pub next_cursor: Option<String>,
}

/// Runs SQL against a warehouse.
#[async_trait]
pub trait Executor: Send + Sync {
    /// Execute a statement returning at most one page of rows.
    ///
    /// Implementations return [`LumenError::PageTooLarge`] when the warehouse
    /// refuses the page (response size limits); the caller retries smaller.
    async fn execute(&self, sql: &str) -> Result<ResultPage>;
}

pub struct ResultStreamer<'e> {
    executor: &'e dyn Executor,
    sql: String,
    query_hash: u64,
    page_size: u64,
    order_by: Option<String>,
}

impl<'e> ResultStreamer<'e> {
    /// `page_size` is clamped to `1..=max_page_size`.
    pub fn new(
        executor: &'e dyn Executor,
        sql: impl Into<String>,
        query_hash: u64,
        page_size: u64,
        max_page_size: u64,
    ) -> Self {
        Self {
            executor,
            sql: sql.into(),
            query_hash,
            page_size: page_size.clamp(1, max_page_size.max(1)),
            order_by: None,
        }
    }

    /// Sort to repeat on every page query, as rendered in `CompiledQuery::order_by`.
    pub fn with_order_by(mut self, order_by: Option<String>) -> Self {
        self.order_by = order_by;
        self
    }

    pub fn page_size(&self) -> u64 {
        self.page_size
    }

    /// Fetch the page a cursor points at, or the first page.
    ///
    /// A page rejected as too large is retried at half the size, down to a
    /// single row; the reduced size sticks for later pages.
    pub async fn fetch_page(&mut self, cursor: Option<&Cursor>) -> Result<PaginatedResult> {
        let offset = match cursor {
            Some(cursor) => {
                cursor.validate_query_hash(self.query_hash)?;
                cursor.offset
            }
            None => 0,
        };

        loop {
            let sql = paginate_sql(&self.sql, self.order_by.as_deref(), self.page_size, offset);
            match self.executor.execute(&sql).await {
                Ok(page) => {
                    let fetched = page.rows.len() as u64;
                    tracing::debug!(
                        offset,
                        page_size = self.page_size,
                        rows = fetched,
                        "fetched page"
                    );
                    let next_cursor = if fetched < self.page_size {
                        None
                    } else {
                        Some(Cursor::new(offset + fetched, self.query_hash).encode()?)
                    };
                    return Ok(PaginatedResult {
                        page,
                        page_size: self.page_size,
                        next_cursor,
                    });
                }
                Err(LumenError::PageTooLarge(reason)) if self.page_size > 1 => {
                    let reduced = (self.page_size / 2).max(1);
                    tracing::debug!(
                        offset,
                        from = self.page_size,
                        to = reduced,
                        reason = %reason,
                        "page too large, reducing page size"
                    );
                    self.page_size = reduced;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Stream every page of the statement, starting from the first.
    pub fn pages(self) -> impl Stream<Item = Result<PaginatedResult>> + 'e {
        stream::try_unfold(Some((self, None::<Cursor>)), |state| async move {
            let Some((mut streamer, cursor)) = state else {
                return Ok::<_, LumenError>(None);
            };
            let result = streamer.fetch_page(cursor.as_ref()).await?;
            let next = match &result.next_cursor {
                Some(encoded) => Some((streamer, Some(Cursor::decode(encoded)?))),
                None => None,
            };
            Ok(Some((result, next)))
        })
    }

    /// Collect all rows of the statement.
    pub async fn collect_rows(self) -> Result<Vec<ResultRow>> {
        use futures::TryStreamExt;

        let pages: Vec<PaginatedResult> = self.pages().try_collect().await?;
        Ok(pages.into_iter().flat_map(|p| p.page.rows).collect())
    }
}
