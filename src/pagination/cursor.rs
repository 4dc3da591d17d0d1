//! Cursor pagination

use super::{
    collect_pages, has_next_page_cursor, merge_fields, pagination_config_for, CursorPage,
    PaginationConfig, PaginationType,
};
use crate::utils::error::OzonResult;
use futures::Stream;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::future::Future;
use tracing::debug;

/// Paging fields sent with each cursor page request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CursorRequest {
    pub limit: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cursor: Option<String>,
}

impl CursorRequest {
    /// Write `limit` and `cursor` over an endpoint request body
    pub fn merge_into(&self, base: Value) -> Value {
        merge_fields(base, serde_json::to_value(self).unwrap_or(Value::Null))
    }
}

#[derive(Debug, Clone)]
enum CursorState {
    Next(Option<String>),
    Done,
}

/// Lazily walks a cursor-paginated endpoint
///
/// Each response's cursor is sent with the following request; a missing or
/// empty cursor ends iteration. Like [`super::OffsetPaginator`], each call to
/// [`pages`](Self::pages) starts from the first page.
pub struct CursorPaginator<F, X> {
    category: String,
    config: PaginationConfig,
    limit: u32,
    fetch: F,
    extract_items: X,
}

impl<F, X> CursorPaginator<F, X> {
    /// Create a paginator for a registered cursor category
    pub fn new(category: &str, fetch: F, extract_items: X) -> OzonResult<Self> {
        let config = pagination_config_for(category, PaginationType::Cursor)?;
        Ok(Self {
            category: category.to_string(),
            config,
            limit: config.clamp_limit(None),
            fetch,
            extract_items,
        })
    }

    /// Set the page size, clamped to the category's bounds
    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = self.config.clamp_limit(Some(limit));
        self
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn config(&self) -> &PaginationConfig {
        &self.config
    }
}

impl<F, Fut, R, X, T> CursorPaginator<F, X>
where
    F: Fn(CursorRequest) -> Fut,
    Fut: Future<Output = OzonResult<R>>,
    R: CursorPage,
    X: Fn(&R) -> Vec<T>,
{
    /// Stream of pages, fetched one at a time as the stream is polled
    pub fn pages<'a>(&'a self) -> impl Stream<Item = OzonResult<Vec<T>>> + 'a
    where
        Fut: 'a,
        R: 'a,
        T: 'a,
    {
        futures::stream::try_unfold(CursorState::Next(None), move |state| self.next_page(state))
    }

    async fn next_page(&self, state: CursorState) -> OzonResult<Option<(Vec<T>, CursorState)>> {
        let cursor = match state {
            CursorState::Done => return Ok(None),
            CursorState::Next(cursor) => cursor,
        };

        let request = CursorRequest {
            limit: self.limit,
            cursor,
        };
        debug!(
            category = %self.category,
            limit = request.limit,
            cursor = ?request.cursor,
            "Fetching cursor page"
        );

        let response = (self.fetch)(request).await?;
        let items = (self.extract_items)(&response);
        if items.is_empty() {
            return Ok(None);
        }

        let next = match response.next_cursor() {
            Some(cursor) if has_next_page_cursor(Some(cursor)) => {
                CursorState::Next(Some(cursor.to_string()))
            }
            _ => CursorState::Done,
        };

        Ok(Some((items, next)))
    }

    /// Collect items from every page, stopping early at `max_items`
    pub async fn collect_all(&self, max_items: Option<usize>) -> OzonResult<Vec<T>> {
        collect_pages(self.pages(), max_items).await
    }
}
