//! Offset (last-id) pagination

use super::{
    collect_pages, has_next_page_offset, merge_fields, pagination_config_for, OffsetPage,
    PaginationConfig, PaginationType,
};
use crate::utils::error::{OzonError, OzonResult};
use futures::Stream;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::future::Future;
use tracing::debug;

/// Identifier of the last item of a page, numeric or textual
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LastId {
    Number(i64),
    Text(String),
}

impl LastId {
    /// Read a last id from a JSON value, if it is a number or non-empty string
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => n.as_i64().map(LastId::Number),
            Value::String(s) if !s.is_empty() => Some(LastId::Text(s.clone())),
            _ => None,
        }
    }
}

impl fmt::Display for LastId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LastId::Number(n) => write!(f, "{}", n),
            LastId::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for LastId {
    fn from(value: i64) -> Self {
        LastId::Number(value)
    }
}

impl From<&str> for LastId {
    fn from(value: &str) -> Self {
        LastId::Text(value.to_string())
    }
}

impl From<String> for LastId {
    fn from(value: String) -> Self {
        LastId::Text(value)
    }
}

/// Paging fields sent with each offset page request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OffsetRequest {
    pub limit: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_id: Option<LastId>,
}

impl OffsetRequest {
    /// Write `limit` and `last_id` over an endpoint request body
    pub fn merge_into(&self, base: Value) -> Value {
        merge_fields(base, serde_json::to_value(self).unwrap_or(Value::Null))
    }
}

#[derive(Debug, Clone)]
enum OffsetState {
    Next(Option<LastId>),
    /// A page promised more data but its last item had no id
    Stalled,
    Done,
}

/// Lazily walks an offset-paginated endpoint
///
/// `fetch` performs one page request, `extract_items` pulls the items out of
/// the response and `extract_last_id` reads the id passed on to the next
/// request. The paginator holds no iteration state: every call to
/// [`pages`](Self::pages) starts again from the first page.
pub struct OffsetPaginator<F, X, L> {
    category: String,
    config: PaginationConfig,
    limit: u32,
    fetch: F,
    extract_items: X,
    extract_last_id: L,
}

impl<F, X, L> OffsetPaginator<F, X, L> {
    /// Create a paginator for a registered offset category
    pub fn new(category: &str, fetch: F, extract_items: X, extract_last_id: L) -> OzonResult<Self> {
        let config = pagination_config_for(category, PaginationType::Offset)?;
        Ok(Self {
            category: category.to_string(),
            config,
            limit: config.clamp_limit(None),
            fetch,
            extract_items,
            extract_last_id,
        })
    }

    /// Set the page size, clamped to the category's bounds
    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = self.config.clamp_limit(Some(limit));
        self
    }

    /// Effective page size
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

impl<F, Fut, R, X, L, T> OffsetPaginator<F, X, L>
where
    F: Fn(OffsetRequest) -> Fut,
    Fut: Future<Output = OzonResult<R>>,
    R: OffsetPage,
    X: Fn(&R) -> Vec<T>,
    L: Fn(&T) -> Option<LastId>,
{
    /// Stream of pages, fetched one at a time as the stream is polled
    ///
    /// Ends after the first empty page or the first page reporting no
    /// successor. A fetch error is yielded once and ends the stream.
    pub fn pages<'a>(&'a self) -> impl Stream<Item = OzonResult<Vec<T>>> + 'a
    where
        Fut: 'a,
        R: 'a,
        T: 'a,
    {
        futures::stream::try_unfold(OffsetState::Next(None), move |state| self.next_page(state))
    }

    async fn next_page(&self, state: OffsetState) -> OzonResult<Option<(Vec<T>, OffsetState)>> {
        let last_id = match state {
            OffsetState::Done => return Ok(None),
            OffsetState::Stalled => {
                return Err(OzonError::pagination(format!(
                    "Cannot request the next '{}' page: last item has no id",
                    self.category
                )))
            }
            OffsetState::Next(last_id) => last_id,
        };

        let request = OffsetRequest {
            limit: self.limit,
            last_id,
        };
        debug!(
            category = %self.category,
            limit = request.limit,
            last_id = ?request.last_id,
            "Fetching offset page"
        );

        let response = (self.fetch)(request).await?;
        let items = (self.extract_items)(&response);
        if items.is_empty() {
            return Ok(None);
        }

        let next = if has_next_page_offset(response.has_next(), self.limit, items.len()) {
            match items.last().and_then(|item| (self.extract_last_id)(item)) {
                Some(last_id) => OffsetState::Next(Some(last_id)),
                None => OffsetState::Stalled,
            }
        } else {
            OffsetState::Done
        };

        Ok(Some((items, next)))
    }

    /// Collect items from every page
    ///
    /// With `max_items` set, fetching stops as soon as that many items have
    /// been gathered and the result is truncated to exactly `max_items`.
    pub async fn collect_all(&self, max_items: Option<usize>) -> OzonResult<Vec<T>> {
        collect_pages(self.pages(), max_items).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use serde_json::json;
    use std::sync::{Arc, Mutex};

    fn id_of(item: &Value) -> Option<LastId> {
        LastId::from_value(&item["id"])
    }

    fn items_of(response: &Value) -> Vec<Value> {
        response["items"].as_array().cloned().unwrap_or_default()
    }

    #[test]
    fn test_last_id_from_value() {
        assert_eq!(LastId::from_value(&json!(42)), Some(LastId::Number(42)));
        assert_eq!(LastId::from_value(&json!("abc")), Some(LastId::from("abc")));
        assert_eq!(LastId::from_value(&json!("")), None);
        assert_eq!(LastId::from_value(&Value::Null), None);
    }

    #[test]
    fn test_request_serialization() {
        let first = OffsetRequest { limit: 100, last_id: None };
        assert_eq!(serde_json::to_value(&first).unwrap(), json!({"limit": 100}));

        let next = OffsetRequest { limit: 100, last_id: Some("bnVtYmVy".into()) };
        assert_eq!(
            next.merge_into(json!({"filter": {}})),
            json!({"filter": {}, "limit": 100, "last_id": "bnVtYmVy"})
        );
    }

    #[test]
    fn test_wrong_category_rejected() {
        let result = OffsetPaginator::new(
            "quants",
            |_req: OffsetRequest| async { Ok::<_, OzonError>(json!({})) },
            items_of,
            id_of,
        );
        assert!(matches!(result, Err(OzonError::ConfigurationInvalid { .. })));
    }

    #[tokio::test]
    async fn test_pages_restart_on_each_call() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let log = seen.clone();
        let paginator = OffsetPaginator::new(
            "product",
            move |req: OffsetRequest| {
                log.lock().unwrap().push(req.last_id.clone());
                async move {
                    Ok::<_, OzonError>(match req.last_id {
                        None => json!({"items": [{"id": 1}, {"id": 2}], "has_next": true}),
                        Some(_) => json!({"items": [{"id": 3}], "has_next": false}),
                    })
                }
            },
            items_of,
            id_of,
        )
        .unwrap()
        .with_limit(2);

        let first: Vec<_> = paginator.pages().collect().await;
        let second: Vec<_> = paginator.pages().collect().await;
        assert_eq!(first.len(), 2);
        assert_eq!(second.len(), 2);

        let seen = seen.lock().unwrap();
        assert_eq!(
            *seen,
            vec![None, Some(LastId::Number(2)), None, Some(LastId::Number(2))]
        );
    }
}
