//! Pagination module
//!
//! Two paging protocols used by the Seller API, behind one shape:
//!
//! - offset: `limit` + `last_id` of the previous page ([`OffsetPaginator`])
//! - cursor: `limit` + an opaque server `cursor` ([`CursorPaginator`])
//!
//! Both are driven by a caller-supplied page fetch function and an items
//! extractor, so the engine knows nothing about endpoint response shapes.

pub mod cursor;
pub mod offset;

use crate::utils::error::{OzonError, OzonResult};
use futures::{Stream, TryStreamExt};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;

pub use cursor::{CursorPaginator, CursorRequest};
pub use offset::{LastId, OffsetPaginator, OffsetRequest};

/// Paging protocol of a resource category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaginationType {
    Offset,
    Cursor,
}

impl fmt::Display for PaginationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PaginationType::Offset => f.write_str("offset"),
            PaginationType::Cursor => f.write_str("cursor"),
        }
    }
}

/// Paging limits of a resource category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationConfig {
    pub pagination_type: PaginationType,
    pub default_limit: u32,
    pub max_limit: u32,
}

impl PaginationConfig {
    /// Effective page size: `default_limit` when absent, clamped to `[1, max_limit]`
    pub fn clamp_limit(&self, requested: Option<u32>) -> u32 {
        requested
            .unwrap_or(self.default_limit)
            .clamp(1, self.max_limit.max(1))
    }
}

static PAGINATION_CONFIGS: Lazy<HashMap<&'static str, PaginationConfig>> = Lazy::new(|| {
    let offset = |default_limit, max_limit| PaginationConfig {
        pagination_type: PaginationType::Offset,
        default_limit,
        max_limit,
    };
    let cursor = |default_limit, max_limit| PaginationConfig {
        pagination_type: PaginationType::Cursor,
        default_limit,
        max_limit,
    };

    HashMap::from([
        ("product", offset(100, 1000)),
        ("returns", offset(100, 500)),
        // giveouts
        ("return", offset(50, 200)),
        ("quants", cursor(100, 500)),
    ])
});

/// Look up the paging limits of a category
pub fn pagination_config(category: &str) -> OzonResult<PaginationConfig> {
    PAGINATION_CONFIGS.get(category).copied().ok_or_else(|| {
        OzonError::config(format!("No pagination config registered for category: {}", category))
    })
}

/// Look up a category and check it uses the expected protocol
pub fn pagination_config_for(
    category: &str,
    expected: PaginationType,
) -> OzonResult<PaginationConfig> {
    let config = pagination_config(category)?;
    if config.pagination_type != expected {
        return Err(OzonError::config(format!(
            "Category '{}' uses {} pagination, not {}",
            category, config.pagination_type, expected
        )));
    }
    Ok(config)
}

/// Names of all registered categories, sorted
pub fn registered_categories() -> Vec<&'static str> {
    let mut categories: Vec<&'static str> = PAGINATION_CONFIGS.keys().copied().collect();
    categories.sort_unstable();
    categories
}

/// Responses of offset-paginated endpoints
pub trait OffsetPage {
    /// Explicit "more pages" flag, when the endpoint reports one
    fn has_next(&self) -> Option<bool> {
        None
    }
}

/// Responses of cursor-paginated endpoints
pub trait CursorPage {
    /// Cursor of the next page
    fn next_cursor(&self) -> Option<&str>;
}

/// Read `field` at the top level, else under `result`
fn lookup<'a>(value: &'a Value, field: &str) -> Option<&'a Value> {
    value
        .get(field)
        .or_else(|| value.get("result").and_then(|result| result.get(field)))
        .filter(|v| !v.is_null())
}

impl OffsetPage for Value {
    fn has_next(&self) -> Option<bool> {
        lookup(self, "has_next").and_then(Value::as_bool)
    }
}

impl CursorPage for Value {
    fn next_cursor(&self) -> Option<&str> {
        lookup(self, "cursor").and_then(Value::as_str)
    }
}

/// Whether an offset page is followed by another
///
/// Without an explicit flag a full page is taken to mean more data exists,
/// which costs one extra empty fetch when the total is an exact multiple of
/// the page size.
pub fn has_next_page_offset(has_next: Option<bool>, requested_limit: u32, items_count: usize) -> bool {
    has_next.unwrap_or(items_count >= requested_limit as usize)
}

/// Whether a cursor page is followed by another
pub fn has_next_page_cursor(cursor: Option<&str>) -> bool {
    cursor.map_or(false, |c| !c.is_empty())
}

/// Write paging fields over a JSON request body
///
/// Non-object bodies are replaced by an object holding just the fields.
pub(crate) fn merge_fields(base: Value, fields: Value) -> Value {
    let mut merged = match base {
        Value::Object(map) => map,
        _ => Map::new(),
    };
    if let Value::Object(fields) = fields {
        merged.extend(fields);
    }
    Value::Object(merged)
}

/// Drain a page stream into one list, honouring an optional item cap
pub(crate) async fn collect_pages<T, S>(pages: S, max_items: Option<usize>) -> OzonResult<Vec<T>>
where
    S: Stream<Item = OzonResult<Vec<T>>>,
{
    let mut all = Vec::new();
    if max_items == Some(0) {
        return Ok(all);
    }

    futures::pin_mut!(pages);
    while let Some(page) = pages.try_next().await? {
        all.extend(page);
        if let Some(max) = max_items {
            if all.len() >= max {
                all.truncate(max);
                break;
            }
        }
    }

    Ok(all)
}
