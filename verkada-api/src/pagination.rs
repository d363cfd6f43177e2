//! Continuation-token pagination.
//!
//! Verkada collection endpoints return a page of records plus a
//! `next_page_token`; the token is sent back as `page_token` until the API
//! stops returning one. [`PageAggregator`] drives that loop and concatenates
//! the requested list fields of every page into an [`AggregatedResult`].

use log::{debug, info};
use reqwest::Method;
use reqwest::header::HeaderMap;
use serde_json::{Map, Value};
use std::collections::HashMap;

use crate::json_validator::{MAX_JSON_DEPTH, parse_json_body};
use crate::{VerkadaClient, VerkadaError};

/// Query parameter carrying the continuation token.
pub const PAGE_TOKEN_PARAM: &str = "page_token";

/// Response field holding the continuation token.
pub const NEXT_PAGE_TOKEN_FIELD: &str = "next_page_token";

/// Records of one or more list fields, merged across pages.
///
/// Each field holds the exact concatenation, in page order, of that field's
/// per-page arrays. Nothing is deduplicated or re-sorted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AggregatedResult {
    fields: HashMap<String, Vec<Value>>,
    page_count: u32,
}

impl AggregatedResult {
    fn with_fields(list_fields: &[&str]) -> Self {
        Self {
            fields: list_fields
                .iter()
                .map(|field| ((*field).to_string(), Vec::new()))
                .collect(),
            page_count: 0,
        }
    }

    /// Records accumulated for `field`; empty for fields that were not requested.
    #[must_use]
    pub fn records(&self, field: &str) -> &[Value] {
        self.fields.get(field).map_or(&[], Vec::as_slice)
    }

    /// Move the records of `field` out of the result.
    pub fn take(&mut self, field: &str) -> Vec<Value> {
        self.fields
            .get_mut(field)
            .map(std::mem::take)
            .unwrap_or_default()
    }

    /// Names of the aggregated fields.
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// Number of pages fetched.
    #[must_use]
    pub fn page_count(&self) -> u32 {
        self.page_count
    }

    /// Number of records across all fields.
    #[must_use]
    pub fn total_records(&self) -> usize {
        self.fields.values().map(Vec::len).sum()
    }

    /// Append one page's list fields and return its continuation token.
    fn absorb_page(&mut self, mut page: Map<String, Value>) -> Result<Option<String>, VerkadaError> {
        for (field, records) in &mut self.fields {
            match page.remove(field) {
                None | Some(Value::Null) => {}
                Some(Value::Array(items)) => records.extend(items),
                Some(other) => {
                    return Err(VerkadaError::InvalidResponse(format!(
                        "Field '{field}' is not a list (found {})",
                        json_type_name(&other)
                    )));
                }
            }
        }
        self.page_count = self.page_count.saturating_add(1);
        Ok(next_page_token(page.get(NEXT_PAGE_TOKEN_FIELD)))
    }
}

/// A null, absent or empty token means the final page has been reached.
fn next_page_token(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(token) if !token.is_empty() => Some(token.clone()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Drives repeated calls to a paginated endpoint through the retrying executor.
pub struct PageAggregator<'a> {
    client: &'a VerkadaClient,
    max_pages: Option<u32>,
}

impl<'a> PageAggregator<'a> {
    /// Aggregator bounded by the client's configured `max_pages`.
    #[must_use]
    pub fn new(client: &'a VerkadaClient) -> Self {
        Self {
            client,
            max_pages: client.config().max_pages,
        }
    }

    #[must_use]
    pub fn with_max_pages(mut self, max_pages: Option<u32>) -> Self {
        self.max_pages = max_pages;
        self
    }

    /// Fetch every page of `endpoint` and merge `list_fields` across pages.
    ///
    /// At least one request is always made. Any `page_token` in `params` is
    /// replaced by the aggregator's own continuation token.
    ///
    /// # Errors
    ///
    /// Any executor error aborts the whole aggregation (no partial results).
    /// Also fails with `InvalidResponse` for a non-object page or a listed field
    /// that is not an array, and with `PaginationExhausted` when the endpoint
    /// still has more pages after `max_pages`.
    pub async fn fetch_all_pages(
        &self,
        method: Method,
        endpoint: &str,
        headers: &HeaderMap,
        params: &[(String, String)],
        list_fields: &[&str],
    ) -> Result<AggregatedResult, VerkadaError> {
        let mut result = AggregatedResult::with_fields(list_fields);
        let base_params: Vec<(String, String)> = params
            .iter()
            .filter(|(key, _)| key != PAGE_TOKEN_PARAM)
            .cloned()
            .collect();
        let mut page_token: Option<String> = None;

        loop {
            let mut page_params = base_params.clone();
            if let Some(token) = &page_token {
                page_params.push((PAGE_TOKEN_PARAM.to_string(), token.clone()));
            }

            let response = self
                .client
                .execute(method.clone(), endpoint, headers, &page_params, None)
                .await?;

            let page = match parse_json_body(response.body(), MAX_JSON_DEPTH)? {
                Value::Object(map) => map,
                other => {
                    return Err(VerkadaError::InvalidResponse(format!(
                        "Expected a JSON object page from {endpoint}, got {}",
                        json_type_name(&other)
                    )));
                }
            };

            page_token = result.absorb_page(page)?;
            debug!(
                "Retrieved page {} of {endpoint} ({} records so far, more: {})",
                result.page_count(),
                result.total_records(),
                page_token.is_some()
            );

            if page_token.is_none() {
                break;
            }
            if let Some(max_pages) = self.max_pages
                && result.page_count() >= max_pages
            {
                return Err(VerkadaError::PaginationExhausted { max_pages });
            }
        }

        info!(
            "Retrieved {} records from {endpoint} across {} pages",
            result.total_records(),
            result.page_count()
        );
        Ok(result)
    }
}
