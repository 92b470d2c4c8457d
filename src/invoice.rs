use std::collections::HashMap;

use http::Method;
use reqwest::Url;
use serde::de::DeserializeOwned;

use crate::{Error, Requester, Result};

/// Page size used when a search request leaves `limit` at zero.
pub const DEFAULT_LIMIT: i64 = 30;

/// Helper structure to build invoice search requests.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    /// Maximum number of invoices returned. Zero means [`DEFAULT_LIMIT`].
    pub limit: i64,
    /// Index of the first invoice returned.
    pub offset: i64,
    /// Any other filter accepted by the search endpoint.
    pub filters: HashMap<String, String>,
}

impl SearchRequest {
    pub fn new(limit: i64, offset: i64) -> Self {
        Self {
            limit,
            offset,
            filters: HashMap::new(),
        }
    }

    /// Adds a filter, replacing any previous value under the same key.
    pub fn with_filter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.filters.insert(key.into(), value.into());
        self
    }

    /// Builds the query parameter map. Filter keys are lower-cased.
    ///
    /// A zero `limit` is written back as [`DEFAULT_LIMIT`], so the request
    /// reads the same afterwards as what was sent. Use [`SearchRequest::params`]
    /// to leave the request untouched.
    pub fn get_params(&mut self) -> HashMap<String, String> {
        if self.limit == 0 {
            self.limit = DEFAULT_LIMIT;
        }
        self.params()
    }

    /// Same map as [`SearchRequest::get_params`] without mutating `self`.
    pub fn params(&self) -> HashMap<String, String> {
        let mut params = HashMap::with_capacity(self.filters.len() + 2);
        for (key, value) in &self.filters {
            params.insert(key.to_lowercase(), value.clone());
        }

        let limit = if self.limit == 0 {
            DEFAULT_LIMIT
        } else {
            self.limit
        };
        params.insert("limit".to_owned(), limit.to_string());
        params.insert("offset".to_owned(), self.offset.to_string());

        params
    }

    /// Parameters from [`SearchRequest::get_params`], sorted by key.
    pub fn query_pairs(&mut self) -> Vec<(String, String)> {
        let mut pairs = self.get_params().into_iter().collect::<Vec<_>>();
        pairs.sort();
        pairs
    }
}

/// Invoice search endpoint reached through any [`Requester`].
#[derive(Debug, Clone)]
pub struct InvoiceApi<R> {
    requester: R,
    endpoint: Url,
}

impl<R: Requester> InvoiceApi<R> {
    /// `endpoint` is the full search URL, e.g. `https://api.example.com/v1/invoices`.
    pub fn new(requester: R, endpoint: Url) -> Self {
        Self {
            requester,
            endpoint,
        }
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Runs a search and decodes the JSON body.
    ///
    /// `request.limit` is defaulted in place, see [`SearchRequest::get_params`].
    pub async fn search<T: DeserializeOwned>(&self, request: &mut SearchRequest) -> Result<T> {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut().extend_pairs(request.query_pairs());

        tracing::debug!(%url, "searching invoices");

        let response = self
            .requester
            .execute(reqwest::Request::new(Method::GET, url))
            .await?
            .error_for_status()
            .map_err(Error::Status)?;

        response.json().await.map_err(Error::Decode)
    }
}
