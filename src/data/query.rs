//! Query validation and the remote SQL service boundary.

use std::time::Duration;

#[cfg(test)]
use mockall::automock;

use super::loader::parse_csv_text;
use super::model::ResultSet;
use crate::config::QueryConfig;
use crate::error::{Result, SpectraError};

/// Cheap sanity check before a query leaves the process.
///
/// Only looks for the substrings `select` and `from` (case-insensitive);
/// this is not a SQL parser.
pub fn validate_query(query: &str) -> Result<()> {
    let lowered = query.to_lowercase();
    if lowered.contains("select") && lowered.contains("from") {
        Ok(())
    } else {
        Err(SpectraError::InvalidQuery {
            query: query.to_string(),
        })
    }
}

/// A remote tabular database that answers SQL/ADQL queries.
#[cfg_attr(test, automock)]
pub trait QueryService: Send + Sync {
    /// Run `sql` and return the full result set.
    fn query_sql(&self, sql: &str) -> Result<ResultSet>;
}

// ---------------------------------------------------------------------------
// SkyServerClient – SDSS SqlSearch over HTTP
// ---------------------------------------------------------------------------

/// Blocking client for the SDSS SkyServer `SqlSearch` endpoint.
#[derive(Debug)]
pub struct SkyServerClient {
    client: reqwest::blocking::Client,
    endpoint: String,
}

impl SkyServerClient {
    pub fn new(config: &QueryConfig) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| SpectraError::Transport(format!("building HTTP client: {e}")))?;
        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl QueryService for SkyServerClient {
    fn query_sql(&self, sql: &str) -> Result<ResultSet> {
        validate_query(sql)?;
        log::debug!("querying {}: {}", self.endpoint, sql.trim());

        let response = self
            .client
            .get(&self.endpoint)
            .query(&[("cmd", sql), ("format", "csv")])
            .send()
            .map_err(map_reqwest_error)?;

        let status = response.status();
        let body = response.text().map_err(map_reqwest_error)?;
        if !status.is_success() {
            return Err(SpectraError::RemoteService {
                status: status.as_u16(),
                message: body.lines().next().unwrap_or_default().to_string(),
            });
        }

        let result = parse_csv_text(&body)?;
        log::info!("query returned {}", result.data);
        Ok(result)
    }
}

pub(crate) fn map_reqwest_error(e: reqwest::Error) -> SpectraError {
    if e.is_timeout() {
        SpectraError::Timeout(e.to_string())
    } else {
        SpectraError::Transport(e.to_string())
    }
}

// ---------------------------------------------------------------------------
// SpectralQuery – a query string and the result it produced
// ---------------------------------------------------------------------------

/// A query together with the data it loaded.
#[derive(Debug, Clone)]
pub struct SpectralQuery {
    query: String,
    result: Option<ResultSet>,
}

impl SpectralQuery {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            result: None,
        }
    }

    /// Start from data that was obtained elsewhere.
    pub fn with_result(query: impl Into<String>, result: ResultSet) -> Self {
        Self {
            query: query.into(),
            result: Some(result),
        }
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn result(&self) -> Option<&ResultSet> {
        self.result.as_ref()
    }

    pub fn into_result(self) -> Option<ResultSet> {
        self.result
    }

    /// Validate the query, run it, and keep the result.
    ///
    /// Service errors are returned as-is; a failed run leaves any previous
    /// result in place.
    pub fn execute(&mut self, service: &dyn QueryService) -> Result<&ResultSet> {
        validate_query(&self.query)?;
        let result = service.query_sql(&self.query)?;
        Ok(self.result.insert(result))
    }
}
