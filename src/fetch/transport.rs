use std::time::Duration;

#[cfg(test)]
use mockall::automock;

use crate::config::FetchConfig;
use crate::data::query::map_reqwest_error;
use crate::error::{Result, SpectraError};

/// Status and body of one HTTP exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpReply {
    pub status: u16,
    pub body: String,
}

/// Issues a single GET. Retrying is the caller's job.
#[cfg_attr(test, automock)]
pub trait Transport: Send + Sync {
    fn get(&self, url: &str) -> Result<HttpReply>;
}

/// Pauses between retry attempts.
#[cfg_attr(test, automock)]
pub trait Sleeper: Send + Sync {
    fn sleep(&self, duration: Duration);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        if !duration.is_zero() {
            std::thread::sleep(duration);
        }
    }
}

/// Blocking `reqwest` client.
#[derive(Debug)]
pub struct HttpTransport {
    client: reqwest::blocking::Client,
}

impl HttpTransport {
    pub fn new(config: &FetchConfig) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| SpectraError::Transport(format!("building HTTP client: {e}")))?;
        Ok(Self { client })
    }
}

impl Transport for HttpTransport {
    fn get(&self, url: &str) -> Result<HttpReply> {
        let response = self.client.get(url).send().map_err(map_reqwest_error)?;
        let status = response.status().as_u16();
        let body = response.text().map_err(map_reqwest_error)?;
        Ok(HttpReply { status, body })
    }
}
