//! Per-object spectrum retrieval with a bounded, fixed-delay retry.
//!
//! The survey's spectrum endpoint frequently answers 500 even for valid
//! requests, so every fetch gets `max_attempts` tries with the same pause
//! after each failure. Once the budget is spent the last status is reported
//! in a [`SpectraError::Fetch`].

mod spectrum;
mod transport;

use std::sync::Arc;

use rayon::prelude::*;

pub use spectrum::{FULL_COLUMNS, LITE_COLUMNS, RawSpectrum, SpectralRecord};
pub use transport::{HttpReply, HttpTransport, Sleeper, ThreadSleeper, Transport};

#[cfg(test)]
pub use transport::{MockSleeper, MockTransport};

use crate::config::FetchConfig;
use crate::error::{Result, SpectraError};

pub struct SpectrumFetcher {
    transport: Arc<dyn Transport>,
    sleeper: Arc<dyn Sleeper>,
    config: FetchConfig,
}

impl SpectrumFetcher {
    /// Fetcher over HTTP that really sleeps between attempts.
    pub fn new(config: FetchConfig) -> Result<Self> {
        let transport = HttpTransport::new(&config)?;
        Ok(Self::with_parts(
            Arc::new(transport),
            Arc::new(ThreadSleeper),
            config,
        ))
    }

    pub fn with_parts(
        transport: Arc<dyn Transport>,
        sleeper: Arc<dyn Sleeper>,
        config: FetchConfig,
    ) -> Self {
        Self {
            transport,
            sleeper,
            config,
        }
    }

    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    /// Download and parse the spectrum for one record.
    ///
    /// Non-200 replies and transport errors are retried; a 200 whose body
    /// does not parse is returned as `MalformedSpectrum` straight away.
    pub fn fetch(&self, record: &SpectralRecord) -> Result<RawSpectrum> {
        let url = record.url(&self.config.base_url());
        let attempts = self.config.max_attempts;
        let delay = self.config.retry_delay();
        let mut last_status = None;

        for attempt in 1..=attempts {
            match self.transport.get(&url) {
                Ok(reply) if reply.status == 200 => {
                    let spectrum = RawSpectrum::parse(&reply.body, self.config.form)?;
                    log::info!(
                        "fetched spectrum {record} ({} points, attempt {attempt})",
                        spectrum.len()
                    );
                    return Ok(spectrum);
                }
                Ok(reply) => {
                    last_status = Some(reply.status);
                    log::warn!(
                        "spectrum {record}: HTTP {} on attempt {attempt}/{attempts}",
                        reply.status
                    );
                }
                Err(e) if e.is_retryable() => {
                    log::warn!("spectrum {record}: {e} on attempt {attempt}/{attempts}");
                }
                Err(e) => return Err(e),
            }
            self.sleeper.sleep(delay);
        }

        log::error!("spectrum {record}: giving up after {attempts} attempts");
        Err(SpectraError::Fetch {
            attempts,
            last_status,
        })
    }

    /// Fetch many spectra on a pool of `config.workers` threads.
    ///
    /// Every record keeps its own retry budget; results come back in input
    /// order and one failure does not stop the others.
    pub fn fetch_many(&self, records: &[SpectralRecord]) -> Result<Vec<Result<RawSpectrum>>> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.workers)
            .build()
            .map_err(|e| SpectraError::Config(format!("failed to build fetch pool: {e}")))?;

        let results: Vec<Result<RawSpectrum>> =
            pool.install(|| records.par_iter().map(|r| self.fetch(r)).collect());

        let failed = results.iter().filter(|r| r.is_err()).count();
        log::info!(
            "fetched {} of {} spectra ({failed} failed)",
            records.len() - failed,
            records.len()
        );
        Ok(results)
    }
}
