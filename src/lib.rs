//! Retrieve, clean and classify SDSS spectral data.
//!
//! ```text
//!   SpectralQuery ──► MetadataExtractor ──► SpectralRecord ──► SpectrumFetcher
//!        │
//!        ▼
//!   TabularDataset ──► SpectralPreprocessor ──► CelestialClassifier
//! ```

pub mod classify;
pub mod config;
pub mod data;
pub mod error;
pub mod fetch;
pub mod preprocess;

pub use classify::{CelestialClass, CelestialClassifier, ConfusionMatrix};
pub use config::PipelineConfig;
pub use data::extract::MetadataExtractor;
pub use data::model::{Column, ResultSet, TabularDataset};
pub use data::query::{QueryService, SkyServerClient, SpectralQuery, validate_query};
pub use error::{Result, SpectraError};
pub use fetch::{RawSpectrum, SpectralRecord, SpectrumFetcher};
pub use preprocess::SpectralPreprocessor;
