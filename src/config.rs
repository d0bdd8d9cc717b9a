use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::error::{Result, SpectraError};

// ---------------------------------------------------------------------------
// Pipeline configuration
// ---------------------------------------------------------------------------

/// Settings for every stage, read from JSON. Missing fields take defaults.
///
/// ```json
/// {
///   "preprocess": { "outlier_policy": "column_wise", "outlier_threshold": 3.0 },
///   "fetch": { "max_attempts": 5, "retry_delay_ms": 2000 },
///   "classifier": { "schema_check": "names_in_order" }
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    pub query: QueryConfig,
    pub preprocess: PreprocessConfig,
    pub fetch: FetchConfig,
    pub classifier: ClassifierConfig,
}

impl PipelineConfig {
    pub fn from_json_str(text: &str) -> Result<Self> {
        let config: PipelineConfig = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn validate(&self) -> Result<()> {
        self.query.validate()?;
        self.preprocess.validate()?;
        self.fetch.validate()?;
        self.classifier.validate()
    }
}

fn invalid(message: impl Into<String>) -> SpectraError {
    SpectraError::Config(message.into())
}

// ---------------------------------------------------------------------------
// Query
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct QueryConfig {
    pub endpoint: String,
    pub timeout_ms: u64,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://skyserver.sdss.org/dr18/SkyServerWS/SearchTools/SqlSearch"
                .to_string(),
            timeout_ms: 60_000,
        }
    }
}

impl QueryConfig {
    fn validate(&self) -> Result<()> {
        if self.endpoint.is_empty() {
            return Err(invalid("query.endpoint must not be empty"));
        }
        if self.timeout_ms == 0 {
            return Err(invalid("query.timeout_ms must be positive"));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Preprocessing
// ---------------------------------------------------------------------------

/// How `remove_outliers` applies its per-column z-scores.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutlierPolicy {
    /// Drop a row when any of its values is an outlier; columns stay aligned.
    #[default]
    RowWise,
    /// Filter each column on its own; columns may end up with different lengths.
    ColumnWise,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterpolationKind {
    #[default]
    Cubic,
    Linear,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PreprocessConfig {
    pub outlier_policy: OutlierPolicy,
    pub outlier_threshold: f64,
    pub interpolation: InterpolationKind,
    /// Name of the redshift column used by `correct_redshift`.
    pub redshift_column: String,
    pub bands: Vec<String>,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            outlier_policy: OutlierPolicy::RowWise,
            outlier_threshold: 2.5,
            interpolation: InterpolationKind::Cubic,
            redshift_column: "z".to_string(),
            bands: ["u", "g", "r", "i"].map(String::from).to_vec(),
        }
    }
}

impl PreprocessConfig {
    fn validate(&self) -> Result<()> {
        if !(self.outlier_threshold.is_finite() && self.outlier_threshold > 0.0) {
            return Err(invalid(format!(
                "preprocess.outlier_threshold must be positive, got {}",
                self.outlier_threshold
            )));
        }
        if self.redshift_column.is_empty() {
            return Err(invalid("preprocess.redshift_column must not be empty"));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Spectrum fetching
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpectrumForm {
    /// `Wavelength, Flux, BestFit, SkyFlux`
    #[default]
    Lite,
    /// `FLUX, LOGLAM, IVAR, AND_MASK, OR_MASK, WDISP, SKY, WRESL, MODEL`
    Full,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FetchConfig {
    /// Base URL without the query string; defaults follow `form`.
    pub base_url: Option<String>,
    pub form: SpectrumForm,
    /// Total attempts per spectrum, including the first.
    pub max_attempts: u32,
    /// Fixed pause after each failed attempt.
    pub retry_delay_ms: u64,
    pub timeout_ms: u64,
    /// Threads used by `fetch_many`.
    pub workers: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            form: SpectrumForm::Lite,
            max_attempts: 5,
            retry_delay_ms: 2_000,
            timeout_ms: 60_000,
            workers: 4,
        }
    }
}

impl FetchConfig {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn base_url(&self) -> String {
        match (&self.base_url, self.form) {
            (Some(url), _) => url.clone(),
            (None, SpectrumForm::Lite) => {
                "http://dr18.sdss.org/optical/spectrum/view/data/format=csv/spec=lite".to_string()
            }
            (None, SpectrumForm::Full) => {
                "http://dr18.sdss.org/optical/spectrum/view/data/format=csv/spec=full".to_string()
            }
        }
    }

    fn validate(&self) -> Result<()> {
        if self.max_attempts == 0 {
            return Err(invalid("fetch.max_attempts must be at least 1"));
        }
        if self.workers == 0 {
            return Err(invalid("fetch.workers must be at least 1"));
        }
        if self.timeout_ms == 0 {
            return Err(invalid("fetch.timeout_ms must be positive"));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Classifier
// ---------------------------------------------------------------------------

/// How `predict` checks incoming features against the training table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchemaCheck {
    /// Only the number of columns must match.
    #[default]
    ColumnCount,
    /// Column names must match, in the same order.
    NamesInOrder,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClassifierConfig {
    pub schema_check: SchemaCheck,
    pub learning_rate: f64,
    pub max_iterations: usize,
    /// L2 penalty strength (inverse of scikit-learn's `C`).
    pub l2_penalty: f64,
    /// Stop once the largest gradient component falls below this.
    pub tolerance: f64,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            schema_check: SchemaCheck::ColumnCount,
            learning_rate: 0.5,
            max_iterations: 2_000,
            l2_penalty: 1e-3,
            tolerance: 1e-6,
        }
    }
}

impl ClassifierConfig {
    fn validate(&self) -> Result<()> {
        if !(self.learning_rate.is_finite() && self.learning_rate > 0.0) {
            return Err(invalid("classifier.learning_rate must be positive"));
        }
        if self.max_iterations == 0 {
            return Err(invalid("classifier.max_iterations must be at least 1"));
        }
        if !(self.l2_penalty.is_finite() && self.l2_penalty >= 0.0) {
            return Err(invalid("classifier.l2_penalty must be non-negative"));
        }
        Ok(())
    }
}
