//! Galaxy / star / quasar classification from spectral feature tables.

mod confusion;
mod logistic;

use std::fmt;
use std::str::FromStr;

use ndarray::Array2;

pub use confusion::ConfusionMatrix;
use logistic::{SoftmaxRegression, argmax_rows};

use crate::config::{ClassifierConfig, SchemaCheck};
use crate::data::model::TabularDataset;
use crate::error::{Result, SpectraError};

// ---------------------------------------------------------------------------
// CelestialClass
// ---------------------------------------------------------------------------

/// The three object classes, in the fixed model/report order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CelestialClass {
    Galaxy,
    Star,
    Qso,
}

impl CelestialClass {
    pub const ALL: [CelestialClass; 3] = [
        CelestialClass::Galaxy,
        CelestialClass::Star,
        CelestialClass::Qso,
    ];

    /// Position in probability columns and confusion-matrix axes.
    pub fn index(self) -> usize {
        match self {
            CelestialClass::Galaxy => 0,
            CelestialClass::Star => 1,
            CelestialClass::Qso => 2,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CelestialClass::Galaxy => "galaxy",
            CelestialClass::Star => "star",
            CelestialClass::Qso => "qso",
        }
    }
}

impl fmt::Display for CelestialClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CelestialClass {
    type Err = SpectraError;

    /// Case-insensitive, so SDSS `GALAXY` / `STAR` / `QSO` parse directly.
    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "galaxy" => Ok(CelestialClass::Galaxy),
            "star" => Ok(CelestialClass::Star),
            "qso" => Ok(CelestialClass::Qso),
            other => Err(SpectraError::InvalidInput(format!(
                "unknown class label '{other}' (expected galaxy, star or qso)"
            ))),
        }
    }
}

fn parse_labels<S: AsRef<str>>(labels: &[S]) -> Result<Vec<CelestialClass>> {
    labels.iter().map(|l| l.as_ref().parse()).collect()
}

// ---------------------------------------------------------------------------
// CelestialClassifier
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
enum ClassifierState {
    Untrained,
    Trained {
        /// Column names of the training table, in order.
        columns: Vec<String>,
        model: SoftmaxRegression,
    },
}

/// Multinomial logistic classifier over numeric feature tables.
///
/// Starts untrained; [`fit`](Self::fit) trains it (again, if called twice).
/// [`predict`](Self::predict) and [`predict_proba`](Self::predict_proba)
/// require a trained model and a feature table shaped like the training one.
#[derive(Debug, Clone)]
pub struct CelestialClassifier {
    config: ClassifierConfig,
    state: ClassifierState,
    last_confusion: Option<ConfusionMatrix>,
}

impl Default for CelestialClassifier {
    fn default() -> Self {
        Self::new(ClassifierConfig::default())
    }
}

impl CelestialClassifier {
    pub fn new(config: ClassifierConfig) -> Self {
        Self {
            config,
            state: ClassifierState::Untrained,
            last_confusion: None,
        }
    }

    pub fn is_trained(&self) -> bool {
        matches!(self.state, ClassifierState::Trained { .. })
    }

    /// Column names the model was trained on.
    pub fn training_columns(&self) -> Option<&[String]> {
        match &self.state {
            ClassifierState::Trained { columns, .. } => Some(columns),
            ClassifierState::Untrained => None,
        }
    }

    /// Confusion matrix from the most recent [`predict`](Self::predict).
    pub fn last_confusion(&self) -> Option<&ConfusionMatrix> {
        self.last_confusion.as_ref()
    }

    /// Train on `features` with one label per row.
    pub fn fit<S: AsRef<str>>(&mut self, features: &TabularDataset, labels: &[S]) -> Result<()> {
        if features.is_empty() || labels.is_empty() {
            return Err(SpectraError::EmptyInput("need rows and labels to train"));
        }
        let x = feature_matrix(features)?;
        let classes = parse_labels(labels)?;
        if classes.len() != x.nrows() {
            return Err(SpectraError::InvalidInput(format!(
                "{} feature rows but {} labels",
                x.nrows(),
                classes.len()
            )));
        }

        let mut targets = Array2::<f64>::zeros((classes.len(), CelestialClass::ALL.len()));
        for (row, class) in classes.iter().enumerate() {
            targets[[row, class.index()]] = 1.0;
        }

        let model = SoftmaxRegression::fit(x.view(), targets.view(), &self.config);
        log::info!(
            "trained classifier on {} rows x {} features",
            x.nrows(),
            x.ncols()
        );
        self.state = ClassifierState::Trained {
            columns: features.column_names().to_vec(),
            model,
        };
        Ok(())
    }

    /// Predict a class per row and score the predictions against `labels`.
    ///
    /// The confusion matrix is logged and kept for
    /// [`last_confusion`](Self::last_confusion).
    pub fn predict<S: AsRef<str>>(
        &mut self,
        features: &TabularDataset,
        labels: &[S],
    ) -> Result<Vec<CelestialClass>> {
        self.model()?;
        if features.is_empty() || labels.is_empty() {
            return Err(SpectraError::EmptyInput("need rows and labels to predict"));
        }
        let truth = parse_labels(labels)?;
        let probs = self.predict_proba(features)?;
        if truth.len() != probs.nrows() {
            return Err(SpectraError::InvalidInput(format!(
                "{} feature rows but {} labels",
                probs.nrows(),
                truth.len()
            )));
        }

        let predicted: Vec<CelestialClass> = argmax_rows(&probs)
            .into_iter()
            .map(|i| CelestialClass::ALL[i])
            .collect();

        let confusion = ConfusionMatrix::from_labels(&truth, &predicted);
        log::info!("Confusion matrix:\n{confusion}");
        self.last_confusion = Some(confusion);
        Ok(predicted)
    }

    /// `rows x 3` class probabilities, columns ordered galaxy, star, qso.
    pub fn predict_proba(&self, features: &TabularDataset) -> Result<Array2<f64>> {
        let (columns, model) = self.model()?;
        if features.is_empty() {
            return Err(SpectraError::EmptyInput("need rows to predict"));
        }
        let x = feature_matrix(features)?;
        self.check_schema(columns, features)?;
        debug_assert_eq!(x.ncols(), model.num_features());
        Ok(model.predict_proba(x.view()))
    }

    fn model(&self) -> Result<(&[String], &SoftmaxRegression)> {
        match &self.state {
            ClassifierState::Trained { columns, model } => Ok((columns, model)),
            ClassifierState::Untrained => Err(SpectraError::NotTrained),
        }
    }

    fn check_schema(&self, trained: &[String], features: &TabularDataset) -> Result<()> {
        let incoming = features.column_names();
        if trained.len() != incoming.len() {
            return Err(SpectraError::SchemaMismatch(format!(
                "model was trained on {} features, got {}",
                trained.len(),
                incoming.len()
            )));
        }
        if self.config.schema_check == SchemaCheck::NamesInOrder && trained != incoming {
            return Err(SpectraError::SchemaMismatch(format!(
                "expected columns [{}], got [{}]",
                trained.join(", "),
                incoming.join(", ")
            )));
        }
        Ok(())
    }
}

/// Row-major feature matrix; rejects ragged tables and non-finite values.
fn feature_matrix(features: &TabularDataset) -> Result<Array2<f64>> {
    let rows = features
        .row_count()
        .ok_or_else(|| SpectraError::InvalidInput("feature columns are not row-aligned".into()))?;
    let cols = features.num_columns();

    let mut x = Array2::<f64>::zeros((rows, cols));
    for (j, (name, column)) in features.columns().enumerate() {
        for (i, value) in column.to_f64().into_iter().enumerate() {
            if !value.is_finite() {
                return Err(SpectraError::InvalidInput(format!(
                    "non-finite value in column '{name}', row {i}"
                )));
            }
            x[[i, j]] = value;
        }
    }
    Ok(x)
}
