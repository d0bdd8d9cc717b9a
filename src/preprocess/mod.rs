//! In-place cleaning transforms over a [`TabularDataset`].
//!
//! Each transform is a pure function of the dataset's current contents, so
//! they can be chained in any order. Nothing is cached between calls.

pub mod spline;
pub mod stats;

use crate::config::{OutlierPolicy, PreprocessConfig};
use crate::data::model::{Column, TabularDataset};
use crate::error::{Result, SpectraError};

use spline::Interpolant;

/// Owns the dataset for the duration of the cleaning stage.
#[derive(Debug, Clone, Default)]
pub struct SpectralPreprocessor {
    data: Option<TabularDataset>,
    config: PreprocessConfig,
}

impl SpectralPreprocessor {
    pub fn new(data: Option<TabularDataset>, config: PreprocessConfig) -> Self {
        Self { data, config }
    }

    pub fn with_data(data: TabularDataset) -> Self {
        Self::new(Some(data), PreprocessConfig::default())
    }

    pub fn config(&self) -> &PreprocessConfig {
        &self.config
    }

    pub fn data(&self) -> Option<&TabularDataset> {
        self.data.as_ref()
    }

    pub fn set_data(&mut self, data: TabularDataset) {
        self.data = Some(data);
    }

    pub fn into_data(self) -> Option<TabularDataset> {
        self.data
    }

    fn loaded(&mut self, operation: &'static str) -> Result<&mut TabularDataset> {
        match self.data.as_mut() {
            Some(data) if !data.is_empty() => Ok(data),
            _ => Err(SpectraError::NoData { operation }),
        }
    }

    // -----------------------------------------------------------------------
    // normalize
    // -----------------------------------------------------------------------

    /// Replace every value with its z-score `(v - mean) / std`.
    ///
    /// Mean and population std are taken once per column before any value is
    /// rewritten. A zero-variance column fails with `DegenerateColumn`, a
    /// NaN or infinite value with `InvalidInput`; either way the whole
    /// dataset is left untouched. Calling this again on normalized
    /// data changes values only by floating-point noise.
    pub fn normalize(&mut self) -> Result<()> {
        let data = self.loaded("normalization")?;

        let mut scaled = Vec::with_capacity(data.num_columns());
        for (name, column) in data.columns() {
            let values = column.to_f64();
            if let Some(row) = values.iter().position(|v| !v.is_finite()) {
                return Err(SpectraError::InvalidInput(format!(
                    "column '{name}' has a non-finite value at row {row}"
                )));
            }
            let mu = stats::mean(&values);
            let sigma = stats::std_dev(&values, mu);
            if sigma == 0.0 || !sigma.is_finite() {
                return Err(SpectraError::DegenerateColumn {
                    column: name.to_string(),
                });
            }
            scaled.push(values.iter().map(|v| (v - mu) / sigma).collect::<Vec<_>>());
        }

        for ((_, column), values) in data.columns_mut().zip(scaled) {
            *column = Column::Float(values);
        }
        log::debug!("normalized {data}");
        Ok(())
    }

    // -----------------------------------------------------------------------
    // remove_outliers
    // -----------------------------------------------------------------------

    /// Remove values whose absolute z-score is not below `threshold`.
    ///
    /// With [`OutlierPolicy::RowWise`] a row is dropped from every column when
    /// any of its values is an outlier. With [`OutlierPolicy::ColumnWise`]
    /// each column is filtered on its own; once anything is removed the
    /// dataset is no longer row-aligned and row-coupled operations
    /// (interpolation, redshift correction, row-wise removal) fail with
    /// `RaggedDataset`.
    ///
    /// Returns the number of rows (row-wise) or values (column-wise) removed.
    pub fn remove_outliers(&mut self, threshold: f64) -> Result<usize> {
        let policy = self.config.outlier_policy;
        let data = self.loaded("outlier removal")?;
        if !(threshold.is_finite() && threshold > 0.0) {
            return Err(SpectraError::InvalidInput(format!(
                "outlier threshold must be positive, got {threshold}"
            )));
        }

        let removed = match policy {
            OutlierPolicy::RowWise => {
                let rows = data.require_rows("row-wise outlier removal")?;
                let mut keep = vec![true; rows];
                for (_, column) in data.columns() {
                    let scores = stats::abs_zscores(&column.to_f64());
                    for (k, z) in keep.iter_mut().zip(scores) {
                        *k &= z < threshold;
                    }
                }
                let removed = keep.iter().filter(|k| !**k).count();
                data.retain_rows(&keep)?;
                removed
            }
            OutlierPolicy::ColumnWise => {
                let mut removed = 0;
                let filtered: Vec<Column> = data
                    .columns()
                    .map(|(_, column)| {
                        let keep: Vec<bool> = stats::abs_zscores(&column.to_f64())
                            .into_iter()
                            .map(|z| z < threshold)
                            .collect();
                        removed += keep.iter().filter(|k| !**k).count();
                        let mut column = column.clone();
                        column.retain_mask(&keep);
                        column
                    })
                    .collect();
                if removed > 0 {
                    for (idx, column) in filtered.into_iter().enumerate() {
                        data.replace_column_unaligned(idx, column);
                    }
                }
                removed
            }
        };

        log::debug!("removed {removed} outliers ({policy:?}, threshold {threshold})");
        Ok(removed)
    }

    /// [`remove_outliers`](Self::remove_outliers) with the configured threshold.
    pub fn remove_outliers_default(&mut self) -> Result<usize> {
        let threshold = self.config.outlier_threshold;
        self.remove_outliers(threshold)
    }

    // -----------------------------------------------------------------------
    // interpolate
    // -----------------------------------------------------------------------

    /// Resample every column at `new_index`, where the existing rows sit at
    /// positions `0..n`.
    ///
    /// `new_index` must have exactly as many entries as the dataset has rows;
    /// the check runs before anything is evaluated. Positions outside `0..n`
    /// are extrapolated.
    pub fn interpolate(&mut self, new_index: &[f64]) -> Result<()> {
        let kind = self.config.interpolation;
        let data = self.loaded("interpolation")?;
        let rows = data.require_rows("interpolation")?;
        if new_index.len() != rows {
            return Err(SpectraError::LengthMismatch {
                expected: rows,
                found: new_index.len(),
            });
        }

        let mut resampled = Vec::with_capacity(data.num_columns());
        for (_, column) in data.columns() {
            let interpolant = Interpolant::over_index(column.to_f64(), kind)?;
            resampled.push(interpolant.eval_many(new_index));
        }
        for ((_, column), values) in data.columns_mut().zip(resampled) {
            *column = Column::Float(values);
        }
        log::debug!("interpolated {rows} rows ({kind:?})");
        Ok(())
    }

    // -----------------------------------------------------------------------
    // correct_redshift
    // -----------------------------------------------------------------------

    /// Recover emitted values from observed ones: `band / (1 + z)`.
    ///
    /// Bands missing from the dataset are skipped; the redshift column itself
    /// is never rescaled. Not idempotent: a second call divides again.
    pub fn correct_redshift<S: AsRef<str>>(&mut self, bands: &[S]) -> Result<()> {
        let z_name = self.config.redshift_column.clone();
        let data = self.loaded("redshift correction")?;
        let z = data.require(&z_name)?.to_f64();
        data.require_rows("redshift correction")?;

        let mut corrected = Vec::new();
        for band in bands.iter().map(AsRef::as_ref) {
            if band == z_name {
                log::debug!("not rescaling the redshift column '{band}'");
                continue;
            }
            let Some(column) = data.column(band) else {
                log::debug!("band '{band}' not present, skipping");
                continue;
            };
            let observed = column.to_f64();
            if observed.len() != z.len() {
                return Err(SpectraError::LengthMismatch {
                    expected: z.len(),
                    found: observed.len(),
                });
            }
            let emitted: Vec<f64> = observed
                .iter()
                .zip(&z)
                .map(|(obs, z)| obs / (1.0 + z))
                .collect();
            corrected.push((band.to_string(), emitted));
        }

        for (band, values) in corrected {
            data.insert_column(band, Column::Float(values))?;
        }
        Ok(())
    }

    /// [`correct_redshift`](Self::correct_redshift) over the configured bands.
    pub fn correct_redshift_default(&mut self) -> Result<()> {
        let bands = self.config.bands.clone();
        self.correct_redshift(&bands)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn floats(values: &[f64]) -> Column {
        Column::Float(values.to_vec())
    }

    fn photometry() -> TabularDataset {
        TabularDataset::from_columns([
            ("ra", Column::Int(vec![1, 2, 3])),
            ("u", Column::Int(vec![7, 8, 9])),
            ("g", Column::Int(vec![10, 11, 12])),
            ("r", Column::Int(vec![13, 14, 15])),
            ("i", Column::Int(vec![16, 17, 18])),
            ("z", floats(&[0.4, 0.5, 0.6])),
        ])
        .unwrap()
    }

    fn column(pre: &SpectralPreprocessor, name: &str) -> Vec<f64> {
        pre.data().unwrap().column(name).unwrap().to_f64()
    }

    fn assert_close(actual: &[f64], expected: &[f64], tol: f64) {
        assert_eq!(actual.len(), expected.len(), "{actual:?} vs {expected:?}");
        for (a, e) in actual.iter().zip(expected) {
            assert!((a - e).abs() < tol, "{actual:?} vs {expected:?}");
        }
    }

    fn with_policy(data: TabularDataset, policy: OutlierPolicy) -> SpectralPreprocessor {
        let config = PreprocessConfig {
            outlier_policy: policy,
            ..PreprocessConfig::default()
        };
        SpectralPreprocessor::new(Some(data), config)
    }

    #[test]
    fn every_operation_needs_data() {
        let mut pre = SpectralPreprocessor::default();
        assert!(matches!(pre.normalize(), Err(SpectraError::NoData { .. })));
        assert!(matches!(pre.remove_outliers(2.5), Err(SpectraError::NoData { .. })));
        assert!(matches!(pre.interpolate(&[]), Err(SpectraError::NoData { .. })));
        assert!(matches!(
            pre.correct_redshift(&["u"]),
            Err(SpectraError::NoData { .. })
        ));

        let mut empty = SpectralPreprocessor::with_data(TabularDataset::new());
        assert!(matches!(empty.normalize(), Err(SpectraError::NoData { .. })));
    }

    #[test]
    fn normalize_gives_zero_mean_unit_std() {
        let mut pre = SpectralPreprocessor::with_data(photometry());
        pre.normalize().unwrap();

        assert_close(&column(&pre, "u"), &[-1.2247, 0.0, 1.2247], 1e-3);
        for name in ["ra", "u", "g", "r", "i", "z"] {
            let values = column(&pre, name);
            let mu = stats::mean(&values);
            assert!(mu.abs() < 1e-9);
            assert!((stats::std_dev(&values, mu) - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn normalize_twice_is_a_no_op_up_to_rounding() {
        let mut pre = SpectralPreprocessor::with_data(photometry());
        pre.normalize().unwrap();
        let once = column(&pre, "g");
        pre.normalize().unwrap();
        assert_close(&column(&pre, "g"), &once, 1e-9);
    }

    #[test]
    fn normalize_rejects_constant_column_without_touching_data() {
        let data = TabularDataset::from_columns([
            ("u", floats(&[1.0, 2.0, 3.0])),
            ("flag", Column::Int(vec![1, 1, 1])),
        ])
        .unwrap();
        let mut pre = SpectralPreprocessor::with_data(data.clone());
        let err = pre.normalize().unwrap_err();
        assert!(matches!(err, SpectraError::DegenerateColumn { column } if column == "flag"));
        assert_eq!(pre.data(), Some(&data));
    }

    fn with_spike() -> TabularDataset {
        let mut a = vec![10.0; 20];
        a[19] = 100.0;
        let b: Vec<f64> = (0..20).map(|i| i as f64).collect();
        TabularDataset::from_columns([("a", floats(&a)), ("b", floats(&b))]).unwrap()
    }

    #[test]
    fn row_wise_outlier_removal_keeps_columns_aligned() {
        let mut pre = with_policy(with_spike(), OutlierPolicy::RowWise);
        let removed = pre.remove_outliers(2.5).unwrap();

        assert_eq!(removed, 1);
        let data = pre.data().unwrap();
        assert_eq!(data.row_count(), Some(19));
        assert_eq!(column(&pre, "b").last(), Some(&18.0));
    }

    #[test]
    fn column_wise_outlier_removal_can_leave_ragged_columns() {
        let mut pre = with_policy(with_spike(), OutlierPolicy::ColumnWise);
        let removed = pre.remove_outliers(2.5).unwrap();

        assert_eq!(removed, 1);
        assert_eq!(column(&pre, "a").len(), 19);
        assert_eq!(column(&pre, "b").len(), 20);
        assert_eq!(pre.data().unwrap().row_count(), None);
        assert!(matches!(
            pre.interpolate(&[0.0; 19]),
            Err(SpectraError::RaggedDataset { .. })
        ));
    }

    #[test]
    fn column_wise_removal_of_different_rows_blocks_row_coupled_operations() {
        let mut u: Vec<f64> = (0..20).map(|i| 10.0 + i as f64 * 0.01).collect();
        u[0] = 100.0;
        let mut z = vec![0.5; 20];
        z[19] = 5.0;
        let data = TabularDataset::from_columns([("u", floats(&u)), ("z", floats(&z))]).unwrap();
        let mut pre = with_policy(data, OutlierPolicy::ColumnWise);

        assert_eq!(pre.remove_outliers(2.5).unwrap(), 2);
        // same lengths, but row k of `u` and `z` no longer describe the same object
        assert_eq!(column(&pre, "u").len(), 19);
        assert_eq!(column(&pre, "z").len(), 19);
        assert_eq!(pre.data().unwrap().row_count(), None);

        assert!(matches!(
            pre.correct_redshift(&["u"]),
            Err(SpectraError::RaggedDataset { .. })
        ));
        assert!(matches!(
            pre.interpolate(&[0.0; 19]),
            Err(SpectraError::RaggedDataset { .. })
        ));
        assert_eq!(column(&pre, "u")[0], u[1]);
    }

    #[test]
    fn column_wise_removal_without_outliers_keeps_alignment() {
        let mut pre = with_policy(photometry(), OutlierPolicy::ColumnWise);
        assert_eq!(pre.remove_outliers(2.5).unwrap(), 0);
        assert_eq!(pre.data().unwrap().row_count(), Some(3));
        assert!(pre.correct_redshift(&["u"]).is_ok());
    }

    #[test]
    fn retained_values_are_below_threshold_and_converge() {
        let values: Vec<f64> = (0..50)
            .map(|i| if i % 10 == 0 { 40.0 + i as f64 } else { (i % 7) as f64 })
            .collect();
        let original = values.clone();
        let data = TabularDataset::from_columns([("flux", floats(&values))]).unwrap();

        for policy in [OutlierPolicy::RowWise, OutlierPolicy::ColumnWise] {
            let mut pre = with_policy(data.clone(), policy);
            pre.remove_outliers(2.0).unwrap();

            // every survivor was under threshold in the input distribution
            let first_pass = column(&pre, "flux");
            let mu = stats::mean(&original);
            let sigma = stats::std_dev(&original, mu);
            assert!(first_pass.iter().all(|v| ((v - mu) / sigma).abs() < 2.0));

            while pre.remove_outliers(2.0).unwrap() > 0 {}
            let converged = pre.data().unwrap().clone();
            assert_eq!(pre.remove_outliers(2.0).unwrap(), 0);
            assert_eq!(pre.data(), Some(&converged));
        }
    }

    #[test]
    fn rejects_non_positive_threshold() {
        let mut pre = SpectralPreprocessor::with_data(photometry());
        assert!(matches!(
            pre.remove_outliers(0.0),
            Err(SpectraError::InvalidInput(_))
        ));
    }

    #[test]
    fn missing_data_is_reported_before_a_bad_threshold() {
        let mut pre = SpectralPreprocessor::default();
        assert!(matches!(
            pre.remove_outliers(0.0),
            Err(SpectraError::NoData { .. })
        ));
    }

    #[test]
    fn normalize_reports_non_finite_values_by_column() {
        let data = TabularDataset::from_columns([
            ("u", floats(&[1.0, 2.0, 3.0])),
            ("g", floats(&[1.0, f64::NAN, 3.0])),
        ])
        .unwrap();
        let mut pre = SpectralPreprocessor::with_data(data);
        let err = pre.normalize().unwrap_err();
        assert!(matches!(err, SpectraError::InvalidInput(msg) if msg.contains("'g'")));
        assert_eq!(column(&pre, "u"), vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn interpolate_checks_length_first() {
        let mut pre = SpectralPreprocessor::with_data(photometry());
        let err = pre.interpolate(&[0.0, 1.0]).unwrap_err();
        assert!(matches!(
            err,
            SpectraError::LengthMismatch {
                expected: 3,
                found: 2
            }
        ));
        assert_eq!(pre.data(), Some(&photometry()));
    }

    #[test]
    fn interpolate_resamples_every_column() {
        let data = TabularDataset::from_columns([
            ("wavelength", floats(&[4000.0, 4002.0, 4004.0, 4006.0, 4008.0])),
            ("flux", floats(&[1.0, 2.0, 3.0, 4.0, 5.0])),
        ])
        .unwrap();
        let mut pre = SpectralPreprocessor::with_data(data);
        pre.interpolate(&[0.5, 1.5, 2.5, 3.5, 5.0]).unwrap();

        assert_eq!(pre.data().unwrap().row_count(), Some(5));
        assert_close(&column(&pre, "flux"), &[1.5, 2.5, 3.5, 4.5, 6.0], 1e-9);
        assert_close(
            &column(&pre, "wavelength"),
            &[4001.0, 4003.0, 4005.0, 4007.0, 4010.0],
            1e-9,
        );
    }

    #[test]
    fn redshift_correction_divides_by_one_plus_z() {
        let mut pre = SpectralPreprocessor::with_data(photometry());
        pre.correct_redshift(&["u"]).unwrap();
        assert_close(&column(&pre, "u"), &[5.0, 5.3333, 5.625], 1e-3);
        // untouched bands keep their values
        assert_close(&column(&pre, "g"), &[10.0, 11.0, 12.0], 1e-12);
    }

    #[test]
    fn redshift_correction_is_not_idempotent() {
        let mut pre = SpectralPreprocessor::with_data(photometry());
        pre.correct_redshift(&["u"]).unwrap();
        pre.correct_redshift(&["u"]).unwrap();
        assert_close(
            &column(&pre, "u"),
            &[7.0 / 1.4f64.powi(2), 8.0 / 1.5f64.powi(2), 9.0 / 1.6f64.powi(2)],
            1e-9,
        );
    }

    #[test]
    fn redshift_skips_absent_bands_and_the_z_column() {
        let mut pre = SpectralPreprocessor::with_data(photometry());
        pre.correct_redshift(&["nope", "z"]).unwrap();
        assert_eq!(pre.data(), Some(&photometry()));
    }

    #[test]
    fn redshift_without_z_column_is_missing_column() {
        let mut data = photometry();
        data.remove_column("z");
        let mut pre = SpectralPreprocessor::with_data(data);
        let err = pre.correct_redshift_default().unwrap_err();
        assert!(matches!(err, SpectraError::MissingColumn { column } if column == "z"));
    }
}
