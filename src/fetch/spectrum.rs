use std::fmt;

use crate::config::SpectrumForm;
use crate::data::loader::parse_csv_text;
use crate::data::model::{Column, TabularDataset};
use crate::error::{Result, SpectraError};

// ---------------------------------------------------------------------------
// SpectralRecord – the plate / MJD / fiber address of one spectrum
// ---------------------------------------------------------------------------

/// Identifies one spectroscopic exposure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SpectralRecord {
    pub plate: i64,
    pub mjd: i64,
    pub fiberid: i64,
}

impl SpectralRecord {
    pub const FIELDS: [&'static str; 3] = ["plate", "mjd", "fiberid"];

    pub fn new(plate: i64, mjd: i64, fiberid: i64) -> Self {
        Self {
            plate,
            mjd,
            fiberid,
        }
    }

    /// Read the three identifiers from one row of `data`.
    pub fn from_row(data: &TabularDataset, row: usize) -> Result<Self> {
        let mut fields = [0i64; 3];
        for (slot, name) in fields.iter_mut().zip(Self::FIELDS) {
            let column = data.require(name)?;
            *slot = column.get_i64(row).ok_or_else(|| {
                SpectraError::InvalidInput(format!("row {row}: '{name}' is not an integer"))
            })?;
        }
        let [plate, mjd, fiberid] = fields;
        Ok(Self::new(plate, mjd, fiberid))
    }

    /// The resource address below `base_url`.
    pub fn url(&self, base_url: &str) -> String {
        format!(
            "{base_url}?plateid={}&mjd={}&fiberid={}",
            self.plate, self.mjd, self.fiberid
        )
    }
}

impl fmt::Display for SpectralRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}-{:04}", self.plate, self.mjd, self.fiberid)
    }
}

// ---------------------------------------------------------------------------
// RawSpectrum – flux against wavelength as served by the survey
// ---------------------------------------------------------------------------

pub const LITE_COLUMNS: [&str; 4] = ["Wavelength", "Flux", "BestFit", "SkyFlux"];

pub const FULL_COLUMNS: [&str; 9] = [
    "FLUX", "LOGLAM", "IVAR", "AND_MASK", "OR_MASK", "WDISP", "SKY", "WRESL", "MODEL",
];

/// A fetched spectrum: the parsed table plus the layout it arrived in.
#[derive(Debug, Clone, PartialEq)]
pub struct RawSpectrum {
    form: SpectrumForm,
    data: TabularDataset,
}

impl RawSpectrum {
    /// Parse a CSV body and check it carries every column `form` requires.
    pub fn parse(text: &str, form: SpectrumForm) -> Result<Self> {
        let parsed = parse_csv_text(text)
            .map_err(|e| SpectraError::MalformedSpectrum(e.to_string()))?;
        Self::from_table(parsed.data, form)
    }

    pub fn from_table(data: TabularDataset, form: SpectrumForm) -> Result<Self> {
        let required: &[&str] = match form {
            SpectrumForm::Lite => &LITE_COLUMNS,
            SpectrumForm::Full => &FULL_COLUMNS,
        };
        if let Some(missing) = required.iter().find(|c| !data.contains(c)) {
            return Err(SpectraError::MalformedSpectrum(format!(
                "missing column '{missing}'"
            )));
        }
        if data.require_rows("spectrum parsing")? == 0 {
            return Err(SpectraError::MalformedSpectrum("no rows".to_string()));
        }
        Ok(Self { form, data })
    }

    pub fn form(&self) -> SpectrumForm {
        self.form
    }

    pub fn data(&self) -> &TabularDataset {
        &self.data
    }

    pub fn into_data(self) -> TabularDataset {
        self.data
    }

    pub fn len(&self) -> usize {
        self.data.row_count().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Wavelength in Ångström (`10^LOGLAM` for the full form).
    pub fn wavelength(&self) -> Vec<f64> {
        match self.form {
            SpectrumForm::Lite => self.values("Wavelength"),
            SpectrumForm::Full => self
                .values("LOGLAM")
                .into_iter()
                .map(|l| 10f64.powf(l))
                .collect(),
        }
    }

    pub fn flux(&self) -> Vec<f64> {
        match self.form {
            SpectrumForm::Lite => self.values("Flux"),
            SpectrumForm::Full => self.values("FLUX"),
        }
    }

    /// Best-fit model flux.
    pub fn model(&self) -> Vec<f64> {
        match self.form {
            SpectrumForm::Lite => self.values("BestFit"),
            SpectrumForm::Full => self.values("MODEL"),
        }
    }

    pub fn sky(&self) -> Vec<f64> {
        match self.form {
            SpectrumForm::Lite => self.values("SkyFlux"),
            SpectrumForm::Full => self.values("SKY"),
        }
    }

    /// Inverse variance; only the full form carries it.
    pub fn ivar(&self) -> Option<Vec<f64>> {
        match self.form {
            SpectrumForm::Lite => None,
            SpectrumForm::Full => Some(self.values("IVAR")),
        }
    }

    /// AND-combined pixel quality mask; only the full form carries it.
    pub fn and_mask(&self) -> Option<Vec<i64>> {
        match (self.form, self.data.column("AND_MASK")) {
            (SpectrumForm::Full, Some(Column::Int(mask))) => Some(mask.clone()),
            (SpectrumForm::Full, Some(Column::Float(mask))) => {
                Some(mask.iter().map(|&m| m as i64).collect())
            }
            _ => None,
        }
    }

    // Presence of every accessor's column is checked in `from_table`.
    fn values(&self, name: &str) -> Vec<f64> {
        self.data.column(name).map(Column::to_f64).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LITE: &str = "Wavelength,Flux,BestFit,SkyFlux\n3800.5,1.25,1.1,0.3\n3801.4,1.5,1.2,0.31\n";

    #[test]
    fn parses_lite_spectrum() {
        let spectrum = RawSpectrum::parse(LITE, SpectrumForm::Lite).unwrap();
        assert_eq!(spectrum.len(), 2);
        assert_eq!(spectrum.wavelength(), vec![3800.5, 3801.4]);
        assert_eq!(spectrum.flux(), vec![1.25, 1.5]);
        assert_eq!(spectrum.model(), vec![1.1, 1.2]);
        assert_eq!(spectrum.sky(), vec![0.3, 0.31]);
        assert_eq!(spectrum.ivar(), None);
    }

    #[test]
    fn parses_full_spectrum() {
        let text = "FLUX,LOGLAM,IVAR,AND_MASK,OR_MASK,WDISP,SKY,WRESL,MODEL\n\
                    2.0,3.5,0.8,0,16,1.1,0.4,1.9,2.1\n";
        let spectrum = RawSpectrum::parse(text, SpectrumForm::Full).unwrap();
        assert!((spectrum.wavelength()[0] - 3162.2776601683795).abs() < 1e-6);
        assert_eq!(spectrum.ivar(), Some(vec![0.8]));
        assert_eq!(spectrum.and_mask(), Some(vec![0]));
        assert_eq!(spectrum.model(), vec![2.1]);
    }

    #[test]
    fn missing_column_is_malformed() {
        let err = RawSpectrum::parse("Wavelength,Flux\n1,2\n", SpectrumForm::Lite).unwrap_err();
        assert!(matches!(err, SpectraError::MalformedSpectrum(msg) if msg.contains("BestFit")));
    }

    #[test]
    fn record_from_row_requires_all_fields() {
        let data = TabularDataset::from_columns([
            ("plate", Column::Int(vec![266])),
            ("mjd", Column::Int(vec![51602])),
        ])
        .unwrap();
        let err = SpectralRecord::from_row(&data, 0).unwrap_err();
        assert!(matches!(err, SpectraError::MissingColumn { column } if column == "fiberid"));
    }

    #[test]
    fn record_url_and_display() {
        let record = SpectralRecord::new(266, 51602, 3);
        assert_eq!(
            record.url("http://example.org/spec"),
            "http://example.org/spec?plateid=266&mjd=51602&fiberid=3"
        );
        assert_eq!(record.to_string(), "266-51602-0003");
    }
}
