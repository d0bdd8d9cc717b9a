//! Column projections of a query result.

use super::model::TabularDataset;
use super::query::SpectralQuery;
use crate::error::{Result, SpectraError};
use crate::fetch::SpectralRecord;

pub const OBJECT_ID: &str = "bestObjID";

/// Pulls identifier, coordinate, abundance and redshift columns out of a
/// loaded result.
#[derive(Debug, Clone, Copy)]
pub struct MetadataExtractor<'a> {
    data: Option<&'a TabularDataset>,
}

impl<'a> MetadataExtractor<'a> {
    pub fn new(data: Option<&'a TabularDataset>) -> Self {
        Self { data }
    }

    pub fn from_query(query: &'a SpectralQuery) -> Self {
        Self::new(query.result().map(|r| &r.data))
    }

    /// `bestObjID`
    pub fn identifiers(&self) -> Result<TabularDataset> {
        self.project("identifier extraction", &[OBJECT_ID])
    }

    /// `bestObjID, ra, dec`
    pub fn coordinates(&self) -> Result<TabularDataset> {
        self.project("coordinate extraction", &[OBJECT_ID, "ra", "dec"])
    }

    /// `bestObjID, elodieFeH`
    pub fn chemical_abundances(&self) -> Result<TabularDataset> {
        self.project("abundance extraction", &[OBJECT_ID, "elodieFeH"])
    }

    /// `bestObjID, elodieZ`
    pub fn redshifts(&self) -> Result<TabularDataset> {
        self.project("redshift extraction", &[OBJECT_ID, "elodieZ"])
    }

    /// One [`SpectralRecord`] per row, from the `plate`, `mjd` and `fiberid`
    /// columns.
    pub fn spectral_records(&self) -> Result<Vec<SpectralRecord>> {
        let data = self.loaded("spectral record extraction")?;
        let rows = data.require_rows("spectral record extraction")?;
        (0..rows)
            .map(|row| SpectralRecord::from_row(data, row))
            .collect()
    }

    fn loaded(&self, operation: &'static str) -> Result<&'a TabularDataset> {
        match self.data {
            Some(data) if !data.is_empty() => Ok(data),
            _ => Err(SpectraError::NoData { operation }),
        }
    }

    fn project(&self, operation: &'static str, columns: &[&str]) -> Result<TabularDataset> {
        self.loaded(operation)?.select(columns)
    }
}
