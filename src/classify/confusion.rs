use std::fmt;

use super::CelestialClass;

/// Counts of (true, predicted) label pairs. Rows are the true class, columns
/// the predicted class, both ordered galaxy, star, qso.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConfusionMatrix {
    counts: [[usize; 3]; 3],
}

impl ConfusionMatrix {
    pub fn from_labels(truth: &[CelestialClass], predicted: &[CelestialClass]) -> Self {
        let mut counts = [[0; 3]; 3];
        for (t, p) in truth.iter().zip(predicted) {
            counts[t.index()][p.index()] += 1;
        }
        Self { counts }
    }

    pub fn get(&self, truth: CelestialClass, predicted: CelestialClass) -> usize {
        self.counts[truth.index()][predicted.index()]
    }

    pub fn counts(&self) -> [[usize; 3]; 3] {
        self.counts
    }

    pub fn total(&self) -> usize {
        self.counts.iter().flatten().sum()
    }

    /// Fraction of rows on the diagonal; `None` for an empty matrix.
    pub fn accuracy(&self) -> Option<f64> {
        let total = self.total();
        if total == 0 {
            return None;
        }
        let correct: usize = (0..3).map(|i| self.counts[i][i]).sum();
        Some(correct as f64 / total as f64)
    }
}

impl fmt::Display for ConfusionMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:>8}", "")?;
        for class in CelestialClass::ALL {
            write!(f, "{:>8}", class.to_string())?;
        }
        for class in CelestialClass::ALL {
            writeln!(f)?;
            write!(f, "{:>8}", class.to_string())?;
            for count in self.counts[class.index()] {
                write!(f, "{count:>8}")?;
            }
        }
        Ok(())
    }
}
