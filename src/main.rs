use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use sky_spectra::data::loader::load_file;
use sky_spectra::{CelestialClassifier, PipelineConfig, SpectralPreprocessor};

const LABEL_COLUMN: &str = "class";

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let Some(table) = args.next().map(PathBuf::from) else {
        bail!("usage: sky-spectra <table.{{csv,json,parquet}}> [config.json]");
    };
    let config = match args.next() {
        Some(path) => PipelineConfig::from_file(Path::new(&path))
            .with_context(|| format!("Failed to read config {path}"))?,
        None => PipelineConfig::default(),
    };

    let loaded = load_file(&table).with_context(|| format!("Failed to load {}", table.display()))?;
    let labels = loaded
        .text_column(LABEL_COLUMN)
        .context("table needs a text 'class' column")?
        .to_vec();

    // Photometric bands plus redshift; anything else in the table is ignored.
    let bands: Vec<&str> = config.preprocess.bands.iter().map(String::as_str).collect();
    let mut wanted = bands.clone();
    wanted.push(&config.preprocess.redshift_column);
    let features = loaded.data.select(&wanted)?;

    let mut preprocessor = SpectralPreprocessor::new(Some(features), config.preprocess.clone());
    preprocessor.correct_redshift_default()?;
    preprocessor.normalize()?;
    let features = preprocessor
        .into_data()
        .context("preprocessor lost its dataset")?;

    // Even rows train, odd rows test.
    let rows = features.require_rows("train/test split")?;
    if rows < 2 {
        bail!("need at least two rows to train and test, got {rows}");
    }
    if labels.len() != rows {
        bail!("{} labels for {rows} rows", labels.len());
    }
    let train: Vec<usize> = (0..rows).step_by(2).collect();
    let test: Vec<usize> = (1..rows).step_by(2).collect();
    let pick = |idx: &[usize]| idx.iter().map(|&i| labels[i].clone()).collect::<Vec<_>>();

    let mut classifier = CelestialClassifier::new(config.classifier.clone());
    classifier.fit(&features.take_rows(&train)?, &pick(&train))?;
    classifier.predict(&features.take_rows(&test)?, &pick(&test))?;

    if let Some(confusion) = classifier.last_confusion() {
        println!("{confusion}");
        if let Some(accuracy) = confusion.accuracy() {
            println!("accuracy: {:.3} on {} held-out rows", accuracy, test.len());
        }
    }
    Ok(())
}
