//! Writes `sample_photometry.parquet`: synthetic labelled photometry shaped
//! like a SkyServer `SpecObj` x `PhotoObj` join, for running `sky-spectra`
//! without network access.
//!
//! Usage: `generate_sample [output.parquet] [rows]`

use std::sync::Arc;

use anyhow::Context;
use arrow::array::{Float64Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;

/// Typical colours and redshift range per class.
struct ClassProfile {
    label: &'static str,
    u_g: f64,
    g_r: f64,
    r_i: f64,
    z_range: (f64, f64),
}

const PROFILES: [ClassProfile; 3] = [
    ClassProfile {
        label: "GALAXY",
        u_g: 1.8,
        g_r: 0.8,
        r_i: 0.4,
        z_range: (0.02, 0.4),
    },
    ClassProfile {
        label: "STAR",
        u_g: 1.2,
        g_r: 0.4,
        r_i: 0.15,
        z_range: (-0.0005, 0.0005),
    },
    ClassProfile {
        label: "QSO",
        u_g: 0.25,
        g_r: 0.15,
        r_i: 0.1,
        z_range: (0.5, 3.0),
    },
];

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5)).rotate_left(7).wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    fn uniform(&mut self, lo: f64, hi: f64) -> f64 {
        lo + (hi - lo) * self.next_f64()
    }

    /// Box-Muller transform for normal distribution
    fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(1e-15);
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + std_dev * z
    }
}

#[derive(Default)]
struct Columns {
    obj_id: Vec<i64>,
    ra: Vec<f64>,
    dec: Vec<f64>,
    u: Vec<f64>,
    g: Vec<f64>,
    r: Vec<f64>,
    i: Vec<f64>,
    z: Vec<f64>,
    class: Vec<&'static str>,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let output_path = args
        .next()
        .unwrap_or_else(|| "sample_photometry.parquet".to_string());
    let rows: usize = match args.next() {
        Some(n) => n.parse().with_context(|| format!("row count '{n}' is not a number"))?,
        None => 600,
    };

    let mut rng = SimpleRng::new(42);
    let mut cols = Columns::default();

    // Object ids above 2^53, like real SDSS objIDs.
    let base_id: i64 = 1_237_648_720_693_755_918;
    for row in 0..rows {
        let profile = &PROFILES[row % PROFILES.len()];
        let r = rng.uniform(16.5, 19.5);
        let g = r + rng.gauss(profile.g_r, 0.12);
        let u = g + rng.gauss(profile.u_g, 0.2);
        let i = r - rng.gauss(profile.r_i, 0.08);
        let z = rng.uniform(profile.z_range.0, profile.z_range.1);

        cols.obj_id.push(base_id + row as i64);
        cols.ra.push(rng.uniform(0.0, 360.0));
        cols.dec.push(rng.uniform(-10.0, 70.0));
        cols.u.push(u);
        cols.g.push(g);
        cols.r.push(r);
        cols.i.push(i);
        cols.z.push(z);
        cols.class.push(profile.label);
    }

    let schema = Arc::new(Schema::new(vec![
        Field::new("bestObjID", DataType::Int64, false),
        Field::new("ra", DataType::Float64, false),
        Field::new("dec", DataType::Float64, false),
        Field::new("u", DataType::Float64, false),
        Field::new("g", DataType::Float64, false),
        Field::new("r", DataType::Float64, false),
        Field::new("i", DataType::Float64, false),
        Field::new("z", DataType::Float64, false),
        Field::new("class", DataType::Utf8, false),
    ]));

    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![
            Arc::new(Int64Array::from(cols.obj_id)),
            Arc::new(Float64Array::from(cols.ra)),
            Arc::new(Float64Array::from(cols.dec)),
            Arc::new(Float64Array::from(cols.u)),
            Arc::new(Float64Array::from(cols.g)),
            Arc::new(Float64Array::from(cols.r)),
            Arc::new(Float64Array::from(cols.i)),
            Arc::new(Float64Array::from(cols.z)),
            Arc::new(StringArray::from(cols.class)),
        ],
    )
    .context("Failed to create RecordBatch")?;

    let file = std::fs::File::create(&output_path)
        .with_context(|| format!("Failed to create {output_path}"))?;
    let mut writer = ArrowWriter::try_new(file, schema, None).context("Failed to create writer")?;
    writer.write(&batch).context("Failed to write batch")?;
    writer.close().context("Failed to close writer")?;

    log::info!("wrote {rows} objects to {output_path}");
    println!("Wrote {rows} labelled objects to {output_path}");
    Ok(())
}
