//! Writes a synthetic furnace dataset (semicolon CSV and Parquet) with a
//! localized heating event, for trying out the analysis without plant data.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{ArrayRef, Float64Array, Int64Array};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use clap::Parser;
use parquet::arrow::ArrowWriter;

use thermogrid::config::{RunConfig, SensorGrid};
use thermogrid::data::loader::DELIMITER;
use thermogrid::data::model::{column_key, ColumnKind};

#[derive(Debug, Parser)]
#[command(about = "Generate a synthetic sensor-grid dataset")]
struct Args {
    /// Output directory
    #[arg(short, long, default_value = "dataset")]
    output_dir: PathBuf,

    /// Number of time steps
    #[arg(long, default_value_t = 8000)]
    steps: usize,

    #[arg(long, default_value_t = 42)]
    seed: u64,
}

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
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
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

    /// Box-Muller transform for normal distribution
    fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(1e-15);
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + std_dev * z
    }
}

/// Localized hot spot: columns 7..=9 of the top five rows ramp up from
/// step 7400 and settle 40 °C higher.
fn heating(row: usize, column: usize, t: usize) -> f64 {
    if row >= 5 || !(7..=9).contains(&column) || t < 7400 {
        return 0.0;
    }
    let strength = 1.0 - row as f64 * 0.15;
    ((t - 7400) as f64 * 0.4).min(40.0) * strength
}

struct Sensor {
    id: u32,
    values: Vec<f64>,
    status: Vec<i64>,
}

fn simulate(grid: &SensorGrid, steps: usize, rng: &mut SimpleRng) -> Result<Vec<Sensor>> {
    let mut sensors = Vec::with_capacity(grid.rows * grid.columns);
    for row in 0..grid.rows {
        for column in 1..=grid.columns {
            let base = 180.0 - row as f64 * 8.0;
            let mut values = Vec::with_capacity(steps);
            let mut status = Vec::with_capacity(steps);
            for t in 0..steps {
                let drift = 3.0 * (t as f64 / 900.0).sin();
                let mut v = base + drift + heating(row, column, t) + rng.gauss(0.0, 0.3);
                let mut s = 1;
                let roll = rng.next_f64();
                if roll < 0.002 {
                    // Fibre break: flagged bad.
                    s = 0;
                } else if roll < 0.003 {
                    // Spike outside the physical range, still flagged good.
                    v = 999.0;
                }
                values.push((v * 100.0).round() / 100.0);
                status.push(s);
            }
            sensors.push(Sensor {
                id: grid.sensor_id(row, column - 1)?,
                values,
                status,
            });
        }
    }
    Ok(sensors)
}

fn write_csv(path: &PathBuf, sensors: &[Sensor], steps: usize) -> Result<()> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(DELIMITER)
        .from_path(path)
        .with_context(|| format!("creating {}", path.display()))?;

    let mut header = vec!["Step".to_string()];
    for s in sensors {
        header.push(column_key(ColumnKind::Value, s.id));
        header.push(column_key(ColumnKind::Status, s.id));
    }
    writer.write_record(&header)?;

    for t in 0..steps {
        let mut record = vec![t.to_string()];
        for s in sensors {
            record.push(s.values[t].to_string());
            record.push(s.status[t].to_string());
        }
        writer.write_record(&record)?;
    }
    writer.flush()?;
    Ok(())
}

fn write_parquet(path: &PathBuf, sensors: &[Sensor]) -> Result<()> {
    let mut fields = Vec::with_capacity(sensors.len() * 2);
    let mut columns: Vec<ArrayRef> = Vec::with_capacity(sensors.len() * 2);
    for s in sensors {
        fields.push(Field::new(column_key(ColumnKind::Value, s.id), DataType::Float64, false));
        fields.push(Field::new(column_key(ColumnKind::Status, s.id), DataType::Int64, false));
        columns.push(Arc::new(Float64Array::from(s.values.clone())));
        columns.push(Arc::new(Int64Array::from(s.status.clone())));
    }
    let schema = Arc::new(Schema::new(fields));
    let batch = RecordBatch::try_new(schema.clone(), columns).context("building record batch")?;

    let file = std::fs::File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let mut writer = ArrowWriter::try_new(file, schema, None)?;
    writer.write(&batch)?;
    writer.close()?;
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    let defaults = RunConfig::default();
    let grid = defaults.grid;
    let mut rng = SimpleRng::new(args.seed);

    let sensors = simulate(&grid, args.steps, &mut rng)?;
    std::fs::create_dir_all(&args.output_dir)?;

    let csv_path = args.output_dir.join(&defaults.file_name);
    write_csv(&csv_path, &sensors, args.steps)?;

    let parquet_path = csv_path.with_extension("parquet");
    write_parquet(&parquet_path, &sensors)?;

    println!(
        "Wrote {} sensors × {} steps to {} and {}",
        sensors.len(),
        args.steps,
        csv_path.display(),
        parquet_path.display()
    );
    Ok(())
}
