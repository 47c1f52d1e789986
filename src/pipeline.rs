//! The fixed run sequence: load once, average once, then screen each grid
//! column and chart the sensors that heat up fast.
//!
//! Chart construction ([`analyse`]) is pure; [`run`] adds the file I/O.

use std::path::PathBuf;

use log::{debug, info, warn};

use crate::analysis::average::{row_averages, AverageMatrix};
use crate::analysis::derivative::derivative;
use crate::analysis::deviation::deviation;
use crate::analysis::screening::{passes, peak};
use crate::analysis::series::extract_raw;
use crate::config::RunConfig;
use crate::data::loader::load_file;
use crate::data::model::{AnalysisWindow, SensorTable};
use crate::error::{AnalysisError, Result};
use crate::plot::{Chart, Plotter};

pub const X_LABEL: &str = "time";
pub const Y_LABEL: &str = "temp, °C";

/// Charts for one grid column with at least one screened sensor.
#[derive(Debug, Clone)]
pub struct ColumnCharts {
    /// 1-based grid column.
    pub column: usize,
    /// Sensors that passed screening, top to bottom.
    pub sensors: Vec<u32>,
    /// Raw, deviation and row-mean series of every passing sensor.
    pub readings: Chart,
    /// Derivative series of every passing sensor.
    pub derivatives: Chart,
}

#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub time_steps: usize,
    pub reported: Vec<(usize, Vec<u32>)>,
    pub files: Vec<PathBuf>,
}

impl RunConfig {
    pub fn window(&self) -> AnalysisWindow {
        AnalysisWindow::new(self.start_index, self.offset)
    }

    fn chart_title(&self) -> String {
        let window = self.window();
        format!("{}_{}-{}", self.file_name, window.start, window.end())
    }

    /// `<stem>_<column>-<rows>.png` and `<stem>_<column>-<rows>_d.png`.
    pub fn chart_paths(&self, column: usize) -> (PathBuf, PathBuf) {
        let base = format!("{}_{}-{}", self.input_stem(), column, self.rows);
        (
            self.output_dir.join(format!("{base}.png")),
            self.output_dir.join(format!("{base}_d.png")),
        )
    }
}

/// Screen the top `config.rows` sensors of one grid column and build its
/// two charts.  `None` when no sensor passes.
pub fn build_column_charts(
    table: &SensorTable,
    config: &RunConfig,
    averages: &AverageMatrix,
    column: usize,
) -> Result<Option<ColumnCharts>> {
    let window = config.window();
    let grid = &config.grid;
    let title = config.chart_title();

    let x: Vec<f64> = window.range().map(|t| t as f64).collect();
    let mut readings = Chart::new(title.as_str(), X_LABEL, Y_LABEL, x);

    let samples = window.offset / config.stride;
    let x_d: Vec<f64> = (0..samples)
        .map(|i| (window.start + i * config.stride) as f64)
        .collect();
    let mut derivatives = Chart::new(title, X_LABEL, Y_LABEL, x_d);

    let mut sensors = Vec::new();
    for (row, id) in grid.column_sensors(column, config.rows)?.into_iter().enumerate() {
        let der = derivative(table, window, id, config.stride)?;
        if !passes(&der, config.threshold) {
            continue;
        }

        let dev = match deviation(table, grid, averages, window, id) {
            Ok(dev) => dev,
            Err(e @ (AnalysisError::Range { .. } | AnalysisError::RowIndex { .. })) => {
                warn!("Skipping sensor {id}: {e}");
                continue;
            }
            Err(e) => return Err(e),
        };
        debug!(
            "Sensor {id} (column {column}, row {row}) passed with peak {:.2}",
            peak(&der).unwrap_or_default()
        );

        readings.push(format!("T#{id}"), extract_raw(table, window, id)?);
        readings.push(format!("dT#{id}"), dev);
        readings.push(format!("Tmean row#{row}"), averages.row(row).to_vec());
        derivatives.push(format!("T`{id}"), der);
        sensors.push(id);
    }

    if sensors.is_empty() {
        return Ok(None);
    }
    Ok(Some(ColumnCharts {
        column,
        sensors,
        readings,
        derivatives,
    }))
}

/// All charts for a loaded table.
pub fn analyse(table: &SensorTable, config: &RunConfig) -> Result<Vec<ColumnCharts>> {
    let window = config.window();
    let averages = row_averages(table, &config.grid, window, config.rows)?;
    info!(
        "Averaged {} rows over steps {}..{}",
        averages.rows(),
        window.start,
        window.end()
    );

    let mut charts = Vec::new();
    for column in config.selected_columns() {
        match build_column_charts(table, config, &averages, column)? {
            Some(c) => {
                info!("Column {column}: sensors {:?} passed screening", c.sensors);
                charts.push(c);
            }
            None => debug!("Column {column}: no sensor above {}", config.threshold),
        }
    }
    Ok(charts)
}

/// Load the configured dataset, analyse it and write the charts.
pub fn run(config: &RunConfig) -> Result<RunSummary> {
    config.validate()?;
    let table = load_file(&config.input_path())?;
    let charts = analyse(&table, config)?;

    if charts.is_empty() {
        warn!("No sensor exceeded the screening threshold {}", config.threshold);
        return Ok(RunSummary {
            time_steps: table.len(),
            ..RunSummary::default()
        });
    }

    std::fs::create_dir_all(&config.output_dir)?;
    let plotter = Plotter::new(config.image);
    let mut summary = RunSummary {
        time_steps: table.len(),
        ..RunSummary::default()
    };
    for c in charts {
        let (readings_path, derivatives_path) = config.chart_paths(c.column);
        plotter.render(&readings_path, &c.readings)?;
        plotter.render(&derivatives_path, &c.derivatives)?;
        info!("Column {}: wrote {}", c.column, readings_path.display());
        summary.files.push(readings_path);
        summary.files.push(derivatives_path);
        summary.reported.push((c.column, c.sensors));
    }
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::fixtures::{constant, table};
    use crate::config::{ImageConfig, SensorGrid};

    /// 2×3 grid, 20 steps; sensor 2 ramps by 1 °C per step, the rest are flat.
    fn ramp_table() -> SensorTable {
        let ramp: Vec<f64> = (0..20).map(|t| 100.0 + t as f64).collect();
        table(&[
            constant(1, 100.0, 20),
            (2, ramp, vec![1; 20]),
            constant(3, 100.0, 20),
            constant(4, 100.0, 20),
            constant(5, 100.0, 20),
            constant(6, 100.0, 20),
        ])
    }

    fn config() -> RunConfig {
        RunConfig {
            grid: SensorGrid::new(2, 3),
            file_name: "furnace.csv".to_string(),
            start_index: 0,
            offset: 20,
            rows: 2,
            stride: 5,
            ..RunConfig::default()
        }
    }

    #[test]
    fn only_fast_heating_column_is_reported() {
        let charts = analyse(&ramp_table(), &config()).unwrap();
        assert_eq!(charts.len(), 1);
        let c = &charts[0];
        assert_eq!(c.column, 2);
        assert_eq!(c.sensors, vec![2]);
        assert_eq!(c.readings.labels, vec!["T#2", "dT#2", "Tmean row#0"]);
        assert_eq!(c.derivatives.labels, vec!["T`2"]);
        assert_eq!(c.derivatives.series[0], vec![0.0, 5.0, 5.0, 5.0]);
        assert_eq!(c.derivatives.x, vec![0.0, 5.0, 10.0, 15.0]);
        assert_eq!(c.readings.x.len(), 20);
        assert_eq!(c.readings.title, "furnace.csv_0-20");
        assert!(c.readings.validate().is_ok());
        assert!(c.derivatives.validate().is_ok());
    }

    #[test]
    fn threshold_is_strict_in_run() {
        // Peak derivative is exactly 5.0.
        let cfg = RunConfig { threshold: 5.0, ..config() };
        assert!(analyse(&ramp_table(), &cfg).unwrap().is_empty());
    }

    #[test]
    fn selected_columns_limit_the_report() {
        let cfg = RunConfig { columns: Some(vec![1, 3]), ..config() };
        assert!(analyse(&ramp_table(), &cfg).unwrap().is_empty());
    }

    #[test]
    fn sensor_beyond_average_rows_is_skipped() {
        // Sensor 3 maps to row 3/3 = 1, one past a single-row matrix.
        let ramp: Vec<f64> = (0..20).map(|t| 100.0 + t as f64).collect();
        let t = table(&[
            constant(1, 100.0, 20),
            constant(2, 100.0, 20),
            (3, ramp, vec![1; 20]),
        ]);
        let cfg = RunConfig {
            grid: SensorGrid::new(1, 3),
            rows: 1,
            ..config()
        };
        assert!(analyse(&t, &cfg).unwrap().is_empty());
    }

    #[test]
    fn window_past_end_fails() {
        let cfg = RunConfig { start_index: 5, ..config() };
        assert!(matches!(
            analyse(&ramp_table(), &cfg),
            Err(AnalysisError::Index { .. })
        ));
    }

    #[test]
    fn output_names() {
        let cfg = RunConfig {
            output_dir: PathBuf::from("out"),
            ..config()
        };
        let (a, b) = cfg.chart_paths(7);
        assert_eq!(a, PathBuf::from("out").join("furnace_7-2.png"));
        assert_eq!(b, PathBuf::from("out").join("furnace_7-2_d.png"));
    }

    #[test]
    fn missing_input_is_load_error() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = RunConfig {
            dataset_dir: dir.path().to_path_buf(),
            output_dir: dir.path().join("out"),
            ..config()
        };
        assert!(matches!(run(&cfg), Err(AnalysisError::Load { .. })));
    }

    fn write_csv(path: &std::path::Path, table: &SensorTable) {
        use crate::data::model::{column_key, ColumnKind};
        let ids: Vec<u32> = table.sensor_ids().collect();
        let header: Vec<String> = ids
            .iter()
            .flat_map(|&id| [column_key(ColumnKind::Value, id), column_key(ColumnKind::Status, id)])
            .collect();
        let mut csv = header.join(";") + "\n";
        for t in 0..table.len() {
            let row: Vec<String> = ids
                .iter()
                .flat_map(|&id| {
                    let s = table.sensor(id).unwrap();
                    [s.values[t].to_string(), s.status[t].to_string()]
                })
                .collect();
            csv.push_str(&row.join(";"));
            csv.push('\n');
        }
        std::fs::write(path, csv).unwrap();
    }

    #[test]
    fn run_writes_both_charts() {
        let dir = tempfile::tempdir().unwrap();
        write_csv(&dir.path().join("furnace.csv"), &ramp_table());
        let out = dir.path().join("out");
        let cfg = RunConfig {
            dataset_dir: dir.path().to_path_buf(),
            output_dir: out.clone(),
            image: ImageConfig {
                width: 320,
                height: 240,
                font_size: 8,
            },
            ..config()
        };

        let summary = run(&cfg).unwrap();
        assert_eq!(summary.time_steps, 20);
        assert_eq!(summary.reported, vec![(2, vec![2])]);
        assert_eq!(
            summary.files,
            vec![out.join("furnace_2-2.png"), out.join("furnace_2-2_d.png")]
        );
        for file in &summary.files {
            let img = image::open(file).unwrap();
            assert_eq!((img.width(), img.height()), (320, 240));
        }
    }

    #[test]
    fn quiet_dataset_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let mut csv = String::from("ValueFO001;StatusFO001;ValueFO002;StatusFO002;ValueFO003;StatusFO003;ValueFO004;StatusFO004;ValueFO005;StatusFO005;ValueFO006;StatusFO006\n");
        for _ in 0..20 {
            csv.push_str("100;1;100;1;100;1;100;1;100;1;100;1\n");
        }
        std::fs::write(dir.path().join("furnace.csv"), csv).unwrap();

        let cfg = RunConfig {
            dataset_dir: dir.path().to_path_buf(),
            output_dir: dir.path().join("out"),
            ..config()
        };
        let summary = run(&cfg).unwrap();
        assert_eq!(summary.time_steps, 20);
        assert!(summary.files.is_empty());
        assert!(!dir.path().join("out").exists());
    }
}
