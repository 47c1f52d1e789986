//! Numeric core. Pure functions over an already loaded [`SensorTable`];
//! nothing here performs I/O.
//!
//! [`SensorTable`]: crate::data::model::SensorTable

pub mod average;
pub mod derivative;
pub mod deviation;
pub mod screening;
pub mod series;

#[cfg(test)]
pub(crate) mod fixtures {
    use std::collections::BTreeMap;

    use crate::data::model::{SensorSeries, SensorTable};

    /// Table from `(sensor id, values, status)` triples.
    pub fn table(columns: &[(u32, Vec<f64>, Vec<i64>)]) -> SensorTable {
        let sensors: BTreeMap<u32, SensorSeries> = columns
            .iter()
            .map(|(id, v, s)| (*id, SensorSeries::new(v.clone(), s.clone())))
            .collect();
        SensorTable::from_sensors(sensors).unwrap()
    }

    /// `n` steps of a constant, valid reading.
    pub fn constant(id: u32, value: f64, n: usize) -> (u32, Vec<f64>, Vec<i64>) {
        (id, vec![value; n], vec![1; n])
    }
}
