//! Normalized dataset dumps (JSON).
//!
//! JSON has no NaN, so known-missing values are written as `null` and read
//! back as NaN. Year keys become strings, as JSON object keys must.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::domain::{NormalizedDataset, SourceId};
use crate::error::AppError;

#[derive(Debug, Serialize, Deserialize)]
struct DatasetFile {
    ticker: String,
    source: SourceId,
    #[serde(default)]
    report_month: Option<u32>,
    fields: BTreeMap<String, BTreeMap<i32, Option<f64>>>,
}

pub fn write_dataset_json(
    path: &Path,
    ticker: &str,
    source: SourceId,
    dataset: &NormalizedDataset,
) -> Result<(), AppError> {
    let file_repr = DatasetFile {
        ticker: ticker.to_string(),
        source,
        report_month: dataset.report_month(),
        fields: dataset
            .fields()
            .map(|(name, series)| {
                let values = series.iter().map(|(y, v)| (*y, v.is_finite().then_some(*v))).collect();
                (name.to_string(), values)
            })
            .collect(),
    };

    let file = File::create(path)
        .map_err(|e| AppError::config(format!("Failed to create dataset JSON '{}': {e}", path.display())))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, &file_repr)
        .map_err(|e| AppError::config(format!("Failed to write dataset JSON: {e}")))?;
    writer
        .flush()
        .map_err(|e| AppError::config(format!("Failed to write dataset JSON: {e}")))?;
    Ok(())
}

pub fn read_dataset_json(path: &Path) -> Result<NormalizedDataset, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::config(format!("Failed to open dataset JSON '{}': {e}", path.display())))?;
    let file_repr: DatasetFile = serde_json::from_reader(BufReader::new(file))
        .map_err(|e| AppError::config(format!("Invalid dataset JSON '{}': {e}", path.display())))?;

    let mut dataset = NormalizedDataset::new();
    for (name, values) in file_repr.fields {
        let series = values.into_iter().map(|(y, v)| (y, v.unwrap_or(f64::NAN))).collect();
        dataset.insert_series(name, series);
    }
    if let Some(month) = file_repr.report_month {
        dataset.set_report_month(month);
    }
    Ok(dataset)
}
