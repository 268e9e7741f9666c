use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use csv::ReaderBuilder;
use tracing::{info, instrument, warn};

use crate::config::LoaderConfig;
use crate::dataset::{Dataset, Label, Record};
use crate::error::CutoffError;

/// Reads a headered CSV into a [`Dataset`].
///
/// The label column is coerced with [`coerce_label`]. Columns listed in
/// `ignored_columns` and columns with an empty header are skipped; every
/// other column must be numeric. Rows holding a missing-value marker in a
/// feature column are dropped.
#[instrument(skip_all, fields(path = %path.display()))]
pub fn load(path: &Path, config: &LoaderConfig) -> Result<Dataset, CutoffError> {
    let file = File::open(path).map_err(|source| CutoffError::FileNotFound {
        path: path.to_path_buf(),
        source,
    })?;
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(BufReader::new(file));

    let csv_error = |source: csv::Error| CutoffError::CsvParse {
        path: path.to_path_buf(),
        offset: source.position().map_or(0, csv::Position::byte),
        source,
    };

    let header = reader.headers().map_err(csv_error)?.clone();
    let label_index = header
        .iter()
        .position(|name| name == config.label_column)
        .ok_or_else(|| CutoffError::MissingColumn {
            path: path.to_path_buf(),
            column: config.label_column.clone(),
        })?;
    let feature_columns: Vec<usize> = header
        .iter()
        .enumerate()
        .filter(|&(index, name)| {
            index != label_index
                && !name.is_empty()
                && !config.ignored_columns.iter().any(|ignored| ignored == name)
        })
        .map(|(index, _)| index)
        .collect();
    let feature_names: Vec<String> = feature_columns
        .iter()
        .map(|&index| header[index].to_string())
        .collect();

    let mut records = Vec::new();
    let mut dropped = 0usize;

    'rows: for (row, result) in reader.records().enumerate() {
        let record = result.map_err(csv_error)?;
        if record.len() != header.len() {
            return Err(CutoffError::InconsistentRowLength {
                path: path.to_path_buf(),
                row,
                expected: header.len(),
                got: record.len(),
            });
        }

        let raw_label = &record[label_index];
        let label = coerce_label(raw_label, config).ok_or_else(|| CutoffError::UnknownLabel {
            path: path.to_path_buf(),
            row,
            raw: raw_label.to_string(),
        })?;

        let mut features = Vec::with_capacity(feature_columns.len());
        for &column in &feature_columns {
            let raw = &record[column];
            if config.missing_markers.iter().any(|marker| marker == raw) {
                dropped += 1;
                continue 'rows;
            }
            let value = raw
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .ok_or_else(|| CutoffError::InvalidValue {
                    path: path.to_path_buf(),
                    row,
                    column: header[column].to_string(),
                    raw: raw.to_string(),
                })?;
            features.push(value);
        }

        records.push(Record::new(features, label));
    }

    if dropped > 0 {
        warn!(dropped, "dropped rows with missing values");
    }
    if records.is_empty() {
        return Err(CutoffError::EmptyDataset);
    }

    let dataset = Dataset::new(feature_names, records)?;
    info!(
        n_records = dataset.len(),
        n_features = dataset.arity(),
        positives = dataset.count(Label::Positive),
        "loaded dataset"
    );
    Ok(dataset)
}

/// Maps a raw label cell to a [`Label`]: the configured values, or `1`/`0`.
pub fn coerce_label(raw: &str, config: &LoaderConfig) -> Option<Label> {
    if raw == config.positive_value || raw == "1" {
        Some(Label::Positive)
    } else if raw == config.negative_value || raw == "0" {
        Some(Label::Negative)
    } else {
        None
    }
}
