use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use arrow::array::{
    Array, AsArray, BooleanArray, Float32Array, Float64Array, Int32Array, Int64Array,
    StringArray,
};
use arrow::datatypes::{DataType, Float32Type, Float64Type};
use log::debug;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use super::corpus::Corpus;
use super::model::{Meta, MetaValue};
use super::sample::SampleBase;
use crate::audio::{AudioData, AudioSample};

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// Column layout of a sample table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoadOptions {
    /// Column holding the numeric payload.
    pub data_column: String,
    /// Column holding the sample rate (audio only).
    pub rate_column: String,
    /// Column holding the channel count of interleaved audio payloads.
    pub channels_column: String,
    /// Rate used for rows without a rate column.
    pub default_rate: Option<u32>,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            data_column: "data".into(),
            rate_column: "fs".into(),
            channels_column: "channels".into(),
            default_rate: None,
        }
    }
}

impl LoadOptions {
    /// Read options from a JSON file; missing keys keep their defaults.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading load options {}", path.display()))?;
        serde_json::from_str(&text).context("parsing load options")
    }
}

/// One parsed table row: payload plus every other column as metadata.
#[derive(Debug, Clone, PartialEq)]
struct Record {
    data: Vec<f64>,
    /// Set when the payload was given as nested frames.
    frame_width: Option<usize>,
    meta: Meta,
}

// ---------------------------------------------------------------------------
// Public entry-points
// ---------------------------------------------------------------------------

/// Load a corpus of plain numeric samples from a file.  Dispatch by extension.
///
/// Supported formats:
/// * `.parquet` – data column of type `List<Float64>` / `LargeList`
/// * `.json`    – `[{ "data": [...], ...meta }, ...]`
/// * `.csv`     – data column containing semicolon-separated floats
///
/// Every other column becomes metadata.
pub fn load_corpus(path: &Path, options: &LoadOptions) -> Result<Corpus<SampleBase<Vec<f64>>>> {
    let records = load_records(path, options)?;
    let corpus: Corpus<_> = records
        .into_iter()
        .map(|r| SampleBase::new(r.data, r.meta))
        .collect();
    debug!("loaded {} samples from {}", corpus.len(), path.display());
    Ok(corpus)
}

/// Load a corpus of audio samples.
///
/// The rate and channel columns are consumed (not kept as metadata). Rows
/// without a rate fall back to [`LoadOptions::default_rate`].
pub fn load_audio_corpus(path: &Path, options: &LoadOptions) -> Result<Corpus<AudioSample>> {
    let records = load_records(path, options)?;
    let mut corpus = Corpus::new();
    for (i, record) in records.into_iter().enumerate() {
        let sample = audio_sample(record, options).with_context(|| format!("Row {i}"))?;
        corpus.add_sample(sample);
    }
    debug!("loaded {} audio samples from {}", corpus.len(), path.display());
    Ok(corpus)
}

fn load_records(path: &Path, options: &LoadOptions) -> Result<Vec<Record>> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    match ext.as_str() {
        "parquet" | "pq" => load_parquet(path, options),
        "json" => load_json(path, options),
        "csv" => load_csv(path, options),
        other => bail!("Unsupported file extension: .{other}"),
    }
}

fn audio_sample(mut record: Record, options: &LoadOptions) -> Result<AudioSample> {
    let rate = match record.meta.take(&options.rate_column) {
        Some(MetaValue::Integer(r)) => {
            u32::try_from(r).with_context(|| format!("sample rate {r} out of range"))?
        }
        Some(MetaValue::Null) | None => options
            .default_rate
            .with_context(|| format!("missing '{}' column and no default rate", options.rate_column))?,
        Some(other) => bail!("'{}' is not an integer rate: {other}", options.rate_column),
    };

    let channels = match record.meta.take(&options.channels_column) {
        Some(MetaValue::Integer(c)) if c > 0 => Some(c as usize),
        Some(MetaValue::Null) | None => None,
        Some(other) => bail!("'{}' is not a positive integer: {other}", options.channels_column),
    };

    if let (Some(column), Some(width)) = (channels, record.frame_width) {
        if column != width {
            bail!(
                "'{}' says {column} channels but the frames have {width}",
                options.channels_column
            );
        }
    }

    let data = match channels.or(record.frame_width) {
        Some(n) => AudioData::interleaved(record.data, n)?,
        None => AudioData::mono(record.data),
    };
    Ok(AudioSample::new(data, rate, record.meta))
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Expected JSON schema (records-oriented):
///
/// ```json
/// [
///   {
///     "data": [0.01, 0.02, ...],
///     "fs": 16000,
///     "speaker": "alice",
///     "age": 37
///   },
///   ...
/// ]
/// ```
///
/// `data` may also be a list of frames (`[[l, r], [l, r], ...]`).
fn load_json(path: &Path, options: &LoadOptions) -> Result<Vec<Record>> {
    let text = std::fs::read_to_string(path).context("reading JSON file")?;
    let root: JsonValue = serde_json::from_str(&text).context("parsing JSON")?;

    let rows = root.as_array().context("Expected top-level JSON array")?;

    let mut records = Vec::with_capacity(rows.len());

    for (i, row) in rows.iter().enumerate() {
        let obj = row
            .as_object()
            .with_context(|| format!("Row {i} is not a JSON object"))?;

        let (data, frame_width) = json_payload(obj.get(&options.data_column), i, &options.data_column)?;

        let mut meta = Meta::new();
        for (key, val) in obj {
            if *key == options.data_column {
                continue;
            }
            meta.insert(key.clone(), json_to_meta(val));
        }

        records.push(Record {
            data,
            frame_width,
            meta,
        });
    }

    Ok(records)
}

fn json_payload(
    val: Option<&JsonValue>,
    row: usize,
    col: &str,
) -> Result<(Vec<f64>, Option<usize>)> {
    let arr = val
        .and_then(|v| v.as_array())
        .with_context(|| format!("Row {row}: missing or invalid '{col}' array"))?;

    if arr.first().is_some_and(JsonValue::is_array) {
        let mut width = None;
        let mut data = Vec::new();
        for (j, frame) in arr.iter().enumerate() {
            let frame = json_array_to_f64(Some(frame), row, &format!("{col}[{j}]"))?;
            if *width.get_or_insert(frame.len()) != frame.len() {
                bail!("Row {row}, {col}[{j}]: frame width differs from the first frame");
            }
            data.extend(frame);
        }
        return Ok((data, width));
    }

    Ok((json_array_to_f64(val, row, col)?, None))
}

fn json_array_to_f64(val: Option<&JsonValue>, row: usize, col: &str) -> Result<Vec<f64>> {
    let arr = val
        .and_then(|v| v.as_array())
        .with_context(|| format!("Row {row}: missing or invalid '{col}' array"))?;

    arr.iter()
        .enumerate()
        .map(|(j, v)| {
            v.as_f64()
                .with_context(|| format!("Row {row}, {col}[{j}]: not a number"))
        })
        .collect()
}

fn json_to_meta(val: &JsonValue) -> MetaValue {
    match val {
        JsonValue::String(s) => MetaValue::String(s.clone()),
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                MetaValue::Integer(i)
            } else if let Some(f) = n.as_f64() {
                MetaValue::Float(f)
            } else {
                MetaValue::String(n.to_string())
            }
        }
        JsonValue::Bool(b) => MetaValue::Bool(*b),
        JsonValue::Null => MetaValue::Null,
        other => MetaValue::String(other.to_string()),
    }
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

/// CSV layout: header row with column names.
/// The data column contains semicolon-separated floats: `"0.12;0.14;0.11"`.
/// All other columns are metadata, typed by [`MetaValue::parse_guess`].
fn load_csv(path: &Path, options: &LoadOptions) -> Result<Vec<Record>> {
    let mut reader = csv::Reader::from_path(path).context("opening CSV")?;
    let headers: Vec<String> = reader
        .headers()
        .context("reading CSV headers")?
        .iter()
        .map(|h| h.to_string())
        .collect();

    let data_idx = headers
        .iter()
        .position(|h| *h == options.data_column)
        .with_context(|| format!("CSV missing '{}' column", options.data_column))?;

    let mut records = Vec::new();

    for (row_no, result) in reader.records().enumerate() {
        let row = result.with_context(|| format!("CSV row {row_no}"))?;

        let data = parse_semicolon_floats(
            row.get(data_idx).unwrap_or(""),
            row_no,
            &options.data_column,
        )?;

        let mut meta = Meta::new();
        for (col_idx, value) in row.iter().enumerate() {
            if col_idx == data_idx {
                continue;
            }
            if let Some(col_name) = headers.get(col_idx) {
                meta.insert(col_name.clone(), MetaValue::parse_guess(value));
            }
        }

        records.push(Record {
            data,
            frame_width: None,
            meta,
        });
    }

    Ok(records)
}

fn parse_semicolon_floats(s: &str, row: usize, col: &str) -> Result<Vec<f64>> {
    if s.trim().is_empty() {
        return Ok(Vec::new());
    }
    s.split(';')
        .enumerate()
        .map(|(j, tok)| {
            tok.trim()
                .parse::<f64>()
                .with_context(|| format!("Row {row}, {col}[{j}]: '{tok}' is not a number"))
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load a Parquet file of samples.
///
/// Expected schema:
/// - data column: List<Float64> or LargeList<Float64> (Float32 accepted)
/// - Any other columns are metadata (strings, ints, floats, bools)
fn load_parquet(path: &Path, options: &LoadOptions) -> Result<Vec<Record>> {
    let file = std::fs::File::open(path).context("opening parquet file")?;
    let builder =
        ParquetRecordBatchReaderBuilder::try_new(file).context("reading parquet metadata")?;
    let reader = builder.build().context("building parquet reader")?;

    let mut records = Vec::new();

    for batch_result in reader {
        let batch = batch_result.context("reading parquet record batch")?;
        let schema = batch.schema();
        let n_rows = batch.num_rows();

        let data_idx = schema.index_of(&options.data_column).map_err(|_| {
            anyhow::anyhow!("Parquet file missing '{}' column", options.data_column)
        })?;
        let data_col = batch.column(data_idx);

        let meta_cols: Vec<(usize, String)> = schema
            .fields()
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != data_idx)
            .map(|(i, f)| (i, f.name().clone()))
            .collect();

        for row in 0..n_rows {
            let data = extract_f64_list(data_col, row).with_context(|| {
                format!("Row {row}: failed to read '{}'", options.data_column)
            })?;

            let mut meta = Meta::new();
            for (col_idx, col_name) in &meta_cols {
                let value = extract_meta_value(batch.column(*col_idx), row)
                    .with_context(|| format!("Row {row}: failed to read '{col_name}'"))?;
                meta.insert(col_name.clone(), value);
            }

            records.push(Record {
                data,
                frame_width: None,
                meta,
            });
        }
    }

    Ok(records)
}

// -- Parquet / Arrow helpers --

/// Payload values of one row of a `List` / `LargeList` column of floats.
fn extract_f64_list(col: &Arc<dyn Array>, row: usize) -> Result<Vec<f64>> {
    if col.is_null(row) {
        bail!("null value in list column");
    }

    let values = if let Some(list) = col.as_list_opt::<i32>() {
        list.value(row)
    } else if let Some(list) = col.as_list_opt::<i64>() {
        list.value(row)
    } else {
        bail!("Expected List or LargeList column, got {:?}", col.data_type());
    };

    if let Some(arr) = values.as_primitive_opt::<Float64Type>() {
        Ok(arr.iter().map(|v| v.unwrap_or(f64::NAN)).collect())
    } else if let Some(arr) = values.as_primitive_opt::<Float32Type>() {
        Ok(arr.iter().map(|v| v.map_or(f64::NAN, f64::from)).collect())
    } else {
        bail!(
            "List inner type is {:?}, expected Float64 or Float32",
            values.data_type()
        )
    }
}

/// Extract a single metadata value from an Arrow column at a given row.
fn extract_meta_value(col: &Arc<dyn Array>, row: usize) -> Result<MetaValue> {
    if col.is_null(row) {
        return Ok(MetaValue::Null);
    }
    let value = match col.data_type() {
        DataType::Utf8 => {
            let arr = col
                .as_any()
                .downcast_ref::<StringArray>()
                .context("expected StringArray")?;
            MetaValue::String(arr.value(row).to_string())
        }
        DataType::LargeUtf8 => MetaValue::String(col.as_string::<i64>().value(row).to_string()),
        DataType::Int32 => {
            let arr = col
                .as_any()
                .downcast_ref::<Int32Array>()
                .context("expected Int32Array")?;
            MetaValue::Integer(i64::from(arr.value(row)))
        }
        DataType::Int64 => {
            let arr = col
                .as_any()
                .downcast_ref::<Int64Array>()
                .context("expected Int64Array")?;
            MetaValue::Integer(arr.value(row))
        }
        DataType::Float32 => {
            let arr = col
                .as_any()
                .downcast_ref::<Float32Array>()
                .context("expected Float32Array")?;
            MetaValue::Float(f64::from(arr.value(row)))
        }
        DataType::Float64 => {
            let arr = col
                .as_any()
                .downcast_ref::<Float64Array>()
                .context("expected Float64Array")?;
            MetaValue::Float(arr.value(row))
        }
        DataType::Boolean => {
            let arr = col
                .as_any()
                .downcast_ref::<BooleanArray>()
                .context("expected BooleanArray")?;
            MetaValue::Bool(arr.value(row))
        }
        other => MetaValue::String(format!("{other:?}")),
    };
    Ok(value)
}
