use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::key::{KeyQuantizer, ObjectKey};
use crate::world::Vec2;

use super::state::TrackedState;

pub(crate) const FORMAT_TAG: &str = "grass_states";
pub(crate) const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum BlobError {
    #[error("state blob is not valid json: {message}")]
    Malformed { message: String },
    #[error("state blob has unexpected format tag '{found}'")]
    UnexpectedFormat { found: String },
    #[error("state blob declares invalid units_per_world {value}")]
    InvalidPrecision { value: f32 },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecordError {
    #[error("record {index} is malformed: {message}")]
    Malformed { index: usize, message: String },
    #[error("record {index} has an empty region id")]
    EmptyRegion { index: usize },
    #[error("record {index} stores no progress")]
    NotRecorded { index: usize },
    #[error("record {index} position cannot be re-quantized")]
    OutOfRange { index: usize },
}

#[derive(Debug, Serialize)]
struct EncodedBlob<'a> {
    format: &'static str,
    version: u32,
    units_per_world: f32,
    records: Vec<StateRecord<'a>>,
}

#[derive(Debug, Serialize)]
struct StateRecord<'a> {
    region: &'a str,
    x: i32,
    y: i32,
    index: u32,
    state: TrackedState,
}

#[derive(Debug, Deserialize)]
struct DecodedRecord {
    region: String,
    x: i32,
    y: i32,
    index: u32,
    state: TrackedState,
}

/// Fields missing from older blobs fall back to defaults; unknown fields are
/// ignored so newer writers stay readable.
#[derive(Debug, Deserialize)]
struct BlobHeader {
    #[serde(default)]
    format: Option<String>,
    #[serde(default)]
    version: Option<u32>,
    #[serde(default)]
    units_per_world: Option<f32>,
    #[serde(default)]
    records: Vec<Value>,
}

#[derive(Debug, Default)]
pub(crate) struct DecodedBlob {
    pub version: u32,
    pub records: Vec<(ObjectKey, TrackedState)>,
    pub skipped: Vec<RecordError>,
}

pub(crate) fn encode<'a>(
    quantizer: &KeyQuantizer,
    entries: impl Iterator<Item = (&'a ObjectKey, TrackedState)>,
) -> Result<String, serde_json::Error> {
    let mut records = entries
        .map(|(key, state)| StateRecord {
            region: &key.region,
            x: key.x,
            y: key.y,
            index: key.index,
            state,
        })
        .collect::<Vec<_>>();
    records.sort_by(|a, b| {
        (a.region, a.x, a.y, a.index).cmp(&(b.region, b.x, b.y, b.index))
    });
    serde_json::to_string(&EncodedBlob {
        format: FORMAT_TAG,
        version: FORMAT_VERSION,
        units_per_world: quantizer.units_per_world(),
        records,
    })
}

pub(crate) fn decode(raw: &str, quantizer: &KeyQuantizer) -> Result<DecodedBlob, BlobError> {
    if raw.trim().is_empty() {
        return Ok(DecodedBlob::default());
    }
    let header = serde_json::from_str::<BlobHeader>(raw).map_err(|error| BlobError::Malformed {
        message: error.to_string(),
    })?;
    if let Some(found) = header.format {
        if found != FORMAT_TAG {
            return Err(BlobError::UnexpectedFormat { found });
        }
    }

    let source = match header.units_per_world {
        Some(value) => {
            KeyQuantizer::new(value).map_err(|_| BlobError::InvalidPrecision { value })?
        }
        None => *quantizer,
    };
    let requantize = source != *quantizer;

    let mut decoded = DecodedBlob {
        version: header.version.unwrap_or(FORMAT_VERSION),
        ..DecodedBlob::default()
    };
    for (index, value) in header.records.into_iter().enumerate() {
        match decode_record(index, value, &source, quantizer, requantize) {
            Ok(entry) => decoded.records.push(entry),
            Err(error) => decoded.skipped.push(error),
        }
    }
    Ok(decoded)
}

fn decode_record(
    index: usize,
    value: Value,
    source: &KeyQuantizer,
    target: &KeyQuantizer,
    requantize: bool,
) -> Result<(ObjectKey, TrackedState), RecordError> {
    let record =
        serde_json::from_value::<DecodedRecord>(value).map_err(|error| RecordError::Malformed {
            index,
            message: error.to_string(),
        })?;
    if record.region.trim().is_empty() {
        return Err(RecordError::EmptyRegion { index });
    }
    if !record.state.is_recorded() {
        return Err(RecordError::NotRecorded { index });
    }

    let (x, y) = if requantize {
        let world: Vec2 = source.cell_center(record.x, record.y);
        target
            .quantize(world)
            .ok_or(RecordError::OutOfRange { index })?
    } else {
        (record.x, record.y)
    };
    Ok((ObjectKey::new(record.region, x, y, record.index), record.state))
}
