//! Packed Dataset Layer
//!
//! A dataset is a raw blob of concatenated `height * width` byte samples
//! plus a text index with one `key:value;...` line per sample, in blob order.

pub mod packer;

pub use packer::DatasetPacker;

use anyhow::{bail, Context, Result};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::config::FontPlaceholder;
use crate::error::IndexParseError;

/// Index line keys, in on-disk order
const KEYS: [&str; 9] = [
    "image idx",
    "start position",
    "image height",
    "image width",
    "font name",
    "font size",
    "bold",
    "italic",
    "word",
];

/// Metadata of one packed sample
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetRecord {
    /// 0-based position in the dataset
    pub index: u64,
    /// Byte offset of the sample in the blob
    pub start_position: u64,
    pub height: usize,
    pub width: usize,
    pub font: FontPlaceholder,
    /// Trimmed label text
    pub word: String,
}

impl DatasetRecord {
    /// Bytes this record occupies in the blob
    pub fn byte_len(&self) -> u64 {
        (self.height * self.width) as u64
    }
}

impl fmt::Display for DatasetRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "image idx:{};start position:{};image height:{};image width:{};\
             font name:{};font size:{};bold:{};italic:{};word:{}",
            self.index,
            self.start_position,
            self.height,
            self.width,
            self.font.name,
            self.font.size,
            self.font.bold,
            self.font.italic,
            self.word
        )
    }
}

fn parse_num<T: FromStr>(field: &'static str, value: &str) -> Result<T, IndexParseError> {
    value.parse().map_err(|_| IndexParseError::InvalidValue {
        field,
        value: value.to_string(),
    })
}

impl FromStr for DatasetRecord {
    type Err = IndexParseError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        // the word is last and may itself contain ';' or ':'
        let mut parts = line.splitn(KEYS.len(), ';');
        let mut values = [""; 9];
        for (slot, key) in values.iter_mut().zip(KEYS) {
            let part = parts.next().ok_or(IndexParseError::MissingField(key))?;
            let (k, v) = part.split_once(':').ok_or(IndexParseError::MissingField(key))?;
            if k != key {
                return Err(IndexParseError::MissingField(key));
            }
            *slot = v;
        }

        Ok(Self {
            index: parse_num(KEYS[0], values[0])?,
            start_position: parse_num(KEYS[1], values[1])?,
            height: parse_num(KEYS[2], values[2])?,
            width: parse_num(KEYS[3], values[3])?,
            font: FontPlaceholder {
                name: values[4].to_string(),
                size: parse_num(KEYS[5], values[5])?,
                bold: parse_num(KEYS[6], values[6])?,
                italic: parse_num(KEYS[7], values[7])?,
            },
            word: values[8].to_string(),
        })
    }
}

/// Read every record of an index file
pub fn read_index(path: &Path) -> Result<Vec<DatasetRecord>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read index {:?}", path))?;

    content
        .lines()
        .enumerate()
        .map(|(n, line)| {
            line.parse::<DatasetRecord>()
                .with_context(|| format!("{:?} line {}", path, n + 1))
        })
        .collect()
}

/// Outcome of a successful [`verify`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VerifyReport {
    pub records: usize,
    pub bytes: u64,
}

/// Check that an index describes its blob exactly.
///
/// Indices must run 0.. without gaps, each start position must equal the
/// bytes of all earlier records, and the blob must end after the last one.
pub fn verify(bin_path: &Path, index_path: &Path) -> Result<VerifyReport> {
    let records = read_index(index_path)?;
    let blob_len = std::fs::metadata(bin_path)
        .with_context(|| format!("Failed to stat blob {:?}", bin_path))?
        .len();

    let mut offset = 0u64;
    for (i, record) in records.iter().enumerate() {
        if record.index != i as u64 {
            bail!("record {} has image idx {}", i, record.index);
        }
        if record.start_position != offset {
            bail!(
                "record {} starts at {}, expected {}",
                i,
                record.start_position,
                offset
            );
        }
        if record.word.is_empty() {
            bail!("record {} has an empty word", i);
        }
        offset += record.byte_len();
    }

    if offset != blob_len {
        bail!("index covers {} bytes but blob has {}", offset, blob_len);
    }

    Ok(VerifyReport {
        records: records.len(),
        bytes: offset,
    })
}
