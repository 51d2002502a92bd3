//! Dataset packer
//!
//! Walks a directory of word images in sorted file-name order, pairs each
//! with its same-stem label file, normalizes it and appends it to the blob
//! and index. A bad pair is skipped with a warning; it never consumes an
//! index or shifts the offsets of the records around it.

use anyhow::{Context, Result};
use rayon::prelude::*;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, warn};

use super::DatasetRecord;
use crate::config::{has_extension, DatasetConfig, NormalizeConfig};
use crate::error::RecordSkip;
use crate::vision::normalize;

/// Images normalized per parallel batch before the writer drains them
const BATCH_SIZE: usize = 256;

/// Totals of one packing run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PackSummary {
    /// Records written; equals the number of index lines
    pub records: usize,
    /// Blob size in bytes
    pub bytes: u64,
    /// Image files left out
    pub skipped: usize,
}

/// A sample ready to be written
#[derive(Debug)]
struct PreparedSample {
    height: usize,
    width: usize,
    bytes: Vec<u8>,
    word: String,
}

/// Trim a label and check its length in characters
pub fn validate_label(raw: &str, max_len: usize) -> Result<String, RecordSkip> {
    let word = raw.trim();
    if word.is_empty() {
        return Err(RecordSkip::EmptyLabel);
    }
    // one index line per record
    if word.contains(['\n', '\r']) {
        return Err(RecordSkip::MultiLineLabel);
    }
    let len = word.chars().count();
    if len > max_len {
        return Err(RecordSkip::LabelTooLong { len, max: max_len });
    }
    Ok(word.to_string())
}

/// Packs labeled word images into a blob and index file
pub struct DatasetPacker {
    normalize: NormalizeConfig,
    dataset: DatasetConfig,
}

impl DatasetPacker {
    pub fn new(normalize: NormalizeConfig, dataset: DatasetConfig) -> Self {
        Self { normalize, dataset }
    }

    /// Image files of `dir`, sorted by file name
    pub fn list_images(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        let mut images = Vec::new();
        for entry in std::fs::read_dir(dir)
            .with_context(|| format!("Failed to read images directory {:?}", dir))?
        {
            let path = entry?.path();
            if path.is_file() && has_extension(&path, &self.dataset.image_extensions) {
                images.push(path);
            }
        }
        images.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
        Ok(images)
    }

    /// Pack `images_dir` with labels from `labels_dir`, truncating both outputs
    pub fn pack(
        &self,
        images_dir: &Path,
        labels_dir: &Path,
        bin_out: &Path,
        txt_out: &Path,
    ) -> Result<PackSummary> {
        self.normalize.validate()?;

        let start = Instant::now();
        let images = self.list_images(images_dir)?;
        info!("Packing {} images from {:?}", images.len(), images_dir);

        let mut bin = BufWriter::new(create_output(bin_out)?);
        let mut txt = BufWriter::new(create_output(txt_out)?);

        let mut index = 0u64;
        let mut byte_offset = 0u64;
        let mut skipped = 0usize;

        for batch in images.chunks(BATCH_SIZE) {
            let prepared: Vec<Result<PreparedSample, RecordSkip>> = if self.dataset.parallel {
                batch.par_iter().map(|p| self.prepare(p, labels_dir)).collect()
            } else {
                batch.iter().map(|p| self.prepare(p, labels_dir)).collect()
            };

            for (path, result) in batch.iter().zip(prepared) {
                let sample = match result {
                    Ok(sample) => sample,
                    Err(reason) => {
                        warn!("Skipping {}: {}", display_name(path), reason);
                        skipped += 1;
                        continue;
                    }
                };

                let record = DatasetRecord {
                    index,
                    start_position: byte_offset,
                    height: sample.height,
                    width: sample.width,
                    font: self.dataset.font.clone(),
                    word: sample.word,
                };

                bin.write_all(&sample.bytes)
                    .with_context(|| format!("Failed to write {:?}", bin_out))?;
                writeln!(txt, "{}", record)
                    .with_context(|| format!("Failed to write {:?}", txt_out))?;

                debug!("Packed {} as record {}", display_name(path), index);
                index += 1;
                byte_offset += sample.bytes.len() as u64;
            }
        }

        bin.flush()?;
        txt.flush()?;

        let summary = PackSummary {
            records: index as usize,
            bytes: byte_offset,
            skipped,
        };
        info!(
            "Wrote {} images to {:?} and labels to {:?} ({} skipped, {:?})",
            summary.records,
            bin_out,
            txt_out,
            summary.skipped,
            start.elapsed()
        );
        Ok(summary)
    }

    /// Load, normalize and validate one image/label pair
    fn prepare(&self, image_path: &Path, labels_dir: &Path) -> Result<PreparedSample, RecordSkip> {
        let label_path = self.label_path(image_path, labels_dir);
        if !label_path.is_file() {
            return Err(RecordSkip::MissingLabel(label_path));
        }

        let gray = image::open(image_path)?.to_luma8();

        let target_width = self.normalize.target_width;
        let target_height = self.normalize.target_height;
        let sample = normalize(&gray, target_width, target_height, false);

        let expected = (target_height as usize, target_width as usize);
        if sample.shape() != expected {
            return Err(RecordSkip::ShapeMismatch {
                expected,
                actual: sample.shape(),
            });
        }

        let raw = std::fs::read_to_string(&label_path)?;
        let word = validate_label(&raw, self.dataset.max_text_length)?;

        Ok(PreparedSample {
            height: sample.height(),
            width: sample.width(),
            bytes: sample.to_bytes(self.normalize.rescale_to_u8),
            word,
        })
    }

    fn label_path(&self, image_path: &Path, labels_dir: &Path) -> PathBuf {
        let stem = image_path.file_stem().unwrap_or_default();
        let mut name = stem.to_os_string();
        name.push(".");
        name.push(&self.dataset.label_extension);
        labels_dir.join(name)
    }
}

fn create_output(path: &Path) -> Result<File> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {:?}", parent))?;
    }
    File::create(path).with_context(|| format!("Failed to create {:?}", path))
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
