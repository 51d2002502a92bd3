//! Word crop file naming
//!
//! Crops are stored as `word_<index>.<ext>` with the index zero-padded to
//! four digits. Numbering continues from the highest index already present.

use std::io;
use std::path::{Path, PathBuf};

const CROP_PREFIX: &str = "word_";

/// Extensions that count as existing crops when scanning a directory
const CROP_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

/// File name for the crop with `index`
pub fn crop_file_name(index: u64, extension: &str) -> String {
    format!("{CROP_PREFIX}{index:04}.{extension}")
}

/// Parse the index out of a `word_<digits>.<ext>` file name
pub fn parse_crop_index(file_name: &str) -> Option<u64> {
    let rest = file_name.strip_prefix(CROP_PREFIX)?;
    let (digits, ext) = rest.split_once('.')?;
    if !CROP_EXTENSIONS.iter().any(|e| e.eq_ignore_ascii_case(ext)) {
        return None;
    }
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// Index the next crop written to `dir` should get.
///
/// A missing or empty directory starts at 0.
pub fn next_crop_index(dir: &Path) -> io::Result<u64> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(0),
        Err(e) => return Err(e),
    };

    let mut max_index: Option<u64> = None;
    for entry in entries {
        let entry = entry?;
        let name = entry.file_name();
        if let Some(index) = name.to_str().and_then(parse_crop_index) {
            max_index = Some(max_index.map_or(index, |m| m.max(index)));
        }
    }

    Ok(max_index.map_or(0, |m| m + 1))
}

/// Sequential crop path allocator for one segmentation run
#[derive(Debug)]
pub struct CropCounter {
    dir: PathBuf,
    extension: String,
    next: u64,
}

impl CropCounter {
    /// Scan `dir` once and start after its highest existing index
    pub fn open(dir: &Path, extension: &str) -> io::Result<Self> {
        Ok(Self {
            dir: dir.to_path_buf(),
            extension: extension.to_string(),
            next: next_crop_index(dir)?,
        })
    }

    /// Index the next allocation will return
    pub fn peek(&self) -> u64 {
        self.next
    }

    /// Reserve the next index and its file path
    pub fn allocate(&mut self) -> (u64, PathBuf) {
        let index = self.next;
        self.next += 1;
        (index, self.dir.join(crop_file_name(index, &self.extension)))
    }
}
