//! Error types for segmentation and dataset packing.

use std::path::PathBuf;
use thiserror::Error;

/// Fatal segmentation errors.
#[derive(Debug, Error)]
pub enum SegmentError {
    /// The page image could not be opened or decoded.
    #[error("failed to load page image {path:?}: {source}")]
    UnreadablePage {
        /// Page that failed to load.
        path: PathBuf,
        /// Decoder error.
        #[source]
        source: image::ImageError,
    },

    /// A crop could not be written to the output directory.
    #[error("failed to write crop {path:?}: {source}")]
    CropWrite {
        /// Destination of the crop.
        path: PathBuf,
        /// Encoder error.
        #[source]
        source: image::ImageError,
    },

    /// The output directory could not be created or listed.
    #[error("output directory {path:?} unusable: {source}")]
    OutputDir {
        /// The output directory.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

/// Reasons a single labeled image is left out of the packed dataset.
///
/// None of these stop a packing run; the record is skipped with a warning
/// and the index/offset counters are left untouched.
#[derive(Debug, Error)]
pub enum RecordSkip {
    #[error("no label file {0:?}")]
    MissingLabel(PathBuf),

    #[error("could not read image: {0}")]
    UnreadableImage(#[from] image::ImageError),

    #[error("could not read label: {0}")]
    UnreadableLabel(#[from] std::io::Error),

    #[error("sample shape {actual:?} does not match expected {expected:?}")]
    ShapeMismatch {
        /// (height, width) the dataset is packed at.
        expected: (usize, usize),
        /// (height, width) the normalizer produced.
        actual: (usize, usize),
    },

    #[error("label is empty")]
    EmptyLabel,

    #[error("label spans several lines")]
    MultiLineLabel,

    #[error("label has {len} characters, limit is {max}")]
    LabelTooLong { len: usize, max: usize },
}

/// Malformed line in a dataset index file.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum IndexParseError {
    #[error("missing field `{0}`")]
    MissingField(&'static str),

    #[error("invalid value for `{field}`: {value:?}")]
    InvalidValue { field: &'static str, value: String },
}
