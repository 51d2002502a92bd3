//! Word segmentation of scanned pages
//!
//! Ink is binarized, dilated with a wide rectangle so letters of one word
//! fuse while inter-word gaps survive, and each outermost blob becomes a
//! word box. Boxes are emitted right-to-left to follow Arabic reading order.

use image::{DynamicImage, GrayImage};
use imageproc::contours::{find_contours, BorderType};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info};

use super::mask::{binarize_inverse_otsu, dilate_rect, pad_mask};
use super::BoundingBox;
use crate::config::SegmentationConfig;
use crate::error::SegmentError;
use crate::storage::crops::CropCounter;

/// A word cut out of a page and written to disk
#[derive(Debug, Clone)]
pub struct WordCrop {
    /// Sequential crop index within the output directory
    pub index: u64,
    /// Location on the source page
    pub bounds: BoundingBox,
    /// Pixels copied from the original (non-binarized) page
    pub image: DynamicImage,
    /// File the crop was written to
    pub path: PathBuf,
}

/// Sort boxes by descending x (rightmost word first)
pub fn order_right_to_left(boxes: &mut [BoundingBox]) {
    boxes.sort_by(|a, b| b.x.cmp(&a.x));
}

/// Page segmenter
pub struct Segmenter {
    config: SegmentationConfig,
}

impl Segmenter {
    pub fn new(config: SegmentationConfig) -> Self {
        Self { config }
    }

    /// Find word boxes on a grayscale page, right-to-left
    pub fn detect_words(&self, gray: &GrayImage) -> Vec<BoundingBox> {
        let binary = binarize_inverse_otsu(gray);
        let dilated = dilate_rect(&binary, self.config.kernel_width, self.config.kernel_height);

        // traced on a padded copy, so points are shifted by one
        let contours = find_contours::<u32>(&pad_mask(&dilated));
        let total = contours.len();

        let mut boxes: Vec<BoundingBox> = contours
            .iter()
            .filter(|c| c.border_type == BorderType::Outer && c.parent.is_none())
            .filter_map(|c| BoundingBox::from_points(&c.points))
            .map(|b| BoundingBox::new(b.x - 1, b.y - 1, b.width, b.height))
            .filter(|b| b.exceeds(self.config.min_width, self.config.min_height))
            .collect();

        order_right_to_left(&mut boxes);

        debug!("{} contours, {} word boxes kept", total, boxes.len());
        boxes
    }

    /// Segment one page into `output_dir`.
    ///
    /// Numbering continues after the highest crop index already in the
    /// directory. An unreadable page is an error and nothing is written.
    pub fn segment(&self, page: &Path, output_dir: &Path) -> Result<Vec<WordCrop>, SegmentError> {
        self.segment_pages(&[page.to_path_buf()], output_dir)
    }

    /// Segment several pages into `output_dir` with one continuous counter
    pub fn segment_pages(
        &self,
        pages: &[PathBuf],
        output_dir: &Path,
    ) -> Result<Vec<WordCrop>, SegmentError> {
        std::fs::create_dir_all(output_dir).map_err(|source| SegmentError::OutputDir {
            path: output_dir.to_path_buf(),
            source,
        })?;
        let mut counter = CropCounter::open(output_dir, &self.config.output_extension)
            .map_err(|source| SegmentError::OutputDir {
                path: output_dir.to_path_buf(),
                source,
            })?;
        debug!("Numbering crops in {:?} from {}", output_dir, counter.peek());

        let mut crops = Vec::new();
        for page_path in pages {
            let page = image::open(page_path).map_err(|source| SegmentError::UnreadablePage {
                path: page_path.clone(),
                source,
            })?;
            let page_crops = self.segment_image(&page, &mut counter)?;
            info!("Segmented {:?}: {} words", page_path, page_crops.len());
            crops.extend(page_crops);
        }

        info!("{} word images saved in {:?}", crops.len(), output_dir);
        Ok(crops)
    }

    /// Segment an already decoded page, allocating file names from `counter`
    pub fn segment_image(
        &self,
        page: &DynamicImage,
        counter: &mut CropCounter,
    ) -> Result<Vec<WordCrop>, SegmentError> {
        let start = Instant::now();
        let gray = page.to_luma8();
        let boxes = self.detect_words(&gray);

        let mut crops = Vec::with_capacity(boxes.len());
        for bounds in boxes {
            let image = page.crop_imm(bounds.x, bounds.y, bounds.width, bounds.height);
            let (index, path) = counter.allocate();
            image
                .save(&path)
                .map_err(|source| SegmentError::CropWrite { path: path.clone(), source })?;
            crops.push(WordCrop { index, bounds, image, path });
        }

        debug!("Page segmentation took {:?}", start.elapsed());
        Ok(crops)
    }
}
