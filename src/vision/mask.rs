//! Ink mask construction for word segmentation
//!
//! Otsu binarization with ink as foreground, followed by a rectangular
//! dilation that fuses the letters of a word into one blob.

use image::{imageops, GrayImage, Luma};
use imageproc::contrast::otsu_level;
use tracing::debug;

/// Foreground value in masks
pub const INK: u8 = 255;

/// Binarize with an automatic Otsu threshold, inverse polarity.
///
/// Pixels darker than or equal to the threshold (ink) become [`INK`], the
/// rest become 0. A page of a single intensity has no ink at all.
pub fn binarize_inverse_otsu(gray: &GrayImage) -> GrayImage {
    let (width, height) = gray.dimensions();

    let mut values = gray.pixels().map(|p| p.0[0]);
    let first = values.next();
    let uniform = match first {
        Some(v) => values.all(|p| p == v),
        None => true,
    };
    if uniform {
        debug!("Uniform page {}x{}, empty mask", width, height);
        return GrayImage::new(width, height);
    }

    let level = otsu_level(gray);
    debug!("Otsu threshold: {}", level);

    let mut mask = GrayImage::new(width, height);
    for (x, y, pixel) in gray.enumerate_pixels() {
        let value = if pixel.0[0] > level { 0 } else { INK };
        mask.put_pixel(x, y, Luma([value]));
    }
    mask
}

/// Surround a mask with a one-pixel background frame.
///
/// Contour tracing needs foreground to stay off the image border, otherwise
/// a blob touching the edge is not reported as a top-level outer border.
pub fn pad_mask(mask: &GrayImage) -> GrayImage {
    let (width, height) = mask.dimensions();
    let mut padded = GrayImage::new(width + 2, height + 2);
    imageops::replace(&mut padded, mask, 1, 1);
    padded
}

/// Grow foreground with a `kernel_width` x `kernel_height` rectangle.
///
/// The kernel anchor sits at its center (`size / 2`), pixels outside the
/// image never contribute. Implemented as two separable max passes.
#[must_use = "returns a new dilated image"]
pub fn dilate_rect(mask: &GrayImage, kernel_width: u32, kernel_height: u32) -> GrayImage {
    let horizontal = max_filter_1d(mask, kernel_width.max(1), true);
    max_filter_1d(&horizontal, kernel_height.max(1), false)
}

fn max_filter_1d(img: &GrayImage, size: u32, along_x: bool) -> GrayImage {
    if size == 1 {
        return img.clone();
    }

    let (width, height) = img.dimensions();
    let mut result = GrayImage::new(width, height);

    let anchor = i64::from(size / 2);
    let len = if along_x { width } else { height };

    for y in 0..height {
        for x in 0..width {
            let pos = i64::from(if along_x { x } else { y });
            let start = (pos - anchor).max(0);
            let end = (pos - anchor + i64::from(size) - 1).min(i64::from(len) - 1);

            let mut max_val = 0u8;
            for p in start..=end {
                let p = p as u32;
                let v = if along_x {
                    img.get_pixel(p, y).0[0]
                } else {
                    img.get_pixel(x, p).0[0]
                };
                if v > max_val {
                    max_val = v;
                    if max_val == u8::MAX {
                        break;
                    }
                }
            }
            result.put_pixel(x, y, Luma([max_val]));
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page_with_block(w: u32, h: u32, block: (u32, u32, u32, u32)) -> GrayImage {
        let (bx, by, bw, bh) = block;
        GrayImage::from_fn(w, h, |x, y| {
            if x >= bx && x < bx + bw && y >= by && y < by + bh {
                Luma([10])
            } else {
                Luma([245])
            }
        })
    }

    #[test]
    fn test_binarize_marks_ink_as_foreground() {
        let page = page_with_block(20, 10, (5, 2, 4, 3));
        let mask = binarize_inverse_otsu(&page);

        assert_eq!(mask.get_pixel(6, 3).0[0], INK);
        assert_eq!(mask.get_pixel(0, 0).0[0], 0);
        assert_eq!(mask.get_pixel(19, 9).0[0], 0);
    }

    #[test]
    fn test_binarize_uniform_page_is_empty() {
        let page = GrayImage::from_pixel(16, 16, Luma([255]));
        let mask = binarize_inverse_otsu(&page);
        assert!(mask.pixels().all(|p| p.0[0] == 0));
    }

    #[test]
    fn test_pad_mask_frames_with_background() {
        let mask = GrayImage::from_pixel(3, 2, Luma([INK]));
        let padded = pad_mask(&mask);

        assert_eq!(padded.dimensions(), (5, 4));
        assert_eq!(padded.get_pixel(0, 0).0[0], 0);
        assert_eq!(padded.get_pixel(4, 3).0[0], 0);
        assert_eq!(padded.get_pixel(1, 1).0[0], INK);
        assert_eq!(padded.get_pixel(3, 2).0[0], INK);
    }

    #[test]
    fn test_dilate_single_pixel_extent() {
        let mut mask = GrayImage::new(20, 10);
        mask.put_pixel(10, 5, Luma([INK]));

        // 5x3 kernel, anchor (2, 1): covers x 8..=12, y 4..=6
        let dilated = dilate_rect(&mask, 5, 3);
        let lit: Vec<(u32, u32)> = dilated
            .enumerate_pixels()
            .filter(|(_, _, p)| p.0[0] == INK)
            .map(|(x, y, _)| (x, y))
            .collect();

        assert_eq!(lit.len(), 15);
        assert!(lit.iter().all(|&(x, y)| (8..=12).contains(&x) && (4..=6).contains(&y)));
    }

    #[test]
    fn test_dilate_even_kernel_anchor() {
        let mut mask = GrayImage::new(10, 1);
        mask.put_pixel(5, 0, Luma([INK]));

        // width 4, anchor 2: output x lit when src within [x-2, x+1]
        let dilated = dilate_rect(&mask, 4, 1);
        let lit: Vec<u32> = (0..10).filter(|&x| dilated.get_pixel(x, 0).0[0] == INK).collect();
        assert_eq!(lit, vec![4, 5, 6, 7]);
    }

    #[test]
    fn test_dilate_merges_close_blobs_only() {
        let mut mask = GrayImage::new(60, 5);
        for x in [10, 14, 50] {
            mask.put_pixel(x, 2, Luma([INK]));
        }

        let dilated = dilate_rect(&mask, 5, 1);
        // gap of 3 between 10 and 14 closes, the far blob stays apart
        assert!((8..=16).all(|x| dilated.get_pixel(x, 2).0[0] == INK));
        assert_eq!(dilated.get_pixel(30, 2).0[0], 0);
        assert_eq!(dilated.get_pixel(50, 2).0[0], INK);
    }
}
