//! Image preprocessing for the recognition model
//!
//! Fits a grayscale word image into a fixed `target_height x target_width`
//! white canvas without distortion, transposes it to the model's
//! column-major layout, and standardizes it to zero mean and unit variance.

use image::imageops::{self, FilterType};
use image::{GrayImage, Luma};
use ndarray::Array2;
use rand::{Rng, RngCore};

/// Canvas background (white)
const BACKGROUND: f32 = 255.0;

/// A normalized, fixed-size sample.
///
/// The array is stored transposed: `data[[x, y]]` holds visual pixel
/// `(x, y)`, so `data.dim() == (width, height)`.
#[derive(Debug, Clone)]
pub struct PreprocessedSample {
    data: Array2<f32>,
}

impl PreprocessedSample {
    /// Visual height of the sample
    pub fn height(&self) -> usize {
        self.data.ncols()
    }

    /// Visual width of the sample
    pub fn width(&self) -> usize {
        self.data.nrows()
    }

    /// `(height, width)` of the visual image
    pub fn shape(&self) -> (usize, usize) {
        (self.height(), self.width())
    }

    /// Transposed sample values
    #[cfg(test)]
    pub fn data(&self) -> &Array2<f32> {
        &self.data
    }

    /// Serialize in stored (transposed) order, one byte per pixel.
    ///
    /// With `rescale` the values are min-max stretched to 0..=255; otherwise
    /// (or when every value is equal) they are cast as-is, saturating.
    pub fn to_bytes(&self, rescale: bool) -> Vec<u8> {
        let (min, max) = self
            .data
            .iter()
            .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));

        if rescale && max > min {
            let range = max - min;
            self.data.iter().map(|&v| ((v - min) * 255.0 / range) as u8).collect()
        } else {
            self.data.iter().map(|&v| v as u8).collect()
        }
    }

    /// Render back to an upright grayscale image for inspection
    pub fn to_gray_image(&self, rescale: bool) -> GrayImage {
        let bytes = self.to_bytes(rescale);
        let height = self.height();
        GrayImage::from_fn(self.width() as u32, height as u32, |x, y| {
            Luma([bytes[x as usize * height + y as usize]])
        })
    }
}

/// Size a `width x height` image is resized to before padding.
///
/// One scale factor, the larger axis ratio, is applied to both axes so the
/// result fits the target on each axis. Sides are truncated, then clamped to
/// `1..=target`.
pub fn fitted_size(width: u32, height: u32, target_width: u32, target_height: u32) -> (u32, u32) {
    let fx = f64::from(width) / f64::from(target_width);
    let fy = f64::from(height) / f64::from(target_height);
    let f = fx.max(fy);

    let new_w = ((f64::from(width) / f) as u32).min(target_width).max(1);
    let new_h = ((f64::from(height) / f) as u32).min(target_height).max(1);
    (new_w, new_h)
}

/// Randomly stretch the width by a factor in `[0.5, 1.5)`
pub fn stretch_width<R: Rng + ?Sized>(img: &GrayImage, rng: &mut R) -> GrayImage {
    let stretch: f64 = rng.gen::<f64>() - 0.5;
    let (width, height) = img.dimensions();
    let stretched = ((f64::from(width) * (1.0 + stretch)) as u32).max(1);
    imageops::resize(img, stretched, height, FilterType::Triangle)
}

/// Normalize a grayscale image into a `target_height x target_width` sample.
///
/// `augment` draws a random horizontal stretch from the thread RNG; dataset
/// packing always passes `false`.
pub fn normalize(
    img: &GrayImage,
    target_width: u32,
    target_height: u32,
    augment: bool,
) -> PreprocessedSample {
    if augment {
        let mut rng = rand::thread_rng();
        normalize_with_rng(img, target_width, target_height, Some(&mut rng))
    } else {
        normalize_with_rng(img, target_width, target_height, None)
    }
}

/// [`normalize`] with an explicit augmentation source; `None` disables it
pub fn normalize_with_rng(
    img: &GrayImage,
    target_width: u32,
    target_height: u32,
    rng: Option<&mut dyn RngCore>,
) -> PreprocessedSample {
    let stretched;
    let img = match rng {
        Some(rng) if img.width() > 0 && img.height() > 0 => {
            stretched = stretch_width(img, rng);
            &stretched
        }
        _ => img,
    };

    let canvas = fit_to_canvas(img, target_width, target_height);
    let mut data = canvas.t().as_standard_layout().into_owned();
    standardize(&mut data);

    PreprocessedSample { data }
}

/// Resize into the top-left corner of a white `target_height x target_width` canvas
fn fit_to_canvas(img: &GrayImage, target_width: u32, target_height: u32) -> Array2<f32> {
    let mut canvas = Array2::<f32>::from_elem(
        (target_height as usize, target_width as usize),
        BACKGROUND,
    );

    let (width, height) = img.dimensions();
    if width == 0 || height == 0 {
        return canvas;
    }

    let (new_w, new_h) = fitted_size(width, height, target_width, target_height);
    let resized = if (new_w, new_h) == (width, height) {
        img.clone()
    } else {
        imageops::resize(img, new_w, new_h, FilterType::Triangle)
    };

    for (x, y, pixel) in resized.enumerate_pixels() {
        canvas[[y as usize, x as usize]] = f32::from(pixel.0[0]);
    }

    canvas
}

/// Subtract the mean, divide by the population std when it is non-zero
fn standardize(data: &mut Array2<f32>) {
    let n = data.len() as f64;
    if n == 0.0 {
        return;
    }

    let mean = data.iter().map(|&v| f64::from(v)).sum::<f64>() / n;
    let var = data
        .iter()
        .map(|&v| {
            let d = f64::from(v) - mean;
            d * d
        })
        .sum::<f64>()
        / n;
    let std = var.sqrt();

    if std > 0.0 {
        data.mapv_inplace(|v| ((f64::from(v) - mean) / std) as f32);
    } else {
        data.mapv_inplace(|v| (f64::from(v) - mean) as f32);
    }
}
