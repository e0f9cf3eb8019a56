//! Separable bilinear resampling with 8-bit fixed-point arithmetic.
//!
//! Reproduces the PIL `Image.resize(size, BILINEAR)` resampler that
//! torchvision's `Resize` runs on PIL images: a horizontal pass into an 8-bit
//! intermediate, then a vertical pass, each using normalized triangle-filter
//! weights widened by the downscale factor and quantized to 22 fractional
//! bits. A pass whose dimension does not change is skipped.

use image::RgbImage;
use rayon::prelude::*;

const PRECISION_BITS: u32 = 32 - 8 - 2;
const BILINEAR_SUPPORT: f64 = 1.0;
const CHANNELS: usize = 3;

fn bilinear_filter(x: f64) -> f64 {
    let x = x.abs();
    if x < 1.0 { 1.0 - x } else { 0.0 }
}

fn clip8(value: i32) -> u8 {
    if value >= (1 << PRECISION_BITS << 8) {
        255
    } else if value <= 0 {
        0
    } else {
        (value >> PRECISION_BITS) as u8
    }
}

/// Fixed-point filter taps for one axis.
#[derive(Debug)]
struct Coefficients {
    ksize: usize,
    /// First source index and tap count per output index.
    bounds: Vec<(usize, usize)>,
    weights: Vec<i32>,
}

impl Coefficients {
    fn new(in_size: u32, out_size: u32) -> Self {
        let scale = f64::from(in_size) / f64::from(out_size);
        let filterscale = scale.max(1.0);
        let support = BILINEAR_SUPPORT * filterscale;
        let ksize = support.ceil() as usize * 2 + 1;
        let inv_filterscale = 1.0 / filterscale;

        let mut bounds = Vec::with_capacity(out_size as usize);
        let mut weights = vec![0i32; out_size as usize * ksize];
        let mut taps = vec![0f64; ksize];

        for (xx, row) in weights.chunks_mut(ksize).enumerate() {
            let center = (xx as f64 + 0.5) * scale;
            // Float to int casts truncate toward zero before clamping.
            let xmin = ((center - support + 0.5) as i64).max(0);
            let xmax = ((center + support + 0.5) as i64).min(i64::from(in_size));
            let count = ((xmax - xmin).max(0) as usize).min(ksize);
            let xmin = xmin as usize;

            let mut total = 0.0;
            for (x, tap) in taps.iter_mut().take(count).enumerate() {
                *tap = bilinear_filter(((x + xmin) as f64 - center + 0.5) * inv_filterscale);
                total += *tap;
            }
            for (dst, &tap) in row.iter_mut().zip(taps.iter().take(count)) {
                let w = if total != 0.0 { tap / total } else { tap };
                let scaled = w * f64::from(1u32 << PRECISION_BITS);
                *dst = if w < 0.0 {
                    (scaled - 0.5) as i32
                } else {
                    (scaled + 0.5) as i32
                };
            }
            bounds.push((xmin, count));
        }

        Self {
            ksize,
            bounds,
            weights,
        }
    }

    fn taps(&self, index: usize) -> (usize, &[i32]) {
        let (start, count) = self.bounds[index];
        let offset = index * self.ksize;
        (start, &self.weights[offset..offset + count])
    }
}

fn resample_horizontal(src: &RgbImage, out_width: u32) -> RgbImage {
    let (in_width, height) = src.dimensions();
    let coeffs = Coefficients::new(in_width, out_width);
    let src_stride = in_width as usize * CHANNELS;
    let raw = src.as_raw();

    let mut out = RgbImage::new(out_width, height);
    out.par_chunks_mut(out_width as usize * CHANNELS)
        .enumerate()
        .for_each(|(y, dst_row)| {
            let src_row = &raw[y * src_stride..(y + 1) * src_stride];
            for (xx, dst) in dst_row.chunks_exact_mut(CHANNELS).enumerate() {
                let (start, taps) = coeffs.taps(xx);
                let mut acc = [1i32 << (PRECISION_BITS - 1); CHANNELS];
                for (i, &w) in taps.iter().enumerate() {
                    let px = (start + i) * CHANNELS;
                    for (c, sum) in acc.iter_mut().enumerate() {
                        *sum += i32::from(src_row[px + c]) * w;
                    }
                }
                for (d, sum) in dst.iter_mut().zip(acc) {
                    *d = clip8(sum);
                }
            }
        });
    out
}

fn resample_vertical(src: &RgbImage, out_height: u32) -> RgbImage {
    let (width, in_height) = src.dimensions();
    let coeffs = Coefficients::new(in_height, out_height);
    let stride = width as usize * CHANNELS;
    let raw = src.as_raw();

    let mut out = RgbImage::new(width, out_height);
    out.par_chunks_mut(stride)
        .enumerate()
        .for_each(|(yy, dst_row)| {
            let (start, taps) = coeffs.taps(yy);
            for (i, dst) in dst_row.iter_mut().enumerate() {
                let mut acc = 1i32 << (PRECISION_BITS - 1);
                for (j, &w) in taps.iter().enumerate() {
                    acc += i32::from(raw[(start + j) * stride + i]) * w;
                }
                *dst = clip8(acc);
            }
        });
    out
}

/// Resizes `img` to `width`×`height` with PIL-compatible bilinear filtering.
///
/// Both target dimensions must be non-zero.
pub fn resize_bilinear(img: &RgbImage, width: u32, height: u32) -> RgbImage {
    let (in_width, in_height) = img.dimensions();
    let horizontal = if width != in_width {
        Some(resample_horizontal(img, width))
    } else {
        None
    };
    let stage = horizontal.as_ref().unwrap_or(img);
    if height != in_height {
        resample_vertical(stage, height)
    } else {
        horizontal.unwrap_or_else(|| img.clone())
    }
}
