use rayon::prelude::*;

use crate::{ColorType, ImageStack, MontageError};

/// Number of frequency bins per color channel.
pub const HISTOGRAM_BINS: usize = 20;

const CHANNEL_MIN: i32 = 0;
const CHANNEL_MAX: i32 = 256;
const BIN_SIZE: f64 = (CHANNEL_MAX - CHANNEL_MIN) as f64 / HISTOGRAM_BINS as f64;
const NUM_CHANNELS: usize = 3;

/// Frequency histogram of one color channel at one pixel location
#[derive(Clone, Default, Debug)]
pub struct ChannelHistogram {
    bins: [u32; HISTOGRAM_BINS],
    total: u32,
}

impl ChannelHistogram {
    pub fn add(&mut self, value: i32) -> Result<(), MontageError> {
        if value < CHANNEL_MIN || value >= CHANNEL_MAX {
            return Err(MontageError::ChannelOutOfRange(value));
        }
        let bin = (value as f64 / BIN_SIZE) as usize;
        self.bins[bin] += 1;
        self.total += 1;
        Ok(())
    }

    /// Relative frequency of the bin containing `value`. Zero for an
    /// empty histogram.
    pub fn probability(&self, value: u8) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        let bin = (value as f64 / BIN_SIZE) as usize;
        self.bins[bin] as f64 / self.total as f64
    }

    /// Variance of the binned samples, measured at bin centers.
    /// Diagnostic only; the optimizer never reads it.
    pub fn variance(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        let total = self.total as f64;
        let center = |i: usize| (i as f64 + 0.5) * BIN_SIZE;
        let mut mean = 0.0;
        for (i, &count) in self.bins.iter().enumerate() {
            mean += count as f64 * center(i);
        }
        mean /= total;
        let mut variance = 0.0;
        for (i, &count) in self.bins.iter().enumerate() {
            let d = center(i) - mean;
            variance += count as f64 * d * d;
        }
        variance / total
    }
}

/// Per-channel histograms of one pixel location across the image stack
#[derive(Clone, Default, Debug)]
pub struct PixelHistogram {
    channels: [ChannelHistogram; NUM_CHANNELS],
}

impl PixelHistogram {
    pub fn add<C: ColorType<ValueType = u8>>(&mut self, color: &C) -> Result<(), MontageError> {
        for (c, histogram) in self.channels.iter_mut().enumerate() {
            if let Some(value) = color.channel(c) {
                histogram.add(value as i32)?;
            }
        }
        Ok(())
    }

    /// Product of the per-channel relative frequencies. Treats channels
    /// as independent, which is an approximation of the joint
    /// distribution, not the distribution itself.
    pub fn probability<C: ColorType<ValueType = u8>>(&self, color: &C) -> f64 {
        let mut probability = 1.0;
        for (c, histogram) in self.channels.iter().enumerate() {
            if let Some(value) = color.channel(c) {
                probability *= histogram.probability(value);
            }
        }
        probability
    }

    pub fn channel(&self, c: usize) -> &ChannelHistogram {
        &self.channels[c]
    }
}

/// Per-pixel empirical color distributions over the whole image stack,
/// built once per run.
pub struct HistogramTable {
    pixels: Vec<PixelHistogram>,
    width: usize,
    height: usize,
}

impl HistogramTable {
    /// Accumulates one histogram per pixel location, sampling every image
    /// of the stack at that location. Pixel locations are independent, so
    /// the build is parallel.
    pub fn build(stack: &ImageStack) -> Result<Self, MontageError> {
        let width = stack.width();
        let height = stack.height();
        let pixels = (0..width * height)
            .into_par_iter()
            .map(|index| {
                let mut pixel = PixelHistogram::default();
                for image in stack.images() {
                    pixel.add(&image.get_pixel_at(index))?;
                }
                Ok(pixel)
            })
            .collect::<Result<Vec<_>, MontageError>>()?;
        Ok(Self {
            pixels,
            width,
            height,
        })
    }

    pub fn pixel(&self, col: usize, row: usize) -> &PixelHistogram {
        &self.pixels[row * self.width + col]
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }
}
