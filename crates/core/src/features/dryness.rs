//! Colour-based dryness estimate
//!
//! Dry grass and cured fuel shift the image toward red/yellow and away from
//! green. A bounded, seeded pixel sample keeps the cost flat for large images
//! and makes the result reproducible.

use crate::core_types::{clamp_unit, ImageSample};
use crate::segmentation::FireDetection;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// Upper bound on pixels inspected per image
pub const MAX_SAMPLED_PIXELS: usize = 4096;

/// Mean channel values of the sampled pixels, each 0-1
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ColorSample {
    pub red: f32,
    pub green: f32,
    pub blue: f32,
    pub count: usize,
}

impl ColorSample {
    /// Sample up to [`MAX_SAMPLED_PIXELS`] pixels
    ///
    /// Small images are read in full; larger ones draw indices from an RNG
    /// seeded with the image content.
    pub fn from_image(image: &ImageSample) -> Self {
        let total = image.pixel_count() as usize;
        if total == 0 {
            return Self::default();
        }

        let mut sums = [0u64; 3];
        let mut count = 0usize;
        let mut add = |index: usize| {
            if let Some(p) = image.pixel(index) {
                for (sum, channel) in sums.iter_mut().zip(p) {
                    *sum += u64::from(channel);
                }
                count += 1;
            }
        };

        if total <= MAX_SAMPLED_PIXELS {
            (0..total).for_each(&mut add);
        } else {
            let mut rng = StdRng::seed_from_u64(image.content_seed());
            for _ in 0..MAX_SAMPLED_PIXELS {
                add(rng.random_range(0..total));
            }
        }

        if count == 0 {
            return Self::default();
        }
        let mean = |sum: u64| sum as f32 / count as f32 / 255.0;
        Self {
            red: mean(sums[0]),
            green: mean(sums[1]),
            blue: mean(sums[2]),
            count,
        }
    }

    pub fn brightness(&self) -> f32 {
        (self.red + self.green + self.blue) / 3.0
    }

    pub fn green_dominant(&self) -> bool {
        self.green > self.red && self.green > self.blue
    }
}

/// Fire/smoke evidence carried inside the dryness metrics
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FireIndicators {
    pub active_fire: bool,
    pub smoke_present: bool,
    pub fire_probability: f32,
    pub smoke_probability: f32,
}

impl From<&FireDetection> for FireIndicators {
    fn from(detection: &FireDetection) -> Self {
        Self {
            active_fire: detection.fire_detected,
            smoke_present: detection.smoke_detected,
            fire_probability: clamp_unit(detection.fire_probability),
            smoke_probability: clamp_unit(detection.smoke_probability),
        }
    }
}

/// Raw metrics behind the dryness score
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DrynessMetrics {
    pub red_green_ratio: f32,
    pub yellow_strength: f32,
    pub brightness: f32,
    pub green_vegetation: bool,
    /// Colour-only dryness before fire evidence, 0-1
    pub color_dryness: f32,
    /// Final dryness, 0-1
    pub dryness: f32,
    pub sampled_pixels: usize,
    pub fire_indicators: FireIndicators,
}

/// Discount applied when green dominates the sample
const GREEN_DISCOUNT: f32 = 0.6;

/// Compute dryness metrics from a colour sample and fire evidence
pub fn dryness_metrics(sample: &ColorSample, fire: FireIndicators) -> DrynessMetrics {
    let red_green_ratio = sample.red / sample.green.max(1e-3);
    let red_green = clamp_unit((red_green_ratio - 0.8) / 0.7);
    let yellow_strength = clamp_unit(((sample.red + sample.green) / 2.0 - sample.blue) / 0.4);
    let brightness = clamp_unit((sample.brightness() - 0.3) / 0.5);

    let green_vegetation = sample.green_dominant();
    let mut color_dryness = 0.5 * red_green + 0.3 * yellow_strength + 0.2 * brightness;
    if green_vegetation {
        color_dryness *= GREEN_DISCOUNT;
    }
    let color_dryness = clamp_unit(color_dryness);

    let fire_signal = fire
        .fire_probability
        .max(0.7 * fire.smoke_probability);
    let dryness = if fire.active_fire || fire.smoke_present {
        1.0
    } else {
        clamp_unit(0.7 * color_dryness + 0.3 * fire_signal)
    };

    DrynessMetrics {
        red_green_ratio,
        yellow_strength,
        brightness,
        green_vegetation,
        color_dryness,
        dryness,
        sampled_pixels: sample.count,
        fire_indicators: fire,
    }
}
