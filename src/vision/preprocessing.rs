// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Image preprocessing for classifier and caption encoders

use anyhow::{Context, Result};
use image::{imageops::FilterType, DynamicImage, GenericImageView, Rgb, RgbImage};
use ndarray::Array4;
use serde::Deserialize;
use std::path::Path;

/// Default input resolution for the crop/disease classifier
pub const DEFAULT_INPUT_SIZE: u32 = 224;

/// ImageNet normalization mean values
pub const IMAGENET_MEAN: [f32; 3] = [0.485, 0.456, 0.406];

/// ImageNet normalization std values
pub const IMAGENET_STD: [f32; 3] = [0.229, 0.224, 0.225];

/// How the source image is fitted to the model resolution
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum ResizeMode {
    /// Resize to exact size (may distort aspect ratio)
    #[default]
    Stretch,
    /// Resize keeping aspect ratio with center crop
    CenterCrop,
}

/// Resolution and normalization parameters for one encoder
#[derive(Debug, Clone, PartialEq)]
pub struct PreprocessConfig {
    pub width: u32,
    pub height: u32,
    pub mean: [f32; 3],
    pub std: [f32; 3],
    pub mode: ResizeMode,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            width: DEFAULT_INPUT_SIZE,
            height: DEFAULT_INPUT_SIZE,
            mean: IMAGENET_MEAN,
            std: IMAGENET_STD,
            mode: ResizeMode::Stretch,
        }
    }
}

/// `size` in preprocessor_config.json is either an int or an object
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SizeSpec {
    Square(u32),
    Exact { height: u32, width: u32 },
    ShortestEdge { shortest_edge: u32 },
}

#[derive(Debug, Deserialize)]
struct RawPreprocessorConfig {
    image_mean: Option<Vec<f32>>,
    image_std: Option<Vec<f32>>,
    size: Option<SizeSpec>,
    crop_size: Option<SizeSpec>,
    #[serde(default)]
    do_center_crop: bool,
}

impl PreprocessConfig {
    /// Parse a HuggingFace `preprocessor_config.json`
    ///
    /// Missing fields keep their defaults (224x224, ImageNet statistics).
    pub fn from_json_str(json: &str) -> Result<Self> {
        let raw: RawPreprocessorConfig =
            serde_json::from_str(json).context("Invalid preprocessor config")?;

        let mut config = Self::default();

        if let Some(mean) = raw.image_mean.as_deref().and_then(to_triplet) {
            config.mean = mean;
        }
        if let Some(std) = raw.image_std.as_deref().and_then(to_triplet) {
            config.std = std;
        }
        if config.std.iter().any(|s| *s <= 0.0) {
            anyhow::bail!("image_std values must be positive");
        }

        let size = if raw.do_center_crop {
            config.mode = ResizeMode::CenterCrop;
            raw.crop_size.or(raw.size)
        } else {
            raw.size
        };

        if let Some(size) = size {
            let (width, height) = match size {
                SizeSpec::Square(s) => (s, s),
                SizeSpec::Exact { height, width } => (width, height),
                SizeSpec::ShortestEdge { shortest_edge } => (shortest_edge, shortest_edge),
            };
            if width == 0 || height == 0 {
                anyhow::bail!("Preprocessor size must be non-zero");
            }
            config.width = width;
            config.height = height;
        }

        Ok(config)
    }

    /// Load from a `preprocessor_config.json` file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Self::from_json_str(&content)
    }

    /// Load from a model directory, defaulting when the file is absent
    pub fn from_model_dir(dir: &Path) -> Result<Self> {
        let path = dir.join(super::artifacts::PREPROCESSOR_FILE);
        if !path.is_file() {
            return Ok(Self::default());
        }
        Self::from_file(&path)
    }

    /// Convert an image into a normalized `[1, 3, H, W]` tensor
    pub fn apply(&self, image: &DynamicImage) -> Array4<f32> {
        let resized = resize(image, self.width, self.height, self.mode);
        let rgb = resized.to_rgb8();

        let (w, h) = (self.width as usize, self.height as usize);
        let mut tensor = Array4::zeros((1, 3, h, w));

        for (x, y, pixel) in rgb.enumerate_pixels() {
            for c in 0..3 {
                tensor[[0, c, y as usize, x as usize]] =
                    (pixel[c] as f32 / 255.0 - self.mean[c]) / self.std[c];
            }
        }

        tensor
    }
}

fn to_triplet(values: &[f32]) -> Option<[f32; 3]> {
    match values {
        [r, g, b] => Some([*r, *g, *b]),
        _ => None,
    }
}

fn resize(image: &DynamicImage, width: u32, height: u32, mode: ResizeMode) -> DynamicImage {
    let (orig_w, orig_h) = image.dimensions();

    if orig_w == 0 || orig_h == 0 {
        return DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([128, 128, 128])));
    }

    match mode {
        ResizeMode::Stretch => image.resize_exact(width, height, FilterType::Triangle),
        ResizeMode::CenterCrop => {
            let scale = (width as f32 / orig_w as f32).max(height as f32 / orig_h as f32);
            let new_w = ((orig_w as f32 * scale).round() as u32).max(width);
            let new_h = ((orig_h as f32 * scale).round() as u32).max(height);
            let resized = image.resize_exact(new_w, new_h, FilterType::Triangle);
            let crop_x = (new_w - width) / 2;
            let crop_y = (new_h - height) / 2;
            resized.crop_imm(crop_x, crop_y, width, height)
        }
    }
}
