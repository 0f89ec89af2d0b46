use crate::converter::{Charset, ConversionConfig};
use crate::decoder::FormatPolicy;
use crate::{CONTRAST_FACTOR, DEFAULT_CHARSET, DEFAULT_HEIGHT_HINT, DEFAULT_WIDTH, MAX_DIMENSION};
use clap::Parser;
use image::imageops::FilterType;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to the animated image to play
    #[arg(required = true)]
    pub file_path: PathBuf,

    /// Output width in terminal columns
    #[arg(short, long, default_value_t = DEFAULT_WIDTH)]
    pub width: u32,

    /// Output height hint in rows (the aspect ratio decides the real height)
    #[arg(long, default_value_t = DEFAULT_HEIGHT_HINT)]
    pub height: u32,

    /// Characters ordered from darkest to brightest
    #[arg(short, long, default_value = DEFAULT_CHARSET)]
    pub charset: String,

    /// Resampling filter used when scaling frames
    #[arg(long, value_enum, default_value_t = ResizeFilter::Triangle)]
    pub filter: ResizeFilter,

    /// Reject files that are not GIFs instead of playing them as still images
    #[arg(long)]
    pub strict_gif: bool,

    /// Stop after this many loops (loops forever by default)
    #[arg(long, value_name = "N")]
    pub cycles: Option<u64>,

    /// Show image information only (don't play)
    #[arg(long)]
    pub info_only: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

/// Resampling kernel for frame scaling
#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResizeFilter {
    /// Nearest neighbor
    Nearest,
    /// Bilinear
    Triangle,
    /// Cubic
    CatmullRom,
    /// Gaussian
    Gaussian,
    /// Lanczos with window 3
    Lanczos3,
}

impl From<ResizeFilter> for FilterType {
    fn from(filter: ResizeFilter) -> Self {
        match filter {
            ResizeFilter::Nearest => FilterType::Nearest,
            ResizeFilter::Triangle => FilterType::Triangle,
            ResizeFilter::CatmullRom => FilterType::CatmullRom,
            ResizeFilter::Gaussian => FilterType::Gaussian,
            ResizeFilter::Lanczos3 => FilterType::Lanczos3,
        }
    }
}

impl Cli {
    /// Validate command line arguments
    pub fn validate(&self) -> Result<(), String> {
        // Check if file exists
        if !self.file_path.exists() {
            return Err(format!("Image file does not exist: {}", self.file_path.display()));
        }

        if self.width == 0 {
            return Err("Width must be greater than 0".to_string());
        }

        if self.width > MAX_DIMENSION {
            return Err(format!("Width must be at most {}", MAX_DIMENSION));
        }

        if self.height == 0 {
            return Err("Height must be greater than 0".to_string());
        }

        if self.charset.is_empty() {
            return Err("Charset must contain at least one character".to_string());
        }

        if let Err(e) = Charset::new(&self.charset) {
            return Err(e.to_string());
        }

        if self.cycles == Some(0) {
            return Err("Cycles must be greater than 0".to_string());
        }

        Ok(())
    }

    /// Which containers the decoder accepts
    pub fn format_policy(&self) -> FormatPolicy {
        if self.strict_gif {
            FormatPolicy::StrictGif
        } else {
            FormatPolicy::AnyImage
        }
    }

    /// Build the conversion configuration from the arguments
    pub fn conversion_config(&self) -> crate::Result<ConversionConfig> {
        Ok(ConversionConfig {
            width: self.width,
            height_hint: self.height,
            charset: Charset::new(&self.charset)?,
            contrast: CONTRAST_FACTOR,
            filter: self.filter,
        })
    }
}
