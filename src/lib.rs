//! ASCII GIF Player - play animated GIFs as ASCII art in the terminal
//!
//! This crate decodes an animated image, converts every frame into a
//! luminance-mapped ASCII frame and plays the frames back in a loop using
//! the per-frame delays stored in the file.

pub mod cli;
pub mod decoder;
pub mod converter;
pub mod sequencer;
pub mod renderer;

use std::path::PathBuf;

pub use cli::{Cli, ResizeFilter};
pub use decoder::{DecodedSource, FormatPolicy, FrameSource, RasterFrame};
pub use converter::{AsciiFrame, Charset, ConversionConfig, FrameConverter, convert_all, derived_height};
pub use sequencer::{AnimationPlayer, AnimationSequence, PlaybackPhase, PlaybackSummary, StopSignal};
pub use renderer::{ConsoleRenderer, NullRenderer, Renderer};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Package name
pub const PACKAGE_NAME: &str = env!("CARGO_PKG_NAME");

/// Output width in terminal columns
pub const DEFAULT_WIDTH: u32 = 180;

/// Upper bound for either output dimension, in characters
pub const MAX_DIMENSION: u32 = 4096;

/// Output height hint in terminal rows. The real height is derived from the aspect ratio.
pub const DEFAULT_HEIGHT_HINT: u32 = 100;

/// Default character ramp, darkest to brightest
pub const DEFAULT_CHARSET: &str = " .:-=+*#%@";

/// Display time used for frames that carry no delay of their own
pub const DEFAULT_FRAME_DURATION_MS: u64 = 100;

/// Contrast boost applied before quantization
pub const CONTRAST_FACTOR: f32 = 3.0;

/// Terminal cells are roughly twice as tall as they are wide
pub const CELL_ASPECT: f64 = 0.5;

/// Pivot of the contrast stretch
pub const MID_GRAY: f32 = 128.0;

/// Error types used throughout the library
#[derive(thiserror::Error, Debug)]
pub enum GifPlayerError {
    #[error("Failed to open '{}': {source}", .path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("Unsupported format for '{}': {format} (GIF required)", .path.display())]
    UnsupportedFormat { path: PathBuf, format: String },

    #[error("Invalid dimensions: {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },

    #[error("Frame index {index} out of range (frame count {count})")]
    IndexOutOfRange { index: usize, count: usize },

    #[error("Animation has no frames")]
    EmptyAnimation,

    #[error("Animation has {frames} frames but {durations} durations")]
    SequenceMismatch { frames: usize, durations: usize },

    #[error("Render error: {0}")]
    Render(#[from] std::io::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type alias for this crate
pub type Result<T> = std::result::Result<T, GifPlayerError>;

/// Utility functions
pub mod utils {
    use std::time::Duration;

    /// Format a duration as `m:ss.mmm`, or `h:mm:ss.mmm` past the hour
    pub fn format_duration(duration: Duration) -> String {
        let total_ms = duration.as_millis();
        let hours = total_ms / 3_600_000;
        let minutes = (total_ms % 3_600_000) / 60_000;
        let secs = (total_ms % 60_000) / 1000;
        let millis = total_ms % 1000;

        if hours > 0 {
            format!("{}:{:02}:{:02}.{:03}", hours, minutes, secs, millis)
        } else {
            format!("{}:{:02}.{:03}", minutes, secs, millis)
        }
    }

    /// Height over width of a source image
    pub fn aspect_ratio(width: u32, height: u32) -> f64 {
        height as f64 / width as f64
    }
}

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        Cli, ResizeFilter,
        DecodedSource, FormatPolicy, FrameSource, RasterFrame,
        AsciiFrame, Charset, ConversionConfig, FrameConverter, convert_all, derived_height,
        AnimationPlayer, AnimationSequence, PlaybackPhase, PlaybackSummary, StopSignal,
        ConsoleRenderer, NullRenderer, Renderer,
        GifPlayerError, Result,
        DEFAULT_WIDTH, DEFAULT_HEIGHT_HINT, DEFAULT_CHARSET, DEFAULT_FRAME_DURATION_MS, MAX_DIMENSION,
        utils::*,
    };
}

#[cfg(test)]
mod tests {
    use super::utils::*;
    use std::time::Duration;

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_millis(0)), "0:00.000");
        assert_eq!(format_duration(Duration::from_millis(300)), "0:00.300");
        assert_eq!(format_duration(Duration::from_millis(90_050)), "1:30.050");
        assert_eq!(format_duration(Duration::from_millis(3_661_001)), "1:01:01.001");
    }

    #[test]
    fn test_aspect_ratio() {
        assert_eq!(aspect_ratio(4, 2), 0.5);
        assert_eq!(aspect_ratio(100, 100), 1.0);
    }
}
