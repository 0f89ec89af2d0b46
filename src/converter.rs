use crate::cli::ResizeFilter;
use crate::decoder::{FrameSource, RasterFrame};
use crate::{
    GifPlayerError, Result, CELL_ASPECT, CONTRAST_FACTOR, DEFAULT_CHARSET, DEFAULT_HEIGHT_HINT,
    DEFAULT_WIDTH, MAX_DIMENSION, MID_GRAY,
};
use image::imageops;
use image::GrayImage;
use log::{debug, info};
use std::fmt;
use std::time::Instant;

/// Ordered brightness ramp, index 0 is the darkest character
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Charset {
    chars: Vec<char>,
}

impl Charset {
    /// Create a charset from a string ordered darkest to brightest
    pub fn new(ramp: &str) -> Result<Self> {
        let chars: Vec<char> = ramp.chars().collect();
        if chars.is_empty() {
            return Err(GifPlayerError::InvalidConfig("charset must not be empty".to_string()));
        }
        // Control characters would break the one-line-per-row layout
        if let Some(c) = chars.iter().find(|c| c.is_control()) {
            return Err(GifPlayerError::InvalidConfig(format!(
                "charset must not contain control characters (found {:?})",
                c
            )));
        }
        Ok(Self { chars })
    }

    /// Number of characters in the ramp
    pub fn len(&self) -> usize {
        self.chars.len()
    }

    /// Always false, a charset holds at least one character
    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    /// Ramp position for a brightness value: `floor(b / 255 * (len - 1))`
    pub fn index_for(&self, brightness: u8) -> usize {
        let last = self.chars.len() - 1;
        (brightness as usize * last / 255).min(last)
    }

    /// Character for a brightness value
    pub fn char_for(&self, brightness: u8) -> char {
        self.chars[self.index_for(brightness)]
    }

    /// Precompute the character for every brightness value
    fn lookup_table(&self) -> [char; 256] {
        let mut lut = [' '; 256];
        for (brightness, slot) in lut.iter_mut().enumerate() {
            *slot = self.char_for(brightness as u8);
        }
        lut
    }
}

impl Default for Charset {
    fn default() -> Self {
        Self {
            chars: DEFAULT_CHARSET.chars().collect(),
        }
    }
}

/// One converted frame: `height` lines of exactly `width` characters, each ending in `\n`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AsciiFrame {
    text: String,
    width: u32,
    height: u32,
}

impl AsciiFrame {
    /// Columns per line
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Number of lines
    pub fn height(&self) -> u32 {
        self.height
    }

    /// The whole frame, line breaks included
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Lines without their line breaks
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.text.lines()
    }
}

impl fmt::Display for AsciiFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// ASCII conversion configuration
#[derive(Debug, Clone)]
pub struct ConversionConfig {
    /// Output width in columns
    pub width: u32,
    /// Requested height in rows. Advisory only, the real height follows the source aspect ratio
    pub height_hint: u32,
    /// Character ramp
    pub charset: Charset,
    /// Contrast factor applied around mid-gray
    pub contrast: f32,
    /// Resampling kernel used when shrinking the frame
    pub filter: ResizeFilter,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            width: DEFAULT_WIDTH,
            height_hint: DEFAULT_HEIGHT_HINT,
            charset: Charset::default(),
            contrast: CONTRAST_FACTOR,
            filter: ResizeFilter::Triangle,
        }
    }
}

/// Output rows for a source of `src_width` x `src_height` drawn `target_width` columns wide.
///
/// Both output dimensions must lie in `1..=MAX_DIMENSION`.
pub fn derived_height(src_width: u32, src_height: u32, target_width: u32) -> Result<u32> {
    if src_width == 0 || src_height == 0 {
        return Err(GifPlayerError::InvalidDimensions {
            width: src_width,
            height: src_height,
        });
    }
    let ratio = crate::utils::aspect_ratio(src_width, src_height);
    // `as` saturates, so an oversized result lands above MAX_DIMENSION
    let height = (target_width as f64 * ratio * CELL_ASPECT).floor() as u32;
    if target_width == 0 || height == 0 || target_width > MAX_DIMENSION || height > MAX_DIMENSION {
        return Err(GifPlayerError::InvalidDimensions {
            width: target_width,
            height,
        });
    }
    Ok(height)
}

/// Raster frame to ASCII converter
pub struct FrameConverter {
    config: ConversionConfig,
    lut: [char; 256],
}

impl FrameConverter {
    /// Create a new frame converter with the given configuration
    pub fn new(config: ConversionConfig) -> Self {
        let lut = config.charset.lookup_table();
        Self { config, lut }
    }

    /// The configuration this converter was built with
    pub fn config(&self) -> &ConversionConfig {
        &self.config
    }

    /// Convert one raster frame to ASCII.
    ///
    /// Grayscale, resize to `width` x `derived_height`, contrast boost, then
    /// one character per pixel in row-major order.
    pub fn convert_frame(&self, frame: &RasterFrame) -> Result<AsciiFrame> {
        let (src_width, src_height) = frame.dimensions();
        let width = self.config.width;
        let height = derived_height(src_width, src_height, width)?;
        debug!(
            "Converting frame {}x{} to {}x{} (height hint {})",
            src_width, src_height, width, height, self.config.height_hint
        );

        let gray: GrayImage = imageops::grayscale(frame);
        let mut resized = imageops::resize(&gray, width, height, self.config.filter.into());
        for pixel in resized.pixels_mut() {
            pixel.0[0] = self.adjust_contrast(pixel.0[0]);
        }

        let capacity = (width as usize + 1)
            .checked_mul(height as usize)
            .ok_or(GifPlayerError::InvalidDimensions { width, height })?;
        let mut text = String::with_capacity(capacity);
        for row in resized.rows() {
            text.extend(row.map(|pixel| self.lut[pixel.0[0] as usize]));
            text.push('\n');
        }

        Ok(AsciiFrame { text, width, height })
    }

    /// Linear stretch away from mid-gray
    fn adjust_contrast(&self, value: u8) -> u8 {
        let adjusted = (value as f32 - MID_GRAY) * self.config.contrast + MID_GRAY;
        adjusted.round().clamp(0.0, 255.0) as u8
    }
}

/// Convert every frame of a source, in order. Any failing frame fails the whole batch.
pub fn convert_all<S: FrameSource + ?Sized>(
    source: &S,
    converter: &FrameConverter,
) -> Result<Vec<AsciiFrame>> {
    let start = Instant::now();
    let count = source.frame_count();
    let frames = (0..count)
        .map(|index| converter.convert_frame(source.frame(index)?))
        .collect::<Result<Vec<_>>>()?;

    info!(
        "Converted {} frames to {}x{} in {}ms",
        frames.len(),
        converter.config.width,
        frames.first().map(|f| f.height()).unwrap_or(0),
        start.elapsed().as_millis()
    );
    Ok(frames)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    fn create_test_frame(width: u32, height: u32, r: u8, g: u8, b: u8) -> RasterFrame {
        RgbaImage::from_pixel(width, height, Rgba([r, g, b, 255]))
    }

    fn converter_with_width(width: u32) -> FrameConverter {
        FrameConverter::new(ConversionConfig {
            width,
            ..Default::default()
        })
    }

    #[test]
    fn test_char_index_mapping() {
        let charset = Charset::default();

        // Test extremes
        assert_eq!(charset.char_for(0), ' ');
        assert_eq!(charset.char_for(255), '@');

        // floor(128 / 255 * 9) = 4
        assert_eq!(charset.index_for(128), 4);
        assert_eq!(charset.index_for(254), 8);
    }

    #[test]
    fn test_char_mapping_monotonic() {
        let charset = Charset::new(" .:#@").unwrap();
        let mut previous = 0;
        for brightness in 0..=255u8 {
            let index = charset.index_for(brightness);
            assert!(index >= previous, "mapping decreased at brightness {}", brightness);
            previous = index;
        }
    }

    #[test]
    fn test_single_char_charset() {
        let charset = Charset::new("#").unwrap();
        assert_eq!(charset.char_for(0), '#');
        assert_eq!(charset.char_for(255), '#');
        assert!(Charset::new("").is_err());
    }

    #[test]
    fn test_control_chars_rejected() {
        for ramp in [" \n", "\r#", " .\t@", "\u{1b}#"] {
            assert!(
                matches!(Charset::new(ramp), Err(GifPlayerError::InvalidConfig(_))),
                "accepted {:?}",
                ramp
            );
        }
        // Non-ASCII printable characters stay allowed
        assert_eq!(Charset::new(" ░▒▓█").unwrap().len(), 5);
    }

    #[test]
    fn test_contrast_adjustment() {
        let converter = converter_with_width(10);
        assert_eq!(converter.adjust_contrast(128), 128);
        assert_eq!(converter.adjust_contrast(138), 158);
        assert_eq!(converter.adjust_contrast(100), 44);
        assert_eq!(converter.adjust_contrast(30), 0);
        assert_eq!(converter.adjust_contrast(230), 255);
    }

    #[test]
    fn test_derived_height() {
        assert_eq!(derived_height(100, 100, 180).unwrap(), 90);
        assert_eq!(derived_height(4, 2, 8).unwrap(), 2);
        assert_eq!(derived_height(300, 150, 180).unwrap(), 45);
        assert!(derived_height(0, 10, 10).is_err());
        assert!(derived_height(10, 0, 10).is_err());
        assert!(derived_height(10, 10, 0).is_err());
        // 1 * 0.01 * 0.5 rounds down to zero rows
        assert!(derived_height(100, 1, 1).is_err());
        // Output capped at MAX_DIMENSION in both directions
        assert!(derived_height(10, 10, MAX_DIMENSION + 1).is_err());
        assert!(derived_height(1, 10_000, MAX_DIMENSION).is_err());
        assert!(derived_height(2, 1, u32::MAX).is_err());
        assert_eq!(derived_height(4, 2, MAX_DIMENSION).unwrap(), 1024);
    }

    #[test]
    fn test_frame_conversion_dimensions() {
        let converter = converter_with_width(40);
        let frame = create_test_frame(64, 48, 128, 128, 128);

        let ascii_frame = converter.convert_frame(&frame).unwrap();

        assert_eq!(ascii_frame.width(), 40);
        assert_eq!(ascii_frame.height(), 15);
        assert_eq!(ascii_frame.lines().count(), 15);
        assert!(ascii_frame.lines().all(|line| line.chars().count() == 40));
        assert!(ascii_frame.as_str().ends_with('\n'));
    }

    #[test]
    fn test_black_and_white_conversion() {
        let converter = converter_with_width(10);

        let black = converter.convert_frame(&create_test_frame(4, 4, 0, 0, 0)).unwrap();
        assert!(black.lines().all(|line| line.chars().all(|c| c == ' ')));

        let white = converter.convert_frame(&create_test_frame(4, 4, 255, 255, 255)).unwrap();
        assert!(white.lines().all(|line| line.chars().all(|c| c == '@')));
    }

    #[test]
    fn test_conversion_is_deterministic() {
        let converter = converter_with_width(16);
        let frame = RgbaImage::from_fn(32, 16, |x, y| {
            let v = ((x * 8 + y * 4) % 256) as u8;
            Rgba([v, 255 - v, v / 2, 255])
        });
        let first = converter.convert_frame(&frame).unwrap();
        let second = converter.convert_frame(&frame).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_zero_width_target_rejected() {
        let converter = converter_with_width(0);
        let result = converter.convert_frame(&create_test_frame(4, 4, 0, 0, 0));
        assert!(matches!(result, Err(GifPlayerError::InvalidDimensions { .. })));
    }
}
