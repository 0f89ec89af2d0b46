use crate::{GifPlayerError, Result, DEFAULT_FRAME_DURATION_MS};
use image::codecs::gif::GifDecoder;
use image::io::Reader as ImageReader;
use image::{AnimationDecoder, Delay, ImageDecoder, ImageError, ImageFormat, RgbaImage};
use log::{debug, info, warn};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::time::Duration;

/// One decoded, fully composited frame
pub type RasterFrame = RgbaImage;

/// Which containers `DecodedSource::open` accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FormatPolicy {
    /// Only GIF files are accepted
    StrictGif,
    /// GIFs play as animations, any other image the codec can read plays as a single frame
    #[default]
    AnyImage,
}

/// Capability of a decoded animation: metadata plus random access to frames
pub trait FrameSource {
    /// Number of frames
    fn frame_count(&self) -> usize;

    /// Pixel dimensions `(width, height)`
    fn size(&self) -> (u32, u32);

    /// Display time of each frame in milliseconds, indexed like the frames
    fn frame_durations(&self) -> &[u64];

    /// Fetch frame `index`
    fn frame(&self, index: usize) -> Result<&RasterFrame>;
}

/// An animation decoded into memory
#[derive(Debug, Clone)]
pub struct DecodedSource {
    frames: Vec<RasterFrame>,
    durations: Vec<u64>,
    width: u32,
    height: u32,
}

impl DecodedSource {
    /// Open and decode an image file
    pub fn open(path: &Path, policy: FormatPolicy) -> Result<Self> {
        debug!("Attempting to open image file: {}", path.display());
        let open_error = |source: ImageError| GifPlayerError::Open {
            path: path.to_path_buf(),
            source,
        };

        let reader = ImageReader::open(path)
            .and_then(|reader| reader.with_guessed_format())
            .map_err(|e| open_error(ImageError::IoError(e)))?;

        let source = match reader.format() {
            // Format sniffing rewinds the reader, so the GIF decoder starts at the header
            Some(ImageFormat::Gif) => Self::decode_gif(reader.into_inner(), path)?,
            other if policy == FormatPolicy::StrictGif => {
                let format = other
                    .map(|f| format!("{:?}", f))
                    .unwrap_or_else(|| "unknown".to_string());
                return Err(GifPlayerError::UnsupportedFormat {
                    path: path.to_path_buf(),
                    format,
                });
            }
            other => {
                debug!("Decoding {:?} as a still image", other);
                let still = reader.decode().map_err(open_error)?.to_rgba8();
                Self::from_frames(vec![still], vec![None])?
            }
        };

        info!(
            "Opened '{}': {}x{}, {} frames, {:.2}s per cycle",
            path.display(),
            source.width,
            source.height,
            source.frames.len(),
            source.total_duration().as_secs_f64()
        );
        Ok(source)
    }

    /// Build a source from already decoded frames.
    ///
    /// A duration of `None` stands for missing metadata and becomes
    /// `DEFAULT_FRAME_DURATION_MS`. All frames must share the first frame's size.
    pub fn from_frames(frames: Vec<RasterFrame>, durations: Vec<Option<u64>>) -> Result<Self> {
        if frames.len() != durations.len() {
            return Err(GifPlayerError::SequenceMismatch {
                frames: frames.len(),
                durations: durations.len(),
            });
        }
        let (width, height) = frames
            .first()
            .map(|frame| frame.dimensions())
            .ok_or(GifPlayerError::EmptyAnimation)?;
        if width == 0 || height == 0 {
            return Err(GifPlayerError::InvalidDimensions { width, height });
        }
        if let Some(odd) = frames.iter().find(|f| f.dimensions() != (width, height)) {
            let (width, height) = odd.dimensions();
            return Err(GifPlayerError::InvalidDimensions { width, height });
        }

        let missing = durations.iter().filter(|d| d.is_none()).count();
        if missing > 0 {
            warn!(
                "{} of {} frames have no duration, using {}ms",
                missing,
                durations.len(),
                DEFAULT_FRAME_DURATION_MS
            );
        }
        let durations = durations
            .into_iter()
            .map(|d| d.unwrap_or(DEFAULT_FRAME_DURATION_MS))
            .collect();

        Ok(Self {
            frames,
            durations,
            width,
            height,
        })
    }

    fn decode_gif(reader: BufReader<File>, path: &Path) -> Result<Self> {
        let open_error = |source: ImageError| GifPlayerError::Open {
            path: path.to_path_buf(),
            source,
        };
        let decoder = GifDecoder::new(reader).map_err(open_error)?;
        let (width, height) = decoder.dimensions();
        debug!("GIF logical screen: {}x{}", width, height);

        let mut frames = Vec::new();
        let mut durations = Vec::new();
        for frame in decoder.into_frames() {
            let frame = frame.map_err(open_error)?;
            durations.push(delay_to_ms(frame.delay()));
            frames.push(frame.into_buffer());
        }

        Self::from_frames(frames, durations)
    }

    /// Sum of all frame durations, i.e. the length of one loop cycle
    pub fn total_duration(&self) -> Duration {
        Duration::from_millis(self.durations.iter().sum())
    }
}

impl FrameSource for DecodedSource {
    fn frame_count(&self) -> usize {
        self.frames.len()
    }

    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn frame_durations(&self) -> &[u64] {
        &self.durations
    }

    fn frame(&self, index: usize) -> Result<&RasterFrame> {
        self.frames.get(index).ok_or(GifPlayerError::IndexOutOfRange {
            index,
            count: self.frames.len(),
        })
    }
}

/// GIF stores "no delay" as zero, which is treated as missing metadata
fn delay_to_ms(delay: Delay) -> Option<u64> {
    let (numer, denom) = delay.numer_denom_ms();
    if denom == 0 {
        return None;
    }
    let ms = (numer as u64 + denom as u64 / 2) / denom as u64;
    (ms > 0).then_some(ms)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;
    use std::path::PathBuf;

    fn solid(width: u32, height: u32, value: u8) -> RasterFrame {
        RgbaImage::from_pixel(width, height, Rgba([value, value, value, 255]))
    }

    #[test]
    fn test_invalid_file() {
        let invalid_path = PathBuf::from("nonexistent.gif");
        let result = DecodedSource::open(&invalid_path, FormatPolicy::AnyImage);
        assert!(matches!(result, Err(GifPlayerError::Open { .. })));
    }

    #[test]
    fn test_missing_durations_default() {
        let source = DecodedSource::from_frames(
            vec![solid(2, 2, 0), solid(2, 2, 255)],
            vec![Some(40), None],
        )
        .unwrap();
        assert_eq!(source.frame_durations(), &[40, DEFAULT_FRAME_DURATION_MS]);
        assert_eq!(source.total_duration(), Duration::from_millis(140));
    }

    #[test]
    fn test_frame_index_out_of_range() {
        let source = DecodedSource::from_frames(vec![solid(3, 1, 0)], vec![Some(10)]).unwrap();
        assert_eq!(source.size(), (3, 1));
        assert!(source.frame(0).is_ok());
        assert!(matches!(
            source.frame(1),
            Err(GifPlayerError::IndexOutOfRange { index: 1, count: 1 })
        ));
    }

    #[test]
    fn test_empty_and_mismatched_sources() {
        assert!(matches!(
            DecodedSource::from_frames(Vec::new(), Vec::new()),
            Err(GifPlayerError::EmptyAnimation)
        ));
        assert!(matches!(
            DecodedSource::from_frames(vec![solid(1, 1, 0)], vec![]),
            Err(GifPlayerError::SequenceMismatch { frames: 1, durations: 0 })
        ));
        assert!(matches!(
            DecodedSource::from_frames(vec![solid(2, 2, 0), solid(3, 2, 0)], vec![None, None]),
            Err(GifPlayerError::InvalidDimensions { width: 3, height: 2 })
        ));
    }

    #[test]
    fn test_delay_conversion() {
        assert_eq!(delay_to_ms(Delay::from_numer_denom_ms(50, 1)), Some(50));
        assert_eq!(delay_to_ms(Delay::from_numer_denom_ms(0, 1)), None);
        assert_eq!(delay_to_ms(Delay::from_numer_denom_ms(200, 3)), Some(67));
    }
}
