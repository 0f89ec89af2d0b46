use crate::converter::AsciiFrame;
use crate::Result;
use crossterm::{
    cursor::{Hide, MoveTo, Show},
    execute, queue,
    style::Print,
    terminal::{Clear, ClearType},
};
use log::debug;
use std::io::{stdout, Stdout, Write};
use std::time::Instant;

/// Output sink for ASCII frames.
///
/// Calls arrive strictly in playback order, one at a time. An error aborts playback.
pub trait Renderer {
    /// Draw one frame
    fn render(&mut self, frame: &AsciiFrame) -> Result<()>;
}

impl<R: Renderer + ?Sized> Renderer for &mut R {
    fn render(&mut self, frame: &AsciiFrame) -> Result<()> {
        (**self).render(frame)
    }
}

/// Terminal renderer: clears the screen, then draws the frame from the top-left corner
pub struct ConsoleRenderer<W: Write = Stdout> {
    out: W,
    initialized: bool,
}

impl ConsoleRenderer<Stdout> {
    /// Renderer writing to standard output
    pub fn stdout() -> Self {
        Self::new(stdout())
    }
}

impl<W: Write> ConsoleRenderer<W> {
    /// Create a renderer over any writer
    pub fn new(out: W) -> Self {
        Self {
            out,
            initialized: false,
        }
    }

    /// Prepare the terminal for rendering
    pub fn init(&mut self) -> Result<()> {
        execute!(self.out, Hide, Clear(ClearType::All))?;
        self.initialized = true;
        debug!("Terminal initialized for rendering");
        Ok(())
    }

    /// Restore the terminal to its normal state
    pub fn cleanup(&mut self) -> Result<()> {
        if self.initialized {
            execute!(self.out, Show)?;
            self.initialized = false;
            debug!("Terminal restored to normal state");
        }
        Ok(())
    }

    /// The underlying writer
    pub fn get_ref(&self) -> &W {
        &self.out
    }
}

impl<W: Write> Renderer for ConsoleRenderer<W> {
    fn render(&mut self, frame: &AsciiFrame) -> Result<()> {
        let start_time = Instant::now();

        queue!(self.out, Clear(ClearType::All))?;
        for (row, line) in frame.lines().enumerate() {
            queue!(self.out, MoveTo(0, row as u16), Print(line))?;
        }
        queue!(self.out, MoveTo(0, frame.height() as u16))?;
        self.out.flush()?;

        debug!(
            "Frame rendered in {}ms ({}x{})",
            start_time.elapsed().as_millis(),
            frame.width(),
            frame.height()
        );
        Ok(())
    }
}

impl<W: Write> Drop for ConsoleRenderer<W> {
    fn drop(&mut self) {
        // Ensure terminal is restored on drop
        let _ = self.cleanup();
    }
}

/// Renderer that discards frames, counting them
#[derive(Debug, Default)]
pub struct NullRenderer {
    frames_rendered: u64,
}

impl NullRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of frames received so far
    pub fn frames_rendered(&self) -> u64 {
        self.frames_rendered
    }
}

impl Renderer for NullRenderer {
    fn render(&mut self, _frame: &AsciiFrame) -> Result<()> {
        self.frames_rendered += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::converter::{Charset, ConversionConfig, FrameConverter};
    use crate::ResizeFilter;
    use image::{Rgba, RgbaImage};

    fn create_test_frame() -> AsciiFrame {
        let converter = FrameConverter::new(ConversionConfig {
            width: 4,
            charset: Charset::new(" #").unwrap(),
            filter: ResizeFilter::Nearest,
            ..Default::default()
        });
        let raster = RgbaImage::from_fn(4, 4, |x, _| {
            if x < 2 {
                Rgba([0, 0, 0, 255])
            } else {
                Rgba([255, 255, 255, 255])
            }
        });
        converter.convert_frame(&raster).unwrap()
    }

    #[test]
    fn test_console_render_clears_then_writes() {
        let frame = create_test_frame();
        let mut renderer = ConsoleRenderer::new(Vec::new());
        renderer.render(&frame).unwrap();

        let output = String::from_utf8(renderer.get_ref().clone()).unwrap();
        let clear_at = output.find("\x1b[2J").expect("screen clear");
        let text_at = output.find("  ##").expect("frame line");
        assert!(clear_at < text_at);
        assert_eq!(output.matches("  ##").count(), 2);
    }

    #[test]
    fn test_init_and_cleanup_toggle_cursor() {
        let mut renderer = ConsoleRenderer::new(Vec::new());
        renderer.init().unwrap();
        renderer.cleanup().unwrap();
        // Second cleanup is a no-op
        renderer.cleanup().unwrap();

        let output = String::from_utf8(renderer.get_ref().clone()).unwrap();
        assert_eq!(output.matches("\x1b[?25l").count(), 1);
        assert_eq!(output.matches("\x1b[?25h").count(), 1);
    }

    #[test]
    fn test_null_renderer_counts() {
        let frame = create_test_frame();
        let mut renderer = NullRenderer::new();
        renderer.render(&frame).unwrap();
        renderer.render(&frame).unwrap();
        assert_eq!(renderer.frames_rendered(), 2);
    }
}
