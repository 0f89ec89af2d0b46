use crate::converter::{convert_all, AsciiFrame, FrameConverter};
use crate::decoder::FrameSource;
use crate::renderer::Renderer;
use crate::{GifPlayerError, Result};
use log::{debug, error, info};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::sleep;

/// Converted frames paired with their display durations. Immutable once built.
#[derive(Debug, Clone)]
pub struct AnimationSequence {
    entries: Vec<(AsciiFrame, Duration)>,
}

impl AnimationSequence {
    /// Pair frames with durations in milliseconds
    pub fn new(frames: Vec<AsciiFrame>, durations_ms: &[u64]) -> Result<Self> {
        if frames.len() != durations_ms.len() {
            return Err(GifPlayerError::SequenceMismatch {
                frames: frames.len(),
                durations: durations_ms.len(),
            });
        }
        if frames.is_empty() {
            return Err(GifPlayerError::EmptyAnimation);
        }

        let entries = frames
            .into_iter()
            .zip(durations_ms.iter().map(|&ms| Duration::from_millis(ms)))
            .collect();
        Ok(Self { entries })
    }

    /// Convert every frame of `source` and pair it with the source's durations
    pub fn from_source<S: FrameSource + ?Sized>(source: &S, converter: &FrameConverter) -> Result<Self> {
        let frames = convert_all(source, converter)?;
        Self::new(frames, source.frame_durations())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Frames and durations in playback order
    pub fn iter(&self) -> impl Iterator<Item = (&AsciiFrame, Duration)> {
        self.entries.iter().map(|(frame, duration)| (frame, *duration))
    }

    /// Length of one loop cycle
    pub fn cycle_duration(&self) -> Duration {
        self.entries.iter().map(|(_, duration)| *duration).sum()
    }
}

/// Where the player is within a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackPhase {
    /// Handing the frame to the renderer
    Rendering,
    /// Holding the frame for its duration
    Waiting,
}

/// What happened during a call to `AnimationPlayer::play`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlaybackSummary {
    pub frames_rendered: u64,
    pub cycles_completed: u64,
    /// Phase in which the stop signal was observed, `None` if playback ran out of cycles
    pub stopped_in: Option<PlaybackPhase>,
}

/// Cloneable handle used to end playback from outside the loop
#[derive(Debug, Clone)]
pub struct StopSignal {
    tx: Arc<watch::Sender<bool>>,
    rx: watch::Receiver<bool>,
}

impl StopSignal {
    pub fn new() -> Self {
        let (tx, rx) = watch::channel(false);
        Self { tx: Arc::new(tx), rx }
    }

    /// Request a stop. Calling it more than once has no further effect.
    pub fn stop(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_stopped(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once `stop` has been called
    pub async fn stopped(&self) {
        let mut rx = self.rx.clone();
        // The sender lives as long as `self`, so this only returns once stopped
        let _ = rx.wait_for(|stopped| *stopped).await;
    }
}

impl Default for StopSignal {
    fn default() -> Self {
        Self::new()
    }
}

/// Loops an `AnimationSequence` against a renderer
pub struct AnimationPlayer {
    sequence: AnimationSequence,
    max_cycles: Option<u64>,
}

impl AnimationPlayer {
    pub fn new(sequence: AnimationSequence) -> Self {
        Self {
            sequence,
            max_cycles: None,
        }
    }

    /// Stop after `cycles` full loops. `None` loops until stopped.
    pub fn with_max_cycles(mut self, cycles: Option<u64>) -> Self {
        self.max_cycles = cycles;
        self
    }

    pub fn sequence(&self) -> &AnimationSequence {
        &self.sequence
    }

    /// Render each frame, then wait for its duration, wrapping around after the last one.
    ///
    /// Returns when `stop` fires or the cycle limit is reached. A render error aborts
    /// playback and is returned as is.
    pub async fn play<R: Renderer + ?Sized>(
        &self,
        renderer: &mut R,
        stop: &StopSignal,
    ) -> Result<PlaybackSummary> {
        let mut summary = PlaybackSummary::default();
        info!(
            "Starting playback: {} frames, {}ms per cycle",
            self.sequence.len(),
            self.sequence.cycle_duration().as_millis()
        );

        if self.max_cycles == Some(0) {
            return Ok(self.finish(summary, None));
        }

        loop {
            for (index, (frame, duration)) in self.sequence.iter().enumerate() {
                if stop.is_stopped() {
                    return Ok(self.finish(summary, Some(PlaybackPhase::Rendering)));
                }

                debug!("Frame {}: {:?}", index, PlaybackPhase::Rendering);
                if let Err(e) = renderer.render(frame) {
                    error!("Render failed at frame {}: {}", index, e);
                    return Err(e);
                }
                summary.frames_rendered += 1;

                debug!("Frame {}: {:?} {}ms", index, PlaybackPhase::Waiting, duration.as_millis());
                tokio::select! {
                    biased;
                    _ = stop.stopped() => {
                        return Ok(self.finish(summary, Some(PlaybackPhase::Waiting)));
                    }
                    _ = sleep(duration) => {}
                }
            }

            summary.cycles_completed += 1;
            if self.max_cycles.is_some_and(|max| summary.cycles_completed >= max) {
                return Ok(self.finish(summary, None));
            }
        }
    }

    fn finish(&self, mut summary: PlaybackSummary, stopped_in: Option<PlaybackPhase>) -> PlaybackSummary {
        summary.stopped_in = stopped_in;
        info!(
            "Playback finished: {} frames, {} cycles{}",
            summary.frames_rendered,
            summary.cycles_completed,
            if stopped_in.is_some() { " (stopped)" } else { "" }
        );
        summary
    }
}
