//! Audio samples and their optional presentation capabilities.
//!
//! Playback and spectrogram rendering are delegated to injected
//! [`AudioSink`] / [`SpectrogramRenderer`] implementations. A sample without
//! them still catalogs and filters normally; `play` / `plot` just log a warning.

use std::fmt;
use std::sync::Arc;

use log::warn;
use serde::{Deserialize, Serialize};

use crate::data::model::Meta;
use crate::data::sample::Sample;
use crate::error::{CorpusError, CorpusResult};

// ---------------------------------------------------------------------------
// AudioData – frames × channels
// ---------------------------------------------------------------------------

/// A (possibly multichannel) signal stored frame-major: one column per channel.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioData {
    samples: Vec<f64>,
    channels: usize,
}

impl AudioData {
    /// A single-channel signal.
    pub fn mono(samples: Vec<f64>) -> Self {
        Self {
            samples,
            channels: 1,
        }
    }

    /// Interleaved samples (`[f0c0, f0c1, f1c0, ...]`).
    pub fn interleaved(samples: Vec<f64>, channels: usize) -> CorpusResult<Self> {
        if channels == 0 {
            return Err(CorpusError::InvalidPayload(
                "channel count must be at least 1".into(),
            ));
        }
        if samples.len() % channels != 0 {
            return Err(CorpusError::InvalidPayload(format!(
                "{} samples do not split into {channels} channels",
                samples.len()
            )));
        }
        Ok(Self { samples, channels })
    }

    /// One row per frame, one column per channel. All rows must have the same width.
    pub fn from_frames(frames: Vec<Vec<f64>>) -> CorpusResult<Self> {
        let channels = frames.first().map_or(1, Vec::len);
        if channels == 0 {
            return Err(CorpusError::InvalidPayload("frames have no channels".into()));
        }
        let mut samples = Vec::with_capacity(frames.len() * channels);
        for (i, frame) in frames.into_iter().enumerate() {
            if frame.len() != channels {
                return Err(CorpusError::InvalidPayload(format!(
                    "frame {i} has {} channels, expected {channels}",
                    frame.len()
                )));
            }
            samples.extend(frame);
        }
        Ok(Self { samples, channels })
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Number of frames (rows).
    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels
    }

    pub fn is_mono(&self) -> bool {
        self.channels == 1
    }

    /// Raw interleaved samples.
    pub fn as_interleaved(&self) -> &[f64] {
        &self.samples
    }

    /// The column for channel `c` (0-based), if it exists.
    pub fn channel(&self, c: usize) -> Option<Vec<f64>> {
        if c >= self.channels {
            return None;
        }
        Some(
            self.samples
                .iter()
                .skip(c)
                .step_by(self.channels)
                .copied()
                .collect(),
        )
    }

    /// Every channel as its own column. A mono signal yields exactly one.
    pub fn per_channel(&self) -> Vec<Vec<f64>> {
        (0..self.channels)
            .filter_map(|c| self.channel(c))
            .collect()
    }

    pub fn duration_secs(&self, rate: u32) -> f64 {
        if rate == 0 {
            return 0.0;
        }
        self.frames() as f64 / f64::from(rate)
    }
}

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// Passed through to the [`AudioSink`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackOptions {
    /// Wait for playback to finish before returning.
    pub blocking: bool,
    /// Output device name; `None` selects the sink's default.
    pub device: Option<String>,
    pub looped: bool,
}

/// Spectrogram parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlotOptions {
    /// FFT window length in samples.
    pub nfft: usize,
    /// Samples shared by consecutive windows; must be below `nfft`.
    pub noverlap: usize,
    pub colormap: Option<String>,
}

impl Default for PlotOptions {
    fn default() -> Self {
        Self {
            nfft: 512,
            noverlap: 384,
            colormap: None,
        }
    }
}

impl PlotOptions {
    pub fn validate(&self) -> CorpusResult<()> {
        if self.nfft == 0 {
            return Err(CorpusError::InvalidPlotOptions("nfft must be positive".into()));
        }
        if self.noverlap >= self.nfft {
            return Err(CorpusError::InvalidPlotOptions(format!(
                "noverlap ({}) must be smaller than nfft ({})",
                self.noverlap, self.nfft
            )));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Capabilities
// ---------------------------------------------------------------------------

/// Plays a signal on some output device.
pub trait AudioSink: Send + Sync {
    fn play(&self, data: &AudioData, rate: u32, options: &PlaybackOptions) -> anyhow::Result<()>;
}

/// One spectrogram subplot: a single channel and where it goes on the grid.
#[derive(Debug, Clone, PartialEq)]
pub struct SpectrogramPanel<'a> {
    /// 0-based channel index.
    pub channel: usize,
    pub samples: &'a [f64],
    pub row: usize,
    pub col: usize,
    pub rows: usize,
    pub cols: usize,
    pub title: String,
    pub x_label: &'static str,
    pub y_label: &'static str,
}

/// Draws spectrograms.
pub trait SpectrogramRenderer: Send + Sync {
    fn render(
        &self,
        panel: &SpectrogramPanel<'_>,
        rate: u32,
        options: &PlotOptions,
    ) -> anyhow::Result<()>;
}

/// Near-square `(rows, cols)` grid for `n` panels.
pub fn panel_grid(n: usize) -> (usize, usize) {
    if n == 0 {
        return (0, 0);
    }
    let cols = (n as f64).sqrt().ceil() as usize;
    let rows = n.div_ceil(cols);
    (rows, cols)
}

// ---------------------------------------------------------------------------
// AudioSample
// ---------------------------------------------------------------------------

/// An audio signal with its sample rate and metadata.
#[derive(Clone)]
pub struct AudioSample {
    data: AudioData,
    rate: u32,
    meta: Meta,
    sink: Option<Arc<dyn AudioSink>>,
    renderer: Option<Arc<dyn SpectrogramRenderer>>,
}

impl AudioSample {
    pub fn new(data: AudioData, rate: u32, meta: Meta) -> Self {
        Self {
            data,
            rate,
            meta,
            sink: None,
            renderer: None,
        }
    }

    pub fn with_sink(mut self, sink: Arc<dyn AudioSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn with_renderer(mut self, renderer: Arc<dyn SpectrogramRenderer>) -> Self {
        self.renderer = Some(renderer);
        self
    }

    pub fn data(&self) -> &AudioData {
        &self.data
    }

    /// Sampling frequency in Hz.
    pub fn rate(&self) -> u32 {
        self.rate
    }

    pub fn duration_secs(&self) -> f64 {
        self.data.duration_secs(self.rate)
    }

    /// Play the sample, or warn if that is not possible.
    pub fn play(&self, options: &PlaybackOptions) {
        if let Err(e) = self.try_play(options) {
            warn!("Skipping playback: {e}");
        }
    }

    pub fn try_play(&self, options: &PlaybackOptions) -> CorpusResult<()> {
        let sink = self.sink.as_ref().ok_or(CorpusError::CapabilityUnavailable {
            capability: "audio playback",
        })?;
        sink.play(&self.data, self.rate, options)
            .map_err(|e| CorpusError::CapabilityFailed {
                capability: "audio playback",
                reason: format!("{e:#}"),
            })
    }

    /// Render one spectrogram per channel, or warn if that is not possible.
    pub fn plot(&self, options: &PlotOptions) {
        if let Err(e) = self.try_plot(options) {
            warn!("Skipping spectrogram: {e}");
        }
    }

    pub fn try_plot(&self, options: &PlotOptions) -> CorpusResult<()> {
        let renderer = self
            .renderer
            .as_ref()
            .ok_or(CorpusError::CapabilityUnavailable {
                capability: "spectrogram plotting",
            })?;
        options.validate()?;

        let columns = self.data.per_channel();
        let (rows, cols) = panel_grid(columns.len());
        for (c, column) in columns.iter().enumerate() {
            let panel = SpectrogramPanel {
                channel: c,
                samples: column,
                row: c / cols,
                col: c % cols,
                rows,
                cols,
                title: format!("Channel {}", c + 1),
                x_label: "Time [s]",
                y_label: "Frequency [Hz]",
            };
            renderer
                .render(&panel, self.rate, options)
                .map_err(|e| CorpusError::CapabilityFailed {
                    capability: "spectrogram plotting",
                    reason: format!("{e:#}"),
                })?;
        }
        Ok(())
    }
}

impl Sample for AudioSample {
    fn meta(&self) -> &Meta {
        &self.meta
    }
}

impl fmt::Debug for AudioSample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AudioSample")
            .field("data", &self.data)
            .field("rate", &self.rate)
            .field("meta", &self.meta)
            .field("sink", &self.sink.is_some())
            .field("renderer", &self.renderer.is_some())
            .finish()
    }
}

impl fmt::Display for AudioSample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Data : {} frames x {} channel(s) @ {} Hz ({:.3} s)",
            self.data.frames(),
            self.data.channels(),
            self.rate,
            self.duration_secs()
        )?;
        write!(f, "{}", self.meta)
    }
}
