//! Video capture buffer
//!
//! Frames are appended in RGB order while stepping and handed to a sink on an
//! explicit `generate` call. Channel order is converted to the sink's order
//! once, at flush time, on copies; captured frames are never modified.

use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use image::codecs::gif::{GifEncoder, Repeat};
use image::{Delay, DynamicImage, RgbImage};
use ndarray::s;
use tracing::info;

use crate::error::{EnvError, Result};
use crate::observation::Frame;

pub const DEFAULT_FPS: u32 = 60;

/// Error raised by a video sink
#[derive(Debug, thiserror::Error)]
pub enum VideoError {
    #[error("Failed to encode video: {0}")]
    Encode(String),
    #[error(transparent)]
    Image(#[from] image::ImageError),
    #[error("Video I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Pixel channel order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelOrder {
    Rgb,
    Bgr,
}

/// Destination for captured frames
pub trait VideoSink {
    /// Channel order the sink expects its input in
    fn channel_order(&self) -> ChannelOrder;

    /// Encode all frames to `path`
    fn write(&mut self, path: &Path, frames: &[Frame], fps: u32)
        -> std::result::Result<(), VideoError>;
}

/// Animated GIF sink
#[derive(Debug, Clone, Copy)]
pub struct GifSink {
    /// Encoder speed in 1..=30; higher is faster with a coarser palette
    pub speed: i32,
}

impl Default for GifSink {
    fn default() -> Self {
        Self { speed: 10 }
    }
}

impl VideoSink for GifSink {
    fn channel_order(&self) -> ChannelOrder {
        ChannelOrder::Rgb
    }

    fn write(
        &mut self,
        path: &Path,
        frames: &[Frame],
        fps: u32,
    ) -> std::result::Result<(), VideoError> {
        let file = BufWriter::new(File::create(path)?);
        let mut encoder = GifEncoder::new_with_speed(file, self.speed);
        encoder.set_repeat(Repeat::Infinite)?;
        let delay = Delay::from_numer_denom_ms(1000, fps.max(1));

        for frame in frames {
            let (height, width, _) = frame.dim();
            let raw: Vec<u8> = frame.iter().copied().collect();
            let rgb = RgbImage::from_raw(width as u32, height as u32, raw).ok_or_else(|| {
                VideoError::Encode(format!("frame buffer does not fit {width}x{height}"))
            })?;
            let rgba = DynamicImage::ImageRgb8(rgb).into_rgba8();
            encoder.encode_frame(image::Frame::from_parts(rgba, 0, 0, delay))?;
        }
        Ok(())
    }
}

/// Ordered, append-only frame buffer
///
/// Grows without bound while enabled; callers disable or flush to bound
/// memory.
#[derive(Debug, Clone)]
pub struct VideoRecorder {
    enabled: bool,
    frames: Vec<Frame>,
    fps: u32,
}

impl Default for VideoRecorder {
    fn default() -> Self {
        Self::new(DEFAULT_FPS)
    }
}

impl VideoRecorder {
    pub fn new(fps: u32) -> Self {
        Self {
            enabled: false,
            frames: Vec::new(),
            fps,
        }
    }

    /// Start capturing, discarding frames from any earlier recording
    pub fn enable(&mut self) {
        self.frames.clear();
        self.enabled = true;
    }

    pub fn disable(&mut self) {
        self.enabled = false;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Append a frame if capture is enabled
    pub fn capture(&mut self, frame: Frame) {
        if self.enabled {
            self.frames.push(frame);
        }
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Flush captured frames to `directory/filename` through `sink`
    ///
    /// Creates `directory` if needed and returns the written path.
    pub fn generate(
        &self,
        directory: impl AsRef<Path>,
        filename: &str,
        sink: &mut dyn VideoSink,
    ) -> Result<PathBuf> {
        if self.frames.is_empty() {
            return Err(EnvError::NoFramesCaptured);
        }
        self.validate()?;

        let directory = directory.as_ref();
        fs::create_dir_all(directory)?;
        let path = directory.join(filename);

        let order = sink.channel_order();
        let converted;
        let frames: &[Frame] = match order {
            ChannelOrder::Rgb => &self.frames,
            ChannelOrder::Bgr => {
                converted = self.frames.iter().map(reverse_channels).collect::<Vec<_>>();
                &converted
            }
        };
        sink.write(&path, frames, self.fps)?;

        info!(
            path = %path.display(),
            frames = self.frames.len(),
            fps = self.fps,
            "Video generated"
        );
        Ok(path)
    }

    fn validate(&self) -> Result<()> {
        let (height, width, _) = self.frames[0].dim();
        for (index, frame) in self.frames.iter().enumerate() {
            let (h, w, c) = frame.dim();
            let reason = if c != 3 {
                Some(format!("expected 3 color channels, got {c}"))
            } else if h == 0 || w == 0 {
                Some(format!("empty frame {h}x{w}"))
            } else if (h, w) != (height, width) {
                Some(format!(
                    "frame is {h}x{w} but the video is {height}x{width}"
                ))
            } else {
                None
            };
            if let Some(reason) = reason {
                return Err(EnvError::InvalidFrame { index, reason });
            }
        }
        Ok(())
    }
}

fn reverse_channels(frame: &Frame) -> Frame {
    frame
        .slice(s![.., .., ..;-1])
        .as_standard_layout()
        .into_owned()
}
