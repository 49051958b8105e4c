//! Typed frames - the per-modality payloads on the stream bus
//!
//! A frame is one unit of payload: one analog buffer, one image, one pose,
//! one log record, one stim declaration. Frames are immutable once built and
//! travel wrapped in `Arc` so fan-out to many subscribers never copies.

use bytes::Bytes;

use crate::error::ProtocolError;
use crate::Result;

/// A named contiguous slice of an analog buffer identifying one channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Span {
    /// Channel name, unique within a frame
    pub name: String,
    /// First sample index, inclusive
    pub begin: u32,
    /// One past the last sample index
    pub end: u32,
}

impl Span {
    /// Build a span
    pub fn new(name: impl Into<String>, begin: u32, end: u32) -> Self {
        Self {
            name: name.into(),
            begin,
            end,
        }
    }

    /// Number of samples covered
    #[inline]
    pub fn len(&self) -> usize {
        (self.end - self.begin) as usize
    }

    /// True when the span covers no samples
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.end == self.begin
    }
}

/// Physical interpretation of analog samples
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[repr(u8)]
pub enum ChannelType {
    /// Voltage samples (the common case)
    #[default]
    Voltage = 0,
    /// Digital event words widened to samples
    Digital = 1,
    /// Dimensionless derived values
    Derived = 2,
}

impl ChannelType {
    /// Wire discriminant
    #[inline]
    pub fn to_u8(self) -> u8 {
        self as u8
    }

    /// Parse a wire discriminant
    pub fn from_u8(value: u8) -> Option<ChannelType> {
        match value {
            0 => Some(ChannelType::Voltage),
            1 => Some(ChannelType::Digital),
            2 => Some(ChannelType::Derived),
            _ => None,
        }
    }
}

/// One multichannel analog buffer
///
/// The invariant `sum(end - begin) == data.len()` and
/// `spans.len() == sample_intervals.len()` holds for every frame anywhere in
/// the system; `AnalogFrame::new` is the only constructor and enforces it.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalogFrame {
    data: Vec<f64>,
    spans: Vec<Span>,
    /// Per-channel sample interval in nanoseconds, parallel to `spans`
    sample_intervals: Vec<u64>,
    channel_type: ChannelType,
    /// Source timestamp in nanoseconds
    time_ns: u64,
}

impl AnalogFrame {
    /// Build a frame, validating the span invariant
    pub fn new(
        data: Vec<f64>,
        spans: Vec<Span>,
        sample_intervals: Vec<u64>,
        channel_type: ChannelType,
        time_ns: u64,
    ) -> Result<Self> {
        if spans.len() != sample_intervals.len() {
            return Err(ProtocolError::IntervalMismatch {
                spans: spans.len(),
                intervals: sample_intervals.len(),
            });
        }
        let mut covered = 0usize;
        for span in &spans {
            if span.begin > span.end || span.end as usize > data.len() {
                return Err(ProtocolError::SpanOutOfBounds {
                    name: span.name.clone(),
                    begin: span.begin,
                    end: span.end,
                });
            }
            covered += span.len();
        }
        if covered != data.len() {
            return Err(ProtocolError::SpanMismatch {
                covered,
                len: data.len(),
            });
        }
        Ok(Self {
            data,
            spans,
            sample_intervals,
            channel_type,
            time_ns,
        })
    }

    /// Convenience constructor for a single-channel frame
    pub fn single_channel(
        name: impl Into<String>,
        data: Vec<f64>,
        sample_interval_ns: u64,
        time_ns: u64,
    ) -> Self {
        let len = data.len() as u32;
        // One span covering the whole buffer always satisfies the invariant.
        Self {
            spans: vec![Span::new(name, 0, len)],
            sample_intervals: vec![sample_interval_ns],
            data,
            channel_type: ChannelType::Voltage,
            time_ns,
        }
    }

    /// A frame with no samples carrying only the channel layout
    pub fn layout_only(&self) -> Self {
        let spans = self
            .spans
            .iter()
            .map(|s| Span::new(s.name.clone(), 0, 0))
            .collect();
        Self {
            data: Vec::new(),
            spans,
            sample_intervals: self.sample_intervals.clone(),
            channel_type: self.channel_type,
            time_ns: self.time_ns,
        }
    }

    /// The whole sample buffer
    #[inline]
    pub fn data(&self) -> &[f64] {
        &self.data
    }

    /// Channel spans
    #[inline]
    pub fn spans(&self) -> &[Span] {
        &self.spans
    }

    /// Per-channel sample intervals in nanoseconds
    #[inline]
    pub fn sample_intervals(&self) -> &[u64] {
        &self.sample_intervals
    }

    /// Channel interpretation
    #[inline]
    pub fn channel_type(&self) -> ChannelType {
        self.channel_type
    }

    /// Source timestamp in nanoseconds
    #[inline]
    pub fn time_ns(&self) -> u64 {
        self.time_ns
    }

    /// Number of channels
    #[inline]
    pub fn num_channels(&self) -> usize {
        self.spans.len()
    }

    /// Samples of one channel by index
    pub fn channel_data(&self, channel: usize) -> Option<&[f64]> {
        let span = self.spans.get(channel)?;
        Some(&self.data[span.begin as usize..span.end as usize])
    }

    /// Samples of one channel by name
    pub fn channel_by_name(&self, name: &str) -> Option<&[f64]> {
        let index = self.spans.iter().position(|s| s.name == name)?;
        self.channel_data(index)
    }

    /// True when two frames share spans and sample intervals
    pub fn same_layout(&self, other: &AnalogFrame) -> bool {
        self.spans.len() == other.spans.len()
            && self.sample_intervals == other.sample_intervals
            && self
                .spans
                .iter()
                .zip(other.spans.iter())
                .all(|(a, b)| a.name == b.name)
    }

    /// Consume the frame, yielding its parts
    pub fn into_parts(self) -> (Vec<f64>, Vec<Span>, Vec<u64>, ChannelType, u64) {
        (
            self.data,
            self.spans,
            self.sample_intervals,
            self.channel_type,
            self.time_ns,
        )
    }
}

/// Pixel layout of an image frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ImageFormat {
    /// Single-plane 8-bit luminance
    Gray = 0,
    /// Single-plane interleaved RGB
    Rgb = 1,
    /// Packed 4:2:2 YUV
    Yuyv422 = 2,
    /// Planar 4:2:0 YUV
    Yuv420p = 3,
    /// Planar 4:2:0 YUV, JPEG range
    Yuvj420p = 4,
}

impl ImageFormat {
    /// Wire discriminant
    #[inline]
    pub fn to_u8(self) -> u8 {
        self as u8
    }

    /// Parse a wire discriminant
    pub fn from_u8(value: u8) -> Option<ImageFormat> {
        match value {
            0 => Some(ImageFormat::Gray),
            1 => Some(ImageFormat::Rgb),
            2 => Some(ImageFormat::Yuyv422),
            3 => Some(ImageFormat::Yuv420p),
            4 => Some(ImageFormat::Yuvj420p),
            _ => None,
        }
    }
}

/// One image, possibly one chunk of a multi-chunk logical frame
///
/// Per-row stride may exceed `width * bytes_per_pixel`; consumers slice rows
/// out of the planes themselves.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageFrame {
    /// Plane byte buffers, zero-copy shared
    pub planes: Vec<Bytes>,
    pub width: u32,
    pub height: u32,
    pub format: ImageFormat,
    /// False while more chunks of the same logical frame follow
    pub last: bool,
    /// Nominal interval between frames in nanoseconds (0 when unknown)
    pub frame_interval_ns: u64,
    /// Source timestamp in nanoseconds
    pub time_ns: u64,
}

/// Highest valid motion segment id
pub const SEGMENT_ID_MAX: u32 = 63;

/// One body segment sample: position plus orientation quaternion
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    /// Body segment id, 1..=63
    pub id: u32,
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub q0: f32,
    pub q1: f32,
    pub q2: f32,
    pub q3: f32,
}

impl Segment {
    /// Validate the segment id range
    pub fn validate(&self) -> Result<()> {
        if self.id == 0 || self.id > SEGMENT_ID_MAX {
            return Err(ProtocolError::SegmentId(self.id));
        }
        Ok(())
    }
}

/// Human name of a body segment id, empty for unnamed slots
pub fn segment_name(id: u32) -> &'static str {
    const NAMES: [&str; 24] = [
        "pelvis",
        "l5",
        "l3",
        "t12",
        "t8",
        "neck",
        "head",
        "right shoulder",
        "right upper arm",
        "right forearm",
        "right hand",
        "left shoulder",
        "left upper arm",
        "left forearm",
        "left hand",
        "right upper leg",
        "right lower leg",
        "right foot",
        "right toe",
        "left upper leg",
        "left lower leg",
        "left foot",
        "left toe",
        "prop",
    ];
    if id == 0 {
        return "";
    }
    NAMES.get(id as usize - 1).copied().unwrap_or("")
}

/// One motion-capture pose frame
#[derive(Debug, Clone, PartialEq)]
pub struct MotionFrame {
    /// Pose identifier from the capture device
    pub pose_name: String,
    pub segments: Vec<Segment>,
    /// Source timestamp in nanoseconds
    pub time_ns: u64,
}

/// One log record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextFrame {
    pub text: String,
    /// Record timestamp in nanoseconds
    pub time_ns: u64,
}

impl TextFrame {
    /// Build a record
    pub fn new(text: impl Into<String>, time_ns: u64) -> Self {
        Self {
            text: text.into(),
            time_ns,
        }
    }
}

/// A stimulation declaration: analog waveform to play on trigger
///
/// Arming is declarative and triggering explicit; the declaration frame is
/// identical in shape to an analog frame.
#[derive(Debug, Clone, PartialEq)]
pub struct StimDeclaration {
    /// The waveform played when the declaration is triggered
    pub data: AnalogFrame,
}
