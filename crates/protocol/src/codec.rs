//! Wire codec for the RPC surface
//!
//! All messages are length-prefixed:
//! ```text
//! ┌──────────────┬─────────┬──────────────────────────┐
//! │ 4 bytes      │ 1 byte  │ N-1 bytes                │
//! │ length (BE)  │ tag     │ payload                  │
//! └──────────────┴─────────┴──────────────────────────┘
//! ```
//!
//! The first client message on a connection selects the endpoint; the server
//! streams responses until the call completes or either side closes. The
//! format is deliberately simple binary rather than a Rust-specific
//! serialization so non-Rust clients can speak it.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::ProtocolError;
use crate::frame::{
    AnalogFrame, ChannelType, ImageFormat, ImageFrame, MotionFrame, Segment, Span,
    StimDeclaration, TextFrame,
};
use crate::message::{
    AnalogRequest, GraphRequest, GraphResponse, ImageRequest, InjectAnalogRequest, NodeRequest,
    NodeResponse, NodeSelector, ObservableAction, ObservableChange, ObservableTransaction,
    ReplayRequest, SpectrogramChannel, SpectrogramRequest, SpectrogramResponse, StimRequest,
};
use crate::modality::{Modality, ModalitySet};
use crate::{Result, MAX_MESSAGE_SIZE};

// Client → server tags
const MSG_GET_MODALITIES: u8 = 0x01;
const MSG_CHANNEL_INFO: u8 = 0x02;
const MSG_GRAPH: u8 = 0x03;
const MSG_SPECTROGRAM: u8 = 0x04;
const MSG_IMAGE: u8 = 0x05;
const MSG_XSENS: u8 = 0x06;
const MSG_LOG: u8 = 0x07;
const MSG_LOGOUT: u8 = 0x08;
const MSG_INJECT_ANALOG: u8 = 0x09;
const MSG_STIM: u8 = 0x0a;
const MSG_NODE_REQUEST: u8 = 0x0b;
const MSG_NODE_REQUEST_STREAM: u8 = 0x0c;
const MSG_REPLAY: u8 = 0x0d;
const MSG_GET_TYPE_NAME: u8 = 0x0e;
const MSG_OBSERVABLE_BRIDGE: u8 = 0x0f;

// Server → client tags
const MSG_MODALITIES: u8 = 0x81;
const MSG_ANALOG: u8 = 0x82;
const MSG_GRAPH_RESPONSE: u8 = 0x83;
const MSG_SPECTROGRAM_RESPONSE: u8 = 0x84;
const MSG_IMAGE_RESPONSE: u8 = 0x85;
const MSG_XSENS_RESPONSE: u8 = 0x86;
const MSG_TEXT: u8 = 0x87;
const MSG_NODE_RESPONSE: u8 = 0x88;
const MSG_TYPE_NAME: u8 = 0x89;
const MSG_TRANSACTION: u8 = 0x8a;
const MSG_EMPTY: u8 = 0x8b;
const MSG_ERROR: u8 = 0x8c;
const MSG_UNAVAILABLE: u8 = 0x8d;

// One-of discriminants for InjectAnalogRequest
const INJECT_NODE: u8 = 0;
const INJECT_SIGNAL: u8 = 1;

// One-of discriminants for StimRequest
const STIM_NODE: u8 = 0;
const STIM_ARM: u8 = 1;
const STIM_TRIGGER: u8 = 2;

/// Messages sent by clients
#[derive(Debug, Clone, PartialEq)]
pub enum ClientMessage {
    GetModalities(NodeSelector),
    ChannelInfo(AnalogRequest),
    Graph(GraphRequest),
    Spectrogram(SpectrogramRequest),
    Image(ImageRequest),
    Xsens(NodeSelector),
    Log(TextFrame),
    Logout,
    InjectAnalog(InjectAnalogRequest),
    Stim(StimRequest),
    NodeRequest(NodeRequest),
    NodeRequestStream(NodeRequest),
    Replay(ReplayRequest),
    GetTypeName(String),
    ObservableBridge(ObservableTransaction),
}

/// Messages sent by the server
#[derive(Debug, Clone, PartialEq)]
pub enum ServerMessage {
    Modalities(ModalitySet),
    Analog(AnalogFrame),
    Graph(GraphResponse),
    Spectrogram(SpectrogramResponse),
    Image(ImageFrame),
    Xsens(MotionFrame),
    Text(TextFrame),
    NodeResponse(NodeResponse),
    TypeName(String),
    Transaction(ObservableTransaction),
    Empty,
    /// Terminal failure of the call
    Error(String),
    /// Terminal status: server shutting down or node destroyed
    Unavailable(String),
}

impl ClientMessage {
    /// Encode to bytes with length prefix
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(256);
        buf.put_u32(0);

        match self {
            ClientMessage::GetModalities(selector) => {
                buf.put_u8(MSG_GET_MODALITIES);
                encode_selector(selector, &mut buf);
            }
            ClientMessage::ChannelInfo(req) => {
                buf.put_u8(MSG_CHANNEL_INFO);
                encode_selector(&req.node, &mut buf);
                encode_string_vec(&req.channel_names, &mut buf);
            }
            ClientMessage::Graph(req) => {
                buf.put_u8(MSG_GRAPH);
                encode_selector(&req.node, &mut buf);
                buf.put_u64(req.bin_ns);
                encode_string_vec(&req.channel_names, &mut buf);
            }
            ClientMessage::Spectrogram(req) => {
                buf.put_u8(MSG_SPECTROGRAM);
                encode_selector(&req.node, &mut buf);
                encode_string_vec(&req.channels, &mut buf);
                buf.put_f64(req.window_s);
                buf.put_f64(req.hop_s);
            }
            ClientMessage::Image(req) => {
                buf.put_u8(MSG_IMAGE);
                encode_selector(&req.node, &mut buf);
                buf.put_f64(req.framerate);
            }
            ClientMessage::Xsens(selector) => {
                buf.put_u8(MSG_XSENS);
                encode_selector(selector, &mut buf);
            }
            ClientMessage::Log(text) => {
                buf.put_u8(MSG_LOG);
                encode_text(text, &mut buf);
            }
            ClientMessage::Logout => {
                buf.put_u8(MSG_LOGOUT);
            }
            ClientMessage::InjectAnalog(req) => {
                buf.put_u8(MSG_INJECT_ANALOG);
                match req {
                    InjectAnalogRequest::Node(name) => {
                        buf.put_u8(INJECT_NODE);
                        encode_string(name, &mut buf);
                    }
                    InjectAnalogRequest::Signal(frame) => {
                        buf.put_u8(INJECT_SIGNAL);
                        encode_analog(frame, &mut buf);
                    }
                }
            }
            ClientMessage::Stim(req) => {
                buf.put_u8(MSG_STIM);
                match req {
                    StimRequest::Node(selector) => {
                        buf.put_u8(STIM_NODE);
                        encode_selector(selector, &mut buf);
                    }
                    StimRequest::InlineArm(declaration) => {
                        buf.put_u8(STIM_ARM);
                        encode_analog(&declaration.data, &mut buf);
                    }
                    StimRequest::Trigger(id) => {
                        buf.put_u8(STIM_TRIGGER);
                        buf.put_u32(*id);
                    }
                }
            }
            ClientMessage::NodeRequest(req) => {
                buf.put_u8(MSG_NODE_REQUEST);
                encode_string(&req.node, &mut buf);
                encode_string(&req.json, &mut buf);
            }
            ClientMessage::NodeRequestStream(req) => {
                buf.put_u8(MSG_NODE_REQUEST_STREAM);
                encode_string(&req.node, &mut buf);
                encode_string(&req.json, &mut buf);
            }
            ClientMessage::Replay(req) => {
                buf.put_u8(MSG_REPLAY);
                encode_string(&req.filename, &mut buf);
                encode_string_vec(&req.nodes, &mut buf);
            }
            ClientMessage::GetTypeName(name) => {
                buf.put_u8(MSG_GET_TYPE_NAME);
                encode_string(name, &mut buf);
            }
            ClientMessage::ObservableBridge(transaction) => {
                buf.put_u8(MSG_OBSERVABLE_BRIDGE);
                encode_transaction(transaction, &mut buf);
            }
        }

        finish(buf)
    }

    /// Decode from bytes (after the length prefix has been read)
    pub fn decode(mut buf: Bytes) -> Result<Self> {
        if buf.is_empty() {
            return Err(ProtocolError::Truncated("empty message"));
        }
        let tag = buf.get_u8();
        match tag {
            MSG_GET_MODALITIES => Ok(ClientMessage::GetModalities(decode_selector(&mut buf)?)),
            MSG_CHANNEL_INFO => Ok(ClientMessage::ChannelInfo(AnalogRequest {
                node: decode_selector(&mut buf)?,
                channel_names: decode_string_vec(&mut buf)?,
            })),
            MSG_GRAPH => Ok(ClientMessage::Graph(GraphRequest {
                node: decode_selector(&mut buf)?,
                bin_ns: get_u64(&mut buf)?,
                channel_names: decode_string_vec(&mut buf)?,
            })),
            MSG_SPECTROGRAM => Ok(ClientMessage::Spectrogram(SpectrogramRequest {
                node: decode_selector(&mut buf)?,
                channels: decode_string_vec(&mut buf)?,
                window_s: get_f64(&mut buf)?,
                hop_s: get_f64(&mut buf)?,
            })),
            MSG_IMAGE => Ok(ClientMessage::Image(ImageRequest {
                node: decode_selector(&mut buf)?,
                framerate: get_f64(&mut buf)?,
            })),
            MSG_XSENS => Ok(ClientMessage::Xsens(decode_selector(&mut buf)?)),
            MSG_LOG => Ok(ClientMessage::Log(decode_text(&mut buf)?)),
            MSG_LOGOUT => Ok(ClientMessage::Logout),
            MSG_INJECT_ANALOG => {
                let which = get_u8(&mut buf)?;
                match which {
                    INJECT_NODE => Ok(ClientMessage::InjectAnalog(InjectAnalogRequest::Node(
                        decode_string(&mut buf)?,
                    ))),
                    INJECT_SIGNAL => Ok(ClientMessage::InjectAnalog(
                        InjectAnalogRequest::Signal(decode_analog(&mut buf)?),
                    )),
                    _ => Err(ProtocolError::InvalidValue(format!(
                        "inject one-of: {which}"
                    ))),
                }
            }
            MSG_STIM => {
                let which = get_u8(&mut buf)?;
                match which {
                    STIM_NODE => Ok(ClientMessage::Stim(StimRequest::Node(decode_selector(
                        &mut buf,
                    )?))),
                    STIM_ARM => Ok(ClientMessage::Stim(StimRequest::InlineArm(
                        StimDeclaration {
                            data: decode_analog(&mut buf)?,
                        },
                    ))),
                    STIM_TRIGGER => Ok(ClientMessage::Stim(StimRequest::Trigger(get_u32(
                        &mut buf,
                    )?))),
                    _ => Err(ProtocolError::InvalidValue(format!("stim one-of: {which}"))),
                }
            }
            MSG_NODE_REQUEST => Ok(ClientMessage::NodeRequest(NodeRequest {
                node: decode_string(&mut buf)?,
                json: decode_string(&mut buf)?,
            })),
            MSG_NODE_REQUEST_STREAM => Ok(ClientMessage::NodeRequestStream(NodeRequest {
                node: decode_string(&mut buf)?,
                json: decode_string(&mut buf)?,
            })),
            MSG_REPLAY => Ok(ClientMessage::Replay(ReplayRequest {
                filename: decode_string(&mut buf)?,
                nodes: decode_string_vec(&mut buf)?,
            })),
            MSG_GET_TYPE_NAME => Ok(ClientMessage::GetTypeName(decode_string(&mut buf)?)),
            MSG_OBSERVABLE_BRIDGE => Ok(ClientMessage::ObservableBridge(decode_transaction(
                &mut buf,
            )?)),
            _ => Err(ProtocolError::InvalidValue(format!(
                "unknown client tag: {tag:#04x}"
            ))),
        }
    }
}

impl ServerMessage {
    /// Encode to bytes with length prefix
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(256);
        buf.put_u32(0);

        match self {
            ServerMessage::Modalities(set) => {
                buf.put_u8(MSG_MODALITIES);
                let members: Vec<Modality> = set.iter().collect();
                buf.put_u32(members.len() as u32);
                for m in members {
                    buf.put_u8(m.to_u8());
                }
            }
            ServerMessage::Analog(frame) => {
                buf.put_u8(MSG_ANALOG);
                encode_analog(frame, &mut buf);
            }
            ServerMessage::Graph(response) => {
                buf.put_u8(MSG_GRAPH_RESPONSE);
                encode_f64_vec(&response.bins, &mut buf);
                encode_spans(&response.spans, &mut buf);
            }
            ServerMessage::Spectrogram(response) => {
                buf.put_u8(MSG_SPECTROGRAM_RESPONSE);
                buf.put_u32(response.spectrograms.len() as u32);
                for channel in &response.spectrograms {
                    encode_f64_vec(&channel.data, &mut buf);
                    buf.put_f64(channel.max_frequency);
                }
            }
            ServerMessage::Image(frame) => {
                buf.put_u8(MSG_IMAGE_RESPONSE);
                encode_image(frame, &mut buf);
            }
            ServerMessage::Xsens(frame) => {
                buf.put_u8(MSG_XSENS_RESPONSE);
                encode_motion(frame, &mut buf);
            }
            ServerMessage::Text(text) => {
                buf.put_u8(MSG_TEXT);
                encode_text(text, &mut buf);
            }
            ServerMessage::NodeResponse(response) => {
                buf.put_u8(MSG_NODE_RESPONSE);
                encode_string(&response.json, &mut buf);
            }
            ServerMessage::TypeName(name) => {
                buf.put_u8(MSG_TYPE_NAME);
                encode_string(name, &mut buf);
            }
            ServerMessage::Transaction(transaction) => {
                buf.put_u8(MSG_TRANSACTION);
                encode_transaction(transaction, &mut buf);
            }
            ServerMessage::Empty => {
                buf.put_u8(MSG_EMPTY);
            }
            ServerMessage::Error(message) => {
                buf.put_u8(MSG_ERROR);
                encode_string(message, &mut buf);
            }
            ServerMessage::Unavailable(message) => {
                buf.put_u8(MSG_UNAVAILABLE);
                encode_string(message, &mut buf);
            }
        }

        finish(buf)
    }

    /// Decode from bytes (after the length prefix has been read)
    pub fn decode(mut buf: Bytes) -> Result<Self> {
        if buf.is_empty() {
            return Err(ProtocolError::Truncated("empty message"));
        }
        let tag = buf.get_u8();
        match tag {
            MSG_MODALITIES => {
                let count = get_u32(&mut buf)? as usize;
                let mut set = ModalitySet::EMPTY;
                for _ in 0..count {
                    let raw = get_u8(&mut buf)?;
                    let modality = Modality::from_u8(raw).ok_or_else(|| {
                        ProtocolError::InvalidValue(format!("modality: {raw}"))
                    })?;
                    set = set.with(modality);
                }
                Ok(ServerMessage::Modalities(set))
            }
            MSG_ANALOG => Ok(ServerMessage::Analog(decode_analog(&mut buf)?)),
            MSG_GRAPH_RESPONSE => Ok(ServerMessage::Graph(GraphResponse {
                bins: decode_f64_vec(&mut buf)?,
                spans: decode_spans(&mut buf)?,
            })),
            MSG_SPECTROGRAM_RESPONSE => {
                let count = get_u32(&mut buf)? as usize;
                let mut spectrograms = Vec::with_capacity(count);
                for _ in 0..count {
                    spectrograms.push(SpectrogramChannel {
                        data: decode_f64_vec(&mut buf)?,
                        max_frequency: get_f64(&mut buf)?,
                    });
                }
                Ok(ServerMessage::Spectrogram(SpectrogramResponse {
                    spectrograms,
                }))
            }
            MSG_IMAGE_RESPONSE => Ok(ServerMessage::Image(decode_image(&mut buf)?)),
            MSG_XSENS_RESPONSE => Ok(ServerMessage::Xsens(decode_motion(&mut buf)?)),
            MSG_TEXT => Ok(ServerMessage::Text(decode_text(&mut buf)?)),
            MSG_NODE_RESPONSE => Ok(ServerMessage::NodeResponse(NodeResponse {
                json: decode_string(&mut buf)?,
            })),
            MSG_TYPE_NAME => Ok(ServerMessage::TypeName(decode_string(&mut buf)?)),
            MSG_TRANSACTION => Ok(ServerMessage::Transaction(decode_transaction(&mut buf)?)),
            MSG_EMPTY => Ok(ServerMessage::Empty),
            MSG_ERROR => Ok(ServerMessage::Error(decode_string(&mut buf)?)),
            MSG_UNAVAILABLE => Ok(ServerMessage::Unavailable(decode_string(&mut buf)?)),
            _ => Err(ProtocolError::InvalidValue(format!(
                "unknown server tag: {tag:#04x}"
            ))),
        }
    }
}

/// Read the 4-byte length prefix, rejecting oversized messages
pub fn read_length_prefix(buf: &[u8]) -> Result<Option<u32>> {
    if buf.len() < 4 {
        return Ok(None);
    }
    let len = u32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]]);
    if len as usize > MAX_MESSAGE_SIZE {
        return Err(ProtocolError::TooLarge(len as usize));
    }
    Ok(Some(len))
}

// ============================================================================
// Field encoding helpers
// ============================================================================

fn finish(mut buf: BytesMut) -> Bytes {
    let len = (buf.len() - 4) as u32;
    buf[0..4].copy_from_slice(&len.to_be_bytes());
    buf.freeze()
}

fn encode_string(s: &str, buf: &mut BytesMut) {
    let bytes = s.as_bytes();
    buf.put_u32(bytes.len() as u32);
    buf.put_slice(bytes);
}

fn decode_string(buf: &mut Bytes) -> Result<String> {
    let len = get_u32(buf)? as usize;
    if buf.remaining() < len {
        return Err(ProtocolError::Truncated("string"));
    }
    let bytes = buf.split_to(len);
    Ok(String::from_utf8(bytes.to_vec())?)
}

fn encode_string_vec(values: &[String], buf: &mut BytesMut) {
    buf.put_u32(values.len() as u32);
    for value in values {
        encode_string(value, buf);
    }
}

fn decode_string_vec(buf: &mut Bytes) -> Result<Vec<String>> {
    let len = get_u32(buf)? as usize;
    let mut values = Vec::with_capacity(len.min(1024));
    for _ in 0..len {
        values.push(decode_string(buf)?);
    }
    Ok(values)
}

fn encode_f64_vec(values: &[f64], buf: &mut BytesMut) {
    buf.put_u32(values.len() as u32);
    for value in values {
        buf.put_f64(*value);
    }
}

fn decode_f64_vec(buf: &mut Bytes) -> Result<Vec<f64>> {
    let len = get_u32(buf)? as usize;
    if buf.remaining() < len * 8 {
        return Err(ProtocolError::Truncated("f64 vec"));
    }
    let mut values = Vec::with_capacity(len);
    for _ in 0..len {
        values.push(buf.get_f64());
    }
    Ok(values)
}

fn encode_u64_vec(values: &[u64], buf: &mut BytesMut) {
    buf.put_u32(values.len() as u32);
    for value in values {
        buf.put_u64(*value);
    }
}

fn decode_u64_vec(buf: &mut Bytes) -> Result<Vec<u64>> {
    let len = get_u32(buf)? as usize;
    if buf.remaining() < len * 8 {
        return Err(ProtocolError::Truncated("u64 vec"));
    }
    let mut values = Vec::with_capacity(len);
    for _ in 0..len {
        values.push(buf.get_u64());
    }
    Ok(values)
}

fn encode_selector(selector: &NodeSelector, buf: &mut BytesMut) {
    encode_string(&selector.name, buf);
}

fn decode_selector(buf: &mut Bytes) -> Result<NodeSelector> {
    Ok(NodeSelector {
        name: decode_string(buf)?,
    })
}

fn encode_spans(spans: &[Span], buf: &mut BytesMut) {
    buf.put_u32(spans.len() as u32);
    for span in spans {
        encode_string(&span.name, buf);
        buf.put_u32(span.begin);
        buf.put_u32(span.end);
    }
}

fn decode_spans(buf: &mut Bytes) -> Result<Vec<Span>> {
    let len = get_u32(buf)? as usize;
    let mut spans = Vec::with_capacity(len.min(1024));
    for _ in 0..len {
        spans.push(Span {
            name: decode_string(buf)?,
            begin: get_u32(buf)?,
            end: get_u32(buf)?,
        });
    }
    Ok(spans)
}

fn encode_analog(frame: &AnalogFrame, buf: &mut BytesMut) {
    encode_f64_vec(frame.data(), buf);
    encode_spans(frame.spans(), buf);
    encode_u64_vec(frame.sample_intervals(), buf);
    buf.put_u8(frame.channel_type().to_u8());
    buf.put_u64(frame.time_ns());
}

fn decode_analog(buf: &mut Bytes) -> Result<AnalogFrame> {
    let data = decode_f64_vec(buf)?;
    let spans = decode_spans(buf)?;
    let sample_intervals = decode_u64_vec(buf)?;
    let raw_type = get_u8(buf)?;
    let channel_type = ChannelType::from_u8(raw_type)
        .ok_or_else(|| ProtocolError::InvalidValue(format!("channel type: {raw_type}")))?;
    let time_ns = get_u64(buf)?;
    AnalogFrame::new(data, spans, sample_intervals, channel_type, time_ns)
}

fn encode_image(frame: &ImageFrame, buf: &mut BytesMut) {
    buf.put_u32(frame.planes.len() as u32);
    for plane in &frame.planes {
        buf.put_u32(plane.len() as u32);
        buf.put_slice(plane);
    }
    buf.put_u32(frame.width);
    buf.put_u32(frame.height);
    buf.put_u8(frame.format.to_u8());
    buf.put_u8(frame.last as u8);
    buf.put_u64(frame.frame_interval_ns);
    buf.put_u64(frame.time_ns);
}

fn decode_image(buf: &mut Bytes) -> Result<ImageFrame> {
    let plane_count = get_u32(buf)? as usize;
    let mut planes = Vec::with_capacity(plane_count.min(8));
    for _ in 0..plane_count {
        let len = get_u32(buf)? as usize;
        if buf.remaining() < len {
            return Err(ProtocolError::Truncated("image plane"));
        }
        planes.push(buf.split_to(len));
    }
    let width = get_u32(buf)?;
    let height = get_u32(buf)?;
    let raw_format = get_u8(buf)?;
    let format = ImageFormat::from_u8(raw_format)
        .ok_or_else(|| ProtocolError::InvalidValue(format!("image format: {raw_format}")))?;
    let last = get_u8(buf)? != 0;
    let frame_interval_ns = get_u64(buf)?;
    let time_ns = get_u64(buf)?;
    Ok(ImageFrame {
        planes,
        width,
        height,
        format,
        last,
        frame_interval_ns,
        time_ns,
    })
}

fn encode_motion(frame: &MotionFrame, buf: &mut BytesMut) {
    encode_string(&frame.pose_name, buf);
    buf.put_u32(frame.segments.len() as u32);
    for segment in &frame.segments {
        buf.put_u32(segment.id);
        buf.put_f32(segment.x);
        buf.put_f32(segment.y);
        buf.put_f32(segment.z);
        buf.put_f32(segment.q0);
        buf.put_f32(segment.q1);
        buf.put_f32(segment.q2);
        buf.put_f32(segment.q3);
    }
    buf.put_u64(frame.time_ns);
}

fn decode_motion(buf: &mut Bytes) -> Result<MotionFrame> {
    let pose_name = decode_string(buf)?;
    let count = get_u32(buf)? as usize;
    let mut segments = Vec::with_capacity(count.min(SEGMENT_LIMIT));
    for _ in 0..count {
        let segment = Segment {
            id: get_u32(buf)?,
            x: get_f32(buf)?,
            y: get_f32(buf)?,
            z: get_f32(buf)?,
            q0: get_f32(buf)?,
            q1: get_f32(buf)?,
            q2: get_f32(buf)?,
            q3: get_f32(buf)?,
        };
        segment.validate()?;
        segments.push(segment);
    }
    let time_ns = get_u64(buf)?;
    Ok(MotionFrame {
        pose_name,
        segments,
        time_ns,
    })
}

const SEGMENT_LIMIT: usize = 64;

fn encode_text(text: &TextFrame, buf: &mut BytesMut) {
    encode_string(&text.text, buf);
    buf.put_u64(text.time_ns);
}

fn decode_text(buf: &mut Bytes) -> Result<TextFrame> {
    Ok(TextFrame {
        text: decode_string(buf)?,
        time_ns: get_u64(buf)?,
    })
}

fn encode_transaction(transaction: &ObservableTransaction, buf: &mut BytesMut) {
    buf.put_u64(transaction.id);
    buf.put_u32(transaction.changes.len() as u32);
    for change in &transaction.changes {
        encode_string(&change.address, buf);
        encode_string(&change.value, buf);
        buf.put_u8(change.action.to_u8());
    }
    buf.put_u64(transaction.acknowledged);
}

fn decode_transaction(buf: &mut Bytes) -> Result<ObservableTransaction> {
    let id = get_u64(buf)?;
    let count = get_u32(buf)? as usize;
    let mut changes = Vec::with_capacity(count.min(1024));
    for _ in 0..count {
        let address = decode_string(buf)?;
        let value = decode_string(buf)?;
        let raw = get_u8(buf)?;
        let action = ObservableAction::from_u8(raw)
            .ok_or_else(|| ProtocolError::InvalidValue(format!("action: {raw}")))?;
        changes.push(ObservableChange {
            address,
            value,
            action,
        });
    }
    let acknowledged = get_u64(buf)?;
    Ok(ObservableTransaction {
        id,
        changes,
        acknowledged,
    })
}

fn get_u8(buf: &mut Bytes) -> Result<u8> {
    if buf.remaining() < 1 {
        return Err(ProtocolError::Truncated("u8"));
    }
    Ok(buf.get_u8())
}

fn get_u32(buf: &mut Bytes) -> Result<u32> {
    if buf.remaining() < 4 {
        return Err(ProtocolError::Truncated("u32"));
    }
    Ok(buf.get_u32())
}

fn get_u64(buf: &mut Bytes) -> Result<u64> {
    if buf.remaining() < 8 {
        return Err(ProtocolError::Truncated("u64"));
    }
    Ok(buf.get_u64())
}

fn get_f32(buf: &mut Bytes) -> Result<f32> {
    if buf.remaining() < 4 {
        return Err(ProtocolError::Truncated("f32"));
    }
    Ok(buf.get_f32())
}

fn get_f64(buf: &mut Bytes) -> Result<f64> {
    if buf.remaining() < 8 {
        return Err(ProtocolError::Truncated("f64"));
    }
    Ok(buf.get_f64())
}
