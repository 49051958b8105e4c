//! Replay - re-emitting recorded frames at original timing
//!
//! The recording container is opaque to the core; the replay path reads a
//! minimal record stream: length-prefixed records of
//! `[modality tag][node name][time_ns][frame]` in the wire field encoding.
//! Frames re-enter the bus through the same publish paths a live node uses,
//! separated by their original inter-arrival deltas. No global time base is
//! inferred; non-monotone timestamps replay back-to-back.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use thalamus_protocol::{ProtocolError, ServerMessage};

use crate::error::ServerError;
use crate::Result;

const RECORD_ANALOG: u8 = 0x01;
const RECORD_MOTION: u8 = 0x02;

/// Payload of one recorded frame
#[derive(Debug, Clone, PartialEq)]
pub enum ReplayPayload {
    Analog(thalamus_protocol::AnalogFrame),
    Motion(thalamus_protocol::MotionFrame),
}

/// One recorded frame with its source node and capture time
#[derive(Debug, Clone, PartialEq)]
pub struct ReplayRecord {
    pub node: String,
    pub time_ns: u64,
    pub payload: ReplayPayload,
}

/// Append one record to a session writer
pub async fn write_record<W: AsyncWrite + Unpin>(
    writer: &mut W,
    record: &ReplayRecord,
) -> Result<()> {
    let mut buf = BytesMut::with_capacity(256);
    buf.put_u32(0);

    match &record.payload {
        ReplayPayload::Analog(_) => buf.put_u8(RECORD_ANALOG),
        ReplayPayload::Motion(_) => buf.put_u8(RECORD_MOTION),
    }
    let name = record.node.as_bytes();
    buf.put_u32(name.len() as u32);
    buf.put_slice(name);
    buf.put_u64(record.time_ns);

    // The frame itself reuses the wire encoding, prefix and all.
    let frame_bytes = match &record.payload {
        ReplayPayload::Analog(frame) => ServerMessage::Analog(frame.clone()).encode(),
        ReplayPayload::Motion(frame) => ServerMessage::Xsens(frame.clone()).encode(),
    };
    buf.put_slice(&frame_bytes);

    let len = (buf.len() - 4) as u32;
    buf[0..4].copy_from_slice(&len.to_be_bytes());
    writer.write_all(&buf).await?;
    Ok(())
}

/// Read every record of a recorded session, in file order
pub async fn read_session<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Vec<ReplayRecord>> {
    let mut records = Vec::new();
    loop {
        let mut prefix = [0u8; 4];
        match reader.read_exact(&mut prefix).await {
            Ok(_) => {}
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => break,
            Err(e) => return Err(e.into()),
        }
        let len = u32::from_be_bytes(prefix) as usize;
        if len > thalamus_protocol::MAX_MESSAGE_SIZE {
            return Err(ServerError::Protocol(ProtocolError::TooLarge(len)));
        }
        let mut payload = vec![0u8; len];
        reader.read_exact(&mut payload).await?;
        records.push(decode_record(Bytes::from(payload))?);
    }
    Ok(records)
}

fn decode_record(mut buf: Bytes) -> Result<ReplayRecord> {
    if buf.remaining() < 1 {
        return Err(ServerError::Protocol(ProtocolError::Truncated("record tag")));
    }
    let tag = buf.get_u8();

    if buf.remaining() < 4 {
        return Err(ServerError::Protocol(ProtocolError::Truncated("node name")));
    }
    let name_len = buf.get_u32() as usize;
    if buf.remaining() < name_len {
        return Err(ServerError::Protocol(ProtocolError::Truncated("node name")));
    }
    let node = String::from_utf8(buf.split_to(name_len).to_vec())
        .map_err(ProtocolError::Utf8)?;

    if buf.remaining() < 8 {
        return Err(ServerError::Protocol(ProtocolError::Truncated("time")));
    }
    let time_ns = buf.get_u64();

    // Remaining bytes are one wire-encoded frame message
    if buf.remaining() < 4 {
        return Err(ServerError::Protocol(ProtocolError::Truncated("frame")));
    }
    let frame_len = buf.get_u32() as usize;
    if buf.remaining() < frame_len {
        return Err(ServerError::Protocol(ProtocolError::Truncated("frame")));
    }
    let message = ServerMessage::decode(buf.split_to(frame_len))?;

    let payload = match (tag, message) {
        (RECORD_ANALOG, ServerMessage::Analog(frame)) => ReplayPayload::Analog(frame),
        (RECORD_MOTION, ServerMessage::Xsens(frame)) => ReplayPayload::Motion(frame),
        (tag, _) => {
            return Err(ServerError::Protocol(ProtocolError::InvalidValue(format!(
                "record tag {tag:#04x} does not match frame"
            ))))
        }
    };

    Ok(ReplayRecord {
        node,
        time_ns,
        payload,
    })
}
