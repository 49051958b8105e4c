//! Length-prefixed message framing over async byte streams
//!
//! The reader half doubles as the cancellation signal for server streams:
//! EOF or an I/O error on the read side means the client went away.

use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use thalamus_protocol::{read_length_prefix, ClientMessage, ServerMessage};

use crate::Result;

/// Reads length-prefixed messages
pub(crate) struct FrameReader<R> {
    inner: R,
}

impl<R: AsyncRead + Unpin> FrameReader<R> {
    pub(crate) fn new(inner: R) -> Self {
        Self { inner }
    }

    /// Read one length-prefixed payload; `None` on clean EOF
    pub(crate) async fn read_frame(&mut self) -> Result<Option<Bytes>> {
        let mut prefix = [0u8; 4];
        match self.inner.read_exact(&mut prefix).await {
            Ok(_) => {}
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
            Err(e) => return Err(e.into()),
        }
        let len = match read_length_prefix(&prefix)? {
            Some(len) => len as usize,
            None => return Ok(None),
        };
        let mut payload = vec![0u8; len];
        self.inner.read_exact(&mut payload).await?;
        Ok(Some(Bytes::from(payload)))
    }

    /// Read and decode one client message; `None` on clean EOF
    pub(crate) async fn read_client(&mut self) -> Result<Option<ClientMessage>> {
        match self.read_frame().await? {
            Some(payload) => Ok(Some(ClientMessage::decode(payload)?)),
            None => Ok(None),
        }
    }

    /// Read and decode one server message; `None` on clean EOF
    #[cfg(test)]
    pub(crate) async fn read_server(&mut self) -> Result<Option<ServerMessage>> {
        match self.read_frame().await? {
            Some(payload) => Ok(Some(ServerMessage::decode(payload)?)),
            None => Ok(None),
        }
    }
}

/// Writes length-prefixed messages
pub(crate) struct FrameWriter<W> {
    inner: W,
}

impl<W: AsyncWrite + Unpin> FrameWriter<W> {
    pub(crate) fn new(inner: W) -> Self {
        Self { inner }
    }

    /// Encode and send one server message
    pub(crate) async fn write_server(&mut self, message: &ServerMessage) -> Result<()> {
        self.inner.write_all(&message.encode()).await?;
        Ok(())
    }

    /// Encode and send one client message
    #[cfg(test)]
    pub(crate) async fn write_client(&mut self, message: &ClientMessage) -> Result<()> {
        self.inner.write_all(&message.encode()).await?;
        Ok(())
    }
}
