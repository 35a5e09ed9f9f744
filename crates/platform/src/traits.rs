//! Transport capability traits
//!
//! The file-transfer layer never talks to a socket directly. It asks a
//! [`SubsystemOpener`] (an already-authenticated secure connection) for a
//! named subsystem channel and then exchanges bytes over the returned
//! [`DuplexStream`].

use crate::{XferError, XferResult};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, ReadHalf, WriteHalf};

/// Ordered, reliable byte stream for one subsystem channel.
#[async_trait::async_trait]
pub trait DuplexStream: Send {
    /// Writes all of `data`.
    ///
    /// # Errors
    ///
    /// Returns an error if the stream fails before every byte is written
    async fn send(&mut self, data: &[u8]) -> XferResult<()>;

    /// Reads exactly `len` bytes.
    ///
    /// # Errors
    ///
    /// Returns an error on I/O failure or if the stream ends early
    async fn receive(&mut self, len: usize) -> XferResult<Vec<u8>>;

    /// Closes the channel.
    ///
    /// # Errors
    ///
    /// Returns an error if the close could not be delivered
    async fn close(&mut self) -> XferResult<()>;
}

#[async_trait::async_trait]
impl<T: DuplexStream + ?Sized> DuplexStream for Box<T> {
    async fn send(&mut self, data: &[u8]) -> XferResult<()> {
        (**self).send(data).await
    }

    async fn receive(&mut self, len: usize) -> XferResult<Vec<u8>> {
        (**self).receive(len).await
    }

    async fn close(&mut self) -> XferResult<()> {
        (**self).close().await
    }
}

/// Secure connection capable of opening subsystem channels.
///
/// Implemented by whatever owns the authenticated connection. The opener
/// outlives the streams it hands out and may be shared between sessions.
#[async_trait::async_trait]
pub trait SubsystemOpener: Send + Sync {
    /// Stream type produced for each channel
    type Stream: DuplexStream;

    /// Opens a channel and requests `subsystem` on it (e.g. `"sftp"`).
    ///
    /// # Errors
    ///
    /// Returns an error if the channel or subsystem request is refused
    async fn open_channel(&self, subsystem: &str) -> XferResult<Self::Stream>;
}

/// [`DuplexStream`] over a pair of tokio reader/writer halves.
///
/// Works for child-process pipes (`ssh -s host sftp`, a local
/// `sftp-server`) as well as in-memory `tokio::io::duplex` pairs.
#[derive(Debug)]
pub struct IoStream<R, W> {
    reader: R,
    writer: W,
    closed: bool,
}

impl<R, W> IoStream<R, W>
where
    R: AsyncRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    /// Creates a stream from separate read and write halves.
    pub fn new(reader: R, writer: W) -> Self {
        Self {
            reader,
            writer,
            closed: false,
        }
    }

    /// Returns true once `close()` has been called.
    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl<S> IoStream<ReadHalf<S>, WriteHalf<S>>
where
    S: AsyncRead + AsyncWrite + Send,
{
    /// Creates a stream from a single bidirectional I/O object.
    pub fn from_duplex(stream: S) -> Self {
        let (reader, writer) = tokio::io::split(stream);
        Self {
            reader,
            writer,
            closed: false,
        }
    }
}

#[async_trait::async_trait]
impl<R, W> DuplexStream for IoStream<R, W>
where
    R: AsyncRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    async fn send(&mut self, data: &[u8]) -> XferResult<()> {
        if self.closed {
            return Err(XferError::ChannelClosed("stream already closed".to_string()));
        }
        self.writer.write_all(data).await?;
        self.writer.flush().await?;
        Ok(())
    }

    async fn receive(&mut self, len: usize) -> XferResult<Vec<u8>> {
        if self.closed {
            return Err(XferError::ChannelClosed("stream already closed".to_string()));
        }
        let mut buf = vec![0u8; len];
        self.reader.read_exact(&mut buf).await?;
        Ok(buf)
    }

    async fn close(&mut self) -> XferResult<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.writer.shutdown().await?;
        Ok(())
    }
}
