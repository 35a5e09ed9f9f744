//! SFTP client implementation.
//!
//! [`SftpClient`] drives one SFTP session over a [`DuplexStream`]. Requests
//! are strictly sequential: every request frame is followed by exactly one
//! reply frame, read as a 4-byte length prefix and then exactly that many
//! bytes.
//!
//! Operations that open a server-side handle (file reads/writes, directory
//! listings, file creation) close it again before returning, whether the
//! operation succeeded or not.

use super::attrs::FileAttributes;
use super::config::SftpConfig;
use super::error::{SftpError, SftpResult, StatusError};
use super::logging;
use super::message::{Packet, Reply, SftpMessageType, FRAME_HEADER_LEN, SFTP_VERSION};
use super::request_id::RequestIdAllocator;
use super::types::{DirEntry, Handle, OpenFlags, StatusCode};
use filexfer_platform::{DuplexStream, SubsystemOpener, XferError};
use std::fmt;
use tracing::{debug, info, warn};

/// Session lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Stream attached, INIT not yet sent
    Disconnected,
    /// INIT sent, waiting for VERSION
    Negotiating,
    /// Version agreed; file operations allowed
    Ready,
    /// Shut down or failed negotiation (terminal)
    Closed,
}

impl SessionState {
    fn as_str(&self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Negotiating => "negotiating",
            Self::Ready => "ready",
            Self::Closed => "closed",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// SFTP client.
pub struct SftpClient<S> {
    /// Subsystem channel; `None` once shut down
    stream: Option<S>,
    /// Configuration
    config: SftpConfig,
    /// Session state
    state: SessionState,
    /// Request ID counter
    request_ids: RequestIdAllocator,
    /// Version from the server's VERSION reply
    server_version: Option<u32>,
    /// Extension pairs from the server's VERSION reply
    extensions: Vec<(String, String)>,
}

impl<S> fmt::Debug for SftpClient<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SftpClient")
            .field("state", &self.state)
            .field("config", &self.config)
            .field("next_request_id", &self.request_ids.peek())
            .field("server_version", &self.server_version)
            .field("extensions", &self.extensions)
            .finish()
    }
}

impl<S: DuplexStream> SftpClient<S> {
    /// Opens the SFTP subsystem through `opener` and negotiates the protocol.
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// use filexfer_platform::SubsystemOpener;
    /// use filexfer_proto::sftp::{SftpClient, SftpConfig};
    ///
    /// # async fn example<O: SubsystemOpener>(connection: &O) -> Result<(), Box<dyn std::error::Error>> {
    /// let mut sftp = SftpClient::connect(connection, SftpConfig::default()).await?;
    ///
    /// for name in sftp.list_names(".").await? {
    ///     println!("{}", name);
    /// }
    ///
    /// sftp.shutdown().await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn connect<O>(opener: &O, config: SftpConfig) -> SftpResult<Self>
    where
        O: SubsystemOpener<Stream = S> + ?Sized,
    {
        config.validate()?;
        info!("Opening SFTP session");

        let stream = opener.open_channel(&config.subsystem).await?;
        debug!("Subsystem {:?} opened", config.subsystem);

        let mut client = Self::with_config(stream, config);
        client.initialize().await?;
        Ok(client)
    }

    /// Wraps an already-open subsystem stream with default configuration.
    ///
    /// The session starts [`SessionState::Disconnected`]; call
    /// [`initialize`](Self::initialize) before any file operation.
    pub fn new(stream: S) -> Self {
        Self::with_config(stream, SftpConfig::default())
    }

    /// Wraps an already-open subsystem stream.
    pub fn with_config(stream: S, config: SftpConfig) -> Self {
        Self {
            stream: Some(stream),
            config,
            state: SessionState::Disconnected,
            request_ids: RequestIdAllocator::new(),
            server_version: None,
            extensions: Vec::new(),
        }
    }

    /// Current session state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Session configuration.
    pub fn config(&self) -> &SftpConfig {
        &self.config
    }

    /// Protocol version the server answered with, once negotiated.
    pub fn server_version(&self) -> Option<u32> {
        self.server_version
    }

    /// Extension pairs advertised in the server's VERSION reply.
    pub fn extensions(&self) -> &[(String, String)] {
        &self.extensions
    }

    /// Negotiates the protocol version (SSH_FXP_INIT / SSH_FXP_VERSION).
    ///
    /// Valid only on a fresh session. A server answering with any version
    /// other than 3 fails with [`SftpError::VersionMismatch`] and leaves the
    /// session closed.
    pub async fn initialize(&mut self) -> SftpResult<()> {
        if self.state != SessionState::Disconnected {
            return Err(SftpError::Protocol(format!(
                "cannot initialize a session that is {}",
                self.state
            )));
        }
        self.config.validate()?;

        debug!("Initializing SFTP protocol");
        self.transition(SessionState::Negotiating);

        match self.negotiate().await {
            Ok(()) => {
                self.transition(SessionState::Ready);
                Ok(())
            }
            Err(e) => {
                warn!("SFTP negotiation failed: {}", e);
                self.abandon().await;
                Err(e)
            }
        }
    }

    /// Closes the session and its stream. Calling it again is a no-op.
    pub async fn shutdown(&mut self) -> SftpResult<()> {
        if self.state != SessionState::Closed {
            self.transition(SessionState::Closed);
        }
        if let Some(mut stream) = self.stream.take() {
            stream.close().await?;
        }
        Ok(())
    }

    /// Creates a directory (SSH_FXP_MKDIR).
    pub async fn make_dir(&mut self, path: &str, attrs: &FileAttributes) -> SftpResult<()> {
        debug!("Creating directory: {}", path);
        let id = self.next_id();
        let result = self
            .exchange(Packet::mkdir(id, path, attrs))
            .await
            .and_then(expect_status);
        self.settle(result).await
    }

    /// Removes an empty directory (SSH_FXP_RMDIR).
    pub async fn remove_dir(&mut self, path: &str) -> SftpResult<()> {
        debug!("Removing directory: {}", path);
        let id = self.next_id();
        let result = self
            .exchange(Packet::rmdir(id, path))
            .await
            .and_then(expect_status);
        self.settle(result).await
    }

    /// Lists a directory.
    ///
    /// Issues OPENDIR, then READDIR until the server answers with a STATUS,
    /// then CLOSE. Entries are returned in the order the server sent them,
    /// across all pages.
    pub async fn read_dir(&mut self, path: &str) -> SftpResult<Vec<DirEntry>> {
        info!("Listing directory: {}", path);

        let id = self.next_id();
        let opened = self
            .exchange(Packet::opendir(id, path))
            .await
            .and_then(expect_handle);

        let result = match opened {
            Ok(handle) => {
                logging::log_handle_opened(&handle, path);
                let listing = self.read_dir_pages(&handle).await;
                self.release(handle, listing).await
            }
            Err(e) => Err(e),
        };
        self.settle(result).await
    }

    /// Lists the file names in a directory.
    pub async fn list_names(&mut self, path: &str) -> SftpResult<Vec<String>> {
        let entries = self.read_dir(path).await?;
        Ok(entries.into_iter().map(|entry| entry.filename).collect())
    }

    /// Lists the attributes of the entries in a directory.
    pub async fn list_attributes(&mut self, path: &str) -> SftpResult<Vec<FileAttributes>> {
        let entries = self.read_dir(path).await?;
        Ok(entries.into_iter().map(|entry| entry.attrs).collect())
    }

    /// Gets file attributes, following symbolic links (SSH_FXP_STAT).
    pub async fn stat(&mut self, path: &str) -> SftpResult<FileAttributes> {
        let id = self.next_id();
        let result = self
            .exchange(Packet::stat(id, path))
            .await
            .and_then(expect_attrs);
        self.settle(result).await
    }

    /// Gets file attributes without following symbolic links (SSH_FXP_LSTAT).
    pub async fn lstat(&mut self, path: &str) -> SftpResult<FileAttributes> {
        let id = self.next_id();
        let result = self
            .exchange(Packet::lstat(id, path))
            .await
            .and_then(expect_attrs);
        self.settle(result).await
    }

    /// Sets file attributes (SSH_FXP_SETSTAT).
    pub async fn set_stat(&mut self, path: &str, attrs: &FileAttributes) -> SftpResult<()> {
        debug!("Setting attributes on {}: {}", path, attrs);
        let id = self.next_id();
        let result = self
            .exchange(Packet::setstat(id, path, attrs))
            .await
            .and_then(expect_status);
        self.settle(result).await
    }

    /// Creates a file (OPEN with SSH_FXF_CREAT, then CLOSE).
    pub async fn open_create(&mut self, path: &str, attrs: &FileAttributes) -> SftpResult<()> {
        debug!("Creating file: {}", path);
        let result = match self.open(path, OpenFlags::CREAT, attrs).await {
            Ok(handle) => self.release(handle, Ok(())).await,
            Err(e) => Err(e),
        };
        self.settle(result).await
    }

    /// Reads up to `length` bytes at `offset` from a file.
    ///
    /// Opens the file for reading, issues a single READ and closes the
    /// handle. A READ failure is returned after the handle is closed.
    pub async fn read_file(&mut self, path: &str, length: u32, offset: u64) -> SftpResult<Vec<u8>> {
        info!("Reading {} bytes at offset {} from {}", length, offset, path);

        let result = match self.open_read(path).await {
            Ok(handle) => {
                let id = self.next_id();
                let data = self
                    .exchange(Packet::read(id, &handle, offset, length))
                    .await
                    .and_then(expect_data);
                self.release(handle, data).await
            }
            Err(e) => Err(e),
        };
        self.settle(result).await
    }

    /// Writes `data` at offset 0 of an existing file.
    ///
    /// Opens the file for writing, issues a single WRITE and closes the
    /// handle. A WRITE failure is returned after the handle is closed.
    pub async fn write_file(&mut self, path: &str, data: &[u8]) -> SftpResult<()> {
        info!("Writing {} bytes to {}", data.len(), path);

        let result = match self.open_write(path).await {
            Ok(handle) => {
                let id = self.next_id();
                let written = self
                    .exchange(Packet::write(id, &handle, 0, data))
                    .await
                    .and_then(expect_status);
                self.release(handle, written).await
            }
            Err(e) => Err(e),
        };
        self.settle(result).await
    }

    /// Renames a file or directory (SSH_FXP_RENAME).
    pub async fn rename(&mut self, old_path: &str, new_path: &str) -> SftpResult<()> {
        debug!("Renaming {} -> {}", old_path, new_path);
        let id = self.next_id();
        let result = self
            .exchange(Packet::rename(id, old_path, new_path))
            .await
            .and_then(expect_status);
        self.settle(result).await
    }

    /// Removes a file (SSH_FXP_REMOVE).
    pub async fn remove(&mut self, path: &str) -> SftpResult<()> {
        debug!("Removing file: {}", path);
        let id = self.next_id();
        let result = self
            .exchange(Packet::remove(id, path))
            .await
            .and_then(expect_status);
        self.settle(result).await
    }

    /// Creates a symbolic link at `link_path` pointing to `target_path`.
    pub async fn symlink(&mut self, link_path: &str, target_path: &str) -> SftpResult<()> {
        debug!("Linking {} -> {}", link_path, target_path);
        let id = self.next_id();
        let result = self
            .exchange(Packet::symlink(id, link_path, target_path))
            .await
            .and_then(expect_status);
        self.settle(result).await
    }

    /// Reads the target of a symbolic link (SSH_FXP_READLINK).
    pub async fn read_link(&mut self, path: &str) -> SftpResult<String> {
        let id = self.next_id();
        let result = self
            .exchange(Packet::readlink(id, path))
            .await
            .and_then(expect_single_name);
        self.settle(result).await
    }

    /// Resolves a path to its absolute, canonical form (SSH_FXP_REALPATH).
    pub async fn canonicalize(&mut self, path: &str) -> SftpResult<String> {
        let id = self.next_id();
        let result = self
            .exchange(Packet::realpath(id, path))
            .await
            .and_then(expect_single_name);
        self.settle(result).await
    }

    async fn open_read(&mut self, path: &str) -> SftpResult<Handle> {
        self.open(path, OpenFlags::READ, &FileAttributes::new()).await
    }

    async fn open_write(&mut self, path: &str) -> SftpResult<Handle> {
        self.open(path, OpenFlags::WRITE, &FileAttributes::new()).await
    }

    async fn open(&mut self, path: &str, pflags: u32, attrs: &FileAttributes) -> SftpResult<Handle> {
        let id = self.next_id();
        let reply = self.exchange(Packet::open(id, path, pflags, attrs)).await?;
        let handle = expect_handle(reply)?;
        logging::log_handle_opened(&handle, path);
        Ok(handle)
    }

    async fn read_dir_pages(&mut self, handle: &Handle) -> SftpResult<Vec<DirEntry>> {
        let mut entries = Vec::new();
        let mut pages = 0usize;

        loop {
            let id = self.next_id();
            match self.exchange(Packet::readdir(id, handle)).await? {
                Reply::Name { entries: page, .. } => {
                    pages += 1;
                    debug!("Directory page {}: {} entries", pages, page.len());
                    entries.extend(page);
                }
                Reply::Status {
                    code,
                    message,
                    language_tag,
                    ..
                } => {
                    if pages == 0 && code != StatusCode::Eof && code != StatusCode::Ok {
                        return Err(StatusError {
                            code,
                            message,
                            language_tag,
                        }
                        .into());
                    }
                    if code != StatusCode::Eof {
                        debug!("Directory listing ended with status {}", code);
                    }
                    return Ok(entries);
                }
                other => return Err(reject(other, SftpMessageType::Name)),
            }
        }
    }

    /// Closes `handle` and merges the outcome with the operation's result.
    ///
    /// An operation failure always wins over a CLOSE failure; the latter is
    /// only logged. When the operation succeeded, a CLOSE failure is
    /// returned.
    async fn release<T>(&mut self, handle: Handle, outcome: SftpResult<T>) -> SftpResult<T> {
        let handle_hex = handle.to_hex();
        let closed = self.close_handle(handle).await;

        match (outcome, closed) {
            (Ok(value), Ok(())) => Ok(value),
            (Ok(_), Err(cleanup)) => Err(cleanup),
            (Err(original), Ok(())) => Err(original),
            (Err(original), Err(cleanup)) => {
                logging::log_cleanup_failed(&handle_hex, &cleanup, &original);
                Err(original)
            }
        }
    }

    async fn close_handle(&mut self, handle: Handle) -> SftpResult<()> {
        let id = self.next_id();
        let reply = self.exchange(Packet::close(id, &handle)).await?;
        expect_status(reply)?;
        logging::log_handle_closed(&handle.to_hex());
        Ok(())
    }

    async fn negotiate(&mut self) -> SftpResult<()> {
        self.send_packet(&Packet::init(SFTP_VERSION)).await?;

        match self.receive_reply().await? {
            Reply::Version {
                version,
                extensions,
            } => {
                if version != SFTP_VERSION {
                    return Err(SftpError::VersionMismatch {
                        expected: SFTP_VERSION,
                        actual: version,
                    });
                }
                logging::log_negotiated(version, extensions.len());
                self.server_version = Some(version);
                self.extensions = extensions;
                Ok(())
            }
            other => Err(SftpError::Protocol(format!(
                "Expected {}, got {}",
                SftpMessageType::Version.name(),
                other.msg_type().name()
            ))),
        }
    }

    /// Sends one request and reads its reply, checking the echoed id.
    async fn exchange(&mut self, packet: Packet) -> SftpResult<Reply> {
        self.ensure_ready()?;
        self.send_packet(&packet).await?;

        let reply = self.receive_reply().await?;
        if reply.request_id() != packet.request_id {
            return Err(SftpError::Protocol(format!(
                "Request id mismatch: sent {:?} for {}, got {:?} in {}",
                packet.request_id,
                packet.msg_type.name(),
                reply.request_id(),
                reply.msg_type().name()
            )));
        }
        Ok(reply)
    }

    async fn send_packet(&mut self, packet: &Packet) -> SftpResult<()> {
        let bytes = packet.to_bytes();
        let write_timeout = self.config.write_timeout;
        let stream = self.stream_mut()?;

        match tokio::time::timeout(write_timeout, stream.send(&bytes)).await {
            Ok(result) => result?,
            Err(_) => {
                return Err(XferError::Timeout {
                    operation: "send",
                    after: write_timeout,
                }
                .into())
            }
        }

        logging::log_request(packet.msg_type, packet.request_id, bytes.len());
        Ok(())
    }

    async fn receive_reply(&mut self) -> SftpResult<Reply> {
        let header = self.receive_exact(FRAME_HEADER_LEN).await?;
        let length = u32::from_be_bytes([header[0], header[1], header[2], header[3]]);

        if length == 0 {
            return Err(SftpError::Protocol("Received zero-length frame".to_string()));
        }
        if length > self.config.max_packet_len {
            return Err(SftpError::Protocol(format!(
                "Frame length {} exceeds limit of {}",
                length, self.config.max_packet_len
            )));
        }

        let body = self.receive_exact(length as usize).await?;
        let reply = Reply::from_payload(&body)?;
        logging::log_reply(reply.msg_type(), reply.request_id(), FRAME_HEADER_LEN + body.len());
        Ok(reply)
    }

    async fn receive_exact(&mut self, len: usize) -> SftpResult<Vec<u8>> {
        let read_timeout = self.config.read_timeout;
        let stream = self.stream_mut()?;

        let data = match tokio::time::timeout(read_timeout, stream.receive(len)).await {
            Ok(result) => result?,
            Err(_) => {
                return Err(XferError::Timeout {
                    operation: "receive",
                    after: read_timeout,
                }
                .into())
            }
        };

        if data.len() != len {
            return Err(XferError::ChannelClosed(format!(
                "short read: wanted {} bytes, got {}",
                len,
                data.len()
            ))
            .into());
        }
        Ok(data)
    }

    fn stream_mut(&mut self) -> SftpResult<&mut S> {
        self.stream
            .as_mut()
            .ok_or_else(|| SftpError::Protocol("session not ready".to_string()))
    }

    fn ensure_ready(&self) -> SftpResult<()> {
        if self.state != SessionState::Ready {
            return Err(SftpError::Protocol("session not ready".to_string()));
        }
        Ok(())
    }

    fn next_id(&mut self) -> u32 {
        self.request_ids.next()
    }

    fn transition(&mut self, next: SessionState) {
        logging::log_state_transition(self.state.as_str(), next.as_str());
        self.state = next;
    }

    /// Closes a ready session when `result` carries a fatal error.
    ///
    /// Runs after any handle release, so the one CLOSE attempt has already
    /// been made on the old stream.
    async fn settle<T>(&mut self, result: SftpResult<T>) -> SftpResult<T> {
        if let Err(e) = &result {
            if e.is_fatal() && self.state == SessionState::Ready {
                warn!("Closing SFTP session after fatal error: {}", e);
                self.abandon().await;
            }
        }
        result
    }

    async fn abandon(&mut self) {
        self.transition(SessionState::Closed);
        if let Some(mut stream) = self.stream.take() {
            if let Err(e) = stream.close().await {
                warn!("Failed to close SFTP stream: {}", e);
            }
        }
    }
}

/// Builds the error for a reply that is not the one the request expects.
///
/// A non-OK STATUS is the server refusing the request; anything else is a
/// protocol violation.
fn reject(reply: Reply, expected: SftpMessageType) -> SftpError {
    match reply {
        Reply::Status {
            code,
            message,
            language_tag,
            ..
        } if code != StatusCode::Ok => StatusError {
            code,
            message,
            language_tag,
        }
        .into(),
        other => SftpError::Protocol(format!(
            "Expected {}, got {}",
            expected.name(),
            other.msg_type().name()
        )),
    }
}

fn expect_status(reply: Reply) -> SftpResult<()> {
    match reply {
        Reply::Status {
            code: StatusCode::Ok,
            ..
        } => Ok(()),
        other => Err(reject(other, SftpMessageType::Status)),
    }
}

fn expect_handle(reply: Reply) -> SftpResult<Handle> {
    match reply {
        Reply::Handle { handle, .. } => Ok(handle),
        other => Err(reject(other, SftpMessageType::Handle)),
    }
}

fn expect_attrs(reply: Reply) -> SftpResult<FileAttributes> {
    match reply {
        Reply::Attrs { attrs, .. } => Ok(attrs),
        other => Err(reject(other, SftpMessageType::Attrs)),
    }
}

fn expect_data(reply: Reply) -> SftpResult<Vec<u8>> {
    match reply {
        Reply::Data { data, .. } => Ok(data),
        other => Err(reject(other, SftpMessageType::Data)),
    }
}

fn expect_single_name(reply: Reply) -> SftpResult<String> {
    match reply {
        Reply::Name { mut entries, .. } => {
            if entries.len() != 1 {
                return Err(SftpError::Protocol(format!(
                    "Expected exactly one name, got {}",
                    entries.len()
                )));
            }
            Ok(entries.remove(0).filename)
        }
        other => Err(reject(other, SftpMessageType::Name)),
    }
}
