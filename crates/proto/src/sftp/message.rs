//! SFTP protocol messages.
//!
//! Every message travels in a frame:
//!
//! ```text
//! uint32    length     (type byte + payload)
//! byte      type
//! byte[n]   payload    (request id first, except for INIT/VERSION)
//! ```
//!
//! Outgoing requests are built as a [`Packet`]: a type, an optional request
//! id and an ordered list of typed [`Field`]s. Incoming frames are decoded
//! into a [`Reply`], one variant per server message the client understands.

use super::attrs::FileAttributes;
use super::error::{SftpError, SftpResult};
use super::types::{DirEntry, Handle, StatusCode};
use super::wire::{put_string, WireReader};
use bytes::{BufMut, BytesMut};

/// SFTP protocol version (v3).
pub const SFTP_VERSION: u32 = 3;

/// Size of the frame length prefix.
pub const FRAME_HEADER_LEN: usize = 4;

/// SFTP message type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum SftpMessageType {
    /// SSH_FXP_INIT - Initialize SFTP session
    Init = 1,
    /// SSH_FXP_VERSION - Version response
    Version = 2,
    /// SSH_FXP_OPEN - Open file
    Open = 3,
    /// SSH_FXP_CLOSE - Close file/directory
    Close = 4,
    /// SSH_FXP_READ - Read from file
    Read = 5,
    /// SSH_FXP_WRITE - Write to file
    Write = 6,
    /// SSH_FXP_LSTAT - Get file attributes (no follow symlinks)
    LStat = 7,
    /// SSH_FXP_FSTAT - Get file attributes by handle
    FStat = 8,
    /// SSH_FXP_SETSTAT - Set file attributes
    SetStat = 9,
    /// SSH_FXP_FSETSTAT - Set file attributes by handle
    FSetStat = 10,
    /// SSH_FXP_OPENDIR - Open directory
    OpenDir = 11,
    /// SSH_FXP_READDIR - Read directory
    ReadDir = 12,
    /// SSH_FXP_REMOVE - Remove file
    Remove = 13,
    /// SSH_FXP_MKDIR - Create directory
    MkDir = 14,
    /// SSH_FXP_RMDIR - Remove directory
    RmDir = 15,
    /// SSH_FXP_REALPATH - Canonicalize path
    RealPath = 16,
    /// SSH_FXP_STAT - Get file attributes
    Stat = 17,
    /// SSH_FXP_RENAME - Rename file/directory
    Rename = 18,
    /// SSH_FXP_READLINK - Read symbolic link
    ReadLink = 19,
    /// SSH_FXP_SYMLINK - Create symbolic link
    Symlink = 20,

    // Response messages
    /// SSH_FXP_STATUS - Status response
    Status = 101,
    /// SSH_FXP_HANDLE - File handle response
    Handle = 102,
    /// SSH_FXP_DATA - Data response
    Data = 103,
    /// SSH_FXP_NAME - Name response
    Name = 104,
    /// SSH_FXP_ATTRS - Attributes response
    Attrs = 105,

    // Extended messages
    /// SSH_FXP_EXTENDED - Extended request
    Extended = 200,
    /// SSH_FXP_EXTENDED_REPLY - Extended response
    ExtendedReply = 201,
}

impl SftpMessageType {
    /// Convert from u8.
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(Self::Init),
            2 => Some(Self::Version),
            3 => Some(Self::Open),
            4 => Some(Self::Close),
            5 => Some(Self::Read),
            6 => Some(Self::Write),
            7 => Some(Self::LStat),
            8 => Some(Self::FStat),
            9 => Some(Self::SetStat),
            10 => Some(Self::FSetStat),
            11 => Some(Self::OpenDir),
            12 => Some(Self::ReadDir),
            13 => Some(Self::Remove),
            14 => Some(Self::MkDir),
            15 => Some(Self::RmDir),
            16 => Some(Self::RealPath),
            17 => Some(Self::Stat),
            18 => Some(Self::Rename),
            19 => Some(Self::ReadLink),
            20 => Some(Self::Symlink),
            101 => Some(Self::Status),
            102 => Some(Self::Handle),
            103 => Some(Self::Data),
            104 => Some(Self::Name),
            105 => Some(Self::Attrs),
            200 => Some(Self::Extended),
            201 => Some(Self::ExtendedReply),
            _ => None,
        }
    }

    /// Protocol name, e.g. `SSH_FXP_OPENDIR`.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Init => "SSH_FXP_INIT",
            Self::Version => "SSH_FXP_VERSION",
            Self::Open => "SSH_FXP_OPEN",
            Self::Close => "SSH_FXP_CLOSE",
            Self::Read => "SSH_FXP_READ",
            Self::Write => "SSH_FXP_WRITE",
            Self::LStat => "SSH_FXP_LSTAT",
            Self::FStat => "SSH_FXP_FSTAT",
            Self::SetStat => "SSH_FXP_SETSTAT",
            Self::FSetStat => "SSH_FXP_FSETSTAT",
            Self::OpenDir => "SSH_FXP_OPENDIR",
            Self::ReadDir => "SSH_FXP_READDIR",
            Self::Remove => "SSH_FXP_REMOVE",
            Self::MkDir => "SSH_FXP_MKDIR",
            Self::RmDir => "SSH_FXP_RMDIR",
            Self::RealPath => "SSH_FXP_REALPATH",
            Self::Stat => "SSH_FXP_STAT",
            Self::Rename => "SSH_FXP_RENAME",
            Self::ReadLink => "SSH_FXP_READLINK",
            Self::Symlink => "SSH_FXP_SYMLINK",
            Self::Status => "SSH_FXP_STATUS",
            Self::Handle => "SSH_FXP_HANDLE",
            Self::Data => "SSH_FXP_DATA",
            Self::Name => "SSH_FXP_NAME",
            Self::Attrs => "SSH_FXP_ATTRS",
            Self::Extended => "SSH_FXP_EXTENDED",
            Self::ExtendedReply => "SSH_FXP_EXTENDED_REPLY",
        }
    }
}

/// One typed value in a packet body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Field {
    /// Single byte
    Uint8(u8),
    /// 4-byte big-endian integer
    Uint32(u32),
    /// 8-byte big-endian integer
    Uint64(u64),
    /// Length-prefixed string (UTF-8 text or raw bytes)
    String(Vec<u8>),
    /// Embedded attribute record
    Attrs(FileAttributes),
}

impl Field {
    /// Text string field.
    pub fn text(s: &str) -> Self {
        Field::String(s.as_bytes().to_vec())
    }

    /// Raw byte string field.
    pub fn bytes(data: &[u8]) -> Self {
        Field::String(data.to_vec())
    }

    fn encoded_len(&self) -> usize {
        match self {
            Field::Uint8(_) => 1,
            Field::Uint32(_) => 4,
            Field::Uint64(_) => 8,
            Field::String(s) => 4 + s.len(),
            Field::Attrs(attrs) => attrs.encoded_len(),
        }
    }

    fn encode(&self, buf: &mut BytesMut) {
        match self {
            Field::Uint8(v) => buf.put_u8(*v),
            Field::Uint32(v) => buf.put_u32(*v),
            Field::Uint64(v) => buf.put_u64(*v),
            Field::String(s) => put_string(buf, s),
            Field::Attrs(attrs) => attrs.encode(buf),
        }
    }
}

/// Outgoing SFTP message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    /// Message type
    pub msg_type: SftpMessageType,
    /// Request id (absent only for INIT/VERSION)
    pub request_id: Option<u32>,
    /// Body fields, in wire order
    pub fields: Vec<Field>,
}

impl Packet {
    /// Creates a packet without request id or fields.
    pub fn new(msg_type: SftpMessageType) -> Self {
        Self {
            msg_type,
            request_id: None,
            fields: Vec::new(),
        }
    }

    /// Creates a packet carrying a request id.
    pub fn with_id(msg_type: SftpMessageType, request_id: u32) -> Self {
        Self {
            msg_type,
            request_id: Some(request_id),
            fields: Vec::new(),
        }
    }

    /// Appends a field.
    pub fn push(mut self, field: Field) -> Self {
        self.fields.push(field);
        self
    }

    /// Length of type byte + id + fields, i.e. the value of the length prefix.
    pub fn payload_len(&self) -> usize {
        1 + self.request_id.map_or(0, |_| 4)
            + self.fields.iter().map(Field::encoded_len).sum::<usize>()
    }

    /// Serializes to bytes.
    ///
    /// Format:
    /// ```text
    /// uint32    length
    /// byte      type
    /// uint32    request id (if present)
    /// ...       fields
    /// ```
    pub fn to_bytes(&self) -> Vec<u8> {
        let payload_len = self.payload_len();
        let mut buf = BytesMut::with_capacity(FRAME_HEADER_LEN + payload_len);

        buf.put_u32(payload_len as u32);
        buf.put_u8(self.msg_type as u8);
        if let Some(id) = self.request_id {
            buf.put_u32(id);
        }
        for field in &self.fields {
            field.encode(&mut buf);
        }

        buf.to_vec()
    }

    /// SSH_FXP_INIT: `uint32 version`
    pub fn init(version: u32) -> Self {
        Self::new(SftpMessageType::Init).push(Field::Uint32(version))
    }

    /// SSH_FXP_OPEN: `uint32 id, string filename, uint32 pflags, ATTRS attrs`
    pub fn open(id: u32, path: &str, pflags: u32, attrs: &FileAttributes) -> Self {
        Self::with_id(SftpMessageType::Open, id)
            .push(Field::text(path))
            .push(Field::Uint32(pflags))
            .push(Field::Attrs(attrs.clone()))
    }

    /// SSH_FXP_CLOSE: `uint32 id, string handle`
    pub fn close(id: u32, handle: &Handle) -> Self {
        Self::with_id(SftpMessageType::Close, id).push(Field::bytes(handle.as_bytes()))
    }

    /// SSH_FXP_READ: `uint32 id, string handle, uint64 offset, uint32 len`
    pub fn read(id: u32, handle: &Handle, offset: u64, len: u32) -> Self {
        Self::with_id(SftpMessageType::Read, id)
            .push(Field::bytes(handle.as_bytes()))
            .push(Field::Uint64(offset))
            .push(Field::Uint32(len))
    }

    /// SSH_FXP_WRITE: `uint32 id, string handle, uint64 offset, string data`
    pub fn write(id: u32, handle: &Handle, offset: u64, data: &[u8]) -> Self {
        Self::with_id(SftpMessageType::Write, id)
            .push(Field::bytes(handle.as_bytes()))
            .push(Field::Uint64(offset))
            .push(Field::bytes(data))
    }

    /// SSH_FXP_LSTAT: `uint32 id, string path`
    pub fn lstat(id: u32, path: &str) -> Self {
        Self::path_request(SftpMessageType::LStat, id, path)
    }

    /// SSH_FXP_STAT: `uint32 id, string path`
    pub fn stat(id: u32, path: &str) -> Self {
        Self::path_request(SftpMessageType::Stat, id, path)
    }

    /// SSH_FXP_SETSTAT: `uint32 id, string path, ATTRS attrs`
    pub fn setstat(id: u32, path: &str, attrs: &FileAttributes) -> Self {
        Self::path_request(SftpMessageType::SetStat, id, path).push(Field::Attrs(attrs.clone()))
    }

    /// SSH_FXP_OPENDIR: `uint32 id, string path`
    pub fn opendir(id: u32, path: &str) -> Self {
        Self::path_request(SftpMessageType::OpenDir, id, path)
    }

    /// SSH_FXP_READDIR: `uint32 id, string handle`
    pub fn readdir(id: u32, handle: &Handle) -> Self {
        Self::with_id(SftpMessageType::ReadDir, id).push(Field::bytes(handle.as_bytes()))
    }

    /// SSH_FXP_REMOVE: `uint32 id, string filename`
    pub fn remove(id: u32, path: &str) -> Self {
        Self::path_request(SftpMessageType::Remove, id, path)
    }

    /// SSH_FXP_MKDIR: `uint32 id, string path, ATTRS attrs`
    pub fn mkdir(id: u32, path: &str, attrs: &FileAttributes) -> Self {
        Self::path_request(SftpMessageType::MkDir, id, path).push(Field::Attrs(attrs.clone()))
    }

    /// SSH_FXP_RMDIR: `uint32 id, string path`
    pub fn rmdir(id: u32, path: &str) -> Self {
        Self::path_request(SftpMessageType::RmDir, id, path)
    }

    /// SSH_FXP_REALPATH: `uint32 id, string path`
    pub fn realpath(id: u32, path: &str) -> Self {
        Self::path_request(SftpMessageType::RealPath, id, path)
    }

    /// SSH_FXP_RENAME: `uint32 id, string oldpath, string newpath`
    pub fn rename(id: u32, old_path: &str, new_path: &str) -> Self {
        Self::path_request(SftpMessageType::Rename, id, old_path).push(Field::text(new_path))
    }

    /// SSH_FXP_READLINK: `uint32 id, string path`
    pub fn readlink(id: u32, path: &str) -> Self {
        Self::path_request(SftpMessageType::ReadLink, id, path)
    }

    /// SSH_FXP_SYMLINK creating `link_path` pointing at `target_path`.
    ///
    /// The draft names the fields `linkpath, targetpath`, but OpenSSH (and
    /// every server written to interoperate with it) reads them in the
    /// opposite order. The target goes first on the wire.
    pub fn symlink(id: u32, link_path: &str, target_path: &str) -> Self {
        Self::path_request(SftpMessageType::Symlink, id, target_path).push(Field::text(link_path))
    }

    fn path_request(msg_type: SftpMessageType, id: u32, path: &str) -> Self {
        Self::with_id(msg_type, id).push(Field::text(path))
    }
}

/// Decoded server message.
#[derive(Debug, PartialEq, Eq)]
pub enum Reply {
    /// SSH_FXP_VERSION
    Version {
        /// Protocol version offered by the server
        version: u32,
        /// Extension (name, data) pairs
        extensions: Vec<(String, String)>,
    },
    /// SSH_FXP_STATUS
    Status {
        /// Request id
        id: u32,
        /// Status code
        code: StatusCode,
        /// Error message (optional on the wire for v3 servers)
        message: Option<String>,
        /// Language tag
        language_tag: Option<String>,
    },
    /// SSH_FXP_HANDLE
    Handle {
        /// Request id
        id: u32,
        /// Opaque handle
        handle: Handle,
    },
    /// SSH_FXP_DATA
    Data {
        /// Request id
        id: u32,
        /// Data read
        data: Vec<u8>,
    },
    /// SSH_FXP_NAME
    Name {
        /// Request id
        id: u32,
        /// Entries in wire order
        entries: Vec<DirEntry>,
    },
    /// SSH_FXP_ATTRS
    Attrs {
        /// Request id
        id: u32,
        /// Attributes
        attrs: FileAttributes,
    },
}

impl Reply {
    /// Message type of this reply.
    pub fn msg_type(&self) -> SftpMessageType {
        match self {
            Reply::Version { .. } => SftpMessageType::Version,
            Reply::Status { .. } => SftpMessageType::Status,
            Reply::Handle { .. } => SftpMessageType::Handle,
            Reply::Data { .. } => SftpMessageType::Data,
            Reply::Name { .. } => SftpMessageType::Name,
            Reply::Attrs { .. } => SftpMessageType::Attrs,
        }
    }

    /// Echoed request id (`None` for VERSION).
    pub fn request_id(&self) -> Option<u32> {
        match self {
            Reply::Version { .. } => None,
            Reply::Status { id, .. }
            | Reply::Handle { id, .. }
            | Reply::Data { id, .. }
            | Reply::Name { id, .. }
            | Reply::Attrs { id, .. } => Some(*id),
        }
    }

    /// Parses one complete frame (length prefix included).
    ///
    /// Bytes after `4 + length` are ignored.
    pub fn from_bytes(data: &[u8]) -> SftpResult<Self> {
        if data.len() < FRAME_HEADER_LEN + 1 {
            return Err(SftpError::Protocol("SFTP message too short".to_string()));
        }

        let length = u32::from_be_bytes([data[0], data[1], data[2], data[3]]) as usize;
        if length == 0 {
            return Err(SftpError::Protocol("SFTP message has zero length".to_string()));
        }
        if data.len() < FRAME_HEADER_LEN + length {
            return Err(SftpError::Protocol(format!(
                "SFTP message incomplete: length {} but only {} bytes present",
                length,
                data.len() - FRAME_HEADER_LEN
            )));
        }

        Self::from_payload(&data[FRAME_HEADER_LEN..FRAME_HEADER_LEN + length])
    }

    /// Parses a frame body: type byte followed by the payload.
    pub fn from_payload(payload: &[u8]) -> SftpResult<Self> {
        let mut reader = WireReader::new(payload);
        let tag = reader.read_u8("message type")?;
        let msg_type = SftpMessageType::from_u8(tag)
            .ok_or_else(|| SftpError::Protocol(format!("Unknown SFTP message type: {}", tag)))?;

        match msg_type {
            SftpMessageType::Version => Self::decode_version(&mut reader),
            SftpMessageType::Handle => Self::decode_handle(&mut reader),
            SftpMessageType::Status => Self::decode_status(&mut reader),
            SftpMessageType::Name => Self::decode_name(&mut reader),
            SftpMessageType::Attrs => Self::decode_attrs(&mut reader),
            SftpMessageType::Data => Self::decode_data(&mut reader),
            other => Err(SftpError::Protocol(format!(
                "Unsupported SFTP reply type: {}",
                other.name()
            ))),
        }
    }

    fn decode_version(reader: &mut WireReader<'_>) -> SftpResult<Self> {
        let version = reader.read_u32("version")?;
        let mut extensions = Vec::new();
        while !reader.is_empty() {
            let name = reader.read_string("extension name")?;
            let data = reader.read_string("extension data")?;
            extensions.push((name, data));
        }
        Ok(Reply::Version {
            version,
            extensions,
        })
    }

    fn decode_handle(reader: &mut WireReader<'_>) -> SftpResult<Self> {
        let id = reader.read_u32("request id")?;
        let handle = Handle::new(reader.read_bytes("handle")?);
        Ok(Reply::Handle { id, handle })
    }

    fn decode_status(reader: &mut WireReader<'_>) -> SftpResult<Self> {
        let id = reader.read_u32("request id")?;
        let raw = reader.read_u32("status code")?;
        let code = StatusCode::from_u32(raw)
            .ok_or_else(|| SftpError::Protocol(format!("Unknown SFTP status code: {}", raw)))?;

        // Pre-v3 servers omit message and language tag
        let message = if reader.is_empty() {
            None
        } else {
            Some(reader.read_string("status message")?)
        };
        let language_tag = if reader.is_empty() {
            None
        } else {
            Some(reader.read_string("language tag")?)
        };

        Ok(Reply::Status {
            id,
            code,
            message,
            language_tag,
        })
    }

    fn decode_name(reader: &mut WireReader<'_>) -> SftpResult<Self> {
        let id = reader.read_u32("request id")?;
        let count = reader.read_u32("name count")? as usize;

        // filename + longname length words + attribute flags
        if count.saturating_mul(12) > reader.remaining() {
            return Err(SftpError::Protocol(format!(
                "Name count {} exceeds remaining {} bytes",
                count,
                reader.remaining()
            )));
        }

        let mut entries = Vec::with_capacity(count);
        for _ in 0..count {
            let filename = reader.read_string("filename")?;
            let longname = reader.read_string("longname")?;
            let attrs = FileAttributes::read_from(reader)?;
            entries.push(DirEntry {
                filename,
                longname,
                attrs,
            });
        }
        Ok(Reply::Name { id, entries })
    }

    fn decode_attrs(reader: &mut WireReader<'_>) -> SftpResult<Self> {
        let id = reader.read_u32("request id")?;
        let attrs = FileAttributes::read_from(reader)?;
        Ok(Reply::Attrs { id, attrs })
    }

    fn decode_data(reader: &mut WireReader<'_>) -> SftpResult<Self> {
        let id = reader.read_u32("request id")?;
        let data = reader.read_bytes("data")?;
        Ok(Reply::Data { id, data })
    }
}
