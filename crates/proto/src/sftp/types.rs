//! SFTP data types and constants.

use std::fmt;

/// SFTP status codes (SSH_FX_*).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u32)]
pub enum StatusCode {
    /// SSH_FX_OK - Success
    Ok = 0,
    /// SSH_FX_EOF - End of file
    Eof = 1,
    /// SSH_FX_NO_SUCH_FILE - No such file
    NoSuchFile = 2,
    /// SSH_FX_PERMISSION_DENIED - Permission denied
    PermissionDenied = 3,
    /// SSH_FX_FAILURE - General failure
    Failure = 4,
    /// SSH_FX_BAD_MESSAGE - Bad message
    BadMessage = 5,
    /// SSH_FX_NO_CONNECTION - No connection
    NoConnection = 6,
    /// SSH_FX_CONNECTION_LOST - Connection lost
    ConnectionLost = 7,
    /// SSH_FX_OP_UNSUPPORTED - Operation not supported
    OpUnsupported = 8,
}

impl StatusCode {
    /// Convert from u32.
    pub fn from_u32(value: u32) -> Option<Self> {
        match value {
            0 => Some(Self::Ok),
            1 => Some(Self::Eof),
            2 => Some(Self::NoSuchFile),
            3 => Some(Self::PermissionDenied),
            4 => Some(Self::Failure),
            5 => Some(Self::BadMessage),
            6 => Some(Self::NoConnection),
            7 => Some(Self::ConnectionLost),
            8 => Some(Self::OpUnsupported),
            _ => None,
        }
    }

    /// Returns the wire value.
    pub fn as_u32(self) -> u32 {
        self as u32
    }

    /// Returns the canonical message for this code.
    pub fn message(&self) -> &'static str {
        match self {
            Self::Ok => "Success",
            Self::Eof => "End of file",
            Self::NoSuchFile => "No such file or directory",
            Self::PermissionDenied => "Permission denied",
            Self::Failure => "Failure",
            Self::BadMessage => "Bad message",
            Self::NoConnection => "No connection",
            Self::ConnectionLost => "Connection lost",
            Self::OpUnsupported => "Operation not supported",
        }
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.message(), self.as_u32())
    }
}

/// POSIX file mode constants (`S_IF*`).
pub mod mode {
    /// Mask for the file type bits
    pub const S_IFMT: u32 = 0o170000;
    /// Socket
    pub const S_IFSOCK: u32 = 0o140000;
    /// Symbolic link
    pub const S_IFLNK: u32 = 0o120000;
    /// Regular file
    pub const S_IFREG: u32 = 0o100000;
    /// Block device
    pub const S_IFBLK: u32 = 0o060000;
    /// Directory
    pub const S_IFDIR: u32 = 0o040000;
    /// Character device
    pub const S_IFCHR: u32 = 0o020000;
    /// FIFO
    pub const S_IFIFO: u32 = 0o010000;
}

/// File type, derived from the type bits of a permission word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FileType {
    /// Named pipe
    Fifo,
    /// Unix domain socket
    Socket,
    /// Symbolic link
    SymbolicLink,
    /// Regular file
    Regular,
    /// Block device
    BlockDevice,
    /// Directory
    Directory,
    /// Character device
    CharacterDevice,
}

impl FileType {
    /// Classifies a POSIX permission word by its `S_IFMT` bits.
    ///
    /// Returns `None` when no file type bits are set or the combination is
    /// not one of the standard types.
    pub fn from_permissions(permissions: u32) -> Option<Self> {
        match permissions & mode::S_IFMT {
            mode::S_IFIFO => Some(Self::Fifo),
            mode::S_IFSOCK => Some(Self::Socket),
            mode::S_IFLNK => Some(Self::SymbolicLink),
            mode::S_IFREG => Some(Self::Regular),
            mode::S_IFBLK => Some(Self::BlockDevice),
            mode::S_IFDIR => Some(Self::Directory),
            mode::S_IFCHR => Some(Self::CharacterDevice),
            _ => None,
        }
    }
}

/// Classifies an optional permission word.
pub fn classify_file_type(permissions: Option<u32>) -> Option<FileType> {
    permissions.and_then(FileType::from_permissions)
}

/// File open flags (SSH_FXF_*).
#[derive(Debug)]
pub struct OpenFlags;

impl OpenFlags {
    /// SSH_FXF_READ - Open for reading
    pub const READ: u32 = 0x00000001;
    /// SSH_FXF_WRITE - Open for writing
    pub const WRITE: u32 = 0x00000002;
    /// SSH_FXF_APPEND - Force writes to append
    pub const APPEND: u32 = 0x00000004;
    /// SSH_FXF_CREAT - Create if doesn't exist
    pub const CREAT: u32 = 0x00000008;
    /// SSH_FXF_TRUNC - Truncate to 0 length
    pub const TRUNC: u32 = 0x00000010;
    /// SSH_FXF_EXCL - Fail if file exists
    pub const EXCL: u32 = 0x00000020;
}

/// File attribute flags (SSH_FILEXFER_ATTR_*).
#[derive(Debug)]
pub struct AttrFlags;

impl AttrFlags {
    /// SSH_FILEXFER_ATTR_SIZE
    pub const SIZE: u32 = 0x00000001;
    /// SSH_FILEXFER_ATTR_UIDGID
    pub const UIDGID: u32 = 0x00000002;
    /// SSH_FILEXFER_ATTR_PERMISSIONS
    pub const PERMISSIONS: u32 = 0x00000004;
    /// SSH_FILEXFER_ATTR_ACMODTIME
    pub const ACMODTIME: u32 = 0x00000008;
    /// SSH_FILEXFER_ATTR_EXTENDED
    pub const EXTENDED: u32 = 0x80000000;
}

/// Opaque server-issued handle for an open file or directory.
///
/// Handles are raw bytes; OpenSSH, for one, issues binary handles. A handle
/// is not `Clone`: closing it consumes it.
#[derive(PartialEq, Eq)]
pub struct Handle(Vec<u8>);

impl Handle {
    /// Wraps raw handle bytes.
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    /// Returns the raw handle bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Hex rendering for logs.
    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }
}

impl fmt::Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Handle({})", self.to_hex())
    }
}

/// One entry of a NAME reply.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DirEntry {
    /// File name (a bare name for READDIR, a full path for REALPATH/READLINK)
    pub filename: String,
    /// `ls -l` style long listing, server formatted
    pub longname: String,
    /// Attributes of the entry
    pub attrs: super::attrs::FileAttributes,
}
