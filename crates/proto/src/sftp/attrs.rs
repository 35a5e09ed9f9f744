//! SFTP file attributes (ATTRS).
//!
//! # Format
//!
//! ```text
//! uint32   flags
//! uint64   size           present only if flag SSH_FILEXFER_ATTR_SIZE
//! uint32   uid            present only if flag SSH_FILEXFER_ATTR_UIDGID
//! uint32   gid            present only if flag SSH_FILEXFER_ATTR_UIDGID
//! uint32   permissions    present only if flag SSH_FILEXFER_ATTR_PERMISSIONS
//! uint32   atime          present only if flag SSH_FILEXFER_ATTR_ACMODTIME
//! uint32   mtime          present only if flag SSH_FILEXFER_ATTR_ACMODTIME
//! uint32   extended_count present only if flag SSH_FILEXFER_ATTR_EXTENDED
//! string   extended_type
//! string   extended_data
//! ...      more extended_type/extended_data pairs, extended_count in total
//! ```
//!
//! The flags word is never stored: it is recomputed from the populated
//! groups on every encode. uid/gid and atime/mtime are held as pairs so a
//! half-populated group cannot be represented.

use super::error::{SftpError, SftpResult};
use super::types::{AttrFlags, FileType};
use super::wire::{put_string, WireReader};
use bytes::{BufMut, BytesMut};
use std::fmt;

/// File attributes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FileAttributes {
    size: Option<u64>,
    owner: Option<(u32, u32)>,
    permissions: Option<u32>,
    times: Option<(u32, u32)>,
    extensions: Vec<(String, String)>,
}

impl FileAttributes {
    /// Creates empty attributes (flags word 0).
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy with the size set.
    pub fn with_size(mut self, size: u64) -> Self {
        self.size = Some(size);
        self
    }

    /// Returns a copy with uid and gid set.
    pub fn with_owner(mut self, uid: u32, gid: u32) -> Self {
        self.owner = Some((uid, gid));
        self
    }

    /// Returns a copy with the permission word set.
    pub fn with_permissions(mut self, permissions: u32) -> Self {
        self.permissions = Some(permissions);
        self
    }

    /// Returns a copy with access and modification times set (Unix seconds).
    pub fn with_times(mut self, atime: u32, mtime: u32) -> Self {
        self.times = Some((atime, mtime));
        self
    }

    /// Returns a copy with one more extension pair appended.
    pub fn with_extension(mut self, name: impl Into<String>, data: impl Into<String>) -> Self {
        self.extensions.push((name.into(), data.into()));
        self
    }

    /// File size in bytes
    pub fn size(&self) -> Option<u64> {
        self.size
    }

    /// Owner user id
    pub fn uid(&self) -> Option<u32> {
        self.owner.map(|(uid, _)| uid)
    }

    /// Owner group id
    pub fn gid(&self) -> Option<u32> {
        self.owner.map(|(_, gid)| gid)
    }

    /// POSIX permission word, including the file type bits
    pub fn permissions(&self) -> Option<u32> {
        self.permissions
    }

    /// Last access time (Unix seconds)
    pub fn atime(&self) -> Option<u32> {
        self.times.map(|(atime, _)| atime)
    }

    /// Last modification time (Unix seconds)
    pub fn mtime(&self) -> Option<u32> {
        self.times.map(|(_, mtime)| mtime)
    }

    /// Extension pairs, in wire order
    pub fn extensions(&self) -> &[(String, String)] {
        &self.extensions
    }

    /// File type encoded in the permission word, if any.
    pub fn file_type(&self) -> Option<FileType> {
        self.permissions.and_then(FileType::from_permissions)
    }

    /// Returns true if the permission word marks a directory.
    pub fn is_dir(&self) -> bool {
        self.file_type() == Some(FileType::Directory)
    }

    /// Presence flags derived from the populated groups.
    pub fn flags(&self) -> u32 {
        let mut flags = 0u32;
        if self.size.is_some() {
            flags |= AttrFlags::SIZE;
        }
        if self.owner.is_some() {
            flags |= AttrFlags::UIDGID;
        }
        if self.permissions.is_some() {
            flags |= AttrFlags::PERMISSIONS;
        }
        if self.times.is_some() {
            flags |= AttrFlags::ACMODTIME;
        }
        if !self.extensions.is_empty() {
            flags |= AttrFlags::EXTENDED;
        }
        flags
    }

    /// Number of bytes [`encode`](Self::encode) will append.
    pub fn encoded_len(&self) -> usize {
        let mut len = 4;
        if self.size.is_some() {
            len += 8;
        }
        if self.owner.is_some() {
            len += 8;
        }
        if self.permissions.is_some() {
            len += 4;
        }
        if self.times.is_some() {
            len += 8;
        }
        if !self.extensions.is_empty() {
            len += 4;
            for (name, data) in &self.extensions {
                len += 8 + name.len() + data.len();
            }
        }
        len
    }

    /// Appends the wire encoding to `buf`.
    pub fn encode(&self, buf: &mut BytesMut) {
        buf.reserve(self.encoded_len());
        buf.put_u32(self.flags());

        if let Some(size) = self.size {
            buf.put_u64(size);
        }
        if let Some((uid, gid)) = self.owner {
            buf.put_u32(uid);
            buf.put_u32(gid);
        }
        if let Some(permissions) = self.permissions {
            buf.put_u32(permissions);
        }
        if let Some((atime, mtime)) = self.times {
            buf.put_u32(atime);
            buf.put_u32(mtime);
        }
        if !self.extensions.is_empty() {
            buf.put_u32(self.extensions.len() as u32);
            for (name, data) in &self.extensions {
                put_string(buf, name.as_bytes());
                put_string(buf, data.as_bytes());
            }
        }
    }

    /// Serializes to bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = BytesMut::with_capacity(self.encoded_len());
        self.encode(&mut buf);
        buf.to_vec()
    }

    /// Parses attributes from the start of `data`.
    ///
    /// Returns the attributes and the number of bytes consumed, so callers
    /// embedding ATTRS in a larger payload can continue after it.
    pub fn from_bytes(data: &[u8]) -> SftpResult<(Self, usize)> {
        let mut reader = WireReader::new(data);
        let attrs = Self::read_from(&mut reader)?;
        Ok((attrs, reader.consumed()))
    }

    pub(crate) fn read_from(reader: &mut WireReader<'_>) -> SftpResult<Self> {
        let flags = reader.read_u32("attribute flags")?;

        let known = AttrFlags::SIZE
            | AttrFlags::UIDGID
            | AttrFlags::PERMISSIONS
            | AttrFlags::ACMODTIME
            | AttrFlags::EXTENDED;
        if flags & !known != 0 {
            return Err(SftpError::Protocol(format!(
                "Unknown attribute flags: 0x{:08x}",
                flags & !known
            )));
        }

        let mut attrs = Self::new();

        if flags & AttrFlags::SIZE != 0 {
            attrs.size = Some(reader.read_u64("size")?);
        }
        if flags & AttrFlags::UIDGID != 0 {
            let uid = reader.read_u32("uid")?;
            let gid = reader.read_u32("gid")?;
            attrs.owner = Some((uid, gid));
        }
        if flags & AttrFlags::PERMISSIONS != 0 {
            attrs.permissions = Some(reader.read_u32("permissions")?);
        }
        if flags & AttrFlags::ACMODTIME != 0 {
            let atime = reader.read_u32("atime")?;
            let mtime = reader.read_u32("mtime")?;
            attrs.times = Some((atime, mtime));
        }
        if flags & AttrFlags::EXTENDED != 0 {
            let count = reader.read_u32("extended count")?;
            // Each pair needs at least two length words
            if (count as usize).saturating_mul(8) > reader.remaining() {
                return Err(SftpError::Protocol(format!(
                    "Extended count {} exceeds remaining {} bytes",
                    count,
                    reader.remaining()
                )));
            }
            for _ in 0..count {
                let name = reader.read_string("extended type")?;
                let data = reader.read_string("extended data")?;
                attrs.extensions.push((name, data));
            }
        }

        Ok(attrs)
    }
}

impl fmt::Display for FileAttributes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "flags=0x{:08x}", self.flags())?;
        if let Some(size) = self.size {
            write!(f, " size={}", size)?;
        }
        if let Some((uid, gid)) = self.owner {
            write!(f, " uid={} gid={}", uid, gid)?;
        }
        if let Some(permissions) = self.permissions {
            write!(f, " mode={:o}", permissions)?;
        }
        if let Some((atime, mtime)) = self.times {
            write!(f, " atime={} mtime={}", atime, mtime)?;
        }
        for (name, data) in &self.extensions {
            write!(f, " {}={}", name, data)?;
        }
        Ok(())
    }
}
