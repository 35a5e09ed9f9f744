//! Primitive SFTP wire encoding.
//!
//! ```text
//! uint32    big-endian, 4 bytes
//! uint64    big-endian, 8 bytes
//! string    uint32 length followed by that many bytes
//! ```

use super::error::{SftpError, SftpResult};
use bytes::{Buf, BufMut, BytesMut};

/// Writes a length-prefixed string.
pub(crate) fn put_string(buf: &mut BytesMut, data: &[u8]) {
    buf.put_u32(data.len() as u32);
    buf.put_slice(data);
}

/// Bounds-checked cursor over a received payload.
///
/// Every read fails with [`SftpError::Protocol`] instead of panicking when
/// the payload is shorter than the field being read.
pub(crate) struct WireReader<'a> {
    buf: &'a [u8],
    total: usize,
}

impl<'a> WireReader<'a> {
    pub(crate) fn new(buf: &'a [u8]) -> Self {
        Self {
            buf,
            total: buf.len(),
        }
    }

    /// Bytes not yet read.
    pub(crate) fn remaining(&self) -> usize {
        self.buf.remaining()
    }

    /// Bytes read so far.
    pub(crate) fn consumed(&self) -> usize {
        self.total - self.buf.remaining()
    }

    pub(crate) fn is_empty(&self) -> bool {
        !self.buf.has_remaining()
    }

    fn ensure(&self, needed: usize, field: &str) -> SftpResult<()> {
        if self.buf.remaining() < needed {
            return Err(SftpError::Protocol(format!(
                "Truncated {}: need {} bytes at offset {}, have {}",
                field,
                needed,
                self.consumed(),
                self.buf.remaining()
            )));
        }
        Ok(())
    }

    pub(crate) fn read_u8(&mut self, field: &str) -> SftpResult<u8> {
        self.ensure(1, field)?;
        Ok(self.buf.get_u8())
    }

    pub(crate) fn read_u32(&mut self, field: &str) -> SftpResult<u32> {
        self.ensure(4, field)?;
        Ok(self.buf.get_u32())
    }

    pub(crate) fn read_u64(&mut self, field: &str) -> SftpResult<u64> {
        self.ensure(8, field)?;
        Ok(self.buf.get_u64())
    }

    /// Reads a length-prefixed byte string.
    pub(crate) fn read_bytes(&mut self, field: &str) -> SftpResult<Vec<u8>> {
        let len = self.read_u32(field)? as usize;
        self.ensure(len, field)?;
        let data = self.buf[..len].to_vec();
        self.buf.advance(len);
        Ok(data)
    }

    /// Reads a length-prefixed UTF-8 string.
    pub(crate) fn read_string(&mut self, field: &str) -> SftpResult<String> {
        let bytes = self.read_bytes(field)?;
        String::from_utf8(bytes)
            .map_err(|_| SftpError::Protocol(format!("{} contains invalid UTF-8", field)))
    }
}
