//! Input stream abstraction consumed by the signer.

use std::io::SeekFrom;

use bytes::Bytes;

use crate::Error;
use crate::Result;

/// Reported state of an [`InputStream`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamStatus {
    /// Whether the stream supports seeking.
    pub seekable: bool,
    /// Whether the total length of the stream is known up front.
    pub known_length: bool,
    /// Whether the stream has reached its end.
    pub at_eof: bool,
}

/// A blocking, forward-reading byte stream.
///
/// Request bodies handed to the signer implement this trait. Two
/// concrete variants ship with the crate: [`CursorStream`] over
/// in-memory bytes, and the tee family ([`TeeStream`][crate::TeeStream],
/// [`TeeBranch`][crate::TeeBranch]) that makes a single-pass source
/// replayable.
pub trait InputStream {
    /// Read up to `dst.len()` bytes into `dst`, returning the number of
    /// bytes written. A return of 0 with a non-empty `dst` means end of
    /// stream.
    fn read(&mut self, dst: &mut [u8]) -> Result<usize>;

    /// Move the read position. Returns the new absolute position.
    fn seek(&mut self, pos: SeekFrom) -> Result<u64>;

    /// Report seekability, length knowledge, and end-of-stream state.
    fn status(&self) -> StreamStatus;

    /// Total length of the stream, if known.
    fn length(&self) -> Option<u64>;

    /// Whether this stream is a tee created by
    /// [`TeeStream::wrap`][crate::TeeStream::wrap]. Lets the signer
    /// avoid double-wrapping a body that is already replayable.
    fn is_tee(&self) -> bool {
        false
    }

    /// Open an independent view over this stream, starting at offset 0.
    ///
    /// Returns `None` for streams that are not tees.
    fn new_branch(&self) -> Option<Box<dyn InputStream>> {
        None
    }
}

/// Request body type accepted by the signer: an optional boxed stream.
pub type Body = Option<Box<dyn InputStream>>;

/// An in-memory stream over a byte buffer with a read cursor.
#[derive(Debug, Clone)]
pub struct CursorStream {
    data: Bytes,
    pos: u64,
}

impl CursorStream {
    /// Create a stream over the given bytes, positioned at offset 0.
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self {
            data: data.into(),
            pos: 0,
        }
    }
}

impl InputStream for CursorStream {
    fn read(&mut self, dst: &mut [u8]) -> Result<usize> {
        let start = self.pos.min(self.data.len() as u64) as usize;
        let n = dst.len().min(self.data.len() - start);
        dst[..n].copy_from_slice(&self.data[start..start + n]);
        self.pos += n as u64;
        Ok(n)
    }

    fn seek(&mut self, pos: SeekFrom) -> Result<u64> {
        let target = match pos {
            SeekFrom::Start(offset) => offset as i128,
            SeekFrom::Current(offset) => self.pos as i128 + offset as i128,
            SeekFrom::End(offset) => self.data.len() as i128 + offset as i128,
        };
        if target < 0 {
            return Err(Error::invalid_seek(format!(
                "seek resolves to negative position {target}"
            )));
        }
        self.pos = target as u64;
        Ok(self.pos)
    }

    fn status(&self) -> StreamStatus {
        StreamStatus {
            seekable: true,
            known_length: true,
            at_eof: self.pos >= self.data.len() as u64,
        }
    }

    fn length(&self) -> Option<u64> {
        Some(self.data.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cursor_read_all() {
        let mut s = CursorStream::new("hello world");
        let mut buf = [0u8; 5];

        assert_eq!(s.read(&mut buf).unwrap(), 5);
        assert_eq!(&buf, b"hello");
        assert!(!s.status().at_eof);

        let mut rest = [0u8; 16];
        assert_eq!(s.read(&mut rest).unwrap(), 6);
        assert_eq!(&rest[..6], b" world");
        assert_eq!(s.read(&mut rest).unwrap(), 0);
        assert!(s.status().at_eof);
    }

    #[test]
    fn test_cursor_seek() {
        let mut s = CursorStream::new("hello");
        assert_eq!(s.seek(SeekFrom::End(-2)).unwrap(), 3);

        let mut buf = [0u8; 8];
        assert_eq!(s.read(&mut buf).unwrap(), 2);
        assert_eq!(&buf[..2], b"lo");

        assert_eq!(s.seek(SeekFrom::Start(1)).unwrap(), 1);
        assert_eq!(s.seek(SeekFrom::Current(2)).unwrap(), 3);

        let err = s.seek(SeekFrom::Current(-10)).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::InvalidSeek);
        // Failed seek leaves the position untouched.
        assert_eq!(s.seek(SeekFrom::Current(0)).unwrap(), 3);
    }

    #[test]
    fn test_cursor_length() {
        let s = CursorStream::new("hello");
        assert_eq!(s.length(), Some(5));
        assert!(s.status().seekable);
        assert!(s.status().known_length);
        assert!(!s.is_tee());
        assert!(s.new_branch().is_none());
    }
}
