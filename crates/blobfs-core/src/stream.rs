//! Readable object streams
//!
//! The whole object body is downloaded when the stream is opened; reads and
//! seeks afterwards never touch the store.

use crate::client::ObjectInfo;
use crate::translate::TranslatedStore;
use crate::{FsError, Result};
use bytes::Bytes;
use std::io::{Read, Seek, SeekFrom};
use std::str::FromStr;
use tracing::debug;

/// Default length for [`ObjectReader::read_bytes`] (1 MiB)
pub const DEFAULT_READ_SIZE: usize = 1024 * 1024;

/// How a path is opened
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    Read,
    Write,
    Append,
}

impl FromStr for OpenMode {
    type Err = FsError;

    fn from_str(mode: &str) -> Result<Self> {
        match mode {
            "r" | "rb" => Ok(OpenMode::Read),
            "w" | "wb" => Ok(OpenMode::Write),
            "a" | "ab" => Ok(OpenMode::Append),
            other => Err(FsError::InvalidArgument(format!(
                "Unavailable mode \"{}\"",
                other
            ))),
        }
    }
}

/// An object body held in memory behind `Read` and `Seek`
#[derive(Debug)]
pub struct ObjectReader {
    object: ObjectInfo,
    data: Bytes,
    /// Current position; may lie past the end after a seek
    position: u64,
}

impl ObjectReader {
    /// Download `object` and wrap it
    ///
    /// # Errors
    /// Only [`OpenMode::Read`] is available; other modes fail with
    /// `FsError::InvalidArgument`. Download failures are translated store
    /// errors.
    pub fn open(store: &TranslatedStore, object: ObjectInfo, mode: OpenMode) -> Result<Self> {
        if mode != OpenMode::Read {
            return Err(FsError::InvalidArgument(format!(
                "Unavailable mode {:?} for '{}'",
                mode, object.key
            )));
        }

        let data = store.download(&object)?;
        debug!(bucket = %object.bucket, key = %object.key, bytes = data.len(), "downloaded object");
        Ok(Self::from_bytes(object, data))
    }

    /// Wrap an already downloaded body
    pub fn from_bytes(object: ObjectInfo, data: Bytes) -> Self {
        Self {
            object,
            data,
            position: 0,
        }
    }

    /// The object this stream was opened on
    pub fn object(&self) -> &ObjectInfo {
        &self.object
    }

    /// Get the size of the object
    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }

    /// Get the current position
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Read up to `length` bytes from the current position
    ///
    /// Returns fewer bytes near the end and an empty buffer past it.
    pub fn read_bytes(&mut self, length: usize) -> Bytes {
        let size = self.data.len();
        let start = usize::try_from(self.position).unwrap_or(size).min(size);
        let end = start.saturating_add(length).min(size);
        self.position = self.position.max(start as u64) + (end - start) as u64;
        self.data.slice(start..end)
    }

    /// Everything from the current position to the end
    pub fn read_remaining(&mut self) -> Bytes {
        self.read_bytes(usize::MAX)
    }
}

impl Read for ObjectReader {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let chunk = self.read_bytes(buf.len());
        buf[..chunk.len()].copy_from_slice(&chunk);
        Ok(chunk.len())
    }
}

impl Seek for ObjectReader {
    fn seek(&mut self, pos: SeekFrom) -> std::io::Result<u64> {
        let (base, offset) = match pos {
            SeekFrom::Start(offset) => {
                self.position = offset;
                return Ok(self.position);
            }
            SeekFrom::End(offset) => (self.size(), offset),
            SeekFrom::Current(offset) => (self.position, offset),
        };

        match base.checked_add_signed(offset) {
            Some(new_pos) => {
                self.position = new_pos;
                Ok(self.position)
            }
            None => Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "Cannot seek before start of object",
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const QUOTE_EN: &str = "a journey of a thousand miles begins with a single step";

    fn reader(text: &str) -> ObjectReader {
        ObjectReader::from_bytes(
            ObjectInfo::placeholder("b", "quote.txt"),
            Bytes::copy_from_slice(text.as_bytes()),
        )
    }

    #[test]
    fn test_basic_read() {
        let mut r = reader(QUOTE_EN);
        assert_eq!(r.read_bytes(DEFAULT_READ_SIZE), QUOTE_EN.as_bytes());

        let mut r = reader(QUOTE_EN);
        assert_eq!(r.read_bytes(4), &QUOTE_EN.as_bytes()[..4]);
    }

    #[test]
    fn test_unicode_read() {
        let quote_ch = "千里之行，始於足下";
        let mut r = reader(quote_ch);
        assert_eq!(r.read_bytes(4), &quote_ch.as_bytes()[..4]);
        assert_eq!(r.read_remaining(), &quote_ch.as_bytes()[4..]);
    }

    #[test]
    fn test_seek() {
        let bytes = QUOTE_EN.as_bytes();
        let mut r = reader(QUOTE_EN);

        r.seek(SeekFrom::Start(0)).unwrap();
        assert_eq!(r.read_bytes(2), &bytes[..2]);
        r.seek(SeekFrom::Start(1)).unwrap();
        assert_eq!(r.read_bytes(2), &bytes[1..3]);
        r.seek(SeekFrom::End(-1)).unwrap();
        assert_eq!(r.read_remaining(), &bytes[bytes.len() - 1..]);
        r.seek(SeekFrom::Start(0)).unwrap();
        r.seek(SeekFrom::Current(2)).unwrap();
        assert_eq!(r.read_bytes(2), &bytes[2..4]);
    }

    #[test]
    fn test_read_past_end_is_empty() {
        let mut r = reader("abc");
        assert_eq!(r.read_bytes(10), "abc".as_bytes());
        assert!(r.read_bytes(10).is_empty());

        assert_eq!(r.seek(SeekFrom::Start(100)).unwrap(), 100);
        assert!(r.read_bytes(1).is_empty());
        assert_eq!(r.position(), 100);

        let mut buf = [0u8; 8];
        assert_eq!(r.read(&mut buf).unwrap(), 0);
    }

    #[test]
    fn test_seek_before_start_fails() {
        let mut r = reader("abc");
        let err = r.seek(SeekFrom::Current(-1)).unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::InvalidInput);
        assert!(r.seek(SeekFrom::End(-4)).is_err());
        assert_eq!(r.position(), 0);
    }

    #[test]
    fn test_std_read_to_end() {
        let mut r = reader(QUOTE_EN);
        r.seek(SeekFrom::Start(2)).unwrap();
        let mut out = String::new();
        r.read_to_string(&mut out).unwrap();
        assert_eq!(out, &QUOTE_EN[2..]);
    }

    #[test]
    fn test_open_mode_parsing() {
        assert_eq!("r".parse::<OpenMode>().unwrap(), OpenMode::Read);
        assert_eq!("w".parse::<OpenMode>().unwrap(), OpenMode::Write);
        assert!(matches!(
            "x+".parse::<OpenMode>(),
            Err(FsError::InvalidArgument(_))
        ));
    }
}
