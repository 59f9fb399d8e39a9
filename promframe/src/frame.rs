//! Varint length-prefixed framing.
//!
//! A delimited stream is a back-to-back concatenation of
//! `varint(length) ++ payload[length]` frames with no padding or trailer.

use std::io::{self, BufRead, Read, Write};

use crate::DecodeError;

/// Frames larger than this are refused unless the reader is configured otherwise.
pub const DEFAULT_MAX_FRAME_LENGTH: u64 = 16 * 1024 * 1024;

/// A u64 never needs more than 10 groups of 7 bits.
pub const MAX_VARINT_LENGTH: usize = 10;

// Announced lengths are not trusted for allocation until the bytes show up.
const PREALLOCATION_LIMIT: u64 = 64 * 1024;

/// Reads one length-prefixed frame at a time from a byte source.
///
/// The reader does not own the lifecycle of the source: closing a connection or
/// file is left to whoever opened it. After any error the position in the source
/// is unspecified, so the session should be abandoned.
#[derive(Debug)]
pub struct FrameReader<R> {
    reader: R,
    max_frame_length: u64,
    frames_read: usize,
}

impl<R> FrameReader<R>
where
    R: BufRead,
{
    /// Read frames from `reader`, refusing frames over [`DEFAULT_MAX_FRAME_LENGTH`].
    ///
    /// Unbuffered sources should be wrapped in a [`std::io::BufReader`]; the length
    /// prefix is consumed one byte at a time.
    pub fn new(reader: R) -> Self {
        Self::with_max_frame_length(reader, DEFAULT_MAX_FRAME_LENGTH)
    }

    /// Read frames from `reader`, refusing frames over `max_frame_length` bytes.
    pub fn with_max_frame_length(reader: R, max_frame_length: u64) -> Self {
        Self {
            reader,
            max_frame_length,
            frames_read: 0,
        }
    }

    /// How many complete frames this reader has produced, which is also the
    /// zero-based index of the next frame.
    pub fn frames_read(&self) -> usize {
        self.frames_read
    }

    /// The largest payload this reader will accept.
    pub fn max_frame_length(&self) -> u64 {
        self.max_frame_length
    }

    /// Give back the byte source.
    pub fn into_inner(self) -> R {
        self.reader
    }

    /// Read the next length prefix.
    ///
    /// `Ok(None)` means the source was exhausted before the first byte of the prefix,
    /// which is the normal end of a stream. Running out of bytes part way through the
    /// prefix is a [`DecodeError::TruncatedLength`].
    pub fn read_length(&mut self) -> Result<Option<u64>, DecodeError> {
        let mut length: u64 = 0;
        for index in 0..MAX_VARINT_LENGTH {
            let byte = match self.next_byte()? {
                Some(byte) => byte,
                None if index == 0 => return Ok(None),
                None => return Err(DecodeError::TruncatedLength { bytes_read: index }),
            };
            // The 10th group only has room for bit 63.
            if index == MAX_VARINT_LENGTH - 1 && 1 < byte {
                return Err(DecodeError::MalformedLength);
            }
            length |= u64::from(byte & 0x7f) << (7 * index);
            if byte & 0x80 == 0 {
                return Ok(Some(length));
            }
        }
        Err(DecodeError::MalformedLength)
    }

    /// Read the next whole frame and return its payload.
    ///
    /// A zero length prefix yields an empty payload without touching the source again.
    pub fn read_frame(&mut self) -> Result<Option<Vec<u8>>, DecodeError> {
        let length = match self.read_length()? {
            Some(length) => length,
            None => return Ok(None),
        };
        if self.max_frame_length < length {
            return Err(DecodeError::FrameTooLarge {
                length,
                limit: self.max_frame_length,
            });
        }

        let mut payload = Vec::with_capacity(length.min(PREALLOCATION_LIMIT) as usize);
        if 0 < length {
            let available = (&mut self.reader).take(length).read_to_end(&mut payload)? as u64;
            if available < length {
                return Err(DecodeError::TruncatedPayload {
                    expected: length,
                    available,
                });
            }
        }

        log::trace!("read frame {} with {length} byte payload", self.frames_read);
        self.frames_read += 1;
        Ok(Some(payload))
    }

    fn next_byte(&mut self) -> Result<Option<u8>, DecodeError> {
        loop {
            let byte = match self.reader.fill_buf() {
                Ok(buffer) => buffer.first().copied(),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            };
            if byte.is_some() {
                self.reader.consume(1);
            }
            return Ok(byte);
        }
    }
}

/// Append `length` as a base-128 varint, least significant group first.
pub fn encode_length(mut length: u64, into: &mut Vec<u8>) {
    while 0x80 <= length {
        into.push((length as u8 & 0x7f) | 0x80);
        length >>= 7;
    }
    into.push(length as u8);
}

/// Write one frame: the payload's length prefix, then the payload.
pub fn write_frame(writer: &mut impl Write, payload: &[u8]) -> io::Result<()> {
    let mut prefix = Vec::with_capacity(MAX_VARINT_LENGTH);
    encode_length(payload.len() as u64, &mut prefix);
    writer.write_all(&prefix)?;
    writer.write_all(payload)
}
