//! Lazily decode a delimited stream into metric families.

use std::{io::BufRead, marker::PhantomData};

use prost::Message;

use crate::{
    frame::FrameReader, pipeline::Sink, proto::client as proto, types::MetricFamily, DecodeError,
};

/// Turns one frame payload into a value, or fails.
///
/// The schema's own field encoding lives behind this seam; the decoder only
/// knows about framing.
pub trait FrameDecode: Sized {
    /// Parse a whole payload. An empty payload is valid input.
    fn decode_frame(payload: &[u8]) -> Result<Self, DecodeError>;
}

impl FrameDecode for proto::MetricFamily {
    fn decode_frame(payload: &[u8]) -> Result<Self, DecodeError> {
        Ok(proto::MetricFamily::decode(payload)?)
    }
}

impl FrameDecode for MetricFamily {
    fn decode_frame(payload: &[u8]) -> Result<Self, DecodeError> {
        proto::MetricFamily::decode_frame(payload)?.try_into()
    }
}

/// A pull-based decode session over one byte source.
///
/// Each call to `next()` reads exactly one frame. The first error ends the
/// session: it is yielded once and the iterator is fused afterwards. Values
/// already yielded stay valid.
///
/// ```
/// use promframe::{decoder::DelimitedDecoder, MetricFamily};
///
/// let stream: &[u8] = &[0x07, 0x0a, 0x05, b'A', b'B', b'C', b'D', b'E'];
/// let families: Vec<MetricFamily> = DelimitedDecoder::<_, MetricFamily>::new(stream)
///     .collect::<Result<_, _>>()
///     .expect("well formed stream");
/// assert_eq!("ABCDE", families[0].name);
/// ```
#[derive(Debug)]
pub struct DelimitedDecoder<R, T = MetricFamily> {
    frames: FrameReader<R>,
    decoded: usize,
    finished: bool,
    _decoding: PhantomData<fn() -> T>,
}

impl<R, T> DelimitedDecoder<R, T>
where
    R: BufRead,
    T: FrameDecode,
{
    /// Decode from `reader` with the default frame size limit.
    pub fn new(reader: R) -> Self {
        Self::from_frames(FrameReader::new(reader))
    }

    /// Decode from `reader`, refusing frames over `max_frame_length` bytes.
    pub fn with_max_frame_length(reader: R, max_frame_length: u64) -> Self {
        Self::from_frames(FrameReader::with_max_frame_length(reader, max_frame_length))
    }

    /// Decode from an already configured frame reader.
    pub fn from_frames(frames: FrameReader<R>) -> Self {
        Self {
            frames,
            decoded: 0,
            finished: false,
            _decoding: PhantomData,
        }
    }

    /// Number of values decoded so far.
    pub fn decoded(&self) -> usize {
        self.decoded
    }

    /// Give back the byte source.
    pub fn into_inner(self) -> R {
        self.frames.into_inner()
    }

    /// Read and decode the next frame.
    ///
    /// `Ok(None)` at the end of the stream, and forever after the session has
    /// ended for any reason.
    pub fn decode_next(&mut self) -> Result<Option<T>, DecodeError> {
        if self.finished {
            return Ok(None);
        }
        match self.read_one() {
            Ok(Some(value)) => {
                self.decoded += 1;
                Ok(Some(value))
            }
            Ok(None) => {
                log::debug!("delimited stream ended after {} frames", self.decoded);
                self.finished = true;
                Ok(None)
            }
            Err(e) => {
                log::debug!(
                    "abandoning delimited stream after {} frames: {e}",
                    self.decoded
                );
                self.finished = true;
                Err(e)
            }
        }
    }

    /// Decode every remaining frame into `sink`, returning how many were sunk.
    ///
    /// Values accepted before an error are not taken back.
    pub fn drain_into(mut self, sink: &impl Sink<T>) -> Result<usize, DecodeError> {
        let mut sunk = 0;
        while let Some(value) = self.decode_next()? {
            sink.accept(value);
            sunk += 1;
        }
        Ok(sunk)
    }

    fn read_one(&mut self) -> Result<Option<T>, DecodeError> {
        let payload = match self.frames.read_frame()? {
            Some(payload) => payload,
            None => return Ok(None),
        };
        T::decode_frame(&payload)
            .map(Some)
            .map_err(|e| e.at_frame(self.decoded))
    }
}

impl<R, T> Iterator for DelimitedDecoder<R, T>
where
    R: BufRead,
    T: FrameDecode,
{
    type Item = Result<T, DecodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.decode_next().transpose()
    }
}

impl<R, T> std::iter::FusedIterator for DelimitedDecoder<R, T>
where
    R: BufRead,
    T: FrameDecode,
{
}

/// Decode a whole stream, stopping at the first error.
pub fn decode_all(reader: impl BufRead) -> Result<Vec<MetricFamily>, DecodeError> {
    DelimitedDecoder::<_, MetricFamily>::new(reader).collect()
}

/// Decode an in-memory delimited buffer.
pub fn decode_bytes(bytes: &[u8]) -> Result<Vec<MetricFamily>, DecodeError> {
    decode_all(bytes)
}
