//! Streaming decoder for varint-delimited Prometheus metric families.
//!
//! [`promframe`] reads the `application/vnd.google.protobuf;
//! proto=io.prometheus.client.MetricFamily; encoding=delimited` exposition
//! format one record at a time from any [`std::io::BufRead`], and turns each
//! record into a typed [`MetricFamily`]. Memory use is bounded by the largest
//! single record, not by the stream.
//!
//! # Examples
//!
//! ```
//! let stream: &[u8] = &[0x07, 0x0a, 0x05, b'A', b'B', b'C', b'D', b'E'];
//! let families = promframe::decode_bytes(stream).expect("well formed stream");
//! assert_eq!("ABCDE", families[0].name);
//! ```
//!
//! # Getting Started
//!
//! [`decoder::DelimitedDecoder`] is the pull-based entry point. The
//! [`exposition`] module has a small HTTP client and server speaking both the
//! delimited and text formats, serving a [`prometheus::Registry`].

pub mod decoder;
mod error;
pub mod exposition;
pub mod frame;
pub mod pipeline;
pub mod types;

/// Internal generated types - ideally you shouldn't need to do much with them.
/// Nevertheless, they are exported in case you need them.
pub mod proto;

pub use decoder::{decode_all, decode_bytes, DelimitedDecoder, FrameDecode};
pub use error::DecodeError;
pub use frame::FrameReader;
pub use types::{
    Bucket, Histogram, LabelPair, Metric, MetricFamily, MetricType, MetricValue, Quantile,
    Summary,
};
