//! Serving and scraping metric families over HTTP

use std::str::FromStr;

use prost::Message;
use thiserror::Error;

use crate::{proto::client as proto, DecodeError};

mod client;
mod config;
mod server;

pub use client::{fetch, Fetched};
pub use config::{FetchConfig, ServeConfig};
pub use server::{serve, ServerState, METRICS_PATH};

/// What a scraper asks for when it wants the delimited protobuf encoding.
pub const DELIMITED_ACCEPT: &str =
    "application/vnd.google.protobuf;proto=io.prometheus.client.MetricFamily;encoding=delimited";
/// Content type of a delimited protobuf response.
pub const DELIMITED_CONTENT_TYPE: &str = prometheus::PROTOBUF_FORMAT;
/// What a scraper asks for when it wants the text encoding.
pub const TEXT_ACCEPT: &str = "text/plain;version=0.0.4";
/// Content type of a text response.
pub const TEXT_CONTENT_TYPE: &str = prometheus::TEXT_FORMAT;

const PROTOBUF_MEDIA_TYPE: &str = "application/vnd.google.protobuf";
const METRIC_FAMILY_PROTO: &str = "io.prometheus.client.MetricFamily";

/// Errors from the HTTP side of things.
#[derive(Debug, Error)]
pub enum ExpositionError {
    /// The request could not be built, usually a bad endpoint URI
    #[error("invalid request: {0}")]
    Request(#[from] hyper::http::Error),
    /// The request could not be sent or the response could not be read
    #[error("request failed: {0}")]
    Client(#[from] hyper_util::client::legacy::Error),
    /// The connection failed while streaming a body
    #[error("HTTP error: {0}")]
    Http(#[from] hyper::Error),
    /// The endpoint answered, but not with a success
    #[error("endpoint answered {0}")]
    Status(hyper::StatusCode),
    /// A text exposition was not utf-8
    #[error("text exposition is not utf-8: {0}")]
    Text(#[from] std::string::FromUtf8Error),
    /// A delimited exposition could not be decoded
    #[error(transparent)]
    Decode(#[from] DecodeError),
    /// The metrics registry refused a registration or could not encode a scrape
    #[error("metrics registry: {0}")]
    Metrics(#[from] prometheus::Error),
    /// Socket trouble
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// An environment variable held something unusable
    #[error("invalid configuration: {0}")]
    Config(String),
}

/// The two exposition encodings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Format {
    /// Varint length-prefixed `io.prometheus.client.MetricFamily` records
    #[default]
    Delimited,
    /// The human readable text format, version 0.0.4
    Text,
}

impl Format {
    /// The Accept header a scraper sends to ask for this format.
    pub fn accept_header(&self) -> &'static str {
        match self {
            Format::Delimited => DELIMITED_ACCEPT,
            Format::Text => TEXT_ACCEPT,
        }
    }

    /// The Content-Type a server answers with in this format.
    pub fn content_type(&self) -> &'static str {
        match self {
            Format::Delimited => DELIMITED_CONTENT_TYPE,
            Format::Text => TEXT_CONTENT_TYPE,
        }
    }

    /// Pick a format from an Accept or Content-Type header.
    ///
    /// Only an explicit request for delimited `io.prometheus.client.MetricFamily`
    /// protobuf selects [`Format::Delimited`]; everything else, including no
    /// header at all, is text. A range with `q=0` is a refusal, not a request.
    pub fn negotiate(header: Option<&str>) -> Format {
        let wants_delimited = header
            .into_iter()
            .flat_map(|header| header.split(','))
            .any(is_delimited_media_range);
        if wants_delimited {
            Format::Delimited
        } else {
            Format::Text
        }
    }
}

fn is_delimited_media_range(range: &str) -> bool {
    let mut parts = range.split(';').map(str::trim);
    if !parts
        .next()
        .is_some_and(|media_type| media_type.eq_ignore_ascii_case(PROTOBUF_MEDIA_TYPE))
    {
        return false;
    }
    let mut proto_matches = false;
    let mut delimited = false;
    let mut acceptable = true;
    for parameter in parts {
        match parameter.split_once('=').map(|(k, v)| (k.trim(), v.trim())) {
            Some(("proto", value)) => proto_matches = value == METRIC_FAMILY_PROTO,
            Some(("encoding", value)) => delimited = value == "delimited",
            Some((key, value)) if key.eq_ignore_ascii_case("q") => {
                acceptable = value.parse::<f64>().is_ok_and(|quality| 0.0 < quality)
            }
            _ => (),
        }
    }
    proto_matches && delimited && acceptable
}

impl FromStr for Format {
    type Err = ExpositionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "delimited" | "protobuf" => Ok(Format::Delimited),
            "text" => Ok(Format::Text),
            other => Err(ExpositionError::Config(format!(
                "unknown exposition format {other:?}, expected delimited or text"
            ))),
        }
    }
}

/// Serialize schema records as a delimited stream.
///
/// Scrapes are served through the `prometheus` crate's encoders; this is for
/// producing streams from records already held as [`proto::MetricFamily`].
pub fn encode_delimited<'a>(
    families: impl IntoIterator<Item = &'a proto::MetricFamily>,
) -> Vec<u8> {
    let mut buffer = Vec::new();
    for family in families {
        buffer.extend(family.encode_length_delimited_to_vec());
    }
    buffer
}
