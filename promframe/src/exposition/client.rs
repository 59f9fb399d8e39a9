use bytes::{Buf, Bytes};
use http_body_util::{BodyExt, Empty};
use hyper::{header, Request};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};

use crate::{decoder::DelimitedDecoder, types::MetricFamily};

use super::{ExpositionError, FetchConfig, Format};

/// What an exposition endpoint answered with.
#[derive(Debug, Clone, PartialEq)]
pub enum Fetched {
    /// A delimited response, decoded
    Families(Vec<MetricFamily>),
    /// A text response, verbatim
    Text(String),
}

/// Scrape an exposition endpoint once.
///
/// The Accept header asks for `config.format`, but what comes back is decided by
/// the response's Content-Type: servers are free to ignore the ask.
pub async fn fetch(config: &FetchConfig) -> Result<Fetched, ExpositionError> {
    let client: Client<HttpConnector, Empty<Bytes>> =
        Client::builder(TokioExecutor::new()).build_http();
    let request = Request::get(config.endpoint.as_str())
        .header(header::ACCEPT, config.format.accept_header())
        .body(Empty::new())?;

    log::debug!("fetching {}", config.endpoint);
    let response = client.request(request).await?;
    let status = response.status();
    if !status.is_success() {
        return Err(ExpositionError::Status(status));
    }
    let format = Format::negotiate(
        response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|content_type| content_type.to_str().ok()),
    );
    let body = response.into_body().collect().await?.to_bytes();
    log::debug!("received {} bytes as {format:?}", body.len());

    match format {
        Format::Delimited => {
            let families = DelimitedDecoder::<_, MetricFamily>::with_max_frame_length(
                body.reader(),
                config.max_frame_length,
            )
            .collect::<Result<Vec<MetricFamily>, _>>()?;
            Ok(Fetched::Families(families))
        }
        Format::Text => Ok(Fetched::Text(String::from_utf8(body.to_vec())?)),
    }
}
