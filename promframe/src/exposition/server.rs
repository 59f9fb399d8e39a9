use std::convert::Infallible;

use bytes::Bytes;
use http_body_util::Full;
use hyper::{
    body::Incoming, header, header::HeaderValue, server::conn::http1, service::service_fn,
    Request, Response, StatusCode,
};
use hyper_util::rt::TokioIo;
use prometheus::{
    register_counter_vec_with_registry, CounterVec, Encoder, ProtobufEncoder, Registry,
    TextEncoder,
};
use tokio::net::TcpListener;

use super::{ExpositionError, Format};

/// Path the registry is exposed on
pub const METRICS_PATH: &str = "/metrics";

/// What every connection of the server shares.
#[derive(Clone, Debug)]
pub struct ServerState {
    registry: Registry,
    requests: CounterVec,
}

impl ServerState {
    /// Registers `http_requests_total` in `registry`, counting every request that
    /// is not a scrape.
    pub fn new(registry: Registry) -> Result<Self, prometheus::Error> {
        let requests = register_counter_vec_with_registry!(
            "http_requests_total",
            "Total number of HTTP requests",
            &["method", "endpoint"],
            registry
        )?;
        Ok(Self { registry, requests })
    }

    /// The registry scrapes are served from
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Answer one request.
    pub fn respond<B>(&self, request: &Request<B>) -> Response<Full<Bytes>> {
        log::debug!("{} {}", request.method(), request.uri());
        if request.uri().path() == METRICS_PATH {
            let format = Format::negotiate(
                request
                    .headers()
                    .get(header::ACCEPT)
                    .and_then(|accept| accept.to_str().ok()),
            );
            self.scrape(format)
        } else {
            match self
                .requests
                .get_metric_with_label_values(&[request.method().as_str(), "/"])
            {
                Ok(requests) => requests.inc(),
                Err(e) => log::error!("could not count request: {e}"),
            }
            Response::new(Full::new(Bytes::from_static(b"Hello, World!")))
        }
    }

    fn scrape(&self, format: Format) -> Response<Full<Bytes>> {
        let families = self.registry.gather();
        log::debug!("serving {} families as {format:?}", families.len());
        let mut buffer = Vec::new();
        let encoded = match format {
            Format::Delimited => ProtobufEncoder::new().encode(&families, &mut buffer),
            Format::Text => TextEncoder::new().encode(&families, &mut buffer),
        };
        let mut response = match encoded {
            Ok(()) => Response::new(Full::new(Bytes::from(buffer))),
            Err(e) => {
                log::error!("could not encode metric families: {e}");
                let mut response = Response::new(Full::new(Bytes::new()));
                *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
                return response;
            }
        };
        response.headers_mut().insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static(format.content_type()),
        );
        response
    }
}

/// Serve HTTP/1 on `listener` until accepting a connection fails.
pub async fn serve(listener: TcpListener, state: ServerState) -> Result<(), ExpositionError> {
    log::info!("serving on {}", listener.local_addr()?);
    loop {
        let (stream, peer) = listener.accept().await?;
        let state = state.clone();
        tokio::spawn(async move {
            let service = service_fn(move |request: Request<Incoming>| {
                let response = state.respond(&request);
                async move { Ok::<_, Infallible>(response) }
            });
            if let Err(e) = http1::Builder::new()
                .serve_connection(TokioIo::new(stream), service)
                .await
            {
                log::debug!("connection from {peer} ended: {e}");
            }
        });
    }
}
