use promframe::{
    decode_bytes,
    exposition::{encode_delimited, fetch, serve, FetchConfig, Fetched, Format, ServerState},
    proto::client as proto,
    DecodeError, DelimitedDecoder, MetricFamily, MetricType, MetricValue,
};
use prometheus::Registry;
use tokio::net::TcpListener;

fn gauge_family(i: usize) -> proto::MetricFamily {
    proto::MetricFamily {
        name: Some(format!("gauge_{i}")),
        help: Some(format!("gauge number {i}")),
        r#type: Some(proto::MetricType::Gauge as i32),
        metric: vec![proto::Metric {
            label: vec![proto::LabelPair {
                name: Some("shard".to_string()),
                value: Some(i.to_string()),
            }],
            gauge: Some(proto::Gauge {
                value: Some(i as f64 / 2.0),
            }),
            ..Default::default()
        }],
        unit: None,
    }
}

#[test_log::test]
fn frames_come_out_in_order() {
    let wire: Vec<proto::MetricFamily> = (0..50).map(gauge_family).collect();
    let stream = encode_delimited(&wire);

    let families = decode_bytes(&stream).expect("well formed stream");
    assert_eq!(50, families.len());
    for (i, family) in families.iter().enumerate() {
        assert_eq!(format!("gauge_{i}"), family.name);
        assert_eq!(MetricType::Gauge, family.metric_type);
        assert_eq!(MetricValue::Gauge(i as f64 / 2.0), family.metrics[0].value);
        assert_eq!(Some(i.to_string().as_str()), family.metrics[0].label("shard"));
    }
}

#[test_log::test]
fn decoding_twice_gives_the_same_families() {
    let stream = encode_delimited(&(0..5).map(gauge_family).collect::<Vec<_>>());
    assert_eq!(
        decode_bytes(&stream).expect("well formed"),
        decode_bytes(&stream).expect("well formed")
    );
}

#[test_log::test]
fn short_payload_is_truncated_not_finished() {
    let mut stream = vec![0x80, 0x01];
    stream.extend([0_u8; 100]);

    let mut decoder = DelimitedDecoder::<_, MetricFamily>::new(stream.as_slice());
    assert!(matches!(
        decoder.next(),
        Some(Err(DecodeError::TruncatedPayload {
            expected: 128,
            available: 100
        }))
    ));
    assert!(decoder.next().is_none());
}

#[test_log::test]
fn empty_stream_has_no_families() {
    assert_eq!(Vec::<MetricFamily>::new(), decode_bytes(&[]).expect("empty is fine"));
}

#[test_log::test(tokio::test)]
async fn scrape_over_loopback() {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("can bind loopback");
    let address = listener.local_addr().expect("bound");
    let state = ServerState::new(Registry::new()).expect("fresh registry");
    tokio::spawn(serve(listener, state));

    let hello = fetch(&FetchConfig {
        endpoint: format!("http://{address}/"),
        format: Format::Text,
        ..Default::default()
    })
    .await
    .expect("server answers");
    assert_eq!(Fetched::Text("Hello, World!".to_string()), hello);

    let scraped = fetch(&FetchConfig {
        endpoint: format!("http://{address}/metrics"),
        format: Format::Delimited,
        ..Default::default()
    })
    .await
    .expect("server answers");
    let Fetched::Families(families) = scraped else {
        panic!("asked for delimited, got {scraped:?}");
    };
    assert_eq!(1, families.len());
    assert_eq!("http_requests_total", families[0].name);
    assert_eq!(MetricValue::Counter(1.0), families[0].metrics[0].value);

    let text = fetch(&FetchConfig {
        endpoint: format!("http://{address}/metrics"),
        format: Format::Text,
        ..Default::default()
    })
    .await
    .expect("server answers");
    let Fetched::Text(text) = text else {
        panic!("asked for text, got {text:?}");
    };
    assert!(text.starts_with("# HELP http_requests_total Total number of HTTP requests\n"));
}
