use criterion::{BatchSize, Criterion, Throughput};
use promframe::{
    decoder::DelimitedDecoder,
    exposition::encode_delimited,
    proto::client as proto,
    MetricFamily,
};
use rand::{rngs::StdRng, Rng, SeedableRng};

fn families(count: usize, metrics_per_family: usize) -> Vec<proto::MetricFamily> {
    let mut rng = StdRng::seed_from_u64(0x5eed);
    (0..count)
        .map(|i| proto::MetricFamily {
            name: Some(format!("family_{i}_total")),
            help: Some("synthetic".to_string()),
            r#type: Some(proto::MetricType::Counter as i32),
            metric: (0..metrics_per_family)
                .map(|j| proto::Metric {
                    label: vec![proto::LabelPair {
                        name: Some("instance".to_string()),
                        value: Some(format!("host-{j}")),
                    }],
                    counter: Some(proto::Counter {
                        value: Some(rng.gen_range(0.0..1e9)),
                    }),
                    ..Default::default()
                })
                .collect(),
            unit: None,
        })
        .collect()
}

pub fn decoding(criterion: &mut Criterion) {
    let mut group = criterion.benchmark_group("decoding");

    for (count, metrics_per_family) in [(1, 1), (100, 10), (1000, 100)] {
        let stream = encode_delimited(&families(count, metrics_per_family));
        group.throughput(Throughput::Bytes(stream.len() as u64));

        group.bench_function(format!("raw-{count}x{metrics_per_family}"), |bencher| {
            bencher.iter(|| {
                DelimitedDecoder::<_, proto::MetricFamily>::new(stream.as_slice())
                    .try_fold(0, |decoded, family| family.map(|_| decoded + 1))
                    .expect("well formed stream")
            });
        });

        group.bench_function(format!("typed-{count}x{metrics_per_family}"), |bencher| {
            bencher.iter_batched(
                || stream.clone(),
                |stream| {
                    DelimitedDecoder::<_, MetricFamily>::new(stream.as_slice())
                        .collect::<Result<Vec<_>, _>>()
                        .expect("well formed stream")
                },
                BatchSize::SmallInput,
            );
        });
    }
}

criterion::criterion_group!(benches, decoding);
