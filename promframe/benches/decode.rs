mod benchmarks;

criterion::criterion_main! {
    benchmarks::decoding::benches,
}
