// prometheus uses SCREAMING_CASE enum values, prost renames them
#[allow(clippy::all)]
#[rustfmt::skip]
pub mod io {
    pub mod prometheus {
        pub mod client {
            include!("io.prometheus.client.rs");
        }
    }
}

pub use io::prometheus::client;
