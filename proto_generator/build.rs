use std::path::PathBuf;
#[allow(clippy::unwrap_used)]
fn main() {
    let out_dir = PathBuf::from("../promframe/src/proto");
    let proto_dir = "../proto";

    eprintln!("If you are changing protos and promframe fails to build, please retry 1 time.");
    eprintln!("This project is deliberately not a dependency of promframe, so Cargo cannot");
    eprintln!("order the two builds. That keeps protoc out of promframe's build.");

    prost_build::Config::new()
        .out_dir(out_dir)
        .compile_protos(&[format!("{proto_dir}/metrics.proto")], &[proto_dir])
        .unwrap();

    println!("cargo:rerun-if-changed=../proto");
}
