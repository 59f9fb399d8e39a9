//! Nothing to see here: `build.rs` regenerates `promframe/src/proto` from `proto/`.
