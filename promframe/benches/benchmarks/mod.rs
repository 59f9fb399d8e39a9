pub mod decoding;
