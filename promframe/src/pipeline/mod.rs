//! Consumers of decoded metric families

mod logging_sink;

pub use logging_sink::LoggingSink;

/// A drain that accepts Sunk
pub trait Sink<Sunk> {
    /// Take ownership of a value
    fn accept(&self, to_sink: Sunk);
}

impl<Sunk, F> Sink<Sunk> for F
where
    F: Fn(Sunk),
{
    fn accept(&self, to_sink: Sunk) {
        self(to_sink)
    }
}
