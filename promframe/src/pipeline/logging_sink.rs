use std::fmt::Display;

use super::Sink;

/// A sink that just logs what it is given and drops it
#[derive(Debug, Clone, Copy)]
pub struct LoggingSink {
    log_level: log::Level,
}

impl LoggingSink {
    /// Log at a level other than info
    pub fn new(log_level: log::Level) -> Self {
        Self { log_level }
    }
}

impl Default for LoggingSink {
    fn default() -> Self {
        Self {
            log_level: log::Level::Info,
        }
    }
}

impl<T> Sink<T> for LoggingSink
where
    T: Display,
{
    fn accept(&self, sunk: T) {
        log::log!(self.log_level, "Sunk: {}", sunk)
    }
}
