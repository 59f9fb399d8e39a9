use std::{env, net::SocketAddr};

use crate::frame::DEFAULT_MAX_FRAME_LENGTH;

use super::{ExpositionError, Format};

const ENDPOINT: &str = "PROMFRAME_ENDPOINT";
const FORMAT: &str = "PROMFRAME_FORMAT";
const MAX_FRAME_LENGTH: &str = "PROMFRAME_MAX_FRAME_LENGTH";
const LISTEN: &str = "PROMFRAME_LISTEN";

/// Where and how to scrape.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchConfig {
    /// Full URL of the exposition endpoint
    pub endpoint: String,
    /// The format to ask for. The server may answer with the other one anyway.
    pub format: Format,
    /// Largest single record accepted from a delimited response
    pub max_frame_length: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:8080/metrics".to_string(),
            format: Format::Delimited,
            max_frame_length: DEFAULT_MAX_FRAME_LENGTH,
        }
    }
}

impl FetchConfig {
    /// Defaults, overridden by `PROMFRAME_ENDPOINT`, `PROMFRAME_FORMAT` and
    /// `PROMFRAME_MAX_FRAME_LENGTH` where they are set.
    pub fn from_env() -> Result<Self, ExpositionError> {
        Self::from_lookup(env_var)
    }

    fn from_lookup(lookup: impl Lookup) -> Result<Self, ExpositionError> {
        let mut config = Self::default();
        if let Some(endpoint) = setting(&lookup, ENDPOINT)? {
            config.endpoint = endpoint;
        }
        if let Some(format) = setting(&lookup, FORMAT)? {
            config.format = format.parse()?;
        }
        if let Some(max_frame_length) = setting(&lookup, MAX_FRAME_LENGTH)? {
            config.max_frame_length = max_frame_length.trim().parse().map_err(|e| {
                ExpositionError::Config(format!("{MAX_FRAME_LENGTH}={max_frame_length:?}: {e}"))
            })?;
        }
        log::debug!("fetch configuration: {config:?}");
        Ok(config)
    }
}

/// Where to serve.
#[derive(Debug, Clone, PartialEq)]
pub struct ServeConfig {
    /// Address to bind
    pub listen: SocketAddr,
}

impl Default for ServeConfig {
    fn default() -> Self {
        Self {
            listen: SocketAddr::from(([0, 0, 0, 0], 8080)),
        }
    }
}

impl ServeConfig {
    /// Defaults, overridden by `PROMFRAME_LISTEN` if it is set.
    pub fn from_env() -> Result<Self, ExpositionError> {
        Self::from_lookup(env_var)
    }

    fn from_lookup(lookup: impl Lookup) -> Result<Self, ExpositionError> {
        let mut config = Self::default();
        if let Some(listen) = setting(&lookup, LISTEN)? {
            config.listen = listen
                .trim()
                .parse()
                .map_err(|e| ExpositionError::Config(format!("{LISTEN}={listen:?}: {e}")))?;
        }
        log::debug!("serve configuration: {config:?}");
        Ok(config)
    }
}

/// Where settings come from: the process environment, or a map in tests.
trait Lookup: Fn(&str) -> Result<Option<String>, ExpositionError> {}

impl<F> Lookup for F where F: Fn(&str) -> Result<Option<String>, ExpositionError> {}

fn env_var(name: &str) -> Result<Option<String>, ExpositionError> {
    match env::var(name) {
        Ok(value) => Ok(Some(value)),
        Err(env::VarError::NotPresent) => Ok(None),
        Err(env::VarError::NotUnicode(_)) => {
            Err(ExpositionError::Config(format!("{name} is not unicode")))
        }
    }
}

/// Unset and empty are the same thing.
fn setting(lookup: &impl Lookup, name: &str) -> Result<Option<String>, ExpositionError> {
    Ok(lookup(name)?.filter(|value| !value.trim().is_empty()))
}
