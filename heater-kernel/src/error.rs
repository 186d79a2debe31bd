use std::path::PathBuf;
use thiserror::Error;

/// Fatal problems found while loading or validating the configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config document: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("missing address for {0}")]
    MissingAddress(&'static str),
    #[error("address {address:?} is used by both {first} and {second}")]
    DuplicateAddress {
        address: String,
        first: &'static str,
        second: &'static str,
    },
    #[error("invalid broker url {url:?}: {reason}")]
    InvalidBroker { url: String, reason: &'static str },
    #[error("setting {name} must be a finite number, got {value}")]
    NonFiniteSetting { name: &'static str, value: f64 },
    #[error("invalid control parameter {name}: {reason}")]
    InvalidControl { name: &'static str, reason: &'static str },
}
