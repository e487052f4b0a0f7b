use std::{
    fmt,
    path::{Path, PathBuf},
    sync::Arc,
};

use serde::Deserialize;
use tracing::{info, instrument};

/// An account identifier, as read from the input file
///
/// Never interpreted, only substituted into request URLs. Cheap to clone, so
/// each dispatched task can hold its own copy.
#[derive(Deserialize, Clone, Debug, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct Address(Arc<str>);

impl Address {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Address {
    fn from(value: &str) -> Self {
        Self(value.into())
    }
}

impl From<String> for Address {
    fn from(value: String) -> Self {
        Self(value.into())
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("could not read address file {path:?}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("malformed address file {path:?}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// Produces the ordered list of addresses to query
pub trait AddressSource {
    fn load(&self) -> Result<Vec<Address>, LoadError>;
}

/// Reads a JSON array of address strings from disk
#[derive(Debug, Clone)]
pub struct JsonFileSource {
    path: PathBuf,
}

impl JsonFileSource {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl AddressSource for JsonFileSource {
    #[instrument(name = "load", skip(self), fields(path = ?self.path))]
    fn load(&self) -> Result<Vec<Address>, LoadError> {
        let raw = std::fs::read(&self.path).map_err(|source| LoadError::Read {
            path: self.path.clone(),
            source,
        })?;

        let addresses: Vec<Address> =
            serde_json::from_slice(&raw).map_err(|source| LoadError::Parse {
                path: self.path.clone(),
                source,
            })?;

        info!(count = addresses.len(), "addresses loaded");

        Ok(addresses)
    }
}
