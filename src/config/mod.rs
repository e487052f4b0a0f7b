mod api;

use std::{
    num::NonZeroUsize,
    path::{Path, PathBuf},
    time::Duration,
};

use clap::Parser;
use color_eyre::eyre::Result;
use serde::Deserialize;

pub use self::api::ApiConfig;

#[derive(Debug, clap::Parser)]
struct Args {
    #[clap(
        long,
        default_value = "ethui-fetcher.toml",
        env = "ETHUI_FETCHER_CONFIG"
    )]
    config: PathBuf,
}

#[derive(Deserialize, Clone, Debug)]
pub struct Config {
    pub input: InputConfig,
    pub api: ApiConfig,

    #[serde(default)]
    pub dispatch: DispatchConfig,
}

#[derive(Deserialize, Clone, Debug)]
pub struct InputConfig {
    /// JSON file holding an array of addresses
    pub file: PathBuf,
}

#[derive(Deserialize, Clone, Debug)]
pub struct DispatchConfig {
    /// Size of each address group
    #[serde(default = "default_group_size")]
    pub group_size: NonZeroUsize,

    /// Max number of in-flight calls. 0 means unbounded
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    #[serde(default)]
    pub call_timeout_ms: Option<u64>,

    #[serde(default)]
    pub run_deadline_secs: Option<u64>,
}

impl DispatchConfig {
    pub fn concurrency_limit(&self) -> Option<usize> {
        (self.concurrency > 0).then_some(self.concurrency)
    }

    pub fn call_timeout(&self) -> Option<Duration> {
        self.call_timeout_ms.map(Duration::from_millis)
    }

    pub fn run_deadline(&self) -> Option<Duration> {
        self.run_deadline_secs.map(Duration::from_secs)
    }
}

impl Config {
    pub fn read() -> Result<Self> {
        let args = Args::parse();

        Self::read_from(args.config.as_path())
    }

    pub fn read_from(path: &Path) -> Result<Self> {
        let mut config: Self = toml::from_str(&std::fs::read_to_string(path)?)?;
        config.api.preload()?;

        Ok(config)
    }
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            group_size: default_group_size(),
            concurrency: default_concurrency(),
            call_timeout_ms: None,
            run_deadline_secs: None,
        }
    }
}

fn default_group_size() -> NonZeroUsize {
    NonZeroUsize::new(50).unwrap()
}

fn default_concurrency() -> usize {
    50
}

#[cfg(test)]
mod test {
    use std::io::Write;

    use tempfile::NamedTempFile;

    use super::*;

    fn write_config(contents: &str) -> Result<NamedTempFile> {
        let mut file = NamedTempFile::new()?;
        write!(file, "{}", contents)?;
        Ok(file)
    }

    #[test]
    fn test_read_defaults() -> Result<()> {
        let file = write_config(
            r#"
            [input]
            file = "data/ethereum.json"

            [api]
            endpoint = "http://localhost/api?address={address}&apikey={api_key}"
            api_key = "secret"
            "#,
        )?;

        let config = Config::read_from(file.path())?;

        assert_eq!(config.input.file, PathBuf::from("data/ethereum.json"));
        assert_eq!(config.dispatch.group_size.get(), 50);
        assert_eq!(config.dispatch.concurrency_limit(), Some(50));
        assert_eq!(config.dispatch.call_timeout(), None);
        assert_eq!(config.dispatch.run_deadline(), None);
        assert!(!config.api.log_bodies);

        Ok(())
    }

    #[test]
    fn test_read_dispatch_section() -> Result<()> {
        let file = write_config(
            r#"
            [input]
            file = "addresses.json"

            [api]
            endpoint = "http://localhost/api?address={address}"
            api_key = "secret"
            log_bodies = true

            [dispatch]
            group_size = 10
            concurrency = 0
            call_timeout_ms = 1500
            run_deadline_secs = 60
            "#,
        )?;

        let config = Config::read_from(file.path())?;

        assert_eq!(config.dispatch.group_size.get(), 10);
        assert_eq!(config.dispatch.concurrency_limit(), None);
        assert_eq!(
            config.dispatch.call_timeout(),
            Some(Duration::from_millis(1500))
        );
        assert_eq!(config.dispatch.run_deadline(), Some(Duration::from_secs(60)));
        assert!(config.api.log_bodies);

        Ok(())
    }

    #[test]
    fn test_zero_group_size_is_rejected() -> Result<()> {
        let file = write_config(
            r#"
            [input]
            file = "addresses.json"

            [api]
            endpoint = "http://localhost/api?address={address}"
            api_key = "secret"

            [dispatch]
            group_size = 0
            "#,
        )?;

        assert!(Config::read_from(file.path()).is_err());

        Ok(())
    }

    #[test]
    fn test_endpoint_without_placeholder_is_rejected() -> Result<()> {
        let file = write_config(
            r#"
            [input]
            file = "addresses.json"

            [api]
            endpoint = "http://localhost/api"
            api_key = "secret"
            "#,
        )?;

        assert!(Config::read_from(file.path()).is_err());

        Ok(())
    }
}
