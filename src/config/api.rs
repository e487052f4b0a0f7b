use color_eyre::eyre::{eyre, Result};
use serde::Deserialize;

use crate::dispatch::EndpointTemplate;

#[derive(Deserialize, Clone, Debug)]
pub struct ApiConfig {
    endpoint: EndpointTemplate,

    api_key: Option<String>,

    /// Env var to read the API key from, if not set explicitly
    #[serde(default = "default_api_key_env")]
    api_key_env: String,

    /// Log every response body at debug level
    #[serde(default)]
    pub log_bodies: bool,
}

impl ApiConfig {
    /// The endpoint template with the API key already substituted
    pub fn endpoint(&self) -> EndpointTemplate {
        self.endpoint.with_api_key(self.api_key.as_deref().unwrap_or_default())
    }

    pub(super) fn preload(&mut self) -> Result<()> {
        if self.api_key.is_some() {
            return Ok(());
        }

        self.api_key = std::env::var(&self.api_key_env).ok();

        if self.api_key.is_none() && self.endpoint.requires_api_key() {
            return Err(eyre!(
                "endpoint requires an API key: set `api.api_key` or ${}",
                self.api_key_env
            ));
        }

        Ok(())
    }

    #[cfg(test)]
    pub fn for_test(endpoint: &str) -> Self {
        Self {
            endpoint: endpoint.to_owned().try_into().unwrap(),
            api_key: None,
            api_key_env: default_api_key_env(),
            log_bodies: false,
        }
    }
}

fn default_api_key_env() -> String {
    "ETHERSCAN_API_KEY".to_owned()
}
