use serde::Deserialize;
use url::{form_urlencoded, Url};

use crate::source::Address;

const ADDRESS: &str = "{address}";
const API_KEY: &str = "{api_key}";

#[derive(Debug, thiserror::Error)]
pub enum EndpointError {
    #[error("endpoint template has no {{address}} placeholder")]
    MissingAddress,

    #[error("endpoint template does not render to a valid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

/// A request URL with `{address}` and `{api_key}` placeholders
///
/// e.g. `http://api.etherscan.io/api?module=account&action=txlist&address={address}&apikey={api_key}`
#[derive(Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(try_from = "String")]
pub struct EndpointTemplate(String);

impl TryFrom<String> for EndpointTemplate {
    type Error = EndpointError;

    fn try_from(template: String) -> Result<Self, Self::Error> {
        if !template.contains(ADDRESS) {
            return Err(EndpointError::MissingAddress);
        }

        let template = Self(template);
        template
            .with_api_key("key")
            .render(&Address::from("0x0"))?;

        Ok(template)
    }
}

impl EndpointTemplate {
    pub fn requires_api_key(&self) -> bool {
        self.0.contains(API_KEY)
    }

    pub fn with_api_key(&self, key: &str) -> Self {
        Self(self.0.replace(API_KEY, &encode(key)))
    }

    /// Builds the request URL for a single address
    pub fn render(&self, address: &Address) -> Result<Url, url::ParseError> {
        Url::parse(&self.0.replace(ADDRESS, &encode(address.as_str())))
    }
}

fn encode(value: &str) -> String {
    form_urlencoded::byte_serialize(value.as_bytes()).collect()
}
