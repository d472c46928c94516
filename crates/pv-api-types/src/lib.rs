use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    #[default]
    Main,
    Test,
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Network::Main => write!(f, "main"),
            Network::Test => write!(f, "test"),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown network {0:?}; expected \"main\" or \"test\"")]
pub struct NetworkParseError(pub String);

impl FromStr for Network {
    type Err = NetworkParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "main" => Ok(Network::Main),
            "test" => Ok(Network::Test),
            other => Err(NetworkParseError(other.to_owned())),
        }
    }
}

/// Capability descriptor served by a WAB at `GET {wab_url}/info`.
///
/// The wire body is camelCase JSON; fields this client does not understand
/// are ignored.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ProviderCapabilities {
    pub supported_auth_methods: Vec<String>,
}

impl ProviderCapabilities {
    pub fn first_method(&self) -> Option<&str> {
        self.supported_auth_methods.first().map(String::as_str)
    }

    pub fn supports(&self, method: &str) -> bool {
        self.supported_auth_methods.iter().any(|m| m == method)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capabilities_parse_camel_case_wire_body() {
        let body = r#"{"supportedAuthMethods":["phone","email"],"faucetEnabled":true}"#;
        let caps: ProviderCapabilities = serde_json::from_str(body).unwrap();
        assert_eq!(caps.supported_auth_methods, vec!["phone", "email"]);
        assert_eq!(caps.first_method(), Some("phone"));
        assert!(caps.supports("email"));
        assert!(!caps.supports("sms"));
    }

    #[test]
    fn network_parses_and_displays() {
        assert_eq!("main".parse::<Network>().unwrap(), Network::Main);
        assert_eq!(" TEST ".parse::<Network>().unwrap(), Network::Test);
        assert_eq!(Network::Main.to_string(), "main");
        assert!("stagenet".parse::<Network>().is_err());
    }
}
