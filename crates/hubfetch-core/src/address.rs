//! Hub address parsing.
//!
//! Accepts `host`, `host:port`, `[v6addr]:port` and the same forms with an
//! `http://` or `https://` prefix. A trailing `/` is tolerated.

use std::fmt;
use std::str::FromStr;

use url::Url;

use crate::error::{HubError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    Http,
    Https,
}

impl Protocol {
    pub fn scheme(&self) -> &'static str {
        match self {
            Protocol::Http => "http",
            Protocol::Https => "https",
        }
    }
}

/// A parsed hub address. Never mutated after parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HubAddress {
    protocol: Option<Protocol>,
    hostname: String,
    port: Option<u16>,
}

impl HubAddress {
    /// Protocol given in the address, if any.
    pub fn protocol(&self) -> Option<Protocol> {
        self.protocol
    }

    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    pub fn port(&self) -> Option<u16> {
        self.port
    }

    /// Protocol used to talk to the hub: the explicit one, else HTTPS.
    pub fn effective_protocol(&self) -> Protocol {
        self.protocol.unwrap_or(Protocol::Https)
    }

    /// Root URL of the hub, e.g. `https://hub.example.com:7340/`.
    pub fn base_url(&self) -> Result<Url> {
        let host = if self.hostname.contains(':') {
            format!("[{}]", self.hostname)
        } else {
            self.hostname.clone()
        };
        let text = match self.port {
            Some(port) => format!("{}://{}:{}/", self.effective_protocol().scheme(), host, port),
            None => format!("{}://{}/", self.effective_protocol().scheme(), host),
        };
        Url::parse(&text).map_err(|e| HubError::parse("hub address", format!("{}: {}", text, e)))
    }
}

impl FromStr for HubAddress {
    type Err = HubError;

    fn from_str(input: &str) -> Result<Self> {
        let trimmed = input.trim();

        let (protocol, rest) = match trimmed.split_once("://") {
            Some((scheme, rest)) => {
                let protocol = match scheme.to_ascii_lowercase().as_str() {
                    "http" => Protocol::Http,
                    "https" => Protocol::Https,
                    other => {
                        return Err(HubError::parse(
                            "hub address",
                            format!("unsupported scheme '{}'", other),
                        ))
                    }
                };
                (Some(protocol), rest)
            }
            None => (None, trimmed),
        };
        let rest = rest.strip_suffix('/').unwrap_or(rest);

        let (hostname, port_text) = if let Some(bracketed) = rest.strip_prefix('[') {
            let (host, after) = bracketed.split_once(']').ok_or_else(|| {
                HubError::parse("hub address", format!("unterminated '[' in '{}'", input))
            })?;
            let port_text = match after {
                "" => None,
                other => Some(other.strip_prefix(':').ok_or_else(|| {
                    HubError::parse("hub address", format!("unexpected '{}' after host", other))
                })?),
            };
            (host, port_text)
        } else {
            match rest.split_once(':') {
                Some((host, port)) => (host, Some(port)),
                None => (rest, None),
            }
        };

        if hostname.is_empty() {
            return Err(HubError::parse(
                "hub address",
                format!("missing hostname in '{}'", input),
            ));
        }
        if hostname.contains('/') {
            return Err(HubError::parse(
                "hub address",
                format!("unexpected path in '{}'", input),
            ));
        }

        let port = match port_text {
            None => None,
            Some(text) if !text.is_empty() && text.bytes().all(|b| b.is_ascii_digit()) => {
                Some(text.parse::<u16>().map_err(|_| {
                    HubError::parse("hub address", format!("port '{}' out of range", text))
                })?)
            }
            Some(text) => {
                return Err(HubError::parse(
                    "hub address",
                    format!("port '{}' is not numeric", text),
                ))
            }
        };

        Ok(HubAddress {
            protocol,
            hostname: hostname.to_string(),
            port,
        })
    }
}

impl fmt::Display for HubAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(protocol) = self.protocol {
            write!(f, "{}://", protocol.scheme())?;
        }
        if self.hostname.contains(':') {
            write!(f, "[{}]", self.hostname)?;
        } else {
            f.write_str(&self.hostname)?;
        }
        if let Some(port) = self.port {
            write!(f, ":{}", port)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_host_and_port() {
        let addr: HubAddress = "localhost:7340".parse().unwrap();
        assert_eq!(addr.hostname(), "localhost");
        assert_eq!(addr.port(), Some(7340));
        assert_eq!(addr.protocol(), None);
        assert_eq!(addr.effective_protocol(), Protocol::Https);
        assert_eq!(addr.base_url().unwrap().as_str(), "https://localhost:7340/");
    }

    #[test]
    fn test_scheme_prefix() {
        let addr: HubAddress = "HTTP://hub.example.com/".parse().unwrap();
        assert_eq!(addr.protocol(), Some(Protocol::Http));
        assert_eq!(addr.hostname(), "hub.example.com");
        assert_eq!(addr.port(), None);
        assert_eq!(addr.base_url().unwrap().as_str(), "http://hub.example.com/");
        assert_eq!(addr.to_string(), "http://hub.example.com");
    }

    #[test]
    fn test_ipv6() {
        let addr: HubAddress = "https://[::1]:8443".parse().unwrap();
        assert_eq!(addr.hostname(), "::1");
        assert_eq!(addr.port(), Some(8443));
        assert_eq!(addr.base_url().unwrap().as_str(), "https://[::1]:8443/");
        assert_eq!(addr.to_string(), "https://[::1]:8443");
    }

    #[test]
    fn test_rejects_malformed() {
        for bad in ["", ":7340", "https://:7340", "host:abc", "host:", "host:99999", "ftp://host", "[::1"] {
            assert!(
                matches!(bad.parse::<HubAddress>(), Err(HubError::Parse { .. })),
                "expected parse error for {:?}",
                bad
            );
        }
    }
}
