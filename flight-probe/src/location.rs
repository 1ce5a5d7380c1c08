use std::fmt;

use url::Url;

use crate::error::{ProbeError, Result};

/// Transport security selected by the location scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    Plaintext,
    Tls,
}

/// A parsed Flight location of the form `scheme://host:port`.
///
/// Parsing is purely syntactic; nothing is resolved or dialed here.
///
/// # Example
///
/// ```rust
/// use flight_probe::Location;
///
/// let location = Location::parse("grpc://localhost:8815")?;
/// assert_eq!(location.port(), 8815);
/// assert_eq!(location.channel_uri(), "http://localhost:8815");
/// # Ok::<(), flight_probe::ProbeError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    original: String,
    transport: Transport,
    host: String,
    port: u16,
}

impl Location {
    /// Parse `address`, requiring a supported scheme, a host and a non-zero port.
    pub fn parse(address: &str) -> Result<Self> {
        let trimmed = address.trim();
        if !trimmed.contains("://") {
            return Err(ProbeError::invalid_address(address, "missing scheme"));
        }
        let url = Url::parse(trimmed)
            .map_err(|e| ProbeError::invalid_address(address, e.to_string()))?;

        let transport = match url.scheme() {
            "grpc" | "grpc+tcp" | "http" => Transport::Plaintext,
            "grpc+tls" | "https" => Transport::Tls,
            other => {
                return Err(ProbeError::invalid_address(
                    address,
                    format!("unsupported scheme {other:?}"),
                ))
            }
        };

        let host = url
            .host_str()
            .filter(|h| !h.is_empty())
            .ok_or_else(|| ProbeError::invalid_address(address, "missing host"))?
            .to_string();
        // `Url::port` hides a port equal to the scheme default, e.g. https on 443.
        let port = url
            .port()
            .or_else(|| url.port_or_known_default().filter(|_| has_explicit_port(trimmed)))
            .ok_or_else(|| ProbeError::invalid_address(address, "missing port"))?;
        if port == 0 {
            return Err(ProbeError::invalid_address(address, "port 0 cannot be dialed"));
        }

        if !matches!(url.path(), "" | "/") || url.query().is_some() {
            return Err(ProbeError::invalid_address(
                address,
                "unexpected path or query after host:port",
            ));
        }

        Ok(Self {
            original: trimmed.to_string(),
            transport,
            host,
            port,
        })
    }

    /// Host name or IP literal, brackets included for IPv6.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Port as written in the address.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Whether the channel is plaintext or TLS.
    pub fn transport(&self) -> Transport {
        self.transport
    }

    /// URI handed to the gRPC channel. Flight schemes map onto http/https.
    pub fn channel_uri(&self) -> String {
        let scheme = match self.transport {
            Transport::Plaintext => "http",
            Transport::Tls => "https",
        };
        format!("{scheme}://{}:{}", self.host, self.port)
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.original)
    }
}

fn has_explicit_port(address: &str) -> bool {
    let rest = address.split_once("://").map_or("", |(_, rest)| rest);
    let authority = rest.split(['/', '?', '#']).next().unwrap_or_default();
    match authority.rsplit_once(':') {
        Some((host, port)) => {
            !port.is_empty()
                && port.bytes().all(|b| b.is_ascii_digit())
                && (host.ends_with(']') || !host.contains(':'))
        }
        None => false,
    }
}

/// Validate an address string into a connectable [`Location`].
pub fn parse_endpoint(address: &str) -> Result<Location> {
    Location::parse(address)
}
