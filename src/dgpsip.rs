//! DGPS/IP — the simpler raw-TCP sibling protocol. There's no handshake:
//! the broadcaster starts streaming correction bytes as soon as the
//! connection opens.

use tokio::net::TcpStream;

use crate::error::NtripClientError;

/// Default port used when a `dgpsip://host` URI carries none.
pub const DEFAULT_DGPSIP_PORT: u16 = 2101;

/// Split a `dgpsip://` URI remainder into `(host, port)`. There is no
/// mountpoint, no credentials, and no handshake: the broadcaster starts
/// streaming raw correction bytes the instant the TCP connection opens.
pub fn parse_dgpsip_uri(remainder: &str) -> (String, u16) {
    match remainder.split_once(':') {
        Some((host, port)) => (
            host.to_string(),
            port.parse().unwrap_or(DEFAULT_DGPSIP_PORT),
        ),
        None => (remainder.to_string(), DEFAULT_DGPSIP_PORT),
    }
}

/// Open a DGPS/IP connection: connect and hand back the raw socket. No
/// protocol negotiation of any kind takes place.
pub async fn dgpsip_open(host: &str, port: u16) -> Result<TcpStream, NtripClientError> {
    TcpStream::connect((host, port))
        .await
        .map_err(|source| NtripClientError::ConnectFailed {
            host: host.to_string(),
            port: port.to_string(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_host_and_port() {
        assert_eq!(parse_dgpsip_uri("gps.example.com:2102"), ("gps.example.com".to_string(), 2102));
    }

    #[test]
    fn defaults_port_when_absent() {
        assert_eq!(
            parse_dgpsip_uri("gps.example.com"),
            ("gps.example.com".to_string(), DEFAULT_DGPSIP_PORT)
        );
    }
}
