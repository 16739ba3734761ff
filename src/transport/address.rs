// Multiaddr to HTTP base URL conversion for storage, index and exchange peers.

use crate::error::{Error, Result};
use ::multiaddr::{Multiaddr, Protocol};

/// Turns `/ip4|ip6|dns|dns4|dns6/<host>/tcp/<port>/(http|https|tls/http)`
/// into `http(s)://host:port`. Strings that already are URLs pass through.
pub fn multiaddr_to_uri(addr: &str) -> Result<String> {
    let trimmed = addr.trim();
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        return Ok(trimmed.trim_end_matches('/').to_string());
    }

    let parsed: Multiaddr = trimmed
        .parse()
        .map_err(|_| Error::InvalidAddress(addr.to_string()))?;

    let mut host = None;
    let mut port = None;
    let mut tls = false;
    let mut http = false;

    for protocol in parsed.iter() {
        match protocol {
            Protocol::Ip4(ip) => host = Some(ip.to_string()),
            Protocol::Ip6(ip) => host = Some(format!("[{ip}]")),
            Protocol::Dns(name) | Protocol::Dns4(name) | Protocol::Dns6(name) => {
                host = Some(name.to_string())
            }
            Protocol::Tcp(p) => port = Some(p),
            Protocol::Tls => tls = true,
            Protocol::Http => http = true,
            Protocol::Https => {
                tls = true;
                http = true;
            }
            // peer ids and similar trailers carry no dialing information
            Protocol::P2p(_) => {}
            _ => return Err(Error::InvalidAddress(addr.to_string())),
        }
    }

    match (host, port, http) {
        (Some(host), Some(port), true) => {
            let scheme = if tls { "https" } else { "http" };
            Ok(format!("{scheme}://{host}:{port}"))
        }
        _ => Err(Error::InvalidAddress(addr.to_string())),
    }
}
