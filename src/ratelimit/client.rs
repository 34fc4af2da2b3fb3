//! Client key resolution
//!
//! The key a request is rate limited under. The order is fixed:
//!
//! 1. `CF-Connecting-IP`, set by the trusted edge proxy
//! 2. the first hop of `X-Forwarded-For`
//! 3. the peer address of the connection, without its port
//!
//! Both headers are client-controllable when the service is reachable without
//! the proxy in front, so deployments must not expose it directly.

use std::net::SocketAddr;

use axum::http::HeaderMap;

/// Header the edge proxy sets to the original client address.
pub const TRUSTED_CLIENT_HEADER: &str = "cf-connecting-ip";
/// Forwarding chain header; its first entry is the originating client.
pub const FORWARDED_FOR_HEADER: &str = "x-forwarded-for";
/// Key used when nothing identifies the client.
pub const UNKNOWN_CLIENT: &str = "unknown";

/// Resolves the rate-limit key for a request.
pub fn client_key(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    if let Some(ip) = header_str(headers, TRUSTED_CLIENT_HEADER) {
        return ip.to_string();
    }

    if let Some(first_hop) = header_str(headers, FORWARDED_FOR_HEADER)
        .and_then(|chain| chain.split(',').next())
        .map(str::trim)
        .filter(|hop| !hop.is_empty())
    {
        return first_hop.to_string();
    }

    peer.map(|addr| addr.ip().to_string())
        .unwrap_or_else(|| UNKNOWN_CLIENT.to_string())
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn peer() -> Option<SocketAddr> {
        Some("10.0.0.9:51234".parse().unwrap())
    }

    #[test]
    fn test_trusted_header_wins() {
        let mut headers = HeaderMap::new();
        headers.insert(TRUSTED_CLIENT_HEADER, HeaderValue::from_static("203.0.113.7"));
        headers.insert(FORWARDED_FOR_HEADER, HeaderValue::from_static("198.51.100.1"));

        assert_eq!(client_key(&headers, peer()), "203.0.113.7");
    }

    #[test]
    fn test_forwarded_for_first_hop() {
        let mut headers = HeaderMap::new();
        headers.insert(
            FORWARDED_FOR_HEADER,
            HeaderValue::from_static(" 198.51.100.1 , 10.0.0.1, 10.0.0.2"),
        );

        assert_eq!(client_key(&headers, peer()), "198.51.100.1");
    }

    #[test]
    fn test_empty_headers_fall_through() {
        let mut headers = HeaderMap::new();
        headers.insert(TRUSTED_CLIENT_HEADER, HeaderValue::from_static("  "));
        headers.insert(FORWARDED_FOR_HEADER, HeaderValue::from_static(",10.0.0.1"));

        assert_eq!(client_key(&headers, peer()), "10.0.0.9");
    }

    #[test]
    fn test_peer_address_without_port() {
        assert_eq!(client_key(&HeaderMap::new(), peer()), "10.0.0.9");

        let v6: SocketAddr = "[2001:db8::1]:443".parse().unwrap();
        assert_eq!(client_key(&HeaderMap::new(), Some(v6)), "2001:db8::1");
    }

    #[test]
    fn test_unknown_client() {
        assert_eq!(client_key(&HeaderMap::new(), None), UNKNOWN_CLIENT);
    }
}
