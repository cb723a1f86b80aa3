//! Bind-address derivation for display to other devices on the network.

use std::net::{IpAddr, Ipv4Addr, UdpSocket};

/// Sentinel returned when no non-loopback IPv4 interface is found.
pub const NO_NETWORK: &str = "No network connection";

/// First non-loopback IPv4 address of this host.
///
/// Uses the outbound-route trick: connecting a UDP socket sends no
/// packets, but makes the OS pick the interface that would reach the
/// target, whose address is then readable locally.
pub fn local_ipv4() -> Option<Ipv4Addr> {
    let socket = UdpSocket::bind("0.0.0.0:0").ok()?;
    socket.connect("8.8.8.8:80").ok()?;
    match socket.local_addr().ok()?.ip() {
        IpAddr::V4(ip) if !ip.is_loopback() && !ip.is_unspecified() => Some(ip),
        _ => None,
    }
}

/// `http://ip:port`, or the no-network sentinel.
pub fn server_address(port: u16) -> String {
    match local_ipv4() {
        Some(ip) => format!("http://{ip}:{port}"),
        None => NO_NETWORK.to_string(),
    }
}

/// `ws://ip:port/ws`, or the no-network sentinel.
pub fn websocket_address(port: u16) -> String {
    match local_ipv4() {
        Some(ip) => format!("ws://{ip}:{port}/ws"),
        None => NO_NETWORK.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_formats() {
        // Either shape is valid depending on the host's interfaces; both
        // listeners must agree on which one they are in.
        let http = server_address(8080);
        let ws = websocket_address(8081);

        if local_ipv4().is_some() {
            assert!(http.starts_with("http://"));
            assert!(http.ends_with(":8080"));
            assert!(ws.starts_with("ws://"));
            assert!(ws.ends_with(":8081/ws"));
        } else {
            assert_eq!(http, NO_NETWORK);
            assert_eq!(ws, NO_NETWORK);
        }
    }

    #[test]
    fn test_local_ipv4_is_never_loopback() {
        if let Some(ip) = local_ipv4() {
            assert!(!ip.is_loopback());
        }
    }
}
