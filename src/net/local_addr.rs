//! Local address discovery.

use std::io;
use std::net::{IpAddr, Ipv4Addr, SocketAddr, UdpSocket};

/// Well-known public address used only to pick the outbound interface.
const PROBE_ADDR: &str = "8.8.8.8:80";

/// IP of the interface this host uses for outbound traffic.
///
/// Connecting a UDP socket sends nothing; it only asks the kernel for a
/// route. IPv6 loopback is reported as `localhost`.
pub fn local_ip() -> io::Result<String> {
    let socket = UdpSocket::bind(SocketAddr::from((Ipv4Addr::UNSPECIFIED, 0)))?;
    socket.connect(PROBE_ADDR)?;
    Ok(display_ip(socket.local_addr()?.ip()))
}

fn display_ip(ip: IpAddr) -> String {
    match ip {
        IpAddr::V6(v6) if v6.is_loopback() => "localhost".to_string(),
        ip => ip.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv6Addr;

    #[test]
    fn test_display_ip() {
        assert_eq!(display_ip(IpAddr::V6(Ipv6Addr::LOCALHOST)), "localhost");
        assert_eq!(display_ip(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 7))), "10.0.0.7");
    }
}
