use std::io;
use std::net::{Ipv4Addr, SocketAddr, ToSocketAddrs};

/// Resolves a dotted-decimal address or a hostname to an IPv4 address.
///
/// Pure lookup: nothing is cached across calls. Hostnames that only resolve
/// to IPv6 addresses are treated as unresolvable, the channel is IPv4 only.
pub fn resolve_ipv4(host: &str) -> io::Result<Ipv4Addr> {
    if let Ok(addr) = host.parse::<Ipv4Addr>() {
        return Ok(addr);
    }

    (host, 0u16)
        .to_socket_addrs()?
        .find_map(|addr| match addr {
            SocketAddr::V4(v4) => Some(*v4.ip()),
            SocketAddr::V6(_) => None,
        })
        .ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("no IPv4 address found for {}", host),
            )
        })
}
