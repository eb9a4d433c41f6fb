//! Outbound target filtering.
//!
//! The proxy endpoints fetch arbitrary user-supplied URLs, so hosts that only
//! make sense from inside the server's own network are refused. Only literal
//! addresses and well-known local names are recognized; names are not
//! resolved here.

use std::net::{Ipv4Addr, Ipv6Addr};

use url::{Host, Url};

/// Whether `url` targets a loopback, private, link-local or otherwise
/// internal host.
#[must_use]
pub fn is_private_host(url: &Url) -> bool {
    match url.host() {
        None => true,
        Some(Host::Domain(domain)) => {
            let domain = domain.trim_end_matches('.').to_ascii_lowercase();
            domain == "localhost"
                || [".localhost", ".local", ".internal"]
                    .iter()
                    .any(|suffix| domain.ends_with(suffix))
        }
        Some(Host::Ipv4(ip)) => is_private_ipv4(ip),
        Some(Host::Ipv6(ip)) => is_private_ipv6(ip),
    }
}

fn is_private_ipv4(ip: Ipv4Addr) -> bool {
    let [first, second, ..] = ip.octets();
    ip.is_loopback()
        || ip.is_private()
        || ip.is_link_local()
        || ip.is_unspecified()
        || ip.is_broadcast()
        || first == 0
        // 100.64.0.0/10, carrier-grade NAT
        || (first == 100 && (64..128).contains(&second))
}

fn is_private_ipv6(ip: Ipv6Addr) -> bool {
    if let Some(mapped) = ip.to_ipv4_mapped() {
        return is_private_ipv4(mapped);
    }
    let first = ip.segments()[0];
    ip.is_loopback()
        || ip.is_unspecified()
        // fc00::/7 unique local, fe80::/10 link-local
        || (first & 0xfe00) == 0xfc00
        || (first & 0xffc0) == 0xfe80
}
