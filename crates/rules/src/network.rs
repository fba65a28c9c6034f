//! IPv4 address and CIDR range membership.

use std::net::Ipv4Addr;

use ipnet::Ipv4Net;

/// Returns `true` when `input` is inside any CIDR range in `values` or
/// equals any bare address in `values`.
///
/// A value with a prefix (`10.0.0.0/30`) is treated as a CIDR range; the
/// network address is derived by truncation, so host-bit-set ranges like
/// `10.0.0.3/24` behave as their containing network. Any other value is
/// compared as a bare address by equality.
pub fn ip_matches_any(input: &str, values: &[String]) -> bool {
    let input_addr: Option<Ipv4Addr> = input.parse().ok();

    values.iter().any(|value| {
        if let Ok(net) = value.parse::<Ipv4Net>() {
            input_addr.is_some_and(|addr| net.trunc().contains(&addr))
        } else {
            input == value
        }
    })
}
