//! Strict `inet_pton`/`inet_ntop`-alike helpers. Bitmessage's `net_addr` always carries a
//! 16-byte IPv6 address on the wire; IPv4 peers are represented as IPv4-mapped IPv6
//! (`::ffff:a.b.c.d`). We don't rely on the host OS's address parser because its BSD
//! short-form IPv4 semantics ("10.5" -> 10.0.0.5) aren't implemented by `std`'s `FromStr`.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use crate::error::{BmError, BmResult};

/// Parses the classical BSD short forms of a dotted IPv4 address: 1, 2, 3 or 4 parts,
/// where the last part absorbs the remaining bits of the 32-bit address.
pub fn parse_ipv4_bsd(s: &str) -> BmResult<Ipv4Addr> {
    let parts: Vec<&str> = s.split('.').collect();
    if parts.is_empty() || parts.len() > 4 {
        return Err(BmError::codec(format!("'{}' is not a valid dotted IPv4 address", s)));
    }

    let mut values = Vec::with_capacity(parts.len());
    for part in &parts {
        let value: u64 = part
            .parse()
            .map_err(|_| BmError::codec(format!("'{}' is not a valid dotted IPv4 address", s)))?;
        values.push(value);
    }

    let octets: [u8; 4] = match values.as_slice() {
        [a] => {
            check_range(*a, u32::MAX as u64, s)?;
            (*a as u32).to_be_bytes()
        }
        [a, b] => {
            check_range(*a, 0xFF, s)?;
            check_range(*b, 0x00FF_FFFF, s)?;
            let combined = ((*a as u32) << 24) | (*b as u32);
            combined.to_be_bytes()
        }
        [a, b, c] => {
            check_range(*a, 0xFF, s)?;
            check_range(*b, 0xFF, s)?;
            check_range(*c, 0xFFFF, s)?;
            let combined = ((*a as u32) << 24) | ((*b as u32) << 16) | (*c as u32);
            combined.to_be_bytes()
        }
        [a, b, c, d] => {
            check_range(*a, 0xFF, s)?;
            check_range(*b, 0xFF, s)?;
            check_range(*c, 0xFF, s)?;
            check_range(*d, 0xFF, s)?;
            [*a as u8, *b as u8, *c as u8, *d as u8]
        }
        _ => unreachable!("length checked above"),
    };

    Ok(Ipv4Addr::from(octets))
}

fn check_range(value: u64, max: u64, original: &str) -> BmResult<()> {
    if value > max {
        Err(BmError::codec(format!(
            "'{}' is not a valid dotted IPv4 address: component {} exceeds {}",
            original, value, max
        )))
    } else {
        Ok(())
    }
}

/// Encodes an `IpAddr` into the 16-byte wire form, mapping IPv4 addresses into IPv6.
pub fn to_wire_bytes(ip: &IpAddr) -> [u8; 16] {
    match ip {
        IpAddr::V4(v4) => v4.to_ipv6_mapped().octets(),
        IpAddr::V6(v6) => v6.octets(),
    }
}

/// Decodes a 16-byte wire address, presenting an IPv4-mapped IPv6 address in dotted-quad
/// form rather than its `::ffff:`-prefixed IPv6 spelling.
pub fn from_wire_bytes(bytes: [u8; 16]) -> IpAddr {
    let v6 = Ipv6Addr::from(bytes);
    match v6.to_ipv4_mapped() {
        Some(v4) => IpAddr::V4(v4),
        None => IpAddr::V6(v6),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parses_four_part_form() {
        assert_eq!(parse_ipv4_bsd("192.168.0.1").unwrap(), Ipv4Addr::new(192, 168, 0, 1));
    }

    #[test]
    fn parses_bsd_short_forms() {
        assert_eq!(parse_ipv4_bsd("10").unwrap(), Ipv4Addr::from(10u32));
        assert_eq!(parse_ipv4_bsd("10.5").unwrap(), Ipv4Addr::new(10, 0, 0, 5));
        assert_eq!(parse_ipv4_bsd("10.5.6").unwrap(), Ipv4Addr::new(10, 5, 0, 6));
    }

    #[test]
    fn rejects_out_of_range_octet() {
        assert!(parse_ipv4_bsd("256.0.0.1").is_err());
        assert!(parse_ipv4_bsd("1.2.3.4.5").is_err());
    }

    #[test]
    fn ipv4_mapped_round_trips_to_dotted_quad() {
        let ip = IpAddr::V4(Ipv4Addr::new(203, 0, 113, 7));
        let wire = to_wire_bytes(&ip);
        assert_eq!(from_wire_bytes(wire), ip);
    }
}
