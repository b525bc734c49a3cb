use crate::error::{Error, Result};
use std::net::IpAddr;
use tracing::instrument;

/// Resolve a target host to a single address.
///
/// A literal IPv4 or IPv6 address parses without a lookup; anything else is
/// handed to the system resolver. IPv4 addresses are preferred over IPv6
/// when the name resolves to both.
#[instrument(ret, level = "trace")]
pub fn resolve(target: &str) -> Result<IpAddr> {
    if let Ok(addr) = target.parse::<IpAddr>() {
        return Ok(addr);
    }
    let all = dns_lookup::lookup_host(target)
        .map_err(|err| Error::ResolveFailed(format!("{target}: {err}")))?;
    all.iter()
        .find(|addr| addr.is_ipv4())
        .or_else(|| all.first())
        .copied()
        .ok_or_else(|| Error::ResolveFailed(target.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{Ipv4Addr, Ipv6Addr};

    #[test]
    fn test_resolve_ipv4_literal() {
        let addr = resolve("192.0.2.1").unwrap();
        assert_eq!(IpAddr::V4(Ipv4Addr::new(192, 0, 2, 1)), addr);
    }

    #[test]
    fn test_resolve_ipv6_literal() {
        let addr = resolve("2001:db8::1").unwrap();
        assert_eq!(
            IpAddr::V6("2001:db8::1".parse::<Ipv6Addr>().unwrap()),
            addr
        );
    }

    #[test]
    fn test_resolve_invalid_name() {
        let err = resolve("no..such..host").unwrap_err();
        assert!(matches!(err, Error::ResolveFailed(_)));
    }
}
