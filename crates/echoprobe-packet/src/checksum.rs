//! The RFC 1071 internet checksum for ICMP echo datagrams.
//!
//! The sum is computed over the packet with the checksum word excluded,
//! which is equivalent to summing with the checksum field zeroed. A packet
//! of odd length is padded with a single zero byte for summation only; the
//! transmitted bytes are never modified.

use std::net::Ipv6Addr;

/// The index of the 16-bit checksum word within the ICMP header.
const CHECKSUM_WORD: usize = 1;

/// Calculate the checksum for an `ICMPv4` packet.
#[must_use]
pub fn icmp_ipv4_checksum(data: &[u8]) -> u16 {
    finalize(sum_be_words(data))
}

/// Calculate the checksum for an `ICMPv6` packet.
///
/// `ICMPv6` includes an IPv6 pseudo-header in the sum. Note that the kernel
/// computes this checksum for outbound packets on `ICMPv6` sockets; this
/// function exists so inbound packets may be verified.
#[must_use]
pub fn icmp_ipv6_checksum(data: &[u8], src_addr: Ipv6Addr, dest_addr: Ipv6Addr) -> u16 {
    let mut sum = ipv6_word_sum(src_addr) + ipv6_word_sum(dest_addr);
    sum += data.len() as u32;
    sum += u32::from(IPPROTO_ICMPV6);
    sum += sum_be_words(data);
    finalize(sum)
}

const IPPROTO_ICMPV6: u8 = 58;

fn ipv6_word_sum(addr: Ipv6Addr) -> u32 {
    addr.segments().iter().map(|seg| u32::from(*seg)).sum()
}

/// Sum the big-endian 16-bit words of `data`, skipping the checksum word.
///
/// A trailing odd byte is summed high, as if followed by a zero pad byte.
fn sum_be_words(data: &[u8]) -> u32 {
    let mut chunks = data.chunks_exact(2);
    let mut sum = 0_u32;
    for (index, word) in chunks.by_ref().enumerate() {
        if index != CHECKSUM_WORD {
            sum += u32::from(u16::from_be_bytes([word[0], word[1]]));
        }
    }
    if let [last] = chunks.remainder() {
        sum += u32::from(*last) << 8;
    }
    sum
}

const fn finalize(mut sum: u32) -> u16 {
    while sum >> 16 != 0 {
        sum = (sum >> 16) + (sum & 0xffff);
    }
    !sum as u16
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;
    use std::str::FromStr;

    #[test]
    fn test_icmp_ipv4_checksum() {
        let bytes = hex!("08 00 00 00 04 d2 00 0a");
        assert_eq!(0xf323, icmp_ipv4_checksum(&bytes));
    }

    #[test]
    fn test_checksum_ignores_checksum_word() {
        let zeroed = hex!("08 00 00 00 04 d2 00 0a");
        let filled = hex!("08 00 f3 23 04 d2 00 0a");
        assert_eq!(icmp_ipv4_checksum(&zeroed), icmp_ipv4_checksum(&filled));
    }

    #[test]
    fn test_odd_length() {
        let bytes = hex!("08 00 00 00 00 00 00 00 ab");
        assert_eq!(0x4cff, icmp_ipv4_checksum(&bytes));
    }

    #[test]
    fn test_empty() {
        assert_eq!(0xffff, icmp_ipv4_checksum(&[]));
    }

    #[test]
    fn test_icmp_ipv6_checksum() {
        let src_addr = Ipv6Addr::from_str("::1").unwrap();
        let dest_addr = Ipv6Addr::from_str("::1").unwrap();
        let bytes = hex!("80 00 00 00 04 d2 00 0a");
        assert_eq!(0x7adf, icmp_ipv6_checksum(&bytes, src_addr, dest_addr));
    }
}
