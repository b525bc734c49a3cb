//! ICMP echo wire format parsing and building.
//!
//! This crate provides the packet layer for the `echoprobe` ping engine:
//!
//! - `ICMPv4` echo request and echo reply messages
//! - `ICMPv6` echo request and echo reply messages
//! - the `IPv4` header prepended to inbound datagrams by raw sockets
//! - the RFC 1071 internet checksum
//!
//! # Endianness
//!
//! Packets are held in network byte order (big-endian); all accessor methods
//! take and return values in host byte order, converting as needed.
//!
//! # Example
//!
//! Build an `ICMPv4` echo request:
//!
//! ```rust
//! # fn main() -> Result<(), echoprobe_packet::error::Error> {
//! use echoprobe_packet::checksum::icmp_ipv4_checksum;
//! use echoprobe_packet::icmpv4::echo_request::EchoRequestPacket;
//! use echoprobe_packet::icmpv4::{IcmpCode, IcmpType};
//!
//! let mut buf = [0_u8; 8];
//! let mut packet = EchoRequestPacket::new(&mut buf)?;
//! packet.set_icmp_type(IcmpType::EchoRequest);
//! packet.set_icmp_code(IcmpCode(0));
//! packet.set_identifier(1234);
//! packet.set_sequence(10);
//! packet.set_checksum(icmp_ipv4_checksum(packet.packet()));
//! assert_eq!(packet.packet(), &hex_literal::hex!("08 00 f3 23 04 d2 00 0a"));
//! # Ok(())
//! # }
//! ```
#![warn(clippy::all, clippy::pedantic, clippy::nursery, rust_2018_idioms)]
#![allow(clippy::module_name_repetitions, clippy::cast_possible_truncation)]
#![forbid(unsafe_code)]

mod buffer;

/// Packet errors.
pub mod error;

/// The RFC 1071 internet checksum.
pub mod checksum;

/// `ICMPv4` echo messages.
pub mod icmpv4;

/// `ICMPv6` echo messages.
pub mod icmpv6;

/// The `IPv4` header.
pub mod ipv4;

/// Format a payload as a hexadecimal string.
#[must_use]
pub fn fmt_payload(bytes: &[u8]) -> String {
    use itertools::Itertools as _;
    format!("{:02x}", bytes.iter().format(" "))
}
