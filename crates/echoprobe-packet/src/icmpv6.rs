use crate::buffer::Buffer;
use crate::error::{Error, Result};
use std::fmt::{Debug, Formatter};

const TYPE_OFFSET: usize = 0;
const CODE_OFFSET: usize = 1;
const CHECKSUM_OFFSET: usize = 2;

/// The type of `ICMPv6` packet.
#[derive(Debug, Copy, Clone, Ord, PartialOrd, Eq, PartialEq)]
pub enum IcmpType {
    EchoRequest,
    EchoReply,
    TimeExceeded,
    Other(u8),
}

impl IcmpType {
    #[must_use]
    pub const fn id(&self) -> u8 {
        match self {
            Self::EchoRequest => 128,
            Self::EchoReply => 129,
            Self::TimeExceeded => 3,
            Self::Other(id) => *id,
        }
    }
}

impl From<u8> for IcmpType {
    fn from(val: u8) -> Self {
        match val {
            128 => Self::EchoRequest,
            129 => Self::EchoReply,
            3 => Self::TimeExceeded,
            id => Self::Other(id),
        }
    }
}

/// The `ICMPv6` code.
#[derive(Debug, Copy, Clone, Ord, PartialOrd, Eq, PartialEq)]
pub struct IcmpCode(pub u8);

impl From<u8> for IcmpCode {
    fn from(val: u8) -> Self {
        Self(val)
    }
}

/// An `ICMPv6` packet header view.
pub struct IcmpPacket<'a> {
    buf: Buffer<'a>,
}

impl<'a> IcmpPacket<'a> {
    pub fn new_view(packet: &'a [u8]) -> Result<Self> {
        if packet.len() >= Self::minimum_packet_size() {
            Ok(Self {
                buf: Buffer::Immutable(packet),
            })
        } else {
            Err(Error::InsufficientPacketBuffer(
                String::from("IcmpPacket"),
                Self::minimum_packet_size(),
                packet.len(),
            ))
        }
    }

    #[must_use]
    pub const fn minimum_packet_size() -> usize {
        8
    }

    #[must_use]
    pub fn get_icmp_type(&self) -> IcmpType {
        IcmpType::from(self.buf.read_u8(TYPE_OFFSET))
    }

    #[must_use]
    pub fn get_icmp_code(&self) -> IcmpCode {
        IcmpCode::from(self.buf.read_u8(CODE_OFFSET))
    }

    #[must_use]
    pub fn get_checksum(&self) -> u16 {
        self.buf.read_u16(CHECKSUM_OFFSET)
    }

    #[must_use]
    pub fn packet(&self) -> &[u8] {
        self.buf.as_slice()
    }
}

impl Debug for IcmpPacket<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IcmpPacket")
            .field("icmp_type", &self.get_icmp_type())
            .field("icmp_code", &self.get_icmp_code())
            .field("checksum", &self.get_checksum())
            .finish()
    }
}

pub mod echo_request {
    use super::{IcmpCode, IcmpType, CHECKSUM_OFFSET, CODE_OFFSET, TYPE_OFFSET};
    use crate::buffer::Buffer;
    use crate::error::{Error, Result};
    use crate::fmt_payload;
    use std::fmt::{Debug, Formatter};

    const IDENTIFIER_OFFSET: usize = 4;
    const SEQUENCE_OFFSET: usize = 6;

    /// An `ICMPv6` `EchoRequest` packet.
    ///
    /// The checksum field is left at zero when building; `ICMPv6` sockets
    /// compute it in the kernel using the IPv6 pseudo-header.
    pub struct EchoRequestPacket<'a> {
        buf: Buffer<'a>,
    }

    impl<'a> EchoRequestPacket<'a> {
        pub fn new(packet: &'a mut [u8]) -> Result<Self> {
            if packet.len() >= Self::minimum_packet_size() {
                Ok(Self {
                    buf: Buffer::Mutable(packet),
                })
            } else {
                Err(Error::InsufficientPacketBuffer(
                    String::from("EchoRequestPacket"),
                    Self::minimum_packet_size(),
                    packet.len(),
                ))
            }
        }

        #[must_use]
        pub const fn minimum_packet_size() -> usize {
            8
        }

        #[must_use]
        pub fn get_icmp_type(&self) -> IcmpType {
            IcmpType::from(self.buf.read_u8(TYPE_OFFSET))
        }

        #[must_use]
        pub fn get_identifier(&self) -> u16 {
            self.buf.read_u16(IDENTIFIER_OFFSET)
        }

        #[must_use]
        pub fn get_sequence(&self) -> u16 {
            self.buf.read_u16(SEQUENCE_OFFSET)
        }

        pub fn set_icmp_type(&mut self, val: IcmpType) {
            self.buf.write_u8(TYPE_OFFSET, val.id());
        }

        pub fn set_icmp_code(&mut self, val: IcmpCode) {
            self.buf.write_u8(CODE_OFFSET, val.0);
        }

        pub fn set_checksum(&mut self, val: u16) {
            self.buf.write_u16(CHECKSUM_OFFSET, val);
        }

        pub fn set_identifier(&mut self, val: u16) {
            self.buf.write_u16(IDENTIFIER_OFFSET, val);
        }

        pub fn set_sequence(&mut self, val: u16) {
            self.buf.write_u16(SEQUENCE_OFFSET, val);
        }

        pub fn set_payload(&mut self, vals: &[u8]) {
            let offset = Self::minimum_packet_size();
            self.buf.as_slice_mut()[offset..offset + vals.len()].copy_from_slice(vals);
        }

        #[must_use]
        pub fn packet(&self) -> &[u8] {
            self.buf.as_slice()
        }

        #[must_use]
        pub fn payload(&self) -> &[u8] {
            &self.buf.as_slice()[Self::minimum_packet_size()..]
        }
    }

    impl Debug for EchoRequestPacket<'_> {
        fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
            f.debug_struct("EchoRequestPacket")
                .field("icmp_type", &self.get_icmp_type())
                .field("identifier", &self.get_identifier())
                .field("sequence", &self.get_sequence())
                .field("payload", &fmt_payload(self.payload()))
                .finish()
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use hex_literal::hex;

        #[test]
        fn test_build_echo_request() {
            let mut buf = [0_u8; EchoRequestPacket::minimum_packet_size() + 2];
            let mut packet = EchoRequestPacket::new(&mut buf).unwrap();
            packet.set_icmp_type(IcmpType::EchoRequest);
            packet.set_icmp_code(IcmpCode(0));
            packet.set_identifier(0xbeef);
            packet.set_sequence(3);
            packet.set_payload(&[0x11, 0x22]);
            assert_eq!(&hex!("80 00 00 00 be ef 00 03 11 22"), packet.packet());
        }
    }
}

pub mod echo_reply {
    use super::{IcmpCode, IcmpType, CHECKSUM_OFFSET, CODE_OFFSET, TYPE_OFFSET};
    use crate::buffer::Buffer;
    use crate::error::{Error, Result};
    use crate::fmt_payload;
    use std::fmt::{Debug, Formatter};

    const IDENTIFIER_OFFSET: usize = 4;
    const SEQUENCE_OFFSET: usize = 6;

    /// An `ICMPv6` `EchoReply` packet view.
    pub struct EchoReplyPacket<'a> {
        buf: Buffer<'a>,
    }

    impl<'a> EchoReplyPacket<'a> {
        pub fn new_view(packet: &'a [u8]) -> Result<Self> {
            if packet.len() >= Self::minimum_packet_size() {
                Ok(Self {
                    buf: Buffer::Immutable(packet),
                })
            } else {
                Err(Error::InsufficientPacketBuffer(
                    String::from("EchoReplyPacket"),
                    Self::minimum_packet_size(),
                    packet.len(),
                ))
            }
        }

        #[must_use]
        pub const fn minimum_packet_size() -> usize {
            8
        }

        #[must_use]
        pub fn get_icmp_type(&self) -> IcmpType {
            IcmpType::from(self.buf.read_u8(TYPE_OFFSET))
        }

        #[must_use]
        pub fn get_icmp_code(&self) -> IcmpCode {
            IcmpCode::from(self.buf.read_u8(CODE_OFFSET))
        }

        #[must_use]
        pub fn get_checksum(&self) -> u16 {
            self.buf.read_u16(CHECKSUM_OFFSET)
        }

        #[must_use]
        pub fn get_identifier(&self) -> u16 {
            self.buf.read_u16(IDENTIFIER_OFFSET)
        }

        #[must_use]
        pub fn get_sequence(&self) -> u16 {
            self.buf.read_u16(SEQUENCE_OFFSET)
        }

        #[must_use]
        pub fn packet(&self) -> &[u8] {
            self.buf.as_slice()
        }

        #[must_use]
        pub fn payload(&self) -> &[u8] {
            &self.buf.as_slice()[Self::minimum_packet_size()..]
        }
    }

    impl Debug for EchoReplyPacket<'_> {
        fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
            f.debug_struct("EchoReplyPacket")
                .field("icmp_type", &self.get_icmp_type())
                .field("icmp_code", &self.get_icmp_code())
                .field("identifier", &self.get_identifier())
                .field("sequence", &self.get_sequence())
                .field("payload", &fmt_payload(self.payload()))
                .finish()
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use hex_literal::hex;

        #[test]
        fn test_view_echo_reply() {
            let buf = hex!("81 00 12 34 be ef 00 03 99");
            let packet = EchoReplyPacket::new_view(&buf).unwrap();
            assert_eq!(IcmpType::EchoReply, packet.get_icmp_type());
            assert_eq!(IcmpCode(0), packet.get_icmp_code());
            assert_eq!(0x1234, packet.get_checksum());
            assert_eq!(0xbeef, packet.get_identifier());
            assert_eq!(3, packet.get_sequence());
            assert_eq!(&[0x99], packet.payload());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_icmp_type_ids() {
        assert_eq!(128, IcmpType::EchoRequest.id());
        assert_eq!(129, IcmpType::EchoReply.id());
        assert_eq!(3, IcmpType::TimeExceeded.id());
        assert_eq!(IcmpType::EchoReply, IcmpType::from(129));
        assert_eq!(IcmpType::Other(42), IcmpType::from(42));
    }

    #[test]
    fn test_classify_header() {
        let buf = [3_u8, 0, 0, 0, 0, 0, 0, 0];
        let packet = IcmpPacket::new_view(&buf).unwrap();
        assert_eq!(IcmpType::TimeExceeded, packet.get_icmp_type());
    }
}
