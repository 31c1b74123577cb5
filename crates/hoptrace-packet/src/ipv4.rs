use crate::buffer::Buffer;
use crate::error::{Error, Result};
use crate::{fmt_payload, IpProtocol};
use std::fmt::{Debug, Formatter};
use std::net::Ipv4Addr;

const VERSION_IHL_OFFSET: usize = 0;
const TOS_OFFSET: usize = 1;
const TOTAL_LENGTH_OFFSET: usize = 2;
const IDENTIFICATION_OFFSET: usize = 4;
const FLAGS_AND_FRAGMENT_OFFSET_OFFSET: usize = 6;
const TIME_TO_LIVE_OFFSET: usize = 8;
const PROTOCOL_OFFSET: usize = 9;
const CHECKSUM_OFFSET: usize = 10;
const SOURCE_OFFSET: usize = 12;
const DESTINATION_OFFSET: usize = 16;

/// Represents an `IPv4` packet.
///
/// The internal representation is held in network byte order (big-endian) and all accessor methods
/// take and return data in host byte order, converting as necessary for the given architecture.
pub struct Ipv4Packet<'a> {
    buf: Buffer<'a>,
}

impl<'a> Ipv4Packet<'a> {
    pub fn new(packet: &'a mut [u8]) -> Result<Self> {
        check_length(packet.len())?;
        Ok(Self {
            buf: Buffer::Mutable(packet),
        })
    }

    /// Create a read-only view, rejecting buffers shorter than the declared header length.
    pub fn new_view(packet: &'a [u8]) -> Result<Self> {
        check_length(packet.len())?;
        let view = Self {
            buf: Buffer::Immutable(packet),
        };
        let header_len = view.header_len_bytes();
        if header_len < Self::minimum_packet_size() || header_len > packet.len() {
            return Err(Error::TruncatedHeader(
                String::from("Ipv4Packet"),
                header_len,
                packet.len(),
            ));
        }
        Ok(view)
    }

    #[must_use]
    pub const fn minimum_packet_size() -> usize {
        20
    }

    #[must_use]
    pub fn get_version(&self) -> u8 {
        self.buf.read(VERSION_IHL_OFFSET) >> 4
    }

    /// The header length in 32-bit words.
    #[must_use]
    pub fn get_header_length(&self) -> u8 {
        self.buf.read(VERSION_IHL_OFFSET) & 0xf
    }

    #[must_use]
    pub fn get_tos(&self) -> u8 {
        self.buf.read(TOS_OFFSET)
    }

    #[must_use]
    pub fn get_total_length(&self) -> u16 {
        u16::from_be_bytes(self.buf.get_bytes(TOTAL_LENGTH_OFFSET))
    }

    #[must_use]
    pub fn get_identification(&self) -> u16 {
        u16::from_be_bytes(self.buf.get_bytes(IDENTIFICATION_OFFSET))
    }

    #[must_use]
    pub fn get_flags_and_fragment_offset(&self) -> u16 {
        u16::from_be_bytes(self.buf.get_bytes(FLAGS_AND_FRAGMENT_OFFSET_OFFSET))
    }

    #[must_use]
    pub fn get_ttl(&self) -> u8 {
        self.buf.read(TIME_TO_LIVE_OFFSET)
    }

    #[must_use]
    pub fn get_protocol(&self) -> IpProtocol {
        IpProtocol::from(self.buf.read(PROTOCOL_OFFSET))
    }

    #[must_use]
    pub fn get_checksum(&self) -> u16 {
        u16::from_be_bytes(self.buf.get_bytes(CHECKSUM_OFFSET))
    }

    #[must_use]
    pub fn get_source(&self) -> Ipv4Addr {
        Ipv4Addr::from(self.buf.get_bytes::<4>(SOURCE_OFFSET))
    }

    #[must_use]
    pub fn get_destination(&self) -> Ipv4Addr {
        Ipv4Addr::from(self.buf.get_bytes::<4>(DESTINATION_OFFSET))
    }

    pub fn set_version(&mut self, val: u8) {
        let ihl = self.get_header_length();
        self.buf.write(VERSION_IHL_OFFSET, ((val & 0xf) << 4) | ihl);
    }

    pub fn set_header_length(&mut self, val: u8) {
        let version = self.buf.read(VERSION_IHL_OFFSET) & 0xf0;
        self.buf.write(VERSION_IHL_OFFSET, version | (val & 0xf));
    }

    pub fn set_tos(&mut self, val: u8) {
        self.buf.write(TOS_OFFSET, val);
    }

    pub fn set_total_length(&mut self, val: u16) {
        self.buf.set_bytes(TOTAL_LENGTH_OFFSET, val.to_be_bytes());
    }

    pub fn set_identification(&mut self, val: u16) {
        self.buf.set_bytes(IDENTIFICATION_OFFSET, val.to_be_bytes());
    }

    pub fn set_flags_and_fragment_offset(&mut self, val: u16) {
        self.buf
            .set_bytes(FLAGS_AND_FRAGMENT_OFFSET_OFFSET, val.to_be_bytes());
    }

    pub fn set_ttl(&mut self, val: u8) {
        self.buf.write(TIME_TO_LIVE_OFFSET, val);
    }

    pub fn set_protocol(&mut self, val: IpProtocol) {
        self.buf.write(PROTOCOL_OFFSET, val.id());
    }

    pub fn set_checksum(&mut self, val: u16) {
        self.buf.set_bytes(CHECKSUM_OFFSET, val.to_be_bytes());
    }

    pub fn set_source(&mut self, val: Ipv4Addr) {
        self.buf.set_bytes(SOURCE_OFFSET, val.octets());
    }

    pub fn set_destination(&mut self, val: Ipv4Addr) {
        self.buf.set_bytes(DESTINATION_OFFSET, val.octets());
    }

    pub fn set_payload(&mut self, vals: &[u8]) {
        let offset = self.header_len_bytes().max(Self::minimum_packet_size());
        self.buf.copy_from(offset, vals);
    }

    #[must_use]
    pub fn packet(&self) -> &[u8] {
        self.buf.as_slice()
    }

    /// The bytes following the header, including any options.
    #[must_use]
    pub fn payload(&self) -> &[u8] {
        let slice = self.buf.as_slice();
        let start = self
            .header_len_bytes()
            .clamp(Self::minimum_packet_size(), slice.len());
        &slice[start..]
    }

    fn header_len_bytes(&self) -> usize {
        usize::from(self.get_header_length()) * 4
    }
}

fn check_length(len: usize) -> Result<()> {
    if len >= Ipv4Packet::minimum_packet_size() {
        Ok(())
    } else {
        Err(Error::InsufficientPacketBuffer(
            String::from("Ipv4Packet"),
            Ipv4Packet::minimum_packet_size(),
            len,
        ))
    }
}

impl Debug for Ipv4Packet<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ipv4Packet")
            .field("version", &self.get_version())
            .field("header_length", &self.get_header_length())
            .field("tos", &self.get_tos())
            .field("total_length", &self.get_total_length())
            .field("identification", &self.get_identification())
            .field(
                "flags_and_fragment_offset",
                &self.get_flags_and_fragment_offset(),
            )
            .field("ttl", &self.get_ttl())
            .field("protocol", &self.get_protocol())
            .field("checksum", &self.get_checksum())
            .field("source", &self.get_source())
            .field("destination", &self.get_destination())
            .field("payload", &fmt_payload(self.payload()))
            .finish()
    }
}
