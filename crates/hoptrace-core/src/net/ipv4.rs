use crate::constants::{MAX_PACKET_SIZE, MIN_PACKET_SIZE_ICMP};
use crate::error::{Error, ErrorKind, Result};
use crate::net::common::ErrorMapper;
use crate::net::platform::Ipv4ByteOrder;
use crate::net::socket::Socket;
use crate::net::Datagram;
use crate::probe::{Probe, ResponseKind};
use crate::types::{PacketSize, PayloadPattern, TypeOfService};
use hoptrace_packet::checksum::icmp_ipv4_checksum;
use hoptrace_packet::icmpv4::echo::EchoPacket;
use hoptrace_packet::icmpv4::{IcmpCode, IcmpPacket, IcmpTimeExceededCode, IcmpType};
use hoptrace_packet::ipv4::Ipv4Packet;
use hoptrace_packet::IpProtocol;
use std::io;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::SystemTime;
use tracing::instrument;

/// The maximum size of the ICMP packet we allow.
const MAX_ICMP_PACKET_BUF: usize = MAX_PACKET_SIZE - Ipv4Packet::minimum_packet_size();

/// The maximum size of the ICMP payload we allow.
const MAX_ICMP_PAYLOAD_BUF: usize = MAX_ICMP_PACKET_BUF - EchoPacket::minimum_packet_size();

/// The value for the IPv4 `flags_and_fragment_offset` field to set the `Don't fragment` bit.
///
/// 0100 0000 0000 0000
const DONT_FRAGMENT: u16 = 0x4000;

const INVALID_INPUT_KIND: ErrorKind = ErrorKind::Std(io::ErrorKind::InvalidInput);

/// IPv4 configuration.
#[derive(Debug)]
pub struct Ipv4 {
    pub src_addr: Ipv4Addr,
    pub dest_addr: Ipv4Addr,
    pub byte_order: Ipv4ByteOrder,
    pub packet_size: PacketSize,
    pub payload_pattern: PayloadPattern,
    pub tos: TypeOfService,
}

impl Default for Ipv4 {
    fn default() -> Self {
        Self {
            src_addr: Ipv4Addr::UNSPECIFIED,
            dest_addr: Ipv4Addr::UNSPECIFIED,
            byte_order: Ipv4ByteOrder::Network,
            packet_size: PacketSize(0),
            payload_pattern: PayloadPattern(0),
            tos: TypeOfService(0),
        }
    }
}

impl Ipv4 {
    /// Encode and send an ICMP `EchoRequest` probe.
    ///
    /// Local routing failures are mapped to [`Error::ProbeFailed`].
    #[instrument(skip(self, icmp_send_socket), level = "trace")]
    pub fn dispatch_icmp_probe<S: Socket>(
        &self,
        icmp_send_socket: &mut S,
        probe: &Probe,
    ) -> Result<()> {
        let mut ipv4_buf = [0_u8; MAX_PACKET_SIZE];
        let mut icmp_buf = [0_u8; MAX_ICMP_PACKET_BUF];
        let packet_size = usize::from(self.packet_size.0);
        if !(MIN_PACKET_SIZE_ICMP..=MAX_PACKET_SIZE).contains(&packet_size) {
            return Err(Error::InvalidPacketSize(packet_size));
        }
        let echo_request = self.make_echo_request_icmp_packet(
            &mut icmp_buf,
            probe,
            icmp_payload_size(packet_size),
        )?;
        let ipv4 = self.make_ipv4_packet(&mut ipv4_buf, probe.ttl.0, echo_request.packet())?;
        let remote_addr = SocketAddr::new(IpAddr::V4(self.dest_addr), 0);
        icmp_send_socket
            .send_to(ipv4.packet(), remote_addr)
            .map_err(Error::IoError)
            .map_err(|err| ErrorMapper::probe_failed(err, ErrorKind::HostUnreachable))
            .map_err(|err| ErrorMapper::probe_failed(err, ErrorKind::NetUnreachable))
            .map_err(|err| ErrorMapper::probe_failed(err, INVALID_INPUT_KIND))?;
        Ok(())
    }

    /// Read the next datagram from the receive socket, if one is waiting.
    #[instrument(skip(self, recv_socket), level = "trace")]
    pub fn recv_datagram<S: Socket>(&self, recv_socket: &mut S) -> Result<Option<Datagram>> {
        let mut buf = [0_u8; MAX_PACKET_SIZE];
        match recv_socket.read(&mut buf) {
            Ok(bytes_read) => Ok(Some(Datagram::new(
                buf[..bytes_read].to_vec(),
                SystemTime::now(),
            ))),
            Err(err) => match err.kind() {
                ErrorKind::Std(io::ErrorKind::WouldBlock) => Ok(None),
                _ => Err(Error::IoError(err)),
            },
        }
    }

    /// Create an ICMP `EchoRequest` packet.
    fn make_echo_request_icmp_packet<'a>(
        &self,
        icmp_buf: &'a mut [u8],
        probe: &Probe,
        payload_size: usize,
    ) -> Result<EchoPacket<'a>> {
        let payload_buf = [self.payload_pattern.0; MAX_ICMP_PAYLOAD_BUF];
        let packet_size = EchoPacket::minimum_packet_size() + payload_size;
        let mut icmp = EchoPacket::new(&mut icmp_buf[..packet_size])?;
        icmp.set_icmp_type(IcmpType::EchoRequest);
        icmp.set_icmp_code(IcmpCode(0));
        icmp.set_identifier(probe.identifier.0);
        icmp.set_payload(&payload_buf[..payload_size]);
        icmp.set_sequence(probe.sequence.0);
        icmp.set_checksum(icmp_ipv4_checksum(icmp.packet()));
        Ok(icmp)
    }

    /// Create an `Ipv4Packet`.
    ///
    /// The header checksum is left as zero for the kernel to fill in.
    fn make_ipv4_packet<'a>(
        &self,
        ipv4_buf: &'a mut [u8],
        ttl: u8,
        payload: &[u8],
    ) -> Result<Ipv4Packet<'a>> {
        let ipv4_total_length = (Ipv4Packet::minimum_packet_size() + payload.len()) as u16;
        let ipv4_total_length_header = self.byte_order.adjust_length(ipv4_total_length);
        let ipv4_flags_and_fragment_offset_header = self.byte_order.adjust_length(DONT_FRAGMENT);
        let mut ipv4 = Ipv4Packet::new(&mut ipv4_buf[..usize::from(ipv4_total_length)])?;
        ipv4.set_version(4);
        ipv4.set_header_length(5);
        ipv4.set_total_length(ipv4_total_length_header);
        ipv4.set_ttl(ttl);
        ipv4.set_protocol(IpProtocol::Icmp);
        ipv4.set_source(self.src_addr);
        ipv4.set_destination(self.dest_addr);
        ipv4.set_tos(self.tos.0);
        ipv4.set_payload(payload);
        ipv4.set_identification(0);
        ipv4.set_flags_and_fragment_offset(ipv4_flags_and_fragment_offset_header);
        Ok(ipv4)
    }
}

/// An `ICMP` response which may belong to one of our probes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IcmpResponse {
    /// The address of the host which sent the response.
    pub responder: Ipv4Addr,
    pub kind: ResponseKind,
    /// The echo identifier of the probe which triggered the response.
    pub identifier: u16,
    /// The echo sequence of the probe which triggered the response.
    pub sequence: u16,
}

/// Parse a raw `IPv4` datagram read from the receive socket.
///
/// Returns `Ok(None)` for traffic which cannot be a response to an `EchoRequest` probe, such as
/// other `ICMP` types, fragment reassembly timeouts or errors quoting non-`ICMP` datagrams.
/// Returns an error if the datagram is truncated or otherwise malformed.
#[instrument(skip_all, level = "trace")]
pub fn parse_response(bytes: &[u8]) -> Result<Option<IcmpResponse>> {
    let ipv4 = Ipv4Packet::new_view(bytes)?;
    if ipv4.get_protocol() != IpProtocol::Icmp {
        return Ok(None);
    }
    let responder = ipv4.get_source();
    let icmp_v4 = IcmpPacket::new_view(ipv4.payload())?;
    let icmp_code = icmp_v4.get_icmp_code();
    Ok(match icmp_v4.get_icmp_type() {
        IcmpType::TimeExceeded => {
            if IcmpTimeExceededCode::from(icmp_code) == IcmpTimeExceededCode::TtlExpired {
                extract_echo_request(icmp_v4.payload())?.map(|(identifier, sequence)| {
                    IcmpResponse {
                        responder,
                        kind: ResponseKind::TimeExceeded,
                        identifier,
                        sequence,
                    }
                })
            } else {
                None
            }
        }
        IcmpType::DestinationUnreachable => extract_echo_request(icmp_v4.payload())?.map(
            |(identifier, sequence)| IcmpResponse {
                responder,
                kind: ResponseKind::DestinationUnreachable(icmp_code.0),
                identifier,
                sequence,
            },
        ),
        IcmpType::EchoReply => {
            let packet = EchoPacket::new_view(icmp_v4.packet())?;
            Some(IcmpResponse {
                responder,
                kind: ResponseKind::EchoReply,
                identifier: packet.get_identifier(),
                sequence: packet.get_sequence(),
            })
        }
        _ => None,
    })
}

/// Get the identifier and sequence of the original `EchoRequest` quoted in an `ICMP` error.
fn extract_echo_request(quoted: &[u8]) -> Result<Option<(u16, u16)>> {
    let nested_ipv4 = Ipv4Packet::new_view(quoted)?;
    if nested_ipv4.get_protocol() != IpProtocol::Icmp {
        return Ok(None);
    }
    let echo_request = EchoPacket::new_view(nested_ipv4.payload())?;
    if echo_request.get_icmp_type() != IcmpType::EchoRequest {
        return Ok(None);
    }
    Ok(Some((
        echo_request.get_identifier(),
        echo_request.get_sequence(),
    )))
}

const fn icmp_payload_size(packet_size: usize) -> usize {
    let ip_header_size = Ipv4Packet::minimum_packet_size();
    let icmp_header_size = EchoPacket::minimum_packet_size();
    packet_size - icmp_header_size - ip_header_size
}
