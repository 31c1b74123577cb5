use crate::error::Result;
use crate::net::platform::{Ipv4ByteOrder, Platform};
use std::net::Ipv4Addr;

pub struct PlatformImpl;

impl Platform for PlatformImpl {
    fn byte_order_for_address(addr: Ipv4Addr) -> Result<Ipv4ByteOrder> {
        address::for_address(addr)
    }
    fn discover_local_addr(target_addr: Ipv4Addr, port: u16) -> Result<Ipv4Addr> {
        address::discover_local_addr(target_addr, port)
    }
}

mod address {
    use crate::error::{Error, Result};
    use crate::net::platform::Ipv4ByteOrder;
    use crate::net::socket::Socket;
    use crate::net::SocketImpl;
    use std::net::{IpAddr, Ipv4Addr, SocketAddr};
    use tracing::instrument;

    /// The size of the test packet to use for discovering the `total_length` byte order.
    #[cfg(not(target_os = "linux"))]
    const TEST_PACKET_LENGTH: u16 = 256;

    /// Linux accepts either network byte order or host byte order for the `total_length` field, and
    /// so we skip the check and return network byte order unconditionally.
    #[cfg(target_os = "linux")]
    #[expect(clippy::unnecessary_wraps)]
    pub const fn for_address(_src_addr: Ipv4Addr) -> Result<Ipv4ByteOrder> {
        Ok(Ipv4ByteOrder::Network)
    }

    #[cfg(not(target_os = "linux"))]
    #[instrument(ret, level = "trace")]
    pub fn for_address(addr: Ipv4Addr) -> Result<Ipv4ByteOrder> {
        match test_send_local_ip4_packet(addr, TEST_PACKET_LENGTH) {
            Ok(()) => Ok(Ipv4ByteOrder::Network),
            Err(Error::IoError(io))
                if io.kind() == crate::error::ErrorKind::Std(std::io::ErrorKind::InvalidInput) =>
            {
                test_send_local_ip4_packet(addr, TEST_PACKET_LENGTH.swap_bytes())
                    .map(|()| Ipv4ByteOrder::Host)
            }
            Err(err) => Err(err),
        }
    }

    /// Attempt to send an `ICMP` packet to a local address.
    ///
    /// The packet is `256` bytes long but `total_length` is set from the input so that the OS
    /// rejects the `send_to` call when the byte order is wrong.
    #[cfg(not(target_os = "linux"))]
    #[instrument(ret, level = "trace")]
    fn test_send_local_ip4_packet(src_addr: Ipv4Addr, total_length: u16) -> Result<()> {
        use hoptrace_packet::checksum::icmp_ipv4_checksum;
        use hoptrace_packet::icmpv4::echo::EchoPacket;
        use hoptrace_packet::icmpv4::{IcmpCode, IcmpType};
        use hoptrace_packet::ipv4::Ipv4Packet;
        use hoptrace_packet::IpProtocol;
        let mut icmp_buf = [0_u8; EchoPacket::minimum_packet_size()];
        let mut icmp = EchoPacket::new(&mut icmp_buf)?;
        icmp.set_icmp_type(IcmpType::EchoRequest);
        icmp.set_icmp_code(IcmpCode(0));
        icmp.set_identifier(0);
        icmp.set_sequence(0);
        icmp.set_checksum(icmp_ipv4_checksum(icmp.packet()));
        let mut ipv4_buf = [0_u8; TEST_PACKET_LENGTH as usize];
        let mut ipv4 = Ipv4Packet::new(&mut ipv4_buf)?;
        ipv4.set_version(4);
        ipv4.set_header_length(5);
        ipv4.set_protocol(IpProtocol::Icmp);
        ipv4.set_ttl(255);
        ipv4.set_source(src_addr);
        ipv4.set_destination(Ipv4Addr::LOCALHOST);
        ipv4.set_total_length(total_length);
        ipv4.set_payload(icmp.packet());
        let mut probe_socket = SocketImpl::new_icmp_send_socket_ipv4()?;
        let remote_addr = SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 0);
        probe_socket.send_to(ipv4.packet(), remote_addr)?;
        Ok(())
    }

    // Note that no packets are transmitted by this method.
    #[instrument(ret, level = "trace")]
    pub fn discover_local_addr(target_addr: Ipv4Addr, port: u16) -> Result<Ipv4Addr> {
        let mut socket = SocketImpl::new_udp_dgram_socket_ipv4()?;
        socket.connect(SocketAddr::new(IpAddr::V4(target_addr), port))?;
        match socket.local_addr()?.ok_or(Error::MissingAddr)?.ip() {
            IpAddr::V4(addr) => Ok(addr),
            IpAddr::V6(_) => Err(Error::MissingAddr),
        }
    }
}

mod socket {
    use crate::error::IoResult;
    use crate::error::{ErrorKind, IoError, IoOperation};
    use crate::net::socket::Socket;
    use itertools::Itertools;
    use nix::{
        sys::select::FdSet,
        sys::time::{TimeVal, TimeValLike},
        Error,
    };
    use socket2::{Domain, Protocol, SockAddr, Type};
    use std::io;
    use std::io::Read;
    use std::net::{Shutdown, SocketAddr};
    use std::os::fd::AsFd;
    use std::time::Duration;
    use tracing::instrument;

    /// A network socket.
    pub struct SocketImpl {
        inner: socket2::Socket,
    }

    impl SocketImpl {
        fn new(domain: Domain, ty: Type, protocol: Protocol) -> IoResult<Self> {
            Ok(Self {
                inner: socket2::Socket::new(domain, ty, Some(protocol))
                    .map_err(|err| IoError::Other(err, IoOperation::NewSocket))?,
            })
        }

        fn set_nonblocking(&self, nonblocking: bool) -> IoResult<()> {
            self.inner
                .set_nonblocking(nonblocking)
                .map_err(|err| IoError::Other(err, IoOperation::SetNonBlocking))
        }

        fn set_header_included(&self, included: bool) -> IoResult<()> {
            self.inner
                .set_header_included_v4(included)
                .map_err(|err| IoError::Other(err, IoOperation::SetHeaderIncluded))
        }
    }

    impl Socket for SocketImpl {
        #[instrument(level = "trace")]
        fn new_icmp_send_socket_ipv4() -> IoResult<Self> {
            let socket =
                Self::new(Domain::IPV4, Type::RAW, Protocol::from(nix::libc::IPPROTO_RAW))?;
            socket.set_nonblocking(true)?;
            socket.set_header_included(true)?;
            Ok(socket)
        }
        #[instrument(level = "trace")]
        fn new_recv_socket_ipv4() -> IoResult<Self> {
            let socket = Self::new(Domain::IPV4, Type::RAW, Protocol::ICMPV4)?;
            socket.set_nonblocking(true)?;
            Ok(socket)
        }
        #[instrument(level = "trace")]
        fn new_udp_dgram_socket_ipv4() -> IoResult<Self> {
            Self::new(Domain::IPV4, Type::DGRAM, Protocol::UDP)
        }
        #[instrument(skip(self), level = "trace")]
        fn connect(&mut self, address: SocketAddr) -> IoResult<()> {
            tracing::trace!(?address);
            self.inner
                .connect(&SockAddr::from(address))
                .map_err(|err| IoError::Connect(err, address))
        }
        #[instrument(skip(self), level = "trace")]
        fn local_addr(&mut self) -> IoResult<Option<SocketAddr>> {
            Ok(self
                .inner
                .local_addr()
                .map_err(|err| IoError::Other(err, IoOperation::LocalAddr))?
                .as_socket())
        }
        #[instrument(skip(self, buf), level = "trace")]
        fn send_to(&mut self, buf: &[u8], addr: SocketAddr) -> IoResult<()> {
            tracing::trace!(buf = format!("{:02x?}", buf.iter().format(" ")), ?addr);
            self.inner
                .send_to(buf, &SockAddr::from(addr))
                .map_err(|err| IoError::SendTo(err, addr))?;
            Ok(())
        }
        #[instrument(skip(self), level = "trace")]
        fn is_readable(&mut self, timeout: Duration) -> IoResult<bool> {
            let mut read = FdSet::new();
            read.insert(self.inner.as_fd());
            let millis = i64::try_from(timeout.as_millis()).unwrap_or(i64::MAX);
            let readable = nix::sys::select::select(
                None,
                Some(&mut read),
                None,
                None,
                Some(&mut TimeVal::milliseconds(millis)),
            );
            match readable {
                Ok(readable) => Ok(readable == 1),
                Err(Error::EINTR) => Ok(false),
                Err(err) => Err(IoError::Other(io::Error::from(err), IoOperation::Select)),
            }
        }
        #[instrument(skip(self, buf), level = "trace")]
        fn read(&mut self, buf: &mut [u8]) -> IoResult<usize> {
            let bytes_read = self
                .inner
                .read(buf)
                .map_err(|err| IoError::Other(err, IoOperation::Read))?;
            tracing::trace!(
                buf = format!("{:02x?}", buf[..bytes_read].iter().format(" ")),
                bytes_read
            );
            Ok(bytes_read)
        }
        #[instrument(skip(self), level = "trace")]
        fn shutdown(&mut self) -> IoResult<()> {
            self.inner
                .shutdown(Shutdown::Both)
                .map_err(|err| IoError::Other(err, IoOperation::Shutdown))
        }
    }

    impl From<&io::Error> for ErrorKind {
        fn from(value: &io::Error) -> Self {
            let errno = value.raw_os_error();
            if errno == Some(Error::EHOSTUNREACH as i32) {
                Self::HostUnreachable
            } else if errno == Some(Error::ENETUNREACH as i32) {
                Self::NetUnreachable
            } else if errno == Some(Error::EPERM as i32) || errno == Some(Error::EACCES as i32) {
                Self::PermissionDenied
            } else {
                Self::Std(value.kind())
            }
        }
    }

    // only used for unit tests
    impl From<ErrorKind> for io::Error {
        fn from(value: ErrorKind) -> Self {
            match value {
                ErrorKind::HostUnreachable => Self::from(Error::EHOSTUNREACH),
                ErrorKind::NetUnreachable => Self::from(Error::ENETUNREACH),
                ErrorKind::PermissionDenied => Self::from(Error::EPERM),
                ErrorKind::Std(kind) => Self::from(kind),
            }
        }
    }

}

pub use socket::SocketImpl;
