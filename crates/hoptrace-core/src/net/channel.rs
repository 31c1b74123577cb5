use crate::config::SessionConfig;
use crate::constants::{MAX_PACKET_SIZE, MIN_PACKET_SIZE_ICMP};
use crate::error::{Error, Result};
use crate::net::common::ErrorMapper;
use crate::net::ipv4::Ipv4;
use crate::net::platform::Ipv4ByteOrder;
use crate::net::socket::Socket;
use crate::net::{Datagram, Transport};
use crate::probe::Probe;
use std::time::Duration;
use tracing::instrument;

/// A transport session for sending `Probe` packets and receiving `ICMP` responses.
///
/// The session owns one raw socket for sending and one for receiving. Both are released by
/// [`Transport::close`] or, failing that, when the session is dropped.
pub struct Session<S: Socket> {
    ipv4: Ipv4,
    send_socket: Option<S>,
    recv_socket: Option<S>,
}

impl<S: Socket> Session<S> {
    /// Open a `Session`.
    ///
    /// This operation requires the `CAP_NET_RAW` capability on Linux (root elsewhere) and fails
    /// with [`Error::PermissionDenied`] if the raw sockets cannot be created.
    #[instrument(skip_all, level = "trace")]
    pub fn open(config: &SessionConfig) -> Result<Self> {
        tracing::debug!(?config);
        let packet_size = usize::from(config.packet_size.0);
        if !(MIN_PACKET_SIZE_ICMP..=MAX_PACKET_SIZE).contains(&packet_size) {
            return Err(Error::InvalidPacketSize(packet_size));
        }
        let byte_order = Ipv4ByteOrder::for_address(config.source_addr)
            .map_err(ErrorMapper::permission_denied)?;
        let send_socket = S::new_icmp_send_socket_ipv4()
            .map_err(Error::IoError)
            .map_err(ErrorMapper::permission_denied)?;
        let recv_socket = S::new_recv_socket_ipv4()
            .map_err(Error::IoError)
            .map_err(ErrorMapper::permission_denied)?;
        let ipv4 = Ipv4 {
            src_addr: config.source_addr,
            dest_addr: config.target_addr,
            byte_order,
            packet_size: config.packet_size,
            payload_pattern: config.payload_pattern,
            tos: config.tos,
        };
        Ok(Self::new(ipv4, send_socket, recv_socket))
    }

    fn new(ipv4: Ipv4, send_socket: S, recv_socket: S) -> Self {
        Self {
            ipv4,
            send_socket: Some(send_socket),
            recv_socket: Some(recv_socket),
        }
    }

    /// Is the session still open?
    pub const fn is_open(&self) -> bool {
        self.send_socket.is_some() || self.recv_socket.is_some()
    }
}

impl<S: Socket> Transport for Session<S> {
    #[instrument(skip(self), level = "trace")]
    fn send(&mut self, probe: &Probe) -> Result<()> {
        tracing::debug!(?probe);
        let Some(socket) = self.send_socket.as_mut() else {
            return Err(Error::SessionClosed);
        };
        self.ipv4.dispatch_icmp_probe(socket, probe)
    }

    #[instrument(skip(self), level = "trace")]
    fn receive_within(&mut self, timeout: Duration) -> Result<Option<Datagram>> {
        let Some(socket) = self.recv_socket.as_mut() else {
            return Err(Error::SessionClosed);
        };
        if socket.is_readable(timeout)? {
            self.ipv4.recv_datagram(socket)
        } else {
            Ok(None)
        }
    }

    #[instrument(skip(self), level = "trace")]
    fn close(&mut self) {
        if !self.is_open() {
            return;
        }
        tracing::debug!("closing session");
        let sockets = [self.send_socket.take(), self.recv_socket.take()];
        for mut socket in sockets.into_iter().flatten() {
            // raw sockets are unconnected and may report ENOTCONN here, the fd is closed on drop
            if let Err(err) = socket.shutdown() {
                tracing::trace!(%err, "socket shutdown");
            }
        }
    }
}

impl<S: Socket> Drop for Session<S> {
    fn drop(&mut self) {
        self.close();
    }
}
