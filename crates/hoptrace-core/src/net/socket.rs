use crate::error::IoResult as Result;
use std::net::SocketAddr;
use std::time::Duration;

#[cfg_attr(test, mockall::automock)]
pub trait Socket
where
    Self: Sized,
{
    /// Create a raw IPv4 socket for sending ICMP probes with a caller supplied IPv4 header.
    fn new_icmp_send_socket_ipv4() -> Result<Self>;
    /// Create a raw IPv4 socket for receiving ICMP responses.
    fn new_recv_socket_ipv4() -> Result<Self>;
    /// Create (non-raw) IPv4/UDP socket for local address discovery.
    fn new_udp_dgram_socket_ipv4() -> Result<Self>;
    fn connect(&mut self, address: SocketAddr) -> Result<()>;
    fn local_addr(&mut self) -> Result<Option<SocketAddr>>;
    fn send_to(&mut self, buf: &[u8], addr: SocketAddr) -> Result<()>;
    /// Returns true if the socket becomes readable before the timeout, false otherwise.
    fn is_readable(&mut self, timeout: Duration) -> Result<bool>;
    fn read(&mut self, buf: &mut [u8]) -> Result<usize>;
    fn shutdown(&mut self) -> Result<()>;
}
