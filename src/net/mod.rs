mod tcp;
mod udp;

pub use crate::socket::Socket;
pub use tcp::{Incoming, TcpListener, TcpStream};
pub use udp::UdpSocket;

use std::io;
use std::net::SocketAddr;

use socket2::SockAddr;

pub(crate) fn to_std_addr(addr: SockAddr) -> io::Result<SocketAddr> {
    addr.as_socket()
        .ok_or_else(|| crate::other("not an IP socket address"))
}
