use std::io;
use std::net::{SocketAddr, ToSocketAddrs};
use std::pin::Pin;
use std::task::{ready, Context, Poll};

use futures_core::stream::Stream;
use socket2::SockAddr;

use super::TcpStream;
use crate::net::to_std_addr;
use crate::socket::Listener;

pub struct TcpListener {
    inner: Listener,
}

impl TcpListener {
    /// Creates the socket, binds it and starts listening; every step is
    /// synchronous and the first failure is returned as-is.
    pub fn bind<A: ToSocketAddrs>(addr: A) -> io::Result<TcpListener> {
        let addrs = addr.to_socket_addrs()?;

        let mut last_err = None;
        for addr in addrs {
            match Listener::bind(SockAddr::from(addr)) {
                Ok(inner) => return Ok(TcpListener { inner }),
                Err(e) => last_err = Some(e),
            }
        }

        Err(last_err.unwrap_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                "could not resolve to any address",
            )
        }))
    }

    pub async fn accept(&self) -> io::Result<(TcpStream, SocketAddr)> {
        let (socket, addr) = self.inner.accept().await?;
        Ok((TcpStream::new(socket), to_std_addr(addr)?))
    }

    /// Stream of incoming connections.
    pub fn incoming(&self) -> Incoming<'_> {
        Incoming { listener: self }
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        to_std_addr(self.inner.local_addr()?)
    }

    pub fn ttl(&self) -> io::Result<u32> {
        self.inner.get_ref().ttl()
    }

    pub fn set_ttl(&self, ttl: u32) -> io::Result<()> {
        self.inner.get_ref().set_ttl(ttl)
    }
}

pub struct Incoming<'a> {
    listener: &'a TcpListener,
}

impl Stream for Incoming<'_> {
    type Item = io::Result<TcpStream>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let (socket, _) = ready!(self.listener.inner.poll_accept(cx))?;
        Poll::Ready(Some(Ok(TcpStream::new(socket))))
    }
}
