use std::io;
use std::net::{self, SocketAddr, ToSocketAddrs};
use std::os::unix::io::{FromRawFd, RawFd};
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use futures_io::{AsyncBufRead, AsyncRead, AsyncWrite};
use socket2::SockAddr;

use crate::net::to_std_addr;
use crate::socket::{Socket, Stream};

pub struct TcpStream {
    inner: Stream,
}

impl TcpStream {
    pub(crate) fn new(socket: Socket) -> TcpStream {
        TcpStream {
            inner: Stream::new(socket),
        }
    }

    async fn connect_addr(addr: SocketAddr) -> io::Result<TcpStream> {
        let socket = Socket::build_stream(SockAddr::from(addr)).await?;
        Ok(TcpStream::new(socket))
    }

    pub async fn connect<A: ToSocketAddrs>(addr: A) -> io::Result<TcpStream> {
        let addrs = addr.to_socket_addrs()?;

        let mut last_err = None;
        for addr in addrs {
            match TcpStream::connect_addr(addr).await {
                Ok(stream) => return Ok(stream),
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

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        to_std_addr(self.inner.get_ref().local_addr()?)
    }

    pub fn peer_addr(&self) -> io::Result<SocketAddr> {
        to_std_addr(self.inner.get_ref().peer_addr()?)
    }

    pub fn shutdown(&self, how: net::Shutdown) -> io::Result<()> {
        self.inner.get_ref().shutdown(how)
    }

    /// Asynchronously closes the underlying descriptor; the synchronous
    /// drop fallback never runs for a stream closed this way.
    pub async fn close(self) -> io::Result<()> {
        self.inner.into_inner().close().await
    }

    /// Writes the whole buffer over the socket, retrying over the
    /// unwritten suffix after every short write.
    pub async fn write_all(&self, buf: &[u8]) -> io::Result<()> {
        self.inner.get_ref().write_all(buf).await
    }

    /// Single gather write over a compile-time list of buffers; returns
    /// the aggregate count drained in list order.
    pub async fn write_vectored<const N: usize>(&self, bufs: [&[u8]; N]) -> io::Result<usize> {
        self.inner.get_ref().write_vectored(bufs).await
    }

    /// Single scatter read into a compile-time list of buffers; earlier
    /// buffers fill to capacity before later ones see any bytes.
    pub async fn read_vectored<const N: usize>(&self, bufs: [&mut [u8]; N]) -> io::Result<usize> {
        self.inner.get_ref().read_vectored(bufs).await
    }

    pub fn nodelay(&self) -> io::Result<bool> {
        self.inner.get_ref().nodelay()
    }

    pub fn set_nodelay(&self, nodelay: bool) -> io::Result<()> {
        self.inner.get_ref().set_nodelay(nodelay)
    }

    pub fn ttl(&self) -> io::Result<u32> {
        self.inner.get_ref().ttl()
    }

    pub fn set_ttl(&self, ttl: u32) -> io::Result<()> {
        self.inner.get_ref().set_ttl(ttl)
    }

    pub fn linger(&self) -> io::Result<Option<Duration>> {
        self.inner.get_ref().linger()
    }

    pub fn set_linger(&self, duration: Option<Duration>) -> io::Result<()> {
        self.inner.get_ref().set_linger(duration)
    }

    pub fn keepalive(&self) -> io::Result<bool> {
        self.inner.get_ref().keepalive()
    }

    pub fn set_keepalive(&self, on: bool) -> io::Result<()> {
        self.inner.get_ref().set_keepalive(on)
    }
}

impl std::fmt::Debug for TcpStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TcpStream").finish_non_exhaustive()
    }
}

impl FromRawFd for TcpStream {
    unsafe fn from_raw_fd(fd: RawFd) -> TcpStream {
        TcpStream::new(Socket::from_raw_fd(fd))
    }
}

impl AsyncRead for TcpStream {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut [u8],
    ) -> Poll<io::Result<usize>> {
        self.get_mut().inner.poll_read(cx, buf)
    }
}

impl AsyncBufRead for TcpStream {
    fn poll_fill_buf(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<&[u8]>> {
        self.get_mut().inner.poll_fill_buf(cx)
    }

    fn consume(self: Pin<&mut Self>, amt: usize) {
        self.get_mut().inner.consume(amt);
    }
}

impl AsyncWrite for TcpStream {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        self.get_mut().inner.poll_write(cx, buf)
    }

    fn poll_flush(self: Pin<&mut Self>, _: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_close(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        self.get_mut().inner.poll_shutdown(cx, net::Shutdown::Write)
    }
}
