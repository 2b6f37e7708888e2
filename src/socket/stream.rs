use std::future::Future;
use std::io;
use std::net;
use std::os::unix::io::RawFd;
use std::pin::Pin;
use std::task::{ready, Context, Poll};

use super::Socket;
use crate::driver::{self, Op};

const DEFAULT_BUFFER_SIZE: usize = 4096;

/// Buffered stream wrapper over one connected socket.
pub(crate) struct Stream {
    inner: Inner,
    io: Socket,
}

impl Stream {
    pub(crate) fn new(io: Socket) -> Stream {
        Stream {
            io,
            inner: Inner {
                read_pos: 0,
                rd: vec![],
                read: Read::Idle,
                write: Write::Idle,
                shutdown: Shutdown::Idle,
            },
        }
    }

    pub(crate) fn get_ref(&self) -> &Socket {
        &self.io
    }

    pub(crate) fn into_inner(self) -> Socket {
        self.io
    }

    pub(crate) fn poll_read(
        &mut self,
        cx: &mut Context<'_>,
        buf: &mut [u8],
    ) -> Poll<io::Result<usize>> {
        let src = ready!(self.inner.poll_fill_buf(cx, self.io.raw_fd()))?;
        let n = buf.len().min(src.len());
        buf[..n].copy_from_slice(&src[..n]);
        self.inner.consume(n);
        Poll::Ready(Ok(n))
    }

    pub(crate) fn poll_fill_buf(&mut self, cx: &mut Context<'_>) -> Poll<io::Result<&[u8]>> {
        self.inner.poll_fill_buf(cx, self.io.raw_fd())
    }

    pub(crate) fn consume(&mut self, amt: usize) {
        self.inner.consume(amt)
    }

    pub(crate) fn poll_write(&mut self, cx: &mut Context<'_>, buf: &[u8]) -> Poll<io::Result<usize>> {
        self.inner.poll_write(cx, buf, self.io.raw_fd())
    }

    pub(crate) fn poll_shutdown(
        &mut self,
        cx: &mut Context<'_>,
        how: net::Shutdown,
    ) -> Poll<io::Result<()>> {
        let how = match how {
            net::Shutdown::Read => libc::SHUT_RD,
            net::Shutdown::Write => libc::SHUT_WR,
            net::Shutdown::Both => libc::SHUT_RDWR,
        };
        self.inner.poll_shutdown(cx, self.io.raw_fd(), how)
    }
}

struct Inner {
    rd: Vec<u8>,
    read_pos: usize,
    read: Read,
    write: Write,
    shutdown: Shutdown,
}

enum Read {
    Idle,
    Reading(Op<driver::Read>),
}

enum Write {
    Idle,
    Writing(Op<driver::Write>),
}

enum Shutdown {
    Idle,
    Shutting(Op<driver::Shutdown>),
}

impl Inner {
    fn poll_fill_buf(&mut self, cx: &mut Context<'_>, fd: RawFd) -> Poll<io::Result<&[u8]>> {
        loop {
            match &mut self.read {
                Read::Idle => {
                    if !self.rd[self.read_pos..].is_empty() {
                        return Poll::Ready(Ok(&self.rd[self.read_pos..]));
                    }
                    self.read_pos = 0;
                    self.rd = vec![];
                    let op = Op::read(fd, DEFAULT_BUFFER_SIZE as u32)?;
                    self.read = Read::Reading(op);
                }
                Read::Reading(op) => {
                    self.rd = ready!(Pin::new(op).poll(cx))?;
                    self.read = Read::Idle;
                    self.read_pos = 0;
                    if self.rd.is_empty() {
                        return Poll::Ready(Ok(&self.rd[..]));
                    }
                }
            }
        }
    }

    fn consume(&mut self, amt: usize) {
        self.read_pos += amt;
    }

    fn poll_write(&mut self, cx: &mut Context<'_>, buf: &[u8], fd: RawFd) -> Poll<io::Result<usize>> {
        loop {
            match &mut self.write {
                Write::Idle => {
                    let op = Op::write(fd, buf)?;
                    self.write = Write::Writing(op);
                }
                Write::Writing(op) => {
                    let n = ready!(Pin::new(op).poll(cx))?;
                    self.write = Write::Idle;
                    return Poll::Ready(Ok(n));
                }
            }
        }
    }

    fn poll_shutdown(
        &mut self,
        cx: &mut Context<'_>,
        fd: RawFd,
        how: libc::c_int,
    ) -> Poll<io::Result<()>> {
        loop {
            match &mut self.shutdown {
                Shutdown::Idle => {
                    let op = Op::shutdown(fd, how)?;
                    self.shutdown = Shutdown::Shutting(op);
                }
                Shutdown::Shutting(op) => {
                    ready!(Pin::new(op).poll(cx))?;
                    self.shutdown = Shutdown::Idle;
                    return Poll::Ready(Ok(()));
                }
            }
        }
    }
}
