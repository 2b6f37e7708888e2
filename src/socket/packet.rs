use std::cell::RefCell;
use std::future::Future;
use std::io;
use std::pin::Pin;
use std::task::{ready, Context, Poll};

use socket2::SockAddr;

use super::Socket;
use crate::driver::{self, Op};

/// Datagram socket wrapper with one in-flight operation per direction.
pub(crate) struct Packet {
    inner: RefCell<Inner>,
    io: Socket,
}

impl Packet {
    pub(crate) fn new(io: Socket) -> Packet {
        Packet {
            io,
            inner: RefCell::new(Inner {
                recv: RecvState::Idle,
                send: SendState::Idle,
                send_to: SendToState::Idle,
            }),
        }
    }

    pub(crate) fn get_ref(&self) -> &Socket {
        &self.io
    }

    pub(crate) fn poll_send(&self, cx: &mut Context<'_>, buf: &[u8]) -> Poll<io::Result<usize>> {
        self.inner.borrow_mut().poll_send(cx, buf, &self.io)
    }

    pub(crate) fn poll_send_to(
        &self,
        cx: &mut Context<'_>,
        buf: &[u8],
        addr: &SockAddr,
    ) -> Poll<io::Result<usize>> {
        self.inner.borrow_mut().poll_send_to(cx, buf, addr, &self.io)
    }

    pub(crate) fn poll_recv(&self, cx: &mut Context<'_>, buf: &mut [u8]) -> Poll<io::Result<usize>> {
        self.inner.borrow_mut().poll_recv(cx, buf, &self.io)
    }
}

struct Inner {
    recv: RecvState,
    send: SendState,
    send_to: SendToState,
}

enum RecvState {
    Idle,
    Recving(Op<driver::Recv>),
}

enum SendState {
    Idle,
    Sending(Op<driver::Send>),
}

enum SendToState {
    Idle,
    Sending(Op<driver::SendTo>),
}

impl Inner {
    fn poll_send(
        &mut self,
        cx: &mut Context<'_>,
        buf: &[u8],
        io: &Socket,
    ) -> Poll<io::Result<usize>> {
        loop {
            match &mut self.send {
                SendState::Idle => {
                    let op = Op::send(io.raw_fd(), buf, libc::MSG_NOSIGNAL)?;
                    self.send = SendState::Sending(op);
                }
                SendState::Sending(op) => {
                    let n = ready!(Pin::new(op).poll(cx))?;
                    self.send = SendState::Idle;
                    return Poll::Ready(Ok(n));
                }
            }
        }
    }

    fn poll_send_to(
        &mut self,
        cx: &mut Context<'_>,
        buf: &[u8],
        addr: &SockAddr,
        io: &Socket,
    ) -> Poll<io::Result<usize>> {
        loop {
            match &mut self.send_to {
                SendToState::Idle => {
                    let op = Op::send_to(io.raw_fd(), buf, addr.clone())?;
                    self.send_to = SendToState::Sending(op);
                }
                SendToState::Sending(op) => {
                    let n = ready!(Pin::new(op).poll(cx))?;
                    self.send_to = SendToState::Idle;
                    return Poll::Ready(Ok(n));
                }
            }
        }
    }

    fn poll_recv(
        &mut self,
        cx: &mut Context<'_>,
        buf: &mut [u8],
        io: &Socket,
    ) -> Poll<io::Result<usize>> {
        loop {
            match &mut self.recv {
                RecvState::Idle => {
                    let op = Op::recv(io.raw_fd(), buf.len(), 0)?;
                    self.recv = RecvState::Recving(op);
                }
                RecvState::Recving(op) => {
                    let data = ready!(Pin::new(op).poll(cx))?;
                    self.recv = RecvState::Idle;
                    let n = buf.len().min(data.len());
                    buf[..n].copy_from_slice(&data[..n]);
                    return Poll::Ready(Ok(n));
                }
            }
        }
    }
}
